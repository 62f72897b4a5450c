use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
}

/// `points` and `assignments_completed` are a cache over submissions and
/// `manual_points`; `calc::recompute` is the only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class_id: String,
    pub form_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub manual_points: f64,
    pub points: f64,
    pub assignments_completed: usize,
    /// Remote row revision used for compare-and-swap point writes.
    #[serde(skip)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub student_id: String,
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub class_ids: Vec<String>,
    pub total_points: f64,
    pub submissions: Vec<Submission>,
}

impl Assignment {
    pub fn submission(&self, student_id: &str) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.student_id == student_id)
    }

    pub fn targets(&self, class_id: &str) -> bool {
        self.class_ids.iter().any(|c| c == class_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub student_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub class_ids: Vec<String>,
    pub max_score: f64,
    pub results: Vec<ExamResult>,
}

impl Exam {
    pub fn result(&self, student_id: &str) -> Option<&ExamResult> {
        self.results.iter().find(|r| r.student_id == student_id)
    }

    pub fn targets(&self, class_id: &str) -> bool {
        self.class_ids.iter().any(|c| c == class_id)
    }
}

/// Authenticated identity. Passed explicitly to every engine operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub created_at: String,
}
