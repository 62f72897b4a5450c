//! Read-only projections over the entity store for the dashboard screens.

use serde::Serialize;

use crate::calc::round_half_up;
use crate::model::{Assignment, Class, Exam, Student};
use crate::store::EntityStore;

/// All students by `points`, highest first. Ties keep store order.
pub fn leaderboard(store: &EntityStore) -> Vec<&Student> {
    let mut board: Vec<&Student> = store.students.iter().collect();
    // `sort_by` is stable.
    board.sort_by(|a, b| b.points.total_cmp(&a.points));
    board
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPerformance {
    pub class_id: String,
    pub name: String,
    pub student_count: usize,
    pub average_points: f64,
}

pub fn class_average(store: &EntityStore, class_id: &str) -> f64 {
    let (count, total) = store
        .students_in_class(class_id)
        .fold((0usize, 0.0f64), |(n, sum), s| (n + 1, sum + s.points));
    if count == 0 {
        return 0.0;
    }
    round_half_up(total / count as f64)
}

pub fn class_performance(store: &EntityStore) -> Vec<ClassPerformance> {
    store
        .classes
        .iter()
        .map(|c| ClassPerformance {
            class_id: c.id.clone(),
            name: c.name.clone(),
            student_count: store.students_in_class(&c.id).count(),
            average_points: class_average(store, &c.id),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignmentCount {
    pub class_id: String,
    pub name: String,
    pub count: usize,
}

pub fn class_assignment_counts(store: &EntityStore) -> Vec<ClassAssignmentCount> {
    store
        .classes
        .iter()
        .map(|c| ClassAssignmentCount {
            class_id: c.id.clone(),
            name: c.name.clone(),
            count: store.assignments.iter().filter(|a| a.targets(&c.id)).count(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPercentage {
    pub exam_id: String,
    pub exam: String,
    pub percentage: f64,
}

pub fn exam_percentage(exam: &Exam, student_id: &str) -> f64 {
    match exam.result(student_id) {
        Some(r) if exam.max_score > 0.0 => round_half_up(r.score / exam.max_score * 100.0),
        _ => 0.0,
    }
}

/// One entry per exam, 0 where the student has no result.
pub fn student_exam_profile(store: &EntityStore, student_id: &str) -> Vec<ExamPercentage> {
    store
        .exams
        .iter()
        .map(|e| ExamPercentage {
            exam_id: e.id.clone(),
            exam: e.title.clone(),
            percentage: exam_percentage(e, student_id),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub assignment_id: String,
    pub name: String,
    pub submissions: usize,
    pub average_percent: f64,
}

pub fn assignment_stats(store: &EntityStore) -> Vec<AssignmentStats> {
    store
        .assignments
        .iter()
        .map(|a| {
            let grades: Vec<f64> = a
                .submissions
                .iter()
                .filter(|s| s.submitted)
                .map(|s| s.grade.unwrap_or(0.0))
                .collect();
            let average_percent = if grades.is_empty() || a.total_points <= 0.0 {
                0.0
            } else {
                let mean = grades.iter().sum::<f64>() / grades.len() as f64;
                round_half_up(mean / a.total_points * 100.0)
            };
            AssignmentStats {
                assignment_id: a.id.clone(),
                name: a.title.clone(),
                submissions: grades.len(),
                average_percent,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_students: usize,
    pub total_assignments: usize,
    pub total_submissions: usize,
}

pub fn totals(store: &EntityStore) -> Totals {
    Totals {
        total_students: store.students.len(),
        total_assignments: store.assignments.len(),
        total_submissions: store.students.iter().map(|s| s.assignments_completed).sum(),
    }
}

pub fn assignments_for_class<'a>(store: &'a EntityStore, class_id: &str) -> Vec<&'a Assignment> {
    store.assignments.iter().filter(|a| a.targets(class_id)).collect()
}

pub fn exams_for_class<'a>(store: &'a EntityStore, class_id: &str) -> Vec<&'a Exam> {
    store.exams.iter().filter(|e| e.targets(class_id)).collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetail<'a> {
    pub class: &'a Class,
    pub students: Vec<&'a Student>,
    pub assignments: Vec<&'a Assignment>,
    pub exams: Vec<&'a Exam>,
    pub pending_assignments: usize,
    pub average_points: f64,
}

pub fn class_detail<'a>(store: &'a EntityStore, class_id: &str) -> Option<ClassDetail<'a>> {
    let class = store.class(class_id)?;
    let assignments = assignments_for_class(store, class_id);
    Some(ClassDetail {
        class,
        students: store.students_in_class(class_id).collect(),
        pending_assignments: assignments.len(),
        assignments,
        exams: exams_for_class(store, class_id),
        average_points: class_average(store, class_id),
    })
}
