use std::collections::HashMap;

use crate::calc;
use crate::model::{Assignment, Class, Exam, ExamResult, Student, Submission};
use crate::remote::{AssignmentRow, ClassRow, ExamResultRow, ExamRow, StudentRow, SubmissionRow};

/// In-memory copy of one account's gradebook. Owned by the sync engine;
/// everything else reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    pub classes: Vec<Class>,
    pub students: Vec<Student>,
    pub assignments: Vec<Assignment>,
    pub exams: Vec<Exam>,
}

/// Raw table contents for one account, as fetched.
#[derive(Debug, Clone, Default)]
pub struct LoadedRows {
    pub classes: Vec<ClassRow>,
    pub students: Vec<StudentRow>,
    pub assignments: Vec<AssignmentRow>,
    pub submissions: Vec<SubmissionRow>,
    pub exams: Vec<ExamRow>,
    pub exam_results: Vec<ExamResultRow>,
}

impl EntityStore {
    /// Joins submissions onto assignments and results onto exams by foreign
    /// key, then fills the derived student fields. Rows pointing at a parent
    /// that was not loaded are dropped.
    pub fn from_rows(rows: LoadedRows) -> Self {
        let mut subs_by_assignment: HashMap<String, Vec<Submission>> = HashMap::new();
        for s in rows.submissions {
            subs_by_assignment
                .entry(s.assignment_id)
                .or_default()
                .push(Submission {
                    student_id: s.student_id,
                    submitted: s.submitted,
                    grade: s.grade,
                });
        }
        let mut results_by_exam: HashMap<String, Vec<ExamResult>> = HashMap::new();
        for r in rows.exam_results {
            results_by_exam
                .entry(r.exam_id)
                .or_default()
                .push(ExamResult {
                    student_id: r.student_id,
                    score: r.score,
                });
        }

        let assignments = rows
            .assignments
            .into_iter()
            .map(|a| Assignment {
                submissions: subs_by_assignment.remove(&a.id).unwrap_or_default(),
                id: a.id,
                title: a.title,
                class_ids: a.class_ids,
                total_points: a.total_points,
            })
            .collect::<Vec<_>>();
        let exams = rows
            .exams
            .into_iter()
            .map(|e| Exam {
                results: results_by_exam.remove(&e.id).unwrap_or_default(),
                id: e.id,
                title: e.title,
                class_ids: e.class_ids,
                max_score: e.max_score,
            })
            .collect();
        let mut students = rows
            .students
            .into_iter()
            .map(|s| Student {
                id: s.id,
                name: s.name,
                class_id: s.class_id,
                form_class: s.form_class,
                photo_url: s.photo_url,
                manual_points: s.manual_points,
                points: 0.0,
                assignments_completed: 0,
                version: s.version,
            })
            .collect::<Vec<_>>();
        calc::recompute(&mut students, &assignments);

        Self {
            classes: rows
                .classes
                .into_iter()
                .map(|c| Class {
                    id: c.id,
                    name: c.name,
                })
                .collect(),
            students,
            assignments,
            exams,
        }
    }

    pub fn clear(&mut self) {
        self.classes.clear();
        self.students.clear();
        self.assignments.clear();
        self.exams.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.students.is_empty()
            && self.assignments.is_empty()
            && self.exams.is_empty()
    }

    pub fn recompute_points(&mut self) {
        calc::recompute(&mut self.students, &self.assignments);
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn assignment(&self, id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn exam(&self, id: &str) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == id)
    }

    /// Roster of one class in store order. The returned students borrow the
    /// store only, so they outlive the `class_id` argument.
    pub fn students_in_class<'a, 'b>(
        &'a self,
        class_id: &'b str,
    ) -> impl Iterator<Item = &'a Student> + 'b
    where
        'a: 'b,
    {
        self.students.iter().filter(move |s| s.class_id == class_id)
    }

    /// Local mirror of the remote cascade.
    pub fn remove_student(&mut self, student_id: &str) {
        self.students.retain(|s| s.id != student_id);
        for a in &mut self.assignments {
            a.submissions.retain(|s| s.student_id != student_id);
        }
        for e in &mut self.exams {
            e.results.retain(|r| r.student_id != student_id);
        }
    }
}
