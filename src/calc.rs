use crate::model::{Assignment, Student};

/// Round half up, matching the dashboard's integer display:
/// `floor(x + 0.5)`
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StudentTally {
    pub earned: f64,
    pub completed: usize,
}

/// Sum of graded work for one student. Only `submitted = true` records count;
/// a missing grade contributes zero.
pub fn tally_student(student_id: &str, assignments: &[Assignment]) -> StudentTally {
    let mut tally = StudentTally::default();
    for a in assignments {
        let Some(sub) = a.submission(student_id) else {
            continue;
        };
        if !sub.submitted {
            continue;
        }
        tally.completed += 1;
        tally.earned += sub.grade.unwrap_or(0.0);
    }
    tally
}

/// Rewrites the cached `points` / `assignments_completed` of every student
/// from scratch. Never adjusts incrementally.
pub fn recompute(students: &mut [Student], assignments: &[Assignment]) {
    for s in students.iter_mut() {
        let tally = tally_student(&s.id, assignments);
        s.assignments_completed = tally.completed;
        s.points = tally.earned + s.manual_points;
    }
}
