//! Optimistic local writes mirrored to the remote store.
//!
//! Every mutation runs through [`SyncEngine::transact`]: snapshot the store,
//! apply the change locally, recompute derived points, write remotely, and
//! restore the snapshot if the write fails. Input that fails local validation
//! is refused before any of that happens and never reaches the remote.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::model::{Assignment, Class, Exam, ExamResult, Session, Student, Submission};
use crate::remote::{
    AssignmentPatch, AssignmentRow, ClassRow, ExamPatch, ExamResultRow, ExamRow,
    ManualPointsWrite, RemoteError, RemoteStore, StudentPatch, StudentRow, SubmissionRow,
};
use crate::store::{EntityStore, LoadedRows};

pub const DEFAULT_SEED_CLASSES: [&str; 3] = ["Class 10-A", "Class 10-B", "Class 11-A"];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to {action}: {source}")]
    RemoteWrite {
        action: &'static str,
        #[source]
        source: RemoteError,
    },
}

/// Result of a mutation that passed or failed local validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// Refused locally; nothing changed and no remote call was made.
    Refused(&'static str),
}

impl<T> Outcome<T> {
    #[cfg(test)]
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(v) => Some(v),
            Self::Refused(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub table: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub fetch_failures: Vec<FetchFailure>,
    pub seeded_classes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub class_id: String,
    pub name: String,
    pub form_class: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAssignment {
    pub title: String,
    pub total_points: f64,
    pub class_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewExam {
    pub title: String,
    pub max_score: f64,
    pub class_ids: Vec<String>,
}

/// Single-field edit to one `(assignment, student)` submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmissionChange {
    Submitted(bool),
    Grade(f64),
}

pub struct SyncEngine<R: RemoteStore> {
    remote: R,
    store: EntityStore,
    seed_classes: Vec<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            store: EntityStore::default(),
            seed_classes: DEFAULT_SEED_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Class names inserted when an account's class list loads empty.
    pub fn set_seed_classes(&mut self, names: Vec<String>) {
        self.seed_classes = names;
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[cfg(test)]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Replaces the store with the account's remote contents. Each table is
    /// fetched independently; a failed fetch is reported and leaves that
    /// collection empty. An empty (successfully fetched) class list is
    /// seeded with the default classes.
    pub fn load(&mut self, session: &Session) -> LoadReport {
        let owner = session.user_id.as_str();
        let mut report = LoadReport::default();

        let classes = self.remote.select_classes(owner);
        let classes_ok = classes.is_ok();
        let mut rows = LoadedRows {
            classes: fetched(&mut report, "classes", classes),
            students: fetched(&mut report, "students", self.remote.select_students(owner)),
            assignments: fetched(
                &mut report,
                "assignments",
                self.remote.select_assignments(owner),
            ),
            submissions: fetched(
                &mut report,
                "submissions",
                self.remote.select_submissions(owner),
            ),
            exams: fetched(&mut report, "exams", self.remote.select_exams(owner)),
            exam_results: fetched(
                &mut report,
                "exam_results",
                self.remote.select_exam_results(owner),
            ),
        };

        if classes_ok && rows.classes.is_empty() && !self.seed_classes.is_empty() {
            let seed = self
                .seed_classes
                .iter()
                .map(|name| ClassRow {
                    id: new_id(),
                    name: name.clone(),
                })
                .collect::<Vec<_>>();
            match self.remote.insert_classes(owner, &seed) {
                Ok(()) => {
                    tracing::info!(count = seed.len(), "seeded default classes");
                    report.seeded_classes = seed.len();
                    rows.classes = seed;
                }
                Err(e) => tracing::warn!(error = %e, "could not seed default classes"),
            }
        }

        self.store = EntityStore::from_rows(rows);
        tracing::info!(
            classes = self.store.classes.len(),
            students = self.store.students.len(),
            assignments = self.store.assignments.len(),
            exams = self.store.exams.len(),
            "gradebook loaded"
        );
        report
    }

    fn transact<T>(
        &mut self,
        action: &'static str,
        mutate: impl FnOnce(&mut EntityStore) -> T,
        write: impl FnOnce(&R, &T) -> Result<(), RemoteError>,
    ) -> Result<T, SyncError> {
        let snapshot = self.store.clone();
        let applied = mutate(&mut self.store);
        self.store.recompute_points();
        if let Err(source) = write(&self.remote, &applied) {
            self.store = snapshot;
            tracing::error!(action, error = %source, "remote write failed, local change rolled back");
            return Err(SyncError::RemoteWrite { action, source });
        }
        Ok(applied)
    }

    fn refuse<T>(action: &'static str, reason: &'static str) -> Result<Outcome<T>, SyncError> {
        tracing::debug!(action, reason, "mutation refused");
        Ok(Outcome::Refused(reason))
    }

    fn valid_class_ids(&self, class_ids: &[String]) -> Option<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in class_ids {
            self.store.class(id)?;
            if seen.insert(id.as_str()) {
                out.push(id.clone());
            }
        }
        (!out.is_empty()).then_some(out)
    }

    pub fn add_class(&mut self, session: &Session, name: &str) -> Result<Outcome<Class>, SyncError> {
        let Some(name) = non_empty(name) else {
            return Self::refuse("add class", "class name is required");
        };
        let class = Class { id: new_id(), name };
        let owner = session.user_id.as_str();
        self.transact(
            "add class",
            |store| {
                store.classes.push(class.clone());
                class
            },
            |remote, c| {
                remote.insert_classes(
                    owner,
                    &[ClassRow {
                        id: c.id.clone(),
                        name: c.name.clone(),
                    }],
                )
            },
        )
        .map(Outcome::Applied)
    }

    pub fn rename_class(
        &mut self,
        session: &Session,
        class_id: &str,
        name: &str,
    ) -> Result<Outcome<Class>, SyncError> {
        let Some(name) = non_empty(name) else {
            return Self::refuse("update class", "class name is required");
        };
        if self.store.class(class_id).is_none() {
            return Self::refuse("update class", "unknown class");
        }
        let renamed = Class {
            id: class_id.to_string(),
            name,
        };
        let owner = session.user_id.as_str();
        self.transact(
            "update class",
            |store| {
                if let Some(c) = store.classes.iter_mut().find(|c| c.id == class_id) {
                    c.name = renamed.name.clone();
                }
                renamed
            },
            |remote, c| remote.update_class_name(owner, &c.id, &c.name),
        )
        .map(Outcome::Applied)
    }

    pub fn add_student(
        &mut self,
        session: &Session,
        new: NewStudent,
    ) -> Result<Outcome<Student>, SyncError> {
        let Some(name) = non_empty(&new.name) else {
            return Self::refuse("add student", "student name is required");
        };
        if self.store.class(&new.class_id).is_none() {
            return Self::refuse("add student", "select a class first");
        }
        let student = Student {
            id: new_id(),
            name,
            class_id: new.class_id,
            form_class: new.form_class.trim().to_string(),
            photo_url: new.photo_url.and_then(|u| non_empty(&u)),
            manual_points: 0.0,
            points: 0.0,
            assignments_completed: 0,
            version: 0,
        };
        let owner = session.user_id.as_str();
        self.transact(
            "add student",
            |store| {
                store.students.push(student.clone());
                student
            },
            |remote, s| {
                remote.insert_student(
                    owner,
                    &StudentRow {
                        id: s.id.clone(),
                        name: s.name.clone(),
                        class_id: s.class_id.clone(),
                        form_class: s.form_class.clone(),
                        photo_url: s.photo_url.clone(),
                        manual_points: s.manual_points,
                        version: s.version,
                    },
                )
            },
        )
        .map(Outcome::Applied)
    }

    pub fn update_student(
        &mut self,
        session: &Session,
        student_id: &str,
        patch: StudentPatch,
    ) -> Result<Outcome<Student>, SyncError> {
        let name = match patch.name.as_deref() {
            Some(n) => match non_empty(n) {
                Some(n) => Some(n),
                None => return Self::refuse("update student", "student name is required"),
            },
            None => None,
        };
        let patch = StudentPatch {
            name,
            form_class: patch.form_class.map(|f| f.trim().to_string()),
        };
        if patch.name.is_none() && patch.form_class.is_none() {
            return Self::refuse("update student", "nothing to update");
        }
        if self.store.student(student_id).is_none() {
            return Self::refuse("update student", "unknown student");
        }
        let owner = session.user_id.as_str();
        let remote_patch = patch.clone();
        self.transact(
            "update student",
            |store| {
                if let Some(s) = store.students.iter_mut().find(|s| s.id == student_id) {
                    if let Some(n) = patch.name {
                        s.name = n;
                    }
                    if let Some(f) = patch.form_class {
                        s.form_class = f;
                    }
                }
            },
            |remote, _| remote.update_student(owner, student_id, &remote_patch),
        )?;
        Ok(self
            .store
            .student(student_id)
            .cloned()
            .map_or(Outcome::Refused("unknown student"), Outcome::Applied))
    }

    pub fn delete_student(
        &mut self,
        session: &Session,
        student_id: &str,
    ) -> Result<Outcome<()>, SyncError> {
        if self.store.student(student_id).is_none() {
            return Self::refuse("delete student", "unknown student");
        }
        let owner = session.user_id.as_str();
        self.transact(
            "delete student",
            |store| store.remove_student(student_id),
            |remote, _| remote.delete_student(owner, student_id),
        )
        .map(Outcome::Applied)
    }

    /// Adds `delta` to one student's manual points. The remote write is a
    /// compare-and-swap on the student's version, so a write based on a stale
    /// value fails and is rolled back instead of overwriting.
    pub fn adjust_manual_points(
        &mut self,
        session: &Session,
        student_id: &str,
        delta: f64,
    ) -> Result<Outcome<Student>, SyncError> {
        if !delta.is_finite() {
            return Self::refuse("update points", "delta must be a number");
        }
        if self.store.student(student_id).is_none() {
            return Self::refuse("update points", "unknown student");
        }
        self.write_points(session, "update points", |s| s.id == student_id, delta)?;
        Ok(self
            .store
            .student(student_id)
            .cloned()
            .map_or(Outcome::Refused("unknown student"), Outcome::Applied))
    }

    /// Adds `delta` to every student in the class in one all-or-nothing write.
    pub fn adjust_class_points(
        &mut self,
        session: &Session,
        class_id: &str,
        delta: f64,
    ) -> Result<Outcome<usize>, SyncError> {
        if !delta.is_finite() {
            return Self::refuse("update class points", "delta must be a number");
        }
        if self.store.students_in_class(class_id).next().is_none() {
            return Self::refuse("update class points", "class has no students");
        }
        self.write_points(session, "update class points", |s| s.class_id == class_id, delta)
            .map(|writes| Outcome::Applied(writes.len()))
    }

    /// Manual-points write shared by the single and class-wide adjustments.
    /// A version conflict still fails, but the local points and versions are
    /// re-read afterwards so the next adjustment starts from the stored row.
    fn write_points(
        &mut self,
        session: &Session,
        action: &'static str,
        matches: impl Fn(&Student) -> bool,
        delta: f64,
    ) -> Result<Vec<ManualPointsWrite>, SyncError> {
        let owner = session.user_id.as_str();
        let res = self.transact(
            action,
            |store| bump_manual_points(store, matches, delta),
            |remote, writes| remote.write_manual_points(owner, writes),
        );
        if let Err(SyncError::RemoteWrite {
            source: RemoteError::Conflict { .. },
            ..
        }) = &res
        {
            self.refresh_manual_points(owner);
        }
        res
    }

    fn refresh_manual_points(&mut self, owner: &str) {
        let rows = match self.remote.select_students(owner) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "could not re-read students after a points conflict");
                return;
            }
        };
        for row in rows {
            if let Some(s) = self.store.students.iter_mut().find(|s| s.id == row.id) {
                s.manual_points = row.manual_points;
                s.version = row.version;
            }
        }
        self.store.recompute_points();
    }

    pub fn add_assignment(
        &mut self,
        session: &Session,
        new: NewAssignment,
    ) -> Result<Outcome<Assignment>, SyncError> {
        let Some(title) = non_empty(&new.title) else {
            return Self::refuse("add assignment", "title is required");
        };
        if !(new.total_points.is_finite() && new.total_points > 0.0) {
            return Self::refuse("add assignment", "total points must be positive");
        }
        let Some(class_ids) = self.valid_class_ids(&new.class_ids) else {
            return Self::refuse("add assignment", "select at least one class");
        };
        let assignment = Assignment {
            id: new_id(),
            title,
            class_ids,
            total_points: new.total_points,
            submissions: Vec::new(),
        };
        let owner = session.user_id.as_str();
        self.transact(
            "add assignment",
            |store| {
                store.assignments.push(assignment.clone());
                assignment
            },
            |remote, a| {
                remote.insert_assignment(
                    owner,
                    &AssignmentRow {
                        id: a.id.clone(),
                        title: a.title.clone(),
                        class_ids: a.class_ids.clone(),
                        total_points: a.total_points,
                    },
                )
            },
        )
        .map(Outcome::Applied)
    }

    pub fn update_assignment(
        &mut self,
        session: &Session,
        assignment_id: &str,
        patch: AssignmentPatch,
    ) -> Result<Outcome<Assignment>, SyncError> {
        let title = match patch.title.as_deref() {
            Some(t) => match non_empty(t) {
                Some(t) => Some(t),
                None => return Self::refuse("update assignment", "title is required"),
            },
            None => None,
        };
        if let Some(p) = patch.total_points {
            if !(p.is_finite() && p > 0.0) {
                return Self::refuse("update assignment", "total points must be positive");
            }
        }
        let patch = AssignmentPatch {
            title,
            total_points: patch.total_points,
        };
        if patch.title.is_none() && patch.total_points.is_none() {
            return Self::refuse("update assignment", "nothing to update");
        }
        if self.store.assignment(assignment_id).is_none() {
            return Self::refuse("update assignment", "unknown assignment");
        }
        let owner = session.user_id.as_str();
        let remote_patch = patch.clone();
        self.transact(
            "update assignment",
            |store| {
                if let Some(a) = store.assignments.iter_mut().find(|a| a.id == assignment_id) {
                    if let Some(t) = patch.title {
                        a.title = t;
                    }
                    if let Some(p) = patch.total_points {
                        a.total_points = p;
                    }
                }
            },
            |remote, _| remote.update_assignment(owner, assignment_id, &remote_patch),
        )?;
        Ok(self
            .store
            .assignment(assignment_id)
            .cloned()
            .map_or(Outcome::Refused("unknown assignment"), Outcome::Applied))
    }

    pub fn delete_assignment(
        &mut self,
        session: &Session,
        assignment_id: &str,
    ) -> Result<Outcome<()>, SyncError> {
        if self.store.assignment(assignment_id).is_none() {
            return Self::refuse("delete assignment", "unknown assignment");
        }
        let owner = session.user_id.as_str();
        self.transact(
            "delete assignment",
            |store| store.assignments.retain(|a| a.id != assignment_id),
            |remote, _| remote.delete_assignment(owner, assignment_id),
        )
        .map(Outcome::Applied)
    }

    /// Upserts the `(assignment, student)` submission. A record that does not
    /// exist yet starts as unsubmitted with grade 0 before the change applies.
    pub fn set_submission(
        &mut self,
        session: &Session,
        assignment_id: &str,
        student_id: &str,
        change: SubmissionChange,
    ) -> Result<Outcome<Submission>, SyncError> {
        if let SubmissionChange::Grade(g) = change {
            if !(g.is_finite() && g >= 0.0) {
                return Self::refuse("update submission", "grade must be a non-negative number");
            }
        }
        if self.store.assignment(assignment_id).is_none() {
            return Self::refuse("update submission", "unknown assignment");
        }
        if self.store.student(student_id).is_none() {
            return Self::refuse("update submission", "unknown student");
        }
        let owner = session.user_id.as_str();
        self.transact(
            "update submission",
            |store| {
                let a = store.assignments.iter_mut().find(|a| a.id == assignment_id)?;
                let sub = upsert_submission(&mut a.submissions, student_id);
                match change {
                    SubmissionChange::Submitted(v) => sub.submitted = v,
                    SubmissionChange::Grade(g) => sub.grade = Some(g),
                }
                Some(sub.clone())
            },
            |remote, sub| {
                let Some(sub) = sub else {
                    return Ok(());
                };
                remote.upsert_submissions(
                    owner,
                    &[SubmissionRow {
                        assignment_id: assignment_id.to_string(),
                        student_id: sub.student_id.clone(),
                        submitted: sub.submitted,
                        grade: sub.grade,
                    }],
                )
            },
        )
        .map(|sub| sub.map_or(Outcome::Refused("unknown assignment"), Outcome::Applied))
    }

    /// Forces `submitted = checked` for every student in the class, keeping
    /// existing grades (0 when there is none), as one batched upsert.
    pub fn set_all_submitted(
        &mut self,
        session: &Session,
        assignment_id: &str,
        class_id: &str,
        checked: bool,
    ) -> Result<Outcome<usize>, SyncError> {
        if self.store.assignment(assignment_id).is_none() {
            return Self::refuse("update submissions", "unknown assignment");
        }
        if self.store.class(class_id).is_none() {
            return Self::refuse("update submissions", "unknown class");
        }
        let roster: Vec<String> = self
            .store
            .students_in_class(class_id)
            .map(|s| s.id.clone())
            .collect();
        if roster.is_empty() {
            return Ok(Outcome::Applied(0));
        }
        let owner = session.user_id.as_str();
        self.transact(
            "update submissions",
            |store| {
                let mut rows = Vec::with_capacity(roster.len());
                if let Some(a) = store.assignments.iter_mut().find(|a| a.id == assignment_id) {
                    for student_id in &roster {
                        let sub = upsert_submission(&mut a.submissions, student_id);
                        sub.submitted = checked;
                        let grade = sub.grade.unwrap_or(0.0);
                        sub.grade = Some(grade);
                        rows.push(SubmissionRow {
                            assignment_id: assignment_id.to_string(),
                            student_id: student_id.clone(),
                            submitted: checked,
                            grade: Some(grade),
                        });
                    }
                }
                rows
            },
            |remote, rows| remote.upsert_submissions(owner, rows),
        )
        .map(|rows| Outcome::Applied(rows.len()))
    }

    pub fn add_exam(&mut self, session: &Session, new: NewExam) -> Result<Outcome<Exam>, SyncError> {
        let Some(title) = non_empty(&new.title) else {
            return Self::refuse("add exam", "title is required");
        };
        if !(new.max_score.is_finite() && new.max_score > 0.0) {
            return Self::refuse("add exam", "max score must be positive");
        }
        let Some(class_ids) = self.valid_class_ids(&new.class_ids) else {
            return Self::refuse("add exam", "select at least one class");
        };
        let exam = Exam {
            id: new_id(),
            title,
            class_ids,
            max_score: new.max_score,
            results: Vec::new(),
        };
        let owner = session.user_id.as_str();
        self.transact(
            "add exam",
            |store| {
                store.exams.push(exam.clone());
                exam
            },
            |remote, e| {
                remote.insert_exam(
                    owner,
                    &ExamRow {
                        id: e.id.clone(),
                        title: e.title.clone(),
                        class_ids: e.class_ids.clone(),
                        max_score: e.max_score,
                    },
                )
            },
        )
        .map(Outcome::Applied)
    }

    pub fn update_exam(
        &mut self,
        session: &Session,
        exam_id: &str,
        patch: ExamPatch,
    ) -> Result<Outcome<Exam>, SyncError> {
        let title = match patch.title.as_deref() {
            Some(t) => match non_empty(t) {
                Some(t) => Some(t),
                None => return Self::refuse("update exam", "title is required"),
            },
            None => None,
        };
        if let Some(m) = patch.max_score {
            if !(m.is_finite() && m > 0.0) {
                return Self::refuse("update exam", "max score must be positive");
            }
        }
        let patch = ExamPatch {
            title,
            max_score: patch.max_score,
        };
        if patch.title.is_none() && patch.max_score.is_none() {
            return Self::refuse("update exam", "nothing to update");
        }
        if self.store.exam(exam_id).is_none() {
            return Self::refuse("update exam", "unknown exam");
        }
        let owner = session.user_id.as_str();
        let remote_patch = patch.clone();
        self.transact(
            "update exam",
            |store| {
                if let Some(e) = store.exams.iter_mut().find(|e| e.id == exam_id) {
                    if let Some(t) = patch.title {
                        e.title = t;
                    }
                    if let Some(m) = patch.max_score {
                        e.max_score = m;
                    }
                }
            },
            |remote, _| remote.update_exam(owner, exam_id, &remote_patch),
        )?;
        Ok(self
            .store
            .exam(exam_id)
            .cloned()
            .map_or(Outcome::Refused("unknown exam"), Outcome::Applied))
    }

    pub fn delete_exam(&mut self, session: &Session, exam_id: &str) -> Result<Outcome<()>, SyncError> {
        if self.store.exam(exam_id).is_none() {
            return Self::refuse("delete exam", "unknown exam");
        }
        let owner = session.user_id.as_str();
        self.transact(
            "delete exam",
            |store| store.exams.retain(|e| e.id != exam_id),
            |remote, _| remote.delete_exam(owner, exam_id),
        )
        .map(Outcome::Applied)
    }

    pub fn set_exam_score(
        &mut self,
        session: &Session,
        exam_id: &str,
        student_id: &str,
        score: f64,
    ) -> Result<Outcome<ExamResult>, SyncError> {
        if !(score.is_finite() && score >= 0.0) {
            return Self::refuse("update exam score", "score must be a non-negative number");
        }
        if self.store.exam(exam_id).is_none() {
            return Self::refuse("update exam score", "unknown exam");
        }
        if self.store.student(student_id).is_none() {
            return Self::refuse("update exam score", "unknown student");
        }
        let owner = session.user_id.as_str();
        self.transact(
            "update exam score",
            |store| {
                let result = ExamResult {
                    student_id: student_id.to_string(),
                    score,
                };
                if let Some(e) = store.exams.iter_mut().find(|e| e.id == exam_id) {
                    match e.results.iter_mut().find(|r| r.student_id == student_id) {
                        Some(r) => r.score = score,
                        None => e.results.push(result.clone()),
                    }
                }
                result
            },
            |remote, r| {
                remote.upsert_exam_results(
                    owner,
                    &[ExamResultRow {
                        exam_id: exam_id.to_string(),
                        student_id: r.student_id.clone(),
                        score: r.score,
                    }],
                )
            },
        )
        .map(Outcome::Applied)
    }
}

fn fetched<T>(report: &mut LoadReport, table: &'static str, res: Result<Vec<T>, RemoteError>) -> Vec<T> {
    match res {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(table, error = %e, "fetch failed, collection left empty");
            report.fetch_failures.push(FetchFailure {
                table,
                message: e.to_string(),
            });
            Vec::new()
        }
    }
}

fn upsert_submission<'a>(subs: &'a mut Vec<Submission>, student_id: &str) -> &'a mut Submission {
    let idx = match subs.iter().position(|s| s.student_id == student_id) {
        Some(i) => i,
        None => {
            subs.push(Submission {
                student_id: student_id.to_string(),
                submitted: false,
                grade: Some(0.0),
            });
            subs.len() - 1
        }
    };
    &mut subs[idx]
}

/// Applies `delta` to matching students, bumping their versions, and returns
/// the compare-and-swap writes that mirror the change.
fn bump_manual_points(
    store: &mut EntityStore,
    matches: impl Fn(&Student) -> bool,
    delta: f64,
) -> Vec<ManualPointsWrite> {
    let mut writes = Vec::new();
    for s in store.students.iter_mut().filter(|s| matches(s)) {
        writes.push(ManualPointsWrite {
            student_id: s.id.clone(),
            expected_version: s.version,
            manual_points: s.manual_points + delta,
        });
        s.manual_points += delta;
        s.version += 1;
    }
    writes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::SqliteRemote;
    use crate::views;

    fn session() -> Session {
        Session {
            user_id: "teacher-1".into(),
            email: "t@school.org".into(),
            access_token: "tok".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn engine() -> SyncEngine<SqliteRemote> {
        let mut engine = SyncEngine::new(SqliteRemote::open_in_memory().expect("remote"));
        engine.load(&session());
        engine
    }

    fn reject(engine: &SyncEngine<SqliteRemote>, op: &str, table: &str) {
        engine
            .remote()
            .connection()
            .execute_batch(&format!(
                "CREATE TRIGGER reject_{op}_{table} BEFORE {op} ON {table}
                 BEGIN SELECT RAISE(ABORT, 'rejected by row policy'); END;"
            ))
            .expect("create trigger");
    }

    fn first_class(engine: &SyncEngine<SqliteRemote>) -> String {
        engine.store().classes[0].id.clone()
    }

    fn add_student(engine: &mut SyncEngine<SqliteRemote>, class_id: &str, name: &str) -> Student {
        engine
            .add_student(
                &session(),
                NewStudent {
                    class_id: class_id.to_string(),
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .expect("add student")
            .applied()
            .expect("applied")
    }

    fn add_exam(engine: &mut SyncEngine<SqliteRemote>, class_id: &str) -> Exam {
        engine
            .add_exam(
                &session(),
                NewExam {
                    title: "Midterm".into(),
                    max_score: 80.0,
                    class_ids: vec![class_id.to_string()],
                },
            )
            .expect("add exam")
            .applied()
            .expect("applied")
    }

    fn add_assignment(engine: &mut SyncEngine<SqliteRemote>, class_id: &str) -> Assignment {
        engine
            .add_assignment(
                &session(),
                NewAssignment {
                    title: "Math Quiz 1".into(),
                    total_points: 50.0,
                    class_ids: vec![class_id.to_string()],
                },
            )
            .expect("add assignment")
            .applied()
            .expect("applied")
    }

    #[test]
    fn first_load_seeds_default_classes_once() {
        let mut engine = engine();
        let names: Vec<_> = engine.store().classes.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Class 10-A", "Class 10-B", "Class 11-A"]);

        let report = engine.load(&session());
        assert_eq!(report.seeded_classes, 0);
        assert_eq!(engine.store().classes.len(), 3);
    }

    #[test]
    fn failed_fetch_leaves_only_that_collection_empty() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        add_student(&mut engine, &class_id, "Alice");
        engine
            .remote()
            .connection()
            .execute_batch("ALTER TABLE exams RENAME TO exams_gone;")
            .expect("break exams");

        let report = engine.load(&session());
        assert_eq!(report.fetch_failures.len(), 1);
        assert_eq!(report.fetch_failures[0].table, "exams");
        assert!(engine.store().exams.is_empty());
        assert_eq!(engine.store().students.len(), 1);
    }

    #[test]
    fn failed_class_fetch_does_not_seed() {
        let mut engine = SyncEngine::new(SqliteRemote::open_in_memory().expect("remote"));
        engine
            .remote()
            .connection()
            .execute_batch("ALTER TABLE classes RENAME TO classes_gone;")
            .expect("break classes");
        let report = engine.load(&session());
        assert_eq!(report.seeded_classes, 0);
        assert!(engine.store().classes.is_empty());
    }

    #[test]
    fn add_class_rolls_back_on_remote_failure() {
        let mut engine = engine();
        reject(&engine, "INSERT", "classes");
        let before = engine.store().clone();

        let e = engine
            .add_class(&session(), "Class 12-C")
            .expect_err("remote rejects");
        assert!(e.to_string().starts_with("Failed to add class:"));
        assert_eq!(engine.store(), &before);
        assert!(!engine.store().classes.iter().any(|c| c.name == "Class 12-C"));
    }

    #[test]
    fn blank_input_is_refused_without_remote_call() {
        let mut engine = engine();
        reject(&engine, "INSERT", "classes");
        let out = engine.add_class(&session(), "   ").expect("no remote call");
        assert_eq!(out, Outcome::Refused("class name is required"));

        let out = engine
            .add_assignment(
                &session(),
                NewAssignment {
                    title: "Essay".into(),
                    total_points: 100.0,
                    class_ids: vec![],
                },
            )
            .expect("refused");
        assert!(out.applied().is_none());
        assert!(engine.store().assignments.is_empty());
    }

    #[test]
    fn manual_points_plus_submitted_grade() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let quiz = add_assignment(&mut engine, &class_id);

        engine
            .adjust_manual_points(&session(), &alice.id, 10.0)
            .expect("points");
        engine
            .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Submitted(true))
            .expect("submit");
        engine
            .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Grade(45.0))
            .expect("grade");

        let a = engine.store().student(&alice.id).expect("alice");
        assert_eq!(a.points, 55.0);
        assert_eq!(a.assignments_completed, 1);

        // A reload from the remote reproduces the same derived values.
        engine.load(&session());
        let a = engine.store().student(&alice.id).expect("alice");
        assert_eq!(a.points, 55.0);
        assert_eq!(a.manual_points, 10.0);
    }

    #[test]
    fn submission_upsert_is_idempotent() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let quiz = add_assignment(&mut engine, &class_id);

        for _ in 0..2 {
            engine
                .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Grade(30.0))
                .expect("grade");
        }
        let subs = &engine.store().assignment(&quiz.id).expect("quiz").submissions;
        assert_eq!(subs.len(), 1);
        assert_eq!(
            engine.remote().select_submissions("teacher-1").expect("rows").len(),
            1
        );
    }

    #[test]
    fn grade_only_edit_creates_unsubmitted_record() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let quiz = add_assignment(&mut engine, &class_id);

        let sub = engine
            .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Grade(20.0))
            .expect("grade")
            .applied()
            .expect("applied");
        assert!(!sub.submitted);
        assert_eq!(sub.grade, Some(20.0));
        assert_eq!(engine.store().student(&alice.id).expect("alice").points, 0.0);
    }

    #[test]
    fn select_all_keeps_existing_grade_and_defaults_others() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let a = add_student(&mut engine, &class_id, "A");
        let b = add_student(&mut engine, &class_id, "B");
        let c = add_student(&mut engine, &class_id, "C");
        let quiz = add_assignment(&mut engine, &class_id);
        engine
            .set_submission(&session(), &quiz.id, &a.id, SubmissionChange::Grade(40.0))
            .expect("grade");

        let out = engine
            .set_all_submitted(&session(), &quiz.id, &class_id, true)
            .expect("bulk");
        assert_eq!(out, Outcome::Applied(3));

        let quiz = engine.store().assignment(&quiz.id).expect("quiz").clone();
        assert_eq!(quiz.submissions.len(), 3);
        assert!(quiz.submissions.iter().all(|s| s.submitted));
        assert_eq!(quiz.submission(&a.id).and_then(|s| s.grade), Some(40.0));
        assert_eq!(quiz.submission(&b.id).and_then(|s| s.grade), Some(0.0));
        assert_eq!(quiz.submission(&c.id).and_then(|s| s.grade), Some(0.0));
        assert_eq!(engine.store().student(&a.id).expect("a").points, 40.0);
    }

    #[test]
    fn select_all_rolls_back_as_a_unit() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        add_student(&mut engine, &class_id, "A");
        add_student(&mut engine, &class_id, "B");
        let quiz = add_assignment(&mut engine, &class_id);
        reject(&engine, "INSERT", "submissions");
        let before = engine.store().clone();

        engine
            .set_all_submitted(&session(), &quiz.id, &class_id, true)
            .expect_err("rejected");
        assert_eq!(engine.store(), &before);
        assert!(engine
            .remote()
            .select_submissions("teacher-1")
            .expect("rows")
            .is_empty());
    }

    #[test]
    fn delete_student_cascades_locally_and_remotely() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let bob = add_student(&mut engine, &class_id, "Bob");
        let quiz = add_assignment(&mut engine, &class_id);
        let exam = engine
            .add_exam(
                &session(),
                NewExam {
                    title: "Midterm".into(),
                    max_score: 100.0,
                    class_ids: vec![class_id.clone()],
                },
            )
            .expect("exam")
            .applied()
            .expect("applied");
        engine
            .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Submitted(true))
            .expect("submit");
        engine
            .set_exam_score(&session(), &exam.id, &alice.id, 85.0)
            .expect("score");

        engine.delete_student(&session(), &alice.id).expect("delete");
        let store = engine.store();
        assert!(store.student(&alice.id).is_none());
        assert!(store.assignments.iter().all(|a| a.submission(&alice.id).is_none()));
        assert!(store.exams.iter().all(|e| e.result(&alice.id).is_none()));
        let board = views::leaderboard(store);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].id, bob.id);
        assert!(engine
            .remote()
            .select_exam_results("teacher-1")
            .expect("rows")
            .is_empty());
    }

    #[test]
    fn stale_point_write_is_rejected_and_rolled_back() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        engine
            .adjust_manual_points(&session(), &alice.id, 1.0)
            .expect("first delta");

        // Another writer moves the row on.
        engine
            .remote()
            .connection()
            .execute(
                "UPDATE students SET manual_points = 50, version = version + 1 WHERE id = ?",
                [&alice.id],
            )
            .expect("concurrent write");

        let e = engine
            .adjust_manual_points(&session(), &alice.id, 1.0)
            .expect_err("conflict");
        let SyncError::RemoteWrite { source, .. } = e;
        assert!(matches!(source, RemoteError::Conflict { .. }));

        // The stale delta is not applied; the stored value is picked up.
        let a = engine.store().student(&alice.id).expect("alice");
        assert_eq!(a.manual_points, 50.0);
        assert_eq!(a.points, 50.0);

        let a = engine
            .adjust_manual_points(&session(), &alice.id, 1.0)
            .expect("delta after conflict")
            .applied()
            .expect("applied");
        assert_eq!(a.manual_points, 51.0);
        let rows = engine.remote().select_students("teacher-1").expect("rows");
        assert_eq!(rows[0].manual_points, 51.0);

        // Class-wide deltas are not stuck either.
        engine
            .remote()
            .connection()
            .execute(
                "UPDATE students SET version = version + 1 WHERE id = ?",
                [&alice.id],
            )
            .expect("concurrent write");
        engine
            .adjust_class_points(&session(), &class_id, 2.0)
            .expect_err("conflict");
        let out = engine
            .adjust_class_points(&session(), &class_id, 2.0)
            .expect("class delta after conflict");
        assert_eq!(out, Outcome::Applied(1));
        assert_eq!(engine.store().student(&alice.id).expect("alice").points, 53.0);
    }

    #[test]
    fn class_points_apply_to_every_student_or_none() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        add_student(&mut engine, &class_id, "A");
        add_student(&mut engine, &class_id, "B");

        let out = engine
            .adjust_class_points(&session(), &class_id, 5.0)
            .expect("class delta");
        assert_eq!(out, Outcome::Applied(2));
        assert!(engine.store().students.iter().all(|s| s.points == 5.0));

        reject(&engine, "UPDATE", "students");
        let before = engine.store().clone();
        engine
            .adjust_class_points(&session(), &class_id, 5.0)
            .expect_err("rejected");
        assert_eq!(engine.store(), &before);

        let empty_class = engine.store().classes[1].id.clone();
        let out = engine
            .adjust_class_points(&session(), &empty_class, 5.0)
            .expect("refused");
        assert_eq!(out, Outcome::Refused("class has no students"));
    }

    #[test]
    fn update_and_delete_roll_back_on_failure() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let quiz = add_assignment(&mut engine, &class_id);
        reject(&engine, "UPDATE", "assignments");
        reject(&engine, "DELETE", "assignments");

        engine
            .update_assignment(
                &session(),
                &quiz.id,
                AssignmentPatch {
                    title: Some("Renamed".into()),
                    total_points: None,
                },
            )
            .expect_err("update rejected");
        assert_eq!(
            engine.store().assignment(&quiz.id).expect("quiz").title,
            "Math Quiz 1"
        );

        engine
            .delete_assignment(&session(), &quiz.id)
            .expect_err("delete rejected");
        assert!(engine.store().assignment(&quiz.id).is_some());
    }

    #[test]
    fn rename_class_rolls_back_on_failure() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        reject(&engine, "UPDATE", "classes");
        let e = engine
            .rename_class(&session(), &class_id, "Year 7 Maths")
            .expect_err("rename rejected");
        assert!(e.to_string().starts_with("Failed to update class:"));
        assert_eq!(engine.store().class(&class_id).expect("class").name, "Class 10-A");
    }

    #[test]
    fn student_update_and_delete_roll_back_on_failure() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let quiz = add_assignment(&mut engine, &class_id);
        engine
            .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Grade(40.0))
            .expect("grade");
        engine
            .set_submission(&session(), &quiz.id, &alice.id, SubmissionChange::Submitted(true))
            .expect("submit");
        let exam = add_exam(&mut engine, &class_id);
        engine
            .set_exam_score(&session(), &exam.id, &alice.id, 70.0)
            .expect("score");
        let before = engine.store().clone();

        reject(&engine, "UPDATE", "students");
        engine
            .update_student(
                &session(),
                &alice.id,
                StudentPatch {
                    name: Some("Alicia".into()),
                    form_class: None,
                },
            )
            .expect_err("update rejected");
        assert_eq!(engine.store(), &before);

        // The local cascade comes back with the student.
        reject(&engine, "DELETE", "students");
        engine
            .delete_student(&session(), &alice.id)
            .expect_err("delete rejected");
        assert_eq!(engine.store(), &before);
        assert_eq!(engine.store().student(&alice.id).expect("alice").points, 40.0);
        assert_eq!(
            engine.remote().select_submissions("teacher-1").expect("rows").len(),
            1
        );
        assert_eq!(
            engine.remote().select_exam_results("teacher-1").expect("rows").len(),
            1
        );
    }

    #[test]
    fn exam_writes_roll_back_on_failure() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let exam = add_exam(&mut engine, &class_id);
        engine
            .set_exam_score(&session(), &exam.id, &alice.id, 50.0)
            .expect("score");
        let before = engine.store().clone();

        reject(&engine, "INSERT", "exam_results");
        reject(&engine, "UPDATE", "exam_results");
        engine
            .set_exam_score(&session(), &exam.id, &alice.id, 75.0)
            .expect_err("score rejected");
        assert_eq!(engine.store(), &before);

        reject(&engine, "UPDATE", "exams");
        engine
            .update_exam(
                &session(),
                &exam.id,
                ExamPatch {
                    title: None,
                    max_score: Some(40.0),
                },
            )
            .expect_err("update rejected");
        assert_eq!(engine.store(), &before);

        reject(&engine, "DELETE", "exams");
        engine
            .delete_exam(&session(), &exam.id)
            .expect_err("delete rejected");
        assert_eq!(engine.store(), &before);
        assert_eq!(
            engine.remote().select_exam_results("teacher-1").expect("rows")[0].score,
            50.0
        );
    }

    #[test]
    fn rename_class_trims_and_persists() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let c = engine
            .rename_class(&session(), &class_id, "  Year 7 Maths ")
            .expect("rename")
            .applied()
            .expect("applied");
        assert_eq!(c.name, "Year 7 Maths");
        let rows = engine.remote().select_classes("teacher-1").expect("rows");
        assert!(rows.iter().any(|r| r.name == "Year 7 Maths"));
    }

    #[test]
    fn exam_score_upsert_replaces_previous_score() {
        let mut engine = engine();
        let class_id = first_class(&engine);
        let alice = add_student(&mut engine, &class_id, "Alice");
        let exam = engine
            .add_exam(
                &session(),
                NewExam {
                    title: "Final".into(),
                    max_score: 80.0,
                    class_ids: vec![class_id.clone(), class_id.clone()],
                },
            )
            .expect("exam")
            .applied()
            .expect("applied");
        assert_eq!(exam.class_ids.len(), 1);

        engine
            .set_exam_score(&session(), &exam.id, &alice.id, 60.0)
            .expect("score");
        engine
            .set_exam_score(&session(), &exam.id, &alice.id, 72.0)
            .expect("score again");
        let e = engine.store().exam(&exam.id).expect("exam");
        assert_eq!(e.results.len(), 1);
        assert_eq!(e.results[0].score, 72.0);
    }
}
