//! Owner-scoped relational store the sync engine writes through.
//!
//! Every operation takes the owner (user) id, and every statement filters on
//! `user_id`; a write that touches no owned row is `NotFound`. Multi-row
//! writes are all-or-nothing.

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::db;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{table}: {source}")]
    Storage {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{table}: no row {id} for this account")]
    NotFound { table: &'static str, id: String },

    #[error("{table}: row {id} was changed by another write")]
    Conflict { table: &'static str, id: String },

    #[error("{table}: malformed {column}: {message}")]
    Decode {
        table: &'static str,
        column: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "remote_storage",
            Self::NotFound { .. } => "remote_not_found",
            Self::Conflict { .. } => "remote_conflict",
            Self::Decode { .. } => "remote_decode",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Storage { table, .. }
            | Self::NotFound { table, .. }
            | Self::Conflict { table, .. }
            | Self::Decode { table, .. } => table,
        }
    }
}

fn storage(table: &'static str) -> impl Fn(rusqlite::Error) -> RemoteError {
    move |source| RemoteError::Storage { table, source }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: String,
    pub name: String,
    pub class_id: String,
    pub form_class: String,
    pub photo_url: Option<String>,
    pub manual_points: f64,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub id: String,
    pub title: String,
    pub class_ids: Vec<String>,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRow {
    pub assignment_id: String,
    pub student_id: String,
    pub submitted: bool,
    pub grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRow {
    pub id: String,
    pub title: String,
    pub class_ids: Vec<String>,
    pub max_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResultRow {
    pub exam_id: String,
    pub student_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub form_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentPatch {
    pub title: Option<String>,
    pub total_points: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub max_score: Option<f64>,
}

/// Compare-and-swap write of one student's manual points. Succeeds only while
/// the stored version equals `expected_version`; the stored version is then
/// bumped by one.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualPointsWrite {
    pub student_id: String,
    pub expected_version: i64,
    pub manual_points: f64,
}

pub trait RemoteStore {
    fn select_classes(&self, owner: &str) -> Result<Vec<ClassRow>, RemoteError>;
    fn insert_classes(&self, owner: &str, rows: &[ClassRow]) -> Result<(), RemoteError>;
    fn update_class_name(&self, owner: &str, id: &str, name: &str) -> Result<(), RemoteError>;

    fn select_students(&self, owner: &str) -> Result<Vec<StudentRow>, RemoteError>;
    fn insert_student(&self, owner: &str, row: &StudentRow) -> Result<(), RemoteError>;
    fn update_student(&self, owner: &str, id: &str, patch: &StudentPatch)
        -> Result<(), RemoteError>;
    fn write_manual_points(
        &self,
        owner: &str,
        writes: &[ManualPointsWrite],
    ) -> Result<(), RemoteError>;
    /// Also removes the student's submissions and exam results.
    fn delete_student(&self, owner: &str, id: &str) -> Result<(), RemoteError>;

    fn select_assignments(&self, owner: &str) -> Result<Vec<AssignmentRow>, RemoteError>;
    fn insert_assignment(&self, owner: &str, row: &AssignmentRow) -> Result<(), RemoteError>;
    fn update_assignment(
        &self,
        owner: &str,
        id: &str,
        patch: &AssignmentPatch,
    ) -> Result<(), RemoteError>;
    fn delete_assignment(&self, owner: &str, id: &str) -> Result<(), RemoteError>;

    fn select_submissions(&self, owner: &str) -> Result<Vec<SubmissionRow>, RemoteError>;
    /// Upsert on `(assignment_id, student_id)`.
    fn upsert_submissions(&self, owner: &str, rows: &[SubmissionRow]) -> Result<(), RemoteError>;

    fn select_exams(&self, owner: &str) -> Result<Vec<ExamRow>, RemoteError>;
    fn insert_exam(&self, owner: &str, row: &ExamRow) -> Result<(), RemoteError>;
    fn update_exam(&self, owner: &str, id: &str, patch: &ExamPatch) -> Result<(), RemoteError>;
    fn delete_exam(&self, owner: &str, id: &str) -> Result<(), RemoteError>;

    fn select_exam_results(&self, owner: &str) -> Result<Vec<ExamResultRow>, RemoteError>;
    /// Upsert on `(exam_id, student_id)`.
    fn upsert_exam_results(&self, owner: &str, rows: &[ExamResultRow])
        -> Result<(), RemoteError>;
}

pub struct SqliteRemote {
    conn: Connection,
}

impl SqliteRemote {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin(&self, table: &'static str) -> Result<Transaction<'_>, RemoteError> {
        self.conn.unchecked_transaction().map_err(storage(table))
    }
}

fn owned(
    conn: &Connection,
    table: &'static str,
    id: &str,
    owner: &str,
) -> Result<bool, RemoteError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ? AND user_id = ?", table);
    let hit: Option<i64> = conn
        .query_row(&sql, (id, owner), |r| r.get(0))
        .optional()
        .map_err(storage(table))?;
    Ok(hit.is_some())
}

fn require_owned(
    conn: &Connection,
    table: &'static str,
    id: &str,
    owner: &str,
) -> Result<(), RemoteError> {
    if owned(conn, table, id, owner)? {
        Ok(())
    } else {
        Err(RemoteError::NotFound {
            table,
            id: id.to_string(),
        })
    }
}

fn expect_changed(changed: usize, table: &'static str, id: &str) -> Result<(), RemoteError> {
    if changed == 0 {
        return Err(RemoteError::NotFound {
            table,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn encode_class_ids(table: &'static str, ids: &[String]) -> Result<String, RemoteError> {
    serde_json::to_string(ids).map_err(|e| RemoteError::Decode {
        table,
        column: "class_ids",
        message: e.to_string(),
    })
}

fn decode_class_ids(table: &'static str, raw: &str) -> Result<Vec<String>, RemoteError> {
    serde_json::from_str(raw).map_err(|e| RemoteError::Decode {
        table,
        column: "class_ids",
        message: e.to_string(),
    })
}

impl RemoteStore for SqliteRemote {
    fn select_classes(&self, owner: &str) -> Result<Vec<ClassRow>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM classes WHERE user_id = ? ORDER BY rowid")
            .map_err(storage("classes"))?;
        let rows = stmt
            .query_map([owner], |row| {
                Ok(ClassRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(storage("classes"))?;
        Ok(rows)
    }

    fn insert_classes(&self, owner: &str, rows: &[ClassRow]) -> Result<(), RemoteError> {
        let tx = self.begin("classes")?;
        for row in rows {
            tx.execute(
                "INSERT INTO classes(id, user_id, name) VALUES(?, ?, ?)",
                (&row.id, owner, &row.name),
            )
            .map_err(storage("classes"))?;
        }
        tx.commit().map_err(storage("classes"))
    }

    fn update_class_name(&self, owner: &str, id: &str, name: &str) -> Result<(), RemoteError> {
        let changed = self
            .conn
            .execute(
                "UPDATE classes SET name = ? WHERE id = ? AND user_id = ?",
                (name, id, owner),
            )
            .map_err(storage("classes"))?;
        expect_changed(changed, "classes", id)
    }

    fn select_students(&self, owner: &str) -> Result<Vec<StudentRow>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, class_id, form_class, photo_url, manual_points, version
                 FROM students
                 WHERE user_id = ?
                 ORDER BY rowid",
            )
            .map_err(storage("students"))?;
        let rows = stmt
            .query_map([owner], |row| {
                Ok(StudentRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    class_id: row.get(2)?,
                    form_class: row.get(3)?,
                    photo_url: row.get(4)?,
                    manual_points: row.get(5)?,
                    version: row.get(6)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(storage("students"))?;
        Ok(rows)
    }

    fn insert_student(&self, owner: &str, row: &StudentRow) -> Result<(), RemoteError> {
        require_owned(&self.conn, "classes", &row.class_id, owner)?;
        self.conn
            .execute(
                "INSERT INTO students(id, user_id, class_id, name, form_class, photo_url, manual_points, version)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    &row.id,
                    owner,
                    &row.class_id,
                    &row.name,
                    &row.form_class,
                    &row.photo_url,
                    row.manual_points,
                    row.version,
                ),
            )
            .map_err(storage("students"))?;
        Ok(())
    }

    fn update_student(
        &self,
        owner: &str,
        id: &str,
        patch: &StudentPatch,
    ) -> Result<(), RemoteError> {
        let changed = self
            .conn
            .execute(
                "UPDATE students
                 SET name = COALESCE(?, name),
                     form_class = COALESCE(?, form_class)
                 WHERE id = ? AND user_id = ?",
                (&patch.name, &patch.form_class, id, owner),
            )
            .map_err(storage("students"))?;
        expect_changed(changed, "students", id)
    }

    fn write_manual_points(
        &self,
        owner: &str,
        writes: &[ManualPointsWrite],
    ) -> Result<(), RemoteError> {
        let tx = self.begin("students")?;
        for w in writes {
            let changed = tx
                .execute(
                    "UPDATE students
                     SET manual_points = ?, version = version + 1
                     WHERE id = ? AND user_id = ? AND version = ?",
                    (w.manual_points, &w.student_id, owner, w.expected_version),
                )
                .map_err(storage("students"))?;
            if changed == 0 {
                // Distinguish a stale version from a missing row.
                return Err(if owned(&tx, "students", &w.student_id, owner)? {
                    RemoteError::Conflict {
                        table: "students",
                        id: w.student_id.clone(),
                    }
                } else {
                    RemoteError::NotFound {
                        table: "students",
                        id: w.student_id.clone(),
                    }
                });
            }
        }
        tx.commit().map_err(storage("students"))
    }

    fn delete_student(&self, owner: &str, id: &str) -> Result<(), RemoteError> {
        let tx = self.begin("students")?;
        require_owned(&tx, "students", id, owner)?;

        // Explicitly delete in dependency order (no ON DELETE CASCADE).
        tx.execute(
            "DELETE FROM submissions WHERE student_id = ? AND user_id = ?",
            (id, owner),
        )
        .map_err(storage("submissions"))?;
        tx.execute(
            "DELETE FROM exam_results WHERE student_id = ? AND user_id = ?",
            (id, owner),
        )
        .map_err(storage("exam_results"))?;
        let changed = tx
            .execute(
                "DELETE FROM students WHERE id = ? AND user_id = ?",
                (id, owner),
            )
            .map_err(storage("students"))?;
        expect_changed(changed, "students", id)?;
        tx.commit().map_err(storage("students"))
    }

    fn select_assignments(&self, owner: &str) -> Result<Vec<AssignmentRow>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, class_ids, total_points
                 FROM assignments
                 WHERE user_id = ?
                 ORDER BY rowid",
            )
            .map_err(storage("assignments"))?;
        let raw = stmt
            .query_map([owner], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(storage("assignments"))?;
        raw.into_iter()
            .map(|(id, title, class_ids, total_points)| {
                Ok(AssignmentRow {
                    id,
                    title,
                    class_ids: decode_class_ids("assignments", &class_ids)?,
                    total_points,
                })
            })
            .collect()
    }

    fn insert_assignment(&self, owner: &str, row: &AssignmentRow) -> Result<(), RemoteError> {
        let class_ids = encode_class_ids("assignments", &row.class_ids)?;
        self.conn
            .execute(
                "INSERT INTO assignments(id, user_id, title, class_ids, total_points)
                 VALUES(?, ?, ?, ?, ?)",
                (&row.id, owner, &row.title, class_ids, row.total_points),
            )
            .map_err(storage("assignments"))?;
        Ok(())
    }

    fn update_assignment(
        &self,
        owner: &str,
        id: &str,
        patch: &AssignmentPatch,
    ) -> Result<(), RemoteError> {
        let changed = self
            .conn
            .execute(
                "UPDATE assignments
                 SET title = COALESCE(?, title),
                     total_points = COALESCE(?, total_points)
                 WHERE id = ? AND user_id = ?",
                (&patch.title, patch.total_points, id, owner),
            )
            .map_err(storage("assignments"))?;
        expect_changed(changed, "assignments", id)
    }

    fn delete_assignment(&self, owner: &str, id: &str) -> Result<(), RemoteError> {
        let tx = self.begin("assignments")?;
        require_owned(&tx, "assignments", id, owner)?;
        tx.execute(
            "DELETE FROM submissions WHERE assignment_id = ? AND user_id = ?",
            (id, owner),
        )
        .map_err(storage("submissions"))?;
        let changed = tx
            .execute(
                "DELETE FROM assignments WHERE id = ? AND user_id = ?",
                (id, owner),
            )
            .map_err(storage("assignments"))?;
        expect_changed(changed, "assignments", id)?;
        tx.commit().map_err(storage("assignments"))
    }

    fn select_submissions(&self, owner: &str) -> Result<Vec<SubmissionRow>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT assignment_id, student_id, submitted, grade
                 FROM submissions
                 WHERE user_id = ?
                 ORDER BY rowid",
            )
            .map_err(storage("submissions"))?;
        let rows = stmt
            .query_map([owner], |row| {
                Ok(SubmissionRow {
                    assignment_id: row.get(0)?,
                    student_id: row.get(1)?,
                    submitted: row.get::<_, i64>(2)? != 0,
                    grade: row.get(3)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(storage("submissions"))?;
        Ok(rows)
    }

    fn upsert_submissions(&self, owner: &str, rows: &[SubmissionRow]) -> Result<(), RemoteError> {
        let tx = self.begin("submissions")?;
        let mut checked_assignments: HashSet<&str> = HashSet::new();
        for row in rows {
            if checked_assignments.insert(row.assignment_id.as_str()) {
                require_owned(&tx, "assignments", &row.assignment_id, owner)?;
            }
            require_owned(&tx, "students", &row.student_id, owner)?;
            tx.execute(
                "INSERT INTO submissions(assignment_id, student_id, user_id, submitted, grade)
                 VALUES(?, ?, ?, ?, ?)
                 ON CONFLICT(assignment_id, student_id) DO UPDATE SET
                   submitted = excluded.submitted,
                   grade = excluded.grade",
                (
                    &row.assignment_id,
                    &row.student_id,
                    owner,
                    row.submitted as i64,
                    row.grade,
                ),
            )
            .map_err(storage("submissions"))?;
        }
        tx.commit().map_err(storage("submissions"))
    }

    fn select_exams(&self, owner: &str) -> Result<Vec<ExamRow>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, class_ids, max_score
                 FROM exams
                 WHERE user_id = ?
                 ORDER BY rowid",
            )
            .map_err(storage("exams"))?;
        let raw = stmt
            .query_map([owner], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(storage("exams"))?;
        raw.into_iter()
            .map(|(id, title, class_ids, max_score)| {
                Ok(ExamRow {
                    id,
                    title,
                    class_ids: decode_class_ids("exams", &class_ids)?,
                    max_score,
                })
            })
            .collect()
    }

    fn insert_exam(&self, owner: &str, row: &ExamRow) -> Result<(), RemoteError> {
        let class_ids = encode_class_ids("exams", &row.class_ids)?;
        self.conn
            .execute(
                "INSERT INTO exams(id, user_id, title, class_ids, max_score)
                 VALUES(?, ?, ?, ?, ?)",
                (&row.id, owner, &row.title, class_ids, row.max_score),
            )
            .map_err(storage("exams"))?;
        Ok(())
    }

    fn update_exam(&self, owner: &str, id: &str, patch: &ExamPatch) -> Result<(), RemoteError> {
        let changed = self
            .conn
            .execute(
                "UPDATE exams
                 SET title = COALESCE(?, title),
                     max_score = COALESCE(?, max_score)
                 WHERE id = ? AND user_id = ?",
                (&patch.title, patch.max_score, id, owner),
            )
            .map_err(storage("exams"))?;
        expect_changed(changed, "exams", id)
    }

    fn delete_exam(&self, owner: &str, id: &str) -> Result<(), RemoteError> {
        let tx = self.begin("exams")?;
        require_owned(&tx, "exams", id, owner)?;
        tx.execute(
            "DELETE FROM exam_results WHERE exam_id = ? AND user_id = ?",
            (id, owner),
        )
        .map_err(storage("exam_results"))?;
        let changed = tx
            .execute("DELETE FROM exams WHERE id = ? AND user_id = ?", (id, owner))
            .map_err(storage("exams"))?;
        expect_changed(changed, "exams", id)?;
        tx.commit().map_err(storage("exams"))
    }

    fn select_exam_results(&self, owner: &str) -> Result<Vec<ExamResultRow>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT exam_id, student_id, score
                 FROM exam_results
                 WHERE user_id = ?
                 ORDER BY rowid",
            )
            .map_err(storage("exam_results"))?;
        let rows = stmt
            .query_map([owner], |row| {
                Ok(ExamResultRow {
                    exam_id: row.get(0)?,
                    student_id: row.get(1)?,
                    score: row.get(2)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(storage("exam_results"))?;
        Ok(rows)
    }

    fn upsert_exam_results(
        &self,
        owner: &str,
        rows: &[ExamResultRow],
    ) -> Result<(), RemoteError> {
        let tx = self.begin("exam_results")?;
        for row in rows {
            require_owned(&tx, "exams", &row.exam_id, owner)?;
            require_owned(&tx, "students", &row.student_id, owner)?;
            tx.execute(
                "INSERT INTO exam_results(exam_id, student_id, user_id, score)
                 VALUES(?, ?, ?, ?)
                 ON CONFLICT(exam_id, student_id) DO UPDATE SET score = excluded.score",
                (&row.exam_id, &row.student_id, owner, row.score),
            )
            .map_err(storage("exam_results"))?;
        }
        tx.commit().map_err(storage("exam_results"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteRemote {
        let remote = SqliteRemote::open_in_memory().expect("open");
        remote
            .insert_classes(
                "u1",
                &[ClassRow {
                    id: "c1".into(),
                    name: "Class 10-A".into(),
                }],
            )
            .expect("insert class");
        remote
            .insert_student(
                "u1",
                &StudentRow {
                    id: "s1".into(),
                    name: "Alice".into(),
                    class_id: "c1".into(),
                    form_class: "7B".into(),
                    photo_url: None,
                    manual_points: 0.0,
                    version: 0,
                },
            )
            .expect("insert student");
        remote
            .insert_assignment(
                "u1",
                &AssignmentRow {
                    id: "a1".into(),
                    title: "Quiz".into(),
                    class_ids: vec!["c1".into()],
                    total_points: 50.0,
                },
            )
            .expect("insert assignment");
        remote
    }

    #[test]
    fn rows_are_scoped_to_owner() {
        let remote = seeded();
        assert_eq!(remote.select_classes("u1").expect("select").len(), 1);
        assert!(remote.select_classes("u2").expect("select").is_empty());
        let e = remote
            .update_class_name("u2", "c1", "Stolen")
            .expect_err("other owner");
        assert!(matches!(e, RemoteError::NotFound { table: "classes", .. }));
    }

    #[test]
    fn submission_upsert_keeps_one_row_per_pair() {
        let remote = seeded();
        let row = SubmissionRow {
            assignment_id: "a1".into(),
            student_id: "s1".into(),
            submitted: true,
            grade: Some(40.0),
        };
        remote.upsert_submissions("u1", &[row.clone()]).expect("first");
        remote
            .upsert_submissions(
                "u1",
                &[SubmissionRow {
                    grade: Some(45.0),
                    ..row
                }],
            )
            .expect("second");
        let subs = remote.select_submissions("u1").expect("select");
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].grade, Some(45.0));
    }

    #[test]
    fn manual_points_write_detects_stale_version() {
        let remote = seeded();
        let write = ManualPointsWrite {
            student_id: "s1".into(),
            expected_version: 0,
            manual_points: 5.0,
        };
        remote
            .write_manual_points("u1", &[write.clone()])
            .expect("first write");
        let e = remote
            .write_manual_points("u1", &[write])
            .expect_err("stale version");
        assert!(matches!(e, RemoteError::Conflict { .. }));
        let students = remote.select_students("u1").expect("select");
        assert_eq!(students[0].manual_points, 5.0);
        assert_eq!(students[0].version, 1);
    }

    #[test]
    fn deleting_student_removes_dependents() {
        let remote = seeded();
        remote
            .upsert_submissions(
                "u1",
                &[SubmissionRow {
                    assignment_id: "a1".into(),
                    student_id: "s1".into(),
                    submitted: true,
                    grade: Some(10.0),
                }],
            )
            .expect("upsert");
        remote
            .insert_exam(
                "u1",
                &ExamRow {
                    id: "e1".into(),
                    title: "Midterm".into(),
                    class_ids: vec!["c1".into()],
                    max_score: 100.0,
                },
            )
            .expect("exam");
        remote
            .upsert_exam_results(
                "u1",
                &[ExamResultRow {
                    exam_id: "e1".into(),
                    student_id: "s1".into(),
                    score: 80.0,
                }],
            )
            .expect("result");

        remote.delete_student("u1", "s1").expect("delete");
        assert!(remote.select_students("u1").expect("students").is_empty());
        assert!(remote.select_submissions("u1").expect("subs").is_empty());
        assert!(remote.select_exam_results("u1").expect("results").is_empty());
    }

    #[test]
    fn class_ids_roundtrip_through_json_column() {
        let remote = seeded();
        let rows = remote.select_assignments("u1").expect("select");
        assert_eq!(rows[0].class_ids, vec!["c1".to_string()]);
    }
}
