pub mod assignments;
pub mod auth;
pub mod classes;
pub mod core;
pub mod dashboard;
pub mod exams;
pub mod picker;
pub mod setup;
pub mod students;
