pub mod m202510010001_create_module_contents;
pub mod m202510010002_create_assignments;
pub mod m202510010003_create_quizzes;
pub mod m202510010004_create_grading_configs;
pub mod m202510010005_create_submissions;
pub mod m202510010006_create_grade_records;
