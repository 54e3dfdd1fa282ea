pub mod assignment;
pub mod grade_record;
pub mod grading_config;
pub mod module_content;
pub mod quiz;
pub mod submission;

pub use assignment::Entity as Assignment;
pub use grade_record::Entity as GradeRecord;
pub use grading_config::Entity as GradingConfig;
pub use module_content::Entity as ModuleContent;
pub use quiz::Entity as Quiz;
pub use submission::Entity as Submission;
