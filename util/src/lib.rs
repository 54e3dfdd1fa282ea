pub mod clock;
pub mod config;
pub mod grading_options;
pub mod test_helpers;
