use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202510010001_create_module_contents::Migration),
            Box::new(migrations::m202510010002_create_assignments::Migration),
            Box::new(migrations::m202510010003_create_quizzes::Migration),
            Box::new(migrations::m202510010004_create_grading_configs::Migration),
            Box::new(migrations::m202510010005_create_submissions::Migration),
            Box::new(migrations::m202510010006_create_grade_records::Migration),
        ]
    }
}
