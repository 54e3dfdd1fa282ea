pub mod models;
pub mod test_utils;

use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;
use std::str::FromStr;
use util::config;

pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let path_or_url = config::database_path();
    // A DSN is used as-is; anything else is a SQLite file path.
    let url = if path_or_url.starts_with("sqlite:") {
        path_or_url
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(&path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    tracing::info!(url = %url, "Connecting to database");
    Database::connect(&url).await
}

/// Decimals are stored as their display text to keep exact precision.
pub(crate) fn decimal_text(value: Decimal) -> String {
    value.to_string()
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, DbErr> {
    Decimal::from_str(raw.trim())
        .map_err(|e| DbErr::Custom(format!("Invalid decimal '{raw}' in {column}: {e}")))
}
