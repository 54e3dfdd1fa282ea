use std::{env, fs, path::Path, process};

use util::config;

mod runner;

#[tokio::main]
async fn main() {
    let _guard = common::logger::init_logging(
        &config::log_file(),
        &config::log_level(),
        config::log_to_stdout(),
    );

    let db_path = config::database_path();
    let url = format!("sqlite://{}?mode=rwc", db_path);
    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(|s| s.as_str()) {
        Some("clean") => remove_db_file(&db_path),
        Some("fresh") => match remove_db_file(&db_path).and_then(|_| create_db_dir(&db_path)) {
            Ok(()) => runner::run_all_migrations(&url).await,
            Err(e) => Err(e),
        },
        Some("up") | None => match create_db_dir(&db_path) {
            Ok(()) => runner::run_all_migrations(&url).await,
            Err(e) => Err(e),
        },
        Some(other) => Err(format!("Unknown command '{other}'. Expected one of: up, fresh, clean")),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Migration command failed");
        eprintln!("{e}");
        process::exit(1);
    }
}

fn remove_db_file(path: &str) -> Result<(), String> {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).map_err(|e| format!("Failed to delete DB file: {e}"))?;
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
    Ok(())
}

fn create_db_dir(path: &str) -> Result<(), String> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create DB directory: {e}"))?;
    }
    Ok(())
}
