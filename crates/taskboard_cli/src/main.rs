//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskboard_core` linkage.
//! - Optionally open a database file and report its schema version.
//! - Optionally write core logs to a directory given as second argument.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;
use taskboard_core::db::migrations::current_user_version;
use taskboard_core::LoggingConfig;

fn main() -> ExitCode {
    println!("taskboard_core ping={}", taskboard_core::ping());
    println!("taskboard_core version={}", taskboard_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    if let Some(log_dir) = args.next() {
        let config = LoggingConfig {
            log_dir: Some(log_dir),
            ..LoggingConfig::default()
        };
        if let Err(err) = taskboard_core::init_logging(&config) {
            eprintln!("taskboard_core logging error={err}");
            return ExitCode::FAILURE;
        }
    }

    let conn = match taskboard_core::open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("taskboard_core db_open error={err}");
            return ExitCode::FAILURE;
        }
    };
    match current_user_version(&conn) {
        Ok(version) => {
            println!("taskboard_core db={db_path} schema_version={version}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("taskboard_core schema_version error={err}");
            ExitCode::FAILURE
        }
    }
}
