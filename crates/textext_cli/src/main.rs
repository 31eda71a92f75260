//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `textext_core` linkage.
//! - Report which store the environment selects, and why it is unusable if so.

use std::process::ExitCode;
use textext_core::config::ENV_DB_PATH;
use textext_core::{SqliteStore, StoreConfig};

fn main() -> ExitCode {
    println!("textext_core ping={}", textext_core::ping());
    println!("textext_core version={}", textext_core::core_version());

    if let Some(path) = std::env::var(ENV_DB_PATH)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
    {
        return match SqliteStore::open(path.trim()) {
            Ok(_) => {
                println!("store=local path={}", path.trim());
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("store=local status=error error={err}");
                ExitCode::FAILURE
            }
        };
    }

    match StoreConfig::from_env() {
        Ok(config) => {
            println!(
                "store=remote endpoint={} project={} database={}",
                config.base_url(),
                config.project_id,
                config.database_id
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("store=remote status=error error={err}");
            ExitCode::FAILURE
        }
    }
}
