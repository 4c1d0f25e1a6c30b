//! RowLock CLI
//!
//! Runs one transaction-interception experiment against the store named by
//! the `DB_*` environment variables and exits. Takes no options.

use clap::Parser;
use rowlock_core::logging_facility::{init, Profile};
use rowlock_core::{experiment, ExError, ExErrorKind, ExperimentTiming};
use rowlock_store::config::load_dotenv;
use rowlock_store::{open_store, StoreConfig};

const ENV_LOG_PROFILE: &str = "ROWLOCK_LOG";

#[derive(Debug, Parser)]
#[command(name = "rowlock", version)]
#[command(
    about = "Race a held row update against two delayed interceptors",
    long_about = "Seeds rows 'john' and 'jane', holds john's row in an open transaction \
                  and runs a conditional update on each row while it is held.\n\n\
                  Configured through DB_BACKEND, DB_USER, DB_PASS, DB_HOST, DB_NAME \
                  and ROWLOCK_LOG (environment or .env). DB_BACKEND defaults to \
                  postgres; sqlite locks the whole database and cannot show the \
                  free row being updated during the hold."
)]
struct Cli {}

/// The recorder behind `Profile::Test` never prints, so it is not offered here
fn log_profile() -> Result<Profile, ExError> {
    let profile = match std::env::var(ENV_LOG_PROFILE) {
        Ok(raw) if !raw.trim().is_empty() => raw.parse::<Profile>()?,
        _ => Profile::Development,
    };
    if profile == Profile::Test {
        return Err(ExError::new(ExErrorKind::Configuration)
            .with_op("parse_log_profile")
            .with_message(format!(
                "{}=test only records in memory; use development or production",
                ENV_LOG_PROFILE
            )));
    }
    Ok(profile)
}

fn execute() -> Result<(), ExError> {
    // .env may set ROWLOCK_LOG, so it is read before logging starts
    let dotenv = load_dotenv();
    init(log_profile()?);
    if let Some(path) = &dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let config = StoreConfig::from_process_env()?;

    let store = open_store(&config)?;
    let report = experiment::run(store.as_ref(), &ExperimentTiming::default());
    tracing::debug!(run_id = %report.run_id, clean = report.is_clean(), "run finished");
    Ok(())
}

fn main() {
    let _cli = Cli::parse();

    if let Err(e) = execute() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
