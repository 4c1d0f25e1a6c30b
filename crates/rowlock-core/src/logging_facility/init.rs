//! Logging initialization module

use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

use crate::errors::{ExError, ExErrorKind};

const DEFAULT_DIRECTIVES: &str = "rowlock=info,rowlock_core=info,rowlock_store=info";

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable lines for a terminal
    Development,
    /// JSON structured output
    Production,
    /// Test capture mode; see `init_test_capture`
    Test,
}

impl FromStr for Profile {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" | "json" => Ok(Profile::Production),
            "test" => Ok(Profile::Test),
            other => Err(ExError::new(ExErrorKind::Configuration)
                .with_op("parse_log_profile")
                .with_message(format!("Unknown logging profile '{}'", other))),
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Call once at startup; later calls are no-ops. `RUST_LOG` overrides the
/// default filter.
///
/// # Profiles
///
/// - **Development**: compact human-readable lines at info
/// - **Production**: JSON lines at info
/// - **Test**: installs the in-memory recorder from `init_test_capture`
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .compact()
                .with_target(false)
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
                )
                .init();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
                )
                .init();
        }
        Profile::Test => {
            super::test_capture::init_test_capture();
        }
    });
}
