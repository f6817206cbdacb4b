use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Output profile chosen by the hosting binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable lines, `studyhub=debug`
    Development,
    /// JSON lines, `studyhub=info`
    Production,
    /// Bare registry; tests install a capture layer instead
    Test,
}

impl Profile {
    fn default_filter(self) -> &'static str {
        match self {
            Profile::Development => "studyhub=debug",
            Profile::Production | Profile::Test => "studyhub=info",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber
///
/// Only the first call has an effect. `RUST_LOG` overrides the profile's
/// default filter.
///
/// ```
/// use studyhub_core::logging_facility::{init, Profile};
///
/// init(Profile::Production);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        match profile {
            Profile::Development => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            Profile::Production => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            Profile::Test => {
                tracing_subscriber::registry().init();
            }
        }
    });
}
