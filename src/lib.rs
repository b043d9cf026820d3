pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod output;
pub mod poll;
pub mod scan;
pub mod value;

mod util;

pub use client::{Request, Session};
pub use config::Settings;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use output::{Output, OutputEvent, OutputFormat, OutputOptions};
pub use poll::Poller;
pub use scan::{ScanPlan, ScanResult, WindowResult};

/// Initialize the `log` backend used by the scanner, session and poller.
///
/// `RUST_LOG` takes precedence. Without it the level is `debug` in verbose mode and `warn`
/// otherwise. Calling this more than once is harmless.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
