//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when it is set. Otherwise the binary's own crate logs at
/// `default_level` and everything else at `info`.
///
/// # Arguments
///
/// * `bin_name` - Name of the running binary (usually `env!("CARGO_BIN_NAME")`)
/// * `default_level` - Level for the binary's own targets when `RUST_LOG` is unset
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(bin_name, default_level)));

    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(true);

    // try_init: integration tests may spin up several servers in one process
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();
}

/// Build the fallback filter directives for `bin_name`.
fn default_directives(bin_name: &str, default_level: &str) -> String {
    let crate_target = bin_name.replace('-', "_");
    format!("info,{crate_target}={default_level},tower_http=info")
}
