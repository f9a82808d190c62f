//! Logger setup for the command-line tool.
//!
//! The library only emits records through the `log` facade. Attempt outcomes go out at
//! `debug`, exhausted step budgets at `warn` and run summaries at `info`; the binary decides
//! what gets printed by installing an `env_logger` backend here.

use log::LevelFilter;

/// Initialize logging for the CLI.
///
/// Logs at `Debug` if `debug_enabled`, otherwise `Info`. `RUST_LOG`, when set, overrides both.
pub fn init_logger(debug_enabled: bool) {
    let level = if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    // A second initialization (e.g. from tests) keeps the first logger.
    if builder.try_init().is_ok() {
        log::debug!("Logger initialized at {level:?} level");
    }
}
