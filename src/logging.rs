//! `tracing` initialization: `READERFORGE_LOG` wins over `RUST_LOG`, falling
//! back to `info` when neither is set. `verbose` selects a more detailed
//! formatter for interactive debugging; the default is compact, one line
//! per event.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env("READERFORGE_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if verbose {
        builder.with_target(true).with_line_number(true).init();
    } else {
        builder.with_target(false).without_time().compact().init();
    }
}
