use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log to stderr so stdout stays free for command output. `RUST_LOG`
/// overrides the default level (`info`, or `debug` with `--verbose`).
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false);

    // A second call (tests, embedding callers) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
