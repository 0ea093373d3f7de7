use env_logger::Env;

/// Install the process-wide logger.
///
/// Defaults to the `info` level; `RUST_LOG` overrides it. Calling this more
/// than once is harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
