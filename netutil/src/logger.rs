/// Intercept messages using the `log` crate and print them to STDERR, defaulting to the `info`
/// level. `RUST_LOG` overrides the filter. Calling this more than once is harmless, so tests can
/// each call it.
pub fn setup() {
    use env_logger::{Builder, Env};
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}
