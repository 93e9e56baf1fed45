use std::io::Write;

/// Initialises `env_logger`. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {:<5} {}] {}",
            buf.timestamp_millis(),
            record.level(),
            record.target(),
            record.args()
        )
    });
    // Tests and library callers may have installed a logger already.
    let _ = builder.try_init();
}
