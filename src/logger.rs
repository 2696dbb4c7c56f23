use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set; each `-v` opens one more level.
pub fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("grade_stats={level}")
}

/// Installs the global subscriber, writing to stderr so stdout keeps only the
/// report. A second call is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_directive(0), "grade_stats=warn");
        assert_eq!(default_directive(2), "grade_stats=debug");
        assert_eq!(default_directive(9), "grade_stats=trace");
    }

    #[test]
    fn init_twice() {
        init(0);
        init(1);
    }
}
