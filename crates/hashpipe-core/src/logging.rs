//! Logging setup on top of env_logger

/// Padded label for a log level.
fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

/// Default filter for the given verbosity flags (`RUST_LOG` still wins).
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging.
///
/// Safe to call more than once; only the first call installs a logger, so
/// tests and embedding applications can call it freely.
pub fn init_logging(quiet: bool, debug: bool) {
    use std::io::Write;

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level(quiet, debug)),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            level_label(record.level()),
            record.target(),
            record.args()
        )
    })
    .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_overrides_quiet() {
        assert_eq!(default_level(true, true), "debug");
        assert_eq!(default_level(true, false), "warn");
        assert_eq!(default_level(false, false), "info");
    }

    #[test]
    fn labels_are_aligned() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(level_label(level).len(), 5);
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(true, false);
        init_logging(false, true);
    }
}
