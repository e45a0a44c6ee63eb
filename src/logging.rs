use std::path::Path;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Keeps the file writers alive; dropping it flushes pending lines
pub struct LogGuards {
    _combined: WorkerGuard,
    _errors: WorkerGuard,
}

/// Console output plus daily-rotated `combined.log` and an ERROR-only
/// `error.log` under `log_dir`
pub fn subscriber(
    level: Level,
    log_dir: &Path,
) -> (impl Subscriber + Send + Sync + 'static, LogGuards) {
    let (combined, combined_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "combined.log"));
    let (errors, errors_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "error.log"));

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().with_filter(LevelFilter::from_level(level)))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(combined)
                .with_filter(LevelFilter::from_level(level)),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(errors)
                .with_filter(LevelFilter::ERROR),
        );

    let guards = LogGuards {
        _combined: combined_guard,
        _errors: errors_guard,
    };
    (subscriber, guards)
}

/// Install [`subscriber`] as the global default
pub fn init(level: Level, log_dir: &Path) -> LogGuards {
    let (subscriber, guards) = subscriber(level, log_dir);
    subscriber.init();
    guards
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_logs(dir: &Path, prefix: &str) -> String {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
            })
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect()
    }

    #[test]
    fn test_error_file_only_gets_errors() {
        let dir = TempDir::new().unwrap();
        let (subscriber, guards) = subscriber(Level::INFO, dir.path());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("recording started in lounge");
            tracing::error!("upload failed for lounge");
            tracing::debug!("spool write of 4096 bytes");
        });
        drop(guards);

        let combined = read_logs(dir.path(), "combined.log");
        assert!(combined.contains("recording started in lounge"));
        assert!(combined.contains("upload failed for lounge"));
        assert!(!combined.contains("spool write"));

        let errors = read_logs(dir.path(), "error.log");
        assert!(errors.contains("upload failed for lounge"));
        assert!(!errors.contains("recording started"));
    }
}
