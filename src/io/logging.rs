use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::model::LogConfig;

/// Send `tracing` output to the configured log file.
///
/// The terminal belongs to the UI, so nothing is written to stderr. `RUST_LOG`
/// takes precedence over `[log] level`. Failing to open the file leaves
/// logging disabled.
pub fn init_logging(config: &LogConfig) -> Result<(), std::io::Error> {
    let file = open_log_file(&config.file)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, repeated calls) is not an error worth surfacing
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File, std::io::Error> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_log_directory() {
        let tmp = TempDir::new().unwrap();
        let config = LogConfig {
            file: tmp.path().join("logs").join("dms.log"),
            level: "debug".into(),
        };
        init_logging(&config).unwrap();
        assert!(config.file.exists());
    }
}
