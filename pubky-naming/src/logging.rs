//!
//! Initialize tracing logs from the `[logging]` config section.
//!
//! Called before anything else runs so config loading errors are logged too.
//!

use tracing_subscriber::EnvFilter;

use crate::repo::{DataDir, NodeConfig};

/// Build the filter. `RUST_LOG` wins over `directives`, which win over the config level.
fn env_filter(config: &NodeConfig, directives: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new("").add_directive(config.logging.level.into()),
    }
}

/// Initialize the tracing logger with `directives` or the configured level.
pub fn init_tracing_logs(config: &NodeConfig, directives: Option<&str>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config, directives))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
    Ok(())
}

/// Same as [`init_tracing_logs`] but reads the config from `data_dir`.
/// Falls back to the defaults if the config can't be read.
pub fn init_tracing_logs_from_data_dir(
    data_dir: &DataDir,
    directives: Option<&str>,
) -> anyhow::Result<()> {
    let config = match NodeConfig::from_file(data_dir.config_file_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read config, logging with defaults: {}", e);
            NodeConfig::default()
        }
    };
    init_tracing_logs(&config, directives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::LogLevel;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn filter_from_config_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let mut config = NodeConfig::default();
        config.logging.level = LogLevel(LevelFilter::WARN);
        let filter = env_filter(&config, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = env_filter(&config, Some("pubky_naming=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
