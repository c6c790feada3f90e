use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::{Directive, LevelFilter};

/// `level` of the `[logging]` section, e.g. `info` or `DEBUG`.
///
/// Only a bare level is accepted here. Per-target directives go through
/// `RUST_LOG` or the `--tracing-env-filter` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogLevel(pub LevelFilter);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid log level {0:?}, expected off, error, warn, info, debug or trace")]
pub struct InvalidLogLevel(String);

impl FromStr for LogLevel {
    type Err = InvalidLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // LevelFilter reads "" as ERROR.
        if trimmed.is_empty() {
            return Err(InvalidLogLevel(s.to_string()));
        }
        trimmed
            .parse::<LevelFilter>()
            .map(Self)
            .map_err(|_| InvalidLogLevel(s.to_string()))
    }
}

impl TryFrom<String> for LogLevel {
    type Error = InvalidLogLevel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<LogLevel> for Directive {
    fn from(level: LogLevel) -> Self {
        level.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_levels_only() {
        for (raw, expected) in [
            ("TRACE", LevelFilter::TRACE),
            ("Debug", LevelFilter::DEBUG),
            (" info ", LevelFilter::INFO),
            ("warN", LevelFilter::WARN),
            ("eRRoR", LevelFilter::ERROR),
            ("off", LevelFilter::OFF),
        ] {
            assert_eq!(raw.parse::<LogLevel>().unwrap(), LogLevel(expected), "{raw}");
        }

        for raw in ["anything", "pubky_naming=debug", "", "   "] {
            let err = raw.parse::<LogLevel>().unwrap_err();
            assert_eq!(err, InvalidLogLevel(raw.to_string()));
        }
    }

    #[test]
    fn toml_round_trip() {
        #[derive(Debug, Deserialize, Serialize)]
        struct Logging {
            level: LogLevel,
        }
        let logging: Logging = toml::from_str(r#"level = "DEBUG""#).unwrap();
        assert_eq!(logging.level, LogLevel(LevelFilter::DEBUG));
        assert_eq!(toml::to_string(&logging).unwrap().trim(), r#"level = "debug""#);

        assert!(toml::from_str::<Logging>(r#"level = "loud""#).is_err());
        assert!(toml::from_str::<Logging>(r#"level = """#).is_err());
    }
}
