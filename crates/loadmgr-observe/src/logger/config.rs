use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// Environment variable holding the `EnvFilter` directive.
pub const ENV_LEVEL: &str = "LOADMGR_LOG";
/// Environment variable holding the output format (`text|json|journald`).
pub const ENV_FORMAT: &str = "LOADMGR_LOG_FORMAT";
/// Environment variable enabling per-run span timings (`1`, `true`, `yes` or `on`).
pub const ENV_RUN_TIMINGS: &str = "LOADMGR_LOG_RUN_TIMINGS";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
    /// Log a line with busy/idle time when each executor run ends.
    pub run_timings: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
            run_timings: false,
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by [`ENV_LEVEL`] and [`ENV_FORMAT`].
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for [`ENV_LEVEL`] and [`ENV_FORMAT`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(level) = lookup(ENV_LEVEL).filter(|v| !v.trim().is_empty()) {
            cfg.level = level;
        }
        if let Some(format) = lookup(ENV_FORMAT).filter(|v| !v.trim().is_empty()) {
            cfg.format = format.parse()?;
        }
        if let Some(flag) = lookup(ENV_RUN_TIMINGS) {
            cfg.run_timings = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(cfg)
    }

    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.use_color = enabled;
        self
    }

    pub fn with_run_timings(mut self, enabled: bool) -> Self {
        self.run_timings = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_overrides_defaults() {
        let cfg = LoggerConfig::from_lookup(|key| match key {
            ENV_LEVEL => Some("loadmgr_core=debug,warn".to_string()),
            ENV_FORMAT => Some("JSON".to_string()),
            ENV_RUN_TIMINGS => Some("On".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(cfg.level, "loadmgr_core=debug,warn");
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert!(cfg.with_targets);
        assert!(cfg.run_timings);
    }

    #[test]
    fn empty_values_keep_defaults() {
        let cfg = LoggerConfig::from_lookup(|_| Some("  ".to_string())).unwrap();
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.format, LoggerFormat::Text);
    }

    #[test]
    fn bad_format_is_rejected() {
        let err = LoggerConfig::from_lookup(|key| (key == ENV_FORMAT).then(|| "xml".to_string()))
            .unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFormat(f) if f == "xml"));
    }

    #[test]
    fn builders_apply() {
        let cfg = LoggerConfig::default()
            .with_level("trace")
            .with_targets(false)
            .with_color(false);
        assert_eq!(cfg.level, "trace");
        assert!(!cfg.with_targets);
        assert!(!cfg.use_color);
    }
}
