// Layered configuration loading
use config::{Config, Environment, File};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::settings::AuditCareConfig;

/// Environment prefix; nesting uses a double underscore,
/// e.g. `AUDITCARE__BALANCER__WEIGHTS__LOAD=0.5`
pub const ENV_PREFIX: &str = "AUDITCARE";

/// Builds an [`AuditCareConfig`] from defaults, an optional file and the environment
#[derive(Debug, Default)]
pub struct ConfigEngine {
    file: Option<std::path::PathBuf>,
    use_environment: bool,
}

impl ConfigEngine {
    pub fn new() -> Self {
        Self {
            file: None,
            use_environment: true,
        }
    }

    /// YAML, TOML or JSON file; format is taken from the extension
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_environment(mut self, enabled: bool) -> Self {
        self.use_environment = enabled;
        self
    }

    /// Merge all sources and validate the result.
    ///
    /// # Errors
    ///
    /// Fails when a source cannot be read or parsed, or validation rejects a value.
    pub fn load(&self) -> Result<AuditCareConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&AuditCareConfig::default())?);

        if let Some(path) = &self.file {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        if self.use_environment {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: AuditCareConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults_without_sources() {
        let config = ConfigEngine::new().with_environment(false).load().unwrap();
        assert_eq!(config.normalizer.chunk_size, 500);
        assert_eq!(config.approval.deadline_hours, 24);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "normalizer:\n  chunk_size: 200\nbalancer:\n  weights:\n    load: 0.25\n    specialization: 0.25\n    performance: 0.25\n    priority: 0.25\n"
        )
        .unwrap();

        let config = ConfigEngine::new()
            .with_environment(false)
            .with_file(file.path())
            .load()
            .unwrap();

        assert_eq!(config.normalizer.chunk_size, 200);
        assert!((config.balancer.weights.load - 0.25).abs() < f64::EPSILON);
        // Untouched sections keep their defaults
        assert_eq!(config.balancer.default_daily_capacity, 40);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "approval:\n  deadline_hours: 0\n").unwrap();

        let result = ConfigEngine::new()
            .with_environment(false)
            .with_file(file.path())
            .load();
        assert!(result.is_err());
    }
}
