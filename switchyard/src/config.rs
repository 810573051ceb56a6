//! One configuration document for every component.

use serde::Deserialize;
use switchyard_exec::ExecutorConfig;
use switchyard_proto::error::ConfigurationError;

#[cfg(feature = "audit")]
use switchyard_audit::AuditConfig;
#[cfg(feature = "workflow")]
use switchyard_workflow::EngineConfig;

/// Aggregated settings, one section per component. Every section and field
/// is optional; missing values take their defaults.
///
/// ```
/// use switchyard::SwitchyardConfig;
///
/// let config = SwitchyardConfig::from_json_str(r#"{"executor": {"default_timeout": 500}}"#)
///     .unwrap();
/// assert_eq!(config.executor.default_timeout.as_millis(), 500);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct SwitchyardConfig {
    /// Handler execution.
    pub executor: ExecutorConfig,

    /// Workflow engine.
    #[cfg(feature = "workflow")]
    pub engine: EngineConfig,

    /// Compliance audit.
    #[cfg(feature = "audit")]
    pub audit: AuditConfig,
}

impl SwitchyardConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.executor.default_timeout.as_millis() == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "executor.default_timeout must be positive".into(),
            ));
        }
        #[cfg(feature = "workflow")]
        if self.engine.max_followups == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "engine.max_followups must be positive".into(),
            ));
        }
        #[cfg(feature = "audit")]
        self.audit.validate()?;
        Ok(())
    }
}
