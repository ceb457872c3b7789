use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

pub const LIFECYCLE_CONFIG_JSON_SCHEMA_V1: u32 = 1;

/// Behavior switches for one lifecycle scope.
///
/// Serializable so host applications can persist chart setup next to their
/// own configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Call `dispose` on every live engine instance at scope teardown.
    #[serde(default = "default_true")]
    pub dispose_on_teardown: bool,
    /// Call `dispose` on engine instances whose element left the tree.
    #[serde(default = "default_true")]
    pub dispose_stale_instances: bool,
    /// Deliver one resize per element even if a batch repeats it.
    #[serde(default = "default_true")]
    pub coalesce_resize_batches: bool,
    /// Skip instance creation when the element detached before the deferred
    /// attach ran.
    #[serde(default = "default_true")]
    pub require_attached_on_settle: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            dispose_on_teardown: true,
            dispose_stale_instances: true,
            coalesce_resize_batches: true,
            require_attached_on_settle: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: LifecycleConfig,
}

impl LifecycleConfig {
    #[must_use]
    pub fn with_dispose_on_teardown(mut self, enabled: bool) -> Self {
        self.dispose_on_teardown = enabled;
        self
    }

    #[must_use]
    pub fn with_dispose_stale_instances(mut self, enabled: bool) -> Self {
        self.dispose_stale_instances = enabled;
        self
    }

    #[must_use]
    pub fn with_coalesce_resize_batches(mut self, enabled: bool) -> Self {
        self.coalesce_resize_batches = enabled;
        self
    }

    #[must_use]
    pub fn with_require_attached_on_settle(mut self, enabled: bool) -> Self {
        self.require_attached_on_settle = enabled;
        self
    }

    pub fn to_json_contract_v1_pretty(self) -> ChartResult<String> {
        let payload = LifecycleConfigJsonContractV1 {
            schema_version: LIFECYCLE_CONFIG_JSON_SCHEMA_V1,
            config: self,
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::InvalidConfig(format!("failed to serialize lifecycle config: {e}"))
        })
    }

    /// Parses either a bare config object or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> ChartResult<Self> {
        if let Ok(config) = serde_json::from_str::<LifecycleConfig>(input) {
            return Ok(config);
        }
        let payload: LifecycleConfigJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            ChartError::InvalidConfig(format!("failed to parse lifecycle config json: {e}"))
        })?;
        if payload.schema_version != LIFECYCLE_CONFIG_JSON_SCHEMA_V1 {
            return Err(ChartError::InvalidConfig(format!(
                "unsupported lifecycle config schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.config)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleConfig;

    #[test]
    fn contract_roundtrip_keeps_switches() {
        let config = LifecycleConfig::default()
            .with_dispose_on_teardown(false)
            .with_coalesce_resize_batches(false);
        let json = config.to_json_contract_v1_pretty().expect("serialize");
        let parsed = LifecycleConfig::from_json_compat_str(&json).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn bare_object_fills_missing_fields_with_defaults() {
        let parsed = LifecycleConfig::from_json_compat_str(r#"{"dispose_on_teardown": false}"#)
            .expect("parse");
        assert!(!parsed.dispose_on_teardown);
        assert!(parsed.dispose_stale_instances);
        assert!(parsed.require_attached_on_settle);
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let err = LifecycleConfig::from_json_compat_str(
            r#"{"schema_version": 7, "config": {"dispose_on_teardown": true}}"#,
        )
        .expect_err("must reject");
        assert_eq!(
            err.to_string(),
            "invalid config: unsupported lifecycle config schema version: 7"
        );
    }
}
