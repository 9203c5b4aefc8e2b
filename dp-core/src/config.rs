//! Generation configuration
//!
//! Everything here has a working default; an embedder that constructs
//! `FingerprintConfig::default()` gets the full passive probe set with the
//! permission-gated probes off. The gated probes (camera, geolocation, iOS
//! motion) stay opt-in because enabling them triggers user-visible permission
//! prompts on most hosts.

use serde::{Deserialize, Serialize};

use dp_error::{DeviceprintError, Result};

use crate::weights::LayerWeights;

/// Which signal layers a generation pass collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerToggles {
    pub physical: bool,
    pub temporal: bool,
    pub behavioral: bool,
    pub mobile: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            physical: true,
            temporal: true,
            behavioral: true,
            mobile: true,
        }
    }
}

/// Configuration for a [`Fingerprinter`](crate::fingerprinter::Fingerprinter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Layer collection toggles; a disabled layer contributes nothing
    pub layers: LayerToggles,

    /// Explicit layer weights. `None` selects weights adaptively from the
    /// browser profile.
    pub weights: Option<LayerWeights>,

    /// Upper bound for one collection pass in milliseconds. Probes still
    /// pending at the deadline are treated as absent.
    pub timeout_ms: u64,

    /// Duration of the motion sampling window in milliseconds
    pub sampling_duration_ms: u64,

    /// Include full layer details in the generated record
    pub debug: bool,

    /// Derive a gait signature from accumulated motion events
    pub enable_gait: bool,

    /// Camera sensor noise probe (camera permission prompt)
    pub enable_prnu: bool,

    /// Location probe (geolocation permission prompt)
    pub enable_geolocation: bool,

    /// Collect motion samples on iOS, where the motion API itself is
    /// permission-gated. Other platforms sample motion regardless.
    pub enable_mems_permission: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            layers: LayerToggles::default(),
            weights: None,
            timeout_ms: 15_000,
            sampling_duration_ms: 2_000,
            debug: false,
            enable_gait: false,
            enable_prnu: false,
            enable_geolocation: false,
            enable_mems_permission: false,
        }
    }
}

impl FingerprintConfig {
    /// Validate field ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(DeviceprintError::InvalidConfig {
                field: "timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sampling_duration_ms > self.timeout_ms {
            return Err(DeviceprintError::InvalidConfig {
                field: "sampling_duration_ms".to_string(),
                reason: format!(
                    "sampling window ({} ms) exceeds collection timeout ({} ms)",
                    self.sampling_duration_ms, self.timeout_ms
                ),
            });
        }
        if let Some(weights) = &self.weights {
            if (weights.sum() - 1.0).abs() > 1e-6 {
                return Err(DeviceprintError::InvalidConfig {
                    field: "weights".to_string(),
                    reason: format!("layer weights sum to {}, expected 1.0", weights.sum()),
                });
            }
            let components = [
                weights.physical,
                weights.temporal,
                weights.behavioral,
                weights.mobile,
            ];
            if components.iter().any(|w| *w < 0.0) {
                return Err(DeviceprintError::InvalidConfig {
                    field: "weights".to_string(),
                    reason: "layer weights must be non-negative".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FingerprintConfig::default();
        assert!(config.layers.physical && config.layers.mobile);
        assert_eq!(config.timeout_ms, 15_000);
        assert_eq!(config.sampling_duration_ms, 2_000);
        assert!(!config.debug);
        assert!(!config.enable_prnu && !config.enable_geolocation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: FingerprintConfig =
            serde_json::from_str(r#"{"timeout_ms": 5000, "debug": true}"#).unwrap();
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.debug);
        assert_eq!(config.sampling_duration_ms, 2_000);
        assert!(config.layers.behavioral);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = FingerprintConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DeviceprintError::InvalidConfig { field, .. }) if field == "timeout_ms"
        ));
    }

    #[test]
    fn test_rejects_sampling_longer_than_timeout() {
        let config = FingerprintConfig {
            timeout_ms: 1_000,
            sampling_duration_ms: 2_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unbalanced_weight_override() {
        let config = FingerprintConfig {
            weights: Some(LayerWeights {
                physical: 0.5,
                temporal: 0.5,
                behavioral: 0.5,
                mobile: 0.5,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let valid = FingerprintConfig {
            weights: Some(LayerWeights {
                physical: 0.4,
                temporal: 0.2,
                behavioral: 0.2,
                mobile: 0.2,
            }),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());
    }
}
