//! Cross-browser signal extraction and identity fusion
//!
//! Reduces one generation pass's [`LayerDetails`] to the 28-field
//! [`CrossBrowserSignals`] record, serializes it to the pipe-joined canonical
//! string, and hashes that with SHA-256. The field order of the serialization
//! and the sub-hash truncation lengths are a compatibility contract: two
//! builds disagreeing on either produce unrelatable identities, so neither may
//! change without a coordinated migration.
//!
//! The confidence model is additive and presence-based. Each high-entropy
//! signal that survived extraction contributes a fixed increment over the
//! floor, clamped at [`MAX_ACCURACY`]. Absent signals contribute nothing;
//! there is no penalty term.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::signals::types::LayerDetails;

/// Confidence floor when no signal passed its presence test
pub const BASE_ACCURACY: f64 = 0.02;

/// Confidence ceiling; fingerprinting is probabilistic, never certain
pub const MAX_ACCURACY: f64 = 0.97;

/// Engine-level sub-hashes are truncated to 16 hex digits
const ENGINE_HASH_LEN: usize = 16;

/// The four device-uniqueness sub-hashes keep 24 hex digits. These signals
/// separate same-model devices, so they carry more preserved entropy.
const DEVICE_HASH_LEN: usize = 24;

/// SHA-256 of a string, as lowercase hex
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn truncated_hash(input: &str, len: usize) -> String {
    let mut h = sha256_hex(input);
    h.truncate(len);
    h
}

// ============================================================================
// Cross-browser signals
// ============================================================================

/// The stable signal set fed into the identity hash.
///
/// Only values that survive browser switches on the same device are included;
/// everything engine-specific was either excluded or folded into a sub-hash
/// that is stable per engine family. Missing probes leave their fields at the
/// documented defaults (empty string, zero, `"0,0"` for viewport dims), which
/// keeps the serialization total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossBrowserSignals {
    pub gpu_renderer: String,
    pub gpu_vendor: String,
    pub screen_resolution: String,
    pub available_screen: String,
    /// Formatted with two decimal places at extraction time
    pub pixel_ratio: String,
    pub color_depth: u32,
    pub timezone: String,
    pub hardware_concurrency: u32,
    pub max_touch_points: u32,
    pub platform: String,
    pub shader_precision: String,
    pub webgl_max_texture_size: u32,
    pub webgl_max_viewport_dims: String,
    pub webgl_extension_count: u32,
    pub webgl_max_renderbuffer_size: u32,
    pub webgl_max_vertex_attribs: u32,
    pub math_engine_hash: String,
    pub webgl_render_hash: String,
    pub font_hash: String,
    pub css_feature_hash: String,
    pub intl_hash: String,
    pub audio_stack_hash: String,
    pub webgl2_hash: String,
    pub media_cap_hash: String,
    pub gpu_silicon_hash: String,
    pub audio_hardware_hash: String,
    pub canvas_micro_hash: String,
    pub storage_profile_hash: String,
}

impl Default for CrossBrowserSignals {
    fn default() -> Self {
        Self {
            gpu_renderer: String::new(),
            gpu_vendor: String::new(),
            screen_resolution: String::new(),
            available_screen: String::new(),
            pixel_ratio: "0.00".to_string(),
            color_depth: 0,
            timezone: String::new(),
            hardware_concurrency: 0,
            max_touch_points: 0,
            platform: String::new(),
            shader_precision: String::new(),
            webgl_max_texture_size: 0,
            webgl_max_viewport_dims: "0,0".to_string(),
            webgl_extension_count: 0,
            webgl_max_renderbuffer_size: 0,
            webgl_max_vertex_attribs: 0,
            math_engine_hash: String::new(),
            webgl_render_hash: String::new(),
            font_hash: String::new(),
            css_feature_hash: String::new(),
            intl_hash: String::new(),
            audio_stack_hash: String::new(),
            webgl2_hash: String::new(),
            media_cap_hash: String::new(),
            gpu_silicon_hash: String::new(),
            audio_hardware_hash: String::new(),
            canvas_micro_hash: String::new(),
            storage_profile_hash: String::new(),
        }
    }
}

impl CrossBrowserSignals {
    /// Extract the cross-browser signal set from collected layer details.
    ///
    /// Every absent probe maps to its field default; this function cannot
    /// fail and the output is deterministic in its input.
    pub fn extract(details: &LayerDetails) -> Self {
        let mut signals = Self::default();

        if let Some(physical) = &details.physical {
            if let Some(webgl) = &physical.webgl {
                signals.gpu_renderer = webgl.renderer.clone();
                signals.gpu_vendor = webgl.vendor.clone();
                signals.shader_precision = webgl.shader_precision.clone();
                signals.webgl_max_texture_size = webgl.max_texture_size;
                if !webgl.max_viewport_dims.is_empty() {
                    signals.webgl_max_viewport_dims = webgl.max_viewport_dims.clone();
                }
                signals.webgl_extension_count = webgl.extension_count;
                signals.webgl_max_renderbuffer_size = webgl.max_renderbuffer_size;
                signals.webgl_max_vertex_attribs = webgl.max_vertex_attribs;
            }
            if let Some(math) = &physical.math_engine {
                signals.math_engine_hash = truncated_hash(&math.precision, ENGINE_HASH_LEN);
            }
            if let Some(render) = &physical.webgl_render {
                signals.webgl_render_hash = truncated_hash(
                    &format!("{}|{}", render.triangle_signature, render.gradient_signature),
                    ENGINE_HASH_LEN,
                );
            }
            if let Some(fonts) = &physical.fonts {
                signals.font_hash =
                    truncated_hash(&fonts.detected_fonts.join(","), ENGINE_HASH_LEN);
            }
            if let Some(css) = &physical.css_features {
                signals.css_feature_hash = truncated_hash(&css.hash, ENGINE_HASH_LEN);
            }
            if let Some(intl) = &physical.intl {
                signals.intl_hash = truncated_hash(
                    &format!(
                        "{}|{}|{}",
                        intl.date_format, intl.number_format, intl.list_format
                    ),
                    ENGINE_HASH_LEN,
                );
            }
            if let Some(audio) = &physical.audio_stack {
                // Probe already hashed its compressor samples; just truncate
                let mut h = audio.hash.clone();
                h.truncate(ENGINE_HASH_LEN);
                signals.audio_stack_hash = h;
            }
            if let Some(webgl2) = &physical.webgl2 {
                let mut h = webgl2.hash.clone();
                h.truncate(ENGINE_HASH_LEN);
                signals.webgl2_hash = h;
            }
            if let Some(media) = &physical.media_cap {
                signals.media_cap_hash = truncated_hash(&media.hash, ENGINE_HASH_LEN);
            }
            if let Some(silicon) = &physical.gpu_silicon {
                signals.gpu_silicon_hash = truncated_hash(
                    &format!(
                        "{}|{}",
                        silicon.shader_results, silicon.multi_pass_results
                    ),
                    DEVICE_HASH_LEN,
                );
            }
            if let Some(dac) = &physical.audio_hardware {
                signals.audio_hardware_hash = truncated_hash(
                    &format!("{}|{}", dac.waveform_samples, dac.compressor_curve),
                    DEVICE_HASH_LEN,
                );
            }
            if let Some(micro) = &physical.canvas_micro {
                signals.canvas_micro_hash = truncated_hash(
                    &format!("{}|{}", micro.text_render, micro.shape_render),
                    DEVICE_HASH_LEN,
                );
            }
            if let Some(storage) = &physical.storage_profile {
                signals.storage_profile_hash =
                    truncated_hash(&storage.profile_string(), DEVICE_HASH_LEN);
            }
        }

        if let Some(temporal) = &details.temporal {
            if let Some(perf) = &temporal.performance {
                signals.hardware_concurrency = perf.core_count;
            }
        }

        if let Some(mobile) = &details.mobile {
            if let Some(screen) = &mobile.screen {
                signals.screen_resolution = format!("{}x{}", screen.width, screen.height);
                signals.available_screen =
                    format!("{}x{}", screen.avail_width, screen.avail_height);
                signals.pixel_ratio = format!("{:.2}", screen.pixel_ratio);
                signals.color_depth = screen.color_depth;
                signals.max_touch_points = screen.touch_points;
            }
            if let Some(locale) = &mobile.locale {
                signals.timezone = locale.timezone.clone();
            }
            if let Some(hints) = &mobile.client_hints {
                signals.platform = hints.platform.clone();
            }
        }

        signals
    }

    /// Canonical pipe-joined serialization. Field order is frozen.
    pub fn serialize(&self) -> String {
        [
            self.gpu_renderer.as_str(),
            self.gpu_vendor.as_str(),
            self.screen_resolution.as_str(),
            self.available_screen.as_str(),
            self.pixel_ratio.as_str(),
            &self.color_depth.to_string(),
            self.timezone.as_str(),
            &self.hardware_concurrency.to_string(),
            &self.max_touch_points.to_string(),
            self.platform.as_str(),
            self.shader_precision.as_str(),
            &self.webgl_max_texture_size.to_string(),
            self.webgl_max_viewport_dims.as_str(),
            &self.webgl_extension_count.to_string(),
            &self.webgl_max_renderbuffer_size.to_string(),
            &self.webgl_max_vertex_attribs.to_string(),
            self.math_engine_hash.as_str(),
            self.webgl_render_hash.as_str(),
            self.font_hash.as_str(),
            self.css_feature_hash.as_str(),
            self.intl_hash.as_str(),
            self.audio_stack_hash.as_str(),
            self.webgl2_hash.as_str(),
            self.media_cap_hash.as_str(),
            self.gpu_silicon_hash.as_str(),
            self.audio_hardware_hash.as_str(),
            self.canvas_micro_hash.as_str(),
            self.storage_profile_hash.as_str(),
        ]
        .join("|")
    }

    /// Additive presence-based confidence estimate.
    ///
    /// The increments reflect each signal's measured discriminating power; the
    /// four device-uniqueness sub-hashes carry the largest shares. A bundle
    /// where no presence test passes scores exactly [`BASE_ACCURACY`].
    pub fn accuracy(&self) -> f64 {
        let mut accuracy = BASE_ACCURACY;

        if !self.gpu_renderer.is_empty() {
            accuracy += 0.10;
        }
        if !self.gpu_vendor.is_empty() {
            accuracy += 0.02;
        }
        // "0x0" means the screen probe ran but read nothing usable
        if !self.screen_resolution.is_empty() && self.screen_resolution != "0x0" {
            accuracy += 0.05;
        }
        if !self.timezone.is_empty() {
            accuracy += 0.03;
        }
        if self.hardware_concurrency > 0 {
            accuracy += 0.03;
        }
        if !self.shader_precision.is_empty() {
            accuracy += 0.05;
        }
        if self.webgl_max_texture_size > 0 {
            accuracy += 0.03;
        }
        if !self.platform.is_empty() {
            accuracy += 0.02;
        }
        if !self.math_engine_hash.is_empty() {
            accuracy += 0.05;
        }
        if !self.webgl_render_hash.is_empty() {
            accuracy += 0.04;
        }
        if !self.font_hash.is_empty() {
            accuracy += 0.05;
        }
        if !self.css_feature_hash.is_empty() {
            accuracy += 0.03;
        }
        if !self.intl_hash.is_empty() {
            accuracy += 0.03;
        }
        if !self.audio_stack_hash.is_empty() {
            accuracy += 0.03;
        }
        if !self.webgl2_hash.is_empty() {
            accuracy += 0.03;
        }
        if !self.media_cap_hash.is_empty() {
            accuracy += 0.02;
        }
        if !self.gpu_silicon_hash.is_empty() {
            accuracy += 0.12;
        }
        if !self.audio_hardware_hash.is_empty() {
            accuracy += 0.10;
        }
        if !self.canvas_micro_hash.is_empty() {
            accuracy += 0.08;
        }
        if !self.storage_profile_hash.is_empty() {
            accuracy += 0.04;
        }

        accuracy.min(MAX_ACCURACY)
    }
}

// ============================================================================
// Fused identity
// ============================================================================

/// Output of one fusion pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedIdentity {
    /// SHA-256 of the canonical serialization, lowercase hex
    pub hash: String,
    /// Confidence estimate in `[BASE_ACCURACY, MAX_ACCURACY]`
    pub accuracy: f64,
    /// The extracted signal set the hash was computed over
    pub signals: CrossBrowserSignals,
}

/// Fuse collected layer details into a device identity.
pub fn build_identity(details: &LayerDetails) -> FusedIdentity {
    let signals = CrossBrowserSignals::extract(details);
    let serialized = signals.serialize();
    let hash = sha256_hex(&serialized);
    let accuracy = signals.accuracy();
    FusedIdentity {
        hash,
        accuracy,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::types::*;

    fn webgl_only_details() -> LayerDetails {
        LayerDetails {
            physical: Some(PhysicalSignature {
                webgl: Some(WebglData {
                    vendor: "Qualcomm".into(),
                    renderer: "Adreno (TM) 740".into(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_serialization_literal() {
        let signals = CrossBrowserSignals::default();
        assert_eq!(
            signals.serialize(),
            "||||0.00|0||0|0|||0|0,0|0|0|0||||||||||||"
        );
    }

    #[test]
    fn test_empty_details_score_exactly_base() {
        let identity = build_identity(&LayerDetails::default());
        assert_eq!(identity.accuracy, BASE_ACCURACY);
        assert_eq!(identity.hash.len(), 64);
    }

    #[test]
    fn test_gpu_only_accuracy() {
        // Renderer (0.10) + vendor (0.02) over the 0.02 floor
        let identity = build_identity(&webgl_only_details());
        assert!((identity.accuracy - 0.14).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_monotone_in_presence() {
        let mut details = webgl_only_details();
        let before = build_identity(&details).accuracy;

        details.mobile = Some(MobileSignature {
            locale: Some(LocaleData {
                timezone: "Asia/Seoul".into(),
                ..Default::default()
            }),
            ..Default::default()
        });
        let after = build_identity(&details).accuracy;
        assert!(after > before);
        assert!((after - before - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_clamped_below_one() {
        let mut signals = CrossBrowserSignals::default();
        signals.gpu_renderer = "r".into();
        signals.gpu_vendor = "v".into();
        signals.screen_resolution = "1179x2556".into();
        signals.timezone = "t".into();
        signals.hardware_concurrency = 8;
        signals.shader_precision = "p".into();
        signals.webgl_max_texture_size = 16384;
        signals.platform = "iOS".into();
        signals.math_engine_hash = "a".into();
        signals.webgl_render_hash = "b".into();
        signals.font_hash = "c".into();
        signals.css_feature_hash = "d".into();
        signals.intl_hash = "e".into();
        signals.audio_stack_hash = "f".into();
        signals.webgl2_hash = "g".into();
        signals.media_cap_hash = "h".into();
        signals.gpu_silicon_hash = "i".into();
        signals.audio_hardware_hash = "j".into();
        signals.canvas_micro_hash = "k".into();
        signals.storage_profile_hash = "l".into();
        assert_eq!(signals.accuracy(), MAX_ACCURACY);
    }

    #[test]
    fn test_zero_resolution_fails_presence() {
        let mut signals = CrossBrowserSignals::default();
        signals.screen_resolution = "0x0".into();
        assert_eq!(signals.accuracy(), BASE_ACCURACY);
    }

    #[test]
    fn test_determinism() {
        let details = webgl_only_details();
        let a = build_identity(&details);
        let b = build_identity(&details);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.signals, b.signals);
    }

    #[test]
    fn test_sub_hash_truncation_lengths() {
        let details = LayerDetails {
            physical: Some(PhysicalSignature {
                math_engine: Some(MathEngineData {
                    precision: "1.4142135623730951".into(),
                }),
                gpu_silicon: Some(GpuSiliconData {
                    shader_results: "0.70710678".into(),
                    multi_pass_results: "0.57735027".into(),
                }),
                storage_profile: Some(StorageProfileData {
                    quota: 299977904946,
                    usage: 1048576,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let signals = CrossBrowserSignals::extract(&details);
        assert_eq!(signals.math_engine_hash.len(), 16);
        assert_eq!(signals.gpu_silicon_hash.len(), 24);
        assert_eq!(signals.storage_profile_hash.len(), 24);
        // Sub-hashes are prefixes of the full digest
        assert!(sha256_hex("1.4142135623730951").starts_with(&signals.math_engine_hash));
    }

    #[test]
    fn test_hash_matches_manual_serialization() {
        let identity = build_identity(&webgl_only_details());
        let expected = sha256_hex(&identity.signals.serialize());
        assert_eq!(identity.hash, expected);
    }
}
