//! Typed probe readings, grouped by layer
//!
//! Every probe returns either one of these readings or nothing; a missing
//! reading means the probe failed or was disabled, and downstream code
//! substitutes the documented empty default. None of these constructors can
//! fail.
//!
//! The reductions that turn raw sample streams into signatures (MEMS bias and
//! noise, clock skew, orientation) live here as associated constructors so the
//! statistics work stays next to the shape it produces.

use serde::{Deserialize, Serialize};

use crate::stats;

/// Standard gravity, used to normalize accelerometer bias
const GRAVITY: f64 = 9.81;

// ============================================================================
// Physical layer
// ============================================================================

/// Accelerometer characterization derived from a motion sampling window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerSignature {
    pub bias: [f64; 3],
    pub sensitivity: [f64; 3],
    pub noise: f64,
    pub normalized_bias: [f64; 3],
}

/// Gyroscope characterization derived from a motion sampling window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GyroscopeSignature {
    pub bias: [f64; 3],
    pub cross_axis_error: f64,
    pub noise: f64,
}

/// MEMS sensor manufacturing signature (accelerometer + gyroscope bias/noise)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemsData {
    pub accelerometer: AccelerometerSignature,
    pub gyroscope: GyroscopeSignature,
    pub sample_count: usize,
    pub quality_score: f64,
}

impl MemsData {
    /// Reduce raw accelerometer and gyroscope sample streams to a signature.
    ///
    /// Empty streams produce the all-zero default (sample_count 0), which the
    /// module presence test treats as "probe absent".
    pub fn from_samples(acc: &[[f64; 3]], gyro: &[[f64; 3]]) -> Self {
        let acc_bias = stats::mean(acc);
        let gyro_bias = stats::mean(gyro);
        let acc_noise = stats::std_dev_flattened(acc);
        let gyro_noise = stats::std_dev_flattened(gyro);

        let normalized_bias = [
            acc_bias[0] / GRAVITY,
            acc_bias[1] / GRAVITY,
            (acc_bias[2] - GRAVITY) / GRAVITY,
        ];
        let cross_axis_error =
            (normalized_bias[0].powi(2) + normalized_bias[1].powi(2)).sqrt();
        let sensitivity_est = 1.0 + acc_noise * 0.1;
        let quality_score = (acc.len() as f64 / 100.0).min(1.0) * (1.0 / (1.0 + acc_noise));

        Self {
            accelerometer: AccelerometerSignature {
                bias: acc_bias,
                sensitivity: [sensitivity_est, sensitivity_est, sensitivity_est],
                noise: acc_noise,
                normalized_bias,
            },
            gyroscope: GyroscopeSignature {
                bias: gyro_bias,
                cross_axis_error,
                noise: gyro_noise,
            },
            sample_count: acc.len(),
            quality_score,
        }
    }
}

/// Clock skew characterization from repeated short timer measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClockSkewData {
    pub skew_ppm: f64,
    pub stability_index: f64,
    pub jitter: f64,
    pub drift_direction: f64,
}

impl ClockSkewData {
    /// Reduce elapsed-time measurements (each nominally 1ms) to a skew
    /// signature. Empty input yields the zero default.
    pub fn from_measurements(measurements: &[f64]) -> Self {
        if measurements.is_empty() {
            return Self::default();
        }
        let n = measurements.len() as f64;
        let mean = measurements.iter().sum::<f64>() / n;
        let variance = stats::variance(measurements);
        let half = measurements.len() / 2;
        let first_avg = measurements[..half].iter().sum::<f64>() / (half.max(1) as f64);
        let second_avg =
            measurements[half..].iter().sum::<f64>() / ((measurements.len() - half).max(1) as f64);

        Self {
            skew_ppm: (mean - 1.0) * 1_000_000.0,
            stability_index: 1.0 / (1.0 + variance),
            jitter: variance.sqrt(),
            drift_direction: second_avg - first_avg,
        }
    }
}

/// Canvas rendering signature (pre-reduced to a stable hash by the probe)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasData {
    pub hash: String,
    pub entropy: f64,
    pub pixel_signature: String,
}

/// WebGL identification strings and hardware constants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebglData {
    pub vendor: String,
    pub renderer: String,
    pub hash: String,
    pub performance_hint: String,
    pub extension_count: u32,
    pub shader_precision: String,
    pub max_texture_size: u32,
    pub max_viewport_dims: String,
    pub max_renderbuffer_size: u32,
    pub max_vertex_attribs: u32,
}

/// Audio frequency-response signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFrfData {
    pub frequency_response: Vec<f64>,
    pub thd2: f64,
    pub thd3: f64,
    pub total_harmonic_distortion: f64,
    pub sample_rate: u32,
    pub hash: String,
}

/// Camera sensor photo-response non-uniformity signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrnuData {
    pub green_channel_hash: String,
    pub noise_entropy: f64,
    pub defect_signature: String,
    pub vignetting_profile: Vec<f64>,
}

/// Magnetometer/orientation signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationData {
    pub magnetic_field: [f64; 3],
    pub compass_heading: f64,
    pub accuracy: f64,
}

impl OrientationData {
    /// Reduce orientation samples (alpha/beta/gamma). The compass heading is
    /// the last observed alpha; accuracy saturates at 10 samples.
    pub fn from_samples(samples: &[[f64; 3]]) -> Self {
        let heading = samples.last().map(|s| s[0]).unwrap_or(0.0);
        let accuracy = if samples.len() > 10 {
            1.0
        } else {
            samples.len() as f64 / 10.0
        };
        Self {
            magnetic_field: stats::mean(samples),
            compass_heading: heading,
            accuracy,
        }
    }
}

/// Floating-point engine precision fingerprint (differs per math runtime)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathEngineData {
    pub precision: String,
}

/// GPU rasterizer fingerprint from actual draw output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebglRenderData {
    pub triangle_signature: String,
    pub gradient_signature: String,
}

/// Installed font detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontData {
    pub detected_fonts: Vec<String>,
    pub font_count: usize,
}

/// CSS feature support matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CssFeatureData {
    pub supported_count: usize,
    pub hash: String,
}

/// Locale formatting engine fingerprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntlData {
    pub date_format: String,
    pub number_format: String,
    pub list_format: String,
}

/// Audio-stack compressor output fingerprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStackData {
    pub compressor_value: f64,
    pub hash: String,
}

/// WebGL2 extended hardware parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Webgl2Data {
    pub max_texture_3d: u32,
    pub max_samples: u32,
    pub max_color_attachments: u32,
    pub max_uniform_buffer_bindings: u32,
    pub hash: String,
}

/// Hardware media codec support fingerprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaCapabilitiesData {
    pub supported_codecs: Vec<String>,
    pub hash: String,
}

/// GPU silicon manufacturing-variance fingerprint. Same-model chips round
/// floating point slightly differently; this is one of the four
/// device-uniqueness signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSiliconData {
    pub shader_results: String,
    pub multi_pass_results: String,
}

/// Audio DAC manufacturing-variance fingerprint (device uniqueness)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioHardwareData {
    pub waveform_samples: String,
    pub compressor_curve: String,
}

/// Sub-pixel canvas anti-aliasing variance fingerprint (device uniqueness)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasMicroData {
    pub text_render: String,
    pub shape_render: String,
}

/// Storage quota/usage profile (device uniqueness)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageProfileData {
    pub quota: u64,
    pub usage: u64,
}

impl StorageProfileData {
    /// Raw string form fed into the sub-hash
    pub fn profile_string(&self) -> String {
        format!("{}|{}", self.quota, self.usage)
    }
}

// ============================================================================
// Temporal layer
// ============================================================================

/// Battery state/discharge characterization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryData {
    pub level: f64,
    pub charging: bool,
    pub discharge_rate: f64,
    pub estimated_internal_resistance: f64,
    pub charging_curve_signature: String,
    pub health_estimate: f64,
    pub stl_signature: String,
}

/// Compute/memory performance characterization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceData {
    pub compute_score: f64,
    pub memory_profile: u64,
    pub core_count: u32,
    pub heap_volatility: f64,
}

// ============================================================================
// Behavioral layer
// ============================================================================

/// Touch interaction signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TouchData {
    pub average_pressure: f64,
    pub average_radius: f64,
    pub max_touch_points: u32,
    pub touch_support: bool,
    pub swipe_velocity_profile: Vec<f64>,
}

/// Typing rhythm signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeData {
    pub average_dwell_time: f64,
    pub average_flight_time: f64,
    pub rhythm: Vec<f64>,
    pub variance: f64,
    pub estimated_wpm: f64,
}

/// Walking pattern signature from accelerometer magnitudes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaitData {
    pub step_frequency: f64,
    pub step_regularity: f64,
    pub amplitude: f64,
    pub frequency_peaks: Vec<f64>,
    pub symmetry_score: f64,
    pub sample_count: usize,
}

// ============================================================================
// Mobile layer
// ============================================================================

/// Screen geometry and capability signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenData {
    pub width: u32,
    pub height: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub color_depth: u32,
    pub pixel_ratio: f64,
    pub touch_points: u32,
    pub orientation: String,
    pub hdr: bool,
    pub hash: String,
}

/// Speech synthesis voice inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechData {
    pub voice_count: usize,
    pub voices: Vec<String>,
    pub languages: Vec<String>,
    pub hash: String,
}

/// Network link characterization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkData {
    pub effective_type: String,
    pub downlink: f64,
    pub rtt: u32,
    pub save_data: bool,
}

/// Media device inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaDevicesData {
    pub audio_input_count: usize,
    pub video_input_count: usize,
    pub audio_output_count: usize,
    pub device_labels: Vec<String>,
    pub hash: String,
}

/// User-agent client hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientHintsData {
    pub platform: String,
    pub platform_version: String,
    pub mobile: bool,
    pub model: String,
    pub brands: Vec<String>,
    pub architecture: String,
}

/// Locale and timezone signature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocaleData {
    pub language: String,
    pub languages: Vec<String>,
    pub timezone: String,
    pub timezone_offset: i32,
}

/// Public IP observation with change history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpData {
    pub public_ip: String,
    pub ip_history: Vec<String>,
}

/// A single recorded location fix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: u64,
}

/// Geolocation observation with movement history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeolocationData {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub location_history: Vec<LocationFix>,
}

// ============================================================================
// Layer bundles
// ============================================================================

/// Physical-layer signal bundle; `None` means the probe failed or was disabled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSignature {
    pub mems: Option<MemsData>,
    pub clock_skew: Option<ClockSkewData>,
    pub canvas: Option<CanvasData>,
    pub webgl: Option<WebglData>,
    pub audio: Option<AudioFrfData>,
    pub prnu: Option<PrnuData>,
    pub orientation: Option<OrientationData>,
    pub math_engine: Option<MathEngineData>,
    pub webgl_render: Option<WebglRenderData>,
    pub fonts: Option<FontData>,
    pub css_features: Option<CssFeatureData>,
    pub intl: Option<IntlData>,
    pub audio_stack: Option<AudioStackData>,
    pub webgl2: Option<Webgl2Data>,
    pub media_cap: Option<MediaCapabilitiesData>,
    pub gpu_silicon: Option<GpuSiliconData>,
    pub audio_hardware: Option<AudioHardwareData>,
    pub canvas_micro: Option<CanvasMicroData>,
    pub storage_profile: Option<StorageProfileData>,
}

/// Temporal-layer signal bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalSignature {
    pub battery: Option<BatteryData>,
    pub performance: Option<PerformanceData>,
}

/// Behavioral-layer signal bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSignature {
    pub touch: Option<TouchData>,
    pub keystroke: Option<KeystrokeData>,
    pub gait: Option<GaitData>,
}

/// Mobile-layer signal bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileSignature {
    pub screen: Option<ScreenData>,
    pub speech_voices: Option<SpeechData>,
    pub network: Option<NetworkData>,
    pub media_devices: Option<MediaDevicesData>,
    pub client_hints: Option<ClientHintsData>,
    pub locale: Option<LocaleData>,
    pub ip: Option<IpData>,
    pub geolocation: Option<GeolocationData>,
}

/// All four layer bundles for one generation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerDetails {
    pub physical: Option<PhysicalSignature>,
    pub temporal: Option<TemporalSignature>,
    pub behavioral: Option<BehavioralSignature>,
    pub mobile: Option<MobileSignature>,
}
