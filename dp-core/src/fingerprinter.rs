//! Fingerprint Generation Orchestrator
//!
//! Wires the whole pipeline together: classify the host once at construction,
//! collect the enabled signal layers concurrently under a single deadline,
//! fuse the collected details into an identity, then run the persistence
//! cycle (recover, replicate, repair).
//!
//! Generation never fails. A probe that errors, stalls, or is disabled simply
//! leaves its signal absent, the confidence score reflects what was actually
//! collected, and the worst case is a low-confidence record over the default
//! serialization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use dp_error::Result;

use crate::config::FingerprintConfig;
use crate::persist::PersistenceManager;
use crate::probes::SignalProvider;
use crate::profile::{BrowserProfile, OperatingSystem};
use crate::signals::fusion::{self, CrossBrowserSignals};
use crate::signals::types::*;
use crate::tracker::{sample_window, BehavioralTracker};
use crate::weights::{layer_weights, LayerWeights};

/// Cap on samples drained from one motion stream per window
const MAX_MOTION_SAMPLES: usize = 4096;

// ============================================================================
// Fingerprint record
// ============================================================================

/// Output of one generation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Device hash, SHA-256 lowercase hex
    pub hash: String,

    /// Hash recovered from persistence before this pass, if any
    pub previous_hash: Option<String>,

    /// Generation timestamp, unix millis
    pub timestamp: u64,

    /// Confidence estimate for this identity
    pub accuracy: f64,

    /// Names of the modules whose presence test passed
    pub modules: Vec<String>,

    /// The cross-browser signal set the hash was computed over
    pub signals: CrossBrowserSignals,

    /// Host classification used for this pass
    pub profile: BrowserProfile,

    /// Layer weights in effect
    pub weights: LayerWeights,

    /// Full collected layer details; populated only in debug mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<LayerDetails>,
}

// ============================================================================
// Fingerprinter
// ============================================================================

/// Device fingerprint generator bound to one host environment
pub struct Fingerprinter {
    profile: BrowserProfile,
    config: FingerprintConfig,
    weights: LayerWeights,
    tracker: Arc<BehavioralTracker>,
    persistence: PersistenceManager,
    provider: Box<dyn SignalProvider>,
}

impl Fingerprinter {
    /// Build a fingerprinter. The user agent is classified exactly once here;
    /// the resulting profile is immutable for the fingerprinter's lifetime.
    pub fn new(
        user_agent: &str,
        config: FingerprintConfig,
        provider: Box<dyn SignalProvider>,
        persistence: PersistenceManager,
    ) -> Result<Self> {
        config.validate()?;
        let profile = BrowserProfile::classify(user_agent);
        let weights = config.weights.unwrap_or_else(|| layer_weights(&profile));

        debug!(
            browser = ?profile.browser,
            os = ?profile.os,
            embedded = profile.embedded_browser,
            "Classified host profile"
        );

        Ok(Self {
            profile,
            config,
            weights,
            tracker: Arc::new(BehavioralTracker::new()),
            persistence,
            provider,
        })
    }

    /// The behavioral event sink. Embedders push touch, keystroke, and motion
    /// events here between generation passes.
    pub fn tracker(&self) -> Arc<BehavioralTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    pub fn weights(&self) -> &LayerWeights {
        &self.weights
    }

    /// Run one full generation pass.
    ///
    /// Collection runs under `timeout_ms`; if the deadline fires, everything
    /// still pending is treated as absent and the pass completes with
    /// whatever degraded record that implies.
    pub async fn generate(&self) -> FingerprintRecord {
        let collection = self.collect_layers();
        let details = match tokio::time::timeout(
            Duration::from_millis(self.config.timeout_ms),
            collection,
        )
        .await
        {
            Ok(details) => details,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.timeout_ms,
                    "Collection deadline elapsed, generating degraded record"
                );
                LayerDetails::default()
            }
        };

        let modules = present_modules(&details);
        let identity = fusion::build_identity(&details);

        let previous_hash = self.persistence.recover().await;
        self.persistence.persist(&identity.hash).await;
        if let Some(previous) = &previous_hash {
            if previous != &identity.hash {
                let repaired = self.persistence.resync(&identity.hash).await;
                debug!(repaired, "Identity changed, repaired storage backends");
            }
        }

        info!(
            hash = %identity.hash,
            accuracy = identity.accuracy,
            modules = modules.len(),
            recovered = previous_hash.is_some(),
            "Generated fingerprint"
        );

        FingerprintRecord {
            hash: identity.hash,
            previous_hash,
            timestamp: current_timestamp_ms(),
            accuracy: identity.accuracy,
            modules,
            signals: identity.signals,
            profile: self.profile,
            weights: self.weights,
            details: self.config.debug.then_some(details),
        }
    }

    async fn collect_layers(&self) -> LayerDetails {
        let toggles = &self.config.layers;
        let (physical, temporal, behavioral, mobile) = tokio::join!(
            async {
                if toggles.physical {
                    Some(self.collect_physical().await)
                } else {
                    None
                }
            },
            async {
                if toggles.temporal {
                    Some(self.collect_temporal().await)
                } else {
                    None
                }
            },
            async {
                if toggles.behavioral {
                    Some(self.collect_behavioral())
                } else {
                    None
                }
            },
            async {
                if toggles.mobile {
                    Some(self.collect_mobile().await)
                } else {
                    None
                }
            },
        );

        let mut details = LayerDetails {
            physical,
            temporal,
            behavioral,
            mobile,
        };

        // Touch capability lives in the screen probe; patch it into the
        // behavioral signature now that both layers are in
        if let Some(touch_points) = details
            .mobile
            .as_ref()
            .and_then(|m| m.screen.as_ref())
            .map(|s| s.touch_points)
        {
            if let Some(touch) = details
                .behavioral
                .as_mut()
                .and_then(|b| b.touch.as_mut())
            {
                touch.max_touch_points = touch_points;
                touch.touch_support = touch_points > 0;
            }
        }

        details
    }

    async fn collect_physical(&self) -> PhysicalSignature {
        let motion = self.sample_motion();
        let clock = async {
            self.provider
                .clock_measurements()
                .await
                .map(|m| ClockSkewData::from_measurements(&m))
        };
        let prnu = async {
            if self.config.enable_prnu {
                self.provider.prnu().await
            } else {
                None
            }
        };

        let (
            (mems, orientation),
            clock_skew,
            canvas,
            webgl,
            audio,
            prnu,
            math_engine,
            webgl_render,
            fonts,
            css_features,
            intl,
            audio_stack,
            webgl2,
            media_cap,
            gpu_silicon,
            audio_hardware,
            canvas_micro,
            storage_profile,
        ) = tokio::join!(
            motion,
            clock,
            self.provider.canvas(),
            self.provider.webgl(),
            self.provider.audio_frf(),
            prnu,
            self.provider.math_engine(),
            self.provider.webgl_render(),
            self.provider.fonts(),
            self.provider.css_features(),
            self.provider.intl(),
            self.provider.audio_stack(),
            self.provider.webgl2(),
            self.provider.media_capabilities(),
            self.provider.gpu_silicon(),
            self.provider.audio_hardware(),
            self.provider.canvas_micro(),
            self.provider.storage_profile(),
        );

        PhysicalSignature {
            mems,
            clock_skew,
            canvas,
            webgl,
            audio,
            prnu,
            orientation,
            math_engine,
            webgl_render,
            fonts,
            css_features,
            intl,
            audio_stack,
            webgl2,
            media_cap,
            gpu_silicon,
            audio_hardware,
            canvas_micro,
            storage_profile,
        }
    }

    /// Drain the motion streams through bounded sampling windows.
    ///
    /// On iOS the motion API is behind a permission prompt, so sampling is
    /// skipped there unless explicitly enabled.
    async fn sample_motion(&self) -> (Option<MemsData>, Option<OrientationData>) {
        if self.profile.os == OperatingSystem::Ios && !self.config.enable_mems_permission {
            return (None, None);
        }
        let Some(mut streams) = self.provider.motion_streams().await else {
            return (None, None);
        };

        let window = Duration::from_millis(self.config.sampling_duration_ms);
        let (acc, gyro, orientation) = tokio::join!(
            sample_window(&mut streams.accelerometer, window, MAX_MOTION_SAMPLES),
            sample_window(&mut streams.gyroscope, window, MAX_MOTION_SAMPLES),
            sample_window(&mut streams.orientation, window, MAX_MOTION_SAMPLES),
        );

        let mems = MemsData::from_samples(&acc, &gyro);
        let orient = OrientationData::from_samples(&orientation);
        (Some(mems), Some(orient))
    }

    async fn collect_temporal(&self) -> TemporalSignature {
        let (battery, performance) =
            tokio::join!(self.provider.battery(), self.provider.performance());
        TemporalSignature {
            battery,
            performance,
        }
    }

    fn collect_behavioral(&self) -> BehavioralSignature {
        BehavioralSignature {
            // max_touch_points patched from the screen probe after the join
            touch: self.tracker.touch_signature(0),
            keystroke: self.tracker.keystroke_signature(),
            gait: if self.config.enable_gait {
                self.tracker.gait_signature()
            } else {
                None
            },
        }
    }

    async fn collect_mobile(&self) -> MobileSignature {
        let geolocation = async {
            if self.config.enable_geolocation {
                self.provider.geolocation().await
            } else {
                None
            }
        };

        let (screen, speech_voices, network, media_devices, client_hints, locale, ip, geolocation) =
            tokio::join!(
                self.provider.screen(),
                self.provider.speech_voices(),
                self.provider.network(),
                self.provider.media_devices(),
                self.provider.client_hints(),
                self.provider.locale(),
                self.provider.ip(),
                geolocation,
            );

        MobileSignature {
            screen,
            speech_voices,
            network,
            media_devices,
            client_hints,
            locale,
            ip,
            geolocation,
        }
    }
}

/// Run one generation pass without keeping a [`Fingerprinter`] around.
///
/// One-call surface for embedders that do not need behavioral tracking or
/// repeated passes. Errors only on invalid configuration; generation itself
/// cannot fail.
pub async fn generate_fingerprint(
    user_agent: &str,
    config: FingerprintConfig,
    provider: Box<dyn SignalProvider>,
    persistence: PersistenceManager,
) -> Result<FingerprintRecord> {
    let fingerprinter = Fingerprinter::new(user_agent, config, provider, persistence)?;
    Ok(fingerprinter.generate().await)
}

// ============================================================================
// Module presence
// ============================================================================

/// Names of the modules that produced a usable signal, in a fixed order.
///
/// Most signals count as present when their probe returned anything; the
/// exceptions carry an emptiness check because their probes can succeed while
/// reading nothing (zero motion samples, blank canvas hash, a WebGL context
/// with no renderer string).
fn present_modules(details: &LayerDetails) -> Vec<String> {
    let mut modules = Vec::new();
    let mut add = |name: &str| modules.push(name.to_string());

    if let Some(physical) = &details.physical {
        if physical.mems.as_ref().is_some_and(|m| m.sample_count > 0) {
            add("mems");
        }
        if physical.clock_skew.is_some() {
            add("clock-skew");
        }
        if physical.canvas.as_ref().is_some_and(|c| !c.hash.is_empty()) {
            add("canvas");
        }
        if physical
            .webgl
            .as_ref()
            .is_some_and(|w| !w.renderer.is_empty())
        {
            add("webgl");
        }
        if physical.audio.is_some() {
            add("audio-frf");
        }
        if physical.prnu.is_some() {
            add("prnu");
        }
        if physical
            .orientation
            .as_ref()
            .is_some_and(|o| o.compass_heading != 0.0)
        {
            add("orientation");
        }
        if physical.math_engine.is_some() {
            add("math-engine");
        }
        if physical.webgl_render.is_some() {
            add("webgl-render");
        }
        if physical.fonts.as_ref().is_some_and(|f| f.font_count > 0) {
            add("fonts");
        }
        if physical.css_features.is_some() {
            add("css-features");
        }
        if physical.intl.is_some() {
            add("intl");
        }
        if physical.audio_stack.is_some() {
            add("audio-stack");
        }
        if physical.webgl2.is_some() {
            add("webgl2");
        }
        if physical.media_cap.is_some() {
            add("media-cap");
        }
        if physical.gpu_silicon.is_some() {
            add("gpu-silicon");
        }
        if physical.audio_hardware.is_some() {
            add("audio-hardware");
        }
        if physical.canvas_micro.is_some() {
            add("canvas-micro");
        }
        if physical.storage_profile.is_some() {
            add("storage-profile");
        }
    }

    if let Some(temporal) = &details.temporal {
        if temporal.battery.is_some() {
            add("battery-stl");
        }
        if temporal.performance.is_some() {
            add("performance");
        }
    }

    if let Some(behavioral) = &details.behavioral {
        if behavioral.touch.is_some() {
            add("touch");
        }
        if behavioral.keystroke.is_some() {
            add("keystroke");
        }
        if behavioral.gait.is_some() {
            add("gait");
        }
    }

    if let Some(mobile) = &details.mobile {
        if mobile.screen.is_some() {
            add("screen");
        }
        if mobile
            .speech_voices
            .as_ref()
            .is_some_and(|s| s.voice_count > 0)
        {
            add("speech");
        }
        if mobile.network.is_some() {
            add("network");
        }
        if mobile.media_devices.is_some() {
            add("media-devices");
        }
        if mobile.client_hints.is_some() {
            add("client-hints");
        }
        if mobile.locale.is_some() {
            add("locale");
        }
        if mobile.ip.is_some() {
            add("ip");
        }
        if mobile.geolocation.is_some() {
            add("geolocation");
        }
    }

    modules
}

// ============================================================================
// Helper Functions
// ============================================================================

fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
