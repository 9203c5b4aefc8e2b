//! Signal provider contract
//!
//! The orchestrator is host-agnostic: every environment-specific measurement
//! comes through [`SignalProvider`], one async method per probe. Each method
//! defaults to `None`, so an embedder implements only the probes its host can
//! actually serve and everything else degrades to the absent-signal default.
//!
//! A probe method must not panic and should resolve promptly; the
//! orchestrator wraps the whole collection pass in one timeout rather than
//! racing probes individually.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::signals::types::*;

/// Live motion sample streams, consumed through bounded sampling windows
pub struct MotionStreams {
    pub accelerometer: mpsc::Receiver<[f64; 3]>,
    pub gyroscope: mpsc::Receiver<[f64; 3]>,
    /// Alpha/beta/gamma orientation angles
    pub orientation: mpsc::Receiver<[f64; 3]>,
}

/// Host-environment probe surface. All methods default to `None`.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    // ------------------------------------------------------------------
    // Physical layer
    // ------------------------------------------------------------------

    /// Motion sensor streams for MEMS and orientation characterization.
    /// Called once per generation pass; the streams are drained through
    /// bounded sampling windows.
    async fn motion_streams(&self) -> Option<MotionStreams> {
        None
    }

    /// Elapsed-time measurements of nominal 1ms timer waits
    async fn clock_measurements(&self) -> Option<Vec<f64>> {
        None
    }

    async fn canvas(&self) -> Option<CanvasData> {
        None
    }

    async fn webgl(&self) -> Option<WebglData> {
        None
    }

    async fn audio_frf(&self) -> Option<AudioFrfData> {
        None
    }

    /// Camera sensor noise probe; requires camera permission on every host
    async fn prnu(&self) -> Option<PrnuData> {
        None
    }

    async fn math_engine(&self) -> Option<MathEngineData> {
        None
    }

    async fn webgl_render(&self) -> Option<WebglRenderData> {
        None
    }

    async fn fonts(&self) -> Option<FontData> {
        None
    }

    async fn css_features(&self) -> Option<CssFeatureData> {
        None
    }

    async fn intl(&self) -> Option<IntlData> {
        None
    }

    async fn audio_stack(&self) -> Option<AudioStackData> {
        None
    }

    async fn webgl2(&self) -> Option<Webgl2Data> {
        None
    }

    async fn media_capabilities(&self) -> Option<MediaCapabilitiesData> {
        None
    }

    async fn gpu_silicon(&self) -> Option<GpuSiliconData> {
        None
    }

    async fn audio_hardware(&self) -> Option<AudioHardwareData> {
        None
    }

    async fn canvas_micro(&self) -> Option<CanvasMicroData> {
        None
    }

    async fn storage_profile(&self) -> Option<StorageProfileData> {
        None
    }

    // ------------------------------------------------------------------
    // Temporal layer
    // ------------------------------------------------------------------

    async fn battery(&self) -> Option<BatteryData> {
        None
    }

    async fn performance(&self) -> Option<PerformanceData> {
        None
    }

    // ------------------------------------------------------------------
    // Mobile layer
    // ------------------------------------------------------------------

    async fn screen(&self) -> Option<ScreenData> {
        None
    }

    async fn speech_voices(&self) -> Option<SpeechData> {
        None
    }

    async fn network(&self) -> Option<NetworkData> {
        None
    }

    async fn media_devices(&self) -> Option<MediaDevicesData> {
        None
    }

    async fn client_hints(&self) -> Option<ClientHintsData> {
        None
    }

    async fn locale(&self) -> Option<LocaleData> {
        None
    }

    async fn ip(&self) -> Option<IpData> {
        None
    }

    /// Location probe; permission-gated and disabled unless opted in
    async fn geolocation(&self) -> Option<GeolocationData> {
        None
    }
}

/// Provider with no probes at all; every signal is absent.
///
/// Useful as a base for partial test providers and for headless hosts.
pub struct NullProvider;

#[async_trait]
impl SignalProvider for NullProvider {}
