/*
 * Integration tests for deviceprint
 *
 * These tests verify the interaction between different modules
 * and exercise the generation pipeline end to end.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use dp_core::signals::types::*;
use dp_core::{
    BrowserProfile, FingerprintConfig, Fingerprinter, MemoryBackend, NullProvider,
    OperatingSystem, PersistenceManager, SensorTrust, SignalProvider, StorageBackend,
};

const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Mobile Safari/537.36";
const ANDROID_FIREFOX: &str =
    "Mozilla/5.0 (Android 14; Mobile; rv:124.0) Gecko/124.0 Firefox/124.0";

// Test utilities

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn memory_persistence() -> PersistenceManager {
    PersistenceManager::new(vec![Arc::new(MemoryBackend::new())])
}

fn fingerprinter(
    ua: &str,
    provider: Box<dyn SignalProvider>,
    persistence: PersistenceManager,
) -> Fingerprinter {
    Fingerprinter::new(ua, FingerprintConfig::default(), provider, persistence).unwrap()
}

/// Provider modeling one concrete device with a full passive probe set
struct PixelDevice;

#[async_trait]
impl SignalProvider for PixelDevice {
    async fn webgl(&self) -> Option<WebglData> {
        Some(WebglData {
            vendor: "Qualcomm".into(),
            renderer: "Adreno (TM) 740".into(),
            hash: "a1b2c3".into(),
            performance_hint: "high-performance".into(),
            extension_count: 41,
            shader_precision: "highp/23/127".into(),
            max_texture_size: 16384,
            max_viewport_dims: "16384,16384".into(),
            max_renderbuffer_size: 16384,
            max_vertex_attribs: 16,
        })
    }

    async fn math_engine(&self) -> Option<MathEngineData> {
        Some(MathEngineData {
            precision: "1.4142135623730951|0.8414709848078965".into(),
        })
    }

    async fn gpu_silicon(&self) -> Option<GpuSiliconData> {
        Some(GpuSiliconData {
            shader_results: "0.70710678,0.57735027".into(),
            multi_pass_results: "0.33219281".into(),
        })
    }

    async fn storage_profile(&self) -> Option<StorageProfileData> {
        Some(StorageProfileData {
            quota: 299_977_904_946,
            usage: 1_048_576,
        })
    }

    async fn performance(&self) -> Option<PerformanceData> {
        Some(PerformanceData {
            compute_score: 812.5,
            memory_profile: 8,
            core_count: 8,
            heap_volatility: 0.02,
        })
    }

    async fn screen(&self) -> Option<ScreenData> {
        Some(ScreenData {
            width: 1080,
            height: 2400,
            avail_width: 1080,
            avail_height: 2296,
            color_depth: 24,
            pixel_ratio: 2.625,
            touch_points: 5,
            orientation: "portrait-primary".into(),
            hdr: true,
            hash: "scr".into(),
        })
    }

    async fn locale(&self) -> Option<LocaleData> {
        Some(LocaleData {
            language: "en-US".into(),
            languages: vec!["en-US".into(), "en".into()],
            timezone: "America/New_York".into(),
            timezone_offset: 300,
        })
    }

    async fn client_hints(&self) -> Option<ClientHintsData> {
        Some(ClientHintsData {
            platform: "Android".into(),
            platform_version: "14.0.0".into(),
            mobile: true,
            model: "Pixel 8".into(),
            brands: vec!["Chromium".into(), "Google Chrome".into()],
            architecture: "arm".into(),
        })
    }
}

// End-to-end pipeline

#[tokio::test]
async fn test_empty_record_hashes_default_serialization() {
    let fp = fingerprinter(ANDROID_CHROME, Box::new(NullProvider), memory_persistence());
    let record = fp.generate().await;

    // All probes absent: the canonical serialization is fully defaulted and
    // the record hash must equal its SHA-256 exactly
    let expected = sha256_hex("||||0.00|0||0|0|||0|0,0|0|0|0||||||||||||");
    assert_eq!(record.hash, expected);
    assert_eq!(record.accuracy, 0.02);
    assert!(record.modules.is_empty());
}

#[tokio::test]
async fn test_full_device_pipeline() {
    let fp = fingerprinter(ANDROID_CHROME, Box::new(PixelDevice), memory_persistence());
    let record = fp.generate().await;

    assert_eq!(record.signals.gpu_renderer, "Adreno (TM) 740");
    assert_eq!(record.signals.screen_resolution, "1080x2400");
    assert_eq!(record.signals.pixel_ratio, "2.62");
    assert_eq!(record.signals.hardware_concurrency, 8);
    assert_eq!(record.signals.timezone, "America/New_York");
    assert_eq!(record.signals.platform, "Android");
    assert_eq!(record.signals.gpu_silicon_hash.len(), 24);
    assert_eq!(record.signals.storage_profile_hash.len(), 24);
    assert_eq!(record.signals.math_engine_hash.len(), 16);

    // hash is reproducible from the serialized signal set
    assert_eq!(record.hash, sha256_hex(&record.signals.serialize()));

    // renderer 0.10, vendor 0.02, screen 0.05, timezone 0.03, cores 0.03,
    // shader precision 0.05, texture size 0.03, platform 0.02, math 0.05,
    // gpu-silicon 0.12, storage 0.04 over the 0.02 floor
    assert!((record.accuracy - 0.56).abs() < 1e-12);

    for module in ["webgl", "math-engine", "gpu-silicon", "storage-profile",
        "performance", "screen", "locale", "client-hints"] {
        assert!(
            record.modules.contains(&module.to_string()),
            "missing module {}",
            module
        );
    }
}

#[tokio::test]
async fn test_same_device_stable_across_browsers() {
    // Same hardware probed from two different browsers: layer weights differ
    // but the identity hash must not
    let chrome = fingerprinter(ANDROID_CHROME, Box::new(PixelDevice), memory_persistence())
        .generate()
        .await;
    let firefox = fingerprinter(ANDROID_FIREFOX, Box::new(PixelDevice), memory_persistence())
        .generate()
        .await;

    assert_eq!(chrome.hash, firefox.hash);
    assert_eq!(chrome.profile.browser, dp_core::BrowserFamily::Chrome);
    assert_eq!(firefox.profile.browser, dp_core::BrowserFamily::Firefox);
}

#[tokio::test]
async fn test_different_devices_diverge() {
    struct OtherDevice;

    #[async_trait]
    impl SignalProvider for OtherDevice {
        async fn webgl(&self) -> Option<WebglData> {
            Some(WebglData {
                vendor: "ARM".into(),
                renderer: "Mali-G715".into(),
                ..Default::default()
            })
        }
    }

    let a = fingerprinter(ANDROID_CHROME, Box::new(PixelDevice), memory_persistence())
        .generate()
        .await;
    let b = fingerprinter(ANDROID_CHROME, Box::new(OtherDevice), memory_persistence())
        .generate()
        .await;
    assert_ne!(a.hash, b.hash);
}

#[tokio::test]
async fn test_one_shot_convenience_function() {
    let record = dp_core::generate_fingerprint(
        ANDROID_CHROME,
        FingerprintConfig::default(),
        Box::new(PixelDevice),
        memory_persistence(),
    )
    .await
    .unwrap();
    assert_eq!(record.hash.len(), 64);
    assert!(record.modules.contains(&"webgl".to_string()));
}

// Persistence cycle

/// Backend recording reads so recovery ordering can be asserted
struct CountingBackend {
    value: Mutex<Option<String>>,
    gets: AtomicUsize,
}

impl CountingBackend {
    fn holding(value: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value),
            gets: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    async fn get(&self) -> dp_core::Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.lock().clone())
    }

    async fn put(&self, value: &str) -> dp_core::Result<()> {
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn test_recovery_honors_priority_and_skips_slow_tier() {
    // Seed a full five-slot set via one generation pass
    let slots: Vec<Arc<CountingBackend>> =
        (0..5).map(|_| CountingBackend::holding(None)).collect();
    let seeded = fingerprinter(
        ANDROID_CHROME,
        Box::new(PixelDevice),
        PersistenceManager::new(slots.iter().map(|s| s.clone() as Arc<dyn StorageBackend>).collect()),
    )
    .generate()
    .await;
    assert!(slots.iter().all(|s| s.value.lock().is_some()));

    // Fresh manager over the seeded slots: slot 1 hits, slots 4 and 5 are
    // never consulted
    for slot in &slots {
        slot.gets.store(0, Ordering::SeqCst);
    }
    let manager = PersistenceManager::new(
        slots.iter().map(|s| s.clone() as Arc<dyn StorageBackend>).collect(),
    );
    assert_eq!(manager.recover().await.as_deref(), Some(seeded.hash.as_str()));
    assert_eq!(slots[0].gets.load(Ordering::SeqCst), 1);
    assert_eq!(slots[1].gets.load(Ordering::SeqCst), 0);
    assert_eq!(slots[3].gets.load(Ordering::SeqCst), 0);
    assert_eq!(slots[4].gets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resync_repairs_wiped_slot_without_touching_conflicts() {
    let slots: Vec<Arc<CountingBackend>> =
        (0..3).map(|_| CountingBackend::holding(None)).collect();
    let manager = || {
        PersistenceManager::new(
            slots.iter().map(|s| s.clone() as Arc<dyn StorageBackend>).collect(),
        )
    };

    let record = fingerprinter(ANDROID_CHROME, Box::new(PixelDevice), manager())
        .generate()
        .await;

    // Wipe one slot, plant a foreign value in another
    *slots[1].value.lock() = None;
    *slots[2].value.lock() = Some(r#"{"h":"foreign","t":1}"#.to_string());

    let repaired = manager().resync(&record.hash).await;
    assert_eq!(repaired, 1);
    assert!(slots[1].value.lock().as_deref().unwrap().contains(&record.hash));
    // Conflicting slot untouched: resync fills gaps, never overwrites
    assert_eq!(
        slots[2].value.lock().as_deref(),
        Some(r#"{"h":"foreign","t":1}"#)
    );
}

#[tokio::test]
async fn test_identity_survives_regeneration_through_shared_storage() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());

    let first = fingerprinter(
        ANDROID_CHROME,
        Box::new(PixelDevice),
        PersistenceManager::new(vec![backend.clone()]),
    )
    .generate()
    .await;
    let second = fingerprinter(
        ANDROID_CHROME,
        Box::new(PixelDevice),
        PersistenceManager::new(vec![backend]),
    )
    .generate()
    .await;

    assert_eq!(second.previous_hash.as_deref(), Some(first.hash.as_str()));
    assert_eq!(first.hash, second.hash);
}

// Profile and weighting

#[tokio::test]
async fn test_weights_follow_classified_profile() {
    let fp = fingerprinter(ANDROID_CHROME, Box::new(NullProvider), memory_persistence());
    assert_eq!(fp.profile().os, OperatingSystem::Android);
    assert_eq!(fp.profile().sensor_trust, SensorTrust::High);
    let w = fp.weights();
    assert_eq!(w.physical, 0.35);
    assert_eq!(w.behavioral, 0.25);
    assert!((w.sum() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_explicit_weight_override() {
    let config = FingerprintConfig {
        weights: Some(dp_core::LayerWeights {
            physical: 0.7,
            temporal: 0.1,
            behavioral: 0.1,
            mobile: 0.1,
        }),
        ..Default::default()
    };
    let fp = Fingerprinter::new(
        ANDROID_CHROME,
        config,
        Box::new(NullProvider),
        memory_persistence(),
    )
    .unwrap();
    assert_eq!(fp.weights().physical, 0.7);
}

#[test]
fn test_classification_matches_weighting_assumptions() {
    let ios = BrowserProfile::classify(
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    );
    assert_eq!(ios.sensor_trust, SensorTrust::Low);
    let w = dp_core::layer_weights(&ios);
    assert_eq!(w.physical, 0.50);

    let table = dp_core::module_contributions(&ios);
    assert_eq!(table["mems"], 0.01);
}
