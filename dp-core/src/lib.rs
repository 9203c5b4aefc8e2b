//! dp-core: multi-layer entropy fusion device identity
//!
//! Generates a stable device identifier by fusing signals from four layers:
//!
//! - **Physical**: GPU, canvas, audio, MEMS sensors, clock skew, and the
//!   device-uniqueness probes that separate same-model hardware
//! - **Temporal**: battery discharge and compute performance characteristics
//! - **Behavioral**: touch, keystroke, and gait patterns
//! - **Mobile**: screen, locale, network, and platform surfaces
//!
//! The pipeline is: classify the host from its user agent, pick adaptive
//! layer weights, collect the enabled layers concurrently under a deadline,
//! extract the cross-browser signal set, hash it, then persist the identity
//! across a priority-ordered set of storage backends.
//!
//! Entry points: [`Fingerprinter`] for a long-lived generator with behavioral
//! tracking, or [`generate_fingerprint`] for one-shot use.

pub mod config;
pub mod fingerprinter;
pub mod persist;
pub mod probes;
pub mod profile;
pub mod signals;
pub mod stats;
pub mod tracker;
pub mod weights;

pub use config::{FingerprintConfig, LayerToggles};
pub use fingerprinter::{generate_fingerprint, FingerprintRecord, Fingerprinter};
pub use persist::{FileBackend, MemoryBackend, PersistenceManager, StorageBackend};
pub use probes::{MotionStreams, NullProvider, SignalProvider};
pub use profile::{BrowserFamily, BrowserProfile, OperatingSystem, SensorTrust};
pub use signals::{CrossBrowserSignals, FusedIdentity};
pub use tracker::{BehavioralTracker, TouchSample};
pub use weights::{layer_weights, module_contributions, LayerWeights};

pub use dp_error::{DeviceprintError, Result};
