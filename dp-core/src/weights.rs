//! Adaptive layer weighting
//!
//! Turns a [`BrowserProfile`] into (a) four layer weights summing to exactly
//! 1.0 and (b) a per-module contribution table used only for diagnostics and
//! tuning. The branch constants are the contract: every branch sums to 1.0 as
//! written, with no renormalization step.
//!
//! The module contribution figures derive from published fingerprinting
//! entropy studies (Laperdrix et al. 2016, Mowery & Shacham 2012, Cao et al.
//! 2017, DrawnApart 2022), converted from entropy bits to normalized
//! contribution shares. They never feed the identity hash.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::{BrowserProfile, OperatingSystem, SensorTrust};

/// Relative weight of each signal layer for one browser profile.
///
/// Invariant: `physical + temporal + behavioral + mobile == 1.0` for every
/// branch of [`layer_weights`], each component >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub physical: f64,
    pub temporal: f64,
    pub behavioral: f64,
    pub mobile: f64,
}

impl LayerWeights {
    pub fn sum(&self) -> f64 {
        self.physical + self.temporal + self.behavioral + self.mobile
    }
}

/// Per-module diagnostic contribution table, keyed by module name
pub type ModuleContributionTable = BTreeMap<&'static str, f64>;

/// Select layer weights for a profile.
///
/// iOS skews toward physical+mobile (motion APIs are noise-injected or
/// permission-gated, Canvas/WebGL/Speech stay reliable); Android skews toward
/// physical+behavioral (full sensor trust); desktop with low sensor trust
/// leans further on physical; anything else gets the balanced desktop branch.
pub fn layer_weights(profile: &BrowserProfile) -> LayerWeights {
    match profile.os {
        OperatingSystem::Ios => LayerWeights {
            physical: 0.50,
            temporal: 0.10,
            behavioral: 0.15,
            mobile: 0.25,
        },
        OperatingSystem::Android => LayerWeights {
            physical: 0.35,
            temporal: 0.20,
            behavioral: 0.25,
            mobile: 0.20,
        },
        _ if profile.sensor_trust == SensorTrust::Low => LayerWeights {
            physical: 0.55,
            temporal: 0.15,
            behavioral: 0.10,
            mobile: 0.20,
        },
        _ => LayerWeights {
            physical: 0.45,
            temporal: 0.20,
            behavioral: 0.15,
            mobile: 0.20,
        },
    }
}

/// Per-module contribution table for a profile. Diagnostics only.
pub fn module_contributions(profile: &BrowserProfile) -> ModuleContributionTable {
    let mut table: ModuleContributionTable = BTreeMap::new();

    // Physical layer, ~45% combined
    table.insert("webgl", 0.17); // ~11.26 bits, highest single source
    table.insert("canvas", 0.09); // ~5.7 bits
    table.insert("audio-frf", 0.07); // ~4-5 bits
    table.insert("prnu", 0.06);
    table.insert("mems", 0.04);
    table.insert("clock-skew", 0.02);
    table.insert("orientation", 0.02);

    // Temporal layer, ~10%
    table.insert("battery-stl", 0.04);
    table.insert("performance", 0.06);

    // Behavioral layer, ~12%
    table.insert("touch", 0.03);
    table.insert("keystroke", 0.06);
    table.insert("gait", 0.03);

    // Mobile layer, ~28%
    table.insert("screen", 0.10); // ~6.4 bits
    table.insert("speech", 0.06);
    table.insert("network", 0.02);
    table.insert("media-devices", 0.03);
    table.insert("client-hints", 0.03);
    table.insert("locale", 0.04); // ~3-4 bits (timezone)
    table.insert("ip", 0.03);
    table.insert("geolocation", 0.05);

    // Engine/rendering signals, platform-independent
    table.insert("math-engine", 0.06);
    table.insert("webgl-render", 0.05);
    table.insert("fonts", 0.05);
    table.insert("css-features", 0.03);
    table.insert("intl", 0.03);
    table.insert("audio-stack", 0.04);
    table.insert("webgl2", 0.03);
    table.insert("media-cap", 0.03);

    match profile.os {
        OperatingSystem::Ios => {
            // Motion contributions floored, rendering/font/locale raised
            table.insert("mems", 0.01);
            table.insert("gait", 0.01);
            table.insert("orientation", 0.01);
            table.insert("battery-stl", 0.00);
            table.insert("webgl", 0.20);
            table.insert("canvas", 0.10);
            table.insert("screen", 0.10);
            table.insert("speech", 0.08);
            table.insert("fonts", 0.08);
            table.insert("webgl-render", 0.07);
            table.insert("intl", 0.05);
        }
        OperatingSystem::Android => {
            let full_trust = profile.sensor_trust == SensorTrust::High;
            table.insert("mems", if full_trust { 0.10 } else { 0.04 });
            table.insert("gait", if full_trust { 0.08 } else { 0.03 });
            table.insert("orientation", if full_trust { 0.05 } else { 0.02 });
            table.insert("media-cap", 0.05);
            table.insert("webgl-render", 0.06);
            table.insert("audio-stack", 0.05);
        }
        _ => {}
    }

    table
}
