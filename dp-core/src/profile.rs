//! Browser profile classification
//!
//! Maps a user-agent string to a small immutable profile: browser family,
//! operating system, embedded-browser flag, and a sensor trust level. The
//! trust level drives the adaptive layer weighting: iOS perturbs its motion
//! APIs on purpose, privacy-hardened Firefox variants fuzz them, Android
//! exposes them unfiltered.
//!
//! Classification is a pure function. There is no hidden process-wide cache;
//! the orchestrator classifies once at construction and carries the value.

use serde::{Deserialize, Serialize};

/// Browser family detected from the user-agent string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    Chrome,
    Safari,
    Firefox,
    Edge,
    Samsung,
    /// In-app browser (social/messaging WebView); forced when any embedded
    /// signature matches, regardless of other patterns
    Embedded,
    Unknown,
}

impl Default for BrowserFamily {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Operating system detected from the user-agent string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Ios,
    Android,
    Windows,
    Macos,
    Linux,
    Unknown,
}

impl Default for OperatingSystem {
    fn default() -> Self {
        Self::Unknown
    }
}

/// How much the motion/orientation sensor APIs can be trusted on this platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorTrust {
    High,
    Medium,
    Low,
}

impl Default for SensorTrust {
    fn default() -> Self {
        Self::Medium
    }
}

/// Immutable classification of the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrowserProfile {
    pub browser: BrowserFamily,
    pub os: OperatingSystem,
    pub embedded_browser: bool,
    pub sensor_trust: SensorTrust,
}

/// In-app browser signatures (social/messaging apps, generic WebView marker)
const EMBEDDED_SIGNATURES: &[&str] = &[
    "fban", "fbav",         // Facebook
    "twitter", "twitterandroid",
    "instagram",
    "line",
    "kakaotalk",
    "naver", "whale",
    "wv)",                  // Android WebView
    "linkedinapp",
    "snapchat",
];

impl BrowserProfile {
    /// Classify a user-agent string.
    ///
    /// OS detection is an ordered first-match-wins scan; embedded detection is
    /// a substring match against a fixed signature list and overrides the
    /// browser family when it hits.
    pub fn classify(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();

        let os = if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
            OperatingSystem::Ios
        } else if ua.contains("android") {
            OperatingSystem::Android
        } else if ua.contains("windows") {
            OperatingSystem::Windows
        } else if ua.contains("mac os x") {
            OperatingSystem::Macos
        } else if ua.contains("linux") {
            OperatingSystem::Linux
        } else {
            OperatingSystem::Unknown
        };

        let embedded_browser = EMBEDDED_SIGNATURES.iter().any(|sig| ua.contains(sig));

        let browser = if embedded_browser {
            BrowserFamily::Embedded
        } else if ua.contains("samsungbrowser") {
            BrowserFamily::Samsung
        } else if ua.contains("edg") {
            BrowserFamily::Edge
        } else if ua.contains("chrome") && !ua.contains("chromium") {
            BrowserFamily::Chrome
        } else if ua.contains("safari") && !ua.contains("chrome") {
            BrowserFamily::Safari
        } else if ua.contains("firefox") {
            BrowserFamily::Firefox
        } else {
            BrowserFamily::Unknown
        };

        // iOS fuzzes motion APIs platform-wide (in-app browsers included, they
        // all run WKWebView); privacy-hardened Firefox variants do the same.
        let sensor_trust = if os == OperatingSystem::Ios {
            SensorTrust::Low
        } else if browser == BrowserFamily::Firefox && ua.contains("privacy") {
            SensorTrust::Low
        } else if os == OperatingSystem::Android {
            SensorTrust::High
        } else {
            SensorTrust::Medium
        };

        Self {
            browser,
            os,
            embedded_browser,
            sensor_trust,
        }
    }

    /// True for phone/tablet platforms
    pub fn is_mobile(&self) -> bool {
        matches!(self.os, OperatingSystem::Ios | OperatingSystem::Android)
    }
}
