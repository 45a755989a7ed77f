//! Session configuration and fingerprint data model (spec §3).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::Cookie;

/// Per-origin key/value storage snapshot, as carried in a [`SessionContext`].
pub type OriginStorage = HashMap<String, HashMap<String, String>>;

/// Bandwidth optimization policy.
///
/// Either a simple on/off flag or a fine-grained record of what to block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptimizeBandwidth {
    /// Blanket enable/disable.
    Flag(bool),
    /// Fine-grained blocking policy.
    Record(BandwidthBlockPolicy),
}

impl Default for OptimizeBandwidth {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl OptimizeBandwidth {
    /// Resolve the effective blocking policy, treating `Flag(true)` as
    /// "block images, media and stylesheets" and `Flag(false)` as nothing.
    pub fn resolve(&self) -> BandwidthBlockPolicy {
        match self {
            Self::Flag(false) => BandwidthBlockPolicy::default(),
            Self::Flag(true) => BandwidthBlockPolicy {
                block_images: true,
                block_media: true,
                block_stylesheets: true,
                block_hosts: Vec::new(),
                block_url_patterns: Vec::new(),
            },
            Self::Record(r) => r.clone(),
        }
    }
}

/// Fine-grained bandwidth blocking policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BandwidthBlockPolicy {
    /// Block image resources.
    pub block_images: bool,
    /// Block audio/video resources.
    pub block_media: bool,
    /// Block stylesheet resources.
    pub block_stylesheets: bool,
    /// Hostnames to block outright.
    pub block_hosts: Vec<String>,
    /// Glob-style URL patterns to block (`*` / `?` wildcards).
    pub block_url_patterns: Vec<String>,
}

impl BandwidthBlockPolicy {
    /// Whether this policy blocks nothing (so request interception for
    /// bandwidth purposes can be skipped entirely).
    pub fn is_empty(&self) -> bool {
        !self.block_images
            && !self.block_media
            && !self.block_stylesheets
            && self.block_hosts.is_empty()
            && self.block_url_patterns.is_empty()
    }
}

/// The restorable state an embedder may pass at launch: cookies plus
/// per-origin localStorage and sessionStorage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    /// Cookies to apply before any page loads.
    pub cookies: Vec<Cookie>,
    /// Per-origin localStorage entries, keyed by origin then key.
    pub local_storage: OriginStorage,
    /// Per-origin sessionStorage entries, keyed by origin then key.
    pub session_storage: OriginStorage,
}

impl SessionContext {
    /// True if there is nothing to restore.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty() && self.session_storage.is_empty()
    }
}

/// User-agent client hints override, mirrors the subset of
/// `NavigatorUAData` the fingerprint pipeline reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentData {
    /// Brand/version pairs advertised in `Sec-CH-UA`.
    pub brands: Vec<UaBrand>,
    /// Brand/full-version pairs advertised in `Sec-CH-UA-Full-Version-List`.
    pub full_version_list: Vec<UaBrand>,
    /// Full browser version string.
    pub ua_full_version: String,
    /// Platform name (e.g. "Windows").
    pub platform: String,
    /// Platform version (e.g. "10.0.0").
    pub platform_version: String,
    /// CPU architecture (e.g. "x86").
    pub architecture: String,
    /// CPU bitness (e.g. "64").
    pub bitness: String,
    /// Device model, empty string on desktop.
    #[serde(default)]
    pub model: String,
    /// Whether this is a mobile device.
    pub mobile: bool,
}

/// A single brand/version pair in [`UserAgentData`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UaBrand {
    /// Brand name.
    pub brand: String,
    /// Version string.
    pub version: String,
}

/// Screen metrics read by the fingerprint injector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenMetrics {
    /// Screen width in CSS pixels.
    pub width: i32,
    /// Screen height in CSS pixels.
    pub height: i32,
    /// Available screen width (excluding OS chrome).
    pub avail_width: i32,
    /// Available screen height.
    pub avail_height: i32,
    /// Device pixel ratio.
    pub device_pixel_ratio: f64,
}

/// Spoofed WebGL vendor/renderer strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoCard {
    /// `UNMASKED_VENDOR_WEBGL` value.
    pub vendor: String,
    /// `UNMASKED_RENDERER_WEBGL` value.
    pub renderer: String,
}

/// A bundle of browser-identifiable fields overridden to match a consistent
/// persona. Opaque to the core except for the fields it reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    /// `navigator.userAgent`.
    pub user_agent: String,
    /// `navigator.platform`.
    pub platform: String,
    /// `navigator.hardwareConcurrency`.
    pub hardware_concurrency: u32,
    /// `navigator.deviceMemory`, in gigabytes.
    pub device_memory: u32,
    /// User-Agent Client Hints data.
    pub user_agent_data: UserAgentData,
    /// Screen metrics.
    pub screen: ScreenMetrics,
    /// Spoofed WebGL vendor/renderer.
    pub video_card: VideoCard,
    /// Extra headers to send on every request (e.g. `accept-language`).
    pub headers: HashMap<String, String>,
}

/// Immutable configuration for one session, fixed once a launch begins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Run the browser headless.
    pub headless: bool,
    /// Additional process arguments, allowlisted by the driver.
    pub extra_args: Vec<String>,
    /// Browser profile directory. `None` uses an isolated temp directory.
    pub user_data_dir: Option<PathBuf>,
    /// Initial viewport dimensions.
    pub viewport: Option<(u32, u32)>,
    /// Override for `navigator.userAgent`, independent of the fingerprint.
    pub user_agent: Option<String>,
    /// Upstream proxy URL.
    pub proxy_url: Option<String>,
    /// IANA timezone name, or `None` to leave the system default.
    pub timezone: Option<String>,
    /// Extra headers merged into every request.
    pub custom_headers: HashMap<String, String>,
    /// Abort requests matched by the ad-host/URL classifier.
    pub block_ads: bool,
    /// Bandwidth optimization policy.
    pub optimize_bandwidth: OptimizeBandwidth,
    /// Extension names and/or absolute paths to load.
    pub extensions: Vec<String>,
    /// Optional external log sink URL (forwarded to observers, not used by
    /// the core itself).
    pub log_sink_url: Option<String>,
    /// Cookies/localStorage/sessionStorage to restore before first paint.
    pub session_context: SessionContext,
    /// Arbitrary JSON merged into the browser profile's `Preferences` file.
    pub user_preferences: serde_json::Value,
    /// Skip fingerprint injection entirely (still runs headers/interception).
    pub skip_fingerprint_injection: bool,
    /// A fingerprint record to restore verbatim instead of generating one.
    pub fingerprint: Option<Fingerprint>,
    /// Keep the runtime alive and auto-relaunch after an unexpected disconnect.
    pub keep_alive: bool,
    /// Opaque bag for caller-specific data the core does not interpret.
    pub extra: serde_json::Value,
}

impl SessionConfig {
    /// Canonical JSON used for the "similar config" comparison in §4.4:
    /// drops `log_sink_url`, which is allowed to vary between otherwise
    /// identical launches (e.g. a refreshed signed URL).
    pub fn canonical_for_similarity(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let serde_json::Value::Object(ref mut map) = value {
            map.remove("logSinkUrl");
        }
        value
    }

    /// Two configs are "similar" for launch idempotence purposes: their
    /// canonical representations, after dropping noisy fields, compare
    /// equal.
    pub fn is_similar_to(&self, other: &Self) -> bool {
        self.canonical_for_similarity() == other.canonical_for_similarity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_configs_are_similar() {
        let a = SessionConfig { headless: true, ..Default::default() };
        let b = SessionConfig { headless: true, ..Default::default() };
        assert!(a.is_similar_to(&b));
    }

    #[test]
    fn differing_log_sink_url_is_still_similar() {
        let a = SessionConfig {
            log_sink_url: Some("https://logs.example/a".to_string()),
            ..Default::default()
        };
        let b = SessionConfig {
            log_sink_url: Some("https://logs.example/b".to_string()),
            ..Default::default()
        };
        assert!(a.is_similar_to(&b));
    }

    #[test]
    fn differing_user_data_dir_is_not_similar() {
        let a = SessionConfig {
            user_data_dir: Some(PathBuf::from("/tmp/a")),
            ..Default::default()
        };
        let b = SessionConfig {
            user_data_dir: Some(PathBuf::from("/tmp/b")),
            ..Default::default()
        };
        assert!(!a.is_similar_to(&b));
    }

    #[test]
    fn differing_proxy_url_is_not_similar() {
        let a = SessionConfig {
            proxy_url: Some("http://proxy-a".to_string()),
            ..Default::default()
        };
        let b = SessionConfig::default();
        assert!(!a.is_similar_to(&b));
    }

    #[test]
    fn flag_bandwidth_optimization_resolves_to_expected_record() {
        let on = OptimizeBandwidth::Flag(true).resolve();
        assert!(on.block_images && on.block_media && on.block_stylesheets);
        assert!(OptimizeBandwidth::Flag(false).resolve().is_empty());
    }
}
