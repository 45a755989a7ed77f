//! Fingerprint generation (spec §2: "the bundled fingerprint generator
//! library" is an opaque external collaborator). This is a minimal stand-in
//! implementation of that contract: enough to hand the injector a
//! self-consistent persona when a caller doesn't supply one.

use rand::seq::IndexedRandom;

use crate::config::{Fingerprint, ScreenMetrics, UaBrand, UserAgentData, VideoCard};
use crate::error::{FingerprintStage, Result, RuntimeError};

/// A source of fingerprint records. The core depends only on this trait;
/// a real deployment would back it with the external generator library.
pub trait FingerprintGenerator: Send + Sync {
    /// Produce a new, self-consistent fingerprint record.
    fn generate(&self) -> Result<Fingerprint>;
}

struct Persona {
    user_agent: &'static str,
    platform: &'static str,
    ua_platform: &'static str,
    ua_platform_version: &'static str,
    architecture: &'static str,
    bitness: &'static str,
    brand_version: &'static str,
    full_version: &'static str,
    vendor: &'static str,
    renderer: &'static str,
    screen: (i32, i32),
}

const PERSONAS: &[Persona] = &[
    Persona {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "Win32",
        ua_platform: "Windows",
        ua_platform_version: "10.0.0",
        architecture: "x86",
        bitness: "64",
        brand_version: "124",
        full_version: "124.0.6367.91",
        vendor: "Google Inc. (Intel)",
        renderer: "ANGLE (Intel, Mesa Intel(R) UHD Graphics 630 (CFL GT2), OpenGL 4.6)",
        screen: (1920, 1080),
    },
    Persona {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "MacIntel",
        ua_platform: "macOS",
        ua_platform_version: "14.4.0",
        architecture: "arm",
        bitness: "64",
        brand_version: "124",
        full_version: "124.0.6367.91",
        vendor: "Google Inc. (Apple)",
        renderer: "ANGLE (Apple, Apple M2, OpenGL 4.1)",
        screen: (1440, 900),
    },
    Persona {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "Linux x86_64",
        ua_platform: "Linux",
        ua_platform_version: "",
        architecture: "x86",
        bitness: "64",
        brand_version: "124",
        full_version: "124.0.6367.91",
        vendor: "Google Inc. (NVIDIA)",
        renderer: "ANGLE (NVIDIA, NVIDIA GeForce GTX 1660/PCIe/SSE2, OpenGL 4.6)",
        screen: (1920, 1080),
    },
];

const HARDWARE_CONCURRENCY_OPTIONS: &[u32] = &[4, 8, 12, 16];
const DEVICE_MEMORY_OPTIONS: &[u32] = &[4, 8, 16];

/// Picks a random persona from a small built-in pool on every call.
pub struct DefaultFingerprintGenerator;

impl FingerprintGenerator for DefaultFingerprintGenerator {
    fn generate(&self) -> Result<Fingerprint> {
        let mut rng = rand::rng();
        let persona = PERSONAS.choose(&mut rng).ok_or_else(|| RuntimeError::Fingerprint {
            stage: FingerprintStage::Generation,
            message: "no fingerprint personas available".to_string(),
        })?;
        let hardware_concurrency = *HARDWARE_CONCURRENCY_OPTIONS
            .choose(&mut rng)
            .unwrap_or(&8);
        let device_memory = *DEVICE_MEMORY_OPTIONS.choose(&mut rng).unwrap_or(&8);

        Ok(Fingerprint {
            user_agent: persona.user_agent.to_string(),
            platform: persona.platform.to_string(),
            hardware_concurrency,
            device_memory,
            user_agent_data: UserAgentData {
                brands: vec![
                    UaBrand {
                        brand: "Not(A:Brand".to_string(),
                        version: "24".to_string(),
                    },
                    UaBrand {
                        brand: "Chromium".to_string(),
                        version: persona.brand_version.to_string(),
                    },
                    UaBrand {
                        brand: "Google Chrome".to_string(),
                        version: persona.brand_version.to_string(),
                    },
                ],
                full_version_list: vec![UaBrand {
                    brand: "Google Chrome".to_string(),
                    version: persona.full_version.to_string(),
                }],
                ua_full_version: persona.full_version.to_string(),
                platform: persona.ua_platform.to_string(),
                platform_version: persona.ua_platform_version.to_string(),
                architecture: persona.architecture.to_string(),
                bitness: persona.bitness.to_string(),
                model: String::new(),
                mobile: false,
            },
            screen: ScreenMetrics {
                width: persona.screen.0,
                height: persona.screen.1,
                avail_width: persona.screen.0,
                avail_height: persona.screen.1 - 40,
                device_pixel_ratio: 1.0,
            },
            video_card: VideoCard {
                vendor: persona.vendor.to_string(),
                renderer: persona.renderer.to_string(),
            },
            headers: std::collections::HashMap::from([(
                "accept-language".to_string(),
                "en-US,en;q=0.9".to_string(),
            )]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_fingerprint_is_self_consistent() {
        let generator = DefaultFingerprintGenerator;
        let fp = generator.generate().unwrap();
        assert!(!fp.user_agent.is_empty());
        assert!(fp.screen.width > 0 && fp.screen.height > 0);
        assert!(fp.headers.contains_key("accept-language"));
    }
}
