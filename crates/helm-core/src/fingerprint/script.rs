//! The "JS fingerprint script" (spec §4.5 step 3): a `Page.addScriptToEvaluateOnNewDocument`
//! payload that redefines the handful of `navigator`/WebGL getters a naive
//! bot classifier checks, on every execution context of every frame.

use serde_json::json;

use crate::config::Fingerprint;

/// Build the on-new-document script for `fingerprint`.
///
/// Every value is passed through `serde_json` so it's safely embedded as a
/// JS literal regardless of quoting in the source strings.
pub fn build(fingerprint: &Fingerprint) -> String {
    let platform = json!(fingerprint.platform);
    let hardware_concurrency = fingerprint.hardware_concurrency;
    let device_memory = fingerprint.device_memory;
    let vendor = json!(fingerprint.video_card.vendor);
    let renderer = json!(fingerprint.video_card.renderer);
    let ua_data = build_ua_data_literal(fingerprint);

    format!(
        r#"(() => {{
  const define = (obj, prop, value) => {{
    try {{
      Object.defineProperty(obj, prop, {{ get: () => value, configurable: true }});
    }} catch (e) {{}}
  }};

  define(Navigator.prototype, 'platform', {platform});
  define(Navigator.prototype, 'hardwareConcurrency', {hardware_concurrency});
  define(Navigator.prototype, 'deviceMemory', {device_memory});
  define(Navigator.prototype, 'userAgentData', {ua_data});

  const patchWebGL = (proto) => {{
    const original = proto.getParameter;
    proto.getParameter = function (parameter) {{
      if (parameter === 37445) return {vendor};
      if (parameter === 37446) return {renderer};
      return original.call(this, parameter);
    }};
  }};
  try {{ patchWebGL(WebGLRenderingContext.prototype); }} catch (e) {{}}
  try {{ patchWebGL(WebGL2RenderingContext.prototype); }} catch (e) {{}}
}})();"#,
    )
}

fn build_ua_data_literal(fingerprint: &Fingerprint) -> String {
    let data = &fingerprint.user_agent_data;
    let brands: Vec<_> = data
        .brands
        .iter()
        .map(|b| json!({"brand": b.brand, "version": b.version}))
        .collect();
    json!({
        "brands": brands,
        "mobile": data.mobile,
        "platform": data.platform,
    })
    .to_string()
}

static MOBILE_UA_REGEX: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"Mobi|Android|iPhone|iPad|iPod").expect("static regex is valid")
});

/// Derive the `mobile` device-metrics flag from a user-agent string, per
/// spec §4.5's "mobile flag derived from UA regex".
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_UA_REGEX.is_match(user_agent)
}

/// Derive screen orientation from a width/height pair, per spec §4.5's
/// "orientation derived from aspect".
pub fn is_landscape(width: i32, height: i32) -> bool {
    width >= height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScreenMetrics, UaBrand, UserAgentData, VideoCard};
    use std::collections::HashMap;

    fn sample_fingerprint() -> Fingerprint {
        Fingerprint {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120".to_string(),
            platform: "Win32".to_string(),
            hardware_concurrency: 8,
            device_memory: 8,
            user_agent_data: UserAgentData {
                brands: vec![UaBrand {
                    brand: "Chromium".to_string(),
                    version: "120".to_string(),
                }],
                full_version_list: vec![],
                ua_full_version: "120.0.0.0".to_string(),
                platform: "Windows".to_string(),
                platform_version: "10.0.0".to_string(),
                architecture: "x86".to_string(),
                bitness: "64".to_string(),
                model: String::new(),
                mobile: false,
            },
            screen: ScreenMetrics {
                width: 1920,
                height: 1080,
                avail_width: 1920,
                avail_height: 1040,
                device_pixel_ratio: 1.0,
            },
            video_card: VideoCard {
                vendor: "Google Inc. (Intel)".to_string(),
                renderer: "ANGLE (Intel, Mesa Intel(R) UHD Graphics, OpenGL 4.6)".to_string(),
            },
            headers: HashMap::new(),
        }
    }

    #[test]
    fn script_embeds_platform_and_webgl_strings() {
        let fp = sample_fingerprint();
        let script = build(&fp);
        assert!(script.contains("Win32"));
        assert!(script.contains("Google Inc. (Intel)"));
        assert!(script.contains("hardwareConcurrency"));
    }

    #[test]
    fn mobile_detection_matches_known_markers() {
        assert!(is_mobile_user_agent("Mozilla/5.0 (Linux; Android 13)"));
        assert!(is_mobile_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"));
        assert!(!is_mobile_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"
        ));
    }

    #[test]
    fn orientation_follows_aspect_ratio() {
        assert!(is_landscape(1920, 1080));
        assert!(!is_landscape(1080, 1920));
    }
}
