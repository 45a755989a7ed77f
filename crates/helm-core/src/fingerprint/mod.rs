//! Fingerprint & Context Injector (spec §4.5, C5).
//!
//! Runs the full per-page pipeline the spec lays out: timezone, header
//! injection + request interception, fingerprint overrides, and session
//! context restore. Driven once per observed page target (including the
//! primary page that already exists at launch) and re-entered on every
//! top-level frame navigation for the session-context step.

mod adblock;
mod generator;
mod script;

pub use generator::{DefaultFingerprintGenerator, FingerprintGenerator};

use std::collections::HashSet;
use std::sync::Arc;

use helm_cdp::CdpConnection;
use helm_cdp::protocol::emulation::{
    ScreenOrientation, ScreenOrientationType, SetDeviceMetricsOverrideParams,
    SetTimezoneOverrideParams, SetUserAgentOverrideParams, UserAgentBrandVersion,
    UserAgentMetadata,
};
use helm_cdp::protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, ErrorReason, FailRequestParams,
    HeaderEntry, RequestPattern, RequestPausedEvent,
};
use helm_cdp::protocol::page::{AddScriptToEvaluateOnNewDocumentParams, FrameNavigatedEvent};
use helm_cdp::protocol::runtime::EvaluateParams;
use helm_cdp::protocol::{CookieParam, CookieSameSite};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::{Fingerprint, SessionConfig, SessionContext};
use crate::error::{FingerprintStage, Result, RuntimeError, SessionContextStage};
use crate::events::{EventSender, LogEvent, LogKind, PageId, RuntimeEvent};

/// Errors from a single CDP command during injection are logged and
/// swallowed when they indicate the page already closed, so one page's
/// teardown never fails the whole pipeline (spec §4.5 edge case).
fn is_target_closed(err: &RuntimeError) -> bool {
    matches!(err, RuntimeError::Cdp(e) if e.to_string().to_lowercase().contains("no session with given id")
        || e.to_string().to_lowercase().contains("target closed")
        || e.to_string().to_lowercase().contains("not found"))
}

/// Per-runtime state for the injector: which page targets already have
/// request interception installed, so the pipeline stays idempotent when
/// re-entered (e.g. a retried launch revisiting the same primary page).
#[derive(Default)]
pub struct FingerprintInjector {
    intercepting: Mutex<HashSet<String>>,
}

impl FingerprintInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the full new-page pipeline (spec §4.5 steps 1-6) for `target_id`
    /// under `session_id`.
    pub async fn inject_new_page(
        &self,
        connection: &Arc<CdpConnection>,
        session_id: &str,
        target_id: &str,
        config: &SessionConfig,
        fingerprint: &Fingerprint,
        events: &EventSender,
    ) -> Result<()> {
        if let Err(e) = enable_domains(connection, session_id).await {
            if is_target_closed(&e) {
                debug!(target_id, "page closed before domains could be enabled, skipping");
                return Ok(());
            }
            return Err(e);
        }

        self.apply_timezone(connection, session_id, config).await;

        self.install_interception(connection, session_id, target_id, config, fingerprint, events)
            .await?;

        if !config.skip_fingerprint_injection {
            if let Err(e) = self.apply_fingerprint(connection, session_id, fingerprint).await {
                if is_target_closed(&e) {
                    debug!(target_id, "page closed mid fingerprint injection, skipping rest");
                    return Ok(());
                }
                warn!(target_id, error = %e, "fingerprint injection failed, continuing without it");
            }
        }

        if !config.session_context.is_empty() {
            if let Err(e) = apply_cookies(connection, session_id, &config.session_context).await {
                warn!(target_id, error = %e, "session context cookie restore failed");
            }
            if let Some(origin) = current_origin(connection, session_id).await {
                if let Err(e) =
                    Self::reapply_storage_context(connection, session_id, &origin, &config.session_context)
                        .await
                {
                    warn!(target_id, error = %e, "session context storage restore failed");
                }
            }
        }

        let _ = events.send(RuntimeEvent::Log(LogEvent::new(
            LogKind::Navigation,
            format!("page ready: {target_id}"),
        )));
        let _ = events.send(RuntimeEvent::TargetChanged(PageId {
            page_id: target_id.to_string(),
        }));

        Ok(())
    }

    /// Re-apply per-origin localStorage/sessionStorage for `origin`, on
    /// initial injection and again after every top-level frame navigation
    /// (spec §4.5 step 5). Takes no `&self`: callable from the per-page
    /// background navigation watcher, which outlives any particular
    /// `&FingerprintInjector` borrow.
    pub async fn reapply_storage_context(
        connection: &Arc<CdpConnection>,
        session_id: &str,
        origin: &str,
        context: &SessionContext,
    ) -> Result<()> {
        let local = context.local_storage.get(origin);
        let session = context.session_storage.get(origin);
        if local.is_none() && session.is_none() {
            return Ok(());
        }

        let script = build_storage_restore_script(local, session);
        let params = EvaluateParams {
            expression: script,
            object_group: None,
            include_command_line_api: None,
            silent: Some(true),
            context_id: None,
            return_by_value: Some(true),
            await_promise: None,
        };
        let result: helm_cdp::protocol::runtime::EvaluateResult = connection
            .send_command("Runtime.evaluate", Some(params), Some(session_id))
            .await
            .map_err(|e| RuntimeError::SessionContext {
                stage: SessionContextStage::Storage,
                message: e.to_string(),
            })?;
        if let Some(exc) = result.exception_details {
            return Err(RuntimeError::SessionContext {
                stage: SessionContextStage::Storage,
                message: exc.text,
            });
        }
        Ok(())
    }

    async fn apply_timezone(&self, connection: &CdpConnection, session_id: &str, config: &SessionConfig) {
        let Some(timezone) = &config.timezone else {
            return;
        };
        let result = connection
            .send_command::<_, serde_json::Value>(
                "Emulation.setTimezoneOverride",
                Some(SetTimezoneOverrideParams::new(timezone.clone())),
                Some(session_id),
            )
            .await;
        if let Err(e) = result {
            warn!(timezone, error = %e, "timezone override failed, continuing without it");
        }
    }

    async fn apply_fingerprint(
        &self,
        connection: &CdpConnection,
        session_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<()> {
        let accept_language = fingerprint.headers.get("accept-language").cloned();
        connection
            .send_command::<_, serde_json::Value>(
                "Emulation.setUserAgentOverride",
                Some(SetUserAgentOverrideParams {
                    user_agent: fingerprint.user_agent.clone(),
                    accept_language,
                    platform: Some(fingerprint.platform.clone()),
                    user_agent_metadata: Some(build_ua_metadata(fingerprint)),
                }),
                Some(session_id),
            )
            .await
            .map_err(to_injection_error)?;

        let mobile = script::is_mobile_user_agent(&fingerprint.user_agent);
        let orientation_type = if script::is_landscape(fingerprint.screen.width, fingerprint.screen.height)
        {
            ScreenOrientationType::LandscapePrimary
        } else {
            ScreenOrientationType::PortraitPrimary
        };
        connection
            .send_command::<_, serde_json::Value>(
                "Emulation.setDeviceMetricsOverride",
                Some(SetDeviceMetricsOverrideParams {
                    width: fingerprint.screen.width,
                    height: fingerprint.screen.height,
                    device_scale_factor: fingerprint.screen.device_pixel_ratio,
                    mobile,
                    scale: None,
                    screen_width: Some(fingerprint.screen.avail_width),
                    screen_height: Some(fingerprint.screen.avail_height),
                    position_x: None,
                    position_y: None,
                    dont_set_visible_size: None,
                    screen_orientation: Some(ScreenOrientation {
                        orientation_type,
                        angle: 0,
                    }),
                    viewport: None,
                    display_feature: None,
                    device_posture: None,
                }),
                Some(session_id),
            )
            .await
            .map_err(to_injection_error)?;

        connection
            .send_command::<_, serde_json::Value>(
                "Page.addScriptToEvaluateOnNewDocument",
                Some(AddScriptToEvaluateOnNewDocumentParams {
                    source: script::build(fingerprint),
                    world_name: None,
                    include_command_line_api: None,
                    run_immediately: Some(true),
                }),
                Some(session_id),
            )
            .await
            .map_err(to_injection_error)?;

        Ok(())
    }

    /// Install the combined header-injection / ad-block / bandwidth /
    /// `file://` guard request interceptor (spec §4.5 steps 2 and 4).
    /// Idempotent per `target_id`.
    async fn install_interception(
        &self,
        connection: &Arc<CdpConnection>,
        session_id: &str,
        target_id: &str,
        config: &SessionConfig,
        fingerprint: &Fingerprint,
        events: &EventSender,
    ) -> Result<()> {
        {
            let mut guard = self.intercepting.lock();
            if !guard.insert(target_id.to_string()) {
                return Ok(());
            }
        }

        let policy = config.optimize_bandwidth.resolve();

        // The file:// guard is a hard invariant; ad-block/bandwidth/header
        // handling ride along on the same interceptor once it's installed.
        connection
            .send_command::<_, serde_json::Value>(
                "Fetch.enable",
                Some(FetchEnableParams {
                    patterns: Some(vec![RequestPattern::all()]),
                    handle_auth_requests: None,
                }),
                Some(session_id),
            )
            .await
            .map_err(to_injection_error)?;

        let extra_headers = build_extra_headers(config, fingerprint);
        let connection = connection.clone();
        let session_id = session_id.to_string();
        let target_id = target_id.to_string();
        let events = events.clone();
        let block_ads = config.block_ads;
        let session_context = (!config.session_context.is_empty())
            .then(|| Arc::new(config.session_context.clone()));

        tokio::spawn(async move {
            let mut rx = connection.subscribe_events();
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                if event.method == "Page.frameNavigated" {
                    if event.session_id.as_deref() != Some(session_id.as_str()) {
                        continue;
                    }
                    let Some(context) = &session_context else { continue };
                    let Some(params) = event.params else { continue };
                    let Ok(navigated): std::result::Result<FrameNavigatedEvent, _> =
                        serde_json::from_value(params)
                    else {
                        continue;
                    };
                    if navigated.frame.parent_id.is_some() {
                        continue;
                    }
                    let Some(origin) = origin_from_url(&navigated.frame.url) else {
                        continue;
                    };
                    if let Err(e) = FingerprintInjector::reapply_storage_context(
                        &connection,
                        &session_id,
                        &origin,
                        context,
                    )
                    .await
                    {
                        warn!(target_id, error = %e, "session context storage restore after navigation failed");
                    }
                    continue;
                }

                if event.method != "Fetch.requestPaused" {
                    continue;
                }
                if event.session_id.as_deref() != Some(session_id.as_str()) {
                    continue;
                }
                let Some(params) = event.params else { continue };
                let Ok(paused): std::result::Result<RequestPausedEvent, _> =
                    serde_json::from_value(params)
                else {
                    continue;
                };

                if paused.request.url.starts_with("file://") {
                    let _ = connection
                        .send_command::<_, serde_json::Value>(
                            "Fetch.failRequest",
                            Some(FailRequestParams {
                                request_id: paused.request_id.clone(),
                                error_reason: ErrorReason::BlockedByClient,
                            }),
                            Some(session_id.as_str()),
                        )
                        .await;
                    let _ = events.send(RuntimeEvent::Log(LogEvent::new(
                        LogKind::BrowserError,
                        "file:// navigation blocked, runtime is shutting down".to_string(),
                    )));
                    let _ = events.send(RuntimeEvent::FileProtocolAbort);
                    continue;
                }

                if (block_ads && adblock::is_ad_request(&paused.request.url))
                    || adblock::is_bandwidth_blocked(&paused, &policy)
                {
                    let _ = connection
                        .send_command::<_, serde_json::Value>(
                            "Fetch.failRequest",
                            Some(FailRequestParams {
                                request_id: paused.request_id.clone(),
                                error_reason: ErrorReason::BlockedByClient,
                            }),
                            Some(session_id.as_str()),
                        )
                        .await;
                    continue;
                }

                let mut headers: Vec<HeaderEntry> = paused
                    .request
                    .headers
                    .iter()
                    .filter(|(k, _)| !k.eq_ignore_ascii_case("accept-language"))
                    .map(|(name, value)| HeaderEntry {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect();
                for (name, value) in &extra_headers {
                    headers.retain(|h| !h.name.eq_ignore_ascii_case(name));
                    headers.push(HeaderEntry {
                        name: name.clone(),
                        value: value.clone(),
                    });
                }

                let result = connection
                    .send_command::<_, serde_json::Value>(
                        "Fetch.continueRequest",
                        Some(ContinueRequestParams {
                            request_id: paused.request_id.clone(),
                            url: None,
                            method: None,
                            post_data: None,
                            headers: Some(headers),
                            intercept_response: None,
                        }),
                        Some(session_id.as_str()),
                    )
                    .await;
                if let Err(e) = result {
                    trace!(target_id, error = %e, "continueRequest failed, request likely already settled");
                }
            }
        });

        Ok(())
    }
}

fn to_injection_error(e: helm_cdp::CdpError) -> RuntimeError {
    RuntimeError::Fingerprint {
        stage: FingerprintStage::Injection,
        message: e.to_string(),
    }
}

/// The live page's current `location.href`, for an initial storage-restore
/// attempt right after injection (spec §4.5 step 5). Best-effort: `None` on
/// any evaluation failure just means injection-time restore is skipped and
/// the frame-navigated watcher picks it up on the first real navigation.
async fn current_origin(connection: &CdpConnection, session_id: &str) -> Option<String> {
    let params = EvaluateParams {
        expression: "location.href".to_string(),
        object_group: None,
        include_command_line_api: None,
        silent: Some(true),
        context_id: None,
        return_by_value: Some(true),
        await_promise: None,
    };
    let result: helm_cdp::protocol::runtime::EvaluateResult = connection
        .send_command("Runtime.evaluate", Some(params), Some(session_id))
        .await
        .ok()?;
    let href = result.result.value?;
    origin_from_url(href.as_str()?)
}

/// Derive a `scheme://host[:port]` origin string from a page URL, matching
/// the `location.origin` format the state extractor's live-page dump uses
/// for its storage map keys. `None` for non-http(s) URLs (`about:blank`,
/// `file://`, …), which never carry restorable storage.
fn origin_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{host}:{port}", parsed.scheme())),
        None => Some(format!("{}://{host}", parsed.scheme())),
    }
}

async fn enable_domains(connection: &CdpConnection, session_id: &str) -> Result<()> {
    for method in ["Page.enable", "Network.enable", "Runtime.enable"] {
        connection
            .send_command::<(), serde_json::Value>(method, None, Some(session_id))
            .await?;
    }
    Ok(())
}

fn build_ua_metadata(fingerprint: &Fingerprint) -> UserAgentMetadata {
    let data = &fingerprint.user_agent_data;
    UserAgentMetadata {
        brands: Some(
            data.brands
                .iter()
                .map(|b| UserAgentBrandVersion {
                    brand: b.brand.clone(),
                    version: b.version.clone(),
                })
                .collect(),
        ),
        full_version_list: Some(
            data.full_version_list
                .iter()
                .map(|b| UserAgentBrandVersion {
                    brand: b.brand.clone(),
                    version: b.version.clone(),
                })
                .collect(),
        ),
        full_version: Some(data.ua_full_version.clone()),
        platform: data.platform.clone(),
        platform_version: data.platform_version.clone(),
        architecture: data.architecture.clone(),
        model: data.model.clone(),
        mobile: data.mobile,
        bitness: Some(data.bitness.clone()),
        wow64: None,
    }
}

/// Merge default fingerprint headers with `config.custom_headers`, per spec
/// §4.5 step 2 ("merge default headers, config.customHeaders"). Caller-
/// configured headers win on conflict.
fn build_extra_headers(
    config: &SessionConfig,
    fingerprint: &Fingerprint,
) -> Vec<(String, String)> {
    let mut merged = fingerprint.headers.clone();
    merged.extend(config.custom_headers.clone());
    merged.into_iter().collect()
}

async fn apply_cookies(
    connection: &CdpConnection,
    session_id: &str,
    context: &SessionContext,
) -> Result<()> {
    for cookie in &context.cookies {
        let param = CookieParam {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            url: None,
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site.map(to_cdp_same_site),
            expires: cookie.expires,
            priority: None,
            same_party: None,
            source_scheme: None,
            source_port: None,
            partition_key: None,
        };
        connection
            .send_command::<_, serde_json::Value>("Network.setCookie", Some(param), Some(session_id))
            .await
            .map_err(|e| RuntimeError::SessionContext {
                stage: SessionContextStage::Cookies,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

fn to_cdp_same_site(s: crate::types::SameSite) -> CookieSameSite {
    use crate::types::SameSite as S;
    match s {
        S::Strict => CookieSameSite::Strict,
        S::Lax => CookieSameSite::Lax,
        S::None => CookieSameSite::None,
    }
}

fn build_storage_restore_script(
    local: Option<&std::collections::HashMap<String, String>>,
    session: Option<&std::collections::HashMap<String, String>>,
) -> String {
    let local_json = serde_json::to_string(&local.cloned().unwrap_or_default()).unwrap_or_default();
    let session_json = serde_json::to_string(&session.cloned().unwrap_or_default()).unwrap_or_default();
    format!(
        r#"(() => {{
  const local = {local_json};
  const session = {session_json};
  for (const [k, v] of Object.entries(local)) {{ try {{ window.localStorage.setItem(k, v); }} catch (e) {{}} }}
  for (const [k, v] of Object.entries(session)) {{ try {{ window.sessionStorage.setItem(k, v); }} catch (e) {{}} }}
}})();"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn extra_headers_prefer_config_over_fingerprint() {
        let mut config = SessionConfig::default();
        config
            .custom_headers
            .insert("x-test".to_string(), "config".to_string());
        let mut fingerprint_headers = HashMap::new();
        fingerprint_headers.insert("x-test".to_string(), "fingerprint".to_string());
        let fingerprint = sample_fingerprint(fingerprint_headers);

        let merged = build_extra_headers(&config, &fingerprint);
        let value = merged.iter().find(|(k, _)| k == "x-test").map(|(_, v)| v.clone());
        assert_eq!(value, Some("config".to_string()));
    }

    fn sample_fingerprint(headers: HashMap<String, String>) -> Fingerprint {
        use crate::config::{ScreenMetrics, UserAgentData, VideoCard};
        Fingerprint {
            user_agent: "test-agent".to_string(),
            platform: "Win32".to_string(),
            hardware_concurrency: 4,
            device_memory: 4,
            user_agent_data: UserAgentData {
                brands: vec![],
                full_version_list: vec![],
                ua_full_version: "1.0".to_string(),
                platform: "Windows".to_string(),
                platform_version: "10".to_string(),
                architecture: "x86".to_string(),
                bitness: "64".to_string(),
                model: String::new(),
                mobile: false,
            },
            screen: ScreenMetrics {
                width: 1280,
                height: 720,
                avail_width: 1280,
                avail_height: 700,
                device_pixel_ratio: 1.0,
            },
            video_card: VideoCard {
                vendor: "test".to_string(),
                renderer: "test".to_string(),
            },
            headers,
        }
    }
}
