//! Concrete [`Driver`] implementation launching a local Chromium process.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use helm_cdp::CdpConnection;
use helm_cdp::protocol::target_domain::{TargetCreatedEvent, TargetInfo};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace, warn};

use super::{BrowserHandle, Driver, LaunchOutcome, PrimaryPage, launch_args};
use crate::config::SessionConfig;
use crate::error::{BrowserProcessStage, NetworkLaunchStage, Result, RuntimeError};
use crate::events::{EventSender, PageId, RuntimeEvent};

/// Common Chromium install locations probed when no explicit path or
/// `CHROMIUM_PATH` environment variable is set.
const CHROMIUM_PATHS: &[&str] = &[
    "chromium",
    "chromium-browser",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Grace period given to the process after a graceful `close()` request
/// before [`ChromiumDriver::force_close`] would be warranted.
const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(5);

struct LiveState {
    connection: Arc<CdpConnection>,
    ws_endpoint: String,
    primary_page: PrimaryPage,
    child: Child,
    // Kept alive only for its Drop cleanup; never read directly.
    _user_data_dir: Option<TempDir>,
    _target_watch: tokio::task::JoinHandle<()>,
}

/// Drives a locally spawned Chromium process over CDP.
pub struct ChromiumDriver {
    state: Mutex<Option<LiveState>>,
    events: EventSender,
    chromium_path: Option<PathBuf>,
}

impl ChromiumDriver {
    /// Create a driver that emits its internal events onto `events`.
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Mutex::new(None),
            events,
            chromium_path: None,
        }
    }

    /// Override executable discovery (primarily for tests).
    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.chromium_path = Some(path);
        self
    }

    fn find_executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.chromium_path {
            return path.exists().then(|| path.clone()).ok_or_else(|| {
                RuntimeError::BrowserProcess {
                    stage: BrowserProcessStage::Launch,
                    message: format!("configured executable not found: {}", path.display()),
                }
            });
        }
        if let Ok(path_str) = std::env::var("CHROMIUM_PATH") {
            let path = PathBuf::from(path_str);
            if path.exists() {
                return Ok(path);
            }
        }
        for candidate in CHROMIUM_PATHS {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
            if let Ok(output) = std::process::Command::new("which").arg(candidate).output() {
                if output.status.success() {
                    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !found.is_empty() {
                        return Ok(PathBuf::from(found));
                    }
                }
            }
        }
        Err(RuntimeError::BrowserProcess {
            stage: BrowserProcessStage::Launch,
            message: "chromium executable not found".to_string(),
        })
    }

    fn prepare_user_data_dir(config: &SessionConfig) -> Result<(PathBuf, Option<TempDir>)> {
        if let Some(dir) = &config.user_data_dir {
            return Ok((dir.clone(), None));
        }
        let temp_dir = TempDir::with_prefix("helm-browser-").map_err(|e| {
            RuntimeError::BrowserProcess {
                stage: BrowserProcessStage::Launch,
                message: format!("failed to create user data directory: {e}"),
            }
        })?;
        let path = temp_dir.path().to_path_buf();
        Ok((path, Some(temp_dir)))
    }

    /// Deep-merge `config.user_preferences` into `<dir>/Default/Preferences`.
    fn write_preferences(dir: &std::path::Path, config: &SessionConfig) -> Result<()> {
        let profile_dir = dir.join("Default");
        std::fs::create_dir_all(&profile_dir).map_err(|e| RuntimeError::ResourceUnavailable {
            kind: crate::error::ResourceKind::Profile,
            message: format!("failed to create profile directory: {e}"),
        })?;

        let prefs_path = profile_dir.join("Preferences");
        let mut prefs = if prefs_path.exists() {
            let raw = std::fs::read_to_string(&prefs_path).unwrap_or_default();
            serde_json::from_str(&raw).unwrap_or(serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        launch_args::deep_merge(&mut prefs, &launch_args::default_preferences());
        if !config.user_preferences.is_null() {
            launch_args::deep_merge(&mut prefs, &config.user_preferences);
        }

        let serialized = serde_json::to_string_pretty(&prefs).map_err(|e| {
            RuntimeError::ResourceUnavailable {
                kind: crate::error::ResourceKind::Profile,
                message: format!("failed to serialize preferences: {e}"),
            }
        })?;
        std::fs::write(&prefs_path, serialized).map_err(|e| RuntimeError::ResourceUnavailable {
            kind: crate::error::ResourceKind::Profile,
            message: format!("failed to write preferences: {e}"),
        })
    }

    async fn read_ws_url(child: &mut Child, launch_timeout: Duration) -> Result<String> {
        use tokio::io::{AsyncBufReadExt, BufReader};

        let stderr = child.stderr.take().ok_or_else(|| RuntimeError::NetworkLaunch {
            stage: NetworkLaunchStage::WsEndpoint,
            message: "failed to capture browser stderr".to_string(),
        })?;

        let search = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(line = %line, "chromium stderr");
                if let Some(pos) = line.find("DevTools listening on ") {
                    return Some(line[pos + "DevTools listening on ".len()..].trim().to_string());
                }
            }
            None
        };

        timeout(launch_timeout, search)
            .await
            .map_err(|_| RuntimeError::LaunchTimeout(launch_timeout))?
            .ok_or_else(|| RuntimeError::NetworkLaunch {
                stage: NetworkLaunchStage::WsEndpoint,
                message: "browser exited before advertising a DevTools endpoint".to_string(),
            })
    }

    /// Discover the existing primary page target and attach a session to it.
    async fn attach_primary_page(connection: &Arc<CdpConnection>) -> Result<PrimaryPage> {
        use helm_cdp::protocol::target_domain::{
            AttachToTargetParams, AttachToTargetResult, GetTargetsParams, GetTargetsResult,
        };

        let targets: GetTargetsResult = connection
            .send_command("Target.getTargets", Some(GetTargetsParams::default()), None)
            .await?;
        let page_target = targets
            .target_infos
            .into_iter()
            .find(|t| t.target_type == "page")
            .ok_or_else(|| RuntimeError::BrowserProcess {
                stage: BrowserProcessStage::TargetSetup,
                message: "browser exposed no page target".to_string(),
            })?;

        let attach: AttachToTargetResult = connection
            .send_command(
                "Target.attachToTarget",
                Some(AttachToTargetParams {
                    target_id: page_target.target_id.clone(),
                    flatten: Some(true),
                }),
                None,
            )
            .await?;

        Ok(PrimaryPage {
            target_id: page_target.target_id,
            session_id: attach.session_id,
        })
    }

    /// Spawn a task translating raw `Target.*` CDP events into
    /// [`RuntimeEvent`]s on the shared event bus, and detecting disconnects.
    fn spawn_target_watch(
        connection: Arc<CdpConnection>,
        events: EventSender,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut rx = connection.subscribe_events();
            loop {
                match rx.recv().await {
                    Ok(event) => match event.method.as_str() {
                        "Target.targetCreated" => {
                            if let Some(params) = &event.params {
                                if let Ok(e) =
                                    serde_json::from_value::<TargetCreatedEvent>(params.clone())
                                {
                                    let _ = events.send(RuntimeEvent::TargetCreated(PageId {
                                        page_id: e.target_info.target_id,
                                    }));
                                }
                            }
                        }
                        "Target.targetInfoChanged" => {
                            if let Some(params) = &event.params {
                                if let Ok(info) =
                                    serde_json::from_value::<TargetChangedWrapper>(params.clone())
                                {
                                    let _ = events.send(RuntimeEvent::TargetChanged(PageId {
                                        page_id: info.target_info.target_id,
                                    }));
                                }
                            }
                        }
                        _ => {}
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        let _ = events.send(RuntimeEvent::Disconnected);
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        })
    }
}

/// Local deserialization target for `Target.targetInfoChanged`, which the
/// protocol module doesn't define (only `targetCreated`/`attachedToTarget`
/// carry `TargetInfo` there).
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetChangedWrapper {
    target_info: TargetInfo,
}

#[async_trait]
impl Driver for ChromiumDriver {
    #[instrument(level = "info", skip(self, config))]
    async fn launch(&self, config: &SessionConfig) -> Result<LaunchOutcome> {
        info!("launching chromium");
        let executable = self.find_executable()?;
        let (user_data_dir, temp_dir) = Self::prepare_user_data_dir(config)?;
        Self::write_preferences(&user_data_dir, config)?;

        let built = launch_args::build(config, &user_data_dir);

        let mut cmd = Command::new(&executable);
        cmd.args(&built.args);
        cmd.envs(&built.env);
        cmd.stderr(Stdio::piped());
        cmd.stdout(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| RuntimeError::BrowserProcess {
            stage: BrowserProcessStage::Launch,
            message: format!("failed to spawn chromium: {e}"),
        })?;
        debug!(pid = ?child.id(), "chromium process spawned");

        let ws_url = Self::read_ws_url(&mut child, Duration::from_secs(30)).await?;
        let connection = Arc::new(CdpConnection::connect(&ws_url).await?);

        let primary_page = Self::attach_primary_page(&connection).await?;
        let target_watch = Self::spawn_target_watch(connection.clone(), self.events.clone());

        let browser = BrowserHandle::new(connection.clone(), ws_url.clone());
        let outcome = LaunchOutcome {
            browser: browser.clone(),
            primary_page: primary_page.clone(),
            ws_endpoint: ws_url.clone(),
        };

        *self.state.lock() = Some(LiveState {
            connection,
            ws_endpoint: ws_url,
            primary_page,
            child,
            _user_data_dir: temp_dir,
            _target_watch: target_watch,
        });

        info!("chromium launched");
        Ok(outcome)
    }

    #[instrument(level = "info", skip(self))]
    async fn close(&self) -> Result<()> {
        let mut guard = self.state.lock().take();
        let Some(live) = guard.as_mut() else {
            return Ok(());
        };
        live._target_watch.abort();
        match tokio::time::timeout(CLOSE_GRACE_PERIOD, live.child.kill()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "error killing chromium process during close"),
            Err(_) => warn!("chromium did not exit within the close grace period"),
        }
        Ok(())
    }

    fn force_close(&self) {
        if let Some(mut live) = self.state.lock().take() {
            live._target_watch.abort();
            let _ = live.child.start_kill();
        }
    }

    fn get_browser(&self) -> Option<BrowserHandle> {
        self.state
            .lock()
            .as_ref()
            .map(|s| BrowserHandle::new(s.connection.clone(), s.ws_endpoint.clone()))
    }

    fn get_primary_page(&self) -> Option<PrimaryPage> {
        self.state.lock().as_ref().map(|s| s.primary_page.clone())
    }

    fn get_ws_endpoint(&self) -> Option<String> {
        self.state.lock().as_ref().map(|s| s.ws_endpoint.clone())
    }
}
