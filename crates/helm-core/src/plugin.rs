//! Plugin Manager (spec §4.3, C3) and the `ServiceHandle` plugins use to
//! talk back to the runtime (spec §9 design note on cyclic references).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{error, warn};

use crate::config::SessionConfig;
use crate::driver::BrowserHandle;
use crate::events::RuntimeEvent;
use crate::scheduler::Scheduler;

/// Narrow handle plugins receive at registration time instead of the
/// Orchestrator itself, breaking the cyclic reference between the service
/// and its observers (spec §9).
#[derive(Clone)]
pub struct ServiceHandle {
    scheduler: Arc<Scheduler>,
    events: tokio::sync::broadcast::Sender<RuntimeEvent>,
}

impl ServiceHandle {
    pub(crate) fn new(
        scheduler: Arc<Scheduler>,
        events: tokio::sync::broadcast::Sender<RuntimeEvent>,
    ) -> Self {
        Self { scheduler, events }
    }

    /// Emit an event onto the runtime's event bus.
    pub fn emit(&self, event: RuntimeEvent) {
        let _ = self.events.send(event);
    }

    /// Schedule `f` as a background task via the runtime's scheduler.
    pub fn wait_until<F, Fut>(&self, label: Option<String>, f: F)
    where
        F: FnOnce(crate::scheduler::CancelSignal) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = std::result::Result<(), crate::scheduler::TaskOutcome>>
            + Send
            + 'static,
    {
        self.scheduler.wait_until(label, f);
    }
}

/// A lifecycle observer plugin.
///
/// Implementations should treat every hook as best-effort: a returned
/// error is logged and isolated from other plugins, never propagated.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The plugin's unique name, used for the registry and for logging.
    fn name(&self) -> &str;

    /// Called once the browser process has launched. Awaited by the core.
    async fn on_browser_launch(&self, _handle: &BrowserHandle) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once the session is fully ready (primary page injected).
    /// Fire-and-forget: scheduled on the scheduler rather than awaited.
    async fn on_browser_ready(&self, _config: &SessionConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a new page target has been observed.
    async fn on_page_created(&self, _target_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called on a top-level frame navigation.
    async fn on_page_navigate(&self, _target_id: &str, _url: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a page's underlying document unloads.
    async fn on_page_unload(&self, _target_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called just before a page is closed. Awaited by the core.
    async fn on_before_page_close(&self, _target_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after the browser process has closed. Awaited by the core.
    async fn on_browser_close(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a session ends, before teardown. Awaited by the core.
    async fn on_session_end(&self, _config: &SessionConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once during runtime shutdown. Awaited by the core.
    async fn on_shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fan-out of lifecycle callbacks to all registered plugins, with
/// per-plugin error isolation.
pub struct PluginManager {
    plugins: RwLock<HashMap<String, Arc<dyn Plugin>>>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("registered", &self.plugins.read().len())
            .finish()
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    /// Create an empty plugin manager.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Register a plugin. Idempotent by name: re-registering a name
    /// replaces the old plugin and emits a WARN.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let name = plugin.name().to_string();
        let mut plugins = self.plugins.write();
        if plugins.insert(name.clone(), plugin).is_some() {
            warn!(plugin = %name, "plugin re-registered, replacing existing instance");
        }
    }

    /// Remove a plugin by name.
    pub fn unregister(&self, name: &str) {
        self.plugins.write().remove(name);
    }

    /// Look up a registered plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.read().get(name).cloned()
    }

    fn all(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.read().values().cloned().collect()
    }

    /// Invoke `on_browser_launch` on every plugin, awaited, with per-plugin
    /// error isolation.
    pub async fn fan_out_browser_launch(&self, handle: &BrowserHandle) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_browser_launch(handle).await {
                error!(plugin = plugin.name(), error = %e, "plugin onBrowserLaunch failed");
            }
        }
    }

    /// Schedule `on_browser_ready` on every plugin via the scheduler
    /// (fire-and-forget, per spec §4.3).
    pub fn fan_out_browser_ready(
        self: &Arc<Self>,
        service: &ServiceHandle,
        config: SessionConfig,
    ) {
        for plugin in self.all() {
            let config = config.clone();
            let label = format!("plugin-ready-{}", plugin.name());
            service.wait_until(Some(label), move |_signal| async move {
                if let Err(e) = plugin.on_browser_ready(&config).await {
                    error!(plugin = plugin.name(), error = %e, "plugin onBrowserReady failed");
                }
                Ok(())
            });
        }
    }

    /// Invoke `on_page_created` on every plugin, not awaited by the
    /// transition (logged only).
    pub async fn fan_out_page_created(&self, target_id: &str) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_page_created(target_id).await {
                error!(plugin = plugin.name(), error = %e, "plugin onPageCreated failed");
            }
        }
    }

    /// Invoke `on_page_navigate` on every plugin.
    pub async fn fan_out_page_navigate(&self, target_id: &str, url: &str) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_page_navigate(target_id, url).await {
                error!(plugin = plugin.name(), error = %e, "plugin onPageNavigate failed");
            }
        }
    }

    /// Invoke `on_page_unload` on every plugin.
    pub async fn fan_out_page_unload(&self, target_id: &str) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_page_unload(target_id).await {
                error!(plugin = plugin.name(), error = %e, "plugin onPageUnload failed");
            }
        }
    }

    /// Invoke `on_before_page_close` on every plugin, awaited.
    pub async fn fan_out_before_page_close(&self, target_id: &str) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_before_page_close(target_id).await {
                error!(plugin = plugin.name(), error = %e, "plugin onBeforePageClose failed");
            }
        }
    }

    /// Invoke `on_browser_close` on every plugin, awaited.
    pub async fn fan_out_browser_close(&self) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_browser_close().await {
                error!(plugin = plugin.name(), error = %e, "plugin onBrowserClose failed");
            }
        }
    }

    /// Invoke `on_session_end` on every plugin, awaited.
    pub async fn fan_out_session_end(&self, config: &SessionConfig) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_session_end(config).await {
                error!(plugin = plugin.name(), error = %e, "plugin onSessionEnd failed");
            }
        }
    }

    /// Invoke `on_shutdown` on every plugin, awaited.
    pub async fn fan_out_shutdown(&self) {
        for plugin in self.all() {
            if let Err(e) = plugin.on_shutdown().await {
                error!(plugin = plugin.name(), error = %e, "plugin onShutdown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FailingPlugin;

    #[async_trait]
    impl Plugin for FailingPlugin {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_page_created(&self, _target_id: &str) -> anyhow::Result<()> {
            anyhow::bail!("plugin A always fails")
        }
    }

    struct CountingPlugin {
        calls: Arc<AtomicUsize>,
        name: &'static str,
    }

    #[async_trait]
    impl Plugin for CountingPlugin {
        fn name(&self) -> &str {
            self.name
        }

        async fn on_page_created(&self, _target_id: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_session_end(&self, _config: &SessionConfig) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_plugin_failing_does_not_prevent_others_from_running() {
        let manager = PluginManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        manager.register(Arc::new(FailingPlugin));
        manager.register(Arc::new(CountingPlugin { calls: calls.clone(), name: "counting" }));

        manager.fan_out_page_created("target-1").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_end_fan_out_reaches_every_registered_plugin() {
        let manager = PluginManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        manager.register(Arc::new(CountingPlugin { calls: calls.clone(), name: "first" }));
        manager.register(Arc::new(CountingPlugin { calls: calls.clone(), name: "second" }));

        manager.fan_out_session_end(&SessionConfig::default()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn re_registering_a_name_replaces_the_existing_plugin() {
        let manager = PluginManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        manager.register(Arc::new(CountingPlugin { calls: calls.clone(), name: "dup" }));
        manager.register(Arc::new(CountingPlugin { calls, name: "dup" }));

        assert!(manager.get("dup").is_some());
        assert_eq!(manager.all().len(), 1);
    }

    #[test]
    fn unregister_removes_the_plugin() {
        let manager = PluginManager::new();
        manager.register(Arc::new(FailingPlugin));
        manager.unregister("failing");
        assert!(manager.get("failing").is_none());
    }
}
