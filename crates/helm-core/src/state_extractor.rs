//! State Extractor (spec §4.7, C7): `getBrowserState()`.
//!
//! Three independent reads — live cookies, an offline profile-directory
//! inspection, and a per-page in-browser dump — merged per origin with the
//! live-page value winning on conflict.

use std::collections::HashMap;
use std::path::Path;

use helm_cdp::CdpConnection;
use helm_cdp::protocol::runtime::EvaluateParams;
use helm_cdp::protocol::{GetAllCookiesParams, GetAllCookiesResult};
use helm_cdp::protocol::target_domain::{
    AttachToTargetParams, AttachToTargetResult, DetachFromTargetParams, GetTargetsParams,
    GetTargetsResult,
};
use serde::Deserialize;
use tracing::warn;

use crate::config::SessionConfig;
use crate::driver::BrowserHandle;
use crate::error::{Result, RuntimeError};
use crate::types::{Cookie, IndexedDbSummary, SameSite, StorageSnapshot};

const DUMP_SCRIPT: &str = r"(async () => {
  const dumpStorage = (storage) => {
    const out = {};
    for (let i = 0; i < storage.length; i++) {
      const key = storage.key(i);
      out[key] = storage.getItem(key);
    }
    return out;
  };
  let dbs = [];
  try {
    if (indexedDB && indexedDB.databases) { dbs = await indexedDB.databases(); }
  } catch (e) {}
  return {
    origin: location.origin,
    localStorage: dumpStorage(window.localStorage),
    sessionStorage: dumpStorage(window.sessionStorage),
    indexedDb: dbs.map((d) => ({ name: d.name, version: d.version || 0 })),
  };
})();";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageDump {
    origin: String,
    #[serde(default)]
    local_storage: HashMap<String, String>,
    #[serde(default)]
    session_storage: HashMap<String, String>,
    #[serde(default)]
    indexed_db: Vec<IndexedDbSummary>,
}

/// Extracts the full persisted state document for a live session.
pub struct StateExtractor;

impl StateExtractor {
    /// Run the full `getBrowserState()` pipeline. Returns an empty snapshot
    /// with a WARN log if `config.user_data_dir` isn't set, per spec §4.7.
    pub async fn extract(browser: &BrowserHandle, config: &SessionConfig) -> Result<StorageSnapshot> {
        let Some(user_data_dir) = config.user_data_dir.clone() else {
            warn!("getBrowserState called without a userDataDir, returning empty snapshot");
            return Ok(StorageSnapshot::default());
        };

        let connection = browser.connection().clone();
        let (cookies, on_disk, live) = tokio::join!(
            fetch_cookies(connection.clone()),
            inspect_profile_directory(user_data_dir),
            dump_open_pages(connection),
        );

        let mut snapshot = on_disk?;
        snapshot.cookies = cookies?;
        snapshot.merge_preferring(live?);
        Ok(snapshot)
    }
}

async fn fetch_cookies(connection: std::sync::Arc<CdpConnection>) -> Result<Vec<Cookie>> {
    let targets: GetTargetsResult = connection
        .send_command("Target.getTargets", Some(GetTargetsParams::default()), None)
        .await?;
    let Some(target) = targets.target_infos.into_iter().find(|t| t.target_type == "page") else {
        return Ok(Vec::new());
    };

    let attach: AttachToTargetResult = connection
        .send_command(
            "Target.attachToTarget",
            Some(AttachToTargetParams {
                target_id: target.target_id,
                flatten: Some(true),
            }),
            None,
        )
        .await?;
    let session_id = attach.session_id;

    let result: GetAllCookiesResult = connection
        .send_command("Network.getAllCookies", Some(GetAllCookiesParams {}), Some(&session_id))
        .await?;

    let _ = connection
        .send_command::<_, serde_json::Value>(
            "Target.detachFromTarget",
            Some(DetachFromTargetParams {
                session_id: Some(session_id),
            }),
            None,
        )
        .await;

    Ok(result.cookies.into_iter().map(to_core_cookie).collect())
}

fn to_core_cookie(c: helm_cdp::protocol::Cookie) -> Cookie {
    Cookie {
        name: c.name,
        value: c.value,
        domain: Some(c.domain),
        path: Some(c.path),
        expires: (!c.session).then_some(c.expires),
        http_only: Some(c.http_only),
        secure: Some(c.secure),
        same_site: c.same_site.map(|s| match s {
            helm_cdp::protocol::CookieSameSite::Strict => SameSite::Strict,
            helm_cdp::protocol::CookieSameSite::Lax => SameSite::Lax,
            helm_cdp::protocol::CookieSameSite::None => SameSite::None,
        }),
    }
}

/// Well-known per-profile subpaths the extractor enumerates `IndexedDB`
/// database directories under. Local/session storage are backed by LevelDB
/// on disk; parsing that format is out of scope, so this pass only surfaces
/// what it can name without a DB engine: IndexedDB origin directories.
const INDEXED_DB_SUBPATH: &str = "Default/IndexedDB";

async fn inspect_profile_directory(user_data_dir: std::path::PathBuf) -> Result<StorageSnapshot> {
    tokio::task::spawn_blocking(move || read_indexed_db_dirs(&user_data_dir))
        .await
        .map_err(|e| RuntimeError::Cleanup {
            kind: crate::error::CleanupKind::StateExtraction,
            message: format!("profile inspection task panicked: {e}"),
        })
}

fn read_indexed_db_dirs(user_data_dir: &Path) -> StorageSnapshot {
    let mut snapshot = StorageSnapshot::default();
    let dir = user_data_dir.join(INDEXED_DB_SUBPATH);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return snapshot;
    };
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else { continue };
        if !file_type.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
        // Chrome names these `<origin>.indexeddb.leveldb`; the origin is
        // recoverable from the prefix without parsing the LevelDB contents.
        let Some(origin) = name.strip_suffix(".indexeddb.leveldb") else { continue };
        snapshot
            .indexed_db
            .entry(origin.to_string())
            .or_default()
            .push(IndexedDbSummary {
                name: name.clone(),
                version: 0,
            });
    }
    snapshot
}

async fn dump_open_pages(connection: std::sync::Arc<CdpConnection>) -> Result<StorageSnapshot> {
    let targets: GetTargetsResult = connection
        .send_command("Target.getTargets", Some(GetTargetsParams::default()), None)
        .await?;

    let mut snapshot = StorageSnapshot::default();
    for target in targets.target_infos {
        if target.target_type != "page" || !is_http(&target.url) {
            continue;
        }
        match dump_one_page(&connection, &target.target_id).await {
            Ok(Some(dump)) => {
                snapshot.local_storage.insert(dump.origin.clone(), dump.local_storage);
                snapshot.session_storage.insert(dump.origin.clone(), dump.session_storage);
                if !dump.indexed_db.is_empty() {
                    snapshot.indexed_db.insert(dump.origin, dump.indexed_db);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(target_id = %target.target_id, error = %e, "live page storage dump failed"),
        }
    }
    Ok(snapshot)
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

async fn dump_one_page(connection: &CdpConnection, target_id: &str) -> Result<Option<PageDump>> {
    let attach: AttachToTargetResult = connection
        .send_command(
            "Target.attachToTarget",
            Some(AttachToTargetParams {
                target_id: target_id.to_string(),
                flatten: Some(true),
            }),
            None,
        )
        .await?;
    let session_id = attach.session_id;

    let result = connection
        .send_command::<_, helm_cdp::protocol::runtime::EvaluateResult>(
            "Runtime.evaluate",
            Some(EvaluateParams {
                expression: DUMP_SCRIPT.to_string(),
                object_group: None,
                include_command_line_api: None,
                silent: Some(true),
                context_id: None,
                return_by_value: Some(true),
                await_promise: Some(true),
            }),
            Some(&session_id),
        )
        .await;

    let _ = connection
        .send_command::<_, serde_json::Value>(
            "Target.detachFromTarget",
            Some(DetachFromTargetParams {
                session_id: Some(session_id),
            }),
            None,
        )
        .await;

    let result = result?;
    if result.exception_details.is_some() {
        return Ok(None);
    }
    let Some(value) = result.result.value else {
        return Ok(None);
    };
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_db_leveldb_dir_name_yields_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let idb_dir = tmp.path().join(INDEXED_DB_SUBPATH);
        std::fs::create_dir_all(idb_dir.join("https_example.com_0.indexeddb.leveldb")).unwrap();

        let snapshot = read_indexed_db_dirs(tmp.path());
        assert!(snapshot.indexed_db.contains_key("https_example.com_0"));
    }

    #[test]
    fn non_http_targets_are_filtered() {
        assert!(!is_http("chrome://version"));
        assert!(is_http("https://example.com"));
    }
}
