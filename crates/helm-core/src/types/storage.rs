//! Persisted storage snapshot produced by the state extractor (spec §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Cookie;
use crate::config::OriginStorage;

/// Summary of one `IndexedDB` database observed for an origin.
///
/// The extractor only enumerates databases; it does not dump object store
/// contents, since `IndexedDB` is not part of the restorable session
/// context (spec §3 only allows restoring cookies and local/session
/// storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDbSummary {
    /// Database name.
    pub name: String,
    /// Database version.
    pub version: u64,
}

/// The full persisted state document returned by `getBrowserState()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSnapshot {
    /// All cookies visible to the browser, across origins.
    pub cookies: Vec<Cookie>,
    /// Per-origin localStorage key/value pairs.
    pub local_storage: OriginStorage,
    /// Per-origin sessionStorage key/value pairs.
    pub session_storage: OriginStorage,
    /// Per-origin `IndexedDB` database summaries.
    pub indexed_db: HashMap<String, Vec<IndexedDbSummary>>,
}

impl StorageSnapshot {
    /// Merge another snapshot into this one.
    ///
    /// Per origin, keys are unioned; on conflict the *other* snapshot's
    /// value wins. Callers merging a live-page snapshot over an on-disk one
    /// should pass the live snapshot as `other`.
    pub fn merge_preferring(&mut self, other: Self) {
        for (origin, entries) in other.local_storage {
            self.local_storage.entry(origin).or_default().extend(entries);
        }
        for (origin, entries) in other.session_storage {
            self.session_storage.entry(origin).or_default().extend(entries);
        }
        for (origin, dbs) in other.indexed_db {
            self.indexed_db.entry(origin).or_default().extend(dbs);
        }
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for (idx, c) in self.cookies.iter().enumerate() {
            seen.insert((c.name.clone(), c.domain.clone().unwrap_or_default()), idx);
        }
        for c in other.cookies {
            let key = (c.name.clone(), c.domain.clone().unwrap_or_default());
            if let Some(&idx) = seen.get(&key) {
                self.cookies[idx] = c;
            } else {
                seen.insert(key, self.cookies.len());
                self.cookies.push(c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cookie;

    #[test]
    fn merge_prefers_the_other_cookie_on_name_and_domain_conflict() {
        let mut disk = StorageSnapshot {
            cookies: vec![Cookie::new("k", "on-disk").domain("example.com")],
            ..Default::default()
        };
        let live = StorageSnapshot {
            cookies: vec![Cookie::new("k", "live-value").domain("example.com")],
            ..Default::default()
        };
        disk.merge_preferring(live);
        assert_eq!(disk.cookies.len(), 1);
        assert_eq!(disk.cookies[0].value, "live-value");
    }

    #[test]
    fn merge_unions_distinct_cookies_and_storage_keys() {
        let mut disk = StorageSnapshot {
            cookies: vec![Cookie::new("a", "1")],
            local_storage: HashMap::from([(
                "example.com".to_string(),
                HashMap::from([("x".to_string(), "1".to_string())]),
            )]),
            ..Default::default()
        };
        let live = StorageSnapshot {
            cookies: vec![Cookie::new("b", "2")],
            local_storage: HashMap::from([(
                "example.com".to_string(),
                HashMap::from([("y".to_string(), "2".to_string())]),
            )]),
            ..Default::default()
        };
        disk.merge_preferring(live);

        assert_eq!(disk.cookies.len(), 2);
        let origin = &disk.local_storage["example.com"];
        assert_eq!(origin.get("x").map(String::as_str), Some("1"));
        assert_eq!(origin.get("y").map(String::as_str), Some("2"));
    }
}
