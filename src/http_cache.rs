use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "standings_edge";
const CACHE_FILE: &str = "http_cache.json";

/// Time-bounded store of raw response bodies keyed by request URL.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, body: String);
}

#[derive(Debug, Default)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn put(&self, _key: &str, _body: String) {}
}

/// Process-local cache; entries expire `ttl` after they were stored.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.entries.lock().expect("memory cache lock poisoned");
        let fresh = guard
            .get(key)
            .is_some_and(|(stored_at, _)| stored_at.elapsed() < self.ttl);
        if !fresh {
            guard.remove(key);
            return None;
        }
        guard.get(key).map(|(_, body)| body.clone())
    }

    fn put(&self, key: &str, body: String) {
        let mut guard = self.entries.lock().expect("memory cache lock poisoned");
        guard.insert(key.to_string(), (Instant::now(), body));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    fetched_at: u64,
}

/// JSON file cache shared across runs, checked against `ttl` on read.
#[derive(Debug)]
pub struct DiskCache {
    ttl: Duration,
    path: Option<PathBuf>,
    file: Mutex<Option<HttpCacheFile>>,
}

impl DiskCache {
    pub fn new(ttl: Duration) -> Self {
        Self::at(ttl, cache_path())
    }

    pub fn at(ttl: Duration, path: Option<PathBuf>) -> Self {
        Self {
            ttl,
            path,
            file: Mutex::new(None),
        }
    }

    fn load(&self) -> HttpCacheFile {
        let Some(path) = self.path.as_ref() else {
            return HttpCacheFile::default();
        };
        let Ok(raw) = fs::read_to_string(path) else {
            return HttpCacheFile::default();
        };
        let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
        if cache.version != CACHE_VERSION {
            return HttpCacheFile::default();
        }
        cache
    }

    fn save(&self, cache: &HttpCacheFile) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(cache).context("serialize http cache")?;
        fs::write(&tmp, json).context("write http cache")?;
        fs::rename(&tmp, path).context("swap http cache")?;
        Ok(())
    }
}

impl ResponseCache for DiskCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.file.lock().expect("http cache lock poisoned");
        let cache = guard.get_or_insert_with(|| self.load());
        let entry = cache.entries.get(key)?;
        let now = system_time_to_secs(SystemTime::now()).unwrap_or_default();
        if now.saturating_sub(entry.fetched_at) >= self.ttl.as_secs() {
            return None;
        }
        Some(entry.body.clone())
    }

    fn put(&self, key: &str, body: String) {
        let mut guard = self.file.lock().expect("http cache lock poisoned");
        let cache = guard.get_or_insert_with(|| self.load());
        let now = system_time_to_secs(SystemTime::now()).unwrap_or_default();
        let ttl = self.ttl.as_secs();
        cache.version = CACHE_VERSION;
        cache
            .entries
            .retain(|_, entry| now.saturating_sub(entry.fetched_at) < ttl);
        cache.entries.insert(
            key.to_string(),
            CacheEntry {
                body,
                fetched_at: now,
            },
        );
        if let Err(err) = self.save(cache) {
            tracing::warn!("http cache not persisted: {err:#}");
        }
    }
}

/// Stable cache key: the URL followed by the query pairs in sorted order.
pub fn cache_key(url: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    format!("{url}?{}", pairs.join("&"))
}

fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_serves_fresh_entries() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        assert!(cache.get("k").is_none());
        cache.put("k", "body".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("body"));
    }

    #[test]
    fn memory_cache_expires_entries() {
        let cache = MemoryCache::new(Duration::ZERO);
        cache.put("k", "body".to_string());
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn no_cache_never_hits() {
        let cache = NoCache;
        cache.put("k", "body".to_string());
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn cache_key_sorts_query() {
        let a = cache_key("https://x/m", &[("status", "SCHEDULED"), ("dateFrom", "2025-01-01")]);
        let b = cache_key("https://x/m", &[("dateFrom", "2025-01-01"), ("status", "SCHEDULED")]);
        assert_eq!(a, b);
        assert_eq!(a, "https://x/m?dateFrom=2025-01-01&status=SCHEDULED");
        assert_eq!(cache_key("https://x/s", &[]), "https://x/s");
    }

    #[test]
    fn disk_cache_round_trips_through_file() {
        let dir = std::env::temp_dir().join(format!("standings_edge_cache_{}", std::process::id()));
        let path = dir.join(CACHE_FILE);
        let _ = fs::remove_file(&path);

        let writer = DiskCache::at(Duration::from_secs(300), Some(path.clone()));
        writer.put("https://x/s", "{\"ok\":true}".to_string());

        let reader = DiskCache::at(Duration::from_secs(300), Some(path.clone()));
        assert_eq!(reader.get("https://x/s").as_deref(), Some("{\"ok\":true}"));

        let stale = DiskCache::at(Duration::ZERO, Some(path.clone()));
        assert!(stale.get("https://x/s").is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn disk_cache_drops_stale_entries_on_write() {
        let dir = std::env::temp_dir().join(format!("standings_edge_evict_{}", std::process::id()));
        let path = dir.join(CACHE_FILE);
        let _ = fs::remove_dir_all(&dir);

        let mut seeded = HttpCacheFile {
            version: CACHE_VERSION,
            ..HttpCacheFile::default()
        };
        seeded.entries.insert(
            "https://x/m?dateFrom=2020-01-01".to_string(),
            CacheEntry {
                body: "{}".to_string(),
                fetched_at: 0,
            },
        );
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, serde_json::to_string(&seeded).unwrap()).unwrap();

        let cache = DiskCache::at(Duration::from_secs(300), Some(path.clone()));
        cache.put("https://x/s", "{\"ok\":true}".to_string());

        let on_disk: HttpCacheFile =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.entries.len(), 1);
        assert!(on_disk.entries.contains_key("https://x/s"));

        let _ = fs::remove_dir_all(&dir);
    }
}
