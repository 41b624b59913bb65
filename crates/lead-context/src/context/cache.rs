//! Per-session prefix cache for assembled conversation context.
//!
//! Once a conversation grows past a handful of turns, its early history stops
//! changing. The optimizer stores the assembled prefix (system prompt plus the
//! first few turns) keyed by `(session_id, prompt_hash)`, and later calls
//! within the freshness window append only the newest turns to it.
//!
//! The cache is best-effort. Writes never block and may fail; a failed write
//! costs a recomputation on the next call, never a wrong answer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, TryLockError};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, trace};

use crate::MessagePart;
use crate::clock::{Clock, SystemClock};

/// Default freshness window: 30 minutes.
pub const DEFAULT_TTL_SECS: i64 = 1800;

/// Identity of a cache entry. The prompt hash is part of the key; a lookup
/// also compares the stored prompt text, so a hash collision reads as a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session_id: String,
    pub prompt_hash: u64,
}

impl CacheKey {
    pub fn new(session_id: &str, system_prompt: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            prompt_hash: hash_prompt(system_prompt),
        }
    }
}

/// An assembled prefix and what it cost to build.
///
/// Entries are immutable once stored; a newer `put` for the same key replaces
/// the whole entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub system_prompt: String,
    pub content: Vec<MessagePart>,
    pub created_at: DateTime<Utc>,
    pub estimated_tokens: usize,
}

impl CacheEntry {
    /// Whether the entry has outlived `ttl` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }

    /// Whether the entry was built for exactly `system_prompt`.
    pub fn is_for_prompt(&self, system_prompt: &str) -> bool {
        self.system_prompt == system_prompt
    }
}

/// Why a cache write was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheWriteError {
    #[error("cache busy, write for session '{0}' skipped")]
    Contended(String),
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Storage seam for assembled prefixes.
///
/// Implementations must be safe to share across request handlers. Writes are
/// last-writer-wins per key and must not block the caller.
pub trait ConversationCache: Send + Sync {
    /// Look up a fresh entry. Stale entries are reported as absent.
    fn get(&self, session_id: &str, system_prompt: &str) -> Option<Arc<CacheEntry>>;

    /// Store (or replace) the entry for `(session_id, system_prompt)`.
    ///
    /// `estimated_tokens` must be the sum of the per-part estimates of
    /// `content`.
    fn put(
        &self,
        session_id: &str,
        system_prompt: &str,
        content: Vec<MessagePart>,
        estimated_tokens: usize,
    ) -> Result<(), CacheWriteError>;

    /// Remove every stale entry. Returns the number purged.
    fn sweep(&self) -> usize;
}

/// In-process [`ConversationCache`] backed by a `RwLock<HashMap>`.
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    /// Optional capacity. When full, stale entries are swept before insert
    /// and the oldest remaining entry is evicted if still needed.
    max_entries: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl InMemoryCache {
    /// Create a cache on the system clock with the given freshness window.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl,
            max_entries: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Bound the number of stored entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, stale ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Make room for one more entry under `max_entries`.
    fn make_room(&self, entries: &mut HashMap<CacheKey, Arc<CacheEntry>>, incoming: &CacheKey) {
        let Some(max) = self.max_entries else {
            return;
        };
        if entries.contains_key(incoming) || entries.len() < max {
            return;
        }

        let now = self.clock.now();
        entries.retain(|_, entry| !entry.is_stale(now, self.ttl));

        while entries.len() >= max {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            trace!(session = %oldest.session_id, "evicting oldest cache entry");
            entries.remove(&oldest);
        }
    }
}

impl ConversationCache for InMemoryCache {
    fn get(&self, session_id: &str, system_prompt: &str) -> Option<Arc<CacheEntry>> {
        let key = CacheKey::new(session_id, system_prompt);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let found = entries
            .get(&key)
            .filter(|entry| entry.is_for_prompt(system_prompt))
            .filter(|entry| !entry.is_stale(self.clock.now(), self.ttl))
            .cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn put(
        &self,
        session_id: &str,
        system_prompt: &str,
        content: Vec<MessagePart>,
        estimated_tokens: usize,
    ) -> Result<(), CacheWriteError> {
        let mut entries = match self.entries.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                return Err(CacheWriteError::Contended(session_id.to_string()));
            }
            Err(TryLockError::Poisoned(_)) => return Err(CacheWriteError::Poisoned),
        };

        let key = CacheKey::new(session_id, system_prompt);
        self.make_room(&mut entries, &key);

        let entry = CacheEntry {
            key: key.clone(),
            system_prompt: system_prompt.to_string(),
            content,
            created_at: self.clock.now(),
            estimated_tokens,
        };
        entries.insert(key, Arc::new(entry));
        Ok(())
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now, self.ttl));
        before - entries.len()
    }
}

/// Run [`ConversationCache::sweep`] every `period` until the handle is aborted.
///
/// Must be called from within a tokio runtime.
pub fn spawn_sweeper(
    cache: Arc<dyn ConversationCache>,
    period: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let purged = cache.sweep();
            if purged > 0 {
                debug!(purged, "swept stale conversation cache entries");
            }
        }
    })
}

/// Hash a system prompt for the cache key. FNV-1a, 64-bit.
pub fn hash_prompt(prompt: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in prompt.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (InMemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = InMemoryCache::with_clock(Duration::seconds(DEFAULT_TTL_SECS), clock.clone());
        (cache, clock)
    }

    fn parts() -> Vec<MessagePart> {
        vec![MessagePart::system("prompt"), MessagePart::user("hello")]
    }

    #[test]
    fn put_then_get_hits() {
        let (cache, _clock) = cache_with_clock();
        cache.put("s1", "prompt", parts(), 4).unwrap();

        let entry = cache.get("s1", "prompt").expect("fresh entry");
        assert_eq!(entry.estimated_tokens, 4);
        assert_eq!(entry.content.len(), 2);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn miss_on_unknown_session() {
        let (cache, _clock) = cache_with_clock();
        assert!(cache.get("nobody", "prompt").is_none());
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn expires_after_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.put("s1", "prompt", parts(), 4).unwrap();

        clock.advance(Duration::seconds(DEFAULT_TTL_SECS));
        assert!(cache.get("s1", "prompt").is_some(), "exactly at TTL is fresh");

        clock.advance(Duration::seconds(1));
        assert!(cache.get("s1", "prompt").is_none());
    }

    #[test]
    fn different_prompts_do_not_collide() {
        let (cache, _clock) = cache_with_clock();
        cache.put("s1", "prompt A", parts(), 4).unwrap();
        assert!(cache.get("s1", "prompt B").is_none());
        assert!(cache.get("s2", "prompt A").is_none());
    }

    #[test]
    fn put_replaces_whole_entry() {
        let (cache, _clock) = cache_with_clock();
        cache.put("s1", "prompt", parts(), 4).unwrap();
        cache
            .put("s1", "prompt", vec![MessagePart::system("prompt")], 2)
            .unwrap();

        let entry = cache.get("s1", "prompt").unwrap();
        assert_eq!(entry.content.len(), 1);
        assert_eq!(entry.estimated_tokens, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_purges_only_stale_entries() {
        let (cache, clock) = cache_with_clock();
        cache.put("old", "prompt", parts(), 4).unwrap();
        clock.advance(Duration::minutes(20));
        cache.put("new", "prompt", parts(), 4).unwrap();
        clock.advance(Duration::minutes(15));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new", "prompt").is_some());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let (cache, clock) = cache_with_clock();
        let cache = cache.with_max_entries(2);
        cache.put("a", "p", parts(), 4).unwrap();
        clock.advance(Duration::seconds(1));
        cache.put("b", "p", parts(), 4).unwrap();
        clock.advance(Duration::seconds(1));
        cache.put("c", "p", parts(), 4).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", "p").is_none());
        assert!(cache.get("c", "p").is_some());
    }

    #[test]
    fn capacity_prefers_sweeping_stale_entries() {
        let (cache, clock) = cache_with_clock();
        let cache = cache.with_max_entries(2);
        cache.put("stale", "p", parts(), 4).unwrap();
        clock.advance(Duration::minutes(31));
        cache.put("b", "p", parts(), 4).unwrap();
        cache.put("c", "p", parts(), 4).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b", "p").is_some());
        assert!(cache.get("c", "p").is_some());
    }

    #[test]
    fn contended_write_is_rejected_not_blocked() {
        let (cache, _clock) = cache_with_clock();
        let _reader = cache.entries.read().unwrap();
        let err = cache.put("s1", "prompt", parts(), 4).unwrap_err();
        assert_eq!(err, CacheWriteError::Contended("s1".into()));
    }

    #[test]
    fn hit_rate_computation() {
        let (cache, _clock) = cache_with_clock();
        cache.put("s1", "p", parts(), 4).unwrap();
        cache.get("s1", "p");
        cache.get("s2", "p");
        assert!((cache.hit_rate() - 0.5).abs() < 0.01);
    }

    #[test]
    fn colliding_prompt_hash_is_a_miss() {
        let (cache, clock) = cache_with_clock();
        // Same key as ("s1", "prompt A"), but built for a different prompt.
        let key = CacheKey::new("s1", "prompt A");
        let entry = CacheEntry {
            key: key.clone(),
            system_prompt: "prompt B".into(),
            content: vec![MessagePart::system("prompt B")],
            created_at: clock.now(),
            estimated_tokens: 2,
        };
        cache.entries.write().unwrap().insert(key, Arc::new(entry));

        assert!(cache.get("s1", "prompt A").is_none());
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn hash_deterministic_and_distinct() {
        assert_eq!(hash_prompt("You are helpful."), hash_prompt("You are helpful."));
        assert_ne!(hash_prompt("You are helpful."), hash_prompt("You are terse."));
    }

    #[tokio::test]
    async fn sweeper_purges_in_background() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(InMemoryCache::with_clock(
            Duration::seconds(DEFAULT_TTL_SECS),
            clock.clone(),
        ));
        cache.put("s1", "p", parts(), 4).unwrap();
        clock.advance(Duration::hours(1));

        let handle = spawn_sweeper(cache.clone(), std::time::Duration::from_millis(5));
        for _ in 0..100 {
            if cache.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        handle.abort();
        assert!(cache.is_empty());
    }
}
