//! TTL cache of model responses keyed by task kind and prompt
//!
//! Purely an optimisation: a miss just means asking the model again.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::ai::TaskKind;

/// Default time a response stays fresh
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedResponse {
    text: String,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: DashMap<(TaskKind, String), CachedResponse>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, cached: &CachedResponse, now: Instant) -> bool {
        now.saturating_duration_since(cached.stored_at) < self.ttl
    }

    pub fn get(&self, task: TaskKind, prompt: &str, now: Instant) -> Option<String> {
        let key = (task, prompt.to_string());
        if let Some(cached) = self.entries.get(&key) {
            if self.is_fresh(&cached, now) {
                return Some(cached.text.clone());
            }
            // Expired
            drop(cached);
            self.entries.remove(&key);
        }
        None
    }

    /// Store a response. Expired entries are swept first so prompts that
    /// never repeat don't pile up.
    pub fn put(&self, task: TaskKind, prompt: &str, text: String, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        self.purge_expired(now);
        self.entries.insert(
            (task, prompt.to_string()),
            CachedResponse {
                text,
                stored_at: now,
            },
        );
    }

    /// Drop everything past its TTL; returns how many were removed
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, cached| self.is_fresh(cached, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
