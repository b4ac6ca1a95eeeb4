//! Shared string pool
//!
//! Statuses and the common tags repeat across every project, so they are
//! deduplicated into shared `Arc<str>` handles. Free-form values (targets,
//! names, descriptions, uncommon tags) are never pooled. Pool hits are an
//! optimization only: callers compare by content, never by pointer.
//!
//! The process-wide pool is created on first use and lives until exit;
//! `prune` drops entries nothing else holds.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Strings longer than this are never pooled
pub const MAX_INTERN_LEN: usize = 100;

/// Tags that are folded to a lowercase canonical form
pub const COMMON_TAGS: &[&str] = &["web", "network", "mobile", "api", "internal", "external"];

static GLOBAL_POOL: Lazy<StringPool> = Lazy::new(|| StringPool::new(MAX_INTERN_LEN));

/// Process-wide string pool
pub fn global() -> &'static StringPool {
    &GLOBAL_POOL
}

/// Lowercase form for common tags, the tag unchanged otherwise
pub fn canonical_tag(tag: &str) -> Cow<'_, str> {
    let lower = tag.to_lowercase();
    if COMMON_TAGS.contains(&lower.as_str()) {
        Cow::Owned(lower)
    } else {
        Cow::Borrowed(tag)
    }
}

/// Thread-safe deduplicating pool of `Arc<str>`
#[derive(Debug)]
pub struct StringPool {
    entries: DashMap<Arc<str>, ()>,
    max_len: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Pool diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl StringPool {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(64),
            max_len,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the pooled handle for `value`, inserting it if needed.
    ///
    /// Values over the length limit get a fresh, unpooled allocation.
    pub fn intern(&self, value: &str) -> Arc<str> {
        if value.len() > self.max_len {
            return Arc::from(value);
        }

        if let Some(existing) = self.entries.get(value) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(existing.key());
        }

        // Two threads may miss at once; the entry API keeps the first insert.
        match self.entries.entry(Arc::from(value)) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Arc::clone(entry.key())
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let key = Arc::clone(entry.key());
                entry.insert(());
                key
            }
        }
    }

    /// Upper-cased, pooled status value
    pub fn intern_status(&self, status: &str) -> Arc<str> {
        self.intern(&status.trim().to_uppercase())
    }

    /// Tag handle: common tags are folded to lowercase and pooled, any other
    /// tag gets its own allocation
    pub fn intern_tag(&self, tag: &str) -> Arc<str> {
        match canonical_tag(tag) {
            Cow::Owned(common) => self.intern(&common),
            Cow::Borrowed(other) => Arc::from(other),
        }
    }

    /// Drop entries whose only holder is the pool; returns how many went
    pub fn prune(&self) -> usize {
        let before = self.entries.len();
        // Shard write locks keep `intern` from cloning a key mid-check
        self.entries.retain(|key, _| Arc::strong_count(key) > 1);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new(MAX_INTERN_LEN)
    }
}
