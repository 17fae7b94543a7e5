//! Query cache modes and the in-process query cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// Caching strategy for a Storefront API query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Never cache. Used for per-visitor data such as carts.
    None,
    /// Fresh for 1 second, stale for 9 more.
    #[default]
    Short,
    /// Fresh for 1 hour, stale for 23 more.
    Long,
    /// Explicit freshness windows.
    Custom {
        max_age: Duration,
        stale_while_revalidate: Duration,
    },
}

impl CacheMode {
    /// How long an entry is served without revalidation.
    pub fn max_age(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Short => Duration::from_secs(1),
            Self::Long => Duration::from_secs(3_600),
            Self::Custom { max_age, .. } => *max_age,
        }
    }

    /// How long after `max_age` a stale entry may still be served.
    pub fn stale_while_revalidate(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Short => Duration::from_secs(9),
            Self::Long => Duration::from_secs(82_800),
            Self::Custom {
                stale_while_revalidate,
                ..
            } => *stale_while_revalidate,
        }
    }

    /// Whether results may be stored at all.
    pub fn is_cacheable(&self) -> bool {
        *self != Self::None && !(self.max_age() + self.stale_while_revalidate()).is_zero()
    }

    /// Equivalent `Cache-Control` header value.
    pub fn cache_control(&self) -> String {
        if !self.is_cacheable() {
            return "no-store".to_string();
        }
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            self.max_age().as_secs(),
            self.stale_while_revalidate().as_secs()
        )
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Within `max_age`.
    Fresh(Value),
    /// Past `max_age` but within the stale window; refresh in the background.
    Stale(Value),
    /// Absent or expired.
    Miss,
}

/// Default upper bound on stored entries.
pub const DEFAULT_MAX_ENTRIES: usize = 1_024;

#[derive(Debug)]
struct Entry {
    value: Value,
    stored_at: Instant,
    mode: CacheMode,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at)
            >= self.mode.max_age() + self.mode.stale_while_revalidate()
    }
}

/// In-process cache of query results keyed by document and variables.
///
/// Expired entries are reclaimed on every insert, and the oldest entry is
/// evicted once `max_entries` is reached.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, Entry>>,
    max_entries: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `max_entries` results.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Cache key for a query document and its variables.
    pub fn key(document: &str, variables: &Value) -> String {
        format!("{}\u{0}{}", document.trim(), variables)
    }

    /// Look up an entry, evicting it if fully expired.
    pub fn get(&self, key: &str) -> Lookup {
        let Ok(mut entries) = self.entries.lock() else {
            return Lookup::Miss;
        };
        let Some(entry) = entries.get(key) else {
            return Lookup::Miss;
        };

        let age = entry.stored_at.elapsed();
        if age < entry.mode.max_age() {
            Lookup::Fresh(entry.value.clone())
        } else if age < entry.mode.max_age() + entry.mode.stale_while_revalidate() {
            Lookup::Stale(entry.value.clone())
        } else {
            entries.remove(key);
            Lookup::Miss
        }
    }

    /// Store a value if the mode allows caching.
    pub fn put(&self, key: String, value: Value, mode: CacheMode) {
        if !mode.is_cacheable() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            let now = Instant::now();
            entries.retain(|_, entry| !entry.is_expired(now));

            if entries.len() >= self.max_entries && !entries.contains_key(&key) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }

            entries.insert(
                key,
                Entry {
                    value,
                    stored_at: now,
                    mode,
                },
            );
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
