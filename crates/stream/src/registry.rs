//! Process-wide cancellation flags keyed by search id.
//!
//! The registry is the only state shared between concurrent searches. A run
//! registers its id when it starts and removes it when it ends; the cancel
//! endpoint and client disconnects flip the flag in between.
//!
//! A cancel may arrive before the run it targets has registered. Such a
//! cancel is kept as a *pending* entry: the later `register` merges with it and
//! the run stops at its first checkpoint. Pending entries nobody claims expire
//! after a TTL, are swept on every `register` and `cancel`, and are capped in
//! number, oldest evicted first.
//!
//! Ids of runs that just ended are remembered for the same TTL. A cancel for
//! one of them arrives too late and is dropped, so it cannot stop a later run
//! that reuses the id.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::settings::SearchSettings;

const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MAX_PENDING: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Flag {
    cancelled: bool,
    /// `None` once a run owns the flag.
    pending_since: Option<Instant>,
}

impl Flag {
    fn is_registered(&self) -> bool {
        self.pending_since.is_none()
    }
}

#[derive(Debug)]
pub struct CancellationRegistry {
    flags: DashMap<String, Flag>,
    /// Ids of ended runs and when they ended.
    finished: DashMap<String, Instant>,
    /// Flags owned by a running search.
    active: AtomicUsize,
    pending_ttl: Duration,
    max_pending: usize,
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL)
    }
}

impl CancellationRegistry {
    pub fn new(pending_ttl: Duration) -> Self {
        Self {
            flags: DashMap::new(),
            finished: DashMap::new(),
            active: AtomicUsize::new(0),
            pending_ttl,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    /// Registry using the TTL and cap from `settings`.
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(Duration::from_secs(settings.pending_cancel_ttl_secs))
            .with_max_pending(settings.max_pending_cancels)
    }

    /// Cap on pending cancels held at once. At least one is always kept.
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    /// Start tracking `id`, claiming any pending cancel for it.
    ///
    /// Empty ids are ignored.
    pub fn register(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.sweep_expired();
        self.finished.remove(id);

        let cancelled = match self.flags.entry(id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let flag = occupied.get_mut();
                if flag.pending_since.take().is_some() {
                    self.active.fetch_add(1, Ordering::SeqCst);
                }
                flag.cancelled
            }
            Entry::Vacant(vacant) => {
                self.active.fetch_add(1, Ordering::SeqCst);
                vacant.insert(Flag {
                    cancelled: false,
                    pending_since: None,
                });
                false
            }
        };
        if cancelled {
            tracing::debug!(search_id = id, "registered with a pending cancel");
        }
    }

    /// Register `id` and return a guard that unregisters it on drop.
    ///
    /// Returns `None` for an empty id: the caller opted out of cancellation.
    pub fn register_scoped(&self, id: &str) -> Option<Registration<'_>> {
        if id.is_empty() {
            return None;
        }
        self.register(id);
        Some(Registration {
            registry: self,
            id: id.to_string(),
        })
    }

    pub fn is_cancelled(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        self.flags.get(id).is_some_and(|flag| flag.cancelled)
    }

    /// Set the flag for `id`. Idempotent.
    ///
    /// Returns `true` if a running search owns the id. Otherwise the cancel is
    /// recorded as pending, or dropped when the id belongs to a run that
    /// already ended; both return `false`.
    pub fn cancel(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        self.sweep_expired();

        match self.flags.entry(id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let flag = occupied.get_mut();
                flag.cancelled = true;
                return flag.is_registered();
            }
            // Ended runs are recorded in `finished` before their flag goes,
            // so a missing flag with no `finished` entry is a future run.
            Entry::Vacant(_) if self.finished.contains_key(id) => {
                tracing::debug!(search_id = id, "cancel for a finished search dropped");
                return false;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Flag {
                    cancelled: true,
                    pending_since: Some(Instant::now()),
                });
            }
        }

        self.evict_excess_pending();
        false
    }

    /// Set the flag only if a running search owns `id`.
    pub fn cancel_running(&self, id: &str) -> bool {
        match self.flags.get_mut(id) {
            Some(mut flag) if flag.is_registered() => {
                flag.cancelled = true;
                true
            }
            _ => false,
        }
    }

    /// Stop tracking `id`. Returns whether an entry was removed.
    pub fn unregister(&self, id: &str) -> bool {
        match self.flags.remove(id) {
            Some((_, flag)) => {
                if flag.is_registered() {
                    self.active.fetch_sub(1, Ordering::SeqCst);
                }
                true
            }
            None => false,
        }
    }

    /// End the run owning `id` and remember it for the TTL.
    fn finish(&self, id: &str) {
        self.finished.insert(id.to_string(), Instant::now());
        self.unregister(id);
    }

    /// Number of tracked ids, pending ones included.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Searches currently running with a registered id.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.len().saturating_sub(self.active_count())
    }

    /// Drop pending cancels and finished ids older than the TTL.
    pub fn sweep_expired(&self) {
        let ttl = self.pending_ttl;
        self.flags.retain(|_, flag| match flag.pending_since {
            Some(since) => since.elapsed() < ttl,
            None => true,
        });
        self.finished.retain(|_, ended| ended.elapsed() < ttl);
    }

    fn evict_excess_pending(&self) {
        while self.pending_count() > self.max_pending {
            let oldest = self
                .flags
                .iter()
                .filter_map(|flag| flag.pending_since.map(|since| (since, flag.key().clone())))
                .min_by_key(|(since, _)| *since);
            let Some((_, id)) = oldest else {
                return;
            };
            self.flags.remove_if(&id, |_, flag| !flag.is_registered());
            tracing::debug!(search_id = %id, "oldest pending cancel evicted");
        }
    }
}

/// Scoped registration; the id is unregistered exactly once on drop.
#[derive(Debug)]
pub struct Registration<'a> {
    registry: &'a CancellationRegistry,
    id: String,
}

impl Registration<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.registry.is_cancelled(&self.id)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.finish(&self.id);
    }
}
