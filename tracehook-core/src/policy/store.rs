//! Atomic publication of policy snapshots
//!
//! Readers load the current snapshot without locking. A reload builds a new
//! snapshot off to the side and swaps it in whole, so a reader sees either the
//! old policy or the new one, never a mix.

use arc_swap::{ArcSwap, ArcSwapOption};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

use super::document::PolicyDocumentLoader;
use super::model::InstrumentationPolicy;

/// Result of publishing a new snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A policy was produced and is now current
    Published,
    /// No policy could be produced; custom instrumentation is now disabled
    Disabled,
}

/// Holds the current [`InstrumentationPolicy`] for concurrent readers.
pub struct PolicyStore {
    loader: PolicyDocumentLoader,
    current: ArcSwapOption<InstrumentationPolicy>,
    reload_count: AtomicU64,
    last_reload: ArcSwap<Option<SystemTime>>,
}

impl PolicyStore {
    /// Build the initial snapshot from the loader's document.
    pub fn load(loader: PolicyDocumentLoader) -> Self {
        let initial = loader.load_policy().map(Arc::new);
        Self {
            loader,
            current: ArcSwapOption::new(initial),
            reload_count: AtomicU64::new(0),
            last_reload: ArcSwap::from_pointee(None),
        }
    }

    pub fn loader(&self) -> &PolicyDocumentLoader {
        &self.loader
    }

    /// Current snapshot; `None` while custom instrumentation is disabled.
    pub fn current(&self) -> Option<Arc<InstrumentationPolicy>> {
        self.current.load_full()
    }

    pub fn is_enabled(&self) -> bool {
        self.current.load().is_some()
    }

    /// Re-read the document and publish the result.
    pub fn reload(&self) -> ReloadOutcome {
        info!(
            "Reloading instrumentation policy from {}",
            self.loader.document_path().display()
        );
        self.publish(self.loader.load_policy())
    }

    /// Replace the current snapshot.
    pub fn publish(&self, policy: Option<InstrumentationPolicy>) -> ReloadOutcome {
        let outcome = match &policy {
            Some(policy) => {
                info!(
                    "Instrumentation policy published: {} classes, {} methods",
                    policy.class_count(),
                    policy.method_count()
                );
                ReloadOutcome::Published
            }
            None => {
                warn!("No instrumentation policy produced, custom instrumentation disabled");
                ReloadOutcome::Disabled
            }
        };

        self.current.store(policy.map(Arc::new));
        self.reload_count.fetch_add(1, Ordering::Relaxed);
        self.last_reload.store(Arc::new(Some(SystemTime::now())));
        outcome
    }

    /// Number of snapshots published after the initial load
    pub fn reload_count(&self) -> u64 {
        self.reload_count.load(Ordering::Relaxed)
    }

    pub fn last_reload(&self) -> Option<SystemTime> {
        **self.last_reload.load()
    }
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("loader", &self.loader)
            .field("enabled", &self.is_enabled())
            .field("reload_count", &self.reload_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::document::AGENT_DOCUMENT_NAME;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_absent_document_publishes_empty_policy() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::load(PolicyDocumentLoader::new(dir.path()));

        let policy = store.current().expect("absence is a valid policy");
        assert!(policy.is_empty());
        assert_eq!(store.reload_count(), 0);
        assert!(store.last_reload().is_none());
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(AGENT_DOCUMENT_NAME);
        let store = PolicyStore::load(PolicyDocumentLoader::new(dir.path()));
        let before = store.current().unwrap();

        fs::write(
            &path,
            r#"<ApplicationInsightsAgent><Instrumentation>
                 <Class name="a.B"><Method name="m"/></Class>
               </Instrumentation></ApplicationInsightsAgent>"#,
        )
        .unwrap();

        assert_eq!(store.reload(), ReloadOutcome::Published);
        let after = store.current().unwrap();
        assert!(after.is_instrumented("a.B"));
        // earlier readers keep their snapshot
        assert!(!before.is_instrumented("a.B"));
        assert_eq!(store.reload_count(), 1);
        assert!(store.last_reload().is_some());

        fs::write(&path, "<ApplicationInsightsAgent><Instrumentation>").unwrap();
        assert_eq!(store.reload(), ReloadOutcome::Disabled);
        assert!(store.current().is_none());
        assert!(!store.is_enabled());
    }
}
