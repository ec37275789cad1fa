//! Snapshot publication under reload and concurrent readers

mod common;

use anyhow::Result;
use common::{single_class_document, write_document};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use tracehook_core::policy::{PolicyDocumentLoader, PolicyStore, ReloadOutcome};

#[test]
fn test_reload_picks_up_new_document() -> Result<()> {
    let dir = TempDir::new()?;
    write_document(dir.path(), &single_class_document("a.First", "run"))?;

    let store = PolicyStore::load(PolicyDocumentLoader::new(dir.path()));
    let before = store.current().expect("initial policy");
    assert!(before.is_instrumented("a.First"));
    assert_eq!(store.reload_count(), 0);
    assert!(store.last_reload().is_none());

    write_document(dir.path(), &single_class_document("a.Second", "run"))?;
    assert_eq!(store.reload(), ReloadOutcome::Published);

    let after = store.current().expect("reloaded policy");
    assert!(after.is_instrumented("a.Second"));
    assert!(!after.is_instrumented("a.First"));
    // earlier snapshots held by readers are untouched
    assert!(before.is_instrumented("a.First"));
    assert_eq!(store.reload_count(), 1);
    assert!(store.last_reload().is_some());
    Ok(())
}

#[test]
fn test_broken_reload_disables_instrumentation() -> Result<()> {
    let dir = TempDir::new()?;
    write_document(dir.path(), &single_class_document("a.First", "run"))?;
    let store = PolicyStore::load(PolicyDocumentLoader::new(dir.path()));
    assert!(store.is_enabled());

    write_document(dir.path(), "<ApplicationInsightsAgent><Instrumentation>")?;
    assert_eq!(store.reload(), ReloadOutcome::Disabled);
    assert!(!store.is_enabled());
    assert!(store.current().is_none());

    write_document(dir.path(), &single_class_document("a.First", "run"))?;
    assert_eq!(store.reload(), ReloadOutcome::Published);
    assert!(store.is_enabled());
    Ok(())
}

#[test]
fn test_readers_see_whole_snapshots() -> Result<()> {
    let dir = TempDir::new()?;
    let first = r#"<ApplicationInsightsAgent><Instrumentation>
        <Class name="a.A" thresholdInMS="1"><Method name="m"/></Class>
        <Class name="a.B" thresholdInMS="1"><Method name="m"/></Class>
      </Instrumentation></ApplicationInsightsAgent>"#;
    let second = r#"<ApplicationInsightsAgent><Instrumentation>
        <Class name="a.A" thresholdInMS="2"><Method name="m"/></Class>
        <Class name="a.B" thresholdInMS="2"><Method name="m"/></Class>
      </Instrumentation></ApplicationInsightsAgent>"#;
    write_document(dir.path(), first)?;

    let store = Arc::new(PolicyStore::load(PolicyDocumentLoader::new(dir.path())));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut observed = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let Some(policy) = store.current() else { continue };
                    let a = policy.class_rule("a.A").map(|r| r.default_threshold_ms());
                    let b = policy.class_rule("a.B").map(|r| r.default_threshold_ms());
                    assert_eq!(a, b, "reader observed a mixed snapshot");
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for round in 0..20 {
        let document = if round % 2 == 0 { second } else { first };
        write_document(dir.path(), document)?;
        assert_eq!(store.reload(), ReloadOutcome::Published);
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
    assert_eq!(store.reload_count(), 20);
    Ok(())
}
