//! File-system watch loop feeding change batches to the dispatcher.

use crate::contexts::ChangeDispatcher;
use crate::data::ChangeSet;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often an idle loop checks the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Watches `watch_paths` under `project_root` until `stop` is raised.
///
/// Events are grouped into a batch until `debounce` passes without a new
/// one; each batch is dispatched to completion before more events are read.
pub fn run_watch_loop(
    project_root: &Path,
    watch_paths: &[String],
    debounce: Duration,
    dispatcher: &ChangeDispatcher,
    stop: &AtomicBool,
) -> Result<()> {
    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;

    let mut watched = 0usize;
    for dir in watch_paths {
        let path = project_root.join(dir);
        if !path.is_dir() {
            warn!("watch path {} does not exist, skipping", path.display());
            continue;
        }
        watcher
            .watch(&path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        info!("watching {}", path.display());
        watched += 1;
    }

    if watched == 0 {
        anyhow::bail!("None of the configured watch paths exist: {}", watch_paths.join(", "));
    }

    while !stop.load(Ordering::SeqCst) {
        let Some(changes) = next_batch(&rx, debounce, stop) else {
            break;
        };
        if changes.is_empty() {
            continue;
        }

        debug!(
            modified = changes.modified.len(),
            added = changes.added.len(),
            removed = changes.removed.len(),
            "change batch received"
        );
        let summary = dispatcher.dispatch(&changes);
        if summary.considered > 0 {
            println!(
                "Batch done: {} generated, {} skipped, {} failed",
                summary.generated, summary.skipped, summary.failed
            );
        }
    }

    drop(watcher);
    println!("Stopped watching.");
    Ok(())
}

/// Blocks until a batch is complete. `None` means the loop should end.
fn next_batch(
    rx: &Receiver<notify::Result<Event>>,
    debounce: Duration,
    stop: &AtomicBool,
) -> Option<ChangeSet> {
    let mut changes = ChangeSet::default();

    loop {
        if stop.load(Ordering::SeqCst) {
            return None;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                record_event(&mut changes, event);
                break;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }

    loop {
        match rx.recv_timeout(debounce) {
            Ok(event) => record_event(&mut changes, event),
            Err(RecvTimeoutError::Timeout) => return Some(changes),
            Err(RecvTimeoutError::Disconnected) => return Some(changes),
        }
    }
}

fn record_event(changes: &mut ChangeSet, event: notify::Result<Event>) {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            warn!("watch error: {}", e);
            return;
        }
    };

    let bucket: &mut Vec<PathBuf> = match event.kind {
        EventKind::Create(_) => &mut changes.added,
        EventKind::Modify(_) => &mut changes.modified,
        EventKind::Remove(_) => &mut changes.removed,
        _ => return,
    };
    for path in event.paths {
        if !bucket.contains(&path) {
            bucket.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> notify::Result<Event> {
        Ok(Event::new(kind).add_path(PathBuf::from(path)))
    }

    #[test]
    fn sorts_events_into_change_buckets() {
        let mut changes = ChangeSet::default();
        record_event(&mut changes, event(EventKind::Create(CreateKind::File), "app/models/a.rb"));
        record_event(
            &mut changes,
            event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), "app/models/b.rb"),
        );
        record_event(
            &mut changes,
            event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), "app/models/b.rb"),
        );
        record_event(&mut changes, event(EventKind::Remove(RemoveKind::File), "app/models/c.rb"));
        record_event(&mut changes, event(EventKind::Access(notify::event::AccessKind::Any), "x.rb"));

        assert_eq!(changes.added, vec![PathBuf::from("app/models/a.rb")]);
        assert_eq!(changes.modified, vec![PathBuf::from("app/models/b.rb")]);
        assert_eq!(changes.removed, vec![PathBuf::from("app/models/c.rb")]);
    }

    #[test]
    fn batches_events_until_quiet() {
        let (tx, rx) = channel();
        tx.send(event(EventKind::Create(CreateKind::File), "app/models/a.rb")).unwrap();
        tx.send(event(EventKind::Create(CreateKind::File), "lib/b.rb")).unwrap();

        let stop = AtomicBool::new(false);
        let batch = next_batch(&rx, Duration::from_millis(20), &stop).unwrap();
        assert_eq!(batch.added.len(), 2);
    }

    #[test]
    fn stop_flag_ends_the_wait() {
        let (_tx, rx) = channel::<notify::Result<Event>>();
        let stop = AtomicBool::new(true);
        assert!(next_batch(&rx, Duration::from_millis(20), &stop).is_none());
    }
}
