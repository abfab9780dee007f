//! Publication of the active [FilterSet].
//!
//! Filter sets are immutable: updating the configuration means compiling a new set and
//! swapping it in. Readers take an [Arc] snapshot and keep matching against it, so an
//! in-flight match always sees either the old set or the new one in full.

use std::sync::Arc;

use tokio::sync::watch;

use crate::FilterSet;

/// Owner of the currently active [FilterSet].
#[derive(Debug)]
pub struct ActiveFilters {
    tx: watch::Sender<Arc<FilterSet>>,
}

impl ActiveFilters {
    pub fn new(filters: FilterSet) -> Self {
        let (tx, _) = watch::channel(Arc::new(filters));
        Self { tx }
    }

    pub fn current(&self) -> Arc<FilterSet> {
        self.tx.borrow().clone()
    }

    /// Swap in a new set, returning the previous one.
    pub fn replace(&self, filters: FilterSet) -> Arc<FilterSet> {
        log::debug!("Activating {} filters", filters.len());
        self.tx.send_replace(Arc::new(filters))
    }

    pub fn subscribe(&self) -> FilterSetReader {
        FilterSetReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ActiveFilters {
    fn default() -> Self {
        Self::new(FilterSet::default())
    }
}

/// Read side of [ActiveFilters], one per worker.
#[derive(Debug, Clone)]
pub struct FilterSetReader {
    rx: watch::Receiver<Arc<FilterSet>>,
}

impl FilterSetReader {
    pub fn current(&self) -> Arc<FilterSet> {
        self.rx.borrow().clone()
    }

    /// Wait for the next replacement and return the new set.
    ///
    /// Returns [None] once the [ActiveFilters] has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<FilterSet>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use tracer_core::{Event, EventSchema};

    use super::*;
    use crate::{FilterCompiler, NamespaceContext};

    fn compile(raw: &str) -> FilterSet {
        let schema = EventSchema::builtin();
        let namespace = NamespaceContext::new(1);
        let compiler = FilterCompiler::new(&schema, &namespace);
        let filter = compiler.compile_str("test", raw).unwrap();
        compiler.compile_set(vec![filter]).unwrap()
    }

    #[test]
    fn replace() {
        let active = ActiveFilters::default();
        let event = Event::new("execve");
        assert!(!active.current().is_match(&event));

        let snapshot = active.current();
        let previous = active.replace(compile("execve"));
        assert!(previous.is_empty());
        assert!(active.current().is_match(&event));

        // old snapshots are left untouched
        assert!(!snapshot.is_match(&event));
    }

    #[test]
    fn readers_see_whole_sets() {
        let active = ActiveFilters::new(compile("uid == 0"));
        let reader = active.subscribe();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let reader = reader.clone();
                s.spawn(move || {
                    for _ in 0..100 {
                        let set = reader.current();
                        assert_eq!(set.len(), 1);
                    }
                });
            }
            for raw in ["uid == 1", "uid == 2", "execve"] {
                active.replace(compile(raw));
            }
        });

        assert_eq!(
            reader.current().filters()[0].expression().unwrap().to_string(),
            r#"event == "execve""#
        );
    }

    #[tokio::test]
    async fn changed() {
        let active = ActiveFilters::default();
        let mut reader = active.subscribe();

        active.replace(compile("execve"));
        let set = reader.changed().await.unwrap();
        assert!(set.is_match(&Event::new("execve")));

        drop(active);
        assert!(reader.changed().await.is_none());
    }
}
