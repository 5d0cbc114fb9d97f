// SPDX-License-Identifier: MIT OR Apache-2.0
//! The production router: priority-ordered, filtered dispatch to policies.

use crate::entry::{Entry, EntryPost, EntryState, MAX_PRIORITY, RouterError};
use std::sync::Arc;
use tracing::debug;
use vigil_asset::{AssetBuilder, Filter, Policy, TraceSink};
use vigil_event::Event;

struct Slot {
    meta: Entry,
    policy: Box<dyn Policy>,
    filter: Box<dyn Filter>,
}

/// Dispatches production events to the first enabled entry whose filter
/// matches, walking entries in ascending priority order (lower wins).
pub struct Router {
    builder: Arc<dyn AssetBuilder>,
    slots: Vec<Slot>,
}

impl Router {
    /// An empty router building its callables with `builder`.
    pub fn new(builder: Arc<dyn AssetBuilder>) -> Self {
        Self {
            builder,
            slots: Vec::new(),
        }
    }

    /// Add a new entry in the disabled state.
    ///
    /// Rejects duplicate names, out-of-range priorities, and priorities
    /// already held by an enabled entry.
    pub fn add_entry(&mut self, post: EntryPost) -> Result<(), RouterError> {
        if post.priority == 0 || post.priority > MAX_PRIORITY {
            return Err(RouterError::InvalidPriority {
                priority: post.priority,
            });
        }
        if self.slots.iter().any(|s| s.meta.post.name == post.name) {
            return Err(RouterError::DuplicateName { name: post.name });
        }
        self.check_priority_free(post.priority, &post.name)?;

        let policy = self.builder.build_policy(&post.policy)?;
        let filter = self.builder.build_filter(&post.filter)?;

        debug!(entry = %post.name, priority = post.priority, "router entry added");
        self.slots.push(Slot {
            meta: Entry {
                post,
                state: EntryState::Disabled,
            },
            policy,
            filter,
        });
        self.sort();
        Ok(())
    }

    /// Remove the named entry.
    pub fn remove_entry(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self.index_of(name)?;
        self.slots.remove(idx);
        debug!(entry = %name, "router entry removed");
        Ok(())
    }

    /// Snapshot of the named entry.
    pub fn get_entry(&self, name: &str) -> Result<Entry, RouterError> {
        Ok(self.slots[self.index_of(name)?].meta.clone())
    }

    /// Transition the named entry to enabled, re-checking priority
    /// uniqueness against the other enabled entries.
    pub fn enable_entry(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self.index_of(name)?;
        self.check_priority_free(self.slots[idx].meta.post.priority, name)?;
        self.slots[idx].meta.state = EntryState::Enabled;
        Ok(())
    }

    /// Rebuild the named entry's policy and filter from their definitions.
    ///
    /// Both callables are built before either is swapped in, so a builder
    /// failure leaves the entry untouched. Order and enablement are
    /// preserved.
    pub fn rebuild_entry(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self.index_of(name)?;
        let policy = self.builder.build_policy(&self.slots[idx].meta.post.policy)?;
        let filter = self.builder.build_filter(&self.slots[idx].meta.post.filter)?;
        self.slots[idx].policy = policy;
        self.slots[idx].filter = filter;
        debug!(entry = %name, "router entry rebuilt");
        Ok(())
    }

    /// Move the named entry to a new priority.
    pub fn change_priority(&mut self, name: &str, priority: u32) -> Result<(), RouterError> {
        if priority == 0 || priority > MAX_PRIORITY {
            return Err(RouterError::InvalidPriority { priority });
        }
        let idx = self.index_of(name)?;
        self.check_priority_free(priority, name)?;
        self.slots[idx].meta.post.priority = priority;
        self.sort();
        Ok(())
    }

    /// Ordered snapshot of every entry.
    pub fn entries(&self) -> Vec<Entry> {
        self.slots.iter().map(|s| s.meta.clone()).collect()
    }

    /// Route one event: the first enabled entry whose filter matches
    /// evaluates it; later entries are not consulted.
    pub fn ingest(&self, event: &mut Event) -> Result<(), RouterError> {
        for slot in &self.slots {
            if slot.meta.state != EntryState::Enabled {
                continue;
            }
            if slot.filter.matches(event) {
                debug!(entry = %slot.meta.post.name, "event matched route");
                slot.policy.evaluate(event, &mut TraceSink::disabled())?;
                return Ok(());
            }
        }
        Err(RouterError::NoMatch)
    }

    fn index_of(&self, name: &str) -> Result<usize, RouterError> {
        self.slots
            .iter()
            .position(|s| s.meta.post.name == name)
            .ok_or_else(|| RouterError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Priority uniqueness holds among enabled entries only; `except` is
    /// the entry being placed.
    fn check_priority_free(&self, priority: u32, except: &str) -> Result<(), RouterError> {
        match self.slots.iter().find(|s| {
            s.meta.state == EntryState::Enabled
                && s.meta.post.priority == priority
                && s.meta.post.name != except
        }) {
            Some(holder) => Err(RouterError::PriorityTaken {
                priority,
                holder: holder.meta.post.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn sort(&mut self) {
        self.slots.sort_by_key(|s| s.meta.post.priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use vigil_asset::mock::MockBuilder;
    use vigil_asset::{AssetBuilder, AssetError};

    fn router(builder: MockBuilder) -> Router {
        Router::new(Arc::new(builder))
    }

    fn post(name: &str, priority: u32) -> EntryPost {
        EntryPost::new(name, format!("policy/{name}/0"), format!("filter/{name}/0"), priority)
    }

    #[test]
    fn add_get_remove_round_trip() {
        let mut r = router(MockBuilder::new());
        r.add_entry(post("allow", 10)).unwrap();

        let entry = r.get_entry("allow").unwrap();
        assert_eq!(entry.state, EntryState::Disabled);
        assert_eq!(entry.post.priority, 10);

        r.remove_entry("allow").unwrap();
        assert!(matches!(
            r.get_entry("allow"),
            Err(RouterError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut r = router(MockBuilder::new());
        r.add_entry(post("dup", 10)).unwrap();
        assert!(matches!(
            r.add_entry(post("dup", 20)),
            Err(RouterError::DuplicateName { .. })
        ));
    }

    #[test]
    fn zero_and_oversized_priorities_are_rejected() {
        let mut r = router(MockBuilder::new());
        assert!(matches!(
            r.add_entry(post("zero", 0)),
            Err(RouterError::InvalidPriority { .. })
        ));
        assert!(matches!(
            r.add_entry(post("huge", MAX_PRIORITY + 1)),
            Err(RouterError::InvalidPriority { .. })
        ));
    }

    #[test]
    fn enabled_priorities_must_be_unique_but_disabled_relax_it() {
        let mut r = router(MockBuilder::new());
        r.add_entry(post("first", 10)).unwrap();
        r.enable_entry("first").unwrap();

        // An enabled entry holds 10: adding another at 10 is rejected.
        assert!(matches!(
            r.add_entry(post("second", 10)),
            Err(RouterError::PriorityTaken { .. })
        ));

        // Disable it, and the same add succeeds but cannot be enabled.
        r.add_entry(post("third", 20)).unwrap();
        r.remove_entry("first").unwrap();
        r.add_entry(post("second", 20)).unwrap();
        r.enable_entry("third").unwrap();
        assert!(matches!(
            r.enable_entry("second"),
            Err(RouterError::PriorityTaken { .. })
        ));
    }

    #[test]
    fn builder_failure_aborts_add() {
        let mut r = router(MockBuilder::new().failing_build("policy/broken/0"));
        assert!(matches!(
            r.add_entry(post("broken", 10)),
            Err(RouterError::Asset(AssetError::Invalid { .. }))
        ));
        assert!(r.entries().is_empty());
    }

    #[test]
    fn ingest_picks_the_lowest_matching_priority() {
        let builder = MockBuilder::new()
            .filter_matching("filter/ssh/0", "sshd")
            .filter_matching("filter/cron/0", "cron");
        let mut r = router(builder);
        r.add_entry(post("cron", 50)).unwrap();
        r.add_entry(post("ssh", 10)).unwrap();
        r.enable_entry("cron").unwrap();
        r.enable_entry("ssh").unwrap();

        let mut event = Event::new(1, "loc", "sshd: accepted");
        r.ingest(&mut event).unwrap();
        assert_eq!(event.field("policy"), Some(&serde_json::json!("policy/ssh/0")));

        let mut event = Event::new(1, "loc", "cron: started");
        r.ingest(&mut event).unwrap();
        assert_eq!(event.field("policy"), Some(&serde_json::json!("policy/cron/0")));
    }

    #[test]
    fn disabled_entries_do_not_dispatch() {
        let mut r = router(MockBuilder::new());
        r.add_entry(post("all", 10)).unwrap();

        let mut event = Event::new(1, "loc", "anything");
        assert!(matches!(r.ingest(&mut event), Err(RouterError::NoMatch)));

        r.enable_entry("all").unwrap();
        r.ingest(&mut event).unwrap();
    }

    #[test]
    fn no_matching_filter_reports_no_match() {
        let mut r = router(MockBuilder::new().filter_matching("filter/ssh/0", "sshd"));
        r.add_entry(post("ssh", 10)).unwrap();
        r.enable_entry("ssh").unwrap();

        let mut event = Event::new(1, "loc", "unrelated log line");
        assert!(matches!(r.ingest(&mut event), Err(RouterError::NoMatch)));
    }

    #[test]
    fn change_priority_reorders_and_is_idempotent() {
        let mut r = router(MockBuilder::new());
        r.add_entry(post("a", 10)).unwrap();
        r.add_entry(post("b", 20)).unwrap();
        r.enable_entry("a").unwrap();
        r.enable_entry("b").unwrap();

        r.change_priority("b", 5).unwrap();
        let names: Vec<String> = r.entries().into_iter().map(|e| e.post.name).collect();
        assert_eq!(names, vec!["b", "a"]);

        // Re-issuing the same change leaves the state unchanged.
        r.change_priority("b", 5).unwrap();
        let names: Vec<String> = r.entries().into_iter().map(|e| e.post.name).collect();
        assert_eq!(names, vec!["b", "a"]);

        assert!(matches!(
            r.change_priority("b", 10),
            Err(RouterError::PriorityTaken { .. })
        ));
    }

    /// Builder that can be switched into a failing mode after construction.
    struct FlakyBuilder {
        inner: MockBuilder,
        failing: AtomicBool,
    }

    impl FlakyBuilder {
        fn check(&self) -> Result<(), AssetError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(AssetError::Invalid {
                    name: "*".to_owned(),
                    reason: "builder offline".to_owned(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl AssetBuilder for FlakyBuilder {
        fn build_policy(&self, name: &str) -> Result<Box<dyn vigil_asset::Policy>, AssetError> {
            self.check()?;
            self.inner.build_policy(name)
        }
        fn build_filter(&self, name: &str) -> Result<Box<dyn vigil_asset::Filter>, AssetError> {
            self.check()?;
            self.inner.build_filter(name)
        }
        fn assets_of(&self, name: &str) -> Result<std::collections::BTreeSet<String>, AssetError> {
            self.check()?;
            self.inner.assets_of(name)
        }
    }

    #[test]
    fn failed_rebuild_keeps_the_old_callables() {
        let builder = Arc::new(FlakyBuilder {
            inner: MockBuilder::new(),
            failing: AtomicBool::new(false),
        });
        let mut r = Router::new(builder.clone());
        r.add_entry(post("keep", 10)).unwrap();
        r.enable_entry("keep").unwrap();

        builder.failing.store(true, Ordering::SeqCst);
        assert!(r.rebuild_entry("keep").is_err());

        // The original policy still dispatches.
        let mut event = Event::new(1, "loc", "anything");
        r.ingest(&mut event).unwrap();
        assert_eq!(event.field("policy"), Some(&serde_json::json!("policy/keep/0")));

        builder.failing.store(false, Ordering::SeqCst);
        r.rebuild_entry("keep").unwrap();
        assert_eq!(r.get_entry("keep").unwrap().state, EntryState::Enabled);
    }
}
