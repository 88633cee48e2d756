// Synchronization hooks
//
// Observers notified once per synchronization cycle, i.e. every time the
// outermost `run_inside` callback returns. Hosts multiplex their own update
// machinery (re-rendering, change detection, instrumentation) through this
// interface instead of patching the controller.

use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Identifier returned by [`BoundaryController::subscribe`](super::BoundaryController::subscribe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

/// One synchronization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEvent {
    /// 1-based cycle counter for this controller
    pub cycle: u64,

    /// Time spent in the callback that triggered the cycle
    pub duration: Duration,
}

/// Receives synchronization cycles.
///
/// Called synchronously, still inside the boundary, after the triggering
/// callback returned. A hook may call `run_inside` again; nested calls do not
/// start another cycle.
#[cfg_attr(test, mockall::automock)]
pub trait SyncHook: Send + Sync {
    fn on_sync(&self, event: &SyncEvent);
}

/// Adapter for closure hooks
pub(crate) struct FnHook<F>(pub(crate) F);

impl<F> SyncHook for FnHook<F>
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_sync(&self, event: &SyncEvent) {
        (self.0)(event)
    }
}

/// Logs every synchronization cycle at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl SyncHook for TracingHook {
    fn on_sync(&self, event: &SyncEvent) {
        tracing::debug!(
            "Synchronization cycle #{} ({}us in boundary)",
            event.cycle,
            event.duration.as_micros()
        );
    }
}

/// Subscribed hooks in subscription order.
#[derive(Default)]
pub(crate) struct HookRegistry {
    next_id: u64,
    hooks: IndexMap<HookId, Arc<dyn SyncHook>>,
}

impl HookRegistry {
    pub(crate) fn insert(&mut self, hook: Arc<dyn SyncHook>) -> HookId {
        self.next_id += 1;
        let id = HookId(self.next_id);
        self.hooks.insert(id, hook);
        id
    }

    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        // shift_remove keeps notification order stable for the remaining hooks
        self.hooks.shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Clone the hook list so hooks run without the registry lock held.
    pub(crate) fn snapshot(registry: &Mutex<Self>) -> Vec<Arc<dyn SyncHook>> {
        let registry = registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.hooks.values().cloned().collect()
    }
}
