// Boundary controller
//
// Decides whether a unit of work executes inside or outside the UI
// synchronization boundary. Work inside the boundary ends with a
// synchronization cycle that observers (the view layer) react to; work outside
// it never triggers one.
//
// The status belongs to the execution context, not to the controller:
// - synchronous `run_inside` / `run_outside` push a frame on a thread-local stack
// - `run_outside_async` scopes a task-local frame around one future
// - a context with no frame for a controller is inside

pub mod hooks;

pub use hooks::{HookId, SyncEvent, SyncHook, TracingHook};

use hooks::{FnHook, HookRegistry};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// One tagged context for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    controller: u64,
    inside: bool,
}

thread_local! {
    /// Frames entered by the synchronous primitives on this thread, innermost last.
    static THREAD_FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

tokio::task_local! {
    /// Frames that live as long as a scoped future, across every `.await`.
    static TASK_FRAMES: Vec<Frame>;
}

fn innermost(frames: &[Frame], controller: u64) -> Option<bool> {
    frames
        .iter()
        .rev()
        .find(|frame| frame.controller == controller)
        .map(|frame| frame.inside)
}

/// Tags execution contexts as inside or outside the synchronization boundary.
///
/// Both synchronous primitives run the callback to completion before they
/// return and restore the previous context afterwards (also when the callback
/// unwinds). They introduce no concurrency of their own. An async driver that
/// must stay outside across many frames wraps its future in
/// [`run_outside_async`](Self::run_outside_async) instead.
///
/// Every context starts inside the boundary, like host code running in a UI
/// callback. Tagging one context never changes what another thread or task
/// observes. Cloning is cheap and every clone is the same controller.
///
/// # Example
/// ```
/// use zonepace::BoundaryController;
///
/// let boundary = BoundaryController::new();
/// boundary.subscribe_fn(|event| println!("sync #{}", event.cycle));
///
/// boundary.run_outside(|| {
///     assert!(!boundary.is_inside_boundary());
///     boundary.run_inside(|| assert!(boundary.is_inside_boundary()));
/// });
/// assert!(boundary.is_inside_boundary());
/// assert_eq!(boundary.sync_cycles(), 1);
/// ```
#[derive(Clone)]
pub struct BoundaryController {
    inner: Arc<Inner>,
}

struct Inner {
    id: u64,
    cycles: AtomicU64,
    hooks: Mutex<HookRegistry>,
}

impl BoundaryController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
                cycles: AtomicU64::new(0),
                hooks: Mutex::new(HookRegistry::default()),
            }),
        }
    }

    /// Whether the current execution context is inside the boundary.
    ///
    /// Pure query, safe to call from either context. The innermost
    /// synchronous frame on this thread wins, then the frame scoped around
    /// the current task, then the default (inside).
    pub fn is_inside_boundary(&self) -> bool {
        let id = self.inner.id;

        if let Some(inside) = THREAD_FRAMES.with_borrow(|frames| innermost(frames, id)) {
            return inside;
        }

        TASK_FRAMES
            .try_with(|frames| innermost(frames, id))
            .ok()
            .flatten()
            .unwrap_or(true)
    }

    /// Run `f` immediately, flagged as outside the boundary.
    pub fn run_outside<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = FrameGuard::push(self.inner.id, false);
        f()
    }

    /// Run `f` immediately, flagged as inside the boundary.
    ///
    /// When the outermost `run_inside` callback of this context returns, one
    /// synchronization cycle is delivered to every subscribed hook before
    /// this call returns, so mutations made by `f` are visible to observers
    /// synchronously.
    pub fn run_inside<R>(&self, f: impl FnOnce() -> R) -> R {
        let outermost = !self.within_run_inside();
        let _frame = FrameGuard::push(self.inner.id, true);
        let started = Instant::now();

        let result = f();

        if outermost {
            self.synchronize(started);
        }
        result
    }

    /// Drive `future` outside the boundary for its whole lifetime.
    ///
    /// The tag travels with the future across `.await` points and worker
    /// threads. Other tasks, including code polled on the same thread between
    /// two polls of `future`, keep their own status.
    pub async fn run_outside_async<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        let mut frames = TASK_FRAMES
            .try_with(|frames| frames.clone())
            .unwrap_or_default();
        frames.push(Frame {
            controller: self.inner.id,
            inside: false,
        });

        TASK_FRAMES.scope(frames, future).await
    }

    /// Register a hook notified on every synchronization cycle.
    pub fn subscribe<H>(&self, hook: H) -> HookId
    where
        H: SyncHook + 'static,
    {
        let mut hooks = self.inner.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.insert(Arc::new(hook))
    }

    /// Register a closure notified on every synchronization cycle.
    pub fn subscribe_fn<F>(&self, hook: F) -> HookId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.subscribe(FnHook(hook))
    }

    /// Remove a hook. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: HookId) -> bool {
        let mut hooks = self.inner.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.remove(id)
    }

    pub fn hook_count(&self) -> usize {
        let hooks = self.inner.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.len()
    }

    /// Synchronization cycles triggered so far.
    pub fn sync_cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }

    fn within_run_inside(&self) -> bool {
        let id = self.inner.id;
        THREAD_FRAMES.with_borrow(|frames| {
            frames
                .iter()
                .any(|frame| frame.controller == id && frame.inside)
        })
    }

    fn synchronize(&self, started: Instant) {
        let event = SyncEvent {
            cycle: self.inner.cycles.fetch_add(1, Ordering::SeqCst) + 1,
            duration: started.elapsed(),
        };

        for hook in HookRegistry::snapshot(&self.inner.hooks) {
            hook.on_sync(&event);
        }
    }
}

impl Default for BoundaryController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BoundaryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryController")
            .field("id", &self.inner.id)
            .field("inside", &self.is_inside_boundary())
            .field("sync_cycles", &self.sync_cycles())
            .field("hooks", &self.hook_count())
            .finish()
    }
}

/// Pops its frame from this thread's stack when dropped.
///
/// Not `Send`: the frame must be popped on the thread that pushed it.
struct FrameGuard {
    _thread_bound: PhantomData<*const ()>,
}

impl FrameGuard {
    fn push(controller: u64, inside: bool) -> Self {
        THREAD_FRAMES.with_borrow_mut(|frames| frames.push(Frame { controller, inside }));
        Self {
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        THREAD_FRAMES.with_borrow_mut(|frames| {
            frames.pop();
        });
    }
}
