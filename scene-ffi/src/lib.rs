//! Scene FFI - C Foreign Function Interface
//!
//! C-compatible API over the scene node tree.
//!
//! Handles are reference counted. Every `*_create` call, and every function
//! documented as returning a new reference, hands one reference to the caller,
//! which gives it back with the matching `*_release`.
//!
//! Failures follow the C conventions of the engine: a warning is logged and
//! the call returns -1 for indices, null for handles and 0 for flags.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2};
use libc::{c_char, c_int, c_void};
use scene_node::{
    Action, ActionManager, DeviceConfig, EventDispatcher, InputCategory, Node, ScaleMode,
    SceneContext, Scheduler, Timer, TimerCallback,
};
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::Arc;

mod node_ffi;
pub use node_ffi::*;

/// Opaque handle to SceneContext (C-compatible)
pub struct SNContext {
    _private: [u8; 0],
}

/// Opaque handle to Node (C-compatible)
pub struct SNNode {
    _private: [u8; 0],
}

/// Opaque handle to Timer (C-compatible)
pub struct SNTimer {
    _private: [u8; 0],
}

/// C-compatible 2D affine transform, column major
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CAffine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl From<Affine2> for CAffine {
    fn from(t: Affine2) -> Self {
        bytemuck::cast(t.to_cols_array())
    }
}

/// C-compatible point
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CPoint {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for CPoint {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<CPoint> for Vec2 {
    fn from(p: CPoint) -> Self {
        Vec2::new(p.x, p.y)
    }
}

pub type TimerFn = Option<extern "C" fn(*mut c_void, *const SNTimer)>;
pub type NodeFn = Option<extern "C" fn(*mut c_void, *const SNNode)>;
pub type NodeFlagFn = Option<extern "C" fn(*mut c_void, *const SNNode, c_int)>;

/// Collaborators implemented by the host
///
/// Every callback receives `user_data` first. Node and timer pointers are
/// borrowed for the duration of the call. Missing callbacks are skipped.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CSceneCallbacks {
    pub user_data: *mut c_void,

    pub schedule: TimerFn,
    pub unschedule: TimerFn,

    /// (user_data, category, node, priority)
    pub add_handler: Option<extern "C" fn(*mut c_void, u32, *const SNNode, c_int)>,
    /// (user_data, category, node)
    pub remove_handler: Option<extern "C" fn(*mut c_void, u32, *const SNNode)>,

    pub add_physics_node: NodeFn,
    pub remove_physics_node: NodeFn,

    /// Flag is the action tag
    pub run_action: NodeFlagFn,
    pub stop_action: NodeFlagFn,
    pub pause_action: NodeFlagFn,
    pub resume_action: NodeFlagFn,

    /// Flag is `include_children`
    pub stop_all_actions: NodeFlagFn,
    pub pause_all_actions: NodeFlagFn,
    pub resume_all_actions: NodeFlagFn,

    pub running_action_count: Option<extern "C" fn(*mut c_void, *const SNNode) -> c_int>,
}

/// Action known to the host only by its tag
struct HostAction(i32);

impl Action for HostAction {
    fn tag(&self) -> i32 {
        self.0
    }
}

/// Routes collaborator calls to the host's callback table
struct CallbackBridge(CSceneCallbacks);

// SAFETY: the host promises that its callbacks and user_data may be used from
// any thread, as required by scene_context_create.
unsafe impl Send for CallbackBridge {}
unsafe impl Sync for CallbackBridge {}

fn node_ptr(node: &Node) -> *const SNNode {
    node as *const Node as *const SNNode
}

fn timer_ptr(timer: &Timer) -> *const SNTimer {
    timer as *const Timer as *const SNTimer
}

impl CallbackBridge {
    fn node(&self, f: NodeFn, node: &Node) {
        if let Some(f) = f {
            f(self.0.user_data, node_ptr(node));
        }
    }

    fn node_flag(&self, f: NodeFlagFn, node: &Node, flag: c_int) {
        if let Some(f) = f {
            f(self.0.user_data, node_ptr(node), flag);
        }
    }
}

impl Scheduler for CallbackBridge {
    fn schedule(&self, timer: &Arc<Timer>) {
        if let Some(f) = self.0.schedule {
            f(self.0.user_data, timer_ptr(timer));
        }
    }

    fn unschedule(&self, timer: &Arc<Timer>) {
        if let Some(f) = self.0.unschedule {
            f(self.0.user_data, timer_ptr(timer));
        }
    }
}

impl ActionManager for CallbackBridge {
    fn add_action(&self, action: Arc<dyn Action>, node: &Node) {
        self.node_flag(self.0.run_action, node, action.tag());
    }

    fn remove_action_by_tag(&self, node: &Node, tag: i32) {
        self.node_flag(self.0.stop_action, node, tag);
    }

    fn remove_actions(&self, node: &Node, include_children: bool) {
        self.node_flag(self.0.stop_all_actions, node, include_children as c_int);
    }

    fn pause_actions(&self, node: &Node, include_children: bool) {
        self.node_flag(self.0.pause_all_actions, node, include_children as c_int);
    }

    fn resume_actions(&self, node: &Node, include_children: bool) {
        self.node_flag(self.0.resume_all_actions, node, include_children as c_int);
    }

    fn pause_action(&self, node: &Node, tag: i32) {
        self.node_flag(self.0.pause_action, node, tag);
    }

    fn resume_action(&self, node: &Node, tag: i32) {
        self.node_flag(self.0.resume_action, node, tag);
    }

    /// Actions live on the host side; only their count is visible here
    fn action(&self, _node: &Node, _tag: i32) -> Option<Arc<dyn Action>> {
        None
    }

    fn running_action_count(&self, node: &Node) -> usize {
        match self.0.running_action_count {
            Some(f) => f(self.0.user_data, node_ptr(node)).max(0) as usize,
            None => 0,
        }
    }

    fn add_physics_node(&self, node: &Node) {
        self.node(self.0.add_physics_node, node);
    }

    fn remove_physics_node(&self, node: &Node) {
        self.node(self.0.remove_physics_node, node);
    }
}

impl EventDispatcher for CallbackBridge {
    fn add_handler(&self, category: InputCategory, node: &Node, priority: i32) {
        if let Some(f) = self.0.add_handler {
            f(self.0.user_data, category as u32, node_ptr(node), priority);
        }
    }

    fn remove_handler(&self, category: InputCategory, node: &Node) {
        if let Some(f) = self.0.remove_handler {
            f(self.0.user_data, category as u32, node_ptr(node));
        }
    }
}

pub(crate) fn input_category(value: u32) -> Option<InputCategory> {
    InputCategory::ALL.get(value as usize).copied()
}

/// Borrow the `Arc` behind a handle without taking a reference
///
/// # Safety
/// `ptr` must come from `Arc::into_raw` and still hold a reference.
pub(crate) unsafe fn borrow_arc<T>(ptr: *const T) -> ManuallyDrop<Arc<T>> {
    ManuallyDrop::new(Arc::from_raw(ptr))
}

pub(crate) fn into_handle<T, H>(value: Arc<T>) -> *mut H {
    Arc::into_raw(value) as *mut H
}

// ============================================================================
// CONTEXT API
// ============================================================================

/// Create a scene context over the host's collaborators
///
/// # Safety
/// `callbacks` must be valid for the call. The callbacks and `user_data` must
/// stay usable, from any thread, until the context and every node created
/// from it are released.
#[no_mangle]
pub unsafe extern "C" fn scene_context_create(
    callbacks: *const CSceneCallbacks,
) -> *mut SNContext {
    if callbacks.is_null() {
        log::warn!("scene_context_create: callbacks must be non-null");
        return ptr::null_mut();
    }

    let bridge = Arc::new(CallbackBridge(*callbacks));
    into_handle(SceneContext::new(bridge.clone(), bridge.clone(), bridge))
}

/// Release a context reference
///
/// # Safety
/// Caller must ensure ptr is valid and not already released.
#[no_mangle]
pub unsafe extern "C" fn scene_context_release(ptr: *mut SNContext) {
    if !ptr.is_null() {
        drop(Arc::from_raw(ptr as *const SceneContext));
    }
}

/// Set the device scaling mode: 0 by density, 1 base size fit XY
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_context_set_device(
    ptr: *mut SNContext,
    scale_mode: u32,
    base_scale_x: f32,
    base_scale_y: f32,
) -> c_int {
    if ptr.is_null() {
        return 0;
    }

    let scale_mode = match scale_mode {
        0 => ScaleMode::ByDensity,
        1 => ScaleMode::BaseSizeFitXy,
        other => {
            log::warn!("scene_context_set_device: unknown scale mode {}", other);
            return 0;
        }
    };

    let ctx = &*(ptr as *const SceneContext);
    ctx.set_device(DeviceConfig {
        scale_mode,
        base_scale_x,
        base_scale_y,
    });
    1
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_context_set_focus_enabled(ptr: *mut SNContext, enabled: c_int) {
    if ptr.is_null() {
        return;
    }

    let ctx = &*(ptr as *const SceneContext);
    ctx.set_focus_enabled(enabled != 0);
}

// ============================================================================
// TIMER API
// ============================================================================

/// Create a timer; `callback` runs with `user_data` each time it fires
///
/// # Safety
/// `user_data` must stay valid, from any thread, while the timer lives.
#[no_mangle]
pub unsafe extern "C" fn scene_timer_create(
    interval: f32,
    one_shot: c_int,
    callback: TimerFn,
    user_data: *mut c_void,
) -> *mut SNTimer {
    let callback: Option<TimerCallback> = callback.map(|f| {
        let user_data = user_data as usize;
        Box::new(move |timer: &Timer| f(user_data as *mut c_void, timer_ptr(timer)))
            as TimerCallback
    });

    let timer = if one_shot != 0 {
        Timer::one_shot(interval, callback)
    } else {
        Timer::new(interval, callback)
    };
    into_handle(timer)
}

/// # Safety
/// Caller must ensure ptr is valid and not already released.
#[no_mangle]
pub unsafe extern "C" fn scene_timer_release(ptr: *mut SNTimer) {
    if !ptr.is_null() {
        drop(Arc::from_raw(ptr as *const Timer));
    }
}

/// Fire a timer; returns 1 if its callback ran
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_timer_fire(ptr: *const SNTimer) -> c_int {
    if ptr.is_null() {
        return 0;
    }

    let timer = &*(ptr as *const Timer);
    timer.fire() as c_int
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_timer_is_done(ptr: *const SNTimer) -> c_int {
    if ptr.is_null() {
        return 0;
    }

    let timer = &*(ptr as *const Timer);
    timer.is_done() as c_int
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Get library version string
#[no_mangle]
pub extern "C" fn scene_version() -> *const c_char {
    "0.1.0\0".as_ptr() as *const c_char
}

/// Callbacks that count into a `Counters` passed as user_data
#[cfg(test)]
pub(crate) mod test_host {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct Counters {
        pub scheduled: AtomicUsize,
        pub unscheduled: AtomicUsize,
        pub handlers: AtomicUsize,
        pub physics: AtomicUsize,
        pub actions: AtomicUsize,
    }

    fn counters(user_data: *mut c_void) -> &'static Counters {
        unsafe { &*(user_data as *const Counters) }
    }

    extern "C" fn schedule(user_data: *mut c_void, _timer: *const SNTimer) {
        counters(user_data).scheduled.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn unschedule(user_data: *mut c_void, _timer: *const SNTimer) {
        counters(user_data).unscheduled.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn add_handler(user_data: *mut c_void, _category: u32, _node: *const SNNode, _priority: c_int) {
        counters(user_data).handlers.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn add_physics_node(user_data: *mut c_void, _node: *const SNNode) {
        counters(user_data).physics.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn run_action(user_data: *mut c_void, _node: *const SNNode, _tag: c_int) {
        counters(user_data).actions.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn running_action_count(user_data: *mut c_void, _node: *const SNNode) -> c_int {
        counters(user_data).actions.load(Ordering::SeqCst) as c_int
    }

    /// Leaks the counters so the returned reference outlives every node
    pub fn host() -> (&'static Counters, CSceneCallbacks) {
        let counters: &'static Counters = Box::leak(Box::default());
        let callbacks = CSceneCallbacks {
            user_data: counters as *const Counters as *mut c_void,
            schedule: Some(schedule),
            unschedule: Some(unschedule),
            add_handler: Some(add_handler),
            remove_handler: None,
            add_physics_node: Some(add_physics_node),
            remove_physics_node: None,
            run_action: Some(run_action),
            stop_action: None,
            pause_action: None,
            resume_action: None,
            stop_all_actions: None,
            pause_all_actions: None,
            resume_all_actions: None,
            running_action_count: Some(running_action_count),
        };
        (counters, callbacks)
    }
}
