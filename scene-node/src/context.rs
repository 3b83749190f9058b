//! Collaborator interfaces and the shared scene context
//!
//! The node tree drives three external subsystems: a timer scheduler, an
//! action manager (which also integrates velocity/acceleration), and an input
//! event dispatcher. They are injected once at startup through a
//! [`SceneContext`] that every node holds a handle to, together with the
//! device configuration and the tree-wide lock used by the `*_locked` entry
//! points.

use crate::node::Node;
use crate::timer::Timer;
use crate::types::DeviceConfig;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Category of input a node can register for
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCategory {
    Touch = 0,
    Key = 1,
    Gesture = 2,
    DoubleTap = 3,
    Accelerometer = 4,
}

impl InputCategory {
    pub const ALL: [InputCategory; 5] = [
        InputCategory::Touch,
        InputCategory::Key,
        InputCategory::Gesture,
        InputCategory::DoubleTap,
        InputCategory::Accelerometer,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Drives timers once they are handed over
pub trait Scheduler: Send + Sync {
    fn schedule(&self, timer: &Arc<Timer>);
    fn unschedule(&self, timer: &Arc<Timer>);
}

/// Opaque action run against a node
pub trait Action: Send + Sync {
    fn tag(&self) -> i32;
}

/// Runs actions and integrates nodes with nonzero velocity or acceleration
pub trait ActionManager: Send + Sync {
    fn add_action(&self, action: Arc<dyn Action>, node: &Node);
    fn remove_action_by_tag(&self, node: &Node, tag: i32);
    fn remove_actions(&self, node: &Node, include_children: bool);
    fn pause_actions(&self, node: &Node, include_children: bool);
    fn resume_actions(&self, node: &Node, include_children: bool);
    fn pause_action(&self, node: &Node, tag: i32);
    fn resume_action(&self, node: &Node, tag: i32);
    fn action(&self, node: &Node, tag: i32) -> Option<Arc<dyn Action>>;
    fn running_action_count(&self, node: &Node) -> usize;

    /// Register a node for per-frame velocity integration. Must be idempotent.
    fn add_physics_node(&self, node: &Node);

    /// Unregister a node from velocity integration. Must be idempotent.
    fn remove_physics_node(&self, node: &Node);
}

/// Delivers input events to registered nodes
pub trait EventDispatcher: Send + Sync {
    fn add_handler(&self, category: InputCategory, node: &Node, priority: i32);
    fn remove_handler(&self, category: InputCategory, node: &Node);
}

/// Process-wide state shared by every node of a scene
pub struct SceneContext {
    scheduler: Arc<dyn Scheduler>,
    actions: Arc<dyn ActionManager>,
    events: Arc<dyn EventDispatcher>,
    device: RwLock<DeviceConfig>,
    focus_enabled: AtomicBool,
    tree_lock: ReentrantMutex<()>,
}

impl SceneContext {
    /// Create a context with the default device configuration
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        actions: Arc<dyn ActionManager>,
        events: Arc<dyn EventDispatcher>,
    ) -> Arc<Self> {
        Self::with_device(scheduler, actions, events, DeviceConfig::default())
    }

    /// Like [`SceneContext::new`], with an explicit device configuration
    pub fn with_device(
        scheduler: Arc<dyn Scheduler>,
        actions: Arc<dyn ActionManager>,
        events: Arc<dyn EventDispatcher>,
        device: DeviceConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            scheduler,
            actions,
            events,
            device: RwLock::new(device),
            focus_enabled: AtomicBool::new(false),
            tree_lock: ReentrantMutex::new(()),
        })
    }

    /// Scheduler that drives timers
    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    /// Action manager, which also integrates node motion
    pub fn actions(&self) -> &dyn ActionManager {
        self.actions.as_ref()
    }

    /// Dispatcher that input handlers register with
    pub fn events(&self) -> &dyn EventDispatcher {
        self.events.as_ref()
    }

    /// Acquire the tree-wide lock
    ///
    /// Re-entrant: a thread already holding it may take it again, so locked
    /// entry points can call each other.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.tree_lock.lock()
    }

    /// Current device scaling settings
    pub fn device(&self) -> DeviceConfig {
        *self.device.read()
    }

    pub fn set_device(&self, device: DeviceConfig) {
        *self.device.write() = device;
    }

    /// Whether nodes accept focus changes
    pub fn is_focus_enabled(&self) -> bool {
        self.focus_enabled.load(Ordering::Acquire)
    }

    pub fn set_focus_enabled(&self, enabled: bool) {
        self.focus_enabled.store(enabled, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recording_context;
    use crate::types::ScaleMode;

    #[test]
    fn test_tree_lock_is_reentrant() {
        let (ctx, _) = recording_context();
        let outer = ctx.lock();
        let inner = ctx.lock();
        drop(inner);
        drop(outer);
    }

    #[test]
    fn test_device_config_update() {
        let (ctx, _) = recording_context();
        assert_eq!(ctx.device().scale_mode, ScaleMode::ByDensity);

        ctx.set_device(DeviceConfig {
            scale_mode: ScaleMode::BaseSizeFitXy,
            base_scale_x: 2.0,
            base_scale_y: 2.0,
        });
        assert_eq!(ctx.device().scale_mode, ScaleMode::BaseSizeFitXy);
    }

    #[test]
    fn test_input_category_indices() {
        for (i, category) in InputCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }
}
