//! Recording collaborators for unit tests

use crate::context::{Action, ActionManager, EventDispatcher, InputCategory, SceneContext, Scheduler};
use crate::node::Node;
use crate::timer::Timer;
use crate::types::NodeId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Action identified only by its tag
pub(crate) struct TestAction(pub i32);

impl Action for TestAction {
    fn tag(&self) -> i32 {
        self.0
    }
}

struct RunningAction {
    node: NodeId,
    action: Arc<dyn Action>,
    paused: bool,
}

/// Scheduler, action manager and event dispatcher that count every call
#[derive(Default)]
pub(crate) struct Recorder {
    schedules: AtomicUsize,
    unschedules: AtomicUsize,
    handler_adds: [AtomicUsize; InputCategory::ALL.len()],
    handler_removes: [AtomicUsize; InputCategory::ALL.len()],
    handlers: Mutex<HashMap<(InputCategory, NodeId), i32>>,
    physics: Mutex<HashSet<NodeId>>,
    actions: Mutex<Vec<RunningAction>>,
    action_pauses: AtomicUsize,
    action_resumes: AtomicUsize,
    action_removals: AtomicUsize,
}

impl Recorder {
    pub(crate) fn schedule_calls(&self) -> usize {
        self.schedules.load(Ordering::SeqCst)
    }

    pub(crate) fn unschedule_calls(&self) -> usize {
        self.unschedules.load(Ordering::SeqCst)
    }

    pub(crate) fn handler_adds(&self, category: InputCategory) -> usize {
        self.handler_adds[category.index()].load(Ordering::SeqCst)
    }

    pub(crate) fn handler_removes(&self, category: InputCategory) -> usize {
        self.handler_removes[category.index()].load(Ordering::SeqCst)
    }

    /// Priority a node is currently registered with, if any
    pub(crate) fn handler_priority(&self, category: InputCategory, node: NodeId) -> Option<i32> {
        self.handlers.lock().get(&(category, node)).copied()
    }

    pub(crate) fn is_physics_node(&self, node: NodeId) -> bool {
        self.physics.lock().contains(&node)
    }

    pub(crate) fn action_pauses(&self) -> usize {
        self.action_pauses.load(Ordering::SeqCst)
    }

    pub(crate) fn action_resumes(&self) -> usize {
        self.action_resumes.load(Ordering::SeqCst)
    }

    pub(crate) fn action_removals(&self) -> usize {
        self.action_removals.load(Ordering::SeqCst)
    }

    fn set_paused(&self, node: &Node, tag: Option<i32>, paused: bool) {
        for running in self.actions.lock().iter_mut() {
            if running.node == node.id() && tag.map_or(true, |t| running.action.tag() == t) {
                running.paused = paused;
            }
        }
    }
}

impl Scheduler for Recorder {
    fn schedule(&self, _timer: &Arc<Timer>) {
        self.schedules.fetch_add(1, Ordering::SeqCst);
    }

    fn unschedule(&self, _timer: &Arc<Timer>) {
        self.unschedules.fetch_add(1, Ordering::SeqCst);
    }
}

impl ActionManager for Recorder {
    fn add_action(&self, action: Arc<dyn Action>, node: &Node) {
        self.actions.lock().push(RunningAction {
            node: node.id(),
            action,
            paused: false,
        });
    }

    fn remove_action_by_tag(&self, node: &Node, tag: i32) {
        self.actions
            .lock()
            .retain(|r| r.node != node.id() || r.action.tag() != tag);
    }

    fn remove_actions(&self, node: &Node, _include_children: bool) {
        self.action_removals.fetch_add(1, Ordering::SeqCst);
        self.actions.lock().retain(|r| r.node != node.id());
    }

    fn pause_actions(&self, node: &Node, _include_children: bool) {
        self.action_pauses.fetch_add(1, Ordering::SeqCst);
        self.set_paused(node, None, true);
    }

    fn resume_actions(&self, node: &Node, _include_children: bool) {
        self.action_resumes.fetch_add(1, Ordering::SeqCst);
        self.set_paused(node, None, false);
    }

    fn pause_action(&self, node: &Node, tag: i32) {
        self.set_paused(node, Some(tag), true);
    }

    fn resume_action(&self, node: &Node, tag: i32) {
        self.set_paused(node, Some(tag), false);
    }

    fn action(&self, node: &Node, tag: i32) -> Option<Arc<dyn Action>> {
        self.actions
            .lock()
            .iter()
            .find(|r| r.node == node.id() && r.action.tag() == tag)
            .map(|r| Arc::clone(&r.action))
    }

    fn running_action_count(&self, node: &Node) -> usize {
        self.actions
            .lock()
            .iter()
            .filter(|r| r.node == node.id() && !r.paused)
            .count()
    }

    fn add_physics_node(&self, node: &Node) {
        self.physics.lock().insert(node.id());
    }

    fn remove_physics_node(&self, node: &Node) {
        self.physics.lock().remove(&node.id());
    }
}

impl EventDispatcher for Recorder {
    fn add_handler(&self, category: InputCategory, node: &Node, priority: i32) {
        self.handler_adds[category.index()].fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().insert((category, node.id()), priority);
    }

    fn remove_handler(&self, category: InputCategory, node: &Node) {
        self.handler_removes[category.index()].fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().remove(&(category, node.id()));
    }
}

/// Context whose three collaborators are one shared recorder
pub(crate) fn recording_context() -> (Arc<SceneContext>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let ctx = SceneContext::new(recorder.clone(), recorder.clone(), recorder.clone());
    (ctx, recorder)
}
