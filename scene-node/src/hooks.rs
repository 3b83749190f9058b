//! Overridable node behavior
//!
//! A node's lifecycle and input callbacks go through a [`NodeHooks`]
//! implementation chosen at construction. Every method has a default, so a
//! node kind only overrides what it needs. Lifecycle hooks run after the
//! node's own bookkeeping on enter and before it on exit.

use crate::event::{KeyEvent, MotionEvent};
use crate::node::Node;

pub trait NodeHooks: Send + Sync {
    /// Name used in diagnostics
    fn class_name(&self) -> &'static str {
        "Node"
    }

    fn on_attach_to_parent(&self, _node: &Node, _parent: &Node) {}

    fn on_detach_from_parent(&self, _node: &Node, _parent: &Node) {}

    fn on_enter(&self, _node: &Node) {}

    fn on_exit(&self, _node: &Node) {}

    fn on_enter_transition_did_finish(&self, _node: &Node) {}

    fn on_cleanup(&self, _node: &Node) {}

    // Touch. The return value tells the dispatcher whether the node
    // intercepts the touch.

    fn touches_began(&self, node: &Node, e: &MotionEvent) -> bool {
        node.default_touches_began(e)
    }

    fn touches_moved(&self, node: &Node, e: &MotionEvent) -> bool {
        node.default_touches_moved(e)
    }

    fn touches_ended(&self, node: &Node, e: &MotionEvent) -> bool {
        node.default_touches_ended(e)
    }

    fn touches_cancelled(&self, node: &Node, e: &MotionEvent) -> bool {
        node.default_touches_cancelled(e)
    }

    fn touches_pointer_began(&self, node: &Node, e: &MotionEvent) -> bool {
        node.default_touches_pointer_began(e)
    }

    fn touches_pointer_ended(&self, node: &Node, e: &MotionEvent) -> bool {
        node.default_touches_pointer_ended(e)
    }

    // Keys

    fn key_down(&self, _node: &Node, _e: &KeyEvent) -> bool {
        false
    }

    fn key_up(&self, _node: &Node, _e: &KeyEvent) -> bool {
        false
    }

    fn key_multiple(&self, _node: &Node, _e: &KeyEvent) -> bool {
        false
    }

    fn accelerometer_changed(&self, _node: &Node, _x: f32, _y: f32, _z: f32) {}

    // Gestures

    fn on_double_tap(&self, _node: &Node, _e: &MotionEvent) -> bool {
        false
    }

    fn on_double_tap_event(&self, _node: &Node, _e: &MotionEvent) -> bool {
        false
    }

    fn on_single_tap_confirmed(&self, _node: &Node, _e: &MotionEvent) -> bool {
        false
    }

    fn on_down(&self, _node: &Node, _e: &MotionEvent) -> bool {
        false
    }

    fn on_fling(
        &self,
        _node: &Node,
        _e1: &MotionEvent,
        _e2: &MotionEvent,
        _velocity_x: f32,
        _velocity_y: f32,
    ) -> bool {
        false
    }

    fn on_long_press(&self, _node: &Node, _e: &MotionEvent) {}

    fn on_scroll(
        &self,
        _node: &Node,
        _e1: &MotionEvent,
        _e2: &MotionEvent,
        _distance_x: f32,
        _distance_y: f32,
    ) -> bool {
        false
    }

    fn on_show_press(&self, _node: &Node, _e: &MotionEvent) {}

    fn on_single_tap_up(&self, _node: &Node, _e: &MotionEvent) -> bool {
        false
    }
}

/// Plain node with no overridden behavior
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl NodeHooks for DefaultHooks {}
