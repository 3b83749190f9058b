//! Input handler registration and default touch behavior
//!
//! Each input category has an enabled flag and a priority. A running node is
//! registered with the event dispatcher for every enabled category; toggling
//! a flag on a running node updates the registration immediately.

use super::{Node, Selector};
use crate::context::InputCategory;
use crate::event::{KeyEvent, MotionEvent};

/// Number of pointers a node tracks at once
pub const MAX_POINTERS: usize = 10;

/// Pointers currently pressed on a node, in press order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchState {
    pids: [i32; MAX_POINTERS],
    count: usize,
}

impl TouchState {
    pub fn pids(&self) -> &[i32] {
        &self.pids[..self.count]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn contains(&self, pid: i32) -> bool {
        self.pids().contains(&pid)
    }

    fn add(&mut self, pid: i32) -> bool {
        if self.contains(pid) || self.count == MAX_POINTERS {
            return false;
        }
        self.pids[self.count] = pid;
        self.count += 1;
        true
    }

    fn remove(&mut self, pid: i32) -> bool {
        let Some(index) = self.pids().iter().position(|&p| p == pid) else {
            return false;
        };
        self.pids.copy_within(index + 1..self.count, index);
        self.count -= 1;
        true
    }
}

#[derive(Debug)]
pub(crate) struct InputState {
    enabled: [bool; InputCategory::ALL.len()],
    priority: [i32; InputCategory::ALL.len()],
    touch: TouchState,
    intercept_touch: bool,
    multi_touch_clickable: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            enabled: [false; InputCategory::ALL.len()],
            priority: [0; InputCategory::ALL.len()],
            touch: TouchState::default(),
            intercept_touch: true,
            multi_touch_clickable: false,
        }
    }
}

impl Node {
    /// Whether the node receives input of `category`
    pub fn is_input_enabled(&self, category: InputCategory) -> bool {
        self.input.lock().enabled[category.index()]
    }

    /// Enable or disable a category, updating the dispatcher if running
    pub fn set_input_enabled(&self, category: InputCategory, enabled: bool) {
        let priority = {
            let mut input = self.input.lock();
            if input.enabled[category.index()] == enabled {
                return;
            }
            input.enabled[category.index()] = enabled;
            input.priority[category.index()]
        };

        if !self.is_running() {
            return;
        }

        let events = self.context().events();
        if enabled {
            events.add_handler(category, self, priority);
        } else {
            events.remove_handler(category, self);
        }
    }

    /// Priority used on the next registration; does not re-register
    pub fn input_priority(&self, category: InputCategory) -> i32 {
        self.input.lock().priority[category.index()]
    }

    /// Dispatch priority for `category`, applied on the next registration
    pub fn set_input_priority(&self, category: InputCategory, priority: i32) {
        self.input.lock().priority[category.index()] = priority;
    }

    /// Whether touch input is enabled
    pub fn is_touch_enabled(&self) -> bool {
        self.is_input_enabled(InputCategory::Touch)
    }

    /// Enable or disable touch input
    pub fn set_touch_enabled(&self, enabled: bool) {
        self.set_input_enabled(InputCategory::Touch, enabled);
    }

    /// Whether key input is enabled
    pub fn is_key_enabled(&self) -> bool {
        self.is_input_enabled(InputCategory::Key)
    }

    /// Enable or disable key input
    pub fn set_key_enabled(&self, enabled: bool) {
        self.set_input_enabled(InputCategory::Key, enabled);
    }

    /// Whether gesture input is enabled
    pub fn is_gesture_enabled(&self) -> bool {
        self.is_input_enabled(InputCategory::Gesture)
    }

    /// Enable or disable gesture input
    pub fn set_gesture_enabled(&self, enabled: bool) {
        self.set_input_enabled(InputCategory::Gesture, enabled);
    }

    /// Whether double-tap input is enabled
    pub fn is_double_tap_enabled(&self) -> bool {
        self.is_input_enabled(InputCategory::DoubleTap)
    }

    /// Enable or disable double-tap input
    pub fn set_double_tap_enabled(&self, enabled: bool) {
        self.set_input_enabled(InputCategory::DoubleTap, enabled);
    }

    /// Whether accelerometer input is enabled
    pub fn is_accelerometer_enabled(&self) -> bool {
        self.is_input_enabled(InputCategory::Accelerometer)
    }

    /// Enable or disable accelerometer input
    pub fn set_accelerometer_enabled(&self, enabled: bool) {
        self.set_input_enabled(InputCategory::Accelerometer, enabled);
    }

    fn enabled_categories(&self) -> Vec<(InputCategory, i32)> {
        let input = self.input.lock();
        InputCategory::ALL
            .iter()
            .filter(|c| input.enabled[c.index()])
            .map(|&c| (c, input.priority[c.index()]))
            .collect()
    }

    pub(crate) fn register_input_handlers(&self) {
        let events = self.context().events();
        for (category, priority) in self.enabled_categories() {
            events.add_handler(category, self, priority);
        }
    }

    pub(crate) fn unregister_input_handlers(&self) {
        let events = self.context().events();
        for (category, _) in self.enabled_categories() {
            events.remove_handler(category, self);
        }
    }

    /// Whether touch callbacks report the touch as consumed
    pub fn is_intercept_touch(&self) -> bool {
        self.input.lock().intercept_touch
    }

    /// Choose whether touch callbacks consume the touch
    pub fn set_intercept_touch(&self, intercept: bool) {
        self.input.lock().intercept_touch = intercept;
    }

    /// Whether secondary pointers may trigger the down and up selectors
    pub fn is_multi_touch_clickable(&self) -> bool {
        self.input.lock().multi_touch_clickable
    }

    /// Allow secondary pointers to trigger the down and up selectors
    pub fn set_multi_touch_clickable(&self, clickable: bool) {
        self.input.lock().multi_touch_clickable = clickable;
    }

    // Pointer tracking

    /// Snapshot of the tracked pointers
    pub fn touch_state(&self) -> TouchState {
        self.input.lock().touch
    }

    /// Track a pressed pointer; false if already tracked or the set is full
    pub fn add_pid(&self, pid: i32) -> bool {
        let added = self.input.lock().touch.add(pid);
        if !added && !self.has_pid(pid) {
            log::warn!(
                "{} {:?}: cannot track more than {} pointers",
                self.class_name(),
                self.id(),
                MAX_POINTERS
            );
        }
        added
    }

    /// Whether pointer `pid` is tracked
    pub fn has_pid(&self, pid: i32) -> bool {
        self.input.lock().touch.contains(pid)
    }

    /// Stop tracking a pointer, keeping the others in press order
    pub fn clear_pid(&self, pid: i32) -> bool {
        self.input.lock().touch.remove(pid)
    }

    /// Number of tracked pointers
    pub fn pointer_count(&self) -> usize {
        self.input.lock().touch.count()
    }

    // Default touch behavior, reached through `NodeHooks`

    fn invoke(&self, pick: impl FnOnce(&super::Selectors) -> Option<Selector>) {
        let selector = pick(&self.selectors.read());
        if let Some(selector) = selector {
            selector(self);
        }
    }

    /// Select the node and run the down selector
    pub fn default_touches_began(&self, _e: &MotionEvent) -> bool {
        self.set_selected(true);
        self.invoke(|s| s.down.clone());
        self.is_intercept_touch()
    }

    /// Selected while any tracked pointer is inside the node
    pub fn default_touches_moved(&self, e: &MotionEvent) -> bool {
        let inside = e
            .pointers
            .iter()
            .any(|p| self.has_pid(p.pid) && self.hit_test(p.x, p.y));

        self.set_selected(inside);
        if !inside {
            self.invoke(|s| s.move_out.clone());
        }
        self.is_intercept_touch()
    }

    /// Deselect the node and run the up selector
    pub fn default_touches_ended(&self, _e: &MotionEvent) -> bool {
        self.set_selected(false);
        self.invoke(|s| s.up.clone());
        self.is_intercept_touch()
    }

    /// Deselect the node without running a selector
    pub fn default_touches_cancelled(&self, _e: &MotionEvent) -> bool {
        self.set_selected(false);
        self.is_intercept_touch()
    }

    /// Acts only when this is the sole tracked pointer
    pub fn default_touches_pointer_began(&self, _e: &MotionEvent) -> bool {
        if self.pointer_count() == 1 {
            self.set_selected(true);
            if self.is_multi_touch_clickable() {
                self.invoke(|s| s.down.clone());
            }
        }
        self.is_intercept_touch()
    }

    /// Acts only once no pointer is left
    pub fn default_touches_pointer_ended(&self, _e: &MotionEvent) -> bool {
        if self.pointer_count() == 0 {
            self.set_selected(false);
            if self.is_multi_touch_clickable() {
                self.invoke(|s| s.up.clone());
            }
        }
        self.is_intercept_touch()
    }

    // Dispatcher entry points

    /// Deliver a touch-began event through the hooks
    pub fn touches_began(&self, e: &MotionEvent) -> bool {
        self.hooks.touches_began(self, e)
    }

    pub fn touches_moved(&self, e: &MotionEvent) -> bool {
        self.hooks.touches_moved(self, e)
    }

    pub fn touches_ended(&self, e: &MotionEvent) -> bool {
        self.hooks.touches_ended(self, e)
    }

    pub fn touches_cancelled(&self, e: &MotionEvent) -> bool {
        self.hooks.touches_cancelled(self, e)
    }

    pub fn touches_pointer_began(&self, e: &MotionEvent) -> bool {
        self.hooks.touches_pointer_began(self, e)
    }

    pub fn touches_pointer_ended(&self, e: &MotionEvent) -> bool {
        self.hooks.touches_pointer_ended(self, e)
    }

    pub fn key_down(&self, e: &KeyEvent) -> bool {
        self.hooks.key_down(self, e)
    }

    pub fn key_up(&self, e: &KeyEvent) -> bool {
        self.hooks.key_up(self, e)
    }

    pub fn key_multiple(&self, e: &KeyEvent) -> bool {
        self.hooks.key_multiple(self, e)
    }

    pub fn accelerometer_changed(&self, x: f32, y: f32, z: f32) {
        self.hooks.accelerometer_changed(self, x, y, z);
    }

    pub fn on_double_tap(&self, e: &MotionEvent) -> bool {
        self.hooks.on_double_tap(self, e)
    }

    pub fn on_double_tap_event(&self, e: &MotionEvent) -> bool {
        self.hooks.on_double_tap_event(self, e)
    }

    pub fn on_single_tap_confirmed(&self, e: &MotionEvent) -> bool {
        self.hooks.on_single_tap_confirmed(self, e)
    }

    pub fn on_down(&self, e: &MotionEvent) -> bool {
        self.hooks.on_down(self, e)
    }

    pub fn on_fling(&self, e1: &MotionEvent, e2: &MotionEvent, vx: f32, vy: f32) -> bool {
        self.hooks.on_fling(self, e1, e2, vx, vy)
    }

    pub fn on_long_press(&self, e: &MotionEvent) {
        self.hooks.on_long_press(self, e);
    }

    pub fn on_scroll(&self, e1: &MotionEvent, e2: &MotionEvent, dx: f32, dy: f32) -> bool {
        self.hooks.on_scroll(self, e1, e2, dx, dy)
    }

    pub fn on_show_press(&self, e: &MotionEvent) {
        self.hooks.on_show_press(self, e);
    }

    pub fn on_single_tap_up(&self, e: &MotionEvent) -> bool {
        self.hooks.on_single_tap_up(self, e)
    }
}
