//! Timer and action binding
//!
//! A node keeps the timers scheduled on it. They are handed to the scheduler
//! while the node is running and taken back when it exits. Actions live in
//! the action manager; the node only forwards to it.

use super::Node;
use crate::context::Action;
use crate::timer::Timer;
use std::sync::Arc;

impl Node {
    /// Attach a timer to this node
    ///
    /// A running node hands the timer to the scheduler right away. Scheduling
    /// a timer that is already attached only does something for a finished
    /// one-shot timer, which is reset and handed over again.
    pub fn schedule_locked(&self, timer: &Arc<Timer>) {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();

        let present = self
            .timers
            .lock()
            .get_or_insert_with(Vec::new)
            .iter()
            .any(|t| Arc::ptr_eq(t, timer));

        if present {
            if timer.is_one_shot() && timer.is_done() {
                timer.reset();
                if self.is_running() {
                    ctx.scheduler().schedule(timer);
                }
            } else {
                log::warn!(
                    "{} {:?}: timer {} is already scheduled",
                    self.class_name(),
                    self.id(),
                    timer.id()
                );
            }
            return;
        }

        if self.is_running() {
            ctx.scheduler().schedule(timer);
        }

        self.timers
            .lock()
            .get_or_insert_with(Vec::new)
            .push(Arc::clone(timer));
    }

    /// Detach a timer, taking it back from the scheduler if running
    pub fn unschedule_locked(&self, timer: &Arc<Timer>) {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();

        let removed = {
            let mut timers = self.timers.lock();
            let Some(list) = timers.as_mut() else {
                return;
            };
            match list.iter().position(|t| Arc::ptr_eq(t, timer)) {
                Some(index) => list.remove(index),
                None => return,
            }
        };

        if self.is_running() {
            ctx.scheduler().unschedule(&removed);
        }
    }

    /// Number of timers attached to the node
    pub fn scheduled_timer_count(&self) -> usize {
        self.timers.lock().as_ref().map_or(0, Vec::len)
    }

    /// Whether `timer` is attached to the node
    pub fn has_timer(&self, timer: &Arc<Timer>) -> bool {
        self.timers
            .lock()
            .as_ref()
            .is_some_and(|list| list.iter().any(|t| Arc::ptr_eq(t, timer)))
    }

    fn timer_snapshot(&self) -> Vec<Arc<Timer>> {
        self.timers.lock().clone().unwrap_or_default()
    }

    /// Hand every timer to the scheduler and resume this node's actions
    ///
    /// Iterates a snapshot: scheduling may attach further timers to the node.
    pub(crate) fn activate_timers(&self) {
        let scheduler = self.context().scheduler();
        for timer in self.timer_snapshot() {
            scheduler.schedule(&timer);
        }
        self.context().actions().resume_actions(self, false);
    }

    pub(crate) fn deactivate_timers(&self) {
        let scheduler = self.context().scheduler();
        for timer in self.timer_snapshot() {
            scheduler.unschedule(&timer);
        }
        self.context().actions().pause_actions(self, false);
    }

    /// Drop every timer, taking them back from the scheduler if running
    pub(crate) fn clear_timers(&self) {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();

        let Some(timers) = self.timers.lock().as_mut().map(std::mem::take) else {
            return;
        };
        if self.is_running() {
            for timer in &timers {
                ctx.scheduler().unschedule(timer);
            }
        }
    }

    /// Pause every attached timer, optionally across the subtree
    pub fn pause_all_timers(&self, include_children: bool) {
        self.set_timers_paused(true, include_children);
    }

    /// Resume every attached timer, optionally across the subtree
    pub fn resume_all_timers(&self, include_children: bool) {
        self.set_timers_paused(false, include_children);
    }

    fn set_timers_paused(&self, paused: bool, include_children: bool) {
        {
            let ctx = Arc::clone(self.context());
            let _lock = ctx.lock();
            for timer in self.timer_snapshot() {
                timer.set_paused(paused);
            }
        }

        if include_children {
            for child in self.children.snapshot() {
                child.set_timers_paused(paused, include_children);
            }
        }
    }

    // Actions

    /// Start an action on this node
    pub fn run_action(&self, action: Arc<dyn Action>) {
        self.context().actions().add_action(action, self);
    }

    /// Stop the action carrying `tag`
    pub fn stop_action(&self, tag: i32) {
        self.context().actions().remove_action_by_tag(self, tag);
    }

    /// Stop every action on this node, optionally across the subtree
    pub fn stop_all_actions(&self, include_children: bool) {
        self.context().actions().remove_actions(self, include_children);
    }

    /// Pause every action on this node, optionally across the subtree
    pub fn pause_all_actions(&self, include_children: bool) {
        self.context().actions().pause_actions(self, include_children);
    }

    /// Resume every action on this node, optionally across the subtree
    pub fn resume_all_actions(&self, include_children: bool) {
        self.context().actions().resume_actions(self, include_children);
    }

    /// Pause the action carrying `tag`
    pub fn pause_action(&self, tag: i32) {
        self.context().actions().pause_action(self, tag);
    }

    /// Resume the action carrying `tag`
    pub fn resume_action(&self, tag: i32) {
        self.context().actions().resume_action(self, tag);
    }

    /// Action carrying `tag`, if the manager knows one
    pub fn action(&self, tag: i32) -> Option<Arc<dyn Action>> {
        self.context().actions().action(self, tag)
    }

    /// Whether any unpaused action runs on this node
    pub fn has_running_action(&self) -> bool {
        self.context().actions().running_action_count(self) > 0
    }
}
