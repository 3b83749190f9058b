//! Velocity and acceleration bookkeeping
//!
//! The action manager integrates every node whose velocity or acceleration
//! is nonzero. Each setter re-evaluates membership after the update.

use super::Node;
use glam::Vec2;

impl Node {
    /// Velocity in parent units per second
    pub fn velocity(&self) -> Vec2 {
        self.state.lock().velocity
    }

    /// Acceleration in parent units per second squared
    pub fn acceleration(&self) -> Vec2 {
        self.state.lock().acceleration
    }

    /// Set the velocity, registering for integration while moving
    pub fn set_velocity(&self, vx: f32, vy: f32) {
        self.update_motion(|v, _| *v = Vec2::new(vx, vy));
    }

    /// Set the horizontal velocity
    pub fn set_velocity_x(&self, vx: f32) {
        self.update_motion(|v, _| v.x = vx);
    }

    /// Set the vertical velocity
    pub fn set_velocity_y(&self, vy: f32) {
        self.update_motion(|v, _| v.y = vy);
    }

    /// Set the acceleration, registering for integration while moving
    pub fn set_acceleration(&self, ax: f32, ay: f32) {
        self.update_motion(|_, a| *a = Vec2::new(ax, ay));
    }

    /// Set the horizontal acceleration
    pub fn set_acceleration_x(&self, ax: f32) {
        self.update_motion(|_, a| a.x = ax);
    }

    /// Set the vertical acceleration
    pub fn set_acceleration_y(&self, ay: f32) {
        self.update_motion(|_, a| a.y = ay);
    }

    fn update_motion(&self, f: impl FnOnce(&mut Vec2, &mut Vec2)) {
        let moving = {
            let mut state = self.state.lock();
            let state = &mut *state;
            f(&mut state.velocity, &mut state.acceleration);
            state.has_motion()
        };

        let actions = self.context().actions();
        if moving {
            actions.add_physics_node(self);
        } else {
            actions.remove_physics_node(self);
        }
    }
}
