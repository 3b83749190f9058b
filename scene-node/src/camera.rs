//! Per-node camera and grid-effect attachments

use glam::{Mat4, Vec3};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy)]
struct CameraState {
    eye: Vec3,
    center: Vec3,
    up: Vec3,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, f32::EPSILON),
            center: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

/// Look-at camera applied around a node's anchor point
///
/// The default camera looks straight down -Z and leaves the node untouched.
#[derive(Debug, Default)]
pub struct Camera {
    state: Mutex<CameraState>,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eye(&self) -> Vec3 {
        self.state.lock().eye
    }

    pub fn center(&self) -> Vec3 {
        self.state.lock().center
    }

    pub fn up(&self) -> Vec3 {
        self.state.lock().up
    }

    pub fn set_eye(&self, eye: Vec3) {
        self.state.lock().eye = eye;
    }

    pub fn set_center(&self, center: Vec3) {
        self.state.lock().center = center;
    }

    pub fn set_up(&self, up: Vec3) {
        self.state.lock().up = up;
    }

    /// Put eye, center and up back to their defaults
    pub fn restore(&self) {
        *self.state.lock() = CameraState::default();
    }

    /// Right-handed look-at matrix
    pub fn view_matrix(&self) -> Mat4 {
        let s = *self.state.lock();
        Mat4::look_at_rh(s.eye, s.center, s.up)
    }
}

/// Grid-effect controller attached to a node
#[derive(Debug, Default)]
pub struct GridController {
    active: AtomicBool,
}

impl GridController {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_is_near_identity() {
        let camera = Camera::new();
        let p = camera.view_matrix().transform_point3(Vec3::new(3.0, 4.0, 0.0));
        assert!((p.x - 3.0).abs() < 1e-5);
        assert!((p.y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_camera_restore() {
        let camera = Camera::new();
        camera.set_eye(Vec3::new(1.0, 2.0, 3.0));
        camera.set_center(Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(camera.eye(), Vec3::new(1.0, 2.0, 3.0));

        camera.restore();
        assert_eq!(camera.center(), Vec3::ZERO);
        assert_eq!(camera.up(), Vec3::Y);
    }

    #[test]
    fn test_grid_activation() {
        let grid = GridController::new(false);
        assert!(!grid.is_active());
        grid.set_active(true);
        assert!(grid.is_active());
    }
}
