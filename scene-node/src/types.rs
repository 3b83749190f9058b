//! Core value types for the node tree
//!
//! Geometry, colors, identifiers, device scaling configuration and the
//! render-state enums shared by nodes and their render attachments.

use glam::{Affine2, Vec2};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tag carried by nodes that were never given one
pub const INVALID_TAG: i32 = -1;

/// Process-unique identifier of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Axis-aligned rectangle
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check whether a point lies inside (min edges inclusive, max edges exclusive)
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.max_x() && p.y >= self.y && p.y < self.max_y()
    }

    /// Intersection of two rectangles, `Rect::ZERO` when they do not overlap
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());

        if max_x <= x || max_y <= y {
            Rect::ZERO
        } else {
            Rect::new(x, y, max_x - x, max_y - y)
        }
    }

    /// Axis-aligned bounds of this rectangle after applying `t`
    pub fn transform(&self, t: &Affine2) -> Rect {
        let corners = [
            t.transform_point2(Vec2::new(self.x, self.y)),
            t.transform_point2(Vec2::new(self.max_x(), self.y)),
            t.transform_point2(Vec2::new(self.x, self.max_y())),
            t.transform_point2(Vec2::new(self.max_x(), self.max_y())),
        ];

        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = min.min(*c);
            max = max.max(*c);
        }

        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

/// RGB color, 8 bits per channel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color3B {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// RGBA color, 8 bits per channel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color4B {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color4B {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

impl Default for Color4B {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Blend mode stored in a material's render state
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Blending disabled
    #[default]
    None = 0,
    Normal = 1,
    Additive = 2,
    Subtract = 3,
    Screen = 4,
    Multiply = 5,
}

/// Render queue bucket a node draws into
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderBucket {
    /// Resolve through the parent chain
    #[default]
    Inherit = 0,
    Opaque = 1,
    Transparent = 2,
    Gui = 3,
}

/// How the device maps the design resolution onto the surface
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Coordinates are already in surface pixels
    #[default]
    ByDensity = 0,
    /// Coordinates are in base-size units, stretched independently per axis
    BaseSizeFitXy = 1,
}

/// Device scaling globals consulted by clip-rect resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    pub scale_mode: ScaleMode,
    pub base_scale_x: f32,
    pub base_scale_y: f32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::ByDensity,
            base_scale_x: 1.0,
            base_scale_y: 1.0,
        }
    }
}

impl DeviceConfig {
    /// Convert a rect in base-size units into surface units
    pub fn base_size_rect(&self, r: Rect) -> Rect {
        match self.scale_mode {
            ScaleMode::BaseSizeFitXy => Rect::new(
                r.x * self.base_scale_x,
                r.y * self.base_scale_y,
                r.width * self.base_scale_x,
                r.height * self.base_scale_y,
            ),
            ScaleMode::ByDensity => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(10.0, 10.0, 20.0, 10.0);
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(r.contains(Vec2::new(29.0, 19.0)));
        assert!(!r.contains(Vec2::new(30.0, 15.0)));
        assert!(!r.contains(Vec2::new(5.0, 15.0)));
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 25.0, 100.0, 50.0);
        assert_eq!(a.intersect(&b), Rect::new(50.0, 25.0, 50.0, 50.0));

        let c = Rect::new(200.0, 200.0, 10.0, 10.0);
        assert_eq!(a.intersect(&c), Rect::ZERO);
    }

    #[test]
    fn test_rect_transform_rotated() {
        // 90 degrees counter-clockwise: (x, y) -> (-y, x)
        let t = Affine2::from_cols_array(&[0.0, 1.0, -1.0, 0.0, 0.0, 0.0]);
        let r = Rect::from_size(20.0, 10.0).transform(&t);
        assert_eq!(r, Rect::new(-10.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn test_base_size_rect_only_scales_in_fit_mode() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);

        let density = DeviceConfig::default();
        assert_eq!(density.base_size_rect(r), r);

        let fit = DeviceConfig {
            scale_mode: ScaleMode::BaseSizeFitXy,
            base_scale_x: 2.0,
            base_scale_y: 0.5,
        };
        assert_eq!(fit.base_size_rect(r), Rect::new(2.0, 1.0, 6.0, 2.0));
    }

    #[test]
    fn test_color_defaults_to_white() {
        assert_eq!(Color4B::default(), Color4B::WHITE);
    }
}
