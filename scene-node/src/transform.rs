//! Local transform calculation and caching
//!
//! Each node keeps its transform inputs next to the cached node-to-parent
//! matrix and its inverse. Every setter that changes an input marks both
//! caches dirty; the matrices are recomputed lazily on the next query.

use glam::{Affine2, Vec2};

/// Everything the node-to-parent transform is computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformInputs {
    pub position: Vec2,
    /// Normalized pivot, 0..1 per axis
    pub anchor: Vec2,
    /// Pivot in content units (content size * anchor)
    pub anchor_point: Vec2,
    pub content_size: Vec2,
    /// Degrees, clockwise-positive on screen
    pub rotation: f32,
    pub scale: Vec2,
    /// Degrees
    pub skew: Vec2,
    /// When true, `position` places the anchor point; otherwise it places
    /// the node's bottom-left corner
    pub relative_anchor_point: bool,
}

impl Default for TransformInputs {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            anchor: Vec2::splat(0.5),
            anchor_point: Vec2::ZERO,
            content_size: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            skew: Vec2::ZERO,
            relative_anchor_point: true,
        }
    }
}

/// Compute the node-to-parent transform from its inputs
///
/// Order: translate(position) * rotate * scale * skew * translate(-anchor).
/// Without skew the anchor offset is folded straight into the translation.
pub fn node_to_parent(t: &TransformInputs) -> Affine2 {
    let mut x = t.position.x;
    let mut y = t.position.y;
    if !t.relative_anchor_point {
        x += t.anchor_point.x;
        y += t.anchor_point.y;
    }

    let (mut c, mut s) = (1.0f32, 0.0f32);
    if t.rotation != 0.0 {
        let radians = (-t.rotation).to_radians();
        c = radians.cos();
        s = radians.sin();
    }

    let needs_skew = t.skew.x != 0.0 || t.skew.y != 0.0;
    let has_anchor = t.anchor_point != Vec2::ZERO;

    if !needs_skew && has_anchor {
        x += c * -t.anchor_point.x * t.scale.x + -s * -t.anchor_point.y * t.scale.y;
        y += s * -t.anchor_point.x * t.scale.x + c * -t.anchor_point.y * t.scale.y;
    }

    let mut m = Affine2::from_cols_array(&[
        c * t.scale.x,
        s * t.scale.x,
        -s * t.scale.y,
        c * t.scale.y,
        x,
        y,
    ]);

    if needs_skew {
        let skew = Affine2::from_cols_array(&[
            1.0,
            (-t.skew.y).to_radians().tan(),
            t.skew.x.to_radians().tan(),
            1.0,
            0.0,
            0.0,
        ]);
        m = m * skew;

        if has_anchor {
            m = m * Affine2::from_translation(-t.anchor_point);
        }
    }

    m
}

/// Transform inputs plus the lazily computed matrices derived from them
#[derive(Debug, Clone)]
pub struct TransformCache {
    inputs: TransformInputs,
    matrix: Affine2,
    inverse: Affine2,
    transform_dirty: bool,
    inverse_dirty: bool,
}

impl Default for TransformCache {
    fn default() -> Self {
        Self {
            inputs: TransformInputs::default(),
            matrix: Affine2::ZERO,
            inverse: Affine2::ZERO,
            transform_dirty: true,
            inverse_dirty: true,
        }
    }
}

impl TransformCache {
    pub fn inputs(&self) -> &TransformInputs {
        &self.inputs
    }

    pub fn is_transform_dirty(&self) -> bool {
        self.transform_dirty
    }

    pub fn is_inverse_dirty(&self) -> bool {
        self.inverse_dirty
    }

    /// Mark both matrices stale
    pub fn mark_dirty(&mut self) {
        self.transform_dirty = true;
        self.inverse_dirty = true;
    }

    /// Always marks dirty, even when the position is unchanged
    pub fn set_position(&mut self, position: Vec2) {
        self.inputs.position = position;
        self.mark_dirty();
    }

    /// Returns true if the anchor changed
    pub fn set_anchor(&mut self, anchor: Vec2) -> bool {
        if self.inputs.anchor == anchor {
            return false;
        }
        self.inputs.anchor = anchor;
        self.inputs.anchor_point = self.inputs.content_size * anchor;
        self.mark_dirty();
        true
    }

    pub fn set_anchor_x(&mut self, x: f32) -> bool {
        let y = self.inputs.anchor.y;
        self.set_anchor(Vec2::new(x, y))
    }

    pub fn set_anchor_y(&mut self, y: f32) -> bool {
        let x = self.inputs.anchor.x;
        self.set_anchor(Vec2::new(x, y))
    }

    /// Returns true if the size changed
    pub fn set_content_size(&mut self, size: Vec2) -> bool {
        if self.inputs.content_size == size {
            return false;
        }
        self.inputs.content_size = size;
        self.inputs.anchor_point = size * self.inputs.anchor;
        self.mark_dirty();
        true
    }

    pub fn set_rotation(&mut self, degrees: f32) -> bool {
        if self.inputs.rotation == degrees {
            return false;
        }
        self.inputs.rotation = degrees;
        self.mark_dirty();
        true
    }

    pub fn set_scale(&mut self, scale: Vec2) -> bool {
        if self.inputs.scale == scale {
            return false;
        }
        self.inputs.scale = scale;
        self.mark_dirty();
        true
    }

    pub fn set_skew(&mut self, skew: Vec2) -> bool {
        if self.inputs.skew == skew {
            return false;
        }
        self.inputs.skew = skew;
        self.mark_dirty();
        true
    }

    /// Always marks dirty
    pub fn set_relative_anchor_point(&mut self, relative: bool) {
        self.inputs.relative_anchor_point = relative;
        self.mark_dirty();
    }

    /// Recompute the node-to-parent matrix if stale and return it
    pub fn update_node_to_parent(&mut self) -> Affine2 {
        if self.transform_dirty {
            self.matrix = node_to_parent(&self.inputs);
            self.transform_dirty = false;
        }
        self.matrix
    }

    /// Recompute the parent-to-node matrix if stale and return it
    pub fn update_parent_to_node(&mut self) -> Affine2 {
        if self.inverse_dirty {
            self.inverse = self.update_node_to_parent().inverse();
            self.inverse_dirty = false;
        }
        self.inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Affine2, b: Affine2) {
        let (a, b) = (a.to_cols_array(), b.to_cols_array());
        for i in 0..6 {
            assert!((a[i] - b[i]).abs() < 1e-4, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_default_is_translation_only() {
        let mut cache = TransformCache::default();
        cache.set_position(Vec2::new(10.0, 20.0));

        let m = cache.update_node_to_parent();
        assert_eq!(m, Affine2::from_translation(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn test_anchor_offsets_translation() {
        let mut cache = TransformCache::default();
        cache.set_content_size(Vec2::new(100.0, 50.0));
        cache.set_position(Vec2::new(200.0, 100.0));

        // Anchor (0.5, 0.5) sits on the position
        let m = cache.update_node_to_parent();
        assert_eq!(m.transform_point2(Vec2::new(50.0, 25.0)), Vec2::new(200.0, 100.0));

        // Without relative anchoring the corner sits on the position
        cache.set_relative_anchor_point(false);
        let m = cache.update_node_to_parent();
        assert_eq!(m.transform_point2(Vec2::ZERO), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn test_rotation_is_clockwise() {
        let mut cache = TransformCache::default();
        cache.set_rotation(90.0);

        let p = cache.update_node_to_parent().transform_point2(Vec2::new(1.0, 0.0));
        assert!((p.x - 0.0).abs() < 1e-6);
        assert!((p.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_skew_path_matches_folded_path() {
        let mut inputs = TransformInputs {
            position: Vec2::new(30.0, -12.0),
            content_size: Vec2::new(64.0, 32.0),
            rotation: 33.0,
            scale: Vec2::new(1.5, 0.75),
            ..TransformInputs::default()
        };
        inputs.anchor = Vec2::new(0.25, 0.8);
        inputs.anchor_point = inputs.content_size * inputs.anchor;

        let folded = node_to_parent(&inputs);

        // Explicit composition, as the skew path builds it
        let rad = (-inputs.rotation).to_radians();
        let (c, s) = (rad.cos(), rad.sin());
        let explicit = Affine2::from_cols_array(&[
            c * inputs.scale.x,
            s * inputs.scale.x,
            -s * inputs.scale.y,
            c * inputs.scale.y,
            inputs.position.x,
            inputs.position.y,
        ]) * Affine2::from_translation(-inputs.anchor_point);

        assert_close(folded, explicit);

        // A vanishing skew goes through the skew path and must agree
        inputs.skew = Vec2::new(1e-30, 0.0);
        assert_close(node_to_parent(&inputs), folded);
    }

    #[test]
    fn test_dirty_flags() {
        let mut cache = TransformCache::default();
        assert!(cache.is_transform_dirty());
        assert!(cache.is_inverse_dirty());

        cache.update_node_to_parent();
        assert!(!cache.is_transform_dirty());
        assert!(cache.is_inverse_dirty());

        cache.update_parent_to_node();
        assert!(!cache.is_inverse_dirty());

        // Unchanged value leaves the cache alone
        assert!(!cache.set_rotation(0.0));
        assert!(!cache.is_transform_dirty());

        assert!(cache.set_skew(Vec2::new(10.0, 0.0)));
        assert!(cache.is_transform_dirty());
        assert!(cache.is_inverse_dirty());
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut cache = TransformCache::default();
        cache.set_content_size(Vec2::new(40.0, 40.0));
        cache.set_position(Vec2::new(5.0, 7.0));
        cache.set_rotation(-45.0);
        cache.set_scale(Vec2::new(2.0, 3.0));
        cache.set_skew(Vec2::new(15.0, -5.0));

        let p = Vec2::new(12.5, -3.0);
        let forward = cache.update_node_to_parent().transform_point2(p);
        let back = cache.update_parent_to_node().transform_point2(forward);
        assert!((back - p).length() < 1e-3);
    }

    #[test]
    fn test_content_size_updates_anchor_point() {
        let mut cache = TransformCache::default();
        assert!(cache.set_content_size(Vec2::new(10.0, 20.0)));
        assert_eq!(cache.inputs().anchor_point, Vec2::new(5.0, 10.0));

        assert!(cache.set_anchor_x(0.0));
        assert_eq!(cache.inputs().anchor_point, Vec2::new(0.0, 10.0));
        assert!(!cache.set_content_size(Vec2::new(10.0, 20.0)));
    }
}
