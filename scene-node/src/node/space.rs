//! Coordinate space conversion, bounds and layout helpers

use super::Node;
use crate::types::Rect;
use glam::{Affine2, Mat4, Vec2, Vec3, Vec4};

impl Node {
    /// Local transform composed with every ancestor's
    pub fn node_to_world_transform(&self) -> Affine2 {
        let mut t = self.node_to_parent_transform();
        let mut current = self.parent();
        while let Some(parent) = current {
            t = parent.node_to_parent_transform() * t;
            current = parent.parent();
        }
        t
    }

    /// Inverse of the node-to-world transform
    pub fn world_to_node_transform(&self) -> Affine2 {
        self.node_to_world_transform().inverse()
    }

    /// Convert a node-space point to parent space
    pub fn node_to_parent_space(&self, p: Vec2) -> Vec2 {
        self.node_to_parent_transform().transform_point2(p)
    }

    /// Like [`Node::node_to_parent_space`], with `p` relative to the anchor point
    pub fn node_to_parent_space_ar(&self, p: Vec2) -> Vec2 {
        self.node_to_parent_space(p + self.anchor_point())
    }

    /// Convert a parent-space point to node space
    pub fn parent_to_node_space(&self, p: Vec2) -> Vec2 {
        self.parent_to_node_transform().transform_point2(p)
    }

    /// Convert a parent-space point to node space, relative to the anchor point
    pub fn parent_to_node_space_ar(&self, p: Vec2) -> Vec2 {
        self.parent_to_node_space(p) - self.anchor_point()
    }

    /// Convert a node-space point to world space
    pub fn node_to_world_space(&self, p: Vec2) -> Vec2 {
        self.node_to_world_transform().transform_point2(p)
    }

    /// Convert an anchor-relative point to world space
    pub fn node_to_world_space_ar(&self, p: Vec2) -> Vec2 {
        self.node_to_world_space(p + self.anchor_point())
    }

    /// Convert a world-space point to node space
    pub fn world_to_node_space(&self, p: Vec2) -> Vec2 {
        self.world_to_node_transform().transform_point2(p)
    }

    /// Convert a world-space point to node space, relative to the anchor point
    pub fn world_to_node_space_ar(&self, p: Vec2) -> Vec2 {
        self.world_to_node_space(p) - self.anchor_point()
    }

    // Bounds

    /// `(0, 0, width, height)` in node space
    pub fn bounding_box(&self) -> Rect {
        let size = self.content_size();
        Rect::from_size(size.x, size.y)
    }

    /// Bounding box in parent space
    pub fn bounding_box_relative_to_parent(&self) -> Rect {
        self.bounding_box()
            .transform(&self.node_to_parent_transform())
    }

    /// Bounding box in world space
    pub fn bounding_box_relative_to_world(&self) -> Rect {
        self.bounding_box()
            .transform(&self.node_to_world_transform())
    }

    /// Clip rectangle in surface units, `None` if the node does not clip
    ///
    /// A self-relative clip is offset by the origin of the node's world
    /// bounding box.
    pub fn resolved_clip_rect(&self) -> Option<Rect> {
        let clip = self.clip_rect()?;
        let mut r = clip.rect;

        if clip.relative_to_self {
            let bounds = self.bounding_box_relative_to_world();
            r.x += bounds.x;
            r.y += bounds.y;
        }

        Some(self.context().device().base_size_rect(r))
    }

    /// Whether a world-space point falls inside the node
    ///
    /// With a touch coffin set, only the part of the node that overlaps the
    /// coffin's world bounds counts.
    pub fn hit_test(&self, x: f32, y: f32) -> bool {
        let mut rect = self.bounding_box_relative_to_world();
        if let Some(coffin) = self.touch_coffin() {
            rect = rect.intersect(&coffin.bounding_box_relative_to_world());
        }
        rect.contains(Vec2::new(x, y))
    }

    /// False if this node or any ancestor is hidden
    pub fn is_visible_from_root(&self) -> bool {
        self.is_visible() && self.ancestors_all(|n| n.is_visible())
    }

    /// False if this node or any ancestor is disabled
    pub fn is_enabled_from_root(&self) -> bool {
        self.is_enabled() && self.ancestors_all(|n| n.is_enabled())
    }

    fn ancestors_all(&self, f: impl Fn(&Node) -> bool) -> bool {
        let mut current = self.parent();
        while let Some(parent) = current {
            if !f(&parent) {
                return false;
            }
            current = parent.parent();
        }
        true
    }

    // Layout

    /// Bottom-left corner in parent space, ignoring rotation and scale
    pub fn origin(&self) -> Vec2 {
        let t = self.transform_inputs();
        if t.relative_anchor_point {
            t.position - t.anchor_point
        } else {
            t.position
        }
    }

    /// Sum of this node's and every ancestor's position
    pub fn absolute_position(&self) -> Vec2 {
        let mut p = self.position();
        let mut current = self.parent();
        while let Some(parent) = current {
            p += parent.position();
            current = parent.parent();
        }
        p
    }

    /// Move every child by an offset
    pub fn translate_children(&self, dx: f32, dy: f32) {
        for child in self.children.snapshot() {
            child.translate(dx, dy);
        }
    }

    /// Resize to enclose every child, measured from this node's origin
    pub fn size_to_fit(&self) {
        let size = self
            .children
            .snapshot()
            .iter()
            .fold(Vec2::ZERO, |size, child| {
                size.max(child.origin() + child.content_size())
            });
        self.set_content_size(size.x, size.y);
    }

    /// Grow the node on each side, shifting children so they stay put on screen
    pub fn enlarge(&self, left: f32, right: f32, top: f32, bottom: f32) {
        for child in self.children.snapshot() {
            let p = child.position();
            child.set_position(p.x + left, p.y + bottom);
        }

        let size = self.content_size();
        self.set_content_size(size.x + left + right, size.y + top + bottom);
    }

    /// Size of the box enclosing every child, zero without children
    pub fn fit_size(&self) -> Vec2 {
        let children = self.children.snapshot();
        if children.is_empty() {
            return Vec2::ZERO;
        }

        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(-f32::MAX);
        for child in &children {
            let origin = child.origin();
            min = min.min(origin);
            max = max.max(origin + child.content_size());
        }
        max - min
    }

    /// Local transform as a 3D matrix for the renderer
    ///
    /// Carries `vertex_z` as depth; if the node has a camera its view is
    /// applied around the anchor point.
    pub fn world_matrix(&self) -> Mat4 {
        let local = self.node_to_parent_transform();
        let (vertex_z, camera, anchor) = {
            let state = self.state.lock();
            (
                state.vertex_z,
                state.camera.clone(),
                state.transform.inputs().anchor_point,
            )
        };

        let mut m = Mat4::from_cols(
            local.matrix2.x_axis.extend(0.0).extend(0.0),
            local.matrix2.y_axis.extend(0.0).extend(0.0),
            Vec4::Z,
            Vec4::new(local.translation.x, local.translation.y, vertex_z, 1.0),
        );

        if let Some(camera) = camera {
            let offset = anchor.extend(0.0);
            let view = camera.view_matrix();
            if offset == Vec3::ZERO {
                m *= view;
            } else {
                m = m * Mat4::from_translation(offset) * view * Mat4::from_translation(-offset);
            }
        }

        m
    }
}
