//! Render attachments and the render traversal
//!
//! A node draws through an ordered list of render pairs, each combining a
//! shared material, a shared mesh and the LOD level to draw the mesh at.
//! [`render_tree`] walks a tree and turns every pair of every visible node
//! into a [`RenderCommand`] for the graphics backend.

use crate::node::Node;
use crate::types::{BlendMode, Color4B, NodeId, Rect, RenderBucket};
use glam::Affine2;
use parking_lot::Mutex;
use std::sync::Arc;

/// Texture handle referenced by material parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn new(id: u64, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self { id, width, height })
    }
}

/// Fixed-function state of a material's technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderState {
    pub dither: bool,
    pub blend_mode: BlendMode,
}

/// Shared material: render state plus an optional texture parameter
#[derive(Debug)]
pub struct Material {
    name: String,
    render_state: Mutex<RenderState>,
    texture: Mutex<Option<Arc<Texture>>>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_state(name, RenderState::default())
    }

    pub fn with_state(name: impl Into<String>, state: RenderState) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            render_state: Mutex::new(state),
            texture: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render_state(&self) -> RenderState {
        *self.render_state.lock()
    }

    pub fn set_dither(&self, dither: bool) {
        self.render_state.lock().dither = dither;
    }

    pub fn set_blend_mode(&self, mode: BlendMode) {
        self.render_state.lock().blend_mode = mode;
    }

    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.texture.lock().clone()
    }

    /// Set or clear the texture parameter
    pub fn set_texture(&self, texture: Option<Arc<Texture>>) {
        *self.texture.lock() = texture;
    }
}

/// Shared geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    tag: i32,
    lod_levels: usize,
}

impl Mesh {
    pub fn new(tag: i32, lod_levels: usize) -> Arc<Self> {
        Arc::new(Self { tag, lod_levels })
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Number of LOD levels the mesh carries, 0 when it has no LOD data
    pub fn lod_level_count(&self) -> usize {
        self.lod_levels
    }
}

/// One drawable pass of a node
#[derive(Debug, Clone)]
pub struct RenderPair {
    pub(crate) material: Arc<Material>,
    pub(crate) mesh: Arc<Mesh>,
    pub(crate) lod: usize,
}

impl RenderPair {
    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn lod_level(&self) -> usize {
        self.lod
    }
}

/// A draw request for one render pair of one node
#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub node_id: NodeId,

    /// Node-to-world transform
    pub transform: Affine2,

    pub vertex_z: f32,

    /// Resolved render bucket, never `Inherit`
    pub bucket: RenderBucket,

    pub material: Arc<Material>,
    pub mesh: Arc<Mesh>,
    pub lod_level: usize,

    /// Tint applied to the mesh
    pub color: Color4B,

    pub blend_mode: BlendMode,

    /// Scissor rect in surface units, if the node clips
    pub clip: Option<Rect>,
}

/// Collect render commands for every visible node under `root`
///
/// Children with a negative z-order are drawn before their parent, the
/// rest after it, each group in child order.
pub fn render_tree(root: &Node) -> Vec<RenderCommand> {
    render_tree_filtered(root, |_| true)
}

/// Render a tree keeping only nodes that pass `filter`
///
/// Filtered-out nodes skip their own pairs; their children are still visited.
pub fn render_tree_filtered<F>(root: &Node, mut filter: F) -> Vec<RenderCommand>
where
    F: FnMut(&Node) -> bool,
{
    let mut commands = Vec::new();
    let base = match root.parent() {
        Some(parent) => parent.node_to_world_transform(),
        None => Affine2::IDENTITY,
    };
    visit(root, base, &mut filter, &mut commands);
    commands
}

fn visit<F>(node: &Node, parent_world: Affine2, filter: &mut F, out: &mut Vec<RenderCommand>)
where
    F: FnMut(&Node) -> bool,
{
    if !node.is_visible() {
        return;
    }

    let world = parent_world * node.node_to_parent_transform();

    node.children.each(|child| {
        if child.z_order() < 0 {
            visit(child, world, filter, out);
        }
    });

    if !node.is_no_draw() && filter(node) {
        emit(node, world, out);
    }

    node.children.each(|child| {
        if child.z_order() >= 0 {
            visit(child, world, filter, out);
        }
    });
}

fn emit(node: &Node, world: Affine2, out: &mut Vec<RenderCommand>) {
    let pairs = node.render_pairs();
    if pairs.is_empty() {
        return;
    }

    let bucket = node.render_bucket();
    let color = node.color();
    let vertex_z = node.vertex_z();
    let clip = node.resolved_clip_rect();

    out.extend(pairs.into_iter().map(|pair| RenderCommand {
        node_id: node.id(),
        transform: world,
        vertex_z,
        bucket,
        blend_mode: pair.material.render_state().blend_mode,
        material: pair.material,
        mesh: pair.mesh,
        lod_level: pair.lod,
        color,
        clip,
    }));
}
