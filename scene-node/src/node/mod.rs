//! Scene graph node
//!
//! A [`Node`] carries its transform, visibility, input and render state and
//! exclusively owns an ordered list of children. Nodes are handed out as
//! `Arc<Node>`; a child refers back to its parent through a `Weak`, so the
//! parent chain never keeps anything alive.
//!
//! State is split across several small locks. No node lock is held while
//! hooks, callbacks or collaborators run, so any of them may call back into
//! the tree.

mod attachments;
mod input;
mod physics;
mod space;
mod timers;
mod tree;

pub use input::{TouchState, MAX_POINTERS};
pub(crate) use tree::ChildList;

use crate::camera::{Camera, GridController};
use crate::context::SceneContext;
use crate::hooks::{DefaultHooks, NodeHooks};
use crate::render::RenderPair;
use crate::timer::Timer;
use crate::transform::{TransformCache, TransformInputs};
use crate::types::{Color3B, Color4B, NodeId, Rect, RenderBucket, INVALID_TAG};
use glam::{Affine2, Vec2};
use input::InputState;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked synchronously with the node it is attached to
pub type Selector = Arc<dyn Fn(&Node) + Send + Sync>;

/// Clip rectangle, optionally relative to the node's world bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub rect: Rect,
    pub relative_to_self: bool,
}

/// Plain per-node data guarded by a single lock
pub(crate) struct NodeState {
    pub(crate) transform: TransformCache,
    pub(crate) vertex_z: f32,
    pub(crate) velocity: Vec2,
    pub(crate) acceleration: Vec2,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) selected: bool,
    pub(crate) focused: bool,
    pub(crate) no_draw: bool,
    pub(crate) clip: Option<ClipRect>,
    pub(crate) color: Color4B,
    pub(crate) mesh_color_dirty: bool,
    pub(crate) material_dirty: bool,
    pub(crate) mesh_dirty: bool,
    pub(crate) bucket: RenderBucket,
    pub(crate) camera: Option<Arc<Camera>>,
    pub(crate) grid: Option<Arc<GridController>>,
    pub(crate) touch_coffin: Weak<Node>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            transform: TransformCache::default(),
            vertex_z: 0.0,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            visible: true,
            enabled: true,
            selected: false,
            focused: false,
            no_draw: false,
            clip: None,
            color: Color4B::WHITE,
            mesh_color_dirty: false,
            material_dirty: false,
            mesh_dirty: false,
            bucket: RenderBucket::Inherit,
            camera: None,
            grid: None,
            touch_coffin: Weak::new(),
        }
    }
}

impl NodeState {
    pub(crate) fn has_motion(&self) -> bool {
        self.velocity != Vec2::ZERO || self.acceleration != Vec2::ZERO
    }
}

#[derive(Default)]
pub(crate) struct Selectors {
    pub(crate) down: Option<Selector>,
    pub(crate) up: Option<Selector>,
    pub(crate) move_out: Option<Selector>,
    pub(crate) position_changed: Option<Selector>,
}

/// A node of the scene graph
pub struct Node {
    id: NodeId,
    this: Weak<Node>,
    ctx: Arc<SceneContext>,
    hooks: Box<dyn NodeHooks>,

    tag: AtomicI32,
    z_order: AtomicI32,
    running: AtomicBool,

    parent: RwLock<Weak<Node>>,
    pub(crate) children: ChildList,
    children_changing: AtomicBool,

    pub(crate) state: Mutex<NodeState>,
    pub(crate) input: Mutex<InputState>,
    pub(crate) render_pairs: Mutex<Vec<RenderPair>>,
    pub(crate) timers: Mutex<Option<Vec<Arc<Timer>>>>,
    pub(crate) selectors: RwLock<Selectors>,
}

impl Node {
    /// Create a detached node with default behavior
    pub fn new(ctx: &Arc<SceneContext>) -> Arc<Node> {
        Self::with_hooks(ctx, DefaultHooks)
    }

    /// Create a detached node whose callbacks go through `hooks`
    pub fn with_hooks<H: NodeHooks + 'static>(ctx: &Arc<SceneContext>, hooks: H) -> Arc<Node> {
        Arc::new_cyclic(|this| Node {
            id: NodeId::next(),
            this: this.clone(),
            ctx: Arc::clone(ctx),
            hooks: Box::new(hooks),
            tag: AtomicI32::new(INVALID_TAG),
            z_order: AtomicI32::new(0),
            running: AtomicBool::new(false),
            parent: RwLock::new(Weak::new()),
            children: ChildList::default(),
            children_changing: AtomicBool::new(false),
            state: Mutex::new(NodeState::default()),
            input: Mutex::new(InputState::default()),
            render_pairs: Mutex::new(Vec::new()),
            timers: Mutex::new(None),
            selectors: RwLock::new(Selectors::default()),
        })
    }

    /// Process-unique identifier
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Context this node was created in
    pub fn context(&self) -> &Arc<SceneContext> {
        &self.ctx
    }

    /// Behavior hooks this node was created with
    pub fn hooks(&self) -> &dyn NodeHooks {
        self.hooks.as_ref()
    }

    /// Class name reported by the hooks, used in diagnostics
    pub fn class_name(&self) -> &'static str {
        self.hooks.class_name()
    }

    /// User tag, `INVALID_TAG` until set
    pub fn tag(&self) -> i32 {
        self.tag.load(Ordering::Acquire)
    }

    /// Set the user tag
    pub fn set_tag(&self, tag: i32) {
        self.tag.store(tag, Ordering::Release);
    }

    /// Z-order within the parent, changed only through `reorder_child`
    pub fn z_order(&self) -> i32 {
        self.z_order.load(Ordering::Acquire)
    }

    /// Whether the node is part of the running scene
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.read().upgrade()
    }

    // Flags

    /// Whether the node and its subtree are drawn
    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Show or hide the node and its subtree
    pub fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    /// Whether the node accepts input
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Enable or disable input for the node
    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    /// Whether the node is in its pressed state
    pub fn is_selected(&self) -> bool {
        self.state.lock().selected
    }

    /// Set the pressed state
    pub fn set_selected(&self, selected: bool) {
        self.state.lock().selected = selected;
    }

    /// Whether the node holds focus
    pub fn is_focused(&self) -> bool {
        self.state.lock().focused
    }

    /// Ignored unless focus handling is enabled on the context
    pub fn set_focused(&self, focused: bool) {
        if self.ctx.is_focus_enabled() {
            self.state.lock().focused = focused;
        }
    }

    /// Whether the node skips drawing its own render pairs
    pub fn is_no_draw(&self) -> bool {
        self.state.lock().no_draw
    }

    /// Skip this node's own render pairs; children still draw
    pub fn set_no_draw(&self, no_draw: bool) {
        self.state.lock().no_draw = no_draw;
    }

    // Transform inputs

    /// Snapshot of everything the local transform is computed from
    pub fn transform_inputs(&self) -> TransformInputs {
        *self.state.lock().transform.inputs()
    }

    /// Whether the node-to-parent matrix needs recomputing
    pub fn is_transform_dirty(&self) -> bool {
        self.state.lock().transform.is_transform_dirty()
    }

    /// Whether the parent-to-node matrix needs recomputing
    pub fn is_inverse_dirty(&self) -> bool {
        self.state.lock().transform.is_inverse_dirty()
    }

    /// Position in parent space
    pub fn position(&self) -> Vec2 {
        self.state.lock().transform.inputs().position
    }

    /// Move the node and notify the position observer
    pub fn set_position(&self, x: f32, y: f32) {
        self.state
            .lock()
            .transform
            .set_position(Vec2::new(x, y));

        let observer = self.selectors.read().position_changed.clone();
        if let Some(observer) = observer {
            observer(self);
        }
    }

    /// Move the node by an offset
    pub fn translate(&self, dx: f32, dy: f32) {
        let p = self.position();
        self.set_position(p.x + dx, p.y + dy);
    }

    /// Normalized anchor, (0.5, 0.5) by default
    pub fn anchor(&self) -> Vec2 {
        self.state.lock().transform.inputs().anchor
    }

    /// Anchor offset in content units
    pub fn anchor_point(&self) -> Vec2 {
        self.state.lock().transform.inputs().anchor_point
    }

    /// Set the normalized anchor
    pub fn set_anchor(&self, x: f32, y: f32) {
        self.state.lock().transform.set_anchor(Vec2::new(x, y));
    }

    /// Set the horizontal component of the anchor
    pub fn set_anchor_x(&self, x: f32) {
        self.state.lock().transform.set_anchor_x(x);
    }

    /// Set the vertical component of the anchor
    pub fn set_anchor_y(&self, y: f32) {
        self.state.lock().transform.set_anchor_y(y);
    }

    /// Change the anchor without moving the node on screen
    pub fn move_anchor_to(&self, x: f32, y: f32) {
        let t = self.transform_inputs();
        let mut pos = t.position;
        let size = t.content_size;

        if t.relative_anchor_point {
            pos.x += size.x * (x - t.anchor.x);
            pos.y += size.y * (y - t.anchor.y);
        }

        if t.scale.x != 1.0 {
            pos.x += (1.0 - t.scale.x) * (t.anchor.x - x) * size.x;
        }
        if t.scale.y != 1.0 {
            pos.y += (1.0 - t.scale.y) * (t.anchor.y - y) * size.y;
        }

        self.set_position(pos.x, pos.y);
        self.set_anchor(x, y);
    }

    /// Whether `position` places the anchor point rather than the origin
    pub fn is_relative_anchor_point(&self) -> bool {
        self.state.lock().transform.inputs().relative_anchor_point
    }

    /// Choose whether `position` places the anchor point
    pub fn set_relative_anchor_point(&self, relative: bool) {
        self.state
            .lock()
            .transform
            .set_relative_anchor_point(relative);
    }

    /// Untransformed size of the node
    pub fn content_size(&self) -> Vec2 {
        self.state.lock().transform.inputs().content_size
    }

    /// Content width
    pub fn width(&self) -> f32 {
        self.content_size().x
    }

    /// Content height
    pub fn height(&self) -> f32 {
        self.content_size().y
    }

    /// Resize the node, flagging its mesh for rebuild
    pub fn set_content_size(&self, width: f32, height: f32) {
        let mut state = self.state.lock();
        if state.transform.set_content_size(Vec2::new(width, height)) {
            state.mesh_dirty = true;
        }
    }

    /// Clockwise rotation in degrees
    pub fn rotation(&self) -> f32 {
        self.state.lock().transform.inputs().rotation
    }

    /// Set the clockwise rotation in degrees
    pub fn set_rotation(&self, degrees: f32) {
        self.state.lock().transform.set_rotation(degrees);
    }

    /// Horizontal scale factor
    pub fn scale_x(&self) -> f32 {
        self.state.lock().transform.inputs().scale.x
    }

    /// Vertical scale factor
    pub fn scale_y(&self) -> f32 {
        self.state.lock().transform.inputs().scale.y
    }

    /// Uniform scale; the smaller axis when they differ
    pub fn scale(&self) -> f32 {
        let scale = self.state.lock().transform.inputs().scale;
        if scale.x == scale.y {
            scale.x
        } else {
            log::warn!(
                "{} {:?}: scale x and y differ, returning the smaller one",
                self.class_name(),
                self.id
            );
            scale.x.min(scale.y)
        }
    }

    /// Scale both axes by the same factor
    pub fn set_scale(&self, scale: f32) {
        self.state.lock().transform.set_scale(Vec2::splat(scale));
    }

    /// Set the horizontal scale factor
    pub fn set_scale_x(&self, x: f32) {
        let mut state = self.state.lock();
        let y = state.transform.inputs().scale.y;
        state.transform.set_scale(Vec2::new(x, y));
    }

    /// Set the vertical scale factor
    pub fn set_scale_y(&self, y: f32) {
        let mut state = self.state.lock();
        let x = state.transform.inputs().scale.x;
        state.transform.set_scale(Vec2::new(x, y));
    }

    /// Skew angles in degrees
    pub fn skew(&self) -> Vec2 {
        self.state.lock().transform.inputs().skew
    }

    /// Set the horizontal skew in degrees
    pub fn set_skew_x(&self, degrees: f32) {
        let mut state = self.state.lock();
        let y = state.transform.inputs().skew.y;
        state.transform.set_skew(Vec2::new(degrees, y));
    }

    /// Set the vertical skew in degrees
    pub fn set_skew_y(&self, degrees: f32) {
        let mut state = self.state.lock();
        let x = state.transform.inputs().skew.x;
        state.transform.set_skew(Vec2::new(x, degrees));
    }

    /// Depth used for the 3D world matrix
    pub fn vertex_z(&self) -> f32 {
        self.state.lock().vertex_z
    }

    /// Set the depth used for the 3D world matrix
    pub fn set_vertex_z(&self, z: f32) {
        self.state.lock().vertex_z = z;
    }

    // Color

    /// Tint applied to the node's meshes
    pub fn color(&self) -> Color4B {
        self.state.lock().color
    }

    /// Set the RGB tint, keeping alpha
    pub fn set_color(&self, color: Color3B) {
        let mut state = self.state.lock();
        state.color.r = color.r;
        state.color.g = color.g;
        state.color.b = color.b;
        state.mesh_color_dirty = true;
    }

    /// Set the tint including alpha
    pub fn set_color4(&self, color: Color4B) {
        let mut state = self.state.lock();
        state.color = color;
        state.mesh_color_dirty = true;
    }

    /// Alpha component of the tint
    pub fn alpha(&self) -> u8 {
        self.state.lock().color.a
    }

    /// Set the alpha component of the tint
    pub fn set_alpha(&self, alpha: u8) {
        let mut state = self.state.lock();
        state.color.a = alpha;
        state.mesh_color_dirty = true;
    }

    /// Whether mesh geometry must be rebuilt
    pub fn need_update_mesh(&self) -> bool {
        self.state.lock().mesh_dirty
    }

    /// Flag mesh geometry for rebuild
    pub fn set_need_update_mesh(&self, flag: bool) {
        self.state.lock().mesh_dirty = flag;
    }

    /// Whether mesh colors must be refreshed
    pub fn need_update_mesh_color(&self) -> bool {
        self.state.lock().mesh_color_dirty
    }

    /// Flag mesh colors for refresh
    pub fn set_need_update_mesh_color(&self, flag: bool) {
        self.state.lock().mesh_color_dirty = flag;
    }

    /// Whether materials must be refreshed
    pub fn need_update_material(&self) -> bool {
        self.state.lock().material_dirty
    }

    /// Flag materials for refresh
    pub fn set_need_update_material(&self, flag: bool) {
        self.state.lock().material_dirty = flag;
    }

    // Clipping

    /// Configured clip rectangle, if any
    pub fn clip_rect(&self) -> Option<ClipRect> {
        self.state.lock().clip
    }

    /// Clip drawing to `rect`, optionally offset by the node's world bounds
    pub fn set_clip_rect(&self, rect: Rect, relative_to_self: bool) {
        self.state.lock().clip = Some(ClipRect {
            rect,
            relative_to_self,
        });
    }

    /// Stop clipping
    pub fn clear_clip_rect(&self) {
        self.state.lock().clip = None;
    }

    // Attachments

    /// Node whose world bounding box further limits this node's hit area
    pub fn touch_coffin(&self) -> Option<Arc<Node>> {
        self.state.lock().touch_coffin.upgrade()
    }

    /// Not retained: the coffin is expected to outlive this node
    pub fn set_touch_coffin(&self, coffin: Option<&Arc<Node>>) {
        self.state.lock().touch_coffin = coffin.map(Arc::downgrade).unwrap_or_default();
    }

    /// Whether a camera has been created
    pub fn has_camera(&self) -> bool {
        self.state.lock().camera.is_some()
    }

    /// The node's camera, created on first access
    pub fn camera(&self) -> Arc<Camera> {
        let mut state = self.state.lock();
        Arc::clone(state.camera.get_or_insert_with(|| Arc::new(Camera::new())))
    }

    /// Grid controller, if one is attached
    pub fn grid(&self) -> Option<Arc<GridController>> {
        self.state.lock().grid.clone()
    }

    /// Replace the grid controller, releasing the previous one
    pub fn set_grid(&self, grid: Option<Arc<GridController>>) {
        let previous = std::mem::replace(&mut self.state.lock().grid, grid);
        drop(previous);
    }

    /// Whether an attached grid controller is active
    pub fn is_grid_active(&self) -> bool {
        self.state
            .lock()
            .grid
            .as_ref()
            .is_some_and(|grid| grid.is_active())
    }

    // Selectors

    /// Callback run when a press lands on the node
    pub fn set_down_selector(&self, selector: Option<Selector>) {
        self.selectors.write().down = selector;
    }

    /// Callback run when a press is released on the node
    pub fn set_up_selector(&self, selector: Option<Selector>) {
        self.selectors.write().up = selector;
    }

    /// Callback run when a press moves out of the node
    pub fn set_move_out_selector(&self, selector: Option<Selector>) {
        self.selectors.write().move_out = selector;
    }

    /// Callback run after every `set_position`
    pub fn set_position_observer(&self, observer: Option<Selector>) {
        self.selectors.write().position_changed = observer;
    }

    // Render bucket

    /// Explicitly configured bucket, possibly `Inherit`
    pub fn explicit_render_bucket(&self) -> RenderBucket {
        self.state.lock().bucket
    }

    /// Set the render bucket, `Inherit` to follow the parent
    pub fn set_render_bucket(&self, bucket: RenderBucket) {
        self.state.lock().bucket = bucket;
    }

    /// Bucket this node draws into, resolving `Inherit` through the parents
    pub fn render_bucket(&self) -> RenderBucket {
        let bucket = self.explicit_render_bucket();
        if bucket != RenderBucket::Inherit {
            return bucket;
        }

        match self.parent() {
            Some(parent) => parent.render_bucket(),
            None => RenderBucket::Opaque,
        }
    }

    /// Cached node-to-parent matrix, recomputed if stale
    pub fn node_to_parent_transform(&self) -> Affine2 {
        self.state.lock().transform.update_node_to_parent()
    }

    /// Cached parent-to-node matrix, recomputed if stale
    pub fn parent_to_node_transform(&self) -> Affine2 {
        self.state.lock().transform.update_parent_to_node()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.class_name())
            .field("id", &self.id)
            .field("tag", &self.tag())
            .field("z_order", &self.z_order())
            .field("running", &self.is_running())
            .field("children", &self.children.len())
            .finish()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let ctx = Arc::clone(&self.ctx);
        let _lock = ctx.lock();

        // Collaborators must not keep referring to a destroyed node
        if self.is_running() {
            self.unregister_input_handlers();
            self.deactivate_timers();
            self.running.store(false, Ordering::Release);
            self.children.each(|child| child.on_exit());
        }

        if self.state.get_mut().has_motion() {
            ctx.actions().remove_physics_node(self);
        }

        let children = self.children.take_all();
        for child in &children {
            child.hooks.on_detach_from_parent(child, self);
            child.cleanup();
            *child.parent.write() = Weak::new();
        }
        drop(children);

        self.render_pairs.get_mut().clear();
        self.timers.get_mut().take();
    }
}
