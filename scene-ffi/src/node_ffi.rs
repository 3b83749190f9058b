//! Node FFI - C API for the node tree
//!
//! Node handles are `Arc<Node>` references. Structural calls return the
//! child's new index or -1 when the tree rejected the mutation.

use crate::{
    borrow_arc, input_category, into_handle, CAffine, CPoint, SNContext, SNNode, SNTimer,
};
use libc::{c_char, c_int, c_void};
use scene_node::{
    render_tree, BlendMode, Color4B, Material, Mesh, Node, Rect, RenderBucket, SceneContext,
    Timer,
};
use std::ffi::CStr;
use std::ptr;
use std::sync::Arc;

/// Opaque handle to Material (C-compatible)
pub struct SNMaterial {
    _private: [u8; 0],
}

/// Opaque handle to Mesh (C-compatible)
pub struct SNMesh {
    _private: [u8; 0],
}

/// C-compatible render command
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CRenderCommand {
    pub node_id: u64,
    pub transform: CAffine,
    pub vertex_z: f32,
    pub bucket: RenderBucket,
    /// Borrowed for the duration of the callback
    pub material: *const SNMaterial,
    pub mesh: *const SNMesh,
    pub mesh_tag: c_int,
    pub lod_level: u32,
    pub color: Color4B,
    pub blend_mode: BlendMode,
    pub has_clip: c_int,
    pub clip: Rect,
}

pub type RenderCallback = extern "C" fn(*const CRenderCommand, *mut c_void);

unsafe fn node<'a>(ptr: *const SNNode) -> &'a Node {
    &*(ptr as *const Node)
}

fn index_or_sentinel<E>(result: Result<usize, E>) -> c_int {
    match result {
        Ok(index) => index as c_int,
        Err(_) => -1,
    }
}

fn flag<E>(result: Result<(), E>) -> c_int {
    result.is_ok() as c_int
}

// ============================================================================
// NODE LIFECYCLE
// ============================================================================

/// Create a node bound to `ctx`
///
/// # Safety
/// Caller must ensure ctx is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_create(ctx: *mut SNContext) -> *mut SNNode {
    if ctx.is_null() {
        log::warn!("scene_node_create: null context");
        return ptr::null_mut();
    }

    let ctx = borrow_arc(ctx as *const SceneContext);
    into_handle(Node::new(&ctx))
}

/// Take another reference to a node
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_retain(ptr: *mut SNNode) -> *mut SNNode {
    if ptr.is_null() {
        return ptr::null_mut();
    }

    Arc::increment_strong_count(ptr as *const Node);
    ptr
}

/// Give back a node reference; the last one destroys the node and its subtree
///
/// # Safety
/// Caller must ensure ptr is valid and this reference not already released.
#[no_mangle]
pub unsafe extern "C" fn scene_node_release(ptr: *mut SNNode) {
    if !ptr.is_null() {
        drop(Arc::from_raw(ptr as *const Node));
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_on_enter(ptr: *mut SNNode) {
    if !ptr.is_null() {
        node(ptr).on_enter();
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_on_exit(ptr: *mut SNNode) {
    if !ptr.is_null() {
        node(ptr).on_exit();
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_cleanup(ptr: *mut SNNode) {
    if !ptr.is_null() {
        node(ptr).cleanup();
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_is_running(ptr: *const SNNode) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    node(ptr).is_running() as c_int
}

// ============================================================================
// TREE STRUCTURE
// ============================================================================

/// Add `child` under `parent`; returns its index or -1
///
/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_add_child(
    parent: *mut SNNode,
    child: *mut SNNode,
    z: c_int,
    tag: c_int,
) -> c_int {
    if parent.is_null() || child.is_null() {
        log::warn!("scene_node_add_child: null node");
        return -1;
    }

    let child = borrow_arc(child as *const Node);
    index_or_sentinel(node(parent).add_child(&child, z, tag))
}

/// Like `scene_node_add_child`, holding the tree lock
///
/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_add_child_locked(
    parent: *mut SNNode,
    child: *mut SNNode,
    z: c_int,
    tag: c_int,
) -> c_int {
    if parent.is_null() || child.is_null() {
        log::warn!("scene_node_add_child_locked: null node");
        return -1;
    }

    let child = borrow_arc(child as *const Node);
    index_or_sentinel(node(parent).add_child_locked(&child, z, tag))
}

/// Returns 1 if `child` was removed
///
/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_remove_child(
    parent: *mut SNNode,
    child: *mut SNNode,
    cleanup: c_int,
) -> c_int {
    if parent.is_null() || child.is_null() {
        log::warn!("scene_node_remove_child: null node");
        return 0;
    }

    flag(node(parent).remove_child(node(child), cleanup != 0))
}

/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_remove_child_locked(
    parent: *mut SNNode,
    child: *mut SNNode,
    cleanup: c_int,
) -> c_int {
    if parent.is_null() || child.is_null() {
        log::warn!("scene_node_remove_child_locked: null node");
        return 0;
    }

    flag(node(parent).remove_child_locked(node(child), cleanup != 0))
}

/// Returns the number of children removed, or -1 if rejected
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_remove_children_by_tag(
    ptr: *mut SNNode,
    tag: c_int,
    cleanup: c_int,
) -> c_int {
    if ptr.is_null() {
        return -1;
    }
    index_or_sentinel(node(ptr).remove_children_by_tag_locked(tag, cleanup != 0))
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_remove_all_children(ptr: *mut SNNode, cleanup: c_int) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    flag(node(ptr).remove_all_children(cleanup != 0))
}

/// Move `child` to z-order `z`; returns its new index or -1
///
/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_reorder_child(
    parent: *mut SNNode,
    child: *mut SNNode,
    z: c_int,
) -> c_int {
    if parent.is_null() || child.is_null() {
        log::warn!("scene_node_reorder_child: null node");
        return -1;
    }

    index_or_sentinel(node(parent).reorder_child(node(child), z))
}

/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_bring_to_front(parent: *mut SNNode, child: *mut SNNode) -> c_int {
    if parent.is_null() || child.is_null() {
        return -1;
    }
    index_or_sentinel(node(parent).bring_to_front(node(child)))
}

/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_bring_to_back(parent: *mut SNNode, child: *mut SNNode) -> c_int {
    if parent.is_null() || child.is_null() {
        return -1;
    }
    index_or_sentinel(node(parent).bring_to_back(node(child)))
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_child_count(ptr: *const SNNode) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    node(ptr).child_count() as c_int
}

/// Child at `index` as a new reference, or null
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_child_at(ptr: *const SNNode, index: c_int) -> *mut SNNode {
    if ptr.is_null() || index < 0 {
        return ptr::null_mut();
    }
    node(ptr)
        .child_at(index as usize)
        .map_or(ptr::null_mut(), into_handle)
}

/// First child carrying `tag` as a new reference, or null
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_child_by_tag(ptr: *const SNNode, tag: c_int) -> *mut SNNode {
    if ptr.is_null() {
        return ptr::null_mut();
    }
    node(ptr)
        .child_by_tag_locked(tag)
        .map_or(ptr::null_mut(), into_handle)
}

/// Parent as a new reference, or null
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_parent(ptr: *const SNNode) -> *mut SNNode {
    if ptr.is_null() {
        return ptr::null_mut();
    }
    node(ptr).parent().map_or(ptr::null_mut(), into_handle)
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_z_order(ptr: *const SNNode) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    node(ptr).z_order()
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_position(ptr: *mut SNNode, x: f32, y: f32) {
    if !ptr.is_null() {
        node(ptr).set_position(x, y);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_position(ptr: *const SNNode) -> CPoint {
    if ptr.is_null() {
        return CPoint::default();
    }
    node(ptr).position().into()
}

/// Anchor as a fraction of the content size
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_anchor(ptr: *mut SNNode, x: f32, y: f32) {
    if !ptr.is_null() {
        node(ptr).set_anchor(x, y);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_content_size(ptr: *mut SNNode, width: f32, height: f32) {
    if !ptr.is_null() {
        node(ptr).set_content_size(width, height);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_rotation(ptr: *mut SNNode, degrees: f32) {
    if !ptr.is_null() {
        node(ptr).set_rotation(degrees);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_scale(ptr: *mut SNNode, scale_x: f32, scale_y: f32) {
    if ptr.is_null() {
        return;
    }
    let node = node(ptr);
    node.set_scale_x(scale_x);
    node.set_scale_y(scale_y);
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_skew(ptr: *mut SNNode, skew_x: f32, skew_y: f32) {
    if ptr.is_null() {
        return;
    }
    let node = node(ptr);
    node.set_skew_x(skew_x);
    node.set_skew_y(skew_y);
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_visible(ptr: *mut SNNode, visible: c_int) {
    if !ptr.is_null() {
        node(ptr).set_visible(visible != 0);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_velocity(ptr: *mut SNNode, vx: f32, vy: f32) {
    if !ptr.is_null() {
        node(ptr).set_velocity(vx, vy);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_acceleration(ptr: *mut SNNode, ax: f32, ay: f32) {
    if !ptr.is_null() {
        node(ptr).set_acceleration(ax, ay);
    }
}

/// Write the node-to-parent transform into `out`
///
/// # Safety
/// Caller must ensure ptr and out are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_to_parent_transform(ptr: *const SNNode, out: *mut CAffine) -> c_int {
    if ptr.is_null() || out.is_null() {
        return 0;
    }
    *out = node(ptr).node_to_parent_transform().into();
    1
}

/// Write the node-to-world transform into `out`
///
/// # Safety
/// Caller must ensure ptr and out are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_to_world_transform(ptr: *const SNNode, out: *mut CAffine) -> c_int {
    if ptr.is_null() || out.is_null() {
        return 0;
    }
    *out = node(ptr).node_to_world_transform().into();
    1
}

/// Convert a node-space point to world space; `ar` measures from the anchor
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_to_world_space(ptr: *const SNNode, p: CPoint, ar: c_int) -> CPoint {
    if ptr.is_null() {
        return p;
    }
    let node = node(ptr);
    if ar != 0 {
        node.node_to_world_space_ar(p.into()).into()
    } else {
        node.node_to_world_space(p.into()).into()
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_world_to_node_space(ptr: *const SNNode, p: CPoint, ar: c_int) -> CPoint {
    if ptr.is_null() {
        return p;
    }
    let node = node(ptr);
    if ar != 0 {
        node.world_to_node_space_ar(p.into()).into()
    } else {
        node.world_to_node_space(p.into()).into()
    }
}

/// # Safety
/// Caller must ensure ptr and out are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_bounding_box_world(ptr: *const SNNode, out: *mut Rect) -> c_int {
    if ptr.is_null() || out.is_null() {
        return 0;
    }
    *out = node(ptr).bounding_box_relative_to_world();
    1
}

/// Returns 1 if the world point lies inside the node
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_hit_test(ptr: *const SNNode, x: f32, y: f32) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    node(ptr).hit_test(x, y) as c_int
}

// ============================================================================
// INPUT, TIMERS AND ACTIONS
// ============================================================================

/// Category values follow `InputCategory`; returns 0 for an unknown category
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_input_enabled(
    ptr: *mut SNNode,
    category: u32,
    enabled: c_int,
) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    let Some(category) = input_category(category) else {
        log::warn!("scene_node_set_input_enabled: unknown category {}", category);
        return 0;
    };

    node(ptr).set_input_enabled(category, enabled != 0);
    1
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_input_priority(
    ptr: *mut SNNode,
    category: u32,
    priority: c_int,
) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    let Some(category) = input_category(category) else {
        log::warn!("scene_node_set_input_priority: unknown category {}", category);
        return 0;
    };

    node(ptr).set_input_priority(category, priority);
    1
}

/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_schedule(ptr: *mut SNNode, timer: *const SNTimer) -> c_int {
    if ptr.is_null() || timer.is_null() {
        return 0;
    }
    let timer = borrow_arc(timer as *const Timer);
    node(ptr).schedule_locked(&timer);
    1
}

/// # Safety
/// Caller must ensure both pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_unschedule(ptr: *mut SNNode, timer: *const SNTimer) -> c_int {
    if ptr.is_null() || timer.is_null() {
        return 0;
    }
    let timer = borrow_arc(timer as *const Timer);
    node(ptr).unschedule_locked(&timer);
    1
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_pause_all_timers(ptr: *mut SNNode, include_children: c_int) {
    if !ptr.is_null() {
        node(ptr).pause_all_timers(include_children != 0);
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_resume_all_timers(ptr: *mut SNNode, include_children: c_int) {
    if !ptr.is_null() {
        node(ptr).resume_all_timers(include_children != 0);
    }
}

/// Start the host action known by `tag` on this node
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_run_action(ptr: *mut SNNode, tag: c_int) {
    if !ptr.is_null() {
        node(ptr).run_action(Arc::new(crate::HostAction(tag)));
    }
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_has_running_action(ptr: *const SNNode) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    node(ptr).has_running_action() as c_int
}

// ============================================================================
// RENDER PAIRS
// ============================================================================

/// # Safety
/// `name` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn scene_material_create(name: *const c_char) -> *mut SNMaterial {
    if name.is_null() {
        return ptr::null_mut();
    }

    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    into_handle(Material::new(name))
}

/// # Safety
/// Caller must ensure ptr is valid and not already released.
#[no_mangle]
pub unsafe extern "C" fn scene_material_release(ptr: *mut SNMaterial) {
    if !ptr.is_null() {
        drop(Arc::from_raw(ptr as *const Material));
    }
}

#[no_mangle]
pub extern "C" fn scene_mesh_create(tag: c_int, lod_levels: u32) -> *mut SNMesh {
    into_handle(Mesh::new(tag, lod_levels as usize))
}

/// # Safety
/// Caller must ensure ptr is valid and not already released.
#[no_mangle]
pub unsafe extern "C" fn scene_mesh_release(ptr: *mut SNMesh) {
    if !ptr.is_null() {
        drop(Arc::from_raw(ptr as *const Mesh));
    }
}

/// The node takes its own references to both
///
/// # Safety
/// Caller must ensure all pointers are valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_add_render_pair(
    ptr: *mut SNNode,
    material: *mut SNMaterial,
    mesh: *mut SNMesh,
) -> c_int {
    if ptr.is_null() || material.is_null() || mesh.is_null() {
        log::warn!("scene_node_add_render_pair: null argument");
        return 0;
    }

    let material = borrow_arc(material as *const Material);
    let mesh = borrow_arc(mesh as *const Mesh);
    node(ptr).add_render_pair(Arc::clone(&material), Arc::clone(&mesh));
    1
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_lod_level(ptr: *mut SNNode, level: u32, index: u32) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    flag(node(ptr).set_lod_level(level as usize, index as usize))
}

/// Returns the number of pairs removed
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_remove_render_pairs_by_tag(ptr: *mut SNNode, tag: c_int) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    node(ptr).remove_render_pairs_by_tag(tag) as c_int
}

/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_color(ptr: *mut SNNode, color: Color4B) {
    if !ptr.is_null() {
        node(ptr).set_color4(color);
    }
}

fn blend_mode(value: u32) -> Option<BlendMode> {
    match value {
        0 => Some(BlendMode::None),
        1 => Some(BlendMode::Normal),
        2 => Some(BlendMode::Additive),
        3 => Some(BlendMode::Subtract),
        4 => Some(BlendMode::Screen),
        5 => Some(BlendMode::Multiply),
        _ => None,
    }
}

fn render_bucket(value: u32) -> Option<RenderBucket> {
    match value {
        0 => Some(RenderBucket::Inherit),
        1 => Some(RenderBucket::Opaque),
        2 => Some(RenderBucket::Transparent),
        3 => Some(RenderBucket::Gui),
        _ => None,
    }
}

/// Mode values follow `BlendMode`; returns 0 for an unknown mode
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_blend_mode(ptr: *mut SNNode, mode: u32) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    let Some(mode) = blend_mode(mode) else {
        log::warn!("scene_node_set_blend_mode: unknown blend mode {}", mode);
        return 0;
    };

    node(ptr).set_blend_mode(mode);
    1
}

/// Bucket values follow `RenderBucket`; returns 0 for an unknown bucket
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn scene_node_set_render_bucket(ptr: *mut SNNode, bucket: u32) -> c_int {
    if ptr.is_null() {
        return 0;
    }
    let Some(bucket) = render_bucket(bucket) else {
        log::warn!("scene_node_set_render_bucket: unknown bucket {}", bucket);
        return 0;
    };

    node(ptr).set_render_bucket(bucket);
    1
}

// ============================================================================
// RENDERING
// ============================================================================

/// Walk the tree under `root` and hand each render command to `callback`
///
/// Returns the number of commands emitted.
///
/// # Safety
/// Caller must ensure root is valid. Command pointers are only valid during
/// the callback.
#[no_mangle]
pub unsafe extern "C" fn scene_render_tree(
    root: *const SNNode,
    callback: RenderCallback,
    user_data: *mut c_void,
) -> c_int {
    if root.is_null() {
        return 0;
    }

    let commands = render_tree(node(root));
    for cmd in &commands {
        let c_cmd = CRenderCommand {
            node_id: cmd.node_id.0,
            transform: cmd.transform.into(),
            vertex_z: cmd.vertex_z,
            bucket: cmd.bucket,
            material: Arc::as_ptr(&cmd.material) as *const SNMaterial,
            mesh: Arc::as_ptr(&cmd.mesh) as *const SNMesh,
            mesh_tag: cmd.mesh.tag(),
            lod_level: cmd.lod_level as u32,
            color: cmd.color,
            blend_mode: cmd.blend_mode,
            has_clip: cmd.clip.is_some() as c_int,
            clip: cmd.clip.unwrap_or(Rect::ZERO),
        };
        callback(&c_cmd, user_data);
    }

    commands.len() as c_int
}
