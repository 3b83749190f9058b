//! Child list ownership, structural mutation and lifecycle propagation
//!
//! Children are kept sorted by z-order; a new child goes in front of the
//! first sibling with a strictly greater z, so equal z values keep their
//! insertion order.
//!
//! Two things block structural mutation of a node's children:
//! - the child list is being iterated (`ChildList::each`)
//! - another mutation of the same node is in progress, for example when an
//!   `on_enter` hook tries to remove a sibling while its parent is adding it
//!
//! Both are rejected with a warning and leave the tree untouched.

use super::Node;
use crate::error::TreeError;
use parking_lot::RwLock;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Ordered, owning list of a node's children
#[derive(Default)]
pub(crate) struct ChildList {
    items: RwLock<Vec<Arc<Node>>>,
    iterating: AtomicUsize,
}

/// Marks a child list as locked for the duration of an iteration
struct IterationGuard<'a>(&'a AtomicUsize);

impl Drop for IterationGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ChildList {
    pub(crate) fn len(&self) -> usize {
        self.items.read().len()
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.iterating.load(Ordering::Acquire) > 0
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Node>> {
        self.items.read().clone()
    }

    pub(crate) fn get(&self, index: usize) -> Option<Arc<Node>> {
        self.items.read().get(index).cloned()
    }

    /// Visit every child with the list locked against structural mutation
    ///
    /// Runs over a snapshot, so no lock is held while `f` runs.
    pub(crate) fn each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Node>),
    {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return;
        }

        self.iterating.fetch_add(1, Ordering::AcqRel);
        let _guard = IterationGuard(&self.iterating);
        for child in &snapshot {
            f(child);
        }
    }

    fn index_of(&self, node: &Node) -> Option<usize> {
        self.items
            .read()
            .iter()
            .position(|child| ptr::eq(child.as_ref(), node))
    }

    fn find(&self, node: &Node) -> Option<Arc<Node>> {
        self.items
            .read()
            .iter()
            .find(|child| ptr::eq(child.as_ref(), node))
            .cloned()
    }

    /// Insert before the first child whose z-order is greater than `z`
    fn insert_by_z(&self, child: Arc<Node>, z: i32) -> usize {
        let mut items = self.items.write();
        let index = items
            .iter()
            .position(|c| c.z_order() > z)
            .unwrap_or(items.len());
        items.insert(index, child);
        index
    }

    fn remove(&self, node: &Node) -> Option<Arc<Node>> {
        let mut items = self.items.write();
        let index = items.iter().position(|c| ptr::eq(c.as_ref(), node))?;
        Some(items.remove(index))
    }

    pub(crate) fn take_all(&self) -> Vec<Arc<Node>> {
        std::mem::take(&mut *self.items.write())
    }
}

/// Holds a node in the mutating state; releasing it always returns to idle
struct MutationGuard<'a>(&'a AtomicBool);

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Node {
    fn begin_mutation(&self, op: &str) -> Result<MutationGuard<'_>, TreeError> {
        if self.children.is_locked() {
            return self.reject(op, TreeError::ChildrenLocked);
        }

        if self
            .children_changing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.reject(op, TreeError::MutationInProgress);
        }

        Ok(MutationGuard(&self.children_changing))
    }

    fn reject<T>(&self, op: &str, err: TreeError) -> Result<T, TreeError> {
        log::warn!("{} {:?}: {} rejected: {}", self.class_name(), self.id(), op, err);
        Err(err)
    }

    /// Whether a structural mutation of this node is under way
    pub fn is_mutating(&self) -> bool {
        self.children_changing.load(Ordering::Acquire)
    }

    fn check_adoptable(&self, op: &str, child: &Node) -> Result<(), TreeError> {
        if let Some(parent) = child.parent() {
            return self.reject(
                op,
                TreeError::AlreadyParented {
                    child: child.id(),
                    parent: parent.id(),
                },
            );
        }

        if ptr::eq(child, self) || child.is_ancestor_of(self) {
            return self.reject(op, TreeError::WouldCycle(child.id()));
        }

        Ok(())
    }

    fn insert_unguarded(&self, child: &Arc<Node>, z: i32) -> usize {
        child.z_order.store(z, Ordering::Release);
        *child.parent.write() = self.this.clone();
        self.children.insert_by_z(Arc::clone(child), z)
    }

    /// Insert `child` by z-order without running any hook
    ///
    /// Returns the index the child landed at.
    pub fn insert_child(&self, child: &Arc<Node>, z: i32) -> Result<usize, TreeError> {
        self.check_adoptable("insert_child", child)?;
        let _guard = self.begin_mutation("insert_child")?;
        Ok(self.insert_unguarded(child, z))
    }

    /// Attach a detached node as a child
    ///
    /// The child gets `tag` and z-order `z`, is told about its new parent and
    /// enters the running scene if this node is running. Nodes that already
    /// have a parent are rejected; detach them first.
    pub fn add_child(&self, child: &Arc<Node>, z: i32, tag: i32) -> Result<usize, TreeError> {
        self.check_adoptable("add_child", child)?;
        let _guard = self.begin_mutation("add_child")?;

        let index = self.insert_unguarded(child, z);
        child.set_tag(tag);
        child.hooks.on_attach_to_parent(child, self);

        if self.is_running() {
            child.on_enter();
        }

        log::trace!("{:?}: added child {:?} at {}", self.id(), child.id(), index);
        Ok(index)
    }

    fn detach(&self, child: &Node, cleanup: bool) {
        child.hooks.on_detach_from_parent(child, self);

        if self.is_running() {
            child.on_exit();
        }

        if cleanup {
            child.cleanup();
        }

        *child.parent.write() = Weak::new();
    }

    /// Detach a child, optionally cleaning it up
    ///
    /// Nodes that are not children of this node are left alone.
    pub fn remove_child(&self, child: &Node, cleanup: bool) -> Result<(), TreeError> {
        let _guard = self.begin_mutation("remove_child")?;

        let Some(owned) = self.children.find(child) else {
            return self.reject("remove_child", TreeError::NotAChild(child.id()));
        };

        self.detach(&owned, cleanup);
        self.children.remove(&owned);

        log::trace!("{:?}: removed child {:?}", self.id(), owned.id());
        Ok(())
    }

    /// Detach every child
    pub fn remove_all_children(&self, cleanup: bool) -> Result<(), TreeError> {
        let _guard = self.begin_mutation("remove_all_children")?;

        for child in self.children.snapshot() {
            self.detach(&child, cleanup);
        }
        let removed = self.children.take_all();

        log::trace!("{:?}: removed {} children", self.id(), removed.len());
        Ok(())
    }

    /// Move a child to a new z-order, returning its new index
    pub fn reorder_child(&self, child: &Node, z: i32) -> Result<usize, TreeError> {
        let _guard = self.begin_mutation("reorder_child")?;

        let Some(owned) = self.children.remove(child) else {
            return self.reject("reorder_child", TreeError::NotAChild(child.id()));
        };

        owned.z_order.store(z, Ordering::Release);
        Ok(self.children.insert_by_z(owned, z))
    }

    /// Give `child` a z-order one above every sibling
    pub fn bring_to_front(&self, child: &Node) -> Result<usize, TreeError> {
        let max = self
            .children
            .snapshot()
            .iter()
            .map(|c| c.z_order())
            .max()
            .unwrap_or(0);
        self.reorder_child(child, max.saturating_add(1))
    }

    /// Give `child` a z-order one below every sibling
    pub fn bring_to_back(&self, child: &Node) -> Result<usize, TreeError> {
        let min = self
            .children
            .snapshot()
            .iter()
            .map(|c| c.z_order())
            .min()
            .unwrap_or(0);
        self.reorder_child(child, min.saturating_sub(1))
    }

    // Lookup

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Children in z-order
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.children.snapshot()
    }

    /// Child at `index` in z-order
    pub fn child_at(&self, index: usize) -> Option<Arc<Node>> {
        self.children.get(index)
    }

    /// Child with the lowest z-order
    pub fn first_child(&self) -> Option<Arc<Node>> {
        self.children.get(0)
    }

    /// Index of `child` among the children, if it is one
    pub fn child_index(&self, child: &Node) -> Option<usize> {
        self.children.index_of(child)
    }

    /// First child carrying `tag`
    pub fn child_by_tag(&self, tag: i32) -> Option<Arc<Node>> {
        self.children
            .items
            .read()
            .iter()
            .find(|c| c.tag() == tag)
            .cloned()
    }

    /// Every child carrying `tag`, in z-order
    pub fn children_by_tag(&self, tag: i32) -> Vec<Arc<Node>> {
        self.children
            .items
            .read()
            .iter()
            .filter(|c| c.tag() == tag)
            .cloned()
            .collect()
    }

    /// Whether this node appears in the parent chain of `node`
    pub fn is_ancestor_of(&self, node: &Node) -> bool {
        let mut current = node.parent();
        while let Some(parent) = current {
            if ptr::eq(parent.as_ref(), self) {
                return true;
            }
            current = parent.parent();
        }
        false
    }

    // Locked variants, serialized on the context's tree lock

    /// `add_child` under the tree lock
    pub fn add_child_locked(&self, child: &Arc<Node>, z: i32, tag: i32) -> Result<usize, TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.add_child(child, z, tag)
    }

    /// Remove `child` if this node is still its parent
    pub fn remove_child_locked(&self, child: &Node, cleanup: bool) -> Result<(), TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();

        let is_parent = child
            .parent()
            .is_some_and(|parent| ptr::eq(parent.as_ref(), self));
        if !is_parent {
            return self.reject("remove_child_locked", TreeError::NotAChild(child.id()));
        }

        self.remove_child(child, cleanup)
    }

    /// Remove the first child carrying `tag`, under the tree lock
    pub fn remove_child_by_tag_locked(&self, tag: i32, cleanup: bool) -> Result<(), TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();

        match self.child_by_tag(tag) {
            Some(child) => self.remove_child(&child, cleanup),
            None => Ok(()),
        }
    }

    /// Remove every child carrying `tag`, returning how many were removed
    pub fn remove_children_by_tag_locked(&self, tag: i32, cleanup: bool) -> Result<usize, TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();

        let matches = self.children_by_tag(tag);
        for child in &matches {
            self.remove_child(child, cleanup)?;
        }
        Ok(matches.len())
    }

    /// `remove_all_children` under the tree lock
    pub fn remove_all_children_locked(&self, cleanup: bool) -> Result<(), TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.remove_all_children(cleanup)
    }

    /// `reorder_child` under the tree lock
    pub fn reorder_child_locked(&self, child: &Node, z: i32) -> Result<usize, TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.reorder_child(child, z)
    }

    /// `bring_to_front` under the tree lock
    pub fn bring_to_front_locked(&self, child: &Node) -> Result<usize, TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.bring_to_front(child)
    }

    /// `bring_to_back` under the tree lock
    pub fn bring_to_back_locked(&self, child: &Node) -> Result<usize, TreeError> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.bring_to_back(child)
    }

    /// `child_by_tag` under the tree lock
    pub fn child_by_tag_locked(&self, tag: i32) -> Option<Arc<Node>> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.child_by_tag(tag)
    }

    /// `children_by_tag` under the tree lock
    pub fn children_by_tag_locked(&self, tag: i32) -> Vec<Arc<Node>> {
        let ctx = Arc::clone(self.context());
        let _lock = ctx.lock();
        self.children_by_tag(tag)
    }

    // Lifecycle

    /// Enter the running scene
    ///
    /// Registers enabled input handlers, enters every child, then activates
    /// timers and resumes actions. Does nothing if already running.
    pub fn on_enter(&self) {
        if self.is_running() {
            return;
        }

        self.register_input_handlers();
        self.children.each(|child| child.on_enter());
        self.activate_timers();
        self.running.store(true, Ordering::Release);

        self.hooks.on_enter(self);
    }

    /// Leave the running scene, mirroring [`Node::on_enter`]
    pub fn on_exit(&self) {
        if !self.is_running() {
            return;
        }

        self.hooks.on_exit(self);

        self.unregister_input_handlers();
        self.deactivate_timers();
        self.running.store(false, Ordering::Release);
        self.children.each(|child| child.on_exit());
    }

    /// Notify the subtree that the enter transition finished
    pub fn on_enter_transition_did_finish(&self) {
        self.hooks.on_enter_transition_did_finish(self);
        self.children
            .each(|child| child.on_enter_transition_did_finish());
    }

    /// Stop actions, drop timers and clean up the whole subtree
    ///
    /// Runs regardless of the running state.
    pub fn cleanup(&self) {
        self.hooks.on_cleanup(self);

        self.stop_all_actions(false);
        self.clear_timers();
        self.children.each(|child| child.cleanup());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InputCategory;
    use crate::hooks::NodeHooks;
    use crate::context::SceneContext;
    use crate::testing::recording_context;
    use crate::types::INVALID_TAG;
    use parking_lot::Mutex;

    fn z_orders(node: &Node) -> Vec<i32> {
        node.children().iter().map(|c| c.z_order()).collect()
    }

    #[test]
    fn test_children_sorted_by_z() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        for z in [5, 1, 3] {
            root.add_child(&Node::new(&ctx), z, 0).unwrap();
        }
        assert_eq!(z_orders(&root), vec![1, 3, 5]);
    }

    #[test]
    fn test_equal_z_keeps_insertion_order() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let first = Node::new(&ctx);
        let second = Node::new(&ctx);

        assert_eq!(root.add_child(&first, 2, 1).unwrap(), 0);
        assert_eq!(root.add_child(&second, 2, 2).unwrap(), 1);
        assert_eq!(root.add_child(&Node::new(&ctx), 0, 3).unwrap(), 0);

        assert_eq!(root.child_index(&first), Some(1));
        assert_eq!(root.child_index(&second), Some(2));
    }

    #[test]
    fn test_insert_child_sets_parent_without_hooks() {
        let (ctx, recorder) = recording_context();
        let root = Node::new(&ctx);
        root.on_enter();

        let child = Node::new(&ctx);
        child.set_touch_enabled(true);
        assert_eq!(root.insert_child(&child, 4).unwrap(), 0);

        assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
        assert_eq!(child.z_order(), 4);
        assert!(!child.is_running());
        assert_eq!(recorder.handler_adds(InputCategory::Touch), 0);
    }

    #[test]
    fn test_add_child_sets_tag_and_parent() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let child = Node::new(&ctx);

        root.add_child(&child, 0, 42).unwrap();
        assert_eq!(child.tag(), 42);
        assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
        assert!(Arc::ptr_eq(&root.child_by_tag(42).unwrap(), &child));
        assert!(Arc::ptr_eq(&root.first_child().unwrap(), &child));
    }

    #[test]
    fn test_add_parented_child_is_rejected() {
        let (ctx, _) = recording_context();
        let first = Node::new(&ctx);
        let second = Node::new(&ctx);
        let child = Node::new(&ctx);
        first.add_child(&child, 0, 1).unwrap();

        let err = second.add_child(&child, 0, 2).unwrap_err();
        assert_eq!(
            err,
            TreeError::AlreadyParented {
                child: child.id(),
                parent: first.id(),
            }
        );
        assert_eq!(second.child_count(), 0);
        assert_eq!(child.tag(), 1);
        assert!(Arc::ptr_eq(&child.parent().unwrap(), &first));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let child = Node::new(&ctx);
        root.add_child(&child, 0, 0).unwrap();

        assert_eq!(
            root.add_child(&root, 0, 0).unwrap_err(),
            TreeError::WouldCycle(root.id())
        );

        // root has no parent, so only the ancestor check catches this
        assert_eq!(
            child.add_child(&root, 0, 0).unwrap_err(),
            TreeError::WouldCycle(root.id())
        );
        assert!(root.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&root));
    }

    #[test]
    fn test_remove_non_child_is_noop() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let child = Node::new(&ctx);
        let stranger = Node::new(&ctx);
        root.add_child(&child, 0, 0).unwrap();

        let before = Arc::strong_count(&stranger);
        assert_eq!(
            root.remove_child(&stranger, true).unwrap_err(),
            TreeError::NotAChild(stranger.id())
        );
        assert_eq!(root.child_count(), 1);
        assert_eq!(Arc::strong_count(&stranger), before);
        assert_eq!(Arc::strong_count(&child), 2);
    }

    #[test]
    fn test_remove_child_releases_ownership() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let child = Node::new(&ctx);
        root.add_child(&child, 0, 0).unwrap();

        root.remove_child(&child, true).unwrap();
        assert_eq!(root.child_count(), 0);
        assert!(child.parent().is_none());
        assert_eq!(Arc::strong_count(&child), 1);
    }

    #[test]
    fn test_reorder_child() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let a = Node::new(&ctx);
        let b = Node::new(&ctx);
        root.add_child(&a, 1, 0).unwrap();
        root.add_child(&b, 2, 0).unwrap();

        assert_eq!(root.reorder_child(&a, 3).unwrap(), 1);
        assert_eq!(a.z_order(), 3);
        assert!(Arc::ptr_eq(&a.parent().unwrap(), &root));
        assert_eq!(z_orders(&root), vec![2, 3]);
    }

    #[test]
    fn test_rejected_reorder_releases_guard() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let stranger = Node::new(&ctx);

        assert!(root.reorder_child(&stranger, 1).is_err());
        assert!(!root.is_mutating());
        assert!(root.add_child(&Node::new(&ctx), 0, 0).is_ok());
    }

    #[test]
    fn test_bring_to_front_and_back() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let nodes: Vec<_> = (0..4).map(|_| Node::new(&ctx)).collect();
        for (node, z) in nodes.iter().zip([3, -2, 7, 7]) {
            root.add_child(node, z, 0).unwrap();
        }

        root.bring_to_front(&nodes[0]).unwrap();
        let front = nodes[0].z_order();
        assert!(root.children().iter().all(|c| front >= c.z_order()));
        assert!(Arc::ptr_eq(&root.child_at(3).unwrap(), &nodes[0]));

        root.bring_to_back(&nodes[2]).unwrap();
        let back = nodes[2].z_order();
        assert!(root.children().iter().all(|c| back <= c.z_order()));
        assert!(Arc::ptr_eq(&root.first_child().unwrap(), &nodes[2]));
    }

    /// Tries to reorder itself inside its parent from the attach hook
    struct Reorderer {
        outcome: Arc<Mutex<Option<Result<usize, TreeError>>>>,
    }

    impl NodeHooks for Reorderer {
        fn on_attach_to_parent(&self, node: &Node, parent: &Node) {
            *self.outcome.lock() = Some(parent.reorder_child(node, 99));
        }
    }

    #[test]
    fn test_reentrant_mutation_is_rejected() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let outcome = Arc::new(Mutex::new(None));
        let child = Node::with_hooks(
            &ctx,
            Reorderer {
                outcome: Arc::clone(&outcome),
            },
        );

        root.add_child(&child, 1, 0).unwrap();

        assert_eq!(
            outcome.lock().take(),
            Some(Err(TreeError::MutationInProgress))
        );
        assert_eq!(child.z_order(), 1);
        assert_eq!(root.child_count(), 1);
        assert!(!root.is_mutating());
    }

    /// Tries to remove a sibling while entering
    struct SiblingRemover {
        sibling: Arc<Node>,
        outcome: Arc<Mutex<Option<Result<(), TreeError>>>>,
    }

    impl NodeHooks for SiblingRemover {
        fn on_enter(&self, node: &Node) {
            if let Some(parent) = node.parent() {
                *self.outcome.lock() = Some(parent.remove_child(&self.sibling, true));
            }
        }
    }

    #[test]
    fn test_mutation_while_iterating_is_rejected() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let sibling = Node::new(&ctx);
        let outcome = Arc::new(Mutex::new(None));
        let child = Node::with_hooks(
            &ctx,
            SiblingRemover {
                sibling: Arc::clone(&sibling),
                outcome: Arc::clone(&outcome),
            },
        );
        root.add_child(&sibling, 0, 0).unwrap();
        root.add_child(&child, 1, 0).unwrap();

        root.on_enter();

        assert_eq!(
            outcome.lock().take(),
            Some(Err(TreeError::ChildrenLocked))
        );
        assert_eq!(root.child_count(), 2);
    }

    type Mutation = Box<dyn Fn(&Node) -> Result<(), TreeError> + Send + Sync>;

    /// Runs a structural mutation on the new parent from the attach hook
    struct AttachMutator {
        mutate: Mutation,
        outcome: Arc<Mutex<Option<Result<(), TreeError>>>>,
    }

    impl NodeHooks for AttachMutator {
        fn on_attach_to_parent(&self, _node: &Node, parent: &Node) {
            *self.outcome.lock() = Some((self.mutate)(parent));
        }
    }

    fn attach_mutator(
        ctx: &Arc<SceneContext>,
        mutate: Mutation,
    ) -> (Arc<Node>, Arc<Mutex<Option<Result<(), TreeError>>>>) {
        let outcome = Arc::new(Mutex::new(None));
        let node = Node::with_hooks(
            ctx,
            AttachMutator {
                mutate,
                outcome: Arc::clone(&outcome),
            },
        );
        (node, outcome)
    }

    #[test]
    fn test_add_child_during_add_is_rejected() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let extra = Node::new(&ctx);
        let extra_ref = Arc::clone(&extra);
        let (child, outcome) = attach_mutator(
            &ctx,
            Box::new(move |parent: &Node| parent.add_child(&extra_ref, 0, 7).map(|_| ())),
        );

        root.add_child(&child, 1, 0).unwrap();

        assert_eq!(
            outcome.lock().take(),
            Some(Err(TreeError::MutationInProgress))
        );
        assert_eq!(root.child_count(), 1);
        assert!(Arc::ptr_eq(&root.first_child().unwrap(), &child));
        assert!(extra.parent().is_none());
        assert_eq!(extra.tag(), INVALID_TAG);
        assert!(!root.is_mutating());
    }

    #[test]
    fn test_remove_all_during_add_is_rejected() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let kept = Node::new(&ctx);
        root.add_child(&kept, 0, 0).unwrap();
        let (child, outcome) =
            attach_mutator(&ctx, Box::new(|parent: &Node| parent.remove_all_children(true)));

        root.add_child(&child, 1, 0).unwrap();

        assert_eq!(
            outcome.lock().take(),
            Some(Err(TreeError::MutationInProgress))
        );
        assert_eq!(root.child_count(), 2);
        assert!(Arc::ptr_eq(&kept.parent().unwrap(), &root));
        assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
        assert!(!root.is_mutating());

        // The guard is free again once the outer mutation returns
        root.remove_all_children(true).unwrap();
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_on_enter_is_idempotent() {
        let (ctx, recorder) = recording_context();
        let node = Node::new(&ctx);
        node.set_touch_enabled(true);
        node.set_key_enabled(true);

        node.on_enter();
        node.on_enter();

        assert!(node.is_running());
        assert_eq!(recorder.handler_adds(InputCategory::Touch), 1);
        assert_eq!(recorder.handler_adds(InputCategory::Key), 1);
        assert_eq!(recorder.handler_adds(InputCategory::Gesture), 0);
        assert_eq!(recorder.action_resumes(), 1);

        node.on_exit();
        node.on_exit();
        assert!(!node.is_running());
        assert_eq!(recorder.handler_removes(InputCategory::Touch), 1);
        assert_eq!(recorder.action_pauses(), 1);
    }

    #[test]
    fn test_lifecycle_propagates_to_subtree() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let child = Node::new(&ctx);
        let grandchild = Node::new(&ctx);
        child.add_child(&grandchild, 0, 0).unwrap();

        root.on_enter();
        root.add_child(&child, 0, 0).unwrap();
        assert!(child.is_running());
        assert!(grandchild.is_running());

        root.remove_child(&child, false).unwrap();
        assert!(!child.is_running());
        assert!(!grandchild.is_running());
    }

    #[test]
    fn test_remove_all_children() {
        let (ctx, recorder) = recording_context();
        let root = Node::new(&ctx);
        let children: Vec<_> = (0..3).map(|_| Node::new(&ctx)).collect();
        for child in &children {
            root.add_child(child, 0, 0).unwrap();
        }
        root.on_enter();

        root.remove_all_children(true).unwrap();
        assert_eq!(root.child_count(), 0);
        for child in &children {
            assert!(child.parent().is_none());
            assert!(!child.is_running());
            assert_eq!(Arc::strong_count(child), 1);
        }
        assert_eq!(recorder.action_removals(), 3);
    }

    #[test]
    fn test_locked_variants() {
        let (ctx, _) = recording_context();
        let root = Node::new(&ctx);
        let other = Node::new(&ctx);
        let a = Node::new(&ctx);
        let b = Node::new(&ctx);
        let c = Node::new(&ctx);

        root.add_child_locked(&a, 0, 7).unwrap();
        root.add_child_locked(&b, 1, 7).unwrap();
        root.add_child_locked(&c, 2, 8).unwrap();

        assert!(other.remove_child_locked(&a, true).is_err());
        assert_eq!(root.child_count(), 3);

        assert_eq!(root.children_by_tag_locked(7).len(), 2);
        assert_eq!(root.remove_children_by_tag_locked(7, true).unwrap(), 2);
        assert_eq!(root.child_count(), 1);

        root.remove_child_by_tag_locked(8, true).unwrap();
        assert!(root.child_by_tag_locked(8).is_none());
    }

    #[test]
    fn test_cleanup_recurses_regardless_of_running_state() {
        let (ctx, recorder) = recording_context();
        let root = Node::new(&ctx);
        let child = Node::new(&ctx);
        root.add_child(&child, 0, 0).unwrap();

        root.cleanup();
        assert_eq!(recorder.action_removals(), 2);
    }
}
