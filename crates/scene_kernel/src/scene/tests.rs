//! Structural mutation tests

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::config::IdRange;

type Log = Rc<RefCell<Vec<String>>>;

/// Records lifecycle hooks as "<event>:<name>"
struct Witness {
    name: &'static str,
    log: Log,
}

impl Witness {
    fn node(name: &'static str, log: &Log) -> Node {
        Node::new(Self {
            name,
            log: Rc::clone(log),
        })
    }
}

impl Behavior for Witness {
    fn on_attached(&mut self, _ctx: &mut NodeContext<'_>) {
        self.log.borrow_mut().push(format!("attached:{}", self.name));
    }

    fn on_detached(&mut self, ctx: &mut NodeContext<'_>) {
        assert!(!ctx.scene().contains(ctx.id()), "hook runs after detachment");
        self.log.borrow_mut().push(format!("detached:{}", self.name));
    }

    fn on_moved(&mut self, _ctx: &mut NodeContext<'_>, old_parent: NodeId, new_parent: NodeId) {
        self.log
            .borrow_mut()
            .push(format!("moved:{}:{}->{}", self.name, old_parent.raw(), new_parent.raw()));
    }
}

fn scene() -> Scene {
    Scene::new(IdRange::new(1, 1000))
}

fn added(pending: &mut Pending<NodeId>) -> NodeId {
    match pending.result() {
        Some(Ok(id)) => id,
        other => panic!("add did not succeed: {other:?}"),
    }
}

#[test]
fn test_new_scene_has_only_root() {
    let scene = scene();
    assert_eq!(scene.len(), 1);
    assert!(scene.is_empty());
    assert_eq!(scene.parent(ROOT_ID), None);
    assert_eq!(scene.query::<&str>(&[], QueryMode::Inclusive), vec![ROOT_ID]);
}

#[test]
fn test_requests_resolve_only_at_application() {
    let mut scene = scene();
    let mut pending = scene.add(Node::group(), ROOT_ID);
    assert!(!pending.is_resolved());
    assert!(scene.has_pending_mutations());
    assert_eq!(scene.len(), 1);

    let report = scene.apply_mutations();
    assert_eq!(report.added, 1);
    assert!(pending.is_resolved());
    assert!(!scene.has_pending_mutations());
    assert_eq!(scene.len(), 2);
}

#[test]
fn test_declared_subtree_attaches_depth_first() {
    let log: Log = Rc::default();
    let mut scene = scene();
    let mut pending = scene.add(
        Witness::node("a", &log)
            .with_child(Witness::node("b", &log).with_child(Witness::node("c", &log)))
            .with_child(Witness::node("d", &log)),
        ROOT_ID,
    );
    scene.apply_mutations();

    let a = added(&mut pending);
    let children = scene.children(a).unwrap().to_vec();
    assert_eq!(children.len(), 2);
    let (b, d) = (children[0], children[1]);
    let c = scene.children(b).unwrap()[0];

    assert_eq!(scene.parent(b), Some(a));
    assert_eq!(scene.parent(c), Some(b));
    assert_eq!(scene.parent(d), Some(a));
    // Allocation follows the same depth-first walk
    assert_eq!([a, b, c, d].map(NodeId::raw), [1, 2, 3, 4]);
    assert_eq!(
        *log.borrow(),
        vec!["attached:a", "attached:b", "attached:c", "attached:d"]
    );
}

#[test]
fn test_hooks_fire_after_subtree_is_complete() {
    struct CountOnAttach {
        seen: Rc<RefCell<Vec<usize>>>,
    }

    impl Behavior for CountOnAttach {
        fn on_attached(&mut self, ctx: &mut NodeContext<'_>) {
            self.seen.borrow_mut().push(ctx.scene().len());
        }
    }

    let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
    let mut scene = scene();
    let _ = scene.add(
        Node::new(CountOnAttach { seen: Rc::clone(&seen) })
            .with_child(Node::new(CountOnAttach { seen: Rc::clone(&seen) })),
        ROOT_ID,
    );
    scene.apply_mutations();

    // Every hook sees root + both new nodes
    assert_eq!(*seen.borrow(), vec![3, 3]);
}

#[test]
fn test_pending_ticket_as_parent_in_same_batch() {
    let mut scene = scene();
    let mut parent = scene.add(Node::group().with_tag("parent"), ROOT_ID);
    let ticket = parent.ticket().unwrap();
    let mut child = scene.add(Node::group().with_tag("child"), ticket);
    scene.apply_mutations();

    let parent_id = added(&mut parent);
    let child_id = added(&mut child);
    assert_eq!(scene.parent(child_id), Some(parent_id));
}

#[test]
fn test_ticket_of_later_add_is_not_found() {
    let mut scene = scene();
    let mut placeholder = scene.add(Node::group(), NodeId::new(999));
    let ticket = placeholder.ticket().unwrap();
    let mut child = scene.add(Node::group(), ticket);
    scene.apply_mutations();

    assert_eq!(
        placeholder.result(),
        Some(Err(MutationError::ParentNotFound(ParentRef::Node(NodeId::new(999)))))
    );
    assert_eq!(
        child.result(),
        Some(Err(MutationError::ParentNotFound(ParentRef::Pending(ticket))))
    );
    assert_eq!(scene.len(), 1);
}

#[test]
fn test_add_under_missing_parent_leaves_ids_free() {
    let mut scene = Scene::new(IdRange::new(1, 2));
    let mut rejected = scene.add(Node::group().with_child(Node::group()), NodeId::new(50));
    scene.apply_mutations();
    assert!(matches!(rejected.result(), Some(Err(MutationError::ParentNotFound(_)))));

    // Both identities are still available
    let mut ok = scene.add(Node::group().with_child(Node::group()), ROOT_ID);
    scene.apply_mutations();
    assert_eq!(added(&mut ok), NodeId::new(1));
}

#[test]
fn test_identity_exhaustion_and_reuse() {
    let mut scene = Scene::new(IdRange::new(1, 3));
    let mut handles: Vec<_> = (0..3).map(|_| scene.add(Node::group(), ROOT_ID)).collect();
    scene.apply_mutations();
    let ids: Vec<NodeId> = handles.iter_mut().map(added).collect();
    assert_eq!(ids.iter().map(|id| id.raw()).collect::<Vec<_>>(), vec![1, 2, 3]);

    let mut fourth = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    assert_eq!(
        fourth.result(),
        Some(Err(MutationError::ExhaustedIdentitySpace { min: 1, max: 3 }))
    );

    let _ = scene.remove(NodeId::new(2));
    scene.apply_mutations();
    let mut reused = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    assert_eq!(added(&mut reused), NodeId::new(2));
}

#[test]
fn test_partial_exhaustion_rejects_whole_subtree() {
    let mut scene = Scene::new(IdRange::new(1, 2));
    let mut too_big = scene.add(
        Node::group().with_child(Node::group()).with_child(Node::group()),
        ROOT_ID,
    );
    scene.apply_mutations();
    assert!(matches!(
        too_big.result(),
        Some(Err(MutationError::ExhaustedIdentitySpace { .. }))
    ));
    assert_eq!(scene.len(), 1);
    assert_eq!(scene.ids.used(), 1);
}

#[test]
fn test_explicit_identity_collision() {
    let mut scene = scene();
    let mut first = scene.add(Node::group().with_id(NodeId::new(42)), ROOT_ID);
    let mut second = scene.add(Node::group().with_id(NodeId::new(42)), ROOT_ID);
    scene.apply_mutations();

    assert_eq!(added(&mut first), NodeId::new(42));
    assert_eq!(
        second.result(),
        Some(Err(MutationError::AlreadyAttached(NodeId::new(42))))
    );
}

#[test]
fn test_remove_detaches_subtree_post_order() {
    let log: Log = Rc::default();
    let mut scene = scene();
    let mut a = scene.add(
        Witness::node("a", &log)
            .with_tag("x")
            .with_child(Witness::node("b", &log).with_tag("y").with_child(Witness::node("c", &log)))
            .with_child(Witness::node("d", &log).with_tag("x")),
        ROOT_ID,
    );
    scene.apply_mutations();
    let a = added(&mut a);
    log.borrow_mut().clear();

    let mut removal = scene.remove(a);
    let report = scene.apply_mutations();

    assert_eq!(report.removed, 1);
    assert_eq!(removal.result(), Some(Ok(())));
    assert_eq!(
        *log.borrow(),
        vec!["detached:c", "detached:b", "detached:d", "detached:a"]
    );
    assert!(scene.is_empty());
    assert!(scene.children(ROOT_ID).unwrap().is_empty());
    assert!(scene.query(&["x"], QueryMode::Inclusive).is_empty());
    assert!(scene.query(&["y"], QueryMode::Inclusive).is_empty());
    assert_eq!(scene.tag_index().tag_count(), 0);
}

#[test]
fn test_double_removal() {
    let mut scene = scene();
    let mut node = scene.add(Node::group().with_child(Node::group()), ROOT_ID);
    scene.apply_mutations();
    let parent = added(&mut node);
    let child = scene.children(parent).unwrap()[0];

    // Same node twice in one batch shares one outcome
    let mut first = scene.remove(parent);
    let mut again = scene.remove(parent);
    // Descendant removed implicitly by the ancestor's removal
    let mut child_removal = scene.remove(child);
    scene.apply_mutations();

    assert_eq!(first.result(), Some(Ok(())));
    assert_eq!(again.result(), Some(Ok(())));
    assert_eq!(child_removal.result(), Some(Err(MutationError::AlreadyRemoved(child))));

    let mut later = scene.remove(parent);
    scene.apply_mutations();
    assert_eq!(later.result(), Some(Err(MutationError::AlreadyRemoved(parent))));
}

#[test]
fn test_root_is_protected() {
    let mut scene = scene();
    let mut child = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let child = added(&mut child);

    let mut removal = scene.remove(ROOT_ID);
    let mut reparent = scene.move_to(ROOT_ID, child);
    assert!(!removal.is_resolved());
    let report = scene.apply_mutations();

    assert_eq!(report.rejected, 2);
    assert_eq!(removal.result(), Some(Err(MutationError::RootMutationForbidden)));
    assert_eq!(reparent.result(), Some(Err(MutationError::RootMutationForbidden)));
    assert!(scene.contains(ROOT_ID));
    assert_eq!(scene.parent(ROOT_ID), None);
}

#[test]
fn test_move_reparents_and_keeps_identity_and_tags() {
    let log: Log = Rc::default();
    let mut scene = scene();
    let mut a = scene.add(Witness::node("a", &log), ROOT_ID);
    let mut b = scene.add(Witness::node("b", &log).with_tag("ship"), ROOT_ID);
    scene.apply_mutations();
    let (a, b) = (added(&mut a), added(&mut b));
    log.borrow_mut().clear();

    let mut moved = scene.move_to(b, a);
    scene.apply_mutations();

    assert_eq!(moved.result(), Some(Ok(())));
    assert_eq!(scene.parent(b), Some(a));
    assert_eq!(scene.children(a), Some(&[b][..]));
    assert_eq!(scene.children(ROOT_ID), Some(&[a][..]));
    assert_eq!(scene.query(&["ship"], QueryMode::Inclusive), vec![b]);
    assert_eq!(*log.borrow(), vec![format!("moved:b:0->{}", a.raw())]);
}

#[test]
fn test_move_failures() {
    let mut scene = scene();
    let mut a = scene.add(Node::group().with_child(Node::group()), ROOT_ID);
    let mut b = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let (a, b) = (added(&mut a), added(&mut b));
    let child = scene.children(a).unwrap()[0];

    let mut missing_node = scene.move_to(NodeId::new(77), a);
    let mut missing_parent = scene.move_to(b, NodeId::new(78));
    let mut cyclic = scene.move_to(a, child);
    scene.apply_mutations();

    assert_eq!(missing_node.result(), Some(Err(MutationError::NotFound(NodeId::new(77)))));
    assert_eq!(missing_parent.result(), Some(Err(MutationError::NotFound(NodeId::new(78)))));
    assert_eq!(
        cyclic.result(),
        Some(Err(MutationError::CyclicMove { node: a, parent: child }))
    );
    assert_eq!(scene.parent(child), Some(a));
    assert_eq!(scene.parent(a), Some(ROOT_ID));
    assert_eq!(scene.parent(b), Some(ROOT_ID));
}

#[test]
fn test_move_after_remove_is_rejected_and_node_still_removed() {
    let mut scene = scene();
    let mut a = scene.add(Node::group(), ROOT_ID);
    let mut b = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let (a, b) = (added(&mut a), added(&mut b));

    let mut removal = scene.remove(a);
    let mut movement = scene.move_to(a, b);
    scene.apply_mutations();

    assert_eq!(movement.result(), Some(Err(MutationError::ScheduledForRemoval(a))));
    assert_eq!(removal.result(), Some(Ok(())));
    assert!(!scene.contains(a));
    assert!(scene.children(b).unwrap().is_empty());
}

#[test]
fn test_remove_after_move_cancels_the_move() {
    let mut scene = scene();
    let mut a = scene.add(Node::group(), ROOT_ID);
    let mut b = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let (a, b) = (added(&mut a), added(&mut b));

    let mut movement = scene.move_to(a, b);
    let mut removal = scene.remove(a);
    scene.apply_mutations();

    assert_eq!(movement.result(), Some(Err(MutationError::ScheduledForRemoval(a))));
    assert_eq!(removal.result(), Some(Ok(())));
    assert!(!scene.contains(a));
}

#[test]
fn test_move_inside_subtree_queued_for_removal() {
    let mut scene = scene();
    let mut a = scene.add(Node::group().with_child(Node::group()), ROOT_ID);
    let mut b = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let (a, b) = (added(&mut a), added(&mut b));
    let child = scene.children(a).unwrap()[0];

    let _ = scene.remove(a);
    let mut movement = scene.move_to(child, b);
    scene.apply_mutations();

    assert_eq!(movement.result(), Some(Err(MutationError::ScheduledForRemoval(child))));
    assert!(!scene.contains(child));
    assert!(scene.children(b).unwrap().is_empty());
}

#[test]
fn test_ancestor_removal_after_move_rejects_the_move() {
    let mut scene = scene();
    let mut a = scene.add(Node::group().with_child(Node::group()), ROOT_ID);
    let mut b = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let (a, b) = (added(&mut a), added(&mut b));
    let child = scene.children(a).unwrap()[0];

    let mut movement = scene.move_to(child, b);
    let mut removal = scene.remove(a);
    let report = scene.apply_mutations();

    assert_eq!(movement.result(), Some(Err(MutationError::ScheduledForRemoval(child))));
    assert_eq!(removal.result(), Some(Ok(())));
    assert_eq!(report.moved, 0);
    assert!(!scene.contains(child));
}

#[test]
fn test_second_move_retargets() {
    let mut scene = scene();
    let handles: Vec<_> = (0..3).map(|_| scene.add(Node::group(), ROOT_ID)).collect();
    scene.apply_mutations();
    let ids: Vec<NodeId> = handles.into_iter().map(|mut h| added(&mut h)).collect();

    let mut first = scene.move_to(ids[0], ids[1]);
    let mut second = scene.move_to(ids[0], ids[2]);
    let report = scene.apply_mutations();

    assert_eq!(report.moved, 1);
    assert_eq!(first.result(), Some(Ok(())));
    assert_eq!(second.result(), Some(Ok(())));
    assert_eq!(scene.parent(ids[0]), Some(ids[2]));
}

#[test]
fn test_removes_apply_before_adds() {
    let mut scene = scene();
    let mut parent = scene.add(Node::group(), ROOT_ID);
    scene.apply_mutations();
    let parent = added(&mut parent);

    // Requested add first, remove second: the remove still wins
    let mut orphan = scene.add(Node::group(), parent);
    let _ = scene.remove(parent);
    scene.apply_mutations();

    assert_eq!(
        orphan.result(),
        Some(Err(MutationError::ParentNotFound(ParentRef::Node(parent))))
    );
    assert!(scene.is_empty());
}

#[test]
fn test_remove_and_readd_same_tag_does_not_double_count() {
    let mut scene = Scene::new(IdRange::new(1, 1));
    let mut first = scene.add(Node::group().with_tag("enemy"), ROOT_ID);
    scene.apply_mutations();
    let first = added(&mut first);

    let _ = scene.remove(first);
    let mut second = scene.add(Node::group().with_tag("enemy"), ROOT_ID);
    scene.apply_mutations();

    // The single identity is freed by the remove and reused by the add
    assert_eq!(added(&mut second), first);
    assert_eq!(scene.query(&["enemy"], QueryMode::Inclusive), vec![first]);
}

#[test]
fn test_instance_tags_track_index() {
    let mut scene = scene();
    let mut node = scene.add(Node::group().with_tag("a"), ROOT_ID);
    scene.apply_mutations();
    let node = added(&mut node);

    assert!(scene.add_tags(node, &["b", "a"]));
    assert_eq!(scene.query(&["a", "b"], QueryMode::Exclusive), vec![node]);

    assert!(scene.remove_tags(node, &["a"]));
    assert!(!scene.tags(node).unwrap().contains("a"));
    assert!(!scene.tag_index().contains_tag("a"));

    assert!(!scene.add_tags(NodeId::new(500), &["ghost"]));
    assert!(!scene.tag_index().contains_tag("ghost"));
}

#[test]
fn test_class_tags_are_registered() {
    struct Asteroid;

    impl Behavior for Asteroid {
        fn class_tags(&self) -> &'static [&'static str] {
            &["asteroid", "collidable"]
        }
    }

    let mut scene = scene();
    let mut rock = scene.add(Node::new(Asteroid).with_tag("large"), ROOT_ID);
    scene.apply_mutations();
    let rock = added(&mut rock);

    assert_eq!(
        scene.query(&["asteroid", "collidable", "large"], QueryMode::Exclusive),
        vec![rock]
    );
}

#[test]
fn test_class_tags_survive_tag_removal() {
    struct Lamp;

    impl Behavior for Lamp {
        fn class_tags(&self) -> &'static [&'static str] {
            &["light"]
        }
    }

    let mut scene = scene();
    let mut lamp = scene.add(Node::new(Lamp).with_tag("porch"), ROOT_ID);
    scene.apply_mutations();
    let lamp = added(&mut lamp);

    assert!(scene.remove_tags(lamp, &["light", "porch"]));

    assert!(scene.tags(lamp).unwrap().contains("light"));
    assert!(!scene.tags(lamp).unwrap().contains("porch"));
    assert_eq!(scene.query(&["light"], QueryMode::Inclusive), vec![lamp]);
    assert!(!scene.tag_index().contains_tag("porch"));
}

#[test]
fn test_hook_requests_land_in_next_batch() {
    struct Spawner;

    impl Behavior for Spawner {
        fn on_attached(&mut self, ctx: &mut NodeContext<'_>) {
            let _ = ctx.add_child(Node::group().with_tag("spawned"));
        }
    }

    let mut scene = scene();
    let _ = scene.add(Node::new(Spawner), ROOT_ID);
    scene.apply_mutations();
    assert!(scene.query(&["spawned"], QueryMode::Inclusive).is_empty());
    assert!(scene.has_pending_mutations());

    scene.apply_mutations();
    assert_eq!(scene.query(&["spawned"], QueryMode::Inclusive).len(), 1);
}

#[test]
fn test_end_to_end_tag_scenario() {
    let mut scene = scene();
    let mut a = scene.add(Node::group().with_tag("x"), ROOT_ID);
    let mut b = scene.add(
        Node::group().with_tag("x").with_child(Node::group().with_tag("y")),
        a.ticket().unwrap(),
    );
    scene.apply_mutations();

    let a = added(&mut a);
    let b = added(&mut b);
    let c = scene.children(b).unwrap()[0];
    assert_eq!(scene.query(&["x"], QueryMode::Inclusive), vec![a, b]);
    assert_eq!(scene.query(&["y"], QueryMode::Inclusive), vec![c]);

    let _ = scene.remove(a);
    scene.apply_mutations();
    assert!(!scene.tag_index().contains_tag("x"));
    assert!(!scene.tag_index().contains_tag("y"));
}
