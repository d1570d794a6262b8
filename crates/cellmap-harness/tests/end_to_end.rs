#![forbid(unsafe_code)]

//! Integration tests: attach, reconcile, style, roles, parts, and overlays
//! through the public binder API.

use cellmap_core::{Binder, CounterSpec, MapperId, MappingError, Point, Rect, TargetId};
use cellmap_harness::domain::{
    self, ExprFactory, binop, call, formula, hole, ident, label, module, number, tooltip,
};
use cellmap_harness::trace_capture::TraceCapture;
use cellmap_harness::{assert_outline, content_outline, overlay_outline};
use cellmap_model::{Color, ListEvent, Node, PopupSlot, Value, props};

fn mapper_of(binder: &Binder, node: &Node) -> MapperId {
    binder.mappers_for(node)[0]
}

fn target_of(binder: &Binder, node: &Node) -> TargetId {
    binder
        .mapper(mapper_of(binder, node))
        .expect("mapper attached")
        .target
}

fn root_children(binder: &Binder) -> Vec<TargetId> {
    let root = binder.root_target().expect("attached");
    binder.with_targets(|t| t.children(root).to_vec())
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn three_level_tree_attach_and_remove_mid_child() {
    let grandchild = number(1);
    let first = module([grandchild.clone()]);
    let second = ident("x");
    let root = module([first.clone(), second.clone()]);

    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    assert_eq!(binder.mapper_count(), 4);
    assert_eq!(binder.with_context(|c| c.len()), 4);
    assert_outline!(
        content_outline(&binder),
        "
        block
          block
            token text=1
          token text=x
        "
    );

    let first_mapper = mapper_of(&binder, &first);
    let grandchild_mapper = mapper_of(&binder, &grandchild);
    root.remove_child(0);

    assert_eq!(binder.with_context(|c| c.len()), 2);
    assert!(binder.mapper(first_mapper).is_none());
    assert!(binder.mapper(grandchild_mapper).is_none());
    assert!(binder.mappers_for(&grandchild).is_empty());
    assert_eq!(root_children(&binder).len(), 1);
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=x
        "
    );
    assert!(binder.take_faults().is_empty());
}

#[test]
fn insertion_creates_one_mapper_and_keeps_siblings() {
    let root = module((0..5).map(number));
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    let before = root_children(&binder);

    root.insert_child(2, number(42));

    let after = root_children(&binder);
    assert_eq!(binder.mapper_count(), 7);
    assert_eq!(after.len(), 6);
    assert_eq!(&after[..2], &before[..2]);
    assert_eq!(&after[3..], &before[2..]);
    assert!(!before.contains(&after[2]));
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=0
          token text=1
          token text=42
          token text=2
          token text=3
          token text=4
        "
    );
}

#[test]
fn replacing_a_child_swaps_its_mapper() {
    let root = module([number(1), number(2)]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    let old = root.children().get(1).expect("second child");
    let old_mapper = mapper_of(&binder, &old);

    root.children().set(1, ident("y"));

    assert!(binder.mapper(old_mapper).is_none());
    assert_eq!(binder.mapper_count(), 3);
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=1
          token text=y
        "
    );
}

#[test]
fn failed_attach_leaves_nothing_behind() {
    let root = module([number(1), binop("+", number(2), hole())]);
    let binder = Binder::new(ExprFactory);

    let err = binder.attach(&root).unwrap_err();
    assert!(matches!(err, MappingError::NoMapper { ref kind, .. } if kind == "hole"));
    assert_eq!(binder.mapper_count(), 0);
    assert_eq!(binder.live_subscriptions(), 0);
    assert!(!binder.is_attached());
    assert_eq!(root.children().subscriber_count(), 0);
    assert_eq!(binder.with_targets(|t| t.len()), 1);

    // The binder stays usable.
    root.remove_child(1);
    binder.attach(&root).expect("attach after fix");
    assert_eq!(binder.mapper_count(), 2);
}

#[test]
#[should_panic(expected = "no mapper for node")]
fn reactive_insert_of_unmapped_kind_panics() {
    let root = module([number(1)]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    root.push_child(hole());
}

#[test]
fn domain_reaction_inserting_into_the_same_list_keeps_order() {
    let root = module(Vec::new());
    let trigger = ident("trigger");
    let children = root.children();
    let watched = trigger.clone();
    // Registered before the binder, so it sees every event first.
    let _reaction = root.children().subscribe(move |event| {
        if let ListEvent::Added { item, .. } = event
            && *item == watched
        {
            children.insert(0, ident("echo"));
        }
    });

    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    root.push_child(trigger);

    let source: Vec<String> = root
        .children()
        .to_vec()
        .iter()
        .map(|n| n.get(&props::TEXT).to_string())
        .collect();
    assert_eq!(source, vec!["echo", "trigger"]);
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=echo
          token text=trigger
        "
    );
    assert_eq!(binder.mapper_count(), 3);
    assert!(binder.take_faults().is_empty());
}

#[test]
fn detach_releases_every_subscription() {
    let leaf = number(7);
    let root = module([binop("*", leaf.clone(), ident("k"))]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");
    assert!(binder.live_subscriptions() > 0);
    assert!(leaf.property(&props::TEXT).subscriber_count() > 0);

    assert!(binder.detach());
    assert_eq!(binder.live_subscriptions(), 0);
    assert_eq!(binder.mapper_count(), 0);
    assert_eq!(leaf.property(&props::TEXT).subscriber_count(), 0);
    assert_eq!(root.children().subscriber_count(), 0);
    assert_eq!(binder.with_targets(|t| t.len()), 1);

    // Mutations after detach are not observed.
    root.push_child(number(8));
    assert_eq!(binder.mapper_count(), 0);
}

#[test]
fn attach_emits_debug_events() {
    let capture = TraceCapture::new();
    capture.run(|| {
        let binder = Binder::new(ExprFactory);
        binder.attach(&module([number(1)])).expect("attach");
        binder.detach();
    });
    assert!(capture.contains("root attached"));
    assert!(capture.contains("root detached"));
    assert_eq!(capture.count(tracing::Level::ERROR), 0);
}

// ============================================================================
// Property mirrors
// ============================================================================

#[test]
fn property_changes_reach_target_attributes() {
    let x = ident("x");
    let expr = binop("+", x.clone(), number(1));
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([expr.clone()])).expect("attach");

    x.set(&props::TEXT, "renamed");
    expr.set(&domain::OP, "-");
    assert_outline!(
        content_outline(&binder),
        "
        block
          infix op=-
            token text=renamed
            token text=1
        "
    );
}

#[test]
fn two_way_mirror_writes_back_to_source() {
    let tagged = label("hello", "t1");
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([tagged.clone()])).expect("attach");
    let target = target_of(&binder, &tagged);

    assert!(
        binder
            .set_target_attribute(target, "text", "bye")
            .expect("write")
    );
    assert_eq!(tagged.get(&props::TEXT), Value::from("bye"));
    assert!(
        !binder
            .set_target_attribute(target, "text", "bye")
            .expect("write")
    );

    // One-way mirrors leave the source alone.
    let token = number(3);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([token.clone()])).expect("attach");
    let target = target_of(&binder, &token);
    binder
        .set_target_attribute(target, "text", "99")
        .expect("write");
    assert_eq!(token.get(&props::TEXT), Value::from("3"));
}

#[test]
fn attribute_write_to_unknown_target_is_an_error() {
    let binder = Binder::new(ExprFactory);
    let stale = root_target_after_attach(&binder);
    assert!(
        binder
            .set_target_attribute(stale, "x", 1i64)
            .expect("live target")
    );
    binder.detach();
    assert_eq!(
        binder.set_target_attribute(stale, "x", 1i64),
        Err(MappingError::UnknownTarget(stale))
    );
}

fn root_target_after_attach(binder: &Binder) -> TargetId {
    binder.attach(&module(Vec::new())).expect("attach");
    binder.root_target().expect("root target")
}

// ============================================================================
// Style derivation
// ============================================================================

#[test]
fn counters_drive_selection_and_restore_exactly() {
    let leaf = number(1);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([leaf.clone()])).expect("attach");
    let mapper = mapper_of(&binder, &leaf);
    let target = target_of(&binder, &leaf);
    let initial = binder.with_targets(|t| t.get(target).map(|n| n.style()));

    binder
        .change_counter(mapper, CounterSpec::SELECT_COUNT, 1)
        .expect("raise");
    binder
        .change_counter(mapper, CounterSpec::SELECT_COUNT, 1)
        .expect("raise again");
    binder
        .change_counter(mapper, CounterSpec::SELECT_COUNT, -1)
        .expect("release");
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=1 {bg=#add8e6}
        "
    );

    binder
        .change_counter(mapper, CounterSpec::SELECT_COUNT, -1)
        .expect("release");
    assert_eq!(
        binder.with_targets(|t| t.get(target).map(|n| n.style())),
        initial
    );

    let err = binder
        .change_counter(mapper, CounterSpec::SELECT_COUNT, -1)
        .unwrap_err();
    assert!(matches!(err, MappingError::CounterUnderflow { value: 0, delta: -1, .. }));
    assert_eq!(binder.counter(mapper, CounterSpec::SELECT_COUNT), 0);
}

#[test]
fn focus_highlight_differs_for_leaves_and_composites() {
    let leaf = number(1);
    let group = binop("+", leaf.clone(), number(2));
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([group.clone()])).expect("attach");

    leaf.set(&props::FOCUS_HIGHLIGHTED, true);
    group.set(&props::FOCUS_HIGHLIGHTED, true);
    assert_outline!(
        content_outline(&binder),
        "
        block
          infix op=+ {bg=#add8e6}
            token text=1 {bg=#d3d3d3}
            token text=2
        "
    );

    let group_mapper = mapper_of(&binder, &group);
    group.set(&props::FOCUS_HIGHLIGHTED, false);
    binder
        .change_counter(group_mapper, CounterSpec::HIGHLIGHT_COUNT, 1)
        .expect("raise");
    let target = target_of(&binder, &group);
    let bg = binder.with_targets(|t| t.get(target).and_then(|n| n.style().background));
    assert_eq!(bg, Some(Color::LIGHT_BLUE));
}

#[test]
fn borders_visibility_and_shadow() {
    let leaf = ident("bad");
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([leaf.clone()])).expect("attach");

    leaf.set(&props::YELLOW_UNDERLINE, true);
    leaf.set(&props::RED_UNDERLINE, true);
    leaf.set(&props::VISIBLE, false);
    leaf.set(&props::HAS_SHADOW, true);
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=bad {border=#ff0000 hidden shadow}
        "
    );

    leaf.set(&props::RED_UNDERLINE, false);
    leaf.set(&props::VISIBLE, true);
    assert_outline!(
        content_outline(&binder),
        "
        block
          token text=bad {border=#ffff00 shadow}
        "
    );
}

#[test]
fn background_inherits_until_overridden() {
    let inner = module([number(1)]);
    let root = module([inner.clone(), number(2)]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&root).expect("attach");

    root.set(&props::BACKGROUND, Color::YELLOW);
    assert_outline!(
        content_outline(&binder),
        "
        block {bg=#ffff00}
          block {bg=#ffff00}
            token text=1 {bg=#ffff00}
          token text=2 {bg=#ffff00}
        "
    );

    inner.set(&props::BACKGROUND, Color::WHITE);
    root.set(&props::BACKGROUND, Value::None);
    assert_outline!(
        content_outline(&binder),
        "
        block
          block {bg=#ffffff}
            token text=1 {bg=#ffffff}
          token text=2
        "
    );

    // Children added later pick up the inherited background.
    inner.push_child(number(3));
    assert_outline!(
        content_outline(&binder),
        "
        block
          block {bg=#ffffff}
            token text=1 {bg=#ffffff}
            token text=3 {bg=#ffffff}
          token text=2
        "
    );
}

#[test]
fn refresh_is_idempotent() {
    let leaf = number(1);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([leaf.clone()])).expect("attach");
    let mapper = mapper_of(&binder, &leaf);
    leaf.set(&props::PAIR_HIGHLIGHTED, true);

    binder.refresh_properties(mapper).expect("refresh");
    let once = content_outline(&binder);
    binder.refresh_properties(mapper).expect("refresh");
    assert_eq!(content_outline(&binder), once);
    assert!(once.contains("{bg=#ededed}"));
}

// ============================================================================
// Roles and parts
// ============================================================================

#[test]
fn role_maps_arguments_into_container() {
    let f = call("f", [number(1), ident("a")]);
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([f.clone()])).expect("attach");
    assert_outline!(
        content_outline(&binder),
        "
        block
          call
            callee
            role:args
              token text=1
              token text=a
        "
    );

    f.push_child(number(2));
    f.remove_child(0);
    assert_outline!(
        content_outline(&binder),
        "
        block
          call
            callee
            role:args
              token text=a
              token text=2
        "
    );
    assert_eq!(binder.mapper_count(), 4);
}

#[test]
fn parts_render_without_child_mappers() {
    let tagged = label("hello", "t1");
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([tagged])).expect("attach");
    assert_outline!(
        content_outline(&binder),
        "
        block
          label text=hello
            tag
        "
    );
    assert_eq!(binder.mapper_count(), 2);
}

#[test]
fn opaque_nodes_hide_their_children() {
    let binder = Binder::new(ExprFactory);
    binder
        .attach(&module([formula([ident("x"), hole()])]))
        .expect("attach");
    assert_outline!(
        content_outline(&binder),
        "
        block
          image
        "
    );
}

// ============================================================================
// Overlays
// ============================================================================

#[test]
fn popups_follow_their_anchor() {
    let anchor = ident("a");
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([anchor.clone()])).expect("attach");
    let anchor_target = target_of(&binder, &anchor);

    let tip = tooltip("tip");
    anchor.set_popup(PopupSlot::Bottom, Some(tip.clone()));
    assert_outline!(
        overlay_outline(&binder),
        "
        overlay
          popup text=tip
        "
    );
    let tip_target = target_of(&binder, &tip);
    let position = |t: TargetId| binder.with_targets(|tree| tree.get(t).and_then(|n| n.position()));

    binder
        .set_bounds(anchor_target, Rect::new(10, 20, 30, 5))
        .expect("bounds");
    assert_eq!(position(tip_target), Some(Point::new(10, 25)));

    let side = tooltip("side");
    anchor.set_popup(PopupSlot::Left, Some(side.clone()));
    let side_target = target_of(&binder, &side);
    binder
        .set_bounds(side_target, Rect::new(0, 0, 8, 3))
        .expect("bounds");
    assert_eq!(position(side_target), Some(Point::new(2, 20)));

    binder
        .set_bounds(anchor_target, Rect::new(0, 0, 30, 5))
        .expect("bounds");
    assert_eq!(position(tip_target), Some(Point::new(0, 5)));
    assert_eq!(position(side_target), Some(Point::new(-8, 0)));

    anchor.set_popup(PopupSlot::Bottom, None);
    assert!(binder.mappers_for(&tip).is_empty());
    assert_outline!(
        overlay_outline(&binder),
        "
        overlay
          popup text=side
        "
    );

    // Removing the anchor takes its popups with it.
    let root = anchor.parent().expect("anchor has a parent");
    root.remove_child(0);
    assert_outline!(overlay_outline(&binder), "overlay");
}

#[test]
fn popups_present_at_attach_are_shown() {
    let anchor = ident("a");
    anchor.set_popup(PopupSlot::Front, Some(tooltip("early")));
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([anchor])).expect("attach");
    assert_outline!(
        overlay_outline(&binder),
        "
        overlay
          popup text=early
        "
    );
}

#[test]
fn popups_clamp_at_extreme_anchor_bounds() {
    let anchor = ident("edge");
    let tip = tooltip("far");
    anchor.set_popup(PopupSlot::Right, Some(tip.clone()));
    let binder = Binder::new(ExprFactory);
    binder.attach(&module([anchor.clone()])).expect("attach");

    binder
        .set_bounds(target_of(&binder, &anchor), Rect::new(i32::MAX - 5, 0, 10, 10))
        .expect("bounds");
    let tip_target = target_of(&binder, &tip);
    let position = binder.with_targets(|t| t.get(tip_target).and_then(|n| n.position()));
    assert_eq!(position, Some(Point::new(i32::MAX, 0)));
}

#[test]
fn bounds_for_unknown_target_are_rejected() {
    let binder = Binder::new(ExprFactory);
    let stale = root_target_after_attach(&binder);
    binder.detach();
    assert_eq!(
        binder.set_bounds(stale, Rect::new(0, 0, 1, 1)),
        Err(MappingError::UnknownTarget(stale))
    );
}
