use crate::iq_interpolation::block::{Branch, Child, Dimension, Operation, bracket_branch};
use crate::iq_interpolation::common::error::{InterpolationError, Result};
use crate::iq_interpolation::common::numeric::lerp;
use crate::iq_interpolation::tree::{
    Bracket, NodeStore, PayloadSlot, TreeLayout, TriggerRegion, build, reduce,
};

type Inner = Vec<(TriggerRegion, f32)>;

#[derive(Debug, Clone, Copy)]
enum Handle<'a> {
    Root,
    Outer(&'a Inner),
    Leaf,
}

struct Grid {
    outer: Vec<(TriggerRegion, Inner)>,
}

fn grid() -> Grid {
    Grid {
        outer: vec![
            (
                TriggerRegion::new(0.0, 10.0),
                vec![(TriggerRegion::new(0.0, 5.0), 1.0), (TriggerRegion::new(5.0, 10.0), 2.0)],
            ),
            (
                TriggerRegion::new(20.0, 30.0),
                vec![(TriggerRegion::new(0.0, 5.0), 3.0), (TriggerRegion::new(5.0, 10.0), 5.0)],
            ),
        ],
    }
}

const GRID_OPS: [Operation; 2] =
    [Operation::new(Dimension::Aec, 2), Operation::new(Dimension::Cct, 2)];

fn mix(a: &f32, b: &f32, ratio: f32, out: &mut f32) -> Result<()> {
    *out = lerp(*a, *b, ratio);
    Ok(())
}

fn grid_search<'a>(
    grid: &'a Grid,
    outer: f32,
    inner: f32,
) -> impl FnMut(&Operation, Handle<'a>) -> Result<Branch<'a, Handle<'a>, f32>> {
    move |operation, node| match node {
        Handle::Root => bracket_branch(
            operation.dimension,
            &grid.outer,
            outer,
            |entry| entry.0,
            |entry| Child::inner(Handle::Outer(&entry.1)),
        ),
        Handle::Outer(entries) => bracket_branch(
            operation.dimension,
            entries,
            inner,
            |entry| entry.0,
            |entry| Child::leaf(Handle::Leaf, &entry.1),
        ),
        Handle::Leaf => Err(InterpolationError::MalformedInput("search below leaf".to_string())),
    }
}

fn grid_result(outer: f32, inner: f32) -> Result<f32> {
    let grid = grid();
    let layout = TreeLayout::from_operations(&GRID_OPS)?;
    let mut store = NodeStore::new(&layout);
    store.set_root(Handle::Root);
    build(&mut store, &GRID_OPS, grid_search(&grid, outer, inner))?;
    reduce(&mut store, mix)?;
    store.root_payload().copied()
}

#[test]
fn test_two_dimension_gap_blends_outer_neighbours() {
    let grid = grid();
    let layout = TreeLayout::from_operations(&GRID_OPS).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(Handle::Root);

    build(&mut store, &GRID_OPS, grid_search(&grid, 15.0, 5.0)).unwrap();

    let root = store.node(0);
    assert_eq!(root.num_children, 2);
    assert_eq!(root.children[..2], [1, 2]);
    assert_eq!(root.ratios[0], 0.5);
    assert_eq!(store.node(1).num_children, 1);
    assert_eq!(store.node(1).children[0], 3);
    assert_eq!(store.node(2).children[0], 5);
    assert!(!store.node(4).is_valid);
    assert!(!store.node(6).is_valid);
    assert_eq!(store.nodes().iter().filter(|node| node.is_valid).count(), 5);

    reduce(&mut store, mix).unwrap();
    assert_eq!(*store.root_payload().unwrap(), 2.0);
    assert!(matches!(store.node(1).payload, PayloadSlot::Calibration(value) if *value == 1.0));
}

#[test]
fn test_inside_regions_select_single_leaf() {
    assert_eq!(grid_result(25.0, 8.0).unwrap(), 5.0);
    assert_eq!(grid_result(3.0, 2.0).unwrap(), 1.0);
}

#[test]
fn test_both_dimensions_in_gaps() {
    let grid = Grid {
        outer: vec![
            (
                TriggerRegion::new(0.0, 10.0),
                vec![(TriggerRegion::new(0.0, 2.0), 0.0), (TriggerRegion::new(4.0, 6.0), 4.0)],
            ),
            (
                TriggerRegion::new(20.0, 30.0),
                vec![(TriggerRegion::new(0.0, 2.0), 8.0), (TriggerRegion::new(4.0, 6.0), 16.0)],
            ),
        ],
    };
    let layout = TreeLayout::from_operations(&GRID_OPS).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(Handle::Root);
    build(&mut store, &GRID_OPS, grid_search(&grid, 12.5, 3.0)).unwrap();
    reduce(&mut store, mix).unwrap();

    // outer ratio 0.25, inner ratio 0.5: lerp(2, 12, 0.25)
    assert!((store.root_payload().unwrap() - 4.5).abs() < 1e-6);
}

fn rebuild<'a>(
    store: &mut NodeStore<'a, Handle<'a>, f32>,
    grid: &'a Grid,
    outer: f32,
    inner: f32,
) -> Result<f32> {
    build(store, &GRID_OPS, grid_search(grid, outer, inner))?;
    reduce(store, mix)?;
    store.root_payload().copied()
}

#[test]
fn test_store_rebuilds_after_reduce() {
    let grid = grid();
    let layout = TreeLayout::from_operations(&GRID_OPS).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(Handle::Root);


    // the first reduce points nodes 1 and 2 at their single leaves
    assert_eq!(rebuild(&mut store, &grid, 15.0, 1.0).unwrap(), 2.0);
    assert!(matches!(store.node(1).payload, PayloadSlot::Calibration(_)));

    assert_eq!(rebuild(&mut store, &grid, 15.0, 7.5).unwrap(), 3.5);

    assert_eq!(rebuild(&mut store, &grid, 3.0, 7.5).unwrap(), 2.0);
    assert!(!store.node(2).is_valid);
    assert!(!store.node(5).is_valid);
    assert_eq!(store.nodes().iter().filter(|node| node.is_valid).count(), 3);

    assert_eq!(rebuild(&mut store, &grid, 25.0, 2.0).unwrap(), 3.0);
    assert_eq!(store.node(0).num_children, 1);
}

#[test]
fn test_reduce_is_idempotent() {
    let grid = grid();
    let layout = TreeLayout::from_operations(&GRID_OPS).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(Handle::Root);
    build(&mut store, &GRID_OPS, grid_search(&grid, 17.0, 9.0)).unwrap();

    reduce(&mut store, mix).unwrap();
    let first = store.root_payload().unwrap().to_bits();
    reduce(&mut store, mix).unwrap();
    assert_eq!(store.root_payload().unwrap().to_bits(), first);
}

#[test]
fn test_root_single_child_copies_into_scratch() {
    let leaves = [(TriggerRegion::new(0.0, 10.0), 7.25f32)];
    let ops = [Operation::new(Dimension::Cct, 2)];
    let layout = TreeLayout::from_operations(&ops).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(());

    build(&mut store, &ops, |operation, _| {
        bracket_branch(operation.dimension, &leaves, 4.0, |entry| entry.0, |entry| {
            Child::leaf((), &entry.1)
        })
    })
    .unwrap();
    reduce(&mut store, mix).unwrap();

    assert!(matches!(store.node(0).payload, PayloadSlot::Scratch(0)));
    assert_eq!(store.root_payload().unwrap().to_bits(), 7.25f32.to_bits());
}

#[test]
fn test_three_children_merge_tail_first() {
    let sources = [0.0f32, 10.0, 20.0];
    let ops = [Operation::new(Dimension::Led, 3)];
    let layout = TreeLayout::from_operations(&ops).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(());

    build(&mut store, &ops, |_, _| {
        let mut branch = Branch::from_bracket(
            Bracket { start_index: 0, end_index: 1, ratio: 0.5 },
            |index| sources.get(index).map(|value| Child::leaf((), value)),
        )?;
        branch.push_blended(Child::leaf((), &sources[2]), 0.5)?;
        Ok(branch)
    })
    .unwrap();
    assert_eq!(store.node(0).ratios, [0.5, 0.5]);

    reduce(&mut store, mix).unwrap();

    let expected = lerp(sources[0], lerp(sources[1], sources[2], 0.5), 0.5);
    let other_order = lerp(lerp(sources[0], sources[1], 0.5), sources[2], 0.5);
    assert_eq!(*store.root_payload().unwrap(), expected);
    assert_ne!(expected, other_order);
}

#[test]
fn test_empty_search_is_structural_failure() {
    let ops = [Operation::new(Dimension::Aec, 2)];
    let layout = TreeLayout::from_operations(&ops).unwrap();
    let mut store: NodeStore<'_, (), f32> = NodeStore::new(&layout);
    store.set_root(());

    let err = build(&mut store, &ops, |_, _| Ok(Branch::new())).unwrap_err();
    assert!(matches!(err, InterpolationError::StructuralFailure { level: 0, node: 0, .. }));
}

#[test]
fn test_too_many_children_is_structural_failure() {
    let values = [1.0f32, 2.0, 3.0];
    let ops = [Operation::new(Dimension::Aec, 2)];
    let layout = TreeLayout::from_operations(&ops).unwrap();
    let mut store = NodeStore::new(&layout);
    store.set_root(());

    let err = build(&mut store, &ops, |_, _| {
        let mut branch = Branch::from_bracket(
            Bracket { start_index: 0, end_index: 1, ratio: 0.5 },
            |index| values.get(index).map(|value| Child::leaf((), value)),
        )?;
        branch.push_blended(Child::leaf((), &values[2]), 0.5)?;
        Ok(branch)
    })
    .unwrap_err();
    assert!(matches!(err, InterpolationError::StructuralFailure { level: 0, .. }));
}

#[test]
fn test_unseeded_root_is_malformed() {
    let layout = TreeLayout::from_operations(&GRID_OPS).unwrap();
    let grid = grid();
    let mut store = NodeStore::new(&layout);
    let err = build(&mut store, &GRID_OPS, grid_search(&grid, 1.0, 1.0)).unwrap_err();
    assert!(matches!(err, InterpolationError::MalformedInput(_)));
}

#[test]
fn test_leaf_without_payload_fails_reduction() {
    let ops = [Operation::new(Dimension::Cct, 2)];
    let layout = TreeLayout::from_operations(&ops).unwrap();
    let mut store: NodeStore<'_, (), f32> = NodeStore::new(&layout);
    store.set_root(());

    build(&mut store, &ops, |_, _| {
        Branch::from_bracket(
            Bracket { start_index: 0, end_index: 1, ratio: 0.5 },
            |_| Some(Child::inner(())),
        )
    })
    .unwrap();

    let err = reduce(&mut store, mix).unwrap_err();
    assert!(matches!(err, InterpolationError::ReductionFailure { node: 0, .. }));
}
