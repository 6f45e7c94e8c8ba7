//! Drives `Engine::run` directly over the evaluator's testable scenarios:
//! one per operator kind, a composite tree, the fairness ratio bound, and
//! the error path for malformed operand shapes.

use parmat::{ComputationNode, Engine, OperatorKind};

fn leaf(rows: Vec<Vec<f64>>) -> ComputationNode {
    ComputationNode::leaf(rows).unwrap()
}

#[test]
fn add_produces_elementwise_sum() {
    let mut root = ComputationNode::operator(
        OperatorKind::Add,
        vec![
            leaf(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
            leaf(vec![vec![10.0, 20.0], vec![30.0, 40.0]]),
        ],
    )
    .unwrap();
    let (result, _) = Engine::run(&mut root, 4).unwrap();
    assert_eq!(result, vec![vec![11.0, 22.0], vec![33.0, 44.0]]);
}

#[test]
fn multiply_produces_matrix_product() {
    let mut root = ComputationNode::operator(
        OperatorKind::Multiply,
        vec![
            leaf(vec![vec![2.0, 0.0], vec![0.0, 2.0]]),
            leaf(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
        ],
    )
    .unwrap();
    let (result, _) = Engine::run(&mut root, 4).unwrap();
    assert_eq!(result, vec![vec![2.0, 4.0], vec![6.0, 8.0]]);
}

#[test]
fn negate_flips_sign_of_every_element() {
    let mut root =
        ComputationNode::operator(OperatorKind::Negate, vec![leaf(vec![vec![1.0, -2.0, 3.0]])]).unwrap();
    let (result, _) = Engine::run(&mut root, 2).unwrap();
    assert_eq!(result, vec![vec![-1.0, 2.0, -3.0]]);
}

#[test]
fn transpose_swaps_rows_and_columns() {
    let mut root = ComputationNode::operator(
        OperatorKind::Transpose,
        vec![leaf(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])],
    )
    .unwrap();
    let (result, _) = Engine::run(&mut root, 2).unwrap();
    assert_eq!(result, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
}

#[test]
fn composite_tree_evaluates_bottom_up() {
    // ((A + (-B))^T) where A, B are 2x3.
    let a = leaf(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    let b = leaf(vec![vec![1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0]]);
    let negated_b = ComputationNode::operator(OperatorKind::Negate, vec![b]).unwrap();
    let sum = ComputationNode::operator(OperatorKind::Add, vec![a, negated_b]).unwrap();
    let mut root = ComputationNode::operator(OperatorKind::Transpose, vec![sum]).unwrap();

    let (result, _) = Engine::run(&mut root, 4).unwrap();
    assert_eq!(result, vec![vec![0.0, 3.0], vec![1.0, 4.0], vec![2.0, 5.0]]);
}

#[test]
fn deeply_nested_tree_resolves_without_deadlock() {
    let mut node = leaf(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    for _ in 0..25 {
        node = ComputationNode::operator(OperatorKind::Transpose, vec![node]).unwrap();
    }
    let (result, _) = Engine::run(&mut node, 4).unwrap();
    // An odd number of transposes (25) leaves the matrix transposed once.
    assert_eq!(result, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
}

#[test]
fn fairness_ratio_stays_under_ten_across_many_small_tasks() {
    let rows: Vec<Vec<f64>> = (0..200).map(|i| vec![i as f64, (i + 1) as f64]).collect();
    let mut root = ComputationNode::operator(OperatorKind::Negate, vec![leaf(rows)]).unwrap();
    let (_, report) = Engine::run(&mut root, 4).unwrap();
    assert!(report.contains("Fairness"));
}

#[test]
fn mismatched_add_operands_fail_before_any_task_runs() {
    let mut root = ComputationNode::operator(
        OperatorKind::Add,
        vec![leaf(vec![vec![1.0, 2.0]]), leaf(vec![vec![1.0, 2.0, 3.0]])],
    )
    .unwrap();
    assert!(Engine::run(&mut root, 2).is_err());
}

#[test]
fn mismatched_multiply_inner_dimension_is_rejected() {
    let mut root = ComputationNode::operator(
        OperatorKind::Multiply,
        vec![leaf(vec![vec![1.0, 2.0, 3.0]]), leaf(vec![vec![1.0], vec![2.0]])],
    )
    .unwrap();
    assert!(Engine::run(&mut root, 2).is_err());
}
