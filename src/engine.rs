// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides `Engine`: the driver that repeatedly finds a
//! resolvable node in a `ComputationNode` tree, stages its operands into
//! two shared matrix buffers, fans row-level work out across an `Executor`,
//! waits for completion, and resolves the node.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::matrix::SharedMatrix;
use crate::node::{ComputationNode, OperatorKind};
use crate::worker::Task;

pub struct Engine;

impl Engine {
    /// Evaluates `root` to completion using a freshly created `Executor`
    /// with `num_threads` workers. Returns the resolved root matrix in
    /// row-major form and the executor's diagnostic report.
    ///
    /// The executor is shut down before this function returns, whether or
    /// not evaluation succeeded.
    pub fn run(root: &mut ComputationNode, num_threads: usize) -> Result<(Vec<Vec<f64>>, String)> {
        let executor = Executor::new(num_threads)?;
        let outcome = Self::drive(root, &executor);
        let report = executor.worker_report();
        executor.shutdown();
        outcome.map(|matrix| (matrix, report))
    }

    fn drive(root: &mut ComputationNode, executor: &Executor) -> Result<Vec<Vec<f64>>> {
        root.associative_nesting();
        loop {
            match root.find_resolvable_path() {
                None => break,
                Some(path) => {
                    let node = root.node_at_mut(&path);
                    Self::load_and_compute(node, executor)?;
                }
            }
        }
        root.get_matrix()
            .expect("root is resolved once the loop above exits")
            .read_row_major()
    }

    fn load_and_compute(node: &mut ComputationNode, executor: &Executor) -> Result<()> {
        let kind = node
            .get_node_type()
            .expect("load_and_compute is only called on operator nodes");

        let children = node.get_children();
        let child_data: Vec<Vec<Vec<f64>>> = children
            .iter()
            .map(|c| {
                c.get_matrix()
                    .expect("children of a resolvable node are resolved")
                    .read_row_major()
            })
            .collect::<Result<_>>()?;

        let resolved = match kind {
            OperatorKind::Add => Self::compute_add(executor, &child_data[0], &child_data[1])?,
            OperatorKind::Multiply => {
                Self::compute_multiply(executor, &child_data[0], &child_data[1])?
            }
            OperatorKind::Negate => Self::compute_negate(executor, &child_data[0])?,
            OperatorKind::Transpose => Self::compute_transpose(executor, &child_data[0])?,
        };

        node.resolve(SharedMatrix::from_row_major(&resolved)?);
        Ok(())
    }

    fn compute_add(
        executor: &Executor,
        left_data: &[Vec<f64>],
        right_data: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>> {
        if is_empty_2d(left_data) || is_empty_2d(right_data) {
            return Err(Error::InvalidArgument("ADD requires non-empty operands".into()));
        }
        if left_data.len() != right_data.len() || left_data[0].len() != right_data[0].len() {
            return Err(Error::InvalidArgument(
                "ADD requires equal row count and row length".into(),
            ));
        }

        let left = Arc::new(SharedMatrix::from_row_major(left_data)?);
        let right = Arc::new(SharedMatrix::from_row_major(right_data)?);
        let tasks: Vec<Task> = (0..left.length())
            .map(|i| {
                let left = Arc::clone(&left);
                let right = Arc::clone(&right);
                Box::new(move || {
                    let l = left.get(i).expect("row index in range");
                    let r = right.get(i).expect("row index in range");
                    l.add(&r).expect("operand shapes were validated before submission");
                }) as Task
            })
            .collect();
        executor.submit_all(tasks)?;
        left.read_row_major()
    }

    fn compute_multiply(
        executor: &Executor,
        left_data: &[Vec<f64>],
        right_data: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>> {
        if is_empty_2d(left_data) || is_empty_2d(right_data) {
            return Err(Error::InvalidArgument(
                "MULTIPLY requires non-empty operands".into(),
            ));
        }
        if left_data[0].len() != right_data.len() {
            return Err(Error::InvalidArgument(format!(
                "MULTIPLY: inner dimension mismatch ({} vs {})",
                left_data[0].len(),
                right_data.len()
            )));
        }

        let left = Arc::new(SharedMatrix::from_row_major(left_data)?);
        let right_cols = transpose_2d(right_data);
        let right = Arc::new(SharedMatrix::from_column_major(&right_cols)?);

        let tasks: Vec<Task> = (0..left.length())
            .map(|i| {
                let left = Arc::clone(&left);
                let right = Arc::clone(&right);
                Box::new(move || {
                    let l = left.get(i).expect("row index in range");
                    l.vec_mat_mul(&right)
                        .expect("operand shapes were validated before submission");
                }) as Task
            })
            .collect();
        executor.submit_all(tasks)?;
        left.read_row_major()
    }

    fn compute_negate(executor: &Executor, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if is_empty_2d(data) {
            return Err(Error::InvalidArgument("NEGATE requires a non-empty operand".into()));
        }
        let left = Arc::new(SharedMatrix::from_row_major(data)?);
        let tasks: Vec<Task> = (0..left.length())
            .map(|i| {
                let left = Arc::clone(&left);
                Box::new(move || {
                    left.get(i).expect("row index in range").negate();
                }) as Task
            })
            .collect();
        executor.submit_all(tasks)?;
        left.read_row_major()
    }

    fn compute_transpose(executor: &Executor, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if is_empty_2d(data) {
            return Err(Error::InvalidArgument(
                "TRANSPOSE requires a non-empty operand".into(),
            ));
        }
        let left = Arc::new(SharedMatrix::from_row_major(data)?);
        let tasks: Vec<Task> = (0..left.length())
            .map(|i| {
                let left = Arc::clone(&left);
                Box::new(move || {
                    left.get(i).expect("row index in range").transpose();
                }) as Task
            })
            .collect();
        executor.submit_all(tasks)?;
        left.read_row_major()
    }
}

fn is_empty_2d(data: &[Vec<f64>]) -> bool {
    data.is_empty()
}

fn transpose_2d(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let ncols = rows[0].len();
    let mut cols = vec![Vec::with_capacity(rows.len()); ncols];
    for row in rows {
        for (c, value) in row.iter().enumerate() {
            cols[c].push(*value);
        }
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ComputationNode;

    fn leaf(rows: Vec<Vec<f64>>) -> ComputationNode {
        ComputationNode::leaf(rows).unwrap()
    }

    #[test]
    fn add_scenario() {
        let mut root = ComputationNode::operator(
            OperatorKind::Add,
            vec![
                leaf(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
                leaf(vec![vec![5.0, 6.0], vec![7.0, 8.0]]),
            ],
        )
        .unwrap();
        let (result, _) = Engine::run(&mut root, 2).unwrap();
        assert_eq!(result, vec![vec![6.0, 8.0], vec![10.0, 12.0]]);
    }

    #[test]
    fn multiply_scenario() {
        let mut root = ComputationNode::operator(
            OperatorKind::Multiply,
            vec![
                leaf(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]),
                leaf(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]),
            ],
        )
        .unwrap();
        let (result, _) = Engine::run(&mut root, 3).unwrap();
        assert_eq!(result, vec![vec![22.0, 28.0], vec![49.0, 64.0]]);
    }

    #[test]
    fn negate_scenario() {
        let mut root =
            ComputationNode::operator(OperatorKind::Negate, vec![leaf(vec![vec![1.0, -2.0], vec![-3.0, 4.0]])])
                .unwrap();
        let (result, _) = Engine::run(&mut root, 1).unwrap();
        assert_eq!(result, vec![vec![-1.0, 2.0], vec![3.0, -4.0]]);
    }

    #[test]
    fn transpose_scenario() {
        let mut root = ComputationNode::operator(
            OperatorKind::Transpose,
            vec![leaf(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])],
        )
        .unwrap();
        let (result, _) = Engine::run(&mut root, 2).unwrap();
        assert_eq!(result, vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);
    }

    #[test]
    fn composite_scenario() {
        let negated = ComputationNode::operator(
            OperatorKind::Negate,
            vec![leaf(vec![vec![6.0, 5.0, 4.0], vec![3.0, 2.0, 1.0]])],
        )
        .unwrap();
        let added = ComputationNode::operator(
            OperatorKind::Add,
            vec![leaf(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]), negated],
        )
        .unwrap();
        let mut root = ComputationNode::operator(OperatorKind::Transpose, vec![added]).unwrap();

        let (result, _) = Engine::run(&mut root, 4).unwrap();
        assert_eq!(
            result,
            vec![vec![-5.0, 1.0], vec![-3.0, 3.0], vec![-1.0, 5.0]]
        );
    }

    #[test]
    fn add_accepts_rows_with_zero_columns() {
        let mut root = ComputationNode::operator(
            OperatorKind::Add,
            vec![leaf(vec![vec![], vec![]]), leaf(vec![vec![], vec![]])],
        )
        .unwrap();
        let (result, _) = Engine::run(&mut root, 2).unwrap();
        assert_eq!(result, vec![Vec::<f64>::new(), Vec::new()]);
    }

    #[test]
    fn negate_accepts_rows_with_zero_columns() {
        let mut root =
            ComputationNode::operator(OperatorKind::Negate, vec![leaf(vec![vec![], vec![], vec![]])])
                .unwrap();
        let (result, _) = Engine::run(&mut root, 2).unwrap();
        assert_eq!(result, vec![Vec::<f64>::new(), Vec::new(), Vec::new()]);
    }

    #[test]
    fn add_rejects_shape_mismatch_before_submission() {
        let mut root = ComputationNode::operator(
            OperatorKind::Add,
            vec![leaf(vec![vec![1.0, 2.0]]), leaf(vec![vec![1.0, 2.0, 3.0]])],
        )
        .unwrap();
        assert!(Engine::run(&mut root, 2).is_err());
    }
}
