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

//! This module provides `ComputationNode`: a tagged-union expression tree
//! over matrices. The tree is walked and mutated by a single thread (the
//! `Engine`); only the staging matrices it hands out to row tasks are
//! shared across threads, so the tree itself carries no locks.

use crate::error::{Error, Result};
use crate::matrix::SharedMatrix;

/// The kind of an operator node. Arity is fixed per kind: ADD and MULTIPLY
/// take two children, NEGATE and TRANSPOSE take one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Add,
    Multiply,
    Negate,
    Transpose,
}
impl OperatorKind {
    pub fn arity(self) -> usize {
        match self {
            OperatorKind::Add | OperatorKind::Multiply => 2,
            OperatorKind::Negate | OperatorKind::Transpose => 1,
        }
    }
}

/// A node of the expression tree: either a materialized `Leaf`, or an
/// `Operator` awaiting resolution of its children.
pub enum ComputationNode {
    Leaf(SharedMatrix),
    Operator {
        kind: OperatorKind,
        children: Vec<ComputationNode>,
        resolved: bool,
        matrix: Option<SharedMatrix>,
    },
}

impl ComputationNode {
    /// A leaf constructed directly from a rectangular 2-D array. Leaves are
    /// resolved on construction.
    pub fn leaf(rows: Vec<Vec<f64>>) -> Result<Self> {
        Ok(ComputationNode::Leaf(SharedMatrix::from_row_major(&rows)?))
    }

    /// An operator node over `children`. Fails `InvalidArgument` if the
    /// number of children does not match `kind`'s fixed arity.
    pub fn operator(kind: OperatorKind, children: Vec<ComputationNode>) -> Result<Self> {
        if children.len() != kind.arity() {
            return Err(Error::InvalidArgument(format!(
                "{:?} requires {} child(ren), got {}",
                kind,
                kind.arity(),
                children.len()
            )));
        }
        Ok(ComputationNode::Operator {
            kind,
            children,
            resolved: false,
            matrix: None,
        })
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            ComputationNode::Leaf(_) => true,
            ComputationNode::Operator { resolved, .. } => *resolved,
        }
    }

    /// Installs `matrix` as this node's materialized value and marks it
    /// resolved. A no-op on a `Leaf` (leaves are resolved on construction).
    pub fn resolve(&mut self, matrix: SharedMatrix) {
        if let ComputationNode::Operator { resolved, matrix: slot, .. } = self {
            *slot = Some(matrix);
            *resolved = true;
        }
    }

    pub fn get_matrix(&self) -> Option<&SharedMatrix> {
        match self {
            ComputationNode::Leaf(m) => Some(m),
            ComputationNode::Operator { matrix, .. } => matrix.as_ref(),
        }
    }

    pub fn get_children(&self) -> &[ComputationNode] {
        match self {
            ComputationNode::Leaf(_) => &[],
            ComputationNode::Operator { children, .. } => children,
        }
    }

    pub fn get_node_type(&self) -> Option<OperatorKind> {
        match self {
            ComputationNode::Leaf(_) => None,
            ComputationNode::Operator { kind, .. } => Some(*kind),
        }
    }

    /// Returns the path (a sequence of child indices from this node) to the
    /// deepest unresolved node whose children are all resolved, or `None` if
    /// this node (and everything below it) is already resolved.
    ///
    /// A path rather than a direct `&mut` borrow, so the caller can look the
    /// node back up mutably via [`Self::node_at_mut`] without running into
    /// the borrow checker's well-known blind spot for "recurse, maybe return
    /// a borrow of self, maybe keep using self" functions.
    pub fn find_resolvable_path(&self) -> Option<Vec<usize>> {
        match self {
            ComputationNode::Leaf(_) => None,
            ComputationNode::Operator { resolved, children, .. } => {
                if *resolved {
                    return None;
                }
                for (i, child) in children.iter().enumerate() {
                    if let Some(mut path) = child.find_resolvable_path() {
                        path.insert(0, i);
                        return Some(path);
                    }
                }
                if children.iter().all(ComputationNode::is_resolved) {
                    Some(Vec::new())
                } else {
                    None
                }
            }
        }
    }

    /// Navigates to the node named by `path` (as returned by
    /// [`Self::find_resolvable_path`]), mutably.
    pub fn node_at_mut(&mut self, path: &[usize]) -> &mut ComputationNode {
        match path.split_first() {
            None => self,
            Some((&i, rest)) => match self {
                ComputationNode::Operator { children, .. } => children[i].node_at_mut(rest),
                ComputationNode::Leaf(_) => {
                    unreachable!("find_resolvable_path never descends into a leaf")
                }
            },
        }
    }

    /// Whole-tree normalization pass run once before evaluation. Under this
    /// data model ADD and MULTIPLY are fixed-arity binary operators (see
    /// `OperatorKind::arity`), so there are no associative n-ary chains to
    /// flatten or rebalance; this is the no-op resolution of `spec.md` §9's
    /// open question, kept as an explicit call so the hook stays visible in
    /// the evaluation pipeline.
    pub fn associative_nesting(&mut self) {
        if let ComputationNode::Operator { children, .. } = self {
            for child in children.iter_mut() {
                child.associative_nesting();
            }
        }
    }
}
