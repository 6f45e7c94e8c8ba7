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

//! Parses a computation tree out of the JSON grammar documented in
//! `SPEC_FULL.md` §6.1:
//!
//! ```text
//! node := { "Leaf": [[f64, ...], ...] }
//!       | { "Add": [node, node] }
//!       | { "Multiply": [node, node] }
//!       | { "Negate": [node] }
//!       | { "Transpose": [node] }
//! ```

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::node::{ComputationNode, OperatorKind};

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
enum RawNode {
    Leaf(Vec<Vec<f64>>),
    Add(Vec<RawNode>),
    Multiply(Vec<RawNode>),
    Negate(Vec<RawNode>),
    Transpose(Vec<RawNode>),
}

/// Parses a tree description from a JSON string.
pub fn parse_str(source: &str) -> Result<ComputationNode> {
    let raw: RawNode = serde_json::from_str(source)
        .map_err(|e| Error::InvalidArgument(format!("malformed tree description: {e}")))?;
    build(raw)
}

/// Parses a tree description from a file on disk.
pub fn parse_file(path: &std::path::Path) -> Result<ComputationNode> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidArgument(format!("cannot read {}: {e}", path.display())))?;
    parse_str(&text)
}

fn build(raw: RawNode) -> Result<ComputationNode> {
    match raw {
        RawNode::Leaf(rows) => ComputationNode::leaf(rows),
        RawNode::Add(children) => build_operator(OperatorKind::Add, children),
        RawNode::Multiply(children) => build_operator(OperatorKind::Multiply, children),
        RawNode::Negate(children) => build_operator(OperatorKind::Negate, children),
        RawNode::Transpose(children) => build_operator(OperatorKind::Transpose, children),
    }
}

fn build_operator(kind: OperatorKind, children: Vec<RawNode>) -> Result<ComputationNode> {
    let children = children
        .into_iter()
        .map(build)
        .collect::<Result<Vec<_>>>()?;
    ComputationNode::operator(kind, children)
}
