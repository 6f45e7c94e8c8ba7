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

//! # parmat
//!
//! `parmat` evaluates a tree of matrix operations (ADD, MULTIPLY, NEGATE,
//! TRANSPOSE) by fanning row-level work out across a pool of fatigue-aware
//! worker threads.
//!
//! The pieces, bottom-up:
//! - [`vector`] — `SharedVector`, a lockable, orientation-tagged sequence.
//! - [`matrix`] — `SharedMatrix`, an ordered collection of `SharedVector`s.
//! - [`worker`] — `Worker`, a long-lived thread with a single-slot handoff.
//! - [`executor`] — `Executor`, a fairness-ordered pool of workers with a
//!   drain barrier.
//! - [`node`] — `ComputationNode`, the expression tree being evaluated.
//! - [`engine`] — `Engine`, which drives the tree to a resolved root.
//! - [`parser`] / [`writer`] — JSON tree input and matrix output.

pub mod engine;
pub mod error;
pub mod executor;
pub mod matrix;
pub mod node;
pub mod parser;
pub mod vector;
pub mod worker;
pub mod writer;

pub use engine::Engine;
pub use error::{Error, Result};
pub use executor::Executor;
pub use matrix::SharedMatrix;
pub use node::{ComputationNode, OperatorKind};
pub use vector::{Orientation, SharedVector};
pub use worker::Worker;
