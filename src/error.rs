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

//! This module defines the error categories shared by every other module in
//! this crate: `SharedVector`, `SharedMatrix`, `Worker`, `Executor` and
//! `Engine` all report failure through the single `Error` type defined here.

use thiserror::Error;

/// The error categories produced by this crate.
///
/// # Note
/// `TaskException` from the originating design is deliberately absent here:
/// a panicking task is caught at the worker's run-loop boundary and never
/// escapes as a value of this type (see `crate::worker`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Bad shapes, mismatched orientations, non-positive counts, wrong arity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required argument was absent (e.g. no values given to a vector).
    #[error("null argument: {0}")]
    NullArgument(String),

    /// An object was addressed in a state that forbids the requested
    /// operation (worker no longer alive, busy, matrix read back with
    /// inconsistent orientations, ...).
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A blocking wait was interrupted before it could complete.
    #[error("interrupted: {0}")]
    Interrupted(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
