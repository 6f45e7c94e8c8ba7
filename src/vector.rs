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

//! This module provides `SharedVector`: a fixed-length sequence of `f64`
//! tagged with an orientation (row or column) and guarded by a
//! reader/writer lock, so that many row-level tasks can read or mutate
//! disjoint vectors concurrently while still allowing a caller to hold a
//! lock across several operations.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};

/// A tag telling whether a `SharedVector` should be read as a row or as a
/// column of its owning matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Row,
    Column,
}
impl Orientation {
    /// The orientation obtained by flipping this one.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

/// The data actually guarded by the lock: kept as one struct so a single
/// guard always observes a consistent (length, orientation, values) triple.
struct Inner {
    values: Vec<f64>,
    orientation: Orientation,
}

/// Process-wide counter handing out the vector ids used to establish a
/// global lock order (see `SharedVector::add`/`dot`).
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// An orientation-tagged, lockable sequence of doubles.
pub struct SharedVector {
    id: u64,
    inner: RwLock<Inner>,
}

/// A read-only view into a locked `SharedVector`, held for as long as the
/// guard is alive. Dropping the guard releases the lock — this is the
/// idiomatic-Rust counterpart of an explicit `readUnlock()` call.
pub struct SharedVectorReadGuard<'a> {
    guard: RwLockReadGuard<'a, Inner>,
}
impl<'a> SharedVectorReadGuard<'a> {
    pub fn values(&self) -> &[f64] {
        &self.guard.values
    }
    pub fn orientation(&self) -> Orientation {
        self.guard.orientation
    }
    pub fn len(&self) -> usize {
        self.guard.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.guard.values.is_empty()
    }
}

/// A mutable view into a locked `SharedVector`.
pub struct SharedVectorWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, Inner>,
}
impl<'a> SharedVectorWriteGuard<'a> {
    pub fn values(&self) -> &[f64] {
        &self.guard.values
    }
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.guard.values
    }
    pub fn orientation(&self) -> Orientation {
        self.guard.orientation
    }
    pub fn len(&self) -> usize {
        self.guard.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.guard.values.is_empty()
    }
    /// Flips the orientation in place; values are untouched.
    pub fn transpose(&mut self) {
        self.guard.orientation = self.guard.orientation.flipped();
    }
    /// Negates every element in place.
    pub fn negate(&mut self) {
        for v in self.guard.values.iter_mut() {
            *v = -*v;
        }
    }
    /// Replaces the underlying storage wholesale (used by `vecMatMul`,
    /// which is allowed to change the vector's length).
    fn replace(&mut self, values: Vec<f64>) {
        self.guard.values = values;
    }
}

impl SharedVector {
    /// Copies `values` into a freshly allocated vector with the given
    /// orientation. `Orientation` is a two-variant enum, so there is no
    /// runtime-representable invalid tag to reject; the type system carries
    /// that half of `spec.md`'s `InvalidArgument` contract for us.
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        SharedVector {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            inner: RwLock::new(Inner { values, orientation }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.inner.read().values.get(i).copied()
    }

    pub fn length(&self) -> usize {
        self.inner.read().values.len()
    }

    pub fn orientation(&self) -> Orientation {
        self.inner.read().orientation
    }

    pub fn read_lock(&self) -> SharedVectorReadGuard<'_> {
        SharedVectorReadGuard { guard: self.inner.read() }
    }

    pub fn write_lock(&self) -> SharedVectorWriteGuard<'_> {
        SharedVectorWriteGuard { guard: self.inner.write() }
    }

    pub fn transpose(&self) {
        self.write_lock().transpose();
    }

    pub fn negate(&self) {
        self.write_lock().negate();
    }

    /// Adds `other` into `self`, elementwise, under `self`'s write lock and
    /// `other`'s read lock (or just `self`'s write lock when `other` is the
    /// same vector). Locks on distinct vectors are always acquired in
    /// ascending-id order so that concurrent `v1.add(v2)` and `v2.add(v1)`
    /// cannot deadlock.
    pub fn add(&self, other: &SharedVector) -> Result<()> {
        if std::ptr::eq(self, other) {
            let mut this = self.write_lock();
            let doubled: Vec<f64> = this.values().iter().map(|v| v * 2.0).collect();
            this.replace(doubled);
            return Ok(());
        }

        if self.id < other.id {
            let mut this = self.write_lock();
            let that = other.read_lock();
            Self::validate_same_shape(this.values(), this.orientation(), &that)?;
            for (a, b) in this.values_mut().iter_mut().zip(that.values()) {
                *a += *b;
            }
        } else {
            let that = other.read_lock();
            let mut this = self.write_lock();
            Self::validate_same_shape(this.values(), this.orientation(), &that)?;
            for (a, b) in this.values_mut().iter_mut().zip(that.values()) {
                *a += *b;
            }
        }
        Ok(())
    }

    fn validate_same_shape(
        this_values: &[f64],
        this_orientation: Orientation,
        that: &SharedVectorReadGuard<'_>,
    ) -> Result<()> {
        if this_values.len() != that.len() {
            return Err(Error::InvalidArgument(format!(
                "add: length mismatch ({} vs {})",
                this_values.len(),
                that.len()
            )));
        }
        if this_orientation != that.orientation() {
            return Err(Error::InvalidArgument(
                "add: orientation mismatch".to_string(),
            ));
        }
        Ok(())
    }

    /// Dot product of two *differently* oriented vectors of equal length,
    /// taken under both vectors' read locks (acquired in ascending-id order;
    /// a vector dotted with itself takes only one lock).
    pub fn dot(&self, other: &SharedVector) -> Result<f64> {
        if std::ptr::eq(self, other) {
            let this = self.read_lock();
            return Err(Error::InvalidArgument(format!(
                "dot: a vector cannot be dotted with itself (orientation {:?})",
                this.orientation()
            )));
        }
        let (a, b) = if self.id < other.id {
            let a = self.read_lock();
            let b = other.read_lock();
            (a, b)
        } else {
            let b = other.read_lock();
            let a = self.read_lock();
            (a, b)
        };
        if a.len() != b.len() {
            return Err(Error::InvalidArgument(format!(
                "dot: length mismatch ({} vs {})",
                a.len(),
                b.len()
            )));
        }
        if a.orientation() == b.orientation() {
            return Err(Error::InvalidArgument(
                "dot: operands must have different orientations".to_string(),
            ));
        }
        Ok(a.values().iter().zip(b.values()).map(|(x, y)| x * y).sum())
    }

    /// Replaces this row vector's storage with the product of this row by
    /// every column of `matrix`. Requires `self` to be a ROW vector and
    /// `matrix` to be COLUMN-oriented and non-empty, with matching inner
    /// dimension. The new length is `matrix.length()`; orientation stays
    /// ROW.
    pub fn vec_mat_mul(&self, matrix: &crate::matrix::SharedMatrix) -> Result<()> {
        if self.orientation() != Orientation::Row {
            return Err(Error::InvalidArgument(
                "vecMatMul: left operand must be ROW-oriented".to_string(),
            ));
        }
        if matrix.length() == 0 {
            return Err(Error::InvalidArgument(
                "vecMatMul: right operand must be non-empty".to_string(),
            ));
        }
        if matrix.orientation() != Some(Orientation::Column) {
            return Err(Error::InvalidArgument(
                "vecMatMul: right operand must be COLUMN-oriented".to_string(),
            ));
        }
        let columns = matrix.elements();
        let inner_dim = self.length();
        for col in &columns {
            if col.length() != inner_dim {
                return Err(Error::InvalidArgument(format!(
                    "vecMatMul: inner dimension mismatch ({} vs {})",
                    inner_dim,
                    col.length()
                )));
            }
        }

        let mut this = self.write_lock();
        let mut result = Vec::with_capacity(columns.len());
        for col in &columns {
            let col_guard = col.read_lock();
            let sum: f64 = this
                .values()
                .iter()
                .zip(col_guard.values())
                .map(|(x, y)| x * y)
                .sum();
            result.push(sum);
        }
        this.replace(result);
        Ok(())
    }
}
