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

//! This module provides `SharedMatrix`: an ordered collection of
//! `SharedVector`s that share a common orientation when non-empty. Bulk
//! mutations (load) replace the internal vector array atomically; mutations
//! of an individual row or column go through that vector's own lock.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::vector::{Orientation, SharedVector};

pub struct SharedMatrix {
    elements: RwLock<Vec<Arc<SharedVector>>>,
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMatrix {
    /// An empty matrix, orientation undefined.
    pub fn new() -> Self {
        SharedMatrix { elements: RwLock::new(Vec::new()) }
    }

    pub fn from_row_major(rows: &[Vec<f64>]) -> Result<Self> {
        let m = Self::new();
        m.load_row_major(rows)?;
        Ok(m)
    }

    pub fn from_column_major(cols: &[Vec<f64>]) -> Result<Self> {
        let m = Self::new();
        m.load_column_major(cols)?;
        Ok(m)
    }

    fn check_rectangular(rows: &[Vec<f64>]) -> Result<()> {
        if let Some(first) = rows.first() {
            let len = first.len();
            if rows.iter().any(|r| r.len() != len) {
                return Err(Error::InvalidArgument(
                    "matrix load: input is not rectangular".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Validates and defensively copies `rows`, installing a fresh array of
    /// ROW-oriented vectors. Replaces any prior content atomically.
    pub fn load_row_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        Self::check_rectangular(rows)?;
        let vectors = rows
            .iter()
            .map(|r| Arc::new(SharedVector::new(r.clone(), Orientation::Row)))
            .collect();
        *self.elements.write() = vectors;
        Ok(())
    }

    /// Validates and defensively copies `cols`, installing a fresh array of
    /// COLUMN-oriented vectors. A later `read_row_major` reports row `r`,
    /// column `c` as `cols[c][r]`.
    pub fn load_column_major(&self, cols: &[Vec<f64>]) -> Result<()> {
        Self::check_rectangular(cols)?;
        let vectors = cols
            .iter()
            .map(|c| Arc::new(SharedVector::new(c.clone(), Orientation::Column)))
            .collect();
        *self.elements.write() = vectors;
        Ok(())
    }

    /// Acquires every element vector's read lock (in ascending vector-id
    /// order, to match the global lock order used elsewhere), verifies the
    /// orientation/length invariants still hold, and materializes the
    /// matrix in row-major layout. All locks are released (the guards are
    /// dropped) on every exit path, including the `IllegalState` one.
    pub fn read_row_major(&self) -> Result<Vec<Vec<f64>>> {
        let elements = self.elements.read().clone();
        if elements.is_empty() {
            return Ok(Vec::new());
        }

        let mut ordered: Vec<&Arc<SharedVector>> = elements.iter().collect();
        ordered.sort_by_key(|v| v.id());
        let guards: Vec<_> = ordered.iter().map(|v| v.read_lock()).collect();

        let orientation = elements[0].orientation();
        let length = guards[0].len();
        for g in &guards {
            if g.orientation() != orientation || g.len() != length {
                return Err(Error::IllegalState(
                    "readRowMajor: element vectors have inconsistent orientation or length"
                        .to_string(),
                ));
            }
        }
        drop(guards);

        match orientation {
            Orientation::Row => Ok(elements
                .iter()
                .map(|v| v.read_lock().values().to_vec())
                .collect()),
            Orientation::Column => {
                let ncols = elements.len();
                let nrows = length;
                let cols: Vec<Vec<f64>> =
                    elements.iter().map(|v| v.read_lock().values().to_vec()).collect();
                let mut out = vec![vec![0.0; ncols]; nrows];
                for (c, col) in cols.iter().enumerate() {
                    for (r, value) in col.iter().enumerate() {
                        out[r][c] = *value;
                    }
                }
                Ok(out)
            }
        }
    }

    pub fn get(&self, i: usize) -> Option<Arc<SharedVector>> {
        self.elements.read().get(i).cloned()
    }

    pub fn length(&self) -> usize {
        self.elements.read().len()
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.elements.read().first().map(|v| v.orientation())
    }

    /// Column `i` when this matrix is COLUMN-oriented (used by
    /// `SharedVector::vec_mat_mul`), as a snapshot of the internal array.
    pub fn elements(&self) -> Vec<Arc<SharedVector>> {
        self.elements.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}
