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

//! This module provides `Executor`: a pool of fatiguing `Worker`s, a
//! fairness-ordered idle set and a drain barrier. `submit` always hands the
//! next task to the least-fatigued idle worker; `submit_all` blocks until
//! every submitted task has completed.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use binary_heap_plus::BinaryHeap;
use compare::Compare;
use ordered_float::OrderedFloat;
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::worker::{Task, Worker};

/// One entry in the idle set: a snapshot of a worker's fatigue at the
/// moment it was (re)inserted, plus which worker it names.
struct IdleEntry {
    key: OrderedFloat<f64>,
    index: usize,
}

/// Comparator that makes `BinaryHeap` (a max-heap) behave as a min-heap on
/// `key`, so the *least* fatigued worker is the one `pop()` returns.
struct ByFatigueAscending;
impl Compare<IdleEntry> for ByFatigueAscending {
    fn compare(&self, a: &IdleEntry, b: &IdleEntry) -> Ordering {
        b.key.cmp(&a.key)
    }
}

struct Shared {
    idle: Mutex<BinaryHeap<IdleEntry, ByFatigueAscending>>,
    idle_cv: Condvar,
    in_flight: AtomicUsize,
    drain: Mutex<()>,
    drain_cv: Condvar,
    shutting_down: AtomicBool,
}

/// A pool of workers dispatched in fairness order: the least-fatigued idle
/// worker always receives the next submitted task.
pub struct Executor {
    workers: Vec<Arc<Worker>>,
    shared: Arc<Shared>,
}

impl Executor {
    /// Creates `n` workers, each with an independently sampled
    /// `fatigueFactor`, and seeds the idle set with all of them.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidArgument(
                "executor: number of threads must be positive".to_string(),
            ));
        }
        let workers: Vec<Arc<Worker>> = (0..n).map(|i| Arc::new(Worker::spawn(i))).collect();
        let mut idle = BinaryHeap::from_vec_cmp(Vec::new(), ByFatigueAscending);
        for i in 0..n {
            idle.push(IdleEntry { key: OrderedFloat(0.0), index: i });
        }
        Ok(Executor {
            workers,
            shared: Arc::new(Shared {
                idle: Mutex::new(idle),
                idle_cv: Condvar::new(),
                in_flight: AtomicUsize::new(0),
                drain: Mutex::new(()),
                drain_cv: Condvar::new(),
                shutting_down: AtomicBool::new(false),
            }),
        })
    }

    /// Submits `task`. Blocks only while waiting for an idle worker;
    /// dispatch always prefers the least-fatigued one.
    pub fn submit(&self, task: Task) -> Result<()> {
        if self.shared.shutting_down.load(AtomicOrdering::Acquire) {
            return Err(Error::IllegalState(
                "executor: cannot submit after shutdown".to_string(),
            ));
        }

        let index = {
            let mut idle = self.shared.idle.lock();
            loop {
                if let Some(entry) = idle.pop() {
                    break entry.index;
                }
                self.shared.idle_cv.wait(&mut idle);
            }
        };

        self.shared.in_flight.fetch_add(1, AtomicOrdering::AcqRel);

        let worker = Arc::clone(&self.workers[index]);
        let shared = Arc::clone(&self.shared);
        let on_done = move || {
            let key = OrderedFloat(worker.fatigue());
            shared.idle.lock().push(IdleEntry { key, index });
            shared.idle_cv.notify_one();

            if shared.in_flight.fetch_sub(1, AtomicOrdering::AcqRel) == 1 {
                let _guard = shared.drain.lock();
                shared.drain_cv.notify_all();
            }
        };

        if let Err(e) = self.workers[index].submit(task, on_done) {
            // The handoff itself failed (e.g. a racing direct caller of
            // `Worker::submit`): perform the same cleanup the wrapper would
            // have, then propagate.
            let key = OrderedFloat(self.workers[index].fatigue());
            self.shared.idle.lock().push(IdleEntry { key, index });
            self.shared.idle_cv.notify_one();
            if self.shared.in_flight.fetch_sub(1, AtomicOrdering::AcqRel) == 1 {
                let _guard = self.shared.drain.lock();
                self.shared.drain_cv.notify_all();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Submits every task in `tasks`, in order, then blocks until all of
    /// them (and anything already in flight) have completed.
    pub fn submit_all(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        for task in tasks {
            self.submit(task)?;
        }
        let mut guard = self.shared.drain.lock();
        while self.shared.in_flight.load(AtomicOrdering::Acquire) != 0 {
            self.shared.drain_cv.wait(&mut guard);
        }
        Ok(())
    }

    /// Sends every worker a shutdown signal and joins its thread. Safe to
    /// call with no prior submissions, and safe to call more than once.
    pub fn shutdown(&self) {
        self.shared.shutting_down.store(true, AtomicOrdering::Release);
        for worker in &self.workers {
            worker.shutdown();
        }
        self.shared.idle.lock().clear();
    }

    /// A human-readable diagnostic report: one line per worker plus a
    /// trailing fairness scalar (sum of squared fatigue deviations from the
    /// pool mean).
    pub fn worker_report(&self) -> String {
        let mut out = String::new();
        out.push_str("========== Worker Report ==========\n");
        let fatigues: Vec<f64> = self.workers.iter().map(|w| w.fatigue()).collect();
        for w in &self.workers {
            out.push_str(&format!(
                "Worker {} | fatigue={} | used={} ms | idle={} ms\n",
                w.id(),
                w.fatigue(),
                w.time_used_ms(),
                w.time_idle_ms()
            ));
        }
        let mean = fatigues.iter().sum::<f64>() / fatigues.len().max(1) as f64;
        let fairness: f64 = fatigues.iter().map(|f| (f - mean).powi(2)).sum();
        out.push_str(&format!("Fairness: {fairness}\n"));
        out.push_str("=======================================");
        out
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn rejects_non_positive_thread_count() {
        assert!(Executor::new(0).is_err());
    }

    #[test]
    fn submit_all_runs_every_task_once_and_drains() {
        let exec = Executor::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task> = (0..50)
            .map(|_| {
                let c = Arc::clone(&counter);
                Box::new(move || {
                    c.fetch_add(1, AtomicOrdering::SeqCst);
                }) as Task
            })
            .collect();
        exec.submit_all(tasks).unwrap();
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 50);
        assert_eq!(exec.shared.in_flight.load(AtomicOrdering::SeqCst), 0);
        exec.shutdown();
    }

    #[test]
    fn submit_all_with_empty_input_returns_immediately() {
        let exec = Executor::new(2).unwrap();
        exec.submit_all(Vec::new()).unwrap();
        exec.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent_and_safe_without_prior_submissions() {
        let exec = Executor::new(2).unwrap();
        exec.shutdown();
        exec.shutdown();
    }

    #[test]
    fn fairness_holds_over_many_small_tasks() {
        let exec = Executor::new(4).unwrap();
        let tasks: Vec<Task> = (0..400)
            .map(|_| Box::new(|| std::thread::sleep(Duration::from_micros(200))) as Task)
            .collect();
        exec.submit_all(tasks).unwrap();

        let fatigues: Vec<f64> = exec.workers.iter().map(|w| w.fatigue()).collect();
        let min = fatigues.iter().cloned().fold(f64::MAX, f64::min);
        let max = fatigues.iter().cloned().fold(f64::MIN, f64::max);
        assert!(min > 0.0);
        assert!(max / min < 10.0, "max/min = {}", max / min);
        exec.shutdown();
    }
}
