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

//! This module provides `Worker`: a long-lived OS thread with a single-slot
//! task handoff and accumulated-cost ("fatigue") metrics. Workers are the
//! unit the `Executor` dispatches onto; they never talk to each other.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use rand::Rng;

use crate::error::{Error, Result};

/// A unit of work a worker executes. Panics inside a task are caught at the
/// run-loop boundary (`TaskException` in `spec.md` §7) and never escape.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

/// The state a submitted task's wrapper needs to touch after `self` may no
/// longer be directly reachable. Held behind an `Arc` so the wrapper closure
/// can be `'static` without borrowing `Worker`.
struct Shared {
    id: usize,
    fatigue_factor: f64,
    time_used_ns: AtomicU64,
    time_idle_ns: AtomicU64,
    /// Covers both "a task is queued but not yet picked up" and "a task is
    /// currently executing" — together these are exactly the two conditions
    /// `spec.md` §4.3 asks `newTask` to reject.
    occupied: AtomicBool,
    idle_since: Mutex<Instant>,
}

/// A long-lived worker thread, addressed by `id`, with an immutable random
/// `fatigue_factor` in `[0.5, 1.5)` and running totals of busy/idle time.
pub struct Worker {
    shared: Arc<Shared>,
    alive: AtomicBool,
    sender: Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawns the worker's run loop and returns a handle to it.
    pub fn spawn(id: usize) -> Self {
        let fatigue_factor = rand::thread_rng().gen_range(0.5..1.5);
        let (sender, receiver) = bounded::<Message>(1);
        let shared = Arc::new(Shared {
            id,
            fatigue_factor,
            time_used_ns: AtomicU64::new(0),
            time_idle_ns: AtomicU64::new(0),
            occupied: AtomicBool::new(false),
            idle_since: Mutex::new(Instant::now()),
        });

        let handle = std::thread::Builder::new()
            .name(format!("parmat-worker-{id}"))
            .spawn(move || {
                for message in receiver.iter() {
                    match message {
                        Message::Shutdown => break,
                        Message::Run(task) => task(),
                    }
                }
            })
            .expect("failed to spawn worker thread");

        Worker {
            shared,
            alive: AtomicBool::new(true),
            sender,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn id(&self) -> usize {
        self.shared.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(AtomicOrdering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.shared.occupied.load(AtomicOrdering::Acquire)
    }

    /// `fatigueFactor × timeUsed`, monotone non-decreasing over time.
    pub fn fatigue(&self) -> f64 {
        self.shared.fatigue_factor * self.shared.time_used_ns.load(AtomicOrdering::Acquire) as f64
    }

    pub fn time_used_ms(&self) -> f64 {
        self.shared.time_used_ns.load(AtomicOrdering::Acquire) as f64 / 1_000_000.0
    }

    pub fn time_idle_ms(&self) -> f64 {
        self.shared.time_idle_ns.load(AtomicOrdering::Acquire) as f64 / 1_000_000.0
    }

    /// Assigns `task` to this worker. Non-blocking: fails `IllegalState` if
    /// the worker is dead, busy, or already holds a queued task.
    ///
    /// `on_done` runs right after `task` completes, whether or not `task`
    /// panicked; the `Executor` uses it to return the worker to the idle set
    /// and to signal the drain barrier.
    pub fn submit<F, D>(&self, task: F, on_done: D) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        if !self.is_alive() {
            return Err(Error::IllegalState(format!(
                "worker {} is no longer alive",
                self.shared.id
            )));
        }
        if self
            .shared
            .occupied
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_err()
        {
            return Err(Error::IllegalState(format!(
                "worker {} is already busy or its handoff slot is occupied",
                self.shared.id
            )));
        }
        *self.shared.idle_since.lock() = Instant::now();

        let shared = Arc::clone(&self.shared);
        let wrapped = move || {
            let idle_elapsed = shared.idle_since.lock().elapsed().as_nanos() as u64;
            shared.time_idle_ns.fetch_add(idle_elapsed, AtomicOrdering::AcqRel);

            let start = Instant::now();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
            if let Err(payload) = result {
                log::warn!(
                    "worker {} task panicked: {}",
                    shared.id,
                    describe_panic(&payload)
                );
            }
            let busy_elapsed = start.elapsed().as_nanos() as u64;
            shared.time_used_ns.fetch_add(busy_elapsed, AtomicOrdering::AcqRel);

            shared.occupied.store(false, AtomicOrdering::Release);
            on_done();
        };

        match self.sender.try_send(Message::Run(Box::new(wrapped))) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.shared.occupied.store(false, AtomicOrdering::Release);
                Err(Error::IllegalState(format!(
                    "worker {} handoff slot rejected the task",
                    self.shared.id
                )))
            }
        }
    }

    /// Idempotent. Marks the worker dead, wakes it if it is parked waiting
    /// for work, and joins its thread.
    pub fn shutdown(&self) {
        if self
            .alive
            .compare_exchange(true, false, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
        {
            let _ = self.sender.try_send(Message::Shutdown);
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

fn describe_panic(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

impl PartialEq for Worker {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}
impl Eq for Worker {}
impl PartialOrd for Worker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Worker {
    /// Orders workers by current fatigue; consistent with the fatigue
    /// values observed at the moment of comparison.
    fn cmp(&self, other: &Self) -> Ordering {
        self.fatigue().total_cmp(&other.fatigue())
    }
}
