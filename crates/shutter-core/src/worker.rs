//! Cross-thread state bridge.
//!
//! Worker computation threads never touch the state store directly. A
//! [`StateHandle`] enqueues a write that the scheduler applies — and marks
//! dirty — at the start of its next frame, never mid-pass, so evaluation
//! always observes a consistent snapshot. The reverse direction is a plain
//! fire-and-forget event send over a [`WorkerLink`].

use crate::key::WidgetKey;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::mpsc;

pub(crate) struct WorkerWrite {
    pub key: WidgetKey,
    pub slot: usize,
    pub value: Box<dyn Any + Send>,
}

/// Thread-safe write handle for one state hook slot.
///
/// Obtained once via [`Scope::worker_handle`] and moved into the worker.
/// Writing to an already-unmounted widget is a benign race: the write is
/// dropped with a diagnostic when the scheduler drains the queue.
///
/// [`Scope::worker_handle`]: crate::Scope::worker_handle
pub struct StateHandle<T> {
    tx: mpsc::Sender<WorkerWrite>,
    key: WidgetKey,
    slot: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            key: self.key,
            slot: self.slot,
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> StateHandle<T> {
    pub(crate) fn new(tx: mpsc::Sender<WorkerWrite>, key: WidgetKey, slot: usize) -> Self {
        Self {
            tx,
            key,
            slot,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> WidgetKey {
        self.key
    }

    /// Queues `value` for the owning slot. Visible to evaluation at the next
    /// frame boundary.
    pub fn write(&self, value: T) {
        let write = WorkerWrite {
            key: self.key,
            slot: self.slot,
            value: Box::new(value),
        };
        if self.tx.send(write).is_err() {
            log::warn!("state handle write for {} dropped; runtime is gone", self.key);
        }
    }
}

/// Order-preserving, fire-and-forget event channel from the UI to a worker.
/// The engine expects no synchronous reply; a worker observes a stop request
/// as an ordinary event.
pub struct WorkerLink<E> {
    tx: mpsc::Sender<E>,
}

impl<E> Clone for WorkerLink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> WorkerLink<E> {
    /// Creates the link and the receiving end the worker loops on.
    pub fn channel() -> (Self, mpsc::Receiver<E>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: E) {
        if self.tx.send(event).is_err() {
            log::warn!("worker link closed; event dropped");
        }
    }
}
