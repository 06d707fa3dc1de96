//! Export and captioning work run off the UI thread.
//!
//! A task owns everything it needs (an immutable snapshot, cloned bytes), so
//! nothing it does can touch the live session.

use futures::channel::oneshot;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::export::Progress;

/// Shared progress counter, written by the worker and read by the UI
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle(Arc<Mutex<Progress>>);

impl ProgressHandle {
    pub fn set(&self, progress: Progress) {
        *self.0.lock() = progress;
    }

    pub fn get(&self) -> Progress {
        *self.0.lock()
    }
}

#[derive(Debug)]
pub enum TaskState<R> {
    Running,
    Finished(R),
    /// The worker went away without reporting (panicked or never started)
    Lost,
}

pub struct BackgroundTask<R> {
    progress: ProgressHandle,
    outcome: oneshot::Receiver<R>,
}

impl<R: Send + 'static> BackgroundTask<R> {
    /// Run `work` on a named worker thread; `ctx` is asked to repaint when it
    /// finishes so the UI picks the outcome up promptly
    pub fn spawn<F>(name: &str, ctx: egui::Context, work: F) -> Self
    where
        F: FnOnce(&ProgressHandle) -> R + Send + 'static,
    {
        let (sender, outcome) = oneshot::channel();
        let progress = ProgressHandle::default();
        let worker_progress = progress.clone();

        let spawned = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let result = work(&worker_progress);
                // The receiver is gone if the UI dropped the task.
                let _ = sender.send(result);
                ctx.request_repaint();
            });
        if let Err(err) = spawned {
            log::error!("Failed to start {} worker: {}", name, err);
        }

        Self { progress, outcome }
    }

    pub fn progress(&self) -> Progress {
        self.progress.get()
    }

    /// Non-blocking check for the outcome
    pub fn poll(&mut self) -> TaskState<R> {
        match self.outcome.try_recv() {
            Ok(Some(result)) => TaskState::Finished(result),
            Ok(None) => TaskState::Running,
            Err(oneshot::Canceled) => TaskState::Lost,
        }
    }
}
