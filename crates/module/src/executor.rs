//! The UI thread's cooperative loop
//!
//! All widget state lives on one thread. Anything that completes later (bus
//! events, album art, timers) is scheduled back onto that thread through a
//! [`LocalExecutor`], so none of it needs to be `Send`.

use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub type LocalTask = Pin<Box<dyn Future<Output = ()> + 'static>>;

pub trait LocalExecutor {
    /// Run `task` on the UI thread
    fn spawn(&self, task: LocalTask);

    /// Call `tick` every `period` on the UI thread until it breaks
    fn every(&self, period: Duration, tick: Box<dyn FnMut() -> ControlFlow<()>>);
}

/// Executor backed by the current tokio `LocalSet`.
///
/// Both methods panic when called outside of a `LocalSet`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioLocal;

impl LocalExecutor for TokioLocal {
    fn spawn(&self, task: LocalTask) {
        tokio::task::spawn_local(task);
    }

    fn every(&self, period: Duration, mut tick: Box<dyn FnMut() -> ControlFlow<()>>) {
        tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if tick().is_break() {
                    break;
                }
            }
        });
    }
}
