//! Delayed, fire-and-forget echo delivery.
//!
//! Each widget owns one worker task draining a FIFO queue. Every scheduled
//! echo carries its own deadline (`enqueue time + delay`); with a fixed delay
//! the deadlines are monotone, so echoes are delivered in the order they were
//! scheduled without depending on the ordering of the runtime's timer wheel.
//!
//! Scheduled echoes cannot be cancelled. Dropping the last scheduler handle
//! closes the queue; the worker still delivers everything already queued and
//! then exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug)]
struct ScheduledEcho {
    due: Instant,
    text: String,
}

/// Handle for scheduling echoes onto a widget's worker.
#[derive(Debug, Clone)]
pub struct EchoScheduler {
    queue: mpsc::UnboundedSender<ScheduledEcho>,
    outstanding: Arc<AtomicUsize>,
    delay: Duration,
}

impl EchoScheduler {
    /// Spawn the worker onto the current Tokio runtime.
    ///
    /// `deliver` receives the text captured at scheduling time once its delay
    /// has elapsed.
    pub fn spawn<F>(delay: Duration, deliver: F) -> Self
    where
        F: Fn(String) + Send + 'static,
    {
        let (queue, mut rx) = mpsc::unbounded_channel::<ScheduledEcho>();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&outstanding);

        tokio::spawn(async move {
            while let Some(echo) = rx.recv().await {
                tokio::time::sleep_until(echo.due).await;
                deliver(echo.text);
                counter.fetch_sub(1, Ordering::SeqCst);
            }
        });

        Self {
            queue,
            outstanding,
            delay,
        }
    }

    /// Queue an echo of `text`, due one delay from now.
    pub fn schedule(&self, text: String) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let echo = ScheduledEcho {
            due: Instant::now() + self.delay,
            text,
        };
        if self.queue.send(echo).is_err() {
            // Worker is gone (runtime shutting down).
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            warn!(name: "widget.echo.dropped", "Echo worker stopped; echo dropped");
        }
    }

    /// Number of echoes scheduled but not yet delivered.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
