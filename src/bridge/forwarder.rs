//! Background publishing for log front-ends.

use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{error, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    client::PushEvent,
    event::Event,
    rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner},
};

/// Default number of events buffered between the caller and the worker.
pub const DEFAULT_CAPACITY: usize = 1024;
/// Default time [`EventForwarder::flush`] waits for the queue to drain.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Tuning for [`EventForwarder`].
#[derive(Clone, Debug)]
pub struct ForwarderConfig {
    pub capacity: usize,
    pub flush_timeout: Duration,
    /// Minimum spacing between warnings about dropped events.
    pub warn_interval: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl ForwarderConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warn_interval = interval;
        self
    }
}

/// Why an event was not queued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("forwarding queue is full")]
    QueueFull,
    #[error("forwarder is closed")]
    Closed,
}

enum ForwarderCommand {
    Event(Event),
    Flush(Sender<()>),
}

/// Queue feeding a worker thread that publishes events one at a time.
///
/// Events are dropped rather than blocking the caller when the queue is
/// full. Drops and delivery failures are counted and logged as warnings at
/// most once per [`ForwarderConfig::warn_interval`]. Dropping the forwarder
/// drains the queue and joins the worker.
pub struct EventForwarder {
    tx: Option<Sender<ForwarderCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    warner: Arc<RateLimitedWarner>,
    flush_timeout: Duration,
}

impl EventForwarder {
    pub fn new(client: impl PushEvent + 'static) -> Self {
        Self::with_config(client, ForwarderConfig::default())
    }

    pub fn with_config(client: impl PushEvent + 'static, config: ForwarderConfig) -> Self {
        let warner = Arc::new(RateLimitedWarner::new(config.warn_interval));
        let (tx, rx) = bounded(config.capacity.max(1));
        let worker_warner = Arc::clone(&warner);
        let handle = thread::spawn(move || worker_loop(rx, client, &worker_warner));
        Self {
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            warner,
            flush_timeout: config.flush_timeout,
        }
    }

    /// Queue `event` for publishing without blocking.
    pub fn forward(&self, event: Event) -> Result<(), ForwardError> {
        let Some(tx) = &self.tx else {
            self.note_drop("after shutdown");
            return Err(ForwardError::Closed);
        };
        match tx.try_send(ForwarderCommand::Event(event)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.note_drop("queue full");
                Err(ForwardError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.note_drop("worker stopped");
                Err(ForwardError::Closed)
            }
        }
    }

    /// Wait until every event queued before this call has been handled.
    ///
    /// Returns `false` when the forwarder is closed or the worker does not
    /// catch up within the flush timeout.
    pub fn flush(&self) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx
            .send_timeout(ForwarderCommand::Flush(ack_tx), self.flush_timeout)
            .is_err()
        {
            return false;
        }
        let drained = ack_rx.recv_timeout(self.flush_timeout).is_ok();
        self.warner.flush(report_dropped);
        drained
    }

    /// Stop accepting events, drain the queue and wait for the worker.
    pub fn close(&mut self) {
        drop(self.tx.take());
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            error!("cloudlog: forwarder worker panicked");
        }
    }

    /// Events dropped since the last warning.
    pub fn dropped(&self) -> u64 {
        self.warner.pending()
    }

    fn note_drop(&self, reason: &str) {
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            warn!("cloudlog: dropped {count} log events ({reason})");
        });
    }
}

fn report_dropped(count: u64) {
    warn!("cloudlog: dropped {count} log events in the last interval");
}

fn worker_loop<C: PushEvent>(
    rx: Receiver<ForwarderCommand>,
    client: C,
    warner: &RateLimitedWarner,
) {
    while let Ok(command) = rx.recv() {
        match command {
            ForwarderCommand::Event(event) => {
                if let Err(err) = client.push_event(event) {
                    warner.record_drop();
                    warner.warn_if_due(|count| {
                        warn!("cloudlog: failed to publish {count} log events: {err}");
                    });
                }
            }
            ForwarderCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    warner.flush(report_dropped);
}

impl Drop for EventForwarder {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EventForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventForwarder")
            .field("closed", &self.tx.is_none())
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudLogError;
    use crate::transport::TransportError;
    use rstest::rstest;
    use std::sync::Barrier;

    #[derive(Clone, Default)]
    struct Collecting {
        events: Arc<Mutex<Vec<Event>>>,
        gate: Option<Arc<Barrier>>,
        fail: bool,
    }

    impl PushEvent for Collecting {
        fn push_event(&self, event: Event) -> Result<(), CloudLogError> {
            if let Some(gate) = &self.gate {
                gate.wait();
            }
            if self.fail {
                return Err(TransportError::Closed.into());
            }
            self.events.lock().push(event);
            Ok(())
        }
    }

    #[rstest]
    fn flush_waits_for_queued_events() {
        let sink = Collecting::default();
        let forwarder = EventForwarder::new(sink.clone());
        for i in 0..10 {
            forwarder.forward(Event::from(format!("e{i}"))).expect("queued");
        }
        assert!(forwarder.flush());
        assert_eq!(sink.events.lock().len(), 10);
    }

    #[rstest]
    fn drop_drains_queue() {
        let sink = Collecting::default();
        let forwarder = EventForwarder::new(sink.clone());
        forwarder.forward(Event::from("last words")).expect("queued");
        drop(forwarder);
        assert_eq!(sink.events.lock().len(), 1);
    }

    #[rstest]
    fn full_queue_drops_without_blocking() {
        let gate = Arc::new(Barrier::new(2));
        let sink = Collecting {
            gate: Some(Arc::clone(&gate)),
            ..Collecting::default()
        };
        let forwarder = EventForwarder::with_config(
            sink.clone(),
            ForwarderConfig::default().with_capacity(1),
        );
        // first event is taken by the worker, which then blocks on the gate
        forwarder.forward(Event::from("taken")).expect("queued");
        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(forwarder.forward(Event::from("extra")));
        }
        assert!(outcomes.contains(&Err(ForwardError::QueueFull)));
        let queued = 1 + outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        for _ in 0..queued {
            gate.wait();
        }
        drop(forwarder);
        assert_eq!(sink.events.lock().len(), queued);
    }

    #[rstest]
    fn closed_forwarder_rejects_events() {
        let mut forwarder = EventForwarder::new(Collecting::default());
        forwarder.close();
        assert_eq!(
            forwarder.forward(Event::from("late")),
            Err(ForwardError::Closed)
        );
        assert!(!forwarder.flush());
    }

    #[rstest]
    fn delivery_failures_do_not_stop_the_worker() {
        let sink = Collecting {
            fail: true,
            ..Collecting::default()
        };
        let forwarder = EventForwarder::new(sink);
        forwarder.forward(Event::from("a")).expect("queued");
        forwarder.forward(Event::from("b")).expect("queued");
        assert!(forwarder.flush());
    }
}
