//! In-memory transport for tests and benchmarks.
//!
//! [`RecordingConnector`] records every batch it is given instead of talking
//! to brokers. Clones share state, so a test can keep one handle and pass
//! another to [`options::connector`](crate::options::connector).

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::transport::{
    Connection, Connector, MessageFailure, ProducerMessage, TransportConfig, TransportError,
};

#[derive(Default)]
struct State {
    connects: AtomicUsize,
    closes: AtomicUsize,
    failing_connects: AtomicUsize,
    connect_delay: Mutex<Duration>,
    rejected: Mutex<Vec<usize>>,
    configs: Mutex<Vec<(Vec<String>, TransportConfig)>>,
    batches: Mutex<Vec<Vec<ProducerMessage>>>,
}

/// Connector that records batches in memory.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    state: Arc<State>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` connection attempts.
    pub fn failing_connects(self, count: usize) -> Self {
        self.state.failing_connects.store(count, Ordering::SeqCst);
        self
    }

    /// Sleep for `delay` inside every connection attempt.
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *self.state.connect_delay.lock() = delay;
        self
    }

    /// Reject the messages at `indices` in every subsequent batch.
    pub fn rejecting(self, indices: impl IntoIterator<Item = usize>) -> Self {
        *self.state.rejected.lock() = indices.into_iter().collect();
        self
    }

    /// Number of connection attempts, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Broker list and transport configuration of the latest attempt.
    pub fn last_connect(&self) -> Option<(Vec<String>, TransportConfig)> {
        self.state.configs.lock().last().cloned()
    }

    /// Batches delivered so far, oldest first.
    pub fn batches(&self) -> Vec<Vec<ProducerMessage>> {
        self.state.batches.lock().clone()
    }

    /// Payloads of every delivered message decoded back into envelopes.
    pub fn envelopes(&self) -> Vec<Map<String, Value>> {
        self.state
            .batches
            .lock()
            .iter()
            .flatten()
            .filter_map(|message| serde_json::from_slice(&message.payload).ok())
            .collect()
    }
}

impl Connector for RecordingConnector {
    fn connect(
        &self,
        brokers: &[String],
        config: &TransportConfig,
    ) -> Result<Box<dyn Connection>, TransportError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state
            .configs
            .lock()
            .push((brokers.to_vec(), config.clone()));
        let delay = *self.state.connect_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let failing = self
            .state
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(TransportError::Connect {
                brokers: brokers.to_vec(),
                reason: "refused by recording connector".into(),
            });
        }
        Ok(Box::new(RecordingConnection {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

struct RecordingConnection {
    state: Arc<State>,
    closed: AtomicBool,
}

impl Connection for RecordingConnection {
    fn send_batch(&self, messages: Vec<ProducerMessage>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let failures: Vec<MessageFailure> = self
            .state
            .rejected
            .lock()
            .iter()
            .filter_map(|&index| {
                messages.get(index).map(|message| MessageFailure {
                    index,
                    topic: message.topic.clone(),
                    reason: "rejected by recording connector".into(),
                })
            })
            .collect();
        let total = messages.len();
        self.state.batches.lock().push(messages);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransportError::Send { total, failures })
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
