//! Kafka producer transport.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use kafka::{
    client::{KafkaClient, ProduceConfirm, SecurityConfig},
    producer::{Producer, Record, RequiredAcks as KafkaAcks},
};
use log::debug;
use parking_lot::Mutex;

use super::{
    Connection, Connector, MessageFailure, ProducerMessage, RequiredAcks, TransportConfig,
    TransportError,
};

/// Client id announced to the brokers.
pub const CLIENT_ID: &str = "cloudlog";

/// Lets the producer's partitioner pick when a topic's partitions are unknown.
const UNASSIGNED: i32 = -1;

/// Produces batches to a Kafka cluster over TLS.
///
/// Connecting loads cluster metadata from the first reachable broker. Each
/// batch is spread round-robin over the topic's available partitions and sent
/// as one produce request per leader. A request that fails as a whole drops
/// the producer and is resent on a fresh one up to
/// [`TransportConfig::retry_max`] times; partitions the brokers reject are
/// reported as [`TransportError::Send`] without retrying.
///
/// Applies `required_acks`, `read_timeout` as the broker acknowledgement
/// timeout, `retry_max`, `retry_backoff` and `max_message_bytes`. The `kafka`
/// client exposes no dial, write or keep-alive settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct KafkaConnector;

impl Connector for KafkaConnector {
    fn connect(
        &self,
        brokers: &[String],
        config: &TransportConfig,
    ) -> Result<Box<dyn Connection>, TransportError> {
        if !config.tls_enabled {
            return Err(TransportError::TlsDisabled);
        }
        if brokers.is_empty() {
            return Err(TransportError::NoBrokers);
        }
        for broker in brokers {
            validate_broker(broker)?;
        }
        let producer = open_producer(brokers, config)?;
        debug!("producer ready for {brokers:?}");
        Ok(Box::new(KafkaConnection {
            brokers: brokers.to_vec(),
            config: config.clone(),
            producer: Mutex::new(Some(producer)),
            closed: AtomicBool::new(false),
        }))
    }
}

fn validate_broker(address: &str) -> Result<(), TransportError> {
    let invalid = || TransportError::InvalidBroker(address.to_owned());
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(())
}

impl From<RequiredAcks> for KafkaAcks {
    fn from(acks: RequiredAcks) -> Self {
        match acks {
            RequiredAcks::NoResponse => KafkaAcks::None,
            RequiredAcks::WaitForLocal => KafkaAcks::One,
            RequiredAcks::WaitForAll => KafkaAcks::All,
        }
    }
}

fn open_producer(
    brokers: &[String],
    config: &TransportConfig,
) -> Result<Producer, TransportError> {
    let security = SecurityConfig::new(config.tls.connector()?)
        .with_hostname_verification(config.tls.verifies_hostname());
    Producer::from_hosts(brokers.to_vec())
        .with_security(security)
        .with_client_id(CLIENT_ID.to_owned())
        .with_ack_timeout(config.read_timeout)
        .with_required_acks(config.required_acks.into())
        .create()
        .map_err(|err| TransportError::Connect {
            brokers: brokers.to_vec(),
            reason: err.to_string(),
        })
}

struct KafkaConnection {
    brokers: Vec<String>,
    config: TransportConfig,
    producer: Mutex<Option<Producer>>,
    closed: AtomicBool,
}

impl KafkaConnection {
    fn deliver(
        &self,
        slot: &mut Option<Producer>,
        messages: &[ProducerMessage],
    ) -> Result<Vec<MessageFailure>, TransportError> {
        if slot.is_none() {
            *slot = Some(open_producer(&self.brokers, &self.config)?);
        }
        let Some(producer) = slot.as_mut() else {
            return Err(TransportError::Closed);
        };
        let partitions = assign_partitions(producer.client(), messages);
        let records: Vec<_> = messages
            .iter()
            .zip(&partitions)
            .map(|(message, &partition)| {
                Record::from_value(message.topic.as_str(), message.payload.as_slice())
                    .with_partition(partition)
            })
            .collect();
        let confirms = producer
            .send_all(&records)
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(rejected_messages(messages, &partitions, &confirms))
    }
}

/// Spread messages round-robin over each topic's available partitions.
fn assign_partitions(client: &KafkaClient, messages: &[ProducerMessage]) -> Vec<i32> {
    let topics = client.topics();
    let mut available: HashMap<&str, Vec<i32>> = HashMap::new();
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let ids = available
                .entry(message.topic.as_str())
                .or_insert_with(|| {
                    topics
                        .partitions(&message.topic)
                        .map(|partitions| partitions.available_ids())
                        .unwrap_or_default()
                });
            if ids.is_empty() {
                UNASSIGNED
            } else {
                ids[index % ids.len()]
            }
        })
        .collect()
}

/// Map per-partition rejections back to the messages sent to them. Messages
/// left to the producer's partitioner are attributed to every rejected
/// partition of their topic.
pub(super) fn rejected_messages(
    messages: &[ProducerMessage],
    partitions: &[i32],
    confirms: &[ProduceConfirm],
) -> Vec<MessageFailure> {
    let mut failures: Vec<MessageFailure> = Vec::new();
    for confirm in confirms {
        for partition in &confirm.partition_confirms {
            let Err(code) = &partition.offset else {
                continue;
            };
            let rejected = messages
                .iter()
                .zip(partitions)
                .enumerate()
                .filter(|(_, (message, assigned))| {
                    message.topic == confirm.topic
                        && (**assigned == partition.partition || **assigned == UNASSIGNED)
                })
                .map(|(index, (message, _))| MessageFailure {
                    index,
                    topic: message.topic.clone(),
                    reason: format!("partition {} rejected: {code:?}", partition.partition),
                });
            failures.extend(rejected);
        }
    }
    failures.sort_by_key(|failure| failure.index);
    failures.dedup_by_key(|failure| failure.index);
    failures
}

fn into_result(total: usize, failures: Vec<MessageFailure>) -> Result<(), TransportError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(TransportError::Send { total, failures })
    }
}

impl Connection for KafkaConnection {
    fn send_batch(&self, messages: Vec<ProducerMessage>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let max = self.config.max_message_bytes;
        if let Some((index, message)) = messages
            .iter()
            .enumerate()
            .find(|(_, message)| message.payload.len() > max)
        {
            return Err(TransportError::MessageTooLarge {
                index,
                size: message.payload.len(),
                max,
            });
        }

        let mut slot = self.producer.lock();
        let mut attempt = 0;
        loop {
            match self.deliver(&mut slot, &messages) {
                Ok(failures) => return into_result(messages.len(), failures),
                Err(err) => {
                    *slot = None;
                    if attempt >= self.config.retry_max || self.closed.load(Ordering::Acquire) {
                        return Err(err);
                    }
                    attempt += 1;
                    debug!(
                        "retrying batch of {} messages ({attempt}/{}): {err}",
                        messages.len(),
                        self.config.retry_max
                    );
                    thread::sleep(self.config.retry_backoff);
                }
            }
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        drop(self.producer.lock().take());
        Ok(())
    }
}
