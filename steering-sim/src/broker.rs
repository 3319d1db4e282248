//! Signal broker interface
//!
//! The broker routes raw signal values between publishers and subscribers.
//! `SignalBroker` is the seam the gateway and the ECU are written against;
//! `LocalBroker` implements it in-process so the demo loops run without a
//! broker deployment.

use crate::signals::SignalDatabase;
use crate::types::{Result, SignalRef, SignalUpdate, SimError};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Default broker address of the demo setup
pub const DEFAULT_BROKER_URL: &str = "http://localhost:50051";

/// Parsed broker address (`http(s)://host:port`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub secure: bool,
    pub host: String,
    pub port: u16,
}

impl BrokerEndpoint {
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || SimError::InvalidEndpoint(url.to_string());

        let (secure, rest) = if let Some(rest) = url.strip_prefix("http://") {
            (false, rest)
        } else if let Some(rest) = url.strip_prefix("https://") {
            (true, rest)
        } else {
            return Err(invalid());
        };

        let rest = rest.trim_end_matches('/');
        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            secure,
            host: host.to_string(),
            port,
        })
    }
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self {
            secure: false,
            host: "localhost".to_string(),
            port: 50051,
        }
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "https" } else { "http" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Signals a client intends to write
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub client_id: String,
    pub signals: Vec<SignalRef>,
}

impl PublisherConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            signals: Vec::new(),
        }
    }

    /// Builder method: declare a signal
    pub fn signal(mut self, signal: SignalRef) -> Self {
        self.signals.push(signal);
        self
    }
}

/// Signals a client wants to receive
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub client_id: String,
    pub signals: Vec<SignalRef>,
    /// Only deliver values that differ from the previous write
    pub on_change: bool,
}

impl SubscriberConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            signals: Vec::new(),
            on_change: true,
        }
    }

    /// Builder method: add a signal to the subscription
    pub fn signal(mut self, signal: SignalRef) -> Self {
        self.signals.push(signal);
        self
    }

    /// Builder method: deliver every write, not only changes
    pub fn with_on_change(mut self, on_change: bool) -> Self {
        self.on_change = on_change;
        self
    }
}

/// Handle returned for a registered publisher
#[derive(Debug, Clone)]
pub struct Publisher {
    client_id: String,
    signals: BTreeSet<SignalRef>,
}

impl Publisher {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn declares(&self, signal: &SignalRef) -> bool {
        self.signals.contains(signal)
    }
}

/// Receiving end of a subscription
#[derive(Debug)]
pub struct Subscription {
    client_id: String,
    receiver: Receiver<SignalUpdate>,
}

impl Subscription {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Drain all pending updates without blocking
    ///
    /// An empty batch means there is no new data.
    pub fn poll(&self) -> Result<Vec<SignalUpdate>> {
        let mut updates = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(update) => updates.push(update),
                Err(TryRecvError::Empty) => return Ok(updates),
                Err(TryRecvError::Disconnected) => {
                    if updates.is_empty() {
                        return Err(SimError::Disconnected(self.client_id.clone()));
                    }
                    return Ok(updates);
                }
            }
        }
    }
}

/// Publish/subscribe access to vehicle signals
pub trait SignalBroker {
    /// Address of the broker this client is attached to
    fn endpoint(&self) -> &BrokerEndpoint;

    /// Register a publisher and the signals it will write
    fn register_publisher(&mut self, config: PublisherConfig) -> Result<Publisher>;

    /// Open a subscription for a set of signals
    fn subscribe(&mut self, config: SubscriberConfig) -> Result<Subscription>;

    /// Write raw values for one or more signals
    fn publish(&mut self, publisher: &Publisher, values: &[(SignalRef, i64)]) -> Result<()>;
}

struct Subscriber {
    client_id: String,
    signals: BTreeSet<SignalRef>,
    on_change: bool,
    /// Last raw value sent to this subscriber, per signal
    delivered: HashMap<SignalRef, i64>,
    sender: Sender<SignalUpdate>,
}

/// In-process broker
pub struct LocalBroker {
    endpoint: BrokerEndpoint,
    database: SignalDatabase,
    publishers: BTreeSet<String>,
    subscribers: Vec<Subscriber>,
    latest: HashMap<SignalRef, i64>,
    /// Publish calls that carried at least one signal of a message
    traffic: BTreeMap<String, u64>,
}

impl LocalBroker {
    /// Open a channel to the broker at `url`
    pub fn connect(url: &str) -> Result<Self> {
        let endpoint = BrokerEndpoint::parse(url)?;
        log::info!("Opening in-process broker channel for {}", endpoint);
        Ok(Self::with_database(endpoint, SignalDatabase::steering_bus()))
    }

    pub fn with_database(endpoint: BrokerEndpoint, database: SignalDatabase) -> Self {
        Self {
            endpoint,
            database,
            publishers: BTreeSet::new(),
            subscribers: Vec::new(),
            latest: HashMap::new(),
            traffic: BTreeMap::new(),
        }
    }

    pub fn database(&self) -> &SignalDatabase {
        &self.database
    }

    /// Last raw value written for a signal
    pub fn latest(&self, signal: &SignalRef) -> Option<i64> {
        self.latest.get(signal).copied()
    }

    /// Number of publish calls that carried the given message
    pub fn message_count(&self, message: &str) -> u64 {
        self.traffic.get(message).copied().unwrap_or(0)
    }

    pub fn num_subscribers(&self) -> usize {
        self.subscribers.len()
    }

    fn check_known(&self, signals: &[SignalRef]) -> Result<()> {
        for signal in signals {
            self.database.signal(signal)?;
        }
        Ok(())
    }
}

impl SignalBroker for LocalBroker {
    fn endpoint(&self) -> &BrokerEndpoint {
        &self.endpoint
    }

    fn register_publisher(&mut self, config: PublisherConfig) -> Result<Publisher> {
        self.check_known(&config.signals)?;
        if !self.publishers.insert(config.client_id.clone()) {
            return Err(SimError::DuplicateClient(config.client_id));
        }
        log::debug!(
            "Registered publisher '{}' ({} signals)",
            config.client_id,
            config.signals.len()
        );
        Ok(Publisher {
            client_id: config.client_id,
            signals: config.signals.into_iter().collect(),
        })
    }

    fn subscribe(&mut self, config: SubscriberConfig) -> Result<Subscription> {
        self.check_known(&config.signals)?;
        if self.subscribers.iter().any(|s| s.client_id == config.client_id) {
            return Err(SimError::DuplicateClient(config.client_id));
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        log::debug!(
            "Registered subscriber '{}' ({} signals, on_change={})",
            config.client_id,
            config.signals.len(),
            config.on_change
        );
        self.subscribers.push(Subscriber {
            client_id: config.client_id.clone(),
            signals: config.signals.into_iter().collect(),
            on_change: config.on_change,
            delivered: HashMap::new(),
            sender,
        });
        Ok(Subscription {
            client_id: config.client_id,
            receiver,
        })
    }

    fn publish(&mut self, publisher: &Publisher, values: &[(SignalRef, i64)]) -> Result<()> {
        // Validate the whole batch before touching any state
        for (signal, _) in values {
            if !publisher.declares(signal) {
                return Err(SimError::UndeclaredSignal {
                    client_id: publisher.client_id.clone(),
                    signal: signal.clone(),
                });
            }
            self.database.signal(signal)?;
        }

        let timestamp = Utc::now();
        let mut messages = BTreeSet::new();
        for (signal, raw) in values {
            messages.insert(signal.message.clone());
            self.latest.insert(signal.clone(), *raw);

            self.subscribers.retain_mut(|subscriber| {
                if !subscriber.signals.contains(signal) {
                    return true;
                }
                let changed = subscriber.delivered.insert(signal.clone(), *raw) != Some(*raw);
                if subscriber.on_change && !changed {
                    return true;
                }
                let update = SignalUpdate {
                    signal: signal.clone(),
                    raw: *raw,
                    timestamp,
                };
                match subscriber.sender.send(update) {
                    Ok(()) => true,
                    Err(_) => {
                        log::debug!("Dropping closed subscription '{}'", subscriber.client_id);
                        false
                    }
                }
            });
        }

        for message in messages {
            *self.traffic.entry(message).or_insert(0) += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{current_angle, ecu_ready, steering_angle, steering_speed};

    fn command_publisher(broker: &mut LocalBroker) -> Publisher {
        broker
            .register_publisher(
                PublisherConfig::new("steering_gateway")
                    .signal(steering_angle())
                    .signal(steering_speed()),
            )
            .unwrap()
    }

    #[test]
    fn test_endpoint_parsing() {
        let endpoint = BrokerEndpoint::parse(DEFAULT_BROKER_URL).unwrap();
        assert_eq!(endpoint, BrokerEndpoint::default());
        assert_eq!(endpoint.to_string(), DEFAULT_BROKER_URL);

        let secure = BrokerEndpoint::parse("https://broker.local:443/").unwrap();
        assert!(secure.secure);
        assert_eq!(secure.host, "broker.local");
        assert_eq!(secure.port, 443);

        assert!(BrokerEndpoint::parse("localhost:50051").is_err());
        assert!(BrokerEndpoint::parse("http://localhost").is_err());
        assert!(BrokerEndpoint::parse("http://:50051").is_err());
        assert!(BrokerEndpoint::parse("http://localhost:99999").is_err());
    }

    #[test]
    fn test_on_change_delivery() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let publisher = command_publisher(&mut broker);
        let subscription = broker
            .subscribe(SubscriberConfig::new("steering_ecu").signal(steering_angle()))
            .unwrap();

        broker.publish(&publisher, &[(steering_angle(), 120)]).unwrap();
        broker.publish(&publisher, &[(steering_angle(), 120)]).unwrap();
        broker.publish(&publisher, &[(steering_angle(), -40)]).unwrap();

        let raws: Vec<i64> = subscription.poll().unwrap().iter().map(|u| u.raw).collect();
        assert_eq!(raws, vec![120, -40]);
        assert!(subscription.poll().unwrap().is_empty());
        assert_eq!(broker.latest(&steering_angle()), Some(-40));
    }

    #[test]
    fn test_late_subscriber_gets_current_value() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let publisher = command_publisher(&mut broker);
        let early = broker
            .subscribe(SubscriberConfig::new("early").signal(steering_angle()))
            .unwrap();
        broker.publish(&publisher, &[(steering_angle(), 75)]).unwrap();

        let late = broker
            .subscribe(SubscriberConfig::new("late").signal(steering_angle()))
            .unwrap();
        broker.publish(&publisher, &[(steering_angle(), 75)]).unwrap();

        let early_raws: Vec<i64> = early.poll().unwrap().iter().map(|u| u.raw).collect();
        let late_raws: Vec<i64> = late.poll().unwrap().iter().map(|u| u.raw).collect();
        assert_eq!(early_raws, vec![75]);
        assert_eq!(late_raws, vec![75]);
    }

    #[test]
    fn test_every_write_delivery() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let publisher = command_publisher(&mut broker);
        let subscription = broker
            .subscribe(
                SubscriberConfig::new("logger")
                    .signal(steering_speed())
                    .with_on_change(false),
            )
            .unwrap();

        for _ in 0..3 {
            broker
                .publish(&publisher, &[(steering_angle(), 1), (steering_speed(), 100)])
                .unwrap();
        }

        let updates = subscription.poll().unwrap();
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|u| u.signal == steering_speed()));
        assert_eq!(broker.message_count("SteeringCommand"), 3);
        assert_eq!(broker.message_count("SteeringStatus"), 0);
    }

    #[test]
    fn test_undeclared_write_is_rejected() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let publisher = command_publisher(&mut broker);

        let err = broker
            .publish(&publisher, &[(steering_angle(), 5), (current_angle(), 5)])
            .unwrap_err();
        assert!(matches!(err, SimError::UndeclaredSignal { .. }));
        // Nothing from the rejected batch was applied
        assert_eq!(broker.latest(&steering_angle()), None);
    }

    #[test]
    fn test_unknown_signals_and_duplicates() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let unknown = SignalRef::new("SteeringStatus", "Torque");
        assert!(broker
            .register_publisher(PublisherConfig::new("x").signal(unknown.clone()))
            .is_err());
        assert!(broker
            .subscribe(SubscriberConfig::new("y").signal(unknown))
            .is_err());

        command_publisher(&mut broker);
        let err = broker
            .register_publisher(PublisherConfig::new("steering_gateway").signal(ecu_ready()))
            .unwrap_err();
        assert!(matches!(err, SimError::DuplicateClient(_)));
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let publisher = command_publisher(&mut broker);
        let subscription = broker
            .subscribe(SubscriberConfig::new("steering_ecu").signal(steering_angle()))
            .unwrap();
        drop(subscription);

        broker.publish(&publisher, &[(steering_angle(), 7)]).unwrap();
        assert_eq!(broker.num_subscribers(), 0);
    }
}
