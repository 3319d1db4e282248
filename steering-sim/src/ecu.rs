//! Steering ECU simulation
//!
//! The ECU subscribes to `SteeringCommand`, follows the commanded angle with
//! an [`AngleTracker`] and reports `SteeringStatus` back on every tick.

use crate::broker::{Publisher, PublisherConfig, SignalBroker, SubscriberConfig, Subscription};
use crate::config::EcuConfig;
use crate::signals::{
    current_angle, ecu_ready, steering_angle, steering_speed, SignalDatabase, SignalDefinition,
};
use crate::tracker::AngleTracker;
use crate::types::Result;

/// What happened during one ECU tick
#[derive(Debug, Clone, PartialEq)]
pub struct EcuTick {
    /// Commanded angles received this tick (already clamped), oldest first
    pub commands: Vec<f64>,
    /// Angle after the tracking step
    pub current_angle: f64,
    pub target_angle: f64,
    pub ready: bool,
}

pub struct SteeringEcu {
    config: EcuConfig,
    tracker: AngleTracker,
    ready: bool,
    subscription: Subscription,
    publisher: Publisher,
    angle_def: SignalDefinition,
    status_def: SignalDefinition,
}

impl SteeringEcu {
    /// Subscribe to commands and register the status publisher
    pub fn new<B: SignalBroker>(broker: &mut B, config: EcuConfig) -> Result<Self> {
        let tracker = AngleTracker::new(config.tracker)?;
        let subscription = broker.subscribe(
            SubscriberConfig::new(config.client_id.clone())
                .signal(steering_angle())
                .signal(steering_speed()),
        )?;
        let publisher = broker.register_publisher(
            PublisherConfig::new(config.status_client_id.clone())
                .signal(current_angle())
                .signal(ecu_ready()),
        )?;

        let db = SignalDatabase::steering_bus();
        let angle_def = db.signal(&steering_angle())?.clone();
        let status_def = db.signal(&current_angle())?.clone();

        Ok(Self {
            config,
            tracker,
            ready: true,
            subscription,
            publisher,
            angle_def,
            status_def,
        })
    }

    pub fn config(&self) -> &EcuConfig {
        &self.config
    }

    pub fn tracker(&self) -> &AngleTracker {
        &self.tracker
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Apply pending commands, advance by `dt` seconds and publish status
    pub fn tick<B: SignalBroker>(&mut self, broker: &mut B, dt: f64) -> Result<EcuTick> {
        let mut commands = Vec::new();
        for update in self.subscription.poll()? {
            if update.signal == steering_angle() {
                self.tracker.set_target(self.angle_def.decode(update.raw));
                commands.push(self.tracker.target());
            } else if update.signal == steering_speed() {
                log::debug!("SteeringSpeed = {} deg/s (not used by the model)", update.raw);
            }
        }

        self.tracker.step(dt);

        broker.publish(
            &self.publisher,
            &[
                (current_angle(), self.status_def.encode(self.tracker.current())),
                (ecu_ready(), i64::from(self.ready)),
            ],
        )?;

        Ok(EcuTick {
            commands,
            current_angle: self.tracker.current(),
            target_angle: self.tracker.target(),
            ready: self.ready,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{LocalBroker, DEFAULT_BROKER_URL};

    fn setup() -> (LocalBroker, Publisher, SteeringEcu) {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let commander = broker
            .register_publisher(
                PublisherConfig::new("test_gateway")
                    .signal(steering_angle())
                    .signal(steering_speed()),
            )
            .unwrap();
        let ecu = SteeringEcu::new(&mut broker, EcuConfig::default()).unwrap();
        (broker, commander, ecu)
    }

    #[test]
    fn test_idle_ecu_reports_ready_at_zero() {
        let (mut broker, _commander, mut ecu) = setup();
        let tick = ecu.tick(&mut broker, 0.1).unwrap();
        assert!(tick.commands.is_empty());
        assert_eq!(tick.current_angle, 0.0);
        assert_eq!(broker.latest(&current_angle()), Some(0));
        assert_eq!(broker.latest(&ecu_ready()), Some(1));
    }

    #[test]
    fn test_follows_command_at_max_rate() {
        let (mut broker, commander, mut ecu) = setup();
        broker.publish(&commander, &[(steering_angle(), 1000)]).unwrap();

        let tick = ecu.tick(&mut broker, 0.1).unwrap();
        assert_eq!(tick.commands, vec![100.0]);
        assert!((tick.current_angle - 5.0).abs() < 1e-9);
        assert_eq!(broker.latest(&current_angle()), Some(50));

        for _ in 0..30 {
            ecu.tick(&mut broker, 0.1).unwrap();
        }
        assert_eq!(ecu.tracker().current(), 100.0);
        assert_eq!(broker.latest(&current_angle()), Some(1000));
    }

    #[test]
    fn test_out_of_range_command_is_clamped() {
        let (mut broker, commander, mut ecu) = setup();
        broker.publish(&commander, &[(steering_angle(), 30_000)]).unwrap();
        let tick = ecu.tick(&mut broker, 0.0).unwrap();
        assert_eq!(tick.commands, vec![2000.0]);
        assert_eq!(tick.target_angle, 2000.0);
        assert_eq!(tick.current_angle, 0.0);
    }

    #[test]
    fn test_latest_command_wins_within_a_tick() {
        let (mut broker, commander, mut ecu) = setup();
        broker.publish(&commander, &[(steering_angle(), 100)]).unwrap();
        broker.publish(&commander, &[(steering_angle(), -200)]).unwrap();
        broker.publish(&commander, &[(steering_speed(), 100)]).unwrap();

        let tick = ecu.tick(&mut broker, 0.0).unwrap();
        assert_eq!(tick.commands.len(), 2);
        assert_eq!(tick.target_angle, -20.0);
    }
}
