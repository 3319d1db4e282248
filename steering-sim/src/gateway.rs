//! Steering command publisher
//!
//! The gateway writes `SteeringCommand` frames: the commanded angle from a
//! [`CommandSource`] plus a constant steering speed.

use crate::broker::{Publisher, PublisherConfig, SignalBroker};
use crate::command::{CommandSource, GatewaySine};
use crate::config::GatewayConfig;
use crate::signals::{steering_angle, steering_speed, SignalDatabase, SignalDefinition};
use crate::types::Result;

/// Values written by one gateway tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedCommand {
    /// Commanded angle in degrees
    pub angle: f64,
    /// Raw value written for SteeringAngle
    pub raw_angle: i64,
    /// Announced steering speed (deg/s)
    pub speed: i64,
}

pub struct Gateway<S = GatewaySine> {
    config: GatewayConfig,
    publisher: Publisher,
    angle_def: SignalDefinition,
    source: S,
    started: Option<std::time::Instant>,
}

impl Gateway<GatewaySine> {
    /// Register the gateway publisher with the sine pattern from `config`
    pub fn new<B: SignalBroker>(broker: &mut B, config: GatewayConfig) -> Result<Self> {
        let source = GatewaySine::new(config.amplitude, config.phase_step);
        Self::with_source(broker, config, source)
    }
}

impl<S: CommandSource> Gateway<S> {
    pub fn with_source<B: SignalBroker>(
        broker: &mut B,
        config: GatewayConfig,
        source: S,
    ) -> Result<Self> {
        let publisher = broker.register_publisher(
            PublisherConfig::new(config.client_id.clone())
                .signal(steering_angle())
                .signal(steering_speed()),
        )?;
        let angle_def = SignalDatabase::steering_bus().signal(&steering_angle())?.clone();

        Ok(Self {
            config,
            publisher,
            angle_def,
            source,
            started: None,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Generate and publish the next command
    pub fn tick<B: SignalBroker>(&mut self, broker: &mut B) -> Result<PublishedCommand> {
        let started = *self.started.get_or_insert_with(std::time::Instant::now);
        let angle = self.source.next_command(started.elapsed().as_secs_f64());
        let raw_angle = self.angle_def.encode(angle);
        let speed = self.config.steering_speed;

        broker.publish(
            &self.publisher,
            &[(steering_angle(), raw_angle), (steering_speed(), speed)],
        )?;
        log::debug!("Published SteeringAngle raw={} speed={}", raw_angle, speed);

        Ok(PublishedCommand {
            angle,
            raw_angle,
            speed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{LocalBroker, SubscriberConfig, DEFAULT_BROKER_URL};

    #[test]
    fn test_gateway_publishes_sine_commands() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let subscription = broker
            .subscribe(
                SubscriberConfig::new("probe")
                    .signal(steering_angle())
                    .signal(steering_speed()),
            )
            .unwrap();
        let mut gateway = Gateway::new(&mut broker, GatewayConfig::default()).unwrap();

        let first = gateway.tick(&mut broker).unwrap();
        assert_eq!(first.raw_angle, 0);
        assert_eq!(first.speed, 100);

        let second = gateway.tick(&mut broker).unwrap();
        assert_eq!(second.raw_angle, (500.0 * 0.1f64.sin() * 10.0) as i64);

        let updates = subscription.poll().unwrap();
        // angle 0, speed 100, angle 499; the repeated speed is suppressed
        assert_eq!(updates.len(), 3);
        assert_eq!(broker.latest(&steering_speed()), Some(100));
        assert_eq!(broker.message_count("SteeringCommand"), 2);
    }

    #[test]
    fn test_gateway_client_id_must_be_unique() {
        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        Gateway::new(&mut broker, GatewayConfig::default()).unwrap();
        assert!(Gateway::new(&mut broker, GatewayConfig::default()).is_err());
    }
}
