//! Steering Simulation Library
//!
//! Building blocks for a vehicle-signal broker demo: a steering ECU that
//! follows angle commands, a gateway that publishes them, and the data model
//! behind the live charts and the network topology view.
//!
//! # Architecture
//!
//! - [`tracker::AngleTracker`] is the ECU response model: rate-limited
//!   tracking of a clamped target angle.
//! - [`broker::SignalBroker`] is the seam to the signal broker. The
//!   in-process [`broker::LocalBroker`] stands in for a broker deployment.
//! - [`gateway::Gateway`] and [`ecu::SteeringEcu`] are the two bus
//!   participants; each exposes a `tick` to be called from a polling loop.
//! - [`scene::SteeringScene`] drives the animated views (charts + topology).
//!
//! The library does NOT sleep, render, or handle signals; the loops and the
//! drawing live in the application layer (steering-cli).
//!
//! # Example Usage
//!
//! ```
//! use steering_sim::{EcuConfig, Gateway, GatewayConfig, LocalBroker, SteeringEcu};
//!
//! let mut broker = LocalBroker::connect("http://localhost:50051").unwrap();
//! let mut gateway = Gateway::new(&mut broker, GatewayConfig::default()).unwrap();
//! let mut ecu = SteeringEcu::new(&mut broker, EcuConfig::default()).unwrap();
//!
//! for _ in 0..5 {
//!     let command = gateway.tick(&mut broker).unwrap();
//!     let status = ecu.tick(&mut broker, 0.1).unwrap();
//!     println!("cmd {:6.1}° -> ecu {:6.1}°", command.angle, status.current_angle);
//! }
//! ```

// Public modules
pub mod broker;
pub mod command;
pub mod config;
pub mod ecu;
pub mod gateway;
pub mod scene;
pub mod signals;
pub mod topology;
pub mod trace;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use broker::{
    BrokerEndpoint, LocalBroker, Publisher, PublisherConfig, SignalBroker, SubscriberConfig,
    Subscription, DEFAULT_BROKER_URL,
};
pub use command::{CommandSource, GatewaySine, RealisticCommand};
pub use config::{EcuConfig, GatewayConfig, SceneConfig, TrackerConfig};
pub use ecu::{EcuTick, SteeringEcu};
pub use gateway::{Gateway, PublishedCommand};
pub use scene::{FrameUpdate, SteeringScene};
pub use signals::SignalDatabase;
pub use topology::{EdgeStyle, Flow, MessageActivity, Topology, TrafficWatch};
pub use trace::{TraceBuffer, TraceSample};
pub use tracker::AngleTracker;
pub use types::{Result, SignalRef, SignalUpdate, SimError, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
