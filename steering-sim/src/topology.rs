//! Network topology of the steering demo
//!
//! Models the nodes and message routes of the demo setup (gateway, CAN bus,
//! broker, steering ECU) together with the "flash" counters that highlight
//! a route for a few frames after traffic was seen on it.

use crate::broker::LocalBroker;
use crate::signals::{STEERING_COMMAND, STEERING_COMMAND_ID, STEERING_STATUS, STEERING_STATUS_ID};
use std::fmt;

pub const GATEWAY: &str = "Gateway";
pub const BROKER: &str = "RemotiveBroker";
pub const STEERING_ECU: &str = "Steering_ECU";
pub const CAN_BUS: &str = "CAN_Bus";

/// Frames an edge stays highlighted after a trigger
pub const FLASH_FRAMES: u8 = 10;
/// Trigger period in frames (command at 0, status half a period later)
pub const FLASH_PERIOD: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Ecu,
    Broker,
    Bus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: &'static str,
    pub label: String,
    pub kind: NodeKind,
    pub color: &'static str,
    pub size: u32,
    pub position: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Tx,
    Rx,
    RxTx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Tx => f.pad("TX"),
            Direction::Rx => f.pad("RX"),
            Direction::RxTx => f.pad("RX/TX"),
        }
    }
}

/// Which message stream an edge carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Command,
    Status,
    Infrastructure,
}

impl Flow {
    pub fn color(&self) -> &'static str {
        match self {
            Flow::Command => "blue",
            Flow::Status => "red",
            Flow::Infrastructure => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    pub message: String,
    /// CAN ID, `None` for "any"
    pub msg_id: Option<u32>,
    pub direction: Direction,
    pub flow: Flow,
    pub weight: f64,
}

impl Edge {
    /// Two-line label: message name and ID
    pub fn label(&self) -> String {
        let id = match self.msg_id {
            Some(id) => id.to_string(),
            None => "*".to_string(),
        };
        format!("{}\n(ID: {})", self.message, id)
    }
}

/// Frames of highlight left for each message stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageActivity {
    pub command: u8,
    pub status: u8,
}

impl MessageActivity {
    /// Periodic trigger used by the animations
    pub fn trigger(&mut self, frame: u64) {
        match frame % FLASH_PERIOD {
            0 => self.command = FLASH_FRAMES,
            p if p == FLASH_PERIOD / 2 => self.status = FLASH_FRAMES,
            _ => {}
        }
    }

    /// Highlight a stream because real traffic was observed
    pub fn flash(&mut self, flow: Flow) {
        match flow {
            Flow::Command => self.command = FLASH_FRAMES,
            Flow::Status => self.status = FLASH_FRAMES,
            Flow::Infrastructure => {}
        }
    }

    pub fn decay(&mut self) {
        self.command = self.command.saturating_sub(1);
        self.status = self.status.saturating_sub(1);
    }

    pub fn is_active(&self, flow: Flow) -> bool {
        match flow {
            Flow::Command => self.command > 0,
            Flow::Status => self.status > 0,
            Flow::Infrastructure => false,
        }
    }

    pub fn level(&self, flow: Flow) -> u8 {
        match flow {
            Flow::Command => self.command,
            Flow::Status => self.status,
            Flow::Infrastructure => 0,
        }
    }
}

/// Turns the broker's per-message traffic counters into activity flashes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficWatch {
    command: u64,
    status: u64,
}

impl TrafficWatch {
    /// Flash every stream whose message count rose since the last call
    ///
    /// Returns true if anything was flashed.
    pub fn observe(&mut self, broker: &LocalBroker, activity: &mut MessageActivity) -> bool {
        let command = broker.message_count(STEERING_COMMAND);
        let status = broker.message_count(STEERING_STATUS);
        let mut flashed = false;
        if command > self.command {
            activity.flash(Flow::Command);
            flashed = true;
        }
        if status > self.status {
            activity.flash(Flow::Status);
            flashed = true;
        }
        self.command = command;
        self.status = status;
        flashed
    }
}

/// Drawing attributes of an edge for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: &'static str,
    pub alpha: f64,
    pub width: f64,
}

impl EdgeStyle {
    pub const IDLE_ALPHA: f64 = 0.4;
    pub const ACTIVE_ALPHA: f64 = 0.9;
    pub const ACTIVE_WIDTH_SCALE: f64 = 1.5;

    pub fn for_edge(edge: &Edge, activity: &MessageActivity) -> Self {
        let (alpha, width) = if activity.is_active(edge.flow) {
            (Self::ACTIVE_ALPHA, edge.weight * Self::ACTIVE_WIDTH_SCALE)
        } else {
            (Self::IDLE_ALPHA, edge.weight)
        };
        Self {
            color: edge.flow.color(),
            alpha,
            width,
        }
    }
}

/// Opacity of the flow arrows in the bus diagram for a flash level
pub fn arrow_alpha(flash: u8) -> f64 {
    (1.0 - f64::from(flash) / f64::from(FLASH_FRAMES)).max(0.3)
}

/// Directed graph of the demo network
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Topology {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Gateway → CAN bus → broker → ECU, and the status path back
    pub fn steering_network() -> Self {
        let mut topology = Self::new();
        topology.add_node(Node {
            id: GATEWAY,
            label: "Gateway\n(Publisher)".to_string(),
            kind: NodeKind::Ecu,
            color: "lightblue",
            size: 3000,
            position: (0.0, 1.0),
        });
        topology.add_node(Node {
            id: BROKER,
            label: "RemotiveBroker\nlocalhost:50051".to_string(),
            kind: NodeKind::Broker,
            color: "lightgreen",
            size: 4000,
            position: (1.0, 1.0),
        });
        topology.add_node(Node {
            id: STEERING_ECU,
            label: "Steering ECU\n(Subscriber)".to_string(),
            kind: NodeKind::Ecu,
            color: "lightcoral",
            size: 3000,
            position: (2.0, 1.0),
        });
        topology.add_node(Node {
            id: CAN_BUS,
            label: "Virtual CAN\nSteeringBus".to_string(),
            kind: NodeKind::Bus,
            color: "gold",
            size: 2500,
            position: (1.0, 2.0),
        });

        let command = |from, to, direction| Edge {
            from,
            to,
            message: STEERING_COMMAND.to_string(),
            msg_id: Some(STEERING_COMMAND_ID),
            direction,
            flow: Flow::Command,
            weight: 2.0,
        };
        let status = |from, to, direction| Edge {
            from,
            to,
            message: STEERING_STATUS.to_string(),
            msg_id: Some(STEERING_STATUS_ID),
            direction,
            flow: Flow::Status,
            weight: 2.0,
        };
        let traffic = |from, to| Edge {
            from,
            to,
            message: "CAN Traffic".to_string(),
            msg_id: None,
            direction: Direction::RxTx,
            flow: Flow::Infrastructure,
            weight: 3.0,
        };

        topology.add_edge(command(GATEWAY, CAN_BUS, Direction::Tx));
        topology.add_edge(traffic(CAN_BUS, BROKER));
        topology.add_edge(command(BROKER, STEERING_ECU, Direction::Rx));
        topology.add_edge(status(STEERING_ECU, BROKER, Direction::Tx));
        topology.add_edge(traffic(BROKER, CAN_BUS));
        topology.add_edge(status(CAN_BUS, GATEWAY, Direction::Rx));
        topology
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.retain(|n| n.id != node.id);
        self.nodes.push(node);
    }

    /// Edges between unknown nodes are ignored
    pub fn add_edge(&mut self, edge: Edge) {
        if self.node(edge.from).is_none() || self.node(edge.to).is_none() {
            log::warn!("Ignoring edge {} -> {}: unknown node", edge.from, edge.to);
            return;
        }
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of a node
    fn successors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Route of a message stream from its sender to its receiver
    ///
    /// Follows edges of `flow`, crossing infrastructure edges where the
    /// stream has no direct hop.
    pub fn route(&self, flow: Flow) -> Vec<&'static str> {
        let Some(first) = self.edges.iter().find(|e| e.flow == flow) else {
            return Vec::new();
        };
        let mut path = vec![first.from, first.to];
        let mut current = first.to;
        loop {
            let unvisited = |e: &&Edge| !path.contains(&e.to);
            let next = self
                .successors(current)
                .filter(unvisited)
                .find(|e| e.flow == flow)
                .or_else(|| {
                    self.successors(current)
                        .filter(unvisited)
                        .find(|e| e.flow == Flow::Infrastructure)
                });
            match next {
                Some(edge) => {
                    current = edge.to;
                    path.push(current);
                }
                None => return path,
            }
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::steering_network()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steering_network_shape() {
        let topology = Topology::steering_network();
        assert_eq!(topology.nodes().len(), 4);
        assert_eq!(topology.edges().len(), 6);
        assert_eq!(topology.node(CAN_BUS).unwrap().position, (1.0, 2.0));
        assert_eq!(topology.successors(BROKER).count(), 2);
    }

    #[test]
    fn test_direction_display_pads() {
        assert_eq!(format!("{:<5}|", Direction::Tx), "TX   |");
        assert_eq!(Direction::RxTx.to_string(), "RX/TX");
    }

    #[test]
    fn test_edge_labels() {
        let topology = Topology::steering_network();
        let labels: Vec<String> = topology.edges().iter().map(Edge::label).collect();
        assert_eq!(labels[0], "SteeringCommand\n(ID: 100)");
        assert_eq!(labels[1], "CAN Traffic\n(ID: *)");
        assert_eq!(labels[3], "SteeringStatus\n(ID: 200)");
    }

    #[test]
    fn test_activity_trigger_and_decay() {
        let mut activity = MessageActivity::default();
        activity.trigger(0);
        assert_eq!(activity.command, 10);
        assert_eq!(activity.status, 0);

        for frame in 1..10 {
            activity.trigger(frame);
            activity.decay();
        }
        assert_eq!(activity.command, 1);

        activity.trigger(10);
        assert_eq!(activity.status, 10);
        activity.decay();
        assert_eq!(activity.command, 0);
        assert!(!activity.is_active(Flow::Command));
        assert!(activity.is_active(Flow::Status));

        activity.decay();
        assert_eq!(activity.command, 0);
    }

    #[test]
    fn test_edge_style() {
        let topology = Topology::steering_network();
        let command_edge = &topology.edges()[0];
        let bus_edge = &topology.edges()[1];
        let mut activity = MessageActivity::default();

        let idle = EdgeStyle::for_edge(command_edge, &activity);
        assert_eq!((idle.alpha, idle.width, idle.color), (0.4, 2.0, "blue"));

        activity.flash(Flow::Command);
        let active = EdgeStyle::for_edge(command_edge, &activity);
        assert_eq!((active.alpha, active.width), (0.9, 3.0));

        let bus = EdgeStyle::for_edge(bus_edge, &activity);
        assert_eq!((bus.alpha, bus.width, bus.color), (0.4, 3.0, "gray"));
    }

    #[test]
    fn test_arrow_alpha() {
        assert_eq!(arrow_alpha(0), 1.0);
        assert!((arrow_alpha(5) - 0.5).abs() < 1e-12);
        assert_eq!(arrow_alpha(10), 0.3);
    }

    #[test]
    fn test_traffic_watch_flashes_on_new_traffic() {
        use crate::broker::{PublisherConfig, SignalBroker, DEFAULT_BROKER_URL};
        use crate::signals::{current_angle, steering_angle};

        let mut broker = LocalBroker::connect(DEFAULT_BROKER_URL).unwrap();
        let gateway = broker
            .register_publisher(PublisherConfig::new("gw").signal(steering_angle()))
            .unwrap();
        let ecu = broker
            .register_publisher(PublisherConfig::new("ecu").signal(current_angle()))
            .unwrap();
        let mut watch = TrafficWatch::default();
        let mut activity = MessageActivity::default();

        assert!(!watch.observe(&broker, &mut activity));
        assert_eq!(activity, MessageActivity::default());

        broker.publish(&gateway, &[(steering_angle(), 10)]).unwrap();
        assert!(watch.observe(&broker, &mut activity));
        assert_eq!(activity.command, FLASH_FRAMES);
        assert_eq!(activity.status, 0);

        activity.decay();
        assert!(!watch.observe(&broker, &mut activity));
        assert_eq!(activity.command, FLASH_FRAMES - 1);

        broker.publish(&ecu, &[(current_angle(), 0)]).unwrap();
        assert!(watch.observe(&broker, &mut activity));
        assert_eq!(activity.status, FLASH_FRAMES);
        assert_eq!(activity.command, FLASH_FRAMES - 1);
    }

    #[test]
    fn test_command_route() {
        let topology = Topology::steering_network();
        assert_eq!(
            topology.route(Flow::Command),
            vec![GATEWAY, CAN_BUS, BROKER, STEERING_ECU]
        );
        assert_eq!(
            topology.route(Flow::Status),
            vec![STEERING_ECU, BROKER, CAN_BUS, GATEWAY]
        );
        assert!(Topology::new().route(Flow::Command).is_empty());
    }
}
