//! Steering Demo CLI Application
//!
//! Command-line front end for the steering-sim library:
//! - `publish`  – steering command publisher (gateway)
//! - `ecu`      – steering ECU simulator
//! - `demo`     – gateway and ECU sharing one broker channel
//! - `plot`     – live command/response chart
//! - `topology` – live network topology with message flow

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};
use steering_sim::{
    Gateway, LocalBroker, MessageActivity, SceneConfig, SteeringEcu, SteeringScene, TrafficWatch,
};

mod config;
mod report;
mod state;

use config::AppConfig;
use state::{LoopExit, RunState};

/// Steering Demo - simulate a steering ECU on a vehicle signal broker
#[derive(Parser, Debug)]
#[command(name = "steering-demo")]
#[command(about = "Steering ECU simulation and live signal views", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish steering commands (sine pattern)
    Publish {
        #[command(flatten)]
        run: BrokerRunArgs,
    },
    /// Run the steering ECU simulator
    Ecu {
        #[command(flatten)]
        run: BrokerRunArgs,
    },
    /// Run gateway and ECU together on one broker channel
    Demo {
        #[command(flatten)]
        run: BrokerRunArgs,

        /// Redraw a bus diagram that flashes on broker traffic
        #[arg(long)]
        diagram: bool,
    },
    /// Live chart of steering command vs. ECU response
    Plot {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Live network topology with animated message flow
    Topology {
        /// Diagram style
        #[arg(long, value_enum, default_value_t = Layout::Graph)]
        layout: Layout,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(clap::Args, Debug)]
struct BrokerRunArgs {
    /// Broker URL (overrides [broker] url)
    #[arg(long, value_name = "URL")]
    broker: Option<String>,

    /// Stop after this many ticks
    #[arg(long, value_name = "COUNT")]
    ticks: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct ViewArgs {
    /// Stop after this many frames
    #[arg(long, value_name = "COUNT")]
    frames: Option<u64>,

    /// Write the buffered trace as JSON on exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Print frames one after another instead of redrawing the screen
    #[arg(long)]
    no_clear: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    /// Node/edge graph, redrawn every other frame
    Graph,
    /// Bus line with two flow arrows
    Bus,
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);
    log::info!("Steering Demo CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using simulation library v{}", steering_sim::VERSION);

    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        eprintln!("\n❌ Error: {:?}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let state = RunState::new();
    state.install_interrupt_handler()?;

    match args.command {
        Command::Publish { run } => publish_mode(&config, &run, &state),
        Command::Ecu { run } => ecu_mode(&config, &run, &state),
        Command::Demo { run, diagram } => demo_mode(&config, &run, diagram, &state),
        Command::Plot { view } => plot_mode(&config, &view, &state),
        Command::Topology { layout, view } => topology_mode(&config, layout, &view, &state),
    }
}

fn connect(config: &AppConfig, run: &BrokerRunArgs) -> Result<LocalBroker> {
    let url = run.broker.as_deref().unwrap_or(&config.broker.url);
    println!("📡 Connecting to broker at {}...", url);
    let broker =
        LocalBroker::connect(url).with_context(|| format!("Failed to connect to {}", url))?;
    println!("✓ Connected to broker");
    Ok(broker)
}

/// Steering command publisher
fn publish_mode(config: &AppConfig, run: &BrokerRunArgs, state: &RunState) -> Result<()> {
    println!("🚗 Steering Command Publisher");
    let mut broker = connect(config, run)?;
    let mut gateway = Gateway::new(&mut broker, config.gateway.clone())?;

    println!("\n📊 Publishing steering commands...");
    println!(
        "   (Sine wave pattern: {:.0}° to {:+.0}°)\n",
        -config.gateway.amplitude, config.gateway.amplitude
    );

    let exit = state.run_ticks(config.gateway.tick(), run.ticks, |_| {
        let command = gateway.tick(&mut broker)?;
        println!(
            "📤 Steering Angle: {:6.1}° | Speed: {} deg/s",
            command.angle, command.speed
        );
        Ok(())
    })?;

    if exit == LoopExit::Interrupted {
        println!("\n\n⏹️  Publisher stopped");
    }
    Ok(())
}

/// Steering ECU simulator
fn ecu_mode(config: &AppConfig, run: &BrokerRunArgs, state: &RunState) -> Result<()> {
    println!("🎮 Steering ECU Simulator");
    let mut broker = connect(config, run)?;
    let mut ecu = SteeringEcu::new(&mut broker, config.ecu.clone())?;

    println!("\n🎯 ECU ready - listening for steering commands...\n");

    let mut last_update = Instant::now();
    let exit = state.run_ticks(config.ecu.tick(), run.ticks, |_| {
        let now = Instant::now();
        let dt = now.duration_since(last_update).as_secs_f64();
        last_update = now;

        let tick = ecu.tick(&mut broker, dt)?;
        print_ecu_tick(&tick);
        Ok(())
    })?;

    if exit == LoopExit::Interrupted {
        println!("\n\n⏹️  ECU simulator stopped");
    }
    Ok(())
}

/// Gateway and ECU in one loop: the gateway publishes every Nth ECU tick
///
/// With `diagram` the screen is redrawn each tick and the bus arrows flash
/// when the broker carried traffic for their message.
fn demo_mode(
    config: &AppConfig,
    run: &BrokerRunArgs,
    diagram: bool,
    state: &RunState,
) -> Result<()> {
    println!("🚗 Steering Demo: Gateway → Broker → Steering ECU");
    let mut broker = connect(config, run)?;
    let mut gateway = Gateway::new(&mut broker, config.gateway.clone())?;
    let mut ecu = SteeringEcu::new(&mut broker, config.ecu.clone())?;

    let every = config.gateway_every();
    log::debug!("Gateway publishes every {} ECU ticks", every);

    let mut watch = TrafficWatch::default();
    let mut activity = MessageActivity::default();
    let mut last_update = Instant::now();
    let exit = state.run_ticks(config.ecu.tick(), run.ticks, |tick| {
        if diagram {
            print!("{}", report::CLEAR_SCREEN);
        }
        if tick % every == 0 {
            let command = gateway.tick(&mut broker)?;
            println!(
                "📤 Steering Angle: {:6.1}° | Speed: {} deg/s",
                command.angle, command.speed
            );
        }

        let now = Instant::now();
        let dt = now.duration_since(last_update).as_secs_f64();
        last_update = now;

        let status = ecu.tick(&mut broker, dt)?;
        activity.decay();
        if watch.observe(&broker, &mut activity) {
            log::trace!("Traffic flash: {:?}", activity);
        }
        if diagram {
            println!("{}", report::render_bus_diagram(&activity));
        }
        print_ecu_tick(&status);
        Ok(())
    })?;

    if exit == LoopExit::Interrupted {
        println!("\n\n⏹️  Demo stopped");
    }
    log::info!(
        "Traffic: {} SteeringCommand, {} SteeringStatus",
        broker.message_count("SteeringCommand"),
        broker.message_count("SteeringStatus")
    );
    Ok(())
}

fn print_ecu_tick(tick: &steering_sim::EcuTick) {
    for target in &tick.commands {
        println!("📥 Received command: Target = {:6.1}°", target);
    }
    println!(
        "📤 ECU Status: Current = {:6.1}° | Target = {:6.1}°",
        tick.current_angle, tick.target_angle
    );
}

/// Live command/response chart
fn plot_mode(config: &AppConfig, view: &ViewArgs, state: &RunState) -> Result<()> {
    println!("🚗 Starting Steering CAN Bus Visualizer...");
    println!("📊 Real-time graph showing:");
    println!("   • Top plot: CAN TX - Steering commands (Gateway → ECU)");
    println!("   • Bottom plot: CAN RX - ECU responses (ECU → Gateway)");
    println!("\n💡 Notice the delay between command and response (realistic ECU lag)");
    println!("⏸️  Press Ctrl+C to stop\n");

    let scene_config = config.visualizer.chart.clone();
    let (width, height) = (config.visualizer.width, config.visualizer.height);
    animate(scene_config, view, state, "plot", |scene, update| {
        report::render_chart(scene.trace(), update, width, height)
    })
}

/// Live network topology
fn topology_mode(
    config: &AppConfig,
    layout: Layout,
    view: &ViewArgs,
    state: &RunState,
) -> Result<()> {
    println!("{}", "=".repeat(70));
    println!("  CAN Bus Network Topology Visualizer");
    println!("{}", "=".repeat(70));
    println!("\nMessage Flow:");
    println!("  • Blue edges: SteeringCommand (ID 100) - Gateway → ECU");
    println!("  • Red edges: SteeringStatus (ID 200) - ECU → Gateway");
    println!("  • Gray edges: CAN Bus infrastructure");
    println!("\nPress Ctrl+C to stop.\n");

    let scene_config = match layout {
        Layout::Graph => config.visualizer.network.clone(),
        Layout::Bus => config.visualizer.chart.clone(),
    };
    let (width, height) = (config.visualizer.width, config.visualizer.height);

    let mut network = String::new();
    animate(scene_config, view, state, "topology", |scene, update| {
        if update.redraw_network {
            network = match layout {
                Layout::Graph => report::render_topology(scene.topology(), &update.activity),
                Layout::Bus => report::render_bus_diagram(&update.activity),
            };
        }
        format!(
            "{}\n{}",
            network,
            report::render_chart(scene.trace(), update, width, height)
        )
    })
}

/// Frame loop shared by the animated views
fn animate<F>(
    scene_config: SceneConfig,
    view: &ViewArgs,
    state: &RunState,
    name: &str,
    mut draw: F,
) -> Result<()>
where
    F: FnMut(&SteeringScene, &steering_sim::FrameUpdate) -> String,
{
    let interval: Duration = scene_config.frame_interval();
    let mut scene = SteeringScene::new(scene_config)?;
    let start = Instant::now();
    let mut frames = 0u64;

    let exit = state.run_ticks(interval, view.frames, |frame| {
        let t = start.elapsed().as_secs_f64();
        let update = scene.update(frame, t);
        let text = draw(&scene, &update);
        if view.no_clear {
            println!("{}", text);
        } else {
            print!("{}{}", report::CLEAR_SCREEN, text);
        }
        frames = frame + 1;
        Ok(())
    })?;

    if exit == LoopExit::Interrupted {
        println!("\n\n⏹️  Visualization stopped");
    }
    if let Some(path) = &view.export {
        report::export_trace(path, name, frames, scene.trace())?;
        println!("💾 Trace written to {:?}", path);
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::parse_from(["steering-demo", "-vv", "ecu", "--ticks", "3"]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Ecu { run } => assert_eq!(run.ticks, Some(3)),
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::parse_from([
            "steering-demo",
            "topology",
            "--layout",
            "bus",
            "--frames",
            "10",
        ]);
        match args.command {
            Command::Topology { layout, view } => {
                assert_eq!(layout, Layout::Bus);
                assert_eq!(view.frames, Some(10));
                assert!(!view.no_clear);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_demo_mode_runs_headless() {
        let state = RunState::new();
        let run = BrokerRunArgs {
            broker: None,
            ticks: Some(3),
        };
        let mut config = AppConfig::default();
        config.ecu.tick_ms = 1;
        config.gateway.tick_ms = 2;
        demo_mode(&config, &run, false, &state).unwrap();
    }

    #[test]
    fn test_demo_mode_with_bus_diagram() {
        let state = RunState::new();
        let run = BrokerRunArgs {
            broker: None,
            ticks: Some(4),
        };
        let mut config = AppConfig::default();
        config.ecu.tick_ms = 1;
        config.gateway.tick_ms = 2;
        demo_mode(&config, &run, true, &state).unwrap();

        let args = Args::parse_from(["steering-demo", "demo", "--diagram", "--ticks", "2"]);
        match args.command {
            Command::Demo { run, diagram } => {
                assert!(diagram);
                assert_eq!(run.ticks, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    fn headless_view(frames: u64, export: Option<PathBuf>) -> ViewArgs {
        ViewArgs {
            frames: Some(frames),
            export,
            no_clear: true,
        }
    }

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.visualizer.chart = config.visualizer.chart.with_frame_ms(1);
        config.visualizer.network = config.visualizer.network.with_frame_ms(1);
        config
    }

    #[test]
    fn test_topology_bus_layout_exports_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus.json");
        let view = headless_view(3, Some(path.clone()));

        topology_mode(&fast_config(), Layout::Bus, &view, &RunState::new()).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let value: serde_json::Value = serde_json::from_reader(file).unwrap();
        assert_eq!(value["view"], "topology");
        assert_eq!(value["frames"], 3);
        assert_eq!(value["samples"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_topology_graph_layout_runs() {
        let view = headless_view(5, None);
        topology_mode(&fast_config(), Layout::Graph, &view, &RunState::new()).unwrap();
    }

    #[test]
    fn test_plot_mode_exports_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.json");
        let view = headless_view(4, Some(path.clone()));

        plot_mode(&fast_config(), &view, &RunState::new()).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let value: serde_json::Value = serde_json::from_reader(file).unwrap();
        assert_eq!(value["view"], "plot");
        assert_eq!(value["samples"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_animate_caches_network_text_between_redraws() {
        let mut config = SceneConfig::network_view().with_frame_ms(1);
        config.network_redraw_every = 2;
        let view = headless_view(4, None);
        let mut drawn = Vec::new();
        let mut network = String::new();

        animate(config, &view, &RunState::new(), "topology", |scene, update| {
            if update.redraw_network {
                network = format!("frame {}", update.frame);
            }
            drawn.push(network.clone());
            scene.trace().len().to_string()
        })
        .unwrap();

        assert_eq!(drawn, vec!["frame 0", "frame 0", "frame 2", "frame 2"]);
    }

    #[test]
    fn test_bad_broker_url_is_an_error() {
        let state = RunState::new();
        let run = BrokerRunArgs {
            broker: Some("not-a-url".to_string()),
            ticks: Some(1),
        };
        assert!(publish_mode(&AppConfig::default(), &run, &state).is_err());
    }
}
