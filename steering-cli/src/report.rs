//! Text rendering of the live views and JSON trace export
//!
//! The charts are drawn into a fixed character grid: one panel for the
//! gateway command (CAN TX) and one for the ECU response (CAN RX). The
//! network view lists each route with its current highlight.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use steering_sim::topology::{arrow_alpha, MessageActivity};
use steering_sim::trace::Y_LIMITS;
use steering_sim::{EdgeStyle, Flow, FrameUpdate, Topology, TraceBuffer, TraceSample};

/// ANSI sequence: clear screen and move the cursor home
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Draw one series into a `width` × `height` grid
///
/// Points outside the x-window are skipped; y is clipped to the panel.
pub fn plot_series(
    points: &[(f64, f64)],
    x_window: (f64, f64),
    y_limits: (f64, f64),
    width: usize,
    height: usize,
    glyph: char,
) -> Vec<String> {
    let mut grid = vec![vec![' '; width]; height];
    let (x_min, x_max) = x_window;
    let (y_min, y_max) = y_limits;
    if width == 0 || height == 0 || x_max <= x_min || y_max <= y_min {
        return grid.into_iter().map(|row| row.into_iter().collect()).collect();
    }

    // Zero line
    let zero_row = scale(0.0, y_min, y_max, height);
    if (y_min..=y_max).contains(&0.0) {
        let row = height - 1 - zero_row;
        grid[row].iter_mut().for_each(|c| *c = '·');
    }

    for &(x, y) in points {
        if x < x_min || x > x_max {
            continue;
        }
        let col = scale(x, x_min, x_max, width);
        let row = height - 1 - scale(y.clamp(y_min, y_max), y_min, y_max, height);
        grid[row][col] = glyph;
    }

    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// Map `value` in `[min, max]` to a cell index in `0..cells`
fn scale(value: f64, min: f64, max: f64, cells: usize) -> usize {
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    ((ratio * (cells - 1) as f64).round() as usize).min(cells - 1)
}

fn panel(
    title: &str,
    points: &[(f64, f64)],
    x_window: (f64, f64),
    width: usize,
    height: usize,
    glyph: char,
) -> String {
    let mut out = format!("{}\n", title);
    let rows = plot_series(points, x_window, Y_LIMITS, width, height, glyph);
    for (i, row) in rows.iter().enumerate() {
        let label = if i == 0 {
            format!("{:>5}", Y_LIMITS.1)
        } else if i == rows.len() - 1 {
            format!("{:>5}", Y_LIMITS.0)
        } else {
            " ".repeat(5)
        };
        out.push_str(&format!("{} │{}│\n", label, row));
    }
    out.push_str(&format!(
        "      {:<w$.1}{:>.1} s\n",
        x_window.0,
        x_window.1,
        w = width.saturating_sub(4)
    ));
    out
}

/// Command and response panels for the current frame
pub fn render_chart(
    trace: &TraceBuffer,
    update: &FrameUpdate,
    width: usize,
    height: usize,
) -> String {
    let mut out = format!("CAN Bus Steering Simulation | {}\n\n", update.status_line());

    let Some(x_window) = update.x_window else {
        out.push_str("(waiting for data)\n");
        return out;
    };

    let commands: Vec<(f64, f64)> = trace.iter().map(|s| (s.t, s.command)).collect();
    let responses: Vec<(f64, f64)> = trace.iter().map(|s| (s.t, s.response)).collect();

    out.push_str(&panel(
        "CAN TX: Gateway → ECU (SteeringCommand, ID 100)",
        &commands,
        x_window,
        width,
        height,
        '*',
    ));
    out.push('\n');
    out.push_str(&panel(
        "CAN RX: ECU → Gateway (SteeringStatus, ID 200)",
        &responses,
        x_window,
        width,
        height,
        '+',
    ));
    out
}

/// Shade character for an opacity in `[0, 1]`
pub fn shade(alpha: f64) -> char {
    let idx = (alpha.clamp(0.0, 1.0) * (SHADES.len() - 1) as f64).round() as usize;
    SHADES[idx]
}

/// One line per edge with its style for this frame, then the two message routes
pub fn render_topology(topology: &Topology, activity: &MessageActivity) -> String {
    let mut out = String::from("CAN Bus Network Architecture\n");
    for edge in topology.edges() {
        let style = EdgeStyle::for_edge(edge, activity);
        let line = if style.alpha >= EdgeStyle::ACTIVE_ALPHA { '━' } else { '─' };
        let stroke: String = std::iter::repeat(line)
            .take(style.width.round() as usize * 2)
            .collect();
        out.push_str(&format!(
            "  {:<14} {}▶ {:<14} {:<5} {} [{}]\n",
            edge.from,
            stroke,
            edge.to,
            edge.direction,
            edge.label().replace('\n', " "),
            style.color,
        ));
    }
    for (name, flow) in [("Command", Flow::Command), ("Status", Flow::Status)] {
        let marker = if activity.is_active(flow) { '●' } else { '○' };
        out.push_str(&format!(
            "  {} {:<8} {}\n",
            marker,
            name,
            topology.route(flow).join(" → ")
        ));
    }
    out.push_str(
        "  Legend: ━ active  ─ idle | blue = Command Flow (ID 100), red = Status Flow (ID 200)\n",
    );
    out
}

/// Bus diagram with the two flow arrows shaded by their flash level
pub fn render_bus_diagram(activity: &MessageActivity) -> String {
    let command = shade(arrow_alpha(activity.level(Flow::Command)));
    let status = shade(arrow_alpha(activity.level(Flow::Status)));
    let arrow = |c: char| std::iter::repeat(c).take(24).collect::<String>();

    let mut out = String::from("CAN Bus Topology - SteeringBus (Virtual CAN)\n");
    out.push_str(&format!(
        "  [Gateway] {}▶ [Steering ECU]   ID 100: SteeringCommand\n",
        arrow(command)
    ));
    out.push_str(&format!(
        "  [Gateway] ◀{} [Steering ECU]   ID 200: SteeringStatus\n",
        arrow(status)
    ));
    out.push_str("      │          [RemotiveBroker localhost:50051]          │\n");
    out.push_str("  ════╧═════════ Virtual CAN Bus (SteeringBus) ═════════╧════\n");
    out
}

/// Trace file written by `--export`
#[derive(Debug, Serialize)]
pub struct TraceExport<'a> {
    pub exported_at: DateTime<Utc>,
    pub view: &'a str,
    pub frames: u64,
    pub samples: Vec<TraceSample>,
}

/// Write the buffered samples as pretty JSON
pub fn export_trace(path: &Path, view: &str, frames: u64, trace: &TraceBuffer) -> Result<()> {
    let export = TraceExport {
        exported_at: Utc::now(),
        view,
        frames,
        samples: trace.iter().copied().collect(),
    };
    let file =
        File::create(path).with_context(|| format!("Failed to create export file: {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &export)
        .with_context(|| format!("Failed to write trace export: {:?}", path))?;
    log::info!("Exported {} samples to {:?}", export.samples.len(), path);
    Ok(())
}
