// Interactive joint-slider console for the calibration simulator
// Run with: cargo run -p example --bin joint_jog_tui
// Optional: --config ARM95.json --log tui.log

use calib_kinematics::sink::Trail;
use calib_kinematics::{
    ChainFrame, JointLimits, KinematicModel, ModelConfig, RunningFlag, SharedAngles,
    VisualizationSink, WorkspaceBounds,
};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nalgebra::Point3;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, List, ListItem, Paragraph,
    },
    Frame, Terminal,
};
use sim::input::{AngleInput, InputResult};
use sim::session::{DEFAULT_RATE_HZ, SHUTDOWN_TIMEOUT};
use sim::{ArmPreset, JointSliders, Session};
use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

const NOMINAL_COLOR: Color = Color::Cyan;
const REAL_COLOR: Color = Color::Magenta;
const MIN_STEP: f64 = 0.001;
const MAX_STEP: f64 = 0.5;
const SLIDER_BAR_WIDTH: usize = 20;

#[derive(Parser, Debug)]
#[command(version, about = "Drive nominal and real joint angles and compare both chains", long_about = None)]
struct Args {
    /// JSON model configuration. Falls back to the built-in preset.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ArmPreset::Demo6)]
    preset: ArmPreset,

    /// Evaluations (and redraws) per second.
    #[arg(long, default_value_t = DEFAULT_RATE_HZ)]
    rate: f64,

    /// Slider step in radians.
    #[arg(long, default_value_t = 0.05)]
    step: f64,

    /// Write logs to this file. The terminal is owned by the UI, so nothing
    /// is logged without it.
    #[arg(long)]
    log: Option<PathBuf>,
}

/// Input-side changes the renderer needs to know about.
#[derive(Debug, Clone, Copy, PartialEq)]
enum UiEvent {
    Selection { selected: usize, step: f64 },
    ClearTrail,
}

/// Keyboard-driven slider bank. Runs on the input task.
struct KeyboardInput {
    sliders: JointSliders,
    step: f64,
    events: Sender<UiEvent>,
}

impl KeyboardInput {
    fn new(sliders: JointSliders, step: f64, events: Sender<UiEvent>) -> Self {
        Self {
            sliders,
            step: step.clamp(MIN_STEP, MAX_STEP),
            events,
        }
    }

    fn handle_key(&mut self, key: KeyCode, running: &RunningFlag) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                info!("Quit requested");
                running.stop();
            }
            KeyCode::Up | KeyCode::Char('k') => self.sliders.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.sliders.select_next(),
            KeyCode::Left | KeyCode::Char('h') => self.sliders.nudge(-self.step),
            KeyCode::Right | KeyCode::Char('l') => self.sliders.nudge(self.step),
            KeyCode::Char('[') => self.step = (self.step / 2.0).max(MIN_STEP),
            KeyCode::Char(']') => self.step = (self.step * 2.0).min(MAX_STEP),
            KeyCode::Char('r') => self.sliders.reset(),
            KeyCode::Char('c') => {
                let _ = self.events.send(UiEvent::ClearTrail);
                return;
            }
            _ => return,
        }
        let _ = self.events.send(UiEvent::Selection {
            selected: self.sliders.selected(),
            step: self.step,
        });
    }
}

impl AngleInput for KeyboardInput {
    fn update(&mut self, nominal: &SharedAngles, real: &SharedAngles, running: &RunningFlag) -> InputResult {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key.code, running);
                }
            }
        }
        self.sliders.update(nominal, real, running)
    }
}

/// Which two world axes a projection panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plane {
    XY,
    XZ,
}

impl Plane {
    fn project(self, p: &Point3<f64>) -> (f64, f64) {
        match self {
            Plane::XY => (p.x, p.y),
            Plane::XZ => (p.x, p.z),
        }
    }

    fn title(self) -> &'static str {
        match self {
            Plane::XY => "Top (X-Y)",
            Plane::XZ => "Side (X-Z)",
        }
    }

    fn bounds(self, workspace: &WorkspaceBounds) -> ([f64; 2], [f64; 2]) {
        let vertical = match self {
            Plane::XY => workspace.y,
            Plane::XZ => workspace.z,
        };
        (axis_bounds(workspace.x), axis_bounds(vertical))
    }
}

/// Padded display range for one axis; unbounded axes get a fixed window.
fn axis_bounds(range: [f64; 2]) -> [f64; 2] {
    if range[0].is_finite() && range[1].is_finite() && range[1] > range[0] {
        let pad = 0.05 * (range[1] - range[0]);
        [range[0] - pad, range[1] + pad]
    } else {
        [-1.5, 1.5]
    }
}

fn slider_bar(value: f64, (lo, hi): (f64, f64), width: usize) -> String {
    let fraction = if hi > lo { ((value - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.5 };
    let filled = (fraction * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Renders every frame to the terminal.
struct TerminalSink {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    events: Receiver<UiEvent>,
    running: RunningFlag,
    limits: JointLimits,
    workspace: WorkspaceBounds,
    nominal_trail: Trail,
    real_trail: Trail,
    selected: usize,
    step: f64,
}

impl TerminalSink {
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                UiEvent::Selection { selected, step } => {
                    self.selected = selected;
                    self.step = step;
                }
                UiEvent::ClearTrail => {
                    self.nominal_trail.clear();
                    self.real_trail.clear();
                }
            }
        }
    }
}

impl VisualizationSink for TerminalSink {
    fn present(&mut self, frame: &ChainFrame) {
        self.drain_events();
        self.nominal_trail.push(frame.nominal.tool_tip());
        self.real_trail.push(frame.real.tool_tip());

        let view = View {
            frame,
            limits: &self.limits,
            workspace: &self.workspace,
            nominal_trail: &self.nominal_trail,
            real_trail: &self.real_trail,
            selected: self.selected,
            step: self.step,
        };
        if let Err(e) = self.terminal.draw(|f| ui(f, &view)) {
            warn!("Terminal draw failed: {}", e);
            self.running.stop();
        }
    }
}

/// Everything one redraw reads.
struct View<'a> {
    frame: &'a ChainFrame,
    limits: &'a JointLimits,
    workspace: &'a WorkspaceBounds,
    nominal_trail: &'a Trail,
    real_trail: &'a Trail,
    selected: usize,
    step: f64,
}

fn ui(f: &mut Frame, view: &View) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(16),    // Sliders and projections
            Constraint::Length(7),  // Pose readout
            Constraint::Length(4),  // Help
        ])
        .split(f.area());

    let upper = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(main_chunks[0]);

    render_sliders(f, upper[0], view);
    render_projection(f, upper[1], view, Plane::XY);
    render_projection(f, upper[2], view, Plane::XZ);
    render_pose(f, main_chunks[1], view);
    render_help_panel(f, main_chunks[2], view);
}

fn render_sliders(f: &mut Frame, area: Rect, view: &View) {
    let joint_count = view.limits.len();
    let rows = view
        .frame
        .nominal_angles
        .iter()
        .map(|v| ("N", NOMINAL_COLOR, *v))
        .chain(view.frame.real_angles.iter().map(|v| ("R", REAL_COLOR, *v)));

    let items: Vec<ListItem> = rows
        .enumerate()
        .map(|(index, (tag, color, value))| {
            let joint = index % joint_count.max(1);
            let marker = if index == view.selected { "▶ " } else { "  " };
            let style = if index == view.selected {
                Style::default().fg(color).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(color)
            };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{}{} ", tag, joint + 1), style),
                Span::raw(format!("{:+.3} ", value)),
                Span::styled(
                    slider_bar(value, view.limits.range(joint).unwrap_or((value, value)), SLIDER_BAR_WIDTH),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Joints (step {:.3} rad)", view.step))
            .border_style(Style::default().fg(Color::Green)),
    );
    f.render_widget(list, area);
}

fn render_projection(f: &mut Frame, area: Rect, view: &View, plane: Plane) {
    let (x_bounds, y_bounds) = plane.bounds(view.workspace);
    let nominal: Vec<(f64, f64)> = view.frame.nominal.points.iter().map(|p| plane.project(p)).collect();
    let real: Vec<(f64, f64)> = view.frame.real.points.iter().map(|p| plane.project(p)).collect();
    let nominal_trail: Vec<(f64, f64)> = view.nominal_trail.points().map(|p| plane.project(p)).collect();
    let real_trail: Vec<(f64, f64)> = view.real_trail.points().map(|p| plane.project(p)).collect();

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(plane.title()))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Points { coords: &nominal_trail, color: Color::Blue });
            ctx.draw(&Points { coords: &real_trail, color: Color::Red });
            ctx.layer();
            for (chain, color) in [(&nominal, NOMINAL_COLOR), (&real, REAL_COLOR)] {
                for pair in chain.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: pair[0].1,
                        x2: pair[1].0,
                        y2: pair[1].1,
                        color,
                    });
                }
            }
        });
    f.render_widget(canvas, area);
}

fn render_pose(f: &mut Frame, area: Rect, view: &View) {
    let nominal = view.frame.nominal.tool_tip();
    let real = view.frame.real.tool_tip();
    let tip_line = |label: &'static str, color: Color, p: Point3<f64>| {
        Line::from(vec![
            Span::styled(label, Style::default().fg(color)),
            Span::raw(format!("x {:+.4}  y {:+.4}  z {:+.4}", p.x, p.y, p.z)),
        ])
    };

    let lines = vec![
        Line::from(Span::styled(
            "Tool tip",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        tip_line("  Nominal: ", NOMINAL_COLOR, nominal),
        tip_line("  Real:    ", REAL_COLOR, real),
        Line::from(vec![
            Span::styled("  Error:   ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:.6}", view.frame.tip_error())),
        ]),
        Line::from(vec![
            Span::styled("  Frame:   ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}  trail {}", view.frame.sequence, view.real_trail.len())),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Pose")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(paragraph, area);
}

fn render_help_panel(f: &mut Frame, area: Rect, _view: &View) {
    let help_text = vec![
        Line::from("  ↑/k ↓/j = Select slider   ←/h →/l = Move joint   [ ] = Step size"),
        Line::from("  r = Reset sliders   c = Clear trail   q = Quit"),
    ];
    let help_block = Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help_block, area);
}

fn init_logging(path: &PathBuf) -> Result<(), Box<dyn Error + Send + Sync>> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    if let Some(path) = &args.log {
        init_logging(path)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = match &args.config {
        Some(path) => ModelConfig::from_file(path)?,
        None => args.preset.config(),
    };
    let model = Arc::new(KinematicModel::from_config(&config)?);
    let session = Session::new(model.clone(), args.rate)?;

    let (events_tx, events_rx) = mpsc::channel();
    let sliders = JointSliders::new(model.general_limits().clone());
    let input = KeyboardInput::new(sliders, args.step, events_tx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut sink = TerminalSink {
        terminal,
        events: events_rx,
        running: session.running(),
        limits: model.general_limits().clone(),
        workspace: *model.workspace(),
        nominal_trail: Trail::default(),
        real_trail: Trail::default(),
        selected: 0,
        step: input.step,
    };

    let result = session.run(input, &mut sink, None).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(sink.terminal.backend_mut(), LeaveAlternateScreen)?;
    sink.terminal.show_cursor()?;

    let report = result?;
    println!("{} frames, input task {:?}", report.frames, report.shutdown);
    Ok(())
}
