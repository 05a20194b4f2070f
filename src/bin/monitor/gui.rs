use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use panoguide::{
    capture_sequencer::Phase,
    config::GuideConfig,
    dummy_orientation::DummyOrientation,
    guidance_overlay::compose,
    gui::{draw_guidance, draw_preview},
    panoramic_preview::PanoramicPreview,
    session::CaptureSession,
    synthetic_camera::SyntheticCamera,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::{
    error::Error,
    io,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

type MonitorSession = CaptureSession<DummyOrientation, SyntheticCamera>;

const NUDGE_DEG: f64 = 5.0;
const TILT_STEP_DEG: f64 = 5.0;
const ZOOM_STEP_DEG: f64 = 5.0;
// Rough pixel size of a terminal cell, so mouse drags orbit at a usable rate.
const CELL_WIDTH_PX: f64 = 8.0;
const CELL_HEIGHT_PX: f64 = 16.0;
// An arrow key in the preview counts as a drag of this many pixels.
const ARROW_DRAG_PX: f64 = 100.0;

struct App {
    config: GuideConfig,
    session: MonitorSession,
    view: Arc<Mutex<f64>>,
    autopilot: bool,
    tilt: f64,
    preview: Option<PanoramicPreview>,
    message: String,
}

impl App {
    fn new(config: GuideConfig, session: MonitorSession) -> App {
        let view = session.backend().view_heading();
        App {
            config,
            session,
            view,
            autopilot: false,
            tilt: 0.0,
            preview: None,
            message: "Waiting for the phone...".to_string(),
        }
    }

    fn on_tick(&mut self) {
        for event in self.session.pump() {
            info!("Monitor : {:?}", event);
        }
        let status = self.session.status();
        let offset = self.session.sequencer().calibration_offset();
        *self.view.lock().unwrap_or_else(PoisonError::into_inner) =
            offset + status.relative_heading_deg;

        if self.autopilot {
            if let Some(node) = self.session.sequencer().active_node() {
                self.session.source().aim(offset + node.target_bearing_deg);
            }
        }
        if self.session.phase() == Phase::Review && self.preview.is_none() {
            self.message = "Tour complete.".to_string();
        }
    }

    fn start(&mut self) {
        self.message = match self.session.start() {
            Ok(()) => "Scanning. Turn towards the highlighted dot.".to_string(),
            Err(e) => {
                warn!("Monitor : {}", e);
                format!("Could not start: {}", e)
            }
        };
    }

    fn open_preview(&mut self) {
        let tour = self.session.tour();
        self.preview = Some(PanoramicPreview::new(tour.as_ref(), &self.config.preview));
    }

    /// Returns false when the app should quit.
    fn on_key(&mut self, code: KeyCode) -> bool {
        if let Some(preview) = self.preview.as_mut() {
            let drag = |preview: &mut PanoramicPreview, dx: f64, dy: f64| {
                preview.pointer_down(0.0, 0.0);
                preview.pointer_move(dx, dy);
                preview.pointer_up();
            };
            match code {
                KeyCode::Left => drag(preview, ARROW_DRAG_PX, 0.0),
                KeyCode::Right => drag(preview, -ARROW_DRAG_PX, 0.0),
                KeyCode::Up => drag(preview, 0.0, ARROW_DRAG_PX),
                KeyCode::Down => drag(preview, 0.0, -ARROW_DRAG_PX),
                KeyCode::Char('+') | KeyCode::Char('=') => preview.zoom(-ZOOM_STEP_DEG),
                KeyCode::Char('-') => preview.zoom(ZOOM_STEP_DEG),
                KeyCode::Char('q') | KeyCode::Esc => self.preview = None,
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Left => {
                self.autopilot = false;
                self.session.source().nudge(-NUDGE_DEG);
            }
            KeyCode::Right => {
                self.autopilot = false;
                self.session.source().nudge(NUDGE_DEG);
            }
            KeyCode::Up => {
                self.tilt += TILT_STEP_DEG;
                self.session.source().set_tilt(self.tilt);
            }
            KeyCode::Down => {
                self.tilt -= TILT_STEP_DEG;
                self.session.source().set_tilt(self.tilt);
            }
            KeyCode::Char('a') => self.autopilot = !self.autopilot,
            KeyCode::Char('s') => self.start(),
            KeyCode::Char('p') if self.session.phase() == Phase::Review => self.open_preview(),
            KeyCode::Char('q') | KeyCode::Esc => return false,
            _ => {}
        }
        true
    }

    fn on_mouse(&mut self, kind: MouseEventKind, column: u16, row: u16) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let x = column as f64 * CELL_WIDTH_PX;
        let y = row as f64 * CELL_HEIGHT_PX;
        match kind {
            MouseEventKind::Down(MouseButton::Left) => preview.pointer_down(x, y),
            MouseEventKind::Drag(MouseButton::Left) => preview.pointer_move(x, y),
            MouseEventKind::Up(MouseButton::Left) => preview.pointer_up(),
            MouseEventKind::ScrollUp => preview.zoom(-ZOOM_STEP_DEG),
            MouseEventKind::ScrollDown => preview.zoom(ZOOM_STEP_DEG),
            _ => {}
        }
    }
}

pub fn engage_gui(config: GuideConfig, session: MonitorSession) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let tick_rate = Duration::from_millis(16);
    let mut app = App::new(config, session);
    let res = run_app(&mut terminal, &mut app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(tour) = app.session.exit() {
        info!("Monitor : left with a tour of {} frames.", tour.len());
    }
    res?;
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !app.on_key(key.code) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => app.on_mouse(mouse.kind, mouse.column, mouse.row),
                _ => {}
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(1)])
        .split(f.size());

    match app.preview.as_ref() {
        Some(preview) => draw_preview(f, rows[0], preview),
        None => {
            let status = app.session.status();
            let overlay = compose(&status, app.session.sequencer().nodes(), &app.config.overlay);
            draw_guidance(f, rows[0], &status, &overlay, app.session.sequencer().nodes());
        }
    }

    let autopilot = if app.autopilot { "on" } else { "off" };
    let line = format!(" {}  [autopilot {}]", app.message, autopilot);
    f.render_widget(
        Paragraph::new(line).style(Style::default().fg(Color::Gray)),
        rows[1],
    );
}
