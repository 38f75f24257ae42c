//! TUI application state and event loop.
//!
//! The dashboard's schedulers run on a tokio runtime owned by the app. The
//! draw loop stays on the main thread and only reads one [`DashboardView`]
//! per frame, so a slow API never stalls rendering.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;

use solarwatch_core::random;
use solarwatch_core::{Dashboard, DashboardConfig, DashboardView, HttpForecastClient, Sample};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Predictions shown in the history chart (of the buffered 20).
pub const PREDICTION_CHART_LEN: usize = 10;

/// Log10 flux bounds of the stream chart: 1e-7 .. 1e-3 W/m².
pub const FLUX_LOG_BOUNDS: [f64; 2] = [-7.0, -3.0];

/// Longest the event loop blocks waiting for input.
const MAX_POLL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Chart helpers
// ---------------------------------------------------------------------------

/// Flux samples as `(index, log10 W/m²)`, clamped to [`FLUX_LOG_BOUNDS`].
pub fn flux_points(samples: &[Sample]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let y = s.value.max(f64::MIN_POSITIVE).log10();
            (i as f64, y.clamp(FLUX_LOG_BOUNDS[0], FLUX_LOG_BOUNDS[1]))
        })
        .collect()
}

/// Probability samples as `(index, p)`.
pub fn prediction_points(samples: &[Sample]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| (i as f64, s.value))
        .collect()
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    runtime: Runtime,
    dashboard: Arc<Dashboard>,
    api_base: String,
    running: bool,
    started: Instant,
    /// Captured once per frame.
    view: DashboardView,
    /// The last [`PREDICTION_CHART_LEN`] prediction probabilities.
    prediction_samples: Vec<Sample>,
    frame_interval: Duration,
    /// One-line feedback shown in the key bar.
    status: Option<String>,
}

impl App {
    pub fn new(config: DashboardConfig, seed: Option<u64>) -> io::Result<Self> {
        let runtime = Runtime::new()?;
        let client = HttpForecastClient::from_config(&config).map_err(io::Error::other)?;
        let api_base = config.api_base.clone();
        let frame_interval = config.frame_interval;

        let dashboard = {
            let _guard = runtime.enter();
            Arc::new(Dashboard::start(config, Arc::new(client), random::seeded(seed)))
        };
        let view = dashboard.view();
        let prediction_samples = dashboard.prediction_samples(PREDICTION_CHART_LEN);

        Ok(Self {
            runtime,
            dashboard,
            api_base,
            running: true,
            started: Instant::now(),
            view,
            prediction_samples,
            frame_interval,
            status: None,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        self.dashboard.teardown();
        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let poll = self.frame_interval.min(MAX_POLL);

        while self.running {
            self.view = self.dashboard.view();
            self.prediction_samples = self.dashboard.prediction_samples(PREDICTION_CHART_LEN);
            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(poll)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('p') => self.kick_predict(),
            _ => {}
        }
    }

    /// Fire the one-shot prediction in the background.
    fn kick_predict(&mut self) {
        if self.view.predicting {
            self.status = Some("prediction already in flight".into());
            return;
        }
        self.status = Some("requesting prediction...".into());
        let dashboard = Arc::clone(&self.dashboard);
        self.runtime.spawn(async move {
            dashboard.predict().await;
        });
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn prediction_samples(&self) -> &[Sample] {
        &self.prediction_samples
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Feedback line, cleared once the prediction it refers to has landed.
    pub fn status(&self) -> Option<&str> {
        if self.view.predicting {
            return self.status.as_deref();
        }
        None
    }
}
