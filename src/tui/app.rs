//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Service integration
//!
//! Predictions are a few hundred floating point operations, so they run on
//! the UI thread.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::{ArtifactStore, CsvDataset};
use crate::application::{AnalyticsService, ModelRegistry, RiskEngine};
use crate::config::AppConfig;
use crate::domain::{Assessment, TierTable};
use crate::ports::DatasetSource;

use super::ui::{
    assessment::{render_assessment, AssessmentState},
    dashboard::{render_dashboard, DashboardData, EngineStatus, SessionSummary, TierCount},
    model::render_model_info,
    render_disclaimer,
    student::{render_student_form, StudentFormState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    StudentForm,
    Assessment,
    ModelInfo,
}

/// Main application state
pub struct App<D = CsvDataset>
where
    D: DatasetSource,
{
    /// Current screen
    screen: Screen,

    /// Whether the app should quit
    should_quit: bool,

    /// Risk engine (ready or predictions-unavailable)
    engine: RiskEngine,

    /// Analytics service
    analytics: AnalyticsService<D>,

    /// Year shown in the dashboard headline
    reference_year: u16,

    /// Dataset figures, refreshed with [R]
    dashboard_data: DashboardData,

    /// Student form state
    student_form: StudentFormState,

    /// Assessment screen state
    assessment_state: AssessmentState,

    /// Assessments made in this session (memory only)
    session: Vec<Assessment>,
}

impl App<CsvDataset> {
    /// Create the application from configuration.
    ///
    /// A model directory that fails to load does not stop startup: the app
    /// runs with predictions unavailable and the dashboard shows why.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for adapters that open resources.
    pub fn new(config: AppConfig) -> Result<Self> {
        let registry = ModelRegistry::new();
        let store = ArtifactStore::new(&config.model_dir);
        let engine = RiskEngine::load(&registry, &store);

        if !config.data_dir.is_dir() {
            tracing::warn!(
                "Data directory {:?} not found; dashboard will be empty",
                config.data_dir
            );
        }
        let dataset = CsvDataset::new(&config.data_dir, &config.dataset_years);

        Ok(Self::with_dependencies(
            engine,
            AnalyticsService::new(dataset),
            config.reference_year,
        ))
    }
}

impl<D> App<D>
where
    D: DatasetSource,
{
    /// Create application with injected dependencies.
    pub fn with_dependencies(
        engine: RiskEngine,
        analytics: AnalyticsService<D>,
        reference_year: u16,
    ) -> Self {
        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            engine,
            analytics,
            reference_year,
            dashboard_data: DashboardData {
                reference_year,
                ..DashboardData::default()
            },
            student_form: StudentFormState::default(),
            assessment_state: AssessmentState::default(),
            session: Vec::new(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        self.refresh_analytics();

        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                let content_area = chunks[0];
                let disclaimer_area = chunks[1];

                match self.screen {
                    Screen::Dashboard => render_dashboard(
                        f,
                        content_area,
                        &self.engine_status(),
                        &self.dashboard_data,
                        &self.session_summary(),
                    ),
                    Screen::StudentForm => {
                        render_student_form(f, content_area, &self.student_form)
                    }
                    Screen::Assessment => {
                        render_assessment(f, content_area, &self.assessment_state)
                    }
                    Screen::ModelInfo => {
                        let error = self.engine.load_error().map(ToString::to_string);
                        render_model_info(
                            f,
                            content_area,
                            self.engine.bundle().map(|b| b.as_ref()),
                            error.as_deref(),
                        );
                    }
                }

                render_disclaimer(f, disclaimer_area);
            })?;

            // Handle input (short poll to stay responsive)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn engine_status(&self) -> EngineStatus {
        match self.engine.bundle() {
            Some(bundle) => EngineStatus {
                available: true,
                model_name: Some(
                    bundle
                        .metadata()
                        .model_name
                        .clone()
                        .unwrap_or_else(|| bundle.classifier().name().to_string()),
                ),
                threshold: bundle.threshold(),
                error: None,
            },
            None => EngineStatus {
                available: false,
                model_name: None,
                threshold: None,
                error: self.engine.load_error().map(ToString::to_string),
            },
        }
    }

    fn session_summary(&self) -> SessionSummary {
        summarize_session(
            self.engine.bundle().map(|b| b.tiers()),
            &self.session,
        )
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::StudentForm => self.handle_student_form_key(key),
            Screen::Assessment => self.handle_assessment_key(key),
            Screen::ModelInfo => self.handle_model_info_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n') | KeyCode::Char('N') => self.open_student_form(),
            KeyCode::Char('m') | KeyCode::Char('M') => self.screen = Screen::ModelInfo,
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh_analytics(),
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_student_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.student_form.clear_sensitive();
                self.screen = Screen::Dashboard;
            }
            KeyCode::Up => self.student_form.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.student_form.next_field(),
            KeyCode::Left => self.student_form.cycle_option(false),
            KeyCode::Right => self.student_form.cycle_option(true),
            KeyCode::Char('s') | KeyCode::Char('S') => self.student_form.load_sample_data(),
            KeyCode::Char(c) => self.student_form.input_char(c),
            KeyCode::Backspace => self.student_form.delete_char(),
            KeyCode::Delete => self.student_form.clear_field(),
            KeyCode::Enter => self.submit_student_form(),
            _ => {}
        }
    }

    fn handle_assessment_key(&mut self, key: KeyCode) {
        match &self.assessment_state {
            AssessmentState::Complete { .. } => match key {
                KeyCode::Enter | KeyCode::Esc => self.screen = Screen::Dashboard,
                KeyCode::Char('n') | KeyCode::Char('N') => self.open_student_form(),
                _ => {}
            },
            AssessmentState::Error { .. } => match key {
                KeyCode::Enter if self.engine.is_available() => {
                    self.screen = Screen::StudentForm;
                }
                KeyCode::Enter | KeyCode::Esc => self.screen = Screen::Dashboard,
                _ => {}
            },
            AssessmentState::Idle => {
                if key == KeyCode::Esc {
                    self.screen = Screen::Dashboard;
                }
            }
        }
    }

    fn handle_model_info_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.screen = Screen::Dashboard,
            KeyCode::Char('n') | KeyCode::Char('N') => self.open_student_form(),
            _ => {}
        }
    }

    fn open_student_form(&mut self) {
        match self.engine.bundle() {
            Some(bundle) => {
                self.student_form = StudentFormState::from_inputs(&bundle.schema().required_inputs());
                self.screen = Screen::StudentForm;
            }
            None => {
                let reason = self
                    .engine
                    .load_error()
                    .map_or_else(|| "modelo não carregado".to_string(), ToString::to_string);
                self.assessment_state = AssessmentState::Error {
                    message: format!("Predições indisponíveis: {reason}"),
                };
                self.screen = Screen::Assessment;
            }
        }
    }

    fn submit_student_form(&mut self) {
        let indicators = match self.student_form.to_indicators() {
            Ok(indicators) => indicators,
            Err(e) => {
                self.student_form.error_message = Some(e);
                return;
            }
        };

        // Out-of-range values are allowed after one warning.
        if !self.student_form.range_warning_shown {
            if let Err(errors) = indicators.validate_ranges() {
                self.student_form.error_message =
                    Some(format!("{} ([Enter] para confirmar)", errors.join(", ")));
                self.student_form.range_warning_shown = true;
                return;
            }
        }

        let tiers = self.engine.bundle().map_or(0, |b| b.tiers().tiers().len());
        match self.engine.assess(&indicators) {
            Ok(assessment) => {
                self.session.push(assessment.clone());
                self.assessment_state = AssessmentState::complete(assessment, &indicators, tiers);
                // Clear typed values from the UI once the result exists.
                self.student_form.clear_sensitive();
            }
            Err(e) => {
                tracing::warn!("Assessment rejected: {}", e);
                self.assessment_state = AssessmentState::Error {
                    message: e.to_string(),
                };
            }
        }
        self.screen = Screen::Assessment;
    }

    fn refresh_analytics(&mut self) {
        let year = self.reference_year;
        let mut data = DashboardData {
            reference_year: year,
            ..DashboardData::default()
        };

        match self.analytics.year_summary(year) {
            Ok(summary) => {
                data.pedras = self.analytics.pedra_distribution(year).unwrap_or_default();
                data.reference = Some(summary);
            }
            Err(e) => {
                tracing::warn!("No summary for {}: {}", year, e);
                data.reference_error = Some(e.to_string());
            }
        }
        data.trend = self.analytics.trend();

        let matrix = self.analytics.correlation_matrix();
        if matrix.values.iter().flatten().any(Option::is_some) {
            data.correlation = Some(matrix);
        }

        tracing::info!(
            "Analytics refreshed: reference_year={}, years_loaded={}",
            year,
            data.trend.len()
        );
        self.dashboard_data = data;
    }
}

/// Count session assessments per tier of the active table.
fn summarize_session(tiers: Option<&TierTable>, session: &[Assessment]) -> SessionSummary {
    let tiers = tiers
        .map(|table| {
            table
                .tiers()
                .iter()
                .map(|t| TierCount {
                    label: t.label.clone(),
                    severity: t.severity,
                    count: session.iter().filter(|a| a.tier.name == t.name).count(),
                })
                .collect()
        })
        .unwrap_or_default();

    SessionSummary {
        total: session.len(),
        tiers,
    }
}
