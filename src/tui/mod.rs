//! Ratatui-based input form.
//!
//! Lists every schema field with its value and description, lets the user
//! adjust or type values, and renders the pipeline result with a severity gauge.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use tracing::info;

use crate::app::pipeline::Pipeline;
use crate::domain::{RiskAssessment, RunConfig};
use crate::error::{AppError, ScoreError};
use crate::models::ModelAdapter;

mod form;

pub use form::{EditOutcome, FormState};

/// Start the form.
///
/// The model is loaded and checked against the profile before the terminal is
/// taken over, so a mismatched artifact fails with a normal error message.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    let adapter = ModelAdapter::load(&config.model_path);
    let pipeline = Pipeline::new(config.profile, &adapter)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(pipeline, config.probabilities);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App<'a> {
    pipeline: Pipeline<'a>,
    probabilities: bool,
    form: FormState,
    status: String,
    result: Option<Result<RiskAssessment, ScoreError>>,
}

impl<'a> App<'a> {
    fn new(pipeline: Pipeline<'a>, probabilities: bool) -> Self {
        let status = match pipeline.adapter().load_error() {
            Some(err) => format!("Model unavailable: {}", err.reason()),
            None => "Adjust the inputs, then press Enter to predict.".to_string(),
        };
        Self {
            form: FormState::new(pipeline.profile().schema()),
            pipeline,
            probabilities,
            status,
            result: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            let ready = event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?;
            if !ready {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.form.is_editing() {
            self.handle_value_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.form.select_prev(),
            KeyCode::Down => self.form.select_next(),
            KeyCode::Left => self.form.adjust(-1.0),
            KeyCode::Right => self.form.adjust(1.0),
            KeyCode::PageDown => self.form.adjust(-10.0),
            KeyCode::PageUp => self.form.adjust(10.0),
            KeyCode::Char('e') => {
                self.form.begin_edit();
                self.status = "Type a value. Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Char('d') => {
                self.form.reset_defaults();
                self.result = None;
                self.status = "Reset to defaults.".to_string();
            }
            KeyCode::Enter => self.submit(),
            _ => {}
        }
        false
    }

    fn handle_value_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.form.cancel_edit();
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let name = self.form.schema().fields[self.form.selected()].name;
                self.status = match self.form.commit_edit() {
                    EditOutcome::Applied(v) => format!("{name} = {v}"),
                    EditOutcome::Clamped { requested, applied } => {
                        format!("{name}: {requested} is out of range, using {applied}")
                    }
                    EditOutcome::Invalid(raw) => format!("'{raw}' is not a number"),
                    EditOutcome::NotEditing => String::new(),
                };
            }
            KeyCode::Backspace => self.form.pop_char(),
            KeyCode::Char(c) => self.form.push_char(c),
            _ => {}
        }
    }

    /// One synchronous pipeline run per submission.
    fn submit(&mut self) {
        let record = self.form.to_record();
        let outcome = self.pipeline.score(&record, self.probabilities);
        self.status = match &outcome {
            Ok(a) => {
                info!(label = a.label, category = a.category, "form submitted");
                format!("AI Prediction: {} ({})", a.label, a.category)
            }
            Err(e) => {
                info!(error = %e, "form submission failed");
                e.to_string()
            }
        };
        self.result = Some(outcome);
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let profile = self.pipeline.profile();
        let model_line = crate::report::format_model_status(self.pipeline.adapter());
        let model_style = if self.pipeline.adapter().is_loaded() {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::Red)
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(
                    "CrediSense",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" | profile: {}", profile.display_name())),
            ]),
            Line::from(Span::styled(model_line, model_style)),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        self.draw_inputs(frame, columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0)])
            .split(columns[1]);
        self.draw_description(frame, right[0]);
        self.draw_result(frame, right[1]);
    }

    fn draw_inputs(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let schema = self.form.schema();
        let items: Vec<ListItem> = schema
            .fields
            .iter()
            .zip(self.form.values())
            .enumerate()
            .map(|(i, (f, v))| {
                let value = match self.form.edit_buffer() {
                    Some(buf) if i == self.form.selected() => format!("{buf}_"),
                    _ => format!("{v}"),
                };
                ListItem::new(format!("{:<26} {value}", f.name))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Input Features").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.form.selected()));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_description(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let f = &self.form.schema().fields[self.form.selected()];
        let text = Text::from(vec![
            Line::from(Span::styled(f.description, Style::default().fg(Color::White))),
            Line::from(Span::styled(
                format!("range {} – {}, default {}", f.min, f.max, f.default),
                Style::default().fg(Color::Gray),
            )),
        ]);
        let p = Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().title(f.name).borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_result(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Prediction").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        match &self.result {
            None => {
                let msg = Paragraph::new("Press Enter to predict.")
                    .style(Style::default().fg(Color::Yellow));
                frame.render_widget(msg, rows[0]);
            }
            Some(Err(e)) => {
                let msg = Paragraph::new(e.to_string())
                    .wrap(Wrap { trim: true })
                    .style(Style::default().fg(Color::Red));
                frame.render_widget(msg, inner);
            }
            Some(Ok(a)) => {
                let color = severity_color(a.severity);
                let headline = Paragraph::new(Line::from(vec![
                    Span::raw("AI Prediction: "),
                    Span::styled(
                        format!("{} ({})", a.label, a.category),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                ]));
                frame.render_widget(headline, rows[0]);

                let gauge = Gauge::default()
                    .gauge_style(Style::default().fg(color))
                    .percent(u16::from(a.severity.min(100)))
                    .label(format!("severity {}", a.severity));
                frame.render_widget(gauge, rows[1]);

                if let Some(probs) = &a.probabilities {
                    let lines: Vec<Line> = probs
                        .iter()
                        .map(|p| {
                            Line::from(format!(
                                "{:>3}  {:<26} {:>6.2}%",
                                p.label,
                                self.pipeline.risk_table().category(p.label),
                                p.probability * 100.0
                            ))
                        })
                        .collect();
                    frame.render_widget(Paragraph::new(Text::from(lines)), rows[2]);
                }
            }
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  PgUp/PgDn ×10  e edit  Enter predict  d defaults  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn severity_color(severity: u8) -> Color {
    match severity {
        0..=33 => Color::Green,
        34..=66 => Color::Yellow,
        _ => Color::Red,
    }
}
