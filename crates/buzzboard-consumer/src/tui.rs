//! Terminal dashboard.
//!
//! Draws the two panels side by side: message counts on the left, mean
//! sentiment on the right. Bars are horizontal, one row per author in
//! first-appearance order. Sentiment bars diverge from a zero axis so
//! negative means are drawn to the left in red and positive ones to the
//! right in green.
//!
//! Raw mode is never enabled, so Ctrl-C still reaches the process as SIGINT
//! and the consumer's shutdown path runs normally. When the dashboard closes
//! it leaves the alternate screen and prints the final panels as plain text,
//! so the last view stays in the shell.

use std::io::{self, Stdout, Write};

use buzzboard_core::{AuthorStats, Panel, RenderError, Renderer, count_panel, sentiment_panel};
use crossterm::{
    cursor, execute,
    terminal::{self as term, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use tracing::{debug, warn};

use crate::error::AppError;

/// Widest author label before truncation.
const MAX_LABEL_WIDTH: usize = 16;

/// Columns reserved for the numeric value after each bar.
const VALUE_WIDTH: usize = 7;

/// Full block used for bar cells.
const BAR_CELL: &str = "█";

/// Width of the final printout when the terminal size is unknown.
const FALLBACK_WIDTH: usize = 80;

/// Renderer drawing the dashboard through a ratatui backend.
pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,
    owns_screen: bool,
    frames: u64,
}

impl TerminalRenderer<CrosstermBackend<Stdout>> {
    /// Take over stdout: switch to the alternate screen and hide the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Terminal`] if the terminal cannot be set up.
    pub fn stdout() -> Result<Self, AppError> {
        // Built before touching the screen; from here on `Drop` restores it.
        let mut renderer = Self::with_backend(CrosstermBackend::new(io::stdout()))?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)
            .map_err(|e| AppError::Terminal(format!("failed to enter alternate screen: {e}")))?;
        renderer.owns_screen = true;
        renderer
            .terminal
            .clear()
            .map_err(|e| AppError::Terminal(format!("failed to clear terminal: {e}")))?;
        Ok(renderer)
    }
}

impl<B: Backend> TerminalRenderer<B> {
    /// Draw through an arbitrary backend without touching the real screen.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Terminal`] if the backend cannot report its size.
    pub fn with_backend(backend: B) -> Result<Self, AppError> {
        let terminal = Terminal::new(backend)
            .map_err(|e| AppError::Terminal(format!("failed to create terminal: {e}")))?;
        Ok(Self {
            terminal,
            owns_screen: false,
            frames: 0,
        })
    }

    /// Frames drawn so far.
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    fn restore_screen(&mut self) -> Result<(), RenderError> {
        if !self.owns_screen {
            return Ok(());
        }
        self.owns_screen = false;
        execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)?;
        Ok(())
    }
}

impl<B: Backend> Renderer for TerminalRenderer<B> {
    fn render(&mut self, stats: &AuthorStats) -> Result<(), RenderError> {
        let counts = count_panel(stats);
        let sentiment = sentiment_panel(stats);
        let total_events = stats.total_events();

        self.terminal
            .draw(|frame| {
                let [left, right] =
                    Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .areas(frame.area());
                frame.render_widget(
                    panel_widget(&counts, count_lines(&counts, inner_width(left)), total_events),
                    left,
                );
                frame.render_widget(
                    panel_widget(
                        &sentiment,
                        sentiment_lines(&sentiment, inner_width(right)),
                        total_events,
                    ),
                    right,
                );
            })
            .map_err(|e| RenderError::Backend(e.to_string()))?;

        self.frames = self.frames.saturating_add(1);
        debug!(frame = self.frames, authors = stats.author_count(), "dashboard redrawn");
        Ok(())
    }

    fn finish(&mut self, stats: &AuthorStats) -> Result<(), RenderError> {
        debug!(
            frames = self.frames,
            total_events = stats.total_events(),
            "closing terminal dashboard"
        );
        let owned = self.owns_screen;
        self.restore_screen()?;
        if owned {
            let width = term::size().map_or(FALLBACK_WIDTH, |(cols, _)| usize::from(cols));
            write_final_panels(&mut io::stdout().lock(), stats, width)?;
        }
        Ok(())
    }
}

impl<B: Backend> Drop for TerminalRenderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_screen() {
            warn!(error = %e, "failed to restore terminal");
        }
    }
}

impl<B: Backend> std::fmt::Debug for TerminalRenderer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalRenderer")
            .field("owns_screen", &self.owns_screen)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

/// Columns inside a bordered block.
fn inner_width(area: Rect) -> usize {
    usize::from(area.width.saturating_sub(2))
}

fn panel_widget(panel: &Panel, lines: Vec<Line<'static>>, total_events: u64) -> Paragraph<'static> {
    Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", panel.title))
            .title_bottom(format!(" {} | events: {total_events} ", panel.x_label)),
    )
}

/// Width of the label column for a panel.
fn label_width(panel: &Panel) -> usize {
    panel
        .bars
        .iter()
        .map(|bar| bar.label.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(1, MAX_LABEL_WIDTH)
}

/// Left-aligned label cut to `width` characters.
fn fit_label(label: &str, width: usize) -> String {
    let cut: String = label.chars().take(width).collect();
    format!("{cut:<width$}")
}

/// Number of cells a bar of `value` fills when `max` fills `width` cells.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar_cells(value: f64, max: f64, width: usize) -> usize {
    if !value.is_finite() || !max.is_finite() || max <= 0.0 || value <= 0.0 {
        return 0;
    }
    let cells = ((value / max).min(1.0) * width as f64).round() as usize;
    cells.min(width)
}

/// Columns left for bars after the label and value columns.
const fn bar_space(inner: usize, labels: usize) -> usize {
    inner.saturating_sub(labels.saturating_add(VALUE_WIDTH).saturating_add(2))
}

fn header_line(panel: &Panel, labels: usize) -> Line<'static> {
    Line::from(Span::styled(
        format!("{} {}", fit_label("", labels), panel.y_label),
        Style::default().fg(Color::DarkGray),
    ))
}

fn waiting_line() -> Vec<Line<'static>> {
    vec![Line::from(Span::styled(
        "waiting for messages...",
        Style::default().fg(Color::DarkGray),
    ))]
}

/// Rows of Panel A: one proportional bar per author.
fn count_lines(panel: &Panel, inner: usize) -> Vec<Line<'static>> {
    if panel.bars.is_empty() {
        return waiting_line();
    }
    let labels = label_width(panel);
    let space = bar_space(inner, labels);
    let max = panel.max_value();

    let mut lines = vec![header_line(panel, labels)];
    lines.extend(panel.bars.iter().map(|bar| {
        let cells = bar_cells(bar.value, max, space);
        Line::from(vec![
            Span::raw(format!("{} ", fit_label(&bar.label, labels))),
            Span::styled(BAR_CELL.repeat(cells), Style::default().fg(Color::Cyan)),
            Span::raw(format!(" {:.0}", bar.value)),
        ])
    }));
    lines
}

/// Rows of Panel B: bars diverging from a zero axis.
fn sentiment_lines(panel: &Panel, inner: usize) -> Vec<Line<'static>> {
    if panel.bars.is_empty() {
        return waiting_line();
    }
    let labels = label_width(panel);
    let half = bar_space(inner, labels.saturating_add(1)) / 2;
    let max = panel.max_magnitude();

    let mut lines = vec![header_line(panel, labels)];
    lines.extend(panel.bars.iter().map(|bar| {
        let negative = bar_cells(-bar.value, max, half);
        let positive = bar_cells(bar.value, max, half);
        Line::from(vec![
            Span::raw(format!("{} ", fit_label(&bar.label, labels))),
            Span::raw(" ".repeat(half.saturating_sub(negative))),
            Span::styled(BAR_CELL.repeat(negative), Style::default().fg(Color::Red)),
            Span::styled("│", Style::default().fg(Color::DarkGray)),
            Span::styled(BAR_CELL.repeat(positive), Style::default().fg(Color::Green)),
            Span::raw(" ".repeat(half.saturating_sub(positive))),
            Span::raw(format!(" {:+.2}", bar.value)),
        ])
    }));
    lines
}

fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

/// Print both panels one after the other as plain text.
fn write_final_panels<W: Write>(out: &mut W, stats: &AuthorStats, width: usize) -> io::Result<()> {
    let counts = count_panel(stats);
    let sentiment = sentiment_panel(stats);
    let panels = [
        (&counts, count_lines(&counts, width)),
        (&sentiment, sentiment_lines(&sentiment, width)),
    ];
    for (panel, lines) in panels {
        writeln!(out, "{}", panel.title)?;
        for line in &lines {
            writeln!(out, "{}", line_text(line).trim_end())?;
        }
        writeln!(out, "{} | events: {}", panel.x_label, stats.total_events())?;
        writeln!(out)?;
    }
    out.flush()
}
