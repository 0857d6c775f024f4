//! Renderer contract and the backend-independent panel model.
//!
//! After every recorded event the driver loop hands the live
//! [`AuthorStats`] to a [`Renderer`], which redraws two panels from scratch:
//!
//! - **Panel A** ([`count_panel`]): one bar per author, height = message count.
//! - **Panel B** ([`sentiment_panel`]): one bar per author, height = mean
//!   sentiment.
//!
//! Both panels list authors in first-appearance order. The renderer only
//! borrows the stats for the duration of the call.

use tracing::{debug, info};

use crate::error::RenderError;
use crate::stats::AuthorStats;

/// Title of the message-count panel.
pub const COUNT_PANEL_TITLE: &str = "Real-Time Author Message Counts";

/// Title of the mean-sentiment panel.
pub const SENTIMENT_PANEL_TITLE: &str = "Real-Time Sentiment Distribution By Author";

/// Redraws the dashboard from the current aggregates.
pub trait Renderer {
    /// Fully redraw both panels from `stats`. Called once per recorded event.
    fn render(&mut self, stats: &AuthorStats) -> Result<(), RenderError>;

    /// Called once when the consumer stops. Restores whatever the renderer
    /// took over (terminal modes, windows).
    fn finish(&mut self, _stats: &AuthorStats) -> Result<(), RenderError> {
        Ok(())
    }
}

/// One bar of a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelBar {
    /// Author key shown under the bar.
    pub label: String,
    /// Bar height.
    pub value: f64,
}

/// A bar chart, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Chart title.
    pub title: &'static str,
    /// Category axis label.
    pub x_label: &'static str,
    /// Value axis label.
    pub y_label: &'static str,
    /// Bars in first-appearance order.
    pub bars: Vec<PanelBar>,
}

impl Panel {
    /// Largest bar value, 0 for an empty panel.
    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|bar| bar.value).fold(0.0, f64::max)
    }

    /// Largest absolute bar value, 0 for an empty panel.
    pub fn max_magnitude(&self) -> f64 {
        self.bars.iter().map(|bar| bar.value.abs()).fold(0.0, f64::max)
    }
}

/// Panel A: message count per author.
#[allow(clippy::cast_precision_loss)]
pub fn count_panel(stats: &AuthorStats) -> Panel {
    Panel {
        title: COUNT_PANEL_TITLE,
        x_label: "Authors",
        y_label: "Message Counts",
        bars: stats
            .counts()
            .into_iter()
            .map(|(author, count)| PanelBar {
                label: author.to_owned(),
                value: count as f64,
            })
            .collect(),
    }
}

/// Panel B: mean sentiment per author, computed independently of Panel A.
pub fn sentiment_panel(stats: &AuthorStats) -> Panel {
    Panel {
        title: SENTIMENT_PANEL_TITLE,
        x_label: "Authors",
        y_label: "Average Sentiment",
        bars: stats
            .mean_sentiments()
            .into_iter()
            .map(|(author, mean)| PanelBar {
                label: author.to_owned(),
                value: mean,
            })
            .collect(),
    }
}

/// A renderer that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRenderer;

impl Renderer for NoOpRenderer {
    fn render(&mut self, _stats: &AuthorStats) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Headless renderer that writes both panels to the log.
///
/// Each refresh logs one line per panel at info level; individual bars are
/// logged at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer {
    refreshes: u64,
}

impl LogRenderer {
    /// Create a log renderer.
    pub const fn new() -> Self {
        Self { refreshes: 0 }
    }

    /// Number of refreshes drawn so far.
    pub const fn refreshes(&self) -> u64 {
        self.refreshes
    }

    fn log_panel(refresh: u64, panel: &Panel) {
        let bars: Vec<String> = panel
            .bars
            .iter()
            .map(|bar| format!("{}={:.3}", bar.label, bar.value))
            .collect();
        info!(
            refresh = refresh,
            panel = panel.title,
            y_label = panel.y_label,
            bars = bars.join(", "),
            "panel refreshed"
        );
        for bar in &panel.bars {
            debug!(panel = panel.title, author = bar.label, value = bar.value, "bar");
        }
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, stats: &AuthorStats) -> Result<(), RenderError> {
        self.refreshes = self.refreshes.saturating_add(1);
        Self::log_panel(self.refreshes, &count_panel(stats));
        Self::log_panel(self.refreshes, &sentiment_panel(stats));
        Ok(())
    }

    fn finish(&mut self, stats: &AuthorStats) -> Result<(), RenderError> {
        info!(
            refreshes = self.refreshes,
            authors = stats.author_count(),
            total_events = stats.total_events(),
            "log renderer finished"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_stats() -> AuthorStats {
        let mut stats = AuthorStats::new();
        stats.record("a", 0.8).unwrap();
        stats.record("b", -0.6).unwrap();
        stats.record("a", 0.0).unwrap();
        stats
    }

    #[test]
    fn count_panel_has_one_bar_per_author() {
        let panel = count_panel(&sample_stats());
        assert_eq!(panel.title, COUNT_PANEL_TITLE);
        assert_eq!(
            panel.bars,
            vec![
                PanelBar { label: "a".to_owned(), value: 2.0 },
                PanelBar { label: "b".to_owned(), value: 1.0 },
            ]
        );
        assert!((panel.max_value() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn sentiment_panel_matches_count_panel_keys() {
        let stats = sample_stats();
        let counts = count_panel(&stats);
        let sentiment = sentiment_panel(&stats);

        let count_labels: Vec<&str> = counts.bars.iter().map(|b| b.label.as_str()).collect();
        let sentiment_labels: Vec<&str> =
            sentiment.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(count_labels, sentiment_labels);

        let a = sentiment.bars.first().unwrap();
        assert!((a.value - 0.4).abs() < 1e-9);
        assert!((sentiment.max_magnitude() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_stats_give_empty_panels() {
        let stats = AuthorStats::new();
        assert!(count_panel(&stats).bars.is_empty());
        assert!(sentiment_panel(&stats).bars.is_empty());
        assert!(count_panel(&stats).max_value().abs() < f64::EPSILON);
    }

    #[test]
    fn log_renderer_counts_refreshes() {
        let stats = sample_stats();
        let mut renderer = LogRenderer::new();
        renderer.render(&stats).unwrap();
        renderer.render(&stats).unwrap();
        renderer.finish(&stats).unwrap();
        assert_eq!(renderer.refreshes(), 2);
    }
}
