//! Ratatui-based terminal dashboard.
//!
//! The dashboard renders five panels from one shared dataset:
//! country ranking list, GDP-vs-life-expectancy scatter, time trend,
//! top-20 bars, and per-region distribution summaries. Three controls
//! (indicator, year, country) drive all five panels; every control change
//! recomputes the chart specs synchronously from the in-memory table.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};

use crate::app::pipeline::{self, DatasetBundle};
use crate::charts::{self, BarSpec, BubbleSpec, ChartSet, ChoroplethSpec, RegionBoxSpec, TrendSpec};
use crate::domain::{Dataset, IncomeCategory, PipelineConfig, Selection};
use crate::error::AppError;
use crate::report::fmt_compact;

mod plotters_chart;

use plotters_chart::{legend_color, ChartSeries, XyChart};

/// Start the TUI with an already-built dataset.
pub fn run(bundle: DatasetBundle, config: PipelineConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(bundle, config);
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

/// Indexes into the controls: 0 = indicator, 1 = year, 2 = country.
const FIELD_COUNT: usize = 3;

struct App {
    dataset: Dataset,
    config: PipelineConfig,
    from_cache: bool,
    /// Sorted country display names; `country_idx == 0` means "All".
    countries: Vec<String>,
    indicator_idx: usize,
    year: i32,
    country_idx: usize,
    selected_field: usize,
    charts: ChartSet,
    status: String,
}

impl App {
    fn new(bundle: DatasetBundle, config: PipelineConfig) -> Self {
        let countries = bundle.dataset.country_names();
        let year = bundle.dataset.year_max;
        let status = if bundle.from_cache {
            format!("Loaded {} rows from cache.", bundle.dataset.rows.len())
        } else {
            format!("Fetched {} rows from the World Bank API.", bundle.dataset.rows.len())
        };

        let mut app = Self {
            dataset: bundle.dataset,
            config,
            from_cache: bundle.from_cache,
            countries,
            indicator_idx: 0,
            year,
            country_idx: 0,
            selected_field: 0,
            charts: ChartSet {
                map: ChoroplethSpec { title: String::new(), entries: Vec::new() },
                trend: TrendSpec { title: String::new(), series: Vec::new() },
                bubble: BubbleSpec { title: String::new(), points: Vec::new() },
                bar: BarSpec { title: String::new(), entries: Vec::new() },
                regions: RegionBoxSpec { title: String::new(), groups: Vec::new() },
            },
            status,
        };
        app.recompute();
        app
    }

    fn selection(&self) -> Selection {
        Selection {
            indicator: self.dataset.indicators[self.indicator_idx],
            year: self.year,
            country: if self.country_idx == 0 {
                None
            } else {
                self.countries.get(self.country_idx - 1).cloned()
            },
        }
    }

    /// Re-derive all five chart specs from the dataset and the controls.
    fn recompute(&mut self) {
        self.charts = charts::derive_all(&self.dataset, &self.selection());
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

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
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

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field < FIELD_COUNT - 1 {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('c') => {
                self.country_idx = 0;
                self.recompute();
                self.status = "Country filter cleared.".to_string();
            }
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i64) {
        match self.selected_field {
            0 => {
                let n = self.dataset.indicators.len();
                self.indicator_idx = if delta >= 0 {
                    (self.indicator_idx + 1) % n
                } else {
                    (self.indicator_idx + n - 1) % n
                };
                self.status = format!("indicator: {}", self.selection().indicator.name);
            }
            1 => {
                let next = self.year.saturating_add(delta as i32);
                self.year = next.clamp(self.dataset.year_min, self.dataset.year_max);
                self.status = format!("year: {}", self.year);
            }
            2 => {
                let max = self.countries.len();
                self.country_idx = if delta >= 0 {
                    (self.country_idx + 1).min(max)
                } else {
                    self.country_idx.saturating_sub(1)
                };
                let label = match self.selection().country {
                    Some(name) => name,
                    None => "All".to_string(),
                };
                self.status = format!("country: {label}");
            }
            _ => {}
        }
        self.recompute();
    }

    /// Refetch from the API and rebuild the dataset in place.
    ///
    /// A failed refresh keeps the current dataset and reports via the status
    /// line; it never tears the dashboard down.
    fn reload(&mut self) {
        self.status = "Refreshing from the World Bank API...".to_string();

        let mut config = self.config.clone();
        config.refresh = true;
        match pipeline::load_dataset(&config) {
            Ok(bundle) => {
                self.dataset = bundle.dataset;
                self.from_cache = bundle.from_cache;
                self.countries = self.dataset.country_names();
                self.indicator_idx = self.indicator_idx.min(self.dataset.indicators.len() - 1);
                self.year = self.year.clamp(self.dataset.year_min, self.dataset.year_max);
                self.country_idx = self.country_idx.min(self.countries.len());
                self.recompute();
                self.status = format!("Refreshed: {} rows.", self.dataset.rows.len());
            }
            Err(err) => {
                self.status = format!("Refresh failed: {err}");
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let sel = self.selection();
        let country_label = sel.country.as_deref().unwrap_or("All");

        let control = |label: String, field: usize| {
            if field == self.selected_field {
                Span::styled(
                    label,
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(label)
            }
        };

        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("wbd", Style::default().fg(Color::Cyan)),
            Span::raw(" — World Development Indicators"),
        ]));
        lines.push(Line::from(vec![
            control(format!("Indicator: {}", sel.indicator.name), 0),
            Span::raw("  |  "),
            control(format!("Year: {}", sel.year), 1),
            Span::raw("  |  "),
            control(format!("Country: {country_label}"), 2),
        ]));

        let source = if self.from_cache {
            format!("cache ({})", self.config.cache_path.display())
        } else {
            "World Bank API".to_string()
        };
        lines.push(Line::from(Span::styled(
            format!(
                "source: {source} | {} rows | years {}-{} | {} indicators | {} regions",
                self.dataset.rows.len(),
                self.dataset.year_min,
                self.dataset.year_max,
                self.dataset.indicators.len(),
                self.dataset.region_count(),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(52), Constraint::Percentage(48)])
            .split(area);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[0]);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(32),
                Constraint::Percentage(28),
            ])
            .split(rows[1]);

        self.draw_map(frame, top[0]);
        self.draw_trend(frame, top[1]);
        self.draw_bubble(frame, bottom[0]);
        self.draw_bar(frame, bottom[1]);
        self.draw_regions(frame, bottom[2]);
    }

    /// The "map" panel: a ranked, heat-colored country list.
    ///
    /// A real choropleth needs country shapes; in a terminal the same
    /// information (which countries are high/low on the selected indicator)
    /// reads better as a ranked list with a color scale.
    fn draw_map(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let spec = &self.charts.map;
        let block = Block::default()
            .title(clip(&spec.title, area.width.saturating_sub(4) as usize))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if spec.entries.is_empty() {
            frame.render_widget(empty_panel_message(), inner);
            return;
        }

        let values: Vec<f64> = spec.entries.iter().filter_map(|e| e.value).collect();
        let (lo, hi) = match (values.last(), values.first()) {
            // Entries are sorted descending, so first = max, last = min.
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (0.0, 0.0),
        };

        let name_width = (inner.width as usize).saturating_sub(12).clamp(8, 28);
        let mut lines: Vec<Line> = Vec::new();
        for entry in spec.entries.iter().take(inner.height as usize) {
            let (swatch, value_text) = match entry.value {
                Some(v) => (
                    Span::styled("██", Style::default().fg(heat_color(v, lo, hi))),
                    fmt_compact(v),
                ),
                None => (Span::styled("░░", Style::default().fg(Color::DarkGray)), "-".to_string()),
            };
            lines.push(Line::from(vec![
                swatch,
                Span::raw(format!(" {:<name_width$} ", clip(&entry.name, name_width))),
                Span::styled(format!("{value_text:>8}"), Style::default().fg(Color::Gray)),
            ]));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_trend(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let spec = &self.charts.trend;
        let block = Block::default()
            .title(clip(&spec.title, area.width.saturating_sub(4) as usize))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if spec.series.is_empty() || inner.height < 2 {
            frame.render_widget(empty_panel_message(), inner);
            return;
        }

        // Top line inside the panel is the legend; the chart gets the rest.
        let legend_rect = Rect { height: 1, ..inner };
        let chart_rect = Rect {
            y: inner.y + 1,
            height: inner.height - 1,
            ..inner
        };

        let mut legend: Vec<Span> = Vec::new();
        for (i, series) in spec.series.iter().take(5).enumerate() {
            legend.push(Span::styled(
                format!("■ {}  ", clip(&series.name, 14)),
                Style::default().fg(legend_color(i)),
            ));
        }
        if spec.series.len() > 5 {
            legend.push(Span::styled(
                format!("(+{})", spec.series.len() - 5),
                Style::default().fg(Color::Gray),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(legend)), legend_rect);

        let lines: Vec<ChartSeries> = spec
            .series
            .iter()
            .enumerate()
            .map(|(i, s)| ChartSeries {
                points: s.points.iter().map(|&(year, v)| (year as f64, v)).collect(),
                color: i,
            })
            .collect();

        let xs = lines.iter().flat_map(|s| s.points.iter().map(|p| p.0));
        let ys = lines.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let x_bounds = padded_bounds(xs, 0.5);
        let y_bounds = padded_bounds(ys, 0.0);

        frame.render_widget(
            XyChart {
                lines: &lines,
                dots: &[],
                x_bounds,
                y_bounds,
                x_label: "year",
                y_label: self.selection().indicator.name,
                fmt_x: fmt_int,
                fmt_y: fmt_compact,
            },
            chart_rect,
        );
    }

    fn draw_bubble(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let spec = &self.charts.bubble;
        let block = Block::default()
            .title(clip(&spec.title, area.width.saturating_sub(4) as usize))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if spec.points.is_empty() || inner.height < 2 {
            frame.render_widget(empty_panel_message(), inner);
            return;
        }

        // One scatter group per income category; GDP on a log axis so low-
        // and high-income economies both stay readable.
        let mut groups: Vec<ChartSeries> = Vec::new();
        for point in &spec.points {
            if point.gdp_per_capita <= 0.0 {
                continue;
            }
            let color = category_color_idx(point.category);
            let xy = (point.gdp_per_capita.log10(), point.life_expectancy);
            match groups.iter_mut().find(|g| g.color == color) {
                Some(group) => group.points.push(xy),
                None => groups.push(ChartSeries { points: vec![xy], color }),
            }
        }

        let legend_rect = Rect { height: 1, ..inner };
        let chart_rect = Rect {
            y: inner.y + 1,
            height: inner.height - 1,
            ..inner
        };

        let legend: Vec<Span> = IncomeCategory::ALL
            .iter()
            .map(|&cat| {
                Span::styled(
                    format!("● {}  ", cat.display_name()),
                    Style::default().fg(legend_color(category_color_idx(Some(cat)))),
                )
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(legend)), legend_rect);

        let xs = groups.iter().flat_map(|g| g.points.iter().map(|p| p.0));
        let ys = groups.iter().flat_map(|g| g.points.iter().map(|p| p.1));
        let x_bounds = padded_bounds(xs, 0.1);
        let y_bounds = padded_bounds(ys, 1.0);

        frame.render_widget(
            XyChart {
                lines: &[],
                dots: &groups,
                x_bounds,
                y_bounds,
                x_label: "GDP per capita (log)",
                y_label: "life expectancy",
                fmt_x: fmt_log_dollars,
                fmt_y: fmt_int,
            },
            chart_rect,
        );
    }

    /// Horizontal top-20 bars, biggest at the top.
    fn draw_bar(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let spec = &self.charts.bar;
        let block = Block::default()
            .title(clip(&spec.title, area.width.saturating_sub(4) as usize))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if spec.entries.is_empty() {
            frame.render_widget(empty_panel_message(), inner);
            return;
        }

        let max = spec
            .entries
            .iter()
            .map(|e| e.value.abs())
            .fold(0.0_f64, f64::max);
        let name_width = 14usize;
        let value_width = 8usize;
        let bar_width = (inner.width as usize).saturating_sub(name_width + value_width + 3);

        let mut lines: Vec<Line> = Vec::new();
        // Entries arrive ascending; draw the biggest first.
        for entry in spec.entries.iter().rev().take(inner.height as usize) {
            let filled = if max > 0.0 {
                ((entry.value.abs() / max) * bar_width as f64).round() as usize
            } else {
                0
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{:<name_width$} ", clip(&entry.name, name_width))),
                Span::styled("█".repeat(filled.min(bar_width)), Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!(" {:>value_width$}", fmt_compact(entry.value)),
                    Style::default().fg(Color::Gray),
                ),
            ]));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    /// Per-region five-number summaries, the terminal stand-in for box plots.
    fn draw_regions(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let spec = &self.charts.regions;
        let block = Block::default()
            .title(clip(&spec.title, area.width.saturating_sub(4) as usize))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if spec.groups.is_empty() {
            frame.render_widget(empty_panel_message(), inner);
            return;
        }

        let mut lines: Vec<Line> = Vec::new();
        for group in &spec.groups {
            lines.push(Line::from(Span::styled(
                format!(
                    "{} (n={})",
                    clip(&group.region, (inner.width as usize).saturating_sub(10)),
                    group.n
                ),
                Style::default().fg(Color::Cyan),
            )));
            lines.push(Line::from(Span::raw(format!(
                "  {} [{} | {} | {}] {}",
                fmt_compact(group.min),
                fmt_compact(group.q1),
                fmt_compact(group.median),
                fmt_compact(group.q3),
                fmt_compact(group.max),
            ))));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select control  ←/→ adjust  c clear country  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn empty_panel_message() -> Paragraph<'static> {
    Paragraph::new("(no data for this selection)").style(Style::default().fg(Color::Yellow))
}

/// Map each income category to a stable palette slot; uncategorized rows get
/// a slot no category uses.
fn category_color_idx(category: Option<IncomeCategory>) -> usize {
    match category {
        Some(cat) => IncomeCategory::ALL
            .iter()
            .position(|&c| c == cat)
            .unwrap_or(0),
        None => 9,
    }
}

/// Five-step cold-to-hot scale over `[lo, hi]`.
fn heat_color(v: f64, lo: f64, hi: f64) -> Color {
    const SCALE: [Color; 5] = [Color::Blue, Color::Cyan, Color::Green, Color::Yellow, Color::Red];
    if !(hi > lo) {
        return SCALE[2];
    }
    let u = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    SCALE[((u * (SCALE.len() as f64 - 1.0)).round() as usize).min(SCALE.len() - 1)]
}

/// Min/max of an iterator with a symmetric pad; a degenerate range (empty,
/// single point, or non-finite) gets a small synthetic span so Plotters
/// always receives valid bounds.
fn padded_bounds(values: impl Iterator<Item = f64>, min_pad: f64) -> [f64; 2] {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    let pad = ((hi - lo).abs() * 0.05).max(min_pad).max(1e-9);
    [lo - pad, hi + pad]
}

fn fmt_int(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_log_dollars(v: f64) -> String {
    fmt_compact(10f64.powf(v))
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
