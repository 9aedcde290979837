use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

use crate::error::error_chain;
use crate::stats::{ChampionCount, StatsAggregator, StatsSnapshot};

#[derive(Debug, Default)]
pub struct DashboardView {
    pub snapshot: Option<StatsSnapshot>,
    pub last_error: Option<String>,
    pub refreshed_at: Option<DateTime<Local>>,
}

impl DashboardView {
    pub fn refresh(&mut self, aggregator: &StatsAggregator) {
        match aggregator.compute() {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(error_chain(&err)),
        }
        self.refreshed_at = Some(Local::now());
    }
}

/// Full-screen stats view. `r` reloads, `q`/Esc quits.
pub fn run(aggregator: &StatsAggregator, refresh_every: Duration) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let res = run_loop(&mut terminal, aggregator, refresh_every);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    aggregator: &StatsAggregator,
    refresh_every: Duration,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut view = DashboardView::default();
    view.refresh(aggregator);
    let mut last_refresh = Instant::now();

    loop {
        terminal.draw(|f| render(f, &view))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('r') => {
                            view.refresh(aggregator);
                            last_refresh = Instant::now();
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_refresh.elapsed() >= refresh_every {
            view.refresh(aggregator);
            last_refresh = Instant::now();
        }
    }
}

pub fn render(frame: &mut Frame, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(12),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(view))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let Some(snapshot) = view.snapshot.as_ref() else {
        let msg = view
            .last_error
            .clone()
            .unwrap_or_else(|| "Loading stats...".to_string());
        frame.render_widget(
            Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)),
            chunks[1],
        );
        return;
    };

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(30),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(chunks[1]);
    frame.render_widget(winrate_chart(snapshot), top[0]);
    render_ranking(frame, top[1], "Blue side winners", &snapshot.blue_champs, Color::Blue);
    render_ranking(frame, top[2], "Red side winners", &snapshot.red_champs, Color::Red);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(chunks[2]);
    render_ranking(
        frame,
        bottom[0],
        "Most picked",
        &snapshot.most_picked_champions,
        Color::Yellow,
    );
    render_roles(frame, bottom[1], snapshot);

    let footer = Paragraph::new("r Reload | q Quit").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

fn header_text(view: &DashboardView) -> String {
    let total = view
        .snapshot
        .as_ref()
        .map(|s| s.total_predictions.to_string())
        .unwrap_or_else(|| "-".to_string());
    let refreshed = view
        .refreshed_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let mut line = format!("DRAFT ORACLE | predictions: {total} | refreshed {refreshed}");
    if let Some(err) = view.last_error.as_ref() {
        line.push_str(&format!(" | [WARN] {err}"));
    }
    line
}

fn winrate_chart(snapshot: &StatsSnapshot) -> BarChart<'static> {
    let blue = Bar::default()
        .value(snapshot.blue_winrate.round() as u64)
        .text_value(format!("{:.1}%", snapshot.blue_winrate))
        .label(Line::from("Blue"))
        .style(Style::default().fg(Color::Blue));
    let red = Bar::default()
        .value(snapshot.red_winrate.round() as u64)
        .text_value(format!("{:.1}%", snapshot.red_winrate))
        .label(Line::from("Red"))
        .style(Style::default().fg(Color::Red));

    BarChart::default()
        .block(Block::default().title("Win rate").borders(Borders::ALL))
        .data(BarGroup::default().bars(&[blue, red]))
        .bar_width(8)
        .bar_gap(4)
        .max(100)
}

fn ranking_lines(rows: &[ChampionCount]) -> String {
    if rows.is_empty() {
        return "No predictions yet".to_string();
    }
    rows.iter()
        .enumerate()
        .map(|(idx, (champ, count))| format!("{:>2}. {champ:<14} {count:>4}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_ranking(frame: &mut Frame, area: Rect, title: &str, rows: &[ChampionCount], color: Color) {
    let widget = Paragraph::new(ranking_lines(rows))
        .style(Style::default().fg(color))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_roles(frame: &mut Frame, area: Rect, snapshot: &StatsSnapshot) {
    let constraints = [Constraint::Ratio(1, 5); 5];
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for (idx, (role, rows)) in snapshot.most_picked_by_role.iter().enumerate() {
        render_ranking(frame, columns[idx], role.as_str(), rows, Color::White);
    }
}
