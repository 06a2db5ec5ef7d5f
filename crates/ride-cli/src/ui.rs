//! TUI rendering for the `watch` screen.

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Gauge, Paragraph},
};
use ride_monitor::MonitorSnapshot;

use crate::app::WatchApp;

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &WatchApp) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  match &app.snapshot {
    Some(snapshot) => draw_ride(f, rows[1], snapshot),
    None => draw_empty(f, rows[1]),
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &WatchApp) {
  let time = Local::now().format("%H:%M:%S").to_string();

  let left = Span::styled(
    format!(" ride  passenger {}", app.passenger_id),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(format!("{time} "), Style::default().fg(Color::Gray));

  let pad = area
    .width
    .saturating_sub(left.content.len() as u16)
    .saturating_sub(right.content.len() as u16);
  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::DarkGray)),
    area,
  );
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_empty(f: &mut Frame, area: Rect) {
  let block = Block::default()
    .title(" Active ride ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new("No active ride.").style(Style::default().fg(Color::DarkGray)),
    inner,
  );
}

fn draw_ride(f: &mut Frame, area: Rect, s: &MonitorSnapshot) {
  let title = if s.completed { " Ride completed " } else { " Active ride " };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(2), // headline
      Constraint::Length(1), // gauge
      Constraint::Length(1),
      Constraint::Length(3), // figures
      Constraint::Min(0),    // stages
    ])
    .split(inner);

  let headline = if s.completed {
    "Thank you for riding with us"
  } else {
    s.headline.as_str()
  };
  f.render_widget(
    Paragraph::new(vec![
      Line::from(Span::styled(
        headline.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
      )),
      Line::from(Span::styled(
        s.ride_id.to_string(),
        Style::default().fg(Color::DarkGray),
      )),
    ]),
    rows[0],
  );

  let ratio = (s.progress / 100.0).clamp(0.0, 1.0);
  f.render_widget(
    Gauge::default()
      .gauge_style(Style::default().fg(Color::Cyan))
      .ratio(ratio)
      .label(format!("{:.0}%", s.progress)),
    rows[1],
  );

  let figures = vec![
    figure("ETA", format!("{} min", s.eta_minutes)),
    figure("Fare", format!("{:.2}", s.fare)),
    figure("Status", s.status.to_string()),
  ];
  f.render_widget(Paragraph::new(figures), rows[3]);

  let stages: Vec<Line> = s
    .stages
    .iter()
    .map(|stage| {
      let (mark, style) = if stage.completed {
        ("●", Style::default().fg(Color::Green))
      } else {
        ("○", Style::default().fg(Color::DarkGray))
      };
      Line::from(vec![
        Span::styled(format!("{mark} "), style),
        Span::styled(stage.label.clone(), style),
      ])
    })
    .collect();
  f.render_widget(Paragraph::new(stages), rows[4]);
}

fn figure(label: &str, value: String) -> Line<'static> {
  Line::from(vec![
    Span::styled(
      format!("{label:<8}"),
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::raw(value),
  ])
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &WatchApp) {
  let (mode_label, hints) = if app.is_completed() {
    ("DONE", "q quit")
  } else {
    ("LIVE", "s SOS  h share  q quit")
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let line = Line::from(vec![
    Span::styled(
      format!(" {mode_label} "),
      Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!("  {status}"), Style::default().fg(Color::DarkGray)),
  ]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
