mod tui_app;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tui_app::{
    format_boost, format_change, format_price, format_price_text, format_time_ms, format_usd,
    truncate, AppState, ConnectionStatus, SnapshotView,
};

const LIST_REFRESH: Duration = Duration::from_secs(15);
const DETAIL_REFRESH: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .expect("failed to build HTTP client");

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let mut last_list = Instant::now();
    let mut last_detail = Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let (interval, since) = if app.showing_detail() {
            (DETAIL_REFRESH, last_detail)
        } else {
            (LIST_REFRESH, last_list)
        };
        let timeout = interval.checked_sub(since.elapsed()).unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            if app.showing_detail() {
                                app.refresh_detail(client).await;
                                last_detail = Instant::now();
                            } else {
                                app.refresh(client).await;
                                last_list = Instant::now();
                            }
                        }
                        KeyCode::Enter if !app.showing_detail() => {
                            let selected = table_state
                                .selected()
                                .and_then(|i| app.tickers.get(i))
                                .map(|t| t.address.clone());
                            if let Some(address) = selected {
                                app.open_detail(client, &address).await;
                                last_detail = Instant::now();
                            }
                        }
                        KeyCode::Esc | KeyCode::Backspace => app.close_detail(),
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.tickers.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.showing_detail() {
            if last_detail.elapsed() >= DETAIL_REFRESH {
                app.refresh_detail(client).await;
                last_detail = Instant::now();
            }
        } else if last_list.elapsed() >= LIST_REFRESH {
            app.refresh(client).await;
            last_list = Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    if app.showing_detail() {
        render_detail(f, app, chunks[1]);
    } else {
        render_tickers_table(f, app, table_state, chunks[1]);
    }
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let p99_str = app
        .latency
        .p99_ms
        .map_or("—".to_string(), |v| format!("feed p99 {v:.0}ms"));

    let title_spans = vec![
        Span::styled(
            " Alpha Scanner  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} tokens", app.tickers.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} missing", app.missing.len()),
            Style::default().fg(if app.missing.is_empty() { Color::White } else { Color::Yellow }),
        ),
        Span::raw("  │  "),
        Span::styled(p99_str, Style::default().fg(Color::White)),
        Span::raw("  │  "),
        if app.health.last_refresh_ok {
            Span::styled("refresh ok", Style::default().fg(Color::Green))
        } else {
            Span::styled(
                format!("refresh degraded ({} failed)", app.health.last_failed_requests),
                Style::default().fg(Color::Yellow),
            )
        },
    ];

    let header_line = Line::from(title_spans);
    let paragraph = Paragraph::new(header_line)
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_tickers_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Token", "Price", "24h", "Status", "Abn", "Boost"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .tickers
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let change = t.record.price_change.h24;
            let change_color = match change {
                Some(v) if v > 0.0 => Color::Green,
                Some(v) if v < 0.0 => Color::Red,
                _ => Color::DarkGray,
            };
            let status = format!("{} ({})", t.analysis.status, t.analysis.score);
            let abnormal = if t.analysis.factors.abnormal_movement { "!" } else { "" };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&t.record.base_token.symbol, 12)),
                Cell::from(format_price_text(&t.record.price_usd)),
                Cell::from(format_change(change)).style(Style::default().fg(change_color)),
                Cell::from(status).style(Style::default().fg(status_color(&t.analysis.status))),
                Cell::from(abnormal).style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Cell::from(format_boost(t.boost)).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(14),
            Constraint::Length(9),
            Constraint::Length(15),
            Constraint::Length(3),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " WATCH-LIST ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_detail(f: &mut Frame, app: &AppState, area: Rect) {
    let address = app.detail.address.as_deref().unwrap_or_default();
    let Some(snap) = app.detail.snapshot.as_ref() else {
        let msg = app
            .detail
            .error
            .clone()
            .unwrap_or_else(|| format!("Loading {address}…"));
        let paragraph = Paragraph::new(msg)
            .block(Block::default().borders(Borders::ALL).title(" DETAIL "));
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // prices
            Constraint::Length(3), // score gauge
            Constraint::Length(4), // description
            Constraint::Min(0),    // factors
        ])
        .split(area);

    render_prices(f, app, snap, chunks[0]);

    let score = snap.analysis.score.min(100);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Stability "))
        .gauge_style(Style::default().fg(status_color(&snap.analysis.status)))
        .percent(u16::from(score))
        .label(format!("{} / 100  {}", score, snap.analysis.status));
    f.render_widget(gauge, chunks[1]);

    let description = Paragraph::new(snap.analysis.description.clone())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Assessment "));
    f.render_widget(description, chunks[2]);

    render_factors(f, snap, chunks[3]);
}

fn render_prices(f: &mut Frame, app: &AppState, snap: &SnapshotView, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Current  ", label),
            Span::styled(
                format_price_text(&snap.record.price_usd),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled("1h ", label),
            Span::raw(format_change(snap.record.price_change.h1)),
            Span::raw("   "),
            Span::styled("24h ", label),
            Span::raw(format_change(snap.record.price_change.h24)),
        ]),
        Line::from(vec![
            Span::styled("Buy      ", label),
            Span::styled(format_price(snap.strategy.buy_price), Style::default().fg(Color::Green)),
            Span::raw("   "),
            Span::styled("Sell ", label),
            Span::styled(format_price(snap.strategy.sell_price), Style::default().fg(Color::Red)),
            Span::raw("   "),
            Span::styled("Spread ", label),
            Span::raw(format_price(snap.strategy.spread)),
        ]),
        Line::from(vec![
            Span::styled("Liq      ", label),
            Span::raw(format_usd(snap.record.liquidity.and_then(|l| l.usd))),
            Span::raw("   "),
            Span::styled("Vol 24h ", label),
            Span::raw(format_usd(snap.record.volume.h24)),
            Span::raw("   "),
            Span::styled("Boost ", label),
            Span::raw(format_boost(snap.boost)),
        ]),
    ];

    let mut status_spans = vec![
        Span::styled("Updated  ", label),
        Span::raw(format_time_ms(snap.updated_at_ms)),
    ];
    if app.detail.cached {
        status_spans.push(Span::styled("  (cached)", label));
    }
    if let Some(err) = &app.detail.error {
        status_spans.push(Span::styled(format!("  ✗ {}", truncate(err, 40)), Style::default().fg(Color::Red)));
    }
    lines.push(Line::from(status_spans));

    let title = format!(
        " {} ({}) · {} ",
        snap.record.base_token.symbol,
        truncate(&snap.record.base_token.name, 24),
        snap.record.chain_id,
    );
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
    );
    f.render_widget(paragraph, area);
}

fn render_factors(f: &mut Frame, snap: &SnapshotView, area: Rect) {
    let factors = &snap.analysis.factors;
    let abnormal = if factors.abnormal_movement { "YES" } else { "no" };
    let rows = vec![
        Row::new(vec![Cell::from("Price volatility"), Cell::from(factors.price_volatility.clone())]),
        Row::new(vec![Cell::from("Volume trend"), Cell::from(factors.volume_trend.clone())]),
        Row::new(vec![Cell::from("Trend"), Cell::from(factors.trend.clone())]),
        Row::new(vec![
            Cell::from("Abnormal movement"),
            Cell::from(abnormal).style(Style::default().fg(if factors.abnormal_movement {
                Color::Red
            } else {
                Color::White
            })),
        ]),
    ];

    let table = Table::new(rows, [Constraint::Length(20), Constraint::Min(10)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Factors "),
    );
    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
    ];
    if app.showing_detail() {
        spans.push(Span::styled("[esc] ", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw("back  "));
        spans.push(Span::styled("auto-refresh: 5s", Style::default().fg(Color::DarkGray)));
    } else {
        spans.push(Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw("select  "));
        spans.push(Span::styled("[enter] ", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw("detail  "));
        spans.push(Span::styled("auto-refresh: 15s", Style::default().fg(Color::DarkGray)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn status_color(status: &str) -> Color {
    match status {
        "STABLE" => Color::Green,
        "MODERATE" => Color::LightGreen,
        "VOLATILE" => Color::Yellow,
        "EXTREME" => Color::Red,
        _ => Color::White,
    }
}
