//! Screen layouts.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::AppContext;
use crate::domain::chart::ChartMode;
use crate::domain::ledger::{Ledger, Order};
use crate::domain::navigation::{
    MenuAction, OrderAction, OrderForm, Screen, FIELD_LABELS, SUBMIT_FIELD, SUBMIT_LABEL,
};
use crate::domain::symbol::{base_currency, split_symbol};
use crate::domain::ticker::Ticker;

const SEPARATOR: &str =
    "------------------------------------------------------------------------";
/// Rows above the mini chart: title, separator, ticker line, separator.
const TRADING_INFO_ROWS: usize = 4;
/// Rows below it: separator, six fields, separator, order header, status.
const TRADING_FORM_ROWS: usize = 10;

/// Fullscreen plot size: three rows for title, separator and status.
pub fn fullscreen_chart_size(height: u16, width: u16) -> (usize, usize) {
    let h = (height as usize).saturating_sub(3).max(6);
    let w = (width as usize).saturating_sub(3).max(20);
    (h, w)
}

/// Mini plot size on the trading screen, never taller than the space left
/// around the form.
pub fn mini_chart_size(height: u16, width: u16, configured: usize) -> (usize, usize) {
    let available = (height as usize).saturating_sub(TRADING_INFO_ROWS + TRADING_FORM_ROWS);
    let w = (width as usize).saturating_sub(6).max(20);
    (configured.min(available), w)
}

fn fmt_price(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| v.to_string())
}

fn fmt_pct(value: Option<f64>) -> String {
    format!("{:.2}%", value.unwrap_or(0.0))
}

fn quote_currency(ledger: &Ledger) -> &str {
    ledger
        .symbols
        .first()
        .and_then(|s| split_symbol(s).ok())
        .map_or("USDT", |(_, quote)| quote)
}

fn balance_text(ledger: &Ledger) -> String {
    let quote = quote_currency(ledger);
    format!("Balance: {:.2} {}", ledger.balance(quote), quote)
}

fn order_text(position: usize, order: &Order) -> String {
    format!(
        "{}. {} {} {} | {}",
        position + 1,
        order.side.label(),
        order.amount,
        order.symbol,
        order.price
    )
}

fn highlighted(text: String, selected: bool) -> Line<'static> {
    if selected {
        Line::from(Span::styled(
            format!("> {text}"),
            Style::default().add_modifier(Modifier::REVERSED),
        ))
    } else {
        Line::from(format!("  {text}"))
    }
}

fn form_lines(form: &OrderForm) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = FIELD_LABELS
        .iter()
        .zip(form.fields.iter())
        .enumerate()
        .map(|(i, (label, value))| marked(format!("{label}{value}"), form.current == i))
        .collect();
    lines.push(marked(SUBMIT_LABEL.to_string(), form.on_submit()));
    debug_assert_eq!(lines.len(), SUBMIT_FIELD + 1);
    lines
}

fn marked(text: String, current: bool) -> Line<'static> {
    let marker = if current { "> " } else { "  " };
    Line::from(format!("{marker}{text}"))
}

/// Body area and a one-row status bar at the bottom.
fn with_status(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    (chunks[0], chunks[1])
}

fn draw_status(frame: &mut Frame, status: &str, area: Rect) {
    let style = if status.starts_with("Error") || status.starts_with("Failed") {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(Paragraph::new(Line::styled(status.to_string(), style)), area);
}

fn draw_right(frame: &mut Frame, text: String, area: Rect, row: u16) {
    if row >= area.height {
        return;
    }
    let rect = Rect::new(area.x, area.y + row, area.width, 1);
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Right), rect);
}

pub fn draw(frame: &mut Frame, ctx: &mut AppContext) {
    let (body, status_area) = with_status(frame.area());
    match ctx.nav().screen() {
        Screen::SymbolList | Screen::Exit => draw_symbols(frame, ctx, body, None),
        Screen::AddSymbol => {
            let prompt = format!("Enter symbol: {}_", ctx.nav().add_input());
            draw_symbols(frame, ctx, body, Some(prompt));
        }
        Screen::Menu => draw_menu(frame, ctx, body),
        Screen::Trading => draw_trading(frame, ctx, body),
        Screen::OrderOptions { .. } => draw_order_options(frame, ctx, body),
        Screen::OrderEdit { index } => draw_order_edit(frame, ctx, body, index),
        Screen::Fullscreen { .. } => draw_fullscreen(frame, ctx, body),
    }
    draw_status(frame, &ctx.status(), status_area);
}

fn draw_symbols(frame: &mut Frame, ctx: &AppContext, area: Rect, prompt: Option<String>) {
    let ledger = ctx.ledger();
    let board = ctx.board();
    let mut lines = vec![
        Line::styled(
            "<<<<<<<<<<<<<<<<<<<<<<< Private Trading Program >>>>>>>>>>>>>>>>>>>>>>>>",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Line::from(format!("{} | PNL: {}", balance_text(ledger), ledger.pnl)),
        Line::from(format!("Open Orders: {}", ledger.order_count())),
        Line::from(SEPARATOR),
    ];

    for (i, symbol) in ledger.symbols.iter().enumerate() {
        let ticker = board.get(symbol);
        let ticker = ticker.as_deref();
        let qty = base_currency(symbol).map_or(0.0, |b| ledger.balance(b));
        let text = format!(
            "{symbol} | Price: {} | Change: {} | Quantity: {qty}",
            fmt_price(ticker.and_then(|t| t.last)),
            fmt_pct(ticker.and_then(|t| t.percentage)),
        );
        lines.push(highlighted(text, i == ctx.nav().selected_index()));
    }
    if ledger.symbols.is_empty() {
        lines.push(Line::from("  No symbols tracked. Press 'c' to add one."));
    }

    let footer_row = area.height.saturating_sub(2) as usize;
    while lines.len() < footer_row {
        lines.push(Line::from(""));
    }
    lines.push(Line::styled(
        prompt.unwrap_or_else(|| {
            "Up/Down select | Enter trade | 'r' full-screen chart | 'c' menu | 'q' quit".into()
        }),
        Style::default().fg(Color::Yellow),
    ));

    frame.render_widget(Paragraph::new(lines), area);
    draw_right(
        frame,
        format!("spotsim v{}", env!("CARGO_PKG_VERSION")),
        area,
        1,
    );
    draw_right(
        frame,
        format!(
            "Last Update: {}",
            board.last_update().unwrap_or_else(|| "--".into())
        ),
        area,
        2,
    );
}

fn draw_menu(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let mut lines = vec![Line::from("Options:")];
    for (i, action) in MenuAction::ALL.iter().enumerate() {
        lines.push(highlighted(
            action.label().to_string(),
            i == ctx.nav().menu_highlight(),
        ));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_order_options(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let mut lines = vec![Line::from("Options:")];
    for (i, action) in OrderAction::ALL.iter().enumerate() {
        lines.push(marked(
            action.label().to_string(),
            i == ctx.nav().options_highlight(),
        ));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn ticker_line(symbol: &str, ticker: Option<&Ticker>, ledger: &Ledger) -> Line<'static> {
    let qty = base_currency(symbol).map_or(0.0, |b| ledger.balance(b));
    let pct = ticker.and_then(|t| t.percentage);
    let colour = match pct {
        Some(p) if p < 0.0 => Color::Red,
        Some(_) => Color::Green,
        None => Color::Reset,
    };
    Line::from(vec![
        Span::raw(format!(
            "{symbol}: {} | ",
            fmt_price(ticker.and_then(|t| t.last))
        )),
        Span::styled(fmt_pct(pct), Style::default().fg(colour)),
        Span::raw(format!(" | Quantity: {qty}")),
    ])
}

fn title_row(frame: &mut Frame, title: &str, ctx: &AppContext, area: Rect) -> Line<'static> {
    draw_right(frame, balance_text(ctx.ledger()), area, 0);
    Line::styled(
        title.to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn draw_trading(frame: &mut Frame, ctx: &mut AppContext, area: Rect) {
    let Some(symbol) = ctx.active_symbol().map(str::to_string) else {
        return;
    };
    let (plot_h, plot_w) =
        mini_chart_size(area.height + 1, area.width, ctx.config().chart.mini_chart_height);
    let chart = ctx.chart_rows(ChartMode::Mini, plot_h, plot_w);

    let ticker = ctx.active_ticker();
    let mut lines = vec![
        Line::from(""),
        Line::from(SEPARATOR),
        ticker_line(&symbol, ticker.as_deref(), ctx.ledger()),
        Line::from(SEPARATOR),
    ];
    lines.extend(chart.into_iter().map(Line::from));
    lines.push(Line::from(SEPARATOR));
    let fields_row = lines.len() as u16;
    lines.extend(form_lines(ctx.nav().form()));
    lines.push(Line::from(SEPARATOR));

    let ledger = ctx.ledger();
    lines.push(Line::from(format!("Open Orders: {}", ledger.order_count())));
    let cursor = ctx.nav().order_cursor();
    let room = (area.height as usize).saturating_sub(lines.len());
    // Keep the cursor visible when the list is longer than the screen.
    let skip = (cursor + 1).saturating_sub(room);
    for (i, order) in ledger.open_orders.iter().enumerate().skip(skip).take(room) {
        lines.push(highlighted(order_text(i, order), i == cursor));
    }

    frame.render_widget(Paragraph::new(lines), area);
    let title = title_row(frame, "                              ★ TRADING ★", ctx, area);
    frame.render_widget(Paragraph::new(title), Rect::new(area.x, area.y, area.width / 2, 1));
    draw_right(
        frame,
        "Press 'r' to open full-screen chart".into(),
        area,
        fields_row + 1,
    );
}

fn draw_order_edit(frame: &mut Frame, ctx: &AppContext, area: Rect, index: usize) {
    let Some(order) = ctx.ledger().open_orders.get(index) else {
        return;
    };
    let ticker = ctx.board().get(&order.symbol);
    let mut lines = vec![
        Line::from(""),
        Line::from(SEPARATOR),
        ticker_line(&order.symbol, ticker.as_deref(), ctx.ledger()),
        Line::from(SEPARATOR),
    ];
    lines.extend(form_lines(ctx.nav().edit_form()));
    frame.render_widget(Paragraph::new(lines), area);
    let title = title_row(frame, "                             ★ EDIT ORDER ★", ctx, area);
    frame.render_widget(Paragraph::new(title), Rect::new(area.x, area.y, area.width / 2, 1));
}

fn draw_fullscreen(frame: &mut Frame, ctx: &mut AppContext, area: Rect) {
    let Some(symbol) = ctx.active_symbol().map(str::to_string) else {
        return;
    };
    let (plot_h, plot_w) = fullscreen_chart_size(area.height + 1, area.width);
    let chart = ctx.chart_rows(ChartMode::Fullscreen, plot_h, plot_w);

    let rows = vec![
        Line::styled(
            format!("★ Full Screen Chart: {symbol} (press q to return)"),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::from("-".repeat((area.width as usize).saturating_sub(1).max(2))),
    ];
    let header_rows = rows.len() as u16;
    frame.render_widget(Paragraph::new(rows), area);

    let left = area.width.saturating_sub(plot_w as u16) / 2;
    let chart_area = Rect::new(
        area.x + left,
        area.y + header_rows.min(area.height),
        area.width.saturating_sub(left),
        area.height.saturating_sub(header_rows),
    );
    let lines: Vec<Line> = chart.into_iter().map(Line::from).collect();
    frame.render_widget(Paragraph::new(lines), chart_area);
}
