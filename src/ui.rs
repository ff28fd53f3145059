use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, BorderType, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, Screen};
use crate::config::ListView;
use crate::error::RemoteFetchError;
use crate::pagination::{Paginator, PageToken};
use crate::theme::ColorScheme;
use crate::types::CatalogItemSummary;
use crate::util_text::{format_categories, format_height, format_weight, title_case, truncate};

// ===============================
// Top-level draw
// ===============================
pub fn draw(f: &mut Frame, app: &mut App, colors: &ColorScheme) {
    app.tick_spinner();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    header(f, chunks[0], app, colors);
    match app.screen() {
        Screen::List => match app.view() {
            ListView::Pagination => pagination_body(f, chunks[1], app, colors),
            ListView::LoadMore => load_more_body(f, chunks[1], app, colors),
        },
        Screen::Detail => detail_body(f, chunks[1], app, colors),
    }
    footer(f, chunks[2], app, colors);
}

// ===============================
// Header / Footer
// ===============================
fn header(f: &mut Frame, area: Rect, app: &App, colors: &ColorScheme) {
    let mut spans = vec![Span::styled(
        " dexview ",
        Style::default().fg(colors.accent).add_modifier(Modifier::BOLD),
    )];
    for (view, title) in [(ListView::Pagination, "Pagination"), (ListView::LoadMore, "Load More")] {
        let style = if app.view() == view && app.screen() == Screen::List {
            Style::default()
                .fg(colors.selection_fg)
                .bg(colors.selection_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.text_dim)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {title} "), style));
    }
    spans.push(Span::styled(
        format!("  {}", app.route().path()),
        Style::default().fg(colors.text_dim),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn footer(f: &mut Frame, area: Rect, app: &App, colors: &ColorScheme) {
    let line = if let Some(msg) = app.toast_message() {
        Line::from(Span::styled(format!(" {msg}"), Style::default().fg(colors.loading)))
    } else {
        let hints = match (app.screen(), app.view()) {
            (Screen::Detail, _) => " Esc back  r retry  R reload  q quit",
            (Screen::List, ListView::Pagination) => {
                " ↑↓ select  Enter open  ←→ page  Home/End first/last  Tab view  r retry  q quit"
            }
            (Screen::List, ListView::LoadMore) => {
                " ↑↓ select  Enter open  PgDn scroll  Tab view  r retry  R reload  q quit"
            }
        };
        Line::from(Span::styled(hints, Style::default().fg(colors.text_dim)))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn framed<'a>(title: impl Into<Line<'a>>, colors: &ColorScheme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(colors.border))
        .title(title)
}

// ===============================
// List screens
// ===============================
fn item_rows<'a>(items: &'a [CatalogItemSummary], width: u16, colors: &ColorScheme) -> Vec<ListItem<'a>> {
    let name_width = (width as usize).saturating_sub(12).max(4);
    items
        .iter()
        .map(|it| {
            let id = it.id().unwrap_or("?");
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{id:<6}"), Style::default().fg(colors.text_dim)),
                Span::styled(truncate(&title_case(&it.name), name_width), Style::default().fg(colors.text)),
            ]))
        })
        .collect()
}

fn item_list(f: &mut Frame, area: Rect, app: &mut App, title: String, colors: &ColorScheme) {
    app.set_list_viewport_rows(area.height.saturating_sub(2));
    let sel = app.selection();
    let rows = item_rows(app.list_items(), area.width, colors);
    let has_rows = !rows.is_empty();
    let list = List::new(rows)
        .block(framed(title, colors))
        .highlight_style(
            Style::default()
                .fg(colors.selection_fg)
                .bg(colors.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    if has_rows {
        state.select(Some(sel));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn error_panel(f: &mut Frame, area: Rect, err: &RemoteFetchError, colors: &ColorScheme) {
    let text = vec![
        Line::from(Span::styled(
            err.message.clone(),
            Style::default().fg(colors.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("press r to retry", Style::default().fg(colors.text_dim))),
    ];
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(framed(" Error ", colors));
    f.render_widget(p, area);
}

fn loading_panel(f: &mut Frame, area: Rect, app: &App, label: &str, colors: &ColorScheme) {
    let text = Line::from(Span::styled(
        format!("{} {label}", app.spinner_frame()),
        Style::default().fg(colors.loading),
    ));
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(framed("", colors));
    f.render_widget(p, area);
}

fn pagination_body(f: &mut Frame, area: Rect, app: &mut App, colors: &ColorScheme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let page = app.page().clone();
    if let Some(err) = &page.error {
        error_panel(f, chunks[0], err, colors);
    } else if page.loading && page.data.is_none() {
        loading_panel(f, chunks[0], app, "Loading…", colors);
    } else {
        let title = format!(" Page {} ", app.paginator().page());
        item_list(f, chunks[0], app, title, colors);
    }

    let bar = Paragraph::new(page_bar_line(app.paginator(), colors)).alignment(Alignment::Center);
    f.render_widget(bar, chunks[1]);
    let status = Paragraph::new(Line::from(Span::styled(
        app.paginator().status_line(),
        Style::default().fg(colors.accent),
    )))
    .alignment(Alignment::Center);
    f.render_widget(status, chunks[2]);
}

/// `« First ‹ Prev 1 … 29 [30] 31 … 66 Next › Last »`
pub fn page_bar_line(p: &Paginator, colors: &ColorScheme) -> Line<'static> {
    let controls = p.controls();
    let nav = |label: &'static str, enabled: bool| {
        let style = if enabled {
            Style::default().fg(colors.text)
        } else {
            Style::default().fg(colors.text_dim).add_modifier(Modifier::DIM)
        };
        Span::styled(label, style)
    };

    let mut spans = vec![nav("« First", controls.first), Span::raw(" "), nav("‹ Prev", controls.previous)];
    for token in p.window() {
        spans.push(Span::raw(" "));
        spans.push(match token {
            PageToken::Page(n) if n == p.page() => Span::styled(
                format!("[{n}]"),
                Style::default().fg(colors.accent).add_modifier(Modifier::BOLD),
            ),
            PageToken::Page(n) => Span::styled(n.to_string(), Style::default().fg(colors.text)),
            PageToken::Ellipsis => Span::styled("…", Style::default().fg(colors.text_dim)),
        });
    }
    spans.push(Span::raw(" "));
    spans.push(nav("Next ›", controls.next));
    spans.push(Span::raw(" "));
    spans.push(nav("Last »", controls.last));
    Line::from(spans)
}

fn load_more_body(f: &mut Frame, area: Rect, app: &mut App, colors: &ColorScheme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let feed = app.feed();
    let empty = feed.items.is_empty();
    if empty && feed.fetching {
        loading_panel(f, chunks[0], app, "Loading…", colors);
    } else if empty && feed.error.is_some() {
        if let Some(err) = app.feed().error.clone() {
            error_panel(f, chunks[0], &err, colors);
        }
    } else {
        let title = format!(" {} loaded ", app.feed().items.len());
        item_list(f, chunks[0], app, title, colors);
    }

    let feed = app.feed();
    let status = if feed.fetching && !feed.items.is_empty() {
        Span::styled(
            format!("{} Fetching more…", app.spinner_frame()),
            Style::default().fg(colors.loading),
        )
    } else if let Some(err) = feed.error.as_ref().filter(|_| !feed.items.is_empty()) {
        Span::styled(
            format!("{}  (press r to retry)", err.message),
            Style::default().fg(colors.error),
        )
    } else if feed.exhausted {
        Span::styled(
            format!("All {} loaded", feed.items.len()),
            Style::default().fg(colors.text_dim),
        )
    } else {
        Span::raw("")
    };
    f.render_widget(Paragraph::new(Line::from(status)).alignment(Alignment::Center), chunks[1]);
}

// ===============================
// Detail screen
// ===============================
fn detail_body(f: &mut Frame, area: Rect, app: &App, colors: &ColorScheme) {
    let detail = app.detail();
    if let Some(err) = &detail.error {
        error_panel(f, area, err, colors);
        return;
    }
    let Some(d) = &detail.data else {
        loading_panel(f, area, app, "Loading details…", colors);
        return;
    };

    let label = |s: &'static str| Span::styled(s, Style::default().fg(colors.text_dim));
    let value = |s: String| Span::styled(s, Style::default().fg(colors.text));
    let lines = vec![
        Line::from(vec![label("ID:      "), value(d.identifier.to_string())]),
        Line::from(vec![label("Height:  "), value(format_height(d.height))]),
        Line::from(vec![label("Weight:  "), value(format_weight(d.weight))]),
        Line::from(vec![label("Types:   "), value(format_categories(&d.categories))]),
        Line::from(vec![label("Image:   "), value(d.image_locator.clone())]),
    ];
    let title = Line::from(Span::styled(
        format!(" {} ", title_case(&d.name)),
        Style::default().fg(colors.accent).add_modifier(Modifier::BOLD),
    ));
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(framed(title, colors));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppEvent, CatalogItemDetail, CatalogPage};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        let colors = ColorScheme::default();
        terminal.draw(|f| draw(f, app, &colors)).unwrap();
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn page_bar_marks_current_page() {
        let mut p = Paginator::new(20);
        p.set_item_count(1302);
        p.goto(30);
        let text = line_text(&page_bar_line(&p, &ColorScheme::default()));
        assert_eq!(text, "« First ‹ Prev 1 … 29 [30] 31 … 66 Next › Last »");
    }

    #[test]
    fn renders_page_items_and_status() {
        let mut app = App::new(30, 20, ListView::Pagination, None);
        app.on_event(AppEvent::PageLoaded {
            page: 1,
            result: Ok(Arc::new(CatalogPage {
                total_count: 1302,
                next_cursor: None,
                previous_cursor: None,
                items: vec![CatalogItemSummary {
                    name: "bulbasaur".into(),
                    detail_reference: "https://pokeapi.co/api/v2/pokemon/1/".into(),
                }],
            })),
        });
        let screen = render(&mut app);
        assert!(screen.contains("Bulbasaur"));
        assert!(screen.contains("#1"));
        assert!(screen.contains("Page 1 of 66 (20 On Each Page)"));
    }

    #[test]
    fn renders_detail_error_with_retry_hint() {
        let mut app = App::new(30, 20, ListView::Pagination, None);
        app.open_detail("0".into());
        app.on_event(AppEvent::DetailLoaded {
            id: "0".into(),
            result: Err(RemoteFetchError::item_not_found("0")),
        });
        let screen = render(&mut app);
        assert!(screen.contains("item 0 not found"));
        assert!(screen.contains("press r to retry"));
    }

    #[test]
    fn renders_detail_fields() {
        let mut app = App::new(30, 20, ListView::Pagination, None);
        app.open_detail("25".into());
        app.on_event(AppEvent::DetailLoaded {
            id: "25".into(),
            result: Ok(Arc::new(CatalogItemDetail {
                identifier: 25,
                name: "pikachu".into(),
                height: 4,
                weight: 60,
                categories: vec!["electric".into()],
                image_locator: "https://img.example/25.png".into(),
            })),
        });
        let screen = render(&mut app);
        assert!(screen.contains("Pikachu"));
        assert!(screen.contains("0.40 m"));
        assert!(screen.contains("6.00 kg"));
        assert!(screen.contains("Electric"));
        assert!(screen.contains("/pokemon/25"));
    }
}
