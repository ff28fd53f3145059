// Native binary for dexview - terminal UI mode

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use dexview::{
    app::{App, Screen},
    config::{load, ListView},
    fetch::{run_fetch_worker, spawn_feed, Connectivity, FetchRequest},
    router,
    theme::ColorScheme,
    types::AppEvent,
    ui, HttpCatalogClient, QueryClient,
};

fn init_logging(path: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {path}"))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// The running infinite feed; replaced on full reload.
struct FeedHandle {
    client: QueryClient,
    connectivity: Connectivity,
    event_tx: UnboundedSender<AppEvent>,
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    fn respawn(&mut self, app: &mut App) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.epoch += 1;
        let (signal, task) = spawn_feed(
            self.client.clone(),
            self.connectivity.clone(),
            self.epoch,
            self.event_tx.clone(),
        );
        self.task = Some(task);
        app.attach_feed(self.epoch, signal);
        log::info!("[main] feed epoch {}", self.epoch);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    let cfg = load().context("Failed to load configuration")?;
    init_logging(&cfg.log_file)?;
    cfg.log_summary();
    let colors = cfg.theme.colors();

    let api = Arc::new(HttpCatalogClient::new(cfg.api_url.clone(), cfg.sprite_url.clone()));
    let client = QueryClient::new(api, cfg.page_limit, cfg.query_options());

    // channels
    let (event_tx, event_rx) = unbounded_channel::<AppEvent>();
    let (fetch_tx, fetch_rx) = unbounded_channel::<FetchRequest>();
    let connectivity = Connectivity::default();
    let worker: JoinHandle<Result<()>> = tokio::spawn(run_fetch_worker(
        client.clone(),
        connectivity.clone(),
        fetch_rx,
        event_tx.clone(),
    ));

    let mut app = App::new(cfg.render_fps, cfg.page_limit, cfg.view, Some(fetch_tx));
    let mut feed = FeedHandle {
        client: client.clone(),
        connectivity,
        event_tx,
        epoch: 0,
        task: None,
    };
    feed.respawn(&mut app);

    // Apply route from CLI args (if provided)
    // Example: ./dexview /pokemon/25
    if let Some(raw) = &cfg.route {
        match router::parse(raw) {
            Some(route) => {
                app.apply_route(&route);
                log::info!("Applied route from CLI: {raw}");
            }
            None => app.show_toast(format!("Unknown route: {raw}")),
        }
    }
    app.start();

    // terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_loop(&mut app, &mut terminal, event_rx, &mut feed, &colors).await;

    // cleanup
    worker.abort();
    if let Some(task) = feed.task.take() {
        task.abort();
    }
    client.clear();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut rx: UnboundedReceiver<AppEvent>,
    feed: &mut FeedHandle,
    colors: &ColorScheme,
) -> Result<()> {
    let mut last_frame = Instant::now();

    loop {
        // frame budget (coalesced renders)
        let frame_ms = 1000u32.saturating_div(app.fps()) as u64;
        let budget = Duration::from_millis(frame_ms.max(1));
        let wait = budget.saturating_sub(last_frame.elapsed());

        if event::poll(wait)? {
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    handle_key(app, k);
                }
            }
        }
        while let Ok(ev) = rx.try_recv() {
            app.on_event(ev);
        }
        if app.take_reload() {
            feed.client.clear();
            feed.respawn(app);
            app.finish_reload();
        }

        if last_frame.elapsed() >= budget {
            terminal.draw(|f| ui::draw(f, app, colors))?;
            last_frame = Instant::now();
        }
        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, k: KeyEvent) {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (k.code, k.modifiers) {
        app.quit();
        return;
    }

    let paginated = app.screen() == Screen::List && app.view() == ListView::Pagination;
    match k.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc | KeyCode::Backspace => {
            if app.screen() == Screen::Detail {
                app.back_to_list();
            }
        }
        KeyCode::Tab => app.toggle_view(),
        KeyCode::Up | KeyCode::Char('k') => app.up(),
        KeyCode::Down | KeyCode::Char('j') => app.down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::Enter => {
            if app.screen() == Screen::List {
                app.open_selected();
            }
        }
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('[') if paginated => app.previous_page(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(']') if paginated => app.next_page(),
        KeyCode::Home | KeyCode::Char('g') if paginated => app.first_page(),
        KeyCode::End | KeyCode::Char('G') if paginated => app.last_page(),
        KeyCode::Char('r') => app.retry(),
        KeyCode::Char('R') => app.reload(),
        _ => {}
    }
}
