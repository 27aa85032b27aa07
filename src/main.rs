use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use stem_map::app::App;
use stem_map::config::{self, Args};
use stem_map::data::{self, outline};
use stem_map::query::CityAnchors;
use stem_map::submission::ContactSink;
use stem_map::ui;
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = config::init_logging(&args.log_file)?;

    // Fail before touching the terminal so the error stays readable
    let directory = data::load(&args.data).with_context(|| format!("loading {}", args.data.display()))?;
    info!(entries = directory.len(), "directory ready");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &args, directory);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn build_app(terminal: &DefaultTerminal, args: &Args, directory: data::Directory) -> Result<App> {
    let size = terminal.size()?;
    let anchors = CityAnchors::bolivia();
    let sink = args.submissions.as_ref().map(ContactSink::new);
    let mut app = App::new(directory, anchors, sink, args.rng(), size.width, size.height);

    if args.outline_dir.exists() {
        outline::load_outlines(&mut app.map_renderer, &args.outline_dir)?;
    }
    // Fall back to the built-in border if no outline files loaded
    if !app.map_renderer.has_data() {
        outline::builtin_outline(&mut app.map_renderer);
    }
    let anchors = app.anchors().clone();
    outline::add_anchor_places(&mut app.map_renderer, &anchors);

    app.on_filter_change(&args.field, &args.city);
    Ok(app)
}

/// Keys while the contact form is open
fn handle_form_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_form(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab | KeyCode::Down => {
            if let Some(form) = app.form_mut() {
                form.next_field();
            }
        }
        KeyCode::BackTab | KeyCode::Up => {
            if let Some(form) = app.form_mut() {
                form.prev_field();
            }
        }
        KeyCode::Backspace => {
            if let Some(form) = app.form_mut() {
                form.backspace();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(form) = app.form_mut() {
                form.push(c);
            }
        }
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.form().is_some() {
        handle_form_key(app, key);
        return;
    }
    app.clear_status();

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // Filters
        KeyCode::Char('f') => app.cycle_field(1),
        KeyCode::Char('F') => app.cycle_field(-1),
        KeyCode::Char('c') => app.cycle_city(1),
        KeyCode::Char('C') => app.cycle_city(-1),

        // Selection
        KeyCode::Tab => app.select_step(1),
        KeyCode::BackTab => app.select_step(-1),
        KeyCode::Enter | KeyCode::Char('o') => app.open_selected(webbrowser::open),
        KeyCode::Char('n') => app.open_form(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
        KeyCode::Char('d') | KeyCode::Char('D') => app.map_renderer.toggle_departments(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.map_renderer.toggle_places(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),

        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
        _ => {}
    }
}

/// Handle mouse events for picking, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.form().is_some() {
        return;
    }
    match mouse.kind {
        // Scroll wheel zooms towards the cursor
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click picks a marker; click and drag pans
        MouseEventKind::Down(MouseButton::Left) => {
            app.pick_at(mouse.column, mouse.row);
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, args: &Args, directory: data::Directory) -> Result<()> {
    let mut app = build_app(terminal, args, directory)?;

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("bye");
    Ok(())
}
