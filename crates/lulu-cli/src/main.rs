use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use lulu_config::Config;
use lulu_engine::editing::{
    Cmd, Document, Palette, Session, StoreSettings, SuggestionId, SuggestionSource,
    SuggestionState, format_decorations,
};
use lulu_engine::{SuggestionError, parse_batch};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{
    env,
    fs::{self, File},
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};

enum Mode {
    Normal,
    /// Writing a revision for the selected suggestion
    Revise(String),
    /// Writing text to insert at the cursor
    Insert(String),
}

struct App {
    manuscript_path: PathBuf,
    session: Session,
    list_state: ListState,
    mode: Mode,
    status: String,
}

impl App {
    fn new(manuscript_path: PathBuf, session: Session) -> Self {
        let mut app = Self {
            manuscript_path,
            session,
            list_state: ListState::default(),
            mode: Mode::Normal,
            status: String::new(),
        };
        app.clamp_selection();
        app
    }

    fn text(&self) -> String {
        self.session.document().text()
    }

    fn cursor(&self) -> usize {
        self.session.document().selection().start
    }

    fn set_cursor(&mut self, at: usize) {
        self.session.set_selection(at..at);
    }

    fn selected_id(&self) -> Option<SuggestionId> {
        let index = self.list_state.selected()?;
        self.session
            .store()
            .suggestions()
            .get(index)
            .map(|suggestion| suggestion.id)
    }

    fn clamp_selection(&mut self) {
        let count = self.session.store().suggestions().len();
        let selected = match self.list_state.selected() {
            _ if count == 0 => None,
            Some(i) => Some(i.min(count - 1)),
            None => Some(0),
        };
        self.list_state.select(selected);
    }

    fn next_suggestion(&mut self) {
        let count = self.session.store().suggestions().len();
        if count == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % count,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_suggestion(&mut self) {
        let count = self.session.store().suggestions().len();
        if count == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => count - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Select the suggestion highlighted under the cursor
    fn select_at_cursor(&mut self) {
        let Some(id) = self.session.suggestion_at(self.cursor()).map(|s| s.id) else {
            self.status = "No suggestion under the cursor".to_string();
            return;
        };
        let index = self
            .session
            .store()
            .suggestions()
            .iter()
            .position(|suggestion| suggestion.id == id);
        self.list_state.select(index);
    }

    fn accept_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            let result = self.session.accept(id).map(|_| ());
            self.report(result, "Accepted");
        }
    }

    fn reject_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            let result = self.session.reject(id).map(|_| ());
            self.report(result, "Rejected");
        }
    }

    fn dismiss_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.session.remove_suggestion(id);
            self.report(Ok(()), "Removed");
        }
    }

    fn start_revision(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if let Some(suggestion) = self.session.store().get(id) {
            self.mode = Mode::Revise(suggestion.replacement_text.clone());
        }
    }

    fn finish_prompt(&mut self) {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => {}
            Mode::Revise(text) => {
                if let Some(id) = self.selected_id() {
                    let result = self.session.revise(id, text).map(|_| ());
                    self.report(result, "Revised");
                }
            }
            Mode::Insert(text) if text.is_empty() => {}
            Mode::Insert(text) => {
                let at = self.cursor();
                let result = self.session.edit(Cmd::InsertText { at, text }).map(|_| ());
                self.report(result, "Inserted");
            }
        }
    }

    fn delete_at_cursor(&mut self) {
        let text = self.text();
        let at = self.cursor();
        let Some(ch) = text.get(at..).and_then(|rest| rest.chars().next()) else {
            return;
        };
        let result = self
            .session
            .edit(Cmd::DeleteRange {
                range: at..at + ch.len_utf8(),
            })
            .map(|_| ());
        self.report(result, "Deleted");
    }

    fn move_left(&mut self) {
        let text = self.text();
        let at = self.cursor();
        if let Some(ch) = text.get(..at).and_then(|head| head.chars().next_back()) {
            self.set_cursor(at - ch.len_utf8());
        }
    }

    fn move_right(&mut self) {
        let text = self.text();
        let at = self.cursor();
        if let Some(ch) = text.get(at..).and_then(|rest| rest.chars().next()) {
            self.set_cursor(at + ch.len_utf8());
        }
    }

    fn move_up(&mut self) {
        let text = self.text();
        let at = self.cursor();
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        if line_start == 0 {
            return;
        }
        let previous_start = text[..line_start - 1].rfind('\n').map_or(0, |i| i + 1);
        let target = (previous_start + (at - line_start)).min(line_start - 1);
        self.set_cursor(floor_char_boundary(&text, target));
    }

    fn move_down(&mut self) {
        let text = self.text();
        let at = self.cursor();
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        let Some(newline) = text[at..].find('\n') else {
            return;
        };
        let next_start = at + newline + 1;
        let next_end = text[next_start..]
            .find('\n')
            .map_or(text.len(), |i| next_start + i);
        let target = (next_start + (at - line_start)).min(next_end);
        self.set_cursor(floor_char_boundary(&text, target));
    }

    fn save(&mut self) {
        let result = fs::write(&self.manuscript_path, self.session.document().to_bytes());
        self.status = match result {
            Ok(()) => format!("Saved {}", self.manuscript_path.display()),
            Err(e) => format!("Failed to save: {e}"),
        };
    }

    fn report(&mut self, result: lulu_engine::Result<()>, done: &str) {
        self.status = match result {
            Ok(()) => done.to_string(),
            Err(SuggestionError::OrphanedSuggestion(_)) => {
                "This suggestion no longer applies. Press d to remove it.".to_string()
            }
            Err(e) => e.to_string(),
        };
        log::debug!(
            "decorations:\n{}",
            format_decorations(self.session.decorations(), &self.text())
        );
        for event in self.session.drain_events() {
            log::info!(
                "suggestion {} {:?} ({}) at sequence {}",
                event.id,
                event.state,
                event.edit_type.name(),
                event.seq
            );
        }
        self.clamp_selection();
    }

    fn document_lines(&self) -> Vec<Line<'static>> {
        let text = self.text();
        let cursor = self.cursor();
        let selected = self.selected_id();

        let mut lines = Vec::new();
        let mut spans = Vec::new();
        let mut run = String::new();
        let mut run_style = Style::default();

        for (at, ch) in text.char_indices() {
            let style = self.style_at(at, cursor, selected);
            if style != run_style && !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
            }
            run_style = style;

            if ch == '\n' {
                if at == cursor {
                    run.push(' ');
                }
                if !run.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut run), run_style));
                }
                lines.push(Line::from(std::mem::take(&mut spans)));
            } else {
                run.push(ch);
            }
        }

        if !run.is_empty() {
            spans.push(Span::styled(run, run_style));
        }
        if cursor == text.len() {
            spans.push(Span::styled(
                " ",
                Style::default().add_modifier(Modifier::REVERSED),
            ));
        }
        lines.push(Line::from(spans));
        lines
    }

    fn style_at(&self, at: usize, cursor: usize, selected: Option<SuggestionId>) -> Style {
        let mut style = Style::default();
        if let Some(span) = self.session.decorations().span_at(at) {
            let color = span.color.parse::<Color>().unwrap_or(Color::Yellow);
            style = style.bg(color).fg(Color::Black);
            if Some(span.id) == selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
        }
        if at == cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        style
    }

    fn suggestion_items(&self) -> Vec<ListItem<'static>> {
        let decorations = self.session.decorations();
        self.session
            .store()
            .suggestions()
            .iter()
            .map(|suggestion| {
                let badge = decorations
                    .get(suggestion.id)
                    .map_or_else(|| "-".to_string(), |span| span.badge.to_string());
                let marker = match suggestion.state {
                    SuggestionState::Orphaned => " (no longer applies)",
                    _ => "",
                };
                let color = self
                    .session
                    .store()
                    .settings()
                    .palette
                    .color(suggestion.edit_type)
                    .parse::<Color>()
                    .unwrap_or(Color::Yellow);

                let mut lines = vec![
                    Line::from(vec![
                        Span::styled(format!("#{badge} "), Style::default().fg(color)),
                        Span::styled(
                            suggestion.edit_type.name().to_string(),
                            Style::default().fg(color),
                        ),
                        Span::raw(marker.to_string()),
                    ]),
                    Line::from(format!(
                        "  {} → {}",
                        suggestion.original_text, suggestion.replacement_text
                    )),
                ];
                if !suggestion.rationale.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", suggestion.rationale),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                ListItem::new(lines)
            })
            .collect()
    }
}

fn floor_char_boundary(text: &str, mut at: usize) -> usize {
    at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

fn init_logging(config: &Config) {
    // The terminal belongs to the UI, so log to a file next to the config
    let log_path = Config::config_path().with_file_name("lulu.log");
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    );
    if let Some(parent) = log_path.parent()
        && fs::create_dir_all(parent).is_ok()
        && let Ok(file) = File::create(&log_path)
    {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

fn load_session(
    config: &Config,
    manuscript_path: &Path,
    suggestions_path: Option<&Path>,
) -> Result<Session> {
    let bytes = fs::read(manuscript_path)
        .with_context(|| format!("Failed to read {}", manuscript_path.display()))?;
    let document = Document::from_bytes(&bytes)?;

    let palette = Palette::default().with_overrides(
        config
            .palette
            .iter()
            .map(|(label, color)| (label.as_str(), color.as_str())),
    );
    let settings = StoreSettings {
        palette,
        history_limit: config.history_limit,
    };
    let mut session = Session::new(document, settings);

    if let Some(path) = suggestions_path {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let payloads = parse_batch(&json)?;
        let ticket = session.begin_fetch(SuggestionSource::Edits);
        if let Some(summary) = session.complete_fetch(ticket, payloads) {
            log::info!(
                "loaded {} suggestions from {}",
                summary.added,
                path.display()
            );
        }
    }

    Ok(session)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    init_logging(&config);
    log::info!("lulu starting up");

    let (manuscript_path, suggestions_path) = match args.len() {
        2 | 3 => (PathBuf::from(&args[1]), args.get(2).map(PathBuf::from)),
        1 => match config.manuscript.clone() {
            Some(path) => (path, None),
            None => {
                eprintln!("Error: No manuscript provided and none configured");
                eprintln!("Usage: {} <manuscript> [suggestions.json]", args[0]);
                eprintln!("Or set `manuscript` in {}", config_path.display());
                process::exit(1);
            }
        },
        _ => {
            eprintln!("Usage: {} <manuscript> [suggestions.json]", args[0]);
            process::exit(1);
        }
    };

    let session = match load_session(&config, &manuscript_path, suggestions_path.as_deref()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(manuscript_path, session);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if matches!(app.mode, Mode::Normal) {
            app.status.clear();
        }

        match &mut app.mode {
            Mode::Revise(buffer) | Mode::Insert(buffer) => match key.code {
                KeyCode::Enter => app.finish_prompt(),
                KeyCode::Esc => app.mode = Mode::Normal,
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            },
            Mode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('j') => app.next_suggestion(),
                KeyCode::Char('k') => app.previous_suggestion(),
                KeyCode::Char('a') => app.accept_selected(),
                KeyCode::Char('r') => app.reject_selected(),
                KeyCode::Char('d') => app.dismiss_selected(),
                KeyCode::Char('e') => app.start_revision(),
                KeyCode::Char('i') => app.mode = Mode::Insert(String::new()),
                KeyCode::Char('x') => app.delete_at_cursor(),
                KeyCode::Char('s') => app.save(),
                KeyCode::Enter => app.select_at_cursor(),
                KeyCode::Left => app.move_left(),
                KeyCode::Right => app.move_right(),
                KeyCode::Up => app.move_up(),
                KeyCode::Down => app.move_down(),
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(rows[0]);

    // Manuscript panel
    let title = format!(
        "{} (v{})",
        app.manuscript_path.display(),
        app.session.document().version()
    );
    let manuscript = Paragraph::new(app.document_lines())
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(manuscript, chunks[0]);

    // Suggestion panel
    let pending = app.session.store().pending().count();
    let suggestions = List::new(app.suggestion_items())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Suggestions ({pending} pending)")),
        )
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(suggestions, chunks[1], &mut app.list_state);

    // Prompt, status or key help at the bottom
    let bottom = match &app.mode {
        Mode::Revise(buffer) => {
            Line::from(format!("Revise to: {buffer}▏ (Enter: apply | Esc: cancel)"))
        }
        Mode::Insert(buffer) => {
            Line::from(format!("Insert: {buffer}▏ (Enter: insert | Esc: cancel)"))
        }
        Mode::Normal if !app.status.is_empty() => Line::from(app.status.clone()),
        Mode::Normal => Line::from(vec![
            Span::raw("q: Quit | j/k: Select | "),
            Span::raw("a: Accept | r: Reject | e: Revise | d: Remove | "),
            Span::raw("i: Insert | x: Delete | Enter: Pick under cursor | s: Save"),
        ]),
    };
    let help = Paragraph::new(vec![bottom]).block(Block::default());
    f.render_widget(help, rows[1]);
}
