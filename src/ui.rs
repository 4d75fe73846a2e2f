// Terminal document board (ratatui)
//
// Keys:
//   h/l ←/→ column   j/k ↑/↓ card   Space/Enter pick up / drop
//   u drop on Unassigned   Esc cancel drag / close dialog
//   a add stage   d delete stage   H history   r refresh   q quit

use anyhow::Result;
use case_docket::board::{history_view, Board, DragState, DropTarget};
use case_docket::changes::Subscription;
use case_docket::entities::case::Case;
use case_docket::entities::document::StageTarget;
use case_docket::service::DocketService;
use case_docket::session::Session;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Board,
    AddStage(String),
    ConfirmDelete { stage_id: String, name: String },
    History(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub error: bool,
}

pub struct App {
    service: DocketService,
    session: Session,
    case: Case,
    subscription: Subscription,
    pub board: Board,
    pub drag: DragState,
    pub mode: Mode,
    pub column: usize,
    pub row: usize,
    pub notice: Option<Notice>,
    pub should_quit: bool,
}

impl App {
    pub fn new(service: DocketService, session: Session, case_id: &str) -> Result<Self> {
        let case = service.get_case(case_id)?;
        let subscription = service.changes().subscribe();
        let board = service.board(case_id)?;

        Ok(Self {
            service,
            session,
            case,
            subscription,
            board,
            drag: DragState::default(),
            mode: Mode::Board,
            column: 0,
            row: 0,
            notice: None,
            should_quit: false,
        })
    }

    /// Refetch when the change feed says the board is stale
    pub fn sync(&mut self) {
        if self.subscription.drain().affects_board(&self.case.id) {
            self.reload();
        }
    }

    pub fn reload(&mut self) {
        match self.service.board(&self.case.id) {
            Ok(mut board) => {
                board.mark_dragging(&self.drag);
                self.board = board;
                self.clamp_cursor();
            }
            Err(e) => self.fail("Failed to load documents", e),
        }
    }

    fn clamp_cursor(&mut self) {
        let columns = self.board.columns.len();
        self.column = self.column.min(columns.saturating_sub(1));
        let cards = self
            .board
            .columns
            .get(self.column)
            .map_or(0, |c| c.cards.len());
        self.row = self.row.min(cards.saturating_sub(1));
    }

    fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            error: false,
        });
    }

    fn fail(&mut self, what: &str, err: impl std::fmt::Display) {
        tracing::warn!(error = %err, "{}", what);
        self.notice = Some(Notice {
            text: format!("{}: {}", what, err),
            error: true,
        });
    }

    pub fn selected_document(&self) -> Option<&str> {
        self.board
            .columns
            .get(self.column)
            .and_then(|c| c.cards.get(self.row))
            .map(|card| card.document_id.as_str())
    }

    fn next_column(&mut self) {
        if self.column + 1 < self.board.columns.len() {
            self.column += 1;
        }
        self.clamp_cursor();
    }

    fn previous_column(&mut self) {
        self.column = self.column.saturating_sub(1);
        self.clamp_cursor();
    }

    fn next_card(&mut self) {
        self.row += 1;
        self.clamp_cursor();
    }

    fn previous_card(&mut self) {
        self.row = self.row.saturating_sub(1);
    }

    // ------------------------------------------------------------------------
    // Drag & drop
    // ------------------------------------------------------------------------

    fn pick_up(&mut self) {
        let Some(document_id) = self.selected_document().map(str::to_string) else {
            return;
        };
        match self.drag.begin(&self.board, &document_id) {
            Ok(()) => {
                self.board.mark_dragging(&self.drag);
                self.info("Dragging: choose a column and press Space");
            }
            Err(e) => self.fail("Cannot drag", e),
        }
    }

    fn drop_on(&mut self, target: DropTarget) {
        let request = self.drag.drop_on(&self.board, target);
        self.board.mark_dragging(&self.drag);

        let Some(request) = request else {
            self.notice = None;
            return;
        };

        match self.service.move_document(&self.session, &request) {
            Ok(outcome) => {
                self.info(format!(
                    "Moved \"{}\" to {}",
                    outcome.document.name,
                    outcome.record.label()
                ));
                self.sync();
                if let Some((column, row)) = self.board.locate(&request.document_id) {
                    self.column = column;
                    self.row = row;
                }
            }
            Err(e) => self.fail("Failed to move document", e),
        }
    }

    fn drop_on_cursor(&mut self) {
        let target = self
            .board
            .columns
            .get(self.column)
            .map(|c| DropTarget::Column(c.key()))
            .unwrap_or(DropTarget::Outside);
        self.drop_on(target);
    }

    // ------------------------------------------------------------------------
    // Stage management
    // ------------------------------------------------------------------------

    fn submit_stage(&mut self, name: String) {
        match self.service.add_stage(&self.session, &name) {
            Ok(stage) => {
                self.mode = Mode::Board;
                self.info(format!("Stage \"{}\" added", stage.name));
                self.sync();
            }
            Err(e) => self.fail("Failed to add stage", e),
        }
    }

    fn request_delete(&mut self) {
        let Some(column) = self.board.columns.get(self.column) else {
            return;
        };
        match (column.stage_id.clone(), column.title.clone()) {
            (Some(stage_id), name) => self.mode = Mode::ConfirmDelete { stage_id, name },
            (None, _) => self.info("The Unassigned column cannot be deleted"),
        }
    }

    fn confirm_delete(&mut self, stage_id: &str) {
        self.mode = Mode::Board;
        match self.service.delete_stage(&self.session, stage_id) {
            Ok(removal) => {
                self.info(format!(
                    "Stage \"{}\" deleted, {} document(s) unassigned",
                    removal.stage.name, removal.orphaned
                ));
                self.sync();
            }
            Err(e) => self.fail("Failed to delete stage", e),
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        match self.mode.clone() {
            Mode::Board => self.handle_board_key(key.code),
            Mode::AddStage(mut input) => match key.code {
                KeyCode::Esc => self.mode = Mode::Board,
                KeyCode::Enter => self.submit_stage(input),
                KeyCode::Backspace => {
                    input.pop();
                    self.mode = Mode::AddStage(input);
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.mode = Mode::AddStage(input);
                }
                _ => {}
            },
            Mode::ConfirmDelete { stage_id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.confirm_delete(&stage_id),
                KeyCode::Char('n') | KeyCode::Esc => self.mode = Mode::Board,
                _ => {}
            },
            Mode::History(_) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                    self.mode = Mode::Board;
                }
            }
        }
    }

    fn handle_board_key(&mut self, code: KeyCode) {
        let dragging = !self.drag.is_idle();
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc if dragging => self.drop_on(DropTarget::Outside),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Left | KeyCode::Char('h') => self.previous_column(),
            KeyCode::Right | KeyCode::Char('l') => self.next_column(),
            KeyCode::Down | KeyCode::Char('j') if !dragging => self.next_card(),
            KeyCode::Up | KeyCode::Char('k') if !dragging => self.previous_card(),
            KeyCode::Char(' ') | KeyCode::Enter if dragging => self.drop_on_cursor(),
            KeyCode::Char(' ') | KeyCode::Enter => self.pick_up(),
            KeyCode::Char('u') if dragging => {
                self.drop_on(DropTarget::Column(StageTarget::Unassigned))
            }
            KeyCode::Char('a') if !dragging => self.mode = Mode::AddStage(String::new()),
            KeyCode::Char('d') if !dragging => self.request_delete(),
            KeyCode::Char('H') => {
                if let Some(id) = self.selected_document() {
                    self.mode = Mode::History(id.to_string());
                }
            }
            KeyCode::Char('r') => {
                self.reload();
                self.info("Refreshed");
            }
            _ => {}
        }
    }
}

// ============================================================================
// Terminal loop
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
        app.sync();
    }
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Case header
            Constraint::Min(0),    // Columns
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_columns(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);

    match &app.mode {
        Mode::Board => {}
        Mode::AddStage(input) => render_add_stage(f, input),
        Mode::ConfirmDelete { name, .. } => render_confirm_delete(f, name),
        Mode::History(document_id) => render_history(f, app, document_id),
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        app.case.title.clone(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(number) = &app.case.case_number {
        spans.push(Span::raw(format!("  #{}", number)));
    }
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Documents: {}", app.board.total_cards()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(header, area);
}

fn render_columns(f: &mut Frame, area: Rect, app: &App) {
    if app.board.columns.is_empty() {
        let empty = Paragraph::new("No stages yet. Press 'a' to add one.")
            .block(Block::default().borders(Borders::ALL).title(" Board "));
        f.render_widget(empty, area);
        return;
    }

    let count = app.board.columns.len() as u32;
    let constraints: Vec<Constraint> = (0..count).map(|_| Constraint::Ratio(1, count)).collect();
    let slots = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let dragging = !app.drag.is_idle();

    for (ci, column) in app.board.columns.iter().enumerate() {
        let focused = ci == app.column;
        let border = match (focused, dragging) {
            (true, true) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            (true, false) => Style::default().fg(Color::Cyan),
            _ => Style::default().fg(Color::DarkGray),
        };

        let mut lines = Vec::new();
        for (ri, card) in column.cards.iter().enumerate() {
            let mut style = Style::default().fg(Color::White);
            if card.dragging {
                style = style.add_modifier(Modifier::DIM);
            } else if focused && !dragging && ri == app.row {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            lines.push(Line::from(Span::styled(format!("▪ {}", card.name), style)));

            let meta = format!(
                "  {}  {}",
                card.type_name.as_deref().unwrap_or("-"),
                card.updated_at.format("%Y-%m-%d")
            );
            lines.push(Line::from(Span::styled(meta, Style::default().fg(Color::DarkGray))));
        }

        let title_style = if column.is_unassigned() {
            Style::default().fg(Color::Magenta)
        } else {
            Style::default().fg(Color::Green)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Line::from(vec![
                Span::styled(format!(" {} ", column.title), title_style),
                Span::raw(format!("({}) ", column.count)),
            ]));

        f.render_widget(Paragraph::new(lines).block(block), slots[ci]);
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    if let Some(notice) = &app.notice {
        let color = if notice.error { Color::Red } else { Color::Green };
        spans.push(Span::styled(format!(" {} ", notice.text), Style::default().fg(color)));
        spans.push(Span::raw(" | "));
    }

    let keys: &[(&str, &str)] = if app.drag.is_idle() {
        &[("Space", "Pick up"), ("a", "Add stage"), ("d", "Delete stage"), ("H", "History"), ("q", "Quit")]
    } else {
        &[("←/→", "Target"), ("Space", "Drop"), ("u", "Unassign"), ("Esc", "Cancel")]
    };
    for (i, (key, label)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" | "));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}", label)));
    }

    let status_bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}

/// Centered rect `width_pct` percent wide, computed in u32
fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_pct.min(100)) / 100) as u16;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height: height.min(area.height),
    }
}

fn popup(f: &mut Frame, width_pct: u16, height: u16, title: &str) -> Rect {
    let rect = centered(f.size(), width_pct, height);
    f.render_widget(Clear, rect);
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" {} ", title)),
        rect,
    );
    Rect {
        x: rect.x + 1,
        y: rect.y + 1,
        width: rect.width.saturating_sub(2),
        height: rect.height.saturating_sub(2),
    }
}

fn render_add_stage(f: &mut Frame, input: &str) {
    let inner = popup(f, 50, 5, "Add Stage");
    let text = vec![
        Line::from(format!("Name: {}_", input)),
        Line::from(Span::styled(
            "Enter to save, Esc to cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Paragraph::new(text), inner);
}

fn render_confirm_delete(f: &mut Frame, name: &str) {
    let inner = popup(f, 60, 6, "Delete Stage");
    let text = vec![
        Line::from(format!("Delete stage \"{}\"?", name)),
        Line::from("Its documents become unassigned. History is kept."),
        Line::from(Span::styled("y / n", Style::default().fg(Color::Yellow))),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
}

fn render_history(f: &mut Frame, app: &App, document_id: &str) {
    let document = app.service.get_document(document_id);
    let title = match &document {
        Ok(doc) => format!("Movement History: {}", doc.name),
        Err(_) => "Movement History".to_string(),
    };
    let inner = popup(f, 70, 16, &title);

    let lines: Vec<Line> = match document {
        Ok(doc) => history_view(&doc)
            .into_iter()
            .flat_map(|entry| {
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        format!("{:<20}", entry.label),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(entry.date.format("%Y-%m-%d %H:%M").to_string()),
                ])];
                if let Some(notes) = entry.notes {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", notes),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                lines
            })
            .collect(),
        Err(e) => vec![Line::from(Span::styled(
            format!("Failed to load history: {}", e),
            Style::default().fg(Color::Red),
        ))],
    };
    f.render_widget(Paragraph::new(lines), inner);
}

// ============================================================================
// TESTS
// ============================================================================
