use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use meminsight::args::Args;
use meminsight::render::{self, Content, DatablockTable, PercentageBar, Screen, SHOW_ZERO_LABEL};
use meminsight::sort::{FileSortMode, SortField, TableKey};
use meminsight::{Action, ViewerState};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect as UiRect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, stdout};
use std::time::Duration;

const BAR_CELLS: usize = 10;
const COLUMN_GAP: usize = 2;
const CONTENT_INDENT: usize = 4;
const HELP_TEXT: &str = "Tab: focus  Enter: select/expand  Space: toggle  /: search  v: view  \
    0: Show 0B  o: file sort  t/n/s/p: table sort  q: quit";

#[derive(Parser, Debug)]
#[command(
    name = "meminsight-tui",
    version,
    about = "Terminal viewer for memory usage reports"
)]
struct Cli {
    #[command(flatten)]
    args: Args,

    #[arg(long, help = "Print the initial view to stdout and exit")]
    print: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    Tree,
    Content,
}

/// What a content line reacts to.
#[derive(Clone, Debug, Default)]
struct LineTarget {
    file_block: Option<String>,
    table: Option<TableKey>,
    /// Column spans of a header line, relative to the content area.
    headers: Vec<(u16, u16, SortField)>,
}

#[derive(Default, Clone, Copy)]
struct UiLayoutState {
    search_area: Option<UiRect>,
    tree_inner_area: Option<UiRect>,
    content_inner_area: Option<UiRect>,
}

struct App {
    state: ViewerState,
    screen: Screen,
    focus: Focus,
    tree_cursor: usize,
    tree_scroll: usize,
    content_cursor: usize,
    content_scroll: usize,
    content_targets: Vec<LineTarget>,
    input_mode: bool,
    query_input: String,
    ui_layout: UiLayoutState,
    should_quit: bool,
}

impl App {
    fn new(state: ViewerState) -> Self {
        let screen = render::build_screen(&state);
        let focus = if screen.tree.is_some() {
            Focus::Tree
        } else {
            Focus::Content
        };
        let query_input = state.query().to_string();

        let mut app = Self {
            state,
            screen,
            focus,
            tree_cursor: 0,
            tree_scroll: 0,
            content_cursor: 0,
            content_scroll: 0,
            content_targets: Vec::new(),
            input_mode: false,
            query_input,
            ui_layout: UiLayoutState::default(),
            should_quit: false,
        };
        app.content_targets = content_lines(&app.screen).into_iter().map(|(_, t)| t).collect();
        app
    }

    fn apply(&mut self, action: Action) {
        self.state.apply(action);
        self.screen = render::build_screen(&self.state);
        self.content_targets = content_lines(&self.screen).into_iter().map(|(_, t)| t).collect();

        let tree_len = self.screen.tree.as_ref().map(Vec::len).unwrap_or(0);
        self.tree_cursor = self.tree_cursor.min(tree_len.saturating_sub(1));
        self.content_cursor = self.content_cursor.min(self.content_targets.len().saturating_sub(1));
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        if self.input_mode {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.input_mode = false,
                KeyCode::Backspace => {
                    self.query_input.pop();
                    self.apply(Action::SetQuery(self.query_input.clone()));
                }
                KeyCode::Char(ch) => {
                    self.query_input.push(ch);
                    self.apply(Action::SetQuery(self.query_input.clone()));
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => self.input_mode = true,
            KeyCode::Tab => self.switch_focus(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-10),
            KeyCode::PageDown => self.move_cursor(10),
            KeyCode::Enter => self.activate(),
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => self.toggle_under_cursor(),
            KeyCode::Char('v') => self.apply(Action::SetViewMode(self.state.view_mode().next())),
            KeyCode::Char('0') => self.apply(Action::ToggleZeroSize),
            KeyCode::Char('o') => self.cycle_file_sort(),
            KeyCode::Char('t') => self.sort_table(SortField::Type),
            KeyCode::Char('n') => self.sort_table(SortField::Name),
            KeyCode::Char('s') => self.sort_table(SortField::Size),
            KeyCode::Char('p') => self.sort_table(SortField::Percentage),
            KeyCode::Esc => {
                if !self.query_input.is_empty() {
                    self.query_input.clear();
                    self.apply(Action::SetQuery(String::new()));
                }
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {}
            MouseEventKind::ScrollDown => {
                self.move_cursor(3);
                return;
            }
            MouseEventKind::ScrollUp => {
                self.move_cursor(-3);
                return;
            }
            _ => return,
        }

        let (x, y) = (event.column, event.row);

        if let Some(area) = self.ui_layout.search_area {
            if point_in_rect(area, x, y) {
                self.input_mode = true;
                return;
            }
        }

        if let Some(area) = self.ui_layout.tree_inner_area {
            if point_in_rect(area, x, y) {
                self.focus = Focus::Tree;
                let index = self.tree_scroll + (y - area.y) as usize;
                let Some(row) = self
                    .screen
                    .tree
                    .as_ref()
                    .and_then(|rows| rows.get(index))
                    .cloned()
                else {
                    return;
                };
                self.tree_cursor = index;

                // The "[+]" marker toggles, the label selects.
                let marker_start = area.x + (row.depth * 2) as u16;
                if row.is_folder && x >= marker_start && x < marker_start + 3 {
                    self.apply(Action::ToggleFolder(row.node));
                } else {
                    self.apply(Action::SelectNode(row.node));
                }
                return;
            }
        }

        if let Some(area) = self.ui_layout.content_inner_area {
            if point_in_rect(area, x, y) {
                self.focus = Focus::Content;
                let index = self.content_scroll + (y - area.y) as usize;
                let Some(target) = self.content_targets.get(index).cloned() else {
                    return;
                };
                self.content_cursor = index;

                let column = x - area.x;
                if let Some(table) = target.table.clone() {
                    if let Some(&(_, _, field)) = target
                        .headers
                        .iter()
                        .find(|(start, end, _)| column >= *start && column < *end)
                    {
                        self.apply(Action::ToggleTableSort(table, field));
                        return;
                    }
                }
                if let Some(file_id) = target.file_block {
                    self.apply(Action::ToggleFileBlock(file_id));
                }
            }
        }
    }

    fn switch_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Content,
            Focus::Content if self.screen.tree.is_some() => Focus::Tree,
            Focus::Content => Focus::Content,
        };
    }

    fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.focus {
            Focus::Tree => (
                &mut self.tree_cursor,
                self.screen.tree.as_ref().map(Vec::len).unwrap_or(0),
            ),
            Focus::Content => (&mut self.content_cursor, self.content_targets.len()),
        };
        let max = len.saturating_sub(1) as isize;
        *cursor = (*cursor as isize + delta).clamp(0, max) as usize;
    }

    fn tree_row_under_cursor(&self) -> Option<&render::TreeRow> {
        self.screen.tree.as_ref().and_then(|rows| rows.get(self.tree_cursor))
    }

    fn activate(&mut self) {
        match self.focus {
            Focus::Tree => {
                if let Some(node) = self.tree_row_under_cursor().map(|row| row.node) {
                    self.apply(Action::SelectNode(node));
                }
            }
            Focus::Content => self.toggle_under_cursor(),
        }
    }

    fn toggle_under_cursor(&mut self) {
        match self.focus {
            Focus::Tree => {
                let folder = self
                    .tree_row_under_cursor()
                    .filter(|row| row.is_folder)
                    .map(|row| row.node);
                if let Some(node) = folder {
                    self.apply(Action::ToggleFolder(node));
                }
            }
            Focus::Content => {
                let file_id = self
                    .content_targets
                    .get(self.content_cursor)
                    .and_then(|target| target.file_block.clone());
                if let Some(file_id) = file_id {
                    self.apply(Action::ToggleFileBlock(file_id));
                }
            }
        }
    }

    fn cycle_file_sort(&mut self) {
        if self.screen.file_sort_buttons.is_empty() {
            return;
        }
        let current = self.state.sort_state().files;
        let index = FileSortMode::ALL
            .iter()
            .position(|&mode| mode == current)
            .unwrap_or(0);
        let next = FileSortMode::ALL[(index + 1) % FileSortMode::ALL.len()];
        self.apply(Action::SetFileSortMode(next));
    }

    /// Sort the table under the content cursor, or the only table on screen.
    fn sort_table(&mut self, field: SortField) {
        let key = match &self.screen.content {
            Content::Datablocks { table, .. } => Some(table.key.clone()),
            Content::Files { .. } => self
                .content_targets
                .get(self.content_cursor)
                .and_then(|target| target.table.clone()),
        };
        if let Some(key) = key {
            self.apply(Action::ToggleTableSort(key, field));
        }
    }
}

fn point_in_rect(rect: UiRect, x: u16, y: u16) -> bool {
    x >= rect.x
        && y >= rect.y
        && x < rect.x.saturating_add(rect.width)
        && y < rect.y.saturating_add(rect.height)
}

fn bar_spans(bar: &PercentageBar) -> Vec<Span<'static>> {
    let filled = ((bar.percentage / 100.0).clamp(0.0, 1.0) * BAR_CELLS as f64).round() as usize;
    vec![
        Span::styled(" ".repeat(filled), Style::default().bg(Color::Rgb(bar.red, bar.green, 0))),
        Span::styled(
            " ".repeat(BAR_CELLS - filled),
            Style::default().bg(Color::Rgb(40, 48, 64)),
        ),
        Span::raw(format!(" {:>7}", bar.label)),
    ]
}

fn table_lines(table: &DatablockTable) -> Vec<(Line<'static>, LineTarget)> {
    let mut widths = [0usize; 3];
    for (i, header) in table.headers.iter().take(3).enumerate() {
        widths[i] = header.label.chars().count();
    }
    for row in &table.rows {
        for (i, cell) in [&row.kind, &row.name, &row.size].into_iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(table.rows.len() + 1);

    let mut spans = vec![Span::raw(" ".repeat(CONTENT_INDENT))];
    let mut headers = Vec::new();
    let mut offset = CONTENT_INDENT;
    for (i, header) in table.headers.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(header.label.chars().count());
        let style = if header.active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        spans.push(Span::styled(format!("{:<w$}", header.label, w = width), style));
        spans.push(Span::raw(" ".repeat(COLUMN_GAP)));
        headers.push((offset as u16, (offset + width) as u16, header.field));
        offset += width + COLUMN_GAP;
    }
    lines.push((
        Line::from(spans),
        LineTarget {
            table: Some(table.key.clone()),
            headers,
            ..LineTarget::default()
        },
    ));

    for row in &table.rows {
        let gap = " ".repeat(COLUMN_GAP);
        let mut spans = vec![
            Span::raw(" ".repeat(CONTENT_INDENT)),
            Span::styled(
                format!("{:<w$}", row.kind, w = widths[0]),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(gap.clone()),
            Span::raw(format!("{:<w$}", row.name, w = widths[1])),
            Span::raw(gap.clone()),
            Span::raw(format!("{:>w$}", row.size, w = widths[2])),
            Span::raw(gap),
        ];
        spans.extend(bar_spans(&row.bar));
        lines.push((
            Line::from(spans),
            LineTarget {
                table: Some(table.key.clone()),
                ..LineTarget::default()
            },
        ));
    }

    lines
}

fn content_lines(screen: &Screen) -> Vec<(Line<'static>, LineTarget)> {
    let heading = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    match &screen.content {
        Content::Files { total, blocks } => {
            if let Some(total) = total {
                lines.push((Line::styled(total.clone(), heading), LineTarget::default()));
            }
            if blocks.is_empty() {
                lines.push((
                    Line::styled("No matching files", Style::default().fg(Color::Gray)),
                    LineTarget::default(),
                ));
            }
            for block in blocks {
                let toggle = if block.expanded { "[-] " } else { "[+] " };
                let mut spans = vec![
                    Span::styled(toggle, Style::default().fg(Color::Gray)),
                    Span::styled(format!("{}  ", block.title), heading),
                ];
                if let Some(bar) = &block.bar {
                    spans.extend(bar_spans(bar));
                }
                lines.push((
                    Line::from(spans),
                    LineTarget {
                        file_block: Some(block.id.clone()),
                        table: Some(block.table.key.clone()),
                        ..LineTarget::default()
                    },
                ));
                if block.expanded {
                    lines.extend(table_lines(&block.table));
                }
            }
        }
        Content::Datablocks { header, table } => {
            lines.push((Line::styled(header.clone(), heading), LineTarget::default()));
            lines.extend(table_lines(table));
        }
    }

    lines
}

/// Keep `cursor` inside a window of `height` lines starting at `scroll`.
fn follow_cursor(scroll: usize, cursor: usize, height: usize) -> usize {
    if height == 0 || cursor < scroll {
        cursor
    } else if cursor >= scroll + height {
        cursor + 1 - height
    } else {
        scroll
    }
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(1),
    ])
    .split(root);

    // Controls
    let mut controls = vec![
        Span::styled(
            if app.input_mode { "Search (typing): " } else { "Search: " },
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("{:<20}", app.query_input),
            if app.input_mode {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            },
        ),
        Span::raw("  "),
    ];
    let active = Style::default().fg(Color::Black).bg(Color::Rgb(246, 211, 101));
    for button in &app.screen.view_buttons {
        let style = if button.active { active } else { Style::default() };
        controls.push(Span::styled(format!(" {} ", button.label), style));
    }
    controls.push(Span::raw("  "));
    let zero_style = if app.screen.show_zero_size { active } else { Style::default() };
    controls.push(Span::styled(format!(" {} ", SHOW_ZERO_LABEL), zero_style));
    if !app.screen.file_sort_buttons.is_empty() {
        controls.push(Span::raw("  "));
        for button in &app.screen.file_sort_buttons {
            let style = if button.active { active } else { Style::default() };
            controls.push(Span::styled(format!(" {} ", button.label), style));
        }
    }

    let title = match &app.screen.created_at {
        Some(created_at) => format!(" MemInsight | {} ", created_at),
        None => " MemInsight ".to_string(),
    };
    let controls_block = Block::default().title(title).borders(Borders::ALL);
    let controls_inner = controls_block.inner(rows[0]);
    frame.render_widget(Paragraph::new(Line::from(controls)).block(controls_block), rows[0]);
    app.ui_layout.search_area = Some(UiRect {
        width: (app.query_input.chars().count().max(20) + 18)
            .min(controls_inner.width as usize) as u16,
        ..controls_inner
    });

    // Tree and content
    let (tree_area, content_area) = if app.screen.tree.is_some() {
        let split =
            Layout::horizontal([Constraint::Length(40), Constraint::Min(30)]).split(rows[1]);
        (Some(split[0]), split[1])
    } else {
        (None, rows[1])
    };

    let focused = Style::default().fg(Color::Rgb(246, 211, 101));
    app.ui_layout.tree_inner_area = None;

    if let (Some(area), Some(tree_rows)) = (tree_area, app.screen.tree.as_ref()) {
        let block = Block::default()
            .title(" Tree ")
            .borders(Borders::ALL)
            .border_style(if app.focus == Focus::Tree { focused } else { Style::default() });
        let inner = block.inner(area);
        frame.render_widget(block, area);
        app.ui_layout.tree_inner_area = Some(inner);

        app.tree_scroll = follow_cursor(app.tree_scroll, app.tree_cursor, inner.height as usize);
        let lines: Vec<Line> = tree_rows
            .iter()
            .enumerate()
            .skip(app.tree_scroll)
            .take(inner.height as usize)
            .map(|(i, row)| {
                let marker = match (row.is_folder, row.expanded) {
                    (true, true) => "[-] ",
                    (true, false) => "[+] ",
                    (false, _) => "    ",
                };
                let mut style = if row.selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if row.is_folder {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::Gray)
                };
                if app.focus == Focus::Tree && i == app.tree_cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Line::from(vec![
                    Span::raw("  ".repeat(row.depth)),
                    Span::styled(format!("{}{}", marker, row.label), style),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    let content_block = Block::default()
        .title(" Content ")
        .borders(Borders::ALL)
        .border_style(if app.focus == Focus::Content { focused } else { Style::default() });
    let content_inner = content_block.inner(content_area);
    frame.render_widget(content_block, content_area);
    app.ui_layout.content_inner_area = Some(content_inner);

    app.content_scroll = follow_cursor(
        app.content_scroll,
        app.content_cursor,
        content_inner.height as usize,
    );
    let lines: Vec<Line> = content_lines(&app.screen)
        .into_iter()
        .enumerate()
        .skip(app.content_scroll)
        .take(content_inner.height as usize)
        .map(|(i, (line, _))| {
            if app.focus == Focus::Content && i == app.content_cursor {
                line.style(Style::default().bg(Color::Rgb(51, 65, 85)))
            } else {
                line
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), content_inner);

    frame.render_widget(
        Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::Gray)),
        rows[2],
    );
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| {
            draw_ui(frame, &mut app);
        })?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let state = cli
        .args
        .load_viewer()
        .with_context(|| format!("Failed to open report {}", cli.args.report.display()))?;

    if cli.print {
        let screen = render::build_screen(&state);
        render::print_screen(&screen, &mut stdout().lock())?;
        return Ok(());
    }

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, App::new(state));

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app_result.context("Terminal UI failed")
}
