use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::{self, Event, KeyCode};
use tracing::{debug, error};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::api::{FetchError, ProjectQuery, ProjectSource};
use crate::models::{CompletionFilter, ProjectRecord};
use crate::ui::components::{nav_tabs::NavTabsState, search_input::SearchInputState};
use crate::view::{progress_bar, result_label, ProjectRow};

const INPUT_POLL: Duration = Duration::from_millis(100);
const PROGRESS_BAR_WIDTH: usize = 10;
const NAV_TABS: [&str; 3] = ["Projects", "Tasks", "Members"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Rendered,
    Failed,
}

/// A query the event loop should run, tagged with the generation it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub query: ProjectQuery,
}

pub enum ProjectAction {
    Quit,
    Load(LoadRequest),
    ShowTasks { project_id: i64, title: String },
}

// Represents the state of the project table screen
pub struct ProjectsState {
    rows: Vec<ProjectRow>,
    table_state: TableState,
    search: SearchInputState,
    filter: CompletionFilter,
    tabs: NavTabsState,
    result_label: String,
    phase: LoadPhase,
    generation: u64,
    last_query: ProjectQuery,
}

impl ProjectsState {
    pub fn new(search: &str, filter: CompletionFilter) -> Self {
        Self {
            rows: Vec::new(),
            table_state: TableState::default(),
            search: SearchInputState::new(search),
            filter,
            tabs: NavTabsState::new(NAV_TABS.to_vec()),
            result_label: String::new(),
            phase: LoadPhase::Idle,
            generation: 0,
            last_query: ProjectQuery::default(),
        }
    }

    pub fn rows(&self) -> &[ProjectRow] {
        &self.rows
    }

    pub fn result_label(&self) -> &str {
        &self.result_label
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn filter(&self) -> CompletionFilter {
        self.filter
    }

    #[cfg(test)]
    pub fn tabs(&self) -> &NavTabsState {
        &self.tabs
    }

    #[cfg(test)]
    pub fn search(&self) -> &SearchInputState {
        &self.search
    }

    #[cfg(test)]
    pub fn search_mut(&mut self) -> &mut SearchInputState {
        &mut self.search
    }

    #[cfg(test)]
    pub fn set_filter(&mut self, filter: CompletionFilter) {
        self.filter = filter;
    }

    pub fn next(&mut self) {
        if self.rows.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_row(&self) -> Option<&ProjectRow> {
        self.table_state.selected().and_then(|i| self.rows.get(i))
    }

    /// Query built from the current search text and filter selection
    pub fn current_query(&self) -> ProjectQuery {
        ProjectQuery::new(self.search.value(), self.filter)
    }

    /// Start a new load. Any result still pending from an earlier
    /// generation will be dropped by `apply_result`.
    pub fn begin_load(&mut self, query: ProjectQuery) -> LoadRequest {
        self.generation += 1;
        self.phase = LoadPhase::Loading;
        self.last_query = query.clone();
        debug!(generation = self.generation, search = %query.search, completed = %query.completed, "loading projects");

        LoadRequest {
            generation: self.generation,
            query,
        }
    }

    /// Apply the outcome of a load. Returns false when the result belongs
    /// to a superseded request and was ignored.
    pub fn apply_result(
        &mut self,
        generation: u64,
        result: Result<Vec<ProjectRecord>, FetchError>,
        now: DateTime<Local>,
    ) -> bool {
        if generation != self.generation {
            debug!(generation, latest = self.generation, "discarding stale project list");
            return false;
        }

        match result {
            Ok(records) => self.replace_rows(&records, now),
            Err(err) => {
                // previous rows stay on screen
                error!(error = %err, "error fetching projects");
                self.phase = LoadPhase::Failed;
            }
        }
        true
    }

    /// Fetch with `query` and render the result in place.
    pub async fn load_and_render<S: ProjectSource>(&mut self, source: &S, query: ProjectQuery) -> bool {
        let request = self.begin_load(query);
        let result = source.fetch_projects(&request.query).await;

        self.apply_result(request.generation, result, Local::now())
    }

    fn replace_rows(&mut self, records: &[ProjectRecord], now: DateTime<Local>) {
        self.rows = records
            .iter()
            .map(|record| ProjectRow::from_record(record, now))
            .collect();
        self.result_label = result_label(self.rows.len());
        self.table_state = TableState::default();
        if !self.rows.is_empty() {
            self.table_state.select(Some(0));
        }
        self.phase = LoadPhase::Rendered;
    }
}

pub fn render_projects<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectsState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    state.tabs.render(frame, chunks[0]);
    render_controls(frame, state, chunks[1]);
    render_table(frame, state, chunks[2]);
    render_details(frame, state, chunks[3]);

    let buttons_text = if state.search.editing {
        "<Enter> Show | <Esc> Stop editing"
    } else {
        "</> Search | <F> Filter | <Enter> Show | <R> Reload | <T> Tasks | <Left/Right> Tabs | <Q> Quit"
    };
    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[4]);
}

fn render_controls<B: Backend>(frame: &mut Frame<B>, state: &ProjectsState, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(20),
            Constraint::Percentage(25),
        ].as_ref())
        .split(area);

    state.search.render(frame, parts[0]);

    let filter = Paragraph::new(Spans::from(vec![
        Span::raw("< "),
        Span::styled(state.filter.label(), Style::default().fg(Color::Yellow)),
        Span::raw(" >"),
    ]))
    .block(Block::default().title("Status").borders(Borders::ALL));
    frame.render_widget(filter, parts[1]);

    let count = Paragraph::new(state.result_label.as_str())
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(count, parts[2]);
}

fn render_table<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectsState, area: Rect) {
    let header_cells = ["Project", "Due In", "Created", "Tasks", "Done", "Progress", "Members"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells)
        .style(Style::default())
        .height(1)
        .bottom_margin(1);

    let rows = state.rows.iter().map(|row| {
        let cells = vec![
            Cell::from(row.title.as_str()),
            Cell::from(row.due_label.as_str()),
            Cell::from(row.created_label.as_str()),
            Cell::from(row.task_count_label.as_str()),
            Cell::from(row.task_summary.as_str()),
            Cell::from(progress_bar(row.progress_percent, PROGRESS_BAR_WIDTH))
                .style(Style::default().fg(Color::Green)),
            Cell::from(row.members.join(", ")),
        ];

        Row::new(cells).height(1)
    });

    let title = match state.phase {
        LoadPhase::Loading => "Projects (loading...)",
        _ => "Projects",
    };
    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(20),
            Constraint::Percentage(11),
            Constraint::Percentage(12),
            Constraint::Percentage(9),
            Constraint::Percentage(7),
            Constraint::Percentage(16),
            Constraint::Percentage(25),
        ]);

    frame.render_stateful_widget(table, area, &mut state.table_state);
}

fn render_details<B: Backend>(frame: &mut Frame<B>, state: &ProjectsState, area: Rect) {
    let lines = match state.selected_row() {
        Some(row) => vec![
            Spans::from(vec![
                Span::styled("Photo: ", Style::default().fg(Color::Yellow)),
                Span::raw(row.photo_url.as_str()),
            ]),
            Spans::from(vec![
                Span::styled("Members: ", Style::default().fg(Color::Yellow)),
                Span::raw(row.members.join(" · ")),
            ]),
        ],
        None => vec![Spans::from("")],
    };

    let details = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(details, area);
}

/// Key bindings of the project screen.
pub fn handle_key(state: &mut ProjectsState, key: KeyCode) -> Option<ProjectAction> {
    if state.search.editing {
        match key {
            KeyCode::Esc => state.search.stop_editing(),
            KeyCode::Enter => {
                state.search.stop_editing();
                let query = state.current_query();
                return Some(ProjectAction::Load(state.begin_load(query)));
            }
            _ => state.search.handle_input(key),
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ProjectAction::Quit),
        KeyCode::Char('/') => state.search.start_editing(),
        KeyCode::Char('f') | KeyCode::Tab => state.filter = state.filter.next(),
        KeyCode::BackTab => state.filter = state.filter.previous(),
        KeyCode::Enter | KeyCode::Char('s') => {
            let query = state.current_query();
            return Some(ProjectAction::Load(state.begin_load(query)));
        }
        KeyCode::Char('r') | KeyCode::F(5) => {
            let query = state.last_query.clone();
            return Some(ProjectAction::Load(state.begin_load(query)));
        }
        KeyCode::Char('t') => {
            if let Some(row) = state.selected_row() {
                return Some(ProjectAction::ShowTasks {
                    project_id: row.id,
                    title: row.title.clone(),
                });
            }
        }
        KeyCode::Char(c @ '1'..='9') => {
            if let Some(index) = c.to_digit(10) {
                state.tabs.activate(index as usize - 1);
            }
        }
        KeyCode::Right => state.tabs.next(),
        KeyCode::Left => state.tabs.previous(),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut ProjectsState) -> Result<Option<ProjectAction>> {
    if event::poll(INPUT_POLL)? {
        if let Event::Key(key) = event::read()? {
            return Ok(handle_key(state, key.code));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::StatusCode;
    use tui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::api::projects_url;
    use crate::models::{Member, TaskCounts, TaskRecord};
    use crate::view::FALLBACK_PHOTO_URL;

    #[derive(Default)]
    struct FakeSource {
        responses: Mutex<Vec<Result<Vec<ProjectRecord>, FetchError>>>,
        queries: Mutex<Vec<ProjectQuery>>,
    }

    impl FakeSource {
        fn answering(responses: Vec<Result<Vec<ProjectRecord>, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                queries: Mutex::default(),
            }
        }

        fn queries(&self) -> Vec<ProjectQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl ProjectSource for FakeSource {
        async fn fetch_projects(&self, query: &ProjectQuery) -> Result<Vec<ProjectRecord>, FetchError> {
            self.queries.lock().unwrap().push(query.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_tasks(&self, _project_id: i64) -> Result<Vec<TaskRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn project(id: i64, title: &str, total: u32, completed: u32) -> ProjectRecord {
        ProjectRecord {
            id,
            title: title.to_string(),
            display_photo: None,
            due_date: Some("2030-01-01".to_string()),
            date_created: "2024-03-05".to_string(),
            task_counts: TaskCounts {
                total_tasks: total,
                completed_tasks: completed,
            },
            members: vec![Member {
                username: format!("owner{id}"),
            }],
        }
    }

    fn server_error() -> FetchError {
        FetchError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        }
    }

    fn titles(state: &ProjectsState) -> Vec<&str> {
        state.rows().iter().map(|r| r.title.as_str()).collect()
    }

    fn screen_text(state: &mut ProjectsState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal.draw(|f| render_projects(f, state)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|line| line.iter().map(|cell| cell.symbol.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn renders_one_row_per_record_with_count_label() {
        let source = FakeSource::answering(vec![Ok(vec![
            project(1, "Apollo", 4, 1),
            project(2, "Borealis", 0, 0),
            project(3, "Cygnus", 10, 10),
        ])]);
        let mut state = ProjectsState::new("", CompletionFilter::Any);

        assert!(state.load_and_render(&source, ProjectQuery::default()).await);

        assert_eq!(state.rows().len(), 3);
        assert_eq!(state.result_label(), "3 results found");
        assert_eq!(state.phase(), LoadPhase::Rendered);
        assert_eq!(state.selected_row().map(|r| r.id), Some(1));
    }

    #[tokio::test]
    async fn empty_result_shows_zero_count() {
        let source = FakeSource::answering(vec![Ok(vec![])]);
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        state.load_and_render(&source, ProjectQuery::default()).await;

        assert!(state.rows().is_empty());
        assert_eq!(state.result_label(), "0 results found");
        assert!(state.selected_row().is_none());
    }

    #[tokio::test]
    async fn show_issues_one_request_and_replaces_rows_in_order() {
        let source = FakeSource::answering(vec![
            Ok(vec![project(1, "Old", 1, 0)]),
            Ok(vec![project(9, "Zulu", 2, 1), project(4, "Alpha Two", 2, 2)]),
        ]);
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        state.load_and_render(&source, ProjectQuery::default()).await;
        assert_eq!(titles(&state), vec!["Old"]);

        state.search_mut().text = "alpha".to_string();
        state.set_filter(CompletionFilter::Completed);
        let Some(ProjectAction::Load(request)) = handle_key(&mut state, KeyCode::Enter) else {
            panic!("show should request a load");
        };
        let result = source.fetch_projects(&request.query).await;
        assert!(state.apply_result(request.generation, result, Local::now()));

        let queries = source.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(
            projects_url("http://localhost:8000/", &queries[1]).unwrap().as_str(),
            "http://localhost:8000/projects/?search=alpha&completed=true"
        );
        assert_eq!(titles(&state), vec!["Zulu", "Alpha Two"]);
        assert_eq!(state.result_label(), "2 results found");
    }

    #[tokio::test]
    async fn failure_keeps_previous_rows() {
        let source = FakeSource::answering(vec![
            Ok(vec![project(1, "Kept", 3, 1)]),
            Err(server_error()),
        ]);
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        state.load_and_render(&source, ProjectQuery::default()).await;
        state.load_and_render(&source, ProjectQuery::new("x", CompletionFilter::Any)).await;

        assert_eq!(state.phase(), LoadPhase::Failed);
        assert_eq!(titles(&state), vec!["Kept"]);
        assert_eq!(state.result_label(), "1 results found");
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        let first = state.begin_load(ProjectQuery::new("first", CompletionFilter::Any));
        let second = state.begin_load(ProjectQuery::new("second", CompletionFilter::Any));

        assert!(state.apply_result(second.generation, Ok(vec![project(2, "Second", 1, 1)]), Local::now()));
        assert!(!state.apply_result(first.generation, Ok(vec![project(1, "First", 1, 0)]), Local::now()));
        assert_eq!(titles(&state), vec!["Second"]);
    }

    #[test]
    fn search_field_trims_and_enter_triggers_show() {
        let mut state = ProjectsState::new("", CompletionFilter::Incomplete);
        assert!(handle_key(&mut state, KeyCode::Char('/')).is_none());
        for c in " beta ".chars() {
            handle_key(&mut state, KeyCode::Char(c));
        }
        // 'q' is text while editing, not quit
        assert!(handle_key(&mut state, KeyCode::Char('q')).is_none());
        handle_key(&mut state, KeyCode::Backspace);

        match handle_key(&mut state, KeyCode::Enter) {
            Some(ProjectAction::Load(request)) => {
                assert_eq!(request.query, ProjectQuery::new("beta", CompletionFilter::Incomplete));
            }
            _ => panic!("expected a load"),
        }
        assert!(!state.search().editing);
        assert_eq!(state.phase(), LoadPhase::Loading);
    }

    #[test]
    fn reload_repeats_last_query() {
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        state.begin_load(ProjectQuery::new("gamma", CompletionFilter::Completed));
        state.search_mut().text = "ignored".to_string();

        match handle_key(&mut state, KeyCode::Char('r')) {
            Some(ProjectAction::Load(request)) => {
                assert_eq!(request.query.search, "gamma");
                assert_eq!(request.generation, 2);
            }
            _ => panic!("expected a load"),
        }
    }

    #[test]
    fn filter_and_tabs_do_not_load() {
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        assert!(handle_key(&mut state, KeyCode::Char('f')).is_none());
        assert_eq!(state.filter(), CompletionFilter::Completed);
        assert!(handle_key(&mut state, KeyCode::Char('3')).is_none());
        assert_eq!(state.tabs().active_title(), Some("Members"));
        assert!(handle_key(&mut state, KeyCode::Right).is_none());
        assert_eq!(state.tabs().active(), 0);
        assert_eq!(state.phase(), LoadPhase::Idle);
    }

    #[test]
    fn tasks_key_opens_selected_project() {
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        let request = state.begin_load(ProjectQuery::default());
        state.apply_result(
            request.generation,
            Ok(vec![project(5, "Five", 1, 0), project(6, "Six", 1, 0)]),
            Local::now(),
        );
        handle_key(&mut state, KeyCode::Down);

        match handle_key(&mut state, KeyCode::Char('t')) {
            Some(ProjectAction::ShowTasks { project_id, title }) => {
                assert_eq!(project_id, 6);
                assert_eq!(title, "Six");
            }
            _ => panic!("expected task drill-down"),
        }
    }

    #[test]
    fn render_draws_rows_label_and_fallback_photo() {
        let mut state = ProjectsState::new("", CompletionFilter::Any);
        let request = state.begin_load(ProjectQuery::default());
        state.apply_result(
            request.generation,
            Ok(vec![project(1, "Apollo", 4, 2), project(2, "Borealis", 0, 0)]),
            Local::now(),
        );

        let text = screen_text(&mut state);
        assert!(text.contains("2 results found"));
        assert!(text.contains("Apollo"));
        assert!(text.contains("Borealis"));
        assert!(text.contains("Mar 5, 2024"));
        assert!(text.contains(FALLBACK_PHOTO_URL));
        assert!(text.contains("owner1"));
    }
}
