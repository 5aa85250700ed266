use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::TaskRecord;
use crate::view::TaskRow;

const INPUT_POLL: Duration = Duration::from_millis(100);

// Read-only task list for one project
pub struct TasksState {
    project_id: i64,
    project_title: String,
    rows: Vec<TaskRow>,
    table_state: TableState,
}

impl TasksState {
    pub fn new(project_id: i64, project_title: String, tasks: Vec<TaskRecord>) -> Self {
        let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from_record).collect();
        let mut table_state = TableState::default();
        if !rows.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            project_id,
            project_title,
            rows,
            table_state,
        }
    }

    #[cfg(test)]
    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn completed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.complete).count()
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
}

pub enum TaskAction {
    Back,
}

pub fn render_tasks<B: Backend>(frame: &mut Frame<B>, state: &mut TasksState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let header_cells = ["Task", "Created", "Status"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells)
        .style(Style::default())
        .height(1)
        .bottom_margin(1);

    let rows = state.rows.iter().map(|row| {
        let status_style = if row.complete {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(row.title.as_str()),
            Cell::from(row.created_label.as_str()),
            Cell::from(row.status_label()).style(status_style),
        ])
        .height(1)
    });

    let title = format!(
        "Tasks for {} #{} ({}/{} done)",
        state.project_title,
        state.project_id,
        state.completed_count(),
        state.rows.len()
    );
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
            Constraint::Percentage(60),
            Constraint::Percentage(25),
            Constraint::Percentage(15),
        ]);

    frame.render_stateful_widget(table, chunks[0], &mut state.table_state);

    let buttons = Paragraph::new("<Up/Down> Move | <Esc> Back")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_key(state: &mut TasksState, key: KeyCode) -> Option<TaskAction> {
    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(TaskAction::Back),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut TasksState) -> Result<Option<TaskAction>> {
    if event::poll(INPUT_POLL)? {
        if let Event::Key(key) = event::read()? {
            return Ok(handle_key(state, key.code));
        }
    }
    Ok(None)
}
