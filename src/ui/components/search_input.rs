use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Single-line text field holding the search term.
#[derive(Debug, Default)]
pub struct SearchInputState {
    pub text: String,
    pub editing: bool,
}

impl SearchInputState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            editing: false,
        }
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) => self.text.push(c),
            KeyCode::Backspace => {
                self.text.pop();
            }
            _ => {}
        }
    }

    /// Current search term with surrounding whitespace removed
    pub fn value(&self) -> &str {
        self.text.trim()
    }

    pub fn render<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let style = if self.editing {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if self.editing { "|" } else { "" };

        let input = Paragraph::new(Spans::from(vec![
            Span::styled(self.text.as_str(), style),
            Span::raw(cursor),
        ]))
        .block(Block::default().title("Search").borders(Borders::ALL));

        frame.render_widget(input, area);
    }
}
