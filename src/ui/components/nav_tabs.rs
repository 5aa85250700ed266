use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, Tabs},
    Frame,
};

/// Navigation strip where exactly one tab is active at a time.
///
/// Purely presentational: switching tabs never touches the loaded data.
pub struct NavTabsState {
    titles: Vec<&'static str>,
    active: usize,
}

impl NavTabsState {
    pub fn new(titles: Vec<&'static str>) -> Self {
        Self { titles, active: 0 }
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.active
    }

    #[cfg(test)]
    pub fn active_title(&self) -> Option<&'static str> {
        self.titles.get(self.active).copied()
    }

    /// Make `index` the only active tab. Out of range indices are ignored.
    pub fn activate(&mut self, index: usize) {
        if index < self.titles.len() {
            self.active = index;
        }
    }

    pub fn next(&mut self) {
        if !self.titles.is_empty() {
            self.active = (self.active + 1) % self.titles.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.titles.is_empty() {
            self.active = (self.active + self.titles.len() - 1) % self.titles.len();
        }
    }

    pub fn render<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let titles: Vec<Spans> = self.titles.iter().map(|t| Spans::from(*t)).collect();
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL))
            .select(self.active)
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );

        frame.render_widget(tabs, area);
    }
}
