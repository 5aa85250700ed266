mod api;
mod config;
mod loader;
mod models;
mod ui;
mod view;

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::api::{ProjectQuery, ProjectSource, ProjectsClient};
use crate::loader::{Loaded, Loader};
use crate::models::CompletionFilter;
use crate::ui::{
    projects::{ProjectsState, ProjectAction, LoadPhase, render_projects, handle_input as handle_projects_input},
    tasks::{TasksState, TaskAction, render_tasks, handle_input as handle_tasks_input},
};

/// Browse projects served by a REST API
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Base URL of the API (overrides PROJECT_BOARD_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Log file used while the terminal UI runs (overrides PROJECT_BOARD_LOG_FILE)
    #[arg(long)]
    log_file: Option<String>,

    /// Initial search term
    #[arg(long, default_value = "")]
    search: String,

    /// Initial completion filter: "", true or false
    #[arg(long, default_value = "")]
    completed: CompletionFilter,

    /// Print the project list once and exit instead of starting the UI
    #[arg(long)]
    plain: bool,
}

// Represents the current screen in the app
#[derive(Debug, PartialEq)]
enum AppScreen {
    Projects,
    Tasks,
}

// Main application state
struct AppState<S> {
    loader: Loader<S>,
    screen: AppScreen,
    projects_state: ProjectsState,
    tasks_state: Option<TasksState>,
}

impl<S> AppState<S>
where
    S: ProjectSource + Clone + Send + Sync + 'static,
{
    fn new(loader: Loader<S>, projects_state: ProjectsState) -> Self {
        Self {
            loader,
            screen: AppScreen::Projects,
            projects_state,
            tasks_state: None,
        }
    }

    /// Fold a finished background fetch into the screens.
    fn apply_loaded(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Projects { generation, result } => {
                self.projects_state.apply_result(generation, result, Local::now());
            }
            Loaded::Tasks {
                project_id,
                title,
                result,
            } => match result {
                Ok(tasks) => {
                    self.tasks_state = Some(TasksState::new(project_id, title, tasks));
                    self.screen = AppScreen::Tasks;
                }
                Err(err) => {
                    error!(project_id, error = %err, "error fetching tasks");
                }
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?.with_overrides(cli.base_url.clone(), cli.log_file.clone());

    if cli.plain {
        init_logging(None)?;
    } else {
        init_logging(Some(&config.log_file))?;
    }

    let client = ProjectsClient::new(config.api_base_url())?;
    info!(base_url = client.base_url(), "starting project board");

    let query = ProjectQuery::new(cli.search.trim(), cli.completed);
    if cli.plain {
        return run_plain(&client, query).await;
    }

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (loader, mut loaded) = Loader::new(client);
    let mut app_state = AppState::new(loader, ProjectsState::new(&query.search, query.completed));

    // Initial load runs in the background like every other one
    let request = app_state.projects_state.begin_load(query);
    app_state.loader.load_projects(request);

    let result = run_app(&mut terminal, &mut app_state, &mut loaded).await;
    app_state.loader.abort_all();

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!(error = %err, "project board exited with an error");
        println!("Error: {}", err);
    }

    Ok(())
}

fn init_logging(log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            // the terminal belongs to the UI, so logs go to a file
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }

    Ok(())
}

async fn run_plain(client: &ProjectsClient, query: ProjectQuery) -> Result<()> {
    let mut state = ProjectsState::new(&query.search, query.completed);
    state.load_and_render(client, query).await;

    if state.phase() == LoadPhase::Failed {
        bail!("could not fetch projects from {}", client.base_url());
    }

    println!("{}", state.result_label());
    for row in state.rows() {
        println!("{}", row.plain_line());
    }

    Ok(())
}

async fn run_app<B, S>(
    terminal: &mut Terminal<B>,
    app_state: &mut AppState<S>,
    loaded: &mut UnboundedReceiver<Loaded>,
) -> Result<()>
where
    B: Backend,
    S: ProjectSource + Clone + Send + Sync + 'static,
{
    loop {
        while let Ok(outcome) = loaded.try_recv() {
            app_state.apply_loaded(outcome);
        }

        // Render current screen
        terminal.draw(|f| {
            match app_state.screen {
                AppScreen::Projects => render_projects(f, &mut app_state.projects_state),
                AppScreen::Tasks => {
                    if let Some(state) = &mut app_state.tasks_state {
                        render_tasks(f, state);
                    }
                }
            }
        })?;

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Projects => handle_projects_screen(app_state)?,
            AppScreen::Tasks => handle_tasks_screen(app_state)?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_projects_screen<S>(app_state: &mut AppState<S>) -> Result<bool>
where
    S: ProjectSource + Clone + Send + Sync + 'static,
{
    match handle_projects_input(&mut app_state.projects_state)? {
        Some(ProjectAction::Quit) => {
            return Ok(true);
        }
        Some(ProjectAction::Load(request)) => {
            app_state.loader.load_projects(request);
        }
        Some(ProjectAction::ShowTasks { project_id, title }) => {
            // screen switches once the list arrives
            app_state.loader.load_tasks(project_id, title);
        }
        None => {}
    }

    Ok(false)
}

fn handle_tasks_screen<S>(app_state: &mut AppState<S>) -> Result<bool> {
    if let Some(state) = &mut app_state.tasks_state {
        match handle_tasks_input(state)? {
            Some(TaskAction::Back) => {
                // Projects stay as they were; no refetch
                app_state.tasks_state = None;
                app_state.screen = AppScreen::Projects;
            }
            None => {}
        }
    } else {
        app_state.screen = AppScreen::Projects;
    }

    Ok(false)
}
