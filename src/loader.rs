//! Background fetches for the UI loop.
//!
//! Every request runs on its own Tokio task and reports back over an
//! unbounded channel, so the loop keeps drawing and reading keys while the
//! server is slow. Starting a fetch aborts the previous one of the same kind.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::{FetchError, ProjectSource};
use crate::models::{ProjectRecord, TaskRecord};
use crate::ui::projects::LoadRequest;

/// Result of a finished background fetch.
pub enum Loaded {
    Projects {
        generation: u64,
        result: Result<Vec<ProjectRecord>, FetchError>,
    },
    Tasks {
        project_id: i64,
        title: String,
        result: Result<Vec<TaskRecord>, FetchError>,
    },
}

pub struct Loader<S> {
    source: S,
    sender: UnboundedSender<Loaded>,
    projects: Option<JoinHandle<()>>,
    tasks: Option<JoinHandle<()>>,
}

impl<S> Loader<S>
where
    S: ProjectSource + Clone + Send + Sync + 'static,
{
    pub fn new(source: S) -> (Self, UnboundedReceiver<Loaded>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let loader = Self {
            source,
            sender,
            projects: None,
            tasks: None,
        };

        (loader, receiver)
    }

    /// Fetch the project list for `request`, aborting any list fetch
    /// still in flight.
    pub fn load_projects(&mut self, request: LoadRequest) {
        if let Some(handle) = self.projects.take() {
            debug!(generation = request.generation, "aborting superseded project load");
            handle.abort();
        }

        let source = self.source.clone();
        let sender = self.sender.clone();
        self.projects = Some(tokio::spawn(async move {
            let result = source.fetch_projects(&request.query).await;
            // receiver is gone only while shutting down
            let _ = sender.send(Loaded::Projects {
                generation: request.generation,
                result,
            });
        }));
    }

    /// Fetch the tasks of one project for the drill-down screen.
    pub fn load_tasks(&mut self, project_id: i64, title: String) {
        if let Some(handle) = self.tasks.take() {
            handle.abort();
        }

        let source = self.source.clone();
        let sender = self.sender.clone();
        self.tasks = Some(tokio::spawn(async move {
            let result = source.fetch_tasks(project_id).await;
            let _ = sender.send(Loaded::Tasks {
                project_id,
                title,
                result,
            });
        }));
    }

    pub fn abort_all(&mut self) {
        for handle in [self.projects.take(), self.tasks.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}
