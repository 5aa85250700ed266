mod project;
mod task;

pub use project::{CompletionFilter, Member, ProjectRecord, TaskCounts};
pub use task::TaskRecord;
