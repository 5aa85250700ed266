//! Derived display fields for project and task rows.
//!
//! Everything here is pure: the current time is passed in, and the output is
//! a plain row description that the terminal and plain-text renderers draw.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use tracing::warn;

use crate::models::{Member, ProjectRecord, TaskCounts, TaskRecord};

/// Image shown for projects that have no display photo.
pub const FALLBACK_PHOTO_URL: &str = "https://via.placeholder.com/150";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_DAY: i64 = 86_400_000;

/// Everything the project table needs to draw one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub id: i64,
    pub title: String,
    pub photo_url: String,
    pub due_label: String,
    pub created_label: String,
    pub task_summary: String,
    pub task_count_label: String,
    pub progress_percent: f64,
    pub members: Vec<String>,
}

impl ProjectRow {
    pub fn from_record(record: &ProjectRecord, now: DateTime<Local>) -> Self {
        let due_label = match record.due_date.as_deref() {
            Some(raw) => match parse_local(raw) {
                Some(due) => format_duration(due - now),
                None => {
                    warn!(project = record.id, due_date = raw, "unparseable due date");
                    String::new()
                }
            },
            None => String::new(),
        };

        let created_label = format_date(&record.date_created).unwrap_or_else(|| {
            warn!(project = record.id, date_created = %record.date_created, "unparseable creation date");
            record.date_created.clone()
        });

        let counts = record.task_counts;

        Self {
            id: record.id,
            title: record.title.clone(),
            photo_url: photo_url(record.display_photo.as_deref()).to_string(),
            due_label,
            created_label,
            task_summary: format!("{}/{}", counts.completed_tasks, counts.total_tasks),
            task_count_label: format!("{} tasks", counts.total_tasks),
            progress_percent: progress_percent(counts),
            members: member_list(&record.members),
        }
    }

    /// Single-line rendering used by `--plain`.
    pub fn plain_line(&self) -> String {
        format!(
            "{} | due {} | created {} | {} | {} | {} | {}",
            self.title,
            self.due_label,
            self.created_label,
            self.task_summary,
            progress_bar(self.progress_percent, 10),
            self.members.join(", "),
            self.photo_url,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub title: String,
    pub created_label: String,
    pub complete: bool,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            title: record.title.clone(),
            created_label: format_date(&record.date_created)
                .unwrap_or_else(|| record.date_created.clone()),
            complete: record.complete,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.complete { "Done" } else { "Open" }
    }
}

pub fn result_label(count: usize) -> String {
    format!("{count} results found")
}

/// `"{days}d, {minutes}m"`, floored to whole days and whole minutes.
///
/// Overdue durations come out negative: one hour overdue is `"-1d, 0m"`.
pub fn format_duration(remaining: Duration) -> String {
    let ms = remaining.num_milliseconds();
    let days = ms.div_euclid(MS_PER_DAY);
    let minutes = ms.div_euclid(MS_PER_MINUTE) % 60;

    format!("{days}d, {minutes}m")
}

/// `"Mar 5, 2024"` for `"2024-03-05"`.
///
/// Zoned timestamps are shown in the local zone; naive ones keep their
/// literal calendar date.
pub fn format_date(raw: &str) -> Option<String> {
    let date = match parse_timestamp(raw)? {
        Timestamp::Zoned(dt) => dt.with_timezone(&Local).date_naive(),
        Timestamp::Naive(dt) => dt.date(),
    };

    Some(format!(
        "{} {}, {}",
        MONTHS[date.month0() as usize],
        date.day(),
        date.year()
    ))
}

/// `100 * completed / total`, or 0 when the project has no tasks.
pub fn progress_percent(counts: TaskCounts) -> f64 {
    if counts.total_tasks == 0 {
        return 0.0;
    }
    100.0 * f64::from(counts.completed_tasks) / f64::from(counts.total_tasks)
}

pub fn photo_url(display_photo: Option<&str>) -> &str {
    match display_photo {
        Some(url) if !url.is_empty() => url,
        _ => FALLBACK_PHOTO_URL,
    }
}

pub fn member_list(members: &[Member]) -> Vec<String> {
    members.iter().map(|m| m.username.clone()).collect()
}

/// Fixed-width text bar with `percent` of its cells filled.
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "{}{} {:>3.0}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        percent
    )
}

enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Timestamp::Zoned(dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Timestamp::Naive(dt));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Timestamp::Naive)
}

fn parse_local(raw: &str) -> Option<DateTime<Local>> {
    match parse_timestamp(raw)? {
        Timestamp::Zoned(dt) => Some(dt.with_timezone(&Local)),
        Timestamp::Naive(dt) => Local.from_local_datetime(&dt).earliest(),
    }
}
