use std::future::Future;

use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{CompletionFilter, ProjectRecord, TaskRecord};

const BODY_SNIPPET_LEN: usize = 200;

/// Failure of a single request against the REST API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid API base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Parameters of one `projects/` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectQuery {
    pub search: String,
    pub completed: CompletionFilter,
}

impl ProjectQuery {
    pub fn new(search: impl Into<String>, completed: CompletionFilter) -> Self {
        Self {
            search: search.into(),
            completed,
        }
    }
}

/// Where the project table gets its data from.
pub trait ProjectSource {
    fn fetch_projects(
        &self,
        query: &ProjectQuery,
    ) -> impl Future<Output = Result<Vec<ProjectRecord>, FetchError>> + Send;

    fn fetch_tasks(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Vec<TaskRecord>, FetchError>> + Send;
}

/// HTTP client for the projects REST API
#[derive(Debug, Clone)]
pub struct ProjectsClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProjectsClient {
    /// Create a client, rejecting base URLs that cannot be parsed
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        endpoint_url(base_url, "")?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        decode_json(status, &body)
    }
}

impl ProjectSource for ProjectsClient {
    async fn fetch_projects(&self, query: &ProjectQuery) -> Result<Vec<ProjectRecord>, FetchError> {
        let url = projects_url(&self.base_url, query)?;
        let projects: Vec<ProjectRecord> = self.get_json(url).await?;
        info!(count = projects.len(), search = %query.search, completed = %query.completed, "fetched projects");

        Ok(projects)
    }

    async fn fetch_tasks(&self, project_id: i64) -> Result<Vec<TaskRecord>, FetchError> {
        let url = tasks_url(&self.base_url, project_id)?;
        let tasks: Vec<TaskRecord> = self.get_json(url).await?;
        info!(count = tasks.len(), project_id, "fetched tasks");

        Ok(tasks)
    }
}

/// Resolve `path` against the API base, treating the base as a directory
/// even when it lacks a trailing slash.
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::BaseUrl {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);

    url.join(path).map_err(|e| invalid(e.to_string()))
}

/// `{base}/projects/?search={text}&completed={filter}`
pub fn projects_url(base: &str, query: &ProjectQuery) -> Result<Url, FetchError> {
    let mut url = endpoint_url(base, "projects/")?;
    url.query_pairs_mut()
        .append_pair("search", &query.search)
        .append_pair("completed", query.completed.query_value());

    Ok(url)
}

/// `{base}/tasks/?project={id}`
pub fn tasks_url(base: &str, project_id: i64) -> Result<Url, FetchError> {
    let mut url = endpoint_url(base, "tasks/")?;
    url.query_pairs_mut()
        .append_pair("project", &project_id.to_string());

    Ok(url)
}

/// Turn a status and body into a typed payload. Any non-2xx status is a
/// failure regardless of the body.
pub fn decode_json<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, FetchError> {
    if !status.is_success() {
        let body = body.chars().take(BODY_SNIPPET_LEN).collect();
        return Err(FetchError::Status { status, body });
    }

    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_url_carries_both_parameters() {
        let query = ProjectQuery::new("alpha", CompletionFilter::Completed);
        let url = projects_url("http://localhost:8000/", &query).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/projects/?search=alpha&completed=true");
    }

    #[test]
    fn projects_url_sends_empty_parameters_for_defaults() {
        let url = projects_url("http://localhost:8000/", &ProjectQuery::default()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/projects/?search=&completed=");
    }

    #[test]
    fn search_text_is_encoded() {
        let query = ProjectQuery::new("r&d / ops", CompletionFilter::Incomplete);
        let url = projects_url("http://localhost:8000/", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/projects/?search=r%26d+%2F+ops&completed=false"
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("search".to_string(), "r&d / ops".to_string()));
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let url = tasks_url("http://api.test/v1", 4).unwrap();
        assert_eq!(url.as_str(), "http://api.test/v1/tasks/?project=4");
    }

    #[test]
    fn unparseable_base_is_rejected() {
        assert!(matches!(
            ProjectsClient::new("not a url"),
            Err(FetchError::BaseUrl { .. })
        ));
    }

    #[test]
    fn decode_accepts_project_array() {
        let body = r#"[{"id": 1, "title": "One"}, {"id": 2, "title": "Two"}]"#;
        let projects: Vec<ProjectRecord> = decode_json(StatusCode::OK, body).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].title, "Two");
    }

    #[test]
    fn decode_rejects_error_status() {
        let err = decode_json::<Vec<ProjectRecord>>(StatusCode::INTERNAL_SERVER_ERROR, "[]").unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let err = decode_json::<Vec<ProjectRecord>>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
