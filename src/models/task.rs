use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub date_created: String,
    pub project: i64,
    #[serde(default)]
    pub complete: bool,
}
