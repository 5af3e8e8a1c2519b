//! Task source adapter: Notion database -> core `Task` records.

use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use taskping_core::{Task, local_day_bounds, parse_source_datetime};

const API_BASE: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The whole fetch failing vs one record being junk. A malformed record
/// never aborts the fetch; it is logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("task source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed record {id}: {reason}")]
    Malformed { id: String, reason: String },
}

pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            database_id: database_id.into(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, SourceError> {
        let mut h = HeaderMap::new();
        let bearer = format!("Bearer {}", self.token);
        h.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|_| SourceError::Unavailable("token is not a valid header value".to_string()))?,
        );
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert("Notion-Version", HeaderValue::from_static(API_VERSION));
        Ok(h)
    }

    /// Fetch `date`'s tasks carrying `status`, dropping records without a
    /// time-bearing start. Follows pagination cursors.
    pub async fn fetch_tasks(
        &self,
        date: NaiveDate,
        tz: Tz,
        status: &str,
    ) -> Result<Vec<Task>, SourceError> {
        let (day_start, day_end) =
            local_day_bounds(date, tz).map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let filter = json!({
            "and": [
                { "property": "Due", "date": { "on_or_after": day_start.to_rfc3339() } },
                { "property": "Due", "date": { "on_or_before": day_end.to_rfc3339() } },
                { "property": "Status", "status": { "equals": status } },
            ]
        });

        let mut tasks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "filter": filter.clone() });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let url = format!("{API_BASE}/databases/{}/query", self.database_id);
            let resp = self
                .http
                .post(&url)
                .headers(self.headers()?)
                .json(&body)
                .send()
                .await
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;

            if !resp.status().is_success() {
                let status_code = resp.status();
                let text = resp.text().await.unwrap_or_default();
                return Err(SourceError::Unavailable(format!(
                    "query returned {status_code}: {text}"
                )));
            }

            let page: Value = resp
                .json()
                .await
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;

            for raw in page["results"].as_array().map(Vec::as_slice).unwrap_or(&[]) {
                match parse_page(raw) {
                    Ok(Some(task)) => tasks.push(task),
                    Ok(None) => {
                        debug!(
                            id = raw["id"].as_str().unwrap_or("?"),
                            "skipping record without a time-bearing start"
                        );
                    }
                    Err(e) => warn!("dropping record: {e}"),
                }
            }

            if page["has_more"].as_bool() == Some(true) {
                cursor = page["next_cursor"].as_str().map(str::to_string);
                if cursor.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(tasks)
    }

    /// Retrieve database metadata for the connectivity self-test:
    /// (title, [(property name, property type)]).
    pub async fn retrieve_database(&self) -> Result<(String, Vec<(String, String)>), SourceError> {
        let url = format!("{API_BASE}/databases/{}", self.database_id);
        let resp = self
            .http
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status_code = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SourceError::Unavailable(format!(
                "retrieve returned {status_code}: {text}"
            )));
        }

        let db: Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let title = db["title"]
            .as_array()
            .map(|parts| plain_text(parts))
            .unwrap_or_default();

        let mut properties = Vec::new();
        if let Some(props) = db["properties"].as_object() {
            for (name, prop) in props {
                let kind = prop["type"].as_str().unwrap_or("unknown").to_string();
                properties.push((name.clone(), kind));
            }
        }

        Ok((title, properties))
    }
}

/// Parse one page into a Task. `Ok(None)` means the record is well-formed
/// but untrackable (date-only or no due date at all).
fn parse_page(page: &Value) -> Result<Option<Task>, SourceError> {
    let id = page["id"]
        .as_str()
        .ok_or_else(|| SourceError::Malformed {
            id: "?".to_string(),
            reason: "missing page id".to_string(),
        })?
        .to_string();

    let malformed = |reason: String| SourceError::Malformed {
        id: id.clone(),
        reason,
    };

    let props = page["properties"]
        .as_object()
        .ok_or_else(|| malformed("missing properties".to_string()))?;

    let title = find_prop(props, &["Name", "Title"])
        .and_then(|p| p["title"].as_array())
        .map(|parts| plain_text(parts))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Task".to_string());

    let Some(due) = find_prop(props, &["Due", "Date"]).filter(|p| !p["date"].is_null()) else {
        return Ok(None);
    };

    let Some(raw_start) = due["date"]["start"].as_str() else {
        return Ok(None);
    };
    let Some(start) = parse_source_datetime(raw_start).map_err(|e| malformed(e.to_string()))? else {
        // Date-only: nothing to alert on.
        return Ok(None);
    };

    let end = match due["date"]["end"].as_str() {
        Some(raw_end) => parse_source_datetime(raw_end).map_err(|e| malformed(e.to_string()))?,
        None => None,
    };

    let description = find_prop(props, &["Description", "Notes"])
        .and_then(|p| p["rich_text"].as_array())
        .map(|parts| plain_text(parts))
        .unwrap_or_default();

    let prepare_minutes = number_prop(props, &["Prepare Mins"]);
    let soft_stop_minutes = number_prop(props, &["Soft Stop Mins"]);

    let url = format!("https://notion.so/{}", id.replace('-', ""));

    let mut task = Task::new(id, title, start)
        .with_description(description)
        .with_url(url);
    task.end = end;
    task.prepare_minutes = prepare_minutes;
    task.soft_stop_minutes = soft_stop_minutes;

    Ok(Some(task))
}

/// Case-insensitive property lookup: operators rename columns and the
/// accepted aliases differ only in casing across databases.
fn find_prop<'a>(props: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some((_, v)) = props
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(alias))
        {
            return Some(v);
        }
    }
    None
}

/// Non-negative minute offset, or None when absent/empty/negative.
fn number_prop(props: &Map<String, Value>, aliases: &[&str]) -> Option<i64> {
    find_prop(props, aliases)
        .and_then(|p| p["number"].as_f64())
        .map(|n| n as i64)
        .filter(|n| *n >= 0)
}

fn plain_text(parts: &[Value]) -> String {
    parts
        .iter()
        .filter_map(|p| p["plain_text"].as_str())
        .collect::<Vec<_>>()
        .join("")
}
