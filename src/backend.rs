use reqwest::header::{ACCEPT, CONTENT_RANGE};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

/// Columns a search term is matched against.
pub const SEARCH_FIELDS: [&str; 2] = ["file_name", "caption"];

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend answered with status {status}")]
    Status { status: u16, body: String },
    #[error("Backend unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("Backend rows are not a JSON array: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Everything needed to talk to the backend's REST interface.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// Collection endpoint, e.g. `https://ref.supabase.co/rest/v1/books`.
    pub endpoint:      Url,
    pub api_key:       String,
    pub order:         Option<String>,
    pub count_total:   bool,
    pub default_limit: u32,
    pub max_limit:     u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub search: Option<String>,
    pub limit:  u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendPage {
    pub rows:  Vec<Value>,
    pub total: Option<u64>,
}

/// Escape LIKE metacharacters so the term only ever matches itself.
///
/// `*` is rewritten to `%` by the backend before the pattern reaches SQL and has no escape,
/// so it is matched as a single arbitrary character instead.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Wrap a value in double quotes so `,.:()` lose their meaning in the filter grammar.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// The `or` filter matching `term` as a case-insensitive substring of any search field.
/// Blank terms produce no filter at all.
pub fn build_filter(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let pattern = quote(&format!("%{}%", escape_like(term)));
    let clauses = SEARCH_FIELDS
        .iter()
        .map(|field| format!("{field}.ilike.{pattern}"))
        .collect::<Vec<_>>();
    Some(format!("({})", clauses.join(",")))
}

/// Total row count from a `Content-Range` header such as `0-49/1234` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

impl BackendSettings {
    pub fn page_url(&self, query: &PageQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            if let Some(filter) = query.search.as_deref().and_then(build_filter) {
                pairs.append_pair("or", &filter);
            }
            if let Some(order) = &self.order {
                pairs.append_pair("order", order);
            }
            pairs.append_pair("limit", &query.limit.to_string());
            pairs.append_pair("offset", &query.offset.to_string());
        }
        url
    }

    /// Apply defaults and the upper bound to requested paging values.
    pub fn page_query(&self, search: Option<String>, limit: Option<u32>, offset: Option<u32>) -> PageQuery {
        PageQuery {
            search: search.filter(|s| !s.trim().is_empty()),
            limit:  limit.unwrap_or(self.default_limit).min(self.max_limit),
            offset: offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http:     reqwest::Client,
    settings: BackendSettings,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub async fn fetch_page(&self, query: &PageQuery) -> Result<BackendPage, BackendError> {
        let url = self.settings.page_url(query);
        info!("Fetching {url}");

        let key = &self.settings.api_key;
        let mut request = self
            .http
            .get(url)
            .header("apikey", key)
            .bearer_auth(key)
            .header(ACCEPT, "application/json");
        if self.settings.count_total {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await?;
        let status = response.status();
        info!("Backend responded with {status}");

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let body = response.text().await?;

        if !status.is_success() {
            error!("Backend error {status}: {body}");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Value> = serde_json::from_str(&body)?;
        info!("Fetched {} rows", rows.len());
        Ok(BackendPage { rows, total })
    }
}
