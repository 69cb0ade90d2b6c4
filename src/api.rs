// API client module: a small blocking HTTP client for the GTR endpoints of
// the NCBI submission portal. Every call is synchronous and returns the raw
// status and body; deciding what a non-2xx status means is left to the
// caller.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Config;

/// Target environment of the portal. It is the first path segment of every
/// endpoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    #[value(name = "api")]
    Api,
    #[value(name = "apitest")]
    ApiTest,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Api => "api",
            Mode::ApiTest => "apitest",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrapper the portal requires around all submitted content. It always
/// carries exactly one `AddData` action aimed at GTR.
#[derive(Serialize, Debug)]
pub struct ActionEnvelope<'a> {
    pub actions: [AddData<'a>; 1],
}

#[derive(Serialize, Debug)]
pub struct AddData<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "targetDb")]
    pub target_db: &'static str,
    pub data: Content<'a>,
}

#[derive(Serialize, Debug)]
pub struct Content<'a> {
    pub content: &'a Value,
}

impl<'a> ActionEnvelope<'a> {
    pub fn add_data(payload: &'a Value) -> Self {
        ActionEnvelope {
            actions: [AddData {
                kind: "AddData",
                target_db: "GTR",
                data: Content { content: payload },
            }],
        }
    }
}

/// Payload asking the portal to delete the test record with `accession`.
pub fn deletion_payload(accession: &str) -> Value {
    json!({ "testDeletion": { "gtrAccession": accession } })
}

/// Status code and body text of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub text: String,
}

/// Blocking client holding the configured base URL. The API key travels
/// as a default header so it is attached to every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(&config.api_key)
            .context("API key contains characters not allowed in an HTTP header")?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static("sp-api-key"), key);

        // The blocking client defaults to a 30s timeout; pass ours through
        // explicitly so `None` really means no limit.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn submissions_url(&self, mode: Mode, dry_run: bool) -> String {
        let url = format!("{}/{}/v1/submissions/", self.base_url, mode);
        if dry_run {
            url + "?dry-run=true"
        } else {
            url
        }
    }

    pub fn actions_url(&self, mode: Mode, submission_id: &str) -> String {
        format!(
            "{}/{}/v1/submissions/{}/actions/",
            self.base_url, mode, submission_id
        )
    }

    /// POST `payload` wrapped in an `ActionEnvelope`.
    pub fn submit(&self, mode: Mode, payload: &Value, dry_run: bool) -> Result<ApiResponse> {
        let url = self.submissions_url(mode, dry_run);
        tracing::debug!(%url, "POST submission");
        let res = self
            .client
            .post(&url)
            .json(&ActionEnvelope::add_data(payload))
            .send()
            .with_context(|| format!("Failed to send submission to {}", url))?;
        Self::finish(res, &url)
    }

    /// GET the action list of a submission.
    pub fn get_actions(&self, mode: Mode, submission_id: &str) -> Result<ApiResponse> {
        let url = self.actions_url(mode, submission_id);
        tracing::debug!(%url, "GET submission actions");
        let res = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;
        Self::finish(res, &url)
    }

    fn finish(res: reqwest::blocking::Response, url: &str) -> Result<ApiResponse> {
        let status = res.status().as_u16();
        tracing::info!(status, url, "response received");
        let text = res
            .text()
            .with_context(|| format!("Failed to read response body from {}", url))?;
        Ok(ApiResponse { status, text })
    }
}
