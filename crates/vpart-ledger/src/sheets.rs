//! Google Sheets ledger backend.
//!
//! Rows are `label, filename, durationSeconds, status[, remote]` in columns A:E.
//! Reads fetch the whole range once; appends use `values:append` with
//! `INSERT_ROWS` so concurrent writers never overwrite each other's rows.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use vpart_models::{env, LedgerRecord};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{completed_labels, Ledger};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::{TokenCache, TokenSource};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Sheets ledger configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// Tab the ledger rows live in
    pub sheet_name: String,
    /// API root, overridable for emulators and tests
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: "Sheet1".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> LedgerResult<Self> {
        let spreadsheet_id = env::optional("SHEETS_SPREADSHEET_ID").ok_or_else(|| {
            LedgerError::config_error("SHEETS_SPREADSHEET_ID must be set to use the Sheets ledger")
        })?;

        Ok(Self {
            sheet_name: env::string_or("SHEETS_SHEET_NAME", "Sheet1"),
            base_url: env::string_or("SHEETS_BASE_URL", DEFAULT_BASE_URL),
            connect_timeout: Duration::from_secs(env::parse_or("SHEETS_CONNECT_TIMEOUT_SECS", 5)),
            retry: RetryConfig::from_env(),
            ..Self::new(spreadsheet_id)
        })
    }

    /// A1 range covering the ledger columns, quoting the tab name when needed.
    pub fn range(&self) -> String {
        let plain = self
            .sheet_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            format!("{}!A:E", self.sheet_name)
        } else {
            format!("'{}'!A:E", self.sheet_name.replace('\'', "''"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// [`Ledger`] stored in a Google spreadsheet.
pub struct SheetsLedger {
    http: Client,
    config: SheetsConfig,
    values_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl SheetsLedger {
    pub fn new(config: SheetsConfig, tokens: Arc<dyn TokenSource>) -> LedgerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vpart-ledger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let values_url = format!(
            "{}/{}/values/{}",
            config.base_url.trim_end_matches('/'),
            config.spreadsheet_id,
            urlencoding::encode(&config.range())
        );

        Ok(Self {
            http,
            config,
            values_url,
            tokens,
        })
    }

    /// Create from environment variables with service-account credentials.
    pub fn from_env() -> LedgerResult<Self> {
        let config = SheetsConfig::from_env()?;
        let auth = Self::create_auth_provider()?;
        Self::new(config, Arc::new(TokenCache::new(auth)))
    }

    /// Credentials from inline JSON in `GOOGLE_CREDENTIALS`, else the file
    /// named by `GOOGLE_APPLICATION_CREDENTIALS`.
    fn create_auth_provider() -> LedgerResult<Arc<dyn TokenProvider>> {
        if let Some(json) = env::optional("GOOGLE_CREDENTIALS") {
            let sa = CustomServiceAccount::from_json(&json).map_err(|e| {
                LedgerError::auth_error(format!("Invalid GOOGLE_CREDENTIALS: {}", e))
            })?;
            return Ok(Arc::new(sa));
        }

        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            LedgerError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(LedgerError::auth_error(
                "Neither GOOGLE_CREDENTIALS nor GOOGLE_APPLICATION_CREDENTIALS is set",
            )),
        }
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request with a bearer token, refreshing once on an expired token.
    async fn send_authorized<F>(&self, build: F) -> LedgerResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.access_token().await?;
        let response = build(&token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(LedgerError::from_http_status(401, body));
        }

        self.tokens.invalidate().await;
        let token = self.tokens.access_token().await?;
        Ok(build(&token).send().await?)
    }

    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> LedgerResult<T>
    where
        F: std::future::Future<Output = LedgerResult<T>>,
    {
        let span = info_span!(
            "ledger_request",
            operation = %operation,
            spreadsheet = %self.config.spreadsheet_id,
            sheet = %self.config.sheet_name
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> LedgerError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return LedgerError::RateLimited { retry_after_ms };
        }
        let body = response.text().await.unwrap_or_default();
        LedgerError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }

    async fn fetch_rows(&self) -> LedgerResult<Vec<Vec<String>>> {
        let url = &self.values_url;
        self.execute_request("list", async {
            let response = self
                .send_authorized(|token| self.http.get(url).bearer_auth(token))
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Self::handle_error_response(status, url, response).await);
            }

            let body = response.text().await?;
            let range: ValueRange = serde_json::from_str(&body)
                .map_err(|e| LedgerError::InvalidResponse(format!("values response: {}", e)))?;

            Ok(range
                .values
                .into_iter()
                .map(|row| row.into_iter().map(cell_to_string).collect())
                .collect())
        })
        .await
    }

    async fn append_row(&self, row: &[String]) -> LedgerResult<()> {
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url
        );
        let body = serde_json::json!({ "values": [row] });

        self.execute_request("append", async {
            let response = self
                .send_authorized(|token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Self::handle_error_response(status, &url, response).await);
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn list_completed_labels(&self) -> LedgerResult<HashSet<String>> {
        let rows = with_retry(&self.config.retry, "list", || self.fetch_rows()).await?;
        let records: Vec<LedgerRecord> = rows
            .iter()
            .filter_map(|row| LedgerRecord::from_row(row))
            .collect();
        debug!(rows = rows.len(), records = records.len(), "Read ledger sheet");
        Ok(completed_labels(&records))
    }

    async fn append(&self, record: &LedgerRecord) -> LedgerResult<()> {
        let row = record.to_row();
        with_retry(&self.config.retry, "append", || self.append_row(&row)).await
    }

    fn name(&self) -> &'static str {
        "sheets"
    }
}
