use crate::config::ReporterConfig;
use crate::model::{OutboundReport, PositionOwner, ReportAction};
use reqwest::{
    header::{HeaderValue, CONTENT_TYPE},
    Client, Method, Request, StatusCode, Url,
};
use serde::Serialize;
use serde_json::Value;
use std::{fmt, time::Duration};
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const ACTION_ADD_PATH: &str = "service/bookmark/action/add";
const API_VERSION: &str = "5.2.6";

/// Error code the endpoint returns when a concurrent-stream limit is hit. The
/// endpoint may pair it with an HTTP success status; the body is authoritative.
pub const CONCURRENCY_RESTRICTION_CODE: &str = "4001";

/// Client for the bookmark action-add endpoint. Request building and response
/// parsing are split out as pure steps so both are testable without a network.
#[derive(Clone, Debug)]
pub struct CollectorClient {
    http: Client,
    base_url: Url,
    partner_id: i64,
    ks: Option<String>,
    asset_type: String,
    client_tag: String,
}

#[derive(Clone, Debug)]
pub struct CollectorClientBuilder {
    base_url: String,
    partner_id: i64,
    ks: Option<String>,
    asset_type: String,
    timeout: Duration,
}

impl CollectorClientBuilder {
    pub fn new(base_url: impl Into<String>, partner_id: i64) -> Self {
        Self {
            base_url: base_url.into(),
            partner_id,
            ks: None,
            asset_type: crate::config::DEFAULT_ASSET_TYPE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn ks(mut self, ks: impl Into<String>) -> Self {
        self.ks = Some(ks.into());
        self
    }

    pub fn asset_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = asset_type.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<CollectorClient, CollectorError> {
        CollectorClient::from_parts(
            self.base_url,
            self.partner_id,
            self.ks,
            self.asset_type,
            self.timeout,
        )
    }
}

impl CollectorClient {
    pub fn builder(base_url: impl Into<String>, partner_id: i64) -> CollectorClientBuilder {
        CollectorClientBuilder::new(base_url, partner_id)
    }

    pub fn from_config(config: &ReporterConfig) -> Result<Self, CollectorError> {
        if !config.is_reporting_enabled() {
            return Err(CollectorError::Config(
                "reporting disabled: base_url and a positive partner_id are required",
            ));
        }
        let mut builder = Self::builder(
            config.base_url.clone().unwrap_or_default(),
            config.partner_id,
        )
        .asset_type(config.asset_type.clone());
        if let Some(ks) = config.ks.clone() {
            builder = builder.ks(ks);
        }
        builder.build()
    }

    fn from_parts(
        base_url: String,
        partner_id: i64,
        ks: Option<String>,
        asset_type: String,
        timeout: Duration,
    ) -> Result<Self, CollectorError> {
        if partner_id <= 0 {
            return Err(CollectorError::Config("partner id must be positive"));
        }
        if asset_type.trim().is_empty() {
            return Err(CollectorError::Config("asset type must not be empty"));
        }

        let mut parsed =
            Url::parse(base_url.trim()).map_err(|err| CollectorError::Url(err.to_string()))?;
        if !parsed.path().ends_with('/') {
            let new_path = format!("{}/", parsed.path().trim_end_matches('/'));
            parsed.set_path(&new_path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CollectorError::Http)?;

        Ok(Self {
            http,
            base_url: parsed,
            partner_id,
            ks,
            asset_type,
            client_tag: format!(
                "playback-beacon/{}:{}",
                env!("CARGO_PKG_VERSION"),
                Uuid::new_v4()
            ),
        })
    }

    /// Fires one report and classifies the acknowledgment. At-most-once: any
    /// transport failure surfaces as an error the caller logs and drops.
    pub async fn send(&self, report: &OutboundReport) -> Result<ActionAddOutcome, CollectorError> {
        let req = self.build_action_request(report)?;
        let resp = self.http.execute(req).await.map_err(CollectorError::Http)?;
        let status = resp.status();
        let body = resp.text().await.map_err(CollectorError::Http)?;
        Ok(parse_action_response(status, &body))
    }

    pub fn build_action_request(
        &self,
        report: &OutboundReport,
    ) -> Result<Request, CollectorError> {
        let url = self
            .base_url
            .join(ACTION_ADD_PATH)
            .map_err(|err| CollectorError::Url(err.to_string()))?;
        let body = ActionAddBody {
            partner_id: self.partner_id,
            ks: self.ks.as_deref(),
            client_tag: &self.client_tag,
            api_version: API_VERSION,
            asset_type: &self.asset_type,
            media_id: &report.media_id,
            action_type: report.action,
            position: report.position_secs,
            file_id: &report.file_id,
            position_owner: PositionOwner::Household,
            finished_watching: report.finished,
        };
        let bytes = serde_json::to_vec(&body).map_err(CollectorError::Json)?;
        self.http
            .request(Method::POST, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(bytes)
            .build()
            .map_err(CollectorError::Http)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionAddBody<'a> {
    partner_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ks: Option<&'a str>,
    client_tag: &'a str,
    api_version: &'a str,
    asset_type: &'a str,
    media_id: &'a str,
    action_type: ReportAction,
    position: u64,
    file_id: &'a str,
    position_owner: PositionOwner,
    finished_watching: bool,
}

/// Classified acknowledgment of one action-add call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionAddOutcome {
    /// The endpoint accepted the report.
    Accepted,
    /// The endpoint signaled the concurrency restriction; a valid business
    /// outcome, not a delivery failure.
    Restricted,
    /// Anything else. Logged and discarded upstream, never retried.
    Failed {
        status: StatusCode,
        code: Option<String>,
    },
}

/// The restriction code wins over the HTTP status: the endpoint is known to
/// return 200 with a structured error body.
pub fn parse_action_response(status: StatusCode, body: &str) -> ActionAddOutcome {
    let code = extract_error_code(body);
    if code.as_deref() == Some(CONCURRENCY_RESTRICTION_CODE) {
        return ActionAddOutcome::Restricted;
    }
    if status.is_success() && code.is_none() {
        return ActionAddOutcome::Accepted;
    }
    ActionAddOutcome::Failed { status, code }
}

/// The error object may sit at the top level or nested under `result`, and its
/// code may be a string or a number.
fn extract_error_code(body: &str) -> Option<String> {
    let root: Value = serde_json::from_str(body).ok()?;
    if let Some(code) = root.get("error").and_then(error_code) {
        return Some(code);
    }
    root.get("result")
        .and_then(|result| result.get("error"))
        .and_then(error_code)
}

fn error_code(error: &Value) -> Option<String> {
    match error.get("code") {
        Some(Value::String(code)) => Some(code.clone()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => None,
    }
}

#[derive(Debug)]
pub enum CollectorError {
    Config(&'static str),
    Url(String),
    Http(reqwest::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Url(err) => write!(f, "url error: {err}"),
            Self::Http(err) => write!(f, "http error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for CollectorError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CollectorClient {
        CollectorClient::builder("https://collector.example.test/api/v1", 1091)
            .ks("ks-123")
            .build()
            .unwrap()
    }

    fn hit_report() -> OutboundReport {
        OutboundReport {
            action: ReportAction::Hit,
            media_id: "m1".to_string(),
            file_id: "f1".to_string(),
            position_secs: 42,
            finished: false,
        }
    }

    #[test]
    fn action_request_targets_the_bookmark_service() {
        let req = client().build_action_request(&hit_report()).unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(
            req.url().as_str(),
            "https://collector.example.test/api/v1/service/bookmark/action/add"
        );
        assert_eq!(
            req.headers().get(CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("application/json")
        );
    }

    #[test]
    fn action_request_carries_the_report_fields() {
        let req = client().build_action_request(&hit_report()).unwrap();
        let body = req.body().unwrap().as_bytes().unwrap();
        let json: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["partnerId"], 1091);
        assert_eq!(json["ks"], "ks-123");
        assert_eq!(json["assetType"], "media");
        assert_eq!(json["mediaId"], "m1");
        assert_eq!(json["actionType"], "HIT");
        assert_eq!(json["position"], 42);
        assert_eq!(json["fileId"], "f1");
        assert_eq!(json["positionOwner"], "HOUSEHOLD");
        assert_eq!(json["finishedWatching"], false);
        assert!(json["clientTag"]
            .as_str()
            .unwrap()
            .starts_with("playback-beacon/"));
    }

    #[test]
    fn ks_is_omitted_when_absent() {
        let client = CollectorClient::builder("https://collector.example.test/", 7)
            .build()
            .unwrap();
        let req = client.build_action_request(&hit_report()).unwrap();
        let json: Value = serde_json::from_slice(req.body().unwrap().as_bytes().unwrap()).unwrap();
        assert!(json.get("ks").is_none());
    }

    #[test]
    fn builder_rejects_non_positive_partner_id() {
        let err = CollectorClient::builder("https://collector.example.test/", 0)
            .build()
            .unwrap_err();
        assert!(format!("{err}").contains("partner id"));
    }

    #[test]
    fn from_config_refuses_disabled_reporting() {
        let err = CollectorClient::from_config(&ReporterConfig::default()).unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[test]
    fn restriction_code_wins_over_http_success() {
        let outcome = parse_action_response(
            StatusCode::OK,
            r#"{ "result": { "error": { "code": "4001", "message": "Concurrency limitation" } } }"#,
        );
        assert_eq!(outcome, ActionAddOutcome::Restricted);
    }

    #[test]
    fn restriction_code_is_detected_as_number_and_at_top_level() {
        let outcome = parse_action_response(
            StatusCode::FORBIDDEN,
            r#"{ "error": { "code": 4001, "message": "Concurrency limitation" } }"#,
        );
        assert_eq!(outcome, ActionAddOutcome::Restricted);
    }

    #[test]
    fn plain_success_is_accepted() {
        let outcome = parse_action_response(StatusCode::OK, r#"{ "result": true }"#);
        assert_eq!(outcome, ActionAddOutcome::Accepted);
    }

    #[test]
    fn other_error_codes_pass_through_opaquely() {
        let outcome = parse_action_response(
            StatusCode::OK,
            r#"{ "result": { "error": { "code": "500016", "message": "expired" } } }"#,
        );
        assert_eq!(
            outcome,
            ActionAddOutcome::Failed {
                status: StatusCode::OK,
                code: Some("500016".to_string()),
            }
        );
    }

    #[test]
    fn http_failure_without_body_is_failed() {
        let outcome = parse_action_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(
            outcome,
            ActionAddOutcome::Failed {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: None,
            }
        );
    }
}
