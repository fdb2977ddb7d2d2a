//! Request/response surface
//!
//! Routing and status mapping for the JSON endpoints. Works on plain request
//! parts so it can be driven without a socket; `server` adapts hyper types
//! to and from `ApiRequest` / `ApiResponse`.

use crate::protocol::{rejection_message, ServerMessage};
use crate::state::{AppState, ResetError, Surface};
use folkvang_core::{KillReport, DEFAULT_WINDOW_HOURS};
use hyper::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

pub const SERVICE_NAME: &str = "Folkvang Boss Tracker";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Known paths and their descriptions, as listed by `GET /`
const ROUTES: &[(&str, &str)] = &[
    ("/", "This page"),
    ("/health", "Health check"),
    ("/api/status", "Boss status"),
    ("/api/kills", "Recent kills (?hours=N, default 2)"),
    ("/api/kill", "Report a kill (POST)"),
    ("/api/reset", "Reset all bosses (POST, X-Auth-Token)"),
    ("/ws", "WebSocket event channel"),
];

/// Inbound request, reduced to what the handlers look at
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub auth_token: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> ApiRequest<'a> {
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::GET,
            path,
            query: None,
            auth_token: None,
            body: &[],
        }
    }

    pub fn post(path: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: Method::POST,
            body,
            ..Self::get(path)
        }
    }

    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_auth_token(mut self, token: &'a str) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// First value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query?
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| percent_decode_str(value).decode_utf8().ok())
            .map(|value| value.into_owned())
    }
}

/// JSON response with status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message.into() })),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    /// Serialize `value`, mapping failure to a 500
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::ok(body),
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

/// Route a request to its handler
pub async fn dispatch(app: &AppState, req: ApiRequest<'_>) -> ApiResponse {
    if req.method == Method::OPTIONS {
        return ApiResponse::no_content();
    }

    match (&req.method, req.path) {
        (&Method::GET, "/") => index(app),
        (&Method::GET, "/health") => health(app),
        (&Method::GET, "/api/status") => ApiResponse::json(&app.queries.state()),
        (&Method::GET, "/api/kills") => recent_kills(app, &req),
        (&Method::POST, "/api/kill") => report_kill(app, req.body).await,
        (&Method::POST, "/api/reset") => reset(app, req.auth_token).await,
        (_, path) if ROUTES.iter().any(|(known, _)| *known == path) => {
            ApiResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
        _ => ApiResponse::error(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn index(app: &AppState) -> ApiResponse {
    let endpoints: serde_json::Map<String, Value> = ROUTES
        .iter()
        .map(|(path, description)| (path.to_string(), Value::from(*description)))
        .collect();
    ApiResponse::ok(json!({
        "status": "online",
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "timestamp": app.now(),
        "endpoints": endpoints,
    }))
}

fn health(app: &AppState) -> ApiResponse {
    ApiResponse::ok(json!({
        "status": "healthy",
        "timestamp": app.now(),
    }))
}

fn recent_kills(app: &AppState, req: &ApiRequest<'_>) -> ApiResponse {
    // Unparseable or negative values fall back to the default window
    let hours = req
        .query_param("hours")
        .and_then(|h| h.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_WINDOW_HOURS);
    let kills = app.queries.recent_kills(Some(hours));
    let count = kills.len();
    match serde_json::to_value(&kills) {
        Ok(kills) => ApiResponse::ok(json!({ "kills": kills, "count": count })),
        Err(e) => {
            error!(error = %e, "failed to serialize kills");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn report_kill(app: &AppState, body: &[u8]) -> ApiResponse {
    let value: Value = match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) if !fields.is_empty() => Value::Object(fields),
        _ => return ApiResponse::error(StatusCode::BAD_REQUEST, "No JSON data"),
    };
    let report: KillReport = match serde_json::from_value(value) {
        Ok(report) => report,
        Err(e) => {
            let message = format!("Invalid kill report: {}", e);
            return ApiResponse::error(StatusCode::BAD_REQUEST, message);
        }
    };

    let event = match app.report_kill(&report, Surface::Http) {
        Ok(event) => event,
        Err(err) => {
            return ApiResponse::error(StatusCode::BAD_REQUEST, rejection_message(&err));
        }
    };

    let data = serde_json::to_value(&event);
    app.hub.broadcast(&ServerMessage::BossUpdate(event)).await;
    match data {
        Ok(data) => ApiResponse::ok(json!({ "success": true, "data": data })),
        Err(e) => {
            error!(error = %e, "failed to serialize kill event");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn reset(app: &AppState, token: Option<&str>) -> ApiResponse {
    match app.reset_all(token).await {
        Ok(()) => ApiResponse::ok(json!({ "success": true })),
        Err(ResetError::Unauthorized) => {
            ApiResponse::error(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
        Err(ResetError::Failed) => {
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Reset failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::{Duration, TimeZone, Utc};
    use folkvang_core::{BossStore, ManualClock};
    use std::sync::Arc;

    fn app() -> AppState {
        AppState::new(Config {
            admin_token: "letmein".to_string(),
            ..Config::default()
        })
    }

    fn body(resp: &ApiResponse) -> &Value {
        resp.body.as_ref().unwrap()
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let app = app();
        let resp = dispatch(&app, ApiRequest::get("/")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(body(&resp)["status"], "online");
        assert_eq!(body(&resp)["service"], SERVICE_NAME);
        assert_eq!(body(&resp)["version"], SERVICE_VERSION);
        assert!(body(&resp)["endpoints"]["/api/kills"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let resp = dispatch(&app, ApiRequest::get("/health")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(body(&resp)["status"], "healthy");
        assert!(body(&resp)["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_kill_then_status() {
        let app = app();
        let (_id, mut rx) = app.hub.register().await;

        let payload = br#"{"floor": 1, "boss": "mage", "player": "Alice"}"#;
        let resp = dispatch(&app, ApiRequest::post("/api/kill", payload)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(body(&resp)["success"], true);
        assert_eq!(body(&resp)["data"]["action"], "boss_killed");
        assert_eq!(body(&resp)["data"]["player"], "Alice");
        assert_eq!(body(&resp)["data"]["respawn_minutes"], 120);

        // HTTP kills reach every event-channel client
        let ServerMessage::BossUpdate(event) = rx.try_recv().unwrap() else {
            panic!("expected boss_update");
        };
        assert_eq!(event.player, "Alice");

        let resp = dispatch(&app, ApiRequest::get("/api/status")).await;
        let record = &body(&resp)["floor1"]["mage"];
        assert_eq!(record["player"], "Alice");
        assert_eq!(record["kill_time"], serde_json::to_value(event.kill_time).unwrap());
        assert!(body(&resp)["floor1"]["healer"].is_null());
    }

    #[tokio::test]
    async fn test_kill_default_player() {
        let app = app();
        let payload = br#"{"floor": 2, "boss": "healer"}"#;
        let resp = dispatch(&app, ApiRequest::post("/api/kill", payload)).await;
        assert_eq!(body(&resp)["data"]["player"], "Player");
    }

    #[tokio::test]
    async fn test_kill_rejections() {
        let app = app();
        let (_id, mut rx) = app.hub.register().await;
        let cases: [(&[u8], &str); 8] = [
            (b"", "No JSON data"),
            (b"[1, 2]", "No JSON data"),
            (b"{}", "No JSON data"),
            (b"null", "No JSON data"),
            (br#"{"boss": "mage"}"#, "Missing floor or boss"),
            (br#"{"floor": 1}"#, "Missing floor or boss"),
            (br#"{"floor": 5, "boss": "mage"}"#, "Invalid floor or boss"),
            (br#"{"floor": 1, "boss": "dragon"}"#, "Invalid floor or boss"),
        ];
        for (payload, message) in cases {
            let resp = dispatch(&app, ApiRequest::post("/api/kill", payload)).await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST);
            assert_eq!(body(&resp)["error"], message);
        }

        let payload = br#"{"floor": true, "boss": "mage"}"#;
        let resp = dispatch(&app, ApiRequest::post("/api/kill", payload)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);

        assert_eq!(app.store.history_len(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_recent_kills_hours_param() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let app = AppState::with_store(
            Config::default(),
            Arc::new(BossStore::with_clock(clock.clone())),
        );
        app.store.record_kill(1, "mage", "early").unwrap();
        clock.advance(Duration::hours(3));
        app.store.record_kill(2, "mage", "late").unwrap();
        clock.advance(Duration::minutes(1));

        let resp = dispatch(&app, ApiRequest::get("/api/kills")).await;
        assert_eq!(body(&resp)["count"], 1);
        assert_eq!(body(&resp)["kills"][0]["player"], "late");

        let resp = dispatch(&app, ApiRequest::get("/api/kills").with_query("hours=4")).await;
        assert_eq!(body(&resp)["count"], 2);
        assert_eq!(body(&resp)["kills"][0]["player"], "late");
        assert_eq!(body(&resp)["kills"][1]["player"], "early");

        for fallback in ["hours=abc", "hours=-1", "hours="] {
            let resp = dispatch(&app, ApiRequest::get("/api/kills").with_query(fallback)).await;
            assert_eq!(body(&resp)["count"], 1, "query {}", fallback);
        }

        let resp = dispatch(&app, ApiRequest::get("/api/kills").with_query("hours=0")).await;
        assert_eq!(body(&resp)["count"], 0);
    }

    #[tokio::test]
    async fn test_recent_kills_largest_window() {
        let app = app();
        app.store.record_kill(1, "mage", "Alice").unwrap();

        for query in ["hours=3000000000", "hours=4294967295"] {
            let resp = dispatch(&app, ApiRequest::get("/api/kills").with_query(query)).await;
            assert_eq!(resp.status, StatusCode::OK, "query {}", query);
            assert_eq!(body(&resp)["count"], 1, "query {}", query);
        }
        assert_eq!(app.queries.recent_kills(Some(u32::MAX)).len(), 1);
    }

    #[tokio::test]
    async fn test_reset_wrong_then_right_token() {
        let app = app();
        let (_id, mut rx) = app.hub.register().await;
        let payload = br#"{"floor": 3, "boss": "berserk"}"#;
        dispatch(&app, ApiRequest::post("/api/kill", payload)).await;
        let _ = rx.try_recv();
        let before = app.store.snapshot();

        let wrong = ApiRequest::post("/api/reset", b"").with_auth_token("nope");
        let resp = dispatch(&app, wrong).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(body(&resp)["error"], "Unauthorized");
        assert_eq!(app.store.snapshot(), before);

        let resp = dispatch(&app, ApiRequest::post("/api/reset", b"")).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

        let right = ApiRequest::post("/api/reset", b"").with_auth_token("letmein");
        let resp = dispatch(&app, right).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(body(&resp)["success"], true);
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::reset_all());

        let resp = dispatch(&app, ApiRequest::get("/api/status")).await;
        let floors = body(&resp).as_object().unwrap();
        assert_eq!(floors.len(), 4);
        for floor in floors.values() {
            assert!(floor.as_object().unwrap().values().all(Value::is_null));
        }
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let app = app();
        let resp = dispatch(&app, ApiRequest::get("/api/nope")).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = dispatch(&app, ApiRequest::get("/api/kill")).await;
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);

        let mut preflight = ApiRequest::get("/api/kill");
        preflight.method = Method::OPTIONS;
        assert_eq!(dispatch(&app, preflight).await, ApiResponse::no_content());
    }

    #[test]
    fn test_query_param_decoding() {
        let req = ApiRequest::get("/").with_query("a=1&hours=%203&flag");
        assert_eq!(req.query_param("hours").as_deref(), Some(" 3"));
        assert_eq!(req.query_param("a").as_deref(), Some("1"));
        assert_eq!(req.query_param("flag").as_deref(), Some(""));
        assert_eq!(req.query_param("missing"), None);
    }
}
