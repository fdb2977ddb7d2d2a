//! Listener and per-connection plumbing
//!
//! One hyper HTTP/1 connection per accepted socket. Requests to the
//! event-channel paths are upgraded to WebSocket and handed to
//! [`session::run`]; everything else goes through [`api::dispatch`].

use crate::api::{self, ApiRequest, ApiResponse};
use crate::error::{Result, ServerError};
use crate::session;
use crate::state::AppState;
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

/// Paths that accept a WebSocket upgrade
pub const WS_PATHS: &[&str] = &["/ws", "/socket"];

/// Header carrying the admin credential
pub const AUTH_HEADER: &str = "x-auth-token";

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Bind the configured address and serve until the task is dropped
pub async fn run(app: Arc<AppState>) -> Result<()> {
    let addr = app.config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    serve(listener, app).await;
    Ok(())
}

/// Accept loop over an already-bound listener
pub async fn serve(listener: TcpListener, app: Arc<AppState>) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept error");
                continue;
            }
        };

        let app = app.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let app = app.clone();
                async move { handle_request(app, remote_addr, req).await }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service)
                .with_upgrades()
                .await
            {
                debug!(%remote_addr, error = %e, "connection error");
            }
        });
    }
}

async fn handle_request(
    app: Arc<AppState>,
    remote_addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    debug!(%remote_addr, method = %req.method(), %path, "request");

    if req.method() == Method::GET && WS_PATHS.contains(&path.as_str()) {
        return Ok(upgrade(app, req));
    }

    let method = req.method().clone();
    let query = req.uri().query().map(str::to_string);
    let auth_token = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(%remote_addr, error = %e, "failed to read request body");
            let resp = ApiResponse::error(StatusCode::BAD_REQUEST, "No JSON data");
            return Ok(into_response(resp));
        }
    };

    let request = ApiRequest {
        method,
        path: &path,
        query: query.as_deref(),
        auth_token: auth_token.as_deref(),
        body: &body,
    };

    let resp = match AssertUnwindSafe(api::dispatch(&app, request))
        .catch_unwind()
        .await
    {
        Ok(resp) => resp,
        Err(_) => {
            error!(%remote_addr, %path, "request handler panicked");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };
    Ok(into_response(resp))
}

/// Answer the handshake and hand the upgraded stream to a session
fn upgrade(app: Arc<AppState>, mut req: Request<Incoming>) -> Response<Full<Bytes>> {
    let accept = match accept_key(req.headers()) {
        Ok(accept) => accept,
        Err(e) => {
            debug!(error = %e, "rejected websocket handshake");
            let resp = ApiResponse::error(StatusCode::BAD_REQUEST, "Expected WebSocket upgrade");
            return into_response(resp);
        }
    };

    let on_upgrade = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let io = TokioIo::new(upgraded);
                let socket = WebSocketStream::from_raw_socket(io, Role::Server, None).await;
                session::run(socket, app).await;
            }
            Err(e) => warn!(error = %e, "websocket upgrade failed"),
        }
    });

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
    response
}

/// `Sec-WebSocket-Accept` value for a valid upgrade request
fn accept_key(headers: &HeaderMap) -> Result<HeaderValue> {
    let is_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    if !is_websocket {
        return Err(ServerError::Handshake("missing Upgrade: websocket".into()));
    }
    let key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .ok_or_else(|| ServerError::Handshake("missing Sec-WebSocket-Key".into()))?;
    HeaderValue::from_str(&derive_accept_key(key.as_bytes()))
        .map_err(|e| ServerError::Handshake(e.to_string()))
}

fn into_response(resp: ApiResponse) -> Response<Full<Bytes>> {
    let body = match &resp.body {
        Some(value) => Bytes::from(value.to_string()),
        None => Bytes::new(),
    };
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = resp.status;
    let headers = response.headers_mut();
    if resp.body.is_some() {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    add_cors_headers(headers);
    response
}

fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Auth-Token"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accept_key_known_vector() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        headers.insert(
            header::SEC_WEBSOCKET_KEY,
            HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="),
        );
        let accept = accept_key(&headers).unwrap();
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_accept_key_requires_upgrade_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            accept_key(&headers),
            Err(ServerError::Handshake(_))
        ));

        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(matches!(
            accept_key(&headers),
            Err(ServerError::Handshake(_))
        ));
    }

    #[test]
    fn test_into_response_sets_json_and_cors() {
        let response = into_response(ApiResponse::ok(json!({"status": "healthy"})));
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, X-Auth-Token"
        );
    }

    #[test]
    fn test_no_content_has_no_content_type() {
        let response = into_response(ApiResponse::no_content());
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
    }
}
