//! Scripted HTTP stub server for exercising the protocol end to end.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use spotlyrics::{ClientOptions, Config};
use tokio::net::TcpListener;

pub const SERVER_TIME_PATH: &str = "/api/server-time";
pub const TOKEN_PATH: &str = "/api/token";
pub const SECRET_PATH: &str = "/secrets/secretDict.json";
pub const LYRICS_PREFIX: &str = "/color-lyrics/v2/track/";

pub const SERVER_TIME: i64 = 1_700_000_000;
pub const FAR_FUTURE_MS: i64 = 4_102_444_800_000;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.as_bytes().to_vec(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            delay: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn delayed(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    /// Lowercased header names.
    pub headers: HashMap<String, String>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.split('&').find_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            (k == name).then(|| urlencoding::decode(v).map(|s| s.into_owned()).unwrap_or_default())
        })
    }
}

#[derive(Default)]
struct Script {
    /// Replies are popped in order; the last one repeats.
    routes: HashMap<String, VecDeque<Reply>>,
    prefix_routes: Vec<(String, VecDeque<Reply>)>,
    requests: Vec<Recorded>,
}

impl Script {
    fn next_reply(&mut self, path: &str) -> Reply {
        fn pop(q: &mut VecDeque<Reply>) -> Option<Reply> {
            if q.len() > 1 { q.pop_front() } else { q.front().cloned() }
        }
        if let Some(q) = self.routes.get_mut(path) {
            return pop(q).unwrap_or_else(|| Reply::status(404));
        }
        for (prefix, q) in &mut self.prefix_routes {
            if path.starts_with(prefix.as_str()) {
                return pop(q).unwrap_or_else(|| Reply::status(404));
            }
        }
        Reply::status(404)
    }
}

#[derive(Clone)]
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<Mutex<Script>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(Script::default()));

        let router = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Replace the replies for an exact path.
    pub fn route(&self, path: &str, replies: Vec<Reply>) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), replies.into());
    }

    /// Replace the replies for every path under `prefix`.
    pub fn route_prefix(&self, prefix: &str, replies: Vec<Reply>) {
        let mut st = self.state.lock().unwrap();
        st.prefix_routes.retain(|(p, _)| p != prefix);
        st.prefix_routes.push((prefix.to_string(), replies.into()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path_prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .collect()
    }

    /// Happy-path routes for time, secret and token.
    pub fn with_token_routes(&self) {
        self.route(
            SERVER_TIME_PATH,
            vec![Reply::json(200, &format!(r#"{{"serverTime":{SERVER_TIME}}}"#))],
        );
        self.route(SECRET_PATH, vec![Reply::json(200, r#"{"7":[1,2],"8":[72]}"#)]);
        self.route(TOKEN_PATH, vec![Reply::json(200, &token_body("tok-1"))]);
    }

    /// Options pointing every endpoint at this server and every cache at `dir`.
    pub fn options(&self, dir: &Path) -> ClientOptions {
        let mut cfg = Config::default();
        cfg.spotify.sp_dc = Some("cookie-value".into());
        cfg.spotify.request_timeout_secs = 5;
        cfg.spotify.token_timeout_secs = 5;
        cfg.endpoints.server_time_url = self.url(SERVER_TIME_PATH);
        cfg.endpoints.token_url = self.url(TOKEN_PATH);
        cfg.endpoints.secret_dict_url = self.url(SECRET_PATH);
        cfg.endpoints.lyrics_base_url = self.url(LYRICS_PREFIX);
        cfg.paths.cache_dir = dir.to_path_buf();
        let mut opts = ClientOptions::from_config(&cfg).unwrap();
        opts.diagnostics_path = dir.join("token-error.json");
        opts
    }
}

pub fn token_body(token: &str) -> String {
    format!(
        r#"{{"clientId":"c","accessToken":"{token}","accessTokenExpirationTimestampMs":{FAR_FUTURE_MS},"isAnonymous":false}}"#
    )
}

pub const LYRICS_BODY: &str = r#"{"lyrics":{"syncType":"LINE_SYNCED","lines":[{"startTimeMs":"1000","words":"a","syllables":[],"endTimeMs":"0"},{"startTimeMs":"2500","words":"b","syllables":[],"endTimeMs":"0"}]},"colors":{"background":1}}"#;

async fn handle(
    State(state): State<Arc<Mutex<Script>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();
    let headers = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();

    let reply = {
        let mut st = state.lock().unwrap();
        st.requests.push(Recorded {
            method: method.to_string(),
            path: path.clone(),
            query: uri.query().unwrap_or_default().to_string(),
            headers,
        });
        st.next_reply(&path)
    };

    if let Some(d) = reply.delay {
        tokio::time::sleep(d).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = axum::http::Response::builder().status(status);
    for (k, v) in &reply.headers {
        builder = builder.header(k.as_str(), v.as_str());
    }
    builder
        .body(Body::from(reply.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
