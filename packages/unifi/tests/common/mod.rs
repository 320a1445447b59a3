//! Scripted transport shared by the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use unicert_unifi::{
    Credentials, HttpRequest, HttpResponse, Result, Session, Transport, UnifiError,
};

pub const BASE_URL: &str = "https://unifi.test";

/// Canned outcome for one request
#[derive(Clone, Debug)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Default)]
struct Script {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    requests: Vec<HttpRequest>,
}

/// Replies per `(method, path)`; the last queued reply repeats, unknown routes get 404
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| &request.method == method && request.url.path() == path)
            .collect()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut script = self.script.lock().unwrap();
        let key = (request.method.clone(), request.url.path().to_string());
        script.requests.push(request);

        let reply = match script.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(UnifiError::Network(message)),
            None => Ok(response(404, "Not Found")),
        }
    }
}

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

pub fn respond(status: u16, body: &str) -> Reply {
    Reply::Respond(response(status, body))
}

pub fn respond_with_headers(status: u16, body: &str, headers: &[(&str, &str)]) -> Reply {
    let mut response = response(status, body);
    for (name, value) in headers {
        response.headers.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    Reply::Respond(response)
}

pub fn fail(message: &str) -> Reply {
    Reply::Fail(message.to_string())
}

/// Unsigned JWT-shaped token carrying `claims`
pub fn jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub fn session(transport: &ScriptedTransport) -> Session<ScriptedTransport> {
    Session::new(
        BASE_URL,
        Credentials::new("admin", "hunter2"),
        transport.clone(),
    )
    .unwrap()
}

/// Session logged in to a UniFi OS console with a JWT session cookie
pub async fn unifi_os_session(transport: &ScriptedTransport) -> Session<ScriptedTransport> {
    let token = jwt(&serde_json::json!({ "csrfToken": "csrf-from-jwt", "userId": "u1" }));
    transport.on(
        Method::POST,
        "/api/auth/login",
        respond_with_headers(
            200,
            r#"{"unique_id":"u1"}"#,
            &[("set-cookie", &format!("TOKEN={token}; Path=/; Secure; HttpOnly"))],
        ),
    );
    let mut session = session(transport);
    session.login().await.unwrap();
    session
}

/// Session logged in through the legacy endpoint
pub async fn legacy_session(transport: &ScriptedTransport) -> Session<ScriptedTransport> {
    transport
        .on(Method::POST, "/api/auth/login", respond(404, "Not Found"))
        .on(
            Method::POST,
            "/api/login",
            respond_with_headers(
                200,
                r#"{"meta":{"rc":"ok"},"data":[]}"#,
                &[("set-cookie", "unifises=abc123; Path=/")],
            ),
        );
    let mut session = session(transport);
    session.login().await.unwrap();
    session
}

pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn body_json(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_deref().expect("request had no body")).unwrap()
}
