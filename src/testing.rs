//! In-memory transport used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oauth2::http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use oauth2::http::StatusCode;
use oauth2::url::Url;
use oauth2::{HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::api::transport::{Transport, TransportError};
use crate::api::Session;
use crate::client::{Credentials, LibCal};
use crate::oauth::TokenManager;

pub const TOKEN_PATH: &str = "/1.1/oauth/token";

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub url: Url,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn form(&self) -> HashMap<String, String> {
        oauth2::url::form_urlencoded::parse(&self.body)
            .into_owned()
            .collect()
    }
}

/// Serves canned responses per (method, path). Each queued response is used
/// once, except the last one which keeps answering.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(String, String), VecDeque<(u16, Value)>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_token() -> Arc<Self> {
        let fake = Self::new();
        fake.respond_token("token-1", Some(3600));
        fake
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .entry((method.to_owned(), path.to_owned()))
            .or_default()
            .push_back((status, body));
    }

    pub fn respond_token(&self, token: &str, expires_in: Option<u64>) {
        let mut body = json!({
            "access_token": token,
            "token_type": "Bearer",
            "scope": "rm_r sp_r sp_w",
        });
        if let Some(expires_in) = expires_in {
            body["expires_in"] = json!(expires_in);
        }
        self.respond("POST", TOKEN_PATH, 200, body);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.path() != TOKEN_PATH)
            .cloned()
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }

    pub fn last_request(&self, path: &str) -> Option<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.url.path() == path)
            .cloned()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = request.method.to_string();
        let path = request.url.path().to_owned();

        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_owned(),
            url: request.url.to_owned(),
            authorization: request
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
            body: request.body.to_owned(),
        });

        let (status, body) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&(method, path)) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) if !queue.is_empty() => queue[0].clone(),
                _ => (404, json!({"error": "no route"})),
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(HttpResponse {
            status_code: StatusCode::from_u16(status).unwrap(),
            headers,
            body: serde_json::to_vec(&body).unwrap(),
        })
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("https://library.test", "client", "secret").with_api_url("https://api.test")
}

pub fn session(fake: Arc<FakeTransport>) -> Session {
    let credentials = credentials();
    let tokens = TokenManager::new(&credentials, fake.clone()).unwrap();
    Session::new(credentials.base_url().to_owned(), tokens, fake)
}

pub fn client(fake: &Arc<FakeTransport>) -> LibCal {
    LibCal::with_transport(credentials(), fake.clone()).unwrap()
}
