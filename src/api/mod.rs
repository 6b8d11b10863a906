pub mod endpoint;
pub mod tables;
pub mod transport;

use std::collections::BTreeMap;
use std::sync::Arc;

use oauth2::http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use oauth2::url::Url;
use oauth2::HttpRequest;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::oauth::TokenManager;
use endpoint::{render, Endpoint, Verb};
use transport::Transport;

/// Named call arguments. There are no positional arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Map<String, Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_owned(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_owned(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Args {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Base URL, token manager and transport shared by every resource group.
pub(crate) struct Session {
    base_url: String,
    tokens: TokenManager,
    transport: Arc<dyn Transport>,
}

impl Session {
    pub(crate) fn new(base_url: String, tokens: TokenManager, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            tokens,
            transport,
        }
    }

    pub(crate) fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Runs one bound operation: path, parameters, bearer token, dispatch,
    /// status check and JSON decoding.
    pub(crate) async fn invoke(&self, endpoint: &Endpoint, args: &Args) -> Result<Value> {
        let path = endpoint.resolve_path(args)?;
        let params = endpoint.params(args)?;

        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        let mut headers = HeaderMap::new();

        let body = match endpoint.verb {
            Verb::Get => {
                if !params.is_empty() {
                    let mut query = url.query_pairs_mut();
                    for (name, value) in &params {
                        query.append_pair(name, &render(value));
                    }
                }
                vec![]
            }
            Verb::Post => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                serde_json::to_vec(&params)?
            }
        };

        let token = self.tokens.access_token().await?;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );

        tracing::debug!(operation = %endpoint.name, verb = %endpoint.verb, %url, "sending request");

        let response = self
            .transport
            .execute(HttpRequest {
                url,
                method: endpoint.verb.into(),
                headers,
                body,
            })
            .await?;

        let body = String::from_utf8_lossy(&response.body).into_owned();
        tracing::trace!(operation = %endpoint.name, status = %response.status_code, %body, "received response");

        if !response.status_code.is_success() {
            return Err(Error::Request {
                status: response.status_code.as_u16(),
                reason: response
                    .status_code
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_owned(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// A named table of endpoint descriptors bound to one session.
pub struct ResourceGroup {
    name: &'static str,
    session: Arc<Session>,
    endpoints: BTreeMap<String, Endpoint>,
}

impl ResourceGroup {
    pub(crate) fn new(name: &'static str, session: Arc<Session>, endpoints: Vec<Endpoint>) -> Self {
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| (endpoint.name.to_owned(), endpoint))
            .collect();

        Self {
            name,
            session,
            endpoints,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn endpoint(&self, operation: &str) -> Option<&Endpoint> {
        self.endpoints.get(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub async fn call(&self, operation: &str, args: Args) -> Result<Value> {
        let endpoint = self
            .endpoint(operation)
            .ok_or_else(|| Error::UnknownOperation(format!("{}.{}", self.name, operation)))?;

        self.session.invoke(endpoint, &args).await
    }
}

impl std::fmt::Debug for ResourceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGroup")
            .field("name", &self.name)
            .field("base_url", &self.session.base_url())
            .field("operations", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeTransport, TOKEN_PATH};

    fn group(fake: &Arc<FakeTransport>, endpoints: Vec<Endpoint>) -> ResourceGroup {
        let session = crate::testing::session(fake.clone());
        ResourceGroup::new("test", Arc::new(session), endpoints)
    }

    #[tokio::test]
    async fn test_get_sends_query_and_bearer_token() {
        let fake = FakeTransport::with_token();
        fake.respond("GET", "/1.1/space/locations", 200, json!([{"lid": 1, "name": "Main"}]));

        let group = group(
            &fake,
            vec![Endpoint::get("1.1/space/locations")
                .with_default("details", false)
                .with_default("admin_only", false)],
        );

        let result = group
            .call("locations", Args::new().with("details", true))
            .await
            .unwrap();
        assert_eq!(result, json!([{"lid": 1, "name": "Main"}]));

        let request = fake.last_request("/1.1/space/locations").unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.query("details").as_deref(), Some("1"));
        assert_eq!(request.query("admin_only").as_deref(), Some("0"));
        assert_eq!(request.authorization.as_deref(), Some("Bearer token-1"));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let fake = FakeTransport::with_token();
        fake.respond("POST", "/1.1/space/reserve", 200, json!({"booking_id": "cs_1"}));

        let group = group(
            &fake,
            vec![Endpoint::post("1.1/space/reserve")
                .require("start")
                .require("bookings")
                .omit("nickname")
                .with_default("test", false)],
        );

        let args = Args::new()
            .with("start", "2024-01-01T10:00:00+00:00")
            .with("bookings", json!([{"id": 5, "to": "2024-01-01T12:00:00+00:00"}]));
        group.call("reserve", args).await.unwrap();

        let request = fake.last_request("/1.1/space/reserve").unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.json(),
            json!({
                "start": "2024-01-01T10:00:00+00:00",
                "bookings": [{"id": 5, "to": "2024-01-01T12:00:00+00:00"}],
                "test": 0,
            })
        );
    }

    #[tokio::test]
    async fn test_missing_required_parameter_sends_nothing() {
        let fake = FakeTransport::with_token();
        let group = group(
            &fake,
            vec![Endpoint::get("1.1/events").require("cal_id")],
        );

        let err = group.call("events", Args::new()).await.unwrap_err();

        assert!(matches!(err, Error::MissingParameter { .. }));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let fake = FakeTransport::with_token();
        fake.respond("GET", "/1.1/calendars", 404, json!({"error": "not found"}));

        let group = group(&fake, vec![Endpoint::get("1.1/calendars")]);

        match group.call("calendars", Args::new()).await {
            Err(Error::Request {
                status,
                reason,
                body,
            }) => {
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
                assert_eq!(body, r#"{"error":"not found"}"#);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let fake = FakeTransport::with_token();
        let group = group(&fake, vec![Endpoint::get("1.1/calendars")]);

        assert!(matches!(
            group.call("nope", Args::new()).await,
            Err(Error::UnknownOperation(_))
        ));
        assert_eq!(group.operations().collect::<Vec<_>>(), vec!["calendars"]);
    }

    #[tokio::test]
    async fn test_token_is_reused_across_calls() {
        let fake = FakeTransport::with_token();
        fake.respond("GET", "/1.1/calendars", 200, json!([]));

        let group = group(&fake, vec![Endpoint::get("1.1/calendars")]);
        group.call("calendars", Args::new()).await.unwrap();
        group.call("calendars", Args::new()).await.unwrap();

        assert_eq!(fake.count(TOKEN_PATH), 1);
        assert_eq!(fake.count("/1.1/calendars"), 2);
    }
}
