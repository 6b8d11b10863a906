use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, RequestTokenError, TokenResponse, TokenUrl};
use serde_json::Value;

use crate::api::transport::{Transport, TransportError};
use crate::client::Credentials;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Vec<String>,
}

impl Token {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Holds the bearer token obtained through the client-credentials grant.
///
/// The lock only guards reads and writes of the cached token. Two callers
/// that both find it expired will both refresh; the last response wins.
pub struct TokenManager {
    client: BasicClient,
    transport: Arc<dyn Transport>,
    token: Mutex<Option<Token>>,
}

impl TokenManager {
    pub fn new(credentials: &Credentials, transport: Arc<dyn Transport>) -> Result<Self> {
        let auth_url = AuthUrl::new(format!("{}1.1/oauth/authorize", credentials.api_url()))?;
        let token_url = TokenUrl::new(format!("{}1.1/oauth/token", credentials.api_url()))?;

        let client = BasicClient::new(
            ClientId::new(credentials.client_id().to_owned()),
            Some(ClientSecret::new(credentials.client_secret().to_owned())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody);

        Ok(Self {
            client,
            transport,
            token: Mutex::new(None),
        })
    }

    /// Returns the cached token, requesting a new one when none is held or
    /// the cached one has expired.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.current(Utc::now()) {
            return Ok(token.access_token);
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.to_owned();
        *self.lock() = Some(token);

        Ok(access_token)
    }

    pub fn scope(&self) -> Vec<String> {
        self.lock()
            .as_ref()
            .map(|token| token.scope.clone())
            .unwrap_or_default()
    }

    fn current(&self, now: DateTime<Utc>) -> Option<Token> {
        self.lock()
            .as_ref()
            .filter(|token| !token.is_expired(now))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Token>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_token(&self) -> Result<Token> {
        tracing::debug!("requesting access token");

        // Kept so an error payload is reported verbatim.
        let mut raw_body = Vec::new();
        let raw = &mut raw_body;
        let transport = &self.transport;

        let result = self
            .client
            .exchange_client_credentials()
            .request_async(move |request| async move {
                let response = transport.execute(request).await?;
                *raw = response.body.clone();
                Ok::<_, TransportError>(response)
            })
            .await;

        let response = result.map_err(|err| match err {
            RequestTokenError::ServerResponse(_) => {
                Error::Authorization(String::from_utf8_lossy(&raw_body).into_owned())
            }
            RequestTokenError::Parse(_, body) => rejected_or_unexpected(&body),
            RequestTokenError::Request(err) => Error::Transport(err),
            RequestTokenError::Other(message) => Error::UnexpectedResponse(message),
        })?;

        let now = Utc::now();
        // Without a reported lifetime the token counts as expired right away.
        let expires_at = response
            .expires_in()
            .and_then(|lifetime| Duration::from_std(lifetime).ok())
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(now);

        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|scope| scope.as_str().to_owned()).collect())
            .unwrap_or_default();

        tracing::debug!(%expires_at, "received access token");

        Ok(Token {
            access_token: response.access_token().secret().to_owned(),
            expires_at,
            scope,
        })
    }
}

fn rejected_or_unexpected(body: &[u8]) -> Error {
    let text = String::from_utf8_lossy(body).into_owned();

    match serde_json::from_slice::<Value>(body) {
        Ok(payload) if payload.get("error").is_some() => Error::Authorization(text),
        _ => Error::UnexpectedResponse(text),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{credentials, FakeTransport, TOKEN_PATH};

    fn manager(fake: &Arc<FakeTransport>) -> TokenManager {
        TokenManager::new(&credentials(), fake.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_first_call_requests_token() {
        let fake = FakeTransport::with_token();
        let tokens = manager(&fake);

        assert!(tokens.scope().is_empty());
        assert_eq!(tokens.access_token().await.unwrap(), "token-1");
        assert_eq!(tokens.scope(), vec!["rm_r", "sp_r", "sp_w"]);

        let request = fake.last_request(TOKEN_PATH).unwrap();
        assert_eq!(request.method, "POST");
        let form = request.form();
        assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
        assert_eq!(form.get("client_id").map(String::as_str), Some("client"));
        assert_eq!(form.get("client_secret").map(String::as_str), Some("secret"));
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let fake = FakeTransport::with_token();
        let tokens = manager(&fake);

        tokens.access_token().await.unwrap();
        tokens.access_token().await.unwrap();
        tokens.access_token().await.unwrap();

        assert_eq!(fake.count(TOKEN_PATH), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_replaced() {
        let fake = FakeTransport::new();
        fake.respond_token("token-1", Some(3600));
        fake.respond_token("token-2", Some(3600));
        let tokens = manager(&fake);

        assert_eq!(tokens.access_token().await.unwrap(), "token-1");

        if let Some(token) = tokens.lock().as_mut() {
            token.expires_at = Utc::now() - Duration::seconds(1);
        }

        assert_eq!(tokens.access_token().await.unwrap(), "token-2");
        assert_eq!(fake.count(TOKEN_PATH), 2);
    }

    #[tokio::test]
    async fn test_missing_lifetime_expires_immediately() {
        let fake = FakeTransport::new();
        fake.respond_token("token-1", None);
        let tokens = manager(&fake);

        tokens.access_token().await.unwrap();

        let cached = tokens.lock().clone().unwrap();
        assert!(cached.is_expired(cached.expires_at + Duration::milliseconds(1)));
        assert!(tokens.current(Utc::now() + Duration::seconds(1)).is_none());
    }

    #[tokio::test]
    async fn test_error_payload_is_authorization_error() {
        let fake = FakeTransport::new();
        fake.respond(
            "POST",
            TOKEN_PATH,
            401,
            json!({"error": "invalid_client", "error_description": "bad secret", "hint": "check id"}),
        );
        let tokens = manager(&fake);

        match tokens.access_token().await {
            Err(Error::Authorization(payload)) => {
                let payload: Value = serde_json::from_str(&payload).unwrap();
                assert_eq!(
                    payload,
                    json!({"error": "invalid_client", "error_description": "bad secret", "hint": "check id"})
                );
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_field_with_ok_status_is_authorization_error() {
        let fake = FakeTransport::new();
        fake.respond("POST", TOKEN_PATH, 200, json!({"error": "unauthorized"}));
        let tokens = manager(&fake);

        match tokens.access_token().await {
            Err(Error::Authorization(payload)) => {
                assert_eq!(payload, r#"{"error":"unauthorized"}"#);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(tokens.scope().is_empty());
    }
}
