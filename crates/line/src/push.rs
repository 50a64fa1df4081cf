use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use url::Url;

/// Client for the LINE Messaging API endpoints the relay depends on.
///
/// The channel access token is passed per call rather than stored here, so a
/// process started without one still constructs the client and fails only
/// when a delivery is actually attempted.
#[derive(Clone)]
pub struct LineClient {
    http: Client,
    base_url: Url,
}

impl LineClient {
    /// Creates a new client against the provided API base URL.
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { http, base_url }
    }

    /// Pushes a single text message to the given user.
    pub async fn push_message(
        &self,
        access_token: &str,
        to: &str,
        text: &str,
    ) -> Result<(), LineError> {
        let url = self.base_url.join("v2/bot/message/push")?;
        let body = serde_json::json!({
            "to": to,
            "messages": [{"type": "text", "text": text}],
        });

        let response = self
            .authorized_request(Method::POST, url, access_token)
            .json(&body)
            .send()
            .await?;

        ensure_success(response).await
    }

    /// Fetches the bot profile, used as a connectivity/token check.
    pub async fn bot_info(&self, access_token: &str) -> Result<BotInfo, LineError> {
        let url = self.base_url.join("v2/bot/info")?;
        let response = self
            .authorized_request(Method::GET, url, access_token)
            .send()
            .await?;

        parse_json(response).await
    }

    fn authorized_request(
        &self,
        method: Method,
        url: Url,
        access_token: &str,
    ) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {access_token}"))
    }
}

/// Bot profile returned by `GET /v2/bot/info`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BotInfo {
    pub user_id: String,
    pub basic_id: String,
    pub display_name: String,
}

/// Errors produced by the LINE client.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn ensure_success(response: Response) -> Result<(), LineError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(LineError::Status { status, body });
    }
    Ok(())
}

async fn parse_json<T>(response: Response) -> Result<T, LineError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(LineError::Status { status, body });
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(base_url: &Url) -> LineClient {
        LineClient::new(
            base_url.clone(),
            Client::builder().build().expect("client"),
        )
    }

    #[tokio::test]
    async fn push_message_sends_bearer_and_payload() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/bot/message/push")
                    .header("Authorization", "Bearer token")
                    .json_body(json!({
                        "to": "U1",
                        "messages": [{"type": "text", "text": "hello"}]
                    }));
                then.status(200).json_body(json!({}));
            })
            .await;

        client
            .push_message("token", "U1", "hello")
            .await
            .expect("push message");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bot_info_parses_profile() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/bot/info")
                    .header("Authorization", "Bearer token");
                then.status(200).json_body(json!({
                    "userId": "Ubot",
                    "basicId": "@myshop",
                    "displayName": "My Shop",
                    "chatMode": "bot"
                }));
            })
            .await;

        let info = client.bot_info("token").await.expect("bot info");
        mock.assert_async().await;

        assert_eq!(info.user_id, "Ubot");
        assert_eq!(info.basic_id, "@myshop");
        assert_eq!(info.display_name, "My Shop");
    }

    #[tokio::test]
    async fn error_status_returns_message() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/bot/message/push");
                then.status(401)
                    .body("{\"message\":\"invalid token\"}");
            })
            .await;

        let err = client
            .push_message("bad-token", "U1", "hello")
            .await
            .expect_err("should error");
        match err {
            LineError::Status { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert!(body.contains("invalid token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
