//! Typed client for the servicedeck API.
//!
//! The underlying HTTP client keeps a cookie jar, so a successful
//! [`ApiClient::login`] authorizes the mutating calls that follow it.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::protocol::{
    API_PREFIX, PATH_AUTH_STATUS, PATH_HEALTH, PATH_LOGIN, PATH_LOGOUT, PATH_SERVICES,
    PATH_SERVICE_STATUSES,
};
use shared::types::{
    AuthStatus, HealthResponse, HealthSnapshot, LoginRequest, LoginResponse, MessageResponse,
    ServiceInput, ServiceRecord, UserInfo,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success status
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3001`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        json(self.request(Method::GET, PATH_HEALTH).send().await?).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.request(Method::POST, PATH_LOGIN).json(&body).send().await?;
        let login: LoginResponse = json(response).await?;
        tracing::debug!("Logged in as {}", login.user.username);
        Ok(login.user)
    }

    pub async fn logout(&self) -> Result<()> {
        let response = self.request(Method::POST, PATH_LOGOUT).send().await?;
        let _: MessageResponse = json(response).await?;
        Ok(())
    }

    pub async fn auth_status(&self) -> Result<AuthStatus> {
        json(self.request(Method::GET, PATH_AUTH_STATUS).send().await?).await
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceRecord>> {
        json(self.request(Method::GET, PATH_SERVICES).send().await?).await
    }

    pub async fn service_statuses(&self) -> Result<Vec<HealthSnapshot>> {
        json(self.request(Method::GET, PATH_SERVICE_STATUSES).send().await?).await
    }

    pub async fn create_service(&self, input: &ServiceInput) -> Result<ServiceRecord> {
        let response = self.request(Method::POST, PATH_SERVICES).json(input).send().await?;
        json(response).await
    }

    pub async fn update_service(&self, id: &str, input: &ServiceInput) -> Result<ServiceRecord> {
        let path = format!("{}/{}", PATH_SERVICES, id);
        json(self.request(Method::PUT, &path).json(input).send().await?).await
    }

    pub async fn delete_service(&self, id: &str) -> Result<()> {
        let path = format!("{}/{}", PATH_SERVICES, id);
        check(self.request(Method::DELETE, &path).send().await?).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`ClientError::Api`], using the `{message}` body when present.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageResponse>(&text)
        .map(|m| m.message)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
    Err(ClientError::Api { status, message })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
    Ok(check(response).await?.json().await?)
}
