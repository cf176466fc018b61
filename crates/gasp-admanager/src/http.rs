//! JSON-over-HTTP gateway client for the ad platform.
//!
//! Each endpoint maps to `POST {base_url}/{service}/{method}`:
//! - query body: `{"networkCode", "query", "values"}`
//! - create body: `{"networkCode", "objects"}`
//!
//! The gateway answers `{"results": [...]}` or `{"error": {"message", "code"?}}`.

use anyhow::Result;
use async_trait::async_trait;
use gasp_config::secrets::ResolvedSecrets;
use gasp_config::LoadedConfig;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RemoteError;
use crate::service::{AdManagerService, Endpoint, Statement};

/// Access token is resolved by the caller from the environment; never log it.
#[derive(Clone)]
pub struct HttpAdManagerClient {
    http: reqwest::Client,
    base_url: String,
    network_code: String,
    application_name: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpAdManagerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdManagerClient")
            .field("base_url", &self.base_url)
            .field("network_code", &self.network_code)
            .field("application_name", &self.application_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpAdManagerClient {
    pub fn new_with_base_url(base_url: String, network_code: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            network_code,
            application_name: "gasp".to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_application_name(mut self, name: String) -> Self {
        self.application_name = name;
        self
    }

    /// Build from `ad_manager.*` config keys plus the resolved access token.
    pub fn from_config(cfg: &LoadedConfig, secrets: &ResolvedSecrets) -> Result<Self> {
        let base_url = cfg.get_str("ad_manager.base_url")?;
        let network_code = cfg.get_str("ad_manager.network_code")?;
        let app = cfg.get_str_or_default("ad_manager.application_name")?;

        let mut client = Self::new_with_base_url(base_url, network_code).with_application_name(app);
        if let Some(token) = secrets.ad_manager_token.clone() {
            client = client.with_token(token);
        }
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.service,
            endpoint.method
        )
    }

    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Vec<Value>, RemoteError> {
        let mut req = self
            .http
            .post(self.endpoint_url(endpoint))
            .header("X-Application-Name", self.application_name.as_str())
            .json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("{endpoint}: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RemoteError::Transport(format!("{endpoint}: read body: {e}")))?;
        let parsed = serde_json::from_str::<GatewayResponse>(&text);

        if !status.is_success() {
            let message = match &parsed {
                Ok(body) => body.error_message(),
                Err(_) => text.trim().to_string(),
            };
            return Err(RemoteError::Api {
                status: Some(status.as_u16()),
                message: format!("{endpoint}: {message}"),
            });
        }

        let body =
            parsed.map_err(|e| RemoteError::Decode(format!("{endpoint}: response json: {e}")))?;
        if body.error.is_some() {
            return Err(RemoteError::Api {
                status: None,
                message: format!("{endpoint}: {}", body.error_message()),
            });
        }
        body.results
            .ok_or_else(|| RemoteError::Decode(format!("{endpoint}: response has no results")))
    }
}

#[async_trait]
impl AdManagerService for HttpAdManagerClient {
    async fn query(
        &self,
        endpoint: Endpoint,
        statement: &Statement,
    ) -> Result<Vec<Value>, RemoteError> {
        let body = json!({
            "networkCode": self.network_code,
            "query": statement.to_query(),
            "values": statement.bind_variables(),
        });
        self.post(endpoint, body).await
    }

    async fn create(
        &self,
        endpoint: Endpoint,
        objects: Vec<Value>,
    ) -> Result<Vec<Value>, RemoteError> {
        let body = json!({
            "networkCode": self.network_code,
            "objects": objects,
        });
        self.post(endpoint, body).await
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayResponse {
    results: Option<Vec<Value>>,
    error: Option<GatewayError>,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayError {
    message: Option<String>,
    code: Option<String>,
}

impl GatewayResponse {
    fn error_message(&self) -> String {
        match &self.error {
            Some(GatewayError {
                code: Some(c),
                message: Some(m),
            }) => format!("code={c} {m}"),
            Some(GatewayError {
                message: Some(m), ..
            }) => m.clone(),
            Some(GatewayError { code: Some(c), .. }) => format!("code={c}"),
            _ => "unknown".to_string(),
        }
    }
}

