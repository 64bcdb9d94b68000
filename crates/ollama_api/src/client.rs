use async_trait::async_trait;
use chat_provider::{ChatProvider, ChatReply, ChatRequest, ProviderError};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::OllamaApiConfig;
use crate::error::{classify_status, transport_error};
use crate::payload::{AuthBody, ModelsBody};
use crate::url::normalize_base_url;

pub const RESPONSE_PATH: &str = "/api/v1/response";
pub const MODELS_PATH: &str = "/api/v1/models";
pub const AUTH_PATH: &str = "/api/v1/auth";

/// Backend HTTP client.
///
/// Stateless with respect to credentials: the caller passes one per request
/// and it is attached as a bearer token.
#[derive(Debug)]
pub struct OllamaApiClient {
    http: Client,
    config: OllamaApiConfig,
}

impl OllamaApiClient {
    pub fn new(config: OllamaApiConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder.build().map_err(transport_error)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaApiConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", normalize_base_url(&self.config.base_url))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|error| ProviderError::Transport(format!("malformed response body: {error}")))
    }
}

fn with_credential(builder: RequestBuilder, credential: Option<&str>) -> RequestBuilder {
    match credential {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

#[async_trait]
impl ChatProvider for OllamaApiClient {
    async fn auth_required(&self) -> Result<bool, ProviderError> {
        let response = self
            .http
            .get(self.endpoint(AUTH_PATH))
            .send()
            .await
            .map_err(transport_error)?;
        let body: AuthBody = Self::read_json(response).await?;
        Ok(body.required)
    }

    async fn chat(
        &self,
        request: ChatRequest,
        credential: Option<&str>,
    ) -> Result<ChatReply, ProviderError> {
        let builder = self.http.post(self.endpoint(RESPONSE_PATH)).json(&request);
        let response = with_credential(builder, credential)
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_json(response).await
    }

    async fn list_models(&self, credential: Option<&str>) -> Result<Vec<String>, ProviderError> {
        let builder = self.http.get(self.endpoint(MODELS_PATH));
        let response = with_credential(builder, credential)
            .send()
            .await
            .map_err(transport_error)?;
        let body: ModelsBody = Self::read_json(response).await?;
        tracing::debug!(count = body.models.len(), "fetched model list");
        Ok(body.models)
    }
}
