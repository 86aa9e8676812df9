//! How update requests reach the server.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::types::{RequestBody, UpdateRequest};

pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("non-JSON response (HTTP {status}): {detail}")]
    NotJson { status: u16, detail: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Sends one update request and hands back the JSON body.
///
/// Any JSON body is returned whatever the HTTP status, so `success: false`
/// answers with 4xx codes reach the controller intact.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: UpdateRequest) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn post(&self, request: UpdateRequest) -> Result<Value, TransportError> {
        (**self).post(request).await
    }
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            bearer_token: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let transport = Self::new(config.base_url.clone());
        match &config.bearer_token {
            Some(token) => transport.with_bearer_token(token.clone()),
            None => transport,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: UpdateRequest) -> Result<Value, TransportError> {
        let mut builder = self.client.post(self.url(&request.path));

        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(csrf) = &request.csrf_header {
            builder = builder.header(CSRF_HEADER, csrf);
        }

        builder = match request.body {
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                        form.text(name, value)
                    });
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| TransportError::NotJson {
            status,
            detail: e.to_string(),
        })
    }
}
