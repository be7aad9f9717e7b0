//! reqwest-backed [`RegistryApi`] for the target registry's REST admin API.

use std::time::Duration;

use async_trait::async_trait;
use rdekit_core::{ApiConfig, Command, TargetRegistrar};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RegistryApi, TldInfo};

/// HTTP client for the target registry.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

#[derive(Serialize)]
struct LinkBody<'a> {
    host_name: &'a str,
    sponsor: &'a str,
}

impl RegistryClient {
    /// Build a client from `config`. Every request carries `config.timeout`.
    ///
    /// `base_url` should be like `http://localhost:8080` (a trailing slash is dropped).
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, retrying transient failures with linear backoff.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut attempt = 0;
        loop {
            let mut req = self.client.request(method.clone(), url);
            if let Some(body) = body {
                req = req.json(body);
            }

            let result = req.send().await;
            let retryable = match &result {
                Ok(resp) => is_retryable_status(resp.status()),
                Err(e) => e.is_timeout() || e.is_connect(),
            };
            if !retryable || attempt >= self.max_retries {
                return Ok(result?);
            }

            attempt += 1;
            let delay = self.retry_backoff * attempt;
            match &result {
                Ok(resp) => warn!(url = %url, status = resp.status().as_u16(), attempt, "transient failure, retrying"),
                Err(e) => warn!(url = %url, error = %e, attempt, "request failed, retrying"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn expect_success(
        &self,
        resp: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify(status, body, what))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Map a non-success status to an error.
fn classify(status: StatusCode, body: String, what: &str) -> ApiError {
    if status == StatusCode::CONFLICT
        || (status.is_client_error() && body.to_ascii_lowercase().contains("already exists"))
    {
        return ApiError::AlreadyExists(what.to_string());
    }
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(what.to_string());
    }
    ApiError::Server {
        status: status.as_u16(),
        body,
    }
}

fn command_path(command: &Command) -> String {
    match command {
        Command::Contact(_) => "/contacts".to_string(),
        Command::Host(_) => "/hosts".to_string(),
        Command::Domain(_) => "/domains".to_string(),
        Command::Nndn(_) => "/nndns".to_string(),
        Command::LinkHost(l) => format!("/domains/{}/hosts", l.domain),
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn tld(&self, name: &str) -> Result<TldInfo, ApiError> {
        let url = self.url(&format!("/tlds/{name}"));
        info!(url = %url, "looking up TLD");
        let resp = self.send::<()>(Method::GET, &url, None).await?;
        let resp = self.expect_success(resp, &format!("tld {name}")).await?;
        Ok(resp.json().await?)
    }

    async fn list_registrars(&self) -> Result<Vec<TargetRegistrar>, ApiError> {
        let url = self.url("/registrars");
        let resp = self.send::<()>(Method::GET, &url, None).await?;
        let resp = self.expect_success(resp, "registrars").await?;
        let registrars: Vec<TargetRegistrar> = resp.json().await?;
        info!(count = registrars.len(), "fetched target registrars");
        Ok(registrars)
    }

    async fn registrar(&self, client_id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/registrars/{client_id}"));
        let resp = self.send::<()>(Method::GET, &url, None).await?;
        self.expect_success(resp, &format!("registrar {client_id}"))
            .await?;
        Ok(())
    }

    async fn submit(&self, command: &Command) -> Result<(), ApiError> {
        let url = self.url(&command_path(command));
        let key = command.key();
        debug!(url = %url, key = %key, "submitting command");

        let resp = match command {
            Command::Contact(c) => self.send(Method::POST, &url, Some(c)).await?,
            Command::Host(h) => self.send(Method::POST, &url, Some(h)).await?,
            Command::Domain(d) => self.send(Method::POST, &url, Some(d)).await?,
            Command::Nndn(n) => self.send(Method::POST, &url, Some(n)).await?,
            Command::LinkHost(l) => {
                let body = LinkBody {
                    host_name: &l.host_name,
                    sponsor: &l.sponsor,
                };
                self.send(Method::POST, &url, Some(&body)).await?
            }
        };
        self.expect_success(resp, &key).await?;
        Ok(())
    }
}
