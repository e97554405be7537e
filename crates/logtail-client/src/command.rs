//! Remote log commands: truncate and download.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use logtail_core::config::ServerConfig;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::endpoints::Endpoints;
use crate::error::CommandError;

/// Commands the viewer can issue against the control server.
#[async_trait]
pub trait LogCommands: Send + Sync {
    /// Wipe the remote log file. `Ok` only when the server confirmed it.
    async fn truncate(&self) -> Result<(), CommandError>;
}

/// JSON body the control server answers commands with.
#[derive(Debug, Default, Deserialize)]
struct CommandReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl CommandReply {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

/// `LogCommands` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCommandClient {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpCommandClient {
    pub fn new(endpoints: Endpoints, server: &ServerConfig) -> Result<Self, CommandError> {
        let client = reqwest::Client::builder()
            .connect_timeout(server.connect_timeout())
            .timeout(server.request_timeout())
            .build()
            .map_err(|err| CommandError::Transport {
                url: endpoints.base_url().to_owned(),
                message: format!("build http client: {err}"),
            })?;
        Ok(Self { client, endpoints })
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch the whole remote log file into `path`. Returns bytes written.
    ///
    /// The file is only created once the server has answered with success.
    pub async fn download_to(&self, path: &Path) -> Result<u64, CommandError> {
        let url = self.endpoints.download_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| transport_error(&url, &err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejected(&url, status.as_u16(), &body));
        }

        let io_error = |err: std::io::Error| CommandError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        };
        let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| transport_error(&url, &err))?;
            file.write_all(&chunk).await.map_err(io_error)?;
            written = written.saturating_add(chunk.len() as u64);
        }
        file.flush().await.map_err(io_error)?;

        info!(url = %url, path = %path.display(), bytes = written, "log file downloaded");
        Ok(written)
    }
}

#[async_trait]
impl LogCommands for HttpCommandClient {
    async fn truncate(&self) -> Result<(), CommandError> {
        let url = self.endpoints.truncate_url();
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|err| transport_error(&url, &err))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let err = rejected(&url, status.as_u16(), &body);
            warn!(url = %url, error = %err, "truncate rejected");
            return Err(err);
        }

        let reply = CommandReply::parse(&body);
        info!(
            url = %url,
            reply = reply.message.as_deref().unwrap_or(""),
            "remote log truncated"
        );
        Ok(())
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> CommandError {
    CommandError::Transport {
        url: url.to_owned(),
        message: err.to_string(),
    }
}

fn rejected(url: &str, status: u16, body: &str) -> CommandError {
    let reply = CommandReply::parse(body);
    let detail = reply
        .error
        .or(reply.message)
        .unwrap_or_else(|| body.trim().to_owned());
    CommandError::Rejected {
        url: url.to_owned(),
        status,
        detail,
    }
}
