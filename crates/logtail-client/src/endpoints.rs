//! Control server endpoint addressing.

use logtail_core::config::ServerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    tail_path: String,
    truncate_path: String,
    download_path: String,
}

impl Endpoints {
    pub fn new(
        base_url: impl Into<String>,
        tail_path: impl Into<String>,
        truncate_path: impl Into<String>,
        download_path: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            tail_path: tail_path.into(),
            truncate_path: truncate_path.into(),
            download_path: download_path.into(),
        }
    }

    #[must_use]
    pub fn from_config(server: &ServerConfig) -> Self {
        Self::new(
            server.base_url.clone(),
            server.tail_path.clone(),
            server.truncate_path.clone(),
            server.download_path.clone(),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn tail_url(&self) -> String {
        join(&self.base_url, &self.tail_path)
    }

    #[must_use]
    pub fn truncate_url(&self) -> String {
        join(&self.base_url, &self.truncate_path)
    }

    /// Address a viewer can open to fetch the whole remote log file.
    #[must_use]
    pub fn download_url(&self) -> String {
        join(&self.base_url, &self.download_path)
    }
}

fn join(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.to_owned();
    }
    format!("{base}/{path}")
}
