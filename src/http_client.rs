use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::debug;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared client; the timeout of the first caller wins.
pub fn http_client(timeout_secs: u64) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build http client")
    })
}

pub fn fetch_feed(url: &str, timeout_secs: u64) -> Result<String> {
    let client = http_client(timeout_secs)?;
    let resp = client
        .get(url)
        .header(USER_AGENT, concat!("racedesk/", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "application/json")
        .send()
        .with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}: {body}"));
    }
    debug!(url, bytes = body.len(), "fetched feed");
    Ok(body)
}

/// Where a feed payload comes from: a URL or a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    File(PathBuf),
}

impl FeedSource {
    pub fn parse(arg: &str) -> Self {
        let trimmed = arg.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            FeedSource::Url(trimmed.to_string())
        } else {
            FeedSource::File(PathBuf::from(trimmed))
        }
    }

    pub fn read(&self, timeout_secs: u64) -> Result<String> {
        match self {
            FeedSource::Url(url) => fetch_feed(url, timeout_secs),
            FeedSource::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("read feed file {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_source_detects_urls() {
        assert_eq!(
            FeedSource::parse(" https://feeds.example.com/scr.json "),
            FeedSource::Url("https://feeds.example.com/scr.json".to_string())
        );
        assert_eq!(
            FeedSource::parse("data/scratchings.json"),
            FeedSource::File(PathBuf::from("data/scratchings.json"))
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let src = FeedSource::File(PathBuf::from("/definitely/not/here.json"));
        let err = src.read(5).expect_err("missing file");
        assert!(format!("{err:#}").contains("read feed file"));
    }
}
