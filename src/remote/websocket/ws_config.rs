use std::env;

use anyhow::{Context, Result, bail};
use url::Url;

pub const SERVICE_URL_VAR: &str = "HOOKSYNC_SERVICE_URL";

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: Url,
}

impl WebSocketConfig {
    pub fn from_env() -> Result<Self> {
        let raw = env::var(SERVICE_URL_VAR)
            .map_err(|_| anyhow::anyhow!("{SERVICE_URL_VAR} not set"))?;

        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid service url \"{raw}\""))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            bail!("service url must use ws or wss, got \"{}\"", url.scheme());
        }

        Ok(Self { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_websocket_urls() {
        let config = WebSocketConfig::parse("ws://127.0.0.1:7070/xlua").unwrap();
        assert_eq!(config.url.port(), Some(7070));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(WebSocketConfig::parse("http://127.0.0.1:7070").is_err());
        assert!(WebSocketConfig::parse("not a url").is_err());
    }
}
