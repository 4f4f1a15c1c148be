use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceKind {
    Simulated,
    #[clap(name = "websocket")]
    WebSocket,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulated => write!(f, "simulated"),
            Self::WebSocket => write!(f, "websocket"),
        }
    }
}

impl FromStr for ServiceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simulated" | "sim" | "local" => Ok(Self::Simulated),
            "websocket" | "ws" => Ok(Self::WebSocket),
            other => Err(anyhow!("unknown service kind: {other}")),
        }
    }
}
