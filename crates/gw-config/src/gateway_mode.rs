use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Where the gateway the desktop app talks to lives.
///
/// In `Remote` mode the app connects to a gateway on another host and must
/// never spawn or supervise a local one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Local,
    Remote,
}

impl GatewayMode {
    pub fn is_remote(self) -> bool {
        matches!(self, GatewayMode::Remote)
    }
}

impl FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(GatewayMode::Local),
            "remote" => Ok(GatewayMode::Remote),
            other => Err(format!("unknown gateway mode '{other}'")),
        }
    }
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayMode::Local => write!(f, "local"),
            GatewayMode::Remote => write!(f, "remote"),
        }
    }
}
