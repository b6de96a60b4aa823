//! Blocked targets and the attempt log entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// What kind of distraction an entry or attempt refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    App,
    Website,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::App => "app",
            TargetKind::Website => "website",
        })
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "app" => Ok(TargetKind::App),
            "website" | "site" => Ok(TargetKind::Website),
            other => Err(format!("unknown target kind: {other}")),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedApp {
    pub id: String,
    pub name: String,
    /// Executable name as reported by the OS, e.g. `Steam.exe`.
    pub process_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl BlockedApp {
    /// Process names compare case-insensitively.
    pub fn matches(&self, process_name: &str) -> bool {
        self.process_name.eq_ignore_ascii_case(process_name.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedWebsite {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl BlockedWebsite {
    /// True when `visited` is on the blocked host or one of its subdomains.
    pub fn matches(&self, visited: &str) -> bool {
        match (host_of(&self.url), host_of(visited)) {
            (Some(blocked), Some(visited)) => {
                visited == blocked || visited.ends_with(&format!(".{blocked}"))
            }
            _ => false,
        }
    }
}

/// Normalized host of a URL or bare domain, without a leading `www.`.
pub fn host_of(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let parsed = if input.contains("://") {
        Url::parse(input)
    } else {
        Url::parse(&format!("http://{input}"))
    }
    .ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// One blocked access, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierAttempt {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: TargetKind,
    pub target: String,
}
