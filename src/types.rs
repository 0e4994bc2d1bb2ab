use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 镜像源定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    pub name: String, // 例如: "Aliyun"
    pub url: String,  // 例如: "https://mirrors.aliyun.com/pypi/simple/"
}

impl Mirror {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    /// URL comparison ignoring a trailing slash
    pub fn same_url(&self, url: &str) -> bool {
        self.url.trim_end_matches('/') == url.trim_end_matches('/')
    }
}

/// 测速结果
///
/// `success == false` always carries `f64::INFINITY` as latency; use the
/// constructors rather than building the struct by hand.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub mirror: Mirror,
    pub latency_secs: f64,
    pub success: bool,
}

impl ProbeResult {
    pub fn succeeded(mirror: Mirror, elapsed: Duration) -> Self {
        Self {
            mirror,
            latency_secs: elapsed.as_secs_f64(),
            success: true,
        }
    }

    pub fn failed(mirror: Mirror) -> Self {
        Self {
            mirror,
            latency_secs: f64::INFINITY,
            success: false,
        }
    }
}

/// One entry of `pip list --outdated --format=json`.
///
/// Only `name` is required; pip has changed the other keys between releases
/// and extra keys (e.g. `latest_filetype`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutdatedPackage {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
}

/// Subset of `pip show` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: Option<String>,
    pub location: Option<String>,
}

/// Interpreter layout reported by the Python side of `locate`
#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterInfo {
    pub executable: String,
    pub version: String,
    #[serde(default)]
    pub site_packages: Vec<String>,
    #[serde(default)]
    pub user_site: Option<String>,
}

/// Exit status plus captured stderr of an external command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub code: Option<i32>,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}
