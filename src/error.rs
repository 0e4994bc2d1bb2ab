use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mirror '{0}' not found. Use 'list' to see available mirrors.")]
    UnknownMirror(String),

    #[error("No mirror is available. Please check your network connection.")]
    NoAvailableEndpoint,

    #[error("pip install failed (exit code {}): {stderr}", fmt_code(.code))]
    InstallFailed { code: Option<i32>, stderr: String },

    #[error("pip query failed: {0}")]
    QueryFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn fmt_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
