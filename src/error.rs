//! Unified error types using thiserror

use std::process::ExitStatus;
use std::time::Duration;

use actix_web::http::StatusCode;
use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },
    #[error("server failed to start: {0}")]
    Startup(String),
    #[error(
        "command `{}` exited with {status}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}",
        argv.join(" ")
    )]
    ExternalCommand {
        argv: Vec<String>,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    #[error("directory trees differ:\n{0}")]
    TreeMismatch(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Tool lookup error: {0}")]
    Which(#[from] which::Error),
    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] wax::BuildError),
    #[error("Glob walk error: {0}")]
    GlobWalk(#[from] wax::WalkError),
    #[error("Other error: {0}")]
    Other(String),
}

impl HarnessError {
    pub(crate) fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout { what: what.into(), after }
    }
}

impl actix_web::ResponseError for HarnessError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                std::io::ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("{self}");
        }
        actix_web::HttpResponseBuilder::new(status)
            .insert_header(actix_web::http::header::ContentType::plaintext())
            .body(match status {
                StatusCode::NOT_FOUND => "404 Not Found".to_string(),
                _ => self.to_string(),
            })
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
