//! Access-token acquisition.
//!
//! Resolution order:
//! 1. an explicit token (`--access-token` / [`SyncConfig::access_token`](crate::SyncConfig))
//! 2. the `GOOGLE_DOCS_ACCESS_TOKEN` environment variable
//! 3. `gcloud auth application-default print-access-token`
//!
//! The first non-empty value wins. Tokens are never logged.

use crate::error::GdocsError;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Environment variable consulted when no explicit token is given.
pub const TOKEN_ENV_VAR: &str = "GOOGLE_DOCS_ACCESS_TOKEN";

/// OAuth scope required for reading and writing documents.
pub const DOCS_SCOPE: &str = "https://www.googleapis.com/auth/documents";

const GCLOUD_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Explicit,
    Environment,
    Gcloud,
}

/// Resolve a bearer token following the order documented on this module.
pub async fn resolve_access_token(explicit: Option<&str>) -> Result<(String, TokenSource), GdocsError> {
    if let Some(token) = non_empty(explicit.map(str::to_string)) {
        return Ok((token, TokenSource::Explicit));
    }
    if let Some(token) = non_empty(std::env::var(TOKEN_ENV_VAR).ok()) {
        debug!("Using access token from {}", TOKEN_ENV_VAR);
        return Ok((token, TokenSource::Environment));
    }
    let token = gcloud_access_token().await?;
    Ok((token, TokenSource::Gcloud))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ask gcloud for an application-default access token.
pub async fn gcloud_access_token() -> Result<String, GdocsError> {
    let args = ["auth", "application-default", "print-access-token"];
    let command: Vec<String> = std::iter::once("gcloud")
        .chain(args)
        .map(str::to_string)
        .collect();
    let operation = "obtaining an access token".to_string();

    debug!("Running {}", command.join(" "));
    let spawned = Command::new("gcloud").args(args).kill_on_drop(true).output();
    let output = match tokio::time::timeout(GCLOUD_TIMEOUT, spawned).await {
        Err(_) => {
            return Err(GdocsError::Gcloud {
                message: format!("gcloud did not answer within {}s", GCLOUD_TIMEOUT.as_secs()),
                operation,
                command,
            })
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GdocsError::CredentialsUnavailable {
                hint: format!(
                    "Pass --access-token, set {TOKEN_ENV_VAR}, or install the gcloud CLI and run:\n  \
                     gcloud auth application-default login --scopes={DOCS_SCOPE}"
                ),
            })
        }
        Ok(Err(e)) => {
            return Err(GdocsError::Gcloud {
                message: format!("failed to run gcloud: {e}"),
                operation,
                command,
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GdocsError::Gcloud {
            message: gcloud_failure_message(output.status.code(), &stderr),
            operation,
            command,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(token) => Ok(token.to_string()),
        None => Err(GdocsError::Gcloud {
            message: "gcloud printed no access token".into(),
            operation,
            command,
        }),
    }
}

fn gcloud_failure_message(code: Option<i32>, stderr: &str) -> String {
    let detail = stderr.trim();
    let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    if detail.is_empty() {
        format!("gcloud exited with status {status}")
    } else {
        format!("gcloud exited with status {status}: {detail}")
    }
}
