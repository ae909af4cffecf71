use ahf_schemas::ErrorBody;

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Connection refused, reset, or the stream broke mid-read.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-2xx answer. `detail` is the backend's message when it sent one.
    #[error("server error status={status}: {detail}")]
    Server { status: u16, detail: String },
    /// Body did not match the expected schema.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn transport(e: impl std::fmt::Display) -> Self {
        ClientError::Transport(e.to_string())
    }

    /// Build a `Server` error from a response body, preferring `{ "detail": ... }`.
    pub fn from_error_body(status: u16, body: &[u8]) -> Self {
        let detail = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(b) => b.detail,
            Err(_) => {
                let raw = String::from_utf8_lossy(body).trim().to_string();
                if raw.is_empty() {
                    format!("HTTP {status}")
                } else {
                    raw
                }
            }
        };
        ClientError::Server { status, detail }
    }

    /// Message suitable for showing to a user verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_body_is_extracted() {
        let e = ClientError::from_error_body(404, br#"{"detail":"Portfolio not found"}"#);
        assert_eq!(
            e,
            ClientError::Server {
                status: 404,
                detail: "Portfolio not found".into()
            }
        );
        assert_eq!(e.user_message(), "Portfolio not found");
    }

    #[test]
    fn non_json_body_is_kept_raw() {
        let e = ClientError::from_error_body(502, b"Bad Gateway\n");
        assert_eq!(e.user_message(), "Bad Gateway");
        let empty = ClientError::from_error_body(500, b"");
        assert_eq!(empty.user_message(), "HTTP 500");
    }
}
