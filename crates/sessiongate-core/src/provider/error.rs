use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email address already in use")]
    EmailInUse,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not establish state subscription: {0}")]
    Subscription(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider rejected request: {code}")]
    Rejected { code: String },
}

/// Maximum length for error codes lifted from response bodies
const MAX_ERROR_CODE_LENGTH: usize = 200;

impl ProviderError {
    /// Truncate a wire error code to avoid logging excessive data
    fn truncate_code(code: &str) -> String {
        if code.len() <= MAX_ERROR_CODE_LENGTH {
            code.to_string()
        } else {
            format!("{}... (truncated)", &code[..MAX_ERROR_CODE_LENGTH])
        }
    }

    /// Map a non-success response to an error.
    ///
    /// The provider reports failures as a JSON envelope
    /// (`{"error": {"message": "EMAIL_EXISTS"}}`); the message is a stable
    /// code, sometimes suffixed with ` : <detail>`.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let code = Self::error_code(body)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        match code.as_str() {
            c if c.starts_with("EMAIL_EXISTS") => ProviderError::EmailInUse,
            c if c.starts_with("EMAIL_NOT_FOUND")
                || c.starts_with("INVALID_PASSWORD")
                || c.starts_with("INVALID_LOGIN_CREDENTIALS") =>
            {
                ProviderError::InvalidCredentials
            }
            _ => ProviderError::Rejected {
                code: Self::truncate_code(&code),
            },
        }
    }

    fn error_code(body: &str) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct Envelope {
            error: Body,
        }
        #[derive(serde::Deserialize)]
        struct Body {
            message: String,
        }

        serde_json::from_str::<Envelope>(body)
            .ok()
            .map(|e| e.error.message)
    }
}
