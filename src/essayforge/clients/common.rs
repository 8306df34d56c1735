use std::error::Error;
use std::fmt;

/// Errors raised by the network-backed clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The client could not be constructed (missing key, TLS backend failure).
    Setup(String),
    /// The request never produced an HTTP response.
    Http(String),
    /// The service answered with a non-success status.
    Status { code: u16, body: String },
    /// The response body did not have the expected shape.
    Decode(String),
    /// The service answered successfully but without any text.
    EmptyResponse,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Setup(msg) => write!(f, "Client setup failed: {}", msg),
            ClientError::Http(msg) => write!(f, "HTTP request failed: {}", msg),
            ClientError::Status { code, body } => {
                write!(f, "Service returned status {}: {}", code, body)
            }
            ClientError::Decode(msg) => write!(f, "Failed to decode response: {}", msg),
            ClientError::EmptyResponse => write!(f, "Service returned no text content"),
        }
    }
}

impl Error for ClientError {}

/// Cost of a call in USD given per-million token prices.
pub fn cost_for(
    input_tokens: usize,
    output_tokens: usize,
    input_per_million: f64,
    output_per_million: f64,
) -> f64 {
    (input_tokens as f64 / 1_000_000.0) * input_per_million
        + (output_tokens as f64 / 1_000_000.0) * output_per_million
}

/// Trim a response body so error messages stay readable in logs.
pub fn truncate_for_log(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max_chars).collect();
    out.push('…');
    out
}
