//! HTTP Client Pool for maintaining persistent connections per base URL.
//!
//! This module keeps one `reqwest::Client` per base URL so that every research task of a
//! run (and every run in the same process) reuses the same connection pool:
//! - HTTP connections are reused across the parallel fan-out
//! - DNS lookups and TLS handshakes are minimized
//!
//! The pool holds no credentials; API keys travel with each client instance.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

lazy_static! {
    /// Global HTTP client pool, lazily initialized on first access.
    static ref HTTP_CLIENT_POOL: Mutex<HashMap<String, reqwest::Client>> =
        Mutex::new(HashMap::new());
}

/// Get or create a shared HTTP client for the given base URL.
///
/// # Errors
///
/// Returns the builder error when the TLS backend cannot be initialised. Callers treat
/// this as a setup failure.
pub fn get_http_client(base_url: &str) -> Result<reqwest::Client, reqwest::Error> {
    let mut pool = HTTP_CLIENT_POOL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(client) = pool.get(base_url) {
        return Ok(client.clone());
    }

    let client = reqwest::ClientBuilder::new()
        // Keep idle connections alive for 90 seconds
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        // Wide fan-outs hit the same host at once
        .pool_max_idle_per_host(32)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        // Long essays take a while to generate
        .timeout(Duration::from_secs(300))
        .build()?;

    pool.insert(base_url.to_string(), client.clone());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_pool_caches_per_base_url() {
        let url = "https://api.anthropic.com";
        get_http_client(url).unwrap();
        get_http_client(url).unwrap();
        get_http_client("http://localhost:9999").unwrap();

        let pool = HTTP_CLIENT_POOL.lock().unwrap();
        assert!(pool.contains_key(url));
        assert!(pool.contains_key("http://localhost:9999"));
    }
}
