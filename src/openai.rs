//! OpenAI client construction shared by every service wrapper.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use tracing::warn;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Shorthand for the concrete client type.
pub type OpenAIClient = Client<OpenAIConfig>;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> OpenAIClient {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
///
/// The API key is read from `OPENAI_API_KEY` by `OpenAIConfig::default()`.
pub fn create_client_with_timeout(timeout: Duration) -> OpenAIClient {
    let http_client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        }
    };

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}
