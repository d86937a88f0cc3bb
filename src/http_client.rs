//! Ready-made HTTP clients for the [`Reporter`].
//!
//! Available with the `reqwest-client*` features. Any other [`HttpClient`] works as well.
//!
//! [`HttpClient`]: opentelemetry_http::HttpClient
use crate::{Config, Error, Reporter};

/// Build an async reqwest client honoring the configured timeout.
pub fn reqwest_client(config: &Config) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(Error::HttpClient)
}

/// Build a blocking reqwest client honoring the configured timeout, for use with
/// [`Reporter::report_blocking`].
#[cfg(any(
    feature = "reqwest-blocking-client",
    feature = "reqwest-blocking-client-rustls"
))]
#[cfg_attr(
    docsrs,
    doc(cfg(any(
        feature = "reqwest-blocking-client",
        feature = "reqwest-blocking-client-rustls"
    )))
)]
pub fn reqwest_blocking_client(config: &Config) -> Result<reqwest::blocking::Client, Error> {
    reqwest::blocking::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(Error::HttpClient)
}

impl Reporter<reqwest::Client> {
    /// Create a reporter from environment variables (see [`Config::from_env`]) sending events with
    /// reqwest.
    pub fn from_env() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let client = reqwest_client(&config)?;
        Ok(Reporter::new(client, config))
    }
}
