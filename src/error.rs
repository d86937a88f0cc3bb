use std::{error::Error as StdError, fmt::Debug};

/// Errors that occurred while reporting an exception.
///
/// None of these ever escape [`Reporter::report`](crate::Reporter::report) or
/// [`Reporter::report_async`](crate::Reporter::report_async). They are logged there and turned
/// into a `false` outcome. They are public so that configuration code and custom
/// [`JobQueue`](crate::JobQueue) implementations can use them.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The exception event failed to serialize to JSON.
    ///
    /// Note: This is an error in this crate. If you spot this, please open an issue.
    #[error("serializing upload request failed with {0}")]
    UploadSerializeRequest(serde_json::Error),

    /// Could not complete the HTTP request to PostHog. This covers connection errors, DNS
    /// failures and timeouts.
    #[error("sending upload request failed with {0}")]
    UploadConnection(Box<dyn StdError + Send + Sync + 'static>),

    /// PostHog answered with a status code other than 200.
    #[error("upload failed with status code {status_code}")]
    Upload {
        /// HTTP status code returned by the endpoint.
        status_code: u16,
    },

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(http::uri::InvalidUri),

    /// The configured endpoint is not an absolute `http` or `https` URL.
    #[error("unsupported endpoint {0:?}; only absolute http and https urls are supported")]
    UnsupportedEndpoint(String),

    /// A deferred job could not be serialized.
    #[error("serializing exception job failed with {0}")]
    JobSerialize(serde_json::Error),

    /// A deferred job payload could not be deserialized.
    #[error("deserializing exception job failed with {0}")]
    JobDeserialize(serde_json::Error),

    /// The job queue refused a deferred job.
    #[error("enqueueing exception job failed with {0}")]
    JobEnqueue(Box<dyn StdError + Send + Sync + 'static>),

    /// Reporting a deferred job panicked.
    #[error("exception job panicked: {0}")]
    JobPanicked(String),

    /// The bundled HTTP client could not be built.
    #[cfg(feature = "reqwest")]
    #[cfg_attr(docsrs, doc(cfg(feature = "reqwest-client")))]
    #[error("building http client failed with {0}")]
    HttpClient(reqwest::Error),
}
