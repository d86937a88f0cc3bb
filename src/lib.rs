//! An exception reporting client for [PostHog error tracking].
//!
//! [PostHog error tracking]: https://posthog.com/docs/error-tracking
//!
//! **Disclaimer**: This is not an official PostHog product.
//!
//! # Usage
//!
//! Create a [`Reporter`] once at startup and share it (it is cheap to clone):
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest-client")]
//! # async fn run() -> Result<(), posthog_exceptions::Error> {
//! use posthog_exceptions::{CapturedException, Config, Context, Reporter};
//!
//! let config = Config::new("phc_...").with_environment("production");
//! let client = posthog_exceptions::http_client::reqwest_client(&config)?;
//! let reporter = Reporter::new(client, config);
//!
//! let err = "forty-two".parse::<u32>().unwrap_err();
//! let mut context = Context::new();
//! context.insert("user_id".into(), "user-42".into());
//! context.insert("controller".into(), "users".into());
//! reporter
//!     .report(Some(&CapturedException::from_error(&err)), context)
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! Reporting is best effort. [`Reporter::report`] returns whether PostHog accepted the event and
//! never fails otherwise. Delivery problems are logged with [`tracing`].
//!
//! # HTTP client
//!
//! The reporter works with any [`HttpClient`]. Enable one of the following features to get a
//! ready-made client in [`http_client`]:
//!
//! - `reqwest-client`: async reqwest with native TLS
//! - `reqwest-client-vendored-tls`: async reqwest with vendored native TLS
//! - `reqwest-client-rustls`: async reqwest with rustls
//! - `reqwest-blocking-client` and `reqwest-blocking-client-rustls`: additionally a blocking
//!   client for [`Reporter::report_blocking`]
//!
//! # Event format
//!
//! Every report becomes one `$exception` event:
//!
//! | Property                 | Value                                                        |
//! | ------------------------ | ------------------------------------------------------------ |
//! | `distinct_id`            | Context `user_id`, else context `distinct_id`, else `anonymous` |
//! | `$exception_list`        | Type, message and up to 50 stack frames                      |
//! | `$exception_fingerprint` | SHA-256 of type, message, top three frames, action and controller |
//! | `environment`            | [`Config::environment`]                                      |
//!
//! All other context entries are copied to the event properties as they are.
//!
//! # Deferred reporting
//!
//! [`Reporter::report_async`] hands the report to a [`JobQueue`] if one is installed. The job
//! runner later calls [`Reporter::perform`] (or [`Reporter::perform_json`]), which rebuilds the
//! exception with an [`ExceptionRegistry`] and reports it.
#![doc(html_root_url = "https://docs.rs/posthog-exceptions/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs, unreachable_pub, missing_debug_implementations)]

mod builder;
mod config;
mod error;
mod exception;
mod fingerprint;
mod frames;
#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest-client")))]
pub mod http_client;
mod job;
mod models;
mod reporter;
mod uploader;

pub use config::Config;
pub use error::Error;
pub use exception::{CapturedException, Context, Exception};
pub use job::{ExceptionJob, ExceptionRegistry, JobQueue};
pub use opentelemetry_http::HttpClient;
pub use reporter::Reporter;
