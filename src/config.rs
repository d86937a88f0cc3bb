use crate::Error;
use std::{collections::HashSet, path::PathBuf, time::Duration};

pub(crate) const DEFAULT_ENDPOINT: &str = "https://us.i.posthog.com/i/v0/e/";
const DEFAULT_ENVIRONMENT: &str = "development";
const TEST_ENVIRONMENT: &str = "test";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IGNORED_EXCEPTIONS: [&str; 2] = [
    "ActiveRecord::RecordNotFound",
    "ActionController::RoutingError",
];

/// Checked in order; the first non-empty one names the environment.
const ENVIRONMENT_VARIABLES: [&str; 3] = ["POSTHOG_ENVIRONMENT", "RACK_ENV", "RAILS_ENV"];
const API_KEY_VARIABLE: &str = "POSTHOG_API_KEY";
const API_URL_VARIABLE: &str = "POSTHOG_API_URL";

/// Settings shared by every part of the reporting pipeline.
///
/// ```
/// let config = posthog_exceptions::Config::default()
///     .with_api_key("phc_...")
///     .with_environment("production")
///     .ignore_exception("NotFound");
/// assert!(config.is_ignored("NotFound"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) api_key: Option<String>,
    pub(crate) endpoint: http::Uri,
    pub(crate) environment: String,
    pub(crate) enabled: bool,
    pub(crate) ignored_exceptions: HashSet<String>,
    pub(crate) root_path: Option<String>,
    pub(crate) timeout: Duration,
}

impl Default for Config {
    /// Defaults derived from the process environment, without an API key.
    ///
    /// Reporting is enabled unless the environment is `test`.
    fn default() -> Self {
        let environment = environment_from(|name| std::env::var(name).ok());
        let root_path = std::env::current_dir()
            .ok()
            .map(|dir| dir.to_string_lossy().into_owned());
        Config {
            api_key: None,
            endpoint: http::Uri::from_static(DEFAULT_ENDPOINT),
            enabled: environment != TEST_ENVIRONMENT,
            environment,
            ignored_exceptions: DEFAULT_IGNORED_EXCEPTIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            root_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Create a configuration with the given project API key and default settings otherwise.
    pub fn new(api_key: impl Into<String>) -> Self {
        Config::default().with_api_key(api_key)
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads the API key from `POSTHOG_API_KEY` and the endpoint from `POSTHOG_API_URL`, if set.
    pub fn from_env() -> Result<Self, Error> {
        Config::default().with_variables(|name| std::env::var(name).ok())
    }

    fn with_variables(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        if let Some(api_key) = non_empty(lookup(API_KEY_VARIABLE)) {
            self = self.with_api_key(api_key);
        }
        if let Some(endpoint) = non_empty(lookup(API_URL_VARIABLE)) {
            self = self.with_endpoint(endpoint)?;
        }
        Ok(self)
    }

    /// Set the project API key. Without one nothing is ever sent.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the capture endpoint.
    ///
    /// Default: `https://us.i.posthog.com/i/v0/e/`
    pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Result<Self, Error> {
        self.endpoint = sanitize_url(endpoint.as_ref())?;
        Ok(self)
    }

    /// Set the environment label attached to every event.
    ///
    /// This does not change whether reporting is enabled; use [`Config::with_enabled`] for that.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Turn reporting on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the list of ignored exception type names.
    pub fn with_ignored_exceptions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_exceptions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add one exception type name to the ignore list.
    pub fn ignore_exception(mut self, name: impl Into<String>) -> Self {
        self.ignored_exceptions.insert(name.into());
        self
    }

    /// Set the application root. Frames from files under this path are marked as in-app.
    ///
    /// Default: the working directory of the process.
    pub fn with_root_path(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.root_path = Some(root_path.into().to_string_lossy().into_owned());
        self
    }

    /// Set the timeout for the HTTP request, used by the bundled reqwest client.
    ///
    /// Default: 5 seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The project API key, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The capture endpoint.
    pub fn endpoint(&self) -> &http::Uri {
        &self.endpoint
    }

    /// The environment label.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Whether reporting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether exceptions of the given type name are dropped.
    pub fn is_ignored(&self, type_name: &str) -> bool {
        self.ignored_exceptions.contains(type_name)
    }

    /// The application root used for the in-app flag, if known.
    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    /// The HTTP timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    ENVIRONMENT_VARIABLES
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.into())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn sanitize_url(url: &str) -> Result<http::Uri, Error> {
    let uri: http::Uri = url.trim().try_into().map_err(Error::InvalidEndpoint)?;
    match (uri.scheme_str(), uri.authority()) {
        (Some("http" | "https"), Some(_)) => Ok(uri),
        _ => Err(Error::UnsupportedEndpoint(url.trim().to_string())),
    }
}
