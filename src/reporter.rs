use crate::{
    builder::build_event,
    config::Config,
    exception::{Context, Exception},
    fingerprint::fingerprint,
    frames::{resolve_frame, MAX_FRAMES},
    job::{ExceptionJob, ExceptionRegistry, JobQueue},
    models::ExceptionEvent,
    uploader, Error,
};
use arc_swap::ArcSwap;
use futures_util::FutureExt;
use opentelemetry_http::HttpClient;
use std::{
    any::Any,
    fmt::Debug,
    panic::AssertUnwindSafe,
    sync::Arc,
};

/// Reports exceptions to PostHog.
///
/// Reporting is best effort: no method returns an error or panics because of a failed delivery.
/// Failures are logged with [`tracing`] and, for [`Reporter::report`], signalled by returning
/// `false`.
///
/// Clones share the client, the configuration and the job queue.
pub struct Reporter<C> {
    client: Arc<C>,
    config: Arc<ArcSwap<Config>>,
    job_queue: Option<Arc<dyn JobQueue>>,
    registry: Arc<ExceptionRegistry>,
}

impl<C> Clone for Reporter<C> {
    fn clone(&self) -> Self {
        Reporter {
            client: Arc::clone(&self.client),
            config: Arc::clone(&self.config),
            job_queue: self.job_queue.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C: Debug> Debug for Reporter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config.load();
        f.debug_struct("Reporter")
            .field("client", &self.client)
            .field("endpoint", config.endpoint())
            .field("environment", &config.environment())
            .field("enabled", &config.is_enabled())
            .field("job_queue", &self.job_queue)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<C> Reporter<C> {
    /// Create a reporter sending events with the given HTTP client.
    pub fn new(client: C, config: Config) -> Self {
        Reporter {
            client: Arc::new(client),
            config: Arc::new(ArcSwap::from_pointee(config)),
            job_queue: None,
            registry: Arc::new(ExceptionRegistry::new()),
        }
    }

    /// Hand reports made with [`Reporter::report_async`] to this queue.
    pub fn with_job_queue(mut self, job_queue: impl JobQueue + 'static) -> Self {
        self.job_queue = Some(Arc::new(job_queue));
        self
    }

    /// Use this registry to rebuild exceptions in [`Reporter::perform`].
    pub fn with_registry(mut self, registry: ExceptionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Change the configuration of this reporter and all its clones.
    ///
    /// Reports that are already running keep using the configuration they started with. The
    /// closure may be called more than once if another thread changes the configuration at the
    /// same time.
    ///
    /// ```
    /// # use posthog_exceptions::{Config, Reporter};
    /// let reporter = Reporter::new((), Config::new("phc_..."));
    /// reporter.configure(|config| config.ignore_exception("Timeout::Error"));
    /// assert!(reporter.config().is_ignored("Timeout::Error"));
    /// ```
    pub fn configure(&self, update: impl Fn(Config) -> Config) {
        let _previous_config = self
            .config
            .rcu(|current| update(Config::clone(current)));
    }

    /// Replace the configuration of this reporter and all its clones.
    pub fn replace_config(&self, config: Config) {
        self.config.store(Arc::new(config));
    }
}

impl<C: HttpClient + 'static> Reporter<C> {
    /// Report an exception and wait for PostHog to accept it.
    ///
    /// Returns `true` if PostHog answered with status 200. Returns `false` without sending
    /// anything if reporting is disabled, `exception` is `None`, its type is ignored or no API key
    /// is configured. Returns `false` and logs an error if the request fails.
    pub async fn report(&self, exception: Option<&dyn Exception>, context: Context) -> bool {
        let config = self.config.load_full();
        let Some(exception) = admit(&config, exception) else {
            return false;
        };

        let event = prepare_event(&config, exception, context);
        self.deliver(&config, &event).await
    }

    /// Like [`Reporter::report`], but blocks the current thread.
    ///
    /// The HTTP client must not depend on the thread being part of an async runtime, e.g. use
    /// `reqwest::blocking::Client`.
    pub fn report_blocking(&self, exception: Option<&dyn Exception>, context: Context) -> bool {
        futures_executor::block_on(self.report(exception, context))
    }

    /// Report an exception through the job queue, if there is one.
    ///
    /// Without a queue, or if the queue refuses the job, this reports right away like
    /// [`Reporter::report`].
    pub async fn report_async(&self, exception: Option<&dyn Exception>, context: Context) {
        let config = self.config.load_full();
        let Some(exception) = admit(&config, exception) else {
            return;
        };

        if let Some(job_queue) = &self.job_queue {
            match job_queue
                .enqueue(ExceptionJob::new(exception, context.clone()))
                .await
            {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(
                        "Failed to enqueue PostHog exception job, reporting now: {}",
                        err
                    );
                }
            }
        }

        self.report(Some(exception), context).await;
    }

    /// Run a job created by [`Reporter::report_async`].
    ///
    /// The exception is rebuilt with the registry given to [`Reporter::with_registry`]. Panics
    /// while reporting are caught and logged, so this never unwinds into the job runner.
    pub async fn perform(&self, job: ExceptionJob) -> bool {
        let outcome = AssertUnwindSafe(async {
            let (exception, context) = self.registry.reconstruct(job);
            self.report(Some(exception.as_ref()), context).await
        })
        .catch_unwind()
        .await;

        match outcome {
            Ok(reported) => reported,
            Err(panic) => {
                log_job_error(&Error::JobPanicked(panic_message(panic.as_ref())));
                false
            }
        }
    }

    /// Run a job from its JSON representation. Malformed payloads are logged and dropped.
    pub async fn perform_json(&self, payload: &[u8]) -> bool {
        match ExceptionJob::from_slice(payload) {
            Ok(job) => self.perform(job).await,
            Err(err) => {
                log_job_error(&err);
                false
            }
        }
    }

    async fn deliver(&self, config: &Config, event: &ExceptionEvent) -> bool {
        let Some(api_key) = config.api_key() else {
            tracing::trace!("No PostHog API key configured, dropping exception");
            return false;
        };

        match uploader::send(self.client.as_ref(), config.endpoint(), api_key, event).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Failed to send exception to PostHog: {}", err);
                false
            }
        }
    }
}

/// Apply the reporting policy. `None` means the exception is dropped.
fn admit<'e>(config: &Config, exception: Option<&'e dyn Exception>) -> Option<&'e dyn Exception> {
    if !config.is_enabled() {
        tracing::trace!("Exception reporting disabled");
        return None;
    }
    let exception = exception?;
    if config.is_ignored(&exception.type_name()) {
        tracing::trace!(
            exception_type = exception.type_name().as_ref(),
            "Ignoring exception"
        );
        return None;
    }
    Some(exception)
}

fn prepare_event(config: &Config, exception: &dyn Exception, context: Context) -> ExceptionEvent {
    let fingerprint = fingerprint(exception, &context);
    let backtrace = exception.backtrace();
    let frames = backtrace[..backtrace.len().min(MAX_FRAMES)]
        .iter()
        .map(|line| resolve_frame(line, config.root_path()))
        .collect();
    build_event(
        exception,
        context,
        fingerprint,
        frames,
        config.environment(),
    )
}

fn log_job_error(err: &Error) {
    tracing::error!("Error in PostHog exception job: {}", err);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".into()
    }
}
