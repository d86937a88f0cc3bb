use crate::{
    exception::{CapturedException, Context, Exception},
    Error,
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::{borrow::Cow, collections::HashMap, fmt::Debug};

/// Type name of exceptions rebuilt from a job whose type is not registered.
pub(crate) const GENERIC_EXCEPTION_TYPE: &str = "RuntimeError";

/// Everything needed to report an exception later, possibly in another process.
///
/// Serializes to `{"exception_class", "message", "backtrace", "context"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionJob {
    /// Type name of the original exception.
    pub exception_class: String,
    /// Message of the original exception.
    pub message: String,
    /// Raw backtrace lines of the original exception.
    #[serde(default, deserialize_with = "null_as_default")]
    pub backtrace: Vec<String>,
    /// Context passed to the report.
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: Context,
}

impl ExceptionJob {
    /// Capture an exception and its context.
    pub fn new(exception: &dyn Exception, context: Context) -> Self {
        ExceptionJob {
            exception_class: exception.type_name().into_owned(),
            message: exception.message().into_owned(),
            backtrace: exception.backtrace().to_vec(),
            context,
        }
    }

    /// Parse a job from its JSON representation.
    pub fn from_slice(payload: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(payload).map_err(Error::JobDeserialize)
    }

    /// JSON representation of the job.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::JobSerialize)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A facility that runs exception jobs in the background.
///
/// Implementations store or send the job somewhere and eventually hand it to
/// [`Reporter::perform`](crate::Reporter::perform).
///
/// ```
/// use async_trait::async_trait;
/// use posthog_exceptions::{Error, ExceptionJob, JobQueue};
/// use std::sync::mpsc::Sender;
/// use std::sync::Mutex;
///
/// #[derive(Debug)]
/// struct ChannelQueue(Mutex<Sender<ExceptionJob>>);
///
/// #[async_trait]
/// impl JobQueue for ChannelQueue {
///     async fn enqueue(&self, job: ExceptionJob) -> Result<(), Error> {
///         self.0
///             .lock()
///             .map_err(|_| Error::JobEnqueue("queue lock poisoned".into()))?
///             .send(job)
///             .map_err(|err| Error::JobEnqueue(err.into()))
///     }
/// }
/// ```
#[async_trait]
pub trait JobQueue: Debug + Send + Sync {
    /// Schedule the job. Errors make the reporter fall back to reporting right away.
    async fn enqueue(&self, job: ExceptionJob) -> Result<(), Error>;
}

type Constructor = Box<dyn Fn(String) -> Box<dyn Exception> + Send + Sync>;

/// Known exception types, used to rebuild exceptions from [`ExceptionJob`]s.
///
/// Jobs naming a type that is not registered are reported as `RuntimeError` with the message
/// `"<type>: <message>"`.
#[derive(Default)]
pub struct ExceptionRegistry {
    constructors: HashMap<String, Constructor>,
}

impl Debug for ExceptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ExceptionRegistry")
            .field("types", &names)
            .finish()
    }
}

impl ExceptionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor building an exception of the named type from a message.
    pub fn register<F, E>(mut self, type_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(String) -> E + Send + Sync + 'static,
        E: Exception + 'static,
    {
        self.constructors.insert(
            type_name.into(),
            Box::new(move |message| -> Box<dyn Exception> { Box::new(constructor(message)) }),
        );
        self
    }

    /// Register a type that is rebuilt as a plain [`CapturedException`] keeping its name.
    pub fn register_name(self, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let name = type_name.clone();
        self.register(type_name, move |message| {
            CapturedException::new(name.clone(), message)
        })
    }

    /// Whether the type name is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub(crate) fn reconstruct(&self, job: ExceptionJob) -> (Box<dyn Exception>, Context) {
        let ExceptionJob {
            exception_class,
            message,
            backtrace,
            context,
        } = job;

        let inner: Box<dyn Exception> = match self.constructors.get(&exception_class) {
            Some(constructor) => constructor(message),
            None => {
                tracing::debug!(
                    exception_class = exception_class.as_str(),
                    "Unknown exception type in job, reporting as {}",
                    GENERIC_EXCEPTION_TYPE
                );
                Box::new(CapturedException::new(
                    GENERIC_EXCEPTION_TYPE,
                    format!("{}: {}", exception_class, message),
                ))
            }
        };

        let exception: Box<dyn Exception> = Box::new(Reconstructed { inner, backtrace });
        (exception, context)
    }
}

/// A rebuilt exception carrying the backtrace of the original one.
#[derive(Debug)]
struct Reconstructed {
    inner: Box<dyn Exception>,
    backtrace: Vec<String>,
}

impl Exception for Reconstructed {
    fn type_name(&self) -> Cow<'_, str> {
        self.inner.type_name()
    }

    fn message(&self) -> Cow<'_, str> {
        self.inner.message()
    }

    fn backtrace(&self) -> &[String] {
        if self.backtrace.is_empty() {
            self.inner.backtrace()
        } else {
            &self.backtrace
        }
    }
}
