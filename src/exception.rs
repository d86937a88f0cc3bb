use serde_json::{Map, Value};
use std::{borrow::Cow, fmt::Debug};

/// Key-value context attached to a report, e.g. request URL, controller, user.
///
/// The keys `user_id` and `distinct_id` identify the user and are consumed; every other key is
/// sent along unchanged.
pub type Context = Map<String, Value>;

/// Anything that can be reported as an exception.
///
/// Backtrace lines are expected in the `path/to/file.rb:42:in `method'` format. Lines that don't
/// follow it are still reported, as opaque frames.
pub trait Exception: Debug + Send + Sync {
    /// Name of the exception type, e.g. `RuntimeError`. Used for ignore lists and grouping.
    fn type_name(&self) -> Cow<'_, str>;

    /// Human readable message.
    fn message(&self) -> Cow<'_, str>;

    /// Raw backtrace lines, most recent call first. Empty if unknown.
    fn backtrace(&self) -> &[String] {
        &[]
    }
}

impl<E: Exception + ?Sized> Exception for &E {
    fn type_name(&self) -> Cow<'_, str> {
        (**self).type_name()
    }

    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn backtrace(&self) -> &[String] {
        (**self).backtrace()
    }
}

impl<E: Exception + ?Sized> Exception for Box<E> {
    fn type_name(&self) -> Cow<'_, str> {
        (**self).type_name()
    }

    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn backtrace(&self) -> &[String] {
        (**self).backtrace()
    }
}

/// An exception captured as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedException {
    type_name: String,
    message: String,
    backtrace: Vec<String>,
}

impl CapturedException {
    /// Capture an exception with the given type name and message, and no backtrace.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        CapturedException {
            type_name: type_name.into(),
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    /// Capture a Rust error. The type name is the error's Rust type path.
    ///
    /// ```
    /// use posthog_exceptions::{CapturedException, Exception};
    ///
    /// let error = "x".parse::<u32>().unwrap_err();
    /// let captured = CapturedException::from_error(&error);
    /// assert!(captured.type_name().ends_with("ParseIntError"));
    /// assert_eq!("invalid digit found in string", captured.message());
    /// ```
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        CapturedException::new(std::any::type_name::<E>(), error.to_string())
    }

    /// Attach backtrace lines, most recent call first.
    pub fn with_backtrace<I, S>(mut self, backtrace: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backtrace = backtrace.into_iter().map(Into::into).collect();
        self
    }
}

impl Exception for CapturedException {
    fn type_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.type_name)
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn backtrace(&self) -> &[String] {
        &self.backtrace
    }
}

/// Text of a context value, or `None` if the value is absent or empty.
pub(crate) fn context_text<'a>(context: &'a Context, key: &str) -> Option<Cow<'a, str>> {
    context.get(key).and_then(value_text)
}

/// Strings as they are, other values as compact JSON. `null`, `false` and `""` count as absent.
pub(crate) fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Cow::Borrowed(s)),
        other => Some(Cow::Owned(other.to_string())),
    }
}
