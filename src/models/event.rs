use crate::{exception::Context, models::Frame};
use serde::Serialize;

/// Properties of one `$exception` event.
#[derive(Debug, Serialize)]
pub(crate) struct ExceptionEvent {
    pub(crate) distinct_id: String,

    /// Always exactly one entry.
    #[serde(rename = "$exception_list")]
    pub(crate) exception_list: Vec<ExceptionData>,

    #[serde(rename = "$exception_fingerprint")]
    pub(crate) fingerprint: String,

    pub(crate) environment: String,

    /// Remaining context. Must not contain any of the keys above.
    #[serde(flatten)]
    pub(crate) properties: Context,
}

/// A single exception.
#[derive(Debug, Serialize)]
pub(crate) struct ExceptionData {
    #[serde(rename = "type")]
    pub(crate) type_name: String,

    /// Exception message.
    pub(crate) value: String,

    pub(crate) mechanism: Mechanism,

    pub(crate) stacktrace: Stacktrace,
}

/// How the exception was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Mechanism {
    pub(crate) handled: bool,
    pub(crate) synthetic: bool,
}

impl Mechanism {
    /// Reported explicitly by the application, from a real exception.
    pub(crate) const HANDLED: Mechanism = Mechanism {
        handled: true,
        synthetic: false,
    };
}

#[derive(Debug, Serialize)]
pub(crate) struct Stacktrace {
    #[serde(rename = "type")]
    pub(crate) type_: &'static str,
    pub(crate) frames: Vec<Frame>,
}

impl Stacktrace {
    pub(crate) fn resolved(frames: Vec<Frame>) -> Self {
        Stacktrace {
            type_: "resolved",
            frames,
        }
    }
}
