use serde::Serialize;

/// Runtime the backtrace format belongs to.
pub(crate) const FRAME_LANG: &str = "ruby";

/// One entry of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Frame {
    /// Stable identifier of this frame across reports.
    pub(crate) raw_id: String,

    /// Source file, or the whole raw line if it could not be parsed.
    pub(crate) filename: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) lineno: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) function: Option<String>,

    /// Whether the file belongs to the application rather than a library.
    pub(crate) in_app: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) resolved_name: Option<String>,

    pub(crate) lang: &'static str,

    pub(crate) resolved: bool,
}
