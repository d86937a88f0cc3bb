use crate::exception::{context_text, Context, Exception};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Number of leading backtrace lines that take part in grouping.
const FINGERPRINT_FRAMES: usize = 3;
const SEPARATOR: &str = "|";

/// Context keys that take part in grouping, in order.
const FINGERPRINT_CONTEXT_KEYS: [&str; 2] = ["action", "controller"];

/// Grouping key for an exception: lowercase hex SHA-256 over type name, message, the first three
/// backtrace lines and the `action` and `controller` context values.
///
/// The backtrace only contributes if it has at least three lines. Empty components are skipped.
/// All other context keys are ignored, so reports that only differ in e.g. request ids or
/// timestamps get the same fingerprint.
pub(crate) fn fingerprint(exception: &dyn Exception, context: &Context) -> String {
    let backtrace = exception.backtrace();
    let frames: &[String] = if backtrace.len() >= FINGERPRINT_FRAMES {
        &backtrace[..FINGERPRINT_FRAMES]
    } else {
        &[]
    };

    let components: Vec<Cow<'_, str>> = [exception.type_name(), exception.message()]
        .into_iter()
        .chain(frames.iter().map(|line| Cow::Borrowed(line.as_str())))
        .chain(
            FINGERPRINT_CONTEXT_KEYS
                .iter()
                .filter_map(|key| context_text(context, key)),
        )
        .filter(|component| !component.is_empty())
        .collect();

    format!("{:x}", Sha256::digest(components.join(SEPARATOR).as_bytes()))
}
