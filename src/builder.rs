use crate::{
    exception::{value_text, Context, Exception},
    models::{ExceptionData, ExceptionEvent, Frame, Mechanism, Stacktrace},
};

pub(crate) const ANONYMOUS_DISTINCT_ID: &str = "anonymous";
const USER_ID_KEY: &str = "user_id";
const DISTINCT_ID_KEY: &str = "distinct_id";

/// Top level keys computed by the builder. Context entries with these names are dropped.
const RESERVED_KEYS: [&str; 4] = [
    "distinct_id",
    "$exception_list",
    "$exception_fingerprint",
    "environment",
];

/// Assemble the `$exception` event properties.
///
/// The user is taken from the context's `user_id`, then `distinct_id`, and is `anonymous`
/// otherwise. Non-string ids are sent as their JSON text. Both keys are consumed. Every other
/// context entry is copied to the top level unless it collides with a computed key, in which case
/// the computed value wins.
pub(crate) fn build_event(
    exception: &dyn Exception,
    mut context: Context,
    fingerprint: String,
    frames: Vec<Frame>,
    environment: &str,
) -> ExceptionEvent {
    let user_id = context.remove(USER_ID_KEY);
    let distinct_id = context.remove(DISTINCT_ID_KEY);
    let distinct_id = user_id
        .iter()
        .chain(distinct_id.iter())
        .find_map(|value| value_text(value).map(|text| text.into_owned()))
        .unwrap_or_else(|| ANONYMOUS_DISTINCT_ID.into());

    for key in RESERVED_KEYS {
        if context.remove(key).is_some() {
            tracing::debug!(key, "Dropped context entry that collides with an event property");
        }
    }

    ExceptionEvent {
        distinct_id,
        exception_list: vec![ExceptionData {
            type_name: exception.type_name().into_owned(),
            value: exception.message().into_owned(),
            mechanism: Mechanism::HANDLED,
            stacktrace: Stacktrace::resolved(frames),
        }],
        fingerprint,
        environment: environment.into(),
        properties: context,
    }
}
