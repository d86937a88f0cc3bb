use crate::models::ExceptionEvent;
use serde::Serialize;

pub(crate) const EXCEPTION_EVENT_NAME: &str = "$exception";

/// Request body of the capture endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    pub(crate) api_key: &'a str,
    pub(crate) event: &'static str,
    pub(crate) properties: &'a ExceptionEvent,
}

impl<'a> Envelope<'a> {
    pub(crate) fn exception(api_key: &'a str, properties: &'a ExceptionEvent) -> Self {
        Envelope {
            api_key,
            event: EXCEPTION_EVENT_NAME,
            properties,
        }
    }
}
