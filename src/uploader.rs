use crate::{
    models::{Envelope, ExceptionEvent},
    Error,
};
use bytes::Bytes;
use http::{Request, Response, Uri};
use opentelemetry_http::HttpClient;

const STATUS_OK: u16 = 200;

/// Sends one exception event to PostHog.
///
/// Only a 200 response counts as delivered. There are no retries.
pub(crate) async fn send(
    client: &dyn HttpClient,
    endpoint: &Uri,
    api_key: &str,
    event: &ExceptionEvent,
) -> Result<(), Error> {
    let payload = serde_json::to_vec(&Envelope::exception(api_key, event))
        .map_err(Error::UploadSerializeRequest)?;

    let request = Request::post(endpoint)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(payload))
        .map_err(|err| Error::UploadConnection(err.into()))?;

    let response = client
        .send_bytes(request)
        .await
        .map_err(Error::UploadConnection)?;
    handle_response(response)
}

fn handle_response(response: Response<Bytes>) -> Result<(), Error> {
    match response.status().as_u16() {
        STATUS_OK => Ok(()),
        status_code => Err(Error::Upload { status_code }),
    }
}
