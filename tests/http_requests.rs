//! Snapshot tests for generated HTTP requests
//!
//! # Update snapshots
//!
//! ```
//! INSTA_UPDATE=always cargo test
//! ```

use async_trait::async_trait;
use format::requests_to_string;
use posthog_exceptions::{
    CapturedException, Config, Context, Error, ExceptionJob, ExceptionRegistry, JobQueue,
    Reporter,
};
use recording_client::{record, RecordingClient};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

// Fake project API key
const API_KEY: &str = "phc_test_key";

fn config() -> Config {
    Config::new(API_KEY)
        .with_environment("production")
        .with_enabled(true)
        .with_ignored_exceptions(Vec::<String>::new())
        .with_root_path("/srv/app")
}

fn context(value: Value) -> Context {
    match value {
        Value::Object(map) => map,
        _ => panic!("context must be an object"),
    }
}

fn body(request: &http::Request<bytes::Bytes>) -> Value {
    serde_json::from_slice(request.body()).expect("body is valid json")
}

#[tokio::test]
async fn exception_simple() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config());
        let exception = CapturedException::new("RuntimeError", "boom").with_backtrace([
            "/srv/app/app/controllers/users_controller.rb:12:in `show'",
            "/usr/lib/ruby/gems/actionpack/metal.rb:227:in `dispatch'",
            "<internal:kernel>",
        ]);
        let reported = reporter
            .report(
                Some(&exception),
                context(json!({
                    "user_id": "user-42",
                    "controller": "users",
                    "action": "show",
                    "url": "https://example.com/users/42",
                })),
            )
            .await;
        assert!(reported);
    })
    .await;
    let exception_simple = requests_to_string(requests);
    insta::assert_snapshot!(exception_simple);
}

#[tokio::test]
async fn resolved_frames_are_delivered() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config());
        let exception = CapturedException::new("RuntimeError", "boom")
            .with_backtrace(["app.rb:10:in `foo'", "app.rb:20:in `bar'"]);
        assert!(reporter.report(Some(&exception), Context::new()).await);
    })
    .await;

    assert_eq!(1, requests.len());
    let body = body(&requests[0]);
    let properties = &body["properties"];
    let fingerprint = properties["$exception_fingerprint"].as_str().unwrap();
    assert_eq!(64, fingerprint.len());
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(json!("anonymous"), properties["distinct_id"]);

    let frames = properties["$exception_list"][0]["stacktrace"]["frames"]
        .as_array()
        .unwrap();
    assert_eq!(2, frames.len());
    assert_eq!(json!("foo"), frames[0]["function"]);
    assert_eq!(json!("bar"), frames[1]["function"]);
    assert!(frames.iter().all(|frame| frame["resolved"] == json!(true)));
}

#[tokio::test]
async fn ignored_exception_is_not_sent() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config().ignore_exception("RuntimeError"));
        let exception = CapturedException::new("RuntimeError", "boom")
            .with_backtrace(["app.rb:10:in `foo'", "app.rb:20:in `bar'"]);
        assert!(!reporter.report(Some(&exception), Context::new()).await);
    })
    .await;
    assert!(requests.is_empty());
}

#[tokio::test]
async fn missing_api_key_is_not_sent() {
    let requests = record(200, |client| async move {
        let config = Config::default()
            .with_enabled(true)
            .with_ignored_exceptions(Vec::<String>::new());
        let reporter = Reporter::new(client, config);
        let exception = CapturedException::new("RuntimeError", "boom");
        assert!(!reporter.report(Some(&exception), Context::new()).await);
    })
    .await;
    assert!(requests.is_empty());
}

#[tokio::test]
async fn disabled_or_absent_is_not_sent() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config().with_enabled(false));
        let exception = CapturedException::new("RuntimeError", "boom");
        assert!(!reporter.report(Some(&exception), Context::new()).await);

        reporter.configure(|config| config.with_enabled(true));
        assert!(!reporter.report(None, Context::new()).await);
    })
    .await;
    assert!(requests.is_empty());
}

#[tokio::test]
async fn server_error_is_a_failed_report() {
    let requests = record(500, |client| async move {
        let reporter = Reporter::new(client, config());
        let exception = CapturedException::new("RuntimeError", "boom");
        assert!(!reporter.report(Some(&exception), Context::new()).await);
    })
    .await;
    assert_eq!(1, requests.len());
}

#[tokio::test]
async fn long_backtrace_is_capped() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config());
        let backtrace: Vec<String> = (1..=120)
            .map(|line| format!("/srv/app/lib/deep.rb:{}:in `recurse'", line))
            .collect();
        let exception = CapturedException::new("SystemStackError", "stack level too deep")
            .with_backtrace(backtrace);
        assert!(reporter.report(Some(&exception), Context::new()).await);
    })
    .await;

    let body = body(&requests[0]);
    let frames = body["properties"]["$exception_list"][0]["stacktrace"]["frames"]
        .as_array()
        .unwrap();
    assert_eq!(50, frames.len());
    assert_eq!(json!(50), frames[49]["lineno"]);
}

#[tokio::test]
async fn distinct_id_is_not_duplicated() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config());
        let exception = CapturedException::new("RuntimeError", "boom");
        let context = context(json!({"distinct_id": "d-1", "request_id": "r-1"}));
        assert!(reporter.report(Some(&exception), context).await);
    })
    .await;

    let body = body(&requests[0]);
    let properties = body["properties"].as_object().unwrap();
    assert_eq!(Some(&json!("d-1")), properties.get("distinct_id"));
    assert_eq!(Some(&json!("r-1")), properties.get("request_id"));
    assert!(!properties.contains_key("user_id"));
}

#[test]
fn report_blocking_without_runtime() {
    let client = RecordingClient::new(200);
    let reporter = Reporter::new(client.clone(), config());
    let exception = CapturedException::new("RuntimeError", "boom");
    assert!(reporter.report_blocking(Some(&exception), Context::new()));
    assert_eq!(1, client.take().len());
}

#[derive(Debug, Clone, Default)]
struct MemoryQueue {
    jobs: Arc<Mutex<Vec<ExceptionJob>>>,
    refuse: bool,
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: ExceptionJob) -> Result<(), Error> {
        if self.refuse {
            return Err(Error::JobEnqueue("queue is full".into()));
        }
        self.jobs.lock().expect("jobs mutex is healthy").push(job);
        Ok(())
    }
}

#[tokio::test]
async fn report_async_enqueues_and_perform_delivers() {
    let client = RecordingClient::new(200);
    let queue = MemoryQueue::default();
    let reporter = Reporter::new(client.clone(), config())
        .with_job_queue(queue.clone())
        .with_registry(ExceptionRegistry::new().register_name("ArgumentError"));

    let exception = CapturedException::new("ArgumentError", "wrong number of arguments")
        .with_backtrace(["/srv/app/lib/parser.rb:3:in `parse'"]);
    reporter
        .report_async(Some(&exception), context(json!({"user_id": 7})))
        .await;
    assert!(client.take().is_empty());

    let jobs: Vec<ExceptionJob> = queue.jobs.lock().unwrap().drain(..).collect();
    assert_eq!(1, jobs.len());
    let payload = jobs[0].to_vec().unwrap();
    assert!(reporter.perform_json(&payload).await);

    let requests = client.take();
    assert_eq!(1, requests.len());
    let body = body(&requests[0]);
    let properties = &body["properties"];
    assert_eq!(json!("7"), properties["distinct_id"]);
    let exception = &properties["$exception_list"][0];
    assert_eq!(json!("ArgumentError"), exception["type"]);
    assert_eq!(json!("wrong number of arguments"), exception["value"]);
    assert_eq!(
        json!("parse"),
        exception["stacktrace"]["frames"][0]["function"]
    );
}

#[tokio::test]
async fn report_async_skips_policy_drops() {
    let client = RecordingClient::new(200);
    let queue = MemoryQueue::default();
    let reporter = Reporter::new(client.clone(), config().ignore_exception("RuntimeError"))
        .with_job_queue(queue.clone());

    let exception = CapturedException::new("RuntimeError", "boom");
    reporter.report_async(Some(&exception), Context::new()).await;
    reporter.report_async(None, Context::new()).await;

    assert!(queue.jobs.lock().unwrap().is_empty());
    assert!(client.take().is_empty());
}

#[tokio::test]
async fn report_async_falls_back_to_sending() {
    let requests = record(200, |client| async move {
        let exception = CapturedException::new("RuntimeError", "boom");

        let without_queue = Reporter::new(client.clone(), config());
        without_queue
            .report_async(Some(&exception), Context::new())
            .await;

        let refusing_queue = Reporter::new(client, config()).with_job_queue(MemoryQueue {
            refuse: true,
            ..MemoryQueue::default()
        });
        refusing_queue
            .report_async(Some(&exception), Context::new())
            .await;
    })
    .await;
    assert_eq!(2, requests.len());
}

#[tokio::test]
async fn perform_rebuilds_unknown_types_as_runtime_error() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config());
        let job = ExceptionJob {
            exception_class: "PaymentGateway::Declined".into(),
            message: "card declined".into(),
            backtrace: vec!["/srv/app/app/jobs/charge_job.rb:18:in `perform'".into()],
            context: context(json!({"action": "charge"})),
        };
        assert!(reporter.perform(job).await);
    })
    .await;

    let body = body(&requests[0]);
    let exception = &body["properties"]["$exception_list"][0];
    assert_eq!(json!("RuntimeError"), exception["type"]);
    assert_eq!(
        json!("PaymentGateway::Declined: card declined"),
        exception["value"]
    );
    assert_eq!(json!(true), exception["stacktrace"]["frames"][0]["in_app"]);
    assert_eq!(json!("charge"), body["properties"]["action"]);
}

#[tokio::test]
async fn perform_json_drops_malformed_payloads() {
    let requests = record(200, |client| async move {
        let reporter = Reporter::new(client, config());
        assert!(!reporter.perform_json(b"not json").await);
    })
    .await;
    assert!(requests.is_empty());
}

mod recording_client {
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{Request, Response};
    use opentelemetry_http::{HttpClient, HttpError};
    use std::{
        future::Future,
        sync::{Arc, Mutex},
    };

    #[derive(Debug, Clone)]
    pub struct RecordingClient {
        requests: Arc<Mutex<Vec<Request<Bytes>>>>,
        status: u16,
    }

    impl RecordingClient {
        pub fn new(status: u16) -> Self {
            RecordingClient {
                requests: Arc::default(),
                status,
            }
        }

        pub fn take(&self) -> Vec<Request<Bytes>> {
            self.requests
                .lock()
                .expect("requests mutex is healthy")
                .drain(..)
                .collect()
        }
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn send_bytes(&self, req: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            let res = Response::builder()
                .status(self.status)
                .body(Bytes::from("{\"status\": 1}"))
                .expect("response is well formed");

            self.requests
                .lock()
                .expect("requests mutex is healthy")
                .push(req);
            Ok(res)
        }
    }

    pub async fn record<F, Fut>(status: u16, generate_fn: F) -> Vec<Request<Bytes>>
    where
        F: FnOnce(RecordingClient) -> Fut,
        Fut: Future<Output = ()>,
    {
        let client = RecordingClient::new(status);
        generate_fn(client.clone()).await;
        client.take()
    }
}

mod format {
    use bytes::Bytes;
    use http::Request;
    use regex::Regex;
    use serde_json::Value;

    pub fn requests_to_string(requests: Vec<Request<Bytes>>) -> String {
        requests
            .into_iter()
            .map(request_to_string)
            .collect::<Vec<_>>()
            .join("\n\n\n")
    }

    fn request_to_string(req: Request<Bytes>) -> String {
        let method = req.method();
        let path = req.uri().path_and_query().expect("path exists");
        let version = format!("{:?}", req.version());
        let host = req.uri().authority().expect("authority exists");
        let headers = req
            .headers()
            .into_iter()
            .map(|(name, value)| {
                let value = value.to_str().expect("header value is valid string");
                format!("{}: {}", name, value)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let body = strip_changing_values(&pretty_print_json(req.body()));
        format!("{method} {path} {version}\nhost: {host}\n{headers}\n\n{body}")
    }

    // Frame ids are long hashes of the raw location; they are covered by unit tests.
    fn strip_changing_values(body: &str) -> String {
        let res = vec![Regex::new(r#""(?P<field>raw_id)": "[0-9a-f]{128}""#).unwrap()];

        res.into_iter().fold(body.into(), |body, re| {
            re.replace_all(&body, r#""$field": "STRIPPED""#).into()
        })
    }

    fn pretty_print_json(body: &[u8]) -> String {
        let json: Value = serde_json::from_slice(body).expect("body is valid json");
        serde_json::to_string_pretty(&sort_keys(json)).unwrap()
    }

    fn sort_keys(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Value::Object(
                    entries
                        .into_iter()
                        .map(|(key, value)| (key, sort_keys(value)))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
            other => other,
        }
    }
}
