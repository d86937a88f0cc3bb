//! Sends one test exception to PostHog to check the setup.
//!
//! ```sh
//! POSTHOG_API_KEY=phc_... cargo run --example send_test_exception --features reqwest-client
//! ```
use posthog_exceptions::{CapturedException, Context, Reporter};
use serde_json::json;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt().init();

    let reporter = Reporter::from_env()?;
    // Reporting is off in the test environment, but this demo should always send.
    reporter.configure(|config| config.with_enabled(true));

    let exception = CapturedException::new(
        "RuntimeError",
        "Test exception from posthog-exceptions",
    )
    .with_backtrace([format!("{}:{}:in `main'", file!(), line!())]);
    let mut context = Context::new();
    context.insert("source".into(), json!("demo"));
    context.insert("test".into(), json!(true));

    if reporter.report(Some(&exception), context).await {
        println!("Test exception sent to PostHog");
    } else {
        println!("Failed to send test exception, check POSTHOG_API_KEY and POSTHOG_API_URL");
    }

    Ok(())
}
