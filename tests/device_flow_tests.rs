mod auth_support;

use std::time::Duration;

use devgrant::auth::ErrorCode;
use devgrant::error::DeviceFlowError;
use devgrant::flow::DeviceFlow;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use auth_support::{scripted_config, RecordingPrompt, ScriptedTransport, DEVICE_URL, TOKEN_URL};

fn device_code_body(expires_in: u64, interval: u64) -> serde_json::Value {
    json!({
        "device_code": "D",
        "user_code": "ABCD-1234",
        "verification_uri": "https://x/device",
        "expires_in": expires_in,
        "interval": interval
    })
}

fn secs(offsets: &[u64]) -> Vec<Duration> {
    offsets.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[tokio::test(start_paused = true)]
async fn pending_twice_then_token_after_three_padded_waits() {
    let transport = ScriptedTransport::new();
    transport.push(DEVICE_URL, device_code_body(900, 5));
    transport.push(TOKEN_URL, json!({ "error": "authorization_pending" }));
    transport.push(TOKEN_URL, json!({ "error": "authorization_pending" }));
    transport.push(
        TOKEN_URL,
        json!({ "access_token": "tok123", "token_type": "bearer", "scope": "" }),
    );
    let prompt = RecordingPrompt::new();

    let token = DeviceFlow::with_transport(scripted_config(), transport.clone())
        .with_prompt(prompt.clone())
        .run()
        .await
        .expect("token");

    assert_eq!(token.access_token, "tok123");
    assert_eq!(token.token_type, "bearer");
    assert_eq!(
        prompt.shown(),
        vec![("https://x/device".to_string(), "ABCD-1234".to_string())]
    );

    let polls = transport.requests_to(TOKEN_URL);
    assert_eq!(
        polls.iter().map(|r| r.at).collect::<Vec<_>>(),
        secs(&[6, 12, 18])
    );
    for poll in &polls {
        assert_eq!(poll.param("device_code"), Some("D"));
        assert_eq!(poll.param("client_id"), Some("client-1"));
        assert_eq!(
            poll.param("grant_type"),
            Some("urn:ietf:params:oauth:grant-type:device_code")
        );
    }
}

#[tokio::test(start_paused = true)]
async fn provider_expired_token_is_not_deadline_expiry() {
    let transport = ScriptedTransport::new();
    transport.push(DEVICE_URL, device_code_body(900, 5));
    transport.push(TOKEN_URL, json!({ "error": "slow_down" }));
    transport.push(
        TOKEN_URL,
        json!({
            "error": "expired_token",
            "error_description": "The device_code has expired.",
            "error_uri": "https://docs.example.com/device-flow"
        }),
    );

    let err = DeviceFlow::with_transport(scripted_config(), transport.clone())
        .with_prompt(RecordingPrompt::new())
        .run()
        .await
        .expect_err("provider rejection");

    match err {
        DeviceFlowError::Authorization {
            code,
            description,
            uri,
        } => {
            assert_eq!(code, ErrorCode::ExpiredToken);
            assert_eq!(description.as_deref(), Some("The device_code has expired."));
            assert_eq!(uri.as_deref(), Some("https://docs.example.com/device-flow"));
        }
        other => panic!("expected authorization error, got {other:?}"),
    }
    // slow_down doubled the 6s wait to 12s
    assert_eq!(
        transport
            .requests_to(TOKEN_URL)
            .iter()
            .map(|r| r.at)
            .collect::<Vec<_>>(),
        secs(&[6, 18])
    );
}

#[tokio::test(start_paused = true)]
async fn deadline_counts_from_device_code_request() {
    let transport = ScriptedTransport::new();
    transport.push(DEVICE_URL, device_code_body(10, 5));
    transport.push(TOKEN_URL, json!({ "error": "authorization_pending" }));
    transport.push(TOKEN_URL, json!({ "access_token": "late" }));

    let err = DeviceFlow::with_transport(scripted_config(), transport.clone())
        .with_prompt(RecordingPrompt::new())
        .run()
        .await
        .expect_err("expired");

    assert!(matches!(err, DeviceFlowError::Expired));
    assert_eq!(transport.requests_to(TOKEN_URL).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn padding_is_configurable() {
    let transport = ScriptedTransport::new();
    transport.push(DEVICE_URL, device_code_body(900, 5));
    transport.push(TOKEN_URL, json!({ "access_token": "tok" }));

    DeviceFlow::with_transport(
        scripted_config().with_interval_padding(Duration::from_secs(3)),
        transport.clone(),
    )
    .with_prompt(RecordingPrompt::new())
    .run()
    .await
    .expect("token");

    assert_eq!(transport.requests_to(TOKEN_URL)[0].at, Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn device_code_failure_skips_prompt_and_polling() {
    let transport = ScriptedTransport::new();
    transport.push_raw(DEVICE_URL, "<html>502 Bad Gateway</html>");
    let prompt = RecordingPrompt::new();

    let err = DeviceFlow::with_transport(scripted_config(), transport.clone())
        .with_prompt(prompt.clone())
        .run()
        .await
        .expect_err("decode failure");

    assert!(matches!(err, DeviceFlowError::Decode(_)));
    assert!(prompt.shown().is_empty());
    assert!(transport.requests_to(TOKEN_URL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_sends_nothing() {
    let transport = ScriptedTransport::new();
    transport.push(DEVICE_URL, device_code_body(900, 5));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = DeviceFlow::with_transport(scripted_config(), transport.clone())
        .with_prompt(RecordingPrompt::new())
        .run_with_cancel(&cancel)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, DeviceFlowError::Cancelled));
    assert!(transport.requests_to(DEVICE_URL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_while_waiting_stops_polling() {
    let transport = ScriptedTransport::new();
    transport.push(DEVICE_URL, device_code_body(900, 5));
    transport.push(TOKEN_URL, json!({ "error": "authorization_pending" }));
    transport.push(TOKEN_URL, json!({ "access_token": "tok" }));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(9)).await;
        trigger.cancel();
    });

    let err = DeviceFlow::with_transport(scripted_config(), transport.clone())
        .with_prompt(RecordingPrompt::new())
        .run_with_cancel(&cancel)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, DeviceFlowError::Cancelled));
    assert_eq!(transport.requests_to(TOKEN_URL).len(), 1);
}
