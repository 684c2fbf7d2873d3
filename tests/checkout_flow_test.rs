mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chargx_gateway::{
    checkout::{
        AttemptStore, PaymentAttemptState, PlaceOrderOutcome, SubmissionOrchestrator,
        SubmissionResult,
    },
    errors::GatewayError,
    services::tokenization::{CardFields, TokenizationEngine},
};

use common::TestForm;

fn card() -> CardFields {
    CardFields {
        number: "4242 4242 4242 4242".to_string(),
        expiry: "12/25".to_string(),
        cvc: "123".to_string(),
    }
}

async fn mount_happy_processor(processor: &MockServer, token_host: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/pretransact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cardTokenRequestUrl": format!("{}/tokens", token_host.uri()),
            "cardTokenRequestParams": {
                "cardData": {
                    "cardNumber": "#cardNumber#",
                    "expirationDate": "#expirationDate#",
                    "cardCode": "#cardCode#"
                }
            }
        })))
        .expect(1)
        .mount(processor)
        .await;

    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "opaqueData": {
                "dataDescriptor": "COMMON.ACCEPT.INAPP.PAYMENT",
                "dataValue": "tok_value_1"
            }
        })))
        .mount(token_host)
        .await;
}

fn orchestrator(processor_uri: &str) -> (SubmissionOrchestrator, Arc<AttemptStore>) {
    let tokenizer = Arc::new(
        TokenizationEngine::new(common::processor_client(processor_uri), Duration::from_secs(5))
            .unwrap(),
    );
    let attempts = Arc::new(AttemptStore::new());
    (
        SubmissionOrchestrator::new(tokenizer, attempts.clone()),
        attempts,
    )
}

#[tokio::test]
async fn first_place_order_tokenizes_then_submits_once() {
    let processor = MockServer::start().await;
    let token_host = MockServer::start().await;
    mount_happy_processor(&processor, &token_host).await;

    let (orchestrator, attempts) = orchestrator(&processor.uri());
    let session = Uuid::new_v4();
    let mut form = TestForm::new();

    let outcome = orchestrator
        .place_order(session, &card(), &mut form)
        .await
        .unwrap();

    assert_matches!(outcome, PlaceOrderOutcome::Submitted(result) if result.is_success());
    assert_eq!(form.submissions, 1);
    assert_eq!(attempts.state(session), PaymentAttemptState::Settled);

    // The token landed in the payload as serialized JSON.
    let serialized = form.opaque_data.expect("token injected into form");
    let token: serde_json::Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(token["dataValue"], "tok_value_1");
}

#[tokio::test]
async fn second_trigger_with_token_present_skips_tokenization() {
    let processor = MockServer::start().await;
    let token_host = MockServer::start().await;
    // expect(1) on pretransact: a second tokenization would trip it.
    mount_happy_processor(&processor, &token_host).await;

    let (orchestrator, _) = orchestrator(&processor.uri());
    let session = Uuid::new_v4();
    let mut form = TestForm::new();

    orchestrator
        .place_order(session, &card(), &mut form)
        .await
        .unwrap();
    assert_eq!(form.submissions, 1);

    // Buyer triggers place-order again; the payload already carries the
    // token, so it goes straight through.
    let outcome = orchestrator
        .place_order(session, &card(), &mut form)
        .await
        .unwrap();
    assert_matches!(outcome, PlaceOrderOutcome::Submitted(result) if result.is_success());
    assert_eq!(form.submissions, 2);
}

#[tokio::test]
async fn invalid_card_input_blocks_submission_and_resets() {
    let processor = MockServer::start().await;
    let token_host = MockServer::start().await;
    mount_happy_processor(&processor, &token_host).await;

    let (orchestrator, attempts) = orchestrator(&processor.uri());
    let session = Uuid::new_v4();
    let mut form = TestForm::new();

    let bad_card = CardFields {
        number: "4242 4242 4242 4242".to_string(),
        expiry: "1225".to_string(),
        cvc: "123".to_string(),
    };

    let err = orchestrator
        .place_order(session, &bad_card, &mut form)
        .await
        .unwrap_err();

    assert_matches!(err, GatewayError::Validation(_));
    assert_eq!(form.submissions, 0, "default submission must stay suppressed");
    assert_eq!(form.errors.len(), 1, "field-level error surfaced");
    assert_eq!(attempts.state(session), PaymentAttemptState::Idle);
}

#[tokio::test]
async fn failed_submission_surfaces_messages_and_allows_retry() {
    let processor = MockServer::start().await;
    let token_host = MockServer::start().await;
    mount_happy_processor(&processor, &token_host).await;

    let (orchestrator, attempts) = orchestrator(&processor.uri());
    let session = Uuid::new_v4();
    let mut form = TestForm::answering(SubmissionResult::failure(Some(
        "Payment declined.".to_string(),
    )));

    let outcome = orchestrator
        .place_order(session, &card(), &mut form)
        .await
        .unwrap();

    assert_matches!(outcome, PlaceOrderOutcome::Submitted(result) if !result.is_success());
    assert_eq!(form.errors, vec!["Payment declined.".to_string()]);
    // The buyer is back in a retryable state.
    assert_eq!(attempts.state(session), PaymentAttemptState::Idle);
}

#[tokio::test]
async fn reentrant_submit_while_tokenizing_is_a_noop() {
    let processor = MockServer::start().await;
    let token_host = MockServer::start().await;

    // Slow pretransact keeps the first attempt in Tokenizing while the
    // second trigger arrives.
    Mock::given(method("GET"))
        .and(path("/pretransact"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "cardTokenRequestUrl": format!("{}/tokens", token_host.uri()),
                    "cardTokenRequestParams": { "cardNumber": "#cardNumber#" }
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&processor)
        .await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": "tok_slow" })),
        )
        .mount(&token_host)
        .await;

    let (orchestrator, _) = orchestrator(&processor.uri());
    let orchestrator = Arc::new(orchestrator);
    let session = Uuid::new_v4();

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let mut form = TestForm::new();
            orchestrator.place_order(session, &card(), &mut form).await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;

    // The pending attempt owns the session; this trigger does nothing.
    let mut second_form = TestForm::new();
    let outcome = orchestrator
        .place_order(session, &card(), &mut second_form)
        .await
        .unwrap();
    assert_matches!(outcome, PlaceOrderOutcome::Ignored);
    assert_eq!(second_form.submissions, 0);

    let first_outcome = first.await.unwrap().unwrap();
    assert_matches!(first_outcome, PlaceOrderOutcome::Submitted(result) if result.is_success());
}

#[tokio::test]
async fn concurrent_sessions_do_not_share_state() {
    let processor = MockServer::start().await;
    let token_host = MockServer::start().await;

    // Two sessions, two tokenizations: each fetches its own descriptor.
    Mock::given(method("GET"))
        .and(path("/pretransact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cardTokenRequestUrl": format!("{}/tokens", token_host.uri()),
            "cardTokenRequestParams": { "cardNumber": "#cardNumber#" }
        })))
        .expect(2)
        .mount(&processor)
        .await;
    Mock::given(method("POST"))
        .and(path("/tokens"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": "tok_shared" })),
        )
        .mount(&token_host)
        .await;

    let (orchestrator, attempts) = orchestrator(&processor.uri());
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    let mut form_a = TestForm::new();
    let mut form_b = TestForm::new();

    orchestrator
        .place_order(first, &card(), &mut form_a)
        .await
        .unwrap();
    orchestrator
        .place_order(second, &card(), &mut form_b)
        .await
        .unwrap();

    assert_eq!(attempts.state(first), PaymentAttemptState::Settled);
    assert_eq!(attempts.state(second), PaymentAttemptState::Settled);
    assert_eq!(form_a.submissions, 1);
    assert_eq!(form_b.submissions, 1);
}
