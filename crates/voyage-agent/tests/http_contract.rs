//! HTTP contract tests for the reward API client and the Gemini generator.
//!
//! A local mock server stands in for both services; the assertions pin down
//! paths, query strings, headers and the response shapes we rely on.

use serde_json::json;
use voyage_agent::{
    GeminiGenerator, HttpVoyageApi, ReplyGenerator, ResilientClient, RetryPolicy, VoyageApi,
    USER_AGENTS,
};
use voyage_core::signer::sign_interaction;
use voyage_core::{
    Account, AccountSlot, InteractionMetadata, OutputArbiter, UnsignedInteraction, VoyageError,
};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn slot() -> AccountSlot {
    AccountSlot::new(0, Account::new("tok-1", "gem-key"), None)
}

#[tokio::test]
async fn test_fetch_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voyage/leaderboard"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "100"))
        .and(query_param("period", "all_time"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "my_rank": {
                "user_id": 1234,
                "user_name": "alice",
                "twitter_screen_name": "alice_tw",
                "total_points": 250,
                "rank": 17
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let profile = api.fetch_profile(&slot()).await.unwrap();
    assert_eq!(profile.id, 1234);
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.total_points, Some(250.0));
    assert_eq!(profile.rank, Some(17.0));

    let requests = server.received_requests().await.unwrap();
    let ua = requests[0].headers.get("user-agent").unwrap().to_str().unwrap();
    assert!(USER_AGENTS.contains(&ua));
}

#[tokio::test]
async fn test_fetch_profile_missing_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voyage/leaderboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "my_rank": {} })))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let err = api.fetch_profile(&slot()).await.unwrap_err();
    assert!(matches!(err, VoyageError::Validation(_)));
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voyage/leaderboard"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    match api.fetch_profile(&slot()).await {
        Err(VoyageError::Status { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recommended_prompts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/user/x2-point-recommendations"))
        .and(query_param("take", "100"))
        .and(query_param("page", "1"))
        .and(query_param("sort_type", "ASC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "data": [{ "text": "Q1" }, { "text": "Q2" }] }
        })))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let prompts = api.fetch_recommended_prompts(&slot()).await.unwrap();
    let texts: Vec<_> = prompts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["Q1", "Q2"]);
}

#[tokio::test]
async fn test_recommended_prompts_empty_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/user/x2-point-recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    assert!(api.fetch_recommended_prompts(&slot()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_categorized_prompts_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/user/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "questions": [{ "text": "a1" }, { "text": "a2" }, { "text": "a3" }] },
                { "questions": [{ "text": "b1" }, { "text": "b2" }, { "text": "b3" }] }
            ]
        })))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let prompts = api.fetch_categorized_prompts(&slot()).await.unwrap();
    assert_eq!(prompts.len(), 6);
    assert_eq!(prompts[3].text, "b1");
}

#[tokio::test]
async fn test_search_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai-models/search"))
        .and(query_param("query", "grok-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "model-grok", "name": "Grok 4" }]
        })))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let model = api.search_model(&slot(), "grok-4").await.unwrap();
    assert_eq!(model.id, json!("model-grok"));
    assert_eq!(model.name, "Grok 4");
}

fn signed_record() -> voyage_core::InteractionRecord {
    sign_interaction(
        UnsignedInteraction {
            user_id: 1234,
            model_id: json!("model-grok"),
            request_text: "Q1".to_string(),
            response_text: "OK".to_string(),
            metadata: InteractionMetadata::default(),
        },
        1_700_000_000_123,
    )
    .unwrap()
}

#[tokio::test]
async fn test_submit_interaction() {
    let server = MockServer::start().await;
    let record = signed_record();
    Mock::given(method("POST"))
        .and(path("/interactions"))
        .and(header("authorization", "Bearer tok-1"))
        .and(body_partial_json(json!({
            "userId": 1234,
            "modelId": "model-grok",
            "requestText": "Q1",
            "responseText": "OK",
            "metadata": { "hasSearch": false, "hasDeepSearch": false },
            "signature": record.signature,
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "aiResponse": "stored" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let body = api.submit_interaction(&slot(), &record).await.unwrap();
    assert_eq!(body["aiResponse"], "stored");
}

#[tokio::test]
async fn test_submit_interaction_requires_ai_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "aiResponse": null })))
        .mount(&server)
        .await;

    let api = HttpVoyageApi::new(server.uri());
    let err = api
        .submit_interaction(&slot(), &signed_record())
        .await
        .unwrap_err();
    assert!(matches!(err, VoyageError::Validation(_)));
}

#[tokio::test]
async fn test_resilient_client_recovers_from_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voyage/leaderboard"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/voyage/leaderboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "my_rank": { "user_id": 7, "user_name": "bob" }
        })))
        .mount(&server)
        .await;

    let (output, buffer) = OutputArbiter::in_memory();
    let client = ResilientClient::new(RetryPolicy::immediate(5), output);
    let api = HttpVoyageApi::new(server.uri());
    let slot = slot();

    let profile = client
        .call("Getting User Info", || api.fetch_profile(&slot))
        .await
        .unwrap();
    assert_eq!(profile.id, 7);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert!(buffer.contents().contains("Getting User Info [Retry 2/5]"));
}

#[tokio::test]
async fn test_invalid_proxy_fails_without_request() {
    let server = MockServer::start().await;
    let (output, _buffer) = OutputArbiter::in_memory();
    let client = ResilientClient::new(RetryPolicy::immediate(5), output);
    let api = HttpVoyageApi::new(server.uri());
    let slot = AccountSlot::new(
        0,
        Account::new("tok-1", "gem-key"),
        Some(voyage_core::ProxyAssignment::new("not a proxy uri")),
    );

    let err = client
        .call("Getting User Info", || api.fetch_profile(&slot))
        .await
        .unwrap_err();
    assert!(matches!(err, VoyageError::Exhausted { attempts: 1, .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gemini_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "gem-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "What is Voyage?" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "A reward program." }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = GeminiGenerator::new(server.uri(), "gemini-2.0-flash");
    let reply = generator.generate("gem-key", "What is Voyage?").await.unwrap();
    assert_eq!(reply, "A reward program.");
}

#[tokio::test]
async fn test_gemini_empty_reply_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let generator = GeminiGenerator::new(server.uri(), "gemini-2.0-flash");
    let err = generator.generate("gem-key", "hi").await.unwrap_err();
    assert!(matches!(err, VoyageError::Generation(_)));
}

#[tokio::test]
async fn test_gemini_whitespace_reply_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  \n " }] } }]
        })))
        .mount(&server)
        .await;

    let generator = GeminiGenerator::new(server.uri(), "gemini-2.0-flash");
    let reply = generator.generate("gem-key", "hi").await.unwrap();
    assert_eq!(reply, "  \n ");
}
