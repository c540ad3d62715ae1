//! Integration tests for `HttpReasoningClient` using wiremock HTTP mocks.

use std::time::Duration;

use citescope_core::{
    CitationClass, CitationRow, KeywordRow, ProjectContext, RecommendationSource,
    RecommendationType,
};
use citescope_optimizer::{
    analyze_with_ai, build_analysis_data, AiContext, AnalyzerError, HttpReasoningClient,
    ReasoningClient,
};
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> HttpReasoningClient {
    HttpReasoningClient::with_base_url("test-key", base_url, "test-model", 5)
        .expect("client construction should not fail")
        .with_retry(0, 0)
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn complete_returns_first_choice_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hello")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&format!("{}/v1", server.uri()));
    let reply = client.complete("prompt").await.expect("should complete");

    assert_eq!(reply, "hello");
}

#[tokio::test]
async fn client_error_status_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri()).with_retry(3, 0);
    let err = client.complete("prompt").await.unwrap_err();

    assert!(matches!(
        err,
        AnalyzerError::UnexpectedStatus { status: 401, ref body } if body == "bad key"
    ));
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri()).with_retry(1, 0);
    let reply = client.complete("prompt").await.expect("retry should succeed");

    assert_eq!(reply, "recovered");
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.complete("prompt").await.unwrap_err();

    assert!(matches!(err, AnalyzerError::EmptyCompletion));
}

#[test]
fn blank_api_key_is_rejected() {
    let err = HttpReasoningClient::with_base_url("  ", "http://localhost", "m", 5)
        .err()
        .expect("blank key must fail");
    assert!(matches!(err, AnalyzerError::MissingCredential));
}

#[test]
fn unparseable_base_url_is_rejected() {
    let err = HttpReasoningClient::with_base_url("key", "not a url", "m", 5)
        .err()
        .expect("bad url must fail");
    assert!(matches!(err, AnalyzerError::InvalidBaseUrl { .. }));
}

#[tokio::test]
async fn analyzer_turns_fenced_replies_into_recommendations() {
    let server = MockServer::start().await;

    let reply = "Here you go:\n```json\n{\"recommendations\": [\
        {\"type\": \"Add_Comparison\", \"title\": \"Publish a tools comparison\", \
         \"description\": \"Cover the tools competitors are cited for.\", \
         \"steps\": [\"Outline\", \" \", \"Publish\"]},\
        {\"type\": \"launch_podcast\", \"title\": \"Start a podcast\", \"description\": \"\"}\
    ]}\n```";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
        .expect(1)
        .mount(&server)
        .await;

    let keyword_id = Uuid::from_u128(10);
    let competitor_id = Uuid::from_u128(100);
    let data = build_analysis_data(
        ProjectContext {
            project_id: Uuid::from_u128(1),
            brand_name: "Soldier Data".to_string(),
            brand_domain: "soldierdata.com".to_string(),
        },
        &[
            KeywordRow {
                keyword_id,
                keyword: "best seo tools".to_string(),
            },
            KeywordRow {
                keyword_id: Uuid::from_u128(11),
                keyword: "nobody cited".to_string(),
            },
        ],
        &[CitationRow {
            keyword_id,
            engine: "chatgpt".to_string(),
            url: "https://ahrefs.com/blog/seo-tools".to_string(),
            position: Some(1),
            classification: CitationClass::Competitor { competitor_id },
            competitor_name: Some("Ahrefs".to_string()),
        }],
        &[],
        None,
    );

    let ctx = AiContext {
        api_key: Some("test-key".to_string()),
        tier_allows_ai: true,
        batch_size: 5,
        batch_delay: Duration::ZERO,
    };
    let result = analyze_with_ai(&data, &ctx, &test_client(&server.uri())).await;

    assert_eq!(result.recommendations.len(), 2);
    assert!(result.content_gaps.is_empty());
    for rec in &result.recommendations {
        assert_eq!(rec.source, RecommendationSource::AiPowered);
        assert_eq!(rec.keyword_id, Some(keyword_id));
    }

    let podcast = result
        .recommendations
        .iter()
        .find(|r| r.title == "Start a podcast")
        .expect("unknown type is kept");
    assert_eq!(
        podcast.recommendation_type,
        RecommendationType::CreateContent
    );
    assert_eq!(
        podcast.metadata.get("original_type"),
        Some(&serde_json::json!("launch_podcast"))
    );

    let comparison = result
        .recommendations
        .iter()
        .find(|r| r.title == "Publish a tools comparison")
        .expect("known type is kept");
    assert_eq!(
        comparison.recommendation_type,
        RecommendationType::AddComparison
    );
    assert_eq!(comparison.actionable_steps, vec!["Outline", "Publish"]);
    assert!(comparison.metadata.is_empty());
}

#[tokio::test]
async fn analyzer_skips_network_without_paid_plan() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let data = build_analysis_data(
        ProjectContext {
            project_id: Uuid::from_u128(1),
            brand_name: "Soldier Data".to_string(),
            brand_domain: "soldierdata.com".to_string(),
        },
        &[],
        &[],
        &[],
        None,
    );
    let ctx = AiContext {
        api_key: Some("test-key".to_string()),
        tier_allows_ai: false,
        ..AiContext::default()
    };

    let result = analyze_with_ai(&data, &ctx, &test_client(&server.uri())).await;
    assert!(result.recommendations.is_empty());
}
