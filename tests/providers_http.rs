// tests/providers_http.rs
// HTTP adapters against a local mock server.
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trend_discovery::connectors::{InstagramConnector, PerplexityConnector, YoutubeConnector};
use trend_discovery::enrich::OpenAiBriefingProvider;
use trend_discovery::similarity::OpenAiEmbeddings;
use trend_discovery::{
    BriefingProvider, BriefingRequest, DiscoveryOptions, EmbeddingProvider, Platform,
    PlatformConnector, TimeRange, TrendDiscovery,
};

fn iso(ts: chrono::DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------- OpenAI embeddings ----------------

#[tokio::test]
async fn embeddings_batch_is_placed_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "text-embedding-3-small"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(Some("sk-test".into()), "text-embedding-3-small")
        .unwrap()
        .with_base_url(server.uri());
    let out = client
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await;
    assert_eq!(out, vec![Some(vec![1.0, 0.0]), Some(vec![0.0, 1.0])]);
}

#[tokio::test]
async fn embeddings_http_error_degrades_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(Some("sk-test".into()), "m")
        .unwrap()
        .with_base_url(server.uri());
    assert!(client.embed_query("kw").await.is_none());
    assert_eq!(client.embed_batch(&["a".to_string()]).await, vec![None]);
}

#[tokio::test]
async fn embeddings_without_key_never_call_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(None, "m").unwrap().with_base_url(server.uri());
    assert!(!client.is_configured());
    assert!(client.embed_query("kw").await.is_none());
}

// ---------------- OpenAI briefings ----------------

fn request() -> BriefingRequest {
    BriefingRequest {
        title: "AI agents for marketing".into(),
        context: "Short-form videos on agent workflows".into(),
        platform: Platform::Youtube,
        url: "https://www.youtube.com/watch?v=v1".into(),
        engagement_summary: "engagement score 50.5 on youtube".into(),
    }
}

#[tokio::test]
async fn briefing_parses_json_mode_answer() {
    let server = MockServer::start().await;
    let content = json!({
        "briefing": "Agents are everywhere.",
        "keyPoints": ["one", "two", "three", "four", "five", "six"],
        "angles": ["tutorial", "myth busting"],
        "targetAudience": "marketers"
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiBriefingProvider::new("sk-test".into(), None)
        .unwrap()
        .with_base_url(server.uri());
    let resp = provider.generate(&request()).await.unwrap();
    let b = resp.into_briefing().unwrap();
    assert_eq!(b.briefing, "Agents are everywhere.");
    assert_eq!(b.key_points.len(), 5);
    assert_eq!(b.suggested_angles, vec!["tutorial", "myth busting"]);
    assert_eq!(b.target_audience.as_deref(), Some("marketers"));
}

#[tokio::test]
async fn briefing_server_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = OpenAiBriefingProvider::new("sk-test".into(), Some("gpt-4o-mini"))
        .unwrap()
        .with_base_url(server.uri());
    assert!(provider.generate(&request()).await.is_err());
}

// ---------------- YouTube ----------------

#[tokio::test]
async fn youtube_joins_search_and_statistics() {
    let server = MockServer::start().await;
    let published = iso(Utc::now() - ChronoDuration::hours(3));
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "ai marketing"))
        .and(header("x-goog-api-key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": {"videoId": "v1"}, "snippet": {"title": "Big one", "description": "d1", "channelTitle": "C1", "publishedAt": published}},
                {"id": {"videoId": "v2"}, "snippet": {"title": "Small one", "description": "d2", "channelTitle": "C2", "publishedAt": published}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "v1,v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "v1", "statistics": {"viewCount": "99999", "likeCount": "999", "commentCount": "99"}},
                {"id": "v2", "statistics": {"viewCount": "9"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let yt = YoutubeConnector::new(Some("yt-key".into()))
        .unwrap()
        .with_base_url(server.uri());
    let topics = yt.discover_by_keyword("ai marketing", TimeRange::Week).await.unwrap();

    assert_eq!(topics.len(), 2);
    assert!(topics[0].id.starts_with("youtube-v1-"));
    assert_eq!(topics[0].source.url, "https://www.youtube.com/watch?v=v1");
    // 10 * (0.6*5 + 0.25*3 + 0.15*2) = 40.5
    assert!((topics[0].metrics.engagement_score - 40.5).abs() < 1e-6);
    // 10 * 0.6 * 1 = 6
    assert!((topics[1].metrics.engagement_score - 6.0).abs() < 1e-6);
}

#[tokio::test]
async fn youtube_missing_statistics_keeps_topics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": {"videoId": "v1"}, "snippet": {"title": "Only", "description": "", "channelTitle": "C"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let yt = YoutubeConnector::new(Some("k".into())).unwrap().with_base_url(server.uri());
    let topics = yt.discover_by_keyword("kw", TimeRange::Day).await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].metrics.engagement_score, 0.0);
}

#[tokio::test]
async fn youtube_search_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
        .mount(&server)
        .await;

    let yt = YoutubeConnector::new(Some("k".into())).unwrap().with_base_url(server.uri());
    let err = yt.discover_by_keyword("kw", TimeRange::Day).await.unwrap_err();
    assert!(format!("{err:#}").contains("quotaExceeded"));
}

#[tokio::test]
async fn youtube_transport_error_does_not_expose_the_key() {
    // Nothing listens on port 1: the request fails before any response.
    let yt = YoutubeConnector::new(Some("SECRET-YT-KEY".into()))
        .unwrap()
        .with_base_url("http://127.0.0.1:1");
    let discovery = TrendDiscovery::new().with_connector(Arc::new(yt));

    let res = discovery
        .discover(DiscoveryOptions::new("kw").platforms([Platform::Youtube]))
        .await
        .unwrap();
    let errors = res.metadata.platform_errors.expect("connection refused is reported");
    let msg = &errors[&Platform::Youtube];
    assert!(msg.contains("youtube search request"), "{msg}");
    assert!(!msg.contains("SECRET-YT-KEY"), "{msg}");
}

#[tokio::test]
async fn youtube_without_key_returns_empty() {
    let yt = YoutubeConnector::new(None).unwrap().with_base_url("http://127.0.0.1:9");
    assert!(!yt.is_configured());
    let topics = yt.discover_by_keyword("kw", TimeRange::Week).await.unwrap();
    assert!(topics.is_empty());
}

// ---------------- Instagram (Apify) ----------------

#[tokio::test]
async fn instagram_runs_hashtag_actor_and_drops_old_posts() {
    let server = MockServer::start().await;
    let fresh = iso(Utc::now() - ChronoDuration::hours(5));
    let stale = iso(Utc::now() - ChronoDuration::days(40));
    Mock::given(method("POST"))
        .and(path("/acts/apify~instagram-hashtag-scraper/run-sync-get-dataset-items"))
        .and(header("authorization", "Bearer apify-token"))
        .and(body_partial_json(json!({"hashtags": ["aimarketing"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"caption": "Fresh post\nmore text #aimarketing", "shortCode": "AAA", "likesCount": 98, "commentsCount": 1, "timestamp": fresh},
            {"caption": "Old post", "shortCode": "BBB", "likesCount": 5000, "commentsCount": 50, "timestamp": stale},
            {"caption": null, "shortCode": "CCC", "likesCount": 1, "commentsCount": 0, "timestamp": fresh}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let ig = InstagramConnector::new(Some("apify-token".into()))
        .unwrap()
        .with_base_url(server.uri());
    let topics = ig.discover_by_keyword("AI Marketing", TimeRange::Month).await.unwrap();

    assert_eq!(topics.len(), 1);
    let t = &topics[0];
    assert_eq!(t.title, "Fresh post");
    assert_eq!(t.theme, "#aimarketing");
    assert_eq!(t.source.url, "https://www.instagram.com/p/AAA/");
    // 10 * log10(98 + 2 + 1) ≈ 20.04
    assert!((t.metrics.engagement_score - 10.0 * 101f64.log10()).abs() < 1e-9);
}

#[tokio::test]
async fn instagram_actor_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(402).set_body_string("payment required"))
        .mount(&server)
        .await;

    let ig = InstagramConnector::new(Some("t".into())).unwrap().with_base_url(server.uri());
    assert!(ig.discover_by_keyword("kw", TimeRange::Week).await.is_err());
}

// ---------------- Perplexity ----------------

#[tokio::test]
async fn perplexity_extracts_array_and_falls_back_to_citations() {
    let server = MockServer::start().await;
    let content = "Here you go:\n```json\n[\
        {\"title\": \"First trend\", \"theme\": \"ai\", \"summary\": \"s1\", \"url\": \"https://a.test\"},\
        {\"title\": \"Second trend\", \"summary\": \"s2\"}\
    ]\n```";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer pplx"))
        .and(body_partial_json(json!({"search_recency_filter": "week"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": content}}],
            "citations": ["https://c0.test", "https://c1.test"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let px = PerplexityConnector::new(Some("pplx".into()))
        .unwrap()
        .with_base_url(server.uri());
    let topics = px.discover_by_keyword("ai marketing", TimeRange::Week).await.unwrap();

    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].source.url, "https://a.test");
    assert_eq!(topics[0].metrics.engagement_score, 100.0);
    assert_eq!(topics[1].source.url, "https://c1.test");
    assert_eq!(topics[1].theme, "ai marketing");
    assert_eq!(topics[1].metrics.engagement_score, 90.0);
}

#[tokio::test]
async fn perplexity_prose_answer_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Sorry, I cannot help with that."}}]
        })))
        .mount(&server)
        .await;

    let px = PerplexityConnector::new(Some("k".into())).unwrap().with_base_url(server.uri());
    assert!(px.discover_by_keyword("kw", TimeRange::Day).await.is_err());
}
