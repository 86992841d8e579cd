//! Document API integration tests.
//!
//! Tests verify:
//! - CRUD and search through the router
//! - Error mapping (404, 403, 401 from the backend, 422, 500)
//! - Idempotent reads and create-then-get round trips
//! - Single construction of the SDK client under concurrent first use

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::test_utils::{body_json, json_request, test_router, MockSdk, EXPIRED_TOKEN, TEST_TOKEN};

// =============================================================================
// Get
// =============================================================================

#[tokio::test]
async fn test_get_document_success() {
    let sdk = MockSdk::new()
        .with_document("Users", "u1", json!({"name": "Ada", "age": 36}))
        .await;
    let (router, _) = test_router(sdk.clone());

    let response = router
        .oneshot(json_request(
            "/api/test/get",
            Some(TEST_TOKEN),
            json!({"doc_type": "Users", "doc_id": "u1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["doc_type"], "Users");
    assert_eq!(json["doc_id"], "u1");
    assert_eq!(json["data"], json!({"name": "Ada", "age": 36}));

    // The caller's token reached the SDK untouched
    assert_eq!(sdk.tokens().await, vec![TEST_TOKEN.to_string()]);
}

#[tokio::test]
async fn test_get_missing_document_is_404() {
    let (router, _) = test_router(MockSdk::new());

    let response = router
        .oneshot(json_request(
            "/api/test/get",
            Some(TEST_TOKEN),
            json!({"doc_type": "Users", "doc_id": "ghost"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Not Found");
    assert!(json["detail"].as_str().unwrap().contains("Users/ghost"));
}

#[tokio::test]
async fn test_get_is_idempotent() {
    let sdk = MockSdk::new()
        .with_document("Users", "u1", json!({"name": "Ada"}))
        .await;
    let (router, _) = test_router(sdk);

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(json_request(
                "/api/test/get",
                Some(TEST_TOKEN),
                json!({"doc_type": "Users", "doc_id": "u1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(body_json(response).await);
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);
}

// =============================================================================
// Create / Update / Delete
// =============================================================================

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());
    let data = json!({
        "title": "hello",
        "tags": ["a", "b"],
        "meta": {"pinned": true, "score": 1.5},
        "archived_at": null
    });

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/test/create",
            Some(TEST_TOKEN),
            json!({"doc_type": "Chats", "doc_id": "c1", "data": data}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["id"], "c1");
    assert_eq!(json["result"]["data"], data);

    let response = router
        .oneshot(json_request(
            "/api/test/get",
            Some(TEST_TOKEN),
            json!({"doc_type": "Chats", "doc_id": "c1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], data);
}

#[tokio::test]
async fn test_create_existing_is_unclassified_500() {
    let sdk = MockSdk::new()
        .with_document("Chats", "c1", json!({"title": "old"}))
        .await;
    let (router, _) = test_router(sdk);

    let response = router
        .oneshot(json_request(
            "/api/test/create",
            Some(TEST_TOKEN),
            json!({"doc_type": "Chats", "doc_id": "c1", "data": {"title": "new"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_update_merges_fields() {
    let sdk = MockSdk::new()
        .with_document("Users", "u1", json!({"name": "Ada", "status": "new"}))
        .await;
    let (router, _) = test_router(sdk.clone());

    let response = router
        .oneshot(json_request(
            "/api/test/update",
            Some(TEST_TOKEN),
            json!({"doc_type": "Users", "doc_id": "u1", "data": {"status": "active"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["result"]["data"],
        json!({"name": "Ada", "status": "active"})
    );

    let stored = sdk.document("Users", "u1").await.unwrap();
    assert_eq!(stored["status"], "active");
}

#[tokio::test]
async fn test_update_missing_document_is_404() {
    let (router, _) = test_router(MockSdk::new());

    let response = router
        .oneshot(json_request(
            "/api/test/update",
            Some(TEST_TOKEN),
            json!({"doc_type": "Users", "doc_id": "ghost", "data": {"status": "active"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_document() {
    let sdk = MockSdk::new()
        .with_document("Users", "u1", json!({"name": "Ada"}))
        .await;
    let (router, _) = test_router(sdk.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/test/delete",
            Some(TEST_TOKEN),
            json!({"doc_type": "Users", "doc_id": "u1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["message"].as_str().unwrap().contains("Users/u1"));
    assert!(sdk.document("Users", "u1").await.is_none());

    // Second delete finds nothing
    let response = router
        .oneshot(json_request(
            "/api/test/delete",
            Some(TEST_TOKEN),
            json!({"doc_type": "Users", "doc_id": "u1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_filters_and_limits() {
    let sdk = MockSdk::new()
        .with_document("Chats", "c1", json!({"owner": "u1"}))
        .await
        .with_document("Chats", "c2", json!({"owner": "u2"}))
        .await
        .with_document("Chats", "c3", json!({"owner": "u1"}))
        .await
        .with_document("Users", "u1", json!({"owner": "u1"}))
        .await;
    let (router, _) = test_router(sdk);

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/test/search",
            Some(TEST_TOKEN),
            json!({"doc_type": "Chats", "query_constraints": {"owner": "u1"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["doc_type"], "Chats");
    assert_eq!(json["count"], 2);
    let ids: Vec<_> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["c1", "c3"]);

    let response = router
        .oneshot(json_request(
            "/api/test/search",
            Some(TEST_TOKEN),
            json!({"doc_type": "Chats", "limit": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["count"], 1);
}

#[tokio::test]
async fn test_search_null_optionals_fall_back_to_defaults() {
    let sdk = MockSdk::new()
        .with_document("Chats", "c1", json!({"owner": "u1"}))
        .await
        .with_document("Chats", "c2", json!({"owner": "u2"}))
        .await;
    let (router, _) = test_router(sdk.clone());

    let response = router
        .oneshot(json_request(
            "/api/test/search",
            Some(TEST_TOKEN),
            json!({
                "doc_type": "Chats",
                "query_constraints": null,
                "limit": null,
                "order_by": null
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 2);
    assert_eq!(sdk.call_count(), 1);
}

#[tokio::test]
async fn test_search_limit_out_of_range_is_422() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    for limit in [0, 101] {
        let response = router
            .clone()
            .oneshot(json_request(
                "/api/test/search",
                Some(TEST_TOKEN),
                json!({"doc_type": "Chats", "limit": limit}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert_eq!(sdk.call_count(), 0);
}

#[tokio::test]
async fn test_search_unknown_operator_is_422() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    let response = router
        .oneshot(json_request(
            "/api/test/search",
            Some(TEST_TOKEN),
            json!({"doc_type": "Chats", "query_constraints": {"age": {"op": "~", "value": 1}}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "Validation Error");
    assert_eq!(sdk.call_count(), 0);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_malformed_bodies_are_422() {
    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    let cases = [
        ("/api/test/get", json!({"doc_type": "Users"})),
        ("/api/test/get", json!({"doc_type": "", "doc_id": "u1"})),
        ("/api/test/create", json!({"doc_type": "Users", "doc_id": "u1"})),
        (
            "/api/test/update",
            json!({"doc_type": "Users", "doc_id": "u1", "data": {}}),
        ),
        ("/api/test/delete", json!({"doc_id": "u1"})),
        ("/api/test/search", json!({"query_constraints": {}})),
        ("/api/test/storage/get-url", json!({"folder_name": "uploads"})),
    ];

    for (uri, body) in cases {
        let response = router
            .clone()
            .oneshot(json_request(uri, Some(TEST_TOKEN), body.clone()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{} {}",
            uri,
            body
        );
        assert_eq!(body_json(response).await["error"], "Validation Error");
    }

    assert_eq!(sdk.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_json_is_422() {
    use axum::body::Body;
    use axum::http::Request;

    let sdk = MockSdk::new();
    let (router, _) = test_router(sdk.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/api/test/get")
        .header("content-type", "application/json")
        .header("authorization", TEST_TOKEN)
        .body(Body::from("{not json"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(sdk.call_count(), 0);
}

// =============================================================================
// Security Rules and Backend Auth
// =============================================================================

#[tokio::test]
async fn test_denied_collection_is_403() {
    let sdk = MockSdk::new()
        .with_document("Secrets", "s1", json!({"value": 42}))
        .await
        .deny("Secrets")
        .await;
    let (router, _) = test_router(sdk);

    for (uri, body) in [
        ("/api/test/get", json!({"doc_type": "Secrets", "doc_id": "s1"})),
        (
            "/api/test/update",
            json!({"doc_type": "Secrets", "doc_id": "s1", "data": {"value": 0}}),
        ),
        ("/api/test/delete", json!({"doc_type": "Secrets", "doc_id": "s1"})),
        ("/api/test/search", json!({"doc_type": "Secrets"})),
    ] {
        let response = router
            .clone()
            .oneshot(json_request(uri, Some(TEST_TOKEN), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body_json(response).await["error"], "Forbidden");
    }
}

#[tokio::test]
async fn test_token_rejected_by_backend_is_401() {
    let sdk = MockSdk::new()
        .with_document("Users", "u1", json!({"name": "Ada"}))
        .await;
    let (router, _) = test_router(sdk);

    let response = router
        .oneshot(json_request(
            "/api/test/get",
            Some(EXPIRED_TOKEN),
            json!({"doc_type": "Users", "doc_id": "u1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");
}

// =============================================================================
// Client Construction
// =============================================================================

#[tokio::test]
async fn test_concurrent_first_requests_construct_client_once() {
    let sdk = MockSdk::new()
        .with_document("Users", "u1", json!({"name": "Ada"}))
        .await;
    let (router, holder) = test_router(sdk);
    assert!(!holder.is_initialized());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            router
                .oneshot(json_request(
                    "/api/test/get",
                    Some(TEST_TOKEN),
                    json!({"doc_type": "Users", "doc_id": "u1"}),
                ))
                .await
                .unwrap()
                .status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(holder.factory().connect_count(), 1);
}

#[tokio::test]
async fn test_health_does_not_touch_sdk() {
    use axum::body::Body;
    use axum::http::Request;

    let (router, holder) = test_router(MockSdk::new());

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "fn7-gateway");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(!holder.is_initialized());
}
