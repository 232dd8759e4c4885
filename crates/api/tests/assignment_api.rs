//! Integration tests for assignment administration and its effect on access.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{body_json, build_test_app, encode_id, MEN_05, WOMEN_02};

const USER: i64 = 7;

fn assignments_uri(user: i64) -> String {
    format!("/api/v1/admin/users/{user}/assignments")
}

#[tokio::test]
async fn annotators_cannot_manage_assignments() {
    let app = build_test_app().await;
    let token = app.annotator_token(USER);

    let response = app.get(&assignments_uri(USER), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(
            &assignments_uri(USER),
            &token,
            json!({"type": "explicit", "video_id": MEN_05}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pattern_rule_grants_matching_videos_only() {
    let app = build_test_app().await;
    app.add_video(MEN_05, 10);
    app.add_video(WOMEN_02, 10);
    let admin = app.admin_token();

    let response = app
        .post_json(
            &assignments_uri(USER),
            &admin,
            json!({
                "type": "pattern",
                "competition": "Olympic",
                "gender": "Men",
                "number_start": 1,
                "number_end": 30
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["user_id"], USER);
    assert_eq!(created["data"]["rule"]["type"], "pattern");

    let annotator = app.annotator_token(USER);
    let men = format!("/api/v1/annotations/{}/stats", encode_id(MEN_05));
    let women = format!("/api/v1/annotations/{}/stats", encode_id(WOMEN_02));
    assert_eq!(app.get(&men, &annotator).await.status(), StatusCode::OK);
    assert_eq!(app.get(&women, &annotator).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_and_delete_assignments() {
    let app = build_test_app().await;
    let admin = app.admin_token();

    for body in [
        json!({"type": "explicit", "video_id": "practice.mp4"}),
        json!({"type": "pattern", "gender": "Women"}),
    ] {
        let response = app.post_json(&assignments_uri(USER), &admin, body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let json = body_json(app.get(&assignments_uri(USER), &admin).await).await;
    let listed = json["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["rule"]["video_id"], "practice.mp4");
    let id = listed[0]["id"].as_i64().unwrap();

    let other = body_json(app.get(&assignments_uri(USER + 1), &admin).await).await;
    assert!(other["data"].as_array().unwrap().is_empty());

    let uri = format!("/api/v1/admin/assignments/{id}");
    assert_eq!(app.delete(&uri, &admin).await.status(), StatusCode::NO_CONTENT);
    let response = app.delete(&uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(app.get(&assignments_uri(USER), &admin).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_rules_are_rejected() {
    let app = build_test_app().await;
    let admin = app.admin_token();

    let response = app
        .post_json(
            &assignments_uri(USER),
            &admin,
            json!({"type": "pattern", "number_start": 30, "number_end": 1}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = app
        .post_json(
            &assignments_uri(USER),
            &admin,
            json!({"type": "explicit", "video_id": "../etc/passwd"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn explicit_rule_grants_non_conforming_name() {
    let app = build_test_app().await;
    app.add_video("practice session.mp4", 10);
    let admin = app.admin_token();

    app.post_json(
        &assignments_uri(USER),
        &admin,
        json!({"type": "explicit", "video_id": "practice session.mp4"}),
    )
    .await;

    let json = body_json(app.get("/api/v1/videos", &app.annotator_token(USER)).await).await;
    assert_eq!(json["data"][0]["video_id"], "practice session.mp4");
    assert!(json["data"][0]["identity"].is_null());
}
