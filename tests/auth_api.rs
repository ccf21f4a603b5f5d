mod common;

use actix_web::{test, App};
use serde_json::{json, Value};

use common::{bearer, register, TestApp};

#[actix_web::test]
async fn register_login_me_round_trip() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let token = register(&app, "Alice", "alice@example.com").await;

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["name"], "Alice");
    assert!(body.get("password_hash").is_none());

    // A fresh login issues a second working token
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "alice@example.com", "password": "password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[actix_web::test]
async fn requests_without_valid_token_are_rejected() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let req = test::TestRequest::get().uri("/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::get()
        .uri("/tasks")
        .insert_header(bearer("not-a-real-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Unauthenticated.");
}

#[actix_web::test]
async fn register_validates_fields() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "name": "", "email": "not-an-email", "password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert_eq!(
        body["errors"]["password"][0],
        "The password must be at least 8 characters."
    );
}

#[actix_web::test]
async fn register_rejects_duplicate_email() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    register(&app, "Alice", "alice@example.com").await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "name": "Imposter",
            "email": "alice@example.com",
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
}

#[actix_web::test]
async fn login_rejects_bad_credentials() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    register(&app, "Alice", "alice@example.com").await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "nobody@example.com", "password": "password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn logout_revokes_the_token() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let token = register(&app, "Alice", "alice@example.com").await;

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn user_list_excludes_the_caller() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    register(&app, "Bob", "bob@example.com").await;

    let req = test::TestRequest::get()
        .uri("/users")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    let users = body.as_array().expect("user list");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "bob@example.com");
    assert!(users[0].get("password_hash").is_none());
}
