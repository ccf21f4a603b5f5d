mod common;

use actix_web::{test, App};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{bearer, create_task, register, user_id, wait_for_task_status, TestApp};

#[actix_web::test]
async fn create_task_applies_defaults() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let token = register(&app, "Alice", "alice@example.com").await;
    let task = create_task(&app, &token, json!({ "title": "Write the launch plan" })).await;

    assert_eq!(task["status"], "pending");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["user"]["name"], "Alice");
    assert!(task["assignee"].is_null());
    assert!(task["due_date"].is_null());
}

#[actix_web::test]
async fn create_task_validates_input() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let token = register(&app, "Alice", "alice@example.com").await;

    // Missing title
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(&token))
        .set_json(json!({ "description": "no title here" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["title"][0], "The title field is required.");

    // Due date in the past
    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Late already", "due_date": yesterday }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["errors"]["due_date"][0],
        "The due date must be a date after or equal to today."
    );

    // Unknown status and priority
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Bad enums", "status": "done", "priority": "urgent" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["status"][0], "The selected status is invalid.");
    assert_eq!(
        body["errors"]["priority"][0],
        "The selected priority is invalid."
    );

    // Assignee that does not exist
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Ghost assignee", "assigned_to": 9999 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["errors"]["assigned_to"][0],
        "The selected assigned to is invalid."
    );
}

#[actix_web::test]
async fn outsiders_get_403_on_read_update_delete() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    let mallory = register(&app, "Mallory", "mallory@example.com").await;

    let task = create_task(&app, &alice, json!({ "title": "Private work" })).await;
    let task_id = task["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&mallory))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 403);

    let req = test::TestRequest::put()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&mallory))
        .set_json(json!({ "title": "Hijacked" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&mallory))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 403);
}

#[actix_web::test]
async fn assignee_may_update_but_not_delete() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    let bob = register(&app, "Bob", "bob@example.com").await;
    let bob_id = user_id(&app, &bob).await;

    let task = create_task(
        &app,
        &alice,
        json!({ "title": "Shared work", "assigned_to": bob_id }),
    )
    .await;
    let task_id = task["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&bob))
        .set_json(json!({ "status": "in_progress" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["task"]["status"], "in_progress");

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "Unauthorized - Only task creator can delete task"
    );
}

#[actix_web::test]
async fn deleted_tasks_disappear_from_reads() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    let task = create_task(&app, &alice, json!({ "title": "Doomed" })).await;
    let task_id = task["id"].as_i64().unwrap();

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", task_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);

    let req = test::TestRequest::get()
        .uri("/tasks")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn list_filters_by_status_priority_and_search() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;

    create_task(
        &app,
        &alice,
        json!({ "title": "Ship the Foo release", "status": "completed", "priority": "high" }),
    )
    .await;
    create_task(
        &app,
        &alice,
        json!({ "title": "Write docs", "description": "covers FOO too", "priority": "high" }),
    )
    .await;
    create_task(
        &app,
        &alice,
        json!({ "title": "Unrelated chore", "status": "completed", "priority": "low" }),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/tasks?status=completed&priority=high")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["title"], "Ship the Foo release");

    // Case-insensitive match against title OR description
    let req = test::TestRequest::get()
        .uri("/tasks?search=foo")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 2);

    // "all" disables the filter
    let req = test::TestRequest::get()
        .uri("/tasks?status=all&priority=all")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 3);
}

#[actix_web::test]
async fn list_only_shows_created_or_assigned_tasks() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    let bob = register(&app, "Bob", "bob@example.com").await;
    let bob_id = user_id(&app, &bob).await;

    create_task(&app, &alice, json!({ "title": "Alice only" })).await;
    create_task(
        &app,
        &alice,
        json!({ "title": "Assigned to Bob", "assigned_to": bob_id }),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/tasks")
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["title"], "Assigned to Bob");
    assert_eq!(body["data"][0]["assignee"]["name"], "Bob");
}

#[actix_web::test]
async fn list_paginates_at_ten_rows() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    for i in 0..15 {
        create_task(&app, &alice, json!({ "title": format!("Task {}", i) })).await;
    }

    let req = test::TestRequest::get()
        .uri("/tasks")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 15);
    assert_eq!(body["per_page"], 10);
    assert_eq!(body["last_page"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let req = test::TestRequest::get()
        .uri("/tasks?page=2")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["current_page"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
}

#[actix_web::test]
async fn sort_field_falls_back_to_whitelist() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    create_task(&app, &alice, json!({ "title": "Bravo" })).await;
    create_task(&app, &alice, json!({ "title": "Alpha" })).await;

    // Unknown sort fields never reach the SQL text
    let req = test::TestRequest::get()
        .uri("/tasks?sort_field=;drop%20table%20tasks&sort_direction=asc")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let req = test::TestRequest::get()
        .uri("/tasks?sort_field=title&sort_direction=asc")
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"][0]["title"], "Alpha");
    assert_eq!(body["data"][1]["title"], "Bravo");
}

#[actix_web::test]
async fn bulk_update_skips_tasks_the_caller_cannot_touch() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;
    let bob = register(&app, "Bob", "bob@example.com").await;

    let mine_a = create_task(&app, &alice, json!({ "title": "Mine A" })).await["id"]
        .as_i64()
        .unwrap();
    let mine_b = create_task(&app, &alice, json!({ "title": "Mine B" })).await["id"]
        .as_i64()
        .unwrap();
    let bobs = create_task(&app, &bob, json!({ "title": "Bob's own" })).await["id"]
        .as_i64()
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/tasks/bulk-update")
        .insert_header(bearer(&alice))
        .set_json(json!({ "task_ids": [mine_a, mine_b, bobs], "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    wait_for_task_status(&state.pool, mine_a, "completed").await;
    wait_for_task_status(&state.pool, mine_b, "completed").await;

    let bobs_status: String = sqlx::query_scalar("SELECT status FROM tasks WHERE id = ?")
        .bind(bobs)
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(bobs_status, "pending");
}

#[actix_web::test]
async fn bulk_update_requires_ids_and_update_data() {
    let state = TestApp::new().await;
    let app = test::init_service(App::new().configure(state.configure())).await;

    let alice = register(&app, "Alice", "alice@example.com").await;

    let req = test::TestRequest::post()
        .uri("/tasks/bulk-update")
        .insert_header(bearer(&alice))
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["task_ids"][0], "The task ids field is required.");

    let req = test::TestRequest::post()
        .uri("/tasks/bulk-update")
        .insert_header(bearer(&alice))
        .set_json(json!({ "task_ids": [1] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No update data provided");
}
