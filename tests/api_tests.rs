// tests/api_tests.rs

use std::sync::Arc;

use exam_portal::config::Config;
use exam_portal::handlers::auth::seed_admin;
use exam_portal::routes;
use exam_portal::state::AppState;
use exam_portal::store::{MemoryStore, RecordStore};

const ADMIN_EMAIL: &str = "admin@portal.test";
const ADMIN_PASSWORD: &str = "admin-password";

/// Spawns the app on a random port against a fresh in-memory store.
/// Returns the base URL and a handle to the store for direct seeding.
async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
    };

    seed_admin(store.as_ref(), &config)
        .await
        .expect("Failed to seed admin user");

    let shared: Arc<dyn RecordStore> = store.clone();
    let state = AppState {
        store: shared,
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

async fn login(client: &reqwest::Client, address: &str, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    response["token"]
        .as_str()
        .expect("Token not found")
        .to_string()
}

/// Registers a student, completes their profile name, and returns
/// (email, token).
async fn register_student(client: &reqwest::Client, address: &str) -> (String, String) {
    let email = format!("s_{}@portal.test", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Register failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();

    let token = response["token"].as_str().unwrap().to_string();

    let profile = client
        .put(format!("{}/api/profile", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "firstName": "Test",
            "lastName": "Student",
            "contactNumber": "555-0100"
        }))
        .send()
        .await
        .unwrap();
    assert!(profile.status().is_success());

    (email, token)
}

async fn create_exam(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    body: serde_json::Value,
) -> String {
    let response = client
        .post(format!("{}/api/admin/exams", address))
        .bearer_auth(admin_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works_and_returns_student_token() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = format!("u_{}@portal.test", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["role"], "student");
    assert!(body["token"].as_str().is_some());

    // Registering the same email twice conflicts.
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn register_fails_validation() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": "not-an-email", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn guards_deny_silently() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    // No token at all.
    let response = client
        .get(format!("{}/api/exams", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // A student hitting an admin route is a bodyless 403.
    let (_email, student_token) = register_student(&client, &address).await;
    let response = client
        .get(format!("{}/api/admin/results", address))
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    assert!(response.text().await.unwrap().is_empty());

    // An admin hitting a student route is denied the same way.
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let response = client
        .get(format!("{}/api/exams", address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn enrollment_requires_a_completed_profile() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let exam_id = create_exam(
        &client,
        &address,
        &admin_token,
        serde_json::json!({ "title": "History", "description": "", "questions": [] }),
    )
    .await;

    // Register without completing the profile.
    let email = format!("u_{}@portal.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    let token = response.json::<serde_json::Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = client
        .post(format!("{}/api/exams/{}/request", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn repeated_requests_create_exactly_one_pending_record() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let exam_id = create_exam(
        &client,
        &address,
        &admin_token,
        serde_json::json!({ "title": "Biology", "description": "", "questions": [] }),
    )
    .await;

    let (_email, token) = register_student(&client, &address).await;

    let first = client
        .post(format!("{}/api/exams/{}/request", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/exams/{}/request", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 200);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["status"], "already-requested");

    let listing = client
        .get(format!(
            "{}/api/admin/enrollments?examId={}",
            address, exam_id
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(listing["total"], 1);
    assert_eq!(listing["requests"][0]["status"], "pending");
    // The request snapshots the student's identity fields.
    assert_eq!(listing["requests"][0]["firstName"], "Test");
}

#[tokio::test]
async fn approval_unlocks_the_exam_and_requests_become_benign() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let exam_id = create_exam(
        &client,
        &address,
        &admin_token,
        serde_json::json!({ "title": "Chemistry", "description": "", "questions": [] }),
    )
    .await;

    let (_email, token) = register_student(&client, &address).await;

    client
        .post(format!("{}/api/exams/{}/request", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let listing = client
        .get(format!(
            "{}/api/admin/enrollments?examId={}",
            address, exam_id
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let request_id = listing["requests"][0]["id"].as_str().unwrap().to_string();

    let response = client
        .put(format!(
            "{}/api/admin/enrollments/{}/status",
            address, request_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Requesting again after approval is a no-op.
    let response = client
        .post(format!("{}/api/exams/{}/request", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "already-approved");

    // The session is now open for taking.
    let session = client
        .get(format!("{}/api/exams/{}", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(session["status"], "approved");
    assert_eq!(session["mode"], "in-progress");
}

#[tokio::test]
async fn enrollment_status_input_must_be_a_resolution() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let exam_id = create_exam(
        &client,
        &address,
        &admin_token,
        serde_json::json!({ "title": "Physics", "description": "", "questions": [] }),
    )
    .await;

    let (_email, token) = register_student(&client, &address).await;
    client
        .post(format!("{}/api/exams/{}/request", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let listing = client
        .get(format!(
            "{}/api/admin/enrollments?examId={}",
            address, exam_id
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let request_id = listing["requests"][0]["id"].as_str().unwrap().to_string();

    let response = client
        .put(format!(
            "{}/api/admin/enrollments/{}/status",
            address, request_id
        ))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "status": "pending" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn exam_title_is_required() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = client
        .post(format!("{}/api/admin/exams", address))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "title": "   ", "description": "x", "questions": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn question_endpoints_edit_a_persisted_exam() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_token = login(&client, &address, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let exam_id = create_exam(
        &client,
        &address,
        &admin_token,
        serde_json::json!({ "title": "Geography", "description": "", "questions": [] }),
    )
    .await;

    // Append two questions.
    for question in [
        serde_json::json!({
            "type": "identification",
            "question": "Capital of France?",
            "points": 5,
            "correctAnswer": "Paris"
        }),
        serde_json::json!({
            "type": "essay",
            "question": "Describe the water cycle.",
            "points": 10
        }),
    ] {
        let response = client
            .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
            .bearer_auth(&admin_token)
            .json(&question)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // A question with non-positive points is rejected.
    let response = client
        .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "type": "essay",
            "question": "Zero-point question",
            "points": 0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Replace the first question in place.
    let response = client
        .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "type": "multiple-choice",
            "question": "Pick the primary color.",
            "points": 5,
            "choices": ["Blue", "Green", ""],
            "correctAnswer": "Blue",
            "editIndex": 0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let questions: serde_json::Value = response.json().await.unwrap();
    assert_eq!(questions.as_array().unwrap().len(), 2);
    assert_eq!(questions[0]["type"], "multiple-choice");
    // Empty choice entries are filtered out before storing.
    assert_eq!(questions[0]["choices"].as_array().unwrap().len(), 2);

    // Remove the essay; the list shifts down.
    let response = client
        .delete(format!(
            "{}/api/admin/exams/{}/questions/1",
            address, exam_id
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let exam = client
        .get(format!("{}/api/admin/exams/{}", address, exam_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(exam["questions"].as_array().unwrap().len(), 1);
    assert_eq!(exam["questions"][0]["type"], "multiple-choice");
}
