use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::{test, web, App};
use serde_json::json;
use session_auth_server::{configure_app, AppState, InMemoryUserDirectory, Settings};
use std::sync::Arc;

fn test_state() -> AppState {
    let config = Settings::new_for_test().expect("Failed to load test config");
    AppState::with_directory(config, Arc::new(InMemoryUserDirectory::new()))
        .expect("Failed to build app state")
}

macro_rules! init_app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(configure_app),
        )
        .await
    };
}

fn session_cookie_of<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "jwt")
        .map(|c| c.into_owned())
}

#[actix_web::test]
async fn test_register_and_login() {
    let app = init_app!();

    let register_response = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "A",
            "email": "a@x.com",
            "password": "pw1"
        }))
        .send_request(&app)
        .await;

    assert_eq!(register_response.status(), 200);
    let register_body: serde_json::Value = test::read_body_json(register_response).await;
    assert!(register_body["id"].as_i64().unwrap() > 0);
    assert_eq!(register_body["email"], "a@x.com");
    assert_eq!(register_body["name"], "A");
    assert!(register_body.get("password").is_none());
    assert!(register_body.get("password_hash").is_none());

    let login_response = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({
            "email": "a@x.com",
            "password": "pw1"
        }))
        .send_request(&app)
        .await;

    assert_eq!(login_response.status(), 202);
    let cookie = session_cookie_of(&login_response).expect("login sets the session cookie");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert!(cookie.expires_datetime().is_some());

    let login_body: serde_json::Value = test::read_body_json(login_response).await;
    assert_eq!(login_body["message"], "Login successful");
}

#[actix_web::test]
async fn test_invalid_login() {
    let app = init_app!();

    test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "name": "A", "email": "a@x.com", "password": "pw1" }))
        .send_request(&app)
        .await;

    let wrong_password = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "a@x.com", "password": "wrong" }))
        .send_request(&app)
        .await;
    assert_eq!(wrong_password.status(), 401);
    assert!(session_cookie_of(&wrong_password).is_none());
    let wrong_password_body: serde_json::Value = test::read_body_json(wrong_password).await;

    let unknown_email = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "nonexistent@example.com", "password": "wrongpassword" }))
        .send_request(&app)
        .await;
    assert_eq!(unknown_email.status(), 401);
    let unknown_email_body: serde_json::Value = test::read_body_json(unknown_email).await;

    // Same body either way: no hint whether the account exists.
    assert_eq!(wrong_password_body, unknown_email_body);
    assert_eq!(wrong_password_body["error"]["status"], 401);
}

#[actix_web::test]
async fn test_invalid_registration() {
    let app = init_app!();

    let response = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "A",
            "email": "test@example.com",
            "password": ""
        }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);

    let response = test::TestRequest::post()
        .uri("/api/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["status"], 400);
}

#[actix_web::test]
async fn test_malformed_body_does_not_echo_values() {
    let app = init_app!();

    let response = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "name": "A", "email": "a@x.com", "password": 123456 }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = test::read_body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert_eq!(message, "Validation error: Failed to parse request body");
    assert!(!message.contains("123456"));
}

#[actix_web::test]
async fn test_duplicate_registration() {
    let app = init_app!();
    let payload = json!({ "name": "A", "email": "a@x.com", "password": "pw1" });

    let first = test::TestRequest::post()
        .uri("/api/register")
        .set_json(&payload)
        .send_request(&app)
        .await;
    assert_eq!(first.status(), 200);

    let second = test::TestRequest::post()
        .uri("/api/register")
        .set_json(&payload)
        .send_request(&app)
        .await;
    assert_eq!(second.status(), 400);
    let body: serde_json::Value = test::read_body_json(second).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("already registered"));
}

#[actix_web::test]
async fn test_current_user_requires_token() {
    let app = init_app!();

    let response = test::TestRequest::get().uri("/api/user").send_request(&app).await;
    assert_eq!(response.status(), 401);

    let response = test::TestRequest::get()
        .uri("/api/user")
        .cookie(Cookie::new("jwt", "forged.token.value"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_logout_is_stateless() {
    let app = init_app!();

    test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "name": "A", "email": "a@x.com", "password": "pw1" }))
        .send_request(&app)
        .await;

    let login_response = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "a@x.com", "password": "pw1" }))
        .send_request(&app)
        .await;
    let cookie = session_cookie_of(&login_response).unwrap();
    let token = cookie.value().to_string();

    let me = test::TestRequest::get()
        .uri("/api/user")
        .cookie(cookie.clone())
        .send_request(&app)
        .await;
    assert_eq!(me.status(), 200);
    let me_body: serde_json::Value = test::read_body_json(me).await;
    assert_eq!(me_body["email"], "a@x.com");

    let logout_response = test::TestRequest::post()
        .uri("/api/logout")
        .cookie(cookie)
        .send_request(&app)
        .await;
    assert_eq!(logout_response.status(), 202);
    let cleared = session_cookie_of(&logout_response).expect("logout resets the cookie");
    assert_eq!(cleared.value(), "");
    assert!(cleared.expires_datetime().unwrap() < actix_web::cookie::time::OffsetDateTime::now_utc());

    // The old token was never revoked server-side and still resolves.
    let replay = test::TestRequest::get()
        .uri("/api/user")
        .insert_header(("Authorization", format!("bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(replay.status(), 200);
}
