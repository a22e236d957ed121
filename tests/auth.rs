use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use taskboard::auth::{AuthMiddleware, AuthResponse};
use taskboard::routes;

/// Connects to the test database, running migrations first.
///
/// Returns `None` (skipping the test) when no `DATABASE_URL` is configured or
/// the database is unreachable, so the suite stays runnable without Postgres.
async fn setup() -> Option<PgPool> {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "taskboard-test-secret");
    }

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping DB-backed test");
            return None;
        }
    };

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Could not connect to test database ({}); skipping", e);
            return None;
        }
    };

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(pool)
}

fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4())
}

async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email.to_lowercase())
        .execute(pool)
        .await;
}

macro_rules! test_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .wrap(Logger::default())
                .service(routes::health::health)
                .service(
                    web::scope("/api")
                        .wrap(AuthMiddleware)
                        .configure(routes::config),
                ),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_register_login_me_flow() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);
    let email = unique_email();

    // Register
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Flow Tester",
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let auth: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(auth.user.email, email);
    assert_eq!(auth.user.name, "Flow Tester");
    assert!(!auth.token.is_empty());

    // Login with the right password
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let login: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(login.user.id, auth.user.id);

    // Login with a wrong password
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // Fetch the current user with the token
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", auth.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], email.as_str());
    assert!(body.get("password_hash").is_none());

    cleanup_user(&pool, &email).await;
}

#[actix_rt::test]
async fn test_register_duplicate_email_is_case_insensitive() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);
    let email = unique_email();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "First",
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // Same email, different case
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Second",
            "email": email.to_uppercase(),
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    cleanup_user(&pool, &email).await;
}

#[actix_rt::test]
async fn test_register_validation() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);

    // Invalid email
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Test",
            "email": "invalid-email",
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // Short password
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Test",
            "email": unique_email(),
            "password": "short"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn test_me_requires_token() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    // Middleware failures surface as service errors in the test harness.
    match test::try_call_service(&app, req).await {
        Ok(resp) => assert_eq!(resp.status(), 401),
        Err(e) => assert_eq!(e.error_response().status(), 401),
    }
}

#[actix_rt::test]
async fn test_update_profile_and_change_password() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);
    let email = unique_email();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Original Name",
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let auth: AuthResponse = test::read_body_json(resp).await;
    let bearer = format!("Bearer {}", auth.token);

    // Update only the name; email must be untouched
    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(json!({ "name": "Renamed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["email"], email.as_str());

    // Changing password with the wrong current password is rejected
    let req = test::TestRequest::put()
        .uri("/api/auth/change-password")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(json!({
            "current_password": "not-the-password",
            "new_password": "newpassword456"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // And accepted with the right one
    let req = test::TestRequest::put()
        .uri("/api/auth/change-password")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(json!({
            "current_password": "password123",
            "new_password": "newpassword456"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // Old password no longer works, new one does
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "newpassword456" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // Logout is a stateless acknowledgement
    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(("Authorization", bearer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    cleanup_user(&pool, &email).await;
}

#[actix_rt::test]
async fn test_profile_email_conflict() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);
    let email_a = unique_email();
    let email_b = unique_email();

    for (name, email) in [("User A", &email_a), ("User B", &email_b)] {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "name": name, "email": email, "password": "password123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email_b, "password": "password123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let auth: AuthResponse = test::read_body_json(resp).await;

    // User B cannot take user A's email
    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(("Authorization", format!("Bearer {}", auth.token)))
        .set_json(json!({ "email": email_a }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    cleanup_user(&pool, &email_a).await;
    cleanup_user(&pool, &email_b).await;
}

#[actix_rt::test]
async fn test_token_for_deleted_user_rejected() {
    let Some(pool) = setup().await else { return };
    let app = test_app!(pool);
    let email = unique_email();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Ephemeral",
            "email": email,
            "password": "password123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let auth: AuthResponse = test::read_body_json(resp).await;

    cleanup_user(&pool, &email).await;

    // The token is still well-formed, but its user is gone
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", auth.token)))
        .to_request();
    match test::try_call_service(&app, req).await {
        Ok(resp) => assert_eq!(resp.status(), 401),
        Err(e) => assert_eq!(e.error_response().status(), 401),
    }
}
