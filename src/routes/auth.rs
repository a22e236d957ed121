use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, AuthenticatedUserId,
        ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
    },
    error::AppError,
    models::{User, UserResponse},
};
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new user account and returns an authentication token together
/// with the new user's profile. Emails are stored lowercased so uniqueness is
/// case-insensitive.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let email = register_data.email.to_lowercase();

    // Check if email already exists
    let existing_user = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&**pool)
        .await?;

    if existing_user.is_some() {
        return Err(AppError::BadRequest(
            "User already exists with this email".into(),
        ));
    }

    let password_hash = hash_password(&register_data.password)?;

    let user = sqlx::query_as::<_, UserResponse>(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3)
         RETURNING id, name, email, created_at",
    )
    .bind(&register_data.name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await?;

    let token = generate_token(user.id)?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user }))
}

/// Login user
///
/// Authenticates a user and returns an authentication token. Unknown emails
/// and wrong passwords produce the same response so accounts cannot be probed.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(login_data.email.to_lowercase())
    .fetch_optional(&**pool)
    .await?;

    match user {
        Some(user) => {
            if verify_password(&login_data.password, &user.password_hash)? {
                let token = generate_token(user.id)?;
                Ok(HttpResponse::Ok().json(AuthResponse {
                    token,
                    user: user.into(),
                }))
            } else {
                Err(AppError::Unauthorized("Invalid email or password".into()))
            }
        }
        None => Err(AppError::Unauthorized("Invalid email or password".into())),
    }
}

/// Get the current user's profile.
#[get("/me")]
pub async fn me(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = sqlx::query_as::<_, UserResponse>(
        "SELECT id, name, email, created_at FROM users WHERE id = $1",
    )
    .bind(user_id.0)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// Update the current user's profile.
///
/// Both `name` and `email` are optional; omitted fields are left untouched.
/// Changing the email to one already held by another account is rejected.
#[put("/profile")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    profile_data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    profile_data.validate()?;

    let email = profile_data.email.as_ref().map(|e| e.to_lowercase());

    if let Some(email) = &email {
        let taken =
            sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(user_id.0)
                .fetch_optional(&**pool)
                .await?;

        if taken.is_some() {
            return Err(AppError::BadRequest("Email already exists".into()));
        }
    }

    let user = sqlx::query_as::<_, UserResponse>(
        "UPDATE users SET name = COALESCE($1, name), email = COALESCE($2, email)
         WHERE id = $3
         RETURNING id, name, email, created_at",
    )
    .bind(&profile_data.name)
    .bind(&email)
    .bind(user_id.0)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// Change the current user's password.
///
/// Requires the current password; a wrong current password is a client error,
/// not an authentication failure, since the caller already holds a valid token.
#[put("/change-password")]
pub async fn change_password(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    password_data: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    password_data.validate()?;

    let current_hash =
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_one(&**pool)
            .await?;

    if !verify_password(&password_data.current_password, &current_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&password_data.new_password)?;

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(user_id.0)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password changed successfully"
    })))
}

/// Logout
///
/// JWTs are stateless and cannot be revoked server-side; this endpoint exists
/// so clients have a canonical place to end a session.
#[post("/logout")]
pub async fn logout(_user_id: AuthenticatedUserId) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(json!({
        "message": "Logged out successfully"
    })))
}
