use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::warn;
use uuid::Uuid;

use reflink_db::Database;
use reflink_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Length of the referral window opened at registration.
const REFERRAL_WINDOW_DAYS: i64 = 90;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Check if username is taken
    if state
        .db
        .get_user_by_username(&req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some()
    {
        return Err(StatusCode::CONFLICT);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .to_string();

    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), &req.username, &password_hash, Role::User.as_str())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // A valid invite code opens the inviter's referral window. Any failure
    // here leaves the account usable and the window closed.
    if let Some(code) = req.invite_code.as_deref() {
        open_referral_window(&state.db, code, &user_id.to_string());
    }

    let token = create_token(&state.jwt_secret, user_id, &req.username, Role::User)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
        }),
    ))
}

fn open_referral_window(db: &Database, code: &str, invitee_id: &str) {
    let link = match db.get_link_by_code(code) {
        Ok(Some(link)) => link,
        Ok(None) => {
            warn!("Unknown invite code '{}' at registration", code);
            return;
        }
        Err(e) => {
            warn!("Invite code lookup failed: {}", e);
            return;
        }
    };

    // Self-invites never open a window.
    if link.owner_id == invitee_id {
        return;
    }

    let now = Utc::now();
    let expires = now + Duration::days(REFERRAL_WINDOW_DAYS);
    if let Err(e) = db.create_referral_window(
        &Uuid::new_v4().to_string(),
        &link.owner_id,
        invitee_id,
        &now.to_rfc3339(),
        &expires.to_rfc3339(),
    ) {
        warn!("Failed to open referral window for {}: {}", invitee_id, e);
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .db
        .get_user_by_username(&req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_id: Uuid = user.id.parse().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let role = if user.role == Role::Admin.as_str() { Role::Admin } else { Role::User };

    let token = create_token(&state.jwt_secret, user_id, &user.username, role)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        role,
        token,
    }))
}

fn create_token(secret: &str, user_id: Uuid, username: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (Utc::now() + Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
