use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

use crate::auth::jwt::{generate_access_token, generate_refresh_token, verify_token};
use crate::auth::otp;
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::error::ApiError;
use crate::model::identity::{IDENTITY_COLUMNS, Identity};
use crate::model::role::Role;
use crate::models::{LoginReqDto, SendOtpReqDto, TokenType};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    role: Role,
    name: String,
    emp_code: String,
    company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supervisor_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supervisor_name: Option<String>,
}

/// Issue a one-time admin login code. The code goes to an SMS gateway in
/// production; here it is only logged.
pub async fn send_otp(
    pool: web::Data<MySqlPool>,
    payload: web::Json<SendOtpReqDto>,
) -> Result<HttpResponse, ApiError> {
    let mobile = payload.mobile.trim();
    if mobile.is_empty() {
        return Err(ApiError::validation("mobile required"));
    }

    let admin_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM identities WHERE role_id = ? AND mobile = ? AND is_active = 1)",
    )
    .bind(Role::Admin.id())
    .bind(mobile)
    .fetch_one(pool.get_ref())
    .await?;

    if !admin_exists {
        return Err(ApiError::not_found("Admin not registered"));
    }

    let code = otp::generate_code();
    otp::set(mobile, &code).await;

    info!(mobile, %code, "admin OTP issued (dev only)");

    Ok(HttpResponse::Ok().json(json!({ "message": "OTP sent" })))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(mobile_or_id = %payload.mobile_or_id)
)]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let lookup = payload.mobile_or_id.trim();
    if lookup.is_empty() {
        return Err(ApiError::validation("mobileOrId required"));
    }

    debug!("Fetching identity");

    let identity = sqlx::query_as::<_, Identity>(&format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities \
         WHERE role_id = ? AND is_active = 1 \
         AND (emp_code = ? OR mobile = ? OR email = ?)"
    ))
    .bind(payload.role.id())
    .bind(lookup)
    .bind(lookup)
    .bind(lookup)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(ApiError::Unauthorized)?;

    // Admins authenticate with a one-time code, everyone else by password.
    if payload.role == Role::Admin {
        if config.admin_otp_dev_bypass {
            info!("admin OTP bypass active (development mode)");
        } else {
            let code = payload.otp.as_deref().unwrap_or("");
            if code.is_empty() || !otp::verify_and_consume(lookup, code).await {
                info!("invalid or missing admin OTP");
                return Err(ApiError::Unauthorized);
            }
        }
    } else {
        let hash = identity
            .password_hash
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;
        let password = payload.password.as_deref().unwrap_or("");
        if verify_password(password, hash).is_err() {
            info!("invalid credentials: password mismatch");
            return Err(ApiError::Unauthorized);
        }
    }

    debug!("Generating tokens");

    let access_token = generate_access_token(
        identity.id,
        identity.emp_code.clone(),
        identity.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "failed to sign access token");
        ApiError::Internal
    })?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        identity.id,
        identity.emp_code.clone(),
        identity.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "failed to sign refresh token");
        ApiError::Internal
    })?;

    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, FROM_UNIXTIME(?))",
    )
    .bind(identity.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await?;

    // Employees get their supervisor linkage for the apply forms.
    let mut supervisor_id = None;
    let mut supervisor_name = None;
    if payload.role == Role::Employee {
        if let Some(sup_id) = identity.supervisor_id {
            let row: Option<(u64, String)> =
                sqlx::query_as("SELECT id, name FROM identities WHERE id = ? AND is_active = 1")
                    .bind(sup_id)
                    .fetch_optional(pool.get_ref())
                    .await?;
            if let Some((id, name)) = row {
                supervisor_id = Some(id);
                supervisor_name = Some(name);
            }
        }
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        role: payload.role,
        name: identity.name,
        emp_code: identity.emp_code,
        company: identity.company,
        supervisor_id,
        supervisor_name,
    }))
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|_| ApiError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized);
    }

    let record: Option<(u64, u64, bool)> =
        sqlx::query_as("SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?")
            .bind(&claims.jti)
            .fetch_optional(pool.get_ref())
            .await?;

    let (record_id, user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return Err(ApiError::Unauthorized),
    };

    // Rotate: the presented refresh token is spent.
    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "failed to sign refresh token");
        ApiError::Internal
    })?;

    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, FROM_UNIXTIME(?))",
    )
    .bind(user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await?;

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "failed to sign access token");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "accessToken": access_token,
        "refreshToken": new_refresh_token
    })))
}

/// Revoke the presented refresh token. Succeeds even when the token is
/// unknown or already revoked.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let Some(token) = header.strip_prefix("Bearer ") else {
        return Ok(HttpResponse::NoContent().finish());
    };

    let Ok(claims) = verify_token(token, &config.jwt_secret) else {
        return Ok(HttpResponse::NoContent().finish());
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(HttpResponse::NoContent().finish());
    }

    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    Ok(HttpResponse::NoContent().finish())
}

/// Create the bootstrap admin identity when the table has none.
pub async fn seed_default_admin(pool: &MySqlPool) -> anyhow::Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM identities WHERE role_id = ?)")
            .bind(Role::Admin.id())
            .fetch_one(pool)
            .await?;

    if exists {
        info!("admin identity already present");
        return Ok(());
    }

    let mobile = std::env::var("ADMIN_MOBILE").unwrap_or_else(|_| "9000000000".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "123456".to_string());
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("hash failed: {e}"))?;

    sqlx::query(
        "INSERT INTO identities (emp_code, name, role_id, mobile, password_hash, is_active) \
         VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind("AD0001")
    .bind("Super Admin")
    .bind(Role::Admin.id())
    .bind(&mobile)
    .bind(&hash)
    .execute(pool)
    .await?;

    info!(%mobile, "default admin created");
    Ok(())
}
