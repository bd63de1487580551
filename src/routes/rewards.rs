/// Reward Routes
///
/// Fixed-value task rewards and referral redemption. Balances are only
/// changed through [`RewardLedger`] and [`ReferralRedeemer`].

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, ErrorContext, ValidationError};
use crate::ledger::{ReferralRedeemer, RewardLedger};

pub const COMPLETE_TASK_REWARD: u32 = 100;
pub const TELEGRAM_TASK_REWARD: u32 = 50;
pub const X_TASK_REWARD: u32 = 75;
pub const SECRET_TASK_REWARD: u32 = 10_000;

const SECRET_TASK_ANSWER: &str = "KUARHODRON";

#[derive(Deserialize)]
pub struct SecretTaskRequest {
    #[serde(alias = "waterPassword")]
    pub water_password: String,
}

#[derive(Deserialize)]
pub struct RedeemRequest {
    #[serde(alias = "referrer")]
    pub referral_code: String,
}

/// Task and referral routes, relative to the `/users` scope.
///
/// The caller decides which middleware wraps them.
pub fn reward_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}/task/complete", web::post().to(complete_task))
        .route("/{id}/task/telegram", web::post().to(telegram_task))
        .route("/{id}/task/x", web::post().to(x_task))
        .route("/{id}/task/secret", web::post().to(secret_task))
        .route("/{id}/referrer", web::post().to(redeem_referrer));
}

async fn award(ledger: &RewardLedger, user_id: i32, points: u32) -> Result<HttpResponse, AppError> {
    ledger.add_points(user_id, points).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Task completed for user {}", user_id),
        "points": points,
    })))
}

/// POST /users/{id}/task/complete
pub async fn complete_task(
    path: web::Path<i32>,
    ledger: web::Data<RewardLedger>,
) -> Result<HttpResponse, AppError> {
    award(&ledger, path.into_inner(), COMPLETE_TASK_REWARD).await
}

/// POST /users/{id}/task/telegram
pub async fn telegram_task(
    path: web::Path<i32>,
    ledger: web::Data<RewardLedger>,
) -> Result<HttpResponse, AppError> {
    award(&ledger, path.into_inner(), TELEGRAM_TASK_REWARD).await
}

/// POST /users/{id}/task/x
pub async fn x_task(
    path: web::Path<i32>,
    ledger: web::Data<RewardLedger>,
) -> Result<HttpResponse, AppError> {
    award(&ledger, path.into_inner(), X_TASK_REWARD).await
}

/// POST /users/{id}/task/secret
///
/// Pays out only when `water_password` is the quest answer; 400 otherwise.
pub async fn secret_task(
    path: web::Path<i32>,
    form: web::Json<SecretTaskRequest>,
    ledger: web::Data<RewardLedger>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    if form.water_password != SECRET_TASK_ANSWER {
        tracing::warn!(user_id = user_id, "Wrong answer to the secret task");
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "water_password".to_string(),
        )));
    }

    award(&ledger, user_id, SECRET_TASK_REWARD).await
}

/// POST /users/{id}/referrer
///
/// # Errors
/// - 400: empty code, or the account's own code
/// - 404: unknown code or account
/// - 409: this account already redeemed this code
pub async fn redeem_referrer(
    path: web::Path<i32>,
    form: web::Json<RedeemRequest>,
    redeemer: web::Data<ReferralRedeemer>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let context = ErrorContext::new("referral_redemption").with_user_id(user_id);

    let code = form.referral_code.trim();
    if code.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "referral_code".to_string(),
        )));
    }

    redeemer
        .redeem(user_id, code)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Referral code redeemed" })))
}
