use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::error::AppError;
use crate::users::{delete_user, get_user, leaderboard};

/// GET /users/leaderboard
pub async fn get_leaderboard(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let entries = leaderboard(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// GET /users/{id}
pub async fn get_user_by_id(
    path: web::Path<i32>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = get_user(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /users/{id}
pub async fn delete_user_by_id(
    path: web::Path<i32>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    delete_user(pool.get_ref(), id).await?;

    tracing::info!(user_id = id, "User deleted");
    Ok(HttpResponse::NoContent().finish())
}
