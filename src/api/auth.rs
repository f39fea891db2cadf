use actix_web::{web, HttpResponse};

use crate::{
    database::UserRepository,
    models::UserResponse,
    services::{identity_service::AuthUser, user_service},
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/auth/sync",
    tag = "Auth",
    responses(
        (status = 200, description = "Profile upserted from the token claims", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn sync_user(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔄 POST /auth/sync - uid: {}", user.uid);

    let synced = user_service::sync_user(repo.get_ref(), &user).await?;
    Ok(HttpResponse::Ok().json(synced))
}
