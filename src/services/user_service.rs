use crate::{
    database::UserRepository,
    models::UserResponse,
    services::identity_service::AuthUser,
    utils::error::AppError,
};

/// Upserts the caller's profile from the verified token claims
pub async fn sync_user(
    repo: &dyn UserRepository,
    caller: &AuthUser,
) -> Result<UserResponse, AppError> {
    let user = repo.upsert_profile(&caller.uid, caller.profile()).await?;
    log::info!("👤 User {} synced", user.firebase_uid);
    Ok(UserResponse::from(user))
}
