use actix_web::{web, HttpResponse};

use crate::{
    database::ProviderRepository,
    models::{
        AddReviewRequest, CreateProviderRequest, NewListing, ProviderResponse,
        RegisterProviderRequest, ReviewResponse, SaveResponse, SearchParams,
    },
    services::{identity_service::AuthUser, provider_service},
    utils::error::AppError,
};

#[utoipa::path(
    get,
    path = "/api/providers",
    tag = "Providers",
    responses(
        (status = 200, description = "All listings, newest first", body = [ProviderResponse])
    )
)]
pub async fn list_providers(
    repo: web::Data<dyn ProviderRepository>,
) -> Result<HttpResponse, AppError> {
    let providers = provider_service::list_all(repo.get_ref()).await?;
    log::info!("📋 GET /providers - {} listings", providers.len());
    Ok(HttpResponse::Ok().json(providers))
}

#[utoipa::path(
    post,
    path = "/api/providers",
    tag = "Providers",
    request_body = CreateProviderRequest,
    responses(
        (status = 201, description = "Listing created, owned by the caller", body = ProviderResponse),
        (status = 400, description = "businessName or category missing"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_provider(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
    request: web::Json<CreateProviderRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /providers - owner {}", user.uid);

    let listing = NewListing::try_from(request.into_inner())?;
    let created = provider_service::create_listing(repo.get_ref(), &user, listing).await?;

    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    post,
    path = "/api/providers/register",
    tag = "Providers",
    request_body = RegisterProviderRequest,
    responses(
        (status = 201, description = "Niche registered, owned by the caller", body = ProviderResponse),
        (status = 400, description = "businessName or category missing"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register_provider(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
    request: web::Json<RegisterProviderRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🚀 POST /providers/register - owner {}", user.uid);

    let listing = NewListing::try_from(request.into_inner())?;
    let created = provider_service::create_listing(repo.get_ref(), &user, listing).await?;

    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/providers/search",
    tag = "Providers",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching listings, newest first", body = [ProviderResponse])
    )
)]
pub async fn search_providers(
    repo: web::Data<dyn ProviderRepository>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let results = provider_service::search(repo.get_ref(), params.into_inner()).await?;
    log::info!("🔍 GET /providers/search - {} results", results.len());
    Ok(HttpResponse::Ok().json(results))
}

#[utoipa::path(
    get,
    path = "/api/providers/my-workspace",
    tag = "Providers",
    responses(
        (status = 200, description = "Listings owned by the caller", body = [ProviderResponse]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_workspace(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
) -> Result<HttpResponse, AppError> {
    let providers = provider_service::owner_workspace(repo.get_ref(), &user).await?;
    log::info!("🗂️  GET /providers/my-workspace - {} listings for {}", providers.len(), user.uid);
    Ok(HttpResponse::Ok().json(providers))
}

#[utoipa::path(
    get,
    path = "/api/providers/{id}",
    tag = "Providers",
    params(("id" = String, Path, description = "Listing ObjectId (hex)")),
    responses(
        (status = 200, description = "The listing", body = ProviderResponse),
        (status = 404, description = "No such listing")
    )
)]
pub async fn get_provider(
    repo: web::Data<dyn ProviderRepository>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let provider = provider_service::get_listing(repo.get_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(provider))
}

#[utoipa::path(
    post,
    path = "/api/providers/{id}/reviews",
    tag = "Reviews",
    params(("id" = String, Path, description = "Listing ObjectId (hex)")),
    request_body = AddReviewRequest,
    responses(
        (status = 201, description = "Updated review list", body = [ReviewResponse]),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such listing")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_review(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
    id: web::Path<String>,
    request: web::Json<AddReviewRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("⭐ POST /providers/{}/reviews - by {}", id, user.uid);

    let reviews =
        provider_service::add_review(repo.get_ref(), &user, &id, request.into_inner()).await?;

    Ok(HttpResponse::Created().json(reviews))
}

#[utoipa::path(
    post,
    path = "/api/providers/save/{id}",
    tag = "Saved",
    params(("id" = String, Path, description = "Listing ObjectId (hex)")),
    responses(
        (status = 200, description = "Listing saved", body = SaveResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such listing")
    ),
    security(("bearer_auth" = []))
)]
pub async fn save_provider(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔖 POST /providers/save/{} - by {}", id, user.uid);
    provider_service::save(repo.get_ref(), &user, &id).await?;
    Ok(HttpResponse::Ok().json(SaveResponse { success: true, saved: true }))
}

#[utoipa::path(
    get,
    path = "/api/providers/saved",
    tag = "Saved",
    responses(
        (status = 200, description = "Listings saved by the caller", body = [ProviderResponse]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_saved(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
) -> Result<HttpResponse, AppError> {
    let providers = provider_service::saved_by(repo.get_ref(), &user).await?;
    log::info!("🔖 GET /providers/saved - {} listings for {}", providers.len(), user.uid);
    Ok(HttpResponse::Ok().json(providers))
}

#[utoipa::path(
    delete,
    path = "/api/providers/saved/{id}",
    tag = "Saved",
    params(("id" = String, Path, description = "Listing ObjectId (hex)")),
    responses(
        (status = 200, description = "Listing removed from saved", body = SaveResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such listing")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unsave_provider(
    user: web::ReqData<AuthUser>,
    repo: web::Data<dyn ProviderRepository>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /providers/saved/{} - by {}", id, user.uid);
    provider_service::unsave(repo.get_ref(), &user, &id).await?;
    Ok(HttpResponse::Ok().json(SaveResponse { success: true, saved: false }))
}
