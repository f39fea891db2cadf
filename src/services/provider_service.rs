// ==================== LISTINGS ====================
// Business rules for niche listings: owner stamping, reviews, saved set.
// Handlers stay thin; everything here works against the repository trait.

use crate::{
    database::ProviderRepository,
    models::{
        AddReviewRequest, CreateProviderRequest, ListingQuery, NewListing, Provider,
        ProviderResponse, RegisterProviderRequest, Review, ReviewResponse, SearchParams,
    },
    services::identity_service::AuthUser,
    utils::error::AppError,
};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

const NOT_FOUND: &str = "Provider not found";

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: String, field: &str) -> Result<String, AppError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(value)
}

impl TryFrom<CreateProviderRequest> for NewListing {
    type Error = AppError;

    fn try_from(request: CreateProviderRequest) -> Result<Self, Self::Error> {
        Ok(NewListing {
            business_name: required(request.business_name, "businessName")?,
            category: required(request.category, "category")?,
            description: optional(request.description),
            desired_service: optional(request.desired_service),
            target_customer: optional(request.target_customer),
            website: optional(request.website),
            price_tier: optional(request.price_tier),
        })
    }
}

impl TryFrom<RegisterProviderRequest> for NewListing {
    type Error = AppError;

    fn try_from(request: RegisterProviderRequest) -> Result<Self, Self::Error> {
        Ok(NewListing {
            business_name: required(request.business_name, "businessName")?,
            category: required(request.category, "category")?,
            desired_service: optional(request.desired_service),
            target_customer: optional(request.target_customer),
            website: optional(request.website),
            ..Default::default()
        })
    }
}

/// Malformed ids cannot match any document, so they read as "not found"
pub fn parse_provider_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::NotFound(NOT_FOUND.to_string()))
}

fn to_responses(providers: Vec<Provider>) -> Vec<ProviderResponse> {
    providers.into_iter().map(ProviderResponse::from).collect()
}

/// Persists a listing owned by `caller`, whatever the payload claimed
pub async fn create_listing(
    repo: &dyn ProviderRepository,
    caller: &AuthUser,
    listing: NewListing,
) -> Result<ProviderResponse, AppError> {
    let provider = Provider::new(listing, &caller.uid);
    let created = repo.insert(provider).await?;

    log::info!(
        "✅ Listing '{}' created for owner {}",
        created.business_name,
        created.owner_id
    );

    Ok(ProviderResponse::from(created))
}

pub async fn list_all(repo: &dyn ProviderRepository) -> Result<Vec<ProviderResponse>, AppError> {
    Ok(to_responses(repo.find_all().await?))
}

pub async fn get_listing(
    repo: &dyn ProviderRepository,
    id: &str,
) -> Result<ProviderResponse, AppError> {
    let oid = parse_provider_id(id)?;
    repo.find_by_id(&oid)
        .await?
        .map(ProviderResponse::from)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

pub async fn search(
    repo: &dyn ProviderRepository,
    params: SearchParams,
) -> Result<Vec<ProviderResponse>, AppError> {
    let query = ListingQuery::from(params);
    log::debug!("🔍 Search filter: {:?}", query);
    Ok(to_responses(repo.search(&query).await?))
}

pub async fn owner_workspace(
    repo: &dyn ProviderRepository,
    caller: &AuthUser,
) -> Result<Vec<ProviderResponse>, AppError> {
    Ok(to_responses(repo.find_by_owner(&caller.uid).await?))
}

/// Appends a review attributed to `caller` and returns the full review list.
///
/// The rating is stored as sent; there is no range check.
pub async fn add_review(
    repo: &dyn ProviderRepository,
    caller: &AuthUser,
    id: &str,
    request: AddReviewRequest,
) -> Result<Vec<ReviewResponse>, AppError> {
    let oid = parse_provider_id(id)?;

    let review = Review {
        user_id: caller.uid.clone(),
        user_name: caller.display_name(),
        rating: request.rating,
        comment: request.comment,
        created_at: BsonDateTime::now(),
    };

    let reviews = repo
        .push_review(&oid, review)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    log::info!("⭐ Review added to {} by {} ({} total)", id, caller.uid, reviews.len());

    Ok(reviews.into_iter().map(ReviewResponse::from).collect())
}

pub async fn save(
    repo: &dyn ProviderRepository,
    caller: &AuthUser,
    id: &str,
) -> Result<(), AppError> {
    let oid = parse_provider_id(id)?;
    if !repo.add_active_user(&oid, &caller.uid).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(())
}

pub async fn unsave(
    repo: &dyn ProviderRepository,
    caller: &AuthUser,
    id: &str,
) -> Result<(), AppError> {
    let oid = parse_provider_id(id)?;
    if !repo.remove_active_user(&oid, &caller.uid).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(())
}

pub async fn saved_by(
    repo: &dyn ProviderRepository,
    caller: &AuthUser,
) -> Result<Vec<ProviderResponse>, AppError> {
    Ok(to_responses(repo.find_saved_by(&caller.uid).await?))
}
