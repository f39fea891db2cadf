use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime, Document, Regex};
use serde::{Deserialize, Serialize};

/// Business listing as stored in the "providers" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub business_name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_tier: Option<String>,
    /// Subject id of the creator, taken from the verified token
    pub owner_id: String,
    pub created_at: BsonDateTime,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Subject ids that saved this listing
    #[serde(default)]
    pub active_users: Vec<String>,
}

/// Embedded in `Provider::reviews`, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: String,
    pub user_name: String,
    pub rating: f64,
    pub comment: String,
    pub created_at: BsonDateTime,
}

/// Validated listing fields, ready to be stamped with an owner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewListing {
    pub business_name: String,
    pub category: String,
    pub description: Option<String>,
    pub desired_service: Option<String>,
    pub target_customer: Option<String>,
    pub website: Option<String>,
    pub price_tier: Option<String>,
}

impl Provider {
    pub fn new(listing: NewListing, owner_id: &str) -> Self {
        Provider {
            id: None,
            business_name: listing.business_name,
            category: listing.category,
            description: listing.description,
            desired_service: listing.desired_service,
            target_customer: listing.target_customer,
            website: listing.website,
            price_tier: listing.price_tier,
            owner_id: owner_id.to_string(),
            created_at: BsonDateTime::now(),
            reviews: Vec::new(),
            active_users: Vec::new(),
        }
    }
}

// ==================== REQUEST MODELS ====================

/// POST /api/providers
///
/// Unknown fields (including any `ownerId`) are ignored.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderRequest {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    pub desired_service: Option<String>,
    pub target_customer: Option<String>,
    pub website: Option<String>,
    pub price_tier: Option<String>,
}

/// POST /api/providers/register - the "launch your niche" form
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProviderRequest {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub category: String,
    pub desired_service: Option<String>,
    pub target_customer: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddReviewRequest {
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Exact category match
    pub category: Option<String>,
    /// Exact price tier match ($, $$, ...)
    pub price: Option<String>,
    /// Case-insensitive text matched against name, description, desired service and target customer
    pub query: Option<String>,
}

// ==================== RESPONSE MODELS ====================

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub user_id: String,
    pub user_name: String,
    pub rating: f64,
    pub comment: String,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        ReviewResponse {
            user_id: r.user_id,
            user_name: r.user_name,
            rating: r.rating,
            comment: r.comment,
            created_at: to_rfc3339(r.created_at),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub business_name: String,
    pub category: String,
    pub description: Option<String>,
    pub desired_service: Option<String>,
    pub target_customer: Option<String>,
    pub website: Option<String>,
    pub price_tier: Option<String>,
    pub owner_id: String,
    pub created_at: String,
    pub reviews: Vec<ReviewResponse>,
    pub saved_count: usize,
}

impl From<Provider> for ProviderResponse {
    fn from(p: Provider) -> Self {
        ProviderResponse {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            business_name: p.business_name,
            category: p.category,
            description: p.description,
            desired_service: p.desired_service,
            target_customer: p.target_customer,
            website: p.website,
            price_tier: p.price_tier,
            owner_id: p.owner_id,
            created_at: to_rfc3339(p.created_at),
            reviews: p.reviews.into_iter().map(ReviewResponse::from).collect(),
            saved_count: p.active_users.len(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SaveResponse {
    pub success: bool,
    pub saved: bool,
}

pub fn to_rfc3339(dt: BsonDateTime) -> String {
    chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
        .map(|d| d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}

// ==================== SEARCH ====================

/// Text fields scanned by a free-text search
pub const SEARCHABLE_FIELDS: [&str; 4] = [
    "businessName",
    "description",
    "desiredService",
    "targetCustomer",
];

/// Normalised search filter; blank parameters are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub price_tier: Option<String>,
    pub text: Option<String>,
}

impl From<SearchParams> for ListingQuery {
    fn from(params: SearchParams) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        ListingQuery {
            category: non_blank(params.category),
            price_tier: non_blank(params.price),
            text: non_blank(params.query),
        }
    }
}

impl ListingQuery {
    /// MongoDB filter: exact category/priceTier, OR of case-insensitive
    /// literal matches over the searchable fields.
    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(category) = &self.category {
            filter.insert("category", category.as_str());
        }
        if let Some(price) = &self.price_tier {
            filter.insert("priceTier", price.as_str());
        }
        if let Some(text) = &self.text {
            let pattern = regex::escape(text);
            let clauses: Vec<Document> = SEARCHABLE_FIELDS
                .iter()
                .map(|field| {
                    let mut clause = Document::new();
                    clause.insert(
                        *field,
                        Regex { pattern: pattern.clone(), options: "i".to_string() },
                    );
                    clause
                })
                .collect();
            filter.insert("$or", clauses);
        }

        filter
    }

    /// Same semantics as `to_filter`, evaluated in memory
    #[cfg(test)]
    pub fn matches(&self, provider: &Provider) -> bool {
        if let Some(category) = &self.category {
            if &provider.category != category {
                return false;
            }
        }
        if let Some(price) = &self.price_tier {
            if provider.price_tier.as_deref() != Some(price.as_str()) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let fields = [
                Some(provider.business_name.as_str()),
                provider.description.as_deref(),
                provider.desired_service.as_deref(),
                provider.target_customer.as_deref(),
            ];
            return fields
                .iter()
                .flatten()
                .any(|value| value.to_lowercase().contains(&needle));
        }
        true
    }
}
