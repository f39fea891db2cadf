use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;

use super::{MongoDB, PROVIDERS, USERS};
use crate::models::{ListingQuery, Provider, Review, User, UserProfile};
use crate::utils::error::AppError;

/// Persistence for business listings
#[async_trait]
pub trait ProviderRepository: Send + Sync {
    /// Persists a new listing and returns it with its generated id
    async fn insert(&self, provider: Provider) -> Result<Provider, AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Provider>, AppError>;

    /// Every listing, newest first
    async fn find_all(&self) -> Result<Vec<Provider>, AppError>;

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Provider>, AppError>;

    async fn search(&self, query: &ListingQuery) -> Result<Vec<Provider>, AppError>;

    /// Atomically appends a review. `None` when the listing does not exist.
    async fn push_review(&self, id: &ObjectId, review: Review)
        -> Result<Option<Vec<Review>>, AppError>;

    /// Adds `user_id` to the listing's saved set. `false` when the listing does not exist.
    async fn add_active_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError>;

    /// Removes `user_id` from the listing's saved set. `false` when the listing does not exist.
    async fn remove_active_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError>;

    async fn find_saved_by(&self, user_id: &str) -> Result<Vec<Provider>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Persistence for user profiles
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Update-or-insert keyed by the Firebase subject id
    async fn upsert_profile(&self, firebase_uid: &str, profile: UserProfile)
        -> Result<User, AppError>;
}

// ==================== MONGODB ====================

impl MongoDB {
    async fn find_providers(&self, filter: Document) -> Result<Vec<Provider>, AppError> {
        let providers = self
            .collection::<Provider>(PROVIDERS)
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(providers)
    }
}

#[async_trait]
impl ProviderRepository for MongoDB {
    async fn insert(&self, mut provider: Provider) -> Result<Provider, AppError> {
        let result = self
            .collection::<Provider>(PROVIDERS)
            .insert_one(&provider)
            .await?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::DatabaseError("Inserted id is not an ObjectId".to_string()))?;
        provider.id = Some(id);

        Ok(provider)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Provider>, AppError> {
        let provider = self
            .collection::<Provider>(PROVIDERS)
            .find_one(doc! { "_id": id })
            .await?;
        Ok(provider)
    }

    async fn find_all(&self) -> Result<Vec<Provider>, AppError> {
        self.find_providers(doc! {}).await
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Provider>, AppError> {
        self.find_providers(doc! { "ownerId": owner_id }).await
    }

    async fn search(&self, query: &ListingQuery) -> Result<Vec<Provider>, AppError> {
        self.find_providers(query.to_filter()).await
    }

    async fn push_review(
        &self,
        id: &ObjectId,
        review: Review,
    ) -> Result<Option<Vec<Review>>, AppError> {
        let updated = self
            .collection::<Provider>(PROVIDERS)
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$push": { "reviews": to_bson(&review)? } },
            )
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated.map(|provider| provider.reviews))
    }

    async fn add_active_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError> {
        let result = self
            .collection::<Provider>(PROVIDERS)
            .update_one(
                doc! { "_id": id },
                doc! { "$addToSet": { "activeUsers": user_id } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn remove_active_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError> {
        let result = self
            .collection::<Provider>(PROVIDERS)
            .update_one(
                doc! { "_id": id },
                doc! { "$pull": { "activeUsers": user_id } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn find_saved_by(&self, user_id: &str) -> Result<Vec<Provider>, AppError> {
        self.find_providers(doc! { "activeUsers": user_id }).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.database().run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoDB {
    async fn upsert_profile(
        &self,
        firebase_uid: &str,
        profile: UserProfile,
    ) -> Result<User, AppError> {
        let now = BsonDateTime::now();

        // Claims missing from this token leave the stored values alone
        let mut set = doc! { "updatedAt": now };
        if let Some(email) = profile.email {
            set.insert("email", email);
        }
        if let Some(name) = profile.display_name {
            set.insert("displayName", name);
        }
        if let Some(photo) = profile.photo_url {
            set.insert("photoURL", photo);
        }

        self.collection::<User>(USERS)
            .find_one_and_update(
                doc! { "firebaseUid": firebase_uid },
                doc! { "$set": set, "$setOnInsert": { "createdAt": now } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Upsert returned no document".to_string()))
    }
}
