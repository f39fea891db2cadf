//! In-memory repositories used by the handler tests.

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use std::sync::Mutex;

use super::repository::{ProviderRepository, UserRepository};
use crate::models::{ListingQuery, Provider, Review, User, UserProfile};
use crate::utils::error::AppError;

#[derive(Default)]
pub struct InMemoryStore {
    providers: Mutex<Vec<Provider>>,
    users: Mutex<Vec<User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.providers.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    /// Newest first; later inserts win ties on the millisecond clock.
    fn select<F>(&self, predicate: F) -> Vec<Provider>
    where
        F: Fn(&Provider) -> bool,
    {
        let mut selected: Vec<Provider> = self
            .providers
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|p| predicate(p))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected
    }

    fn update<F>(&self, id: &ObjectId, f: F) -> Option<Provider>
    where
        F: FnOnce(&mut Provider),
    {
        let mut providers = self.providers.lock().unwrap();
        let provider = providers.iter_mut().find(|p| p.id.as_ref() == Some(id))?;
        f(provider);
        Some(provider.clone())
    }
}

#[async_trait]
impl ProviderRepository for InMemoryStore {
    async fn insert(&self, mut provider: Provider) -> Result<Provider, AppError> {
        provider.id = Some(ObjectId::new());
        self.providers.lock().unwrap().push(provider.clone());
        Ok(provider)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Provider>, AppError> {
        Ok(self
            .providers
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id.as_ref() == Some(id))
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Provider>, AppError> {
        Ok(self.select(|_| true))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Provider>, AppError> {
        Ok(self.select(|p| p.owner_id == owner_id))
    }

    async fn search(&self, query: &ListingQuery) -> Result<Vec<Provider>, AppError> {
        Ok(self.select(|p| query.matches(p)))
    }

    async fn push_review(
        &self,
        id: &ObjectId,
        review: Review,
    ) -> Result<Option<Vec<Review>>, AppError> {
        Ok(self.update(id, |p| p.reviews.push(review)).map(|p| p.reviews))
    }

    async fn add_active_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError> {
        Ok(self
            .update(id, |p| {
                if !p.active_users.iter().any(|u| u == user_id) {
                    p.active_users.push(user_id.to_string());
                }
            })
            .is_some())
    }

    async fn remove_active_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, AppError> {
        Ok(self
            .update(id, |p| p.active_users.retain(|u| u != user_id))
            .is_some())
    }

    async fn find_saved_by(&self, user_id: &str) -> Result<Vec<Provider>, AppError> {
        Ok(self.select(|p| p.active_users.iter().any(|u| u == user_id)))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn upsert_profile(
        &self,
        firebase_uid: &str,
        profile: UserProfile,
    ) -> Result<User, AppError> {
        let now = BsonDateTime::now();
        let mut users = self.users.lock().unwrap();

        let index = match users.iter().position(|u| u.firebase_uid == firebase_uid) {
            Some(index) => index,
            None => {
                users.push(User {
                    id: Some(ObjectId::new()),
                    firebase_uid: firebase_uid.to_string(),
                    email: None,
                    display_name: None,
                    photo_url: None,
                    created_at: now,
                    updated_at: now,
                });
                users.len() - 1
            }
        };

        let user = &mut users[index];
        if profile.email.is_some() {
            user.email = profile.email;
        }
        if profile.display_name.is_some() {
            user.display_name = profile.display_name;
        }
        if profile.photo_url.is_some() {
            user.photo_url = profile.photo_url;
        }
        user.updated_at = now;

        Ok(user.clone())
    }
}
