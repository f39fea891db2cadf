pub mod repository;

#[cfg(test)]
pub mod memory;

pub use repository::{ProviderRepository, UserRepository};

use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const PROVIDERS: &str = "providers";
pub const USERS: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.app_name = Some("binnect-api".to_string());
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        // Fail fast when the server is unreachable
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes backing the listing and user queries
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::{doc, Document};
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let providers = self.collection::<Document>(PROVIDERS);

        let provider_indexes = [
            ("providers(ownerId, createdAt)", doc! { "ownerId": 1, "createdAt": -1 }),
            ("providers(createdAt)", doc! { "createdAt": -1 }),
            ("providers(category, priceTier)", doc! { "category": 1, "priceTier": 1 }),
            ("providers(activeUsers)", doc! { "activeUsers": 1 }),
        ];

        for (name, keys) in provider_indexes {
            let index = IndexModel::builder().keys(keys).build();
            match providers.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", name),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        // One profile per Firebase subject; makes concurrent first syncs converge
        let users = self.collection::<Document>(USERS);
        let uid_index = IndexModel::builder()
            .keys(doc! { "firebaseUid": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        users.create_index(uid_index).await?;
        log::info!("   ✅ Index created: users(firebaseUid) unique");

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
