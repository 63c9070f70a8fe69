use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, Unchanged};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{auth::hash_password, db::DbPool, entities::user, errors::ServiceError};

/// User accounts. The API never mutates users; seeding goes through here.
pub struct AccountService {
    db: Arc<DbPool>,
}

impl AccountService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        let email = normalize_email(email);
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?)
    }

    /// Creates the user, or resets the name and password of an existing one.
    #[instrument(skip(self, password))]
    pub async fn upsert_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ServiceError::ValidationError(
                "El email es obligatorio".to_string(),
            ));
        }
        let password_hash = hash_password(password)?;

        let saved = match self.find_by_email(&email).await? {
            Some(existing) => {
                user::ActiveModel {
                    id: Unchanged(existing.id),
                    name: Set(name.to_string()),
                    password_hash: Set(password_hash),
                    ..Default::default()
                }
                .update(&*self.db)
                .await?
            }
            None => {
                user::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(email),
                    name: Set(name.to_string()),
                    password_hash: Set(password_hash),
                    created_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?
            }
        };

        info!(user_id = %saved.id, "User account upserted");
        Ok(saved)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
