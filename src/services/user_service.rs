use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::database::repository::UserRepository;
use crate::error::{Error, Result};
use crate::models::user::{
    Category, Registration, StatusChange, User, UserFilter, UserStatus,
};

/// Owns the employee directory: registration, approval workflow and
/// archival. Session operations are gated through [`UserService::require_approved`].
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn register(&self, registration: Registration, at: DateTime<Utc>) -> Result<User> {
        match self.users.upsert_registration(&registration, at).await? {
            Some(user) => {
                tracing::info!(
                    user_id = user.user_id,
                    category = %user.category,
                    "user registered, awaiting approval"
                );
                Ok(user)
            }
            None => Err(Error::InvalidTransition {
                user_id: registration.user_id,
                from: UserStatus::Archived,
                to: UserStatus::Pending,
            }),
        }
    }

    pub async fn approve(&self, user_id: i64, admin_id: i64, at: DateTime<Utc>) -> Result<User> {
        self.change_status(user_id, UserStatus::Approved, admin_id, at)
            .await
    }

    pub async fn reject(&self, user_id: i64, admin_id: i64, at: DateTime<Utc>) -> Result<User> {
        self.change_status(user_id, UserStatus::Blocked, admin_id, at)
            .await
    }

    pub async fn archive(&self, user_id: i64, admin_id: i64, at: DateTime<Utc>) -> Result<User> {
        self.change_status(user_id, UserStatus::Archived, admin_id, at)
            .await
    }

    async fn change_status(
        &self,
        user_id: i64,
        to: UserStatus,
        admin_id: i64,
        at: DateTime<Utc>,
    ) -> Result<User> {
        let change = StatusChange { to, admin_id, at };
        let from = UserStatus::allowed_sources(to);
        if let Some(user) = self.users.transition(user_id, from, change).await? {
            tracing::info!(user_id, admin_id, status = %to, "user status changed");
            return Ok(user);
        }

        // The conditional update matched nothing: tell a missing user apart
        // from one in the wrong state.
        match self.users.find(user_id).await? {
            None => Err(Error::UserNotFound(user_id)),
            Some(current) => {
                tracing::warn!(
                    user_id,
                    admin_id,
                    from = %current.status,
                    to = %to,
                    "rejected status transition"
                );
                Err(Error::InvalidTransition {
                    user_id,
                    from: current.status,
                    to,
                })
            }
        }
    }

    /// Status of an identity; `New` when it was never registered.
    pub async fn status_of(&self, user_id: i64) -> Result<UserStatus> {
        Ok(self
            .users
            .find(user_id)
            .await?
            .map(|u| u.status)
            .unwrap_or(UserStatus::New))
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<User>> {
        self.users.find(user_id).await
    }

    pub async fn require(&self, user_id: i64) -> Result<User> {
        self.users
            .find(user_id)
            .await?
            .ok_or(Error::UserNotFound(user_id))
    }

    pub async fn require_approved(&self, user_id: i64) -> Result<User> {
        let user = self.require(user_id).await?;
        match user.status {
            UserStatus::Approved => Ok(user),
            status @ (UserStatus::New
            | UserStatus::Pending
            | UserStatus::Blocked
            | UserStatus::Archived) => Err(Error::NotApproved { user_id, status }),
        }
    }

    pub async fn set_category(&self, user_id: i64, category: Category) -> Result<User> {
        let user = self
            .users
            .set_category(user_id, category)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        tracing::info!(user_id, category = %category, "user category changed");
        Ok(user)
    }

    pub async fn record_activity(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.users.touch(user_id, at).await
    }

    pub async fn list(&self, filter: UserFilter) -> Result<Vec<User>> {
        self.users.list(&filter).await
    }

    pub async fn list_by_category(&self, category: Category) -> Result<Vec<User>> {
        self.list(UserFilter {
            category: Some(category),
            ..UserFilter::default()
        })
        .await
    }

    pub async fn list_by_status(&self, status: UserStatus) -> Result<Vec<User>> {
        self.list(UserFilter {
            status: Some(status),
            include_archived: status == UserStatus::Archived,
            ..UserFilter::default()
        })
        .await
    }

    pub async fn pending(&self) -> Result<Vec<User>> {
        self.list_by_status(UserStatus::Pending).await
    }

    /// Looks a user up by numeric id, or by a case-insensitive substring of
    /// their full name, display name or username. Archived users are included.
    pub async fn search(&self, text: &str) -> Result<Vec<User>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::BadRequest("search text is empty".to_string()));
        }
        if let Ok(user_id) = text.parse::<i64>() {
            return Ok(self.users.find(user_id).await?.into_iter().collect());
        }

        let needle = text.to_lowercase();
        let users = self
            .list(UserFilter {
                include_archived: true,
                ..UserFilter::default()
            })
            .await?;
        Ok(users
            .into_iter()
            .filter(|u| u.matches_text(&needle))
            .collect())
    }
}
