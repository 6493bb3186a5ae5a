use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Kitchen,
    Hall,
    DishWash,
    Bar,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Kitchen,
        Category::Hall,
        Category::DishWash,
        Category::Bar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Kitchen => "kitchen",
            Category::Hall => "hall",
            Category::DishWash => "dish_wash",
            Category::Bar => "bar",
        }
    }

    /// Label shown to staff in exports and the bot.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Kitchen => "Кухня",
            Category::Hall => "Зал",
            Category::DishWash => "Мойка",
            Category::Bar => "Бар",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts the stored codes, a hyphenated `dish-wash`, and the labels the
    /// bot shows to employees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kitchen" | "кухня" => Ok(Category::Kitchen),
            "hall" | "зал" => Ok(Category::Hall),
            "dish_wash" | "dish-wash" | "dishwash" | "мойка" => Ok(Category::DishWash),
            "bar" | "бар" => Ok(Category::Bar),
            _ => Err(Error::InvalidCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Never seen. Not persisted.
    New,
    Pending,
    Approved,
    Blocked,
    Archived,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::New => "new",
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Blocked => "blocked",
            UserStatus::Archived => "archived",
        }
    }

    /// Source states an admin action may start from.
    pub fn allowed_sources(target: UserStatus) -> &'static [UserStatus] {
        match target {
            UserStatus::Approved => &[UserStatus::Pending, UserStatus::Blocked],
            UserStatus::Blocked => &[UserStatus::Pending],
            UserStatus::Archived => &[UserStatus::Approved],
            UserStatus::Pending => &[
                UserStatus::New,
                UserStatus::Pending,
                UserStatus::Approved,
                UserStatus::Blocked,
            ],
            UserStatus::New => &[],
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(UserStatus::New),
            "pending" => Ok(UserStatus::Pending),
            "approved" => Ok(UserStatus::Approved),
            "blocked" => Ok(UserStatus::Blocked),
            "archived" => Ok(UserStatus::Archived),
            other => Err(Error::Internal(format!("Unknown user status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub category: Category,
    pub status: UserStatus,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub archived_by: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    /// Name used in reports: full name, then username. The self-chosen
    /// display name is only a fallback.
    pub fn name(&self) -> String {
        report_name(
            self.full_name.as_deref(),
            self.username.as_deref(),
            self.display_name.as_deref(),
        )
    }

    /// Case-insensitive substring match over the name fields and username.
    /// `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        [&self.full_name, &self.display_name, &self.username]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

pub fn report_name(full: Option<&str>, username: Option<&str>, display: Option<&str>) -> String {
    [full, username, display]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Row shape of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub category: String,
    pub status: String,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub archived_by: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    pub last_active: Option<DateTime<Utc>>,
}

impl TryFrom<UserRecord> for User {
    type Error = Error;

    fn try_from(r: UserRecord) -> Result<Self, Self::Error> {
        Ok(User {
            user_id: r.user_id,
            username: r.username,
            full_name: r.full_name,
            display_name: r.display_name,
            phone: r.phone,
            category: r.category.parse()?,
            status: r.status.parse()?,
            is_archived: r.is_archived,
            archived_at: r.archived_at,
            archived_by: r.archived_by,
            approved_by: r.approved_by,
            approved_at: r.approved_at,
            first_seen: r.first_seen,
            last_active: r.last_active,
        })
    }
}

/// Profile submitted by the registration wizard.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub category: Category,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub to: UserStatus,
    pub admin_id: i64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub category: Option<Category>,
    pub status: Option<UserStatus>,
    pub include_archived: bool,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if !self.include_archived && user.is_archived {
            return false;
        }
        if let Some(category) = self.category {
            if user.category != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if user.status != status {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_accepts_codes_and_labels() {
        assert_eq!("kitchen".parse::<Category>().unwrap(), Category::Kitchen);
        assert_eq!("Dish-Wash".parse::<Category>().unwrap(), Category::DishWash);
        assert_eq!("мойка".parse::<Category>().unwrap(), Category::DishWash);
        assert_eq!(" бар ".parse::<Category>().unwrap(), Category::Bar);
        assert!(matches!(
            "office".parse::<Category>(),
            Err(Error::InvalidCategory(_))
        ));
    }

    fn allowed(from: UserStatus, to: UserStatus) -> bool {
        UserStatus::allowed_sources(to).contains(&from)
    }

    #[test]
    fn status_machine_edges() {
        assert!(allowed(UserStatus::Pending, UserStatus::Approved));
        assert!(allowed(UserStatus::Blocked, UserStatus::Approved));
        assert!(allowed(UserStatus::Pending, UserStatus::Blocked));
        assert!(allowed(UserStatus::Approved, UserStatus::Archived));
        assert!(allowed(UserStatus::Blocked, UserStatus::Pending));

        assert!(!allowed(UserStatus::Approved, UserStatus::Blocked));
        assert!(!allowed(UserStatus::Pending, UserStatus::Archived));
        assert!(!allowed(UserStatus::Archived, UserStatus::Pending));
        assert!(!allowed(UserStatus::Archived, UserStatus::Approved));
    }

    #[test]
    fn report_name_skips_blank_fields() {
        assert_eq!(report_name(Some("  "), Some("ivan"), Some("Vanya")), "ivan");
        assert_eq!(report_name(None, None, Some("Vanya")), "Vanya");
        assert_eq!(report_name(None, None, None), "Unknown");
    }

    #[test]
    fn full_name_wins_over_display_name() {
        assert_eq!(
            report_name(Some("Ivan Petrov"), Some("ivan"), Some("Vanya")),
            "Ivan Petrov"
        );
    }
}
