use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of property. The set is open: unknown names survive as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    House,
    Apartment,
    Villa,
    Cabin,
    Loft,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 5] = [
        Category::House,
        Category::Apartment,
        Category::Villa,
        Category::Cabin,
        Category::Loft,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::House => "House",
            Category::Apartment => "Apartment",
            Category::Villa => "Villa",
            Category::Cabin => "Cabin",
            Category::Loft => "Loft",
            Category::Other(name) => name,
        }
    }

    /// Interpret a category selector coming from a filter control.
    ///
    /// `any`, `all` and the empty string mean "no category constraint".
    pub fn from_selector(selector: &str) -> Option<Category> {
        let trimmed = selector.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("any")
            || trimmed.eq_ignore_ascii_case("all")
        {
            return None;
        }
        Some(Category::from(trimmed.to_string()))
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        Category::KNOWN
            .iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(&name))
            .cloned()
            .unwrap_or(Category::Other(name))
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property listing as stored in the `properties` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub bedrooms: i32,
    pub bathrooms: i32,
    /// Square feet
    pub area: f64,
    pub location: String,
    pub image_url: String,
    #[serde(rename = "property_type")]
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

/// A row of the `profiles` table, keyed by the auth identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Anonymous User",
        }
    }
}

/// Payload for creating a profile; `created_at` is filled by the backend
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
}

/// A user's bookmark of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMark {
    pub id: String,
    pub user_id: String,
    pub property_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFavorite {
    pub user_id: String,
    pub property_id: String,
}
