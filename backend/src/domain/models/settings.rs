//! Domain model for the per-account site settings singleton.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteType {
    /// A single apartment building
    Apartment,
    /// A multi-block site
    Site,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteSettings {
    pub account_id: String,
    pub site_name: String,
    pub site_type: SiteType,
    pub contact_info: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl SiteSettings {
    pub fn to_dto(&self) -> shared::SiteSettings {
        shared::SiteSettings {
            site_name: self.site_name.clone(),
            site_type: match self.site_type {
                SiteType::Apartment => shared::SiteType::Apartment,
                SiteType::Site => shared::SiteType::Site,
            },
            contact_info: self.contact_info.clone(),
            last_updated: Some(self.last_updated.to_rfc3339()),
        }
    }
}

impl From<shared::SiteType> for SiteType {
    fn from(t: shared::SiteType) -> Self {
        match t {
            shared::SiteType::Apartment => SiteType::Apartment,
            shared::SiteType::Site => SiteType::Site,
        }
    }
}
