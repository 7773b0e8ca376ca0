//! Database models

use serde::{Deserialize, Serialize};

/// Full `cultivar` row as stored by the register web application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cultivar {
    pub id: i64,
    pub cultivar: String,
    pub epithet: Option<String>,
    pub category: Option<String>,
    pub color_form: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub photo_url: Option<String>,
}

/// One audit entry from `cultivar_history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CultivarHistory {
    pub cultivar_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: String,
}
