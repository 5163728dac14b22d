use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A service category promoted on the site (e.g., "Plomberie").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularService {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: String,
    /// Indicative price range in whole euros
    pub price_min: i32,
    pub price_max: i32,
    pub is_active: bool,
    pub sort_order: i32,
}

/// A district of a city targeted by local SEO (e.g., "Paris 11e").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityDistrict {
    pub id: Uuid,
    pub city: String,
    pub name: String,
    pub slug: String,
    pub postal_code: String,
    pub is_active: bool,
}
