use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Rendered HTML body
    pub content: String,
    pub meta_title: String,
    pub meta_description: String,
    pub category: String,
    pub service_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub is_generated: bool,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The landing-page variants generated for each (service, district) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoPageType {
    /// "Plombier à Paris 11e"
    Service,
    /// "Prix plombier Paris 11e"
    Pricing,
    /// "Plombier urgent Paris 11e"
    Urgent,
}

text_enum!(SeoPageType {
    Service => "service",
    Pricing => "pricing",
    Urgent => "urgent",
});

impl SeoPageType {
    pub const ALL: [SeoPageType; 3] = [SeoPageType::Service, SeoPageType::Pricing, SeoPageType::Urgent];

    /// Builds the page slug. Distinct per type, so slugs stay unique per
    /// (service, district, type) as long as service and district slugs are.
    pub fn slug_for(self, service_slug: &str, district_slug: &str) -> String {
        match self {
            SeoPageType::Service => format!("{service_slug}-{district_slug}"),
            SeoPageType::Pricing => format!("prix-{service_slug}-{district_slug}"),
            SeoPageType::Urgent => format!("{service_slug}-urgent-{district_slug}"),
        }
    }
}

/// A programmatically generated landing page for a (service × district) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSeoPage {
    pub id: Uuid,
    pub slug: String,
    pub page_type: SeoPageType,
    pub service_id: Uuid,
    pub district_id: Uuid,
    pub title: String,
    pub h1: String,
    pub meta_description: String,
    pub content: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal projection used by the sitemap writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedUrl {
    pub slug: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn page_type_slugs_never_collide() {
        let slugs: HashSet<_> = SeoPageType::ALL
            .iter()
            .map(|t| t.slug_for("plombier", "paris-11e"))
            .collect();
        assert_eq!(slugs.len(), SeoPageType::ALL.len());
        assert!(slugs.contains("prix-plombier-paris-11e"));
    }
}
