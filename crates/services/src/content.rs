//! # Content generation
//!
//! Renders one guide-style blog post per (service, district) pair and one
//! landing page per (service, district, page type). Both generators share
//! the same pair selection and the same skip / force / dry-run rules.

use std::sync::Arc;

use askama::Template;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{BlogPost, CityDistrict, LocalSeoPage, PopularService, SeoPageType};
use domains::ports::{CatalogRepository, ContentRepository};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::slug::slugify;

const META_DESCRIPTION_MAX: usize = 160;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Max number of (service, district) pairs processed
    pub limit: Option<usize>,
    /// Only this service slug
    pub service: Option<String>,
    /// Only districts of this city, compared accent-insensitively
    pub city: Option<String>,
    /// Landing page types to generate; empty means all
    pub page_types: Vec<SeoPageType>,
    /// Re-render and update rows that already exist
    pub force: bool,
    /// Publish newly created rows
    pub publish: bool,
    /// Render everything, write nothing
    pub dry_run: bool,
}

impl GenerateOptions {
    fn page_types(&self) -> Vec<SeoPageType> {
        if self.page_types.is_empty() {
            SeoPageType::ALL.to_vec()
        } else {
            self.page_types.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl GenerationReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

enum Outcome {
    Created,
    Updated,
    Skipped,
}

#[derive(Template)]
#[template(path = "content/blog_post.html")]
struct BlogPostTemplate<'a> {
    service_lower: String,
    service_slug: &'a str,
    district: &'a str,
    city: &'a str,
    postal_code: &'a str,
    price_min: i32,
    price_max: i32,
    tips: Vec<String>,
}

#[derive(Template)]
#[template(path = "content/seo_page.html")]
struct SeoPageTemplate<'a> {
    h1: &'a str,
    service_lower: String,
    service_slug: &'a str,
    district: &'a str,
    city: &'a str,
    postal_code: &'a str,
    price_min: i32,
    price_max: i32,
    is_pricing: bool,
    is_urgent: bool,
}

/// Rendered text fields of a blog post, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub meta_title: String,
    pub meta_description: String,
}

/// Rendered text fields of a landing page, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub slug: String,
    pub title: String,
    pub h1: String,
    pub meta_description: String,
    pub content: String,
}

fn template_err(e: askama::Error) -> DomainError {
    DomainError::Internal(format!("template rendering failed: {e}"))
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

pub fn blog_slug(service: &PopularService, district: &CityDistrict) -> String {
    slugify(&format!("guide-{}-{}", service.slug, district.slug))
}

pub fn render_blog_post(service: &PopularService, district: &CityDistrict) -> Result<RenderedPost> {
    let service_lower = service.name.to_lowercase();
    let tips = vec![
        format!("Demandez au moins trois devis à des {service_lower}s de {}.", district.city),
        "Vérifiez les avis laissés par les clients précédents.".to_string(),
        "Précisez vos disponibilités et l'accès au logement dès la demande.".to_string(),
        "Ne réglez le solde qu'une fois la prestation terminée.".to_string(),
    ];
    let content = BlogPostTemplate {
        service_lower: service_lower.clone(),
        service_slug: &service.slug,
        district: &district.name,
        city: &district.city,
        postal_code: &district.postal_code,
        price_min: service.price_min,
        price_max: service.price_max,
        tips,
    }
    .render()
    .map_err(template_err)?;

    let excerpt = format!(
        "Trouvez un {service_lower} de confiance à {} ({}). Tarifs constatés de {} € à {} €.",
        district.name, district.postal_code, service.price_min, service.price_max
    );

    Ok(RenderedPost {
        slug: blog_slug(service, district),
        title: format!("{} à {} : prix et conseils", service.name, district.name),
        meta_title: format!("{} {} | ProchePro", service.name, district.name),
        meta_description: truncate_chars(&excerpt, META_DESCRIPTION_MAX),
        excerpt,
        content,
    })
}

pub fn render_seo_page(
    service: &PopularService,
    district: &CityDistrict,
    page_type: SeoPageType,
) -> Result<RenderedPage> {
    let service_lower = service.name.to_lowercase();
    let (title, h1, description) = match page_type {
        SeoPageType::Service => (
            format!("{} à {} - Devis gratuit | ProchePro", service.name, district.name),
            format!("{} à {}", service.name, district.name),
            format!(
                "Trouvez un {service_lower} à {} ({}). Comparez les offres de prestataires notés.",
                district.name, district.postal_code
            ),
        ),
        SeoPageType::Pricing => (
            format!("Prix {service_lower} à {} : tarifs et devis | ProchePro", district.name),
            format!("Combien coûte un {service_lower} à {} ?", district.name),
            format!(
                "Tarifs {service_lower} à {} : de {} € à {} €. Comparez les devis gratuitement.",
                district.name, service.price_min, service.price_max
            ),
        ),
        SeoPageType::Urgent => (
            format!("{} urgent à {} - Intervention rapide | ProchePro", service.name, district.name),
            format!("{} en urgence à {}", service.name, district.name),
            format!(
                "Besoin d'un {service_lower} en urgence à {} ? Des prestataires disponibles près de chez vous.",
                district.name
            ),
        ),
    };

    let content = SeoPageTemplate {
        h1: &h1,
        service_lower,
        service_slug: &service.slug,
        district: &district.name,
        city: &district.city,
        postal_code: &district.postal_code,
        price_min: service.price_min,
        price_max: service.price_max,
        is_pricing: page_type == SeoPageType::Pricing,
        is_urgent: page_type == SeoPageType::Urgent,
    }
    .render()
    .map_err(template_err)?;

    Ok(RenderedPage {
        slug: slugify(&page_type.slug_for(&service.slug, &district.slug)),
        title,
        h1,
        meta_description: truncate_chars(&description, META_DESCRIPTION_MAX),
        content,
    })
}

pub struct ContentGenerator {
    catalog: Arc<dyn CatalogRepository>,
    content: Arc<dyn ContentRepository>,
}

impl ContentGenerator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, content: Arc<dyn ContentRepository>) -> Self {
        Self { catalog, content }
    }

    /// Active services × active districts after filters and limit.
    pub async fn pairs(&self, opts: &GenerateOptions) -> Result<Vec<(PopularService, CityDistrict)>> {
        let services: Vec<_> = self
            .catalog
            .list_services()
            .await?
            .into_iter()
            .filter(|s| opts.service.as_deref().map_or(true, |slug| s.slug == slug))
            .collect();
        let city = opts.city.as_deref().map(slugify);
        let districts: Vec<_> = self
            .catalog
            .list_districts()
            .await?
            .into_iter()
            .filter(|d| city.as_deref().map_or(true, |c| slugify(&d.city) == c))
            .collect();

        let pairs = services
            .iter()
            .flat_map(|s| districts.iter().map(move |d| (s.clone(), d.clone())))
            .take(opts.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(pairs)
    }

    pub async fn generate_blog_posts(&self, opts: &GenerateOptions, now: DateTime<Utc>) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        for (service, district) in self.pairs(opts).await? {
            match self.upsert_post(&service, &district, opts, now).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(service = %service.slug, district = %district.slug, error = %e, "blog post generation failed");
                    report.failed += 1;
                }
            }
        }
        info!(?report, dry_run = opts.dry_run, "blog post generation finished");
        Ok(report)
    }

    pub async fn generate_local_pages(&self, opts: &GenerateOptions, now: DateTime<Utc>) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        let page_types = opts.page_types();
        for (service, district) in self.pairs(opts).await? {
            for &page_type in &page_types {
                match self.upsert_page(&service, &district, page_type, opts, now).await {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        warn!(
                            service = %service.slug,
                            district = %district.slug,
                            %page_type,
                            error = %e,
                            "local page generation failed"
                        );
                        report.failed += 1;
                    }
                }
            }
        }
        info!(?report, dry_run = opts.dry_run, "local page generation finished");
        Ok(report)
    }

    async fn upsert_post(
        &self,
        service: &PopularService,
        district: &CityDistrict,
        opts: &GenerateOptions,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let existing = self.content.find_generated_post(service.id, district.id).await?;
        if existing.is_some() && !opts.force {
            return Ok(Outcome::Skipped);
        }
        let rendered = render_blog_post(service, district)?;

        match existing {
            Some(mut post) => {
                post.title = rendered.title;
                post.excerpt = rendered.excerpt;
                post.content = rendered.content;
                post.meta_title = rendered.meta_title;
                post.meta_description = rendered.meta_description;
                post.category = service.category.clone();
                if opts.publish && !post.is_published {
                    post.is_published = true;
                    post.published_at = Some(now);
                }
                post.updated_at = now;
                if !opts.dry_run {
                    self.content.update_blog_post(&post).await?;
                }
                debug!(slug = %post.slug, "blog post updated");
                Ok(Outcome::Updated)
            }
            None => {
                let post = BlogPost {
                    id: Uuid::now_v7(),
                    slug: rendered.slug,
                    title: rendered.title,
                    excerpt: rendered.excerpt,
                    content: rendered.content,
                    meta_title: rendered.meta_title,
                    meta_description: rendered.meta_description,
                    category: service.category.clone(),
                    service_id: Some(service.id),
                    district_id: Some(district.id),
                    is_generated: true,
                    is_published: opts.publish,
                    published_at: opts.publish.then_some(now),
                    created_at: now,
                    updated_at: now,
                };
                if !opts.dry_run {
                    self.content.insert_blog_post(&post).await?;
                }
                debug!(slug = %post.slug, "blog post created");
                Ok(Outcome::Created)
            }
        }
    }

    async fn upsert_page(
        &self,
        service: &PopularService,
        district: &CityDistrict,
        page_type: SeoPageType,
        opts: &GenerateOptions,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let existing = self.content.find_seo_page(service.id, district.id, page_type).await?;
        if existing.is_some() && !opts.force {
            return Ok(Outcome::Skipped);
        }
        let rendered = render_seo_page(service, district, page_type)?;

        match existing {
            Some(mut page) => {
                page.title = rendered.title;
                page.h1 = rendered.h1;
                page.meta_description = rendered.meta_description;
                page.content = rendered.content;
                page.is_published = page.is_published || opts.publish;
                page.updated_at = now;
                if !opts.dry_run {
                    self.content.update_seo_page(&page).await?;
                }
                Ok(Outcome::Updated)
            }
            None => {
                let page = LocalSeoPage {
                    id: Uuid::now_v7(),
                    slug: rendered.slug,
                    page_type,
                    service_id: service.id,
                    district_id: district.id,
                    title: rendered.title,
                    h1: rendered.h1,
                    meta_description: rendered.meta_description,
                    content: rendered.content,
                    is_published: opts.publish,
                    created_at: now,
                    updated_at: now,
                };
                if !opts.dry_run {
                    self.content.insert_seo_page(&page).await?;
                }
                Ok(Outcome::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::ports::{MockCatalogRepository, MockContentRepository};

    fn service(slug: &str, name: &str) -> PopularService {
        PopularService {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            category: "maison".into(),
            price_min: 60,
            price_max: 150,
            is_active: true,
            sort_order: 1,
        }
    }

    fn district(city: &str, name: &str, slug: &str) -> CityDistrict {
        CityDistrict {
            id: Uuid::now_v7(),
            city: city.into(),
            name: name.into(),
            slug: slug.into(),
            postal_code: "75011".into(),
            is_active: true,
        }
    }

    fn catalog() -> MockCatalogRepository {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_list_services()
            .returning(|| Ok(vec![service("plombier", "Plombier"), service("electricien", "Électricien")]));
        catalog.expect_list_districts().returning(|| {
            Ok(vec![
                district("Paris", "Paris 11e", "paris-11e"),
                district("Lyon", "Lyon 3e", "lyon-3e"),
            ])
        });
        catalog
    }

    #[test]
    fn rendered_post_escapes_and_links_to_service() {
        let s = service("plombier", "Plombier <Pro>");
        let d = district("Paris", "Paris 11e", "paris-11e");
        let post = render_blog_post(&s, &d).unwrap();

        assert_eq!(post.slug, "guide-plombier-paris-11e");
        assert!(post.content.contains("href=\"/services/plombier\""));
        assert!(post.content.contains("&lt;pro&gt;"));
        assert!(post.meta_description.chars().count() <= META_DESCRIPTION_MAX);
    }

    #[test]
    fn page_types_render_distinct_headings() {
        let s = service("plombier", "Plombier");
        let d = district("Paris", "Paris 11e", "paris-11e");
        let pricing = render_seo_page(&s, &d, SeoPageType::Pricing).unwrap();
        let urgent = render_seo_page(&s, &d, SeoPageType::Urgent).unwrap();

        assert_eq!(pricing.slug, "prix-plombier-paris-11e");
        assert_eq!(urgent.slug, "plombier-urgent-paris-11e");
        assert!(pricing.h1.starts_with("Combien coûte"));
        assert!(urgent.content.contains("en urgence"));
    }

    #[tokio::test]
    async fn test_pairs_apply_filters_and_limit() {
        let generator = ContentGenerator::new(Arc::new(catalog()), Arc::new(MockContentRepository::new()));

        let all = generator.pairs(&GenerateOptions::default()).await.unwrap();
        assert_eq!(all.len(), 4);

        let opts = GenerateOptions {
            city: Some("lyon".into()),
            ..Default::default()
        };
        let lyon = generator.pairs(&opts).await.unwrap();
        assert_eq!(lyon.len(), 2);
        assert!(lyon.iter().all(|(_, d)| d.city == "Lyon"));

        let opts = GenerateOptions {
            service: Some("electricien".into()),
            limit: Some(1),
            ..Default::default()
        };
        let limited = generator.pairs(&opts).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].0.slug, "electricien");
    }

    #[tokio::test]
    async fn test_existing_posts_are_skipped_without_force() {
        let mut content = MockContentRepository::new();
        content.expect_find_generated_post().returning(|service_id, district_id| {
            let now = Utc::now();
            Ok(Some(BlogPost {
                id: Uuid::now_v7(),
                slug: "guide-x-y".into(),
                title: String::new(),
                excerpt: String::new(),
                content: String::new(),
                meta_title: String::new(),
                meta_description: String::new(),
                category: String::new(),
                service_id: Some(service_id),
                district_id: Some(district_id),
                is_generated: true,
                is_published: false,
                published_at: None,
                created_at: now,
                updated_at: now,
            }))
        });
        content.expect_insert_blog_post().never();
        content.expect_update_blog_post().never();

        let generator = ContentGenerator::new(Arc::new(catalog()), Arc::new(content));
        let report = generator
            .generate_blog_posts(&GenerateOptions::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(report, GenerationReport { skipped: 4, ..Default::default() });
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() {
        let mut content = MockContentRepository::new();
        content.expect_find_seo_page().returning(|_, _, _| Ok(None));
        content.expect_insert_seo_page().never();

        let generator = ContentGenerator::new(Arc::new(catalog()), Arc::new(content));
        let opts = GenerateOptions {
            dry_run: true,
            page_types: vec![SeoPageType::Service, SeoPageType::Urgent],
            ..Default::default()
        };
        let report = generator.generate_local_pages(&opts, Utc::now()).await.unwrap();
        assert_eq!(report.created, 8);
    }

    #[tokio::test]
    async fn test_row_failure_is_counted_and_run_continues() {
        let mut content = MockContentRepository::new();
        content.expect_find_generated_post().returning(|_, _| Ok(None));
        let mut calls = 0;
        content.expect_insert_blog_post().times(4).returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(DomainError::Conflict("slug taken".into()))
            } else {
                Ok(())
            }
        });

        let generator = ContentGenerator::new(Arc::new(catalog()), Arc::new(content));
        let report = generator
            .generate_blog_posts(&GenerateOptions::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(report.failed, 1);
    }
}
