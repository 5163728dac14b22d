use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{BlogPost, LocalSeoPage, PublishedUrl, SeoPageType};
use domains::ports::ContentRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::{db_err, parse_text};

pub struct SqliteContentRepo {
    pool: SqlitePool,
}

impl SqliteContentRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BlogPostRow {
    id: Uuid,
    slug: String,
    title: String,
    excerpt: String,
    content: String,
    meta_title: String,
    meta_description: String,
    category: String,
    service_id: Option<Uuid>,
    district_id: Option<Uuid>,
    is_generated: bool,
    is_published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BlogPostRow> for BlogPost {
    fn from(row: BlogPostRow) -> Self {
        BlogPost {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            content: row.content,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            category: row.category,
            service_id: row.service_id,
            district_id: row.district_id,
            is_generated: row.is_generated,
            is_published: row.is_published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SeoPageRow {
    id: Uuid,
    slug: String,
    page_type: String,
    service_id: Uuid,
    district_id: Uuid,
    title: String,
    h1: String,
    meta_description: String,
    content: String,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SeoPageRow> for LocalSeoPage {
    type Error = DomainError;

    fn try_from(row: SeoPageRow) -> Result<Self> {
        Ok(LocalSeoPage {
            id: row.id,
            slug: row.slug,
            page_type: parse_text(&row.page_type)?,
            service_id: row.service_id,
            district_id: row.district_id,
            title: row.title,
            h1: row.h1,
            meta_description: row.meta_description,
            content: row.content,
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UrlRow {
    slug: String,
    updated_at: DateTime<Utc>,
}

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, meta_title, meta_description, category, \
                            service_id, district_id, is_generated, is_published, published_at, \
                            created_at, updated_at";

const PAGE_COLUMNS: &str = "id, slug, page_type, service_id, district_id, title, h1, meta_description, \
                            content, is_published, created_at, updated_at";

fn urls(rows: Vec<UrlRow>) -> Vec<PublishedUrl> {
    rows.into_iter()
        .map(|r| PublishedUrl {
            slug: r.slug,
            updated_at: r.updated_at,
        })
        .collect()
}

#[async_trait]
impl ContentRepository for SqliteContentRepo {
    async fn find_generated_post(&self, service_id: Uuid, district_id: Uuid) -> Result<Option<BlogPost>> {
        let row = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts \
             WHERE is_generated = 1 AND service_id = ? AND district_id = ?"
        ))
        .bind(service_id)
        .bind(district_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(BlogPost::from))
    }

    async fn insert_blog_post(&self, post: &BlogPost) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO blog_posts ({POST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(post.id)
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.meta_title)
        .bind(&post.meta_description)
        .bind(&post.category)
        .bind(post.service_id)
        .bind(post.district_id)
        .bind(post.is_generated)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_blog_post(&self, post: &BlogPost) -> Result<()> {
        let result = sqlx::query(
            "UPDATE blog_posts SET title = ?, excerpt = ?, content = ?, meta_title = ?, \
             meta_description = ?, category = ?, is_published = ?, published_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.meta_title)
        .bind(&post.meta_description)
        .bind(&post.category)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(post.updated_at)
        .bind(post.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("BlogPost", post.id));
        }
        Ok(())
    }

    async fn get_blog_post(&self, slug: &str) -> Result<Option<BlogPost>> {
        let row = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(BlogPost::from))
    }

    async fn list_published_posts(&self, limit: i64, offset: i64) -> Result<Vec<BlogPost>> {
        let rows = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE is_published = 1 \
             ORDER BY published_at DESC, slug LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(BlogPost::from).collect())
    }

    async fn published_post_urls(&self) -> Result<Vec<PublishedUrl>> {
        let rows = sqlx::query_as::<_, UrlRow>(
            "SELECT slug, updated_at FROM blog_posts WHERE is_published = 1 ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(urls(rows))
    }

    async fn find_seo_page(
        &self,
        service_id: Uuid,
        district_id: Uuid,
        page_type: SeoPageType,
    ) -> Result<Option<LocalSeoPage>> {
        sqlx::query_as::<_, SeoPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM local_seo_pages \
             WHERE service_id = ? AND district_id = ? AND page_type = ?"
        ))
        .bind(service_id)
        .bind(district_id)
        .bind(page_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(LocalSeoPage::try_from)
        .transpose()
    }

    async fn insert_seo_page(&self, page: &LocalSeoPage) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO local_seo_pages ({PAGE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(page.id)
        .bind(&page.slug)
        .bind(page.page_type.as_str())
        .bind(page.service_id)
        .bind(page.district_id)
        .bind(&page.title)
        .bind(&page.h1)
        .bind(&page.meta_description)
        .bind(&page.content)
        .bind(page.is_published)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_seo_page(&self, page: &LocalSeoPage) -> Result<()> {
        let result = sqlx::query(
            "UPDATE local_seo_pages SET title = ?, h1 = ?, meta_description = ?, content = ?, \
             is_published = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&page.title)
        .bind(&page.h1)
        .bind(&page.meta_description)
        .bind(&page.content)
        .bind(page.is_published)
        .bind(page.updated_at)
        .bind(page.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("LocalSeoPage", page.id));
        }
        Ok(())
    }

    async fn get_seo_page(&self, slug: &str) -> Result<Option<LocalSeoPage>> {
        sqlx::query_as::<_, SeoPageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM local_seo_pages WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(LocalSeoPage::try_from)
        .transpose()
    }

    async fn published_seo_urls(&self) -> Result<Vec<PublishedUrl>> {
        let rows = sqlx::query_as::<_, UrlRow>(
            "SELECT slug, updated_at FROM local_seo_pages WHERE is_published = 1 ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(urls(rows))
    }
}
