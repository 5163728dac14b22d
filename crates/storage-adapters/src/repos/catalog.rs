use async_trait::async_trait;
use domains::errors::Result;
use domains::models::{CityDistrict, PopularService};
use domains::ports::CatalogRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::db_err;

pub struct SqliteCatalogRepo {
    pool: SqlitePool,
}

impl SqliteCatalogRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    name: String,
    slug: String,
    category: String,
    price_min: i32,
    price_max: i32,
    is_active: bool,
    sort_order: i32,
}

impl From<ServiceRow> for PopularService {
    fn from(row: ServiceRow) -> Self {
        PopularService {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category: row.category,
            price_min: row.price_min,
            price_max: row.price_max,
            is_active: row.is_active,
            sort_order: row.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DistrictRow {
    id: Uuid,
    city: String,
    name: String,
    slug: String,
    postal_code: String,
    is_active: bool,
}

impl From<DistrictRow> for CityDistrict {
    fn from(row: DistrictRow) -> Self {
        CityDistrict {
            id: row.id,
            city: row.city,
            name: row.name,
            slug: row.slug,
            postal_code: row.postal_code,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepo {
    async fn upsert_service(&self, service: &PopularService) -> Result<()> {
        sqlx::query(
            "INSERT INTO popular_services (id, name, slug, category, price_min, price_max, is_active, sort_order) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(slug) DO UPDATE SET name = excluded.name, category = excluded.category, \
             price_min = excluded.price_min, price_max = excluded.price_max, \
             is_active = excluded.is_active, sort_order = excluded.sort_order",
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.slug)
        .bind(&service.category)
        .bind(service.price_min)
        .bind(service.price_max)
        .bind(service.is_active)
        .bind(service.sort_order)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_district(&self, district: &CityDistrict) -> Result<()> {
        sqlx::query(
            "INSERT INTO city_districts (id, city, name, slug, postal_code, is_active) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(slug) DO UPDATE SET city = excluded.city, name = excluded.name, \
             postal_code = excluded.postal_code, is_active = excluded.is_active",
        )
        .bind(district.id)
        .bind(&district.city)
        .bind(&district.name)
        .bind(&district.slug)
        .bind(&district.postal_code)
        .bind(district.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<PopularService>> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, slug, category, price_min, price_max, is_active, sort_order \
             FROM popular_services WHERE is_active = 1 ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(PopularService::from).collect())
    }

    async fn list_districts(&self) -> Result<Vec<CityDistrict>> {
        let rows = sqlx::query_as::<_, DistrictRow>(
            "SELECT id, city, name, slug, postal_code, is_active \
             FROM city_districts WHERE is_active = 1 ORDER BY city, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(CityDistrict::from).collect())
    }
}
