//! # Demo data
//!
//! Seeds the catalog, demo accounts and generated tasks so a fresh
//! database looks alive. Everything created here carries `is_generated`,
//! which is what `tasks:cleanup-generated` keys on.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{CityDistrict, NewTask, PopularService, Task, User, UserRole};
use domains::ports::{CatalogRepository, UserRepository};
use fake::faker::name::fr_fr::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::marketplace::{MarketplaceService, Registration};
use crate::slug::slugify;

/// (name, category, price_min, price_max)
const SERVICES: [(&str, &str, i32, i32); 12] = [
    ("Plombier", "maison", 60, 250),
    ("Électricien", "maison", 70, 300),
    ("Serrurier", "maison", 80, 350),
    ("Peintre", "renovation", 200, 1500),
    ("Jardinier", "exterieur", 30, 200),
    ("Déménageur", "transport", 150, 1200),
    ("Menuisier", "renovation", 100, 900),
    ("Chauffagiste", "maison", 90, 400),
    ("Carreleur", "renovation", 150, 1200),
    ("Vitrier", "maison", 70, 300),
    ("Monteur de meubles", "maison", 30, 150),
    ("Homme de ménage", "services", 20, 120),
];

const TASK_TEMPLATES: [&str; 4] = [
    "Besoin d'un {service} rapidement",
    "Recherche {service} disponible cette semaine",
    "Devis {service} pour un appartement",
    "Petite intervention {service}",
];

fn district(city: &str, name: &str, postal_code: &str) -> CityDistrict {
    CityDistrict {
        id: Uuid::now_v7(),
        city: city.to_string(),
        name: name.to_string(),
        slug: slugify(name),
        postal_code: postal_code.to_string(),
        is_active: true,
    }
}

pub fn default_services() -> Vec<PopularService> {
    SERVICES
        .iter()
        .zip(1..)
        .map(|(&(name, category, price_min, price_max), sort_order)| PopularService {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: slugify(name),
            category: category.to_string(),
            price_min,
            price_max,
            is_active: true,
            sort_order,
        })
        .collect()
}

/// Paris arrondissements, Lyon arrondissements and the Marseille centre.
pub fn default_districts() -> Vec<CityDistrict> {
    let mut districts = Vec::new();
    for n in 1..=20 {
        let name = if n == 1 { "Paris 1er".to_string() } else { format!("Paris {n}e") };
        districts.push(district("Paris", &name, &format!("750{n:02}")));
    }
    for n in 1..=9 {
        let name = if n == 1 { "Lyon 1er".to_string() } else { format!("Lyon {n}e") };
        districts.push(district("Lyon", &name, &format!("6900{n}")));
    }
    for n in 1..=8 {
        let name = if n == 1 { "Marseille 1er".to_string() } else { format!("Marseille {n}e") };
        districts.push(district("Marseille", &name, &format!("130{n:02}")));
    }
    districts
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub clients: usize,
    pub providers: usize,
    pub tasks: usize,
    pub offers_per_task: usize,
    /// Password of every demo account
    pub password: String,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            clients: 5,
            providers: 8,
            tasks: 30,
            offers_per_task: 2,
            password: "demo-password".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub services: usize,
    pub districts: usize,
    pub clients: usize,
    pub providers: usize,
    pub tasks: usize,
    pub offers: usize,
    pub completed_flows: usize,
}

pub struct DemoSeeder {
    marketplace: Arc<MarketplaceService>,
    catalog: Arc<dyn CatalogRepository>,
    users: Arc<dyn UserRepository>,
    seed: Option<u64>,
}

impl DemoSeeder {
    pub fn new(
        marketplace: Arc<MarketplaceService>,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            marketplace,
            catalog,
            users,
            seed: None,
        }
    }

    /// Makes every random choice reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Independent stream per use so seeded runs don't repeat names
    /// between clients and providers.
    fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_mul(31).wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }

    /// Upserts the default catalog by slug.
    pub async fn seed_catalog(&self) -> Result<(usize, usize)> {
        let services = default_services();
        for service in &services {
            self.catalog.upsert_service(service).await?;
        }
        let districts = default_districts();
        for district in &districts {
            self.catalog.upsert_district(district).await?;
        }
        info!(services = services.len(), districts = districts.len(), "catalog seeded");
        Ok((services.len(), districts.len()))
    }

    /// Returns `count` demo accounts of `role`, creating the missing ones.
    /// Emails are stable so re-running the seeder reuses accounts.
    pub async fn ensure_accounts(
        &self,
        role: UserRole,
        count: usize,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>> {
        let mut rng = self.rng(match role {
            UserRole::Client => 1,
            UserRole::Provider => 2,
            UserRole::Admin => 3,
        });
        let cities = ["Paris", "Lyon", "Marseille"];
        let mut accounts = Vec::with_capacity(count);

        for i in 1..=count {
            let email = format!("demo-{role}-{i}@prochepro.test");
            if let Some(existing) = self.users.find_by_email(&email).await? {
                accounts.push(existing);
                continue;
            }
            let first: String = FirstName().fake_with_rng(&mut rng);
            let last: String = LastName().fake_with_rng(&mut rng);
            let city = cities.choose(&mut rng).map(|c| c.to_string());
            let user = self
                .marketplace
                .register(
                    Registration {
                        name: format!("{first} {last}"),
                        email,
                        password: password.to_string(),
                        role,
                        city,
                        is_generated: true,
                    },
                    now,
                )
                .await?;
            accounts.push(user);
        }
        Ok(accounts)
    }

    async fn demo_clients(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .list_by_role(UserRole::Client)
            .await?
            .into_iter()
            .filter(|u| u.is_generated)
            .collect())
    }

    /// Posts `count` generated tasks from demo clients, spread over the
    /// last three days.
    pub async fn generate_tasks(&self, count: usize, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let clients = self.demo_clients().await?;
        if clients.is_empty() {
            return Err(DomainError::validation("no demo clients; run the seeder first"));
        }
        let services = self.catalog.list_services().await?;
        let districts = self.catalog.list_districts().await?;
        if services.is_empty() || districts.is_empty() {
            return Err(DomainError::validation("catalog is empty; run the seeder first"));
        }

        let mut rng = self.rng(10);
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let (Some(client), Some(service), Some(district), Some(template)) = (
                clients.choose(&mut rng),
                services.choose(&mut rng),
                districts.choose(&mut rng),
                TASK_TEMPLATES.choose(&mut rng),
            ) else {
                break;
            };
            let low = service.price_min.max(1);
            let high = service.price_max.max(low);
            let budget = (rng.gen_range(low..=high) / 10 * 10).max(low);
            let created_at = now - Duration::minutes(rng.gen_range(0..72 * 60));

            let new = NewTask {
                client_id: client.id,
                title: format!(
                    "{} ({})",
                    template.replace("{service}", &service.name.to_lowercase()),
                    district.name
                ),
                description: format!(
                    "Demande de démonstration pour {} à {} ({}).",
                    service.name.to_lowercase(),
                    district.name,
                    district.postal_code
                ),
                category: service.slug.clone(),
                city: district.city.clone(),
                budget: Some(budget),
                is_generated: true,
            };
            match self.marketplace.post_task(new, created_at).await {
                Ok(task) => created.push(task),
                Err(e) => warn!(error = %e, "demo task rejected"),
            }
        }
        info!(count = created.len(), "demo tasks generated");
        Ok(created)
    }

    /// Full seed: catalog, accounts, tasks, offers and one completed
    /// task → offer → accept → complete → review flow.
    pub async fn seed(&self, opts: &SeedOptions, now: DateTime<Utc>) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        (report.services, report.districts) = self.seed_catalog().await?;

        let clients = self
            .ensure_accounts(UserRole::Client, opts.clients.max(1), &opts.password, now)
            .await?;
        let providers = self
            .ensure_accounts(UserRole::Provider, opts.providers.max(1), &opts.password, now)
            .await?;
        report.clients = clients.len();
        report.providers = providers.len();

        if let (Some(client), Some(provider)) = (clients.first(), providers.first()) {
            match self.completed_flow(client, provider, now).await {
                Ok(()) => report.completed_flows = 1,
                Err(e) => warn!(error = %e, "demo lifecycle flow failed"),
            }
        }

        let tasks = self.generate_tasks(opts.tasks.max(1), now).await?;
        report.tasks = tasks.len();

        let mut rng = self.rng(11);
        for task in &tasks {
            let chosen: Vec<_> = providers
                .choose_multiple(&mut rng, opts.offers_per_task.min(providers.len()))
                .collect();
            for provider in chosen {
                let price = task.budget.unwrap_or(100) + rng.gen_range(-20..=20);
                match self
                    .marketplace
                    .submit_offer(task.id, provider.id, price.max(10), "Disponible rapidement.".into(), now)
                    .await
                {
                    Ok(_) => report.offers += 1,
                    Err(e) => warn!(task_id = %task.id, provider_id = %provider.id, error = %e, "demo offer rejected"),
                }
            }
        }

        info!(?report, "demo data seeded");
        Ok(report)
    }

    async fn completed_flow(&self, client: &User, provider: &User, now: DateTime<Utc>) -> Result<()> {
        let posted_at = now - Duration::days(3);
        let task = self
            .marketplace
            .post_task(
                NewTask {
                    client_id: client.id,
                    title: "Réparer une chasse d'eau qui fuit".into(),
                    description: "Fuite continue dans les toilettes, intervention souhaitée en semaine.".into(),
                    category: slugify("Plombier"),
                    city: client.city.clone().unwrap_or_else(|| "Paris".into()),
                    budget: Some(120),
                    is_generated: true,
                },
                posted_at,
            )
            .await?;
        let offer = self
            .marketplace
            .submit_offer(task.id, provider.id, 110, "Je peux passer demain matin.".into(), posted_at)
            .await?;
        self.marketplace
            .accept_offer(client.id, offer.id, posted_at + Duration::hours(2))
            .await?;
        self.marketplace
            .complete_task(client.id, task.id, now - Duration::days(2))
            .await?;
        self.marketplace
            .leave_review(task.id, client.id, 5, "Travail soigné et rapide, je recommande.".into(), now)
            .await?;
        self.marketplace
            .leave_review(task.id, provider.id, 5, "Client accueillant et clair.".into(), now)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::{MarketplacePorts, MarketplaceRules};
    use domains::models::NewUser;
    use domains::ports::{
        MockBookingRepository, MockCatalogRepository, MockCreditRepository, MockOfferRepository,
        MockPasswordHasher, MockReviewRepository, MockTaskRepository, MockUserRepository,
    };
    use std::collections::HashSet;

    fn demo_client() -> User {
        NewUser {
            name: "Camille Martin".into(),
            email: "demo-client-1@prochepro.test".into(),
            password_hash: "hash".into(),
            role: UserRole::Client,
            city: Some("Lyon".into()),
            is_generated: true,
        }
        .into_user(Utc::now())
    }

    fn seeded_catalog() -> MockCatalogRepository {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_list_services()
            .returning(|| Ok(default_services().into_iter().take(3).collect()));
        catalog
            .expect_list_districts()
            .returning(|| Ok(default_districts().into_iter().take(5).collect()));
        catalog
    }

    #[tokio::test]
    async fn test_generate_tasks_posts_generated_tasks_within_price_range() {
        let client = demo_client();
        let client_id = client.id;
        let listed = client.clone();

        let mut users = MockUserRepository::new();
        users
            .expect_list_by_role()
            .returning(move |_| Ok(vec![listed.clone()]));
        users.expect_get().returning(move |_| Ok(Some(client.clone())));
        let mut tasks = MockTaskRepository::new();
        tasks
            .expect_create()
            .withf(|t| t.is_generated && t.budget.is_some())
            .times(6)
            .returning(|_| Ok(()));

        let users: Arc<dyn UserRepository> = Arc::new(users);
        let now = Utc::now();
        let seeder = DemoSeeder::new(
            marketplace_with(users.clone(), tasks),
            Arc::new(seeded_catalog()),
            users,
        )
        .with_seed(7);

        let created = seeder.generate_tasks(6, now).await.unwrap();

        assert_eq!(created.len(), 6);
        let services = default_services();
        for task in &created {
            assert_eq!(task.client_id, client_id);
            assert!(task.created_at <= now && task.created_at >= now - Duration::hours(72));
            let service = services.iter().find(|s| s.slug == task.category).unwrap();
            let budget = task.budget.unwrap();
            assert!(budget >= service.price_min && budget <= service.price_max);
        }
    }

    fn marketplace_with(users: Arc<dyn UserRepository>, tasks: MockTaskRepository) -> Arc<MarketplaceService> {
        Arc::new(MarketplaceService::new(
            MarketplacePorts {
                users,
                tasks: Arc::new(tasks),
                offers: Arc::new(MockOfferRepository::new()),
                reviews: Arc::new(MockReviewRepository::new()),
                credits: Arc::new(MockCreditRepository::new()),
                bookings: Arc::new(MockBookingRepository::new()),
                hasher: Arc::new(MockPasswordHasher::new()),
            },
            MarketplaceRules::default(),
        ))
    }

    #[tokio::test]
    async fn test_generate_tasks_requires_demo_clients() {
        let mut users = MockUserRepository::new();
        users.expect_list_by_role().returning(|_| Ok(Vec::new()));
        let users: Arc<dyn UserRepository> = Arc::new(users);

        let seeder = DemoSeeder::new(
            marketplace_with(users.clone(), MockTaskRepository::new()),
            Arc::new(MockCatalogRepository::new()),
            users,
        );
        let err = seeder.generate_tasks(3, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_existing_demo_accounts_are_reused() {
        let existing = demo_client();
        let existing_id = existing.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email.to_string() == "demo-client-1@prochepro.test")
            .returning(move |_| Ok(Some(existing.clone())));
        users.expect_create().never();
        let users: Arc<dyn UserRepository> = Arc::new(users);

        let seeder = DemoSeeder::new(
            marketplace_with(users.clone(), MockTaskRepository::new()),
            Arc::new(MockCatalogRepository::new()),
            users,
        );
        let accounts = seeder
            .ensure_accounts(UserRole::Client, 1, "demo-password", Utc::now())
            .await
            .unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, existing_id);
    }

    #[test]
    fn default_catalog_slugs_are_unique() {
        let services = default_services();
        let slugs: HashSet<_> = services.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs.len(), services.len());
        assert!(slugs.contains("electricien"));

        let districts = default_districts();
        let slugs: HashSet<_> = districts.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs.len(), districts.len());
        assert!(slugs.contains("paris-1er"));
        assert!(slugs.contains("lyon-9e"));
    }

    #[test]
    fn postal_codes_follow_city_prefixes() {
        for d in default_districts() {
            let prefix = match d.city.as_str() {
                "Paris" => "75",
                "Lyon" => "69",
                _ => "13",
            };
            assert!(d.postal_code.starts_with(prefix), "{} {}", d.name, d.postal_code);
            assert_eq!(d.postal_code.len(), 5);
        }
    }
}
