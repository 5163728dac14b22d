//! # Sitemap
//!
//! Collects every public URL (static pages, services, published posts and
//! landing pages) and renders sitemaps.org 0.9 XML. Above
//! [`MAX_URLS_PER_FILE`] entries the output is split into `sitemap-N.xml`
//! files referenced by a `sitemap.xml` index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use domains::errors::{DomainError, Result};
use domains::ports::{CatalogRepository, ContentRepository};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::info;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const MAX_URLS_PER_FILE: usize = 50_000;
pub const INDEX_FILE_NAME: &str = "sitemap.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
        }
    }
}

const STATIC_PAGES: [(&str, ChangeFreq, f32); 5] = [
    ("/", ChangeFreq::Daily, 1.0),
    ("/services", ChangeFreq::Daily, 0.9),
    ("/blog", ChangeFreq::Daily, 0.8),
    ("/comment-ca-marche", ChangeFreq::Monthly, 0.5),
    ("/devenir-prestataire", ChangeFreq::Monthly, 0.6),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: ChangeFreq,
    pub priority: f32,
}

/// One file of a (possibly split) sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapFile {
    pub name: String,
    pub xml: String,
}

fn xml_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Internal(format!("sitemap xml: {e}"))
}

fn write_text_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn open_document(root: &str) -> Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    let mut start = BytesStart::new(root);
    start.push_attribute(("xmlns", SITEMAP_NS));
    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    Ok(writer)
}

fn close_document(mut writer: Writer<Vec<u8>>, root: &str) -> Result<String> {
    writer
        .write_event(Event::End(BytesEnd::new(root)))
        .map_err(xml_err)?;
    String::from_utf8(writer.into_inner()).map_err(xml_err)
}

fn w3c_datetime(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Renders a `<urlset>`. Text content is XML-escaped.
pub fn render_urlset(entries: &[SitemapEntry]) -> Result<String> {
    let mut writer = open_document("urlset")?;
    for entry in entries {
        writer
            .write_event(Event::Start(BytesStart::new("url")))
            .map_err(xml_err)?;
        write_text_element(&mut writer, "loc", &entry.loc)?;
        if let Some(lastmod) = entry.lastmod {
            write_text_element(&mut writer, "lastmod", &w3c_datetime(lastmod))?;
        }
        write_text_element(&mut writer, "changefreq", entry.changefreq.as_str())?;
        write_text_element(&mut writer, "priority", &format!("{:.1}", entry.priority))?;
        writer
            .write_event(Event::End(BytesEnd::new("url")))
            .map_err(xml_err)?;
    }
    close_document(writer, "urlset")
}

/// Renders a `<sitemapindex>` pointing at `locs`.
pub fn render_index(locs: &[String], now: DateTime<Utc>) -> Result<String> {
    let mut writer = open_document("sitemapindex")?;
    let lastmod = w3c_datetime(now);
    for loc in locs {
        writer
            .write_event(Event::Start(BytesStart::new("sitemap")))
            .map_err(xml_err)?;
        write_text_element(&mut writer, "loc", loc)?;
        write_text_element(&mut writer, "lastmod", &lastmod)?;
        writer
            .write_event(Event::End(BytesEnd::new("sitemap")))
            .map_err(xml_err)?;
    }
    close_document(writer, "sitemapindex")
}

/// Splits `entries` into files of at most `max_per_file` URLs. A single
/// file is returned as-is under [`INDEX_FILE_NAME`]; otherwise that name
/// holds the index.
pub fn paginate(
    base_url: &str,
    entries: &[SitemapEntry],
    max_per_file: usize,
    now: DateTime<Utc>,
) -> Result<Vec<SitemapFile>> {
    let max_per_file = max_per_file.max(1);
    if entries.len() <= max_per_file {
        return Ok(vec![SitemapFile {
            name: INDEX_FILE_NAME.to_string(),
            xml: render_urlset(entries)?,
        }]);
    }

    let mut files = Vec::new();
    for (i, chunk) in entries.chunks(max_per_file).enumerate() {
        files.push(SitemapFile {
            name: format!("sitemap-{}.xml", i + 1),
            xml: render_urlset(chunk)?,
        });
    }
    let locs: Vec<String> = files.iter().map(|f| format!("{base_url}/{}", f.name)).collect();
    files.insert(
        0,
        SitemapFile {
            name: INDEX_FILE_NAME.to_string(),
            xml: render_index(&locs, now)?,
        },
    );
    Ok(files)
}

pub struct SitemapBuilder {
    base_url: String,
    catalog: Arc<dyn CatalogRepository>,
    content: Arc<dyn ContentRepository>,
    max_per_file: usize,
}

impl SitemapBuilder {
    pub fn new(
        base_url: impl Into<String>,
        catalog: Arc<dyn CatalogRepository>,
        content: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog,
            content,
            max_per_file: MAX_URLS_PER_FILE,
        }
    }

    /// Lowers the split threshold, mostly for tests.
    pub fn with_max_per_file(mut self, max_per_file: usize) -> Self {
        self.max_per_file = max_per_file.max(1);
        self
    }

    pub async fn entries(&self) -> Result<Vec<SitemapEntry>> {
        let mut entries: Vec<SitemapEntry> = STATIC_PAGES
            .iter()
            .map(|&(path, changefreq, priority)| SitemapEntry {
                loc: self.url(path),
                lastmod: None,
                changefreq,
                priority,
            })
            .collect();

        for service in self.catalog.list_services().await? {
            entries.push(SitemapEntry {
                loc: self.url(&format!("/services/{}", service.slug)),
                lastmod: None,
                changefreq: ChangeFreq::Weekly,
                priority: 0.8,
            });
        }
        for post in self.content.published_post_urls().await? {
            entries.push(SitemapEntry {
                loc: self.url(&format!("/blog/{}", post.slug)),
                lastmod: Some(post.updated_at),
                changefreq: ChangeFreq::Monthly,
                priority: 0.6,
            });
        }
        for page in self.content.published_seo_urls().await? {
            entries.push(SitemapEntry {
                loc: self.url(&format!("/{}", page.slug)),
                lastmod: Some(page.updated_at),
                changefreq: ChangeFreq::Weekly,
                priority: 0.7,
            });
        }
        Ok(entries)
    }

    pub async fn build(&self, now: DateTime<Utc>) -> Result<Vec<SitemapFile>> {
        let entries = self.entries().await?;
        paginate(&self.base_url, &entries, self.max_per_file, now)
    }

    /// One file by name: `sitemap.xml` or a `sitemap-N.xml` part.
    pub async fn file(&self, name: &str, now: DateTime<Utc>) -> Result<Option<SitemapFile>> {
        Ok(self.build(now).await?.into_iter().find(|f| f.name == name))
    }

    /// Writes the sitemap to `path`; split files land next to it.
    pub async fn write_to(&self, path: &Path, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let files = self.build(now).await?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| DomainError::Internal(format!("cannot create {}: {e}", dir.display())))?;
        }

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let target = if file.name == INDEX_FILE_NAME {
                path.to_path_buf()
            } else {
                dir.join(&file.name)
            };
            tokio::fs::write(&target, file.xml)
                .await
                .map_err(|e| DomainError::Internal(format!("cannot write {}: {e}", target.display())))?;
            written.push(target);
        }
        info!(files = written.len(), path = %path.display(), "sitemap written");
        Ok(written)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::models::{PopularService, PublishedUrl};
    use domains::ports::{MockCatalogRepository, MockContentRepository};
    use uuid::Uuid;

    fn entry(loc: &str) -> SitemapEntry {
        SitemapEntry {
            loc: loc.into(),
            lastmod: None,
            changefreq: ChangeFreq::Weekly,
            priority: 0.5,
        }
    }

    fn builder() -> SitemapBuilder {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_list_services().returning(|| {
            Ok(vec![PopularService {
                id: Uuid::now_v7(),
                name: "Plombier".into(),
                slug: "plombier".into(),
                category: "maison".into(),
                price_min: 50,
                price_max: 200,
                is_active: true,
                sort_order: 1,
            }])
        });
        let mut content = MockContentRepository::new();
        content.expect_published_post_urls().returning(|| {
            Ok(vec![PublishedUrl {
                slug: "guide-plombier-paris-11e".into(),
                updated_at: Utc::now(),
            }])
        });
        content.expect_published_seo_urls().returning(|| {
            Ok(vec![PublishedUrl {
                slug: "prix-plombier-paris-11e".into(),
                updated_at: Utc::now(),
            }])
        });
        SitemapBuilder::new("https://prochepro.fr/", Arc::new(catalog), Arc::new(content))
    }

    #[test]
    fn urlset_escapes_text() {
        let xml = render_urlset(&[entry("https://prochepro.fr/?a=1&b=<2>")]).unwrap();
        assert!(xml.contains("<loc>https://prochepro.fr/?a=1&amp;b=&lt;2&gt;</loc>"));
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(SITEMAP_NS));
    }

    #[test]
    fn small_sitemaps_are_a_single_urlset() {
        let files = paginate("https://x.fr", &[entry("https://x.fr/")], 10, Utc::now()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, INDEX_FILE_NAME);
        assert!(files[0].xml.contains("<urlset"));
    }

    #[test]
    fn large_sitemaps_split_with_index() {
        let entries: Vec<_> = (0..5).map(|i| entry(&format!("https://x.fr/{i}"))).collect();
        let files = paginate("https://x.fr", &entries, 2, Utc::now()).unwrap();

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["sitemap.xml", "sitemap-1.xml", "sitemap-2.xml", "sitemap-3.xml"]);
        assert!(files[0].xml.contains("<sitemapindex"));
        assert!(files[0].xml.contains("<loc>https://x.fr/sitemap-3.xml</loc>"));
        assert!(files[3].xml.contains("https://x.fr/4"));
    }

    #[tokio::test]
    async fn test_entries_cover_every_section() {
        let entries = builder().entries().await.unwrap();
        let locs: Vec<_> = entries.iter().map(|e| e.loc.as_str()).collect();

        assert_eq!(entries.len(), STATIC_PAGES.len() + 3);
        assert!(locs.contains(&"https://prochepro.fr/"));
        assert!(locs.contains(&"https://prochepro.fr/services/plombier"));
        assert!(locs.contains(&"https://prochepro.fr/blog/guide-plombier-paris-11e"));
        assert!(locs.contains(&"https://prochepro.fr/prix-plombier-paris-11e"));
    }

    #[tokio::test]
    async fn test_write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("sitemap.xml");

        let written = builder().write_to(&path, Utc::now()).await.unwrap();
        assert_eq!(written, vec![path.clone()]);
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<changefreq>monthly</changefreq>"));
    }
}
