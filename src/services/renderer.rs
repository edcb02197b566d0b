//! Turns a stored page tree into render-ready JSON.
//!
//! A page is fetched first and its absence is an error. Sections and blocks
//! are fetched one level at a time; a failed fetch below the page yields an
//! empty subtree and a warning rather than failing the whole page. Every
//! stored block produces exactly one [`RenderedBlock`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::time::Instant;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ads::AdService;
use super::catalog::{CatalogService, DEFAULT_FEATURED_LIMIT};
use super::collections::CollectionService;
use super::hero_carousel::{AutoplaySettings, HeroCarousel};
use super::pages::PageService;
use crate::backend::decode_row;
use crate::errors::ServiceError;
use crate::locale::{Direction, Locale};
use crate::metrics;
use crate::models::{Ad, AdZone, CmsBlock, CmsPage, CmsSection, ProductDetail};

const MAX_GRID_PRODUCTS: usize = 48;

/// Block type tag as stored in `cms_blocks.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Hero,
    ProductGrid,
    PromoBanner,
    AdZone,
    Text,
    Unknown(String),
}

impl BlockKind {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "hero" => BlockKind::Hero,
            "product_grid" => BlockKind::ProductGrid,
            "promo_banner" => BlockKind::PromoBanner,
            "ad_zone" => BlockKind::AdZone,
            "text" => BlockKind::Text,
            other => BlockKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Hero => "hero",
            BlockKind::ProductGrid => "product_grid",
            BlockKind::PromoBanner => "promo_banner",
            BlockKind::AdZone => "ad_zone",
            BlockKind::Text => "text",
            BlockKind::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BlockKind::Unknown(_))
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct HeroSlide {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub cta_label: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderedBlock {
    Hero {
        block_id: Uuid,
        slides: Vec<HeroSlide>,
        autoplay: AutoplaySettings,
    },
    ProductGrid {
        block_id: Uuid,
        title: Option<String>,
        products: Vec<ProductDetail>,
    },
    PromoBanner {
        block_id: Uuid,
        title: Option<String>,
        subtitle: Option<String>,
        image_url: Option<String>,
        link_url: Option<String>,
        cta_label: Option<String>,
    },
    AdZone {
        block_id: Uuid,
        zone: Option<AdZone>,
        ad: Option<Ad>,
    },
    Text {
        block_id: Uuid,
        heading: Option<String>,
        body: Option<String>,
        alignment: TextAlignment,
    },
    /// Placeholder for a block type this service does not know.
    Unsupported {
        block_id: Uuid,
        block_type: String,
        message: String,
    },
}

impl RenderedBlock {
    pub fn block_id(&self) -> Uuid {
        match self {
            RenderedBlock::Hero { block_id, .. }
            | RenderedBlock::ProductGrid { block_id, .. }
            | RenderedBlock::PromoBanner { block_id, .. }
            | RenderedBlock::AdZone { block_id, .. }
            | RenderedBlock::Text { block_id, .. }
            | RenderedBlock::Unsupported { block_id, .. } => *block_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenderedSection {
    pub section: CmsSection,
    pub blocks: Vec<RenderedBlock>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenderedPage {
    pub page: CmsPage,
    pub locale: Locale,
    pub direction: Direction,
    pub sections: Vec<RenderedSection>,
}

impl RenderedPage {
    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }
}

fn text_field(data: Option<&Value>, key: &str) -> Option<String> {
    data.and_then(|d| d.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn uuid_field(data: Option<&Value>, key: &str) -> Option<Uuid> {
    data.and_then(|d| d.get(key))
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// Slides from `data.slides`; entries that are not slide objects are skipped.
fn hero_slides(data: Option<&Value>) -> Vec<HeroSlide> {
    data.and_then(|d| d.get("slides"))
        .and_then(Value::as_array)
        .map(|slides| {
            slides
                .iter()
                .filter(|v| v.is_object())
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn grid_limit(data: Option<&Value>) -> usize {
    data.and_then(|d| d.get("limit"))
        .and_then(Value::as_u64)
        .map(|n| (n as usize).clamp(1, MAX_GRID_PRODUCTS))
        .unwrap_or(DEFAULT_FEATURED_LIMIT)
}

/// Where a product grid takes its products from, in order of precedence.
#[derive(Debug, Clone, PartialEq)]
pub enum GridSource {
    Products(Vec<Uuid>),
    Category(Uuid),
    Collection(Uuid),
    Featured,
}

pub fn grid_source(data: Option<&Value>) -> GridSource {
    let ids: Vec<Uuid> = data
        .and_then(|d| d.get("product_ids"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .filter_map(|s| Uuid::parse_str(s).ok())
                .collect()
        })
        .unwrap_or_default();
    if !ids.is_empty() {
        return GridSource::Products(ids);
    }
    if let Some(id) = uuid_field(data, "category_id") {
        return GridSource::Category(id);
    }
    if let Some(id) = uuid_field(data, "collection_id") {
        return GridSource::Collection(id);
    }
    GridSource::Featured
}

/// Placeholder for a stored block row that does not decode. Rows without a
/// readable id cannot be addressed and yield `None`.
fn malformed_block(row: &Value, reason: &str) -> Option<RenderedBlock> {
    let block_id = row
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let block_type = row
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    warn!(%block_id, reason, "rendering malformed block as unsupported");
    metrics::record_block_rendered("unknown", false);
    Some(RenderedBlock::Unsupported {
        block_id,
        block_type,
        message: format!("Malformed block: {reason}"),
    })
}

#[derive(Clone)]
pub struct PageRenderer {
    pages: Arc<PageService>,
    catalog: Arc<CatalogService>,
    collections: Arc<CollectionService>,
    ads: Arc<AdService>,
    hero_interval: Duration,
    hero_pause: Duration,
}

impl PageRenderer {
    pub fn new(
        pages: Arc<PageService>,
        catalog: Arc<CatalogService>,
        collections: Arc<CollectionService>,
        ads: Arc<AdService>,
        hero_interval: Duration,
        hero_pause: Duration,
    ) -> Self {
        Self {
            pages,
            catalog,
            collections,
            ads,
            hero_interval,
            hero_pause,
        }
    }

    /// Storefront render. Drafts are reported as not found.
    #[instrument(skip(self))]
    pub async fn render_page(&self, locale: Locale, slug: &str) -> Result<RenderedPage, ServiceError> {
        let page = self.pages.get_by_slug(locale, slug).await?;
        if !page.is_published() {
            return Err(ServiceError::NotFound(format!("page '{slug}' ({locale})")));
        }
        Ok(self.render(page, Utc::now()).await)
    }

    /// Admin preview; renders regardless of status.
    #[instrument(skip(self))]
    pub async fn preview_page(&self, id: Uuid) -> Result<RenderedPage, ServiceError> {
        let page = self.pages.get(id).await?;
        Ok(self.render(page, Utc::now()).await)
    }

    pub async fn render(&self, page: CmsPage, now: DateTime<Utc>) -> RenderedPage {
        let started = StdInstant::now();
        let sections = match self.pages.sections_for_render(page.id).await {
            Ok(sections) => sections,
            Err(err) => {
                warn!(page_id = %page.id, error = %err, "failed to load sections; rendering page without them");
                Vec::new()
            }
        };

        let mut rendered = Vec::with_capacity(sections.len());
        for section in sections {
            let rows = match self.pages.block_rows(section.id).await {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(section_id = %section.id, error = %err, "failed to load blocks; rendering empty section");
                    Vec::new()
                }
            };
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                match decode_row::<CmsBlock>(row.clone()) {
                    Ok(block) => out.push(self.render_block(&block, page.locale, now).await),
                    Err(err) => match malformed_block(&row, &err.to_string()) {
                        Some(placeholder) => out.push(placeholder),
                        None => {
                            warn!(section_id = %section.id, error = %err, "skipping block row without a usable id")
                        }
                    },
                }
            }
            rendered.push(RenderedSection { section, blocks: out });
        }

        metrics::record_page_rendered();
        crate::tracing::log_slow_operation("render_page", started.elapsed(), Duration::from_secs(1));
        RenderedPage {
            locale: page.locale,
            direction: page.locale.direction(),
            page,
            sections: rendered,
        }
    }

    /// Renders one block. Never fails: missing or malformed data falls back
    /// to defaults and failed lookups to empty content.
    pub async fn render_block(&self, block: &CmsBlock, locale: Locale, now: DateTime<Utc>) -> RenderedBlock {
        let kind = BlockKind::parse(&block.block_type);
        let label = if kind.is_known() { kind.as_str() } else { "unknown" };
        metrics::record_block_rendered(label, kind.is_known());
        let data = block.data.as_ref();
        let block_id = block.id;

        match kind {
            BlockKind::Hero => {
                let slides = hero_slides(data);
                let carousel = HeroCarousel::new(
                    slides.len(),
                    self.hero_interval,
                    self.hero_pause,
                    Instant::now(),
                );
                RenderedBlock::Hero {
                    block_id,
                    autoplay: carousel.settings(),
                    slides,
                }
            }
            BlockKind::ProductGrid => RenderedBlock::ProductGrid {
                block_id,
                title: text_field(data, "title"),
                products: self.grid_products(block_id, locale, data).await,
            },
            BlockKind::PromoBanner => RenderedBlock::PromoBanner {
                block_id,
                title: text_field(data, "title"),
                subtitle: text_field(data, "subtitle"),
                image_url: text_field(data, "image_url"),
                link_url: text_field(data, "link_url"),
                cta_label: text_field(data, "cta_label"),
            },
            BlockKind::AdZone => {
                let (zone, ad) = self.zone_and_ad(block_id, locale, data, now).await;
                RenderedBlock::AdZone { block_id, zone, ad }
            }
            BlockKind::Text => RenderedBlock::Text {
                block_id,
                heading: text_field(data, "heading"),
                body: text_field(data, "body"),
                alignment: data
                    .and_then(|d| d.get("alignment"))
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default(),
            },
            BlockKind::Unknown(tag) => RenderedBlock::Unsupported {
                block_id,
                message: format!("Unknown block type: {tag}"),
                block_type: tag,
            },
        }
    }

    async fn grid_products(&self, block_id: Uuid, locale: Locale, data: Option<&Value>) -> Vec<ProductDetail> {
        let limit = grid_limit(data);
        let fetched = match grid_source(data) {
            GridSource::Products(ids) => self.catalog.products_by_ids(locale, &ids).await,
            GridSource::Category(id) => self.catalog.products_in_category(locale, id).await,
            GridSource::Collection(id) => self.collections.storefront_products(locale, id).await,
            GridSource::Featured => self.catalog.featured_products(locale, limit).await,
        };
        match fetched {
            Ok(mut products) => {
                products.truncate(limit);
                products
            }
            Err(err) => {
                warn!(%block_id, error = %err, "product grid fetch failed; rendering empty grid");
                Vec::new()
            }
        }
    }

    async fn zone_and_ad(
        &self,
        block_id: Uuid,
        locale: Locale,
        data: Option<&Value>,
        now: DateTime<Utc>,
    ) -> (Option<AdZone>, Option<Ad>) {
        let zone = if let Some(id) = uuid_field(data, "zone_id") {
            self.ads.get_zone(id).await
        } else if let Some(name) = text_field(data, "zone_name") {
            self.ads.get_zone_by_name(locale, &name).await
        } else {
            Err(ServiceError::InvalidInput("ad_zone block names no zone".into()))
        };
        let zone = match zone {
            Ok(zone) => zone,
            Err(err) => {
                warn!(%block_id, error = %err, "ad zone lookup failed");
                return (None, None);
            }
        };
        match self.ads.resolve_zone_ad(&zone, now).await {
            Ok(ad) => (Some(zone), ad),
            Err(err) => {
                warn!(%block_id, zone = %zone.name, error = %err, "ad fetch failed");
                (Some(zone), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, DataBackend, MemoryBackend, TableQuery};
    use crate::backend::tables;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::json;

    fn renderer(backend: Arc<dyn DataBackend>) -> (PageRenderer, Arc<PageService>) {
        let pages = Arc::new(PageService::new(backend.clone()));
        let catalog = Arc::new(CatalogService::new(backend.clone()));
        let collections = Arc::new(CollectionService::new(backend.clone(), catalog.clone()));
        let ads = Arc::new(AdService::new(backend));
        (
            PageRenderer::new(
                pages.clone(),
                catalog,
                collections,
                ads,
                Duration::from_millis(5000),
                Duration::from_millis(5000),
            ),
            pages,
        )
    }

    #[test]
    fn block_kind_has_explicit_fallback() {
        assert_eq!(BlockKind::parse("product_grid"), BlockKind::ProductGrid);
        assert_eq!(BlockKind::parse("carousel"), BlockKind::Unknown("carousel".into()));
        assert!(!BlockKind::parse("").is_known());
    }

    #[test]
    fn grid_source_precedence() {
        let id = Uuid::new_v4();
        assert_eq!(grid_source(None), GridSource::Featured);
        assert_eq!(
            grid_source(Some(&json!({ "category_id": id, "collection_id": Uuid::new_v4() }))),
            GridSource::Category(id)
        );
        assert_eq!(
            grid_source(Some(&json!({ "product_ids": [id], "category_id": Uuid::new_v4() }))),
            GridSource::Products(vec![id])
        );
        assert_eq!(grid_source(Some(&json!({ "product_ids": ["junk"] }))), GridSource::Featured);
    }

    #[tokio::test]
    async fn every_block_renders_exactly_once() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend);
        let page = pages
            .create(Locale::Ar, serde_json::from_value(json!({ "title": "الرئيسية", "slug": "home", "status": "published" })).unwrap())
            .await
            .unwrap();
        let section = pages.create_section(page.id, Default::default()).await.unwrap();
        let blocks = [
            json!({ "type": "hero", "data": { "slides": [{ "title": "مرحبا" }, 42, { "image_url": "https://cdn.test/2.jpg" }] } }),
            json!({ "type": "product_grid" }),
            json!({ "type": "promo_banner", "data": "not an object" }),
            json!({ "type": "ad_zone", "data": { "zone_name": "missing" } }),
            json!({ "type": "text", "data": { "heading": "عن المتجر", "alignment": "diagonal" } }),
            json!({ "type": "video" }),
        ];
        for block in blocks {
            pages.create_block(section.id, serde_json::from_value(block).unwrap()).await.unwrap();
        }

        let rendered = renderer.render_page(Locale::Ar, "home").await.unwrap();
        assert_eq!(rendered.direction, Direction::Rtl);
        assert_eq!(rendered.block_count(), 6);
        let out = &rendered.sections[0].blocks;
        assert_matches!(&out[0], RenderedBlock::Hero { slides, autoplay, .. } => {
            assert_eq!(slides.len(), 2);
            assert!(autoplay.enabled);
            assert_eq!(autoplay.pause_after_interaction_ms, 5000);
        });
        assert_matches!(&out[1], RenderedBlock::ProductGrid { products, .. } if products.is_empty());
        assert_matches!(&out[2], RenderedBlock::PromoBanner { title: None, .. });
        assert_matches!(&out[3], RenderedBlock::AdZone { zone: None, ad: None, .. });
        assert_matches!(&out[4], RenderedBlock::Text { alignment: TextAlignment::Start, .. });
        assert_matches!(&out[5], RenderedBlock::Unsupported { message, .. } if message == "Unknown block type: video");
    }

    async fn published_page_with_section(
        backend: &Arc<dyn DataBackend>,
        pages: &PageService,
        slug: &str,
        layout: Value,
    ) -> Uuid {
        let page = pages
            .create(Locale::En, serde_json::from_value(json!({ "title": slug, "slug": slug, "status": "published" })).unwrap())
            .await
            .unwrap();
        let section = backend
            .insert(
                tables::CMS_SECTIONS,
                json!({ "page_id": page.id, "locale": "en", "position": 0, "layout": layout }),
            )
            .await
            .unwrap();
        Uuid::parse_str(section["id"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn null_block_type_keeps_its_siblings() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend.clone());
        let section_id = published_page_with_section(&backend, &pages, "landing", json!("full")).await;
        for (position, block_type) in [(0, json!("text")), (1, Value::Null), (2, json!("promo_banner"))] {
            backend
                .insert(
                    tables::CMS_BLOCKS,
                    json!({ "section_id": section_id, "locale": "en", "position": position, "type": block_type }),
                )
                .await
                .unwrap();
        }

        let rendered = renderer.render_page(Locale::En, "landing").await.unwrap();
        assert_eq!(rendered.block_count(), 3);
        let out = &rendered.sections[0].blocks;
        assert_matches!(&out[0], RenderedBlock::Text { .. });
        assert_matches!(&out[1], RenderedBlock::Unsupported { block_type, .. } if block_type.is_empty());
        assert_matches!(&out[2], RenderedBlock::PromoBanner { .. });
    }

    #[tokio::test]
    async fn null_position_still_renders() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend.clone());
        let section_id = published_page_with_section(&backend, &pages, "about", json!("contained")).await;
        for position in [json!(0), Value::Null] {
            backend
                .insert(
                    tables::CMS_BLOCKS,
                    json!({ "section_id": section_id, "locale": "en", "position": position, "type": "text" }),
                )
                .await
                .unwrap();
        }

        let rendered = renderer.render_page(Locale::En, "about").await.unwrap();
        assert_eq!(rendered.block_count(), 2);
        assert_eq!(pages.list_blocks(section_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_section_layout_reads_as_default() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend.clone());
        let section_id = published_page_with_section(&backend, &pages, "wide", json!("wide")).await;
        backend
            .insert(
                tables::CMS_BLOCKS,
                json!({ "section_id": section_id, "locale": "en", "position": 0, "type": "text" }),
            )
            .await
            .unwrap();

        let rendered = renderer.render_page(Locale::En, "wide").await.unwrap();
        assert_eq!(rendered.sections.len(), 1);
        assert_eq!(rendered.sections[0].section.layout, crate::models::SectionLayout::Contained);
        assert_eq!(rendered.block_count(), 1);
    }

    #[tokio::test]
    async fn undecodable_block_becomes_placeholder() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend.clone());
        let section_id = published_page_with_section(&backend, &pages, "mixed", json!("split")).await;
        backend
            .insert(
                tables::CMS_BLOCKS,
                json!({ "section_id": section_id, "locale": "fr", "position": 0, "type": "hero" }),
            )
            .await
            .unwrap();
        backend
            .insert(
                tables::CMS_BLOCKS,
                json!({ "section_id": section_id, "locale": "en", "position": 1, "type": "text" }),
            )
            .await
            .unwrap();

        let rendered = renderer.render_page(Locale::En, "mixed").await.unwrap();
        let out = &rendered.sections[0].blocks;
        assert_eq!(out.len(), 2);
        assert_matches!(&out[0], RenderedBlock::Unsupported { block_type, message, .. } => {
            assert_eq!(block_type, "hero");
            assert!(message.starts_with("Malformed block"));
        });
        assert_matches!(&out[1], RenderedBlock::Text { .. });
    }

    #[tokio::test]
    async fn grids_only_show_products_of_the_page_locale() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend.clone());
        let catalog = Arc::new(CatalogService::new(backend.clone()));
        let collections = CollectionService::new(backend.clone(), catalog.clone());
        let product = |title: &str| serde_json::from_value(json!({ "title": title, "price": "30" })).unwrap();
        let en = catalog.create_product(Locale::En, product("Linen Shirt")).await.unwrap();
        let ar = catalog.create_product(Locale::Ar, product("قميص")).await.unwrap();

        let en_edit = collections
            .create(Locale::En, serde_json::from_value(json!({ "title": "Edit" })).unwrap())
            .await
            .unwrap();
        collections.set_products(en_edit.id, &[en.product.id]).await.unwrap();
        let ar_hidden = collections
            .create(Locale::Ar, serde_json::from_value(json!({ "title": "مخفي", "is_active": false })).unwrap())
            .await
            .unwrap();
        collections.set_products(ar_hidden.id, &[ar.product.id]).await.unwrap();

        let page = pages
            .create(Locale::Ar, serde_json::from_value(json!({ "title": "عروض", "slug": "offers", "status": "published" })).unwrap())
            .await
            .unwrap();
        let section = pages.create_section(page.id, Default::default()).await.unwrap();
        for data in [
            json!({ "product_ids": [en.product.id, ar.product.id] }),
            json!({ "collection_id": en_edit.id }),
            json!({ "collection_id": ar_hidden.id }),
        ] {
            pages
                .create_block(section.id, serde_json::from_value(json!({ "type": "product_grid", "data": data })).unwrap())
                .await
                .unwrap();
        }

        let rendered = renderer.render_page(Locale::Ar, "offers").await.unwrap();
        let grids: Vec<Vec<Uuid>> = rendered.sections[0]
            .blocks
            .iter()
            .map(|block| match block {
                RenderedBlock::ProductGrid { products, .. } => products.iter().map(|p| p.product.id).collect(),
                other => panic!("expected a product grid, got {other:?}"),
            })
            .collect();
        assert_eq!(grids, vec![vec![ar.product.id], vec![], vec![]]);
    }

    #[tokio::test]
    async fn drafts_are_hidden_but_previewable() {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let (renderer, pages) = renderer(backend);
        let page = pages
            .create(Locale::En, serde_json::from_value(json!({ "title": "Draft" })).unwrap())
            .await
            .unwrap();
        assert_matches!(renderer.render_page(Locale::En, "draft").await, Err(ServiceError::NotFound(_)));
        assert_eq!(renderer.preview_page(page.id).await.unwrap().page.id, page.id);
    }

    /// Serves pages but fails every block query.
    struct BrokenBlocks(MemoryBackend);

    #[async_trait]
    impl DataBackend for BrokenBlocks {
        fn name(&self) -> &'static str {
            "broken-blocks"
        }
        async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>, BackendError> {
            if table == tables::CMS_BLOCKS {
                return Err(BackendError::Api { status: 500, code: None, message: "boom".into() });
            }
            self.0.select(table, query).await
        }
        async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
            self.0.insert(table, row).await
        }
        async fn update(&self, table: &str, query: &TableQuery, patch: Value) -> Result<Vec<Value>, BackendError> {
            self.0.update(table, query, patch).await
        }
        async fn delete(&self, table: &str, query: &TableQuery) -> Result<u64, BackendError> {
            self.0.delete(table, query).await
        }
        async fn ping(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_block_fetch_renders_empty_section() {
        let backend: Arc<dyn DataBackend> = Arc::new(BrokenBlocks(MemoryBackend::new()));
        let (renderer, pages) = renderer(backend);
        let page = pages
            .create(Locale::En, serde_json::from_value(json!({ "title": "Sale", "status": "published" })).unwrap())
            .await
            .unwrap();
        pages.create_section(page.id, Default::default()).await.unwrap();

        let rendered = renderer.render_page(Locale::En, "sale").await.unwrap();
        assert_eq!(rendered.sections.len(), 1);
        assert!(rendered.sections[0].blocks.is_empty());
    }
}
