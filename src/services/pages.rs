//! CMS pages and their sections and blocks.
//!
//! There are no cross-table transactions: deleting a page removes blocks,
//! then sections, then the page row, each as its own call.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{by_id, ensure_unique_slug, first_or_not_found, reorder_rows, to_patch};
use crate::backend::{decode_row, decode_rows, tables, DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;
use crate::models::common::{normalize_optional_string, normalize_string, slugify};
use crate::models::{
    CmsBlock, CmsPage, CmsSection, CreateBlockInput, CreatePageInput, CreateSectionInput,
    PageStatus, UpdateBlockInput, UpdatePageInput, UpdateSectionInput,
};

#[derive(Clone)]
pub struct PageService {
    backend: Arc<dyn DataBackend>,
}

impl PageService {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }

    // ----- pages -----

    #[instrument(skip(self))]
    pub async fn list(&self, locale: Locale) -> Result<Vec<CmsPage>, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .order_desc("updated_at");
        Ok(decode_rows(self.backend.select(tables::CMS_PAGES, &query).await?)?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CmsPage, ServiceError> {
        let rows = self.backend.select(tables::CMS_PAGES, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("page {id}"))
    }

    /// Page by slug regardless of status.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, locale: Locale, slug: &str) -> Result<CmsPage, ServiceError> {
        let query = TableQuery::new().eq("locale", locale).eq("slug", slug).limit(1);
        let rows = self.backend.select(tables::CMS_PAGES, &query).await?;
        first_or_not_found(decode_rows(rows)?, format!("page '{slug}' ({locale})"))
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, locale: Locale, input: CreatePageInput) -> Result<CmsPage, ServiceError> {
        let locale = input.locale.unwrap_or(locale);
        let title = normalize_string(input.title);
        let slug = input.slug.unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return Err(ServiceError::InvalidInput(
                "a slug could not be derived from the title".into(),
            ));
        }
        ensure_unique_slug(&self.backend, tables::CMS_PAGES, locale, &slug, None).await?;

        let row = json!({
            "locale": locale,
            "title": title,
            "slug": slug,
            "status": input.status.unwrap_or_default(),
            "meta_title": normalize_optional_string(input.meta_title),
            "meta_description": normalize_optional_string(input.meta_description),
        });
        let page: CmsPage = serde_json::from_value(self.backend.insert(tables::CMS_PAGES, row).await?)?;
        info!("Created page: {} ({})", page.id, page.locale);
        Ok(page)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdatePageInput) -> Result<CmsPage, ServiceError> {
        let existing = self.get(id).await?;
        if let Some(slug) = input.slug.as_deref() {
            ensure_unique_slug(&self.backend, tables::CMS_PAGES, existing.locale, slug, Some(id)).await?;
        }
        let mut patch = to_patch(&input)?;
        if let Some(Value::String(title)) = patch.get_mut("title") {
            *title = title.trim().to_string();
        }
        if patch.is_empty() {
            return Ok(existing);
        }
        self.patch_page(id, Value::Object(patch)).await
    }

    pub async fn publish(&self, id: Uuid) -> Result<CmsPage, ServiceError> {
        self.set_status(id, PageStatus::Published).await
    }

    pub async fn unpublish(&self, id: Uuid) -> Result<CmsPage, ServiceError> {
        self.set_status(id, PageStatus::Draft).await
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: Uuid, status: PageStatus) -> Result<CmsPage, ServiceError> {
        self.get(id).await?;
        let page = self.patch_page(id, json!({ "status": status })).await?;
        info!("Page {} is now {}", id, status);
        Ok(page)
    }

    async fn patch_page(&self, id: Uuid, mut patch: Value) -> Result<CmsPage, ServiceError> {
        if let Value::Object(map) = &mut patch {
            map.insert("updated_at".into(), json!(Utc::now()));
        }
        let rows = self.backend.update(tables::CMS_PAGES, &by_id(id), patch).await?;
        first_or_not_found(decode_rows(rows)?, format!("page {id}"))
    }

    /// Removes every block of every section, the sections, then the page.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        let sections = self.list_sections(id).await?;
        if !sections.is_empty() {
            self.backend
                .delete(
                    tables::CMS_BLOCKS,
                    &TableQuery::new().in_list("section_id", sections.iter().map(|s| s.id)),
                )
                .await?;
        }
        self.backend
            .delete(tables::CMS_SECTIONS, &TableQuery::new().eq("page_id", id))
            .await?;
        self.backend.delete(tables::CMS_PAGES, &by_id(id)).await?;
        info!("Deleted page: {}", id);
        Ok(())
    }

    /// Copies a page with all sections and blocks into `target_locale`.
    /// The copy starts as a draft and shares no rows with the source.
    #[instrument(skip(self))]
    pub async fn duplicate_page_to_locale(
        &self,
        page_id: Uuid,
        target_locale: Locale,
        slug: Option<String>,
    ) -> Result<CmsPage, ServiceError> {
        let source = self.get(page_id).await?;
        let slug = slug.unwrap_or_else(|| source.slug.clone());
        ensure_unique_slug(&self.backend, tables::CMS_PAGES, target_locale, &slug, None).await?;

        let row = json!({
            "locale": target_locale,
            "title": source.title,
            "slug": slug,
            "status": PageStatus::Draft,
            "meta_title": source.meta_title,
            "meta_description": source.meta_description,
        });
        let copy: CmsPage = serde_json::from_value(self.backend.insert(tables::CMS_PAGES, row).await?)?;

        for section in self.list_sections(page_id).await? {
            let section_row = json!({
                "page_id": copy.id,
                "locale": target_locale,
                "position": section.position,
                "layout": section.layout,
                "width": section.width,
                "background_color": section.background_color,
                "background_image": section.background_image,
            });
            let new_section: CmsSection =
                serde_json::from_value(self.backend.insert(tables::CMS_SECTIONS, section_row).await?)?;
            for block in self.list_blocks(section.id).await? {
                self.backend
                    .insert(
                        tables::CMS_BLOCKS,
                        json!({
                            "section_id": new_section.id,
                            "locale": target_locale,
                            "position": block.position,
                            "type": block.block_type,
                            "data": block.data,
                        }),
                    )
                    .await?;
            }
        }

        info!("Duplicated page {} into {} as {}", page_id, target_locale, copy.id);
        Ok(copy)
    }

    // ----- sections -----

    pub async fn list_sections(&self, page_id: Uuid) -> Result<Vec<CmsSection>, ServiceError> {
        let query = TableQuery::new().eq("page_id", page_id).order_asc("position");
        Ok(decode_rows(self.backend.select(tables::CMS_SECTIONS, &query).await?)?)
    }

    /// Sections in render order. A row that does not decode is skipped so
    /// the rest of the page still renders.
    pub async fn sections_for_render(&self, page_id: Uuid) -> Result<Vec<CmsSection>, ServiceError> {
        let query = TableQuery::new().eq("page_id", page_id).order_asc("position");
        let rows = self.backend.select(tables::CMS_SECTIONS, &query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match decode_row::<CmsSection>(row) {
                Ok(section) => Some(section),
                Err(err) => {
                    warn!(%page_id, error = %err, "skipping malformed section row");
                    None
                }
            })
            .collect())
    }

    pub async fn get_section(&self, id: Uuid) -> Result<CmsSection, ServiceError> {
        let rows = self.backend.select(tables::CMS_SECTIONS, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("section {id}"))
    }

    /// Appends a section to a page; the section inherits the page locale.
    #[instrument(skip(self, input))]
    pub async fn create_section(&self, page_id: Uuid, input: CreateSectionInput) -> Result<CmsSection, ServiceError> {
        let page = self.get(page_id).await?;
        let position = match input.position {
            Some(position) => position,
            None => self.list_sections(page_id).await?.len() as i32,
        };
        let row = json!({
            "page_id": page_id,
            "locale": page.locale,
            "position": position,
            "layout": input.layout.unwrap_or_default(),
            "width": normalize_optional_string(input.width),
            "background_color": normalize_optional_string(input.background_color),
            "background_image": normalize_optional_string(input.background_image),
        });
        let section: CmsSection =
            serde_json::from_value(self.backend.insert(tables::CMS_SECTIONS, row).await?)?;
        info!("Created section {} on page {}", section.id, page_id);
        Ok(section)
    }

    #[instrument(skip(self, input))]
    pub async fn update_section(&self, id: Uuid, input: UpdateSectionInput) -> Result<CmsSection, ServiceError> {
        let existing = self.get_section(id).await?;
        let patch = to_patch(&input)?;
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CMS_SECTIONS, &by_id(id), Value::Object(patch))
            .await?;
        first_or_not_found(decode_rows(rows)?, format!("section {id}"))
    }

    #[instrument(skip(self))]
    pub async fn delete_section(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_section(id).await?;
        self.backend
            .delete(tables::CMS_BLOCKS, &TableQuery::new().eq("section_id", id))
            .await?;
        self.backend.delete(tables::CMS_SECTIONS, &by_id(id)).await?;
        info!("Deleted section: {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reorder_sections(&self, page_id: Uuid, ids: &[Uuid]) -> Result<Vec<CmsSection>, ServiceError> {
        self.get(page_id).await?;
        reorder_rows(
            &self.backend,
            tables::CMS_SECTIONS,
            TableQuery::new().eq("page_id", page_id),
            ids,
        )
        .await?;
        self.list_sections(page_id).await
    }

    // ----- blocks -----

    pub async fn list_blocks(&self, section_id: Uuid) -> Result<Vec<CmsBlock>, ServiceError> {
        let query = TableQuery::new().eq("section_id", section_id).order_asc("position");
        Ok(decode_rows(self.backend.select(tables::CMS_BLOCKS, &query).await?)?)
    }

    /// Raw block rows in render order, left undecoded so each row can be
    /// handled on its own.
    pub async fn block_rows(&self, section_id: Uuid) -> Result<Vec<Value>, ServiceError> {
        let query = TableQuery::new().eq("section_id", section_id).order_asc("position");
        Ok(self.backend.select(tables::CMS_BLOCKS, &query).await?)
    }

    pub async fn get_block(&self, id: Uuid) -> Result<CmsBlock, ServiceError> {
        let rows = self.backend.select(tables::CMS_BLOCKS, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("block {id}"))
    }

    #[instrument(skip(self, input), fields(block_type = %input.block_type))]
    pub async fn create_block(&self, section_id: Uuid, input: CreateBlockInput) -> Result<CmsBlock, ServiceError> {
        let section = self.get_section(section_id).await?;
        let position = match input.position {
            Some(position) => position,
            None => self.list_blocks(section_id).await?.len() as i32,
        };
        let row = json!({
            "section_id": section_id,
            "locale": section.locale,
            "position": position,
            "type": input.block_type.trim(),
            "data": input.data,
        });
        let block: CmsBlock = serde_json::from_value(self.backend.insert(tables::CMS_BLOCKS, row).await?)?;
        info!("Created {} block {} in section {}", block.block_type, block.id, section_id);
        Ok(block)
    }

    #[instrument(skip(self, input))]
    pub async fn update_block(&self, id: Uuid, input: UpdateBlockInput) -> Result<CmsBlock, ServiceError> {
        let existing = self.get_block(id).await?;
        let mut patch = to_patch(&input)?;
        if let Some(Value::String(block_type)) = patch.get_mut("type") {
            *block_type = block_type.trim().to_string();
        }
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CMS_BLOCKS, &by_id(id), Value::Object(patch))
            .await?;
        first_or_not_found(decode_rows(rows)?, format!("block {id}"))
    }

    #[instrument(skip(self))]
    pub async fn delete_block(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_block(id).await?;
        self.backend.delete(tables::CMS_BLOCKS, &by_id(id)).await?;
        info!("Deleted block: {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reorder_blocks(&self, section_id: Uuid, ids: &[Uuid]) -> Result<Vec<CmsBlock>, ServiceError> {
        self.get_section(section_id).await?;
        reorder_rows(
            &self.backend,
            tables::CMS_BLOCKS,
            TableQuery::new().eq("section_id", section_id),
            ids,
        )
        .await?;
        self.list_blocks(section_id).await
    }
}
