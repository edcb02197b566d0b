use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::catalog::CatalogService;
use super::{by_id, ensure_unique_slug, first_or_not_found, to_patch};
use crate::backend::{decode_rows, tables, DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;
use crate::models::common::{normalize_optional_string, normalize_string, slugify};
use crate::models::{
    Collection, CollectionDetail, CollectionProduct, CreateCollectionInput, UpdateCollectionInput,
};

#[derive(Clone)]
pub struct CollectionService {
    backend: Arc<dyn DataBackend>,
    catalog: Arc<CatalogService>,
}

impl CollectionService {
    pub fn new(backend: Arc<dyn DataBackend>, catalog: Arc<CatalogService>) -> Self {
        Self { backend, catalog }
    }

    /// All collections in `locale`; `active_only` hides disabled ones.
    #[instrument(skip(self))]
    pub async fn list(&self, locale: Locale, active_only: bool) -> Result<Vec<Collection>, ServiceError> {
        let mut query = TableQuery::new().eq("locale", locale);
        if active_only {
            query = query.eq("is_active", true);
        }
        let query = query.order_asc("title");
        Ok(decode_rows(self.backend.select(tables::COLLECTIONS, &query).await?)?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Collection, ServiceError> {
        let rows = self.backend.select(tables::COLLECTIONS, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("collection {id}"))
    }

    /// Active collection with its products in display order.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, locale: Locale, slug: &str) -> Result<CollectionDetail, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .eq("slug", slug)
            .eq("is_active", true)
            .limit(1);
        let rows = self.backend.select(tables::COLLECTIONS, &query).await?;
        let collection: Collection =
            first_or_not_found(decode_rows(rows)?, format!("collection '{slug}' ({locale})"))?;
        let products = self.products(&collection).await?;
        Ok(CollectionDetail { collection, products })
    }

    /// Products of a collection in its own locale, ordered by their position
    /// in it.
    pub async fn products(&self, collection: &Collection) -> Result<Vec<crate::models::ProductDetail>, ServiceError> {
        let ids = self.product_ids(collection.id).await?;
        self.catalog.products_by_ids(collection.locale, &ids).await
    }

    /// Products of an active collection in `locale`. Disabled collections and
    /// collections of the other locale are not found.
    #[instrument(skip(self))]
    pub async fn storefront_products(
        &self,
        locale: Locale,
        collection_id: Uuid,
    ) -> Result<Vec<crate::models::ProductDetail>, ServiceError> {
        let collection = self.get(collection_id).await?;
        if !collection.is_active || collection.locale != locale {
            return Err(ServiceError::NotFound(format!("collection {collection_id} ({locale})")));
        }
        self.products(&collection).await
    }

    pub async fn product_ids(&self, collection_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let query = TableQuery::new()
            .eq("collection_id", collection_id)
            .order_asc("position");
        let links: Vec<CollectionProduct> =
            decode_rows(self.backend.select(tables::COLLECTION_PRODUCTS, &query).await?)?;
        Ok(links.into_iter().map(|l| l.product_id).collect())
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, locale: Locale, input: CreateCollectionInput) -> Result<Collection, ServiceError> {
        let locale = input.locale.unwrap_or(locale);
        let title = normalize_string(input.title);
        let slug = input.slug.unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return Err(ServiceError::InvalidInput(
                "a slug could not be derived from the title".into(),
            ));
        }
        ensure_unique_slug(&self.backend, tables::COLLECTIONS, locale, &slug, None).await?;

        let row = json!({
            "locale": locale,
            "title": title,
            "slug": slug,
            "description": normalize_optional_string(input.description),
            "image_url": normalize_optional_string(input.image_url),
            "is_active": input.is_active.unwrap_or(true),
        });
        let collection: Collection =
            serde_json::from_value(self.backend.insert(tables::COLLECTIONS, row).await?)?;
        info!("Created collection: {}", collection.id);
        Ok(collection)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateCollectionInput) -> Result<Collection, ServiceError> {
        let existing = self.get(id).await?;
        if let Some(slug) = input.slug.as_deref() {
            ensure_unique_slug(&self.backend, tables::COLLECTIONS, existing.locale, slug, Some(id)).await?;
        }
        let mut patch = to_patch(&input)?;
        if let Some(Value::String(title)) = patch.get_mut("title") {
            *title = title.trim().to_string();
        }
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::COLLECTIONS, &by_id(id), Value::Object(patch))
            .await?;
        info!("Updated collection: {}", id);
        first_or_not_found(decode_rows(rows)?, format!("collection {id}"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        self.backend
            .delete(tables::COLLECTION_PRODUCTS, &TableQuery::new().eq("collection_id", id))
            .await?;
        self.backend.delete(tables::COLLECTIONS, &by_id(id)).await?;
        info!("Deleted collection: {}", id);
        Ok(())
    }

    /// Replaces the membership list. Duplicate ids keep their first position.
    #[instrument(skip(self))]
    pub async fn set_products(&self, collection_id: Uuid, product_ids: &[Uuid]) -> Result<Vec<Uuid>, ServiceError> {
        self.get(collection_id).await?;
        self.backend
            .delete(
                tables::COLLECTION_PRODUCTS,
                &TableQuery::new().eq("collection_id", collection_id),
            )
            .await?;

        let mut seen = std::collections::HashSet::new();
        let mut position = 0;
        for product_id in product_ids.iter().filter(|id| seen.insert(**id)) {
            self.backend
                .insert(
                    tables::COLLECTION_PRODUCTS,
                    json!({
                        "collection_id": collection_id,
                        "product_id": product_id,
                        "position": position,
                    }),
                )
                .await?;
            position += 1;
        }
        info!("Set {} products on collection {}", position, collection_id);
        self.product_ids(collection_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use assert_matches::assert_matches;

    async fn setup() -> (CollectionService, Arc<CatalogService>) {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        let catalog = Arc::new(CatalogService::new(backend.clone()));
        (CollectionService::new(backend, catalog.clone()), catalog)
    }

    #[tokio::test]
    async fn products_follow_membership_order() {
        let (service, catalog) = setup().await;
        let mut ids = Vec::new();
        for title in ["One", "Two", "Three"] {
            let input = serde_json::from_value(json!({ "title": title, "price": "5" })).unwrap();
            ids.push(catalog.create_product(Locale::En, input).await.unwrap().product.id);
        }
        let collection = service
            .create(Locale::En, serde_json::from_value(json!({ "title": "Summer Edit" })).unwrap())
            .await
            .unwrap();
        assert_eq!(collection.slug, "summer-edit");

        service
            .set_products(collection.id, &[ids[2], ids[0], ids[2]])
            .await
            .unwrap();
        let detail = service.get_by_slug(Locale::En, "summer-edit").await.unwrap();
        let titles: Vec<_> = detail.products.iter().map(|p| p.product.title.as_str()).collect();
        assert_eq!(titles, ["Three", "One"]);
    }

    #[tokio::test]
    async fn inactive_collections_are_hidden_from_storefront() {
        let (service, _) = setup().await;
        let input = serde_json::from_value(json!({ "title": "Archive", "is_active": false })).unwrap();
        service.create(Locale::En, input).await.unwrap();
        assert!(service.list(Locale::En, true).await.unwrap().is_empty());
        assert_eq!(service.list(Locale::En, false).await.unwrap().len(), 1);
        assert_matches!(
            service.get_by_slug(Locale::En, "archive").await,
            Err(ServiceError::NotFound(_))
        );
    }
}
