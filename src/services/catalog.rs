use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::categories::descendant_ids;
use super::product_filters::{apply_product_filters, sort_products, ProductFilters, ProductSort};
use super::{by_id, ensure_unique_slug, first_or_not_found, to_patch};
use crate::backend::{decode_rows, tables, DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;
use crate::models::common::{normalize_optional_string, normalize_string, slugify};
use crate::models::{
    Category, CreateProductInput, Product, ProductCategoryLink, ProductDetail, ProductImage,
    ProductImageInput, UpdateProductInput,
};

pub const DEFAULT_FEATURED_LIMIT: usize = 8;

/// Product reads and writes against the `products`, `product_categories`
/// and `product_images` tables.
#[derive(Clone)]
pub struct CatalogService {
    backend: Arc<dyn DataBackend>,
}

impl CatalogService {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }

    /// Every product in `locale`, newest first, active or not.
    #[instrument(skip(self))]
    pub async fn list_products(&self, locale: Locale) -> Result<Vec<ProductDetail>, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .order_desc("created_at");
        self.load(query).await
    }

    /// Storefront listing: active products narrowed by `filters`.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        locale: Locale,
        filters: &ProductFilters,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .eq("is_active", true)
            .order_desc("created_at");
        let products = self.load(query).await?;
        Ok(filter_and_sort(&products, filters))
    }

    /// Admin listing: every product in `locale` narrowed by `filters`.
    #[instrument(skip(self))]
    pub async fn search_all_products(
        &self,
        locale: Locale,
        filters: &ProductFilters,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let products = self.list_products(locale).await?;
        Ok(filter_and_sort(&products, filters))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let products = self.load(by_id(id)).await?;
        first_or_not_found(products, format!("product {id}"))
    }

    /// Active product by slug; inactive products are not visible here.
    #[instrument(skip(self))]
    pub async fn get_product_by_slug(
        &self,
        locale: Locale,
        slug: &str,
    ) -> Result<ProductDetail, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .eq("slug", slug)
            .eq("is_active", true)
            .limit(1);
        let products = self.load(query).await?;
        first_or_not_found(products, format!("product '{slug}' ({locale})"))
    }

    #[instrument(skip(self))]
    pub async fn featured_products(
        &self,
        locale: Locale,
        limit: usize,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .eq("is_active", true)
            .eq("is_featured", true)
            .order_desc("created_at")
            .limit(limit);
        self.load(query).await
    }

    /// Active products in `locale` with the given ids, returned in the order
    /// of `ids`. Ids that do not resolve in that locale are skipped.
    #[instrument(skip(self))]
    pub async fn products_by_ids(&self, locale: Locale, ids: &[Uuid]) -> Result<Vec<ProductDetail>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = TableQuery::new()
            .in_list("id", ids.iter())
            .eq("locale", locale)
            .eq("is_active", true);
        let mut by_id: HashMap<Uuid, ProductDetail> = self
            .load(query)
            .await?
            .into_iter()
            .map(|p| (p.product.id, p))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Active products linked to `category_id` or any of its descendants.
    #[instrument(skip(self))]
    pub async fn products_in_category(
        &self,
        locale: Locale,
        category_id: Uuid,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let rows = self
            .backend
            .select(tables::CATEGORIES, &TableQuery::new().eq("locale", locale))
            .await?;
        let categories: Vec<Category> = decode_rows(rows)?;
        if !categories.iter().any(|c| c.id == category_id) {
            return Err(ServiceError::NotFound(format!("category {category_id}")));
        }

        let mut scope = descendant_ids(&categories, category_id);
        scope.insert(category_id);

        let links: Vec<ProductCategoryLink> = decode_rows(
            self.backend
                .select(
                    tables::PRODUCT_CATEGORIES,
                    &TableQuery::new().in_list("category_id", scope.iter()),
                )
                .await?,
        )?;
        let product_ids: HashSet<Uuid> = links.into_iter().map(|l| l.product_id).collect();
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = TableQuery::new()
            .eq("locale", locale)
            .eq("is_active", true)
            .in_list("id", product_ids.iter())
            .order_desc("created_at");
        self.load(query).await
    }

    /// Inserts the product row, then its category links, then its images.
    /// When a follow-up step fails the product row is deleted again.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(
        &self,
        locale: Locale,
        input: CreateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        let locale = input.locale.unwrap_or(locale);
        let title = normalize_string(input.title);
        let slug = match input.slug {
            Some(slug) => slug,
            None => slugify(&title),
        };
        if slug.is_empty() {
            return Err(ServiceError::InvalidInput(
                "a slug could not be derived from the title".into(),
            ));
        }
        ensure_unique_slug(&self.backend, tables::PRODUCTS, locale, &slug, None).await?;

        let row = json!({
            "locale": locale,
            "title": title,
            "slug": slug,
            "description": normalize_optional_string(input.description),
            "sku": normalize_optional_string(input.sku),
            "price": input.price,
            "compare_at_price": input.compare_at_price,
            "stock_quantity": input.stock_quantity,
            "is_active": input.is_active.unwrap_or(true),
            "is_featured": input.is_featured.unwrap_or(false),
            "image_url": normalize_optional_string(input.image_url),
        });
        let inserted = self.backend.insert(tables::PRODUCTS, row).await?;
        let product: Product = serde_json::from_value(inserted)?;
        let product_id = product.id;

        let linked = async {
            self.link_categories(product_id, &input.category_ids).await?;
            self.insert_images(product_id, &input.images).await
        }
        .await;

        if let Err(err) = linked {
            warn!(%product_id, error = %err, "product follow-up write failed; removing product row");
            self.rollback_product(product_id).await;
            return Err(err);
        }

        info!("Created product: {}", product_id);
        self.get_product(product_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        let existing = self.get_product(id).await?;
        if let Some(slug) = input.slug.as_deref() {
            ensure_unique_slug(
                &self.backend,
                tables::PRODUCTS,
                existing.product.locale,
                slug,
                Some(id),
            )
            .await?;
        }

        let mut patch = to_patch(&input)?;
        if let Some(Value::String(title)) = patch.get_mut("title") {
            *title = title.trim().to_string();
        }
        if !patch.is_empty() {
            patch.insert("updated_at".into(), json!(Utc::now()));
            self.backend
                .update(tables::PRODUCTS, &by_id(id), Value::Object(patch))
                .await?;
        }

        if let Some(category_ids) = input.category_ids.as_deref() {
            self.backend
                .delete(
                    tables::PRODUCT_CATEGORIES,
                    &TableQuery::new().eq("product_id", id),
                )
                .await?;
            self.link_categories(id, category_ids).await?;
        }
        if let Some(images) = input.images.as_deref() {
            self.backend
                .delete(tables::PRODUCT_IMAGES, &TableQuery::new().eq("product_id", id))
                .await?;
            self.insert_images(id, images).await?;
        }

        info!("Updated product: {}", id);
        self.get_product(id).await
    }

    /// Removes links, images and collection memberships, then the product.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_product(id).await?;
        let owned = TableQuery::new().eq("product_id", id);
        self.backend.delete(tables::PRODUCT_CATEGORIES, &owned).await?;
        self.backend.delete(tables::PRODUCT_IMAGES, &owned).await?;
        self.backend.delete(tables::COLLECTION_PRODUCTS, &owned).await?;
        self.backend.delete(tables::PRODUCTS, &by_id(id)).await?;
        info!("Deleted product: {}", id);
        Ok(())
    }

    async fn link_categories(&self, product_id: Uuid, category_ids: &[Uuid]) -> Result<(), ServiceError> {
        let mut seen = HashSet::new();
        for category_id in category_ids.iter().filter(|id| seen.insert(**id)) {
            self.backend
                .insert(
                    tables::PRODUCT_CATEGORIES,
                    json!({ "product_id": product_id, "category_id": category_id }),
                )
                .await?;
        }
        Ok(())
    }

    async fn insert_images(&self, product_id: Uuid, images: &[ProductImageInput]) -> Result<(), ServiceError> {
        for (index, image) in images.iter().enumerate() {
            let position = image.position.unwrap_or(index as i32);
            self.backend
                .insert(
                    tables::PRODUCT_IMAGES,
                    json!({
                        "product_id": product_id,
                        "url": image.url.trim(),
                        "alt": image.alt.as_deref().map(str::trim),
                        "position": position,
                    }),
                )
                .await?;
        }
        Ok(())
    }

    async fn rollback_product(&self, product_id: Uuid) {
        let owned = TableQuery::new().eq("product_id", product_id);
        let steps = [
            (tables::PRODUCT_CATEGORIES, owned.clone()),
            (tables::PRODUCT_IMAGES, owned),
            (tables::PRODUCTS, by_id(product_id)),
        ];
        for (table, query) in steps {
            if let Err(err) = self.backend.delete(table, &query).await {
                error!(%product_id, table, error = %err, "rollback of partially created product failed");
            }
        }
    }

    /// Fetches products matching `query` and attaches category ids and images.
    async fn load(&self, query: TableQuery) -> Result<Vec<ProductDetail>, ServiceError> {
        let products: Vec<Product> =
            decode_rows(self.backend.select(tables::PRODUCTS, &query).await?)?;
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();

        let links: Vec<ProductCategoryLink> = decode_rows(
            self.backend
                .select(
                    tables::PRODUCT_CATEGORIES,
                    &TableQuery::new().in_list("product_id", ids.iter()),
                )
                .await?,
        )?;
        let images: Vec<ProductImage> = decode_rows(
            self.backend
                .select(
                    tables::PRODUCT_IMAGES,
                    &TableQuery::new()
                        .in_list("product_id", ids.iter())
                        .order_asc("position"),
                )
                .await?,
        )?;

        let mut categories: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in links {
            categories.entry(link.product_id).or_default().push(link.category_id);
        }
        let mut gallery: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
        for image in images {
            gallery.entry(image.product_id).or_default().push(image);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductDetail {
                category_ids: categories.remove(&product.id).unwrap_or_default(),
                images: gallery.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }
}

fn filter_and_sort(products: &[ProductDetail], filters: &ProductFilters) -> Vec<ProductDetail> {
    let mut found = apply_product_filters(products, filters);
    sort_products(&mut found, filters.sort.unwrap_or(ProductSort::Newest));
    found
}
