// Catalog
pub mod catalog;
pub mod categories;
pub mod collections;
pub mod product_filters;

// Content management
pub mod ads;
pub mod menus;
pub mod pages;
pub mod renderer;

// Storefront widgets
pub mod hero_carousel;

// Account passthrough
pub mod auth;

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::{DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;

pub use ads::AdService;
pub use auth::AuthService;
pub use catalog::CatalogService;
pub use categories::{CategoryService, TreeExpansion};
pub use collections::CollectionService;
pub use hero_carousel::{CarouselCommand, CarouselHandle, HeroCarousel};
pub use menus::{MenuService, MenuStore};
pub use pages::PageService;
pub use renderer::{BlockKind, PageRenderer, RenderedBlock, RenderedPage, RenderedSection};

/// Filter selecting a single row by primary key.
pub(crate) fn by_id(id: Uuid) -> TableQuery {
    TableQuery::new().eq("id", id)
}

/// Serializes a patch payload into a JSON object, dropping absent fields.
pub(crate) fn to_patch<T: Serialize>(value: &T) -> Result<Map<String, Value>, ServiceError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(ServiceError::InternalError(format!(
            "patch must serialize to an object, got {other}"
        ))),
    }
}

pub(crate) fn first_or_not_found<T>(rows: Vec<T>, what: impl std::fmt::Display) -> Result<T, ServiceError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ServiceError::NotFound(what.to_string()))
}

/// Rejects a slug already used by another row of `table` in the same locale.
pub(crate) async fn ensure_unique_slug(
    backend: &Arc<dyn DataBackend>,
    table: &str,
    locale: Locale,
    slug: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let existing = backend
        .select(
            table,
            &TableQuery::new().eq("locale", locale).eq("slug", slug),
        )
        .await?;
    let taken = existing.iter().any(|row| {
        let id = row.get("id").and_then(Value::as_str);
        match exclude {
            Some(excluded) => id != Some(excluded.to_string().as_str()),
            None => true,
        }
    });
    if taken {
        return Err(ServiceError::Conflict(format!(
            "slug '{slug}' is already used in {table} ({locale})"
        )));
    }
    Ok(())
}

/// Writes `position = index` for each id in `ids`, scoped by `scope` so rows
/// belonging to another parent are never touched.
pub(crate) async fn reorder_rows(
    backend: &Arc<dyn DataBackend>,
    table: &str,
    scope: TableQuery,
    ids: &[Uuid],
) -> Result<(), ServiceError> {
    let existing = backend.select(table, &scope).await?;
    for id in ids {
        let known = existing
            .iter()
            .any(|row| row.get("id").and_then(Value::as_str) == Some(id.to_string().as_str()));
        if !known {
            return Err(ServiceError::InvalidInput(format!(
                "{id} does not belong to this {table} group"
            )));
        }
    }
    for (position, id) in ids.iter().enumerate() {
        let mut query = scope.clone();
        query.filters.extend(by_id(*id).filters);
        backend
            .update(table, &query, serde_json::json!({ "position": position }))
            .await?;
    }
    Ok(())
}
