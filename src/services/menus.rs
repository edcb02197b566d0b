use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{by_id, first_or_not_found, reorder_rows, to_patch};
use crate::backend::{decode_rows, tables, DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;
use crate::models::common::normalize_string;
use crate::models::{
    CmsMenu, CmsMenuItem, CreateMenuInput, CreateMenuItemInput, MenuNode, MenuTree,
    UpdateMenuInput, UpdateMenuItemInput,
};

/// Nests flat menu items by `parent_id`, ordered by position then label.
/// Items pointing at a missing parent, or caught in a cycle, become roots.
pub fn build_menu_tree(items: &[CmsMenuItem]) -> Vec<MenuNode> {
    let ids: HashSet<Uuid> = items.iter().map(|i| i.id).collect();
    let mut children: HashMap<Uuid, Vec<&CmsMenuItem>> = HashMap::new();
    let mut roots = Vec::new();
    for item in items {
        match item.parent_id {
            Some(parent) if parent != item.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(item)
            }
            _ => roots.push(item),
        }
    }
    let key = |i: &&CmsMenuItem| (i.position, i.label.to_lowercase());
    for list in children.values_mut() {
        list.sort_by_key(key);
    }
    roots.sort_by_key(key);

    fn nest(
        item: &CmsMenuItem,
        children: &HashMap<Uuid, Vec<&CmsMenuItem>>,
        seen: &mut HashSet<Uuid>,
    ) -> Option<MenuNode> {
        if !seen.insert(item.id) {
            return None;
        }
        let nested = children
            .get(&item.id)
            .map(|list| list.iter().filter_map(|c| nest(c, children, seen)).collect())
            .unwrap_or_default();
        Some(MenuNode {
            item: item.clone(),
            children: nested,
        })
    }

    let mut seen = HashSet::new();
    let mut tree: Vec<MenuNode> = roots
        .into_iter()
        .filter_map(|item| nest(item, &children, &mut seen))
        .collect();
    let mut stranded: Vec<&CmsMenuItem> = items.iter().filter(|i| !seen.contains(&i.id)).collect();
    stranded.sort_by_key(key);
    for item in stranded {
        if let Some(node) = nest(item, &children, &mut seen) {
            tree.push(node);
        }
    }
    tree
}

fn item_descendants(items: &[CmsMenuItem], root: Uuid) -> HashSet<Uuid> {
    let mut found = HashSet::new();
    let mut frontier = vec![root];
    while let Some(id) = frontier.pop() {
        for item in items.iter().filter(|i| i.parent_id == Some(id)) {
            if item.id != root && found.insert(item.id) {
                frontier.push(item.id);
            }
        }
    }
    found
}

/// Last known menu trees keyed by locale and location.
///
/// Entries are replaced wholesale; concurrent writers resolve as last write
/// wins.
#[derive(Debug, Default)]
pub struct MenuStore {
    menus: RwLock<HashMap<(Locale, String), MenuTree>>,
}

impl MenuStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, locale: Locale, location: &str) -> Option<MenuTree> {
        self.menus
            .read()
            .await
            .get(&(locale, location.to_string()))
            .cloned()
    }

    pub async fn set(&self, tree: MenuTree) {
        let key = (tree.menu.locale, tree.menu.location.clone());
        self.menus.write().await.insert(key, tree);
    }

    pub async fn remove(&self, locale: Locale, location: &str) {
        self.menus.write().await.remove(&(locale, location.to_string()));
    }

    pub async fn len(&self) -> usize {
        self.menus.read().await.len()
    }
}

#[derive(Clone)]
pub struct MenuService {
    backend: Arc<dyn DataBackend>,
    store: Arc<MenuStore>,
}

impl MenuService {
    pub fn new(backend: Arc<dyn DataBackend>, store: Arc<MenuStore>) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &Arc<MenuStore> {
        &self.store
    }

    #[instrument(skip(self))]
    pub async fn list_menus(&self, locale: Locale) -> Result<Vec<CmsMenu>, ServiceError> {
        let query = TableQuery::new().eq("locale", locale).order_asc("location");
        Ok(decode_rows(self.backend.select(tables::CMS_MENUS, &query).await?)?)
    }

    pub async fn get_menu(&self, id: Uuid) -> Result<CmsMenu, ServiceError> {
        let rows = self.backend.select(tables::CMS_MENUS, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("menu {id}"))
    }

    /// Menu tree for a placement. A successful read replaces the stored
    /// copy; when the backend read fails the stored copy is served instead.
    #[instrument(skip(self))]
    pub async fn menu_tree(&self, locale: Locale, location: &str) -> Result<Option<MenuTree>, ServiceError> {
        let location = location.trim().to_lowercase();
        let location = location.as_str();
        match self.fetch_tree(locale, location).await {
            Ok(Some(tree)) => {
                self.store.set(tree.clone()).await;
                Ok(Some(tree))
            }
            Ok(None) => {
                self.store.remove(locale, location).await;
                Ok(None)
            }
            Err(err) => match self.store.get(locale, location).await {
                Some(stored) => {
                    warn!(error = %err, %locale, location, "menu read failed; serving last known menu");
                    Ok(Some(stored))
                }
                None => Err(err),
            },
        }
    }

    async fn fetch_tree(&self, locale: Locale, location: &str) -> Result<Option<MenuTree>, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .eq("location", location)
            .limit(1);
        let menus: Vec<CmsMenu> = decode_rows(self.backend.select(tables::CMS_MENUS, &query).await?)?;
        let Some(menu) = menus.into_iter().next() else {
            return Ok(None);
        };
        let items = self.list_items(menu.id).await?;
        Ok(Some(MenuTree {
            items: build_menu_tree(&items),
            menu,
        }))
    }

    /// Rebuilds the stored tree of one menu after an admin change.
    async fn refresh(&self, menu_id: Uuid) -> Result<(), ServiceError> {
        let menu = self.get_menu(menu_id).await?;
        let items = self.list_items(menu_id).await?;
        self.store
            .set(MenuTree {
                items: build_menu_tree(&items),
                menu,
            })
            .await;
        Ok(())
    }

    async fn ensure_location_free(&self, locale: Locale, location: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let taken = self
            .list_menus(locale)
            .await?
            .into_iter()
            .any(|m| m.location == location && Some(m.id) != exclude);
        if taken {
            return Err(ServiceError::Conflict(format!(
                "a menu already exists for location '{location}' ({locale})"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(location = %input.location))]
    pub async fn create_menu(&self, locale: Locale, input: CreateMenuInput) -> Result<CmsMenu, ServiceError> {
        let locale = input.locale.unwrap_or(locale);
        let location = normalize_string(input.location).to_lowercase();
        self.ensure_location_free(locale, &location, None).await?;
        let row = json!({
            "locale": locale,
            "name": normalize_string(input.name),
            "location": location,
        });
        let menu: CmsMenu = serde_json::from_value(self.backend.insert(tables::CMS_MENUS, row).await?)?;
        self.refresh(menu.id).await?;
        info!("Created menu: {} ({})", menu.id, menu.location);
        Ok(menu)
    }

    #[instrument(skip(self, input))]
    pub async fn update_menu(&self, id: Uuid, input: UpdateMenuInput) -> Result<CmsMenu, ServiceError> {
        let existing = self.get_menu(id).await?;
        let mut patch = to_patch(&input)?;
        if let Some(Value::String(location)) = patch.get_mut("location") {
            *location = location.trim().to_lowercase();
            self.ensure_location_free(existing.locale, location, Some(id)).await?;
        }
        if let Some(Value::String(name)) = patch.get_mut("name") {
            *name = name.trim().to_string();
        }
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CMS_MENUS, &by_id(id), Value::Object(patch))
            .await?;
        let menu: CmsMenu = first_or_not_found(decode_rows(rows)?, format!("menu {id}"))?;
        if menu.location != existing.location {
            self.store.remove(existing.locale, &existing.location).await;
        }
        self.refresh(id).await?;
        Ok(menu)
    }

    #[instrument(skip(self))]
    pub async fn delete_menu(&self, id: Uuid) -> Result<(), ServiceError> {
        let menu = self.get_menu(id).await?;
        self.backend
            .delete(tables::CMS_MENU_ITEMS, &TableQuery::new().eq("menu_id", id))
            .await?;
        self.backend.delete(tables::CMS_MENUS, &by_id(id)).await?;
        self.store.remove(menu.locale, &menu.location).await;
        info!("Deleted menu: {}", id);
        Ok(())
    }

    pub async fn list_items(&self, menu_id: Uuid) -> Result<Vec<CmsMenuItem>, ServiceError> {
        let query = TableQuery::new().eq("menu_id", menu_id).order_asc("position");
        Ok(decode_rows(self.backend.select(tables::CMS_MENU_ITEMS, &query).await?)?)
    }

    pub async fn get_item(&self, id: Uuid) -> Result<CmsMenuItem, ServiceError> {
        let rows = self.backend.select(tables::CMS_MENU_ITEMS, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("menu item {id}"))
    }

    #[instrument(skip(self, input), fields(label = %input.label))]
    pub async fn create_item(&self, menu_id: Uuid, input: CreateMenuItemInput) -> Result<CmsMenuItem, ServiceError> {
        let menu = self.get_menu(menu_id).await?;
        let items = self.list_items(menu_id).await?;
        if let Some(parent) = input.parent_id {
            if !items.iter().any(|i| i.id == parent) {
                return Err(ServiceError::InvalidInput(format!(
                    "parent item {parent} is not part of menu {menu_id}"
                )));
            }
        }
        let position = input.position.unwrap_or_else(|| {
            items.iter().filter(|i| i.parent_id == input.parent_id).count() as i32
        });
        let row = json!({
            "menu_id": menu_id,
            "parent_id": input.parent_id,
            "locale": menu.locale,
            "label": normalize_string(input.label),
            "url": input.url.trim(),
            "position": position,
            "open_in_new_tab": input.open_in_new_tab,
        });
        let item: CmsMenuItem = serde_json::from_value(self.backend.insert(tables::CMS_MENU_ITEMS, row).await?)?;
        self.refresh(menu_id).await?;
        Ok(item)
    }

    #[instrument(skip(self, input))]
    pub async fn update_item(&self, id: Uuid, input: UpdateMenuItemInput) -> Result<CmsMenuItem, ServiceError> {
        let existing = self.get_item(id).await?;
        let mut patch = Map::new();
        if let Some(parent) = input.parent_id {
            if let Some(parent_id) = parent {
                let items = self.list_items(existing.menu_id).await?;
                if parent_id == id || item_descendants(&items, id).contains(&parent_id) {
                    return Err(ServiceError::InvalidInput(
                        "a menu item cannot be nested under itself".into(),
                    ));
                }
                if !items.iter().any(|i| i.id == parent_id) {
                    return Err(ServiceError::InvalidInput(format!(
                        "parent item {parent_id} is not part of this menu"
                    )));
                }
            }
            patch.insert("parent_id".into(), json!(parent));
        }
        if let Some(label) = input.label {
            patch.insert("label".into(), json!(normalize_string(label)));
        }
        if let Some(url) = input.url {
            patch.insert("url".into(), json!(url.trim()));
        }
        if let Some(position) = input.position {
            patch.insert("position".into(), json!(position));
        }
        if let Some(open_in_new_tab) = input.open_in_new_tab {
            patch.insert("open_in_new_tab".into(), json!(open_in_new_tab));
        }
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CMS_MENU_ITEMS, &by_id(id), Value::Object(patch))
            .await?;
        let item = first_or_not_found(decode_rows(rows)?, format!("menu item {id}"))?;
        self.refresh(existing.menu_id).await?;
        Ok(item)
    }

    /// Deletes an item; its children move up to its parent.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: Uuid) -> Result<(), ServiceError> {
        let item = self.get_item(id).await?;
        self.backend
            .update(
                tables::CMS_MENU_ITEMS,
                &TableQuery::new().eq("parent_id", id),
                json!({ "parent_id": item.parent_id }),
            )
            .await?;
        self.backend.delete(tables::CMS_MENU_ITEMS, &by_id(id)).await?;
        self.refresh(item.menu_id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reorder_items(&self, menu_id: Uuid, ids: &[Uuid]) -> Result<Vec<CmsMenuItem>, ServiceError> {
        self.get_menu(menu_id).await?;
        reorder_rows(
            &self.backend,
            tables::CMS_MENU_ITEMS,
            TableQuery::new().eq("menu_id", menu_id),
            ids,
        )
        .await?;
        self.refresh(menu_id).await?;
        self.list_items(menu_id).await
    }
}
