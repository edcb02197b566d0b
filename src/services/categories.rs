use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalog::CatalogService;
use super::{by_id, ensure_unique_slug, first_or_not_found};
use crate::backend::{decode_rows, tables, DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;
use crate::models::common::{normalize_optional_string, normalize_string, slugify};
use crate::models::{
    Category, CategoryNode, CategoryWithProducts, CreateCategoryInput, UpdateCategoryInput,
};

fn sort_key(category: &Category) -> (i32, String) {
    (category.position, category.name.to_lowercase())
}

/// Builds the nested tree from flat rows.
///
/// Rows whose parent is missing (or themselves) become roots. Rows caught in
/// a parent cycle are attached once, starting from the lowest-sorted member.
pub fn build_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut children: HashMap<Uuid, Vec<&Category>> = HashMap::new();
    let mut roots: Vec<&Category> = Vec::new();

    for category in categories {
        match category.parent_id {
            Some(parent) if parent != category.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(category)
            }
            _ => roots.push(category),
        }
    }
    for list in children.values_mut() {
        list.sort_by_key(|c| sort_key(c));
    }
    roots.sort_by_key(|c| sort_key(c));

    let mut visited = HashSet::new();
    let mut tree: Vec<CategoryNode> = roots
        .into_iter()
        .filter_map(|root| attach(root, &children, &mut visited))
        .collect();

    let mut stranded: Vec<&Category> = categories.iter().filter(|c| !visited.contains(&c.id)).collect();
    stranded.sort_by_key(|c| sort_key(c));
    for category in stranded {
        if let Some(node) = attach(category, &children, &mut visited) {
            tree.push(node);
        }
    }
    tree
}

fn attach(
    category: &Category,
    children: &HashMap<Uuid, Vec<&Category>>,
    visited: &mut HashSet<Uuid>,
) -> Option<CategoryNode> {
    if !visited.insert(category.id) {
        return None;
    }
    let nested = children
        .get(&category.id)
        .map(|list| {
            list.iter()
                .filter_map(|child| attach(child, children, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(CategoryNode {
        category: category.clone(),
        children: nested,
    })
}

/// Ids of every category below `root`, not including `root` itself.
pub fn descendant_ids(categories: &[Category], root: Uuid) -> HashSet<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for category in categories {
        if let Some(parent) = category.parent_id {
            children.entry(parent).or_default().push(category.id);
        }
    }

    let mut found = HashSet::new();
    let mut queue = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        for child in children.get(&id).into_iter().flatten() {
            if *child != root && found.insert(*child) {
                queue.push_back(*child);
            }
        }
    }
    found
}

/// Categories that may become the parent of `editing`: everything except the
/// node itself and its subtree. With no node being edited, every category.
pub fn parent_options(categories: &[Category], editing: Option<Uuid>) -> Vec<Category> {
    let excluded = match editing {
        Some(id) => {
            let mut set = descendant_ids(categories, id);
            set.insert(id);
            set
        }
        None => HashSet::new(),
    };
    let mut options: Vec<Category> = categories
        .iter()
        .filter(|c| !excluded.contains(&c.id))
        .cloned()
        .collect();
    options.sort_by_key(sort_key);
    options
}

/// Which nodes of an admin tree view are open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeExpansion {
    expanded: HashSet<Uuid>,
}

impl TreeExpansion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            expanded: ids.into_iter().collect(),
        }
    }

    /// Flips one node and returns whether it is now expanded.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded.contains(&id)
    }

    /// Opens every node that has children.
    pub fn expand_all(&mut self, tree: &[CategoryNode]) {
        for node in tree {
            if !node.children.is_empty() {
                self.expanded.insert(node.category.id);
                self.expand_all(&node.children);
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Annotates `tree` with the open state of each node.
    pub fn view(&self, tree: &[CategoryNode]) -> Vec<CategoryTreeView> {
        tree.iter()
            .map(|node| CategoryTreeView {
                category: node.category.clone(),
                expanded: self.is_expanded(node.category.id),
                children: self.view(&node.children),
            })
            .collect()
    }
}

/// Admin tree node with its open/closed state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryTreeView {
    #[serde(flatten)]
    pub category: Category,
    pub expanded: bool,
    #[schema(no_recursion)]
    pub children: Vec<CategoryTreeView>,
}

#[derive(Clone)]
pub struct CategoryService {
    backend: Arc<dyn DataBackend>,
    catalog: Arc<CatalogService>,
}

impl CategoryService {
    pub fn new(backend: Arc<dyn DataBackend>, catalog: Arc<CatalogService>) -> Self {
        Self { backend, catalog }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, locale: Locale) -> Result<Vec<Category>, ServiceError> {
        let query = TableQuery::new()
            .eq("locale", locale)
            .order_asc("position")
            .order_asc("name");
        Ok(decode_rows(self.backend.select(tables::CATEGORIES, &query).await?)?)
    }

    pub async fn tree(&self, locale: Locale) -> Result<Vec<CategoryNode>, ServiceError> {
        let categories = self.list(locale).await?;
        Ok(build_tree(&categories))
    }

    pub async fn parent_options(
        &self,
        locale: Locale,
        editing: Option<Uuid>,
    ) -> Result<Vec<Category>, ServiceError> {
        let categories = self.list(locale).await?;
        Ok(parent_options(&categories, editing))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Category, ServiceError> {
        let rows = self.backend.select(tables::CATEGORIES, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("category {id}"))
    }

    /// Category page: the category, its subtree and the products below it.
    #[instrument(skip(self))]
    pub async fn get_by_slug(
        &self,
        locale: Locale,
        slug: &str,
    ) -> Result<CategoryWithProducts, ServiceError> {
        let categories = self.list(locale).await?;
        let category = categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("category '{slug}' ({locale})")))?;

        let children = build_tree(&categories)
            .into_iter()
            .find_map(|root| find_node(root, category.id))
            .map(|node| node.children)
            .unwrap_or_default();
        let products = self.catalog.products_in_category(locale, category.id).await?;

        Ok(CategoryWithProducts {
            category,
            children,
            products,
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        locale: Locale,
        input: CreateCategoryInput,
    ) -> Result<Category, ServiceError> {
        let locale = input.locale.unwrap_or(locale);
        let name = normalize_string(input.name);
        let slug = input.slug.unwrap_or_else(|| slugify(&name));
        if slug.is_empty() {
            return Err(ServiceError::InvalidInput(
                "a slug could not be derived from the name".into(),
            ));
        }
        if let Some(parent_id) = input.parent_id {
            let parent = self.get(parent_id).await?;
            if parent.locale != locale {
                return Err(ServiceError::InvalidInput(format!(
                    "parent category {parent_id} belongs to locale {}",
                    parent.locale
                )));
            }
        }
        ensure_unique_slug(&self.backend, tables::CATEGORIES, locale, &slug, None).await?;

        let position = match input.position {
            Some(position) => position,
            None => self.sibling_count(locale, input.parent_id).await? as i32,
        };
        let row = json!({
            "locale": locale,
            "name": name,
            "slug": slug,
            "description": normalize_optional_string(input.description),
            "parent_id": input.parent_id,
            "position": position,
            "image_url": normalize_optional_string(input.image_url),
        });
        let category: Category = serde_json::from_value(self.backend.insert(tables::CATEGORIES, row).await?)?;
        info!("Created category: {}", category.id);
        Ok(category)
    }

    /// Moving a category under itself or one of its descendants is rejected.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateCategoryInput) -> Result<Category, ServiceError> {
        let existing = self.get(id).await?;
        let mut patch = Map::new();

        if let Some(name) = input.name {
            patch.insert("name".into(), json!(normalize_string(name)));
        }
        if let Some(slug) = input.slug {
            ensure_unique_slug(&self.backend, tables::CATEGORIES, existing.locale, &slug, Some(id)).await?;
            patch.insert("slug".into(), json!(slug));
        }
        if let Some(description) = input.description {
            patch.insert("description".into(), json!(normalize_optional_string(Some(description))));
        }
        if let Some(position) = input.position {
            patch.insert("position".into(), json!(position));
        }
        if let Some(image_url) = input.image_url {
            patch.insert("image_url".into(), json!(normalize_optional_string(Some(image_url))));
        }
        if let Some(parent) = input.parent_id {
            if let Some(parent_id) = parent {
                if parent_id == id {
                    return Err(ServiceError::InvalidInput(
                        "a category cannot be its own parent".into(),
                    ));
                }
                let siblings = self.list(existing.locale).await?;
                if descendant_ids(&siblings, id).contains(&parent_id) {
                    return Err(ServiceError::InvalidInput(
                        "a category cannot be moved under its own descendant".into(),
                    ));
                }
                if !siblings.iter().any(|c| c.id == parent_id) {
                    return Err(ServiceError::InvalidInput(format!(
                        "parent category {parent_id} does not exist in locale {}",
                        existing.locale
                    )));
                }
            }
            patch.insert("parent_id".into(), json!(parent));
        }

        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CATEGORIES, &by_id(id), Value::Object(patch))
            .await?;
        info!("Updated category: {}", id);
        first_or_not_found(decode_rows(rows)?, format!("category {id}"))
    }

    /// Deletes a category. Its children move up to its parent and its
    /// product links are removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        self.backend
            .update(
                tables::CATEGORIES,
                &TableQuery::new().eq("parent_id", id),
                json!({ "parent_id": existing.parent_id }),
            )
            .await?;
        self.backend
            .delete(tables::PRODUCT_CATEGORIES, &TableQuery::new().eq("category_id", id))
            .await?;
        self.backend.delete(tables::CATEGORIES, &by_id(id)).await?;
        info!("Deleted category: {}", id);
        Ok(())
    }

    async fn sibling_count(&self, locale: Locale, parent: Option<Uuid>) -> Result<usize, ServiceError> {
        let query = TableQuery::new().eq("locale", locale);
        let query = match parent {
            Some(parent_id) => query.eq("parent_id", parent_id),
            None => query.is_null("parent_id"),
        };
        Ok(self.backend.select(tables::CATEGORIES, &query).await?.len())
    }
}

fn find_node(node: CategoryNode, id: Uuid) -> Option<CategoryNode> {
    if node.category.id == id {
        return Some(node);
    }
    node.children.into_iter().find_map(|child| find_node(child, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn category(name: &str, parent: Option<Uuid>, position: i32) -> Category {
        Category {
            id: Uuid::new_v4(),
            locale: Locale::En,
            name: name.into(),
            slug: slugify(name),
            description: None,
            parent_id: parent,
            position,
            image_url: None,
            created_at: None,
        }
    }

    #[test]
    fn tree_orders_by_position_then_name_and_keeps_orphans() {
        let shoes = category("Shoes", None, 1);
        let apparel = category("Apparel", None, 0);
        let boots = category("boots", Some(shoes.id), 0);
        let athletic = category("Athletic", Some(shoes.id), 0);
        let orphan = category("Orphan", Some(Uuid::new_v4()), 5);

        let tree = build_tree(&[shoes.clone(), boots, apparel, athletic, orphan]);
        let roots: Vec<_> = tree.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(roots, ["Apparel", "Shoes", "Orphan"]);
        let kids: Vec<_> = tree[1].children.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(kids, ["Athletic", "boots"]);
    }

    #[test]
    fn tree_survives_cycles() {
        let mut a = category("A", None, 0);
        let b = category("B", Some(a.id), 0);
        a.parent_id = Some(b.id);
        let tree = build_tree(&[a, b]);
        assert_eq!(tree.iter().map(CategoryNode::size).sum::<usize>(), 2);
    }

    #[test]
    fn edited_category_is_never_its_own_parent_option() {
        let root = category("Root", None, 0);
        let child = category("Child", Some(root.id), 0);
        let grandchild = category("Grandchild", Some(child.id), 0);
        let other = category("Other", None, 1);
        let all = vec![root.clone(), child.clone(), grandchild, other.clone()];

        let options = parent_options(&all, Some(child.id));
        let names: Vec<_> = options.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Root", "Other"]);
        assert_eq!(parent_options(&all, None).len(), 4);
    }

    #[test]
    fn expansion_toggles_and_expands_parents_only() {
        let root = category("Root", None, 0);
        let leaf = category("Leaf", Some(root.id), 0);
        let tree = build_tree(&[root.clone(), leaf.clone()]);

        let mut expansion = TreeExpansion::new();
        assert!(expansion.toggle(root.id));
        assert!(!expansion.toggle(root.id));
        expansion.expand_all(&tree);
        assert!(expansion.is_expanded(root.id));
        assert!(!expansion.is_expanded(leaf.id));
        let view = expansion.view(&tree);
        assert!(view[0].expanded);
        expansion.collapse_all();
        assert!(!expansion.is_expanded(root.id));
    }

    proptest! {
        #[test]
        fn parent_options_exclude_self_for_any_forest(parents in proptest::collection::vec(proptest::option::of(0usize..12), 1..12)) {
            let mut rows: Vec<Category> = (0..parents.len()).map(|i| category(&format!("c{i}"), None, 0)).collect();
            let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
            for (row, parent) in rows.iter_mut().zip(&parents) {
                row.parent_id = parent.and_then(|p| ids.get(p).copied());
            }
            for id in &ids {
                let options = parent_options(&rows, Some(*id));
                prop_assert!(options.iter().all(|c| c.id != *id));
                let below = descendant_ids(&rows, *id);
                prop_assert!(options.iter().all(|c| !below.contains(&c.id)));
            }
            let total: usize = build_tree(&rows).iter().map(CategoryNode::size).sum();
            prop_assert_eq!(total, rows.len());
        }
    }

    async fn service() -> CategoryService {
        let backend: Arc<dyn DataBackend> = Arc::new(MemoryBackend::new());
        CategoryService::new(backend.clone(), Arc::new(CatalogService::new(backend)))
    }

    fn create_input(name: &str, parent: Option<Uuid>) -> CreateCategoryInput {
        serde_json::from_value(json!({ "name": name, "parent_id": parent })).unwrap()
    }

    #[tokio::test]
    async fn update_rejects_self_and_descendant_parents() {
        let service = service().await;
        let root = service.create(Locale::En, create_input("Root", None)).await.unwrap();
        let child = service.create(Locale::En, create_input("Child", Some(root.id))).await.unwrap();

        let to_self = UpdateCategoryInput { parent_id: Some(Some(root.id)), ..Default::default() };
        assert_matches!(service.update(root.id, to_self).await, Err(ServiceError::InvalidInput(_)));

        let to_child = UpdateCategoryInput { parent_id: Some(Some(child.id)), ..Default::default() };
        assert_matches!(service.update(root.id, to_child).await, Err(ServiceError::InvalidInput(_)));

        let to_root = UpdateCategoryInput { parent_id: Some(None), ..Default::default() };
        let moved = service.update(child.id, to_root).await.unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[tokio::test]
    async fn delete_reparents_children() {
        let service = service().await;
        let root = service.create(Locale::En, create_input("Root", None)).await.unwrap();
        let middle = service.create(Locale::En, create_input("Middle", Some(root.id))).await.unwrap();
        let leaf = service.create(Locale::En, create_input("Leaf", Some(middle.id))).await.unwrap();

        service.delete(middle.id).await.unwrap();
        assert_eq!(service.get(leaf.id).await.unwrap().parent_id, Some(root.id));
        assert_matches!(service.get(middle.id).await, Err(ServiceError::NotFound(_)));
    }
}
