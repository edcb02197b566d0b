pub mod ads;
pub mod auth;
pub mod categories;
pub mod collections;
pub mod common;
pub mod menus;
pub mod pages;
pub mod products;
pub mod site;
pub mod storefront;

use axum::Router;
use std::sync::Arc;

use crate::backend::{AuthBackend, DataBackend};
use crate::config::AppConfig;
use crate::services::{
    AdService, AuthService, CatalogService, CategoryService, CollectionService, MenuService,
    MenuStore, PageRenderer, PageService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub categories: Arc<CategoryService>,
    pub collections: Arc<CollectionService>,
    pub pages: Arc<PageService>,
    pub renderer: Arc<PageRenderer>,
    pub ads: Arc<AdService>,
    pub menus: Arc<MenuService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(
        data: Arc<dyn DataBackend>,
        auth: Arc<dyn AuthBackend>,
        config: &AppConfig,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(data.clone()));
        let categories = Arc::new(CategoryService::new(data.clone(), catalog.clone()));
        let collections = Arc::new(CollectionService::new(data.clone(), catalog.clone()));
        let pages = Arc::new(PageService::new(data.clone()));
        let ads = Arc::new(AdService::new(data.clone()));
        let menus = Arc::new(MenuService::new(data, Arc::new(MenuStore::new())));
        let renderer = Arc::new(PageRenderer::new(
            pages.clone(),
            catalog.clone(),
            collections.clone(),
            ads.clone(),
            config.hero_autoplay_interval(),
            config.hero_pause_after_interaction(),
        ));

        Self {
            catalog,
            categories,
            collections,
            pages,
            renderer,
            ads,
            menus,
            auth: Arc::new(AuthService::new(auth)),
        }
    }
}

/// Admin API mounted under `/api/v1/cms`. Every handler takes an
/// [`AdminUser`](crate::auth::AdminUser).
pub fn cms_routes() -> Router<AppState> {
    Router::new()
        .merge(pages::cms_page_routes())
        .merge(products::cms_product_routes())
        .merge(categories::cms_category_routes())
        .merge(collections::cms_collection_routes())
        .merge(ads::cms_ad_routes())
        .merge(menus::cms_menu_routes())
}
