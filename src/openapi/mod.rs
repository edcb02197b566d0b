use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Storefront CMS API",
        version = "1.0.0",
        description = r#"
# Storefront and content management API

Bilingual (English / Arabic) storefront backed by a hosted table and auth API.

## Locale

Every content route resolves a locale from, in order:
- `?lang=en|ar` query parameter
- `x-locale` header
- `Accept-Language` header
- the configured default

Responses carry `meta.locale` and `meta.direction` (`ltr` / `rtl`) and a
`Content-Language` header.

## Authentication

CMS routes under `/api/v1/cms` require an access token from `/auth/sign-in`
when admin authentication is enabled:

```
Authorization: Bearer <access-token>
```

## Error Handling

```json
{
  "error": "Not Found",
  "message": "Not found: page 'summer-sale' (ar)",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Storefront", description = "Public localized content"),
        (name = "CMS Pages", description = "Pages, sections and blocks"),
        (name = "CMS Products", description = "Product administration"),
        (name = "CMS Categories", description = "Category tree administration"),
        (name = "CMS Collections", description = "Collection administration"),
        (name = "CMS Ads", description = "Ad zones and scheduled ads"),
        (name = "CMS Menus", description = "Navigation menus"),
        (name = "Auth", description = "Account sign-in passthrough")
    ),
    paths(
        // Storefront
        crate::handlers::site::site_info,
        crate::handlers::storefront::home,
        crate::handlers::storefront::get_page,
        crate::handlers::storefront::list_products,
        crate::handlers::storefront::get_product,
        crate::handlers::storefront::category_tree,
        crate::handlers::storefront::get_category,
        crate::handlers::storefront::list_collections,
        crate::handlers::storefront::get_collection,
        crate::handlers::storefront::get_menu,
        crate::handlers::storefront::get_ad_zone,

        // CMS pages
        crate::handlers::pages::list_pages,
        crate::handlers::pages::create_page,
        crate::handlers::pages::get_page,
        crate::handlers::pages::update_page,
        crate::handlers::pages::delete_page,
        crate::handlers::pages::publish_page,
        crate::handlers::pages::unpublish_page,
        crate::handlers::pages::preview_page,
        crate::handlers::pages::duplicate_page,
        crate::handlers::pages::list_sections,
        crate::handlers::pages::create_section,
        crate::handlers::pages::reorder_sections,
        crate::handlers::pages::get_section,
        crate::handlers::pages::update_section,
        crate::handlers::pages::delete_section,
        crate::handlers::pages::list_blocks,
        crate::handlers::pages::create_block,
        crate::handlers::pages::reorder_blocks,
        crate::handlers::pages::get_block,
        crate::handlers::pages::update_block,
        crate::handlers::pages::delete_block,

        // CMS catalog
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::category_tree,
        crate::handlers::categories::parent_options,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::collections::list_collections,
        crate::handlers::collections::create_collection,
        crate::handlers::collections::get_collection,
        crate::handlers::collections::update_collection,
        crate::handlers::collections::delete_collection,
        crate::handlers::collections::collection_products,
        crate::handlers::collections::set_collection_products,

        // CMS ads and menus
        crate::handlers::ads::list_zones,
        crate::handlers::ads::create_zone,
        crate::handlers::ads::get_zone,
        crate::handlers::ads::update_zone,
        crate::handlers::ads::delete_zone,
        crate::handlers::ads::list_ads,
        crate::handlers::ads::create_ad,
        crate::handlers::ads::get_ad,
        crate::handlers::ads::update_ad,
        crate::handlers::ads::delete_ad,
        crate::handlers::menus::list_menus,
        crate::handlers::menus::create_menu,
        crate::handlers::menus::get_menu,
        crate::handlers::menus::update_menu,
        crate::handlers::menus::delete_menu,
        crate::handlers::menus::list_items,
        crate::handlers::menus::create_item,
        crate::handlers::menus::reorder_items,
        crate::handlers::menus::get_item,
        crate::handlers::menus::update_item,
        crate::handlers::menus::delete_item,

        // Auth
        crate::handlers::auth::sign_up,
        crate::handlers::auth::sign_in,
        crate::handlers::auth::sign_out,
        crate::handlers::auth::current_user,
        crate::handlers::auth::refresh,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,
            crate::locale::Locale,
            crate::locale::Direction,
            crate::services::product_filters::StockFilter,
            crate::services::product_filters::PriceRange,
            crate::services::product_filters::ProductSort,
            crate::services::renderer::RenderedBlock,
            crate::services::hero_carousel::AutoplaySettings,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_storefront_and_cms_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Storefront CMS API"));
        assert!(json.contains("/api/v1/storefront/pages/{slug}"));
        assert!(json.contains("/api/v1/cms/pages/{id}/duplicate"));
        assert!(json.contains("\"Bearer\""));
    }
}
