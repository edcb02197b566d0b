mod common;

use axum::http::{Method, StatusCode};
use common::{pluck, TestApp};

const APPAREL_ID: &str = "10000000-0000-4000-8000-000000000001";
const SHIRTS_ID: &str = "10000000-0000-4000-8000-000000000002";
const DRAFT_PAGE_ID: &str = "40000000-0000-4000-8000-000000000002";

#[tokio::test]
async fn home_renders_published_page_with_catalog_highlights() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/home").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["meta"]["locale"], "en");
    assert_eq!(res.body["meta"]["direction"], "ltr");
    assert_eq!(res.header("content-language"), Some("en"));

    let data = res.data();
    assert_eq!(data["page"]["page"]["slug"], "home");
    assert_eq!(data["page"]["direction"], "ltr");

    let sections = data["page"]["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);

    let hero = &sections[0]["blocks"][0];
    assert_eq!(hero["type"], "hero");
    assert_eq!(hero["slides"].as_array().unwrap().len(), 2);
    assert_eq!(hero["autoplay"]["interval_ms"], 5000);

    let block_types: Vec<&str> = sections[1]["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b["type"].as_str())
        .collect();
    assert_eq!(block_types, vec!["product_grid", "promo_banner", "ad_zone", "text"]);

    let grid = &sections[1]["blocks"][0];
    assert_eq!(pluck(&grid["products"], "slug"), vec!["oxford-shirt", "linen-shirt"]);

    let ad_block = &sections[1]["blocks"][2];
    assert_eq!(ad_block["zone"]["name"], "home-sidebar");
    assert_eq!(ad_block["ad"]["title"], "Evergreen");

    assert_eq!(
        pluck(&data["featured_products"], "slug"),
        vec!["oxford-shirt", "linen-shirt"]
    );
    assert_eq!(pluck(&data["categories"], "slug"), vec!["apparel", "accessories"]);
    assert_eq!(pluck(&data["collections"], "slug"), vec!["summer-edit"]);
}

#[tokio::test]
async fn arabic_requests_get_arabic_content_and_rtl_direction() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/home?lang=ar").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["meta"]["locale"], "ar");
    assert_eq!(res.body["meta"]["direction"], "rtl");
    assert_eq!(res.header("content-language"), Some("ar"));
    assert_eq!(res.data()["page"]["page"]["title"], "الرئيسية");
    assert_eq!(res.data()["page"]["direction"], "rtl");
    assert_eq!(pluck(&res.data()["featured_products"], "title"), vec!["قميص كتان"]);

    let res = app
        .request_with_headers(
            Method::GET,
            "/api/v1/storefront/products",
            None,
            None,
            &[("accept-language", "ar-EG,ar;q=0.9,en;q=0.5")],
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["meta"]["locale"], "ar");
    assert_eq!(res.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn query_parameter_beats_locale_header() {
    let app = TestApp::seeded().await;

    let res = app
        .request_with_headers(
            Method::GET,
            "/api/v1/storefront/categories?lang=en",
            None,
            None,
            &[("x-locale", "ar")],
        )
        .await;
    assert_eq!(res.body["meta"]["locale"], "en");

    let res = app
        .request_with_headers(
            Method::GET,
            "/api/v1/storefront/categories",
            None,
            None,
            &[("x-locale", "ar")],
        )
        .await;
    assert_eq!(res.body["meta"]["locale"], "ar");
    assert_eq!(pluck(res.data(), "name"), vec!["ملابس"]);
}

#[tokio::test]
async fn product_listing_hides_inactive_products() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/products").await;
    assert_eq!(res.status, StatusCode::OK);
    let slugs = pluck(res.data(), "slug");
    assert_eq!(slugs, vec!["leather-belt", "oxford-shirt", "linen-shirt"]);

    let res = app.get("/api/v1/storefront/products/archived-scarf").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_filters_narrow_and_sort() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/products?stock=low_stock").await;
    assert_eq!(pluck(res.data(), "slug"), vec!["oxford-shirt"]);

    let res = app.get("/api/v1/storefront/products?stock=out_of_stock").await;
    assert_eq!(pluck(res.data(), "slug"), vec!["leather-belt"]);

    let res = app.get("/api/v1/storefront/products?price=under_25").await;
    assert_eq!(pluck(res.data(), "slug"), vec!["leather-belt"]);

    let res = app.get("/api/v1/storefront/products?price=25_to_50").await;
    assert_eq!(pluck(res.data(), "slug"), vec!["linen-shirt"]);

    let res = app.get("/api/v1/storefront/products?sort=price_desc").await;
    assert_eq!(
        pluck(res.data(), "slug"),
        vec!["oxford-shirt", "linen-shirt", "leather-belt"]
    );

    let res = app.get("/api/v1/storefront/products?search=SHIRT&sort=title_asc").await;
    assert_eq!(pluck(res.data(), "slug"), vec!["linen-shirt", "oxford-shirt"]);

    let res = app
        .get(&format!("/api/v1/storefront/products?category_id={SHIRTS_ID}&sort=price_asc"))
        .await;
    assert_eq!(pluck(res.data(), "slug"), vec!["linen-shirt", "oxford-shirt"]);
}

#[tokio::test]
async fn invalid_filter_value_is_rejected() {
    let app = TestApp::seeded().await;
    let res = app.get("/api/v1/storefront/products?stock=plenty").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Bad Request");
    assert!(res.body["message"].as_str().unwrap().contains("plenty"));

    let res = app
        .request_authenticated(Method::GET, "/api/v1/cms/products?price=cheap", None)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["message"].as_str().unwrap().contains("cheap"));
}

#[tokio::test]
async fn product_detail_lists_images_in_position_order() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/products/linen-shirt").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], "Linen Shirt");
    assert_eq!(res.data()["category_ids"][0], SHIRTS_ID);
    let alts = pluck(&res.data()["images"], "alt");
    assert_eq!(alts, vec!["Front view", "Back view"]);
}

#[tokio::test]
async fn category_page_includes_descendant_products() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/categories/apparel").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["category"]["id"], APPAREL_ID);
    assert_eq!(pluck(&res.data()["children"], "slug"), vec!["shirts"]);
    let mut products = pluck(&res.data()["products"], "slug");
    products.sort_unstable();
    assert_eq!(products, vec!["linen-shirt", "oxford-shirt"]);

    let res = app.get("/api/v1/storefront/categories/nope").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn collection_products_follow_collection_order() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/collections/summer-edit").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], "Summer Edit");
    assert_eq!(
        pluck(&res.data()["products"], "slug"),
        vec!["oxford-shirt", "linen-shirt"]
    );
}

#[tokio::test]
async fn draft_pages_are_hidden_from_the_storefront() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/pages/winter-preview").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/cms/pages/{DRAFT_PAGE_ID}/preview"),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["page"]["status"], "draft");
}

#[tokio::test]
async fn menus_render_as_nested_trees() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/menus/HEADER").await;
    assert_eq!(res.status, StatusCode::OK);
    let items = &res.data()["items"];
    assert_eq!(pluck(items, "label"), vec!["Shop", "Journal"]);
    assert_eq!(pluck(&items[0]["children"], "label"), vec!["Shirts"]);
    assert_eq!(items[1]["open_in_new_tab"], true);

    let res = app.get("/api/v1/storefront/menus/footer").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data().is_null());
}

#[tokio::test]
async fn ad_zone_serves_highest_priority_active_ad() {
    let app = TestApp::seeded().await;

    let res = app.get("/api/v1/storefront/ad-zones/home-sidebar").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["zone"]["width"], 300);
    assert_eq!(res.data()["ad"]["title"], "Evergreen");

    let res = app.get("/api/v1/storefront/ad-zones/home-sidebar?lang=ar").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn site_settings_describe_locales_and_hero_timing() {
    let app = TestApp::new().await;

    let res = app.get("/api/v1/site?lang=ar").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["locale"], "ar");
    assert_eq!(res.data()["direction"], "rtl");
    assert_eq!(res.data()["default_locale"], "en");
    assert_eq!(pluck(&res.data()["supported_locales"], "code"), vec!["en", "ar"]);
    assert_eq!(res.data()["hero"]["autoplay_interval_ms"], 5000);
    assert_eq!(res.data()["hero"]["pause_after_interaction_ms"], 5000);
}

#[tokio::test]
async fn empty_store_home_has_no_page() {
    let app = TestApp::new().await;

    let res = app.get("/api/v1/storefront/home").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["page"].is_null());
    assert_eq!(res.data()["featured_products"].as_array().unwrap().len(), 0);
}
