mod common;

use axum::http::{Method, StatusCode};
use common::{pluck, TestApp};
use serde_json::json;

const APPAREL_ID: &str = "10000000-0000-4000-8000-000000000001";
const SHIRTS_ID: &str = "10000000-0000-4000-8000-000000000002";
const ACCESSORIES_ID: &str = "10000000-0000-4000-8000-000000000003";
const LINEN_ID: &str = "20000000-0000-4000-8000-000000000001";
const BELT_ID: &str = "20000000-0000-4000-8000-000000000003";
const SUMMER_ID: &str = "30000000-0000-4000-8000-000000000001";
const HOME_PAGE_ID: &str = "40000000-0000-4000-8000-000000000001";
const HEADER_MENU_ID: &str = "50000000-0000-4000-8000-000000000001";
const SHOP_ITEM_ID: &str = "51000000-0000-4000-8000-000000000001";
const SIDEBAR_ZONE_ID: &str = "60000000-0000-4000-8000-000000000001";

#[tokio::test]
async fn product_lifecycle() {
    let app = TestApp::new().await;

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/products",
            Some(json!({
                "title": "  Canvas Tote ",
                "price": "32.00",
                "stock_quantity": 7,
                "images": [
                    { "url": "https://cdn.example.com/tote-1.jpg" },
                    { "url": "https://cdn.example.com/tote-2.jpg", "alt": "Inside" }
                ]
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["meta"]["locale"], "en");
    let id = res.data()["id"].as_str().unwrap().to_string();
    assert_eq!(res.data()["title"], "Canvas Tote");
    assert_eq!(res.data()["slug"], "canvas-tote");
    assert_eq!(res.data()["is_active"], true);
    assert_eq!(res.data()["images"].as_array().unwrap().len(), 2);

    let res = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/cms/products/{id}"),
            Some(json!({ "price": "28.00", "is_featured": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["price"], "28.00");
    assert_eq!(res.data()["is_featured"], true);

    let res = app.get("/api/v1/storefront/products/canvas-tote").await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/cms/products/{id}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app
        .request_authenticated(Method::GET, &format!("/api/v1/cms/products/{id}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(app.backend.count("product_images").await, 0);
}

#[tokio::test]
async fn product_slugs_are_unique_per_locale() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/products",
            Some(json!({ "title": "Another", "slug": "linen-shirt", "price": "10" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/products?lang=ar",
            Some(json!({ "title": "Linen", "slug": "linen-shirt", "price": "10" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["locale"], "ar");
}

#[tokio::test]
async fn invalid_product_payload_is_rejected() {
    let app = TestApp::new().await;

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/products",
            Some(json!({ "title": "", "price": "-1" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_product_listing_includes_inactive() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(Method::GET, "/api/v1/cms/products?sort=price_desc", None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(pluck(res.data(), "slug")[0], "archived-scarf");
    assert_eq!(res.data().as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn category_parent_options_skip_descendants() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/cms/categories/parent-options?editing={APPAREL_ID}"),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(pluck(res.data(), "id"), vec![ACCESSORIES_ID]);

    let res = app
        .request_authenticated(Method::GET, "/api/v1/cms/categories/parent-options", None)
        .await;
    assert_eq!(res.data().as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn category_cannot_move_under_its_descendant() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/cms/categories/{APPAREL_ID}"),
            Some(json!({ "parent_id": SHIRTS_ID })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/cms/categories/{SHIRTS_ID}"),
            Some(json!({ "parent_id": null })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["parent_id"].is_null());
}

#[tokio::test]
async fn deleting_category_reparents_children() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/cms/categories/{APPAREL_ID}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app
        .request_authenticated(Method::GET, &format!("/api/v1/cms/categories/{SHIRTS_ID}"), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["parent_id"].is_null());

    let res = app.get("/api/v1/storefront/categories").await;
    let mut roots = pluck(res.data(), "slug");
    roots.sort_unstable();
    assert_eq!(roots, vec!["accessories", "shirts"]);
}

#[tokio::test]
async fn category_tree_tracks_expansion() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(Method::GET, "/api/v1/cms/categories/tree?expand=all", None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()[0]["id"], APPAREL_ID);
    assert_eq!(res.data()[0]["expanded"], true);
    assert_eq!(res.data()[0]["children"][0]["id"], SHIRTS_ID);

    let res = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/cms/categories/tree?expand=all&toggle={APPAREL_ID}"),
            None,
        )
        .await;
    assert_eq!(res.data()[0]["expanded"], false);

    let res = app
        .request_authenticated(Method::GET, "/api/v1/cms/categories/tree?expanded=abc", None)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collection_membership_can_be_replaced() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/cms/collections/{SUMMER_ID}/products"),
            Some(json!({ "product_ids": [BELT_ID, LINEN_ID] })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    let res = app.get("/api/v1/storefront/collections/summer-edit").await;
    assert_eq!(
        pluck(&res.data()["products"], "slug"),
        vec!["leather-belt", "linen-shirt"]
    );
}

#[tokio::test]
async fn page_builder_flow() {
    let app = TestApp::new().await;

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/pages",
            Some(json!({ "title": "Summer Sale" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["slug"], "summer-sale");
    assert_eq!(res.data()["status"], "draft");
    let page_id = res.data()["id"].as_str().unwrap().to_string();

    let res = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/cms/pages/{page_id}/sections"),
            Some(json!({ "layout": "full" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let section_id = res.data()["id"].as_str().unwrap().to_string();

    let mut block_ids = Vec::new();
    for payload in [
        json!({ "type": "text", "data": { "heading": "Up to 50% off" } }),
        json!({ "type": "promo_banner", "data": { "title": "Ends Sunday" } }),
    ] {
        let res = app
            .request_authenticated(
                Method::POST,
                &format!("/api/v1/cms/sections/{section_id}/blocks"),
                Some(payload),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        block_ids.push(res.data()["id"].as_str().unwrap().to_string());
    }

    let res = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/cms/sections/{section_id}/blocks/reorder"),
            Some(json!({ "ids": [block_ids[1], block_ids[0]] })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(pluck(res.data(), "type"), vec!["promo_banner", "text"]);

    let res = app.get("/api/v1/storefront/pages/summer-sale").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .request_authenticated(Method::POST, &format!("/api/v1/cms/pages/{page_id}/publish"), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "published");

    let res = app.get("/api/v1/storefront/pages/summer-sale").await;
    assert_eq!(res.status, StatusCode::OK);
    let blocks = &res.data()["sections"][0]["blocks"];
    assert_eq!(pluck(blocks, "type"), vec!["promo_banner", "text"]);
    assert_eq!(blocks[1]["heading"], "Up to 50% off");
}

#[tokio::test]
async fn duplicate_page_into_arabic_creates_draft_copy() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/cms/pages/{HOME_PAGE_ID}/duplicate"),
            Some(json!({ "target_locale": "ar", "slug": "home-copy" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.data()["locale"], "ar");
    assert_eq!(res.data()["status"], "draft");
    let copy_id = res.data()["id"].as_str().unwrap().to_string();

    let res = app
        .request_authenticated(Method::GET, &format!("/api/v1/cms/pages/{copy_id}/preview"), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["meta"]["direction"], "rtl");
    assert_eq!(res.data()["sections"].as_array().unwrap().len(), 2);

    // the Arabic home page already owns the "home" slug
    let res = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/cms/pages/{HOME_PAGE_ID}/duplicate"),
            Some(json!({ "target_locale": "ar" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleting_page_removes_sections_and_blocks() {
    let app = TestApp::seeded().await;
    let sections_before = app.backend.count("cms_sections").await;

    let res = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/cms/pages/{HOME_PAGE_ID}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.backend.count("cms_sections").await, sections_before - 2);
    assert_eq!(app.backend.count("cms_blocks").await, 2);
}

#[tokio::test]
async fn menu_locations_are_unique_per_locale() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/menus",
            Some(json!({ "name": "Second header", "location": "Header" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cms/menus",
            Some(json!({ "name": "Footer", "location": "Footer" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["location"], "footer");
}

#[tokio::test]
async fn menu_items_can_be_nested_and_reordered() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/cms/menus/{HEADER_MENU_ID}/items"),
            Some(json!({ "label": "Belts", "url": "/categories/accessories", "parent_id": SHOP_ITEM_ID })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

    let res = app.get("/api/v1/storefront/menus/header").await;
    assert_eq!(
        pluck(&res.data()["items"][0]["children"], "label"),
        vec!["Shirts", "Belts"]
    );

    let res = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/cms/menu-items/{SHOP_ITEM_ID}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get("/api/v1/storefront/menus/header").await;
    let mut labels = pluck(&res.data()["items"], "label");
    labels.sort_unstable();
    assert_eq!(labels, vec!["Belts", "Journal", "Shirts"]);
}

#[tokio::test]
async fn scheduled_ads_respect_priority_and_window() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/cms/ad-zones/{SIDEBAR_ZONE_ID}/ads"),
            Some(json!({
                "title": "Launch week",
                "image_url": "https://cdn.example.com/launch.jpg",
                "priority": 5,
                "start_date": "2020-01-01T00:00:00Z",
                "end_date": "2999-01-01T00:00:00Z"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

    let res = app.get("/api/v1/storefront/ad-zones/home-sidebar").await;
    assert_eq!(res.data()["ad"]["title"], "Launch week");

    let res = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/cms/ad-zones/{SIDEBAR_ZONE_ID}/ads"),
            Some(json!({
                "title": "Backwards",
                "image_url": "https://cdn.example.com/back.jpg",
                "start_date": "2025-02-01T00:00:00Z",
                "end_date": "2025-01-01T00:00:00Z"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_zone_removes_its_ads() {
    let app = TestApp::seeded().await;

    let res = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/cms/ad-zones/{SIDEBAR_ZONE_ID}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.backend.count("cms_ads").await, 0);

    let res = app.get("/api/v1/storefront/ad-zones/home-sidebar").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
