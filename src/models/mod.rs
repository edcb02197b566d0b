//! Row and payload types for the content tables.

pub mod ad;
pub mod category;
pub mod cms;
pub mod collection;
pub mod common;
pub mod menu;
pub mod product;

pub use ad::{Ad, AdZone, CreateAdInput, CreateAdZoneInput, UpdateAdInput, UpdateAdZoneInput, ZoneWithAd};
pub use category::{Category, CategoryNode, CategoryWithProducts, CreateCategoryInput, UpdateCategoryInput};
pub use cms::{
    CmsBlock, CmsPage, CmsSection, CreateBlockInput, CreatePageInput, CreateSectionInput,
    DuplicatePageInput, PageStatus, ReorderInput, SectionLayout, UpdateBlockInput,
    UpdatePageInput, UpdateSectionInput,
};
pub use collection::{
    Collection, CollectionDetail, CollectionProduct, CreateCollectionInput,
    SetCollectionProductsInput, UpdateCollectionInput,
};
pub use menu::{
    CmsMenu, CmsMenuItem, CreateMenuInput, CreateMenuItemInput, MenuNode, MenuTree,
    UpdateMenuInput, UpdateMenuItemInput,
};
pub use product::{
    CreateProductInput, Product, ProductCategoryLink, ProductDetail, ProductImage,
    ProductImageInput, UpdateProductInput,
};
