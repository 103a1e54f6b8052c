//! Catalog domain module (event-sourced).
//!
//! Categories and products offered by the supplying branch, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;

pub use category::{
    CATEGORY_AGGREGATE_TYPE, Category, CategoryCommand, CategoryCreated, CategoryEvent,
    CategoryId, CategoryUpdated, CreateCategory, UpdateCategory,
};
pub use product::{
    ActivateProduct, CreateProduct, DEFAULT_UNIT, DeactivateProduct, PRODUCT_AGGREGATE_TYPE,
    Product, ProductActivated, ProductCommand, ProductCreated, ProductDeactivated, ProductEvent,
    ProductId, ProductUpdated, UpdateProduct,
};
