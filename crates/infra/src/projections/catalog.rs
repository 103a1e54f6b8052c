use serde::Serialize;
use serde_json::Value as JsonValue;

use stocklink_catalog::{
    CATEGORY_AGGREGATE_TYPE, CategoryEvent, CategoryId, PRODUCT_AGGREGATE_TYPE, ProductEvent,
    ProductId,
};
use stocklink_events::EventEnvelope;

use super::{Cursors, Projection, ProjectionError, decode};
use crate::read_model::ReadStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReadModel {
    pub category_id: CategoryId,
    pub name: String,
    pub image: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductReadModel {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
    pub active: bool,
}

/// An active category with its active products, for the requester's catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: CategoryReadModel,
    pub products: Vec<ProductReadModel>,
}

/// Categories and products, both listed by name.
#[derive(Debug)]
pub struct CatalogProjection<CS, PS>
where
    CS: ReadStore<CategoryId, CategoryReadModel>,
    PS: ReadStore<ProductId, ProductReadModel>,
{
    categories: CS,
    products: PS,
    cursors: Cursors,
}

impl<CS, PS> CatalogProjection<CS, PS>
where
    CS: ReadStore<CategoryId, CategoryReadModel>,
    PS: ReadStore<ProductId, ProductReadModel>,
{
    pub fn new(categories: CS, products: PS) -> Self {
        Self {
            categories,
            products,
            cursors: Cursors::default(),
        }
    }

    pub fn category(&self, id: &CategoryId) -> Option<CategoryReadModel> {
        self.categories.get(id)
    }

    pub fn product(&self, id: &ProductId) -> Option<ProductReadModel> {
        self.products.get(id)
    }

    pub fn categories(&self) -> Vec<CategoryReadModel> {
        let mut all = self.categories.list();
        all.sort_by_key(|c| c.name.to_lowercase());
        all
    }

    pub fn products(&self) -> Vec<ProductReadModel> {
        let mut all = self.products.list();
        all.sort_by_key(|p| p.name.to_lowercase());
        all
    }

    pub fn active_products(&self) -> Vec<ProductReadModel> {
        self.products().into_iter().filter(|p| p.active).collect()
    }

    pub fn active_categories_with_products(&self) -> Vec<CategoryWithProducts> {
        let products = self.active_products();
        self.categories()
            .into_iter()
            .filter(|c| c.active)
            .map(|category| CategoryWithProducts {
                products: products
                    .iter()
                    .filter(|p| p.category_id == Some(category.category_id))
                    .cloned()
                    .collect(),
                category,
            })
            .collect()
    }

    pub fn find_by_sku(&self, sku: &str) -> Option<ProductReadModel> {
        self.products.list().into_iter().find(|p| p.sku == sku.trim())
    }

    pub fn find_category_by_name(&self, name: &str) -> Option<CategoryReadModel> {
        let name = name.trim().to_lowercase();
        self.categories.list().into_iter().find(|c| c.name.to_lowercase() == name)
    }

    fn apply_category(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        let ev: CategoryEvent = decode(envelope)?;
        let category_id = match &ev {
            CategoryEvent::CategoryCreated(e) => e.category_id,
            CategoryEvent::CategoryUpdated(e) => e.category_id,
        };
        if category_id.0 != envelope.aggregate_id() {
            return Err(ProjectionError::StreamMismatch(
                "event category_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let model = match ev {
            CategoryEvent::CategoryCreated(e) => CategoryReadModel {
                category_id: e.category_id,
                name: e.name,
                image: e.image,
                active: true,
            },
            CategoryEvent::CategoryUpdated(e) => CategoryReadModel {
                category_id: e.category_id,
                name: e.name,
                image: e.image,
                active: e.active,
            },
        };
        self.categories.upsert(category_id, model);
        Ok(())
    }

    fn apply_product(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let ev: ProductEvent = decode(envelope)?;
        let product_id = match &ev {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::ProductUpdated(e) => e.product_id,
            ProductEvent::ProductActivated(e) => e.product_id,
            ProductEvent::ProductDeactivated(e) => e.product_id,
        };
        if product_id.0 != envelope.aggregate_id() {
            return Err(ProjectionError::StreamMismatch(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let model = match ev {
            ProductEvent::ProductCreated(e) => ProductReadModel {
                product_id: e.product_id,
                sku: e.sku,
                name: e.name,
                unit: e.unit,
                category_id: e.category_id,
                image: e.image,
                active: true,
            },
            other => {
                let mut current = self
                    .products
                    .get(&product_id)
                    .ok_or_else(|| ProjectionError::UnknownRecord(product_id.to_string()))?;
                match other {
                    ProductEvent::ProductUpdated(e) => {
                        current.name = e.name;
                        current.unit = e.unit;
                        current.category_id = e.category_id;
                        current.image = e.image;
                    }
                    ProductEvent::ProductActivated(_) => current.active = true,
                    ProductEvent::ProductDeactivated(_) => current.active = false,
                    ProductEvent::ProductCreated(_) => {}
                }
                current
            }
        };
        self.products.upsert(product_id, model);
        Ok(())
    }
}

impl<CS, PS> Projection for CatalogProjection<CS, PS>
where
    CS: ReadStore<CategoryId, CategoryReadModel>,
    PS: ReadStore<ProductId, ProductReadModel>,
{
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != CATEGORY_AGGREGATE_TYPE && aggregate_type != PRODUCT_AGGREGATE_TYPE {
            return Ok(());
        }
        if !self.cursors.should_apply(envelope)? {
            return Ok(());
        }

        if aggregate_type == CATEGORY_AGGREGATE_TYPE {
            self.apply_category(envelope)?;
        } else {
            self.apply_product(envelope)?;
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn clear(&self) {
        self.categories.clear();
        self.products.clear();
        self.cursors.clear();
    }
}
