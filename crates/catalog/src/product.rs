use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocklink_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stocklink_events::Event;

use crate::CategoryId;

/// Stream type used for product envelopes.
pub const PRODUCT_AGGREGATE_TYPE: &str = "catalog.product";

/// Unit used when a product is created without one.
pub const DEFAULT_UNIT: &str = "un";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    unit: String,
    category_id: Option<CategoryId>,
    image: Option<String>,
    active: bool,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            sku: String::new(),
            name: String::new(),
            unit: DEFAULT_UNIT.to_string(),
            category_id: None,
            image: None,
            active: false,
            version: 0,
            created: false,
        }
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Only active products can be added to a cart.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
///
/// The referenced category (if any) is checked by the caller; the aggregate
/// cannot see other streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit: Option<String>,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. SKU is immutable and therefore absent.
///
/// `category_id: Some(None)` clears the category. A changed `active` flag is
/// recorded in the same append as the field edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub category_id: Option<Option<CategoryId>>,
    pub image: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    ActivateProduct(ActivateProduct),
    DeactivateProduct(DeactivateProduct),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub name: String,
    pub unit: String,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    ProductActivated(ProductActivated),
    ProductDeactivated(ProductDeactivated),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "catalog.product.created",
            ProductEvent::ProductUpdated(_) => "catalog.product.updated",
            ProductEvent::ProductActivated(_) => "catalog.product.activated",
            ProductEvent::ProductDeactivated(_) => "catalog.product.deactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
            ProductEvent::ProductDeactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.unit = e.unit.clone();
                self.category_id = e.category_id;
                self.image = e.image.clone();
                self.active = true;
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                self.name = e.name.clone();
                self.unit = e.unit.clone();
                self.category_id = e.category_id;
                self.image = e.image.clone();
            }
            ProductEvent::ProductActivated(_) => self.active = true,
            ProductEvent::ProductDeactivated(_) => self.active = false,
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::ActivateProduct(cmd) => {
                self.ensure_existing(cmd.product_id)?;
                if self.active {
                    return Err(DomainError::conflict("product is already active"));
                }
                Ok(vec![ProductEvent::ProductActivated(ProductActivated {
                    product_id: cmd.product_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ProductCommand::DeactivateProduct(cmd) => {
                self.ensure_existing(cmd.product_id)?;
                if !self.active {
                    return Err(DomainError::conflict("product is already inactive"));
                }
                Ok(vec![ProductEvent::ProductDeactivated(ProductDeactivated {
                    product_id: cmd.product_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Product {
    fn ensure_existing(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        // SKU uniqueness spans every product stream and is checked by the
        // catalog service against the read model.

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            sku: cmd.sku.trim().to_string(),
            name: cmd.name.trim().to_string(),
            unit: normalize_unit(cmd.unit.as_deref()),
            category_id: cmd.category_id,
            image: cmd.image.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.product_id)?;

        let name = match &cmd.name {
            Some(name) if name.trim().is_empty() => {
                return Err(DomainError::validation("name cannot be empty"));
            }
            Some(name) => name.trim().to_string(),
            None => self.name.clone(),
        };
        let unit = match &cmd.unit {
            Some(unit) => normalize_unit(Some(unit)),
            None => self.unit.clone(),
        };

        let mut events = vec![ProductEvent::ProductUpdated(ProductUpdated {
            product_id: cmd.product_id,
            name,
            unit,
            category_id: cmd.category_id.unwrap_or(self.category_id),
            image: cmd.image.clone().or_else(|| self.image.clone()),
            occurred_at: cmd.occurred_at,
        })];

        match cmd.active {
            Some(true) if !self.active => events.push(ProductEvent::ProductActivated(ProductActivated {
                product_id: cmd.product_id,
                occurred_at: cmd.occurred_at,
            })),
            Some(false) if self.active => {
                events.push(ProductEvent::ProductDeactivated(ProductDeactivated {
                    product_id: cmd.product_id,
                    occurred_at: cmd.occurred_at,
                }))
            }
            _ => {}
        }
        Ok(events)
    }
}

fn normalize_unit(unit: Option<&str>) -> String {
    match unit.map(str::trim) {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => DEFAULT_UNIT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn create_cmd(product_id: ProductId) -> CreateProduct {
        CreateProduct {
            product_id,
            sku: "SKU-001".to_string(),
            name: "Arroz 5kg".to_string(),
            unit: None,
            category_id: None,
            image: None,
            occurred_at: Utc::now(),
        }
    }

    fn created(product_id: ProductId) -> Product {
        let mut product = Product::empty(product_id);
        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(product_id)))
            .unwrap();
        product.apply(&events[0]);
        product
    }

    #[test]
    fn create_product_defaults_unit_and_is_active() {
        let product = created(test_product_id());
        assert_eq!(product.unit(), DEFAULT_UNIT);
        assert_eq!(product.sku(), "SKU-001");
        assert!(product.is_active());
    }

    #[test]
    fn create_product_rejects_empty_sku() {
        let id = test_product_id();
        let mut cmd = create_cmd(id);
        cmd.sku = "   ".to_string();

        let err = Product::empty(id)
            .handle(&ProductCommand::CreateProduct(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_duplicate_creation() {
        let id = test_product_id();
        let product = created(id);
        let err = product
            .handle(&ProductCommand::CreateProduct(create_cmd(id)))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn update_changes_editable_fields_only() {
        let id = test_product_id();
        let mut product = created(id);
        let category = CategoryId::new(AggregateId::new());

        let events = product
            .handle(&ProductCommand::UpdateProduct(UpdateProduct {
                product_id: id,
                name: Some("Arroz 1kg".to_string()),
                unit: Some("pct".to_string()),
                category_id: Some(Some(category)),
                image: None,
                active: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        product.apply(&events[0]);

        assert_eq!(product.name(), "Arroz 1kg");
        assert_eq!(product.unit(), "pct");
        assert_eq!(product.category_id(), Some(category));
        assert_eq!(product.sku(), "SKU-001");
    }

    #[test]
    fn update_with_deactivation_is_a_single_decision() {
        let id = test_product_id();
        let mut product = created(id);
        let update = |name: &str, active| {
            ProductCommand::UpdateProduct(UpdateProduct {
                product_id: id,
                name: Some(name.to_string()),
                unit: None,
                category_id: None,
                image: None,
                active: Some(active),
                occurred_at: Utc::now(),
            })
        };

        // A rejected field edit also drops the availability change.
        let err = product.handle(&update("", false)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(product.is_active());

        let cmd = update("Arroz 2kg", false);
        let events = product.handle(&cmd).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ProductEvent::ProductDeactivated(_)));
        for e in &events {
            product.apply(e);
        }
        assert!(!product.is_active());
        assert_eq!(product.name(), "Arroz 2kg");

        // Unchanged flag adds nothing.
        let events = product.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn deactivate_then_activate_round_trips_active_flag() {
        let id = test_product_id();
        let mut product = created(id);

        let events = product
            .handle(&ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id: id,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        product.apply(&events[0]);
        assert!(!product.is_active());

        let err = product
            .handle(&ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id: id,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let events = product
            .handle(&ProductCommand::ActivateProduct(ActivateProduct {
                product_id: id,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        product.apply(&events[0]);
        assert!(product.is_active());
        assert_eq!(product.version(), 3);
    }

    proptest! {
        #[test]
        fn blank_units_fall_back_to_default(unit in "[ \t]{0,4}") {
            prop_assert_eq!(normalize_unit(Some(&unit)), DEFAULT_UNIT);
        }
    }
}
