use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocklink_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stocklink_events::Event;

/// Stream type used for category envelopes.
pub const CATEGORY_AGGREGATE_TYPE: &str = "catalog.category";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub AggregateId);

impl CategoryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Category.
///
/// Name uniqueness is a store-wide rule; the catalog service checks it against
/// the read model before dispatching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    id: CategoryId,
    name: String,
    image: Option<String>,
    active: bool,
    version: u64,
    created: bool,
}

impl Category {
    pub fn empty(id: CategoryId) -> Self {
        Self {
            id,
            name: String::new(),
            image: None,
            active: false,
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl AggregateRoot for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategory {
    pub category_id: CategoryId,
    pub name: String,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub category_id: CategoryId,
    pub name: Option<String>,
    pub image: Option<String>,
    pub active: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryCommand {
    CreateCategory(CreateCategory),
    UpdateCategory(UpdateCategory),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCreated {
    pub category_id: CategoryId,
    pub name: String,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Full post-update state, so projections never merge partial patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdated {
    pub category_id: CategoryId,
    pub name: String,
    pub image: Option<String>,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEvent {
    CategoryCreated(CategoryCreated),
    CategoryUpdated(CategoryUpdated),
}

impl Event for CategoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CategoryEvent::CategoryCreated(_) => "catalog.category.created",
            CategoryEvent::CategoryUpdated(_) => "catalog.category.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CategoryEvent::CategoryCreated(e) => e.occurred_at,
            CategoryEvent::CategoryUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Category {
    type Command = CategoryCommand;
    type Event = CategoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CategoryEvent::CategoryCreated(e) => {
                self.id = e.category_id;
                self.name = e.name.clone();
                self.image = e.image.clone();
                self.active = true;
                self.created = true;
            }
            CategoryEvent::CategoryUpdated(e) => {
                self.name = e.name.clone();
                self.image = e.image.clone();
                self.active = e.active;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CategoryCommand::CreateCategory(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("category already exists"));
                }
                let name = normalize_name(&cmd.name)?;

                Ok(vec![CategoryEvent::CategoryCreated(CategoryCreated {
                    category_id: cmd.category_id,
                    name,
                    image: cmd.image.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            CategoryCommand::UpdateCategory(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.id != cmd.category_id {
                    return Err(DomainError::invariant("category_id mismatch"));
                }
                let name = match &cmd.name {
                    Some(name) => normalize_name(name)?,
                    None => self.name.clone(),
                };

                Ok(vec![CategoryEvent::CategoryUpdated(CategoryUpdated {
                    category_id: cmd.category_id,
                    name,
                    image: cmd.image.clone().or_else(|| self.image.clone()),
                    active: cmd.active.unwrap_or(self.active),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

fn normalize_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("category name cannot be empty"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: CategoryId) -> Category {
        let mut category = Category::empty(id);
        let events = category
            .handle(&CategoryCommand::CreateCategory(CreateCategory {
                category_id: id,
                name: "  Bebidas ".to_string(),
                image: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        category.apply(&events[0]);
        category
    }

    #[test]
    fn create_trims_name_and_starts_active() {
        let category = created(CategoryId::new(AggregateId::new()));
        assert_eq!(category.name(), "Bebidas");
        assert!(category.is_active());
        assert_eq!(category.version(), 1);
    }

    #[test]
    fn blank_name_is_rejected() {
        let id = CategoryId::new(AggregateId::new());
        let err = Category::empty(id)
            .handle(&CategoryCommand::CreateCategory(CreateCategory {
                category_id: id,
                name: "   ".to_string(),
                image: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let id = CategoryId::new(AggregateId::new());
        let mut category = created(id);

        let events = category
            .handle(&CategoryCommand::UpdateCategory(UpdateCategory {
                category_id: id,
                name: None,
                image: Some("https://cdn.example/bebidas.png".to_string()),
                active: Some(false),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        category.apply(&events[0]);

        assert_eq!(category.name(), "Bebidas");
        assert_eq!(category.image(), Some("https://cdn.example/bebidas.png"));
        assert!(!category.is_active());
    }

    #[test]
    fn update_of_missing_category_is_not_found() {
        let id = CategoryId::new(AggregateId::new());
        let err = Category::empty(id)
            .handle(&CategoryCommand::UpdateCategory(UpdateCategory {
                category_id: id,
                name: Some("X".to_string()),
                image: None,
                active: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
