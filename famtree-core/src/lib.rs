//! Core library for family tree editing.
//!
//! Holds the relationship store, the link resolution engine that mutates it,
//! and the dataset JSON format. No file or network I/O happens here.

pub mod engine;
pub mod format;
pub mod models;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use engine::{EngineError, LinkEngine, MigrationStep};
pub use format::{parse_dataset, to_json_pretty};
pub use models::{
    Gender, ParentRole, Person, PersonId, Relations, Role, RoleKind, UnknownRole, ATTR_AVATAR,
    ATTR_BIRTHDAY, ATTR_DEATH_DATE, ATTR_FIRST_NAME, ATTR_GENDER, ATTR_LAST_NAME,
};
pub use search::{children_by_birthday, display_label, filter_by_name};
pub use store::{InvariantViolation, RelationshipStore, StoreError};
