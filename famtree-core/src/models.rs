use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Opaque person identifier as stored in the dataset
pub type PersonId = String;

/// Attribute keys used by the chart's edit form
pub const ATTR_FIRST_NAME: &str = "first name";
pub const ATTR_LAST_NAME: &str = "last name";
pub const ATTR_BIRTHDAY: &str = "birthday";
pub const ATTR_DEATH_DATE: &str = "death date";
pub const ATTR_AVATAR: &str = "avatar";
pub const ATTR_GENDER: &str = "gender";

/// Recorded gender of a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Reads a gender from the raw `data.gender` value.
    /// Anything other than "M" or "F" is unknown.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("M") => Gender::Male,
            Some("F") => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    /// Dataset code for this gender, if it has one
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Gender::Male => Some("M"),
            Gender::Female => Some("F"),
            Gender::Unknown => None,
        }
    }

    /// Whether a person with this gender may fill a slot requiring `required`.
    /// Unknown genders are always eligible.
    pub fn satisfies(&self, required: Gender) -> bool {
        *self == Gender::Unknown || *self == required
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "M"),
            Gender::Female => write!(f, "F"),
            Gender::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which parent slot of a child a link fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentRole {
    Father,
    Mother,
}

impl ParentRole {
    /// The opposite parent slot
    pub fn other(&self) -> Self {
        match self {
            ParentRole::Father => ParentRole::Mother,
            ParentRole::Mother => ParentRole::Father,
        }
    }

    /// Slot a parent of the given gender takes. Only "M" maps to father.
    pub fn for_parent_gender(gender: Gender) -> Self {
        match gender {
            Gender::Male => ParentRole::Father,
            Gender::Female | Gender::Unknown => ParentRole::Mother,
        }
    }
}

impl fmt::Display for ParentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRole::Father => write!(f, "father"),
            ParentRole::Mother => write!(f, "mother"),
        }
    }
}

impl FromStr for ParentRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Role::from_str(s)? {
            Role::Father => Ok(ParentRole::Father),
            Role::Mother => Ok(ParentRole::Mother),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// What a role makes of the acting person
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// The two people become spouses
    Spouse,
    /// The target becomes the subject's parent in the given slot
    Parent(ParentRole),
    /// The subject becomes the target's parent; the slot follows the subject's gender
    Child,
}

/// Relationship being established, from the acting person's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Spouse,
    Father,
    Mother,
    Son,
    Daughter,
}

impl Role {
    /// All roles, in the order the chart offers them
    pub fn all() -> &'static [Role] {
        &[
            Role::Spouse,
            Role::Father,
            Role::Mother,
            Role::Son,
            Role::Daughter,
        ]
    }

    /// Gender a candidate must not contradict for this role
    pub fn required_gender(&self) -> Option<Gender> {
        match self {
            Role::Spouse => None,
            Role::Father | Role::Son => Some(Gender::Male),
            Role::Mother | Role::Daughter => Some(Gender::Female),
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Spouse => RoleKind::Spouse,
            Role::Father => RoleKind::Parent(ParentRole::Father),
            Role::Mother => RoleKind::Parent(ParentRole::Mother),
            Role::Son | Role::Daughter => RoleKind::Child,
        }
    }
}

impl From<ParentRole> for Role {
    fn from(value: ParentRole) -> Self {
        match value {
            ParentRole::Father => Role::Father,
            ParentRole::Mother => Role::Mother,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Spouse => write!(f, "spouse"),
            Role::Father => write!(f, "father"),
            Role::Mother => write!(f, "mother"),
            Role::Son => write!(f, "son"),
            Role::Daughter => write!(f, "daughter"),
        }
    }
}

/// Returned when a role name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown relationship role '{0}' (expected spouse, father, mother, son or daughter)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spouse" => Ok(Role::Spouse),
            "father" => Ok(Role::Father),
            "mother" => Ok(Role::Mother),
            "son" => Ok(Role::Son),
            "daughter" => Ok(Role::Daughter),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Relationship references held by one person (`rels` in the dataset)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father: Option<PersonId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother: Option<PersonId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spouses: Vec<PersonId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PersonId>,

    /// Keys this crate does not interpret (e.g. legacy `parents`), kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Relations {
    /// Gets the id held in a parent slot
    pub fn parent(&self, role: ParentRole) -> Option<&PersonId> {
        match role {
            ParentRole::Father => self.father.as_ref(),
            ParentRole::Mother => self.mother.as_ref(),
        }
    }

    fn parent_slot_mut(&mut self, role: ParentRole) -> &mut Option<PersonId> {
        match role {
            ParentRole::Father => &mut self.father,
            ParentRole::Mother => &mut self.mother,
        }
    }

    /// Sets a parent slot, returning the previous occupant
    pub fn set_parent(&mut self, role: ParentRole, id: &str) -> Option<PersonId> {
        self.parent_slot_mut(role).replace(id.to_string())
    }

    /// Clears a parent slot, returning the previous occupant
    pub fn clear_parent(&mut self, role: ParentRole) -> Option<PersonId> {
        self.parent_slot_mut(role).take()
    }

    /// Slots whose occupant is `id`
    pub fn parent_roles_of(&self, id: &str) -> Vec<ParentRole> {
        [ParentRole::Father, ParentRole::Mother]
            .into_iter()
            .filter(|role| self.parent(*role).map(String::as_str) == Some(id))
            .collect()
    }

    /// Ids listed under the legacy `parents` key, if present
    pub fn legacy_parents(&self) -> Vec<&str> {
        self.extra
            .get("parents")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Every id referenced by the typed relationship fields
    pub fn linked_ids(&self) -> Vec<&PersonId> {
        self.father
            .iter()
            .chain(self.mother.iter())
            .chain(self.spouses.iter())
            .chain(self.children.iter())
            .collect()
    }

    /// Whether any typed relationship field references `id`
    pub fn references(&self, id: &str) -> bool {
        self.linked_ids().iter().any(|linked| linked.as_str() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.linked_ids().is_empty()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One individual in the family tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Stable identifier, never reused
    pub id: PersonId,

    /// Display fields edited by the form layer (`data` in the dataset)
    #[serde(rename = "data", default)]
    pub attributes: Map<String, Value>,

    /// Relationship references (`rels` in the dataset)
    #[serde(rename = "rels", default)]
    pub relationships: Relations,

    /// Set on chart-generated stand-ins for relatives not yet specified.
    /// Serialized as `to_add` to match the chart's own marker.
    #[serde(rename = "to_add", default, skip_serializing_if = "is_false")]
    pub is_placeholder: bool,

    /// Top-level keys this crate does not interpret (e.g. `main`), kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    /// Creates a person with a generated id and no attributes
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Creates a person with a caller-provided id
    pub fn with_id(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
            relationships: Relations::default(),
            is_placeholder: false,
            extra: Map::new(),
        }
    }

    /// Creates a placeholder with a generated id
    pub fn placeholder() -> Self {
        let mut person = Self::new();
        person.is_placeholder = true;
        person
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// Builder-style gender setter
    pub fn with_gender(self, gender: Gender) -> Self {
        match gender.code() {
            Some(code) => self.with_attribute(ATTR_GENDER, code),
            None => self,
        }
    }

    /// Gets a string attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn gender(&self) -> Gender {
        Gender::from_value(self.attributes.get(ATTR_GENDER))
    }
}

impl Default for Person {
    fn default() -> Self {
        Self::new()
    }
}
