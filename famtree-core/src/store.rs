//! Relationship store
//!
//! Canonical in-memory collection of people for one editing session. Every
//! primitive validates all of its preconditions before its first write, so a
//! failed call leaves the store untouched.

use log::debug;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::models::{ParentRole, Person, PersonId};

/// Errors raised by store primitives
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Person not found: {id}")]
    NotFound { id: PersonId },

    #[error("Cannot link person {id} to itself")]
    SelfLink { id: PersonId },

    #[error("Duplicate person id: {id}")]
    DuplicateId { id: PersonId },

    #[error("Person {id} is still linked to {}", .linked_to.join(", "))]
    StillReferenced { id: PersonId, linked_to: Vec<PersonId> },

    #[error("Invalid dataset JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// A broken referential invariant found by [`RelationshipStore::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `spouse_id` is in `person_id`'s spouses but not the other way round
    AsymmetricSpouse {
        person_id: PersonId,
        spouse_id: PersonId,
    },
    /// Child points at parent, but parent does not list the child
    MissingChildEntry {
        parent_id: PersonId,
        child_id: PersonId,
        role: ParentRole,
    },
    /// Parent lists a child whose father/mother is someone else
    UnclaimedChild {
        parent_id: PersonId,
        child_id: PersonId,
    },
    /// One person fills both the father and mother slot
    SameParentTwice {
        child_id: PersonId,
        parent_id: PersonId,
    },
    /// A person references itself
    SelfReference { id: PersonId },
    /// A reference to an id that is not in the store
    DanglingReference {
        person_id: PersonId,
        missing_id: PersonId,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::AsymmetricSpouse {
                person_id,
                spouse_id,
            } => write!(
                f,
                "{} lists spouse {} but {} does not list {}",
                person_id, spouse_id, spouse_id, person_id
            ),
            InvariantViolation::MissingChildEntry {
                parent_id,
                child_id,
                role,
            } => write!(
                f,
                "{} has {} {} but is missing from its children",
                child_id, role, parent_id
            ),
            InvariantViolation::UnclaimedChild {
                parent_id,
                child_id,
            } => write!(
                f,
                "{} lists child {} whose father/mother is someone else",
                parent_id, child_id
            ),
            InvariantViolation::SameParentTwice {
                child_id,
                parent_id,
            } => write!(f, "{} is both father and mother of {}", parent_id, child_id),
            InvariantViolation::SelfReference { id } => {
                write!(f, "{} references itself", id)
            }
            InvariantViolation::DanglingReference {
                person_id,
                missing_id,
            } => write!(f, "{} references unknown person {}", person_id, missing_id),
        }
    }
}

/// Ordered collection of people, unique by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipStore {
    people: Vec<Person>,
}

impl RelationshipStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self { people: Vec::new() }
    }

    /// Builds a store from a person collection, rejecting duplicate ids
    pub fn from_people(people: Vec<Person>) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        for person in &people {
            if !seen.insert(person.id.as_str()) {
                return Err(StoreError::DuplicateId {
                    id: person.id.clone(),
                });
            }
        }
        Ok(Self { people })
    }

    /// All people in store order
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// Owned copy of the full collection, for rendering and publishing
    pub fn snapshot(&self) -> Vec<Person> {
        self.people.clone()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Appends a person
    pub fn add_person(&mut self, person: Person) -> Result<(), StoreError> {
        if self.contains(&person.id) {
            return Err(StoreError::DuplicateId { id: person.id });
        }
        debug!("event=person_added id={} placeholder={}", person.id, person.is_placeholder);
        self.people.push(person);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.people.iter().any(|p| p.id == id)
    }

    /// Gets a person by id
    pub fn find_by_id(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Gets a person by id, failing with `NotFound`
    pub fn get(&self, id: &str) -> Result<&Person, StoreError> {
        self.find_by_id(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.people
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Ids of every person whose spouses include `id`
    pub fn spouses_of(&self, id: &str) -> Vec<PersonId> {
        self.people
            .iter()
            .filter(|p| p.relationships.spouses.iter().any(|s| s == id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Links two people as spouses. Idempotent.
    pub fn link_spouses(&mut self, a_id: &str, b_id: &str) -> Result<(), StoreError> {
        if a_id == b_id {
            return Err(StoreError::SelfLink {
                id: a_id.to_string(),
            });
        }
        let a = self.position(a_id)?;
        let b = self.position(b_id)?;

        push_unique(&mut self.people[a].relationships.spouses, b_id);
        push_unique(&mut self.people[b].relationships.spouses, a_id);

        debug!("event=spouses_linked a={} b={}", a_id, b_id);
        Ok(())
    }

    /// Sets `child`'s parent slot to `parent` and registers the child under the
    /// parent. A previous different occupant of the slot loses the child from
    /// its children. Overwrite policy belongs to the caller.
    pub fn link_parent_child(
        &mut self,
        parent_id: &str,
        child_id: &str,
        role: ParentRole,
    ) -> Result<(), StoreError> {
        if parent_id == child_id {
            return Err(StoreError::SelfLink {
                id: parent_id.to_string(),
            });
        }
        let parent = self.position(parent_id)?;
        let child = self.position(child_id)?;

        let previous = self.people[child]
            .relationships
            .set_parent(role, parent_id);
        if let Some(previous_id) = previous.filter(|prev| prev != parent_id) {
            self.drop_child_entry_if_unclaimed(&previous_id, child);
        }
        push_unique(&mut self.people[parent].relationships.children, child_id);

        debug!(
            "event=parent_linked parent={} child={} role={}",
            parent_id, child_id, role
        );
        Ok(())
    }

    /// Removes a spouse link in both directions. Idempotent.
    pub fn unlink_spouse(&mut self, a_id: &str, b_id: &str) -> Result<(), StoreError> {
        let a = self.position(a_id)?;
        let b = self.position(b_id)?;

        self.people[a].relationships.spouses.retain(|s| s != b_id);
        self.people[b].relationships.spouses.retain(|s| s != a_id);

        debug!("event=spouses_unlinked a={} b={}", a_id, b_id);
        Ok(())
    }

    /// Clears a child's parent slot and removes the child from that parent's
    /// children. Idempotent.
    pub fn unlink_parent(&mut self, child_id: &str, role: ParentRole) -> Result<(), StoreError> {
        let child = self.position(child_id)?;

        if let Some(parent_id) = self.people[child].relationships.clear_parent(role) {
            self.drop_child_entry_if_unclaimed(&parent_id, child);
            debug!(
                "event=parent_unlinked parent={} child={} role={}",
                parent_id, child_id, role
            );
        }
        Ok(())
    }

    /// Removes `child` from `parent`'s children and clears whichever of the
    /// child's parent slots points at `parent`. Idempotent.
    pub fn remove_from_children(
        &mut self,
        parent_id: &str,
        child_id: &str,
    ) -> Result<(), StoreError> {
        let parent = self.position(parent_id)?;
        let child = self.position(child_id)?;

        self.people[parent]
            .relationships
            .children
            .retain(|c| c != child_id);
        let roles = self.people[child].relationships.parent_roles_of(parent_id);
        for role in roles {
            self.people[child].relationships.clear_parent(role);
        }

        debug!("event=child_removed parent={} child={}", parent_id, child_id);
        Ok(())
    }

    /// Removes a person record. Does not cascade: fails with
    /// `StillReferenced` unless every link to and from the person is gone.
    pub fn delete_person(&mut self, id: &str) -> Result<Person, StoreError> {
        let index = self.position(id)?;

        let mut linked_to: Vec<PersonId> = Vec::new();
        for linked in self.people[index].relationships.linked_ids() {
            if !linked_to.contains(linked) {
                linked_to.push(linked.clone());
            }
        }
        for person in &self.people {
            if person.id != id
                && person.relationships.references(id)
                && !linked_to.contains(&person.id)
            {
                linked_to.push(person.id.clone());
            }
        }
        if !linked_to.is_empty() {
            return Err(StoreError::StillReferenced {
                id: id.to_string(),
                linked_to,
            });
        }

        debug!("event=person_deleted id={}", id);
        Ok(self.people.remove(index))
    }

    /// Checks the referential invariants across the whole store
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for person in &self.people {
            let rels = &person.relationships;

            if rels.references(&person.id) {
                violations.push(InvariantViolation::SelfReference {
                    id: person.id.clone(),
                });
            }

            for linked in rels.linked_ids() {
                if linked != &person.id && !self.contains(linked) {
                    violations.push(InvariantViolation::DanglingReference {
                        person_id: person.id.clone(),
                        missing_id: linked.clone(),
                    });
                }
            }

            for spouse_id in &rels.spouses {
                if let Some(spouse) = self.find_by_id(spouse_id) {
                    if spouse.id != person.id
                        && !spouse.relationships.spouses.contains(&person.id)
                    {
                        violations.push(InvariantViolation::AsymmetricSpouse {
                            person_id: person.id.clone(),
                            spouse_id: spouse_id.clone(),
                        });
                    }
                }
            }

            if let (Some(father), Some(mother)) = (&rels.father, &rels.mother) {
                if father == mother {
                    violations.push(InvariantViolation::SameParentTwice {
                        child_id: person.id.clone(),
                        parent_id: father.clone(),
                    });
                }
            }

            for role in [ParentRole::Father, ParentRole::Mother] {
                if let Some(parent) = rels.parent(role).and_then(|id| self.find_by_id(id)) {
                    if parent.id != person.id
                        && !parent.relationships.children.contains(&person.id)
                    {
                        violations.push(InvariantViolation::MissingChildEntry {
                            parent_id: parent.id.clone(),
                            child_id: person.id.clone(),
                            role,
                        });
                    }
                }
            }

            for child_id in &rels.children {
                if let Some(child) = self.find_by_id(child_id) {
                    if child.id != person.id
                        && child.relationships.parent_roles_of(&person.id).is_empty()
                    {
                        violations.push(InvariantViolation::UnclaimedChild {
                            parent_id: person.id.clone(),
                            child_id: child_id.clone(),
                        });
                    }
                }
            }
        }

        violations
    }

    fn drop_child_entry_if_unclaimed(&mut self, parent_id: &str, child: usize) {
        if !self.people[child]
            .relationships
            .parent_roles_of(parent_id)
            .is_empty()
        {
            return;
        }
        let child_id = self.people[child].id.clone();
        if let Some(parent) = self.people.iter_mut().find(|p| p.id == parent_id) {
            parent.relationships.children.retain(|c| *c != child_id);
        }
    }
}

fn push_unique(ids: &mut Vec<PersonId>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}
