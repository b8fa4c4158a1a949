//! Link resolution engine
//!
//! Implements the two user-facing workflows on top of [`RelationshipStore`]:
//! linking a person to an existing person for a role, and resolving a
//! chart-generated placeholder into an existing person.
//!
//! Every mutating method takes `&mut self`, so nothing can interleave with
//! a running workflow. Preconditions are checked before the first write.

use log::{info, warn};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::models::{ParentRole, Person, PersonId, Role, RoleKind};
use crate::store::{RelationshipStore, StoreError};

/// Step of placeholder resolution that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// Detach the placeholder's spouses and bond them to the selected person
    TransferSpouse,
    /// Clear the child's slot pointing at the placeholder
    ClearParentSlot,
    /// Link the selected person as the child's parent
    LinkParent,
    /// Delete the placeholder record
    RemovePlaceholder,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::TransferSpouse => write!(f, "transfer spouse"),
            MigrationStep::ClearParentSlot => write!(f, "clear parent slot"),
            MigrationStep::LinkParent => write!(f, "link parent"),
            MigrationStep::RemovePlaceholder => write!(f, "remove placeholder"),
        }
    }
}

/// Errors returned by engine workflows
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Person not found: {id}")]
    NotFound { id: PersonId },

    #[error("Cannot link person {id} to itself")]
    SelfLink { id: PersonId },

    #[error("{child_id} already has a {role}: {existing_parent_id}")]
    DuplicateParent {
        child_id: PersonId,
        role: ParentRole,
        existing_parent_id: PersonId,
    },

    #[error("Placeholder {placeholder_id} was not resolved: {step} failed: {source}")]
    IncompleteMigration {
        placeholder_id: PersonId,
        step: MigrationStep,
        #[source]
        source: StoreError,
    },

    #[error("Person {id} is not a placeholder")]
    NotAPlaceholder { id: PersonId },

    #[error("{child_id}'s {role} is not placeholder {placeholder_id}")]
    SlotMismatch {
        child_id: PersonId,
        role: ParentRole,
        placeholder_id: PersonId,
    },

    #[error("Person {id} is a placeholder and cannot be linked")]
    PlaceholderTarget { id: PersonId },

    #[error("{parent_id} is already a parent of {child_id}")]
    AlreadyRelated {
        child_id: PersonId,
        parent_id: PersonId,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { id } => Self::NotFound { id },
            StoreError::SelfLink { id } => Self::SelfLink { id },
            other => Self::Store(other),
        }
    }
}

/// Workflow facade owning the store for one editing session
#[derive(Debug, Clone, Default)]
pub struct LinkEngine {
    store: RelationshipStore,
}

impl LinkEngine {
    /// Creates an engine over a store
    pub fn new(store: RelationshipStore) -> Self {
        Self { store }
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &RelationshipStore {
        &self.store
    }

    /// Owned copy of the full person collection
    pub fn snapshot(&self) -> Vec<Person> {
        self.store.snapshot()
    }

    /// Ids already directly related to `id`, plus `id` itself.
    /// Always computed from the current store contents.
    pub fn related_ids(&self, id: &str) -> Result<HashSet<PersonId>, EngineError> {
        let person = self.store.get(id)?;
        let rels = &person.relationships;

        let mut related: HashSet<PersonId> = HashSet::new();
        related.insert(person.id.clone());
        related.extend(rels.linked_ids().into_iter().cloned());
        related.extend(rels.legacy_parents().into_iter().map(str::to_string));
        Ok(related)
    }

    /// People eligible to fill `role` for `subject_id`, in store order.
    ///
    /// Excludes the subject, everyone already related to it, placeholders,
    /// and anyone whose recorded gender contradicts the role.
    pub fn eligible_candidates(
        &self,
        subject_id: &str,
        role: Role,
    ) -> Result<Vec<&Person>, EngineError> {
        let excluded = self.related_ids(subject_id)?;
        let required = role.required_gender();

        Ok(self
            .store
            .people()
            .iter()
            .filter(|p| !excluded.contains(&p.id))
            .filter(|p| !p.is_placeholder)
            .filter(|p| required.map_or(true, |gender| p.gender().satisfies(gender)))
            .collect())
    }

    /// Links `subject_id` to an existing person for `role`.
    pub fn link_existing(
        &mut self,
        subject_id: &str,
        target_id: &str,
        role: Role,
    ) -> Result<&[Person], EngineError> {
        if let Err(err) = self.check_link_existing(subject_id, target_id, role) {
            warn!(
                "event=link_refused subject={} target={} role={} reason=\"{}\"",
                subject_id, target_id, role, err
            );
            return Err(err);
        }

        match role.kind() {
            RoleKind::Spouse => self.store.link_spouses(subject_id, target_id)?,
            RoleKind::Parent(parent_role) => {
                self.store
                    .link_parent_child(target_id, subject_id, parent_role)?
            }
            RoleKind::Child => {
                let parent_role = self.child_slot_for(subject_id)?;
                self.store
                    .link_parent_child(subject_id, target_id, parent_role)?
            }
        }

        info!(
            "event=link_existing status=ok subject={} target={} role={}",
            subject_id, target_id, role
        );
        Ok(self.store.people())
    }

    /// Replaces placeholder `placeholder_id`, sitting in `child_id`'s `role`
    /// slot, with the existing person `selected_id`.
    ///
    /// Runs in order: transfer the placeholder's spouses to the selected
    /// person, clear the child's slot, link the selected person as parent
    /// (moving any other children of the placeholder along), then delete the
    /// placeholder. On failure the store is restored to its state before the
    /// call and the placeholder is kept.
    pub fn resolve_placeholder(
        &mut self,
        child_id: &str,
        placeholder_id: &str,
        role: ParentRole,
        selected_id: &str,
    ) -> Result<&[Person], EngineError> {
        if let Err(err) = self.check_resolve(child_id, placeholder_id, role, selected_id) {
            warn!(
                "event=resolve_refused child={} placeholder={} role={} selected={} reason=\"{}\"",
                child_id, placeholder_id, role, selected_id, err
            );
            return Err(err);
        }

        let checkpoint = self.store.clone();
        let outcome = self
            .migrate_placeholder(child_id, placeholder_id, role, selected_id)
            .and_then(|()| {
                self.store
                    .delete_person(placeholder_id)
                    .map(|_| ())
                    .map_err(|err| (MigrationStep::RemovePlaceholder, err))
            });

        if let Err((step, source)) = outcome {
            self.store = checkpoint;
            warn!(
                "event=resolve_rolled_back placeholder={} step=\"{}\" reason=\"{}\"",
                placeholder_id, step, source
            );
            return Err(EngineError::IncompleteMigration {
                placeholder_id: placeholder_id.to_string(),
                step,
                source,
            });
        }

        info!(
            "event=resolve_placeholder status=ok child={} placeholder={} role={} selected={}",
            child_id, placeholder_id, role, selected_id
        );
        Ok(self.store.people())
    }

    fn check_link_existing(
        &self,
        subject_id: &str,
        target_id: &str,
        role: Role,
    ) -> Result<(), EngineError> {
        if subject_id == target_id {
            return Err(EngineError::SelfLink {
                id: subject_id.to_string(),
            });
        }
        let subject = self.store.get(subject_id)?;
        let target = self.store.get(target_id)?;
        if target.is_placeholder {
            return Err(EngineError::PlaceholderTarget {
                id: target_id.to_string(),
            });
        }

        match role.kind() {
            RoleKind::Spouse => Ok(()),
            RoleKind::Parent(parent_role) => check_parent_slot(subject, target, parent_role),
            RoleKind::Child => {
                let parent_role = ParentRole::for_parent_gender(subject.gender());
                check_parent_slot(target, subject, parent_role)
            }
        }
    }

    fn check_resolve(
        &self,
        child_id: &str,
        placeholder_id: &str,
        role: ParentRole,
        selected_id: &str,
    ) -> Result<(), EngineError> {
        let child = self.store.get(child_id)?;
        let placeholder = self.store.get(placeholder_id)?;
        let selected = self.store.get(selected_id)?;

        if child_id == selected_id {
            return Err(EngineError::SelfLink {
                id: child_id.to_string(),
            });
        }
        if !placeholder.is_placeholder {
            return Err(EngineError::NotAPlaceholder {
                id: placeholder_id.to_string(),
            });
        }
        if child.relationships.parent(role).map(String::as_str) != Some(placeholder_id) {
            return Err(EngineError::SlotMismatch {
                child_id: child_id.to_string(),
                role,
                placeholder_id: placeholder_id.to_string(),
            });
        }
        if selected.is_placeholder {
            return Err(EngineError::PlaceholderTarget {
                id: selected_id.to_string(),
            });
        }
        if child.relationships.parent(role.other()).map(String::as_str) == Some(selected_id) {
            return Err(EngineError::AlreadyRelated {
                child_id: child_id.to_string(),
                parent_id: selected_id.to_string(),
            });
        }

        // The placeholder's other children move to the selected person too
        for (sibling_id, sibling_role) in self.children_held_by(placeholder_id) {
            let sibling = self.store.get(&sibling_id)?;
            if sibling.relationships.parent(sibling_role.other()).map(String::as_str)
                == Some(selected_id)
            {
                return Err(EngineError::AlreadyRelated {
                    child_id: sibling_id,
                    parent_id: selected_id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn migrate_placeholder(
        &mut self,
        child_id: &str,
        placeholder_id: &str,
        role: ParentRole,
        selected_id: &str,
    ) -> Result<(), (MigrationStep, StoreError)> {
        // A placeholder with no recorded spouse skips straight to the slot.
        for spouse_id in self.store.spouses_of(placeholder_id) {
            self.store
                .unlink_spouse(&spouse_id, placeholder_id)
                .and_then(|()| self.store.link_spouses(&spouse_id, selected_id))
                .map_err(|err| (MigrationStep::TransferSpouse, err))?;
        }

        self.store
            .unlink_parent(child_id, role)
            .map_err(|err| (MigrationStep::ClearParentSlot, err))?;

        self.store
            .link_parent_child(selected_id, child_id, role)
            .map_err(|err| (MigrationStep::LinkParent, err))?;

        for (sibling_id, sibling_role) in self.children_held_by(placeholder_id) {
            self.store
                .unlink_parent(&sibling_id, sibling_role)
                .and_then(|()| {
                    self.store
                        .link_parent_child(selected_id, &sibling_id, sibling_role)
                })
                .map_err(|err| (MigrationStep::LinkParent, err))?;
        }

        Ok(())
    }

    /// Children (and the slot they use) whose parent is `parent_id`
    fn children_held_by(&self, parent_id: &str) -> Vec<(PersonId, ParentRole)> {
        self.store
            .people()
            .iter()
            .flat_map(|p| {
                p.relationships
                    .parent_roles_of(parent_id)
                    .into_iter()
                    .map(|role| (p.id.clone(), role))
            })
            .collect()
    }

    fn child_slot_for(&self, parent_id: &str) -> Result<ParentRole, EngineError> {
        let parent = self.store.get(parent_id)?;
        Ok(ParentRole::for_parent_gender(parent.gender()))
    }
}

/// Refuses to fill `child`'s `role` slot with `parent` when it would
/// overwrite an existing parent or make one person both father and mother.
fn check_parent_slot(
    child: &Person,
    parent: &Person,
    role: ParentRole,
) -> Result<(), EngineError> {
    if let Some(existing) = child.relationships.parent(role) {
        return Err(EngineError::DuplicateParent {
            child_id: child.id.clone(),
            role,
            existing_parent_id: existing.clone(),
        });
    }
    if child.relationships.parent(role.other()) == Some(&parent.id) {
        return Err(EngineError::AlreadyRelated {
            child_id: child.id.clone(),
            parent_id: parent.id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{parse_dataset, to_json_pretty};
    use crate::models::{Gender, ATTR_FIRST_NAME};

    fn person(id: &str, gender: Gender) -> Person {
        Person::with_id(id).with_gender(gender)
    }

    fn placeholder(id: &str) -> Person {
        let mut p = Person::with_id(id);
        p.is_placeholder = true;
        p
    }

    fn engine_with(people: Vec<Person>) -> LinkEngine {
        LinkEngine::new(RelationshipStore::from_people(people).unwrap())
    }

    fn rels<'a>(engine: &'a LinkEngine, id: &str) -> &'a crate::models::Relations {
        &engine.store().find_by_id(id).unwrap().relationships
    }

    fn candidate_ids(engine: &LinkEngine, subject: &str, role: Role) -> Vec<String> {
        engine
            .eligible_candidates(subject, role)
            .unwrap()
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    /// Child C whose father is placeholder P; P is married to the mother M.
    /// D is an unrelated man.
    fn placeholder_family() -> LinkEngine {
        let mut engine = engine_with(vec![
            person("C", Gender::Female),
            placeholder("P"),
            person("M", Gender::Female),
            person("D", Gender::Male),
        ]);
        let store = &mut engine.store;
        store.link_parent_child("P", "C", ParentRole::Father).unwrap();
        store.link_parent_child("M", "C", ParentRole::Mother).unwrap();
        store.link_spouses("M", "P").unwrap();
        engine
    }

    #[test]
    fn test_link_existing_spouse() {
        let mut engine = engine_with(vec![person("a", Gender::Male), person("b", Gender::Female)]);

        engine.link_existing("a", "b", Role::Spouse).unwrap();

        assert_eq!(rels(&engine, "a").spouses, vec!["b".to_string()]);
        assert_eq!(rels(&engine, "b").spouses, vec!["a".to_string()]);
    }

    #[test]
    fn test_link_existing_father_sets_parent_and_children() {
        let mut engine = engine_with(vec![person("kid", Gender::Male), person("dad", Gender::Male)]);

        let people = engine.link_existing("kid", "dad", Role::Father).unwrap();
        assert_eq!(people.len(), 2);

        assert_eq!(rels(&engine, "kid").father.as_deref(), Some("dad"));
        assert_eq!(rels(&engine, "dad").children, vec!["kid".to_string()]);
        assert!(engine.store().validate().is_empty());
    }

    #[test]
    fn test_link_existing_son_uses_subject_gender() {
        let mut engine = engine_with(vec![
            person("mom", Gender::Female),
            person("dad", Gender::Male),
            person("kid", Gender::Male),
            person("kid2", Gender::Female),
        ]);

        engine.link_existing("mom", "kid", Role::Son).unwrap();
        engine.link_existing("dad", "kid2", Role::Daughter).unwrap();

        assert_eq!(rels(&engine, "kid").mother.as_deref(), Some("mom"));
        assert!(rels(&engine, "kid").father.is_none());
        assert_eq!(rels(&engine, "kid2").father.as_deref(), Some("dad"));
        assert_eq!(rels(&engine, "mom").children, vec!["kid".to_string()]);
    }

    #[test]
    fn test_link_existing_child_with_unknown_gender_parent_becomes_mother() {
        let mut engine = engine_with(vec![Person::with_id("parent"), person("kid", Gender::Male)]);

        engine.link_existing("parent", "kid", Role::Son).unwrap();

        assert_eq!(rels(&engine, "kid").mother.as_deref(), Some("parent"));
    }

    #[test]
    fn test_link_existing_self_link_rejected() {
        let mut engine = engine_with(vec![person("x", Gender::Male)]);
        let before = engine.snapshot();

        for role in Role::all() {
            let result = engine.link_existing("x", "x", *role);
            assert!(matches!(result, Err(EngineError::SelfLink { ref id }) if id == "x"));
        }
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_link_existing_duplicate_father_rejected() {
        let mut engine = engine_with(vec![
            person("kid", Gender::Male),
            person("dad", Gender::Male),
            person("other", Gender::Male),
        ]);
        engine.link_existing("kid", "dad", Role::Father).unwrap();
        let before = to_json_pretty(engine.store()).unwrap();

        let result = engine.link_existing("kid", "other", Role::Father);

        assert!(matches!(
            result,
            Err(EngineError::DuplicateParent {
                ref child_id,
                role: ParentRole::Father,
                ref existing_parent_id,
            })
                if child_id == "kid" && existing_parent_id == "dad"
        ));
        assert_eq!(to_json_pretty(engine.store()).unwrap(), before);
    }

    #[test]
    fn test_link_existing_son_refuses_to_overwrite_parent() {
        let mut engine = engine_with(vec![
            person("dad1", Gender::Male),
            person("dad2", Gender::Male),
            person("kid", Gender::Male),
        ]);
        engine.link_existing("dad1", "kid", Role::Son).unwrap();
        let before = engine.snapshot();

        let result = engine.link_existing("dad2", "kid", Role::Son);

        assert!(matches!(result, Err(EngineError::DuplicateParent { .. })));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_link_existing_rejects_same_person_as_both_parents() {
        let mut engine = engine_with(vec![person("kid", Gender::Male), Person::with_id("p")]);
        engine.link_existing("kid", "p", Role::Mother).unwrap();

        let result = engine.link_existing("kid", "p", Role::Father);

        assert!(matches!(result, Err(EngineError::AlreadyRelated { .. })));
        assert!(rels(&engine, "kid").father.is_none());
    }

    #[test]
    fn test_link_existing_son_names_child_and_parent_when_already_related() {
        let mut engine = engine_with(vec![person("kid", Gender::Male), person("p", Gender::Male)]);
        engine.link_existing("kid", "p", Role::Mother).unwrap();
        let before = engine.snapshot();

        let result = engine.link_existing("p", "kid", Role::Son);

        assert!(matches!(
            result,
            Err(EngineError::AlreadyRelated { ref child_id, ref parent_id })
                if child_id == "kid" && parent_id == "p"
        ));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_link_existing_missing_person() {
        let mut engine = engine_with(vec![person("a", Gender::Male)]);

        let result = engine.link_existing("a", "ghost", Role::Spouse);

        assert!(matches!(result, Err(EngineError::NotFound { ref id }) if id == "ghost"));
        assert!(rels(&engine, "a").is_empty());
    }

    #[test]
    fn test_link_existing_rejects_placeholder_target() {
        let mut engine = engine_with(vec![person("a", Gender::Male), placeholder("p")]);

        let result = engine.link_existing("a", "p", Role::Spouse);

        assert!(matches!(result, Err(EngineError::PlaceholderTarget { .. })));
    }

    #[test]
    fn test_candidates_exclude_subject_and_relatives() {
        let mut engine = engine_with(vec![
            person("me", Gender::Male),
            person("wife", Gender::Female),
            person("kid", Gender::Male),
            person("mom", Gender::Female),
            person("stranger", Gender::Female),
        ]);
        engine.link_existing("me", "wife", Role::Spouse).unwrap();
        engine.link_existing("me", "kid", Role::Son).unwrap();
        engine.link_existing("me", "mom", Role::Mother).unwrap();

        assert_eq!(candidate_ids(&engine, "me", Role::Spouse), vec!["stranger"]);
    }

    #[test]
    fn test_candidates_are_recomputed_after_mutation() {
        let mut engine = engine_with(vec![person("a", Gender::Male), person("b", Gender::Female)]);
        assert_eq!(candidate_ids(&engine, "a", Role::Spouse), vec!["b"]);

        engine.link_existing("a", "b", Role::Spouse).unwrap();

        assert!(candidate_ids(&engine, "a", Role::Spouse).is_empty());
    }

    #[test]
    fn test_candidates_filter_by_gender() {
        let engine = engine_with(vec![
            person("me", Gender::Male),
            person("man", Gender::Male),
            person("woman", Gender::Female),
            Person::with_id("unknown"),
            Person::with_id("odd").with_attribute("gender", "X"),
            placeholder("ph"),
        ]);

        assert_eq!(
            candidate_ids(&engine, "me", Role::Father),
            vec!["man", "unknown", "odd"]
        );
        assert_eq!(
            candidate_ids(&engine, "me", Role::Daughter),
            vec!["woman", "unknown", "odd"]
        );
        assert_eq!(
            candidate_ids(&engine, "me", Role::Spouse),
            vec!["man", "woman", "unknown", "odd"]
        );
    }

    #[test]
    fn test_candidates_exclude_legacy_parents() {
        let mut me = person("me", Gender::Male);
        me.relationships
            .extra
            .insert("parents".to_string(), serde_json::json!(["old"]));
        let engine = engine_with(vec![me, person("old", Gender::Male), person("new", Gender::Male)]);

        assert_eq!(candidate_ids(&engine, "me", Role::Father), vec!["new"]);
    }

    #[test]
    fn test_candidates_missing_subject() {
        let engine = engine_with(vec![]);
        assert!(matches!(
            engine.eligible_candidates("ghost", Role::Spouse),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_placeholder_end_to_end() {
        let mut engine = placeholder_family();

        engine
            .resolve_placeholder("C", "P", ParentRole::Father, "D")
            .unwrap();

        assert_eq!(rels(&engine, "C").father.as_deref(), Some("D"));
        assert!(rels(&engine, "D").children.contains(&"C".to_string()));
        assert_eq!(rels(&engine, "M").spouses, vec!["D".to_string()]);
        assert_eq!(rels(&engine, "D").spouses, vec!["M".to_string()]);
        assert!(engine.store().find_by_id("P").is_none());
        assert!(engine
            .store()
            .people()
            .iter()
            .all(|p| !p.relationships.references("P")));
        assert!(engine.store().validate().is_empty());
    }

    #[test]
    fn test_resolve_placeholder_without_spouse() {
        let mut engine = engine_with(vec![
            person("C", Gender::Male),
            placeholder("P"),
            person("D", Gender::Female),
        ]);
        engine
            .store
            .link_parent_child("P", "C", ParentRole::Mother)
            .unwrap();

        engine
            .resolve_placeholder("C", "P", ParentRole::Mother, "D")
            .unwrap();

        assert_eq!(rels(&engine, "C").mother.as_deref(), Some("D"));
        assert!(rels(&engine, "D").spouses.is_empty());
        assert!(!engine.store().contains("P"));
    }

    #[test]
    fn test_resolve_placeholder_moves_siblings() {
        let mut engine = placeholder_family();
        engine.store.add_person(person("C2", Gender::Male)).unwrap();
        engine
            .store
            .link_parent_child("P", "C2", ParentRole::Father)
            .unwrap();

        engine
            .resolve_placeholder("C", "P", ParentRole::Father, "D")
            .unwrap();

        assert_eq!(rels(&engine, "C2").father.as_deref(), Some("D"));
        assert_eq!(
            rels(&engine, "D").children,
            vec!["C".to_string(), "C2".to_string()]
        );
        assert!(!engine.store().contains("P"));
        assert!(engine.store().validate().is_empty());
    }

    #[test]
    fn test_resolve_placeholder_refuses_when_sibling_has_selected_as_other_parent() {
        // C2 shares the placeholder father but its mother is D already
        let mut engine = placeholder_family();
        engine.store.add_person(person("C2", Gender::Male)).unwrap();
        engine
            .store
            .link_parent_child("P", "C2", ParentRole::Father)
            .unwrap();
        engine
            .store
            .link_parent_child("D", "C2", ParentRole::Mother)
            .unwrap();
        let before = engine.store().clone();

        let result = engine.resolve_placeholder("C", "P", ParentRole::Father, "D");

        assert!(matches!(
            result,
            Err(EngineError::AlreadyRelated { ref child_id, ref parent_id })
                if child_id == "C2" && parent_id == "D"
        ));
        assert_eq!(engine.store(), &before);
        assert_eq!(rels(&engine, "C2").father.as_deref(), Some("P"));
        assert!(engine.store().contains("P"));
    }

    #[test]
    fn test_resolve_placeholder_rolls_back_on_failed_spouse_transfer() {
        // The placeholder father's spouse is a step-mother who is not the
        // child's parent; selecting her makes the spouse transfer a self-link.
        let mut engine = engine_with(vec![
            person("C", Gender::Male),
            placeholder("P"),
            person("S", Gender::Female),
        ]);
        engine
            .store
            .link_parent_child("P", "C", ParentRole::Father)
            .unwrap();
        engine.store.link_spouses("S", "P").unwrap();
        let before = engine.store().clone();

        let result = engine.resolve_placeholder("C", "P", ParentRole::Father, "S");

        assert!(matches!(
            result,
            Err(EngineError::IncompleteMigration {
                ref placeholder_id,
                step: MigrationStep::TransferSpouse,
                source: StoreError::SelfLink { .. },
            }) if placeholder_id == "P"
        ));
        assert_eq!(engine.store(), &before);
        assert!(engine.store().contains("P"));
    }

    #[test]
    fn test_resolve_placeholder_rolls_back_when_placeholder_cannot_be_removed() {
        let mut engine = placeholder_family();
        // A one-sided reference the migration does not know how to move
        engine
            .store
            .add_person(person("X", Gender::Male))
            .unwrap();
        let mut people = engine.snapshot();
        people
            .iter_mut()
            .find(|p| p.id == "P")
            .unwrap()
            .relationships
            .spouses
            .push("X".to_string());
        let mut engine = engine_with(people);
        let before = engine.store().clone();

        let result = engine.resolve_placeholder("C", "P", ParentRole::Father, "D");

        assert!(matches!(
            result,
            Err(EngineError::IncompleteMigration {
                step: MigrationStep::RemovePlaceholder,
                ..
            })
        ));
        assert_eq!(engine.store(), &before);
    }

    #[test]
    fn test_resolve_placeholder_precondition_errors() {
        let mut engine = placeholder_family();
        engine.store.add_person(placeholder("P2")).unwrap();
        let before = engine.store().clone();

        assert!(matches!(
            engine.resolve_placeholder("C", "M", ParentRole::Mother, "D"),
            Err(EngineError::NotAPlaceholder { .. })
        ));
        assert!(matches!(
            engine.resolve_placeholder("C", "P", ParentRole::Mother, "D"),
            Err(EngineError::SlotMismatch { .. })
        ));
        assert!(matches!(
            engine.resolve_placeholder("C", "P", ParentRole::Father, "C"),
            Err(EngineError::SelfLink { .. })
        ));
        assert!(matches!(
            engine.resolve_placeholder("C", "P", ParentRole::Father, "P2"),
            Err(EngineError::PlaceholderTarget { .. })
        ));
        assert!(matches!(
            engine.resolve_placeholder("C", "P", ParentRole::Father, "M"),
            Err(EngineError::AlreadyRelated { .. })
        ));
        assert!(matches!(
            engine.resolve_placeholder("C", "P", ParentRole::Father, "ghost"),
            Err(EngineError::NotFound { .. })
        ));
        assert_eq!(engine.store(), &before);
    }

    #[test]
    fn test_resolve_candidates_for_child_slot() {
        let engine = placeholder_family();

        // C is related to P and M; D is the only eligible father
        assert_eq!(candidate_ids(&engine, "C", Role::Father), vec!["D"]);
    }

    #[test]
    fn test_round_trip_after_resolution() {
        let mut engine = placeholder_family();
        engine
            .resolve_placeholder("C", "P", ParentRole::Father, "D")
            .unwrap();

        let json = to_json_pretty(engine.store()).unwrap();
        let reparsed = parse_dataset(&json).unwrap();

        assert_eq!(&reparsed, engine.store());
        assert_eq!(to_json_pretty(&reparsed).unwrap(), json);
    }

    #[test]
    fn test_store_error_maps_to_engine_error() {
        let err: EngineError = StoreError::NotFound { id: "x".into() }.into();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err: EngineError = StoreError::DuplicateId { id: "x".into() }.into();
        assert!(matches!(err, EngineError::Store(_)));
        assert_eq!(err.to_string(), "Duplicate person id: x");
    }

    #[test]
    fn test_attributes_untouched_by_linking() {
        let mut engine = engine_with(vec![
            person("a", Gender::Male).with_attribute(ATTR_FIRST_NAME, "Ali"),
            person("b", Gender::Female),
        ]);

        engine.link_existing("a", "b", Role::Spouse).unwrap();

        let a = engine.store().find_by_id("a").unwrap();
        assert_eq!(a.attribute(ATTR_FIRST_NAME), Some("Ali"));
        assert_eq!(a.gender(), Gender::Male);
    }
}
