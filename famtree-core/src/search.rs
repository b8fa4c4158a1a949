//! Name search and display helpers used when presenting candidates

use crate::models::{Person, ATTR_BIRTHDAY, ATTR_FIRST_NAME, ATTR_LAST_NAME};
use crate::store::{RelationshipStore, StoreError};

/// "first name last name", trimmed; missing parts are empty
pub fn display_label(person: &Person) -> String {
    format!(
        "{} {}",
        person.attribute(ATTR_FIRST_NAME).unwrap_or(""),
        person.attribute(ATTR_LAST_NAME).unwrap_or("")
    )
    .trim()
    .to_string()
}

/// Keeps people whose display label contains `query`, ignoring case.
/// An empty query keeps everyone. Order is preserved.
pub fn filter_by_name<'a, I>(people: I, query: &str) -> Vec<&'a Person>
where
    I: IntoIterator<Item = &'a Person>,
{
    let needle = query.trim().to_lowercase();
    people
        .into_iter()
        .filter(|p| needle.is_empty() || display_label(p).to_lowercase().contains(&needle))
        .collect()
}

/// Children of `id`, latest birthday first. Equal birthdays keep insertion order.
pub fn children_by_birthday<'a>(
    store: &'a RelationshipStore,
    id: &str,
) -> Result<Vec<&'a Person>, StoreError> {
    let person = store.get(id)?;
    let mut children: Vec<&Person> = person
        .relationships
        .children
        .iter()
        .filter_map(|child_id| store.find_by_id(child_id))
        .collect();

    // Stable sort, descending by the raw birthday string
    children.sort_by(|a, b| {
        let a_birthday = a.attribute(ATTR_BIRTHDAY).unwrap_or("");
        let b_birthday = b.attribute(ATTR_BIRTHDAY).unwrap_or("");
        b_birthday.cmp(a_birthday)
    });

    Ok(children)
}
