//! Dataset JSON format
//!
//! The dataset is a JSON array of `{ "id", "data", "rels" }` records as
//! written by the chart. Field names are a contract with the publish step,
//! so unknown keys are carried through untouched.

use crate::models::Person;
use crate::store::{RelationshipStore, StoreError};

/// Parses a dataset into a store
pub fn parse_dataset(json: &str) -> Result<RelationshipStore, StoreError> {
    let people: Vec<Person> = serde_json::from_str(json)?;
    RelationshipStore::from_people(people)
}

/// Serializes a store as pretty JSON with two-space indentation
pub fn to_json_pretty(store: &RelationshipStore) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(store.people())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, ATTR_BIRTHDAY, ATTR_FIRST_NAME};
    use serde_json::{json, Value};

    const SAMPLE: &str = r#"[
  {
    "id": "1",
    "data": {
      "first name": "Reza",
      "last name": "Ahmadi",
      "birthday": "1330",
      "avatar": "",
      "gender": "M"
    },
    "rels": {
      "spouses": ["2"],
      "children": ["3"]
    },
    "main": true
  },
  {
    "id": "2",
    "data": { "first name": "Maryam", "gender": "F" },
    "rels": { "spouses": ["1"], "children": ["3"] }
  },
  {
    "id": "3",
    "data": { "first name": "Sara", "birthday": "1360", "gender": "F" },
    "rels": { "father": "1", "mother": "2", "parents": ["1", "2"] }
  },
  {
    "id": "4",
    "data": {},
    "rels": {},
    "to_add": true
  }
]"#;

    #[test]
    fn test_parse_dataset() {
        let store = parse_dataset(SAMPLE).unwrap();

        assert_eq!(store.len(), 4);
        let reza = store.find_by_id("1").unwrap();
        assert_eq!(reza.attribute(ATTR_FIRST_NAME), Some("Reza"));
        assert_eq!(reza.gender(), Gender::Male);
        assert_eq!(reza.relationships.children, vec!["3".to_string()]);

        let sara = store.find_by_id("3").unwrap();
        assert_eq!(sara.relationships.father.as_deref(), Some("1"));
        assert_eq!(sara.attribute(ATTR_BIRTHDAY), Some("1360"));

        assert!(store.find_by_id("4").unwrap().is_placeholder);
        assert!(store.validate().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let store = parse_dataset(SAMPLE).unwrap();
        let json = to_json_pretty(&store).unwrap();
        let reparsed = parse_dataset(&json).unwrap();

        assert_eq!(reparsed, store);
        assert_eq!(to_json_pretty(&reparsed).unwrap(), json);

        let original: Value = serde_json::from_str(SAMPLE).unwrap();
        let written: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(written, original);
    }

    #[test]
    fn test_attribute_order_is_preserved() {
        let store = parse_dataset(SAMPLE).unwrap();
        let json = to_json_pretty(&store).unwrap();

        let first = json.find("\"first name\"").unwrap();
        let last = json.find("\"last name\"").unwrap();
        let birthday = json.find("\"birthday\"").unwrap();
        assert!(first < last && last < birthday);
    }

    #[test]
    fn test_missing_rels_and_data_default() {
        let store = parse_dataset(r#"[{ "id": "solo" }]"#).unwrap();
        let solo = store.find_by_id("solo").unwrap();

        assert!(solo.attributes.is_empty());
        assert!(solo.relationships.is_empty());
        assert_eq!(
            serde_json::to_value(solo).unwrap(),
            json!({ "id": "solo", "data": {}, "rels": {} })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_dataset("{ not json"),
            Err(StoreError::Format(_))
        ));
        assert!(matches!(
            parse_dataset(r#"[{ "id": "a" }, { "id": "a" }]"#),
            Err(StoreError::DuplicateId { .. })
        ));
    }
}
