use anyhow::{bail, Result};
use inquire::Select;
use std::fmt;

use famtree_core::{display_label, Person, PersonId};

/// A candidate row in the selection list
struct CandidateOption {
    id: PersonId,
    label: String,
}

impl fmt::Display for CandidateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

/// Prompts the user to pick one person from the candidate list
pub fn prompt_select_person(message: &str, candidates: &[&Person]) -> Result<PersonId> {
    if candidates.is_empty() {
        bail!("No eligible people to choose from");
    }

    let options: Vec<CandidateOption> = candidates
        .iter()
        .map(|person| CandidateOption {
            id: person.id.clone(),
            label: display_label(person),
        })
        .collect();

    let choice = Select::new(message, options).with_page_size(15).prompt()?;
    Ok(choice.id)
}
