use clap::{Parser, Subcommand};
use std::path::PathBuf;

use famtree_core::{ParentRole, Role};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Edit the relationships of a family tree dataset")]
pub struct Cli {
    /// Path to the dataset JSON file (defaults to the config file, then data.json)
    #[clap(long, global = true)]
    pub file: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[clap(long, global = true)]
    pub log_level: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a person with their relations
    Show {
        /// Person ID
        id: String,
    },

    /// Search people by name
    Search {
        /// Part of a first or last name
        query: String,
    },

    /// List people eligible to be linked for a role
    Candidates {
        /// Person ID the link is made for
        id: String,

        /// Relationship role (spouse, father, mother, son, daughter)
        #[clap(long)]
        role: Role,

        /// Only show candidates whose name contains this text
        #[clap(long)]
        query: Option<String>,
    },

    /// Link a person to an existing person
    Link {
        /// Person ID the link is made for
        subject: String,

        /// Person ID to link; prompts from the candidate list when omitted
        target: Option<String>,

        /// Relationship role from the subject's perspective
        /// (spouse, father, mother, son, daughter)
        #[clap(long)]
        role: Role,
    },

    /// Replace a placeholder parent with an existing person
    Resolve {
        /// Person ID of the child whose parent slot holds the placeholder
        #[clap(long)]
        child: String,

        /// Placeholder person ID
        #[clap(long)]
        placeholder: String,

        /// Parent slot holding the placeholder (father or mother)
        #[clap(long)]
        role: ParentRole,

        /// Existing person ID to put in its place; prompts when omitted
        #[clap(long)]
        person: Option<String>,
    },

    /// Check relationship invariants across the dataset
    Check,

    /// Show or update the saved defaults
    Config {
        /// Dataset file to use when --file is not given
        #[clap(long)]
        dataset: Option<PathBuf>,

        /// Log level to use when --log-level is not given
        #[clap(long)]
        default_log_level: Option<String>,
    },
}
