mod cli;
mod config;
mod logging;
mod prompts;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use famtree_core::{
    children_by_birthday, display_label, filter_by_name, LinkEngine, ParentRole, Person,
    RelationshipStore, Role,
};

use crate::cli::{Cli, Command};
use crate::config::{get_config_path, Config};
use crate::prompts::prompt_select_person;
use crate::storage::DatasetFile;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = get_config_path()?;
    let config = Config::load(&config_path)?;
    logging::init_logging(config.log_level(cli.log_level.as_deref()).as_deref())?;

    let mut dataset = DatasetFile::new(config.dataset_path(cli.file.as_deref()));
    log::debug!("event=command_start path={}", dataset.path().display());

    match &cli.command {
        Command::Show { id } => show_person(&dataset.load()?, id)?,
        Command::Search { query } => search_people(&dataset.load()?, query),
        Command::Candidates { id, role, query } => {
            let engine = LinkEngine::new(dataset.load()?);
            list_candidates(&engine, id, *role, query.as_deref())?;
        }
        Command::Link {
            subject,
            target,
            role,
        } => {
            let mut engine = LinkEngine::new(dataset.load()?);
            link_person(&mut engine, subject, target.as_deref(), *role)?;
            dataset.save(engine.store())?;
        }
        Command::Resolve {
            child,
            placeholder,
            role,
            person,
        } => {
            let mut engine = LinkEngine::new(dataset.load()?);
            resolve_placeholder(&mut engine, child, placeholder, *role, person.as_deref())?;
            dataset.save(engine.store())?;
        }
        Command::Check => check_dataset(&dataset.load()?)?,
        Command::Config {
            dataset: dataset_flag,
            default_log_level,
        } => handle_config_command(config, &config_path, dataset_flag, default_log_level)?,
    }

    Ok(())
}

fn handle_config_command(
    mut config: Config,
    config_path: &Path,
    dataset: &Option<PathBuf>,
    default_log_level: &Option<String>,
) -> Result<()> {
    if dataset.is_none() && default_log_level.is_none() {
        println!("{}", "Configuration:".blue().bold());
        println!("  {} {}", "File:".bold(), config_path.display());
        println!(
            "  {} {}",
            "Dataset:".bold(),
            config.dataset_path(None).display()
        );
        println!(
            "  {} {}",
            "Log level:".bold(),
            config
                .log_level
                .as_deref()
                .unwrap_or(config::DEFAULT_LOG_LEVEL)
        );
        return Ok(());
    }

    if let Some(path) = dataset {
        config.dataset_path = Some(path.clone());
    }
    if let Some(level) = default_log_level {
        config.log_level = Some(logging::normalize_level(level)?.to_string());
    }
    config
        .save(config_path)
        .with_context(|| format!("Failed to save config to {:?}", config_path))?;
    println!("{}", "Configuration updated.".green());
    Ok(())
}

fn show_person(store: &RelationshipStore, id: &str) -> Result<()> {
    let person = store.get(id)?;
    let rels = &person.relationships;

    let title = format!("{} ({})", display_label(person), person.id);
    if person.is_placeholder {
        println!("{} {}", title.yellow().bold(), "[placeholder]".dimmed());
    } else {
        println!("{}", title.bold());
    }

    println!("\n{}:", "Data".green());
    for (key, value) in &person.attributes {
        let value = value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());
        println!("  {} {}", format!("{}:", key).bold(), value);
    }

    println!("\n{}:", "Relations".green());
    for role in [ParentRole::Father, ParentRole::Mother] {
        if let Some(parent_id) = rels.parent(role) {
            println!("  {} {}", format!("{}:", role).bold(), describe(store, parent_id));
        }
    }
    for spouse_id in &rels.spouses {
        println!("  {} {}", "spouse:".bold(), describe(store, spouse_id));
    }
    for child in children_by_birthday(store, id)? {
        println!("  {} {}", "child:".bold(), describe(store, &child.id));
    }
    if rels.is_empty() {
        println!("  {}", "(none)".dimmed());
    }

    Ok(())
}

/// "label (id)" for a known person, the bare id otherwise
fn describe(store: &RelationshipStore, id: &str) -> String {
    match store.find_by_id(id) {
        Some(person) => format!("{} ({})", display_label(person), id.cyan()),
        None => format!("{} {}", id.red(), "(unknown)".dimmed()),
    }
}

fn print_people(people: &[&Person]) {
    if people.is_empty() {
        println!("{}", "No matching people.".yellow());
        return;
    }
    for person in people {
        println!("{:<40} {}", display_label(person), person.id.cyan());
    }
}

fn search_people(store: &RelationshipStore, query: &str) {
    let matches = filter_by_name(store.people(), query);
    print_people(&matches);
}

fn list_candidates(
    engine: &LinkEngine,
    id: &str,
    role: Role,
    query: Option<&str>,
) -> Result<()> {
    let candidates = engine.eligible_candidates(id, role)?;
    let candidates = filter_by_name(candidates, query.unwrap_or(""));
    print_people(&candidates);
    Ok(())
}

fn link_person(
    engine: &mut LinkEngine,
    subject: &str,
    target: Option<&str>,
    role: Role,
) -> Result<()> {
    let target = match target {
        Some(target) => target.to_string(),
        None => {
            let candidates = engine.eligible_candidates(subject, role)?;
            prompt_select_person(&format!("Select {}:", role), &candidates)?
        }
    };

    engine.link_existing(subject, &target, role)?;
    println!(
        "{} {} is now {} of {}",
        "Linked:".green(),
        target.cyan(),
        role,
        subject.cyan()
    );
    Ok(())
}

fn resolve_placeholder(
    engine: &mut LinkEngine,
    child: &str,
    placeholder: &str,
    role: ParentRole,
    person: Option<&str>,
) -> Result<()> {
    let selected = match person {
        Some(person) => person.to_string(),
        None => {
            let candidates = engine.eligible_candidates(child, Role::from(role))?;
            prompt_select_person(&format!("Replace placeholder {} with:", role), &candidates)?
        }
    };

    engine.resolve_placeholder(child, placeholder, role, &selected)?;
    println!(
        "{} placeholder {} replaced by {}",
        "Resolved:".green(),
        placeholder.cyan(),
        selected.cyan()
    );
    Ok(())
}

fn check_dataset(store: &RelationshipStore) -> Result<()> {
    let violations = store.validate();
    if violations.is_empty() {
        println!(
            "{} {} people, no problems found",
            "✓".green(),
            store.len()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("{} {}", "✗".red(), violation);
    }
    anyhow::bail!("{} relationship problem(s) found", violations.len());
}
