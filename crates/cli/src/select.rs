//! Index selection prompts.

use dialoguer::{MultiSelect, Select};
use filings_core::{AppError, AppResult};
use filings_knowledge::{IndexHandle, IndexRegistry, SearchMode};
use std::collections::BTreeSet;

/// Resolve the indexes to search, prompting until the selection is usable.
///
/// Names given on the command line are tried first. Recoverable selection
/// errors are shown and the user is asked again; load failures end the
/// session.
pub fn resolve_interactively(
    registry: &IndexRegistry,
    mode: SearchMode,
    preselected: Vec<String>,
    available: &BTreeSet<String>,
) -> AppResult<Vec<IndexHandle>> {
    let mut selection = if preselected.is_empty() {
        prompt_selection(mode, available)?
    } else {
        preselected
    };

    loop {
        match registry.resolve_selection(mode, &selection) {
            Ok(handles) => return Ok(handles),
            Err(e) if e.is_recoverable() => {
                eprintln!("{}", e);
                selection = prompt_selection(mode, available)?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Ask the user to pick one index or several.
pub fn prompt_selection(mode: SearchMode, available: &BTreeSet<String>) -> AppResult<Vec<String>> {
    let items: Vec<&str> = available.iter().map(String::as_str).collect();

    match mode {
        SearchMode::Single => {
            let chosen = Select::new()
                .with_prompt("Select an index")
                .items(&items)
                .default(0)
                .interact()
                .map_err(prompt_error)?;
            Ok(names_at(&items, &[chosen]))
        }
        SearchMode::Multi => loop {
            let chosen = MultiSelect::new()
                .with_prompt("Select indexes (space to toggle, enter to confirm)")
                .items(&items)
                .interact()
                .map_err(prompt_error)?;

            if chosen.is_empty() {
                println!("Select at least one index to search.");
                continue;
            }
            return Ok(names_at(&items, &chosen));
        },
    }
}

fn names_at(items: &[&str], positions: &[usize]) -> Vec<String> {
    positions
        .iter()
        .filter_map(|&i| items.get(i))
        .map(|name| name.to_string())
        .collect()
}

fn prompt_error(e: dialoguer::Error) -> AppError {
    AppError::Other(format!(
        "Index selection needs an interactive terminal ({}); pass --index instead",
        e
    ))
}
