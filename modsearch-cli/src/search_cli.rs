//! One-shot search and debug commands
//!
//! Runs the same pipeline the HTTP server uses and prints the result as a
//! table or JSON. Failed groups go to stderr so piped JSON stays clean.

use anyhow::{bail, Result};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use modsearch_core::catalog::ModuleRecord;
use modsearch_core::{SearchRequest, SearchService, SearchStatus};

#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl SearchResultRow {
    fn from_record(record: &ModuleRecord) -> Self {
        let name = record.name();
        let truncated_name = if name.chars().count() > 40 {
            format!("{}...", name.chars().take(37).collect::<String>())
        } else {
            name
        };

        Self {
            id: record.id(),
            name: truncated_name,
            group: record
                .get("group")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            tags: record.tags().join(", "),
        }
    }
}

pub async fn execute_search(
    service: &SearchService,
    query: Option<String>,
    limit: Option<String>,
    ts: Option<String>,
    json_output: bool,
) -> Result<()> {
    let request = SearchRequest { q: query, limit, ts };
    let outcome = service.search(&request).await;

    if outcome.status != SearchStatus::Ok {
        let message = outcome
            .response
            .error
            .unwrap_or_else(|| "search failed".to_string());
        bail!("{message}");
    }

    let response = outcome.response;

    for failure in &response.failures {
        match &failure.url {
            Some(url) => eprintln!(
                "warning: group '{}' skipped ({}): {}",
                failure.group, url, failure.reason
            ),
            None => eprintln!(
                "warning: group '{}' skipped: {}",
                failure.group, failure.reason
            ),
        }
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.items.is_empty() {
        println!("No modules found.");
        return Ok(());
    }

    println!("Found {} module(s):\n", response.items.len());

    let rows: Vec<SearchResultRow> = response
        .items
        .iter()
        .map(SearchResultRow::from_record)
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");

    Ok(())
}

pub async fn execute_debug(service: &SearchService) -> Result<()> {
    let report = service.diagnose().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
