use std::path::Path;

use gridscout_core::models::{Filter, ListQuery, Page};
use gridscout_core::Collection;
use serde_json::Value;

use crate::commands::common::open_client;
use crate::error::CliError;

pub struct ListOptions {
    pub region: Option<String>,
    pub station: Option<String>,
    pub contains: Option<String>,
    pub page: u64,
    pub page_size: u64,
    pub json: bool,
}

pub async fn run_list(
    collection: Collection,
    options: ListOptions,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    let query = build_query(collection, &options)?;

    let client = open_client(db_path, offline).await?;
    let page = client.adapter.list(collection, &query).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.results.is_empty() {
        println!("No matching {collection}.");
        return Ok(());
    }

    for line in format_lines(collection, &page.results) {
        println!("{line}");
    }
    print_page_footer(&page, &query);
    Ok(())
}

fn build_query(collection: Collection, options: &ListOptions) -> Result<ListQuery, CliError> {
    let mut query = ListQuery::new()
        .with_page(options.page)
        .with_page_size(options.page_size);

    if let Some(region) = &options.region {
        query = query.with_filter(match collection {
            Collection::BaseStations => Filter::eq("region", region),
            Collection::Transformers | Collection::Inspections => Filter::related_eq(
                "station_code",
                Collection::BaseStations,
                "region",
                region,
            ),
            Collection::Feeders => {
                return Err(CliError::UnsupportedFilter(
                    "--region does not apply to feeders".to_string(),
                ))
            }
        });
    }

    if let Some(station) = &options.station {
        query = query.with_filter(match collection {
            Collection::BaseStations => Filter::eq("code", station),
            Collection::Transformers | Collection::Inspections => {
                Filter::eq("station_code", station)
            }
            Collection::Feeders => {
                return Err(CliError::UnsupportedFilter(
                    "--station does not apply to feeders; filter by --contains instead".to_string(),
                ))
            }
        });
    }

    if let Some(fragment) = &options.contains {
        let field = match collection {
            Collection::BaseStations => "name",
            Collection::Transformers => "model",
            Collection::Inspections => "summary",
            Collection::Feeders => "conductor",
        };
        query = query.with_filter(Filter::contains(field, fragment));
    }

    Ok(query)
}

fn format_lines(collection: Collection, records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|record| match collection {
            Collection::BaseStations => format!(
                "{:<10} {:<24} {}/{}  {}",
                text(record, "code"),
                text(record, "name"),
                text(record, "region"),
                text(record, "district"),
                text(record, "status"),
            ),
            Collection::Transformers => format!(
                "{:<10} station={:<10} {:<12} {} kVA  {}",
                text(record, "serial_number"),
                text(record, "station_code"),
                text(record, "model"),
                text(record, "rated_kva"),
                text(record, "status"),
            ),
            Collection::Inspections => format!(
                "{:<12} station={:<10} {:<8} by {}",
                text(record, "reference"),
                text(record, "station_code"),
                text(record, "result"),
                text(record, "inspector"),
            ),
            Collection::Feeders => format!(
                "{:<10} transformer={:<10} {:<16} {} m  {}",
                text(record, "code"),
                text(record, "transformer_serial"),
                text(record, "conductor"),
                text(record, "length_m"),
                text(record, "status"),
            ),
        })
        .collect()
}

fn print_page_footer(page: &Page<Value>, query: &ListQuery) {
    let total_pages = page.count.div_ceil(query.page_size).max(1);
    println!(
        "page {}/{total_pages} ({} total)",
        query.page, page.count
    );
}

fn text(record: &Value, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => "-".to_string(),
    }
}
