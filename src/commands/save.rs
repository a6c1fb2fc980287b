use super::SearchOptions;
use super::search::{find_videos, print_videos};
use crate::config::service_account_path;
use crate::error::{Error, Result};
use crate::memory::{MemorySpreadsheets, MemoryTab};
use crate::publisher::{PublishReport, SheetPublisher};
use crate::sheets::GoogleSheets;

pub async fn run(options: &SearchOptions, sheet: &str, dry_run: bool) -> Result<()> {
    let sheet = sheet.trim();
    if sheet.is_empty() {
        return Err(Error::InvalidInput("spreadsheet name must not be empty".to_string()));
    }
    // Fail on missing credentials before spending search quota
    let key_path = if dry_run {
        None
    } else {
        Some(service_account_path()?)
    };

    let videos = find_videos(options).await?;
    if videos.is_empty() {
        println!("No videos found matching the given filters. Nothing saved.");
        return Ok(());
    }
    eprintln!("Found {} video(s).", videos.len());

    let report = match key_path {
        Some(path) => {
            eprintln!("Saving to Google Sheets spreadsheet '{}'...", sheet);
            let publisher = SheetPublisher::new(GoogleSheets::from_key_file(&path).await?);
            publisher.publish(&videos, &options.query, sheet).await?
        }
        None => {
            let publisher = SheetPublisher::new(MemorySpreadsheets::new().with_spreadsheet(sheet));
            let report = publisher.publish(&videos, &options.query, sheet).await?;
            if let Some(tab) = publisher.backend().tab(sheet, &report.tab_name) {
                print_tab(&tab);
            }
            report
        }
    };

    print_report(&report, dry_run);
    println!();
    print_videos(&videos);

    Ok(())
}

fn print_report(report: &PublishReport, dry_run: bool) {
    if let Some(err) = &report.formatting_error {
        eprintln!(
            "Warning: data was saved, but formatting the sheet failed: {}",
            err
        );
    }

    let verb = if dry_run { "Would save" } else { "Saved" };
    println!(
        "{} {} video(s) to tab '{}' in spreadsheet '{}'{}",
        verb,
        report.rows_written,
        report.tab_name,
        report.spreadsheet,
        if report.replaced_existing {
            " (replaced existing tab)"
        } else {
            ""
        }
    );
}

/// Dump a dry-run tab as tab-separated rows
fn print_tab(tab: &MemoryTab) {
    println!("[{}]", tab.title);
    for row in &tab.values {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.replace(['\t', '\n'], " "),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!();
}
