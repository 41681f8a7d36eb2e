use anyhow::Result;
use colored::Colorize;
use prettytable::{format, row, Table};

use crate::client::AuthlinkClient;
use crate::commands::explain;
use crate::config::Config;

/// List one page of the shorts feed
pub async fn list(config: &Config, page: u32, json: bool) -> Result<()> {
    let client = AuthlinkClient::from_config(config)?;
    let shorts = client.shorts().page(page).await.map_err(explain)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&shorts)?);
        return Ok(());
    }

    if shorts.results.is_empty() {
        println!("{}", "No shorts on this page.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Title".bold(),
        "Author".bold(),
        "Likes".bold(),
        "Posted".bold()
    ]);

    for short in &shorts.results {
        let title = if short.title.chars().count() > 40 {
            format!("{}...", short.title.chars().take(37).collect::<String>())
        } else {
            short.title.clone()
        };
        let author = short.author.clone().unwrap_or_else(|| "-".to_string());
        let posted = short
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(row![short.id.to_string().cyan(), title, author, short.likes, posted]);
    }

    println!("\nShorts (page {}, {} total):", page, shorts.count);
    table.printstd();
    if shorts.next.is_some() {
        println!(
            "More available: {}",
            format!("authlink shorts list --page {}", page + 1).cyan()
        );
    }
    println!();
    Ok(())
}
