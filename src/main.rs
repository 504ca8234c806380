use anyhow::{bail, Context, Result};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use cnab_store::{
    export_store_summaries, import_cnab, init_tracing, open_database, summarize_stores,
    verify_count, Config, Importer, PageRequest,
};

const USAGE: &str = "Usage:
  cnab-store import <file>              Import a CNAB file
  cnab-store summary [page] [pageSize]  Show store balances
  cnab-store export <csv-path>          Write every store balance to CSV";

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let file = args.get(2).context("import needs a CNAB file path")?;
            run_import(&config, Path::new(file))
        }
        Some("summary") => {
            let page = parse_optional(args.get(2), "page")?;
            let page_size = parse_optional(args.get(3), "pageSize")?;
            run_summary(&config, PageRequest::normalize(page, page_size))
        }
        Some("export") => {
            let out = args.get(2).context("export needs an output CSV path")?;
            run_export(&config, Path::new(out))
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn parse_optional(arg: Option<&String>, name: &str) -> Result<Option<i64>> {
    match arg {
        Some(raw) => match raw.parse() {
            Ok(n) => Ok(Some(n)),
            Err(_) => bail!("{} must be a number, got '{}'", name, raw),
        },
        None => Ok(None),
    }
}

fn run_import(config: &Config, cnab_path: &Path) -> Result<()> {
    println!("📥 CNAB Import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let file = File::open(cnab_path)
        .with_context(|| format!("Failed to open CNAB file {}", cnab_path.display()))?;

    let mut conn = open_database(&config.database_path)?;
    println!("✓ Database ready: {}", config.database_path.display());

    let importer = Importer::new();
    let result = import_cnab(&mut conn, &importer, BufReader::new(file))?;

    println!("\n✓ Lines processed: {}", result.total_lines);
    println!("✓ Imported: {}", result.imported_count);
    println!("✓ Failed: {}", result.failed_count);

    for failure in &result.failed {
        println!("  ✗ line {}: {}", failure.line_number, failure.error);
    }

    let count = verify_count(&conn)?;
    println!("\n✓ Database contains {} transactions", count);

    Ok(())
}

fn run_summary(config: &Config, request: PageRequest) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let page = summarize_stores(&conn, request)?;

    println!(
        "🏪 Stores (page {}/{}, {} total)",
        page.page, page.total_pages, page.total_items
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for item in &page.items {
        println!(
            "{:>5}  {:<30} {:<20} {:>14}",
            item.store_id, item.store_name, item.owner_name, item.total_balance
        );
    }

    Ok(())
}

fn run_export(config: &Config, out_path: &Path) -> Result<()> {
    let conn = open_database(&config.database_path)?;

    let file = File::create(out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    let rows = export_store_summaries(&conn, file)?;

    println!("✓ Exported {} stores to {}", rows, out_path.display());

    Ok(())
}
