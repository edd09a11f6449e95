use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

use catalog_repo::{
    CategoryRepository, JsonlCategoryRepository, JsonlProductRepository, ProductRepository,
    ProductWriter, RepoError,
};
use catalog_server::{CatalogServer, ServerConfig};
use catalog_store::{JsonLineStore, StoreConfig, StoreError};
use catalog_types::{Category, Page, Product, ProductFilter};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Get(args) => cmd_get(&config, args, format),
        Command::List(args) => cmd_list(&config, args, format),
        Command::Categories(args) => cmd_categories(&config, args, format),
        Command::Add(args) => cmd_add(&config, args, format),
        Command::Import(args) => cmd_import(&config, args, format),
        Command::Check(_) => cmd_check(&config, format),
    }
}

/// Config file, then environment, then `--data`.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let mut config = config.with_env()?;
    if let Some(data) = &cli.data {
        config.data_file = data.clone();
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn open_products(config: &ServerConfig) -> anyhow::Result<JsonlProductRepository> {
    JsonlProductRepository::open_with_config(&config.data_file, config.store_config())
        .with_context(|| format!("cannot open {}", config.data_file.display()))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let server = CatalogServer::new(config)?;
        server.serve().await
    })?;
    Ok(())
}

fn cmd_get(config: &ServerConfig, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_products(config)?;
    let product = match repo.get_by_id(&args.id) {
        Ok(product) => product,
        Err(e) if e.is_not_found() => bail!("product {} not found", args.id),
        Err(e) => return Err(e.into()),
    };
    match format {
        OutputFormat::Json => print_json(&product),
        OutputFormat::Text => {
            print_product(&product);
            Ok(())
        }
    }
}

fn print_product(p: &Product) {
    println!("{} {}", p.id.yellow().bold(), p.name.bold());
    println!("  Category: {}", p.category.cyan());
    match p.discount() {
        Some(fraction) => println!(
            "  Price:    {:.2} (was {:.2}, {} off)",
            p.price,
            p.original_price,
            format!("{:.0}%", fraction * 100.0).green()
        ),
        None => println!("  Price:    {:.2}", p.price),
    }
    let stock = if p.in_stock {
        "in stock".green()
    } else {
        "out of stock".red()
    };
    println!("  Stock:    {stock}");
    if p.reviews > 0 {
        println!("  Rating:   {:.1} ({} reviews)", p.rating, p.reviews);
    }
    if !p.description.is_empty() {
        println!("  {}", p.description.dimmed());
    }
}

fn cmd_list(config: &ServerConfig, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut filter = ProductFilter::default()
        .with_categories(args.categories)
        .with_price_range(args.min_price, args.max_price)
        .with_page(args.page, args.page_size);
    if let Some(name) = args.name {
        filter = filter.with_name(name);
    }
    filter.validate()?;

    let repo = open_products(config)?;
    let page: Page<Product> = repo.get_all(&filter)?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "data": page.items,
            "totalCount": page.total,
            "page": filter.page,
            "pageSize": filter.page_size,
        })),
        OutputFormat::Text => {
            for p in &page.items {
                println!(
                    "{:<12} {:<40} {:<16} {:>10.2}",
                    p.id.yellow(),
                    p.name,
                    p.category.cyan(),
                    p.price
                );
            }
            println!(
                "{} of {} matching (page {}, size {})",
                page.items.len().to_string().bold(),
                page.total.to_string().bold(),
                filter.page,
                filter.page_size
            );
            Ok(())
        }
    }
}

fn cmd_categories(
    config: &ServerConfig,
    args: CategoriesArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let repo =
        JsonlCategoryRepository::open_with_config(&config.data_file, config.store_config())?;
    let categories: Vec<Category> = match args.name {
        Some(name) => match repo.get_by_name(&name) {
            Ok(category) => vec![category],
            Err(e) if e.is_not_found() => bail!("category {name} not found"),
            Err(e) => return Err(e.into()),
        },
        None => repo.get_all()?,
    };
    match format {
        OutputFormat::Json => print_json(&categories),
        OutputFormat::Text => {
            for c in &categories {
                println!("{}", c.name.cyan());
            }
            Ok(())
        }
    }
}

fn cmd_add(config: &ServerConfig, args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let product = Product::from_json(&args.json)?;
    let repo = open_products(config)?;
    let offset = repo.add(&product)?;
    info!(id = %product.id, offset, "product added");
    match format {
        OutputFormat::Json => print_json(&json!({ "productId": product.id, "offset": offset })),
        OutputFormat::Text => {
            println!("{} Added product {}", "✓".green().bold(), product.id.yellow());
            Ok(())
        }
    }
}

/// Outcome of an import run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Ids already present, with the source line they were read from.
    pub duplicates: Vec<(u64, String)>,
}

/// Append each product line of `source`. Blank lines are skipped, known ids
/// are recorded and skipped, anything else that fails aborts the import.
pub fn import_file<W: ProductWriter>(repo: &W, source: &Path) -> anyhow::Result<ImportSummary> {
    let file =
        File::open(source).with_context(|| format!("cannot open {}", source.display()))?;
    let mut summary = ImportSummary::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let number = index as u64 + 1;
        let line = line.with_context(|| format!("{}: line {number}", source.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let product = Product::from_json(&line)
            .with_context(|| format!("{}: line {number}", source.display()))?;
        match repo.add(&product) {
            Ok(_) => summary.imported += 1,
            Err(RepoError::AlreadyExists { key, .. }) => summary.duplicates.push((number, key)),
            Err(e) => {
                return Err(e).with_context(|| format!("{}: line {number}", source.display()))
            }
        }
    }
    Ok(summary)
}

fn cmd_import(config: &ServerConfig, args: ImportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = open_products(config)?;
    let summary = import_file(&repo, &args.file)?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "imported": summary.imported,
            "duplicates": summary
                .duplicates
                .iter()
                .map(|(line, id)| json!({ "line": line, "productId": id }))
                .collect::<Vec<_>>(),
        })),
        OutputFormat::Text => {
            for (line, id) in &summary.duplicates {
                println!(
                    "  {} line {line}: product {} already exists",
                    "skipped".yellow(),
                    id.yellow()
                );
            }
            println!(
                "{} Imported {} products ({} duplicates skipped)",
                "✓".green().bold(),
                summary.imported.to_string().bold(),
                summary.duplicates.len()
            );
            Ok(())
        }
    }
}

/// Result of a full consistency pass over a data file.
#[derive(Debug, PartialEq, Eq)]
pub struct CheckReport {
    pub path: PathBuf,
    pub records: usize,
    pub keys: usize,
}

impl CheckReport {
    /// Records whose id was seen earlier in the file.
    pub fn duplicates(&self) -> usize {
        self.records - self.keys
    }
}

/// Rebuild the index of `store` from disk, then scan every line.
pub fn check_store(store: &JsonLineStore<Product>) -> Result<CheckReport, StoreError> {
    let keys = store.reload()?;
    let mut records = 0usize;
    store.find_all(|_| {
        records += 1;
        Ok::<_, StoreError>(())
    })?;
    Ok(CheckReport {
        path: store.path().to_path_buf(),
        records,
        keys,
    })
}

fn open_store(path: &Path, config: StoreConfig) -> Result<JsonLineStore<Product>, StoreError> {
    JsonLineStore::open_with_config(path, |p: &Product| p.id.clone(), config)
}

fn cmd_check(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let checked = open_store(&config.data_file, config.store_config())
        .and_then(|store| check_store(&store));
    let report = match checked {
        Ok(report) => report,
        Err(e) if e.is_corruption() => {
            println!("{} {e}", "✗".red().bold());
            bail!("data file is corrupt");
        }
        Err(e) => return Err(e.into()),
    };
    match format {
        OutputFormat::Json => print_json(&json!({
            "path": report.path,
            "records": report.records,
            "keys": report.keys,
            "duplicates": report.duplicates(),
        })),
        OutputFormat::Text => {
            println!(
                "{} {}: {} records, {} ids",
                "✓".green().bold(),
                report.path.display(),
                report.records.to_string().bold(),
                report.keys.to_string().bold()
            );
            if report.duplicates() > 0 {
                println!(
                    "  {} {} records repeat an earlier id; the last one wins",
                    "warning:".yellow(),
                    report.duplicates()
                );
            }
            Ok(())
        }
    }
}
