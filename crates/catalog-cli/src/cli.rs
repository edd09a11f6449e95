use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Product catalog: HTTP API and data file tools",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Product data file (JSON Lines). Overrides the config file.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Server configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Show one product
    Get(GetArgs),
    /// List products matching a filter
    List(ListArgs),
    /// List categories, or look one up by name
    Categories(CategoriesArgs),
    /// Append a product given as JSON
    Add(AddArgs),
    /// Append every product in a JSON Lines file
    Import(ImportArgs),
    /// Rebuild the index and scan the whole data file
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on. Overrides config and environment.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Case-insensitive substring of the product name
    #[arg(long)]
    pub name: Option<String>,
    /// Comma-separated categories
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long, default_value_t = catalog_types::DEFAULT_PAGE)]
    pub page: usize,
    #[arg(long, default_value_t = catalog_types::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

#[derive(Args)]
pub struct CategoriesArgs {
    pub name: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// The product as a single JSON object
    pub json: String,
}

#[derive(Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct CheckArgs {}
