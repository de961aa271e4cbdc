use clap::{Parser, Subcommand};
use library_index::inventory::Inventory;
use library_index::{catalog, config, fsops, index, output, sync};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "library-index")]
#[command(about = "Publish a library catalog as static search assets")]
#[command(long_about = "\
Publish a library catalog as static search assets

Reads the catalog CSV exported from the library spreadsheet, checks every
row against the documents on disk, and writes the two JSON files the
website's search page loads.

Inputs (paths set in library-config.toml):

  catalog.csv            # One row per document
  search-config.csv      # Which columns are searchable
  filter-config.csv      # Which columns become filters
  display-config.csv     # Which columns are public
  src/statics/data/      # Open-access documents served by the site

Outputs:

  library-index.json     # Published records
  query-config.json      # Sortings, searchable fields, filter sizes

Rows that cannot be published are dropped and logged with their ID.
Use --dry-run to see what would change without renaming, copying or
writing anything.

Run 'library-index gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file; relative paths inside it resolve against its directory
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Report what would happen without touching any files
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build library-index.json and query-config.json from the catalog
    Index,
    /// Copy open-access documents into the destination directory
    Sync,
    /// Run sync, then index
    Build,
    /// Print a stock library-config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Index => {
            let (config, fs) = setup(&cli)?;
            let dest = Inventory::scan(&config.docs.dest_path)?;
            run_index(&config, dest, fs.as_ref(), cli.dry_run)?;
        }
        Command::Sync => {
            let (config, fs) = setup(&cli)?;
            let mut dest = Inventory::scan(&config.docs.dest_path)?;
            run_sync(&config, &mut dest, fs.as_ref(), cli.dry_run)?;
        }
        Command::Build => {
            let (config, fs) = setup(&cli)?;
            println!(
                "==> Stage 1: Syncing documents into {}",
                config.docs.dest_path.display()
            );
            // One listing for both stages; the index sees what sync copied
            // even when the copies were only simulated.
            let mut dest = Inventory::scan(&config.docs.dest_path)?;
            run_sync(&config, &mut dest, fs.as_ref(), cli.dry_run)?;
            println!("==> Stage 2: Indexing {}", config.files.catalog_csv.display());
            run_index(&config, dest, fs.as_ref(), cli.dry_run)?;
            println!("==> Build complete: {}", output_dir(&config).display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config and pick the filesystem for this run.
fn setup(
    cli: &Cli,
) -> Result<(config::LibraryConfig, Box<dyn fsops::FileOps>), config::ConfigError> {
    let config = config::load_config(&cli.config)?;
    if cli.dry_run {
        tracing::info!("This is a dry run, no changes will be made");
    }
    Ok((config, fsops::for_mode(cli.dry_run)))
}

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run_index(
    config: &config::LibraryConfig,
    dest: Inventory,
    fs: &dyn fsops::FileOps,
    dry_run: bool,
) -> Result<(), index::IndexError> {
    let report = index::build_index_with(config, dest, fs)?;
    output::print_index_summary(&report, dry_run);
    Ok(())
}

fn run_sync(
    config: &config::LibraryConfig,
    dest: &mut Inventory,
    fs: &dyn fsops::FileOps,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = catalog::load_normalized_catalog(config)?;
    let mut diagnostics = output::Diagnostics::new();
    let stats = sync::sync_documents(config, &catalog, dest, fs, &mut diagnostics)?;
    output::print_sync_summary(&stats, dry_run);
    Ok(())
}

/// Directory the index is written into.
fn output_dir(config: &config::LibraryConfig) -> &Path {
    config
        .files
        .index_json
        .parent()
        .unwrap_or_else(|| Path::new("."))
}
