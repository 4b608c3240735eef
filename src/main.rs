// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

mod database;
mod import;
mod insights;
mod report;
mod ui;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
struct Args {
    /// Database file to use instead of the one in the user data directory.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the tables if they don't exist yet.
    Init,
    /// Load the CSV seed files. Files that don't exist are skipped.
    Import {
        /// Directory holding the seed files under their usual names.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        providers: Option<PathBuf>,
        #[arg(long)]
        receivers: Option<PathBuf>,
        #[arg(long)]
        food_listings: Option<PathBuf>,
        #[arg(long)]
        claims: Option<PathBuf>,
    },
    /// Print every insight to the terminal.
    Insights {
        /// City for the provider contact lookup.
        #[arg(long, default_value = "")]
        city: String,
    },
    Run,
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/food_donation/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("food_donation");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn import_seeds(
    db: &database::Database,
    dir: PathBuf,
    overrides: [(import::TableKind, Option<PathBuf>); 4],
) -> Result<()> {
    let mut seeds = import::SeedPaths::in_dir(dir);
    for (table, path) in overrides {
        if let Some(path) = path {
            match table {
                import::TableKind::Providers => seeds.providers = path,
                import::TableKind::Receivers => seeds.receivers = path,
                import::TableKind::FoodListings => seeds.food_listings = path,
                import::TableKind::Claims => seeds.claims = path,
            }
        }
    }

    import::load_all(db, &seeds)?;
    log::info!("All CSV data loaded successfully.");
    Ok(())
}

fn run(db: database::Database) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_maximized(true),
        ..Default::default()
    };
    eframe::run_native(
        "Food Wastage Management",
        native_options,
        Box::new(|_cc| Ok(Box::new(ui::FoodDonationDashboard::new(db)))),
    )
    .map_err(|e| e.to_string())?;

    Ok(())
}

fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let args = Args::parse();
    let path = match args.database {
        Some(path) => path,
        None => data_path()?.join("food_donation.db"),
    };
    let db = database::Database::new(path);
    db.init_schema()?;

    match args.commands {
        Commands::Init => log::info!("Database initialized at {}", db.path().display()),
        Commands::Import {
            dir,
            providers,
            receivers,
            food_listings,
            claims,
        } => import_seeds(
            &db,
            dir,
            [
                (import::TableKind::Providers, providers),
                (import::TableKind::Receivers, receivers),
                (import::TableKind::FoodListings, food_listings),
                (import::TableKind::Claims, claims),
            ],
        )?,
        Commands::Insights { city } => print!("{}", report::render_all(&db, &city)?),
        Commands::Run => run(db)?,
    }
    Ok(())
}
