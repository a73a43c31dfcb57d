//! WorldWander - country explorer with a travel bucket list
//!
//! ## Usage
//!
//! ```bash
//! # Browse the catalog
//! worldwander countries --search land --region Europe
//! worldwander regions
//!
//! # Country details and the bucket list
//! worldwander show fr
//! worldwander toggle FRA
//! worldwander list
//!
//! # Map state: viewport, markers, hover and click
//! worldwander map --region Europe --hover FRA --click FRA
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use worldwander_lib::catalog::format_thousands;
use worldwander_lib::commands::{bucket_list, countries, map, AppState};
use worldwander_lib::config::{parse_timeout, AppConfig};
use worldwander_lib::identity::{normalize, CanonicalKey};
use worldwander_lib::map::MapIntent;
use worldwander_lib::selection::{AddOutcome, MemoryStorage, Toggled};

/// WorldWander - browse countries and curate a travel bucket list
#[derive(Parser)]
#[command(name = "worldwander")]
#[command(version)]
struct Cli {
    /// Country provider base URL
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// GeoJSON source for the map (URL or file path)
    #[arg(long, global = true)]
    features: Option<String>,
    /// Directory holding the saved bucket list
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Keep the bucket list in memory only
    #[arg(long, global = true)]
    ephemeral: bool,
    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<String>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List countries, optionally filtered
    Countries {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
        /// Only this region
        #[arg(short, long)]
        region: Option<String>,
    },
    /// List regions with bucket-list counts
    Regions,
    /// Show one country's details
    Show {
        /// Alpha-2 or alpha-3 code
        code: String,
    },
    /// Add a country to the bucket list
    Add { code: String },
    /// Remove a country from the bucket list
    Remove { code: String },
    /// Add if absent, remove if present
    Toggle { code: String },
    /// Show the bucket list
    List,
    /// Show map state
    Map {
        /// Center the map on a region
        #[arg(short, long)]
        region: Option<String>,
        /// Hover the feature of this country
        #[arg(long)]
        hover: Option<String>,
        /// Click the feature of this country and follow the navigation
        #[arg(long)]
        click: Option<String>,
        /// Print every feature with its state
        #[arg(long)]
        list_features: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("worldwander=info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let state = if cli.ephemeral {
        AppState::with_storage(config, Box::new(MemoryStorage::new()))?
    } else {
        AppState::open(config)?
    };
    if let Some(warning) = bucket_list::take_restore_warning(&state) {
        eprintln!("Warning: {}", warning);
    }

    let json = cli.json;
    match cli.command {
        Commands::Countries { search, region } => {
            let rows = countries::list_countries(&state, search, region).await?;
            if json {
                return print_json(&rows);
            }
            for c in &rows {
                println!(
                    "{} {}{:<40} {:<10} {:>15}",
                    c.code,
                    if c.in_bucket_list { "*" } else { " " },
                    c.name,
                    c.region,
                    format_thousands(c.population)
                );
            }
            println!("{} countries", rows.len());
        }
        Commands::Regions => {
            let regions = countries::list_regions(&state).await?;
            if json {
                return print_json(&regions);
            }
            for r in &regions {
                println!("{:<12} {:>4} countries, {:>3} on bucket list", r.region, r.country_count, r.selected_count);
            }
        }
        Commands::Show { code } => {
            let detail = countries::show_country(&state, code).await?;
            if json {
                return print_json(&detail);
            }
            print_detail(&detail);
        }
        Commands::Add { code } => {
            let key = canonical_code(&code)?;
            match bucket_list::add_to_bucket_list(&state, code).await? {
                AddOutcome::Inserted => println!("Added {} to the bucket list", key),
                AddOutcome::Refreshed => println!("Updated {} on the bucket list", key),
                AddOutcome::Unchanged => println!("{} is already on the bucket list", key),
            }
        }
        Commands::Remove { code } => {
            let key = canonical_code(&code)?;
            if bucket_list::remove_from_bucket_list(&state, code)? {
                println!("Removed {} from the bucket list", key);
            } else {
                println!("{} was not on the bucket list", key);
            }
        }
        Commands::Toggle { code } => {
            let key = canonical_code(&code)?;
            match bucket_list::toggle_bucket_list(&state, code).await? {
                Toggled::Added => println!("Added {} to the bucket list", key),
                Toggled::Removed => println!("Removed {} from the bucket list", key),
            }
        }
        Commands::List => {
            let view = bucket_list::get_bucket_list(&state)?;
            if json {
                return print_json(&view);
            }
            if view.countries.is_empty() {
                println!("Your bucket list is empty");
            }
            for c in &view.countries {
                println!("{} {:<40} {}", c.code, c.display_name, c.region);
            }
        }
        Commands::Map {
            region,
            hover,
            click,
            list_features,
        } => run_map(&state, region, hover, click, list_features, json).await?,
    }
    Ok(())
}

async fn run_map(
    state: &AppState,
    region: Option<String>,
    hover: Option<String>,
    click: Option<String>,
    list_features: bool,
    json: bool,
) -> Result<(), String> {
    let overview = map::map_overview(state, region).await?;

    if let Some(code) = hover {
        let id = map::feature_for_country(state, code)?;
        if let Some(s) = map::hover_feature(state, id.0) {
            log::info!("Hovering feature {}: {}", id, s);
        }
    }

    if list_features {
        let rendered = map::render_map(state).await?;
        if json {
            return print_json(&rendered);
        }
        for f in rendered.iter().filter(|f| f.interactive) {
            println!(
                "{:>4} {:<40} {:<16} fill {} @ {:.2}",
                f.id, f.label, f.state, f.style.fill_color, f.style.fill_opacity
            );
        }
    } else if json {
        print_json(&overview)?;
    } else {
        println!(
            "View: center ({:.1}, {:.1}) zoom {}",
            overview.view.center.lat, overview.view.center.lon, overview.view.zoom
        );
        println!(
            "Features: {} ({} interactive, {} on bucket list)",
            overview.feature_count, overview.interactive_count, overview.selected_count
        );
        for m in &overview.markers {
            println!("  marker {} {} at ({:.2}, {:.2})", m.code, m.label, m.position.lat, m.position.lon);
        }
    }

    if let Some(code) = click {
        let id = map::feature_for_country(state, code)?;
        match map::click_feature(state, id.0) {
            Some(MapIntent::Navigate(key)) => {
                let detail = countries::show_country(state, key.to_string()).await?;
                if json {
                    return print_json(&detail);
                }
                print_detail(&detail);
            }
            None => println!("Feature {} is not interactive", id),
        }
    }
    Ok(())
}

/// The canonical key a code is echoed back as
fn canonical_code(code: &str) -> Result<CanonicalKey, String> {
    normalize(code).map_err(|e| e.to_string())
}

fn build_config(cli: &Cli) -> Result<AppConfig, String> {
    let mut config = AppConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(features) = &cli.features {
        config.features_source = features.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(secs) = &cli.timeout {
        config.timeout = parse_timeout("--timeout", secs).map_err(|e| e.to_string())?;
    }
    Ok(config)
}

fn print_detail(detail: &countries::CountryDetail) {
    let c = &detail.country;
    if let Some(reason) = &detail.stale_reason {
        eprintln!("Warning: showing saved snapshot ({})", reason);
    }
    println!("{} ({})", c.display_name, c.code);
    println!("  Flag:       {}", c.flag_url);
    println!("  Capital:    {}", c.capital.as_deref().unwrap_or("Unknown"));
    println!("  Population: {}", c.population_display());
    println!("  Region:     {}", c.region);
    println!("  Subregion:  {}", c.subregion.as_deref().unwrap_or("-"));
    println!("  Languages:  {}", c.languages.join(", "));
    println!("  Currencies: {}", c.currencies.join(", "));
    println!(
        "  {}",
        if detail.in_bucket_list {
            "On your bucket list"
        } else {
            "Not on your bucket list"
        }
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}
