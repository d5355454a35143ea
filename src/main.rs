//! cardsmith CLI
//!
//! Usage:
//!   cardsmith render <KIND> [OPTIONS]   Fill a card and export it as PNG
//!   cardsmith managers [FILTER]         List manager names
//!   cardsmith lookup <NAME>             Resolve one manager and its photo

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn};

use cardsmith::data_url;
use cardsmith::lookup::airtable::{fetch_photo, AirtableStore};
use cardsmith::{
    Applied, CardKind, CardsmithConfig, DirectorySink, Exporter, Field, FontMeasure, FormAction, ImageSlot,
    LogNotifier, LookupOutcome, ManagerDirectory, MemoryStore, RecordStore, Session, StoreConfig, Typeface,
};

#[derive(Parser)]
#[command(name = "cardsmith", about = "Generate greeting cards as PNG files", version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read manager records from a JSON file instead of the Airtable API
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a card and export it
    Render {
        /// birthday, anniversary or onboarding (welcome)
        kind: CardKind,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        designation: Option<String>,

        /// Years of service (anniversary)
        #[arg(long)]
        years: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        education: Option<String>,

        /// Welcome message (onboarding)
        #[arg(long)]
        message: Option<String>,

        /// Reporting manager; their photo is looked up unless --manager-photo is given
        #[arg(long)]
        manager: Option<String>,

        #[arg(long)]
        manager_message: Option<String>,

        /// Photo of the new joiner
        #[arg(long)]
        photo: Option<PathBuf>,

        /// Photo of the manager
        #[arg(long)]
        manager_photo: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// TrueType font used for measuring and drawing text
        #[arg(long)]
        font: Option<PathBuf>,

        /// Export scale
        #[arg(long, default_value = "2")]
        scale: u32,
    },

    /// List manager names
    Managers {
        /// Only names containing this text (case-insensitive)
        filter: Option<String>,
    },

    /// Resolve a manager name to a record with photo
    Lookup {
        name: String,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn open_store(records: Option<&Path>, config: &StoreConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match records {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading records from {}", path.display()))?;
            Ok(Arc::new(MemoryStore::from_json(&json)?))
        }
        None => {
            if !config.has_credentials() {
                warn!("AIRTABLE_API_KEY / AIRTABLE_BASE_ID not set; lookups will fail");
            }
            Ok(Arc::new(AirtableStore::new(config.clone())?))
        }
    }
}

fn load_photo(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading photo {}", path.display()))?;
    let mime = data_url::image_mime(&bytes).with_context(|| format!("reading photo {}", path.display()))?;
    Ok(data_url::encode(mime, &bytes))
}

fn load_typeface(font: Option<&Path>) -> anyhow::Result<Typeface> {
    match font {
        Some(path) => {
            let measure = FontMeasure::load(path).with_context(|| format!("loading font {}", path.display()))?;
            Ok(Typeface::TrueType(measure))
        }
        None => Ok(Typeface::embedded()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = CardsmithConfig { store: StoreConfig::from_env(), ..CardsmithConfig::default() };
    let store = open_store(cli.records.as_deref(), &config.store)?;
    let directory =
        ManagerDirectory::new(store, Arc::new(LogNotifier)).with_limit(config.lookup_limit);

    match cli.command {
        Commands::Managers { filter } => {
            let names = directory.list_all_names().await;
            let names: Vec<&String> = match filter.as_deref() {
                Some(f) => {
                    let needle = f.to_lowercase();
                    names.iter().filter(|n| n.to_lowercase().contains(&needle)).collect()
                }
                None => names.iter().collect(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
        Commands::Lookup { name } => {
            let found = directory
                .find_manager(&name)
                .await
                .with_context(|| format!("looking up manager '{}'", name))?;
            match (found, cli.json) {
                (found, true) => println!("{}", serde_json::to_string_pretty(&found)?),
                (Some(record), false) => println!("{}\t{}", record.name, record.photo_url),
                (None, false) => println!("No manager image found for '{}'", name),
            }
        }
        Commands::Render {
            kind,
            name,
            designation,
            years,
            location,
            email,
            phone,
            education,
            message,
            manager,
            manager_message,
            photo,
            manager_photo,
            out,
            font,
            scale,
        } => {
            config.output_dir = out;
            config.export_scale = scale;
            config.font_path = font;

            let typeface = Arc::new(load_typeface(config.font_path.as_deref())?);
            let exporter = Exporter::new(typeface.clone(), Arc::new(DirectorySink::new(&config.output_dir)))
                .with_scale(config.export_scale);
            let mut session = Session::new(kind, typeface, exporter, Arc::new(LogNotifier))
                .with_directory(directory, config.debounce());

            let texts = [
                (Field::Name, name),
                (Field::Designation, designation),
                (Field::YearsOfService, years),
                (Field::Location, location),
                (Field::Email, email),
                (Field::Phone, phone),
                (Field::Education, education),
                (Field::WelcomeMessage, message),
                (Field::ManagerMessage, manager_message),
            ];
            for (field, value) in texts {
                if let Some(value) = value {
                    if session.set_text(field, value.as_str()) == Applied::Rejected {
                        bail!("{:?} value '{}' is not valid for a {} card", field, value, kind);
                    }
                }
            }

            if let Some(path) = photo {
                let payload = load_photo(&path)?;
                if session.edit(FormAction::SetImage(ImageSlot::User, Some(payload))) == Applied::Rejected {
                    bail!("{} cards do not take photos", kind);
                }
            }

            match (manager, manager_photo) {
                (Some(manager), Some(path)) => {
                    session.set_text(Field::ReportingManager, manager.as_str());
                    let payload = load_photo(&path)?;
                    session.edit(FormAction::SetImage(ImageSlot::Manager, Some(payload)));
                }
                (Some(manager), None) if kind.supports_images() => {
                    if let LookupOutcome::Applied(record) = session.lookup_manager(&manager).await {
                        if !data_url::is_data_url(&record.photo_url) {
                            let client = reqwest::Client::builder()
                                .timeout(Duration::from_millis(config.store.timeout_ms))
                                .build()?;
                            match fetch_photo(&client, &record.photo_url).await {
                                Ok(payload) => {
                                    session.edit(FormAction::SetImage(ImageSlot::Manager, Some(payload)));
                                }
                                Err(e) => warn!("could not download manager photo: {}", e),
                            }
                        }
                    }
                }
                (Some(manager), None) => {
                    session.set_text(Field::ReportingManager, manager.as_str());
                }
                (None, Some(path)) => {
                    let payload = load_photo(&path)?;
                    session.edit(FormAction::SetImage(ImageSlot::Manager, Some(payload)));
                }
                (None, None) => {}
            }

            if !session.can_download() {
                let missing: Vec<String> = kind
                    .required_fields()
                    .iter()
                    .filter(|f| session.form().get(**f).is_empty())
                    .map(|f| format!("{:?}", f))
                    .collect();
                bail!("missing required fields: {}", missing.join(", "));
            }

            let artifact = session.download().await.context("exporting card")?;
            let path = &artifact.path;
            info!("wrote {}", path.display());
            if cli.json {
                let summary = serde_json::json!({
                    "file": path,
                    "width": artifact.width,
                    "height": artifact.height,
                    "bytes": artifact.png_data.len(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
