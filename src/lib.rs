//! Cardsmith
//!
//! Generates greeting cards (birthday, work anniversary, onboarding welcome)
//! from a small form, lays them out with text that shrinks to fit, and
//! exports them as 2x PNG files. Onboarding cards can pull the reporting
//! manager's photo from an Airtable-compatible record store.
//!
//! # Features
//!
//! - **Autofit**: font sizes step down in 2px increments until the text fits
//! - **Export**: mounted card element -> rasterized PNG at twice its size
//! - **Manager lookup** (`airtable`, default): debounced, token-stamped lookups
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cardsmith::{CardKind, DirectorySink, Exporter, Field, LogNotifier, Session, Typeface};
//!
//! # async fn run() -> Option<()> {
//! let typeface = Arc::new(Typeface::default());
//! let exporter = Exporter::new(typeface.clone(), Arc::new(DirectorySink::new("out")));
//! let mut session = Session::new(CardKind::Birthday, typeface, exporter, Arc::new(LogNotifier));
//! session.set_text(Field::Name, "Ann Lee");
//! let artifact = session.download().await?;
//! println!("wrote {}", artifact.file_name);
//! # Some(())
//! # }
//! ```

use std::path::PathBuf;

pub mod autofit;
pub mod data_url;
pub mod error;
pub mod export;
pub mod form;
pub mod lookup;
pub mod notify;
pub mod rendering;
pub mod session;

pub use autofit::{fit, AdvanceTable, FitParams, FontMeasure, TextMeasure, Typeface};
pub use error::{Error, Result};
pub use export::{DirectorySink, ExportArtifact, Exporter, MemorySink, SaveSink};
pub use form::{reduce, Applied, CardForm, CardKind, Field, FormAction, ImageSlot};
pub use lookup::{ManagerDirectory, ManagerLookup, ManagerRecord, MemoryStore, RecordStore, StoreRecord};
pub use notify::{CollectingNotifier, LogNotifier, Notice, Notifier};
pub use session::{LookupOutcome, Session};

#[cfg(feature = "airtable")]
pub use lookup::airtable::AirtableStore;

/// Runtime configuration for a cardsmith host.
///
/// ```
/// let cfg = cardsmith::CardsmithConfig::default();
/// assert_eq!(cfg.export_scale, 2);
/// assert_eq!(cfg.debounce_ms, 500);
/// ```
#[derive(Debug, Clone)]
pub struct CardsmithConfig {
    /// Upscaling applied to exported PNGs
    pub export_scale: u32,
    /// Quiet period before a typed manager name is looked up
    pub debounce_ms: u64,
    /// Maximum candidates fetched per lookup
    pub lookup_limit: usize,
    /// Where exported cards are written
    pub output_dir: PathBuf,
    /// Optional TrueType font; builtin metrics are used without one
    pub font_path: Option<PathBuf>,
    /// Record store settings
    pub store: StoreConfig,
}

impl Default for CardsmithConfig {
    fn default() -> Self {
        Self {
            export_scale: export::DEFAULT_SCALE,
            debounce_ms: 500,
            lookup_limit: lookup::DEFAULT_LIMIT,
            output_dir: PathBuf::from("."),
            font_path: None,
            store: StoreConfig::default(),
        }
    }
}

impl CardsmithConfig {
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

/// Connection settings for the manager record store.
///
/// Missing credentials are not an error here; requests made without them
/// fail with [`Error::LookupFailed`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub base_id: Option<String>,
    pub table: String,
    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.airtable.com".to_string(),
            api_key: None,
            base_id: None,
            table: "User Photos".to_string(),
            timeout_ms: 30000,
        }
    }
}

impl StoreConfig {
    /// Read `AIRTABLE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    /// Build from a variable lookup. Each setting is read from `AIRTABLE_<X>`
    /// first, then `NEXT_PUBLIC_AIRTABLE_<X>`; blank values count as unset.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let read = |suffix: &str| {
            [format!("AIRTABLE_{}", suffix), format!("NEXT_PUBLIC_AIRTABLE_{}", suffix)]
                .iter()
                .filter_map(|k| get(k))
                .find(|v| !v.trim().is_empty())
        };
        let defaults = Self::default();
        Self {
            api_url: read("API_URL").unwrap_or(defaults.api_url),
            api_key: read("API_KEY"),
            base_id: read("BASE_ID"),
            table: read("TABLE").unwrap_or(defaults.table),
            timeout_ms: read("TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_ms),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.base_id.is_some()
    }
}
