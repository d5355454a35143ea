//! One card editing session: form state, mounted card, export and lookups.
//!
//! Every user action goes through a method here. Failures end at this layer:
//! they are logged and turned into a [`Notice`], never returned.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::mpsc;

use crate::autofit::Typeface;
use crate::export::{ExportArtifact, Exporter};
use crate::form::{reduce, Applied, CardForm, CardKind, Field, FormAction, ImageSlot};
use crate::lookup::{LookupCompletion, ManagerDirectory, ManagerLookup, ManagerRecord, NameCache};
use crate::notify::{Notice, Notifier};
use crate::rendering::template::layout_card;
use crate::rendering::Stage;

/// What happened to a lookup completion handed to [`Session::apply_lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The manager photo slot now holds the record's photo.
    Applied(ManagerRecord),
    /// No match, or a match without photo; the photo slot was cleared.
    NotFound,
    /// The store query failed; the form is unchanged.
    Failed,
    /// A newer lookup was issued after this one; ignored.
    Stale,
}

pub struct Session {
    form: CardForm,
    stage: Stage,
    typeface: Arc<Typeface>,
    exporter: Exporter,
    notifier: Arc<dyn Notifier>,
    preview: bool,
    lookup: Option<ManagerLookup>,
    completions: Option<mpsc::Receiver<LookupCompletion>>,
    names: NameCache,
}

impl Session {
    /// A fresh session for `kind` with its card already mounted.
    pub fn new(kind: CardKind, typeface: Arc<Typeface>, exporter: Exporter, notifier: Arc<dyn Notifier>) -> Self {
        let mut session = Self {
            form: CardForm::new(kind),
            stage: Stage::new(),
            typeface,
            exporter,
            notifier,
            preview: true,
            lookup: None,
            completions: None,
            names: NameCache::default(),
        };
        session.remount();
        session
    }

    /// Attach a manager directory; lookups are debounced by `window`.
    pub fn with_directory(mut self, directory: ManagerDirectory, window: Duration) -> Self {
        let (lookup, rx) = ManagerLookup::new(directory, window);
        self.lookup = Some(lookup);
        self.completions = Some(rx);
        self
    }

    pub fn form(&self) -> &CardForm {
        &self.form
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn element_id(&self) -> &'static str {
        self.form.kind().element_id()
    }

    pub fn can_download(&self) -> bool {
        self.form.can_download()
    }

    /// Apply an edit and re-layout the card when it is accepted.
    pub fn edit(&mut self, action: FormAction) -> Applied {
        let (next, applied) = reduce(&self.form, action);
        if applied == Applied::Accepted {
            self.form = next;
            self.remount();
        } else {
            debug!("edit refused on {} card", self.form.kind());
        }
        applied
    }

    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> Applied {
        self.edit(FormAction::SetText(field, value.into()))
    }

    fn remount(&mut self) {
        self.stage.mount(layout_card(&self.form, self.typeface.as_ref()));
    }

    pub fn preview(&self) -> bool {
        self.preview
    }

    /// Flip the preview flag; the card stays mounted either way.
    pub fn toggle_preview(&mut self) -> bool {
        self.preview = !self.preview;
        self.preview
    }

    /// Load the manager name list once; returns how many names are cached.
    pub async fn load_manager_names(&mut self) -> usize {
        let names = match &self.lookup {
            Some(lookup) => lookup.directory().list_all_names().await,
            None => Vec::new(),
        };
        self.names = NameCache::new(names);
        self.names.len()
    }

    pub fn names(&self) -> &NameCache {
        &self.names
    }

    /// Autocomplete entries for the manager name currently typed.
    pub fn suggestions(&self) -> Vec<&str> {
        self.names.suggest(self.form.get(Field::ReportingManager))
    }

    /// Keystroke in the manager name input.
    ///
    /// A blank name clears the manager photo and makes pending lookups stale;
    /// anything else schedules a debounced lookup.
    pub fn type_manager_name(&mut self, name: &str) -> Applied {
        let applied = self.set_text(Field::ReportingManager, name);
        if applied == Applied::Rejected {
            return applied;
        }
        if name.trim().is_empty() {
            if let Some(lookup) = &self.lookup {
                lookup.invalidate();
            }
            self.edit(FormAction::SetImage(ImageSlot::Manager, None));
        } else if let Some(lookup) = &self.lookup {
            lookup.schedule(name);
        }
        applied
    }

    /// A suggestion was picked: look it up right away.
    pub fn select_manager(&mut self, name: &str) -> Applied {
        let applied = self.set_text(Field::ReportingManager, name);
        if applied == Applied::Accepted {
            if let Some(lookup) = &self.lookup {
                lookup.issue(name);
            }
        }
        applied
    }

    /// Wait for the next lookup completion, if a directory is attached.
    pub async fn next_lookup(&mut self) -> Option<LookupCompletion> {
        self.completions.as_mut()?.recv().await
    }

    /// Apply a completion to the form unless it is stale.
    pub fn apply_lookup(&mut self, completion: LookupCompletion) -> LookupOutcome {
        let current = self.lookup.as_ref().map_or(false, |l| l.is_current(completion.token));
        if !current {
            debug!("dropping stale lookup #{} for '{}'", completion.token, completion.query);
            return LookupOutcome::Stale;
        }

        match completion.result {
            Ok(Some(record)) => {
                self.edit(FormAction::SetImage(ImageSlot::Manager, Some(record.photo_url.clone())));
                self.notifier
                    .notify(Notice::Success("Manager image loaded successfully!".to_string()));
                LookupOutcome::Applied(record)
            }
            Ok(None) => {
                self.edit(FormAction::SetImage(ImageSlot::Manager, None));
                self.notifier
                    .notify(Notice::Error("No manager image found for this name".to_string()));
                LookupOutcome::NotFound
            }
            Err(e) => {
                error!("Error fetching manager data for '{}': {}", completion.query, e);
                self.notifier
                    .notify(Notice::Error("Failed to fetch manager image".to_string()));
                LookupOutcome::Failed
            }
        }
    }

    /// Set the manager name and resolve it immediately, applying the result.
    pub async fn lookup_manager(&mut self, name: &str) -> LookupOutcome {
        if self.lookup.is_none() {
            warn!("no manager directory configured");
            self.notifier
                .notify(Notice::Error("Failed to fetch manager image".to_string()));
            return LookupOutcome::Failed;
        }
        if name.trim().is_empty() {
            self.type_manager_name(name);
            return LookupOutcome::NotFound;
        }
        if self.select_manager(name) == Applied::Rejected {
            return LookupOutcome::Failed;
        }
        while let Some(completion) = self.next_lookup().await {
            match self.apply_lookup(completion) {
                LookupOutcome::Stale => continue,
                outcome => return outcome,
            }
        }
        LookupOutcome::Failed
    }

    /// Export the mounted card as `{prefix}-{name}.png`.
    ///
    /// Returns `None` when required fields are missing or the export failed;
    /// the user is notified either way.
    pub async fn download(&self) -> Option<ExportArtifact> {
        if !self.form.can_download() {
            warn!("download requested before required fields were filled");
            return None;
        }
        let result = self
            .exporter
            .export_as_image(&self.stage, self.element_id(), &self.form.file_base_name())
            .await;
        match result {
            Ok(artifact) => {
                self.notifier
                    .notify(Notice::Success("Card downloaded successfully!".to_string()));
                Some(artifact)
            }
            Err(e) => {
                error!("Error generating image: {}", e);
                self.notifier.notify(Notice::Error("Failed to download card".to_string()));
                None
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.form.kind())
            .field("preview", &self.preview)
            .field("names", &self.names.len())
            .field("exporter", &self.exporter)
            .finish()
    }
}
