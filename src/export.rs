//! Export pipeline: mounted card element -> 2x PNG -> saved file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::info;

use crate::autofit::Typeface;
use crate::rendering::{self, Stage};
use crate::{Error, Result};

/// Upscaling factor applied to every capture.
pub const DEFAULT_SCALE: u32 = 2;

/// A finished export, handed to the save sink.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    /// Where the sink put the file
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

/// Where exported files end up.
pub trait SaveSink: Send + Sync {
    /// Persist `data` under `file_name`; returns where it went.
    fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf>;
}

/// Writes files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Replace characters that would escape the target directory or break the path.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "card".to_string()
    } else {
        trimmed.to_string()
    }
}

impl SaveSink for DirectorySink {
    fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(sanitize_file_name(file_name));
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

/// Keeps saved files in memory (tests, previews).
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl SaveSink for MemorySink {
    fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| Error::Other("memory sink poisoned".into()))?;
        files.push((file_name.to_string(), data.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}

/// Runs captures one at a time.
pub struct Exporter {
    scale: u32,
    typeface: Arc<Typeface>,
    sink: Arc<dyn SaveSink>,
    busy: AtomicBool,
}

/// Clears the busy flag when the capture ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Exporter {
    pub fn new(typeface: Arc<Typeface>, sink: Arc<dyn SaveSink>) -> Self {
        Self { scale: DEFAULT_SCALE, typeface, sink, busy: AtomicBool::new(false) }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Capture the element mounted under `element_id` and save it as
    /// `{file_base_name}.png`.
    ///
    /// The capture sees the element as mounted when this is called. Fails
    /// with `ElementNotFound` (nothing saved) when the id is not mounted and
    /// with `ExportBusy` while another capture on this exporter is running.
    pub async fn export_as_image(
        &self,
        stage: &Stage,
        element_id: &str,
        file_base_name: &str,
    ) -> Result<ExportArtifact> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ExportBusy);
        }
        let _guard = BusyGuard(&self.busy);

        let element = stage
            .get(element_id)
            .cloned()
            .ok_or_else(|| Error::ElementNotFound(element_id.to_string()))?;

        let scale = self.scale;
        let typeface = Arc::clone(&self.typeface);
        let shot = tokio::task::spawn_blocking(move || rendering::capture(&element, scale, &typeface))
            .await
            .map_err(|e| Error::CaptureError(format!("capture task failed: {}", e)))??;

        let file_name = format!("{}.png", file_base_name);
        let path = self.sink.save(&file_name, &shot.png_data)?;
        info!("saved {} ({}x{}) to {}", file_name, shot.width, shot.height, path.display());

        Ok(ExportArtifact {
            file_name,
            path,
            width: shot.width,
            height: shot.height,
            png_data: shot.png_data,
        })
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("scale", &self.scale)
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{CardForm, CardKind};
    use crate::rendering::template::layout_card;

    fn exporter(sink: Arc<MemorySink>) -> Exporter {
        Exporter::new(Arc::new(Typeface::default()), sink)
    }

    #[tokio::test]
    async fn missing_element_fails_without_saving() {
        let sink = Arc::new(MemorySink::new());
        let ex = exporter(sink.clone());
        let err = ex.export_as_image(&Stage::new(), "birthday-card", "birthday-Ann").await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(ref id) if id == "birthday-card"));
        assert!(sink.files().is_empty());
        assert!(!ex.is_busy());
    }

    #[tokio::test]
    async fn export_saves_png_named_after_base() {
        let sink = Arc::new(MemorySink::new());
        let ex = exporter(sink.clone());
        let mut stage = Stage::new();
        stage.mount(layout_card(&CardForm::new(CardKind::Birthday), &Typeface::default()));

        let art = ex.export_as_image(&stage, "birthday-card", "birthday-Ann").await.unwrap();
        assert_eq!(art.file_name, "birthday-Ann.png");
        assert_eq!((art.width, art.height), (1500, 1000));
        let files = sink.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "birthday-Ann.png");
        assert_eq!(files[0].1, art.png_data);
    }

    #[tokio::test]
    async fn busy_exporter_rejects_overlap() {
        let ex = exporter(Arc::new(MemorySink::new()));
        ex.busy.store(true, Ordering::SeqCst);
        let err = ex.export_as_image(&Stage::new(), "x", "x").await.unwrap_err();
        assert!(matches!(err, Error::ExportBusy));
        // a rejected call must not clear someone else's flag
        assert!(ex.is_busy());
    }

    #[tokio::test]
    async fn overlapping_exports_run_one_at_a_time() {
        let sink = Arc::new(MemorySink::new());
        let ex = exporter(sink.clone());
        let mut stage = Stage::new();
        stage.mount(layout_card(&CardForm::new(CardKind::Onboarding), &Typeface::default()));

        let (a, b) = tokio::join!(
            ex.export_as_image(&stage, "onboarding-card", "welcome-a"),
            ex.export_as_image(&stage, "onboarding-card", "welcome-b"),
        );
        let busy = [&a, &b].iter().filter(|r| matches!(r, Err(Error::ExportBusy))).count();
        let saved = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!((busy, saved), (1, 1));
        assert_eq!(sink.files().len(), 1);

        // the flag is released once the winner finishes
        assert!(!ex.is_busy());
        assert!(ex.export_as_image(&stage, "onboarding-card", "welcome-c").await.is_ok());
    }

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize_file_name("birthday-a/b.png"), "birthday-a_b.png");
        assert_eq!(sanitize_file_name("../../etc"), "_.._etc");
        assert_eq!(sanitize_file_name(".."), "card");
    }
}
