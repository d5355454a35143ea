//! Fill an onboarding card, resolve the manager from an in-memory directory and
//! export it as a 2x PNG.
//!
//! cargo run --example render_card

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use cardsmith::data_url;
use cardsmith::rendering::raster::encode_png;
use cardsmith::{
    CardKind, DirectorySink, Exporter, Field, LogNotifier, LookupOutcome, ManagerDirectory, MemoryStore, Session,
    StoreRecord, Typeface,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("cardsmith - onboarding card example\n");

    // A directory with one manager whose photo is a flat teal square
    let photo = encode_png(&RgbaImage::from_pixel(64, 64, Rgba([47, 113, 100, 255])))?;
    let store = MemoryStore::new(vec![
        StoreRecord::new("Ann Lee", &[data_url::encode("image/png", &photo).as_str()]),
        StoreRecord::new("Bob Stone", &[]),
    ]);

    let out_dir = std::env::temp_dir().join("cardsmith-example");
    let typeface = Arc::new(Typeface::embedded()?);
    let exporter = Exporter::new(typeface.clone(), Arc::new(DirectorySink::new(&out_dir)));
    let directory = ManagerDirectory::new(Arc::new(store), Arc::new(LogNotifier));
    let mut session = Session::new(CardKind::Onboarding, typeface, exporter, Arc::new(LogNotifier))
        .with_directory(directory, std::time::Duration::from_millis(500));

    println!("Loaded {} manager names", session.load_manager_names().await);

    session.set_text(Field::Name, "Lena Park");
    session.set_text(Field::Designation, "Product Designer");
    session.set_text(Field::Location, "Lisbon");
    session.set_text(Field::Email, "lena.park@example.com");
    session.set_text(Field::WelcomeMessage, "Lena joins the design systems team.");
    session.set_text(Field::ReportingManager, "Ann Lee");
    session.set_text(Field::ManagerMessage, "Thrilled to have you with us!");

    match session.lookup_manager("Ann Lee").await {
        LookupOutcome::Applied(record) => println!("Manager: {}", record.name),
        other => eprintln!("Manager photo not applied: {:?}", other),
    }

    match session.download().await {
        Some(artifact) => println!(
            "Saved {} ({}x{}, {} bytes)",
            artifact.path.display(),
            artifact.width,
            artifact.height,
            artifact.png_data.len()
        ),
        None => eprintln!("Export failed; see the log above"),
    }

    Ok(())
}
