//! Integration tests for the Airtable-backed manager directory

#![cfg(feature = "airtable")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tiny_http::{Header, Response, Server};

use cardsmith::lookup::airtable::fetch_photo;
use cardsmith::{
    AirtableStore, CardKind, CollectingNotifier, Error, Exporter, Field, LookupOutcome, ManagerDirectory,
    MemorySink, Notice, Session, StoreConfig, Typeface,
};

/// A request as the fake store saw it.
#[derive(Debug, Clone)]
struct Seen {
    url: String,
    auth: Option<String>,
}

struct FakeStore {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeStore {
    fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn config(&self) -> StoreConfig {
        StoreConfig {
            api_url: self.base_url.clone(),
            api_key: Some("key-test".to_string()),
            base_id: Some("app123".to_string()),
            timeout_ms: 5000,
            ..StoreConfig::default()
        }
    }
}

/// Start a fake store on a free port; `handler` maps a request URL to
/// (status, content type, body).
fn start_fake_store(handler: fn(&str) -> (u16, &'static str, Vec<u8>)) -> FakeStore {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_string();
            let auth = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            log.lock().unwrap().push(Seen { url: url.clone(), auth });

            let (status, content_type, body) = handler(&url);
            let header = format!("Content-Type: {}", content_type).parse::<Header>().unwrap();
            let _ = request.respond(Response::from_data(body).with_status_code(status).with_header(header));
        }
    });

    FakeStore { base_url: format!("http://127.0.0.1:{}", port), seen }
}

const NAMES_PAGE: &str = r#"{"records":[
    {"id":"rec1","fields":{"Name":"Ann Lee"}},
    {"id":"rec2","fields":{"Name":"Bob Stone"}},
    {"id":"rec3","fields":{"Name":"Ann Lee"}},
    {"id":"rec4","fields":{}},
    {"id":"rec5","fields":{"Name":"  "}}
]}"#;

const CANDIDATES: &str = r#"{"records":[
    {"id":"rec9","fields":{"Name":"Ann Leeds","Photo":[{"id":"att9","url":"https://cdn.example/leeds.png"}]}},
    {"id":"rec1","fields":{"Name":"Ann Lee","Photo":[{"id":"att1","url":"https://cdn.example/ann.png"},{"id":"att2","url":"https://cdn.example/ann2.png"}]}}
]}"#;

const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49,
    0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8, 0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D,
    0x1D, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn table_handler(url: &str) -> (u16, &'static str, Vec<u8>) {
    if url.starts_with("/photo.png") {
        return (200, "image/png", PNG_1X1.to_vec());
    }
    if url.starts_with("/photo.svg") {
        return (200, "image/svg+xml", br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#.to_vec());
    }
    if url.starts_with("/mislabelled") {
        return (200, "application/octet-stream", PNG_1X1.to_vec());
    }
    if !url.starts_with("/v0/app123/User%20Photos") {
        return (404, "application/json", br#"{"error":"NOT_FOUND"}"#.to_vec());
    }
    if url.contains("filterByFormula") {
        (200, "application/json", CANDIDATES.as_bytes().to_vec())
    } else {
        (200, "application/json", NAMES_PAGE.as_bytes().to_vec())
    }
}

fn failing_handler(_url: &str) -> (u16, &'static str, Vec<u8>) {
    (503, "application/json", br#"{"error":"SERVICE_UNAVAILABLE"}"#.to_vec())
}

fn directory(config: StoreConfig) -> (ManagerDirectory, Arc<CollectingNotifier>) {
    let notifier = Arc::new(CollectingNotifier::new());
    let store = Arc::new(AirtableStore::new(config).unwrap());
    (ManagerDirectory::new(store, notifier.clone()), notifier)
}

#[tokio::test]
async fn names_are_listed_sorted_and_deduplicated() {
    let fake = start_fake_store(table_handler);
    let (dir, notifier) = directory(fake.config());

    assert_eq!(dir.list_all_names().await, vec!["Ann Lee", "Bob Stone"]);
    assert!(notifier.take().is_empty());

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    let url = &requests[0].url;
    assert!(url.contains("fields%5B%5D=Name"), "{}", url);
    assert!(url.contains("sort%5B0%5D%5Bfield%5D=Name"), "{}", url);
    assert!(url.contains("sort%5B0%5D%5Bdirection%5D=asc"), "{}", url);
    assert_eq!(requests[0].auth.as_deref(), Some("Bearer key-test"));
}

#[tokio::test]
async fn find_manager_prefers_exact_match_and_first_photo() {
    let fake = start_fake_store(table_handler);
    let (dir, _) = directory(fake.config());

    let found = dir.find_manager("ann lee").await.unwrap().unwrap();
    assert_eq!(found.name, "Ann Lee");
    assert_eq!(found.photo_url, "https://cdn.example/ann.png");

    let url = &fake.requests()[0].url;
    assert!(url.contains("maxRecords=5"), "{}", url);
    assert!(url.contains("filterByFormula=OR%28LOWER%28%7BName%7D%29"), "{}", url);
}

#[tokio::test]
async fn blank_query_sends_no_request() {
    let fake = start_fake_store(table_handler);
    let (dir, _) = directory(fake.config());
    assert_eq!(dir.find_manager("  ").await.unwrap(), None);
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn store_errors_are_lookup_failures() {
    let fake = start_fake_store(failing_handler);
    let (dir, notifier) = directory(fake.config());

    let err = dir.find_manager("Ann").await.unwrap_err();
    assert!(matches!(err, Error::LookupFailed(_)), "{:?}", err);

    assert!(dir.list_all_names().await.is_empty());
    assert!(matches!(notifier.take().as_slice(), [Notice::Warning(_)]));
}

#[tokio::test]
async fn missing_credentials_fail_without_network() {
    let fake = start_fake_store(table_handler);
    let config = StoreConfig { api_key: None, ..fake.config() };
    let (dir, _) = directory(config);

    let err = dir.find_manager("Ann").await.unwrap_err();
    assert!(matches!(err, Error::LookupFailed(ref m) if m.contains("AIRTABLE_API_KEY")));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn photo_is_fetched_as_data_url() {
    let fake = start_fake_store(table_handler);
    let client = reqwest::Client::new();

    let payload = fetch_photo(&client, &format!("{}/photo.png", fake.base_url)).await.unwrap();
    assert!(payload.starts_with("data:image/png;base64,"));

    let err = fetch_photo(&client, &format!("{}/missing.png", fake.base_url)).await.unwrap_err();
    assert!(matches!(err, Error::LookupFailed(_)));
}

#[tokio::test]
async fn photo_type_is_taken_from_the_payload() {
    let fake = start_fake_store(table_handler);
    let client = reqwest::Client::new();

    let payload = fetch_photo(&client, &format!("{}/mislabelled", fake.base_url)).await.unwrap();
    assert!(payload.starts_with("data:image/png;base64,"));

    let err = fetch_photo(&client, &format!("{}/photo.svg", fake.base_url)).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedImage(_)));
}

#[tokio::test]
async fn onboarding_session_resolves_manager_and_exports() {
    let fake = start_fake_store(table_handler);
    let (dir, _) = directory(fake.config());
    let notifier = Arc::new(CollectingNotifier::new());
    let typeface = Arc::new(Typeface::default());
    let sink = Arc::new(MemorySink::new());
    let exporter = Exporter::new(typeface.clone(), sink.clone());
    let mut session = Session::new(CardKind::Onboarding, typeface, exporter, notifier.clone())
        .with_directory(dir, Duration::from_millis(500));

    session.set_text(Field::Name, "Lena Park");
    let outcome = session.lookup_manager("Ann Lee").await;
    assert!(matches!(outcome, LookupOutcome::Applied(_)));

    let artifact = session.download().await.unwrap();
    assert_eq!(artifact.file_name, "welcome-Lena Park.png");
    assert_eq!((artifact.width, artifact.height), (1600, 1620));
    assert_eq!(sink.files().len(), 1);
}
