use std::sync::Arc;

use fitscan::crawler::{BrowsingSession, SessionOptions};
use fitscan::stream::spawn_search;
use fitscan::{
    Browser, CancellationRegistry, CatalogTarget, ConfigLoadError, CrawlError, CrawlerConfig,
    EventKind, FitscanConfig, ListingRecord, MatchConfig, MatchError, Matcher, MeasurementPair,
    MemoryBrowser, MemoryCatalog, SearchCoordinator, SearchEvent, SearchRequest, SearchSettings,
    Terminal, ToleranceSpec, Validated,
};
use futures::StreamExt;
use serde_json::json;

const SELLER_PAGE: &str = "https://www.depop.com/vintagevault/?sort=recent&groups=tops&gender=male";

fn request(value: serde_json::Value) -> SearchRequest {
    serde_json::from_value(value).unwrap()
}

fn coordinator(browser: Arc<dyn Browser>) -> SearchCoordinator {
    SearchCoordinator::new(
        browser,
        Arc::new(CancellationRegistry::default()),
        CrawlerConfig::default(),
        SearchSettings::default(),
    )
}

fn seller_search(search_id: &str) -> fitscan::ValidatedSearch {
    let validated = request(json!({
        "measurements": {"first": 22},
        "seller": "vintagevault",
        "searchId": search_id
    }))
    .validate(&SearchSettings::default())
    .unwrap();
    match validated {
        Validated::Search(search) => search,
        other => panic!("expected a search, got {other:?}"),
    }
}

#[test]
fn non_numeric_measurement_names_its_field() {
    let err = request(json!({"measurements": {"first": "twenty"}}))
        .validate(&SearchSettings::default())
        .unwrap_err();
    assert_eq!(err.field(), "measurements.first");
    assert!(err.to_string().contains("twenty"));
}

#[test]
fn negative_and_fractional_counts_are_rejected() {
    let settings = SearchSettings::default();

    let err = request(json!({"lengthTolerance": -1}))
        .validate(&settings)
        .unwrap_err();
    assert_eq!(err.field(), "lengthTolerance");

    let err = request(json!({"maxItems": 2.5}))
        .validate(&settings)
        .unwrap_err();
    assert_eq!(err.field(), "maxItems");

    let err = request(json!({"maxScrolls": "lots"}))
        .validate(&settings)
        .unwrap_err();
    assert_eq!(err.field(), "maxScrolls");
}

#[test]
fn rejected_request_opens_no_session() {
    let browser = MemoryBrowser::new(MemoryCatalog::new());
    let counters = browser.counters();

    let result = request(json!({"p2pTolerance": "wide"})).validate(&SearchSettings::default());
    assert!(result.is_err());
    assert_eq!(counters.opened(), 0);
}

#[test]
fn missing_listing_is_not_fatal() {
    let links = [
        "https://www.depop.com/products/a/",
        "https://www.depop.com/products/gone/",
        "https://www.depop.com/products/b/",
    ];
    let catalog = MemoryCatalog::new()
        .with_page(SELLER_PAGE, vec![links.to_vec()])
        .with_listing(ListingRecord::new(links[0], "pit to pit 22"))
        .with_listing(ListingRecord::new(links[2], "p2p 22.5\""));
    let coordinator = coordinator(Arc::new(MemoryBrowser::new(catalog)));

    let mut events: Vec<SearchEvent> = Vec::new();
    let outcome = coordinator.run(seller_search("skip"), &mut events);

    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.matches, 2);
    assert!(!events
        .iter()
        .any(|e| matches!(e.kind, EventKind::Error { .. })));
}

#[test]
fn crawl_errors_become_error_events() {
    let catalog = MemoryCatalog::new().with_failing_page(SELLER_PAGE);
    let coordinator = coordinator(Arc::new(MemoryBrowser::new(catalog)));

    let mut events: Vec<SearchEvent> = Vec::new();
    let outcome = coordinator.run(seller_search("nav"), &mut events);

    assert_eq!(outcome.terminal, Terminal::Error);
    let last = events.last().unwrap();
    match &last.kind {
        EventKind::Error { message } => assert!(message.contains(SELLER_PAGE), "{message}"),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(last.search_id.as_deref(), Some("nav"));
}

#[test]
fn invalid_tolerance_is_a_match_error() {
    let config = MatchConfig::new(
        MeasurementPair::new(Some(22.0), None),
        ToleranceSpec::new(f64::NAN, 0.5),
    );
    assert!(matches!(Matcher::new(config), Err(MatchError::InvalidConfig(_))));
}

#[test]
fn catalog_errors_are_reported() {
    assert!(matches!(
        MemoryCatalog::from_json("{ not json"),
        Err(CrawlError::Catalog(_))
    ));
    assert!(matches!(
        MemoryCatalog::from_path("/definitely/not/here.json"),
        Err(CrawlError::Catalog(_))
    ));
}

#[test]
fn profile_errors() {
    assert!(matches!(
        FitscanConfig::from_yaml("version: \"2.0\"\n"),
        Err(ConfigLoadError::UnsupportedVersion(v)) if v == "2.0"
    ));

    let err = FitscanConfig::from_yaml(
        "version: \"1.0\"\nsearch:\n  default_p2p_tolerance: -3.0\n",
    )
    .unwrap_err();
    assert!(matches!(&err, ConfigLoadError::Validation(msg) if msg.starts_with("search: ")));

    let err = FitscanConfig::from_yaml(
        "version: \"1.0\"\ncrawler:\n  base_url: \"not a url\"\n",
    )
    .unwrap_err();
    assert!(matches!(&err, ConfigLoadError::Validation(msg) if msg.starts_with("crawler: ")));

    assert!(matches!(
        FitscanConfig::from_yaml("version: [unclosed"),
        Err(ConfigLoadError::YamlParse(_))
    ));
}

struct PanickingBrowser;

impl Browser for PanickingBrowser {
    fn open_session(
        &self,
        _options: &SessionOptions,
    ) -> Result<Box<dyn BrowsingSession>, CrawlError> {
        panic!("browser crashed");
    }
}

#[tokio::test]
async fn worker_panic_ends_the_stream_with_an_error() {
    let coordinator = Arc::new(coordinator(Arc::new(PanickingBrowser)));
    let search = seller_search("boom");
    assert!(matches!(search.target, CatalogTarget::Seller { .. }));

    let events: Vec<SearchEvent> = spawn_search(Arc::clone(&coordinator), search)
        .collect()
        .await;

    assert_eq!(events.first().map(SearchEvent::name), Some("hello"));
    match &events.last().unwrap().kind {
        EventKind::Error { message } => assert!(message.contains("browser crashed")),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(coordinator.registry().is_empty());
}
