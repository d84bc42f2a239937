//! End-to-end search runs against scripted catalogs.
//!
//! Each scenario drives the coordinator synchronously with an in-memory
//! browser and inspects the exact event sequence it emits.

use std::sync::Arc;

use fitscan::crawler::{SessionCounters, DEFAULT_BROWSE_URL};
use fitscan::stream::{Phase, SinkClosed};
use fitscan::{
    CancellationRegistry, CatalogTarget, CrawlerConfig, EventKind, FnSink, ListingRecord,
    MemoryBrowser, MemoryCatalog, MeasurementPair, SearchCoordinator, SearchEvent,
    SearchSettings, SessionOptions, Terminal, ToleranceSpec, ValidatedSearch,
};

const SELLER_PAGE: &str = "https://www.depop.com/vintagevault/?sort=recent&groups=tops&gender=male";

fn product(i: usize) -> String {
    format!("https://www.depop.com/products/item-{i}/")
}

fn products(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(product).collect()
}

fn fitting(i: usize) -> ListingRecord {
    ListingRecord::new(product(i), "Boxy tee. Pit to pit 22\" length 28\"")
}

fn too_small(i: usize) -> ListingRecord {
    ListingRecord::new(product(i), "p2p 18 / length 25")
}

fn seller_search(search_id: Option<&str>) -> ValidatedSearch {
    ValidatedSearch {
        targets: MeasurementPair::new(Some(22.0), Some(28.0)),
        tolerance: ToleranceSpec::new(1.0, 0.5),
        target: CatalogTarget::from_seller(Some("vintagevault"), "tops", "male"),
        max_items: 40,
        max_links: 1000,
        max_scrolls: 8,
        session: SessionOptions::default(),
        search_id: search_id.map(str::to_string),
    }
}

fn browse_search(search_id: Option<&str>) -> ValidatedSearch {
    ValidatedSearch {
        target: CatalogTarget::Browse,
        ..seller_search(search_id)
    }
}

struct Harness {
    coordinator: SearchCoordinator,
    counters: SessionCounters,
}

fn harness(catalog: MemoryCatalog) -> Harness {
    let browser = MemoryBrowser::new(catalog);
    let counters = browser.counters();
    let coordinator = SearchCoordinator::new(
        Arc::new(browser),
        Arc::new(CancellationRegistry::default()),
        CrawlerConfig::default(),
        SearchSettings::default(),
    );
    Harness {
        coordinator,
        counters,
    }
}

fn names(events: &[SearchEvent]) -> Vec<&'static str> {
    events.iter().map(SearchEvent::name).collect()
}

fn item_progress(events: &[SearchEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Progress { phase: None, .. }))
        .count()
}

fn count(events: &[SearchEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}

#[test]
fn zero_links_reaches_done() {
    let h = harness(MemoryCatalog::new().with_page(SELLER_PAGE, Vec::<Vec<String>>::new()));
    let mut events: Vec<SearchEvent> = Vec::new();

    let outcome = h.coordinator.run(seller_search(Some("z")), &mut events);

    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(names(&events), vec!["hello", "progress", "meta", "done"]);
    assert_eq!(
        events[2].kind,
        EventKind::Meta {
            links: Some(0),
            seller: Some("vintagevault".into())
        }
    );
    assert_eq!(count(&events, "match"), 0);
    assert_eq!(item_progress(&events), 0);
}

#[test]
fn seller_run_reports_matches_in_order() {
    let catalog = MemoryCatalog::new()
        .with_page(SELLER_PAGE, vec![products(0..2), products(2..4)])
        .with_listing(fitting(0))
        .with_listing(too_small(1))
        .with_listing(fitting(3));
    let h = harness(catalog);
    let mut events: Vec<SearchEvent> = Vec::new();

    let outcome = h.coordinator.run(seller_search(Some("s1")), &mut events);

    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!((outcome.processed, outcome.matches), (4, 2));
    assert_eq!(
        names(&events),
        vec![
            "hello", "progress", "meta", "match", "progress", "progress", "progress", "match",
            "progress", "done"
        ]
    );
    assert!(events.iter().all(|e| e.search_id.as_deref() == Some("s1")));

    // Item 2 is not in the catalog: it counts as processed, nothing else.
    match &events[8].kind {
        EventKind::Progress {
            processed,
            total,
            matches,
            ..
        } => assert_eq!((*processed, *total, *matches), (4, Some(4), 2)),
        other => panic!("unexpected {other:?}"),
    }
    match &events[3].kind {
        EventKind::Match { item, seller } => {
            assert_eq!(item.url, product(0));
            assert_eq!(item.p2p, Some(22.0));
            assert_eq!(*seller, None);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn cancel_between_third_and_fourth_unit() {
    let mut catalog = MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..10)]);
    for i in 0..10 {
        catalog = catalog.with_listing(too_small(i));
    }
    let h = harness(catalog);
    let registry = Arc::clone(h.coordinator.registry());

    let mut events: Vec<SearchEvent> = Vec::new();
    let mut sink = FnSink(|event: SearchEvent| {
        let third_done = matches!(
            event.kind,
            EventKind::Progress {
                phase: None,
                processed: 3,
                ..
            }
        );
        events.push(event);
        if third_done {
            registry.cancel("c1");
        }
        Ok::<(), SinkClosed>(())
    });

    let outcome = h.coordinator.run(seller_search(Some("c1")), &mut sink);
    drop(sink);

    assert_eq!(outcome.terminal, Terminal::Cancelled);
    assert_eq!(outcome.processed, 3);
    assert_eq!(item_progress(&events), 3);
    assert_eq!(events.last().map(SearchEvent::name), Some("cancelled"));
    assert_eq!(count(&events, "cancelled"), 1);
    assert_eq!(h.counters.fetched(), 3);
    assert!(!h.coordinator.registry().is_cancelled("c1"));
    assert!(h.coordinator.registry().is_empty());
}

#[test]
fn max_items_stops_after_first_match() {
    let mut catalog = MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..5)]);
    for i in 0..5 {
        catalog = catalog.with_listing(fitting(i));
    }
    let h = harness(catalog);
    let mut events: Vec<SearchEvent> = Vec::new();

    let search = ValidatedSearch {
        max_items: 1,
        ..seller_search(None)
    };
    let outcome = h.coordinator.run(search, &mut events);

    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(count(&events, "match"), 1);
    assert_eq!(
        names(&events),
        vec!["hello", "progress", "meta", "match", "progress", "done"]
    );
    assert_eq!(h.counters.fetched(), 1);
}

#[test]
fn landing_failure_is_one_error() {
    let h = harness(MemoryCatalog::new().with_failing_page(SELLER_PAGE));
    let mut events: Vec<SearchEvent> = Vec::new();

    let outcome = h.coordinator.run(seller_search(Some("f")), &mut events);

    assert_eq!(outcome.terminal, Terminal::Error);
    assert_eq!(names(&events), vec!["hello", "error"]);
    match &events[1].kind {
        EventKind::Error { message } => assert!(message.contains("scripted failure")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(h.counters.closed(), 1);
    assert!(h.coordinator.registry().is_empty());
}

#[test]
fn session_open_failure_is_one_error() {
    let h = harness(MemoryCatalog::new().with_open_error("no browser available"));
    let mut events: Vec<SearchEvent> = Vec::new();

    let outcome = h.coordinator.run(seller_search(None), &mut events);

    assert_eq!(outcome.terminal, Terminal::Error);
    assert_eq!(names(&events), vec!["hello", "error"]);
    assert_eq!(h.counters.opened(), 0);
}

#[test]
fn browse_stops_after_two_empty_scans() {
    let mut catalog = MemoryCatalog::new().with_page(
        DEFAULT_BROWSE_URL,
        vec![products(0..3), products(3..5)],
    );
    for i in 0..5 {
        catalog = catalog.with_listing(too_small(i));
    }
    let h = harness(catalog);
    let mut events: Vec<SearchEvent> = Vec::new();

    let outcome = h.coordinator.run(browse_search(Some("b")), &mut events);

    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(outcome.processed, 5);
    assert_eq!(h.counters.fetched(), 5);
    assert_eq!(
        events[1].kind,
        EventKind::Progress {
            phase: Some(Phase::Browsing),
            processed: 0,
            total: None,
            matches: 0
        }
    );
    assert_eq!(
        events[2].kind,
        EventKind::Meta {
            links: None,
            seller: None
        }
    );
    assert!(events.iter().all(|e| match &e.kind {
        EventKind::Progress { phase: None, total, .. } => total.is_none(),
        _ => true,
    }));
}

#[test]
fn browse_respects_max_links() {
    let catalog = MemoryCatalog::new().with_page(DEFAULT_BROWSE_URL, vec![products(0..10)]);
    let h = harness(catalog);
    let mut events: Vec<SearchEvent> = Vec::new();

    let search = ValidatedSearch {
        max_links: 4,
        ..browse_search(None)
    };
    let outcome = h.coordinator.run(search, &mut events);

    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(outcome.processed, 4);
    assert_eq!(item_progress(&events), 4);
}

#[test]
fn sold_count_heuristic_applies_only_in_browse_mode() {
    let established = |i: usize, sold: Option<u32>| ListingRecord {
        seller: Some(format!("shop{i}")),
        sold_count: sold,
        ..fitting(i)
    };
    let catalog = MemoryCatalog::new()
        .with_page(SELLER_PAGE, vec![products(0..3)])
        .with_page(DEFAULT_BROWSE_URL, vec![products(0..3)])
        .with_listing(established(0, Some(51)))
        .with_listing(established(1, Some(50)))
        .with_listing(established(2, None));
    let h = harness(catalog);

    let mut seller_events: Vec<SearchEvent> = Vec::new();
    let seller = h.coordinator.run(seller_search(None), &mut seller_events);
    assert_eq!(seller.matches, 3);

    let mut browse_events: Vec<SearchEvent> = Vec::new();
    let browse = h.coordinator.run(browse_search(None), &mut browse_events);
    assert_eq!(browse.matches, 1);

    let matched: Vec<_> = browse_events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::Match { item, seller } => Some((item.url.clone(), seller.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(matched, vec![(product(0), Some("shop0".to_string()))]);
}

#[test]
fn every_run_closes_its_session_once() {
    let catalog = MemoryCatalog::new()
        .with_page(SELLER_PAGE, vec![products(0..2)])
        .with_failing_page(DEFAULT_BROWSE_URL)
        .with_listing(fitting(0));
    let h = harness(catalog);

    h.coordinator.run(seller_search(None), &mut Vec::<SearchEvent>::new());
    h.coordinator.run(browse_search(None), &mut Vec::<SearchEvent>::new());
    let search = ValidatedSearch {
        max_items: 1,
        ..seller_search(None)
    };
    h.coordinator.run(search, &mut Vec::<SearchEvent>::new());

    assert_eq!(h.counters.opened(), 3);
    assert_eq!(h.counters.closed(), 3);
}

#[test]
fn cancel_before_start_is_honoured() {
    let h = harness(MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..3)]));
    assert!(!h.coordinator.registry().cancel("early"));

    let mut events: Vec<SearchEvent> = Vec::new();
    let outcome = h.coordinator.run(seller_search(Some("early")), &mut events);

    assert_eq!(outcome.terminal, Terminal::Cancelled);
    assert_eq!(names(&events), vec!["hello", "cancelled"]);
    assert_eq!(h.counters.fetched(), 0);
    assert!(h.coordinator.registry().is_empty());
}

#[test]
fn double_cancel_is_a_single_cancellation() {
    let mut catalog = MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..5)]);
    for i in 0..5 {
        catalog = catalog.with_listing(too_small(i));
    }
    let h = harness(catalog);
    let registry = Arc::clone(h.coordinator.registry());

    let mut events: Vec<SearchEvent> = Vec::new();
    let mut sink = FnSink(|event: SearchEvent| {
        if event.name() == "meta" {
            assert!(registry.cancel("twice"));
            assert!(registry.cancel("twice"));
        }
        events.push(event);
        Ok::<(), SinkClosed>(())
    });
    h.coordinator.run(seller_search(Some("twice")), &mut sink);
    drop(sink);

    assert_eq!(count(&events, "cancelled"), 1);
    assert_eq!(item_progress(&events), 0);
}

#[test]
fn disconnected_consumer_stops_the_run() {
    let mut catalog = MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..10)]);
    for i in 0..10 {
        catalog = catalog.with_listing(too_small(i));
    }
    let h = harness(catalog);

    let mut delivered = 0;
    let mut sink = FnSink(|_event: SearchEvent| {
        if delivered == 4 {
            return Err(SinkClosed);
        }
        delivered += 1;
        Ok(())
    });
    let outcome = h.coordinator.run(seller_search(Some("gone")), &mut sink);
    drop(sink);

    assert_eq!(outcome.terminal, Terminal::Cancelled);
    assert_eq!(delivered, 4);
    assert!(h.counters.fetched() <= 2);
    assert_eq!(h.counters.closed(), 1);
    assert!(h.coordinator.registry().is_empty());
}

#[test]
fn late_cancel_does_not_stop_a_rerun_with_the_same_id() {
    let mut catalog = MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..2)]);
    for i in 0..2 {
        catalog = catalog.with_listing(fitting(i));
    }
    let h = harness(catalog);

    let mut first: Vec<SearchEvent> = Vec::new();
    let outcome = h.coordinator.run(seller_search(Some("x")), &mut first);
    assert_eq!(outcome.terminal, Terminal::Done);

    assert!(!h.coordinator.registry().cancel("x"));
    assert!(h.coordinator.registry().is_empty());

    let mut second: Vec<SearchEvent> = Vec::new();
    let outcome = h.coordinator.run(seller_search(Some("x")), &mut second);
    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(outcome.matches, 2);
    assert_eq!(count(&second, "cancelled"), 0);
}

#[test]
fn cancel_flood_for_unknown_ids_stays_bounded() {
    let h = harness(MemoryCatalog::new().with_page(SELLER_PAGE, vec![products(0..1)]));
    let registry = h.coordinator.registry();
    let cap = SearchSettings::default().max_pending_cancels;

    for i in 0..(cap * 4) {
        registry.cancel(&format!("ghost-{i}"));
    }
    assert_eq!(registry.len(), cap);
    assert_eq!(registry.active_count(), 0);

    let mut events: Vec<SearchEvent> = Vec::new();
    let outcome = h.coordinator.run(seller_search(Some("real")), &mut events);
    assert_eq!(outcome.terminal, Terminal::Done);
    assert_eq!(registry.len(), cap);
}
