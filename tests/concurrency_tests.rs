//! Concurrency and thread safety tests for fitscan

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fitscan::stream::{spawn_search, SinkClosed};
use fitscan::{
    CancellationRegistry, CatalogTarget, CrawlerConfig, EventKind, FnSink, ListingRecord,
    MeasurementPair, MeasurementParser, MemoryBrowser, MemoryCatalog, SearchCoordinator,
    SearchEvent, SearchSettings, SessionOptions, Terminal, ToleranceSpec, ValidatedSearch,
};
use futures::StreamExt;

fn seller_page(seller: &str) -> String {
    format!("https://www.depop.com/{seller}/?sort=recent&groups=tops&gender=male")
}

fn product(seller: &str, i: usize) -> String {
    format!("https://www.depop.com/products/{seller}-{i}/")
}

fn search(seller: &str, search_id: &str) -> ValidatedSearch {
    ValidatedSearch {
        targets: MeasurementPair::new(Some(22.0), None),
        tolerance: ToleranceSpec::new(1.0, 0.5),
        target: CatalogTarget::from_seller(Some(seller), "tops", "male"),
        max_items: 40,
        max_links: 1000,
        max_scrolls: 8,
        session: SessionOptions::default(),
        search_id: Some(search_id.to_string()),
    }
}

/// Catalog with `n` sellers, each with `per_seller` matching listings.
fn catalog(sellers: &[&str], per_seller: usize) -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    for seller in sellers {
        let links: Vec<String> = (0..per_seller).map(|i| product(seller, i)).collect();
        catalog = catalog.with_page(seller_page(seller), vec![links]);
        for i in 0..per_seller {
            catalog = catalog.with_listing(ListingRecord::new(product(seller, i), "p2p 22.5"));
        }
    }
    catalog
}

fn coordinator(catalog: MemoryCatalog) -> Arc<SearchCoordinator> {
    Arc::new(SearchCoordinator::new(
        Arc::new(MemoryBrowser::new(catalog)),
        Arc::new(CancellationRegistry::default()),
        CrawlerConfig::default(),
        SearchSettings::default(),
    ))
}

#[test]
fn concurrent_extraction_is_consistent() {
    let text = "Pit to pit 21 1/2\" / length 28.5in";
    let expected = MeasurementParser::new().extract(text);

    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(move || MeasurementParser::new().extract(text)))
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn registry_survives_concurrent_register_cancel_unregister() {
    let registry = Arc::new(CancellationRegistry::default());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..200 {
                    let id = format!("t{t}-{i}");
                    registry.register(&id);
                    assert!(!registry.is_cancelled(&id));
                    assert!(registry.cancel(&id));
                    assert!(registry.is_cancelled(&id));
                    assert!(registry.unregister(&id));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(registry.is_empty());
}

#[test]
fn cancelling_one_search_leaves_others_running() {
    let sellers = ["alpha", "bravo", "charlie", "delta"];
    let coordinator = coordinator(catalog(&sellers, 6));

    let handles: Vec<_> = sellers
        .iter()
        .map(|seller| {
            let coordinator = Arc::clone(&coordinator);
            let seller = seller.to_string();
            thread::spawn(move || {
                let registry = Arc::clone(coordinator.registry());
                let mut events: Vec<SearchEvent> = Vec::new();
                let mut sink = FnSink(|event: SearchEvent| {
                    // "bravo" cancels itself after its first match
                    if seller == "bravo" && event.name() == "match" {
                        registry.cancel("bravo");
                    }
                    events.push(event);
                    Ok::<(), SinkClosed>(())
                });
                let outcome = coordinator.run(search(&seller, &seller), &mut sink);
                drop(sink);
                (seller, outcome, events)
            })
        })
        .collect();

    for handle in handles {
        let (seller, outcome, events) = handle.join().unwrap();
        if seller == "bravo" {
            assert_eq!(outcome.terminal, Terminal::Cancelled);
            assert_eq!(outcome.matches, 1);
        } else {
            assert_eq!(outcome.terminal, Terminal::Done, "{seller}");
            assert_eq!(outcome.matches, 6, "{seller}");
        }
        assert!(events
            .iter()
            .all(|e| e.search_id.as_deref() == Some(seller.as_str())));
    }
    assert!(coordinator.registry().is_empty());
}

#[test]
fn duplicate_cancels_from_many_threads_are_idempotent() {
    let registry = Arc::new(CancellationRegistry::default());
    registry.register("shared");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.cancel("shared"))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(registry.is_cancelled("shared"));
    assert_eq!(registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_streams_each_end_with_one_terminal_event() {
    let sellers = ["one", "two", "three", "four", "five"];
    let coordinator = coordinator(catalog(&sellers, 4));

    let tasks: Vec<_> = sellers
        .iter()
        .map(|seller| {
            let stream = spawn_search(Arc::clone(&coordinator), search(seller, seller));
            tokio::spawn(stream.collect::<Vec<SearchEvent>>())
        })
        .collect();

    for task in tasks {
        let events = task.await.unwrap();
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert_eq!(events.last().map(SearchEvent::name), Some("done"));
        let matches = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Match { .. }))
            .count();
        assert_eq!(matches, 4);
    }

    for _ in 0..100 {
        if coordinator.registry().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(coordinator.registry().is_empty());
}
