//! Crawl behavior over an in-memory site
//!
//! These tests run the full worker pool against [`FakeSite`] and check the
//! resulting report.

use crate::support::FakeSite;
use link_ledger::crawler::{CrawlReport, Orchestrator, VisitStatus};
use link_ledger::url::{CrawlRules, LinkKind, SkipReason};
use link_ledger::CrawlError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const START: &str = "https://site.test/";

fn rules() -> CrawlRules {
    CrawlRules::new(START, &[r"^.*?/login", r"^.*?/logout"]).unwrap()
}

async fn run(site: Arc<FakeSite>, rules: CrawlRules, workers: usize) -> CrawlReport {
    let orchestrator = Orchestrator::new(rules, site)
        .with_workers(workers)
        .with_page_timeout(Duration::from_secs(5));

    tokio::time::timeout(Duration::from_secs(20), orchestrator.run())
        .await
        .expect("crawl did not terminate")
        .expect("crawl failed")
}

fn status_of(report: &CrawlReport, url: &str) -> VisitStatus {
    report
        .record(url)
        .unwrap_or_else(|| panic!("no record for {}", url))
        .status
}

#[tokio::test]
async fn test_end_to_end_site_scenario() {
    let site = Arc::new(
        FakeSite::new()
            .page(
                START,
                r#"<a href="/a">A</a>
                   <a href="https://other.test/x">X</a>
                   <img src="/img.png">"#,
            )
            .page("https://site.test/a", "<p>leaf</p>")
            .image("https://site.test/img.png", 200),
    );

    let report = run(site.clone(), rules(), 5).await;

    let start = report.record(START).unwrap();
    assert_eq!(start.kind, LinkKind::Anchor);
    assert_eq!(start.status, VisitStatus::Ok);
    // Counts are taken before classification, so the external link counts.
    assert_eq!(start.anchor_links, 2);
    assert_eq!(start.image_links, 1);

    let a = report.record("https://site.test/a").unwrap();
    assert_eq!(a.kind, LinkKind::Anchor);
    assert_eq!(a.status, VisitStatus::Ok);

    let img = report.record("https://site.test/img.png").unwrap();
    assert_eq!(img.kind, LinkKind::Image);
    assert_eq!(img.status, VisitStatus::Ok);

    assert_eq!(status_of(&report, "https://other.test/x"), VisitStatus::Skipped);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].url.as_str(), "https://other.test/x");
    assert_eq!(report.skipped[0].reason, SkipReason::ExternalDomain);
    assert_eq!(
        report.skipped[0].parent.as_ref().map(|p| p.as_str()),
        Some(START)
    );

    assert!(report.broken.is_empty());
    assert_eq!(site.calls_to("https://other.test/x"), 0);
    assert_eq!(report.pages().len(), 2);
    assert_eq!(report.images().len(), 1);
}

#[tokio::test]
async fn test_each_url_processed_once() {
    let site = Arc::new(
        FakeSite::new()
            .page(
                START,
                r#"<a href="/a">A</a><a href="/b">B</a><a href="/a#top">A again</a>
                   <img src="/logo.png"><img src="/logo.png">"#,
            )
            .page(
                "https://site.test/a",
                r#"<a href="/">home</a><a href="/b">B</a><img src="/logo.png">"#,
            )
            .page(
                "https://site.test/b",
                r#"<a href="/a">A</a><a href="/">home</a><img src="/logo.png">"#,
            )
            .image("https://site.test/logo.png", 200),
    );

    let report = run(site.clone(), rules(), 5).await;

    assert_eq!(report.records.len(), 4);
    for url in [
        START,
        "https://site.test/a",
        "https://site.test/b",
        "https://site.test/logo.png",
    ] {
        assert_eq!(site.calls_to(url), 1, "{} processed more than once", url);
        assert_eq!(status_of(&report, url), VisitStatus::Ok);
    }

    let unique: HashSet<_> = report.records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(unique.len(), report.records.len());
}

/// Ring of pages with chords back to the start and a few shared images
fn ring_site(pages: usize) -> FakeSite {
    let mut site = FakeSite::new().page(START, r#"<a href="/p0">first</a>"#);
    for i in 0..pages {
        let html = format!(
            r#"<a href="/p{next}">next</a>
               <a href="/p{chord}">chord</a>
               <a href="/">home</a>
               <img src="/img{img}.png">"#,
            next = (i + 1) % pages,
            chord = (i * 7) % pages,
            img = i % 5,
        );
        site = site.page(&format!("https://site.test/p{}", i), &html);
    }
    for i in 0..5 {
        site = site.image(&format!("https://site.test/img{}.png", i), 200);
    }
    site
}

async fn assert_ring_terminates(workers: usize) {
    let site = Arc::new(ring_site(40));
    let report = run(site.clone(), rules(), workers).await;

    assert_eq!(report.records.len(), 1 + 40 + 5);
    assert_eq!(report.pages().len(), 41);
    assert_eq!(report.images().len(), 5);
    assert!(report.broken.is_empty());
    assert_eq!(site.calls().len(), report.records.len());
    assert!(report
        .records
        .iter()
        .all(|r| r.status == VisitStatus::Ok));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminates_with_one_worker() {
    assert_ring_terminates(1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminates_with_five_workers() {
    assert_ring_terminates(5).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminates_with_fifty_workers() {
    assert_ring_terminates(50).await;
}

#[tokio::test]
async fn test_single_page_site_terminates() {
    let site = Arc::new(FakeSite::new().page(START, "<p>nothing to see</p>"));
    let report = run(site, rules(), 50).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(status_of(&report, START), VisitStatus::Ok);
}

#[tokio::test]
async fn test_broken_pages_and_images() {
    let site = Arc::new(
        FakeSite::new()
            .page(
                START,
                r#"<a href="/missing">gone</a>
                   <a href="/down">down</a>
                   <img src="/broken.png">"#,
            )
            .error_page(
                "https://site.test/missing",
                404,
                r#"<a href="/hidden">only linked from an error page</a>"#,
            )
            .unreachable("https://site.test/down")
            .image("https://site.test/broken.png", 404)
            .page("https://site.test/hidden", "<p>hidden</p>"),
    );

    let report = run(site.clone(), rules(), 3).await;

    for url in [
        "https://site.test/missing",
        "https://site.test/down",
        "https://site.test/broken.png",
    ] {
        let record = report.record(url).unwrap();
        assert_eq!(record.status, VisitStatus::Broken, "{}", url);
        assert_eq!(record.anchor_links, 0);
        assert_eq!(record.image_links, 0);
    }

    // Error pages contribute no children.
    assert!(report.record("https://site.test/hidden").is_none());
    assert_eq!(site.calls_to("https://site.test/hidden"), 0);

    let broken: HashSet<_> = report.broken.iter().map(|b| b.url.to_string()).collect();
    assert_eq!(broken.len(), 3);
    assert!(report
        .broken
        .iter()
        .all(|b| b.parent.as_ref().map(|p| p.as_str()) == Some(START)));

    // Broken pages still appear in the visited report.
    assert_eq!(report.pages().len(), 3);
    assert_eq!(report.images().len(), 1);
}

#[tokio::test]
async fn test_broken_start_page_ends_crawl() {
    let site = Arc::new(FakeSite::new().unreachable(START));
    let report = run(site, rules(), 5).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(status_of(&report, START), VisitStatus::Broken);
    assert_eq!(report.broken.len(), 1);
    assert!(report.broken[0].parent.is_none());
}

#[tokio::test]
async fn test_excluded_and_external_never_dispatched() {
    let site = Arc::new(
        FakeSite::new()
            .page(
                START,
                r#"<a href="/logout">log out</a>
                   <a href="/account/login?next=/">log in</a>
                   <a href="https://cdn.elsewhere.test/doc">external</a>
                   <img src="https://cdn.elsewhere.test/pixel.gif">
                   <a href="https://www.site.test/about">subdomain</a>"#,
            )
            .page("https://www.site.test/about", "<p>about</p>"),
    );

    let report = run(site.clone(), rules(), 4).await;

    for url in [
        "https://site.test/logout",
        "https://site.test/account/login?next=/",
        "https://cdn.elsewhere.test/doc",
        "https://cdn.elsewhere.test/pixel.gif",
    ] {
        assert_eq!(site.calls_to(url), 0, "{} was dispatched", url);
        assert_eq!(status_of(&report, url), VisitStatus::Skipped);
    }

    // Host containment lets subdomains through.
    assert_eq!(status_of(&report, "https://www.site.test/about"), VisitStatus::Ok);

    let reasons: Vec<_> = report
        .skipped
        .iter()
        .map(|s| (s.url.to_string(), s.reason))
        .collect();
    assert!(reasons.contains(&(
        "https://site.test/logout".to_string(),
        SkipReason::ExcludedPattern
    )));
    assert!(reasons.contains(&(
        "https://cdn.elsewhere.test/pixel.gif".to_string(),
        SkipReason::ExternalDomain
    )));
    assert_eq!(report.skipped.len(), 4);
    assert!(report.pages().iter().all(|r| r.status != VisitStatus::Skipped));
}

#[tokio::test]
async fn test_start_url_exempt_from_exclusion() {
    let start = "https://site.test/login";
    let site = Arc::new(
        FakeSite::new()
            .page(
                start,
                r#"<a href="/login?next=/home">retry</a><a href="/home">home</a>"#,
            )
            .page("https://site.test/home", "<p>home</p>"),
    );
    let rules = CrawlRules::new(start, &[r"^.*/login"]).unwrap();

    let report = run(site.clone(), rules, 2).await;

    assert_eq!(status_of(&report, start), VisitStatus::Ok);
    assert_eq!(status_of(&report, "https://site.test/home"), VisitStatus::Ok);
    assert_eq!(
        status_of(&report, "https://site.test/login?next=/home"),
        VisitStatus::Skipped
    );
    assert_eq!(site.calls_to(start), 1);
}

#[tokio::test]
async fn test_ok_page_enqueues_every_target() {
    let site = Arc::new(
        FakeSite::new()
            .page(
                START,
                r#"<a href="/one">1</a><a href="/two">2</a><a href="/three">3</a>
                   <img src="/a.png"><img src="/b.png">"#,
            )
            .page("https://site.test/one", "")
            .page("https://site.test/two", "")
            .page("https://site.test/three", "")
            .image("https://site.test/a.png", 200)
            .image("https://site.test/b.png", 200),
    );

    let report = run(site, rules(), 1).await;

    assert_eq!(report.records.len(), 6);
    let children: Vec<_> = report.records.iter().skip(1).collect();
    assert_eq!(
        children
            .iter()
            .filter(|r| r.kind == LinkKind::Anchor)
            .count(),
        3
    );
    assert_eq!(
        children.iter().filter(|r| r.kind == LinkKind::Image).count(),
        2
    );
}

#[tokio::test]
async fn test_runs_are_independent() {
    let site = Arc::new(FakeSite::new().page(START, r#"<a href="/a">A</a>"#).page(
        "https://site.test/a",
        "",
    ));
    let orchestrator = Orchestrator::new(rules(), site.clone()).with_workers(2);

    let first = orchestrator.run().await.unwrap();
    let second = orchestrator.run().await.unwrap();

    assert_eq!(first.records.len(), 2);
    assert_eq!(second.records.len(), 2);
    assert_eq!(site.calls().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_panic_aborts_run() {
    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    let mut site = FakeSite::new().page(START, &links);
    for i in 0..20 {
        let url = format!("https://site.test/p{}", i);
        site = if i == 3 {
            site.panics_on(&url)
        } else {
            site.page(&url, r#"<a href="/">home</a>"#)
        };
    }

    let orchestrator = Orchestrator::new(rules(), Arc::new(site)).with_workers(5);
    let result = tokio::time::timeout(Duration::from_secs(10), orchestrator.run())
        .await
        .expect("aborted crawl did not return");

    match result {
        Err(CrawlError::WorkerPanicked(message)) => {
            assert!(message.contains("renderer bug"), "{}", message)
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(report) => panic!("crawl completed with {} records", report.records.len()),
    }
}
