//! Integration tests for the scraper
//!
//! These tests use wiremock to stand in for the remote site (login form,
//! route list, sector pages, route pages and overflow listings) and run the
//! full login + scrape cycle end-to-end.

use crag_leader::config::{CrawlerConfig, Credentials, UserAgentConfig};
use crag_leader::crawler::{build_http_client, Coordinator, Fetcher};
use crag_leader::model::{Discipline, Grade, NullProgress};
use crag_leader::CragError;
use chrono::Utc;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVAL_MS: u64 = 20;

fn create_fetcher(max_retries: u32) -> Fetcher {
    let client = build_http_client(&UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    })
    .expect("Failed to build client");

    Fetcher::new(
        client,
        &CrawlerConfig {
            min_request_interval: INTERVAL_MS,
            max_retries,
            retry_delay: 10,
            pipeline_retry_delay: 10,
        },
    )
}

fn credentials() -> Credentials {
    Credentials {
        username: "tester".to_string(),
        password: "secret".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn entry(climber: &str, kind: &str, date: &str) -> String {
    format!(
        r#"<div class="result-row"><a class="action" href="/climbers/{c}">{c}</a><span class="ascent-type">{k}</span><div class="date"><span>{d}</span></div></div>"#,
        c = climber,
        k = kind,
        d = date
    )
}

fn todo_entry(climber: &str) -> String {
    format!(
        r#"<div class="result-row"><a class="action" href="/climbers/{c}">{c}</a><div class="date"><span>2023-01-01</span></div></div>"#,
        c = climber
    )
}

fn route_row(name: &str, href: &str, grade: &str, ascents: u32) -> String {
    format!(
        r#"<tr><td><a href="{}">{}</a></td><td><span class="grade">{}</span></td><td><div class="rating">4.0</div></td><td>{}</td></tr>"#,
        href, name, grade, ascents
    )
}

fn sector_page(rows: &[String]) -> ResponseTemplate {
    html(&format!("<table><tbody>{}</tbody></table>", rows.join("")))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><meta name="csrf-token" content="tok123"></head><body><form></form></body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("authenticity_token=tok123"))
        .respond_with(html(r#"<div class="user-menu">tester</div>"#))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_routelist(server: &MockServer, sectors: &[(&str, &str)]) {
    let mut items = String::from(
        r#"<a class="sector-item" href="/crags/test/routelist"><div class="name">All</div></a>"#,
    );
    for (name, href) in sectors {
        items.push_str(&format!(
            r#"<a class="sector-item" href="{}"><div class="name">{}</div></a>"#,
            href, name
        ));
    }

    Mock::given(method("GET"))
        .and(path("/crags/test/routelist"))
        .respond_with(html(&items))
        .mount(server)
        .await;
}

async fn logged_in_coordinator(server: &MockServer, max_retries: u32) -> Coordinator {
    let mut coordinator = Coordinator::new(
        create_fetcher(max_retries),
        &format!("{}/crags/test", server.uri()),
        Discipline::Bouldering,
    )
    .expect("Failed to create coordinator");

    coordinator
        .login(&format!("{}/login", server.uri()), &credentials())
        .await
        .expect("Login failed");

    coordinator
}

#[tokio::test]
async fn test_full_scrape_with_overflow_and_failures() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(
        &server,
        &[
            ("North", "/crags/test/sectors/north"),
            ("South", "/crags/test/sectors/south"),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[
            route_row("Arete", "/routes/arete", "6a", 7),
            route_row("Five", "/routes/five", "5", 2),
        ]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/south"))
        .respond_with(sector_page(&[route_row("Roof", "/routes/roof", "6B", 1)]))
        .mount(&server)
        .await;

    // Arete shows five ascents and hides two behind the overflow link
    let visible: String = ["A", "B", "C", "D", "E"]
        .iter()
        .enumerate()
        .map(|(i, c)| entry(c, "Red point", &format!("2023-04-0{}", i + 1)))
        .collect();
    Mock::given(method("GET"))
        .and(path("/routes/arete"))
        .respond_with(html(&format!(
            r#"{}<div class="js-more ticks text-center"><a href="/routes/arete/ticks">More</a></div>"#,
            visible
        )))
        .mount(&server)
        .await;

    let hidden = format!("{}{}", entry("F", "flash", "2023-04-06"), entry("A", "repeat", "2023-04-07"));
    Mock::given(method("GET"))
        .and(path("/routes/arete/ticks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ticks": hidden })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/five"))
        .respond_with(html(&format!(
            "{}{}{}",
            entry("A", "onsight", "2023-05-01"),
            todo_entry("Z"),
            entry("B", "top rope", "2023-05-02")
        )))
        .mount(&server)
        .await;

    // Every attempt at Roof fails; the scrape carries on without it
    Mock::given(method("GET"))
        .and(path("/routes/roof"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 2).await;
    let outcome = coordinator
        .scrape(&mut NullProgress)
        .await
        .expect("Scrape failed");

    let crag = &outcome.crag;
    let report = &outcome.report;

    assert_eq!(crag.name, "test");
    assert_eq!(crag.boulders.len(), 2);
    assert_eq!(crag.boulders[0].name, "North");

    let arete = &crag.boulders[0].routes[0];
    assert_eq!(arete.name, "Arete");
    assert_eq!(arete.grade.as_str(), "6A");
    assert_eq!(arete.ascents.len(), 7);
    assert_eq!(arete.reported_ascents, Some(7));
    assert_eq!(arete.rating, Some(4.0));
    // Primary entries first, overflow after
    assert_eq!(arete.ascents[5].climber, "F");

    let five = &crag.boulders[0].routes[1];
    assert_eq!(five.grade.as_str(), "5");
    assert_eq!(five.ascents.len(), 2);

    assert!(crag.boulders[1].routes.is_empty());

    assert_eq!(report.boulders_seen, 2);
    assert_eq!(report.routes_seen, 3);
    assert_eq!(report.ascents_parsed, 9);
    assert_eq!(report.entries_skipped, 1);
    assert!(report.mismatches.is_empty());
    assert_eq!(report.route_failures.len(), 1);
    assert_eq!(report.route_failures[0].name, "Roof");
    assert!(report.boulder_failures.is_empty());
}

#[tokio::test]
async fn test_malformed_entry_among_five_valid() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(&server, &[("North", "/crags/test/sectors/north")]).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[route_row("Arete", "/routes/arete", "6A", 5)]))
        .mount(&server)
        .await;

    let mut entries = String::new();
    entries.push_str(&entry("A", "flash", "2023-01-01"));
    entries.push_str(&entry("B", "flash", "2023-01-02"));
    entries.push_str(&entry("C", "flash", "yesterday"));
    entries.push_str(&entry("D", "flash", "2023-01-03"));
    entries.push_str(&entry("E", "flash", "2023-01-04"));
    entries.push_str(&entry("F", "flash", "2023-01-05"));

    Mock::given(method("GET"))
        .and(path("/routes/arete"))
        .respond_with(html(&entries))
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 1).await;
    let outcome = coordinator.scrape(&mut NullProgress).await.unwrap();

    assert_eq!(outcome.crag.ascent_count(), 5);
    assert_eq!(outcome.report.entries_skipped, 1);
    assert!(outcome.report.is_complete());
}

#[tokio::test]
async fn test_count_mismatch_is_reported() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(&server, &[("North", "/crags/test/sectors/north")]).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[route_row("Arete", "/routes/arete", "6A", 3)]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/arete"))
        .respond_with(html(&entry("A", "flash", "2023-01-01")))
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 1).await;
    let outcome = coordinator.scrape(&mut NullProgress).await.unwrap();

    assert_eq!(outcome.report.mismatches.len(), 1);
    assert_eq!(outcome.report.mismatches[0].reported, 3);
    assert_eq!(outcome.report.mismatches[0].parsed, 1);
}

#[tokio::test]
async fn test_invalid_credentials_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html(r#"<meta name="csrf-token" content="tok123">"#))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(html(r#"<div class="alert">Invalid email or password</div>"#))
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(
        create_fetcher(1),
        &format!("{}/crags/test/", server.uri()),
        Discipline::Bouldering,
    )
    .unwrap();

    let result = coordinator
        .login(&format!("{}/login", server.uri()), &credentials())
        .await;

    match result {
        Err(e @ CragError::Auth(_)) => assert!(e.is_fatal()),
        other => panic!("expected an auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_expiry_aborts_scrape() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(
        &server,
        &[
            ("North", "/crags/test/sectors/north"),
            ("South", "/crags/test/sectors/south"),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    // Never reached
    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/south"))
        .respond_with(sector_page(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 3).await;
    let result = coordinator.scrape(&mut NullProgress).await;

    assert!(matches!(result, Err(CragError::Auth(_))));
}

#[tokio::test]
async fn test_missing_route_list_fails_scrape() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/routelist"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 3).await;
    let result = coordinator.scrape(&mut NullProgress).await;

    match result {
        Err(e @ CragError::Fetch(_)) => assert!(!e.is_fatal()),
        other => panic!("expected a fetch error, got {:?}", other.map(|o| o.report)),
    }
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(&server, &[("North", "/crags/test/sectors/north")]).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[route_row("Arete", "/routes/arete", "6A", 1)]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/arete"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/arete"))
        .respond_with(html(&entry("A", "flash", "2023-01-01")))
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 2).await;
    let outcome = coordinator.scrape(&mut NullProgress).await.unwrap();

    assert_eq!(outcome.crag.ascent_count(), 1);
    assert!(outcome.report.route_failures.is_empty());
}

#[tokio::test]
async fn test_requests_are_throttled() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(&server, &[("North", "/crags/test/sectors/north")]).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[
            route_row("Arete", "/routes/arete", "6A", 1),
            route_row("Slab", "/routes/slab", "5", 1),
        ]))
        .mount(&server)
        .await;

    for route in ["/routes/arete", "/routes/slab"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(&entry("A", "flash", "2023-01-01")))
            .mount(&server)
            .await;
    }

    let mut coordinator = logged_in_coordinator(&server, 1).await;
    let started = Instant::now();
    let outcome = coordinator.scrape(&mut NullProgress).await.unwrap();

    // routelist, sector, two routes
    assert_eq!(outcome.report.requests, 4);
    // The first scrape request also waits out the interval after the login POST
    assert!(started.elapsed() >= Duration::from_millis(INTERVAL_MS * 3));
}

#[tokio::test]
async fn test_routes_sharing_a_name_stay_separate() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(&server, &[("North", "/crags/test/sectors/north")]).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[
            route_row("Project", "/routes/project-left", "6A", 1),
            route_row("Project", "/routes/project-right", "7A", 1),
            // Same page listed again further down the table
            route_row("Project", "/routes/project-left", "6A", 1),
        ]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/project-left"))
        .respond_with(html(&entry("Alice", "flash", "2023-01-01")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/project-right"))
        .respond_with(html(&entry("Bob", "red point", "2023-01-02")))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = logged_in_coordinator(&server, 1).await;
    let outcome = coordinator.scrape(&mut NullProgress).await.unwrap();
    let crag = &outcome.crag;

    assert_eq!(crag.route_count(), 2);
    assert_eq!(outcome.report.routes_seen, 2);
    assert_eq!(crag.grades(), vec![Grade::new("6A"), Grade::new("7A")]);

    let right = &crag.boulders[0].routes[1];
    assert_eq!(right.name, "Project");
    assert_eq!(right.grade, Grade::new("7A"));
    assert_eq!(right.ascents.len(), 1);
    assert_eq!(right.ascents[0].climber, "Bob");
    assert!(right.url.as_deref().unwrap_or_default().ends_with("/routes/project-right"));
}

fn feed_page(items: &[(&str, &str)]) -> ResponseTemplate {
    let items: String = items
        .iter()
        .map(|(title, ago)| {
            format!(
                r#"<li class="item"><a class="climber-name" href="/climbers/a">Alice</a><div class="title">{}</div><a class="ago" href="/x">{}</a></li>"#,
                title, ago
            )
        })
        .collect();
    html(&format!(r#"<ul class="feed-items">{}</ul>"#, items))
}

#[tokio::test]
async fn test_update_check_reads_crag_feed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crags/test/"))
        .respond_with(feed_page(&[
            ("added Arete to tick list", "2 hours ago"),
            ("New photo", "5 minutes ago"),
            ("New route", "4 days ago"),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    // No login needed: the feed is public
    let mut coordinator = Coordinator::new(
        create_fetcher(1),
        &format!("{}/crags/test", server.uri()),
        Discipline::Bouldering,
    )
    .unwrap();

    let day_ago = Utc::now() - chrono::Duration::days(1);
    let check = coordinator.check_for_updates(Some(day_ago)).await.unwrap();
    assert_eq!(check.items_seen, 3);
    assert_eq!(check.updates.len(), 1);
    assert!(check.reason().contains("Alice added Arete to tick list 2 hours ago"));

    let hour_ago = Utc::now() - chrono::Duration::hours(1);
    let check = coordinator.check_for_updates(Some(hour_ago)).await.unwrap();
    assert!(!check.has_updates());
}

#[tokio::test]
async fn test_update_check_failure_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crags/test/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(
        create_fetcher(1),
        &format!("{}/crags/test", server.uri()),
        Discipline::Bouldering,
    )
    .unwrap();

    let result = coordinator.check_for_updates(None).await;
    assert!(matches!(result, Err(CragError::Fetch(_))));
}

#[tokio::test]
async fn test_login_and_scrape() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_routelist(&server, &[("North", "/crags/test/sectors/north")]).await;

    Mock::given(method("GET"))
        .and(path("/crags/test/sectors/north"))
        .respond_with(sector_page(&[route_row("Arete", "/routes/arete", "6A", 1)]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/routes/arete"))
        .respond_with(html(&entry("A", "flash", "2023-01-01")))
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(
        create_fetcher(1),
        &format!("{}/crags/test", server.uri()),
        Discipline::Bouldering,
    )
    .unwrap();

    let outcome = coordinator
        .login_and_scrape(&format!("{}/login", server.uri()), &credentials(), &mut NullProgress)
        .await
        .unwrap();

    assert_eq!(outcome.crag.ascent_count(), 1);
}
