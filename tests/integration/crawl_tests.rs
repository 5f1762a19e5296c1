//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the job site's search and detail
//! endpoints and test the full crawl cycle end-to-end.

use chrono::NaiveDate;
use job_trawler::config::{
    load_config_with_hash, ApiConfig, Config, OutputConfig, ProcessingConfig, RequestsConfig,
    SearchConfig, SearchLocation, VpnConfig,
};
use job_trawler::crawler::{run_crawl, Coordinator};
use job_trawler::description::MAX_DESCRIPTION_BYTES;
use job_trawler::listing::{Listing, ListingStatus};
use job_trawler::storage::{ListingStore, RunStatus, SqliteStorage};
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIRST_ID: i64 = 3_851_000_000;

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, db_path: &Path) -> Config {
    Config {
        search: SearchConfig {
            keywords: vec!["rust developer".to_string()],
            locations: vec![SearchLocation {
                name: "United States".to_string(),
                geo_id: "103644278".to_string(),
            }],
            experience: "2".to_string(),
            timespan: "r86400".to_string(),
            work_type: "2".to_string(),
            max_pages: 10,
            page_size: 25,
        },
        requests: RequestsConfig {
            user_agent: "JobTrawlerTest/1.0".to_string(),
            min_delay_ms: 0,
            max_delay_ms: 5,
            timeout_ms: 2_000,
        },
        vpn: VpnConfig::default(),
        processing: ProcessingConfig { enable: true },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
            logo_dir: None,
        },
        api: ApiConfig {
            search_url: format!("{}/search", server.uri()),
            detail_url: format!("{}/detail", server.uri()),
            view_url: "https://www.linkedin.com/jobs/view".to_string(),
        },
    }
}

fn search_results(ids: impl IntoIterator<Item = i64>) -> String {
    let cards: String = ids
        .into_iter()
        .map(|id| {
            format!(
                r#"<li>
                    <div class="base-card relative job-search-card" data-entity-urn="urn:li:jobPosting:{id}">
                        <h3 class="base-search-card__title">Rust Developer {id}</h3>
                        <h4 class="base-search-card__subtitle"><a>Ferris Inc</a></h4>
                        <div class="base-search-card__metadata">
                            <span class="job-search-card__location">Austin, TX</span>
                            <time class="job-search-card__listdate" datetime="2024-03-01">2 days ago</time>
                        </div>
                    </div>
                </li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", cards)
}

fn detail_page(description: &str, extra: &str) -> String {
    format!(
        r#"<html><body>
            <section class="top-card-layout">
                {extra}
                <span class="posted-time-ago__text topcard__flavor--metadata">
                    2 days ago
                </span>
                <figcaption class="num-applicants__caption">
                    Over 200 applicants
                </figcaption>
            </section>
            <div class="show-more-less-html__markup description__text description__text--rich">
                <div>{description}</div>
            </div>
        </body></html>"#
    )
}

fn long_description() -> String {
    let mut html = String::from("<p><strong>What you will bring</strong></p>\n");
    for i in 0..60 {
        html.push_str(&format!(
            "<p>Point {}: at least 5 years of production Rust, {}</p>\n",
            i,
            "tokio and friends ".repeat(12)
        ));
    }
    html
}

async fn mount_search_pages(server: &MockServer, ids: impl IntoIterator<Item = i64>) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_results(ids)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("start", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_results([])))
        .mount(server)
        .await;
}

fn seed_listing(id: i64) -> Listing {
    let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let mut listing = Listing::stub(id, "Seeded", "Ferris Inc", "Austin, TX", date);
    listing.description = "<p>Seeded earlier</p>".to_string();
    listing.meta = "3 applicants - 1 month".to_string();
    listing.url = format!("https://www.linkedin.com/jobs/view/{}", id);
    listing
}

#[tokio::test]
async fn test_full_crawl_inserts_only_new_listings() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");

    // 25 results on the first page, 20 of which are already stored
    let ids: Vec<i64> = (0..25).map(|i| FIRST_ID + i).collect();
    {
        let mut storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
        let seeded: Vec<Listing> = ids[..20].iter().copied().map(seed_listing).collect();
        assert_eq!(storage.commit_batch(&seeded).unwrap(), 20);
    }

    mount_search_pages(&mock_server, ids.clone()).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/detail/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "<p><strong>Requirements</strong></p><ul><li>3+ years of Rust</li></ul>",
            "",
        )))
        // Only the five unseen listings are ever fetched, across both runs
        .expect(5)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server, &db_path);
    let coordinator = Coordinator::new(config.clone()).expect("Failed to create coordinator");
    let summary = coordinator
        .run(&CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.listings_found, 25);
    assert_eq!(summary.listings_new, 5);
    assert_eq!(summary.listings_inserted, 5);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let stored = storage.get_all_listing_ids().unwrap();
    assert_eq!(stored.len(), 25);
    assert!(ids.iter().all(|id| stored.contains(id)));

    let fresh = storage.get_listing(FIRST_ID + 24).unwrap().unwrap();
    assert_eq!(fresh.title, "Rust Developer 3851000024");
    assert_eq!(fresh.meta, "200 applicants - 2 days");
    assert_eq!(fresh.url, "https://www.linkedin.com/jobs/view/3851000024");
    assert_eq!(fresh.status, ListingStatus::Flagged);
    assert!(fresh
        .description
        .contains(r#"id="qualifications-3851000024""#));

    let seeded = storage.get_listing(FIRST_ID).unwrap().unwrap();
    assert_eq!(seeded.title, "Seeded");

    // A second run over the same results has nothing left to insert
    let summary = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run(&CancellationToken::new())
        .await
        .expect("Second crawl failed");

    assert_eq!(summary.listings_new, 0);
    assert_eq!(summary.listings_inserted, 0);
    assert_eq!(storage.count_listings().unwrap(), 25);
}

#[tokio::test]
async fn test_long_descriptions_are_bounded() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");

    mount_search_pages(&mock_server, [FIRST_ID, FIRST_ID + 1]).await;
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", FIRST_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(detail_page(&long_description(), "")),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", FIRST_ID + 1)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "<p>Entry level, 1 year is plenty</p>",
            r#"<code id="applyUrl" style="display: none"><!--"https://careers.example.com/apply/77"--></code>"#,
        )))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server, &db_path);
    Coordinator::new(config)
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .expect("Crawl failed");

    let storage = SqliteStorage::new(&db_path).unwrap();

    let long = storage.get_listing(FIRST_ID).unwrap().unwrap();
    assert!(long.description.len() <= MAX_DESCRIPTION_BYTES);
    assert!(long.description.ends_with("[Content has been truncated]"));
    assert!(!long.description.contains('\n'));
    assert_eq!(long.status, ListingStatus::Flagged);

    let short = storage.get_listing(FIRST_ID + 1).unwrap().unwrap();
    assert_eq!(short.status, ListingStatus::Normal);
    assert_eq!(short.url, "https://careers.example.com/apply/77");
    assert!(short.description.len() <= MAX_DESCRIPTION_BYTES);
}

#[tokio::test]
async fn test_logos_are_saved_per_listing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");
    let logo_dir = dir.path().join("logos");

    mount_search_pages(&mock_server, [FIRST_ID]).await;
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", FIRST_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "<p>Rust</p>",
            &format!(
                r#"<img class="artdeco-entity-image" data-delayed-url="{}/media/logo.jpg">"#,
                mock_server.uri()
            ),
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/logo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server, &db_path);
    config.output.logo_dir = Some(logo_dir.display().to_string());
    Coordinator::new(config)
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .expect("Crawl failed");

    let logo = std::fs::read(logo_dir.join(format!("{}.jpg", FIRST_ID))).unwrap();
    assert_eq!(logo, vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn test_crawl_from_config_file_records_run() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config_path = dir.path().join("config.toml");

    std::fs::write(
        &config_path,
        format!(
            r#"
[search]
keywords = ["rust developer"]
locations = [{{ name = "United States", geo-id = "103644278" }}]
timespan = "r86400"
work-type = "2"
max-pages = 3

[requests]
user-agent = "JobTrawlerTest/1.0"
min-delay-ms = 0
max-delay-ms = 0

[processing]
enable = false

[output]
database-path = "{db}"

[api]
search-url = "{uri}/search"
detail-url = "{uri}/detail"
"#,
            db = db_path.display(),
            uri = mock_server.uri()
        ),
    )
    .unwrap();

    mount_search_pages(&mock_server, [FIRST_ID]).await;
    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", FIRST_ID)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_page("<p>Needs 10 years</p>\n<p>Thanks</p>", "")),
        )
        .mount(&mock_server)
        .await;

    let (config, hash) = load_config_with_hash(&config_path).expect("Config should load");
    let summary = run_crawl(config, &hash, &CancellationToken::new())
        .await
        .expect("Crawl failed");
    assert_eq!(summary.listings_inserted, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().expect("Run should be recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.listings_added, 1);

    // Processing is disabled: no annotations, but normalization still applies
    let listing = storage.get_listing(FIRST_ID).unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Normal);
    assert_eq!(listing.description, "<p>Needs 10 years</p><p>Thanks</p>");
}
