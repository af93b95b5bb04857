// tests/weworkremotely_board.rs
// We Work Remotely category scrape against a replayed server.

use jobscout::config::source_config;
use jobscout::model::FilterSpec;
use jobscout::sources::weworkremotely::WeWorkRemotelySource;
use jobscout::JobSource;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATEGORY_PAGE: &str = r#"<html><head><title>Remote Programming Jobs</title></head><body><ul>
  <li>
    <a href="/remote-jobs/acme-backend-engineer">
      <span class="company">Acme</span>
      <span class="title">Backend Engineer</span>
    </a>
  </li>
  <li>
    <a href="/remote-jobs/globex-devops-engineer">Globex | DevOps Engineer</a>
  </li>
  <li><a href="/terms">Terms of Service</a></li>
</ul></body></html>"#;

fn source(base: &str) -> WeWorkRemotelySource {
    WeWorkRemotelySource::new(
        reqwest::Client::new(),
        source_config("WeWorkRemotely").unwrap(),
    )
    .with_base(base)
}

#[tokio::test]
async fn scrapes_category_and_filters_by_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories/remote-programming-jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CATEGORY_PAGE))
        .mount(&server)
        .await;

    let filters = FilterSpec::new("backend engineer");
    let cancel = CancellationToken::new();
    let postings = source(&server.uri())
        .search(&filters, &cancel)
        .await
        .unwrap();

    // Both job listings mention "engineer"; the terms link does not.
    assert_eq!(postings.len(), 2);
    assert_eq!(postings[0].title, "Backend Engineer");
    assert_eq!(postings[0].company, "Acme");
    assert_eq!(
        postings[0].url,
        format!("{}/remote-jobs/acme-backend-engineer", server.uri())
    );
    assert_eq!(postings[1].company, "Globex");
    assert_eq!(postings[1].title, "DevOps Engineer");
    assert!(postings.iter().all(|p| p.location == "Remote"));
}

#[tokio::test]
async fn cloudflare_interstitial_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Please verify you are human</title></head><body>cloudflare</body></html>",
        ))
        .mount(&server)
        .await;

    let filters = FilterSpec::new("engineer");
    let cancel = CancellationToken::new();
    assert!(source(&server.uri())
        .search(&filters, &cancel)
        .await
        .is_err());
}

#[tokio::test]
async fn http_403_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let filters = FilterSpec::new("engineer");
    let cancel = CancellationToken::new();
    assert!(source(&server.uri())
        .search(&filters, &cancel)
        .await
        .is_err());
}
