// Run one aggregated search from the command line and print the ranked
// postings. Usage: search_demo "<query>" [remote|hybrid|onsite]
use jobscout::{Aggregator, AppConfig, FilterSpec, WorkModel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    jobscout::enable_dev_tracing();

    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_else(|| "software engineer".to_string());
    let mut filters = FilterSpec::new(&query);
    filters.work_model = match args.next().as_deref() {
        Some("remote") => WorkModel::Remote,
        Some("hybrid") => WorkModel::Hybrid,
        Some("onsite") => WorkModel::OnSite,
        _ => WorkModel::NoPreference,
    };

    let aggregator = Aggregator::new(AppConfig::from_env());
    let postings = aggregator.search(&filters).await?;

    println!("{} postings:", postings.len());
    for p in &postings {
        println!(
            "[{:>2}] {} | {} | {} | {} ({})",
            p.composite_score(),
            p.title,
            p.company,
            p.location,
            p.url,
            p.source
        );
    }
    Ok(())
}
