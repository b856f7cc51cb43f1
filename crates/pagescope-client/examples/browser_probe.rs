/// Probe one URL with headless Chromium and print its classification.
///
/// Run with:
///   cargo run -p pagescope-client --example browser_probe --features browser -- https://quotes.toscrape.com/scroll
use pagescope_client::{ChromiumRenderer, ReqwestFetcher};
use pagescope_core::{EndpointClassifier, PagescopeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://quotes.toscrape.com/".to_string());

    println!("Launching headless browser…");
    let renderer = ChromiumRenderer::launch().await?;
    let fetcher = ReqwestFetcher::new()?;
    let classifier = EndpointClassifier::new(fetcher, renderer, PagescopeConfig::default());

    println!("Probing {url} …");
    let analysis = classifier.analyze(&url, 3).await?;

    println!("{}", serde_json::to_string_pretty(&analysis.classification)?);
    for (i, fragment) in analysis.fragments().iter().enumerate() {
        println!("--- block {} ({} bytes)", i + 1, fragment.len());
        println!("{}", fragment.chars().take(300).collect::<String>());
    }
    Ok(())
}
