use pagescope_core::{AppError, EndpointCategory, FeatureVector, classify};

use crate::integration::common::{CannedFetcher, CannedRenderer, classifier};

const URL: &str = "https://data.example.org/listing";

fn filler(words: usize) -> String {
    "ordinary listing text ".repeat(words)
}

#[test]
fn scripts_and_table_only_is_javascript() {
    let features = FeatureVector {
        requires_script_rendering: true,
        has_tabular_structure: true,
        ..Default::default()
    };
    assert_eq!(classify(&features), EndpointCategory::Javascript);
}

#[test]
fn auth_wall_with_randomness_is_unsupported() {
    let features = FeatureVector {
        has_auth_wall: true,
        is_nondeterministic: true,
        ..Default::default()
    };
    assert_eq!(classify(&features), EndpointCategory::Unsupported);
}

#[tokio::test]
async fn changing_content_is_random() {
    let a = format!("<html><body><p>First quote of the day.</p><p>{}</p></body></html>", filler(10));
    let b = format!("<html><body><p>Another quote entirely.</p><p>{}</p></body></html>", filler(10));
    let service = classifier(CannedFetcher::sequence(&[&a, &a, &b]), CannedRenderer::new(&a));

    let result = service.classify(URL).await.unwrap();
    assert!(result.features.is_nondeterministic);
    assert_eq!(result.category, EndpointCategory::Random);
}

#[tokio::test]
async fn empty_shell_that_grows_on_scroll_is_scroll() {
    let shell = r#"<html><body><div id="feed"></div><script src="/feed.js"></script></body></html>"#;
    let rendered = format!("<html><body><div id=\"feed\"><p>{}</p></div></body></html>", filler(20));
    let service = classifier(
        CannedFetcher::same(shell),
        CannedRenderer::growing(&rendered, 2_000.0, 6_000.0),
    );

    let result = service.classify(URL).await.unwrap();
    assert!(result.features.has_infinite_scroll);
    assert!(!result.features.has_repeating_containers);
    assert_eq!(result.category, EndpointCategory::Scroll);
}

#[tokio::test]
async fn growing_page_with_visible_grid_is_not_scroll() {
    let cards: String = (0..8)
        .map(|i| format!(r#"<div class="card"><h3>Card {i}</h3><p>{}</p></div>"#, filler(3)))
        .collect();
    let html = format!("<html><body>{cards}</body></html>");
    let service = classifier(
        CannedFetcher::same(&html),
        CannedRenderer::growing(&html, 2_000.0, 6_000.0),
    );

    let result = service.classify(URL).await.unwrap();
    assert!(result.features.has_infinite_scroll);
    assert!(result.features.has_repeating_containers);
    assert_ne!(result.category, EndpointCategory::Scroll);
}

#[tokio::test]
async fn growing_grid_of_unclassed_cards_is_not_scroll() {
    let cards: String = (0..5)
        .map(|i| format!("<article><h3>Item {i}</h3><p>{}</p></article>", filler(3)))
        .collect();
    let html = format!("<html><body><main>{cards}</main></body></html>");
    let service = classifier(
        CannedFetcher::same(&html),
        CannedRenderer::growing(&html, 2_000.0, 6_000.0),
    );

    let result = service.classify(URL).await.unwrap();
    assert!(result.features.has_infinite_scroll);
    assert!(result.features.has_repeating_containers);
    assert_eq!(result.features.repeat_count, 5);
    assert_ne!(result.category, EndpointCategory::Scroll);
}

#[tokio::test]
async fn classification_serializes_flat_features() {
    let html = format!(
        r#"<html><body><div itemscope itemtype="https://schema.org/Event"><span itemprop="name">Gig</span></div><p>{}</p></body></html>"#,
        filler(10)
    );
    let service = classifier(CannedFetcher::same(&html), CannedRenderer::new(&html));

    let result = service.classify(URL).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["category"], "microdata");
    assert_eq!(json["features"]["has_structured_markup"], true);
    assert_eq!(json["url"], URL);
}

#[tokio::test]
async fn relative_url_is_rejected() {
    let service = classifier(CannedFetcher::same("<p></p>"), CannedRenderer::new("<p></p>"));
    let err = service.classify("/listing?page=2").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidUrl(_)));
}
