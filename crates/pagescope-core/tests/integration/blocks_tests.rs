use pagescope_core::BlockScorer;

use crate::integration::common::{
    CannedFetcher, CannedRenderer, catalogue_page, classifier, shop_page,
};

#[test]
fn items_rank_above_footer() {
    let blocks = BlockScorer::default().rank(&shop_page(), 10);

    assert!(!blocks.is_empty());
    assert!(blocks[0].html.starts_with(r#"<div class="item">"#));

    let first_footer = blocks
        .iter()
        .position(|b| b.html.to_lowercase().contains("privacy policy"));
    if let Some(footer) = first_footer {
        assert!(footer > 0);
        assert!(blocks[footer].score < blocks[0].score);
    }
}

#[test]
fn identical_items_collapse_to_one_block() {
    let blocks = BlockScorer::default().rank(&shop_page(), 10);
    let items = blocks
        .iter()
        .filter(|b| b.html.starts_with(r#"<div class="item">"#))
        .count();
    assert_eq!(items, 1);
}

#[test]
fn distinct_items_of_one_structure_all_rank_above_footer() {
    let blocks = BlockScorer::default().rank(&catalogue_page(), 10);

    assert!(blocks.len() >= 3);
    for block in &blocks[..3] {
        assert!(block.html.starts_with(r#"<div class="item">"#), "{}", block.html);
        assert!(!block.html.to_lowercase().contains("privacy policy"));
    }
    for name in ["Walnut desk lamp", "Oak bookshelf", "Wool floor rug"] {
        assert!(blocks[..3].iter().any(|b| b.html.contains(name)), "{name}");
    }

    let weakest_item = blocks[..3].iter().map(|b| b.score).fold(f64::INFINITY, f64::min);
    for footer in blocks.iter().filter(|b| b.html.to_lowercase().contains("privacy policy")) {
        assert!(footer.score < weakest_item);
    }
}

#[tokio::test]
async fn analyze_returns_classification_and_blocks() {
    let html = shop_page();
    let service = classifier(CannedFetcher::same(&html), CannedRenderer::new(&html));

    let analysis = service
        .analyze("https://shop.example.com/new", 3)
        .await
        .unwrap();

    assert!(analysis.blocks.len() <= 3);
    assert!(analysis.fragments()[0].contains("Walnut desk lamp"));

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["classification"]["category"], "default");
    assert!(json["blocks"][0]["fingerprint"].is_string());
}
