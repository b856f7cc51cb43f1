use std::collections::HashMap;

use scraper::{Html, Selector};

use crate::config::StaticConfig;
use crate::models::StaticFeatures;

/// Structural signals read from raw (pre-render) markup.
///
/// Pure and infallible: unparsable or empty markup simply yields no signal.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    config: StaticConfig,
}

impl StaticExtractor {
    pub fn new(config: StaticConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, html: &str) -> StaticFeatures {
        if html.trim().is_empty() {
            return StaticFeatures::default();
        }

        let document = Html::parse_document(html);
        let repeat_count = self.max_signature_count(&document);

        StaticFeatures {
            has_structured_markup: matches(&document, "[itemscope], [itemprop]"),
            has_legacy_form_state: self.has_view_state(&document),
            has_tabular_structure: matches(&document, "table"),
            has_login_form: has_login_form(&document),
            has_repeating_containers: repeat_count >= self.config.min_repeat,
            repeat_count,
        }
    }

    fn has_view_state(&self, document: &Html) -> bool {
        let Ok(inputs) = Selector::parse("input[name]") else {
            return false;
        };
        document.select(&inputs).any(|input| {
            let name = input.value().attr("name").unwrap_or_default();
            self.config
                .view_state_markers
                .iter()
                .any(|marker| name.contains(marker.as_str()))
        })
    }

    /// Occurrences of the most frequent (tag name, sorted class list) signature.
    fn max_signature_count(&self, document: &Html) -> usize {
        let mut counts: HashMap<(String, Vec<String>), usize> = HashMap::new();

        for element in document.root_element().descendants().filter_map(scraper::ElementRef::wrap) {
            let el = element.value();
            let mut classes: Vec<String> = el.classes().map(str::to_string).collect();
            if self.config.classed_only && classes.is_empty() {
                continue;
            }
            classes.sort();
            *counts.entry((el.name().to_string(), classes)).or_default() += 1;
        }

        counts.into_values().max().unwrap_or(0)
    }
}

fn matches(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

fn has_login_form(document: &Html) -> bool {
    let Ok(inputs) = Selector::parse("input") else {
        return false;
    };
    document.select(&inputs).any(|input| {
        let el = input.value();
        let is_password = el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("password"));
        let is_csrf = el
            .attr("name")
            .is_some_and(|n| n.to_ascii_lowercase().contains("csrf"));
        is_password || is_csrf
    })
}
