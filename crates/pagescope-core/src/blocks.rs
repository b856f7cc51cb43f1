//! Ranking of candidate fragments that plausibly hold the page's repeating
//! data entity, for downstream schema inference.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Selector};

use crate::config::ScorerConfig;
use crate::models::{ContentBlock, compute_hash};
use crate::text::{char_prefix, strip_non_content, visible_text};

/// Hex characters kept from the SHA-256 of a fragment prefix.
const FINGERPRINT_LEN: usize = 16;

/// Per-candidate measurements the heuristics work from.
struct BlockStats {
    text_len: usize,
    link_count: usize,
    link_text_len: usize,
    image_count: usize,
    /// Occurrences of the most frequent immediate child tag.
    child_repeat: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BlockScorer {
    config: ScorerConfig,
}

impl BlockScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Up to `limit` deduplicated blocks, best first.
    pub fn rank(&self, html: &str, limit: usize) -> Vec<ContentBlock> {
        if limit == 0 || html.trim().is_empty() {
            return Vec::new();
        }

        let mut document = Html::parse_document(html);
        strip_non_content(&mut document, &self.config.strip_tags);

        let mut scored = self.score_candidates(&document);
        // Stable: equal scores keep document order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut seen = HashSet::new();
        let mut blocks = Vec::with_capacity(limit);
        for block in scored.into_iter().take(limit * 2) {
            if !seen.insert(block.fingerprint.clone()) {
                continue;
            }
            blocks.push(block);
            if blocks.len() >= limit {
                break;
            }
        }

        tracing::debug!(returned = blocks.len(), "Ranked content blocks");
        blocks
    }

    /// Serialized fragments only, best first.
    pub fn extract_fragments(&self, html: &str, limit: usize) -> Vec<String> {
        self.rank(html, limit).into_iter().map(|b| b.html).collect()
    }

    fn score_candidates(&self, document: &Html) -> Vec<ContentBlock> {
        let Ok(candidates) = Selector::parse(&self.config.candidate_tags.join(", ")) else {
            tracing::warn!("Invalid candidate tag list, no blocks scored");
            return Vec::new();
        };

        document
            .select(&candidates)
            .filter_map(|element| {
                let stats = self.measure(element);
                if self.is_navigation(element, &stats) {
                    return None;
                }
                if stats.text_len < self.config.min_text_chars && stats.image_count == 0 {
                    return None;
                }

                let html = element.html();
                let mut score = self.score(&stats);
                if html.len() > self.config.oversize_bytes {
                    score *= self.config.oversize_factor;
                }
                let fingerprint = self.fingerprint(&html);

                Some(ContentBlock {
                    html,
                    score,
                    fingerprint,
                })
            })
            .collect()
    }

    fn measure(&self, element: ElementRef<'_>) -> BlockStats {
        let mut link_count = 0;
        let mut link_text_len = 0;
        let mut image_count = 0;

        for node in element.descendants().skip(1).filter_map(ElementRef::wrap) {
            match node.value().name() {
                "a" => {
                    link_count += 1;
                    link_text_len += visible_text(node).chars().count();
                }
                "img" => image_count += 1,
                _ => {}
            }
        }

        let mut child_counts: HashMap<&str, usize> = HashMap::new();
        for child in element.children().filter_map(ElementRef::wrap) {
            *child_counts.entry(child.value().name()).or_default() += 1;
        }

        BlockStats {
            text_len: visible_text(element).chars().count(),
            link_count,
            link_text_len,
            image_count,
            child_repeat: child_counts.into_values().max().unwrap_or(0),
        }
    }

    /// Navigation, footer and other boilerplate.
    fn is_navigation(&self, element: ElementRef<'_>, stats: &BlockStats) -> bool {
        let el = element.value();
        if self.config.landmark_tags.iter().any(|t| t == el.name()) {
            return true;
        }
        if el
            .attr("role")
            .is_some_and(|role| self.config.landmark_roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
        {
            return true;
        }

        // Image-rich blocks are product/media grids even when every card is a link.
        if stats.image_count > self.config.nav_image_exemption {
            return false;
        }

        if stats.image_count == 0
            && stats.link_count >= self.config.nav_min_links
            && stats.text_len < self.config.nav_max_text_chars
        {
            return true;
        }

        let text = visible_text(element).to_lowercase();
        let hits = self
            .config
            .nav_keywords
            .iter()
            .filter(|kw| text.contains(kw.as_str()))
            .count();
        hits >= self.config.nav_keyword_min_hits
    }

    fn score(&self, stats: &BlockStats) -> f64 {
        if stats.text_len == 0 && stats.image_count == 0 {
            return 0.0;
        }
        let cfg = &self.config;

        let mut score = (stats.text_len as f64 / cfg.text_unit).min(cfg.text_score_cap);
        score += stats.image_count as f64 * cfg.image_bonus;

        if stats.child_repeat > cfg.repeat_threshold {
            score += stats.child_repeat as f64 * cfg.repeat_bonus;
        }

        if stats.text_len > 0 && stats.image_count == 0 {
            let link_ratio = stats.link_text_len as f64 / stats.text_len as f64;
            if link_ratio > cfg.link_density_limit {
                score -= cfg.link_farm_penalty;
            }
        }

        score
    }

    fn fingerprint(&self, html: &str) -> String {
        let prefix = char_prefix(html, self.config.fingerprint_prefix_chars);
        compute_hash(prefix)[..FINGERPRINT_LEN].to_string()
    }
}
