//! Ordered rule tree mapping a [`FeatureVector`] to one [`EndpointCategory`].
//!
//! Blocking conditions dominate content-shape conditions, and randomness
//! dominates scroll/script signals: a randomized endpoint cannot be reliably
//! paginated or rescraped whatever its rendering behaviour.

use crate::models::{EndpointCategory, FeatureVector};

/// One entry of the priority table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub category: EndpointCategory,
    predicate: fn(&FeatureVector) -> bool,
}

impl Rule {
    pub fn matches(&self, features: &FeatureVector) -> bool {
        (self.predicate)(features)
    }
}

/// Evaluated top to bottom, first match wins. The last rule always matches.
pub const RULES: &[Rule] = &[
    Rule {
        name: "auth-wall, login prompt or legacy view state",
        category: EndpointCategory::Unsupported,
        predicate: |f| f.has_auth_wall || f.login_required || f.has_legacy_form_state,
    },
    Rule {
        name: "content differs between requests",
        category: EndpointCategory::Random,
        predicate: |f| f.is_nondeterministic,
    },
    // Pages that already show a full grid before scrolling fall through:
    // their first page carries usable content.
    Rule {
        name: "page grows on scroll from an empty start",
        category: EndpointCategory::Scroll,
        predicate: |f| f.has_infinite_scroll && !f.has_repeating_containers,
    },
    Rule {
        name: "content appears only after rendering",
        category: EndpointCategory::Javascript,
        predicate: |f| f.requires_script_rendering,
    },
    Rule {
        name: "data table present",
        category: EndpointCategory::Tableful,
        predicate: |f| f.has_tabular_structure,
    },
    Rule {
        name: "structured-data markup present",
        category: EndpointCategory::Microdata,
        predicate: |f| f.has_structured_markup,
    },
    Rule {
        name: "fallback",
        category: EndpointCategory::Default,
        predicate: |_| true,
    },
];

/// The first rule that matches `features`.
pub fn matching_rule(features: &FeatureVector) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| rule.matches(features))
        .unwrap_or(&RULES[RULES.len() - 1])
}

pub fn classify(features: &FeatureVector) -> EndpointCategory {
    matching_rule(features).category
}
