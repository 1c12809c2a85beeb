//! Inclusion filter for fetched links.
//!
//! A filter is a set of named rules. A link is delivered when at least one
//! rule approves it; rule order never changes the outcome.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::types::Link;
use crate::{FreebiesError, Result};

type Predicate = dyn Fn(&str) -> bool + Send + Sync;

/// A named predicate over a link's href.
#[derive(Clone)]
pub struct Rule {
    name: String,
    predicate: Arc<Predicate>,
}

impl Rule {
    /// Create a rule from a name and a predicate.
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this rule approves `href`.
    pub fn approves(&self, href: &str) -> bool {
        (self.predicate)(href)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Names of the built-in rules, in table order.
pub const BUILTIN_RULES: &[&str] = &["skip_amazon", "skip_reddit", "skip_x_com"];

/// Look up a built-in rule by name.
pub fn builtin_rule(name: &str) -> Option<Rule> {
    let rule = match name {
        "skip_amazon" => Rule::new(name, |href: &str| !href.contains("amazon.com")),
        "skip_reddit" => Rule::new(name, |href: &str| !href.starts_with("/r/")),
        "skip_x_com" => Rule::new(name, |href: &str| !href.starts_with("https://x.com")),
        _ => return None,
    };
    Some(rule)
}

/// Predicate deciding whether a fetched link may be delivered.
#[derive(Debug, Clone, Default)]
pub struct InclusionFilter {
    rules: Vec<Rule>,
}

impl InclusionFilter {
    /// Create a filter from explicit rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Filter with every built-in rule enabled.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_RULES.iter().filter_map(|name| builtin_rule(name)).collect())
    }

    /// Filter with the named built-in rules.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let rules = names
            .iter()
            .map(|name| {
                builtin_rule(name.as_ref()).ok_or_else(|| {
                    FreebiesError::Config(format!("unknown filter rule: {}", name.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Names of the active rules.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Whether `link` may be delivered.
    pub fn allows(&self, link: &Link) -> bool {
        match self.rules.iter().find(|rule| rule.approves(&link.href)) {
            Some(rule) => {
                debug!(rule = rule.name(), href = %link.href, "Rule applied to link");
                true
            }
            None => false,
        }
    }

    /// Keep the allowed links, preserving order.
    pub fn apply(&self, links: Vec<Link>) -> Vec<Link> {
        links.into_iter().filter(|link| self.allows(link)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(href: &str) -> Link {
        Link::new(href, Utc::now())
    }

    #[test]
    fn test_builtin_rule_lookup() {
        for name in BUILTIN_RULES {
            assert_eq!(builtin_rule(name).unwrap().name(), *name);
        }
        assert!(builtin_rule("skip_everything").is_none());
    }

    #[test]
    fn test_skip_amazon() {
        let rule = builtin_rule("skip_amazon").unwrap();
        assert!(!rule.approves("https://www.amazon.com/dp/B0"));
        assert!(rule.approves("https://store.steampowered.com/app/1"));
    }

    #[test]
    fn test_skip_reddit() {
        let rule = builtin_rule("skip_reddit").unwrap();
        assert!(!rule.approves("/r/FreeGameFindings/comments/abc"));
        assert!(rule.approves("https://www.reddit.com/r/FreeGameFindings"));
    }

    #[test]
    fn test_skip_x_com() {
        let rule = builtin_rule("skip_x_com").unwrap();
        assert!(!rule.approves("https://x.com/someone/status/1"));
        assert!(rule.approves("https://example.com"));
    }

    #[test]
    fn test_or_composition() {
        let filter = InclusionFilter::new(vec![
            Rule::new("r1", |href: &str| href.contains("steam")),
            Rule::new("r2", |href: &str| href.contains("epic")),
        ]);
        assert!(filter.allows(&link("https://steam.example")));
        assert!(filter.allows(&link("https://epic.example")));
        assert!(filter.allows(&link("https://steam-epic.example")));
        // Would satisfy a rule that is not part of the set.
        assert!(!filter.allows(&link("https://gog.example")));
    }

    #[test]
    fn test_rule_order_does_not_matter() {
        let r1 = Rule::new("r1", |href: &str| href.ends_with(".com"));
        let r2 = Rule::new("r2", |href: &str| href.starts_with("https://"));
        let forward = InclusionFilter::new(vec![r1.clone(), r2.clone()]);
        let backward = InclusionFilter::new(vec![r2, r1]);

        for href in ["https://a.com", "http://a.com", "https://a.org", "ftp://a.org"] {
            assert_eq!(forward.allows(&link(href)), backward.allows(&link(href)));
        }
    }

    #[test]
    fn test_empty_filter_allows_nothing() {
        let filter = InclusionFilter::default();
        assert!(!filter.allows(&link("https://store.steampowered.com")));
    }

    #[test]
    fn test_builtin_filter_is_permissive() {
        // Each built-in rule rejects one pattern, so under OR only a link
        // matching all three patterns at once is excluded.
        let filter = InclusionFilter::builtin();
        assert!(filter.allows(&link("https://www.amazon.com/luna")));
        assert!(filter.allows(&link("/r/FreeGameFindings/comments/1")));
        assert!(filter.allows(&link("https://store.epicgames.com/p/game")));
    }

    #[test]
    fn test_from_names() {
        let filter = InclusionFilter::from_names(&["skip_amazon"]).unwrap();
        assert_eq!(filter.rule_names(), vec!["skip_amazon"]);
        assert!(!filter.allows(&link("https://www.amazon.com/luna")));

        let err = InclusionFilter::from_names(&["skip_amazon", "nope"]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_apply_preserves_order() {
        let filter = InclusionFilter::from_names(&["skip_x_com"]).unwrap();
        let links = vec![
            link("https://b.example"),
            link("https://x.com/post"),
            link("https://a.example"),
        ];
        let hrefs: Vec<String> = filter.apply(links).into_iter().map(|l| l.href).collect();
        assert_eq!(hrefs, vec!["https://b.example", "https://a.example"]);
    }
}
