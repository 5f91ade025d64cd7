//! Resource classification.
//!
//! Maps an outbound request to a [`ResourceClass`] with an ordered list of
//! path patterns. The first matching rule wins, so more specific rules must
//! be declared before broader ones. Only GET requests over `http`/`https`
//! are ever classified; everything else is [`ResourceClass::Unclassified`]
//! and bypasses the cache entirely.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Class of an intercepted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceClass {
    Document,
    Font,
    StaticBundle,
    Style,
    Script,
    Image,
    Unclassified,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Document => "DOCUMENT",
            ResourceClass::Font => "FONT",
            ResourceClass::StaticBundle => "STATIC_BUNDLE",
            ResourceClass::Style => "STYLE",
            ResourceClass::Script => "SCRIPT",
            ResourceClass::Image => "IMAGE",
            ResourceClass::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(pattern, class)` pair as written in configuration.
///
/// `pattern` is a case-insensitive regular expression matched against the
/// URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub pattern: String,
    pub class: ResourceClass,
}

impl ClassificationRule {
    pub fn new(pattern: &str, class: ResourceClass) -> Self {
        Self { pattern: pattern.to_string(), class }
    }
}

/// The built-in rule set, most specific first.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new(r"\.(woff2?|ttf|otf|eot)$", ResourceClass::Font),
        ClassificationRule::new(r"^/_next/static/", ResourceClass::StaticBundle),
        ClassificationRule::new(r"^/static/", ResourceClass::StaticBundle),
        ClassificationRule::new(r"\.css$", ResourceClass::Style),
        ClassificationRule::new(r"\.m?js$", ResourceClass::Script),
        ClassificationRule::new(r"\.(png|jpe?g|gif|webp|avif|svg|ico)$", ResourceClass::Image),
        ClassificationRule::new(r"(\.html?|/[^/.]*)$", ResourceClass::Document),
    ]
}

/// Compiled, ordered classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(Regex, ResourceClass)>,
}

impl Default for Classifier {
    fn default() -> Self {
        // The built-in patterns are constant and known to compile.
        Self::from_rules(&default_rules()).unwrap_or_else(|_| Self { rules: Vec::new() })
    }
}

impl Classifier {
    /// Compile rules in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn from_rules(rules: &[ClassificationRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, rule.class))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Classify a request. Pure; performs no I/O.
    pub fn classify(&self, method: &str, url: &Url) -> ResourceClass {
        if !method.eq_ignore_ascii_case("GET") {
            return ResourceClass::Unclassified;
        }
        if !matches!(url.scheme(), "http" | "https") {
            return ResourceClass::Unclassified;
        }

        let path = url.path();
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(path))
            .map(|(_, class)| *class)
            .unwrap_or(ResourceClass::Unclassified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(method: &str, url: &str) -> ResourceClass {
        Classifier::default().classify(method, &Url::parse(url).unwrap())
    }

    #[test]
    fn test_default_classes() {
        assert_eq!(classify("GET", "https://app.test/"), ResourceClass::Document);
        assert_eq!(classify("GET", "https://app.test/about"), ResourceClass::Document);
        assert_eq!(classify("GET", "https://app.test/legal/terms.html"), ResourceClass::Document);
        assert_eq!(classify("GET", "https://app.test/fonts/inter.woff2"), ResourceClass::Font);
        assert_eq!(classify("GET", "https://app.test/css/site.css"), ResourceClass::Style);
        assert_eq!(classify("GET", "https://app.test/js/app.js"), ResourceClass::Script);
        assert_eq!(classify("GET", "https://app.test/img/hero.JPG"), ResourceClass::Image);
        assert_eq!(classify("GET", "https://app.test/data.json"), ResourceClass::Unclassified);
    }

    #[test]
    fn test_static_bundle_beats_script() {
        assert_eq!(
            classify("GET", "https://app.test/_next/static/chunks/main-abc123.js"),
            ResourceClass::StaticBundle
        );
        assert_eq!(classify("GET", "https://app.test/_next/static/css/app.css"), ResourceClass::StaticBundle);
    }

    #[test]
    fn test_query_string_ignored() {
        assert_eq!(classify("GET", "https://app.test/logo.png?v=3"), ResourceClass::Image);
    }

    #[test]
    fn test_non_get_unclassified() {
        assert_eq!(classify("POST", "https://app.test/"), ResourceClass::Unclassified);
        assert_eq!(classify("HEAD", "https://app.test/app.js"), ResourceClass::Unclassified);
    }

    #[test]
    fn test_non_network_scheme_unclassified() {
        assert_eq!(classify("GET", "data:image/png;base64,AAAA"), ResourceClass::Unclassified);
        assert_eq!(classify("GET", "chrome-extension://abc/script.js"), ResourceClass::Unclassified);
    }

    #[test]
    fn test_custom_rules_order() {
        let classifier = Classifier::from_rules(&[
            ClassificationRule::new(r"^/cdn/", ResourceClass::Image),
            ClassificationRule::new(r"\.js$", ResourceClass::Script),
        ])
        .unwrap();
        let url = Url::parse("https://app.test/cdn/lib.js").unwrap();
        assert_eq!(classifier.classify("GET", &url), ResourceClass::Image);
    }

    #[test]
    fn test_invalid_rule() {
        let result = Classifier::from_rules(&[ClassificationRule::new("(", ResourceClass::Image)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_class_serde() {
        let json = serde_json::to_string(&ResourceClass::StaticBundle).unwrap();
        assert_eq!(json, "\"STATIC_BUNDLE\"");
        let class: ResourceClass = serde_json::from_str("\"IMAGE\"").unwrap();
        assert_eq!(class, ResourceClass::Image);
    }
}
