//! AdGuard/AdBlock filter rule parsing and matching.

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use log::debug;

pub mod content_rule;
pub mod content_type;
pub mod css_rule;
pub mod domains;
pub mod error;
pub mod report;
pub mod request;
pub mod rule_set;
pub mod script_rule;
pub mod url_rule;
pub mod wildcard;

pub use crate::content_rule::ContentFilterRule;
pub use crate::content_type::ContentType;
pub use crate::css_rule::CssFilterRule;
pub use crate::domains::DomainScope;
pub use crate::error::RuleError;
pub use crate::request::Request;
pub use crate::rule_set::RuleSet;
pub use crate::script_rule::ScriptFilterRule;
pub use crate::url_rule::UrlFilterRule;

/// Prefix of exception rules.
pub const MASK_WHITE_LIST: &str = "@@";

/// HTML content filtering rule mask.
pub const MASK_CONTENT_RULE: &str = "$$";

/// Element hiding rule mask.
pub const MASK_CSS_RULE: &str = "##";

/// Element hiding exception rule mask.
pub const MASK_CSS_EXCEPTION_RULE: &str = "#@#";

/// CSS injection rule mask.
pub const MASK_CSS_INJECT_RULE: &str = "#$#";

/// CSS injection exception rule mask.
pub const MASK_CSS_INJECT_EXCEPTION_RULE: &str = "#@$#";

/// JavaScript injection rule mask.
pub const MASK_SCRIPT_RULE: &str = "#%#";

const COMMENT_PREFIX: char = '!';
const METADATA_PREFIX: char = '[';

/// Shortest line which can be a valid rule.
const MIN_RULE_LENGTH: usize = 4;

/// Markers of injection rules in an obsolete format.
const OBSOLETE_INJECTION_MASKS: [&str; 2] =
    ["###adg_start_script_inject", "###adg_start_style_inject"];

const CSS_MASKS: [&str; 4] =
    [MASK_CSS_RULE, MASK_CSS_EXCEPTION_RULE, MASK_CSS_INJECT_RULE, MASK_CSS_INJECT_EXCEPTION_RULE];

/// Masks of all rules which aren't URL rules.
const COSMETIC_MASKS: [&str; 6] = [
    MASK_CSS_RULE,
    MASK_CSS_EXCEPTION_RULE,
    MASK_CSS_INJECT_RULE,
    MASK_CSS_INJECT_EXCEPTION_RULE,
    MASK_SCRIPT_RULE,
    MASK_CONTENT_RULE,
];

/// Parse a filter list.
pub fn parse(mut filter: &str) -> Vec<Rule> {
    // Strip BOM.
    filter = filter.strip_prefix('\u{feff}').unwrap_or(filter);

    filter.lines().filter_map(Rule::parse).collect()
}

/// Check if a rule text is for an element hiding, injection, or content rule.
pub fn is_cosmetic_rule(rule_text: &str) -> bool {
    COSMETIC_MASKS.iter().any(|mask| rule_text.contains(mask))
}

/// Parsed filter rule.
#[derive(Clone, Debug)]
pub enum Rule {
    Url(UrlFilterRule),
    Css(CssFilterRule),
    Script(ScriptFilterRule),
    Content(ContentFilterRule),
}

impl Rule {
    /// Parse a single line of a filter list.
    ///
    /// Comments, list metadata, and malformed lines are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.chars().count() < MIN_RULE_LENGTH
            || line.starts_with(COMMENT_PREFIX)
            || line.starts_with(METADATA_PREFIX)
            || OBSOLETE_INJECTION_MASKS.iter().any(|mask| line.contains(mask))
        {
            return None;
        }

        let rule = if line.starts_with(MASK_WHITE_LIST) {
            UrlFilterRule::new(line).map(Self::Url)
        } else if line.contains(MASK_CONTENT_RULE) {
            ContentFilterRule::new(line).map(Self::Content)
        } else if CSS_MASKS.iter().any(|mask| line.contains(mask)) {
            CssFilterRule::new(line).map(Self::Css)
        } else if line.contains(MASK_SCRIPT_RULE) {
            ScriptFilterRule::new(line).map(Self::Script)
        } else {
            UrlFilterRule::new(line).map(Self::Url)
        };

        match rule {
            Ok(rule) => Some(rule),
            Err(err) => {
                debug!("Ignoring rule {line:?}: {err}");
                None
            },
        }
    }

    pub fn rule_text(&self) -> &str {
        match self {
            Self::Url(rule) => rule.rule_text(),
            Self::Css(rule) => rule.rule_text(),
            Self::Script(rule) => rule.rule_text(),
            Self::Content(rule) => rule.rule_text(),
        }
    }

    pub fn permitted_domains(&self) -> &[String] {
        match self {
            Self::Url(rule) => rule.permitted_domains(),
            _ => self.scope().map(DomainScope::permitted_domains).unwrap_or_default(),
        }
    }

    pub fn restricted_domains(&self) -> &[String] {
        match self {
            Self::Url(rule) => rule.restricted_domains(),
            _ => self.scope().map(DomainScope::restricted_domains).unwrap_or_default(),
        }
    }

    /// Check if the rule has no permitted domains.
    pub fn is_generic(&self) -> bool {
        self.permitted_domains().is_empty()
    }

    /// Check if the rule has any permitted or restricted domain.
    pub fn is_domain_sensitive(&self) -> bool {
        match self {
            Self::Url(rule) => rule.is_domain_sensitive(),
            _ => self.scope().is_some_and(DomainScope::is_domain_sensitive),
        }
    }

    /// Check if the rule applies to pages on `domain`.
    pub fn is_permitted(&self, domain: &str) -> bool {
        match self {
            Self::Url(rule) => rule.is_permitted(domain),
            _ => self.scope().is_some_and(|scope| scope.is_permitted(domain)),
        }
    }

    /// Check if the rule modifies page content instead of blocking requests.
    pub fn is_cosmetic(&self) -> bool {
        !matches!(self, Self::Url(_))
    }

    pub fn as_url(&self) -> Option<&UrlFilterRule> {
        match self {
            Self::Url(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_css(&self) -> Option<&CssFilterRule> {
        match self {
            Self::Css(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptFilterRule> {
        match self {
            Self::Script(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&ContentFilterRule> {
        match self {
            Self::Content(rule) => Some(rule),
            _ => None,
        }
    }

    /// Domain scope of eagerly parsed rules.
    fn scope(&self) -> Option<&DomainScope> {
        match self {
            Self::Url(_) => None,
            Self::Css(rule) => Some(rule.scope()),
            Self::Script(rule) => Some(rule.scope()),
            Self::Content(rule) => Some(rule.scope()),
        }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.rule_text() == other.rule_text()
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule_text().hash(state);
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule_text())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn comments() {
        assert_eq!(Rule::parse("! This is a comment"), None);
        assert_eq!(Rule::parse("[Adblock Plus 2.0]"), None);
    }

    #[test]
    fn empty() {
        assert_eq!(Rule::parse("   "), None);
        assert_eq!(Rule::parse(""), None);
    }

    #[test]
    fn too_short() {
        assert_eq!(Rule::parse("ab"), None);
        assert_eq!(Rule::parse("  abc  "), None);
        assert!(Rule::parse("abcd").is_some());
        assert_eq!(Rule::parse("ёжи"), None);
        assert!(Rule::parse("ёжик").is_some());
    }

    #[test]
    fn obsolete_injection() {
        assert_eq!(Rule::parse("example.org###adg_start_script_inject"), None);
        assert_eq!(Rule::parse("example.org###adg_start_style_inject"), None);
    }

    #[test]
    fn whitelist_precedence() {
        let rule = Rule::parse("@@||example.com^$$script").unwrap();
        assert!(rule.as_url().is_some_and(UrlFilterRule::is_whitelist));

        let rule = Rule::parse("@@||example.com/##banner").unwrap();
        assert!(matches!(rule, Rule::Url(_)));

        let rule = Rule::parse("@@||example.com/#%#alert(1)").unwrap();
        assert!(rule.as_url().is_some_and(UrlFilterRule::is_whitelist));
    }

    #[test]
    fn classification() {
        let rule = Rule::parse("example.org$$script[tag-content=\"ad\"]");
        assert!(matches!(rule, Some(Rule::Content(_))));
        assert!(matches!(Rule::parse("example.org##.banner"), Some(Rule::Css(_))));
        assert!(matches!(Rule::parse("example.org#@#.banner"), Some(Rule::Css(_))));
        assert!(matches!(Rule::parse("example.org#$#body { color: red }"), Some(Rule::Css(_))));
        assert!(matches!(Rule::parse("example.org#%#window.x = 1;"), Some(Rule::Script(_))));
        assert!(matches!(Rule::parse("||ads.example.org^"), Some(Rule::Url(_))));
    }

    #[test]
    fn content_before_css() {
        let rule = Rule::parse("example.org$$div[id=\"a##b\"]").unwrap();
        assert!(rule.as_content().is_some());
    }

    #[test]
    fn malformed_rejected() {
        assert_eq!(Rule::parse("example.org$$div[id]"), None);
    }

    #[test]
    fn trimmed() {
        let rule = Rule::parse("  example.org##.ad  \r").unwrap();
        assert_eq!(rule.rule_text(), "example.org##.ad");
        assert_eq!(rule.to_string(), "example.org##.ad");
    }

    #[test]
    fn idempotent() {
        let line = "example.org,~sub.example.org##.ad";
        let first = Rule::parse(line).unwrap();
        let second = Rule::parse(first.rule_text()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.permitted_domains(), second.permitted_domains());
        assert_eq!(first.restricted_domains(), second.restricted_domains());
    }

    #[test]
    fn equality_by_text() {
        let texts = ["||a.com^", "||a.com^", "||b.com^"];
        let rules: HashSet<_> = texts.into_iter().filter_map(Rule::parse).collect();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn common_accessors() {
        let rule = Rule::parse("||ads.org^$domain=a.com|~b.a.com").unwrap();
        assert_eq!(rule.permitted_domains(), ["a.com"]);
        assert_eq!(rule.restricted_domains(), ["b.a.com"]);
        assert!(!rule.is_generic());
        assert!(rule.is_domain_sensitive());
        assert!(rule.is_permitted("www.a.com"));
        assert!(!rule.is_permitted("b.a.com"));
        assert!(!rule.is_cosmetic());

        let rule = Rule::parse("~example.org##.ad").unwrap();
        assert!(rule.is_generic());
        assert!(rule.is_domain_sensitive());
        assert!(rule.is_cosmetic());
        assert!(!rule.is_permitted("example.org"));
    }

    #[test]
    fn cosmetic_text() {
        assert!(is_cosmetic_rule("example.org##.ad"));
        assert!(is_cosmetic_rule("example.org#%#alert(1)"));
        assert!(is_cosmetic_rule("$$script"));
        assert!(!is_cosmetic_rule("||example.org^$third-party"));
        assert!(!is_cosmetic_rule(""));
    }

    #[test]
    fn parse_list() {
        let list = concat!(
            "\u{feff}! Title: Test\n[Adblock Plus 2.0]\n",
            "||ads.org^\r\nexample.org##.ad\n\n@@||ads.org/ok^\n",
        );
        let rules = parse(list);
        let texts: Vec<_> = rules.iter().map(Rule::rule_text).collect();
        assert_eq!(texts, ["||ads.org^", "example.org##.ad", "@@||ads.org/ok^"]);
    }
}
