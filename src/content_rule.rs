//! HTML content filtering rules.

use std::collections::HashMap;

use crate::domains::DomainScope;
use crate::error::RuleError;
use crate::wildcard::Wildcard;
use crate::MASK_CONTENT_RULE;

const ATTRIBUTE_START: char = '[';
const ATTRIBUTE_END: char = ']';
const QUOTE: char = '"';

const TAG_CONTENT: &str = "tag-content";
const WILDCARD: &str = "wildcard";
const MAX_LENGTH: &str = "max-length";
const MIN_LENGTH: &str = "min-length";
const PARENT_ELEMENTS: &str = "parent-elements";
const PARENT_SEARCH_LEVEL: &str = "parent-search-level";

/// Default number of ancestors searched for [`ContentFilterRule::parent_elements`].
pub const DEFAULT_PARENT_SEARCH_LEVEL: u32 = 3;

/// Rule removing HTML elements from a page before it is parsed, like
/// `example.org$$script[tag-content="banner"][max-length="500"]`.
#[derive(Clone, Debug)]
pub struct ContentFilterRule {
    rule_text: String,
    scope: DomainScope,
    tag_name: String,
    attributes_filter: HashMap<String, String>,
    tag_content_filter: Option<String>,
    wildcard: Option<Wildcard>,
    max_length: usize,
    min_length: usize,
    parent_elements: Option<Vec<String>>,
    parent_search_level: u32,
}

impl ContentFilterRule {
    pub fn new(rule_text: &str) -> Result<Self, RuleError> {
        let mask_index = rule_text.find(MASK_CONTENT_RULE).ok_or(RuleError::MissingMask)?;
        let body_start = mask_index + MASK_CONTENT_RULE.len();

        let mut attribute_start =
            rule_text[body_start..].find(ATTRIBUTE_START).map(|index| body_start + index);
        let tag_name = &rule_text[body_start..attribute_start.unwrap_or(rule_text.len())];

        let mut rule = Self {
            rule_text: rule_text.into(),
            scope: DomainScope::parse(&rule_text[..mask_index]),
            tag_name: tag_name.into(),
            attributes_filter: HashMap::new(),
            tag_content_filter: None,
            wildcard: None,
            max_length: 0,
            min_length: 0,
            parent_elements: None,
            parent_search_level: DEFAULT_PARENT_SEARCH_LEVEL,
        };

        while let Some(start) = attribute_start {
            let equality = rule_text[start + 1..]
                .find('=')
                .map(|index| start + 1 + index)
                .ok_or_else(|| RuleError::MalformedAttribute(rule_text[start..].into()))?;

            let quote_start = match rule_text[equality + 1..].find(QUOTE) {
                Some(index) => equality + 1 + index,
                None => break,
            };
            let quote_end = match closing_quote(rule_text, quote_start + 1) {
                Some(quote_end) => quote_end,
                None => break,
            };

            let name = &rule_text[start + 1..equality];
            let value = rule_text[quote_start + 1..quote_end].replace("\"\"", "\"");
            rule.set_attribute(name, value)?;

            attribute_start = rule_text[quote_end + 1..]
                .find(ATTRIBUTE_END)
                .map(|index| quote_end + 1 + index + 1)
                .and_then(|end| rule_text[end..].find(ATTRIBUTE_START).map(|index| end + index));
        }

        Ok(rule)
    }

    fn set_attribute(&mut self, name: &str, value: String) -> Result<(), RuleError> {
        match name {
            TAG_CONTENT => self.tag_content_filter = Some(value),
            WILDCARD => self.wildcard = Some(Wildcard::new(&value)?),
            MAX_LENGTH => self.max_length = value.trim().parse().unwrap_or(0),
            MIN_LENGTH => self.min_length = value.trim().parse().unwrap_or(0),
            PARENT_ELEMENTS => {
                let parents = value.split(',').filter(|parent| !parent.is_empty());
                self.parent_elements = Some(parents.map(String::from).collect());
            },
            PARENT_SEARCH_LEVEL => self.parent_search_level = value.trim().parse().unwrap_or(0),
            _ => {
                self.attributes_filter.insert(name.into(), value);
            },
        }

        Ok(())
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Required element attributes and the text their values must contain.
    pub fn attributes_filter(&self) -> &HashMap<String, String> {
        &self.attributes_filter
    }

    pub fn tag_content_filter(&self) -> Option<&str> {
        self.tag_content_filter.as_deref()
    }

    pub fn wildcard(&self) -> Option<&Wildcard> {
        self.wildcard.as_ref()
    }

    /// Maximum element content length, `0` if unset.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Minimum element content length, `0` if unset.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Tag names of which one must be an ancestor of the element.
    pub fn parent_elements(&self) -> Option<&[String]> {
        self.parent_elements.as_deref()
    }

    /// Number of ancestors searched for [`Self::parent_elements`].
    pub fn parent_search_level(&self) -> u32 {
        self.parent_search_level
    }

    /// Check if an element should be removed by this rule.
    ///
    /// Ancestor constraints are not checked, since they depend on the document tree.
    pub fn matches_element(
        &self,
        tag_name: &str,
        attributes: &[(&str, &str)],
        content: &str,
    ) -> bool {
        if !self.tag_name.eq_ignore_ascii_case(tag_name) {
            return false;
        }

        let attributes_match = self.attributes_filter.iter().all(|(name, filter)| {
            attributes
                .iter()
                .find(|(attribute, _)| attribute.eq_ignore_ascii_case(name))
                .is_some_and(|(_, value)| contains_ignore_case(value, filter))
        });
        if !attributes_match {
            return false;
        }

        if let Some(filter) = &self.tag_content_filter {
            if !contains_ignore_case(content, filter) {
                return false;
            }
        }

        if let Some(wildcard) = &self.wildcard {
            if !wildcard.matches(content) {
                return false;
            }
        }

        let length = content.chars().count();
        (self.min_length == 0 || length >= self.min_length)
            && (self.max_length == 0 || length <= self.max_length)
    }
}

/// Find the first quote at or after `start` which is not escaped by doubling.
fn closing_quote(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = start;
    loop {
        index += text[index..].find(QUOTE)?;
        if bytes.get(index + 1) != Some(&b'"') {
            return Some(index);
        }
        index += 2;
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_only() {
        let rule = ContentFilterRule::new("$$script").unwrap();
        assert_eq!(rule.tag_name(), "script");
        assert!(rule.attributes_filter().is_empty());
        assert!(rule.scope().is_generic());
        assert_eq!(rule.parent_search_level(), DEFAULT_PARENT_SEARCH_LEVEL);
    }

    #[test]
    fn attributes() {
        let text = concat!(
            "example.org,~sub.example.org$$div",
            "[id=\"ad_text\"][tag-content=\"teaser\"][max-length=\"500\"]",
        );
        let rule = ContentFilterRule::new(text).unwrap();
        assert_eq!(rule.tag_name(), "div");
        assert_eq!(rule.attributes_filter().get("id").map(String::as_str), Some("ad_text"));
        assert_eq!(rule.tag_content_filter(), Some("teaser"));
        assert_eq!(rule.max_length(), 500);
        assert_eq!(rule.min_length(), 0);
        assert_eq!(rule.scope().permitted_domains(), ["example.org"]);
        assert_eq!(rule.scope().restricted_domains(), ["sub.example.org"]);
    }

    #[test]
    fn escaped_quotes() {
        let text = "$$div[tag-content=\"say \"\"hi\"\"\"][id=\"x\"]";
        let rule = ContentFilterRule::new(text).unwrap();
        assert_eq!(rule.tag_content_filter(), Some("say \"hi\""));
        assert_eq!(rule.attributes_filter().get("id").map(String::as_str), Some("x"));
    }

    #[test]
    fn parents() {
        let text = "$$div[parent-elements=\"td,table,\"][parent-search-level=\"5\"]";
        let rule = ContentFilterRule::new(text).unwrap();
        assert_eq!(rule.parent_elements(), Some(&["td".to_string(), "table".to_string()][..]));
        assert_eq!(rule.parent_search_level(), 5);
    }

    #[test]
    fn invalid_number() {
        let rule = ContentFilterRule::new("$$div[min-length=\"abc\"]").unwrap();
        assert_eq!(rule.min_length(), 0);
    }

    #[test]
    fn unterminated_quote() {
        let rule = ContentFilterRule::new("$$div[id=\"a\"][class=\"unterminated").unwrap();
        assert_eq!(rule.attributes_filter().len(), 1);
    }

    #[test]
    fn missing_equals() {
        let rule = ContentFilterRule::new("$$div[id]");
        assert!(matches!(rule, Err(RuleError::MalformedAttribute(_))));
    }

    #[test]
    fn matches_element() {
        let text = concat!(
            "$$script[type=\"javascript\"][tag-content=\"adsbygoogle\"]",
            "[min-length=\"15\"][max-length=\"100\"]",
        );
        let rule = ContentFilterRule::new(text).unwrap();

        let attributes = [("TYPE", "text/JavaScript")];
        assert!(rule.matches_element("SCRIPT", &attributes, "(adsbygoogle = []).push({});"));
        assert!(!rule.matches_element("div", &attributes, "(adsbygoogle = []).push({});"));
        assert!(!rule.matches_element("script", &[], "(adsbygoogle = []).push({});"));
        assert!(!rule.matches_element("script", &attributes, "adsbygoogle"));
        assert!(!rule.matches_element("script", &attributes, &"adsbygoogle".repeat(10)));
        assert!(!rule.matches_element("script", &attributes, "nothing to see here"));
    }

    #[test]
    fn matches_wildcard() {
        let rule = ContentFilterRule::new("$$script[wildcard=\"*var ad?=*\"]").unwrap();
        assert!(rule.wildcard().is_some());
        assert!(rule.matches_element("script", &[], "x;\nvar ads=1;"));
        assert!(!rule.matches_element("script", &[], "var a=1;"));
    }
}
