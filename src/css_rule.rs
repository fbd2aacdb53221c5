//! Cosmetic element hiding and style injection rules.

use crate::domains::DomainScope;
use crate::error::RuleError;
use crate::{
    MASK_CSS_EXCEPTION_RULE, MASK_CSS_INJECT_EXCEPTION_RULE, MASK_CSS_INJECT_RULE, MASK_CSS_RULE,
};

/// Cosmetic rule masks in the order they're checked, with their style inject and
/// whitelist flags.
const CSS_MASKS: [(&str, bool, bool); 4] = [
    (MASK_CSS_INJECT_EXCEPTION_RULE, true, true),
    (MASK_CSS_EXCEPTION_RULE, false, true),
    (MASK_CSS_INJECT_RULE, true, false),
    (MASK_CSS_RULE, false, false),
];

/// Rule hiding elements by CSS selector or injecting CSS styles.
///
/// Formats:
///  - `[domains]##selector`
///  - `[domains]#@#selector`
///  - `[domains]#$#selector { style }`
///  - `[domains]#@$#selector { style }`
#[derive(Clone, Debug)]
pub struct CssFilterRule {
    rule_text: String,
    scope: DomainScope,
    css_content: String,
    style_inject: bool,
    whitelist: bool,
}

impl CssFilterRule {
    pub fn new(rule_text: &str) -> Result<Self, RuleError> {
        let (index, mask, style_inject, whitelist) = CSS_MASKS
            .iter()
            .find_map(|&(mask, style_inject, whitelist)| {
                rule_text.find(mask).map(|index| (index, mask, style_inject, whitelist))
            })
            .ok_or(RuleError::MissingMask)?;

        Ok(Self {
            css_content: rule_text[index + mask.len()..].into(),
            scope: DomainScope::parse(&rule_text[..index]),
            rule_text: rule_text.into(),
            style_inject,
            whitelist,
        })
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    /// Selector of hidden elements, or `selector { style }` for style injection.
    pub fn css_content(&self) -> &str {
        &self.css_content
    }

    pub fn is_style_inject(&self) -> bool {
        self.style_inject
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide() {
        let rule = CssFilterRule::new("example.com##.ad").unwrap();
        assert_eq!(rule.css_content(), ".ad");
        assert!(!rule.is_whitelist());
        assert!(!rule.is_style_inject());
        assert_eq!(rule.scope().permitted_domains(), ["example.com"]);
    }

    #[test]
    fn hide_whitelist() {
        let rule = CssFilterRule::new("example.com#@#.ad").unwrap();
        assert_eq!(rule.css_content(), ".ad");
        assert!(rule.is_whitelist());
        assert!(!rule.is_style_inject());
    }

    #[test]
    fn inject() {
        let rule = CssFilterRule::new("example.com#$#.ad { display:none }").unwrap();
        assert_eq!(rule.css_content(), ".ad { display:none }");
        assert!(!rule.is_whitelist());
        assert!(rule.is_style_inject());
    }

    #[test]
    fn inject_whitelist() {
        let rule = CssFilterRule::new("example.com#@$#.ad { display:none }").unwrap();
        assert_eq!(rule.css_content(), ".ad { display:none }");
        assert!(rule.is_whitelist());
        assert!(rule.is_style_inject());
        assert_eq!(rule.scope().permitted_domains(), ["example.com"]);
    }

    #[test]
    fn generic() {
        let rule = CssFilterRule::new("###banner").unwrap();
        assert_eq!(rule.css_content(), "#banner");
        assert!(rule.scope().is_generic());
        assert!(!rule.scope().is_domain_sensitive());
    }

    #[test]
    fn domains() {
        let rule = CssFilterRule::new("example.org,~not.example.org,github.com##.bad").unwrap();
        assert_eq!(rule.scope().permitted_domains(), ["example.org", "github.com"]);
        assert_eq!(rule.scope().restricted_domains(), ["not.example.org"]);
        assert!(rule.scope().is_permitted("www.github.com"));
        assert!(!rule.scope().is_permitted("not.example.org"));
    }

    #[test]
    fn attribute_selector() {
        let rule = CssFilterRule::new("##a[href^=\"http://ads.\"]").unwrap();
        assert_eq!(rule.css_content(), "a[href^=\"http://ads.\"]");
    }

    #[test]
    fn mask_priority() {
        let rule = CssFilterRule::new("a.com#@#x#$#y").unwrap();
        assert!(rule.is_whitelist());
        assert!(!rule.is_style_inject());
        assert_eq!(rule.css_content(), "x#$#y");

        let rule = CssFilterRule::new("a.com#$#x##y").unwrap();
        assert!(!rule.is_whitelist());
        assert!(rule.is_style_inject());
        assert_eq!(rule.css_content(), "x##y");
    }

    #[test]
    fn missing_mask() {
        assert!(matches!(CssFilterRule::new("example.com#.ad"), Err(RuleError::MissingMask)));
    }
}
