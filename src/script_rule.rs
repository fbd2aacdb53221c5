//! JavaScript injection rules.

use crate::domains::DomainScope;
use crate::error::RuleError;
use crate::MASK_SCRIPT_RULE;

/// Rule injecting a script into matching pages, like
/// `example.org#%#window.gapi = {};`.
#[derive(Clone, Debug)]
pub struct ScriptFilterRule {
    rule_text: String,
    scope: DomainScope,
    script_text: String,
}

impl ScriptFilterRule {
    pub fn new(rule_text: &str) -> Result<Self, RuleError> {
        let index = rule_text.find(MASK_SCRIPT_RULE).ok_or(RuleError::MissingMask)?;

        Ok(Self {
            script_text: rule_text[index + MASK_SCRIPT_RULE.len()..].into(),
            scope: DomainScope::parse(&rule_text[..index]),
            rule_text: rule_text.into(),
        })
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    pub fn script_text(&self) -> &str {
        &self.script_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic() {
        let rule =
            ScriptFilterRule::new("#%#window.gapi={ plusone: { go: function(){} }};").unwrap();
        assert_eq!(rule.script_text(), "window.gapi={ plusone: { go: function(){} }};");
        assert!(rule.scope().is_generic());
    }

    #[test]
    fn domains() {
        let rule = ScriptFilterRule::new("example.org,~sub.example.org#%#alert(1);").unwrap();
        assert_eq!(rule.script_text(), "alert(1);");
        assert!(rule.scope().is_permitted("example.org"));
        assert!(!rule.scope().is_permitted("sub.example.org"));
        assert!(!rule.scope().is_permitted("example.com"));
    }

    #[test]
    fn missing_mask() {
        assert!(matches!(ScriptFilterRule::new("example.org##div"), Err(RuleError::MissingMask)));
    }
}
