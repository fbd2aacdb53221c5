//! Collection of parsed filter rules.

use std::fmt::{self, Display, Formatter};

use log::trace;

use crate::content_rule::ContentFilterRule;
use crate::css_rule::CssFilterRule;
use crate::request::Request;
use crate::script_rule::ScriptFilterRule;
use crate::url_rule::UrlFilterRule;
use crate::Rule;

/// Rules of one or more filter lists, in list order.
#[derive(Clone, Default, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Parse all rules of a filter list.
    pub fn from_text(filter: &str) -> Self {
        Self { rules: crate::parse(filter) }
    }

    /// Parse rules from individual lines.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self { rules: lines.into_iter().filter_map(Rule::parse).collect() }
    }

    /// Append all rules of another filter list.
    pub fn extend_from_text(&mut self, filter: &str) {
        self.rules.extend(crate::parse(filter));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn url_rules(&self) -> impl Iterator<Item = &UrlFilterRule> {
        self.rules.iter().filter_map(Rule::as_url)
    }

    pub fn css_rules(&self) -> impl Iterator<Item = &CssFilterRule> {
        self.rules.iter().filter_map(Rule::as_css)
    }

    pub fn script_rules(&self) -> impl Iterator<Item = &ScriptFilterRule> {
        self.rules.iter().filter_map(Rule::as_script)
    }

    pub fn content_rules(&self) -> impl Iterator<Item = &ContentFilterRule> {
        self.rules.iter().filter_map(Rule::as_content)
    }

    /// Number of rules of each kind.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for rule in &self.rules {
            match rule {
                Rule::Url(rule) if rule.is_whitelist() => summary.url_whitelist += 1,
                Rule::Url(_) => summary.url += 1,
                Rule::Css(_) => summary.css += 1,
                Rule::Script(_) => summary.script += 1,
                Rule::Content(_) => summary.content += 1,
            }
        }
        summary
    }

    /// All URL rules matching a request.
    ///
    /// Blocking and exception rules are both returned, resolving which one wins is up
    /// to the caller.
    pub fn matching_url_rules(&self, request: &Request) -> Vec<&UrlFilterRule> {
        self.url_rules()
            .filter(|rule| {
                let matches = rule.matches(request);
                if matches {
                    trace!("{} matched {}", rule.rule_text(), request.url());
                }
                matches
            })
            .collect()
    }

    /// Element hiding and CSS injection rules for pages on `domain`.
    pub fn css_rules_for<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a CssFilterRule> {
        self.css_rules().filter(move |rule| rule.scope().is_permitted(domain))
    }

    /// Script injection rules for pages on `domain`.
    pub fn script_rules_for<'a>(
        &'a self,
        domain: &'a str,
    ) -> impl Iterator<Item = &'a ScriptFilterRule> {
        self.script_rules().filter(move |rule| rule.scope().is_permitted(domain))
    }

    /// HTML content rules for pages on `domain`.
    pub fn content_rules_for<'a>(
        &'a self,
        domain: &'a str,
    ) -> impl Iterator<Item = &'a ContentFilterRule> {
        self.content_rules().filter(move |rule| rule.scope().is_permitted(domain))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type IntoIter = std::slice::Iter<'a, Rule>;
    type Item = &'a Rule;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self { rules: iter.into_iter().collect() }
    }
}

/// Rule counts of a [`RuleSet`].
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Summary {
    pub url: usize,
    pub url_whitelist: usize,
    pub css: usize,
    pub script: usize,
    pub content: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.url + self.url_whitelist + self.css + self.script + self.content
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "url:           {}", self.url)?;
        writeln!(f, "url whitelist: {}", self.url_whitelist)?;
        writeln!(f, "css:           {}", self.css)?;
        writeln!(f, "script:        {}", self.script)?;
        writeln!(f, "content:       {}", self.content)?;
        write!(f, "total:         {}", self.total())
    }
}
