//! Network request blocking and exception rules.

use std::borrow::Cow;
use std::collections::HashMap;

use bitflags::bitflags;
use log::debug;
use once_cell::sync::{Lazy, OnceCell};
use regex::{Regex, RegexBuilder};

use crate::content_type::{self, ContentType};
use crate::domains::{self, DomainScope};
use crate::error::RuleError;
use crate::request::Request;
use crate::MASK_WHITE_LIST;

/// Maximum length of a rule's shortcut.
pub const SHORTCUT_LENGTH: usize = 6;

/// Separator between the URL mask and the rule options.
const OPTIONS_DELIMITER: char = '$';

/// Start and end of a regex literal URL mask.
const MASK_REGEX_RULE: char = '/';

/// Regex matching any scheme and subdomain in front of the host.
const REGEX_START_URL: &str = "^https?://([a-z0-9_.-]+\\.)?";

/// Regex matching any one separator character or the end of the URL.
const REGEX_SEPARATOR: &str = "([^ a-zA-Z0-9.%]|$)";

/// Regex matching anything.
const REGEX_ANY_SYMBOL: &str = ".*";

/// Mask prefixes which are followed by the domain name.
const DOMAIN_PREFIXES: [&str; 5] = ["http://www.", "https://www.", "http://", "https://", "||"];

bitflags! {
    /// Boolean URL rule options.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct UrlOptions: u16 {
        /// Disable cosmetic rules on matching pages.
        const ELEMHIDE       = 0b000_0000_0001;
        const THIRD_PARTY    = 0b000_0000_0010;
        /// Disable HTML content rules on matching pages.
        const CONTENT        = 0b000_0000_0100;
        /// Disable generic cosmetic rules on matching pages.
        const GENERIC_HIDE   = 0b000_0000_1000;
        /// Disable generic URL rules on matching pages.
        const GENERIC_BLOCK  = 0b000_0001_0000;
        /// Disable script injection on matching pages.
        const JS_INJECT      = 0b000_0010_0000;
        /// Disable request blocking for requests originating from matching pages.
        const URL_BLOCK      = 0b000_0100_0000;
        /// Close the popup instead of blocking the request.
        const BLOCK_POPUPS   = 0b000_1000_0000;
        /// Respond with an empty body.
        const EMPTY_RESPONSE = 0b001_0000_0000;
        const MATCH_CASE     = 0b010_0000_0000;
        /// Respond with an mp4 video stub.
        const MP4            = 0b100_0000_0000;
    }
}

/// Options which limit a rule to top-level documents.
const DOCUMENT_LEVEL_OPTIONS: UrlOptions = UrlOptions::JS_INJECT
    .union(UrlOptions::ELEMHIDE)
    .union(UrlOptions::URL_BLOCK)
    .union(UrlOptions::CONTENT)
    .union(UrlOptions::BLOCK_POPUPS);

/// Effect of a single rule option.
#[derive(Clone, Copy, Debug)]
enum OptionEffect {
    Domains,
    Enable(UrlOptions),
    Disable(UrlOptions),
    PermitContent(ContentType),
    RestrictContent(ContentType),
    Ignore,
}

static OPTIONS: Lazy<HashMap<String, OptionEffect>> = Lazy::new(|| {
    let document = UrlOptions::ELEMHIDE
        | UrlOptions::CONTENT
        | UrlOptions::JS_INJECT
        | UrlOptions::URL_BLOCK;

    let mut options: HashMap<String, OptionEffect> = [
        ("domain", OptionEffect::Domains),
        ("third-party", OptionEffect::Enable(UrlOptions::THIRD_PARTY)),
        ("~third-party", OptionEffect::Disable(UrlOptions::THIRD_PARTY)),
        ("match-case", OptionEffect::Enable(UrlOptions::MATCH_CASE)),
        ("document", OptionEffect::Enable(document)),
        ("elemhide", OptionEffect::Enable(UrlOptions::ELEMHIDE)),
        ("content", OptionEffect::Enable(UrlOptions::CONTENT)),
        ("genericblock", OptionEffect::Enable(UrlOptions::GENERIC_BLOCK)),
        ("generichide", OptionEffect::Enable(UrlOptions::GENERIC_HIDE)),
        ("jsinject", OptionEffect::Enable(UrlOptions::JS_INJECT)),
        ("urlblock", OptionEffect::Enable(UrlOptions::URL_BLOCK)),
        ("popup", OptionEffect::Enable(UrlOptions::BLOCK_POPUPS)),
        ("mp4", OptionEffect::Enable(UrlOptions::MP4)),
        ("empty", OptionEffect::Enable(UrlOptions::EMPTY_RESPONSE)),
        ("collapse", OptionEffect::Ignore),
        ("~collapse", OptionEffect::Ignore),
        ("background", OptionEffect::Ignore),
        ("~background", OptionEffect::Ignore),
        ("~document", OptionEffect::Ignore),
    ]
    .into_iter()
    .map(|(name, effect)| (name.to_string(), effect))
    .collect();

    for (name, content_type) in content_type::OPTION_NAMES {
        options.insert(name.to_string(), OptionEffect::PermitContent(*content_type));
        options.insert(format!("~{name}"), OptionEffect::RestrictContent(*content_type));
    }

    options
});

/// Rule for blocking or allowing requests by URL.
///
/// Only the whitelist prefix and the shortcut are parsed on construction; options,
/// domains, and the URL regex are loaded once on first use.
#[derive(Clone, Debug)]
pub struct UrlFilterRule {
    rule_text: String,
    whitelist: bool,
    shortcut: Option<String>,
    properties: OnceCell<Result<Properties, RuleError>>,
}

/// Lazily loaded part of a URL rule.
#[derive(Clone, Debug)]
struct Properties {
    options: RuleOptions,
    regex: Regex,
}

/// Options and domains of a URL rule.
#[derive(Clone, Debug)]
struct RuleOptions {
    scope: DomainScope,
    enabled: UrlOptions,
    disabled: UrlOptions,
    permitted_content: ContentType,
    restricted_content: ContentType,
    document_level: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            permitted_content: ContentType::ANY,
            restricted_content: ContentType::NONE,
            disabled: UrlOptions::empty(),
            enabled: UrlOptions::empty(),
            document_level: Default::default(),
            scope: Default::default(),
        }
    }
}

impl RuleOptions {
    /// Parse a comma separated option list.
    fn parse(options: &str) -> Result<Self, RuleError> {
        let mut rule_options = Self::default();

        for option in options.split(',').filter(|option| !option.is_empty()) {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (option, None),
            };

            let effect = OPTIONS.get(name).ok_or_else(|| RuleError::UnknownOption(name.into()))?;
            match *effect {
                OptionEffect::Domains => {
                    if let Some(domains) = value {
                        rule_options.scope.add_domains(domains);
                    }
                },
                OptionEffect::Enable(options) => rule_options.enabled.insert(options),
                OptionEffect::Disable(options) => rule_options.disabled.insert(options),
                OptionEffect::PermitContent(content_type) => {
                    // The first explicit content type replaces the default.
                    if rule_options.permitted_content == ContentType::ANY {
                        rule_options.permitted_content = content_type;
                    } else {
                        rule_options.permitted_content.insert(content_type);
                    }
                },
                OptionEffect::RestrictContent(content_type) => {
                    rule_options.restricted_content.insert(content_type)
                },
                OptionEffect::Ignore => (),
            }
        }

        if rule_options.enabled.intersects(DOCUMENT_LEVEL_OPTIONS) {
            rule_options.permitted_content = ContentType::DOCUMENT;
            rule_options.document_level = true;
        }

        Ok(rule_options)
    }

    fn matches_content_type(&self, content_types: ContentType) -> bool {
        let permitted = self.permitted_content == ContentType::ANY
            || self.permitted_content.intersects(content_types);
        let not_restricted = self.restricted_content.is_empty()
            || !self.restricted_content.intersects(content_types);
        permitted && not_restricted
    }
}

impl UrlFilterRule {
    pub fn new(rule_text: &str) -> Result<Self, RuleError> {
        if rule_text.is_empty() {
            return Err(RuleError::EmptyRule);
        }

        let stripped_whitelist = rule_text.strip_prefix(MASK_WHITE_LIST);
        let whitelist = stripped_whitelist.is_some();
        let (mask, _) = split_options(stripped_whitelist.unwrap_or(rule_text));

        let mask = mask_to_punycode(mask);
        let shortcut = if is_regex_mask(&mask) { None } else { find_shortcut(&mask) };

        Ok(Self { rule_text: rule_text.into(), whitelist, shortcut, properties: OnceCell::new() })
    }

    pub fn rule_text(&self) -> &str {
        &self.rule_text
    }

    /// Check if this is an exception rule (`@@`).
    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    /// Lowercase substring every matching URL must contain.
    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    /// Compiled URL regex, or `None` for invalid rules.
    pub fn url_regex(&self) -> Option<&Regex> {
        self.properties().map(|properties| &properties.regex)
    }

    /// Check if loading the rule's options or regex failed.
    pub fn is_invalid(&self) -> bool {
        self.properties().is_none()
    }

    /// Reason why the rule is invalid.
    pub fn invalid_reason(&self) -> Option<&RuleError> {
        self.state().as_ref().err()
    }

    pub fn permitted_domains(&self) -> &[String] {
        match self.options() {
            Some(options) => options.scope.permitted_domains(),
            None => &[],
        }
    }

    pub fn restricted_domains(&self) -> &[String] {
        match self.options() {
            Some(options) => options.scope.restricted_domains(),
            None => &[],
        }
    }

    /// Check if the rule has no permitted domains.
    pub fn is_generic(&self) -> bool {
        self.permitted_domains().is_empty()
    }

    pub fn is_domain_sensitive(&self) -> bool {
        self.options().map_or(false, |options| options.scope.is_domain_sensitive())
    }

    /// Check if the rule applies to requests originating from `domain`.
    ///
    /// An empty domain means the request has no referrer. Generic whitelist rules and
    /// generic rules without third-party constraint still apply in that case.
    pub fn is_permitted(&self, domain: &str) -> bool {
        let options = match self.options() {
            Some(options) => options,
            None => return false,
        };

        if domain.is_empty()
            && options.scope.is_generic()
            && (self.whitelist || !self.is_check_third_party())
        {
            return true;
        }

        options.scope.is_permitted(domain)
    }

    /// Check if the rule can only be applied to top-level documents.
    pub fn is_document_level(&self) -> bool {
        self.options().map_or(false, |options| options.document_level)
    }

    /// Options enabled by this rule.
    pub fn enabled_options(&self) -> UrlOptions {
        self.options().map_or(UrlOptions::empty(), |options| options.enabled)
    }

    /// Options explicitly disabled by this rule using `~`.
    pub fn disabled_options(&self) -> UrlOptions {
        self.options().map_or(UrlOptions::empty(), |options| options.disabled)
    }

    pub fn permitted_content_types(&self) -> ContentType {
        self.options().map_or(ContentType::ANY, |options| options.permitted_content)
    }

    pub fn restricted_content_types(&self) -> ContentType {
        self.options().map_or(ContentType::NONE, |options| options.restricted_content)
    }

    /// Check if the rule distinguishes between first- and third-party requests.
    pub fn is_check_third_party(&self) -> bool {
        self.enabled_options().union(self.disabled_options()).contains(UrlOptions::THIRD_PARTY)
    }

    /// Check if the rule only applies to third-party requests.
    pub fn is_third_party(&self) -> bool {
        self.is_enabled(UrlOptions::THIRD_PARTY)
    }

    pub fn is_match_case(&self) -> bool {
        self.is_enabled(UrlOptions::MATCH_CASE)
    }

    pub fn is_elemhide(&self) -> bool {
        self.is_enabled(UrlOptions::ELEMHIDE)
    }

    pub fn is_content(&self) -> bool {
        self.is_enabled(UrlOptions::CONTENT)
    }

    pub fn is_js_inject(&self) -> bool {
        self.is_enabled(UrlOptions::JS_INJECT)
    }

    pub fn is_url_block(&self) -> bool {
        self.is_enabled(UrlOptions::URL_BLOCK)
    }

    pub fn is_generic_block(&self) -> bool {
        self.is_enabled(UrlOptions::GENERIC_BLOCK)
    }

    pub fn is_generic_hide(&self) -> bool {
        self.is_enabled(UrlOptions::GENERIC_HIDE)
    }

    pub fn is_block_popups(&self) -> bool {
        self.is_enabled(UrlOptions::BLOCK_POPUPS)
    }

    pub fn is_mp4(&self) -> bool {
        self.is_enabled(UrlOptions::MP4)
    }

    pub fn is_empty_response(&self) -> bool {
        self.is_enabled(UrlOptions::EMPTY_RESPONSE)
    }

    /// Check a request URL against this rule.
    pub fn is_filtered(&self, url: &str, third_party: bool, content_types: ContentType) -> bool {
        let Properties { options, regex } = match self.properties() {
            Some(properties) => properties,
            None => return false,
        };

        if options.enabled.contains(UrlOptions::THIRD_PARTY) && !third_party {
            return false;
        }

        if options.disabled.contains(UrlOptions::THIRD_PARTY) && third_party {
            return false;
        }

        if let Some(shortcut) = &self.shortcut {
            if !contains_ignore_ascii_case(url, shortcut) {
                return false;
            }
        }

        regex.is_match(url) && options.matches_content_type(content_types)
    }

    /// Check a request URL against this rule, guessing its content type from the URL.
    pub fn is_filtered_detect(&self, url: &str, third_party: bool) -> bool {
        self.is_filtered(url, third_party, ContentType::from_url(url))
    }

    /// Check if this rule applies to a request.
    pub fn matches(&self, request: &Request) -> bool {
        self.is_permitted(request.referrer_domain().unwrap_or(""))
            && self.is_filtered(request.url(), request.is_third_party(), request.content_types())
    }

    fn is_enabled(&self, option: UrlOptions) -> bool {
        self.enabled_options().contains(option)
    }

    fn properties(&self) -> Option<&Properties> {
        self.state().as_ref().ok()
    }

    fn options(&self) -> Option<&RuleOptions> {
        self.properties().map(|properties| &properties.options)
    }

    fn state(&self) -> &Result<Properties, RuleError> {
        self.properties.get_or_init(|| {
            let properties = self.load_properties();
            if let Err(err) = &properties {
                debug!("Invalid filter rule {:?}: {err}", self.rule_text);
            }
            properties
        })
    }

    fn load_properties(&self) -> Result<Properties, RuleError> {
        let text = self.rule_text.strip_prefix(MASK_WHITE_LIST).unwrap_or(&self.rule_text);
        let (mask, options) = split_options(text);

        let options = match options {
            Some(options) => RuleOptions::parse(options)?,
            None => RuleOptions::default(),
        };

        let mask = mask_to_punycode(mask);
        let regex = if is_regex_mask(&mask) {
            Cow::Borrowed(&mask[1..mask.len() - 1])
        } else {
            Cow::Owned(mask_to_regex(&mask))
        };

        let regex = RegexBuilder::new(&regex)
            .case_insensitive(!options.enabled.contains(UrlOptions::MATCH_CASE))
            .dot_matches_new_line(true)
            .build()?;

        Ok(Properties { options, regex })
    }
}

/// Check if a mask is a literal regex like `/banners?/`.
fn is_regex_mask(mask: &str) -> bool {
    mask.len() > 1 && mask.starts_with(MASK_REGEX_RULE) && mask.ends_with(MASK_REGEX_RULE)
}

/// Separate the URL mask from the rule options.
fn split_options(text: &str) -> (&str, Option<&str>) {
    // Regex literals might contain `$` without any options.
    if is_regex_mask(text) {
        return (text, None);
    }

    match text.rfind(OPTIONS_DELIMITER) {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    }
}

/// Convert a non-ASCII domain at the start of a mask to punycode.
fn mask_to_punycode(mask: &str) -> Cow<'_, str> {
    if mask.is_ascii() {
        return Cow::Borrowed(mask);
    }

    let start = match DOMAIN_PREFIXES.iter().find(|prefix| mask.starts_with(*prefix)) {
        Some(prefix) => prefix.len(),
        None => return Cow::Borrowed(mask),
    };
    let end = mask[start..].find(['/', '^', '|', '*', ':']).map_or(mask.len(), |i| start + i);

    let domain = &mask[start..end];
    if domain.is_ascii() {
        return Cow::Borrowed(mask);
    }

    Cow::Owned(format!("{}{}{}", &mask[..start], domains::to_punycode(domain), &mask[end..]))
}

/// Convert a URL mask into its regex representation.
fn mask_to_regex(mask: &str) -> String {
    let mut regex = String::with_capacity(mask.len() * 2);

    let mut address = mask;
    if let Some(stripped) = address.strip_prefix("||") {
        address = stripped;
        regex.push_str(REGEX_START_URL);
    } else if let Some(stripped) = address.strip_prefix('|') {
        address = stripped;
        regex.push('^');
    }

    let stripped_end = address.strip_suffix('|');
    let anchored_end = stripped_end.is_some();
    address = stripped_end.unwrap_or(address);

    for c in address.chars() {
        match c {
            '*' => regex.push_str(REGEX_ANY_SYMBOL),
            '^' => regex.push_str(REGEX_SEPARATOR),
            _ => push_regex_char(&mut regex, c),
        }
    }

    if anchored_end {
        regex.push('$');
    }

    regex
}

/// Add a char to a string, escaping special regex characters.
fn push_regex_char(regex: &mut String, c: char) {
    if matches!(c, '?' | '.' | '+' | '[' | ']' | '(' | ')' | '{' | '}' | '\\' | '$' | '|') {
        regex.push('\\');
    }
    regex.push(c);
}

/// Find the lowercase shortcut of a URL mask.
///
/// This is the tail of the longest mask part without any special characters.
fn find_shortcut(mask: &str) -> Option<String> {
    let longest = mask
        .split(['*', '^', '|'])
        .fold("", |longest, part| if part.len() > longest.len() { part } else { longest });
    if longest.is_empty() {
        return None;
    }

    let skip = longest.chars().count().saturating_sub(SHORTCUT_LENGTH);
    Some(longest.chars().skip(skip).collect::<String>().to_ascii_lowercase())
}

/// Check if `haystack` contains the lowercase `needle`, ignoring ASCII case.
fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    needle.is_empty()
        || haystack
            .as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle))
}
