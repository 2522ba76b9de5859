//! The configuration surface: allowed tags, attribute schemas,
//! structural relations, callbacks and mode flags.
//!
//! A [`Sieve`] is built once and then consumed read-only by
//! [`Sieve::parse`]; all per-parse state lives in the scanner, so one
//! configuration may serve concurrent parses.

use std::borrow::Cow;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::classes::{class_of, SPECIAL_CHAR};
use crate::error::{ConfigError, ParseError};
use crate::scanner::Scanner;

/// Attribute map handed to tag builder callbacks.
pub type AttrMap = FxHashMap<String, String>;

pub(crate) type TagBuilder = Box<dyn Fn(&str, &AttrMap, &str) -> String + Send + Sync>;
pub(crate) type SpecialCharFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A compiled attribute-value schema. An attribute's schema list is
/// checked in order; the first match wins.
pub(crate) enum AttrPattern {
    /// Exact string.
    Literal(String),
    /// `#str`: any non-empty string.
    Any,
    /// `#int`: decimal digits only.
    Integer,
    /// `#link`: URL with safety rules and protocol normalization.
    Link,
    /// `#regexp(...)`: compiled once, matched unanchored.
    Regexp(Regex),
}

impl AttrPattern {
    fn parse(spec: &str) -> Result<Self, ConfigError> {
        match spec {
            "#str" => Ok(AttrPattern::Any),
            "#int" => Ok(AttrPattern::Integer),
            "#link" => Ok(AttrPattern::Link),
            other if other.starts_with("#regexp(") && other.ends_with(')') => {
                let pattern = &other["#regexp(".len()..other.len() - 1];
                match Regex::new(pattern) {
                    Ok(re) => Ok(AttrPattern::Regexp(re)),
                    Err(source) => Err(ConfigError::BadPattern {
                        pattern: pattern.to_string(),
                        source,
                    }),
                }
            }
            other => Ok(AttrPattern::Literal(other.to_string())),
        }
    }
}

/// HTML/XHTML sanitizer and typographer.
///
/// Register the allowed markup, then call [`parse`](Sieve::parse) as
/// often as needed. Tag names are lowercased on registration and on
/// lookup.
pub struct Sieve {
    pub(crate) allowed: FxHashSet<String>,
    pub(crate) short: FxHashSet<String>,
    pub(crate) preformatted: FxHashSet<String>,
    pub(crate) no_typography: FxHashSet<String>,
    pub(crate) empty_allowed: FxHashSet<String>,
    pub(crate) no_auto_br: FxHashSet<String>,
    pub(crate) cut_with_content: FxHashSet<String>,
    pub(crate) block_type: FxHashSet<String>,
    pub(crate) global_only: FxHashSet<String>,
    pub(crate) parent_only: FxHashSet<String>,
    pub(crate) child_only: FxHashSet<String>,

    pub(crate) children: FxHashMap<String, FxHashSet<String>>,
    pub(crate) parents: FxHashMap<String, FxHashSet<String>>,

    pub(crate) attr_rules: FxHashMap<String, FxHashMap<String, Vec<AttrPattern>>>,
    pub(crate) attr_order: FxHashMap<String, Vec<String>>,
    pub(crate) attr_required: FxHashMap<String, FxHashSet<String>>,
    pub(crate) attr_default: FxHashMap<String, FxHashMap<String, String>>,
    pub(crate) attr_override: FxHashMap<String, FxHashMap<String, String>>,

    pub(crate) builders: FxHashMap<String, TagBuilder>,
    pub(crate) special_chars: FxHashMap<char, SpecialCharFn>,

    pub(crate) link_protocols: Vec<String>,
    pub(crate) quote_pairs: Vec<(char, char)>,
    pub(crate) dash: String,
    pub(crate) eol: String,
    pub(crate) br: &'static str,

    pub(crate) xhtml: bool,
    pub(crate) auto_br: bool,
    pub(crate) auto_link: bool,
    pub(crate) special_char_mode: bool,
    pub(crate) typography: bool,

    pub(crate) max_depth: usize,
}

impl Default for Sieve {
    fn default() -> Self {
        Self::new()
    }
}

impl Sieve {
    pub fn new() -> Self {
        Sieve {
            allowed: FxHashSet::default(),
            short: FxHashSet::default(),
            preformatted: FxHashSet::default(),
            no_typography: FxHashSet::default(),
            empty_allowed: FxHashSet::default(),
            no_auto_br: FxHashSet::default(),
            cut_with_content: FxHashSet::default(),
            block_type: FxHashSet::default(),
            global_only: FxHashSet::default(),
            parent_only: FxHashSet::default(),
            child_only: FxHashSet::default(),
            children: FxHashMap::default(),
            parents: FxHashMap::default(),
            attr_rules: FxHashMap::default(),
            attr_order: FxHashMap::default(),
            attr_required: FxHashMap::default(),
            attr_default: FxHashMap::default(),
            attr_override: FxHashMap::default(),
            builders: FxHashMap::default(),
            special_chars: FxHashMap::default(),
            link_protocols: vec!["http".into(), "https".into(), "ftp".into()],
            quote_pairs: vec![('«', '»'), ('„', '“')],
            dash: "—".to_string(),
            eol: "\n".to_string(),
            br: "<br>",
            xhtml: false,
            auto_br: true,
            auto_link: true,
            special_char_mode: false,
            typography: true,
            max_depth: 64,
        }
    }

    /// Sanitizes `text` against this configuration. Always returns an
    /// output string; diagnostics accumulate in the error list.
    pub fn parse(&self, text: &str) -> (String, Vec<ParseError>) {
        let text = strip_cr(text);
        Scanner::new(self, &text).run()
    }

    // ── Tag registration ────────────────────────────────────────────

    /// Lowercases `tag` and verifies it was registered with
    /// [`allow_tags`](Sieve::allow_tags).
    fn checked_tag(&self, tag: &str) -> Result<String, ConfigError> {
        let tag = tag.to_ascii_lowercase();
        if self.allowed.contains(&tag) {
            Ok(tag)
        } else {
            Err(ConfigError::UnknownTag(tag))
        }
    }

    fn checked_tags<'a>(
        &self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<String>, ConfigError> {
        tags.into_iter().map(|tag| self.checked_tag(tag)).collect()
    }

    /// Registers tags that survive sanitization.
    pub fn allow_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        for tag in tags {
            self.allowed.insert(tag.to_ascii_lowercase());
        }
    }

    /// Marks tags as void/self-closing (`<br>`, `<img>`).
    pub fn short_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.short.insert(tag);
        }
        Ok(())
    }

    /// Marks tags whose content is escaped verbatim instead of parsed.
    pub fn preformatted_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.preformatted.insert(tag);
        }
        Ok(())
    }

    /// Disables typography inside the given tags.
    pub fn no_typography_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.no_typography.insert(tag);
        }
        Ok(())
    }

    /// Non-short tags that may stay in the output with empty content.
    pub fn empty_allowed_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.empty_allowed.insert(tag);
        }
        Ok(())
    }

    /// Suppresses newline-to-break conversion inside the given tags.
    pub fn no_auto_br_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.no_auto_br.insert(tag);
        }
        Ok(())
    }

    /// Tags removed together with their content (`script`, `style`,
    /// `iframe`). These are hostile containers, so they need not be in
    /// the allowed list.
    pub fn cut_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        for tag in tags {
            self.cut_with_content.insert(tag.to_ascii_lowercase());
        }
    }

    /// Block-level tags: a structural newline follows the close tag,
    /// and one source newline after the tag is swallowed.
    pub fn block_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.block_type.insert(tag);
        }
        Ok(())
    }

    /// Tags that may hold only whitelisted child tags, no free text.
    pub fn parent_only_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.parent_only.insert(tag);
        }
        Ok(())
    }

    /// Tags permitted only inside their registered parents.
    pub fn child_only_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.child_only.insert(tag);
        }
        Ok(())
    }

    /// Tags permitted only at the document root.
    pub fn global_only_tags<'a>(
        &mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for tag in self.checked_tags(tags)? {
            self.global_only.insert(tag);
        }
        Ok(())
    }

    /// Declares the allowed children of a container tag. The mirrored
    /// parents relation is maintained automatically. Repeated calls
    /// replace the tag's child set.
    pub fn tag_children<'a>(
        &mut self,
        tag: &str,
        children: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        let tag = self.checked_tag(tag)?;
        let children = self.checked_tags(children)?;
        let mut set = FxHashSet::default();
        for child in children {
            set.insert(child.clone());
            self.parents.entry(child).or_default().insert(tag.clone());
        }
        self.children.insert(tag, set);
        Ok(())
    }

    // ── Attribute registration ──────────────────────────────────────

    /// Declares the allowed attributes of a tag, in output order. Each
    /// starts with the `#str` schema; refine with
    /// [`attr_values`](Sieve::attr_values). Repeated calls replace the
    /// tag's attribute list.
    pub fn allow_attrs<'a>(
        &mut self,
        tag: &str,
        attrs: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        let tag = self.checked_tag(tag)?;
        let mut rules = FxHashMap::default();
        let mut order = Vec::new();
        for attr in attrs {
            let attr = attr.to_ascii_lowercase();
            rules.insert(attr.clone(), vec![AttrPattern::Any]);
            order.push(attr);
        }
        self.attr_rules.insert(tag.clone(), rules);
        self.attr_order.insert(tag, order);
        Ok(())
    }

    /// Restricts an attribute to an ordered schema list: literal
    /// strings, `#str`, `#int`, `#link` or `#regexp(...)`.
    pub fn attr_values<'a>(
        &mut self,
        tag: &str,
        attr: &str,
        specs: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        let tag = self.checked_tag(tag)?;
        let attr = attr.to_ascii_lowercase();
        let mut patterns = Vec::new();
        for spec in specs {
            patterns.push(AttrPattern::parse(spec)?);
        }
        match self.attr_rules.get_mut(&tag).and_then(|r| r.get_mut(&attr)) {
            Some(rules) => {
                *rules = patterns;
                Ok(())
            }
            None => Err(ConfigError::UnknownAttr { tag, attr }),
        }
    }

    /// Attributes whose absence (after validation) deletes the tag.
    /// Repeated calls replace the tag's required set.
    pub fn require_attrs<'a>(
        &mut self,
        tag: &str,
        attrs: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        let tag = self.checked_tag(tag)?;
        let set = attrs.into_iter().map(|a| a.to_ascii_lowercase()).collect();
        self.attr_required.insert(tag, set);
        Ok(())
    }

    /// Inserts `value` for `attr` when the attribute is missing.
    pub fn default_attr(&mut self, tag: &str, attr: &str, value: &str) -> Result<(), ConfigError> {
        let tag = self.checked_tag(tag)?;
        self.attr_default
            .entry(tag)
            .or_default()
            .insert(attr.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    /// Unconditionally overwrites `attr` with `value` on every
    /// occurrence of the tag.
    pub fn override_attr(&mut self, tag: &str, attr: &str, value: &str) -> Result<(), ConfigError> {
        let tag = self.checked_tag(tag)?;
        self.attr_override
            .entry(tag)
            .or_default()
            .insert(attr.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    // ── Callbacks ───────────────────────────────────────────────────

    /// Replaces the default builder for a tag. The callback receives
    /// the tag name, its sanitized attributes and its already-built
    /// content; its return value is emitted verbatim.
    pub fn tag_builder<F>(&mut self, tag: &str, builder: F) -> Result<(), ConfigError>
    where
        F: Fn(&str, &AttrMap, &str) -> String + Send + Sync + 'static,
    {
        let tag = self.checked_tag(tag)?;
        self.builders.insert(tag, Box::new(builder));
        Ok(())
    }

    /// Attaches a handler to one of the special characters `@`, `#`,
    /// `$`. The handler receives the token after the prefix; returning
    /// an empty string leaves the literal text in place. Registering
    /// any handler enables special-char processing.
    pub fn special_char<F>(&mut self, ch: char, handler: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        if class_of(ch) & SPECIAL_CHAR == 0 {
            return Err(ConfigError::UnknownSpecialChar(ch));
        }
        self.special_char_mode = true;
        self.special_chars.insert(ch, Box::new(handler));
        Ok(())
    }

    // ── Modes ───────────────────────────────────────────────────────

    /// Protocols accepted by autolinks and `#link` values.
    pub fn link_protocols<'a>(&mut self, protocols: impl IntoIterator<Item = &'a str>) {
        self.link_protocols = protocols.into_iter().map(str::to_string).collect();
    }

    /// XHTML mode: short tags close with `/>`.
    pub fn xhtml(&mut self, on: bool) {
        self.br = if on { "<br/>" } else { "<br>" };
        self.xhtml = on;
    }

    /// Newline-to-break conversion in text runs.
    pub fn auto_br(&mut self, on: bool) {
        self.auto_br = on;
    }

    /// Detection of bare URLs in text runs.
    pub fn auto_link(&mut self, on: bool) {
        self.auto_link = on;
    }

    /// Typographic replacements (dashes, paired quotes).
    pub fn typography(&mut self, on: bool) {
        self.typography = on;
    }

    /// Output line ending; only `"\n"` and `"\r\n"` are accepted.
    pub fn eol(&mut self, eol: &str) {
        if eol == "\n" || eol == "\r\n" {
            self.eol = eol.to_string();
        }
    }

    /// Maximum tag nesting depth. Past the limit, open tags are no
    /// longer recognized and a diagnostic is recorded.
    pub fn max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    // ── Lookups used by the scanner ─────────────────────────────────

    pub(crate) fn check_attr_value(&self, patterns: &[AttrPattern], value: &str) -> Option<String> {
        for pattern in patterns {
            match pattern {
                AttrPattern::Any => return Some(value.to_string()),
                AttrPattern::Integer => {
                    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                        return Some(value.to_string());
                    }
                }
                AttrPattern::Link => {
                    if let Some(normalized) = self.link_value(value) {
                        return Some(normalized);
                    }
                }
                AttrPattern::Regexp(re) => {
                    if re.is_match(value) {
                        return Some(value.to_string());
                    }
                }
                AttrPattern::Literal(literal) => {
                    if literal == value {
                        return Some(value.to_string());
                    }
                }
            }
        }
        None
    }

    /// `#link` safety rules: no `javascript:`, a sane first character,
    /// and `http://` prefixed onto bare host names.
    fn link_value(&self, value: &str) -> Option<String> {
        if value.contains("javascript:") {
            return None;
        }
        match value.chars().next() {
            Some(ch) if ch.is_ascii_alphanumeric() || ch == '/' || ch == '#' => {}
            _ => return None,
        }
        let has_scheme = self.link_protocols.iter().any(|proto| {
            value
                .strip_prefix(proto.as_str())
                .map_or(false, |rest| rest.starts_with("://"))
        });
        if !has_scheme && !value.starts_with('/') && !value.starts_with('#') {
            return Some(format!("http://{value}"));
        }
        Some(value.to_string())
    }
}

/// Carriage returns are stripped before classification.
fn strip_cr(text: &str) -> Cow<'_, str> {
    if memchr::memchr(b'\r', text.as_bytes()).is_none() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&ch| ch != '\r').collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_are_rejected_by_category_setters() {
        let mut sieve = Sieve::new();
        sieve.allow_tags(["b"]);
        assert!(sieve.short_tags(["b"]).is_ok());
        assert!(matches!(
            sieve.short_tags(["img"]),
            Err(ConfigError::UnknownTag(tag)) if tag == "img"
        ));
    }

    #[test]
    fn attr_values_requires_registered_attr() {
        let mut sieve = Sieve::new();
        sieve.allow_tags(["a"]);
        sieve.allow_attrs("a", ["href"]).unwrap();
        assert!(sieve.attr_values("a", "href", ["#link"]).is_ok());
        assert!(matches!(
            sieve.attr_values("a", "onclick", ["#str"]),
            Err(ConfigError::UnknownAttr { .. })
        ));
    }

    #[test]
    fn bad_regexp_pattern_fails_at_config_time() {
        let mut sieve = Sieve::new();
        sieve.allow_tags(["img"]);
        sieve.allow_attrs("img", ["align"]).unwrap();
        assert!(matches!(
            sieve.attr_values("img", "align", ["#regexp(()"]),
            Err(ConfigError::BadPattern { .. })
        ));
    }

    #[test]
    fn special_char_must_be_in_class() {
        let mut sieve = Sieve::new();
        assert!(sieve.special_char('%', |_| String::new()).is_err());
        assert!(!sieve.special_char_mode);
        assert!(sieve.special_char('#', |_| String::new()).is_ok());
        assert!(sieve.special_char_mode);
    }

    #[test]
    fn integer_pattern_accepts_digits_only() {
        let sieve = Sieve::new();
        let patterns = [AttrPattern::Integer];
        assert_eq!(
            sieve.check_attr_value(&patterns, "640"),
            Some("640".to_string())
        );
        assert_eq!(sieve.check_attr_value(&patterns, "640px"), None);
        assert_eq!(sieve.check_attr_value(&patterns, "-1"), None);
    }

    #[test]
    fn regexp_pattern_accepts_matches() {
        let sieve = Sieve::new();
        let patterns = [AttrPattern::parse("#regexp(^(left|right)$)").unwrap()];
        assert!(sieve.check_attr_value(&patterns, "left").is_some());
        assert!(sieve.check_attr_value(&patterns, "middle").is_none());
    }

    #[test]
    fn ordered_schemas_first_match_wins() {
        let sieve = Sieve::new();
        let patterns = [
            AttrPattern::Literal("_blank".to_string()),
            AttrPattern::Integer,
        ];
        assert!(sieve.check_attr_value(&patterns, "_blank").is_some());
        assert!(sieve.check_attr_value(&patterns, "12").is_some());
        assert!(sieve.check_attr_value(&patterns, "_self").is_none());
    }

    #[test]
    fn link_rules_reject_javascript_and_prefix_bare_hosts() {
        let sieve = Sieve::new();
        assert_eq!(sieve.link_value("javascript:alert(1)"), None);
        assert_eq!(sieve.link_value("xjavascript:alert(1)x"), None);
        assert_eq!(sieve.link_value(" spaced"), None);
        assert_eq!(
            sieve.link_value("http://x.test"),
            Some("http://x.test".to_string())
        );
        assert_eq!(
            sieve.link_value("example.com/a"),
            Some("http://example.com/a".to_string())
        );
        assert_eq!(sieve.link_value("/local"), Some("/local".to_string()));
        assert_eq!(sieve.link_value("#anchor"), Some("#anchor".to_string()));
    }

    #[test]
    fn link_rules_follow_the_protocol_list() {
        let mut sieve = Sieve::new();
        sieve.link_protocols(["https"]);
        // An http URL no longer counts as carrying a scheme, so the
        // default prefix is glued on.
        assert_eq!(
            sieve.link_value("http://x.test"),
            Some("http://http://x.test".to_string())
        );
    }

    #[test]
    fn children_maintain_the_mirror_relation() {
        let mut sieve = Sieve::new();
        sieve.allow_tags(["ul", "ol", "li"]);
        sieve.tag_children("ul", ["li"]).unwrap();
        sieve.tag_children("ol", ["li"]).unwrap();
        assert!(sieve.children["ul"].contains("li"));
        assert!(sieve.parents["li"].contains("ul"));
        assert!(sieve.parents["li"].contains("ol"));
    }

    #[test]
    fn eol_accepts_only_known_line_endings() {
        let mut sieve = Sieve::new();
        sieve.eol("\r\n");
        assert_eq!(sieve.eol, "\r\n");
        sieve.eol("|");
        assert_eq!(sieve.eol, "\r\n");
    }

    #[test]
    fn strip_cr_borrows_when_clean() {
        assert!(matches!(strip_cr("plain"), Cow::Borrowed(_)));
        assert_eq!(strip_cr("a\r\nb"), "a\nb");
    }
}
