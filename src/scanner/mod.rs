//! Per-parse scanner: the recursive content builder, the text
//! transformation dispatch and tag assembly.

mod markup;
mod typography;

use crate::classes::{ALPHA, NL, NULL, PRINTABLE, PUNCTUATION, SPACE, SPECIAL_CHAR, TEXT_QUOTE};
use crate::cursor::Cursor;
use crate::entities;
use crate::error::ParseError;
use crate::policy::{AttrMap, Sieve};

/// A recognized tag with its already-built inner content.
pub(crate) struct ParsedTag {
    name: String,
    attrs: AttrMap,
    content: String,
    short: bool,
}

/// All mutable parse state. Borrows the configuration read-only, so a
/// [`Sieve`] can drive many scanners at once.
pub(crate) struct Scanner<'a> {
    cfg: &'a Sieve,
    cursor: Cursor,
    cur_tag: String,
    typo: bool,
    quotes_opened: usize,
    depth: usize,
    depth_reported: bool,
    errors: Vec<ParseError>,
}

impl<'a> Scanner<'a> {
    pub fn new(cfg: &'a Sieve, text: &str) -> Self {
        Scanner {
            cfg,
            cursor: Cursor::new(text),
            cur_tag: String::new(),
            typo: cfg.typography,
            quotes_opened: 0,
            depth: 0,
            depth_reported: false,
            errors: Vec::new(),
        }
    }

    pub fn run(mut self) -> (String, Vec<ParseError>) {
        let content = self.make_content("");
        let content = if self.cfg.eol == "\n" {
            content
        } else {
            content.replace('\n', &self.cfg.eol)
        };
        (content.trim().to_string(), self.errors)
    }

    /// Builds the content of one nesting level. Returns when the input
    /// ends or a close tag is seen; the close tag is pushed back for
    /// the caller to consume.
    fn make_content(&mut self, parent_tag: &str) -> String {
        let mut content = String::new();

        self.cursor.skip_spaces();
        self.cursor.skip_newlines(-1);

        while !self.cursor.at_end() {
            // Inside a container-only tag, free text is skipped.
            if self.cfg.parent_only.contains(self.cur_tag.as_str()) && self.cursor.cur.ch != '<' {
                self.cursor.skip_to_char('<');
            }

            self.cursor.save();

            if self.cursor.cur.ch == '<' {
                if let Some(ParsedTag {
                    name,
                    attrs,
                    content: tag_content,
                    short,
                }) = self.match_tag()
                {
                    let built = self.build_tag(&name, attrs, &tag_content, short, parent_tag);
                    if !built.is_empty() && (self.cfg.block_type.contains(&name) || name == "br") {
                        self.cursor.skip_newlines(1);
                    }
                    if built.is_empty() {
                        self.cursor.skip_class(SPACE | NL);
                    }
                    content.push_str(&built);
                } else if self.cursor.match_str("<!--") {
                    self.skip_comment();
                } else if let Some(close) = self.match_tag_close() {
                    if !self.cur_tag.is_empty() {
                        self.cursor.restore();
                        return content;
                    }
                    self.errors.push(ParseError::UnexpectedCloseTag { tag: close });
                } else {
                    // A lone '<' survives only as an entity, and not at
                    // all inside container-only tags.
                    if !self.cfg.parent_only.contains(self.cur_tag.as_str()) {
                        content.push_str("&#60;");
                    }
                    self.cursor.advance();
                }
            } else {
                let text = self.make_text(parent_tag);
                content.push_str(&text);
            }

            self.cursor.discard();
        }

        content
    }

    /// Recognizes a full tag at `<`: the open tag, its recursively
    /// built content and its close tag. On failure the cursor is back
    /// where it started.
    fn match_tag(&mut self) -> Option<ParsedTag> {
        if self.depth >= self.cfg.max_depth {
            if !self.depth_reported {
                self.depth_reported = true;
                self.errors.push(ParseError::TooDeep {
                    limit: self.cfg.max_depth,
                });
            }
            return None;
        }

        let (name, attrs, short) = self.match_tag_open()?;
        if short {
            return Some(ParsedTag {
                name,
                attrs,
                content: String::new(),
                short: true,
            });
        }

        let outer_tag = std::mem::replace(&mut self.cur_tag, name.clone());
        let outer_typo = self.typo;
        if self.cfg.no_typography.contains(&name) {
            self.typo = false;
        }

        self.depth += 1;
        let content = if self.cfg.preformatted.contains(&name) {
            self.make_preformatted(&name)
        } else {
            self.make_content(&name)
        };
        self.depth -= 1;

        if let Some(close) = self.match_tag_close() {
            if close != name {
                self.errors.push(ParseError::MismatchedCloseTag {
                    expected: name.clone(),
                    found: close,
                });
            }
        }

        self.cur_tag = outer_tag;
        self.typo = outer_typo;

        Some(ParsedTag {
            name,
            attrs,
            content,
            short: false,
        })
    }

    /// Transforms a text run up to the next `<` or end of input.
    fn make_text(&mut self, parent_tag: &str) -> String {
        let mut text = String::new();

        while self.cursor.cur.ch != '<' && !self.cursor.at_end() {
            let cur = self.cursor.cur;

            if cur.ch == '&' {
                if let Some(decoded) = self.match_entity() {
                    // Decoded characters from the escape set go back
                    // out as their canonical references.
                    let mut chars = decoded.chars();
                    if let Some(first) = chars.next() {
                        entities::push_escaped(&mut text, first);
                        text.push_str(chars.as_str());
                    }
                    continue;
                }
            }

            if cur.class & PUNCTUATION != NULL {
                text.push(cur.ch);
                self.cursor.advance();
                continue;
            }

            if self.typo && cur.ch == '-' && self.match_dash() {
                text.push_str(&self.cfg.dash);
                continue;
            }

            if self.typo && cur.class & TEXT_QUOTE != NULL {
                if let Some(glyph) = self.match_quote() {
                    text.push(glyph);
                    continue;
                }
            }

            if cur.class & SPACE != NULL {
                self.cursor.skip_spaces();
                text.push(' ');
                continue;
            }

            if self.cfg.auto_br && cur.class & NL != NULL {
                let breaks = self.cursor.skip_newlines(-1);
                if !self.cfg.no_auto_br.contains(self.cur_tag.as_str()) {
                    text.push_str(self.cfg.br);
                    text.push('\n');
                    if breaks > 1 {
                        text.push_str(self.cfg.br);
                        text.push('\n');
                    }
                }
                continue;
            }

            if self.cfg.auto_link && cur.class & ALPHA != NULL && self.cur_tag != "a" {
                if let Some(url) = self.match_url() {
                    let mut attrs = AttrMap::default();
                    attrs.insert("href".to_string(), url.clone());
                    let anchor = self.build_tag("a", attrs, &url, false, parent_tag);
                    text.push_str(&anchor);
                    continue;
                }
            }

            if self.cfg.special_char_mode
                && cur.class & SPECIAL_CHAR != NULL
                && self.cur_tag != "a"
            {
                if let Some(built) = self.match_special_char() {
                    text.push_str(&built);
                    continue;
                }
            }

            if cur.class & PRINTABLE != NULL {
                entities::push_escaped(&mut text, cur.ch);
                self.cursor.advance();
                continue;
            }

            // Non-printables vanish.
            self.cursor.advance();
        }

        text
    }

    /// The policy pipeline plus canonical emission. Returns the final
    /// markup for the tag, its bare content when the tag is stripped,
    /// or nothing when tag and content are dropped.
    fn build_tag(
        &mut self,
        name: &str,
        attrs: AttrMap,
        content: &str,
        short: bool,
        parent_tag: &str,
    ) -> String {
        let cfg = self.cfg;
        let name = name.to_ascii_lowercase();

        if cfg.cut_with_content.contains(&name) {
            return String::new();
        }
        if !cfg.allowed.contains(&name) {
            return if cfg.parent_only.contains(parent_tag) {
                String::new()
            } else {
                content.to_string()
            };
        }
        if cfg.global_only.contains(&name) && !parent_tag.is_empty() {
            return content.to_string();
        }
        if cfg.parent_only.contains(parent_tag) {
            let permitted = cfg
                .children
                .get(parent_tag)
                .map_or(false, |c| c.contains(&name));
            if !permitted {
                return String::new();
            }
        }
        if cfg.child_only.contains(&name) {
            let permitted = cfg
                .parents
                .get(&name)
                .map_or(false, |p| p.contains(parent_tag));
            if !permitted {
                return content.to_string();
            }
        }

        let rules = cfg.attr_rules.get(&name);
        let mut kept = AttrMap::default();
        for (attr, value) in attrs {
            let attr = attr.to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let Some(patterns) = rules.and_then(|r| r.get(&attr)) else {
                continue;
            };
            match cfg.check_attr_value(patterns, value) {
                Some(checked) => {
                    kept.insert(attr, checked);
                }
                None => self.errors.push(ParseError::InvalidAttrValue {
                    tag: name.clone(),
                    attr,
                    value: value.to_string(),
                }),
            }
        }

        if let Some(required) = cfg.attr_required.get(&name) {
            if required.iter().any(|attr| !kept.contains_key(attr)) {
                return content.to_string();
            }
        }
        if let Some(defaults) = cfg.attr_default.get(&name) {
            for (attr, value) in defaults {
                kept.entry(attr.clone()).or_insert_with(|| value.clone());
            }
        }
        if let Some(overrides) = cfg.attr_override.get(&name) {
            for (attr, value) in overrides {
                kept.insert(attr.clone(), value.clone());
            }
        }

        if !short && content.is_empty() && !cfg.empty_allowed.contains(&name) {
            return String::new();
        }

        if let Some(builder) = cfg.builders.get(&name) {
            return builder(&name, &kept, content);
        }

        let mut out = String::with_capacity(content.len() + name.len() * 2 + 16);
        out.push('<');
        out.push_str(&name);
        if let Some(order) = cfg.attr_order.get(&name) {
            for attr in order {
                if let Some(value) = kept.get(attr) {
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
            }
        }
        if short && cfg.xhtml {
            out.push_str("/>");
        } else {
            out.push('>');
        }
        if cfg.parent_only.contains(&name) {
            out.push('\n');
        }
        if !short {
            out.push_str(content);
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        if cfg.parent_only.contains(parent_tag) {
            out.push('\n');
        }
        if cfg.block_type.contains(&name) {
            out.push('\n');
        }
        if name == "br" {
            out.push('\n');
        }
        out
    }
}
