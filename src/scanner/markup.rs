//! Markup recognition: open and close tags, attribute lists, comments,
//! HTML entities and preformatted cut-through. Every recognizer either
//! consumes a complete construct or restores the cursor.

use super::Scanner;
use crate::classes::{ALPHA, NL, NUMERIC, SPACE, TAG_NAME, TAG_PARAM_NAME, TAG_QUOTE};
use crate::entities;
use crate::policy::AttrMap;

impl<'a> Scanner<'a> {
    /// Open-tag grammar: `<name [attrs] [/] >`. The name is lowercased;
    /// a `/` on a non-short tag fails recognition.
    pub(super) fn match_tag_open(&mut self) -> Option<(String, AttrMap, bool)> {
        if !self.cursor.match_char('<') {
            return None;
        }
        self.cursor.save();

        if self.cursor.skip_spaces() == 0 {
            self.cursor.advance();
        }
        let mut name = self.cursor.grab_class(TAG_NAME);
        self.cursor.skip_spaces();
        if name.is_empty() {
            self.cursor.restore();
            return None;
        }
        name.make_ascii_lowercase();

        let mut attrs = AttrMap::default();
        if self.cursor.cur.ch != '>' && self.cursor.cur.ch != '/' {
            self.match_tag_attrs(&mut attrs);
        }

        let short = self.cfg.short.contains(&name);
        if !short && self.cursor.cur.ch == '/' {
            self.cursor.restore();
            return None;
        }
        if short && self.cursor.cur.ch == '/' {
            self.cursor.advance();
        }
        self.cursor.skip_spaces();
        if self.cursor.cur.ch != '>' {
            self.cursor.restore();
            return None;
        }

        self.cursor.discard();
        self.cursor.advance();
        Some((name, attrs, short))
    }

    /// Close-tag grammar: `</name >`. Returns the lowercased name.
    pub(super) fn match_tag_close(&mut self) -> Option<String> {
        if !self.cursor.match_char('<') {
            return None;
        }
        self.cursor.save();

        if self.cursor.skip_spaces() == 0 {
            self.cursor.advance();
        }
        if self.cursor.cur.ch != '/' {
            self.cursor.restore();
            return None;
        }
        if self.cursor.skip_spaces() == 0 {
            self.cursor.advance();
        }
        let mut name = self.cursor.grab_class(TAG_NAME);
        self.cursor.skip_spaces();
        if name.is_empty() || self.cursor.cur.ch != '>' {
            self.cursor.restore();
            return None;
        }
        name.make_ascii_lowercase();

        self.cursor.discard();
        self.cursor.advance();
        Some(name)
    }

    fn match_tag_attrs(&mut self, attrs: &mut AttrMap) {
        while let Some((name, value)) = self.match_tag_attr() {
            // Names beginning with '-' are silently discarded.
            if !name.starts_with('-') {
                attrs.insert(name, value);
            }
        }
    }

    /// One `name [= value]` attribute. A name without `=` takes itself
    /// as the value, HTML boolean-attribute style.
    fn match_tag_attr(&mut self) -> Option<(String, String)> {
        self.cursor.save();
        self.cursor.skip_spaces();

        let name = self.cursor.grab_class(TAG_PARAM_NAME);
        if name.is_empty() {
            self.cursor.discard();
            return None;
        }
        self.cursor.skip_spaces();

        if self.cursor.cur.ch != '=' {
            if self.cursor.cur.ch == '>'
                || self.cursor.cur.ch == '/'
                || self.cursor.match_class(SPACE)
            {
                let value = name.clone();
                self.cursor.discard();
                return Some((name, value));
            }
            self.cursor.restore();
            return None;
        }
        self.cursor.advance();
        self.cursor.skip_spaces();

        let value = match self.match_attr_value() {
            Some(value) => value,
            None => {
                self.cursor.restore();
                return None;
            }
        };
        self.cursor.skip_spaces();
        self.cursor.discard();
        Some((name, value))
    }

    /// Quoted (single or double, with `\`-escaped terminators) or bare
    /// value. The escape set is entity-encoded as it is captured.
    fn match_attr_value(&mut self) -> Option<String> {
        let mut value = String::new();

        if self.cursor.match_class(TAG_QUOTE) {
            let quote = self.cursor.cur.ch;
            let mut escaped = false;
            self.cursor.advance();
            while !self.cursor.at_end() && (self.cursor.cur.ch != quote || escaped) {
                entities::push_escaped(&mut value, self.cursor.cur.ch);
                escaped = self.cursor.cur.ch == '\\';
                self.cursor.advance();
            }
            if self.cursor.cur.ch != quote {
                return None;
            }
            self.cursor.advance();
        } else {
            while !self.cursor.at_end()
                && !self.cursor.match_class(SPACE)
                && self.cursor.cur.ch != '>'
            {
                entities::push_escaped(&mut value, self.cursor.cur.ch);
                self.cursor.advance();
            }
        }

        Some(value)
    }

    /// `<!-- ... -->` with trailing whitespace swallowed.
    pub(super) fn skip_comment(&mut self) {
        if self.cursor.skip_to_str("-->") {
            self.cursor.skip_str("-->");
            self.cursor.skip_class(SPACE | NL);
        }
    }

    /// `&#digits;` or `&name;`. Unknown names fail recognition so the
    /// literal text survives.
    pub(super) fn match_entity(&mut self) -> Option<String> {
        if !self.cursor.match_char('&') {
            return None;
        }
        self.cursor.save();
        self.cursor.advance();

        if self.cursor.match_char('#') {
            self.cursor.advance();
            let digits = self.cursor.grab_class(NUMERIC);
            if digits.is_empty() || self.cursor.cur.ch != ';' {
                self.cursor.restore();
                return None;
            }
            self.cursor.discard();
            self.cursor.advance();
            Some(entities::decode_numeric(&digits).to_string())
        } else {
            let name = self.cursor.grab_class(ALPHA | NUMERIC);
            if name.is_empty() || self.cursor.cur.ch != ';' {
                self.cursor.restore();
                return None;
            }
            let Some(decoded) = entities::named(&name) else {
                self.cursor.restore();
                return None;
            };
            self.cursor.discard();
            self.cursor.advance();
            Some(decoded.to_string())
        }
    }

    /// Content of a preformatted tag: consumed character by character
    /// through the escape set until this tag's own close tag, which is
    /// left for the caller.
    pub(super) fn make_preformatted(&mut self, open_tag: &str) -> String {
        let mut content = String::new();

        while !self.cursor.at_end() {
            if self.cursor.cur.ch == '<' && !open_tag.is_empty() {
                self.cursor.save();
                match self.match_tag_close() {
                    Some(close) => {
                        self.cursor.restore();
                        if close == open_tag {
                            break;
                        }
                    }
                    None => self.cursor.discard(),
                }
            }
            entities::push_escaped(&mut content, self.cursor.cur.ch);
            self.cursor.advance();
        }

        content
    }
}
