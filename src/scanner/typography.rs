//! In-stream typography: dash substitution, nesting-aware quote
//! pairing, autolinks and special-char tokens.

use super::Scanner;
use crate::classes::{
    BOUNDARY, NL, NULL, PRINTABLE, PUNCTUATION, SPACE, SPECIAL_CHAR, TEXT_BRACKET, TEXT_QUOTE,
};

/// Bracket pairs tracked during autolink balancing.
fn closing_bracket(open: char) -> Option<char> {
    match open {
        '<' => Some('>'),
        '[' => Some(']'),
        '{' => Some('}'),
        '(' => Some(')'),
        _ => None,
    }
}

impl<'a> Scanner<'a> {
    /// A run of `-` delimited by boundaries on both sides becomes the
    /// configured em-dash. The cursor ends past the run on success.
    pub(super) fn match_dash(&mut self) -> bool {
        if !self.cursor.match_char('-') {
            return false;
        }
        let prev = self.cursor.prev;
        if prev.class & BOUNDARY == NULL && prev.class != NULL {
            return false;
        }

        self.cursor.save();
        while self.cursor.next.ch == '-' {
            self.cursor.advance();
        }
        let next = self.cursor.next;
        if next.class & BOUNDARY == NULL && next.class != NULL {
            self.cursor.restore();
            return false;
        }

        self.cursor.discard();
        self.cursor.advance();
        true
    }

    /// Decides open-versus-close for a text quote and returns the
    /// replacement glyph. Nesting depth is bounded by the pair table.
    pub(super) fn match_quote(&mut self) -> Option<char> {
        if !self.cursor.match_class(TEXT_QUOTE) {
            return None;
        }
        let pairs = &self.cfg.quote_pairs;
        if pairs.is_empty() {
            return None;
        }

        let prev = self.cursor.prev;
        let next = self.cursor.next;
        let prev_is_boundary = prev.class & BOUNDARY != NULL || prev.class == NULL;
        let next_closes = next.class & (BOUNDARY | PUNCTUATION) != NULL || next.class == NULL;

        let closing = self.quotes_opened >= pairs.len()
            || (self.quotes_opened > 0 && (!prev_is_boundary || next_closes));

        if !closing && !prev_is_boundary {
            return None;
        }
        if closing && !next_closes {
            return None;
        }

        let glyph = if closing {
            self.quotes_opened -= 1;
            pairs[self.quotes_opened].1
        } else {
            self.quotes_opened += 1;
            pairs[self.quotes_opened - 1].0
        };

        self.cursor.advance();
        Some(glyph)
    }

    /// Recognizes a bare URL at an alphabetic character: an allowed
    /// scheme or `www.`, then a printable run with bracket balancing
    /// and the trailing-punctuation backtrack.
    pub(super) fn match_url(&mut self) -> Option<String> {
        let prev = self.cursor.prev;
        if prev.class & (SPACE | NL | TEXT_QUOTE | TEXT_BRACKET) == NULL && prev.class != NULL {
            return None;
        }

        self.cursor.save();

        let protocols = &self.cfg.link_protocols;
        let allowed = |name: &str| protocols.iter().any(|p| p == name);
        let mut url = String::new();
        if self.cursor.match_str("http://") && allowed("http") {
            // scheme is part of the grabbed body below
        } else if self.cursor.match_str("https://") && allowed("https") {
        } else if self.cursor.match_str("ftp://") && allowed("ftp") {
        } else if self.cursor.match_str("www.") {
            url.push_str("http://");
        } else {
            self.cursor.restore();
            return None;
        }

        // When the URL follows an opening bracket, the matching close
        // terminates it; nested pairs of the same kind are balanced.
        let (open, close) = if prev.class & TEXT_BRACKET != NULL {
            match closing_bracket(prev.ch) {
                Some(close) => (prev.ch, close),
                None => ('\0', '\0'),
            }
        } else {
            ('\0', '\0')
        };
        let mut bracket_depth = if open != '\0' { 1 } else { 0 };

        let mut body = String::new();
        while self.cursor.match_class(PRINTABLE) {
            let cur = self.cursor.cur;
            if cur.ch == '<' {
                break;
            }
            if cur.class & TEXT_QUOTE != NULL {
                break;
            }
            if cur.class & TEXT_BRACKET != NULL && bracket_depth > 0 {
                if cur.ch == close && bracket_depth == 1 {
                    break;
                }
                if cur.ch == open {
                    bracket_depth += 1;
                }
                if cur.ch == close {
                    bracket_depth -= 1;
                }
            } else if cur.class & PUNCTUATION != NULL {
                // Trailing punctuation belongs to the sentence, not the
                // URL: keep the run only when printable text follows.
                self.cursor.save();
                let punctuation = self.cursor.grab_class(PUNCTUATION);
                if !self.cursor.match_class(PRINTABLE) {
                    self.cursor.restore();
                    break;
                }
                self.cursor.discard();
                body.push_str(&punctuation);
                if self.cursor.match_class(TEXT_QUOTE | TEXT_BRACKET) {
                    break;
                }
            }
            body.push(self.cursor.cur.ch);
            self.cursor.advance();
        }

        if body.is_empty() {
            self.cursor.restore();
            return None;
        }
        self.cursor.discard();
        url.push_str(&body);
        Some(url)
    }

    /// A `@`/`#`/`$`-prefixed token handed to its registered callback.
    /// An empty callback result aborts the substitution.
    pub(super) fn match_special_char(&mut self) -> Option<String> {
        if !self.cursor.match_class(SPECIAL_CHAR) {
            return None;
        }
        let cfg = self.cfg;
        let handler = cfg.special_chars.get(&self.cursor.cur.ch)?;
        let prev = self.cursor.prev;
        if prev.class != NULL && prev.class & BOUNDARY == NULL {
            return None;
        }

        self.cursor.save();
        self.cursor.advance();

        let mut token = String::new();
        while !self.cursor.at_end() && self.cursor.cur.class & BOUNDARY == NULL {
            if self.cursor.match_class(PUNCTUATION) {
                self.cursor.save();
                let punctuation = self.cursor.grab_class(PUNCTUATION);
                if self.cursor.at_end() || self.cursor.match_class(BOUNDARY) {
                    self.cursor.restore();
                    break;
                }
                self.cursor.discard();
                token.push_str(&punctuation);
            }
            token.push(self.cursor.cur.ch);
            self.cursor.advance();
        }

        if token.is_empty() {
            self.cursor.restore();
            return None;
        }
        let built = handler(&token);
        if built.is_empty() {
            self.cursor.restore();
            return None;
        }
        self.cursor.discard();
        Some(built)
    }
}
