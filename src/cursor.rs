//! Three-lookahead cursor over a code-point buffer, with a snapshot
//! stack for bounded backtracking and the low-level matchers built on
//! top of it.

use crate::classes::{class_of, NL, NULL, SPACE};

/// One lookahead slot: position, code point and its class. Positions
/// outside the buffer carry class [`NULL`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Slot {
    pub pos: isize,
    pub ch: char,
    pub class: u32,
}

pub(crate) struct Cursor {
    buf: Vec<char>,
    pub prev: Slot,
    pub cur: Slot,
    pub next: Slot,
    saved: Vec<isize>,
}

impl Cursor {
    pub fn new(text: &str) -> Self {
        let out = Slot {
            pos: -1,
            ch: '\0',
            class: NULL,
        };
        let mut cursor = Cursor {
            buf: text.chars().collect(),
            prev: out,
            cur: out,
            next: out,
            saved: Vec::new(),
        };
        cursor.move_to(0);
        cursor
    }

    fn slot(&self, pos: isize) -> Slot {
        if pos >= 0 && (pos as usize) < self.buf.len() {
            let ch = self.buf[pos as usize];
            Slot {
                pos,
                ch,
                class: class_of(ch),
            }
        } else {
            Slot {
                pos,
                ch: '\0',
                class: NULL,
            }
        }
    }

    /// Re-seats all three slots around `pos`. Returns whether the new
    /// `cur` is inside the buffer.
    pub fn move_to(&mut self, pos: isize) -> bool {
        self.prev = self.slot(pos - 1);
        self.cur = self.slot(pos);
        self.next = self.slot(pos + 1);
        self.cur.class != NULL
    }

    pub fn advance(&mut self) -> bool {
        self.move_to(self.cur.pos + 1)
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.cur.class == NULL
    }

    // ── Snapshots ───────────────────────────────────────────────────
    //
    // Only the position is stored; every slot field is derivable from
    // it through `move_to`.

    pub fn save(&mut self) {
        self.saved.push(self.cur.pos);
    }

    pub fn restore(&mut self) {
        if let Some(pos) = self.saved.pop() {
            self.move_to(pos);
        }
    }

    /// Drops the newest snapshot without rewinding. The last remaining
    /// snapshot is never dropped; speculative matchers rely on this.
    pub fn discard(&mut self) {
        if self.saved.len() > 1 {
            self.saved.pop();
        }
    }

    // ── Matchers ────────────────────────────────────────────────────

    #[inline]
    pub fn match_char(&self, ch: char) -> bool {
        self.cur.ch == ch
    }

    #[inline]
    pub fn match_class(&self, mask: u32) -> bool {
        self.cur.class & mask != NULL
    }

    /// Non-consuming exact-string check at the current position.
    pub fn match_str(&mut self, s: &str) -> bool {
        self.save();
        let mut matched = true;
        for expected in s.chars() {
            if self.cur.class == NULL || self.cur.ch != expected {
                matched = false;
                break;
            }
            self.advance();
        }
        self.restore();
        matched
    }

    /// Advances until `ch` is under the cursor. Does not consume it.
    pub fn skip_to_char(&mut self, ch: char) -> bool {
        while self.cur.ch != ch && !self.at_end() {
            self.advance();
        }
        !self.at_end()
    }

    /// Advances until `s` starts at the cursor. Does not consume it.
    pub fn skip_to_str(&mut self, s: &str) -> bool {
        let first = match s.chars().next() {
            Some(ch) => ch,
            None => return true,
        };
        while !self.at_end() {
            if self.cur.ch == first && self.match_str(s) {
                return true;
            }
            self.advance();
        }
        false
    }

    /// Consumes `s` if it starts at the cursor, else leaves it alone.
    pub fn skip_str(&mut self, s: &str) -> bool {
        self.save();
        for expected in s.chars() {
            if self.cur.class == NULL || self.cur.ch != expected {
                self.restore();
                return false;
            }
            self.advance();
        }
        self.discard();
        true
    }

    pub fn skip_spaces(&mut self) -> usize {
        self.skip_class(SPACE)
    }

    /// Consumes newline runs, eating horizontal whitespace between
    /// them, so `\n \t \n` counts as two. `limit == -1` is unbounded.
    pub fn skip_newlines(&mut self, limit: isize) -> usize {
        let mut count = 0;
        while self.match_class(NL) {
            if limit >= 0 && count as isize == limit {
                break;
            }
            self.advance();
            self.skip_spaces();
            count += 1;
        }
        count
    }

    pub fn skip_class(&mut self, mask: u32) -> usize {
        let mut count = 0;
        while self.match_class(mask) {
            self.advance();
            count += 1;
        }
        count
    }

    /// Consumes while the class intersects `mask`, returning the run.
    pub fn grab_class(&mut self, mask: u32) -> String {
        let mut run = String::new();
        while self.match_class(mask) {
            run.push(self.cur.ch);
            self.advance();
        }
        run
    }

    /// Consumes while the class does NOT intersect `mask`, returning
    /// the run. Stops at end of input.
    #[allow(dead_code)]
    pub fn grab_not_class(&mut self, mask: u32) -> String {
        let mut run = String::new();
        while !self.at_end() && self.cur.class & mask == NULL {
            run.push(self.cur.ch);
            self.advance();
        }
        run
    }
}
