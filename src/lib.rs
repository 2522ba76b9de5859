//! # tagsieve
//!
//! A policy-driven HTML/XHTML sanitizer and typographer.
//!
//! Text with arbitrary HTML-ish markup goes in; only whitelisted tags
//! and attributes come out, malformed markup is repaired, dangerous
//! containers are cut, and the text between tags is typographed
//! (paired quotes, em-dashes, autolinks, line breaks).
//!
//! ## Usage
//!
//! ```
//! use tagsieve::Sieve;
//!
//! let mut sieve = Sieve::new();
//! sieve.allow_tags(["a", "b", "i"]);
//! sieve.allow_attrs("a", ["href"]).unwrap();
//! sieve.attr_values("a", "href", ["#link"]).unwrap();
//! sieve.require_attrs("a", ["href"]).unwrap();
//! sieve.cut_tags(["script"]);
//!
//! let (html, errors) = sieve.parse("<b onclick=hack()>bold</b> & <script>evil()</script>");
//! assert_eq!(html, "<b>bold</b> &#38;");
//! assert!(errors.is_empty());
//! ```
//!
//! ## Behavior highlights
//!
//! | Input | Output |
//! |---|---|
//! | `<b>text <u>text` | `<b>text <u>text</u></b>` (closes repaired) |
//! | `<script>x</script>` | removed with content |
//! | `"a "b" c"` | `«a „b“ c»` (nesting-aware pairs) |
//! | `see http://a.test!` | `see <a href="http://a.test">http://a.test</a>!` |
//! | `<a href="javascript:alert(1)">x</a>` | `x` |
//!
//! Parsing never fails: diagnostics accumulate in the returned error
//! list while the output is always produced. The configuration is
//! immutable during [`Sieve::parse`], so one `Sieve` can serve many
//! threads.

mod classes;
mod cursor;
mod entities;
mod error;
mod policy;
mod scanner;

pub use error::{ConfigError, ParseError};
pub use policy::{AttrMap, Sieve};
