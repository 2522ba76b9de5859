use regex::Regex;
use tagsieve::{ParseError, Sieve};

/// The reference configuration exercised by most tests: a small forum
/// markup profile with links, images, lists, preformatted code and
/// special-char handlers.
fn reference_sieve() -> Sieve {
    let mut sieve = Sieve::new();

    sieve.allow_tags([
        "b", "i", "u", "a", "img", "ul", "ol", "li", "br", "code", "pre", "div", "cut",
    ]);
    sieve.short_tags(["br", "img", "cut"]).unwrap();
    sieve.preformatted_tags(["code"]).unwrap();
    sieve.empty_allowed_tags(["div"]).unwrap();
    sieve.no_auto_br_tags(["ul", "ol"]).unwrap();
    sieve.cut_tags(["script", "object", "iframe", "style"]);
    sieve.block_tags(["ol", "ul", "code"]).unwrap();

    sieve
        .allow_attrs("a", ["href", "title", "target", "rel"])
        .unwrap();
    sieve
        .allow_attrs("img", ["src", "alt", "title", "align", "width", "height"])
        .unwrap();
    sieve.require_attrs("a", ["href"]).unwrap();
    sieve.require_attrs("img", ["src"]).unwrap();
    sieve.attr_values("a", "href", ["#link"]).unwrap();
    sieve.attr_values("a", "target", ["_blank"]).unwrap();
    sieve
        .attr_values("img", "align", ["right", "left", "center"])
        .unwrap();
    sieve.attr_values("img", "width", ["#int"]).unwrap();
    sieve.attr_values("img", "height", ["#int"]).unwrap();
    sieve.default_attr("a", "rel", "nofollow").unwrap();
    sieve.default_attr("img", "alt", "").unwrap();
    sieve.override_attr("a", "rel", "nofollow").unwrap();

    sieve.tag_children("ul", ["li"]).unwrap();
    sieve.tag_children("ol", ["li"]).unwrap();
    sieve.parent_only_tags(["ul", "ol"]).unwrap();
    sieve.child_only_tags(["li"]).unwrap();
    sieve.global_only_tags(["cut"]).unwrap();
    sieve.no_typography_tags(["code", "pre"]).unwrap();

    sieve.link_protocols(["http", "https"]);
    sieve.xhtml(false);
    sieve.auto_br(true);
    sieve.auto_link(true);

    sieve
        .tag_builder("code", |_, _, content| {
            format!("<pre><code>{content}<code><pre>\n")
        })
        .unwrap();

    sieve
        .special_char('#', |token| {
            if !token_ok(token) {
                return String::new();
            }
            format!("<a href=\"/tags/{token}/\">#{token}</a>")
        })
        .unwrap();
    sieve
        .special_char('@', |token| {
            if !token_ok(token) {
                return String::new();
            }
            format!("<a href=\"/user/{token}/\">@{token}</a>")
        })
        .unwrap();

    sieve
}

fn token_ok(token: &str) -> bool {
    Regex::new(r"^[0-9\p{L}_-]{1,32}$").unwrap().is_match(token)
}

fn assert_sieve(input: &str, expected: &str) {
    let (html, _) = reference_sieve().parse(input);
    assert_eq!(html, expected, "input: {input:?}");
}

// ── Tag filtering and repair ────────────────────────────────────────

#[test]
fn allowed_tag_passes_through() {
    assert_sieve("<b>текст текст текст</b>", "<b>текст текст текст</b>");
}

#[test]
fn nested_allowed_tags_pass_through() {
    assert_sieve(
        "<b>текст <b>текст</b> текст</b>",
        "<b>текст <b>текст</b> текст</b>",
    );
}

#[test]
fn missing_close_tags_are_repaired() {
    assert_sieve("<b>текст <u>текст текст", "<b>текст <u>текст текст</u></b>");
}

#[test]
fn unknown_tag_is_stripped_keeping_content() {
    assert_sieve(
        "<u>текст <s>текст</s> текст</u>",
        "<u>текст текст текст</u>",
    );
}

#[test]
fn cut_tags_vanish_with_their_content() {
    assert_sieve("текст <script>текст</script> текст", "текст текст");
}

#[test]
fn empty_tags_are_dropped_unless_allowed() {
    assert_sieve(
        "текст <div></div> <b></b> текст</b>",
        "текст <div></div> текст",
    );
}

#[test]
fn stray_close_tag_is_dropped_with_an_error() {
    let (html, errors) = reference_sieve().parse("текст</b> текст");
    assert_eq!(html, "текст текст");
    assert_eq!(
        errors,
        vec![ParseError::UnexpectedCloseTag {
            tag: "b".to_string()
        }]
    );
}

#[test]
fn mismatched_close_tag_repairs_and_reports() {
    let (html, errors) = reference_sieve().parse("<b>раз <u>два</b>");
    assert_eq!(html, "<b>раз <u>два</u></b>");
    assert_eq!(
        errors,
        vec![ParseError::MismatchedCloseTag {
            expected: "u".to_string(),
            found: "b".to_string()
        }]
    );
}

#[test]
fn lone_angle_bracket_is_escaped() {
    assert_sieve("a < b", "a &#60; b");
}

#[test]
fn comments_are_dropped() {
    assert_sieve("a <!-- скрыто --> b", "a b");
}

#[test]
fn tag_names_are_case_insensitive() {
    assert_sieve("<B>текст</B>", "<b>текст</b>");
}

// ── Structural policy ───────────────────────────────────────────────

#[test]
fn parent_only_container_keeps_whitelisted_children_only() {
    let input = "текст\n<ul>\n  <li>текст</li>\n  <li>текст</li>\n  <b>текст</b>\n  <br>\n</ul>\nтекст";
    let expected = "текст<br>\n<ul>\n<li>текст</li>\n<li>текст</li>\n</ul>\nтекст";
    assert_sieve(input, expected);
}

#[test]
fn child_only_tag_outside_its_parents_is_stripped() {
    let input = "текст\n<li>текст</li>\n<li>текст</li>\nтекст";
    let expected = "текст<br>\nтекст<br>\nтекст<br>\nтекст";
    assert_sieve(input, expected);
}

#[test]
fn global_only_tag_survives_at_root_level_only() {
    assert_sieve(
        "<b>текст текст</b> <cut> <b>текст <cut> текст</b>",
        "<b>текст текст</b> <cut> <b>текст текст</b>",
    );
}

#[test]
fn deep_nesting_is_capped_with_a_diagnostic() {
    let mut sieve = reference_sieve();
    sieve.max_depth(3);
    let (html, errors) = sieve.parse("<b><b><b><b>x");
    assert_eq!(html, "<b><b><b>&#60;b&#62;x</b></b></b>");
    assert_eq!(errors, vec![ParseError::TooDeep { limit: 3 }]);
}

// ── Attributes ──────────────────────────────────────────────────────

#[test]
fn known_attrs_survive_in_registration_order() {
    assert_sieve(
        "текст <a href = \"http://dighub.ru\" title=\"text\" >DigHub</a> текст",
        "текст <a href=\"http://dighub.ru\" title=\"text\" rel=\"nofollow\">DigHub</a> текст",
    );
}

#[test]
fn unknown_attrs_are_dropped() {
    assert_sieve(
        "текст <a href=\"http://dighub.ru\" args=\"test\">DigHub</a> текст",
        "текст <a href=\"http://dighub.ru\" rel=\"nofollow\">DigHub</a> текст",
    );
}

#[test]
fn bare_attr_values_are_accepted() {
    assert_sieve(
        "текст <a href=http://dighub.ru title = text rel=\"nofollow\">DigHub</a> текст",
        "текст <a href=\"http://dighub.ru\" title=\"text\" rel=\"nofollow\">DigHub</a> текст",
    );
}

#[test]
fn attr_values_are_entity_escaped() {
    assert_sieve(
        "текст <a href=http://dighub.ru title=/\" target=_blank>DigHub</a> текст",
        "текст <a href=\"http://dighub.ru\" title=\"/&#34;\" target=\"_blank\" rel=\"nofollow\">DigHub</a> текст",
    );
}

#[test]
fn default_attr_fills_in_missing_values() {
    assert_sieve(
        "текст <a href=\"http://dighub.ru\">DigHub</a> текст",
        "текст <a href=\"http://dighub.ru\" rel=\"nofollow\">DigHub</a> текст",
    );
}

#[test]
fn override_attr_replaces_user_values() {
    assert_sieve(
        "<a href=\"/x\" rel=\"dofollow\">y</a>",
        "<a href=\"/x\" rel=\"nofollow\">y</a>",
    );
}

#[test]
fn hyphen_prefixed_attr_names_are_discarded() {
    assert_sieve(
        "<a href=\"/x\" -data=1>y</a>",
        "<a href=\"/x\" rel=\"nofollow\">y</a>",
    );
}

#[test]
fn javascript_href_strips_the_whole_tag() {
    let (html, errors) = reference_sieve().parse("текст <a href=\"javascript:alert(1)\">текст</a> текст");
    assert_eq!(html, "текст текст текст");
    assert_eq!(
        errors,
        vec![ParseError::InvalidAttrValue {
            tag: "a".to_string(),
            attr: "href".to_string(),
            value: "javascript:alert(1)".to_string()
        }]
    );
}

#[test]
fn integer_schema_validates_dimensions() {
    assert_sieve(
        "<img src=\"pic.png\" width=\"100\">",
        "<img src=\"pic.png\" alt=\"\" width=\"100\">",
    );
    let (html, errors) = reference_sieve().parse("<img src=\"/pic.png\" width=\"100px\">");
    assert_eq!(html, "<img src=\"/pic.png\" alt=\"\">");
    assert_eq!(errors.len(), 1);
}

#[test]
fn literal_schema_validates_enumerations() {
    assert_sieve(
        "<img src=\"/p.png\" align=\"left\">",
        "<img src=\"/p.png\" alt=\"\" align=\"left\">",
    );
    let (html, _) = reference_sieve().parse("<img src=\"/p.png\" align=\"sideways\">");
    assert_eq!(html, "<img src=\"/p.png\" alt=\"\">");
}

// ── Typography ──────────────────────────────────────────────────────

#[test]
fn quotes_pair_with_nesting() {
    assert_sieve(
        "<b>\"текст\" текст \"текст \"текст\" текст\" \"...\"</b>",
        "<b>«текст» текст «текст „текст“ текст» «...»</b>",
    );
}

#[test]
fn unbalanced_quote_still_produces_output() {
    assert_sieve("\"незакрытая цитата", "«незакрытая цитата");
}

#[test]
fn no_typography_tag_escapes_quotes_verbatim() {
    assert_sieve(
        "<pre>\"текст\" текст \"текст \"текст\" текст\" \"...\"</pre>",
        "<pre>&#34;текст&#34; текст &#34;текст &#34;текст&#34; текст&#34; &#34;...&#34;</pre>",
    );
}

#[test]
fn typography_mode_off_escapes_quotes_everywhere() {
    let mut sieve = reference_sieve();
    sieve.typography(false);
    let (html, _) = sieve.parse("\"текст\"");
    assert_eq!(html, "&#34;текст&#34;");
}

#[test]
fn hyphen_between_words_becomes_em_dash() {
    assert_sieve("текст - текст", "текст — текст");
    assert_sieve("текст -- текст", "текст — текст");
}

#[test]
fn hyphen_inside_a_word_stays() {
    assert_sieve("по-прежнему", "по-прежнему");
}

#[test]
fn spaces_collapse_to_one() {
    assert_sieve("a    b", "a b");
}

#[test]
fn newlines_become_breaks_under_auto_br() {
    assert_sieve("раз\nдва", "раз<br>\nдва");
    assert_sieve("раз\n\n\nдва", "раз<br>\n<br>\nдва");
}

#[test]
fn auto_br_off_drops_newlines() {
    let mut sieve = reference_sieve();
    sieve.auto_br(false);
    let (html, _) = sieve.parse("раз\nдва");
    assert_eq!(html, "раздва");
}

#[test]
fn xhtml_mode_closes_short_tags() {
    let mut sieve = reference_sieve();
    sieve.xhtml(true);
    let (html, _) = sieve.parse("раз\nдва <img src=\"/p.png\">");
    assert_eq!(html, "раз<br/>\nдва <img src=\"/p.png\" alt=\"\"/>");
}

#[test]
fn crlf_input_is_normalized() {
    assert_sieve("раз\r\nдва", "раз<br>\nдва");
}

#[test]
fn eol_setting_rewrites_output_line_endings() {
    let mut sieve = reference_sieve();
    sieve.eol("\r\n");
    let (html, _) = sieve.parse("раз\nдва");
    assert_eq!(html, "раз<br>\r\nдва");
}

// ── Entities ────────────────────────────────────────────────────────

#[test]
fn numeric_entities_decode_to_plain_text() {
    assert_sieve(
        "текст &#40; &#41; &#42; &#43; &#44; текст",
        "текст ( ) * + , текст",
    );
}

#[test]
fn decoded_specials_are_re_escaped() {
    assert_sieve("&quot;привет&quot;", "&#34;привет&#34;");
    assert_sieve("&amp;", "&#38;");
    assert_sieve("&lt;b&gt;", "&#60;b&#62;");
}

#[test]
fn named_entities_decode_to_their_glyphs() {
    assert_sieve("&laquo;цитата&raquo; &mdash; автор", "«цитата» — автор");
}

#[test]
fn unknown_entity_text_survives() {
    assert_sieve("&bogus; текст", "&#38;bogus; текст");
}

#[test]
fn bare_ampersand_is_escaped() {
    assert_sieve("Procter & Gamble", "Procter &#38; Gamble");
}

// ── Autolinks ───────────────────────────────────────────────────────

#[test]
fn bare_url_becomes_an_anchor() {
    assert_sieve(
        "текст http://dighub.ru текст",
        "текст <a href=\"http://dighub.ru\" rel=\"nofollow\">http://dighub.ru</a> текст",
    );
}

#[test]
fn bare_url_inside_inline_tag_becomes_an_anchor() {
    assert_sieve(
        "текст <b>http://dighub.ru</b> текст",
        "текст <b><a href=\"http://dighub.ru\" rel=\"nofollow\">http://dighub.ru</a></b> текст",
    );
}

#[test]
fn url_inside_anchor_is_left_alone() {
    assert_sieve(
        "текст <a href=\"http://dighub.ru\">http://dighub.ru</a> текст",
        "текст <a href=\"http://dighub.ru\" rel=\"nofollow\">http://dighub.ru</a> текст",
    );
}

#[test]
fn trailing_punctuation_detaches_from_urls() {
    assert_sieve(
        "текст http://yandex.ru/search/?lr=2&text=golang!..",
        "текст <a href=\"http://yandex.ru/search/?lr=2&text=golang\" rel=\"nofollow\">http://yandex.ru/search/?lr=2&text=golang</a>!..",
    );
}

#[test]
fn www_urls_get_the_default_scheme() {
    assert_sieve(
        "см. www.example.com тут",
        "см. <a href=\"http://www.example.com\" rel=\"nofollow\">http://www.example.com</a> тут",
    );
}

#[test]
fn parenthesized_urls_balance_brackets() {
    assert_sieve(
        "(http://x.test/a(b)c) конец",
        "(<a href=\"http://x.test/a(b)c\" rel=\"nofollow\">http://x.test/a(b)c</a>) конец",
    );
}

#[test]
fn disallowed_scheme_stays_plain_text() {
    // ftp is recognized but absent from the protocol list.
    assert_sieve("см. ftp://files.test/x", "см. ftp://files.test/x");
}

#[test]
fn auto_link_off_leaves_urls_as_text() {
    let mut sieve = reference_sieve();
    sieve.auto_link(false);
    let (html, _) = sieve.parse("текст http://dighub.ru");
    assert_eq!(html, "текст http://dighub.ru");
}

// ── Special characters ──────────────────────────────────────────────

#[test]
fn special_char_tokens_run_their_callbacks() {
    assert_sieve(
        "текст #hash и #tagname!",
        "текст <a href=\"/tags/hash/\">#hash</a> и <a href=\"/tags/tagname/\">#tagname</a>!",
    );
}

#[test]
fn special_char_tokens_work_inside_inline_tags() {
    assert_sieve(
        "текст <b>#hash, #tagname</b> текст",
        "текст <b><a href=\"/tags/hash/\">#hash</a>, <a href=\"/tags/tagname/\">#tagname</a></b> текст",
    );
}

#[test]
fn at_tokens_use_their_own_callback() {
    assert_sieve(
        "привет @user!",
        "привет <a href=\"/user/user/\">@user</a>!",
    );
}

#[test]
fn rejected_token_keeps_the_literal_text() {
    let long = format!("#{}", "x".repeat(40));
    let (html, _) = reference_sieve().parse(&long);
    assert_eq!(html, long);
}

#[test]
fn mid_word_special_char_is_plain_text() {
    assert_sieve("почта user@host", "почта user@host");
}

// ── Preformatted content and build callbacks ────────────────────────

#[test]
fn preformatted_tag_escapes_markup_and_uses_builder() {
    assert_sieve(
        "<code>текст <script>текст</script> текст</code>",
        "<pre><code>текст &#60;script&#62;текст&#60;/script&#62; текст<code><pre>",
    );
}

#[test]
fn preformatted_content_ignores_typography_and_links() {
    assert_sieve(
        "<code>\"x\" http://a.test</code>",
        "<pre><code>&#34;x&#34; http://a.test<code><pre>",
    );
}

// ── Invariants ──────────────────────────────────────────────────────

#[test]
fn parse_is_idempotent_when_tags_stay_permitted() {
    let sieve = reference_sieve();
    let input = "текст \"раз \"два\" три\"\n<ul>\n<li>пункт - тире</li>\n</ul>\n<b>жирный</b>";
    let (once, _) = sieve.parse(input);
    let (twice, _) = sieve.parse(&once);
    assert_eq!(once, twice);
}

#[test]
fn output_never_leaks_raw_angle_brackets_from_text() {
    let (html, _) = reference_sieve().parse("a < b > c <notatag >");
    assert!(!html.contains(" < "));
    assert!(!html.contains(" > "));
    assert_eq!(html, "a &#60; b &#62; c");
}

#[test]
fn empty_and_whitespace_inputs_yield_empty_output() {
    assert_sieve("", "");
    assert_sieve("   \n\n\t\n", "");
}
