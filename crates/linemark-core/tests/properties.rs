use linemark_core::{Markdown, convert};

#[test]
fn atx_header() {
    assert!(convert("# Title").contains("<h1>Title</h1>"));
}

#[test]
fn setext_header() {
    assert!(convert("Title\n=====").contains("<h1>Title</h1>"));
}

#[test]
fn fenced_code_with_language() {
    let html = convert("```python\nprint(1)\n```");
    assert!(html.contains(r#"<pre><code class="language-python">print(1)</code></pre>"#));
}

#[test]
fn inline_link_with_title() {
    let html = convert(r#"[text](http://example.com "T")"#);
    assert!(html.contains(r#"<a href="http://example.com" title="T">text</a>"#));
}

#[test]
fn reference_defined_after_use() {
    let html = convert("[x][1]\n\nmore text\n\n[1]: http://e.com");
    assert!(html.contains(r#"<a href="http://e.com">x</a>"#));
}

#[test]
fn reference_defined_inside_a_quote_resolves_later_in_the_quote() {
    let html = convert("> [1]: /q\n>\n> [x][1]");
    assert!(html.contains(r#"<a href="/q">x</a>"#), "{html}");
}

#[test]
fn safe_mode_neutralizes_raw_anchor() {
    let html = Markdown::new()
        .with_safe_mode(true)
        .convert(r#"<a href="javascript:alert(1)" onclick="steal()">x</a>"#);
    assert!(html.contains("javascript%3Aalert(1)"), "{html}");
    assert!(!html.contains("onclick"), "{html}");
    assert!(!html.contains("javascript:"), "{html}");
}

#[test]
fn loose_and_tight_lists_differ_only_in_paragraphs() {
    let tight = convert("- one\n- two");
    let loose = convert("- one\n\n- two");
    assert!(!tight.contains("<p>"));
    assert!(loose.contains("<p>one</p>"));
    assert!(loose.contains("<p>two</p>"));
    let unwrapped = loose.replace("<p>", "").replace("</p>", "");
    assert_eq!(tight.replace('\n', ""), unwrapped.replace('\n', ""));
}

#[test]
fn table_alignment_by_column() {
    let html = convert("| a | b | c |\n| :--- | ---: | :---: |\n| 1 | 2 | 3 |");
    assert!(html.contains(r#"<th style="text-align: left;">a</th>"#));
    assert!(html.contains(r#"<th style="text-align: right;">b</th>"#));
    assert!(html.contains(r#"<th style="text-align: center;">c</th>"#));
    assert!(html.contains(r#"<td style="text-align: left;">1</td>"#));
    assert!(html.contains(r#"<td style="text-align: right;">2</td>"#));
    assert!(html.contains(r#"<td style="text-align: center;">3</td>"#));
}

#[test]
fn stray_markers_render_literally() {
    assert_eq!(convert("a * b"), "<p>a * b</p>");
    assert_eq!(convert("an *unclosed emphasis"), "<p>an *unclosed emphasis</p>");
    assert_eq!(convert("[not a link"), "<p>[not a link</p>");
    assert_eq!(convert("`tick"), "<p>`tick</p>");
}

#[test]
fn degenerate_input_converts() {
    for source in ["", " ", "\n\n\n", "\r\n\r\n", "\t", "#", ">", "-", "1.", "|", "```", "<", "["] {
        let _ = convert(source);
    }
    assert_eq!(convert(""), "");
}

#[test]
fn deep_blockquote_nesting_is_bounded() {
    let source = ">".repeat(5_000) + " deep";
    let html = convert(&source);
    assert!(html.starts_with("<blockquote>"));
    assert!(html.contains("deep"));
}

#[test]
fn deep_emphasis_nesting_is_bounded() {
    let source = format!("{}x{}", "**_".repeat(200), "_**".repeat(200));
    let html = convert(&source);
    assert!(html.contains('x'));
}

#[test]
fn bare_url_earlier_than_marker_wins() {
    let html = convert("see http://e.com/*a*");
    assert_eq!(html, r#"<p>see <a href="http://e.com/*a">http://e.com/*a</a>*</p>"#);
}

#[test]
fn crlf_and_cr_line_endings() {
    assert_eq!(convert("a\r\nb\rc"), "<p>a\nb\nc</p>");
}
