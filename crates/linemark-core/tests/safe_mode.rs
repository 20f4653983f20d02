use linemark_core::Markdown;

fn safe(source: &str) -> String {
    Markdown::new().with_safe_mode(true).convert(source)
}

#[test]
fn allowed_schemes_pass_through() {
    for url in [
        "http://e.com",
        "https://e.com",
        "ftp://e.com",
        "ftps://e.com",
        "mailto:me@e.com",
        "irc:chan",
        "ircs:chan",
        "git:repo",
        "ssh:host",
        "news:group",
        "steam:game",
    ] {
        let html = safe(&format!("[x]({url})"));
        assert!(html.contains(&format!(r#"href="{url}""#)), "{url}: {html}");
    }
}

#[test]
fn scheme_check_ignores_case() {
    assert_eq!(
        safe("[x](HTTPS://e.com)"),
        r#"<p><a href="HTTPS://e.com">x</a></p>"#
    );
    assert_eq!(
        safe("[x](JavaScript:void)"),
        r#"<p><a href="JavaScript%3Avoid">x</a></p>"#
    );
}

#[test]
fn image_sources_are_filtered() {
    assert_eq!(
        safe("![i](vbscript:run)"),
        r#"<p><img src="vbscript%3Arun" alt="i" /></p>"#
    );
    assert_eq!(
        safe("![i](data:text/html;base64,AAA)"),
        r#"<p><img src="data%3Atext/html;base64,AAA" alt="i" /></p>"#
    );
}

#[test]
fn reference_links_are_filtered() {
    assert_eq!(
        safe("[x][bad]\n\n[bad]: javascript:alert(1)"),
        r#"<p><a href="javascript%3Aalert(1)">x</a></p>"#
    );
}

#[test]
fn text_level_tags_are_rebuilt_without_handlers() {
    assert_eq!(
        safe(r#"<span class="k" onmouseover="x()">t</span>"#),
        r#"<p><span class="k">t</span></p>"#
    );
    assert_eq!(safe("a<br/>b"), "<p>a<br />b</p>");
}

#[test]
fn other_raw_html_is_escaped() {
    assert_eq!(
        safe("<script>alert(1)</script>"),
        "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
    );
    assert_eq!(safe("<!-- c -->"), "<p>&lt;!-- c --&gt;</p>");
}

#[test]
fn safe_mode_overrides_raw_html_setting() {
    let html = Markdown::new()
        .with_raw_html_escaped(false)
        .with_safe_mode(true)
        .convert("<div>x</div>");
    assert_eq!(html, "<p>&lt;div&gt;x&lt;/div&gt;</p>");
}

#[test]
fn unsafe_mode_passes_raw_html_through() {
    let html = Markdown::new().convert(r#"<span onclick="x()">t</span>"#);
    assert_eq!(html, r#"<p><span onclick="x()">t</span></p>"#);
}
