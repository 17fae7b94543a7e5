//! Index page.

/// Body of `/`.
pub fn view() -> String {
    concat!(
        "<p>Edit this route in <em>app/routes/index.tsx</em>.</p>",
        r#"<p><a href="/products/abcdef">TEST product</a></p>"#,
    )
    .to_string()
}
