//! Document head and shell helpers.

use storefront_security::NonceScope;

/// Client-side helper that swaps a deferred placeholder for its content.
pub(crate) const SWAP_FUNCTION: &str = "function $sfSwap(id){\
var t=document.getElementById(id+'-content'),p=document.getElementById(id);\
if(t&&p){p.replaceWith(t.content.cloneNode(true));t.remove();}}";

/// Restores scroll position across client navigations.
pub(crate) const SCROLL_RESTORATION: &str = "(function(){\
var k='sf-scroll:'+location.pathname;\
if('scrollRestoration' in history)history.scrollRestoration='manual';\
var y=sessionStorage.getItem(k);if(y!==null)window.scrollTo(0,+y);\
addEventListener('pagehide',function(){sessionStorage.setItem(k,String(window.scrollY));});\
})();";

/// Content of the document `<head>`.
#[derive(Debug, Clone)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// Character set declaration.
    pub charset: String,
    /// Meta tags as (name, content).
    pub meta: Vec<(String, String)>,
    /// Link tags.
    pub links: Vec<String>,
    /// Inline scripts. Rendered with the request nonce.
    pub scripts: Vec<String>,
}

impl Default for HeadContent {
    fn default() -> Self {
        Self {
            title: None,
            charset: "utf-8".to_string(),
            meta: Vec::new(),
            links: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

impl HeadContent {
    /// Create head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Add a meta tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    /// Add a stylesheet link.
    pub fn with_stylesheet(mut self, href: &str) -> Self {
        self.links
            .push(format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(href)));
        self
    }

    /// Add a preconnect hint.
    pub fn with_preconnect(mut self, origin: &str) -> Self {
        self.links
            .push(format!(r#"<link rel="preconnect" href="{}">"#, escape_html(origin)));
        self
    }

    /// Add an icon link.
    pub fn with_icon(mut self, href: &str, mime: &str) -> Self {
        self.links.push(format!(
            r#"<link rel="icon" type="{}" href="{}">"#,
            escape_html(mime),
            escape_html(href)
        ));
        self
    }

    /// Add an inline script.
    pub fn with_script(mut self, js: impl Into<String>) -> Self {
        self.scripts.push(js.into());
        self
    }

    /// Render head content to HTML.
    pub fn render(&self, scope: &NonceScope) -> String {
        let mut html = format!(r#"<meta charset="{}">"#, escape_html(&self.charset));
        html.push('\n');

        for (name, content) in &self.meta {
            html.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                escape_html(name),
                escape_html(content)
            ));
            html.push('\n');
        }

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        }

        for link in &self.links {
            html.push_str(link);
            html.push('\n');
        }

        for script in &self.scripts {
            html.push_str(&scope.script(script));
            html.push('\n');
        }

        html
    }
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
