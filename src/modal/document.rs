//! Self-contained HTML documents for modal surfaces.
//!
//! A modal is loaded from a `data:` URL built here: the shared global
//! stylesheet, any per-modal stylesheets and scripts inlined, and the body
//! markup. Nothing is fetched by the modal page itself.

/// Body content of a modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Markup authored by the shell's own UI; inserted verbatim.
    Trusted(String),
    /// Untrusted text (page titles, site-provided strings); HTML-escaped.
    Text(String),
}

impl Markup {
    fn render(&self) -> String {
        match self {
            Markup::Trusted(html) => html.clone(),
            Markup::Text(text) => escape_html(text),
        }
    }
}

/// Escape text for use in element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// `<style>` and `<script>` bodies end at the first `</`; break that sequence
/// so inlined files cannot close their element early.
fn escape_raw_text(source: &str) -> String {
    source.replace("</", "<\\/")
}

#[derive(Debug, Clone, Default)]
pub struct ModalDocument {
    pub global_css: String,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    pub body: Vec<Markup>,
}

impl ModalDocument {
    pub fn render(&self) -> String {
        let mut html = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");

        let push_style = |html: &mut String, css: &str| {
            html.push_str("<style>");
            html.push_str(&escape_raw_text(css));
            html.push_str("</style>");
        };
        if !self.global_css.is_empty() {
            push_style(&mut html, &self.global_css);
        }
        // Modal pages sit on a transparent surface; never scroll the frame
        push_style(
            &mut html,
            "html,body{background-color:transparent;overflow:hidden;}",
        );
        for css in &self.stylesheets {
            push_style(&mut html, css);
        }

        html.push_str("</head><body>");
        for part in &self.body {
            html.push_str(&part.render());
        }
        for js in &self.scripts {
            html.push_str("<script>");
            html.push_str(&escape_raw_text(js));
            html.push_str("</script>");
        }
        html.push_str("</body></html>");
        html
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:text/html;charset=utf-8,{}",
            urlencoding::encode(&self.render())
        )
    }
}
