//! Rich-text to HTML conversion
//!
//! Bodies are stored as structured rich-text nodes. [`PrismicHtml`] turns
//! them into an HTML fragment the way Prismic's own serializer does; the
//! fragment is inserted into pages verbatim, so the content repository is
//! a trusted source. [`Sanitized`] wraps any renderer with an `ammonia`
//! pass for repositories that are not.

use super::{NodeKind, RichTextNode, Span, SpanData, SpanKind};
use crate::config::SiteConfig;
use crate::helpers::{html_escape, post_url};

/// Converts a sequence of rich-text nodes to an HTML fragment
pub trait RichTextRenderer: Send + Sync {
    fn render(&self, nodes: &[RichTextNode]) -> String;
}

/// Build the renderer selected by `rich_text.sanitize`
pub fn renderer_for(config: &SiteConfig) -> Box<dyn RichTextRenderer> {
    let html = PrismicHtml::new(&config.root);
    if config.rich_text.sanitize {
        Box::new(Sanitized::new(html))
    } else {
        Box::new(html)
    }
}

/// Serializer compatible with Prismic's `RichText.asHtml`
pub struct PrismicHtml {
    root: String,
}

impl PrismicHtml {
    /// `root` prefixes links to other documents
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
        }
    }

    fn render_node(&self, node: &RichTextNode) -> String {
        let text = || self.render_spans(&node.text, &node.spans);
        match node.kind {
            NodeKind::Paragraph => format!("<p>{}</p>", text()),
            NodeKind::Heading1 => format!("<h1>{}</h1>", text()),
            NodeKind::Heading2 => format!("<h2>{}</h2>", text()),
            NodeKind::Heading3 => format!("<h3>{}</h3>", text()),
            NodeKind::Heading4 => format!("<h4>{}</h4>", text()),
            NodeKind::Heading5 => format!("<h5>{}</h5>", text()),
            NodeKind::Heading6 => format!("<h6>{}</h6>", text()),
            NodeKind::Preformatted => format!("<pre>{}</pre>", text()),
            NodeKind::ListItem | NodeKind::OrderedListItem => format!("<li>{}</li>", text()),
            NodeKind::Image => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(node.url.as_deref().unwrap_or_default()),
                html_escape(node.alt.as_deref().unwrap_or_default())
            ),
            NodeKind::Embed => match &node.oembed {
                Some(oembed) => format!(
                    r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                    html_escape(oembed.embed_url.as_deref().unwrap_or_default()),
                    html_escape(oembed.kind.as_deref().unwrap_or_default()),
                    oembed.html.as_deref().unwrap_or_default()
                ),
                None => String::new(),
            },
        }
    }

    /// Render text with its spans applied
    ///
    /// Span offsets count UTF-16 code units. Spans may overlap without
    /// nesting; an inner tag that outlives the one being closed is closed
    /// and reopened.
    fn render_spans(&self, text: &str, spans: &[Span]) -> String {
        let chars: Vec<char> = text.chars().collect();
        let units = utf16_boundaries(&chars);

        let mut marks: Vec<Mark> = spans
            .iter()
            .map(|span| Mark {
                start: char_index(&units, span.start),
                end: char_index(&units, span.end),
                span,
            })
            .filter(|m| m.start < m.end && m.end <= chars.len())
            .collect();
        marks.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut out = String::with_capacity(text.len());
        let mut stack: Vec<&Mark> = Vec::new();
        let mut next = 0;

        for i in 0..=chars.len() {
            if stack.iter().any(|m| m.end == i) {
                let mut reopen = Vec::new();
                while let Some(mark) = stack.pop() {
                    out.push_str(close_tag(mark.span.kind));
                    if mark.end != i {
                        reopen.push(mark);
                    }
                    if !stack.iter().any(|m| m.end == i) {
                        break;
                    }
                }
                for mark in reopen.into_iter().rev() {
                    out.push_str(&self.open_tag(mark.span));
                    stack.push(mark);
                }
            }

            while next < marks.len() && marks[next].start == i {
                out.push_str(&self.open_tag(marks[next].span));
                stack.push(&marks[next]);
                next += 1;
            }

            match chars.get(i) {
                Some('\n') => out.push_str("<br />"),
                Some(c) => push_escaped(&mut out, *c),
                None => {}
            }
        }

        out
    }

    fn open_tag(&self, span: &Span) -> String {
        match span.kind {
            SpanKind::Strong => "<strong>".to_string(),
            SpanKind::Em => "<em>".to_string(),
            SpanKind::Hyperlink => {
                let data = span.data.clone().unwrap_or_default();
                let target = match data.target.as_deref() {
                    Some(target) => format!(
                        r#" target="{}" rel="noopener""#,
                        html_escape(target)
                    ),
                    None => String::new(),
                };
                format!(
                    r#"<a href="{}"{}>"#,
                    html_escape(&self.resolve_link(&data)),
                    target
                )
            }
            SpanKind::Label => {
                let label = span
                    .data
                    .as_ref()
                    .and_then(|d| d.label.as_deref())
                    .unwrap_or_default();
                format!(r#"<span class="{}">"#, html_escape(label))
            }
        }
    }

    /// Document links point at our own post route; everything else keeps its URL
    fn resolve_link(&self, data: &SpanData) -> String {
        match (data.link_type.as_deref(), data.uid.as_deref()) {
            (Some("Document"), Some(uid)) => post_url(&self.root, uid),
            _ => data.url.clone().unwrap_or_else(|| "#".to_string()),
        }
    }
}

impl RichTextRenderer for PrismicHtml {
    fn render(&self, nodes: &[RichTextNode]) -> String {
        let mut out = String::new();
        let mut open_list: Option<NodeKind> = None;

        for node in nodes {
            let list = match node.kind {
                NodeKind::ListItem | NodeKind::OrderedListItem => Some(node.kind),
                _ => None,
            };
            if list != open_list {
                if let Some(kind) = open_list {
                    out.push_str(list_tag(kind, false));
                }
                if let Some(kind) = list {
                    out.push_str(list_tag(kind, true));
                }
                open_list = list;
            }
            out.push_str(&self.render_node(node));
        }
        if let Some(kind) = open_list {
            out.push_str(list_tag(kind, false));
        }

        out
    }
}

/// Renderer whose output is cleaned by `ammonia` before it reaches a page
pub struct Sanitized<R> {
    inner: R,
}

impl<R: RichTextRenderer> Sanitized<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: RichTextRenderer> RichTextRenderer for Sanitized<R> {
    fn render(&self, nodes: &[RichTextNode]) -> String {
        ammonia::clean(&self.inner.render(nodes))
    }
}

/// A span with its offsets converted to char indices
struct Mark<'a> {
    start: usize,
    end: usize,
    span: &'a Span,
}

/// UTF-16 offset at which each char starts, plus the total length
fn utf16_boundaries(chars: &[char]) -> Vec<usize> {
    let mut units = Vec::with_capacity(chars.len() + 1);
    let mut offset = 0;
    for c in chars {
        units.push(offset);
        offset += c.len_utf16();
    }
    units.push(offset);
    units
}

/// Char index of a UTF-16 offset; an offset inside a surrogate pair rounds up
fn char_index(units: &[usize], offset: usize) -> usize {
    match units.binary_search(&offset) {
        Ok(index) | Err(index) => index,
    }
}

fn close_tag(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label => "</span>",
    }
}

fn list_tag(kind: NodeKind, open: bool) -> &'static str {
    match (kind, open) {
        (NodeKind::OrderedListItem, true) => "<ol>",
        (NodeKind::OrderedListItem, false) => "</ol>",
        (_, true) => "<ul>",
        (_, false) => "</ul>",
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(c),
    }
}
