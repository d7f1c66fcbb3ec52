//! Built-in blog templates using the Tera template engine
//!
//! Templates are embedded in the binary; the structs below are the view
//! models they are rendered from.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::i18n::I18n;

/// Template renderer with the embedded blog theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Autoescaping stays on for .html; rendered rich text is marked `safe`
        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("loading.html", include_str!("blog/loading.html")),
            ("not_found.html", include_str!("blog/not_found.html")),
            ("error.html", include_str!("blog/error.html")),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Site-wide values available to every template
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    /// Always ends with `/`
    pub root: String,
    pub version: String,
}

/// Localized strings used by the templates
#[derive(Debug, Clone, Serialize)]
pub struct Labels {
    pub loading: String,
    pub reading_unit: String,
    pub banner_alt: String,
    pub load_more: String,
    pub empty: String,
    pub not_found_title: String,
    pub not_found_message: String,
    pub back: String,
    pub error_title: String,
    pub error_message: String,
}

impl Labels {
    pub fn from_i18n(i18n: &I18n) -> Self {
        Self {
            loading: i18n.get("loading"),
            reading_unit: i18n.get("post.reading_unit"),
            banner_alt: i18n.get("post.banner_alt"),
            load_more: i18n.get("listing.load_more"),
            empty: i18n.get("listing.empty"),
            not_found_title: i18n.get("not_found.title"),
            not_found_message: i18n.get("not_found.message"),
            back: i18n.get("not_found.back"),
            error_title: i18n.get("error.title"),
            error_message: i18n.get("error.message"),
        }
    }
}

/// A post ready for the detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub uid: String,
    pub title: String,
    pub author: String,
    pub banner_url: String,
    pub banner_alt: String,
    /// Localized publication date; absent for unpublished documents
    pub date: Option<String>,
    pub date_iso: Option<String>,
    /// Estimated minutes to read
    pub reading_time: usize,
    pub content: Vec<BlockView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub heading: String,
    pub anchor: String,
    pub body_html: String,
}

/// A post as listed on the home page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub href: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: String,
    pub date: Option<String>,
    pub date_iso: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteData {
        SiteData {
            title: "SpaceTraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            root: "/".to_string(),
            version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_templates_compile() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_titles_are_escaped_and_bodies_are_not() {
        let renderer = TemplateRenderer::new().unwrap();
        let post = PostView {
            uid: "x".to_string(),
            title: "<Hooks & você>".to_string(),
            author: "Ana".to_string(),
            banner_url: "https://images.prismic.io/b.png".to_string(),
            banner_alt: "banner".to_string(),
            date: Some("19 Mai 2021".to_string()),
            date_iso: Some("2021-05-19T12:00:00.000+00:00".to_string()),
            reading_time: 4,
            content: vec![BlockView {
                heading: "Intro".to_string(),
                anchor: "intro".to_string(),
                body_html: "<p><strong>one</strong> two</p>".to_string(),
            }],
        };

        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("labels", &Labels::from_i18n(&I18n::new("pt-BR")));
        context.insert("post", &post);
        let html = renderer.render("post.html", &context).unwrap();

        assert!(html.contains("<title>SpaceTraveling | &lt;Hooks &amp; você&gt;</title>"));
        assert!(html.contains("<p><strong>one</strong> two</p>"));
        assert!(html.contains("4 min"));
        assert!(html.contains("19 Mai 2021"));
        assert!(html.contains(r#"<h2 id="intro">Intro</h2>"#));
    }

    #[test]
    fn test_labels() {
        let labels = Labels::from_i18n(&I18n::new("pt-BR"));
        assert_eq!(labels.loading, "Carregando...");
        assert_eq!(labels.reading_unit, "min");
    }
}
