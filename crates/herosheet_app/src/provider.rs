//! Content and metadata providers
//!
//! Two independent async sources feed an overlay: the rendered item body and
//! the item's REST metadata (taxonomies, featured media). [`RestProvider`]
//! talks to the WordPress endpoints; tests substitute in-memory providers.

use async_trait::async_trait;
use herosheet_layout::markup::strip_tags;
use herosheet_layout::{HeroMedia, OverlayContent};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::config::SheetConfig;
use crate::error::{Result, SheetError};
use crate::trigger::ItemId;

/// Rendered item body
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentRecord {
    pub title: Option<String>,
    pub content: String,
    pub link: Option<String>,
    pub hero_image: Option<String>,
    pub hero_caption: Option<String>,
}

/// Item metadata used to fill gaps in the content record
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub link: Option<String>,
    pub taxonomy_names: Vec<String>,
    pub featured_media_url: Option<String>,
    /// Plain text, tags already stripped
    pub featured_caption: Option<String>,
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_content(&self, id: ItemId) -> Result<ContentRecord>;
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_metadata(&self, id: ItemId) -> Result<MetadataRecord>;
}

// =============================================================================
// Wire format
// =============================================================================

/// WordPress fields arrive either as a bare string or as `{ "rendered": .. }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RenderedText {
    Plain(String),
    Rendered { rendered: String },
}

impl RenderedText {
    fn into_string(self) -> String {
        match self {
            RenderedText::Plain(s) | RenderedText::Rendered { rendered: s } => s,
        }
    }
}

/// PHP serializers emit `false` or `""` for missing strings
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn non_empty(text: Option<RenderedText>) -> Option<String> {
    text.map(RenderedText::into_string)
        .filter(|s| !s.trim().is_empty())
}

#[derive(Deserialize)]
struct RenderResponse {
    #[serde(default)]
    title: Option<RenderedText>,
    #[serde(default)]
    content: Option<RenderedText>,
    #[serde(default, deserialize_with = "lenient_string")]
    link: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    hero_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    hero_caption: Option<String>,
}

impl From<RenderResponse> for ContentRecord {
    fn from(raw: RenderResponse) -> Self {
        ContentRecord {
            title: non_empty(raw.title),
            content: raw.content.map(RenderedText::into_string).unwrap_or_default(),
            link: raw.link,
            hero_image: raw.hero_image,
            hero_caption: raw.hero_caption,
        }
    }
}

#[derive(Deserialize)]
struct WpPost {
    #[serde(default)]
    title: Option<RenderedText>,
    #[serde(default, deserialize_with = "lenient_string")]
    link: Option<String>,
    #[serde(default, rename = "_embedded")]
    embedded: Option<WpEmbedded>,
}

#[derive(Deserialize, Default)]
struct WpEmbedded {
    #[serde(default, rename = "wp:term")]
    terms: Vec<Vec<WpTerm>>,
    #[serde(default, rename = "wp:featuredmedia")]
    featured_media: Vec<WpMedia>,
}

#[derive(Deserialize)]
struct WpTerm {
    #[serde(default)]
    taxonomy: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct WpMedia {
    #[serde(default, deserialize_with = "lenient_string")]
    source_url: Option<String>,
    #[serde(default)]
    caption: Option<RenderedText>,
}

/// Decode the render endpoint's body
pub fn parse_rendered(body: &str) -> Result<ContentRecord> {
    let raw: RenderResponse = serde_json::from_str(body)?;
    Ok(raw.into())
}

/// Decode a `?_embed=1` post, keeping only terms of `taxonomies`
pub fn parse_metadata(body: &str, taxonomies: &[String]) -> Result<MetadataRecord> {
    let post: WpPost = serde_json::from_str(body)?;
    Ok(metadata_from_post(post, taxonomies))
}

fn metadata_from_post(post: WpPost, taxonomies: &[String]) -> MetadataRecord {
    let embedded = post.embedded.unwrap_or_default();

    let taxonomy_names = embedded
        .terms
        .into_iter()
        .flatten()
        .filter(|term| taxonomies.iter().any(|t| *t == term.taxonomy))
        .map(|term| strip_tags(&term.name))
        .filter(|name| !name.is_empty())
        .collect();

    let (featured_media_url, featured_caption) = match embedded.featured_media.into_iter().next() {
        Some(media) => (
            media.source_url,
            non_empty(media.caption)
                .map(|c| strip_tags(&c))
                .filter(|c| !c.is_empty()),
        ),
        None => (None, None),
    };

    MetadataRecord {
        title: non_empty(post.title),
        link: post.link,
        taxonomy_names,
        featured_media_url,
        featured_caption,
    }
}

// =============================================================================
// REST provider
// =============================================================================

/// Fetches both records over HTTP from a WordPress site
#[derive(Clone, Debug)]
pub struct RestProvider {
    client: reqwest::Client,
    origin: String,
    post_type: String,
    taxonomies: Vec<String>,
}

impl RestProvider {
    pub fn new(config: &SheetConfig) -> Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            origin: config.origin().to_string(),
            post_type: config.site.post_type.clone(),
            taxonomies: config.site.taxonomies.clone(),
        })
    }

    pub fn content_url(&self, id: ItemId) -> String {
        format!("{}/wp-json/dpo/v1/render/{id}?dpo=1", self.origin)
    }

    pub fn metadata_url(&self, id: ItemId) -> String {
        format!(
            "{}/wp-json/wp/v2/{}/{id}?_embed=1",
            self.origin, self.post_type
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ContentProvider for RestProvider {
    async fn fetch_content(&self, id: ItemId) -> Result<ContentRecord> {
        let raw: RenderResponse = self.get_json(&self.content_url(id)).await?;
        Ok(raw.into())
    }
}

#[async_trait]
impl MetadataProvider for RestProvider {
    async fn fetch_metadata(&self, id: ItemId) -> Result<MetadataRecord> {
        let post: WpPost = self.get_json(&self.metadata_url(id)).await?;
        Ok(metadata_from_post(post, &self.taxonomies))
    }
}

// =============================================================================
// Merge
// =============================================================================

/// Both halves of a successful fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedItem {
    pub content: ContentRecord,
    pub metadata: MetadataRecord,
}

impl FetchedItem {
    /// Content wins; metadata fills whatever content left out
    pub fn into_overlay_content(self) -> OverlayContent {
        let FetchedItem { content, metadata } = self;

        let hero = content
            .hero_image
            .or(metadata.featured_media_url)
            .map(|image_url| HeroMedia {
                image_url,
                caption: content.hero_caption.or(metadata.featured_caption),
            });

        OverlayContent {
            title: content.title.or(metadata.title).unwrap_or_default(),
            body_markup: content.content,
            hero,
            meta_names: metadata.taxonomy_names,
            navigation_url: content.link.or(metadata.link),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomies() -> Vec<String> {
        vec!["project_category".to_string()]
    }

    #[test]
    fn test_parse_rendered_plain_title() {
        let record = parse_rendered(
            r#"{
                "title": "Alpha &amp; Beta",
                "content": "<p>Body</p>",
                "link": "https://studio.test/project/alpha/",
                "hero_image": "https://studio.test/hero.jpg",
                "hero_caption": ""
            }"#,
        )
        .unwrap();
        assert_eq!(record.title.as_deref(), Some("Alpha &amp; Beta"));
        assert_eq!(record.content, "<p>Body</p>");
        assert_eq!(record.hero_image.as_deref(), Some("https://studio.test/hero.jpg"));
        assert_eq!(record.hero_caption, None);
    }

    #[test]
    fn test_parse_rendered_object_title_and_false_fields() {
        let record = parse_rendered(
            r#"{"title": {"rendered": "Alpha"}, "content": "", "hero_image": false}"#,
        )
        .unwrap();
        assert_eq!(record.title.as_deref(), Some("Alpha"));
        assert_eq!(record.hero_image, None);
        assert_eq!(record.link, None);
    }

    #[test]
    fn test_parse_rendered_rejects_garbage() {
        let err = parse_rendered("<html>502</html>").unwrap_err();
        assert!(matches!(err, SheetError::Decode(_)));
    }

    #[test]
    fn test_parse_metadata_filters_taxonomies() {
        let record = parse_metadata(
            r#"{
                "title": {"rendered": "Alpha"},
                "link": "https://studio.test/project/alpha/",
                "_embedded": {
                    "wp:term": [
                        [{"taxonomy": "project_category", "name": "Print &amp; Web"}],
                        [{"taxonomy": "project_tag", "name": "ignored"}],
                        []
                    ],
                    "wp:featuredmedia": [{
                        "source_url": "https://studio.test/feature.jpg",
                        "caption": {"rendered": "<p>Shot on film</p>\n"}
                    }]
                }
            }"#,
            &taxonomies(),
        )
        .unwrap();
        assert_eq!(record.taxonomy_names, vec!["Print & Web".to_string()]);
        assert_eq!(
            record.featured_media_url.as_deref(),
            Some("https://studio.test/feature.jpg")
        );
        assert_eq!(record.featured_caption.as_deref(), Some("Shot on film"));
        assert_eq!(record.title.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_parse_metadata_without_embeds() {
        let record = parse_metadata(r#"{"id": 42}"#, &taxonomies()).unwrap();
        assert_eq!(record, MetadataRecord::default());
    }

    #[test]
    fn test_rest_urls() {
        let config = SheetConfig::from_toml_str(
            "[site]\norigin = \"https://studio.test/\"\npost_type = \"work\"",
        )
        .unwrap();
        let provider = RestProvider::new(&config).unwrap();
        assert_eq!(
            provider.content_url(ItemId(42)),
            "https://studio.test/wp-json/dpo/v1/render/42?dpo=1"
        );
        assert_eq!(
            provider.metadata_url(ItemId(42)),
            "https://studio.test/wp-json/wp/v2/work/42?_embed=1"
        );
    }

    #[test]
    fn test_merge_prefers_content() {
        let item = FetchedItem {
            content: ContentRecord {
                title: Some("From content".into()),
                content: "<p>x</p>".into(),
                link: Some("https://a.test/c/".into()),
                hero_image: Some("https://a.test/c.jpg".into()),
                hero_caption: Some("content cap".into()),
            },
            metadata: MetadataRecord {
                title: Some("From metadata".into()),
                link: Some("https://a.test/m/".into()),
                taxonomy_names: vec!["Web".into()],
                featured_media_url: Some("https://a.test/m.jpg".into()),
                featured_caption: Some("meta cap".into()),
            },
        };
        let content = item.into_overlay_content();
        assert_eq!(content.title, "From content");
        assert_eq!(content.navigation_url.as_deref(), Some("https://a.test/c/"));
        let hero = content.hero.unwrap();
        assert_eq!(hero.image_url, "https://a.test/c.jpg");
        assert_eq!(hero.caption.as_deref(), Some("content cap"));
        assert_eq!(content.meta_names, vec!["Web".to_string()]);
    }

    #[test]
    fn test_merge_falls_back_to_metadata() {
        let item = FetchedItem {
            content: ContentRecord {
                content: "<p>x</p>".into(),
                ..Default::default()
            },
            metadata: MetadataRecord {
                title: Some("From metadata".into()),
                link: Some("https://a.test/m/".into()),
                featured_media_url: Some("https://a.test/m.jpg".into()),
                featured_caption: Some("meta cap".into()),
                ..Default::default()
            },
        };
        let content = item.into_overlay_content();
        assert_eq!(content.title, "From metadata");
        assert_eq!(content.navigation_url.as_deref(), Some("https://a.test/m/"));
        let hero = content.hero.unwrap();
        assert_eq!(hero.image_url, "https://a.test/m.jpg");
        assert_eq!(hero.caption.as_deref(), Some("meta cap"));
    }

    #[test]
    fn test_merge_without_any_hero() {
        let content = FetchedItem::default().into_overlay_content();
        assert_eq!(content.hero, None);
        assert_eq!(content.title, "");
        assert_eq!(content.navigation_url, None);
    }
}
