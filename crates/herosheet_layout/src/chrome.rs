//! Overlay chrome
//!
//! The fixed node skeleton of the overlay, built once per controller and
//! appended to the document body. Content is swapped inside it on each
//! open; the skeleton itself is never rebuilt.

use crate::handoff::HandoffRegions;
use crate::markup;
use crate::overlay::OverlayConfig;
use crate::staging::HeroSlot;
use crate::tree::{DocumentTree, NodeId};

pub const ROOT_ID: &str = "hs-overlay";
pub const TITLE_ID: &str = "hs-title";
pub const CONTENT_ID: &str = "hs-content";
/// Marks nodes whose click closes the overlay
pub const CLOSE_ATTR: &str = "data-hs-close";
pub const HIDDEN_CLASS: &str = "hs-hidden";
/// Page scroll lock, set on both the document element and body
pub const LOCK_CLASS: &str = "hs-lock";
pub const OPEN_ATTR: &str = "data-open";
/// Separator between taxonomy names in the header meta line
pub const META_SEPARATOR: &str = " • ";

/// Handles to the chrome's fixed nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayChrome {
    pub root: NodeId,
    pub backdrop: NodeId,
    pub card: NodeId,
    pub close_button: NodeId,
    pub article: NodeId,
    pub header: NodeId,
    pub title: NodeId,
    pub meta: NodeId,
    pub hero: NodeId,
    pub hero_image: NodeId,
    pub hero_caption: NodeId,
    pub hero_stage: NodeId,
    pub content: NodeId,
}

impl OverlayChrome {
    /// Build the skeleton under the document body
    pub fn build(tree: &mut DocumentTree, config: &OverlayConfig) -> Self {
        let mut root_classes = vec!["hs", HIDDEN_CLASS];
        if config.use_sheet {
            root_classes.push("hs--sheet");
        }
        if config.hide_header {
            root_classes.push("hs--no-header");
        }
        if config.close_in_hero {
            root_classes.push("hs--close-in-hero");
        }
        let root = tree.create_element_with(
            "div",
            &root_classes,
            &[
                ("id", ROOT_ID),
                ("aria-hidden", "true"),
                ("data-version", env!("CARGO_PKG_VERSION")),
            ],
        );

        let backdrop = tree.create_element_with("div", &["hs-backdrop"], &[(CLOSE_ATTR, "")]);
        let card = tree.create_element_with(
            "div",
            &["hs-card"],
            &[
                ("role", "dialog"),
                ("aria-modal", "true"),
                ("aria-labelledby", TITLE_ID),
                ("aria-describedby", CONTENT_ID),
            ],
        );
        let close_button = tree.create_element_with(
            "button",
            &["hs-close"],
            &[
                ("type", "button"),
                ("aria-label", "Close"),
                ("title", "Close (Esc)"),
                (CLOSE_ATTR, ""),
            ],
        );
        let close_glyph = tree.create_text("×");
        let article = tree.create_element_with("article", &["hs-article"], &[]);
        let header = tree.create_element_with("header", &["hs-header"], &[]);
        let title = tree.create_element_with("h2", &["hs-title"], &[("id", TITLE_ID)]);
        let meta = tree.create_element_with("div", &["hs-meta"], &[("hidden", "")]);
        let hero = tree.create_element_with("figure", &["hs-hero"], &[("hidden", "")]);
        let hero_image =
            tree.create_element_with("img", &[], &[("id", "hs-hero-img"), ("alt", "")]);
        let hero_caption = tree.create_element_with(
            "figcaption",
            &["hs-cap"],
            &[("id", "hs-hero-cap"), ("hidden", "")],
        );
        let hero_stage = tree.create_element_with("div", &["hs-hero-stage"], &[("hidden", "")]);
        let content = tree.create_element_with("div", &["hs-content"], &[("id", CONTENT_ID)]);

        tree.append_child(root, backdrop);
        tree.append_child(root, card);
        tree.append_child(card, close_button);
        tree.append_child(close_button, close_glyph);
        tree.append_child(card, article);
        tree.append_child(article, header);
        tree.append_child(header, title);
        tree.append_child(header, meta);
        tree.append_child(article, hero);
        tree.append_child(hero, hero_image);
        tree.append_child(hero, hero_caption);
        tree.append_child(hero, hero_stage);
        tree.append_child(article, content);

        let body = tree.body();
        tree.append_child(body, root);

        Self {
            root,
            backdrop,
            card,
            close_button,
            article,
            header,
            title,
            meta,
            hero,
            hero_image,
            hero_caption,
            hero_stage,
            content,
        }
    }

    pub fn hero_slot(&self) -> HeroSlot {
        HeroSlot {
            overlay_root: self.root,
            hero: self.hero,
            image: self.hero_image,
            caption: self.hero_caption,
            stage: self.hero_stage,
        }
    }

    pub fn handoff_regions(&self) -> HandoffRegions {
        HandoffRegions {
            card: self.card,
            article: self.article,
            content: self.content,
        }
    }

    pub fn set_title(&self, tree: &mut DocumentTree, title_markup: &str) {
        markup::set_inner_markup(tree, self.title, title_markup);
    }

    /// Replace the content pane's children with `body_markup`
    pub fn set_content(&self, tree: &mut DocumentTree, body_markup: &str) {
        markup::set_inner_markup(tree, self.content, body_markup);
    }

    /// Show taxonomy names in the header meta line, hiding it when empty
    pub fn set_meta(&self, tree: &mut DocumentTree, names: &[String]) {
        if names.is_empty() {
            tree.set_text_content(self.meta, "");
            tree.set_hidden(self.meta, true);
        } else {
            tree.set_text_content(self.meta, &names.join(META_SEPARATOR));
            tree.set_hidden(self.meta, false);
        }
    }

    /// Show the static hero image, or hide the hero when there is none
    pub fn set_hero(&self, tree: &mut DocumentTree, image_url: Option<&str>, caption: Option<&str>) {
        match image_url.filter(|url| !url.is_empty()) {
            Some(url) => {
                let caption = caption.map(markup::strip_tags).unwrap_or_default();
                tree.set_attr(self.hero_image, "src", url);
                tree.set_text_content(self.hero_caption, &caption);
                tree.set_hidden(self.hero_caption, caption.is_empty());
                tree.set_hidden(self.hero, false);
            }
            None => {
                tree.remove_attr(self.hero_image, "src");
                tree.set_hidden(self.hero, true);
                tree.set_hidden(self.hero_caption, true);
                tree.set_text_content(self.hero_caption, "");
            }
        }
    }

    /// Lock or unlock host-page scrolling
    pub fn lock_page(&self, tree: &mut DocumentTree, locked: bool) {
        let targets = [tree.document_element(), tree.body()];
        for node in targets {
            if locked {
                tree.add_class(node, LOCK_CLASS);
            } else {
                tree.remove_class(node, LOCK_CLASS);
            }
        }
    }

    pub fn is_page_locked(&self, tree: &DocumentTree) -> bool {
        tree.has_class(tree.document_element(), LOCK_CLASS) && tree.has_class(tree.body(), LOCK_CLASS)
    }

    pub fn set_visible(&self, tree: &mut DocumentTree, visible: bool) {
        if visible {
            tree.remove_class(self.root, HIDDEN_CLASS);
        } else {
            tree.add_class(self.root, HIDDEN_CLASS);
        }
    }

    pub fn is_visible(&self, tree: &DocumentTree) -> bool {
        !tree.has_class(self.root, HIDDEN_CLASS)
    }

    /// Whether a click on `target` should close the overlay
    pub fn is_close_target(&self, tree: &DocumentTree, target: NodeId) -> bool {
        tree.contains(self.root, target)
            && tree
                .closest(target, |t, n| t.has_attr(n, CLOSE_ATTR) || n == self.card)
                .is_some_and(|n| n != self.card)
    }
}
