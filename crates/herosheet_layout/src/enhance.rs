//! Content enhancement
//!
//! Runs over freshly injected content: provider iframes get player
//! permissions and a responsive wrapper, native videos are collected so the
//! controller can arm them for staging, and media links can be swapped for
//! a player on demand. Page-builder video modules that hide their player
//! behind a poster overlay are started when the overlay's play link is hit.

use crate::media::{self, MediaSource};
use crate::tree::{DocumentTree, NodeId};

/// Responsive 16:9 wrapper around provider iframes
pub const FLUID_CLASS: &str = "hs-fluid";
/// Container the staging manager moves in and out of the hero
pub const STAGE_WRAP_CLASS: &str = "hs-stage-wrap";
/// `allow` attribute given to provider players
pub const PLAYER_ALLOW: &str = "autoplay; encrypted-media; picture-in-picture";

/// Page-builder video module
pub const MODULE_CLASS: &str = "et_pb_video";
/// Poster overlay covering a module's player
pub const MODULE_OVERLAY_CLASS: &str = "et_pb_video_overlay";
/// Play link inside the poster overlay
pub const MODULE_PLAY_CLASS: &str = "et_pb_video_play";
/// Box holding the module's player
pub const MODULE_BOX_CLASS: &str = "et_pb_video_box";

/// Result of activating a video module
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModulePlay {
    /// Player that was started, if the box held one
    pub player: Option<NodeId>,
}

/// Hook for preparing injected content
///
/// The default [`EmbedEnhancer`] covers provider iframes and native video.
/// Hosts with builder-specific markup can layer their own implementation.
pub trait ContentEnhancer {
    /// Normalize embeds under `root`, returning the native video elements
    /// that should be armed for staging
    fn normalize_embeds(&self, tree: &mut DocumentTree, root: NodeId) -> Vec<NodeId>;

    /// First playable node under `root` in document order
    fn first_player(&self, tree: &DocumentTree, root: NodeId) -> Option<NodeId> {
        tree.find_first(root, |t, n| t.is_tag(n, "iframe") || t.is_tag(n, "video"))
    }

    /// Replace `anchor` with a player for `source`
    ///
    /// Returns the staging container now standing where the anchor was.
    fn player_for_link(
        &self,
        tree: &mut DocumentTree,
        anchor: NodeId,
        source: &MediaSource,
    ) -> Option<NodeId>;

    /// Start the video module whose play link contains `target`
    ///
    /// Returns `None` when `target` is not inside a module's play link, in
    /// which case the click is none of this hook's business.
    fn activate_module(&self, _tree: &mut DocumentTree, _target: NodeId) -> Option<ModulePlay> {
        None
    }
}

/// Default enhancer
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbedEnhancer;

impl ContentEnhancer for EmbedEnhancer {
    fn normalize_embeds(&self, tree: &mut DocumentTree, root: NodeId) -> Vec<NodeId> {
        let iframes = tree.find_all(root, |t, n| t.is_tag(n, "iframe"));
        for iframe in iframes {
            let src = tree.attr(iframe, "src").unwrap_or_default();
            if !(media::is_youtube(src) || media::is_vimeo(src)) {
                continue;
            }
            set_player_permissions(tree, iframe);
            wrap_responsive(tree, iframe);
        }

        tree.find_all(root, |t, n| t.is_tag(n, "video"))
    }

    fn player_for_link(
        &self,
        tree: &mut DocumentTree,
        anchor: NodeId,
        source: &MediaSource,
    ) -> Option<NodeId> {
        tree.parent(anchor)?;

        let wrap = if source.provider.is_embedded() {
            let wrap = tree.create_element_with("div", &[FLUID_CLASS, STAGE_WRAP_CLASS], &[]);
            let iframe =
                tree.create_element_with("iframe", &[], &[("src", source.embed_url.as_str())]);
            set_player_permissions(tree, iframe);
            tree.append_child(wrap, iframe);
            wrap
        } else {
            let wrap = tree.create_element_with("div", &[STAGE_WRAP_CLASS], &[]);
            let video = tree.create_element_with(
                "video",
                &[],
                &[
                    ("src", source.embed_url.as_str()),
                    ("controls", ""),
                    ("playsinline", ""),
                    ("autoplay", ""),
                ],
            );
            tree.append_child(wrap, video);
            wrap
        };

        tree.replace_with(anchor, wrap);
        tree.remove_subtree(anchor);
        tracing::debug!(provider = source.provider.as_str(), "media link replaced by player");
        Some(wrap)
    }

    fn activate_module(&self, tree: &mut DocumentTree, target: NodeId) -> Option<ModulePlay> {
        let play = tree.closest(target, |t, n| {
            t.is_tag(n, "a") && t.has_class(n, MODULE_PLAY_CLASS)
        })?;
        let overlay = tree.closest(play, |t, n| t.has_class(n, MODULE_OVERLAY_CLASS))?;
        let module = tree.closest(overlay, |t, n| t.has_class(n, MODULE_CLASS))?;
        let player_box = tree.find_first(module, |t, n| t.has_class(n, MODULE_BOX_CLASS))?;

        tree.set_hidden(overlay, true);

        if let Some(video) = tree.find_first(player_box, |t, n| t.is_tag(n, "video")) {
            let sources = tree.find_all(player_box, |t, n| {
                t.is_tag(n, "source") && t.has_attr(n, "data-src")
            });
            for source in sources {
                promote_data_src(tree, source);
            }
            if tree.attr(video, "src").map_or(true, str::is_empty) {
                promote_data_src(tree, video);
            }
            tree.set_attr(video, "playsinline", "");
            if !tree.has_attr(video, "muted") {
                tree.set_attr(video, "muted", "");
            }
            tree.set_attr(video, "autoplay", "");
            tracing::debug!("video module started native player");
            return Some(ModulePlay {
                player: Some(video),
            });
        }

        let Some(iframe) = tree.find_first(player_box, |t, n| t.is_tag(n, "iframe")) else {
            return Some(ModulePlay { player: None });
        };
        promote_data_src(tree, iframe);
        let autoplay = tree.attr(iframe, "src").and_then(media::with_autoplay);
        if let Some(src) = autoplay {
            tree.set_attr(iframe, "src", &src);
        }
        tracing::debug!("video module started embedded player");
        Some(ModulePlay {
            player: Some(iframe),
        })
    }
}

/// Move a lazy-load `data-src` into `src`
fn promote_data_src(tree: &mut DocumentTree, node: NodeId) {
    let Some(src) = tree.attr(node, "data-src").map(str::to_string) else {
        return;
    };
    tree.set_attr(node, "src", &src);
    tree.remove_attr(node, "data-src");
}

fn set_player_permissions(tree: &mut DocumentTree, iframe: NodeId) {
    tree.set_attr(iframe, "allow", PLAYER_ALLOW);
    tree.set_attr(iframe, "allowfullscreen", "true");
}

/// Put `node` inside a responsive wrapper unless its parent already is one
///
/// Returns the wrapper.
pub fn wrap_responsive(tree: &mut DocumentTree, node: NodeId) -> NodeId {
    if let Some(parent) = tree.parent(node) {
        if tree.has_class(parent, FLUID_CLASS) {
            return parent;
        }
    }
    let wrap = tree.create_element_with("div", &[FLUID_CLASS], &[]);
    tree.replace_with(node, wrap);
    tree.append_child(wrap, node);
    wrap
}

/// The node that moves as a unit when `player` is staged
///
/// Provider iframes travel with their responsive wrapper so no empty
/// wrapper is left behind in the content.
pub fn staging_unit(tree: &DocumentTree, player: NodeId) -> NodeId {
    match tree.parent(player) {
        Some(parent) if tree.has_class(parent, FLUID_CLASS) => parent,
        _ => player,
    }
}
