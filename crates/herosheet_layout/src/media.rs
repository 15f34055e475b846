//! Media URL classification
//!
//! Pure functions deciding whether a URL points at a known video provider
//! or a raw video file, and what its embeddable form is. Nothing here
//! touches the document tree.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Source of a playable URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaProvider {
    YouTube,
    Vimeo,
    /// Raw video file played by a native `video` element
    File,
}

impl MediaProvider {
    /// Providers that are embedded through an iframe
    pub fn is_embedded(&self) -> bool {
        matches!(self, MediaProvider::YouTube | MediaProvider::Vimeo)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaProvider::YouTube => "youtube",
            MediaProvider::Vimeo => "vimeo",
            MediaProvider::File => "file",
        }
    }
}

/// Classification result: provider plus the URL to load in the player
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaSource {
    pub provider: MediaProvider,
    pub embed_url: String,
}

/// Classify a URL, returning `None` for anything that is not playable media
///
/// Provider URLs whose video id cannot be derived also yield `None`.
pub fn classify(url: &str) -> Option<MediaSource> {
    if is_youtube(url) {
        return youtube_embed(url).map(|embed_url| MediaSource {
            provider: MediaProvider::YouTube,
            embed_url,
        });
    }
    if is_vimeo(url) {
        return vimeo_embed(url).map(|embed_url| MediaSource {
            provider: MediaProvider::Vimeo,
            embed_url,
        });
    }
    if is_video_file(url) {
        return Some(MediaSource {
            provider: MediaProvider::File,
            embed_url: url.to_string(),
        });
    }
    None
}

pub fn is_youtube(url: &str) -> bool {
    parse(url).is_some_and(|u| host_matches(&u, "youtube.com") || u.host_str() == Some("youtu.be"))
}

pub fn is_vimeo(url: &str) -> bool {
    parse(url).is_some_and(|u| host_matches(&u, "vimeo.com"))
}

/// Path ends in a known video extension (before any query or fragment)
pub fn is_video_file(url: &str) -> bool {
    static FILE: OnceLock<Regex> = OnceLock::new();
    FILE.get_or_init(|| {
        Regex::new(r"(?i)[./](mp4|webm|ogg|ogv|mov)([?#]|$)").expect("valid video file pattern")
    })
    .is_match(url)
}

/// Embeddable YouTube player URL
pub fn youtube_embed(url: &str) -> Option<String> {
    let parsed = parse(url)?;
    let id = if parsed.host_str() == Some("youtu.be") {
        parsed.path().strip_prefix('/').unwrap_or_default().to_string()
    } else if let Some(v) = query_param(&parsed, "v") {
        v
    } else {
        let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
        match segments.next() {
            Some("embed") | Some("shorts") => segments.next().unwrap_or_default().to_string(),
            _ => String::new(),
        }
    };
    if id.is_empty() {
        return None;
    }
    Some(format!(
        "https://www.youtube.com/embed/{id}?autoplay=1&rel=0&modestbranding=1&playsinline=1"
    ))
}

/// Embeddable Vimeo player URL
pub fn vimeo_embed(url: &str) -> Option<String> {
    static VIMEO: OnceLock<Regex> = OnceLock::new();
    let re = VIMEO
        .get_or_init(|| Regex::new(r"vimeo\.com/(?:video/)?(\d+)").expect("valid vimeo pattern"));
    let id = re.captures(url)?.get(1)?.as_str();
    Some(format!(
        "https://player.vimeo.com/video/{id}?autoplay=1&pip=1"
    ))
}

/// `src` with `autoplay=1` appended, or `None` when it already carries an
/// autoplay parameter or is not an absolute URL
pub fn with_autoplay(src: &str) -> Option<String> {
    let mut parsed = parse(src)?;
    if parsed.query_pairs().any(|(k, _)| k == "autoplay") {
        return None;
    }
    parsed.query_pairs_mut().append_pair("autoplay", "1");
    Some(parsed.to_string())
}

/// Only absolute URLs classify; scheme-relative and relative ones do not
fn parse(url: &str) -> Option<Url> {
    Url::parse(url.trim()).ok()
}

/// Host is `domain` or one of its subdomains
fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str().is_some_and(|host| {
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Decoded value of the first `key` parameter; present but empty counts
/// as present
fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
