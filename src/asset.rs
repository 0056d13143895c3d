//! Acquirable media items and the binaries produced from them.
//!
//! An [`Asset`] is what the parse API hands back for a page: a title, the
//! direct source URL a relay should fetch, and an optional upstream
//! User-Agent hint. Assets are immutable once received and are identified by
//! their source URL for the duration of one acquisition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest title prefix kept when deriving a file name.
const MAX_FILE_STEM_CHARS: usize = 120;

/// File stem used when a title has no usable characters left.
const FALLBACK_FILE_STEM: &str = "download";

/// Container kind of an asset, which decides the MIME type and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// MP4 video.
    #[default]
    Video,
    /// M4A audio.
    Audio,
}

impl MediaKind {
    /// MIME type attached to acquired binaries of this kind.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Video => "video/mp4",
            Self::Audio => "audio/x-m4a",
        }
    }

    /// File extension including the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Video => ".mp4",
            Self::Audio => ".m4a",
        }
    }
}

/// Stable identity of an item for state tracking.
///
/// Keyed by source URL rather than list position so state never bleeds
/// between items when a list is filtered or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey(String);

impl ItemKey {
    /// Creates a key from any string identity.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One media item produced by the parse API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Human readable title, also the basis for the saved file name.
    pub display_title: String,
    /// Direct upstream URL the relay fetches on our behalf.
    pub source_url: String,
    /// User-Agent the relay should present upstream, when the parse API
    /// supplied one.
    pub user_agent_hint: Option<String>,
    /// Container kind.
    pub kind: MediaKind,
    /// Thumbnail URL, informational only.
    pub thumbnail: Option<String>,
    /// Subtitle or transcript languages the source advertises.
    pub subtitle_languages: Vec<String>,
}

impl Asset {
    /// Creates a video asset with no hints.
    #[must_use]
    pub fn new(display_title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            display_title: display_title.into(),
            source_url: source_url.into(),
            user_agent_hint: None,
            kind: MediaKind::Video,
            thumbnail: None,
            subtitle_languages: Vec::new(),
        }
    }

    /// Sets the upstream User-Agent hint.
    #[must_use]
    pub fn with_user_agent_hint(mut self, hint: impl Into<String>) -> Self {
        self.user_agent_hint = Some(hint.into());
        self
    }

    /// Sets the media kind.
    #[must_use]
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Stable tracking key for this asset.
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.source_url.clone())
    }

    /// File name the acquired binary is saved under.
    ///
    /// Filesystem-unsafe characters are stripped from the title, whitespace
    /// runs collapse to a single space, and the media kind's extension is
    /// appended.
    #[must_use]
    pub fn target_file_name(&self) -> String {
        let stem = sanitize_title(&self.display_title);
        let stem = if stem.is_empty() {
            FALLBACK_FILE_STEM.to_string()
        } else {
            stem
        };
        format!("{stem}{}", self.kind.extension())
    }
}

/// Strips characters that are unsafe in file names on common filesystems.
pub(crate) fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;
    for ch in title.chars() {
        match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {}
            c if c.is_whitespace() => pending_space = !out.is_empty(),
            c if c.is_control() => {}
            c => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
            }
        }
    }
    // Leading dots would produce hidden files.
    let trimmed = out.trim_start_matches('.').trim_end_matches(['.', ' ']);
    trimmed.chars().take(MAX_FILE_STEM_CHARS).collect::<String>().trim_end().to_string()
}

/// Binary payload of one successful acquisition.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBinary {
    /// Raw media bytes.
    pub bytes: Vec<u8>,
    /// MIME type derived from the asset's media kind.
    pub mime_type: &'static str,
    /// Derived file name to save under.
    pub file_name: String,
    /// Index of the relay that served the bytes.
    pub relay_index: usize,
}

impl MediaBinary {
    /// Number of bytes in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBinary")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .field("relay_index", &self.relay_index)
            .finish()
    }
}
