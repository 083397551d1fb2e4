//! Source selection
//!
//! Picks the first candidate whose extension the runtime can decode. The
//! extension comes from, in order: the explicit format, the mime subtype of
//! an inline `data:audio/...;` URI, or the path suffix (query string ignored).

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// One configured source, before selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCandidate {
    pub url: String,
    pub format: Option<String>,
}

/// The source a group settled on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub url: String,
    pub extension: String,
}

impl ResolvedSource {
    /// Inline data rather than a fetchable url
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }

    /// Plain http url (blocked from graph decoding on secure pages)
    #[inline]
    pub fn is_insecure(&self) -> bool {
        self.url
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http:"))
    }
}

/// Detect the extension for one candidate, lowercased
pub fn extension_of(candidate: &SourceCandidate) -> Option<String> {
    if let Some(format) = candidate.format.as_deref() {
        return Some(format.to_ascii_lowercase());
    }
    data_uri_subtype(&candidate.url)
        .or_else(|| path_extension(&candidate.url))
        .map(|ext| ext.to_ascii_lowercase())
}

/// `data:audio/<subtype>;...` → subtype
fn data_uri_subtype(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("data:audio/")?;
    let end = rest.find([';', ','])?;
    // The subtype must be followed by ';', as in `data:audio/wav;base64,`
    if rest.as_bytes()[end] != b';' || end == 0 {
        return None;
    }
    Some(&rest[..end])
}

fn path_extension(url: &str) -> Option<&str> {
    let path = url.split('?').next().unwrap_or(url);
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') {
        None
    } else {
        Some(ext)
    }
}

/// Select the first decodable candidate
pub fn select_source(
    candidates: &[SourceCandidate],
    supports: impl Fn(&str) -> bool,
) -> Result<ResolvedSource, LoadError> {
    for candidate in candidates {
        let Some(extension) = extension_of(candidate) else {
            log::warn!(
                "[Sound] No file extension was found for {}; consider the \"format\" option",
                candidate.url
            );
            continue;
        };

        if supports(&extension) {
            return Ok(ResolvedSource {
                url: candidate.url.clone(),
                extension,
            });
        }
    }

    Err(LoadError::NoCodecSupport)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str) -> SourceCandidate {
        SourceCandidate {
            url: url.into(),
            format: None,
        }
    }

    #[test]
    fn test_extension_sources() {
        assert_eq!(extension_of(&candidate("sfx/laser.MP3")).as_deref(), Some("mp3"));
        assert_eq!(
            extension_of(&candidate("music/theme.ogg?v=12.3")).as_deref(),
            Some("ogg")
        );
        assert_eq!(
            extension_of(&candidate("data:audio/wav;base64,UklGR")).as_deref(),
            Some("wav")
        );
        assert_eq!(extension_of(&candidate("stream/live")), None);
        assert_eq!(extension_of(&candidate("cdn.example/stream")), None);

        let explicit = SourceCandidate {
            url: "stream/live".into(),
            format: Some("MP3".into()),
        };
        assert_eq!(extension_of(&explicit).as_deref(), Some("mp3"));
    }

    #[test]
    fn test_select_first_supported() {
        let candidates = vec![candidate("a.webm"), candidate("a.mp3"), candidate("a.wav")];
        let chosen = select_source(&candidates, |ext| ext == "mp3" || ext == "wav").unwrap();
        assert_eq!(chosen.url, "a.mp3");
        assert_eq!(chosen.extension, "mp3");
    }

    #[test]
    fn test_select_none_supported() {
        let candidates = vec![candidate("a.webm"), candidate("noext")];
        assert_eq!(
            select_source(&candidates, |_| false),
            Err(LoadError::NoCodecSupport)
        );
    }

    #[test]
    fn test_transport_flags() {
        let src = ResolvedSource {
            url: "http://cdn/a.mp3".into(),
            extension: "mp3".into(),
        };
        assert!(src.is_insecure());
        assert!(!src.is_inline());

        let upper = ResolvedSource {
            url: "HTTP://CDN/A.MP3".into(),
            extension: "mp3".into(),
        };
        assert!(upper.is_insecure());

        let secure = ResolvedSource {
            url: "https://cdn/a.mp3".into(),
            extension: "mp3".into(),
        };
        assert!(!secure.is_insecure());
    }
}
