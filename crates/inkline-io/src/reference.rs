//! Image references: where a source image comes from.

use std::fmt;
use std::path::PathBuf;

/// URL schemes handed to a network-capable fetcher.
const URL_SCHEMES: [&str; 4] = ["http://", "https://", "blob:", "data:"];

/// A handle to a source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// A URL, possibly cross-origin (`http(s)://`, `blob:`, `data:`).
    Url(String),
    /// A local file.
    Path(PathBuf),
    /// Encoded image bytes already in memory.
    Bytes(Vec<u8>),
}

impl ImageReference {
    /// Classify a user-supplied string.
    ///
    /// `http://`, `https://`, `blob:` and `data:` (any letter case)
    /// become [`Url`](Self::Url); a `file://` prefix is stripped and the
    /// remainder becomes a [`Path`](Self::Path), as does anything else.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        if let Some(rest) = strip_prefix_ignore_case(input, "file://") {
            return Self::Path(PathBuf::from(rest));
        }
        if URL_SCHEMES
            .iter()
            .any(|scheme| strip_prefix_ignore_case(input, scheme).is_some())
        {
            Self::Url(input.to_string())
        } else {
            Self::Path(PathBuf::from(input))
        }
    }
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &input[prefix.len()..])
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<PathBuf> for ImageReference {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for ImageReference {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_urls_are_urls() {
        for input in [
            "https://assets.example.com/page.png",
            "http://localhost:8080/a.jpg",
            "HTTPS://EXAMPLE.COM/X.PNG",
            "blob:https://app.example.com/1f0c",
            "data:image/png;base64,iVBORw0KGgo=",
        ] {
            assert_eq!(
                ImageReference::parse(input),
                ImageReference::Url(input.to_string()),
                "{input}"
            );
        }
    }

    #[test]
    fn file_scheme_is_stripped() {
        assert_eq!(
            ImageReference::parse("file:///tmp/page.png"),
            ImageReference::Path(PathBuf::from("/tmp/page.png"))
        );
    }

    #[test]
    fn bare_strings_are_paths() {
        assert_eq!(
            ImageReference::parse("pages/cat.webp"),
            ImageReference::Path(PathBuf::from("pages/cat.webp"))
        );
        // Shorter than any scheme.
        assert_eq!(
            ImageReference::parse("a"),
            ImageReference::Path(PathBuf::from("a"))
        );
    }

    #[test]
    fn non_ascii_input_does_not_split_a_char() {
        assert_eq!(
            ImageReference::parse("ünïcødé.png"),
            ImageReference::Path(PathBuf::from("ünïcødé.png"))
        );
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            ImageReference::Url("https://x/y.png".into()).to_string(),
            "https://x/y.png"
        );
        assert_eq!(ImageReference::Bytes(vec![0; 12]).to_string(), "<12 bytes>");
    }
}
