//! Request and element content categories.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;
use log::debug;
use once_cell::sync::Lazy;
use url::Url;

bitflags! {
    /// Request or element category.
    ///
    /// A value with multiple flags set is used as a content type mask.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct ContentType: u32 {
        /// Anything not covered by the other categories.
        const OTHER             = 0b00_0000_0001;
        const IMAGE             = 0b00_0000_0010;
        const SCRIPT            = 0b00_0000_0100;
        const STYLE             = 0b00_0000_1000;
        /// Plugin objects (flash, java applets).
        const OBJECT            = 0b00_0001_0000;
        const XML_HTTP_REQUEST  = 0b00_0010_0000;
        const MEDIA             = 0b00_0100_0000;
        const FONT              = 0b00_1000_0000;
        /// HTML documents, including subdocuments.
        const DOCUMENT          = 0b01_0000_0000;
        /// Requests sent by plugin objects.
        const OBJECT_SUBREQUEST = 0b10_0000_0000;

        /// Union of all concrete categories.
        const ANY = Self::OTHER.bits()
            | Self::IMAGE.bits()
            | Self::SCRIPT.bits()
            | Self::STYLE.bits()
            | Self::OBJECT.bits()
            | Self::XML_HTTP_REQUEST.bits()
            | Self::MEDIA.bits()
            | Self::FONT.bits()
            | Self::DOCUMENT.bits()
            | Self::OBJECT_SUBREQUEST.bits();
    }
}

/// Filter option names of every concrete content type.
pub(crate) const OPTION_NAMES: &[(&str, ContentType)] = &[
    ("other", ContentType::OTHER),
    ("image", ContentType::IMAGE),
    ("script", ContentType::SCRIPT),
    ("stylesheet", ContentType::STYLE),
    ("object", ContentType::OBJECT),
    ("xmlhttprequest", ContentType::XML_HTTP_REQUEST),
    ("media", ContentType::MEDIA),
    ("font", ContentType::FONT),
    ("subdocument", ContentType::DOCUMENT),
    ("object-subrequest", ContentType::OBJECT_SUBREQUEST),
];

static EXTENSION_CONTENT_TYPE: Lazy<HashMap<&'static str, ContentType>> = Lazy::new(|| {
    let mut map = HashMap::new();

    for ext in [".js", ".json", ".vbs", ".coffee"] {
        map.insert(ext, ContentType::SCRIPT);
    }
    for ext in [".jpg", ".jpeg", ".gif", ".png", ".tiff", ".psd", ".ico"] {
        map.insert(ext, ContentType::IMAGE);
    }
    for ext in [".css", ".less"] {
        map.insert(ext, ContentType::STYLE);
    }
    for ext in [".jar", ".swf"] {
        map.insert(ext, ContentType::OBJECT);
    }
    for ext in [
        ".wav", ".mp3", ".mp4", ".avi", ".flv", ".m3u", ".webm", ".mpeg", ".3gp", ".3g2", ".3gpp",
        ".3gpp2", ".ogg", ".mov", ".qt", ".vbm", ".mkv", ".gifv",
    ] {
        map.insert(ext, ContentType::MEDIA);
    }
    for ext in [".ttf", ".otf", ".woff", ".woff2", ".eot"] {
        map.insert(ext, ContentType::FONT);
    }

    map
});

static TAG_CONTENT_TYPE: Lazy<HashMap<&'static str, ContentType>> = Lazy::new(|| {
    HashMap::from([
        ("script", ContentType::SCRIPT),
        ("link", ContentType::STYLE),
        ("img", ContentType::IMAGE),
        ("object", ContentType::OBJECT),
        ("embed", ContentType::OBJECT),
        ("iframe", ContentType::DOCUMENT),
    ])
});

impl ContentType {
    /// No content type.
    pub const NONE: Self = Self::empty();

    /// Content type for a filter option name like `stylesheet`.
    pub fn from_option(name: &str) -> Option<Self> {
        OPTION_NAMES
            .iter()
            .find(|(option, _)| *option == name)
            .map(|(_, content_type)| *content_type)
    }

    /// Content type implied by a file extension, including the leading `.`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        EXTENSION_CONTENT_TYPE.get(extension.to_ascii_lowercase().as_str()).copied()
    }

    /// Content type of resources loaded by an HTML element.
    pub fn from_tag_name(tag_name: &str) -> Option<Self> {
        TAG_CONTENT_TYPE.get(tag_name.to_ascii_lowercase().as_str()).copied()
    }

    /// Guess the content type of a request from its URL path.
    ///
    /// Falls back to [`Self::OTHER`] for unknown extensions and unparsable URLs.
    pub fn from_url(url: &str) -> Self {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(err) => {
                debug!("Cannot detect content type for {url:?}: {err}");
                return Self::OTHER;
            },
        };

        let path = url.path();
        let file_name = path.rsplit('/').next().unwrap_or(path);
        file_name
            .rfind('.')
            .and_then(|dot| Self::from_extension(&file_name[dot..]))
            .unwrap_or(Self::OTHER)
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;

        let names = OPTION_NAMES.iter().filter(|(_, content_type)| self.contains(*content_type));
        for (i, (name, _)) in names.enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "\"{name}\"")?;
        }

        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_is_union() {
        let union = ContentType::OTHER
            | ContentType::IMAGE
            | ContentType::SCRIPT
            | ContentType::STYLE
            | ContentType::OBJECT
            | ContentType::XML_HTTP_REQUEST
            | ContentType::MEDIA
            | ContentType::FONT
            | ContentType::DOCUMENT
            | ContentType::OBJECT_SUBREQUEST;
        assert_eq!(ContentType::ANY, union);
        assert_eq!(ContentType::ANY, ContentType::all());
        assert!(ContentType::NONE.is_empty());
    }

    #[test]
    fn flag_values() {
        assert_eq!(ContentType::OTHER.bits(), 1);
        assert_eq!(ContentType::STYLE.bits(), 8);
        assert_eq!(ContentType::DOCUMENT.bits(), 256);
        assert_eq!(ContentType::OBJECT_SUBREQUEST.bits(), 512);
        assert_eq!(ContentType::ANY.bits(), 1023);
    }

    #[test]
    fn extension() {
        assert_eq!(ContentType::from_extension(".js"), Some(ContentType::SCRIPT));
        assert_eq!(ContentType::from_extension(".PNG"), Some(ContentType::IMAGE));
        assert_eq!(ContentType::from_extension(".woff2"), Some(ContentType::FONT));
        assert_eq!(ContentType::from_extension(".html"), None);
    }

    #[test]
    fn url() {
        assert_eq!(ContentType::from_url("https://example.org/ads.js"), ContentType::SCRIPT);
        assert_eq!(ContentType::from_url("https://example.org/a/b.css?v=1.js"), ContentType::STYLE);
        assert_eq!(ContentType::from_url("https://example.org/video.mp4#t=1"), ContentType::MEDIA);
        assert_eq!(ContentType::from_url("https://example.org/"), ContentType::OTHER);
        assert_eq!(ContentType::from_url("https://example.org/dir.js/page"), ContentType::OTHER);
        assert_eq!(ContentType::from_url("not a url"), ContentType::OTHER);
    }

    #[test]
    fn tag_name() {
        assert_eq!(ContentType::from_tag_name("script"), Some(ContentType::SCRIPT));
        assert_eq!(ContentType::from_tag_name("LINK"), Some(ContentType::STYLE));
        assert_eq!(ContentType::from_tag_name("embed"), Some(ContentType::OBJECT));
        assert_eq!(ContentType::from_tag_name("iframe"), Some(ContentType::DOCUMENT));
        assert_eq!(ContentType::from_tag_name("div"), None);
    }

    #[test]
    fn option() {
        assert_eq!(ContentType::from_option("subdocument"), Some(ContentType::DOCUMENT));
        assert_eq!(
            ContentType::from_option("object-subrequest"),
            Some(ContentType::OBJECT_SUBREQUEST)
        );
        assert_eq!(ContentType::from_option("document"), None);
    }

    #[test]
    fn display() {
        assert_eq!(ContentType::NONE.to_string(), "[]");
        assert_eq!(ContentType::SCRIPT.to_string(), "[\"script\"]");
        let content_types = ContentType::IMAGE | ContentType::SCRIPT;
        assert_eq!(content_types.to_string(), "[\"image\",\"script\"]");
    }
}
