use url::Url;

/// Path extensions of documents that are listed but never fetched
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".doc", ".xls", ".xlsx"];

/// Substrings anywhere in a URL that mark it as a download
const DOCUMENT_MARKERS: &[&str] = &["ebook", "download"];

/// Path extensions of images that are skipped silently
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// What a discovered URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// An HTML page to fetch and extract text from
    Page,
    /// A document or download; recorded but not fetched
    SkippableDocument,
    /// An image; neither fetched nor recorded
    SkippableImage,
}

impl LinkKind {
    /// Returns true if the URL should be fetched
    pub fn should_fetch(&self) -> bool {
        matches!(self, Self::Page)
    }
}

/// Classifies a URL by its path extension
///
/// Documents take priority over images: a URL is a
/// [`LinkKind::SkippableDocument`] if its path ends in a document extension
/// or the URL mentions `ebook`/`download`, a [`LinkKind::SkippableImage`] if
/// its path ends in an image extension, and a [`LinkKind::Page`] otherwise.
/// Matching is case-insensitive.
///
/// # Examples
///
/// ```
/// use site_harvest::url::{classify_url, LinkKind};
/// use url::Url;
///
/// let url = Url::parse("https://example.com/report.PDF").unwrap();
/// assert_eq!(classify_url(&url), LinkKind::SkippableDocument);
/// ```
pub fn classify_url(url: &Url) -> LinkKind {
    let path = url.path().to_lowercase();
    let full = url.as_str().to_lowercase();

    if DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || DOCUMENT_MARKERS.iter().any(|marker| full.contains(marker))
    {
        return LinkKind::SkippableDocument;
    }

    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return LinkKind::SkippableImage;
    }

    LinkKind::Page
}
