use thiserror::Error;
use url::Url;

use crate::models::chat::Source;

#[derive(Debug, Error)]
pub enum DocLinkError {
    #[error("invalid docs base URL '{0}'")] InvalidBase(String),
    #[error("source has no document name")] Unnamed,
}

/// Builds the viewer link for a cited document: the file name becomes a
/// percent-encoded path segment under the docs base URL, with a `#page=N`
/// fragment when the citation names a page.
pub fn document_url(docs_base_url: &str, source: &Source) -> Result<Url, DocLinkError> {
    let name = source.source.as_deref().ok_or(DocLinkError::Unnamed)?;

    let mut url = Url::parse(docs_base_url).map_err(|_|
        DocLinkError::InvalidBase(docs_base_url.to_string())
    )?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| DocLinkError::InvalidBase(docs_base_url.to_string()))?;
        segments.pop_if_empty().push(name);
    }
    if let Some(page) = source.page {
        url.set_fragment(Some(&format!("page={}", page)));
    }

    Ok(url)
}
