//! Custom URL scheme handlers.
//!
//! - `zenium://` serves the shell's own pages from a fixed resource root.
//! - `zntp://` redirects registered local sites to `http://localhost:<port>`
//!   (see [`zntp`]).
//!
//! Both report failures with the host's network error codes so the host can
//! hand them straight back to the requesting surface.

pub mod zntp;

pub use zntp::{resolve_zntp, AddSiteRequest, Site, SiteError, SiteRegistry, UpdateSiteRequest};

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub const ZENIUM_SCHEME: &str = "zenium://";

/// Document served for directory-like paths.
const INDEX_FILE: &str = "index.html";

/// Network error codes understood by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetError {
    /// Malformed request (`net::ERR_ABORTED`)
    #[error("request aborted")]
    Aborted,
    /// Missing resource, or a path outside the served root (`net::ERR_FILE_NOT_FOUND`)
    #[error("file not found")]
    FileNotFound,
}

impl NetError {
    pub fn code(self) -> i32 {
        match self {
            NetError::Aborted => -3,
            NetError::FileNotFound => -6,
        }
    }
}

/// What a scheme handler hands back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemeResponse {
    Path { path: PathBuf },
    Redirect { url: String },
    Error { error: i32 },
}

impl From<Result<PathBuf, NetError>> for SchemeResponse {
    fn from(result: Result<PathBuf, NetError>) -> Self {
        match result {
            Ok(path) => SchemeResponse::Path { path },
            Err(e) => SchemeResponse::Error { error: e.code() },
        }
    }
}

impl From<Result<String, NetError>> for SchemeResponse {
    fn from(result: Result<String, NetError>) -> Self {
        match result {
            Ok(url) => SchemeResponse::Redirect { url },
            Err(e) => SchemeResponse::Error { error: e.code() },
        }
    }
}

/// Logical path of a `zenium://` request, relative to the pages root.
///
/// Relative asset URLs inside a page loaded as `zenium://newtab?tabId=1` come
/// back as `zenium://newtab?tabId=1/newtab.css`: whatever follows the first
/// `/` after the query is still part of the path.
fn logical_path(rest: &str) -> String {
    let path = match rest.find('?') {
        Some(query_start) => {
            let (before, query) = rest.split_at(query_start);
            match query.find('/') {
                Some(slash) => format!("{}{}", before, &query[slash..]),
                None => before.to_string(),
            }
        }
        None => rest.to_string(),
    };
    path.trim_start_matches('/').to_string()
}

/// Resolve a `zenium://` request to a file under `root`.
///
/// Extensionless paths get an implicit `index.html`. Anything that would
/// land outside `root` is refused with [`NetError::FileNotFound`] and logged
/// as a security violation. No percent-decoding is applied.
pub fn resolve_zenium(url: &str, root: &Path) -> Result<PathBuf, NetError> {
    let Some(rest) = url.strip_prefix(ZENIUM_SCHEME) else {
        log::warn!("Not a {} URL: {:?}", ZENIUM_SCHEME, url);
        return Err(NetError::Aborted);
    };
    if rest.contains('\0') {
        log::warn!("Rejecting {} URL with NUL byte", ZENIUM_SCHEME);
        return Err(NetError::Aborted);
    }

    let mut requested = PathBuf::from(logical_path(rest));
    if requested.extension().is_none() {
        requested.push(INDEX_FILE);
    }

    match zenium_config::paths::confine(root, &requested) {
        Ok(path) => {
            debug_log!("PROTOCOL", "{} -> {:?}", url, path);
            Ok(path)
        }
        Err(e) => {
            log::error!(
                "Security violation: {} request escapes the pages root: {}",
                ZENIUM_SCHEME,
                e
            );
            Err(NetError::FileNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_path_query_forms() {
        assert_eq!(logical_path("newtab"), "newtab");
        assert_eq!(logical_path("newtab?tabId=123"), "newtab");
        assert_eq!(logical_path("newtab?tabId=123/newtab.css"), "newtab/newtab.css");
        assert_eq!(logical_path("/settings/"), "settings/");
    }

    #[test]
    fn test_extension_is_kept() {
        let root = Path::new("/srv/pages");
        assert_eq!(
            resolve_zenium("zenium://loading/loading.css", root).unwrap(),
            PathBuf::from("/srv/pages/loading/loading.css")
        );
    }

    #[test]
    fn test_non_zenium_url_is_aborted() {
        let err = resolve_zenium("https://example.com/", Path::new("/srv/pages")).unwrap_err();
        assert_eq!(err.code(), -3);
    }

    #[test]
    fn test_nul_byte_is_aborted() {
        let err = resolve_zenium("zenium://new\0tab", Path::new("/srv/pages")).unwrap_err();
        assert_eq!(err, NetError::Aborted);
    }

    #[test]
    fn test_escape_through_query_suffix_is_refused() {
        let err = resolve_zenium("zenium://newtab?x=1/../../../etc/passwd", Path::new("/srv/pages"))
            .unwrap_err();
        assert_eq!(err, NetError::FileNotFound);
    }

    #[test]
    fn test_scheme_response_shapes() {
        let ok: SchemeResponse = Ok::<_, NetError>(PathBuf::from("/srv/pages/index.html")).into();
        assert_eq!(
            serde_json::to_value(ok).unwrap(),
            serde_json::json!({"path": "/srv/pages/index.html"})
        );
        let err: SchemeResponse = Err::<PathBuf, _>(NetError::FileNotFound).into();
        assert_eq!(serde_json::to_value(err).unwrap(), serde_json::json!({"error": -6}));
    }
}
