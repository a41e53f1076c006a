//! Request path → file path mapping.
//!
//! The request handler never joins URL paths onto the root itself; it asks a `PathMapper`.
//! `WebtreeMapper` is the 1:1 mapping a package repository's web endpoint expects. Tests and
//! callers can swap in a closure to remap or hide parts of a tree.

use std::path::{ Path, PathBuf };

use percent_encoding::percent_decode_str;

/// Strategy for resolving a request path (as sent, still percent-encoded, query stripped)
/// against the served root. `None` means "no such resource" and is answered with 404.
pub trait PathMapper: Send + Sync + 'static {
    fn map(&self, root: &Path, url_path: &str) -> Option<PathBuf>;
}

impl<F> PathMapper for F where F: Fn(&Path, &str) -> Option<PathBuf> + Send + Sync + 'static {
    fn map(&self, root: &Path, url_path: &str) -> Option<PathBuf> {
        self(root, url_path)
    }
}

/// Directory contents mapped 1:1 onto URL paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebtreeMapper;

impl PathMapper for WebtreeMapper {
    fn map(&self, root: &Path, url_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
        let mut path = root.to_path_buf();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    log::debug!("rejecting parent segment in {url_path}");
                    return None;
                }
                s if s.contains('\\') || s.contains('\0') => {
                    return None;
                }
                s => path.push(s),
            }
        }
        Some(path)
    }
}
