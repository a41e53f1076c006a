//! Static-file request handler
//!
//! A single default service answers every path:
//! - GET/HEAD only; anything else is `405` with an `Allow` header.
//! - The URL path goes through the configured `PathMapper`; a rejected path is `404`.
//! - Directories need a trailing slash (`301` otherwise, query preserved), then serve
//!   `index.html`/`index.htm` if present, else an HTML listing (when enabled).
//! - Files are streamed verbatim through `NamedFile`; a file requested with a trailing slash is
//!   `404`.
//!
//! The served root may not exist yet when the server starts (the converter creates it later),
//! so nothing is canonicalized up front; every request resolves against the filesystem as it is.

use std::path::{ Path, PathBuf };
use std::sync::Arc;

use actix_files::NamedFile;
use actix_web::http::{ Method, header };
use actix_web::{ HttpRequest, HttpResponse, web };
use log::debug;
use percent_encoding::percent_decode_str;

use crate::error::HarnessResult;
use crate::listing;
use crate::mapper::PathMapper;

pub(crate) const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];
pub(crate) const SERVER_HEADER: &str = concat!("webtree-harness/", env!("CARGO_PKG_VERSION"));

/// Per-server state shared by all workers.
pub struct WebtreeState {
    pub(crate) root: PathBuf,
    pub(crate) mapper: Arc<dyn PathMapper>,
    pub(crate) show_files_listing: bool,
}

impl WebtreeState {
    pub fn new(root: impl Into<PathBuf>, mapper: Arc<dyn PathMapper>, show_files_listing: bool) -> Self {
        Self { root: root.into(), mapper, show_files_listing }
    }
}

/// plain-text 404, matching what clients see for any missing resource
pub(crate) fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .insert_header(header::ContentType::plaintext())
        .body("404 Not Found")
}

async fn serve_file(req: &HttpRequest, path: &Path) -> HarnessResult<HttpResponse> {
    let file = NamedFile::open_async(path).await?;
    Ok(file.disable_content_disposition().into_response(req))
}

/// Default service for every path under the served root.
pub async fn serve_webtree(
    req: HttpRequest,
    state: web::Data<WebtreeState>,
) -> HarnessResult<HttpResponse> {
    if !matches!(*req.method(), Method::GET | Method::HEAD) {
        debug!("{} {}: method not allowed", req.method(), req.path());
        return Ok(HttpResponse::MethodNotAllowed()
            .insert_header((header::ALLOW, "GET, HEAD"))
            .finish());
    }

    let url_path = req.path();
    let Some(target) = state.mapper.map(&state.root, url_path) else {
        debug!("{url_path}: rejected by mapper");
        return Ok(not_found());
    };

    let metadata = match std::fs::metadata(&target) {
        Ok(m) => m,
        Err(e) if matches!(
            e.kind(),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
        ) => {
            debug!("{}: !exists", target.display());
            return Ok(not_found());
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        if !url_path.ends_with('/') {
            let mut location = format!("{url_path}/");
            if !req.query_string().is_empty() {
                location.push('?');
                location.push_str(req.query_string());
            }
            return Ok(HttpResponse::MovedPermanently()
                .insert_header((header::LOCATION, location))
                .finish());
        }
        for index in INDEX_FILES {
            let candidate = target.join(index);
            if candidate.is_file() {
                return serve_file(&req, &candidate).await;
            }
        }
        if !state.show_files_listing {
            return Ok(not_found());
        }
        let display_path = percent_decode_str(url_path).decode_utf8_lossy();
        let html = listing::render(&target, &display_path)?;
        return Ok(HttpResponse::Ok()
            .insert_header(header::ContentType::html())
            .body(html));
    }

    if url_path.ends_with('/') {
        return Ok(not_found());
    }
    serve_file(&req, &target).await
}
