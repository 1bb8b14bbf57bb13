//! Static files under the configured root.

use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Response, StatusCode};
use mime_guess::mime;
use tracing::{debug, trace};

use super::service::text;

const INDEX: &str = "index.html";

/// Builds the response for `path` below `root`.
pub(crate) async fn serve(root: &Path, method: &Method, path: &str) -> Response<Bytes> {
    if method != Method::GET && method != Method::HEAD {
        let mut res = text(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed");
        res.headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        return res;
    }

    let file = match resolve(root, path) {
        Some(file) => file,
        None => return not_found(),
    };

    let (file, contents) = match read(&file).await {
        Ok(found) => found,
        Err(err) => {
            debug!("cannot serve {:?}: {}", file, err);
            return not_found();
        }
    };
    trace!("serving {:?}: {} bytes", file, contents.len());

    let mut res = Response::new(Bytes::new());
    res.headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(contents.len()));
    res.headers_mut()
        .insert(CONTENT_TYPE, content_type(&file));
    if method == Method::GET {
        *res.body_mut() = Bytes::from(contents);
    }
    res
}

/// Maps a request path onto the file system, refusing anything that would
/// leave `root`.
fn resolve(root: &Path, path: &str) -> Option<PathBuf> {
    let mut file = root.to_path_buf();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => file.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(file)
}

/// Reads `file`, or the index of a directory, returning the path actually read.
async fn read(file: &Path) -> io::Result<(PathBuf, Vec<u8>)> {
    let file = if tokio::fs::metadata(file).await?.is_dir() {
        file.join(INDEX)
    } else {
        file.to_path_buf()
    };
    let contents = tokio::fs::read(&file).await?;
    Ok((file, contents))
}

fn not_found() -> Response<Bytes> {
    text(StatusCode::NOT_FOUND, "404 page not found")
}

fn content_type(file: &Path) -> HeaderValue {
    let mime = mime_guess::from_path(file).first_or_octet_stream();
    let value = if mime.type_() == mime::TEXT && mime.get_param(mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    };
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>bench</h1>").unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js").join("app.js"), "run()").unwrap();
        dir
    }

    #[test]
    fn resolve_rejects_parent_components() {
        let root = Path::new("/srv");
        assert_eq!(resolve(root, "/a/b.css"), Some(PathBuf::from("/srv/a/b.css")));
        assert_eq!(resolve(root, "/./a"), Some(PathBuf::from("/srv/a")));
        assert_eq!(resolve(root, "/"), Some(PathBuf::from("/srv")));
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/a/../../b"), None);
    }

    #[tokio::test]
    async fn serves_files_and_indexes() {
        let dir = root();

        let res = serve(dir.path(), &Method::GET, "/").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(&res.body()[..], b"<h1>bench</h1>");

        let res = serve(dir.path(), &Method::GET, "/js/app.js").await;
        assert!(res.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .contains("javascript"));
        assert_eq!(res.headers()[CONTENT_LENGTH], "5");
        assert_eq!(&res.body()[..], b"run()");
    }

    #[test]
    fn content_types_cover_page_assets() {
        let ty = |name: &str| content_type(Path::new(name));
        assert_eq!(ty("a.html"), "text/html; charset=utf-8");
        assert_eq!(ty("a.css"), "text/css; charset=utf-8");
        assert_eq!(ty("a.webp"), "image/webp");
        assert_eq!(ty("a.woff2"), "font/woff2");
        assert_eq!(ty("a.mp4"), "video/mp4");
        assert_eq!(ty("a.png"), "image/png");
        assert_eq!(ty("a.unknownext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn head_has_length_but_no_body() {
        let dir = root();
        let res = serve(dir.path(), &Method::HEAD, "/index.html").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_LENGTH], "14");
        assert!(res.body().is_empty());
    }

    #[tokio::test]
    async fn missing_and_escaping_paths_are_not_found() {
        let dir = root();
        assert_eq!(
            serve(dir.path(), &Method::GET, "/nope.css").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            serve(dir.path(), &Method::GET, "/js").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            serve(dir.path(), &Method::GET, "/../secret").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn other_methods_are_refused() {
        let dir = root();
        let res = serve(dir.path(), &Method::POST, "/").await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, HEAD");
    }
}
