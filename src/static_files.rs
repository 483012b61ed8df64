use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Serves files from one directory, refusing paths that escape it.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URL path (already percent-decoded) below the base directory.
    /// `..`, absolute components and prefixes are rejected.
    pub fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Resolve and read a file. Missing files and rejected paths are `NotFound`.
    pub fn load(&self, url_path: &str) -> io::Result<(PathBuf, Vec<u8>)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((path, bytes))
    }
}

fn content_type(ext: &str) -> Option<&'static str> {
    let ct = match ext {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "md" => "text/markdown",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => return None,
    };
    Some(ct)
}

fn content_encoding(ext: &str) -> Option<&'static str> {
    match ext {
        "gz" => Some("gzip"),
        "bz2" => Some("bzip2"),
        "xz" => Some("xz"),
        "br" => Some("br"),
        "z" => Some("compress"),
        _ => None,
    }
}

/// Guess `(content type, content encoding)` from a file name.
///
/// A trailing compression suffix yields the encoding and the type comes from
/// the suffix before it (`a.tar.gz` is `application/x-tar` + `gzip`).
/// Unknown types fall back to `application/octet-stream`.
pub fn guess_type(path: &Path) -> (&'static str, Option<&'static str>) {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    // The stem is never an extension: "gz" alone is a file name.
    let exts: Vec<&str> = name.split('.').skip(1).collect();
    let (ext, encoding) = match exts.split_last() {
        None => (None, None),
        Some((last, rest)) => match content_encoding(last) {
            Some(enc) => (rest.last().copied(), Some(enc)),
            None => (Some(*last), None),
        },
    };
    let ct = ext
        .and_then(content_type)
        .unwrap_or("application/octet-stream");
    (ct, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_path_prevents_traversal() {
        let sf = StaticFiles::new("tests/staticdata");
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("a/../../Cargo.toml").is_none());
        assert_eq!(
            sf.map_path("/css/./site.css"),
            Some(PathBuf::from("tests/staticdata/css/site.css"))
        );
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let sf = StaticFiles::new(dir.path());
        let err = sf.load("nope.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_load_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), "Hello\n").unwrap();
        let sf = StaticFiles::new(dir.path());
        let (path, bytes) = sf.load("/hello.txt").unwrap();
        assert_eq!(path, dir.path().join("hello.txt"));
        assert_eq!(bytes, b"Hello\n");
    }

    #[test]
    fn test_guess_type() {
        assert_eq!(guess_type(Path::new("a/index.HTML")), ("text/html", None));
        assert_eq!(
            guess_type(Path::new("dump.tar.gz")),
            ("application/x-tar", Some("gzip"))
        );
        assert_eq!(
            guess_type(Path::new("data.gz")),
            ("application/octet-stream", Some("gzip"))
        );
        assert_eq!(guess_type(Path::new("README")), ("application/octet-stream", None));
    }
}
