use std::path::{ Path, PathBuf };

use crate::mapper::{ PathMapper, WebtreeMapper };

fn map(url: &str) -> Option<PathBuf> {
    WebtreeMapper.map(Path::new("/srv/web_root"), url)
}

#[test]
fn maps_paths_one_to_one() {
    assert_eq!(map("/index.html"), Some(PathBuf::from("/srv/web_root/index.html")));
    assert_eq!(map("/publisher/example.com/file/1/abc"), Some(PathBuf::from("/srv/web_root/publisher/example.com/file/1/abc")));
    assert_eq!(map("/"), Some(PathBuf::from("/srv/web_root")));
}

#[test]
fn percent_decodes_segments() {
    assert_eq!(map("/my%20file.txt"), Some(PathBuf::from("/srv/web_root/my file.txt")));
    assert_eq!(map("/pkg%40version"), Some(PathBuf::from("/srv/web_root/pkg@version")));
}

#[test]
fn skips_empty_and_current_segments() {
    assert_eq!(map("//a/./b//"), Some(PathBuf::from("/srv/web_root/a/b")));
}

#[test]
fn rejects_parent_segments() {
    assert_eq!(map("/../etc/passwd"), None);
    assert_eq!(map("/a/../../etc/passwd"), None);
    assert_eq!(map("/%2e%2e/%2e%2e/etc/passwd"), None);
}

#[test]
fn rejects_backslash_and_nul() {
    assert_eq!(map("/a%5c..%5cb"), None);
    assert_eq!(map("/a%00b"), None);
}

#[test]
fn rejects_invalid_utf8() {
    assert_eq!(map("/%ff%fe"), None);
}

#[test]
fn closures_are_mappers() {
    let alias = |root: &Path, url: &str| (url == "/latest").then(|| root.join("v2/catalog"));
    assert_eq!(alias.map(Path::new("/r"), "/latest"), Some(PathBuf::from("/r/v2/catalog")));
    assert_eq!(alias.map(Path::new("/r"), "/other"), None);
}
