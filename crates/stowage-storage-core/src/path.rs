//! Virtual path splitting.
//!
//! Both the router and the remote library backend address their children by
//! the first component of a slash-delimited path and hand the rest down.

/// Split a path into its first non-empty component and the remainder.
///
/// The remainder keeps its leading slash and defaults to `"/"`:
/// `"/docs/reports/q1.csv"` → `("docs", "/reports/q1.csv")`,
/// `"/docs"` → `("docs", "/")`, `"/"` → `("", "/")`.
pub fn split_segment(path: &str) -> (&str, &str) {
    let trimmed = path.trim_matches('/');
    match trimmed.find('/') {
        Some(i) => (&trimmed[..i], &trimmed[i..]),
        None => (trimmed, "/"),
    }
}

/// Like [`split_segment`], but the remainder is empty when absent:
/// `"/library"` → `("library", "")`.
pub fn split_leading(path: &str) -> (&str, &str) {
    let trimmed = path.trim_matches('/');
    match trimmed.find('/') {
        Some(i) => (&trimmed[..i], &trimmed[i..]),
        None => (trimmed, ""),
    }
}

/// True for the paths that address a namespace root.
pub fn is_root(path: &str) -> bool {
    path.trim_matches('/').is_empty()
}

/// Parent directory of a slash-delimited path, `"/"` at the top.
pub fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &trimmed[..i],
    }
}

/// Last component of a slash-delimited path.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segment() {
        assert_eq!(split_segment("/docs/reports/q1.csv"), ("docs", "/reports/q1.csv"));
        assert_eq!(split_segment("docs/reports/"), ("docs", "/reports"));
        assert_eq!(split_segment("/docs"), ("docs", "/"));
        assert_eq!(split_segment("/docs/"), ("docs", "/"));
        assert_eq!(split_segment("/"), ("", "/"));
        assert_eq!(split_segment(""), ("", "/"));
    }

    #[test]
    fn test_split_leading() {
        assert_eq!(split_leading("/lib/dir/file.txt"), ("lib", "/dir/file.txt"));
        assert_eq!(split_leading("/lib"), ("lib", ""));
        assert_eq!(split_leading("lib/"), ("lib", ""));
        assert_eq!(split_leading("/"), ("", ""));
    }

    #[test]
    fn test_is_root() {
        assert!(is_root(""));
        assert!(is_root("/"));
        assert!(is_root("//"));
        assert!(!is_root("/docs"));
    }

    #[test]
    fn test_parent_and_base() {
        assert_eq!(parent_dir("/dir/file.txt"), "/dir");
        assert_eq!(parent_dir("/a/b/c.txt"), "/a/b");
        assert_eq!(parent_dir("/file.txt"), "/");
        assert_eq!(parent_dir("file.txt"), "/");

        assert_eq!(base_name("/dir/file.txt"), "file.txt");
        assert_eq!(base_name("file.txt"), "file.txt");
        assert_eq!(base_name("/dir/sub/"), "sub");
    }
}
