use std::path::{Component, Path};

pub struct BucketPath;

impl BucketPath {
    /// Standardize directory separators to forward slashes.
    /// This is the form used for relative paths and object keys.
    pub fn normalize(path: &str) -> String {
        path.replace('\\', "/")
    }

    /// Keys ending in the separator are folder placeholders, not content.
    pub fn is_placeholder(key: &str) -> bool {
        key.ends_with('/')
    }

    /// Join key segments, dropping empty and `.` segments and duplicate slashes.
    pub fn join_key<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
        let mut parts = Vec::new();
        for seg in segments {
            let seg = Self::normalize(seg);
            parts.extend(
                seg.split('/')
                    .filter(|p| !p.is_empty() && *p != ".")
                    .map(|p| p.to_string()),
            );
        }
        parts.join("/")
    }

    /// Prefix used for listing a "directory" of keys: empty stays empty,
    /// anything else gets exactly one trailing slash.
    pub fn listing_prefix(prefix: &str) -> String {
        let joined = Self::join_key([prefix]);
        if joined.is_empty() {
            joined
        } else {
            format!("{joined}/")
        }
    }

    /// Strip a listing prefix from a key, returning the remainder.
    pub fn strip_prefix<'a>(key: &'a str, listing_prefix: &str) -> Option<&'a str> {
        key.strip_prefix(listing_prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|rest| !rest.is_empty())
    }

    /// Last non-empty segment of a prefix or directory path.
    pub fn base_name(path: &str) -> Option<String> {
        Self::normalize(path)
            .split('/')
            .filter(|s| !s.is_empty())
            .next_back()
            .map(|s| s.to_string())
    }

    /// Reject relative paths that could escape a root once joined onto it.
    pub fn verify_safe(rel_path: &str) -> bool {
        let normalized = Self::normalize(rel_path);
        if normalized.is_empty() || normalized.starts_with('/') {
            return false;
        }
        // Drive letters on any platform
        if normalized.len() > 1 && normalized.as_bytes()[1] == b':' {
            return false;
        }
        let p = Path::new(&normalized);
        !p.is_absolute()
            && p.components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }
}

#[cfg(test)]
mod tests {
    use super::BucketPath;

    #[test]
    fn join_key_drops_empty_segments() {
        assert_eq!(BucketPath::join_key(["", "data", "b/c.txt"]), "data/b/c.txt");
        assert_eq!(BucketPath::join_key(["/backup/", "//2024", "a.txt"]), "backup/2024/a.txt");
        assert_eq!(BucketPath::join_key(["", "a.txt"]), "a.txt");
    }

    #[test]
    fn join_key_drops_current_dir_segments() {
        assert_eq!(BucketPath::join_key(["./a.bin"]), "a.bin");
        assert_eq!(BucketPath::join_key(["x", "./sub/./b.bin"]), "x/sub/b.bin");
        assert_eq!(BucketPath::join_key(["."]), "");
    }

    #[test]
    fn join_key_normalizes_backslashes() {
        assert_eq!(BucketPath::join_key(["pre", "dir\\file.bin"]), "pre/dir/file.bin");
    }

    #[test]
    fn listing_prefix_has_single_trailing_slash() {
        assert_eq!(BucketPath::listing_prefix(""), "");
        assert_eq!(BucketPath::listing_prefix("x"), "x/");
        assert_eq!(BucketPath::listing_prefix("x/"), "x/");
        assert_eq!(BucketPath::listing_prefix("/a//b/"), "a/b/");
    }

    #[test]
    fn strip_prefix_returns_remainder() {
        assert_eq!(BucketPath::strip_prefix("x/1.bin", "x/"), Some("1.bin"));
        assert_eq!(BucketPath::strip_prefix("x/sub/2.bin", "x/"), Some("sub/2.bin"));
        assert_eq!(BucketPath::strip_prefix("plain.txt", ""), Some("plain.txt"));
        assert_eq!(BucketPath::strip_prefix("x/", "x/"), None);
        assert_eq!(BucketPath::strip_prefix("y/1.bin", "x/"), None);
    }

    #[test]
    fn base_name_takes_last_segment() {
        assert_eq!(BucketPath::base_name("1981"), Some("1981".to_string()));
        assert_eq!(BucketPath::base_name("data/1981/"), Some("1981".to_string()));
        assert_eq!(BucketPath::base_name(""), None);
    }

    #[test]
    fn verify_safe_rejects_traversal() {
        assert!(BucketPath::verify_safe("a/b.txt"));
        assert!(BucketPath::verify_safe("./a.txt"));
        assert!(!BucketPath::verify_safe("../a.txt"));
        assert!(!BucketPath::verify_safe("a/../../b"));
        assert!(!BucketPath::verify_safe("/etc/passwd"));
        assert!(!BucketPath::verify_safe("C:/evil"));
        assert!(!BucketPath::verify_safe(""));
    }
}
