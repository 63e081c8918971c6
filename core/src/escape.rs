//! Path escaping for resource names and publish prefixes.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything but the RFC 3986 unreserved set is encoded, `/` and `:`
/// included, so a value always stays a single path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one path segment.
pub fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

/// Percent-encode a relative path, keeping its `/` separators.
pub fn path(raw: &str) -> String {
    raw.split('/')
        .filter(|part| !part.is_empty())
        .map(segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Fold a publish prefix (`[storage:]prefix/path`) into the single-segment
/// form the publish API expects in its URLs.
///
/// `"."` becomes `":."`. A prefix containing `/` has its underscores doubled
/// and then every `/` replaced by `_`. Anything else is taken as already
/// escaped and returned unchanged.
pub fn escape_prefix(prefix: &str) -> String {
    if prefix == "." {
        return ":.".to_string();
    }
    if prefix.contains('/') {
        return prefix.replace('_', "__").replace('/', "_");
    }
    prefix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_prefixes() {
        assert_eq!(escape_prefix("a/b"), "a_b");
        assert_eq!(escape_prefix("a_b/c"), "a__b_c");
        assert_eq!(escape_prefix("."), ":.");
        assert_eq!(escape_prefix("s3:aptly-repo:test/xyz_1"), "s3:aptly-repo:test_xyz__1");
    }

    #[test]
    fn prefix_without_slash_is_unchanged() {
        assert_eq!(escape_prefix("nightly"), "nightly");
        assert_eq!(escape_prefix("already_escaped"), "already_escaped");
    }

    #[test]
    fn segment_encodes_reserved_characters() {
        assert_eq!(
            segment("Pamd64 authserver 0.1.14~dev0-1 1cc572a93625a9c9"),
            "Pamd64%20authserver%200.1.14~dev0-1%201cc572a93625a9c9"
        );
        assert_eq!(
            segment(&escape_prefix("s3:aptly-repo:test/xyz_1")),
            "s3%3Aaptly-repo%3Atest_xyz__1"
        );
        assert_eq!(segment("a/b"), "a%2Fb");
    }

    #[test]
    fn path_keeps_separators() {
        assert_eq!(path("dir/sub dir/pkg.deb"), "dir/sub%20dir/pkg.deb");
        assert_eq!(path("/dir/"), "dir");
    }
}
