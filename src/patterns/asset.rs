use std::sync::OnceLock;

use regex::Regex;

use crate::models::AssetMatch;

/// Path segment that marks a URL as already routed through the image CDN.
pub const CDN_MARKER: &str = "/cdn-cgi/image/";

const DATA_URI_MARKER: &str = "base64";

fn asset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?P<prefix>(?i:https?:)?//[^/\s'"(),]+)?(?P<path>/wp-content/(?:uploads|plugins|themes)/[^\s'"(),?#]*\.(?i:jpe?g|gif|png|webp|svg))(?P<suffix>[?#][^\s'"(),]*)?"#,
        )
        .expect("invalid asset regex")
    })
}

/// Values carrying inline data or an existing CDN directive are never rewritten.
pub fn is_excluded(value: &str) -> bool {
    value.contains(DATA_URI_MARKER) || value.contains(CDN_MARKER)
}

/// Find the first asset reference in `value`.
pub fn match_asset(value: &str) -> Option<AssetMatch<'_>> {
    match_assets(value).into_iter().next()
}

/// Find every asset reference in `value`, in order of appearance.
///
/// Returns nothing when the value is excluded. A path has to end where the URL token ends, so
/// `photo.png-large` is not mistaken for `photo.png`.
pub fn match_assets(value: &str) -> Vec<AssetMatch<'_>> {
    if is_excluded(value) {
        return Vec::new();
    }

    asset_pattern()
        .captures_iter(value)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let path = caps.name("path")?;
            if !ends_at_boundary(value, path.end()) {
                return None;
            }
            Some(AssetMatch {
                prefix: caps.name("prefix").map_or("", |m| m.as_str()),
                asset_path: path.as_str(),
                suffix: caps.name("suffix").map_or("", |m| m.as_str()),
                span: whole.range(),
            })
        })
        .collect()
}

fn ends_at_boundary(value: &str, end: usize) -> bool {
    match value[end..].chars().next() {
        None => true,
        Some(next) => {
            next.is_whitespace() || matches!(next, '?' | '#' | '\'' | '"' | ')' | '(' | ',')
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_absolute_urls_into_prefix_path_and_suffix() {
        let found = match_asset("https://example.com/wp-content/uploads/2023/01/cat.jpg?ver=2")
            .unwrap();
        assert_eq!(found.prefix, "https://example.com");
        assert_eq!(found.asset_path, "/wp-content/uploads/2023/01/cat.jpg");
        assert_eq!(found.suffix, "?ver=2");
    }

    #[test]
    fn accepts_protocol_relative_and_root_relative_references() {
        let relative = match_asset("//cdn.example.com/wp-content/themes/t/logo.svg").unwrap();
        assert_eq!(relative.prefix, "//cdn.example.com");

        let rooted = match_asset("/wp-content/plugins/slider/bg.webp").unwrap();
        assert_eq!(rooted.prefix, "");
        assert_eq!(rooted.asset_path, "/wp-content/plugins/slider/bg.webp");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(match_asset("/wp-content/uploads/PHOTO.JPG").is_some());
        assert!(match_asset("/wp-content/uploads/photo.Jpeg").is_some());
    }

    #[test]
    fn ignores_paths_outside_the_content_root() {
        assert!(match_asset("https://example.com/images/cat.jpg").is_none());
        assert!(match_asset("/wp-content/cache/cat.jpg").is_none());
        assert!(match_asset("/wp-content/uploads/document.pdf").is_none());
    }

    #[test]
    fn requires_the_extension_to_end_the_token() {
        assert!(match_asset("/wp-content/uploads/photo.png-large").is_none());
        assert!(match_asset("/wp-content/uploads/photo.png#frag").is_some());
    }

    #[test]
    fn never_matches_excluded_values() {
        assert!(match_asset("data:image/png;base64,/wp-content/uploads/a.png").is_none());
        assert!(match_asset("/cdn-cgi/image/quality=90/wp-content/uploads/a.png").is_none());
    }

    #[test]
    fn finds_every_occurrence_in_order() {
        let value = "/wp-content/uploads/a.png 1x, /wp-content/uploads/b.png 2x";
        let paths: Vec<&str> = match_assets(value).iter().map(|m| m.asset_path).collect();
        assert_eq!(paths, vec!["/wp-content/uploads/a.png", "/wp-content/uploads/b.png"]);
    }
}
