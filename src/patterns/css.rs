use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::asset::match_asset;
use crate::models::AssetMatch;

fn css_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i:url)\(\s*(?:"(?P<double>[^"]*)"|'(?P<single>[^']*)'|(?P<bare>[^'"()\s]*))\s*\)"#,
        )
        .expect("invalid css url regex")
    })
}

/// A `url()` call found in CSS text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssUrl<'a> {
    /// Byte range of the whole `url(...)` call.
    pub span: Range<usize>,
    /// Byte range of the text between the quotes (or parentheses).
    pub target: Range<usize>,
    /// Asset reference inside the target; spans are relative to the target text.
    pub asset: Option<AssetMatch<'a>>,
}

/// Find every `url()` call in `text`, in order.
///
/// Exclusions apply per call: a data URI or an already rewritten URL only disables its own
/// `url()`, never the rest of the stylesheet.
pub fn match_css_urls(text: &str) -> Vec<CssUrl<'_>> {
    css_url_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let target = caps
                .name("double")
                .or_else(|| caps.name("single"))
                .or_else(|| caps.name("bare"))?;
            Some(CssUrl {
                span: whole.range(),
                target: target.range(),
                asset: match_asset(target.as_str()),
            })
        })
        .collect()
}
