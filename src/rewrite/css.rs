use std::borrow::Cow;

use url::Url;

use super::AssetRewriter;
use crate::directive::Directive;
use crate::patterns::{CssUrl, is_excluded, match_asset, match_css_urls};

impl AssetRewriter<'_> {
  /// Rewrite asset references inside CSS `url()` calls.
  ///
  /// Only the asset reference inside each call changes; quotes, whitespace and everything
  /// outside the calls are copied through byte for byte. No geometry is applied.
  pub fn css<'v>(&self, text: &'v str) -> Cow<'v, str> {
    self.stylesheet(text, None)
  }

  /// Rewrite a stylesheet, resolving relative `url()` targets against `base`.
  ///
  /// Relative references such as `url(images/cat.jpg)` in a theme stylesheet are rewritten to a
  /// root-relative CDN URL when they resolve under the asset root.
  pub fn stylesheet<'v>(&self, text: &'v str, base: Option<&Url>) -> Cow<'v, str> {
    let urls = match_css_urls(text);
    let mut segment = None;
    let mut output = String::new();
    let mut last = 0;

    for url in &urls {
      let Some((start, end, replacement)) = self.css_replacement(text, url, base, &mut segment)
      else {
        continue;
      };
      output.push_str(&text[last..start]);
      output.push_str(&replacement);
      last = end;
    }

    if last == 0 {
      return Cow::Borrowed(text);
    }
    output.push_str(&text[last..]);
    Cow::Owned(output)
  }

  fn css_replacement(
    &self,
    text: &str,
    url: &CssUrl<'_>,
    base: Option<&Url>,
    segment: &mut Option<String>,
  ) -> Option<(usize, usize, String)> {
    let segment = segment
      .get_or_insert_with(|| Directive::build(self.config, None).segment())
      .as_str();

    if let Some(asset) = &url.asset {
      let replacement = format!(
        "{}{}{}{}",
        asset.prefix, segment, asset.asset_path, asset.suffix
      );
      return Some((
        url.target.start + asset.span.start,
        url.target.start + asset.span.end,
        replacement,
      ));
    }

    let target = &text[url.target.clone()];
    let resolved = resolve_relative(target, base?)?;
    Some((
      url.target.start,
      url.target.end,
      format!("{segment}{resolved}"),
    ))
  }
}

/// Resolve a relative reference and return its path (plus query and fragment) when the result
/// is an asset under the content root.
fn resolve_relative(target: &str, base: &Url) -> Option<String> {
  if target.is_empty()
    || target.starts_with('/')
    || target.starts_with('#')
    || target.contains(':')
    || is_excluded(target)
  {
    return None;
  }

  let resolved = base.join(target).ok()?;
  let path = resolved.path();
  let asset = match_asset(path)?;
  if asset.span != (0..path.len()) {
    return None;
  }

  let mut output = path.to_string();
  if let Some(query) = resolved.query() {
    output.push('?');
    output.push_str(query);
  }
  if let Some(fragment) = resolved.fragment() {
    output.push('#');
    output.push_str(fragment);
  }
  Some(output)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::SiteConfig;

  const DIRECTIVE: &str = "/cdn-cgi/image/quality=90,format=auto,onerror=redirect";

  #[test]
  fn rewrites_inside_quotes_and_preserves_the_rest() {
    let config = SiteConfig::default();
    let css = ".bg{background:url('/wp-content/themes/t/bg.png')} .x{color:red}";

    assert_eq!(
      AssetRewriter::new(&config).css(css),
      format!(".bg{{background:url('{DIRECTIVE}/wp-content/themes/t/bg.png')}} .x{{color:red}}")
    );
  }

  #[test]
  fn keeps_each_quote_style_and_padding() {
    let config = SiteConfig::default();
    let css = r#"a{b:url( "https://ex.com/wp-content/uploads/a.jpg" )}c{d:url(//ex.com/wp-content/uploads/c.gif)}"#;

    assert_eq!(
      AssetRewriter::new(&config).css(css),
      format!(
        r#"a{{b:url( "https://ex.com{DIRECTIVE}/wp-content/uploads/a.jpg" )}}c{{d:url(//ex.com{DIRECTIVE}/wp-content/uploads/c.gif)}}"#
      )
    );
  }

  #[test]
  fn rewrites_only_the_eligible_calls() {
    let config = SiteConfig::default();
    let css = "a{background:url(/cdn-cgi/image/q=1/wp-content/uploads/a.png)}\
               b{background:url(data:image/png;base64,AAAA)}\
               c{background:url(/wp-content/uploads/c.png)}";
    let rewritten = AssetRewriter::new(&config).css(css).into_owned();

    assert!(rewritten.starts_with("a{background:url(/cdn-cgi/image/q=1/wp-content/uploads/a.png)}"));
    assert!(rewritten.contains("url(data:image/png;base64,AAAA)"));
    assert!(rewritten.ends_with(&format!("c{{background:url({DIRECTIVE}/wp-content/uploads/c.png)}}")));
    assert_eq!(AssetRewriter::new(&config).css(&rewritten), rewritten);
  }

  #[test]
  fn untouched_css_is_borrowed() {
    let config = SiteConfig::default();
    let css = "body{margin:0;background:url(/img/bg.png)}";
    assert!(matches!(AssetRewriter::new(&config).css(css), Cow::Borrowed(_)));
  }

  #[test]
  fn resolves_relative_references_against_the_stylesheet() {
    let config = SiteConfig::default();
    let base = Url::parse("https://ex.com/wp-content/themes/petsworld/style.css?ver=1").unwrap();
    let css = "a{background:url(images/cat.jpg)} b{background:url('../petsworld/img/dog.png')} c{background:url(fonts/a.woff)}";
    let rewritten = AssetRewriter::new(&config).stylesheet(css, Some(&base));

    assert_eq!(
      rewritten,
      format!(
        "a{{background:url({DIRECTIVE}/wp-content/themes/petsworld/images/cat.jpg)}} b{{background:url('{DIRECTIVE}/wp-content/themes/petsworld/img/dog.png')}} c{{background:url(fonts/a.woff)}}"
      )
    );
  }

  #[test]
  fn relative_references_outside_the_asset_root_are_kept() {
    let config = SiteConfig::default();
    let base = Url::parse("https://ex.com/assets/css/site.css").unwrap();
    let css = "a{background:url(images/cat.jpg)}";
    assert_eq!(AssetRewriter::new(&config).stylesheet(css, Some(&base)), css);
    assert_eq!(AssetRewriter::new(&config).css("a{background:url(images/cat.jpg)}"), css);
  }
}
