//! Asset rewrite core: applies the pattern library and directive builder to attribute values
//! and text runs.
//!
//! Every operation is total. A value is either rewritten or handed back untouched as
//! `Cow::Borrowed`; nothing here fails, because a broken rewrite must never break a page.

mod buffer;
mod css;
mod srcset;

use std::borrow::Cow;

pub use buffer::{BufferState, TextBuffer};

use crate::directive::Directive;
use crate::models::{AssetMatch, Geometry, Operation, SiteConfig};
use crate::patterns::{match_assets, strip_filename_geometry};

/// Rewrites values for one resolved site configuration.
#[derive(Debug, Clone, Copy)]
pub struct AssetRewriter<'c> {
  config: &'c SiteConfig,
}

impl<'c> AssetRewriter<'c> {
  /// Create a rewriter bound to a site configuration.
  pub fn new(config: &'c SiteConfig) -> Self {
    Self { config }
  }

  /// Rewrite `value` according to a dispatch table operation.
  pub fn apply<'v>(
    &self,
    operation: Operation,
    value: &'v str,
    geometry: Option<Geometry>,
  ) -> Cow<'v, str> {
    match operation {
      Operation::SingleUrl => self.url(value, geometry),
      Operation::PlainUrl => self.url(value, None),
      Operation::ResponsiveList => self.srcset(value),
      Operation::StyleUrls => self.css(value),
      Operation::Background => self.background(value),
    }
  }

  /// Rewrite every asset reference in a single-URL value.
  ///
  /// With explicit geometry the `-WxH` suffix is removed from the filename so the CDN resizes
  /// the original upload rather than an intermediate size.
  pub fn url<'v>(&self, value: &'v str, geometry: Option<Geometry>) -> Cow<'v, str> {
    let assets = match_assets(value);
    if assets.is_empty() {
      return Cow::Borrowed(value);
    }

    let segment = Directive::build(self.config, geometry).segment();
    Cow::Owned(splice(value, &assets, |asset| {
      let path = if geometry.is_some() {
        strip_filename_geometry(asset.asset_path)
      } else {
        Cow::Borrowed(asset.asset_path)
      };
      format!("{}{}{}{}", asset.prefix, segment, path, asset.suffix)
    }))
  }

  /// Rewrite a background value: CSS `url()` calls when present, otherwise a bare URL.
  pub fn background<'v>(&self, value: &'v str) -> Cow<'v, str> {
    if value.to_ascii_lowercase().contains("url(") {
      self.css(value)
    } else {
      self.url(value, None)
    }
  }
}

fn splice(value: &str, assets: &[AssetMatch<'_>], render: impl Fn(&AssetMatch<'_>) -> String) -> String {
  let mut output = String::with_capacity(value.len() + 64);
  let mut last = 0;
  for asset in assets {
    output.push_str(&value[last..asset.span.start]);
    output.push_str(&render(asset));
    last = asset.span.end;
  }
  output.push_str(&value[last..]);
  output
}
