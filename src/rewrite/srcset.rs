use std::borrow::Cow;

use super::AssetRewriter;
use crate::directive::Directive;
use crate::models::Geometry;
use crate::patterns::{
  Candidate, match_asset, match_descriptor_width, match_filename_geometry,
  match_responsive_list, strip_filename_geometry,
};

impl AssetRewriter<'_> {
  /// Rewrite a responsive candidate list, one candidate at a time.
  ///
  /// Geometry per candidate comes from the filename (`-WxH`, suffix stripped, `fit` applies),
  /// then from a `NNNw` descriptor (width only), then nothing. Candidates that are not a URL
  /// plus a single descriptor are kept verbatim, as are data URIs and candidates that already
  /// carry a directive. The list is rejoined with `", "`.
  pub fn srcset<'v>(&self, value: &'v str) -> Cow<'v, str> {
    let candidates = match_responsive_list(value);
    let parts: Vec<Cow<'v, str>> = candidates
      .iter()
      .map(|candidate| self.candidate(value, candidate))
      .collect();

    if parts.iter().all(|part| matches!(part, Cow::Borrowed(_))) {
      return Cow::Borrowed(value);
    }
    Cow::Owned(parts.join(", "))
  }

  fn candidate<'v>(&self, list: &'v str, candidate: &Candidate<'v>) -> Cow<'v, str> {
    let raw = &list[candidate.span.clone()];
    if !candidate.is_well_formed() {
      return Cow::Borrowed(raw);
    }
    let Some(asset) = match_asset(candidate.url) else {
      return Cow::Borrowed(raw);
    };

    let (geometry, path) = match match_filename_geometry(asset.asset_path) {
      Some(geometry) => (Some(geometry), strip_filename_geometry(asset.asset_path)),
      None => (
        match_descriptor_width(candidate.descriptor).and_then(Geometry::width),
        Cow::Borrowed(asset.asset_path),
      ),
    };

    let segment = Directive::build(self.config, geometry).segment();
    Cow::Owned(format!(
      "{}{}{}{}{}{} {}",
      &candidate.url[..asset.span.start],
      asset.prefix,
      segment,
      path,
      asset.suffix,
      &candidate.url[asset.span.end..],
      candidate.descriptor
    ))
  }
}
