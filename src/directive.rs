//! Canonical transformation directives injected ahead of asset paths.

use std::fmt;

use crate::models::{Geometry, SiteConfig};
use crate::patterns::CDN_MARKER;

/// Tokens every directive ends with.
pub const DIRECTIVE_TRAILER: &str = "format=auto,onerror=redirect";

/// Ordered `key=value` options understood by the image CDN.
///
/// Field order is fixed: geometry, quality, gravity, sharpen, metadata, then the trailer.
/// Options absent from the site configuration contribute nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
  tokens: Vec<(&'static str, String)>,
}

impl Directive {
  /// Build the directive for a site and an optional geometry.
  pub fn build(config: &SiteConfig, geometry: Option<Geometry>) -> Self {
    let mut tokens = Vec::new();

    if let Some(geometry) = geometry {
      tokens.push(("width", geometry.width.to_string()));
      if let Some(height) = geometry.height {
        tokens.push(("height", height.to_string()));
        if let Some(fit) = config.fit {
          tokens.push(("fit", fit.to_string()));
        }
      }
    }
    if let Some(quality) = config.quality {
      tokens.push(("quality", quality.to_string()));
    }
    if let Some(gravity) = &config.gravity {
      tokens.push(("gravity", gravity.clone()));
    }
    if let Some(sharpen) = config.sharpen {
      tokens.push(("sharpen", sharpen.to_string()));
    }
    if let Some(metadata) = config.metadata {
      tokens.push(("metadata", metadata.to_string()));
    }

    Self { tokens }
  }

  /// Path segment to insert between a URL prefix and the asset path.
  pub fn segment(&self) -> String {
    format!("{CDN_MARKER}{self}")
  }
}

impl fmt::Display for Directive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.tokens {
      write!(f, "{key}={value},")?;
    }
    f.write_str(DIRECTIVE_TRAILER)
  }
}
