//! Data structures shared by the pattern library, the directive builder and the rewrite core.

use std::fmt;
use std::ops::Range;

use serde::Deserialize;

/// Resize behaviour requested from the CDN when both dimensions are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fit {
  /// Shrink to fit, never enlarge.
  ScaleDown,
  /// Fit inside the box, preserving aspect ratio.
  Contain,
  /// Fill the box, cropping if needed.
  Cover,
  /// Crop to the exact box.
  Crop,
  /// Fit inside the box and pad the remainder.
  Pad,
}

impl Fit {
  /// Token used in the directive string.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ScaleDown => "scale-down",
      Self::Contain => "contain",
      Self::Cover => "cover",
      Self::Crop => "crop",
      Self::Pad => "pad",
    }
  }
}

impl fmt::Display for Fit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which image metadata the CDN should preserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metadata {
  /// Keep all metadata.
  Keep,
  /// Keep only copyright information.
  Copyright,
  /// Strip all metadata.
  None,
}

impl Metadata {
  /// Token used in the directive string.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Keep => "keep",
      Self::Copyright => "copyright",
      Self::None => "none",
    }
  }
}

impl fmt::Display for Metadata {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-site rewrite settings.
///
/// Every optional field is emitted into the directive only when present. Records are
/// deserialised with `#[serde(default)]`, so an omitted key takes the built-in default while
/// an explicit `null` suppresses the option for that site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
  /// Host this record applies to; `None` marks the default record.
  pub domain: Option<String>,
  /// Rewrite `<link rel="icon">` style tags.
  #[serde(alias = "REWRITE_LINK_TAGS")]
  pub rewrite_link_tags: bool,
  /// Rewrite the text of inline `<style>` elements (and stylesheet documents).
  #[serde(alias = "REWRITE_STYLE_TAGS")]
  pub rewrite_style_tags: bool,
  /// Rewrite `<img>` sources and responsive candidate lists.
  #[serde(alias = "REWRITE_IMAGE_TAGS")]
  pub rewrite_image_tags: bool,
  /// Rewrite `<a href>` targets pointing at images.
  #[serde(alias = "REWRITE_HREF_TAGS")]
  pub rewrite_href_tags: bool,
  /// Rewrite background images declared on `<div>` elements.
  #[serde(alias = "REWRITE_DIV_TAGS")]
  pub rewrite_div_tags: bool,
  /// Remove empty decorative `<svg>` elements.
  #[serde(alias = "REWRITE_SVG_TAGS")]
  pub rewrite_svg_tags: bool,
  /// Add `loading="lazy"` to images that do not declare a loading strategy.
  pub lazy_load: bool,
  /// Output quality, 1 to 100.
  pub quality: Option<u8>,
  /// Resize behaviour used alongside explicit dimensions.
  pub fit: Option<Fit>,
  /// Focal point token, for example `auto`.
  pub gravity: Option<String>,
  /// Sharpen strength, 0 to 10.
  pub sharpen: Option<f32>,
  /// Metadata preservation policy.
  pub metadata: Option<Metadata>,
}

impl Default for SiteConfig {
  fn default() -> Self {
    Self {
      domain: None,
      rewrite_link_tags: true,
      rewrite_style_tags: true,
      rewrite_image_tags: true,
      rewrite_href_tags: true,
      rewrite_div_tags: true,
      rewrite_svg_tags: true,
      lazy_load: true,
      quality: Some(90),
      fit: None,
      gravity: None,
      sharpen: None,
      metadata: None,
    }
  }
}

impl SiteConfig {
  /// Whether rewriting is enabled for the given tag category.
  pub fn rewrites(&self, kind: TagKind) -> bool {
    match kind {
      TagKind::Img => self.rewrite_image_tags,
      TagKind::Anchor => self.rewrite_href_tags,
      TagKind::Div => self.rewrite_div_tags,
      TagKind::Link => self.rewrite_link_tags,
      TagKind::Svg => self.rewrite_svg_tags,
      TagKind::Style => self.rewrite_style_tags,
    }
  }
}

/// Tag categories the dispatch policy knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
  /// `<img>`
  Img,
  /// `<a>`
  Anchor,
  /// `<div>`
  Div,
  /// `<link>`
  Link,
  /// `<svg>`
  Svg,
  /// `<style>` (text content)
  Style,
}

impl TagKind {
  /// Every category whose handler runs on element start tags.
  pub const ELEMENTS: [TagKind; 5] = [
    TagKind::Img,
    TagKind::Anchor,
    TagKind::Div,
    TagKind::Link,
    TagKind::Svg,
  ];

  /// Lower-case tag name, also usable as a CSS selector.
  pub fn tag_name(self) -> &'static str {
    match self {
      Self::Img => "img",
      Self::Anchor => "a",
      Self::Div => "div",
      Self::Link => "link",
      Self::Svg => "svg",
      Self::Style => "style",
    }
  }
}

/// Dimensions associated with an image reference.
///
/// Width-only geometry comes from `NNNw` descriptors; both dimensions come from element
/// attributes, icon `sizes`, or a `-WxH` filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
  /// Target width in pixels.
  pub width: u32,
  /// Target height in pixels, when known.
  pub height: Option<u32>,
}

impl Geometry {
  /// Geometry with both dimensions. Zero dimensions are rejected.
  pub fn sized(width: u32, height: u32) -> Option<Self> {
    (width > 0 && height > 0).then_some(Self {
      width,
      height: Some(height),
    })
  }

  /// Width-only geometry. A zero width is rejected.
  pub fn width(width: u32) -> Option<Self> {
    (width > 0).then_some(Self {
      width,
      height: None,
    })
  }

  /// Parse a pair of attribute values such as `width="300" height="200"`.
  pub fn from_attributes(width: Option<&str>, height: Option<&str>) -> Option<Self> {
    let width = width?.trim().parse().ok()?;
    let height = height?.trim().parse().ok()?;
    Self::sized(width, height)
  }
}

/// An asset reference found inside a larger string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMatch<'a> {
  /// Scheme and host (`https://example.com`, `//example.com`) or empty.
  pub prefix: &'a str,
  /// Path under the content root, ending in a recognised image extension.
  pub asset_path: &'a str,
  /// Query string or fragment following the path.
  pub suffix: &'a str,
  /// Byte range of the whole match within the searched string.
  pub span: Range<usize>,
}

/// How a rewrite target's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  /// A single URL; explicit element geometry applies.
  SingleUrl,
  /// A single URL that never carries geometry.
  PlainUrl,
  /// A responsive candidate list (`srcset`).
  ResponsiveList,
  /// Inline CSS declarations containing `url()` calls.
  StyleUrls,
  /// Either CSS containing `url()` calls or a bare URL.
  Background,
}

/// An attribute the dispatch table rewrites for a tag category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteTarget {
  /// Attribute name.
  pub attribute: &'static str,
  /// How its value is rewritten.
  pub operation: Operation,
}
