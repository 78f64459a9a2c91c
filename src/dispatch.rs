//! Tag dispatch policy: which rewrite operations run for which element, and when an element is
//! removed outright.
//!
//! The policy is written against two small traits so it can be driven by any streaming parser.
//! The `html` module implements them for `lol_html`; the tests below use in-memory fakes.

use std::borrow::Cow;

use crate::models::{Geometry, Operation, RewriteTarget, SiteConfig, TagKind};
use crate::patterns::match_icon_sizes;
use crate::rewrite::{AssetRewriter, TextBuffer};

/// Trait describing the element operations the dispatch policy needs.
pub trait MarkupElement {
  /// Value of an attribute, looked up case-insensitively.
  fn attribute(&self, name: &str) -> Option<String>;

  /// Set an attribute. Returns `false` when the event source refuses the write.
  fn write_attribute(&mut self, name: &str, value: &str) -> bool;

  /// Remove the element together with its content.
  fn remove_element(&mut self);
}

/// Trait describing one piece of a text node delivered by a streaming parser.
pub trait TextChunkEvent {
  /// Text carried by this chunk.
  fn text(&self) -> &str;

  /// Returns `true` for the final chunk of the text node.
  fn is_last(&self) -> bool;

  /// Replace this chunk with literal text, emitted without escaping.
  fn replace_with_text(&mut self, text: &str);

  /// Drop this chunk from the output.
  fn suppress(&mut self);
}

/// `rel` values that mark a `<link>` as a site icon.
pub const ICON_RELATIONS: [&str; 4] = [
  "icon",
  "shortcut icon",
  "apple-touch-icon",
  "apple-touch-icon-precomposed",
];

/// Inline style of the off-screen sprite placeholders that are safe to drop.
pub const HIDDEN_SVG_STYLE: &str =
  "visibility: hidden; position: absolute; left: -9999px; overflow: hidden;";

const IMG_TARGETS: &[RewriteTarget] = &[
  RewriteTarget { attribute: "src", operation: Operation::SingleUrl },
  RewriteTarget { attribute: "srcset", operation: Operation::ResponsiveList },
  RewriteTarget { attribute: "data-src", operation: Operation::SingleUrl },
  RewriteTarget { attribute: "data-srcset", operation: Operation::ResponsiveList },
  RewriteTarget { attribute: "data-lazyload", operation: Operation::SingleUrl },
  RewriteTarget { attribute: "data-lazy-src", operation: Operation::SingleUrl },
  RewriteTarget { attribute: "data-lazy-srcset", operation: Operation::ResponsiveList },
];

const ANCHOR_TARGETS: &[RewriteTarget] = &[RewriteTarget {
  attribute: "href",
  operation: Operation::PlainUrl,
}];

const DIV_TARGETS: &[RewriteTarget] = &[
  RewriteTarget { attribute: "style", operation: Operation::StyleUrls },
  RewriteTarget { attribute: "data-ultimate-bg", operation: Operation::Background },
  RewriteTarget { attribute: "data-image-id", operation: Operation::Background },
];

const LINK_TARGETS: &[RewriteTarget] = &[RewriteTarget {
  attribute: "href",
  operation: Operation::SingleUrl,
}];

/// Attributes rewritten for a tag category, in the order they are processed.
pub fn targets(kind: TagKind) -> &'static [RewriteTarget] {
  match kind {
    TagKind::Img => IMG_TARGETS,
    TagKind::Anchor => ANCHOR_TARGETS,
    TagKind::Div => DIV_TARGETS,
    TagKind::Link => LINK_TARGETS,
    TagKind::Svg | TagKind::Style => &[],
  }
}

/// What the policy did to one element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementOutcome {
  /// Attributes whose value changed.
  pub rewritten: usize,
  /// The element was removed.
  pub removed: bool,
  /// `loading="lazy"` was added.
  pub lazy_loaded: bool,
}

/// Apply the dispatch policy to an element start tag.
pub fn rewrite_element<E: MarkupElement>(
  config: &SiteConfig,
  kind: TagKind,
  element: &mut E,
) -> ElementOutcome {
  let mut outcome = ElementOutcome::default();
  if !config.rewrites(kind) {
    return outcome;
  }

  let geometry = match kind {
    TagKind::Svg => {
      if is_hidden_placeholder(element) {
        element.remove_element();
        outcome.removed = true;
      }
      return outcome;
    }
    TagKind::Link => {
      if !is_icon_link(element) {
        return outcome;
      }
      element
        .attribute("sizes")
        .and_then(|sizes| match_icon_sizes(&sizes))
    }
    TagKind::Img => Geometry::from_attributes(
      element.attribute("width").as_deref(),
      element.attribute("height").as_deref(),
    ),
    TagKind::Anchor | TagKind::Div | TagKind::Style => None,
  };

  let rewriter = AssetRewriter::new(config);
  for target in targets(kind) {
    let Some(value) = element.attribute(target.attribute) else {
      continue;
    };
    if value.is_empty() {
      continue;
    }
    let Cow::Owned(rewritten) = rewriter.apply(target.operation, &value, geometry) else {
      continue;
    };
    if rewritten != value && element.write_attribute(target.attribute, &rewritten) {
      outcome.rewritten += 1;
    }
  }

  if kind == TagKind::Img
    && config.lazy_load
    && element.attribute("loading").is_none()
    && element.write_attribute("loading", "lazy")
  {
    outcome.lazy_loaded = true;
  }

  outcome
}

fn is_hidden_placeholder<E: MarkupElement>(element: &E) -> bool {
  element.attribute("viewBox").as_deref() == Some("0 0 0 0")
    && element.attribute("class").is_none()
    && element.attribute("style").as_deref() == Some(HIDDEN_SVG_STYLE)
}

fn is_icon_link<E: MarkupElement>(element: &E) -> bool {
  let Some(rel) = element.attribute("rel") else {
    return false;
  };
  let rel = rel.trim();
  if !ICON_RELATIONS
    .iter()
    .any(|relation| rel.eq_ignore_ascii_case(relation))
  {
    return false;
  }

  // Legacy .ico favicons are not transformable.
  element.attribute("href").is_some_and(|href| {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    !path.to_ascii_lowercase().ends_with(".ico")
  })
}

/// Result of feeding one chunk to a [`StyleTextRewriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOutcome {
  /// The chunk was buffered and suppressed.
  Buffered,
  /// The whole node was emitted in place of the final chunk.
  Emitted {
    /// At least one `url()` changed.
    rewritten: bool,
  },
}

/// Buffers `<style>` text nodes and rewrites each one once it is complete.
#[derive(Debug)]
pub struct StyleTextRewriter<'c> {
  config: &'c SiteConfig,
  buffer: TextBuffer,
}

impl<'c> StyleTextRewriter<'c> {
  /// Create a rewriter for one document.
  pub fn new(config: &'c SiteConfig) -> Self {
    Self {
      config,
      buffer: TextBuffer::new(),
    }
  }

  /// Handle one text chunk of a `<style>` element.
  pub fn on_chunk<T: TextChunkEvent>(&mut self, chunk: &mut T) -> TextOutcome {
    let Some(node) = self.buffer.push(chunk.text(), chunk.is_last()) else {
      chunk.suppress();
      return TextOutcome::Buffered;
    };

    let css = if self.config.rewrites(TagKind::Style) {
      AssetRewriter::new(self.config).css(&node)
    } else {
      Cow::Borrowed(node.as_str())
    };
    chunk.replace_with_text(&css);
    TextOutcome::Emitted {
      rewritten: matches!(css, Cow::Owned(_)),
    }
  }
}
