//! Streaming HTML rewriting on top of `lol_html`.
//!
//! The dispatch policy only sees [`MarkupElement`] and [`TextChunkEvent`]; this module wires
//! those traits to the parser's element and text events and pumps bytes from a reader into a
//! writer.

use std::cell::{Cell, RefCell};
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use lol_html::html_content::{ContentType, Element, TextChunk};
use lol_html::{HtmlRewriter, Settings, element, text};
use tracing::{debug, warn};

use crate::dispatch::{MarkupElement, StyleTextRewriter, TextChunkEvent, TextOutcome, rewrite_element};
use crate::models::{SiteConfig, TagKind};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Quote entities page builders write inside attribute values, e.g. `url(&quot;...&quot;)`.
const QUOTE_ENTITIES: [(&str, &str); 6] = [
  ("&quot;", "\""),
  ("&#34;", "\""),
  ("&#x22;", "\""),
  ("&#39;", "'"),
  ("&#039;", "'"),
  ("&#x27;", "'"),
];

/// `lol_html` hands out raw attribute text; quote entities are decoded so CSS inside the value
/// parses. `set_attribute` escapes `"` again on the way out.
fn decode_quote_entities(value: String) -> String {
  if !value.contains("&#") && !value.contains("&quot;") {
    return value;
  }
  QUOTE_ENTITIES
    .iter()
    .fold(value, |value, &(entity, quote)| value.replace(entity, quote))
}

impl MarkupElement for Element<'_, '_> {
  fn attribute(&self, name: &str) -> Option<String> {
    self.get_attribute(name).map(decode_quote_entities)
  }

  fn write_attribute(&mut self, name: &str, value: &str) -> bool {
    match self.set_attribute(name, value) {
      Ok(()) => true,
      Err(err) => {
        warn!(attribute = name, error = %err, "attribute left unchanged");
        false
      }
    }
  }

  fn remove_element(&mut self) {
    self.remove();
  }
}

impl TextChunkEvent for TextChunk<'_> {
  fn text(&self) -> &str {
    self.as_str()
  }

  fn is_last(&self) -> bool {
    self.last_in_text_node()
  }

  fn replace_with_text(&mut self, text: &str) {
    // Style content is raw text; escaping it would corrupt selectors such as `a > b`.
    self.replace(text, ContentType::Html);
  }

  fn suppress(&mut self) {
    self.remove();
  }
}

/// Counters collected while rewriting one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
  /// Attribute values that changed.
  pub attributes_rewritten: usize,
  /// Elements removed from the output.
  pub elements_removed: usize,
  /// Images that received `loading="lazy"`.
  pub lazy_loaded: usize,
  /// `<style>` text nodes whose content changed.
  pub style_nodes_rewritten: usize,
}

impl RewriteStats {
  /// Returns `true` when the document was emitted unchanged.
  pub fn is_unchanged(&self) -> bool {
    *self == Self::default()
  }
}

/// Rewrite an HTML document from `input` into `output`.
pub fn rewrite_html<R: Read, W: Write>(
  config: &SiteConfig,
  mut input: R,
  output: &mut W,
) -> Result<RewriteStats> {
  let stats = Cell::new(RewriteStats::default());
  let write_error: RefCell<Option<io::Error>> = RefCell::new(None);

  {
    let stats = &stats;
    let mut style = StyleTextRewriter::new(config);

    let mut element_content_handlers: Vec<_> = TagKind::ELEMENTS
      .iter()
      .map(|&kind| {
        element!(kind.tag_name(), move |el| {
          let outcome = rewrite_element(config, kind, el);
          if outcome.rewritten > 0 || outcome.removed {
            debug!(
              tag = kind.tag_name(),
              attributes = outcome.rewritten,
              removed = outcome.removed,
              "rewrote element"
            );
          }
          let mut totals = stats.get();
          totals.attributes_rewritten += outcome.rewritten;
          totals.elements_removed += usize::from(outcome.removed);
          totals.lazy_loaded += usize::from(outcome.lazy_loaded);
          stats.set(totals);
          Ok(())
        })
      })
      .collect();

    element_content_handlers.push(text!(TagKind::Style.tag_name(), move |chunk| {
      if let TextOutcome::Emitted { rewritten: true } = style.on_chunk(chunk) {
        debug!("rewrote style text");
        let mut totals = stats.get();
        totals.style_nodes_rewritten += 1;
        stats.set(totals);
      }
      Ok(())
    }));

    let mut rewriter = HtmlRewriter::new(
      Settings {
        element_content_handlers,
        ..Settings::new()
      },
      |chunk: &[u8]| {
        let mut error = write_error.borrow_mut();
        if error.is_none() {
          if let Err(err) = output.write_all(chunk) {
            *error = Some(err);
          }
        }
      },
    );

    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
      let read = match input.read(&mut buffer) {
        Ok(0) => break,
        Ok(read) => read,
        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
        Err(err) => return Err(err).context("failed to read document"),
      };
      rewriter
        .write(&buffer[..read])
        .context("failed to rewrite document")?;
      if write_error.borrow().is_some() {
        break;
      }
    }
    rewriter.end().context("failed to finish document")?;
  }

  if let Some(err) = write_error.take() {
    return Err(err).context("failed to write document");
  }
  output.flush().context("failed to flush document")?;
  Ok(stats.get())
}

/// Rewrite an in-memory HTML document.
pub fn rewrite_html_str(config: &SiteConfig, html: &str) -> Result<(String, RewriteStats)> {
  let mut output = Vec::with_capacity(html.len());
  let stats = rewrite_html(config, html.as_bytes(), &mut output)?;
  let html = String::from_utf8(output).context("rewritten document is not valid UTF-8")?;
  Ok((html, stats))
}
