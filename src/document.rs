//! Whole-document entry points: response gating, HTML streaming and stylesheet rewriting.

use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

use crate::config::SiteTable;
use crate::html::{self, RewriteStats};
use crate::models::{SiteConfig, TagKind};
use crate::rewrite::AssetRewriter;

/// Path fragments whose responses are never rewritten.
pub const BYPASS_PATHS: [&str; 2] = ["/wp-admin/", "/wp-login/"];

/// Kind of document a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
  /// An HTML page, rewritten as a stream.
  Html,
  /// A stylesheet, rewritten as a whole.
  Css,
}

/// Reason a response is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bypass {
  /// The origin answered with something other than `200`.
  Status(u16),
  /// The request targets the admin area or the login page.
  AdminPath,
  /// The content type is neither HTML nor CSS.
  ContentType(String),
}

impl fmt::Display for Bypass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Bypass::Status(status) => write!(f, "origin status {status}"),
      Bypass::AdminPath => f.write_str("admin path"),
      Bypass::ContentType(content_type) if content_type.is_empty() => {
        f.write_str("missing content type")
      }
      Bypass::ContentType(content_type) => write!(f, "content type {content_type}"),
    }
  }
}

/// Decide whether a response should be rewritten, and as what.
pub fn classify(
  status: u16,
  content_type: Option<&str>,
  path: &str,
) -> std::result::Result<DocumentKind, Bypass> {
  if status != 200 {
    return Err(Bypass::Status(status));
  }
  if BYPASS_PATHS.iter().any(|fragment| path.contains(fragment)) {
    return Err(Bypass::AdminPath);
  }

  let content_type = content_type.unwrap_or_default().trim().to_ascii_lowercase();
  if content_type.starts_with("text/html") {
    Ok(DocumentKind::Html)
  } else if content_type.starts_with("text/css") {
    Ok(DocumentKind::Css)
  } else {
    Err(Bypass::ContentType(content_type))
  }
}

/// Rewrites documents for one resolved site.
#[derive(Debug, Clone)]
pub struct DocumentRewriter {
  config: Arc<SiteConfig>,
}

impl DocumentRewriter {
  /// Create a rewriter for a site configuration.
  pub fn new(config: Arc<SiteConfig>) -> Self {
    Self { config }
  }

  /// Resolve `host` against the site table.
  pub fn for_host(table: &SiteTable, host: &str) -> Self {
    Self::new(table.resolve(host))
  }

  /// Configuration in effect for this document.
  pub fn config(&self) -> &SiteConfig {
    &self.config
  }

  /// Stream an HTML document from `input` to `output`.
  pub fn rewrite_html<R: Read, W: Write>(&self, input: R, output: &mut W) -> Result<RewriteStats> {
    let stats = html::rewrite_html(&self.config, input, output)?;
    info!(
      attributes = stats.attributes_rewritten,
      removed = stats.elements_removed,
      lazy = stats.lazy_loaded,
      styles = stats.style_nodes_rewritten,
      "rewrote html document"
    );
    Ok(stats)
  }

  /// Rewrite an in-memory HTML document.
  pub fn rewrite_html_str(&self, input: &str) -> Result<(String, RewriteStats)> {
    html::rewrite_html_str(&self.config, input)
  }

  /// Rewrite a stylesheet. `url` is the stylesheet's own location, used to resolve relative
  /// references.
  pub fn rewrite_css<'a>(&self, css: &'a str, url: Option<&Url>) -> Cow<'a, str> {
    if !self.config.rewrites(TagKind::Style) {
      return Cow::Borrowed(css);
    }
    AssetRewriter::new(&self.config).stylesheet(css, url)
  }

  /// Rewrite a document of the given kind from `input` to `output`.
  pub fn rewrite<R: Read, W: Write>(
    &self,
    kind: DocumentKind,
    mut input: R,
    output: &mut W,
    url: Option<&Url>,
  ) -> Result<RewriteStats> {
    match kind {
      DocumentKind::Html => self.rewrite_html(input, output),
      DocumentKind::Css => {
        let mut css = String::new();
        input
          .read_to_string(&mut css)
          .context("failed to read stylesheet")?;
        let rewritten = self.rewrite_css(&css, url);
        let changed = matches!(rewritten, Cow::Owned(_));
        output
          .write_all(rewritten.as_bytes())
          .context("failed to write stylesheet")?;
        output.flush().context("failed to flush stylesheet")?;
        info!(changed, "rewrote stylesheet");
        Ok(RewriteStats {
          style_nodes_rewritten: usize::from(changed),
          ..RewriteStats::default()
        })
      }
    }
  }
}
