#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod directive;
pub mod dispatch;
pub mod document;
pub mod html;
pub mod models;
pub mod patterns;
pub mod rewrite;

pub use config::{ConfigError, SharedSiteTable, SiteTable};
pub use directive::Directive;
pub use dispatch::{MarkupElement, TextChunkEvent};
pub use document::{Bypass, DocumentKind, DocumentRewriter, classify};
pub use html::RewriteStats;
pub use models::{Fit, Geometry, Metadata, SiteConfig, TagKind};
pub use rewrite::AssetRewriter;
