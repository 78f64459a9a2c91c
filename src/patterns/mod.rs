//! Syntactic matchers for image references.
//!
//! Each submodule covers one shape an asset reference can take: a plain URL, a responsive
//! candidate list, a CSS `url()` call, and the dimension hints embedded in filenames,
//! descriptors and icon `sizes`. Nothing here resolves or fetches a URL.

mod asset;
mod css;
mod geometry;
mod srcset;

pub use asset::{CDN_MARKER, is_excluded, match_asset, match_assets};
pub use css::{CssUrl, match_css_urls};
pub use geometry::{
    match_descriptor_width, match_filename_geometry, match_icon_sizes, strip_filename_geometry,
};
pub use srcset::{Candidate, match_responsive_list};
