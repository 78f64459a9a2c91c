use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::Geometry;

fn filename_dimensions() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-(\d+)x(\d+)(?:-\d+)?(\.(?i:jpe?g|gif|png|webp|svg))$")
            .expect("invalid filename dimension regex")
    })
}

fn width_descriptor() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)w$").expect("invalid width descriptor regex"))
}

fn icon_sizes() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)[xX](\d+)$").expect("invalid sizes regex"))
}

/// Dimensions WordPress embeds before the extension of intermediate sizes (`cat-300x200.jpg`).
///
/// The `-300x200-1.jpg` form produced for duplicate uploads is recognised as well.
pub fn match_filename_geometry(path: &str) -> Option<Geometry> {
    let caps = filename_dimensions().captures(path)?;
    Geometry::sized(caps[1].parse().ok()?, caps[2].parse().ok()?)
}

/// Remove the dimension suffix from an asset path so the CDN receives the original upload.
pub fn strip_filename_geometry(path: &str) -> Cow<'_, str> {
    filename_dimensions().replace(path, "$3")
}

/// Width from a responsive candidate descriptor such as `480w`.
pub fn match_descriptor_width(descriptor: &str) -> Option<u32> {
    let caps = width_descriptor().captures(descriptor.trim())?;
    caps[1].parse().ok().filter(|width| *width > 0)
}

/// Geometry from an icon `sizes` attribute of the literal form `WxH`.
pub fn match_icon_sizes(sizes: &str) -> Option<Geometry> {
    let caps = icon_sizes().captures(sizes.trim())?;
    Geometry::sized(caps[1].parse().ok()?, caps[2].parse().ok()?)
}
