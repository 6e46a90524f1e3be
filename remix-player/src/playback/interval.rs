//! Interval resolution
//!
//! Maps a mix section to its effective [start, end) on the underlying
//! song's timeline. Pure; construction sites validate custom-interval
//! bounds, so resolution has no failure modes.

use remix_common::models::MixSection;

/// A resolved playback interval on the song timeline, seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedInterval {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// Resolve the effective interval of a mix section
///
/// A custom interval override is returned verbatim; otherwise the
/// section's own bounds apply.
pub fn resolve(mix_section: &MixSection) -> ResolvedInterval {
    match mix_section.custom_interval {
        Some(ci) => ResolvedInterval {
            start: ci.start,
            end: ci.end,
            duration: ci.end - ci.start,
        },
        None => ResolvedInterval {
            start: mix_section.section.start_time,
            end: mix_section.section.end_time,
            duration: mix_section.section.duration,
        },
    }
}
