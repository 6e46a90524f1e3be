//! Core data model: songs, sections, tone attributes, and mixes
//!
//! All types serialize camelCase so the JSON matches the mix interchange
//! format consumed by clients. Times are in seconds (f64) on the owning
//! song's timeline.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic type of a song section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Intro,
    Verse,
    Chorus,
    Bridge,
    Outro,
    Instrumental,
    Breakdown,
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SectionType::Intro => "intro",
            SectionType::Verse => "verse",
            SectionType::Chorus => "chorus",
            SectionType::Bridge => "bridge",
            SectionType::Outro => "outro",
            SectionType::Instrumental => "instrumental",
            SectionType::Breakdown => "breakdown",
        };
        write!(f, "{}", s)
    }
}

/// Mood classification derived from tempo and energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Uplifting,
    Melancholic,
    Energetic,
    Calm,
    Dramatic,
}

/// Descriptive tone attributes for a section
///
/// Purely descriptive; no invariant beyond the 0-100 numeric ranges,
/// which the derivation policy is responsible for honoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneAttributes {
    /// Average energy, 0-100
    pub energy: u8,
    /// Intensity, 0-100
    pub intensity: u8,
    pub mood: Mood,
    pub strong_start: bool,
    pub building_up: bool,
    pub slowing_down: bool,
}

/// A structural section of a song (intro, verse, chorus, ...)
///
/// Produced by analysis or manual edit. Reference-shared across mixes:
/// editing a copy embedded in a mix does not retroactively change the
/// song's section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub song_id: Uuid,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    /// Start on the song timeline, seconds
    pub start_time: f64,
    /// End on the song timeline, seconds
    pub end_time: f64,
    /// Always equals end_time - start_time
    pub duration: f64,
    pub tone_attributes: ToneAttributes,
}

impl Section {
    /// Create a section, deriving `duration` from the bounds
    pub fn new(
        song_id: Uuid,
        section_type: SectionType,
        start_time: f64,
        end_time: f64,
        tone_attributes: ToneAttributes,
    ) -> Result<Self> {
        if !(start_time < end_time) {
            return Err(Error::InvalidInterval(format!(
                "section bounds must satisfy start < end (got {start_time}..{end_time})"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            song_id,
            section_type,
            start_time,
            end_time,
            duration: end_time - start_time,
            tone_attributes,
        })
    }
}

/// A song in the library
///
/// Immutable once analysis finishes, except for the `is_analyzing` flag
/// and the attached `sections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    /// Total duration in seconds
    pub duration: f64,
    /// Playable source locator
    pub url: String,
    /// Precomputed amplitude samples for waveform rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform_data: Option<Vec<f32>>,
    /// Sections derived by analysis, in timeline order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
    /// True while structural analysis is still running
    #[serde(default)]
    pub is_analyzing: bool,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, duration: f64, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            artist: artist.into(),
            duration,
            url: url.into(),
            waveform_data: None,
            sections: None,
            is_analyzing: false,
        }
    }
}

/// A user-chosen sub-interval of a section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomInterval {
    pub start: f64,
    pub end: f64,
}

/// One entry of a mix: an embedded song/section pair, optionally cut
/// down to a custom sub-interval
///
/// Owned exclusively by the containing mix. The nominal start/end are
/// copied from the section at insertion time; `position` is the ordering
/// index, kept consistent with the mix's sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixSection {
    pub id: Uuid,
    pub song: Song,
    pub section: Section,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_interval: Option<CustomInterval>,
    /// Ordering index within the mix
    #[serde(default)]
    pub position: u32,
}

impl MixSection {
    /// Build an entry playing the full section
    pub fn new(song: Song, section: Section) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time: section.start_time,
            end_time: section.end_time,
            song,
            section,
            custom_interval: None,
            position: 0,
        }
    }

    /// Build an entry with a custom sub-interval
    ///
    /// Construction enforces `start < end` and that both bounds lie
    /// within the section; downstream playback trusts this.
    pub fn with_custom_interval(song: Song, section: Section, start: f64, end: f64) -> Result<Self> {
        if !(start < end) {
            return Err(Error::InvalidInterval(format!(
                "custom interval must satisfy start < end (got {start}..{end})"
            )));
        }
        if start < section.start_time || end > section.end_time {
            return Err(Error::InvalidInterval(format!(
                "custom interval {start}..{end} outside section bounds {}..{}",
                section.start_time, section.end_time
            )));
        }
        let mut entry = Self::new(song, section);
        entry.custom_interval = Some(CustomInterval { start, end });
        Ok(entry)
    }

    /// Effective playback duration (custom interval when present)
    pub fn effective_duration(&self) -> f64 {
        match self.custom_interval {
            Some(ci) => ci.end - ci.start,
            None => self.section.duration,
        }
    }
}

/// An ordered mix of sections
///
/// Lifecycle: created transiently in the editor, persisted explicitly by
/// the user, loaded back by id. A transient mix can drive playback
/// without ever being saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mix {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sections: Vec<MixSection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
}

impl Mix {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            sections: Vec::new(),
            created_at: now,
            updated_at: now,
            total_duration: None,
        }
    }

    /// Append a section to the end of the mix
    pub fn add_section(&mut self, section: MixSection) {
        self.sections.push(section);
        self.normalize();
    }

    /// Remove a section by id; returns true if something was removed
    pub fn remove_section(&mut self, section_id: Uuid) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.id != section_id);
        let removed = self.sections.len() != before;
        if removed {
            self.normalize();
        }
        removed
    }

    /// Move a section from one index to another
    pub fn reorder_section(&mut self, from: usize, to: usize) -> bool {
        if from >= self.sections.len() || to >= self.sections.len() {
            return false;
        }
        let entry = self.sections.remove(from);
        self.sections.insert(to, entry);
        self.normalize();
        true
    }

    /// Reassign position indices to match sequence order and refresh
    /// the cached total duration and updated timestamp
    ///
    /// The position field is authoritative for ordering, so every
    /// mutation path funnels through here.
    pub fn normalize(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.position = i as u32;
        }
        self.total_duration = Some(self.sections.iter().map(|s| s.effective_duration()).sum());
        self.updated_at = Utc::now();
    }

    /// Deep copy with a fresh id and timestamps
    pub fn duplicate(&self) -> Mix {
        let now = Utc::now();
        Mix {
            id: Uuid::new_v4(),
            name: format!("{} (Copy)", self.name),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}
