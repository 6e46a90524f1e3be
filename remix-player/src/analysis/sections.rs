//! Section derivation from analysis results
//!
//! Turns segment boundary timestamps into typed sections with tone
//! attributes. The thresholds are heuristic and provisional, so the
//! whole classification sits behind a policy trait; the sequencer and
//! library only ever see the resulting sections.

use remix_common::analysis::AudioAnalysis;
use remix_common::models::{Mood, Section, SectionType, ToneAttributes};
use tracing::warn;
use uuid::Uuid;

/// Pluggable section classification policy
pub trait SectionPolicy: Send + Sync {
    /// Derive sections for a song from its analysis result
    ///
    /// Given n boundary timestamps, produces n-1 sections in timeline
    /// order.
    fn derive(&self, analysis: &AudioAnalysis, song_id: Uuid) -> Vec<Section>;
}

/// Default policy: position-pinned intro/outro, energy thresholds for
/// everything in between
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyHeuristicPolicy;

impl SectionPolicy for EnergyHeuristicPolicy {
    fn derive(&self, analysis: &AudioAnalysis, song_id: Uuid) -> Vec<Section> {
        let boundaries = &analysis.segments_sec;
        if boundaries.len() < 2 {
            return Vec::new();
        }
        let span_count = boundaries.len() - 1;
        let avg_duration = analysis.duration_sec / boundaries.len() as f64;

        let mut sections = Vec::with_capacity(span_count);
        for i in 0..span_count {
            let start = boundaries[i];
            let end = boundaries[i + 1];
            let duration = end - start;
            let energy = average_energy(analysis, i, span_count);

            let section_type = classify_span(i, span_count, duration, avg_duration, energy);
            let tone = tone_attributes(analysis, energy, i, span_count);

            match Section::new(song_id, section_type, start, end, tone) {
                Ok(section) => sections.push(section),
                Err(e) => {
                    warn!("Skipping degenerate span {i} ({start}..{end}): {e}");
                }
            }
        }
        sections
    }
}

/// Classify one span by position, then by average energy
///
/// Span 0 is always the intro; the second-to-last span is always the
/// outro. Middle spans use fixed energy thresholds, with duration
/// relative to the average breaking the low-energy tie.
fn classify_span(
    index: usize,
    span_count: usize,
    duration: f64,
    avg_duration: f64,
    energy: f64,
) -> SectionType {
    if index == 0 {
        return SectionType::Intro;
    }
    if span_count >= 2 && index == span_count - 2 {
        return SectionType::Outro;
    }

    if energy > 0.5 {
        return SectionType::Breakdown;
    }
    if energy > 0.3 && duration > avg_duration * 1.2 {
        return SectionType::Chorus;
    }
    if energy > 0.15 {
        return SectionType::Verse;
    }
    if duration < avg_duration * 0.8 {
        SectionType::Bridge
    } else {
        SectionType::Instrumental
    }
}

/// Average RMS energy over the frames mapped to one span
fn average_energy(analysis: &AudioAnalysis, index: usize, span_count: usize) -> f64 {
    if analysis.energy_rms.is_empty() || span_count == 0 {
        return 0.0;
    }
    let frame_count = analysis.energy_rms.len();
    let frames_per_span = frame_count as f64 / span_count as f64;
    let start = ((index as f64 * frames_per_span).floor() as usize).min(frame_count - 1);
    let end = (((index + 1) as f64 * frames_per_span).floor() as usize)
        .clamp(start + 1, frame_count);
    let slice = &analysis.energy_rms[start..end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

fn tone_attributes(analysis: &AudioAnalysis, energy: f64, index: usize, span_count: usize) -> ToneAttributes {
    ToneAttributes {
        energy: (energy * 100.0).round().clamp(0.0, 100.0) as u8,
        intensity: (energy * 200.0).min(100.0).round() as u8,
        mood: classify_mood(analysis.tempo_bpm, energy),
        strong_start: index == 0 || energy > 0.4,
        building_up: (index as f64) < span_count as f64 / 2.0,
        slowing_down: index as f64 > span_count as f64 * 0.7,
    }
}

/// Mood from tempo and energy
///
/// Rule order matters: very low tempo reads as melancholic before the
/// calm check, so calm only applies to tempo in [70, 80).
fn classify_mood(tempo: f64, energy: f64) -> Mood {
    if tempo > 120.0 && energy > 0.3 {
        return Mood::Energetic;
    }
    if tempo < 70.0 {
        return Mood::Melancholic;
    }
    if tempo < 80.0 && energy < 0.2 {
        return Mood::Calm;
    }
    if (100.0..=140.0).contains(&tempo) && energy > 0.25 {
        return Mood::Uplifting;
    }
    if tempo > 140.0 {
        return Mood::Dramatic;
    }
    Mood::Uplifting
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(segments: Vec<f64>, energy: Vec<f64>, tempo: f64) -> AudioAnalysis {
        let duration = segments.last().copied().unwrap_or(0.0);
        AudioAnalysis {
            sample_rate: 22050,
            duration_sec: duration,
            energy_rms: energy,
            spectrogram_db: vec![],
            mfcc_mean: vec![],
            tempo_bpm: tempo,
            beat_times: vec![],
            segments_sec: segments,
            spectral_centroid: vec![],
        }
    }

    #[test]
    fn intro_and_outro_are_position_pinned() {
        // 6 boundaries -> 5 spans; outro is the second-to-last span (index 3)
        let a = analysis(
            vec![0.0, 30.0, 90.0, 150.0, 180.0, 240.0],
            vec![0.2; 50],
            95.0,
        );
        let sections = EnergyHeuristicPolicy.derive(&a, Uuid::new_v4());

        assert_eq!(sections.len(), 5);
        assert_eq!(sections[0].section_type, SectionType::Intro);
        assert_eq!(sections[3].section_type, SectionType::Outro);
        assert_ne!(sections[4].section_type, SectionType::Outro);
    }

    #[test]
    fn energy_thresholds_classify_middle_spans() {
        // avg duration = 240/6 = 40s; middle spans are indices 1, 2, 4
        let base = vec![0.0, 30.0, 90.0, 150.0, 180.0, 240.0];

        // Very high energy -> breakdown, regardless of duration
        let a = analysis(base.clone(), vec![0.6; 50], 95.0);
        let sections = EnergyHeuristicPolicy.derive(&a, Uuid::new_v4());
        assert_eq!(sections[1].section_type, SectionType::Breakdown);

        // Moderately high energy on a long span (60s > 1.2 * 40s) -> chorus
        let a = analysis(base.clone(), vec![0.35; 50], 95.0);
        let sections = EnergyHeuristicPolicy.derive(&a, Uuid::new_v4());
        assert_eq!(sections[1].section_type, SectionType::Chorus);

        // Medium energy -> verse
        let a = analysis(base.clone(), vec![0.2; 50], 95.0);
        let sections = EnergyHeuristicPolicy.derive(&a, Uuid::new_v4());
        assert_eq!(sections[1].section_type, SectionType::Verse);

        // Low energy: short spans (20s < 0.8 * 40s) become bridges,
        // long ones instrumentals
        let short_middle = vec![0.0, 40.0, 60.0, 120.0, 180.0, 240.0];
        let a = analysis(short_middle, vec![0.1; 50], 95.0);
        let sections = EnergyHeuristicPolicy.derive(&a, Uuid::new_v4());
        assert_eq!(sections[1].section_type, SectionType::Bridge);
        assert_eq!(sections[2].section_type, SectionType::Instrumental);
    }

    #[test]
    fn mood_rule_order_is_pinned() {
        // High tempo, high energy
        assert_eq!(classify_mood(130.0, 0.35), Mood::Energetic);
        // Very low tempo wins over the calm check
        assert_eq!(classify_mood(60.0, 0.1), Mood::Melancholic);
        // Calm only for tempo in [70, 80) with low energy
        assert_eq!(classify_mood(75.0, 0.1), Mood::Calm);
        // Mid tempo with decent energy
        assert_eq!(classify_mood(110.0, 0.3), Mood::Uplifting);
        // Very high tempo, low energy
        assert_eq!(classify_mood(150.0, 0.1), Mood::Dramatic);
        // Fallback
        assert_eq!(classify_mood(90.0, 0.1), Mood::Uplifting);
    }

    #[test]
    fn tone_attributes_follow_position_and_energy() {
        let a = analysis(vec![0.0, 60.0, 120.0, 180.0, 240.0], vec![0.5; 40], 130.0);
        let sections = EnergyHeuristicPolicy.derive(&a, Uuid::new_v4());

        // 4 spans: first half building up, past 70% slowing down
        assert!(sections[0].tone_attributes.building_up);
        assert!(sections[1].tone_attributes.building_up);
        assert!(!sections[2].tone_attributes.building_up);
        assert!(sections[3].tone_attributes.slowing_down);

        assert_eq!(sections[0].tone_attributes.energy, 50);
        assert_eq!(sections[0].tone_attributes.intensity, 100);
        assert!(sections[0].tone_attributes.strong_start); // index 0
        assert!(sections[1].tone_attributes.strong_start); // energy > 0.4
    }

    #[test]
    fn fewer_than_two_boundaries_yields_no_sections() {
        let a = analysis(vec![0.0], vec![0.2; 10], 95.0);
        assert!(EnergyHeuristicPolicy.derive(&a, Uuid::new_v4()).is_empty());
    }
}
