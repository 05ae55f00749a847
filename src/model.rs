use glam::Vec3;
use std::path::{Path, PathBuf};

use crate::audio::VoiceId;

/// One loaded audio clip and where it sits in the point cloud.
#[derive(Clone, Debug)]
pub struct ClipRecord {
    pub file_path: String,
    pub position: Vec3, // Normalized, usually 0..1 per axis
    pub last_triggered_at: f64, // Session seconds, 0.0 = never
    pub voice: VoiceId,
}

impl ClipRecord {
    pub fn new(file_path: impl Into<String>, position: Vec3, voice: VoiceId) -> Self {
        Self {
            file_path: file_path.into(),
            position,
            last_triggered_at: 0.0,
            voice,
        }
    }

    /// Position in world units for a viewport of `viewport` pixels.
    /// x and z scale with the width, y with the height.
    pub fn world_position(&self, viewport: glam::Vec2) -> Vec3 {
        Vec3::new(
            viewport.x * self.position.x,
            viewport.y * self.position.y,
            viewport.x * self.position.z,
        )
    }
}

/// Ordered set of clips from a single coordinate file. Indices are stable
/// until the whole catalog is replaced.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub source: PathBuf,
    pub records: Vec<ClipRecord>,
    pub skipped: usize,
}

impl Catalog {
    pub fn new(source: &Path, records: Vec<ClipRecord>, skipped: usize) -> Self {
        Self {
            source: source.to_path_buf(),
            records,
            skipped,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClipRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ClipRecord> {
        self.records.get_mut(index)
    }
}

pub const MAX_DURATION_RANGE: std::ops::RangeInclusive<f32> = 0.1..=2.0;
pub const MOUSE_RADIUS_RANGE: std::ops::RangeInclusive<f32> = 100.0..=500.0;
pub const PAUSE_LENGTH_RANGE: std::ops::RangeInclusive<f32> = 0.2..=5.0;

/// Knobs exposed in the control panel. Not persisted between runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub max_duration: f32, // Seconds a clip may play before it is cut
    pub mouse_radius: f32, // Screen pixels
    pub pause_length: f32, // Per-clip cooldown in seconds
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_duration: 1.0,
            mouse_radius: 250.0,
            pause_length: 2.0,
        }
    }
}

impl Settings {
    /// Pull every value back into the range its slider allows.
    pub fn clamped(self) -> Self {
        Self {
            max_duration: clamp_to(self.max_duration, &MAX_DURATION_RANGE),
            mouse_radius: clamp_to(self.mouse_radius, &MOUSE_RADIUS_RANGE),
            pause_length: clamp_to(self.pause_length, &PAUSE_LENGTH_RANGE),
        }
    }
}

fn clamp_to(value: f32, range: &std::ops::RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_world_position_scales_z_by_width() {
        let clip = ClipRecord::new("a.wav", Vec3::new(0.5, 0.25, 1.0), VoiceId(0));
        let world = clip.world_position(Vec2::new(800.0, 600.0));
        assert_eq!(world, Vec3::new(400.0, 150.0, 800.0));
    }

    #[test]
    fn test_new_record_never_triggered() {
        let clip = ClipRecord::new("a.wav", Vec3::ZERO, VoiceId(3));
        assert_eq!(clip.last_triggered_at, 0.0);
        assert_eq!(clip.voice, VoiceId(3));
    }

    #[test]
    fn test_settings_clamped_into_slider_ranges() {
        let wild = Settings {
            max_duration: 9.0,
            mouse_radius: 10.0,
            pause_length: f32::NAN,
        };
        let s = wild.clamped();
        assert_eq!(s.max_duration, 2.0);
        assert_eq!(s.mouse_radius, 100.0);
        assert_eq!(s.pause_length, 0.2);
        assert_eq!(Settings::default().clamped(), Settings::default());
    }
}
