use glam::Vec2;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::audio::AudioBank;
use crate::gate;
use crate::loader;
use crate::model::{Catalog, Settings};
use crate::selector::{self, Projector, Selection};

#[derive(Clone, Debug, PartialEq)]
pub enum LoadStatus {
    NotLoaded,
    Loaded { clips: usize, skipped: usize },
    Failed(String),
}

/// Owns the catalog and the audio bank and serialises the two ways in:
/// the per-frame tick and pointer-move events.
pub struct ViewerEngine<A: AudioBank> {
    pub settings: Settings,
    catalog: Catalog,
    audio: A,
    selection: Option<Selection>,
    status: LoadStatus,
    source: PathBuf,
    start_time: Instant,
}

impl<A: AudioBank> ViewerEngine<A> {
    pub fn new(audio: A, settings: Settings) -> Self {
        Self {
            settings: settings.clamped(),
            catalog: Catalog::default(),
            audio,
            selection: None,
            status: LoadStatus::NotLoaded,
            source: PathBuf::new(),
            start_time: Instant::now(),
        }
    }

    /// Replace the catalog with the contents of `path`. On failure the old
    /// catalog is kept but the viewer goes quiet until a load succeeds.
    pub fn load(&mut self, path: &Path) -> bool {
        self.source = path.to_path_buf();
        match loader::load(path, &mut self.audio) {
            Ok(catalog) => {
                self.status = LoadStatus::Loaded {
                    clips: catalog.len(),
                    skipped: catalog.skipped,
                };
                self.catalog = catalog;
                self.selection = None;
                true
            }
            Err(e) => {
                error!("[VIEWER] Load failed: {}", e);
                self.status = LoadStatus::Failed(e.to_string());
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }

    /// Seconds since the engine was created, on a monotonic clock.
    pub fn now(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Per-frame housekeeping. Returns how many clips were cut short.
    pub fn update(&mut self) -> usize {
        if !self.is_ready() {
            return 0;
        }
        gate::enforce_max_duration(&self.catalog, &self.settings, &mut self.audio)
    }

    /// Recompute the nearest clip. An empty catalog keeps the last pick;
    /// a camera that sees none of the clips clears it.
    pub fn refresh_selection(&mut self, pointer: Vec2, viewport: Vec2, projector: &impl Projector) {
        if !self.is_ready() {
            return;
        }
        match selector::select(&self.catalog, pointer, viewport, projector) {
            Some(sel) => self.selection = Some(sel),
            None if !self.catalog.is_empty() => self.selection = None,
            None => {}
        }
    }

    pub fn pointer_moved(&mut self, now: f64) -> Option<usize> {
        if !self.is_ready() {
            return None;
        }
        let started = gate::on_pointer_move(
            &mut self.catalog,
            self.selection.as_ref(),
            now,
            &self.settings,
            &mut self.audio,
        );
        if let Some(index) = started {
            debug!("[VIEWER] Triggered clip #{}", index);
        }
        started
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.catalog
            .get(index)
            .map_or(false, |clip| self.audio.is_playing(clip.voice))
    }

    #[cfg(test)]
    pub fn audio(&mut self) -> &mut A {
        &mut self.audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingBank;
    use glam::Vec3;

    fn flat(world: Vec3) -> Vec2 {
        world.truncate()
    }

    fn write_catalog(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const TWO_CLIPS: &str = r#"[
        {"path": "a.wav", "point": [0.0, 0.0, 0.0]},
        {"path": "b.wav", "point": [1.0, 1.0, 1.0]}
    ]"#;

    #[test]
    fn test_nothing_happens_before_a_load() {
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());
        engine.refresh_selection(Vec2::ZERO, Vec2::new(100.0, 100.0), &flat);
        assert_eq!(engine.selection(), None);
        assert_eq!(engine.pointer_moved(100.0), None);
        assert_eq!(engine.update(), 0);
        assert_eq!(engine.status(), &LoadStatus::NotLoaded);
    }

    #[test]
    fn test_hover_then_move_plays_nearest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, "tsne.json", TWO_CLIPS);
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());
        assert!(engine.load(&path));
        assert_eq!(engine.status(), &LoadStatus::Loaded { clips: 2, skipped: 0 });

        engine.refresh_selection(Vec2::new(97.0, 96.0), Vec2::new(100.0, 100.0), &flat);
        let sel = *engine.selection().unwrap();
        assert_eq!(sel.index, 1);
        assert!((sel.distance - 5.0).abs() < 1e-4);

        assert_eq!(engine.pointer_moved(10.0), Some(1));
        assert!(engine.is_playing(1));
        assert!(!engine.is_playing(0));
        assert_eq!(engine.catalog().records[1].last_triggered_at, 10.0);

        // Still playing: a second move does nothing
        assert_eq!(engine.pointer_moved(20.0), None);
    }

    #[test]
    fn test_update_cuts_long_playback() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, "tsne.json", TWO_CLIPS);
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());
        engine.load(&path);

        let voice = engine.catalog().records[0].voice;
        engine.audio().set_playing(voice, 999.0);
        assert_eq!(engine.update(), 0);
        engine.audio().set_playing(voice, 1001.0);
        assert_eq!(engine.update(), 1);
        assert!(!engine.is_playing(0));
    }

    #[test]
    fn test_failed_reload_keeps_catalog_but_goes_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, "tsne.json", TWO_CLIPS);
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());
        engine.load(&path);
        engine.refresh_selection(Vec2::ZERO, Vec2::new(100.0, 100.0), &flat);

        let missing = dir.path().join("missing.json");
        assert!(!engine.load(&missing));
        assert!(matches!(engine.status(), LoadStatus::Failed(msg) if msg.contains("missing.json")));
        assert_eq!(engine.source(), missing.as_path());
        assert_eq!(engine.catalog().len(), 2);
        assert_eq!(engine.audio().clears, 1);
        assert_eq!(engine.pointer_moved(100.0), None);
        assert!(engine.audio().plays.is_empty());

        // Recovers on the next good load
        assert!(engine.load(&path));
        assert!(engine.is_ready());
    }

    #[test]
    fn test_reload_drops_old_selection() {
        let dir = tempfile::tempdir().unwrap();
        let two = write_catalog(&dir, "two.json", TWO_CLIPS);
        let one = write_catalog(&dir, "one.json", r#"[{"path": "c.wav", "point": [0.5, 0.5, 0.5]}]"#);
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());

        engine.load(&two);
        engine.refresh_selection(Vec2::new(100.0, 100.0), Vec2::new(100.0, 100.0), &flat);
        assert_eq!(engine.selection().map(|s| s.index), Some(1));

        engine.load(&one);
        assert_eq!(engine.selection(), None);
        assert_eq!(engine.pointer_moved(100.0), None);
    }

    #[test]
    fn test_empty_catalog_has_nothing_to_select() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write_catalog(&dir, "empty.json", "[{}, {}]");
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());
        assert!(engine.load(&empty));
        assert_eq!(engine.status(), &LoadStatus::Loaded { clips: 0, skipped: 2 });

        engine.refresh_selection(Vec2::ZERO, Vec2::new(100.0, 100.0), &flat);
        assert_eq!(engine.selection(), None);
        assert_eq!(engine.pointer_moved(5.0), None);
    }

    // Flat projection that only sees the z = 0 plane
    struct FrontOnly;

    impl Projector for FrontOnly {
        fn world_to_screen(&self, world: Vec3) -> Vec2 {
            world.truncate()
        }
        fn is_visible(&self, world: Vec3) -> bool {
            world.z == 0.0
        }
    }

    struct Blind;

    impl Projector for Blind {
        fn world_to_screen(&self, world: Vec3) -> Vec2 {
            world.truncate()
        }
        fn is_visible(&self, _world: Vec3) -> bool {
            false
        }
    }

    #[test]
    fn test_out_of_view_clip_is_never_played() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, "tsne.json", TWO_CLIPS);
        let mut engine = ViewerEngine::new(RecordingBank::default(), Settings::default());
        engine.load(&path);

        // b.wav is nearer but hidden, so a.wav is picked
        engine.refresh_selection(Vec2::new(97.0, 96.0), Vec2::new(100.0, 100.0), &FrontOnly);
        assert_eq!(engine.selection().map(|s| s.index), Some(0));

        // Once nothing is visible the old pick is dropped and nothing plays
        engine.refresh_selection(Vec2::ZERO, Vec2::new(100.0, 100.0), &Blind);
        assert_eq!(engine.selection(), None);
        assert_eq!(engine.pointer_moved(10.0), None);
        assert!(engine.audio().plays.is_empty());
    }

    #[test]
    fn test_settings_are_clamped_on_creation() {
        let wild = Settings { max_duration: 0.0, mouse_radius: 1000.0, pause_length: 2.0 };
        let engine = ViewerEngine::new(RecordingBank::default(), wild);
        assert_eq!(engine.settings.max_duration, 0.1);
        assert_eq!(engine.settings.mouse_radius, 500.0);
    }
}
