use log::{info, debug};

use crate::audio::AudioBank;
use crate::model::{Catalog, Settings};
use crate::selector::Selection;

/// Start the selected clip if the pointer is close enough, it is silent and
/// its cooldown has run out. Returns the index that started playing.
pub fn on_pointer_move(
    catalog: &mut Catalog,
    selection: Option<&Selection>,
    now: f64,
    settings: &Settings,
    audio: &mut dyn AudioBank,
) -> Option<usize> {
    let sel = selection?;
    if sel.distance.is_nan() || sel.distance >= settings.mouse_radius {
        return None;
    }

    let clip = catalog.get_mut(sel.index)?;
    if audio.is_playing(clip.voice) {
        return None;
    }
    if now - clip.last_triggered_at <= settings.pause_length as f64 {
        return None;
    }

    clip.last_triggered_at = now;
    audio.play(clip.voice);
    info!("[PLAYBACK] Sample path: {}", clip.file_path);
    Some(sel.index)
}

/// Cut every clip that has played longer than `max_duration`.
/// Returns how many were stopped.
pub fn enforce_max_duration(
    catalog: &Catalog,
    settings: &Settings,
    audio: &mut dyn AudioBank,
) -> usize {
    let limit_ms = settings.max_duration as f64 * 1000.0;
    let mut stopped = 0;
    for clip in &catalog.records {
        if audio.is_playing(clip.voice) && audio.position_ms(clip.voice) > limit_ms {
            audio.stop(clip.voice);
            debug!("[PLAYBACK] Stopped {} after {:.0} ms", clip.file_path, limit_ms);
            stopped += 1;
        }
    }
    stopped
}
