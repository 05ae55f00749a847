use cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use anyhow::{Context, Result};
use log::{info, debug, warn};

/// Handle to a clip registered with an [`AudioBank`]. Only valid until the
/// bank is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub usize);

/// Everything the viewer needs from the audio side. Requests are
/// fire-and-forget; state is polled every frame.
pub trait AudioBank {
    /// Register a clip. Decoding may be deferred until the first play.
    fn load(&mut self, path: &Path) -> VoiceId;
    fn play(&mut self, voice: VoiceId);
    fn stop(&mut self, voice: VoiceId);
    fn is_playing(&self, voice: VoiceId) -> bool;
    /// Milliseconds since the current playback started, 0 when idle.
    fn position_ms(&self, voice: VoiceId) -> f64;
    /// Stop and release every registered clip.
    fn clear(&mut self);
}

impl<T: AudioBank + ?Sized> AudioBank for Box<T> {
    fn load(&mut self, path: &Path) -> VoiceId {
        (**self).load(path)
    }
    fn play(&mut self, voice: VoiceId) {
        (**self).play(voice)
    }
    fn stop(&mut self, voice: VoiceId) {
        (**self).stop(voice)
    }
    fn is_playing(&self, voice: VoiceId) -> bool {
        (**self).is_playing(voice)
    }
    fn position_ms(&self, voice: VoiceId) -> f64 {
        (**self).position_ms(voice)
    }
    fn clear(&mut self) {
        (**self).clear()
    }
}

struct Voice {
    path: PathBuf,
    bytes: Option<Arc<[u8]>>,
    unreadable: bool,
    sink: Option<Sink>,
    started: Option<Instant>,
}

impl Voice {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            bytes: None,
            unreadable: false,
            sink: None,
            started: None,
        }
    }

    // Read lazily on first play, remember failures so we only warn once.
    fn bytes(&mut self) -> Option<Arc<[u8]>> {
        if self.unreadable {
            return None;
        }
        if self.bytes.is_none() {
            match std::fs::read(&self.path) {
                Ok(data) => {
                    debug!("[AUDIO] Loaded {} ({} bytes)", self.path.display(), data.len());
                    self.bytes = Some(Arc::from(data.into_boxed_slice()));
                }
                Err(e) => {
                    warn!("[AUDIO] Cannot read {}: {}", self.path.display(), e);
                    self.unreadable = true;
                    return None;
                }
            }
        }
        self.bytes.clone()
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().map_or(false, |s| !s.empty())
    }
}

/// Clip bank backed by rodio on the default cpal output device.
pub struct RodioBank {
    _stream: OutputStream, // Keep stream alive
    handle: OutputStreamHandle,
    voices: Vec<Voice>,
}

impl RodioBank {
    pub fn new() -> Result<Self> {
        debug!("[AUDIO] Initializing audio output...");

        let host = cpal::default_host();
        debug!("[AUDIO] Using host: {:?}", host.id());

        let (stream, handle) = match host.default_output_device() {
            Some(device) => {
                if let Ok(name) = device.name() {
                    info!("[AUDIO] Using output device: {}", name);
                }
                OutputStream::try_from_device(&device)
                    .or_else(|e| {
                        warn!("[AUDIO] Failed to open device ({}), trying rodio default", e);
                        OutputStream::try_default()
                    })
                    .context("opening audio output stream")?
            }
            None => {
                warn!("[AUDIO] No default output device reported, trying rodio default");
                OutputStream::try_default().context("opening default audio output stream")?
            }
        };

        info!("[AUDIO] Audio output initialized successfully");

        Ok(Self {
            _stream: stream,
            handle,
            voices: Vec::new(),
        })
    }
}

impl AudioBank for RodioBank {
    fn load(&mut self, path: &Path) -> VoiceId {
        self.voices.push(Voice::new(path));
        VoiceId(self.voices.len() - 1)
    }

    fn play(&mut self, voice: VoiceId) {
        let Some(v) = self.voices.get_mut(voice.0) else { return; };
        let Some(bytes) = v.bytes() else { return; };

        let source = match Decoder::new(Cursor::new(bytes)) {
            Ok(s) => s,
            Err(e) => {
                warn!("[AUDIO] Cannot decode {}: {}", v.path.display(), e);
                v.unreadable = true;
                v.bytes = None;
                return;
            }
        };
        let sink = match Sink::try_new(&self.handle) {
            Ok(s) => s,
            Err(e) => {
                warn!("[AUDIO] Failed to create sink: {:?}", e);
                return;
            }
        };
        sink.append(source);
        v.sink = Some(sink);
        v.started = Some(Instant::now());
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(v) = self.voices.get_mut(voice.0) {
            if let Some(sink) = v.sink.take() {
                sink.stop();
            }
            v.started = None;
        }
    }

    fn is_playing(&self, voice: VoiceId) -> bool {
        self.voices.get(voice.0).map_or(false, Voice::is_playing)
    }

    fn position_ms(&self, voice: VoiceId) -> f64 {
        match self.voices.get(voice.0) {
            Some(v) if v.is_playing() => v
                .started
                .map_or(0.0, |t| t.elapsed().as_secs_f64() * 1000.0),
            _ => 0.0,
        }
    }

    fn clear(&mut self) {
        for v in &mut self.voices {
            if let Some(sink) = v.sink.take() {
                sink.stop();
            }
        }
        self.voices.clear();
    }
}

/// Used when no output device could be opened: clips register but never sound.
#[derive(Default)]
pub struct SilentBank {
    voices: usize,
}

impl AudioBank for SilentBank {
    fn load(&mut self, _path: &Path) -> VoiceId {
        self.voices += 1;
        VoiceId(self.voices - 1)
    }
    fn play(&mut self, _voice: VoiceId) {}
    fn stop(&mut self, _voice: VoiceId) {}
    fn is_playing(&self, _voice: VoiceId) -> bool {
        false
    }
    fn position_ms(&self, _voice: VoiceId) -> f64 {
        0.0
    }
    fn clear(&mut self) {
        self.voices = 0;
    }
}

/// Open the real output, or fall back to silence so the viewer keeps working.
pub fn open_default_bank() -> Box<dyn AudioBank> {
    match RodioBank::new() {
        Ok(bank) => Box::new(bank),
        Err(e) => {
            warn!("[AUDIO] Audio output unavailable, running silent: {:#}", e);
            Box::new(SilentBank::default())
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    #[derive(Clone, Debug, Default)]
    pub struct FakeVoice {
        pub path: PathBuf,
        pub playing: bool,
        pub position_ms: f64,
    }

    /// Scriptable bank that records every request.
    #[derive(Default)]
    pub struct RecordingBank {
        pub voices: Vec<FakeVoice>,
        pub plays: Vec<VoiceId>,
        pub stops: Vec<VoiceId>,
        pub clears: usize,
    }

    impl RecordingBank {
        pub fn set_playing(&mut self, voice: VoiceId, position_ms: f64) {
            let v = &mut self.voices[voice.0];
            v.playing = true;
            v.position_ms = position_ms;
        }
    }

    impl AudioBank for RecordingBank {
        fn load(&mut self, path: &Path) -> VoiceId {
            self.voices.push(FakeVoice {
                path: path.to_path_buf(),
                ..Default::default()
            });
            VoiceId(self.voices.len() - 1)
        }

        fn play(&mut self, voice: VoiceId) {
            self.plays.push(voice);
            if let Some(v) = self.voices.get_mut(voice.0) {
                v.playing = true;
                v.position_ms = 0.0;
            }
        }

        fn stop(&mut self, voice: VoiceId) {
            self.stops.push(voice);
            if let Some(v) = self.voices.get_mut(voice.0) {
                v.playing = false;
                v.position_ms = 0.0;
            }
        }

        fn is_playing(&self, voice: VoiceId) -> bool {
            self.voices.get(voice.0).map_or(false, |v| v.playing)
        }

        fn position_ms(&self, voice: VoiceId) -> f64 {
            self.voices.get(voice.0).map_or(0.0, |v| v.position_ms)
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.voices.clear();
        }
    }
}
