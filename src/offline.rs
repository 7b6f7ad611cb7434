//! Offline azaan playback
//!
//! When no live feed is reachable the listener plays a locally stored
//! recording for the requested prayer. Assets live in a configured
//! directory, one file per daily prayer.

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::MediaError;
use crate::failover::OfflineSink;

/// The five daily prayers with stored recordings
pub const PRAYERS: [&str; 5] = ["fajr", "zuhr", "asr", "maghrib", "isha"];

/// Player for locally stored azaan recordings
pub struct OfflineAzaanPlayer {
    tracks: HashMap<String, PathBuf>,
    /// Keeps the output device open while a sink is playing
    output: Option<(OutputStream, OutputStreamHandle)>,
    current: Option<Sink>,
}

impl OfflineAzaanPlayer {
    pub fn new(assets_dir: &Path) -> Self {
        let tracks = PRAYERS
            .iter()
            .map(|&prayer| (prayer.to_string(), assets_dir.join(format!("{}.mp3", prayer))))
            .collect();

        Self {
            tracks,
            output: None,
            current: None,
        }
    }

    /// Resolve a prayer name to its asset path
    ///
    /// Fails before any audio device is touched when the prayer is unknown
    /// or the file is absent on disk.
    fn resolve(&self, prayer: &str) -> Result<&Path, MediaError> {
        let path = self
            .tracks
            .get(&prayer.to_lowercase())
            .ok_or_else(|| MediaError::NotFound(prayer.to_string()))?;
        if !path.exists() {
            return Err(MediaError::NotFound(prayer.to_string()));
        }
        Ok(path)
    }

    /// Play the stored recording for a prayer, stopping any current one
    pub fn play(&mut self, prayer: &str) -> Result<(), MediaError> {
        let path = self.resolve(prayer)?.to_path_buf();
        self.stop();

        if self.output.is_none() {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| MediaError::Output(e.to_string()))?;
            self.output = Some((stream, handle));
        }
        let handle = &self
            .output
            .as_ref()
            .ok_or_else(|| MediaError::Output("no output stream".to_string()))?
            .1;

        let file = File::open(&path).map_err(|e| MediaError::Decode(e.to_string()))?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| MediaError::Decode(e.to_string()))?;

        let sink = Sink::try_new(handle).map_err(|e| MediaError::Output(e.to_string()))?;
        sink.append(source);
        sink.play();

        tracing::info!("Playing offline azaan for {}", prayer);
        self.current = Some(sink);
        Ok(())
    }

    /// Stop any current playback; idempotent
    pub fn stop(&mut self) {
        if let Some(sink) = self.current.take() {
            sink.stop();
        }
    }

    /// Whether a recording is currently playing
    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|s| !s.empty())
    }
}

impl OfflineSink for OfflineAzaanPlayer {
    fn play(&mut self, prayer: &str) -> Result<(), MediaError> {
        OfflineAzaanPlayer::play(self, prayer)
    }

    fn stop(&mut self) {
        OfflineAzaanPlayer::stop(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_prayer_is_not_found() {
        let mut player = OfflineAzaanPlayer::new(Path::new("assets"));
        assert!(matches!(
            player.play("midnight"),
            Err(MediaError::NotFound(_))
        ));
    }

    #[test]
    fn missing_asset_is_not_found_before_any_device_is_opened() {
        let dir = std::env::temp_dir().join("azaan-no-assets");
        let _ = std::fs::create_dir_all(&dir);

        let mut player = OfflineAzaanPlayer::new(&dir);
        assert!(matches!(player.play("fajr"), Err(MediaError::NotFound(_))));
    }

    #[test]
    fn prayer_lookup_is_case_insensitive() {
        let player = OfflineAzaanPlayer::new(Path::new("assets"));
        // Both resolve to the same (possibly missing) path decision
        let a = player.resolve("Fajr").err();
        let b = player.resolve("fajr").err();
        assert_eq!(a.is_some(), b.is_some());
    }

    #[test]
    fn stop_without_play_is_a_noop() {
        let mut player = OfflineAzaanPlayer::new(Path::new("assets"));
        player.stop();
        assert!(!player.is_playing());
    }
}
