//! Playback state machine.
//!
//! Selection is keyed by song id, never by list position, so a filtered
//! view and the full list cannot disagree about what is playing.

use uuid::Uuid;

use crate::models::SongView;

/// Result of a playback request to the audio element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The audio element did what was asked.
    Ok,
    /// The audio element refused to start (no output device, blocked
    /// autoplay, undecodable source).
    Blocked,
}

/// Coarse player state, derived from the fields below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No songs to select from.
    Idle,
    /// Songs fetched, nothing selected yet.
    Loaded,
    Playing,
    Paused,
}

/// The audio element the player drives.
pub trait AudioSource {
    /// Load a new source and start playing it.
    fn load(&mut self, url: &str) -> PlaybackOutcome;

    /// Pause the current source.
    fn pause(&mut self);

    /// Resume the current source.
    fn resume(&mut self) -> PlaybackOutcome;

    /// True once the current source has played to its natural end.
    fn finished(&self) -> bool;
}

/// Player model: the fetched song list plus transient view state.
pub struct Player {
    songs: Vec<SongView>,
    current: Option<Uuid>,
    playing: bool,
    query: String,
}

impl Player {
    /// Create a player over the fetched song list.
    pub fn new(songs: Vec<SongView>) -> Self {
        Self {
            songs,
            current: None,
            playing: false,
            query: String::new(),
        }
    }

    /// The full fetched list.
    pub fn songs(&self) -> &[SongView] {
        &self.songs
    }

    /// The currently selected song, if any.
    pub fn current(&self) -> Option<&SongView> {
        self.current.and_then(|id| self.song(id))
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Derive the coarse state.
    pub fn state(&self) -> PlayerState {
        match (self.current, self.playing) {
            (None, _) if self.songs.is_empty() => PlayerState::Idle,
            (None, _) => PlayerState::Loaded,
            (Some(_), true) => PlayerState::Playing,
            (Some(_), false) => PlayerState::Paused,
        }
    }

    /// Songs whose title contains the query, case-insensitively.
    /// An empty query filters nothing. Filtering never touches the
    /// selection.
    pub fn visible(&self) -> Vec<&SongView> {
        let query = self.query.to_lowercase();
        self.songs
            .iter()
            .filter(|s| query.is_empty() || s.title.to_lowercase().contains(&query))
            .collect()
    }

    /// Update the search query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Replace the song list (after a refetch), keeping the current
    /// selection when it still exists.
    pub fn set_songs(&mut self, songs: Vec<SongView>) {
        self.songs = songs;
        if let Some(id) = self.current {
            if self.song(id).is_none() {
                self.current = None;
                self.playing = false;
            }
        }
    }

    /// Select a song by id.
    ///
    /// Re-selecting the current song toggles play/pause; any other id
    /// loads the new source and plays it. Returns `None` for an id that
    /// is not in the list.
    pub fn select(&mut self, id: Uuid, audio: &mut dyn AudioSource) -> Option<PlaybackOutcome> {
        if self.current == Some(id) {
            return Some(self.toggle(audio));
        }

        let url = self.song(id)?.url.clone();
        self.current = Some(id);
        let outcome = audio.load(&url);
        self.playing = outcome == PlaybackOutcome::Ok;
        Some(outcome)
    }

    /// Toggle between playing and paused for the current song.
    pub fn toggle(&mut self, audio: &mut dyn AudioSource) -> PlaybackOutcome {
        if self.current.is_none() {
            return PlaybackOutcome::Blocked;
        }

        if self.playing {
            audio.pause();
            self.playing = false;
            PlaybackOutcome::Ok
        } else {
            let outcome = audio.resume();
            self.playing = outcome == PlaybackOutcome::Ok;
            outcome
        }
    }

    /// Advance to the next song in the visible view, clamped at the end.
    pub fn next(&mut self, audio: &mut dyn AudioSource) -> Option<PlaybackOutcome> {
        self.step(1, audio)
    }

    /// Step back to the previous song in the visible view, clamped at
    /// the start.
    pub fn previous(&mut self, audio: &mut dyn AudioSource) -> Option<PlaybackOutcome> {
        self.step(-1, audio)
    }

    /// The audio source reached its natural end: advance like `next`,
    /// or stop when already at the end of the view.
    pub fn on_ended(&mut self, audio: &mut dyn AudioSource) -> Option<PlaybackOutcome> {
        let advanced = self.next(audio);
        if advanced.is_none() {
            self.playing = false;
        }
        advanced
    }

    fn song(&self, id: Uuid) -> Option<&SongView> {
        self.songs.iter().find(|s| s.id == id)
    }

    /// Move by `delta` within the visible view, found by id lookup.
    /// A selection that was filtered out of view falls back to the
    /// first visible song. No wraparound.
    fn step(&mut self, delta: isize, audio: &mut dyn AudioSource) -> Option<PlaybackOutcome> {
        let view: Vec<Uuid> = self.visible().iter().map(|s| s.id).collect();
        if view.is_empty() {
            return None;
        }

        let target = match self
            .current
            .and_then(|id| view.iter().position(|v| *v == id))
        {
            Some(pos) => {
                let stepped = pos as isize + delta;
                if stepped < 0 || stepped as usize >= view.len() {
                    return None;
                }
                view[stepped as usize]
            }
            None => view[0],
        };

        let url = self.song(target)?.url.clone();
        self.current = Some(target);
        let outcome = audio.load(&url);
        self.playing = outcome == PlaybackOutcome::Ok;
        Some(outcome)
    }
}
