//! Terminal player client for a shellac catalog server.
//!
//! Fetches the catalog, renders a selectable list, and drives a single
//! rodio sink through play/pause/next/previous/search.

use std::io::{self, BufRead, Cursor, Write};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use uuid::Uuid;

use shellac::player::{AudioSource, CatalogClient, PlaybackOutcome, Player, PlayerState};

/// Audio element backed by a rodio sink.
///
/// Songs are fetched fully into memory before decoding; catalog songs
/// are single MP3 files, not streams.
struct RodioAudio {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    http: reqwest::blocking::Client,
}

impl RodioAudio {
    fn new() -> Self {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when the stream drops; noisy here
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(err) => {
                eprintln!("No audio output device ({}); playback will be blocked", err);
                None
            }
        };

        Self {
            stream,
            sink: None,
            http: reqwest::blocking::Client::new(),
        }
    }
}

impl AudioSource for RodioAudio {
    fn load(&mut self, url: &str) -> PlaybackOutcome {
        let Some(stream) = self.stream.as_ref() else {
            return PlaybackOutcome::Blocked;
        };

        let bytes = match self
            .http
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
        {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("Could not fetch audio: {}", err);
                return PlaybackOutcome::Blocked;
            }
        };

        let source = match Decoder::new(Cursor::new(bytes.to_vec())) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Could not decode audio: {}", err);
                return PlaybackOutcome::Blocked;
            }
        };

        if let Some(old) = self.sink.take() {
            old.stop();
        }

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        sink.play();
        self.sink = Some(sink);

        PlaybackOutcome::Ok
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) -> PlaybackOutcome {
        match &self.sink {
            Some(sink) => {
                sink.play();
                PlaybackOutcome::Ok
            }
            None => PlaybackOutcome::Blocked,
        }
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().map(|s| s.empty()).unwrap_or(false)
    }
}

fn print_songs(player: &Player) {
    if !player.query().is_empty() {
        println!("  filter: {}", player.query());
    }

    let visible = player.visible();
    if visible.is_empty() {
        println!("  (no songs)");
        return;
    }

    let current_id = player.current().map(|s| s.id);
    for (i, song) in visible.iter().enumerate() {
        let marker = if Some(song.id) == current_id { ">" } else { " " };
        println!(" {} {:>2}. {}", marker, i + 1, song.title);
    }
}

/// Map a 1-based index into the visible list to a song id.
fn resolve(player: &Player, arg: &str) -> Option<Uuid> {
    let index: usize = arg.trim().parse().ok()?;
    player
        .visible()
        .get(index.checked_sub(1)?)
        .map(|song| song.id)
}

fn status(player: &Player) -> String {
    let title = || {
        player
            .current()
            .map(|s| s.title.clone())
            .unwrap_or_else(|| "?".to_string())
    };

    match player.state() {
        PlayerState::Playing => format!("Playing: {}", title()),
        PlayerState::Paused => format!("Paused: {}", title()),
        PlayerState::Loaded => "Select a song".to_string(),
        PlayerState::Idle => "No songs loaded".to_string(),
    }
}

fn main() {
    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    let client = CatalogClient::new(&base);
    let songs = match client.fetch_songs() {
        Ok(songs) => songs,
        Err(err) => {
            eprintln!("Error fetching songs: {}", err);
            Vec::new()
        }
    };

    println!("shellac player - {} song(s) from {}", songs.len(), base);
    println!("commands: list, play <n>, pause, next, prev, search <text>, delete <n>, refresh, quit");

    let mut player = Player::new(songs);
    let mut audio = RodioAudio::new();

    let stdin = io::stdin();
    loop {
        // A source that played to its end triggers the same transition
        // as `next`.
        if player.is_playing() && audio.finished() {
            player.on_ended(&mut audio);
        }

        print!("{} > ", status(&player));
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }

        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => {}
            "list" | "ls" => print_songs(&player),
            "play" | "p" => match resolve(&player, arg) {
                Some(id) => {
                    if player.select(id, &mut audio) == Some(PlaybackOutcome::Blocked) {
                        println!("Playback blocked");
                    }
                }
                None => println!("No such song; try 'list'"),
            },
            "pause" | "toggle" => {
                if player.toggle(&mut audio) == PlaybackOutcome::Blocked
                    && player.current().is_none()
                {
                    println!("Nothing selected");
                }
            }
            "next" | "n" => {
                if player.next(&mut audio).is_none() {
                    println!("End of list");
                }
            }
            "prev" | "b" => {
                if player.previous(&mut audio).is_none() {
                    println!("Start of list");
                }
            }
            "search" | "/" => {
                player.set_query(arg);
                print_songs(&player);
            }
            "delete" | "rm" => match resolve(&player, arg) {
                Some(id) => match client.delete_song(id) {
                    Ok(()) => {
                        match client.fetch_songs() {
                            Ok(songs) => player.set_songs(songs),
                            Err(err) => eprintln!("Error refreshing songs: {}", err),
                        }
                        println!("Deleted");
                    }
                    Err(err) => eprintln!("Delete failed: {}", err),
                },
                None => println!("No such song; try 'list'"),
            },
            "refresh" => match client.fetch_songs() {
                Ok(songs) => {
                    println!("{} song(s)", songs.len());
                    player.set_songs(songs);
                }
                Err(err) => eprintln!("Error fetching songs: {}", err),
            },
            "quit" | "q" | "exit" => break,
            other => println!("Unknown command '{}'", other),
        }
    }
}
