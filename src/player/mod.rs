//! Player client: catalog fetch and playback state machine.
//!
//! The audio element sits behind the [`AudioSource`] trait; the shipped
//! implementation wraps rodio in the `shellac-player` binary, tests use
//! a scripted fake.

pub mod client;
pub mod model;


pub use client::{CatalogClient, ClientError};
pub use model::{AudioSource, PlaybackOutcome, Player, PlayerState};
