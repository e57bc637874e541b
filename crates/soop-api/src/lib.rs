//! Client for the SOOP (sooplive.co.kr) live-streaming APIs.
//!
//! The crate covers the three calls needed to go from "streamer id" to a
//! playable HLS address: the station metadata probe, the original-quality
//! token negotiation and the stream assignment lookup. [`SoopChannel`]
//! bundles them behind the [`BroadcastSource`] trait.

pub mod client;
pub mod error;
pub mod models;
pub mod proxy;
pub mod quality;
pub mod source;
pub mod station;
pub mod stream_assign;
pub mod types;

pub use error::ApiError;
pub use source::{BroadcastSource, SoopChannel};
pub use types::{AccessToken, BroadcastInfo, PlaybackDescriptor, StreamerIdentity};
