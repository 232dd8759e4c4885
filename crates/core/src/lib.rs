//! Domain core for the Rinkmark frame-annotation service.
//!
//! Everything here is HTTP-agnostic: the segment codec, the per-user
//! annotation store, the video metadata cache, the range streamer, and the
//! assignment matcher. The API crate wires these together.

pub mod annotation_store;
pub mod assignment;
pub mod byte_range;
pub mod error;
pub mod ffmpeg;
pub mod keyed_lock;
pub mod layout;
pub mod metadata_cache;
pub mod persist;
pub mod roles;
pub mod segments;
pub mod streamer;
pub mod types;
pub mod video_library;
