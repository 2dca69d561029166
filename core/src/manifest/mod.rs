//! Manifest model: the static description of a feature's tracks, their
//! dependencies and the task packets they execute.

mod load;
mod packet;
mod types;

pub use load::{find_manifest_dir, load, parse, track_for_packet, validate_tracks, MANIFEST_FILE_NAME};
pub use packet::{load_packet, parse_packet, Task};
pub use types::{Manifest, MergeStrategy, Schedulable, Track, TrackId, SUPPORTED_FORMAT_VERSION};
