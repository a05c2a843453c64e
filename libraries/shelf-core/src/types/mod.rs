mod chapter;
mod device;
mod ids;
mod session;

pub use chapter::Chapter;
pub use device::DeviceInfo;
pub use ids::{EpisodeId, LibraryItemId, SessionId};
pub use session::{PlayMethod, PlaybackSession, RawAudioTrack, StartSessionRequest, SyncPayload};
