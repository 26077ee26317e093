//! Cross-context change propagation.
//!
//! [`ChangeChannel`] carries notifications between contexts,
//! [`ChangeBroadcaster`] turns them into cache invalidations, and
//! [`RefreshBinder`] reacts to the resulting data-updated events.

pub mod broadcaster;
pub mod channel;
pub mod refresh;

pub use broadcaster::{ChangeBroadcaster, DataUpdated, UpdateSource};
pub use channel::{CHANNEL_CAPACITY, ChangeChannel, ChannelEvent, MemoryChannel, SqliteChannel};
pub use refresh::{DEFAULT_REFRESH_DELAY, RefreshBinder, RefreshCallback};
