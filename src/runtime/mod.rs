mod channel;
mod context;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::{Collaborators, Context};
