mod catalog;
mod message;
mod stream_event;
mod turn;

pub use catalog::*;
pub use message::*;
pub use stream_event::*;
pub use turn::*;
