//! Playback control subsystem
//!
//! The modules here form a dependency chain, leaves first: shutdown tracking,
//! the push-to-pull frame queue, the playback state machine, the session
//! controller facade, and finally the session composition that wires one
//! backend to one or two frame queues.

pub mod backend;
pub mod controller;
pub mod events;
pub mod frame_queue;
pub mod machine;
pub mod session;
pub mod shutdown;
