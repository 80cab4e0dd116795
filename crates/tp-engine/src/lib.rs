//! Real-time groove engine for tidepool.
//!
//! A lookahead scheduler feeds a six-voice bank from a step-sequenced
//! groove, all driven by periodic timers on a single audio clock.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod control;
mod event_queue;
mod frame;
mod graph;
pub mod groove;
pub mod harmony;
mod live;
mod scheduler;
pub mod timer;
pub mod voice;

pub use control::{blend, derive_params};
pub use event_queue::{EventQueue, DEFAULT_CAPACITY};
pub use frame::Frame;
pub use graph::{OutputGraph, MAX_NOTES};
pub use groove::{run_groove, GrooveState};
pub use live::{Rig, RigConfig, INBOX_CAPACITY};
pub use scheduler::{Scheduler, DEFAULT_LOOKAHEAD_MS};
pub use timer::{Task, TimerHost, TimerId, TimerQueue};
pub use voice::{Instrument, VoiceBank};
