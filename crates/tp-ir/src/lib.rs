//! Core value types for the tidepool groove engine.
//!
//! Everything here is plain data: trigger requests flowing from the groove
//! to the scheduler, directives flowing in from the advisory layer,
//! interaction feeds, and derived control parameters.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod control;
mod directive;
mod interaction;
mod trigger;

pub use control::{ControlParams, BPM_RANGE, ROOT_RANGE, SWING_RANGE};
pub use directive::{
    BassMode, Directive, DirectiveError, InstrumentModes, LeadMode, MappingAdjustments, Mood,
    Scale, TextureMode, VoiceMode, BPM_MAX, BPM_MIN, SWING_MAX,
};
pub use interaction::{clamp01, InteractionEvent, InteractionSnapshot};
pub use trigger::{InstrumentName, Origin, Role, TriggerRequest, INSTRUMENT_NAME_LEN};
