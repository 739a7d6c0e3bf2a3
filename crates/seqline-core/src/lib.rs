#![forbid(unsafe_code)]

//! Sequence diagram event model + configuration (headless).
//!
//! This crate describes *what* a diagram says: an ordered stream of lifeline, message,
//! activation and fragment events, and the configuration object the layout engine reads.
//! Layout lives in `seqline-render`.

pub mod config;
pub mod error;
pub mod events;

pub use config::SeqlineConfig;
pub use error::{Error, Result};
pub use events::{
    ArrowHead, DiagramEvent, EventStream, MessageEvent, SelfMessageEvent, Side, Stroke,
    parse_event_stream,
};

#[cfg(test)]
mod tests;
