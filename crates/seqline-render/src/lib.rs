#![forbid(unsafe_code)]

//! Headless, single-pass sequence diagram layout.
//!
//! Events go in one at a time; every element reserves its vertical space on the
//! [`paint::PaintDevice`] before its geometry is computed, so the canvas never needs a second
//! pass. The output is a list of positioned [`model::Drawable`]s which [`paint`] lowers to
//! renderer-neutral primitives and [`svg`] turns into an SVG document.

pub mod arrow;
pub mod config;
pub mod diagram;
pub mod fragment;
pub mod lifeline;
pub mod model;
pub mod paint;
pub mod svg;
pub mod text;

use crate::config::LayoutConfig;
use crate::diagram::Diagram;
use crate::model::SequenceLayout;
use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use seqline_core::{DiagramEvent, EventStream, SeqlineConfig};
use std::sync::Arc;

/// Bad input: the event stream says something a sequence diagram cannot mean.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("unknown lifeline `{name}`")]
    UnknownLifeline { name: String },
    #[error("lifeline `{name}` was already destroyed")]
    TerminatedLifeline { name: String },
    #[error("lifeline `{name}` already exists")]
    DuplicateLifeline { name: String },
    #[error("lifeline `{name}` is not active")]
    NotActive { name: String },
    #[error("closing a fragment that was never opened")]
    FragmentNotOpen,
    #[error("closing fragment `{id}`, which was never opened")]
    UnknownFragment { id: String },
    #[error("malformed nesting: closing `{found}` while `{expected}` is innermost")]
    MalformedNesting { expected: String, found: String },
    #[error("fragment separator outside of any fragment")]
    NoOpenFragment,
}

/// An engine bug: an invariant of the layout pass did not hold.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("internal layout fault (event {position:?}): {message}")]
pub struct InternalFault {
    pub position: Option<usize>,
    pub message: String,
}

impl InternalFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            position: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("event {position}: {kind}")]
    Semantic {
        position: usize,
        kind: SemanticError,
    },
    #[error(transparent)]
    Internal(#[from] InternalFault),
    #[error(transparent)]
    Core(#[from] seqline_core::Error),
}

impl Error {
    pub fn semantic(position: usize, kind: SemanticError) -> Self {
        Self::Semantic { position, kind }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Error::Semantic { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    /// Index of the offending event, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Semantic { position, .. } => Some(*position),
            Error::Internal(fault) => fault.position,
            Error::Core(seqline_core::Error::InvalidEvent { position, .. }) => Some(*position),
            Error::Core(_) => None,
        }
    }

    /// Attaches an event position to an internal fault that does not carry one yet.
    pub(crate) fn at(self, position: usize) -> Self {
        match self {
            Error::Internal(mut fault) if fault.position.is_none() => {
                fault.position = Some(position);
                Error::Internal(fault)
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    pub config: LayoutConfig,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
            config: LayoutConfig::default(),
        }
    }
}

impl LayoutOptions {
    pub fn with_config(mut self, config: &SeqlineConfig) -> Self {
        self.config = LayoutConfig::from_config(config);
        self
    }

    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer + Send + Sync>) -> Self {
        self.text_measurer = measurer;
        self
    }
}

/// Lays out a complete event stream in one pass.
pub fn layout_events(events: &[DiagramEvent], options: &LayoutOptions) -> Result<SequenceLayout> {
    let mut diagram = Diagram::new(&options.config, options.text_measurer.as_ref());
    for (position, event) in events.iter().enumerate() {
        diagram.process(position, event)?;
    }
    let device = diagram.finish()?;
    Ok(device.into_layout())
}

/// Lays out a decoded stream, merging its inline config over `base`.
pub fn layout_stream(
    stream: &EventStream,
    base: &SeqlineConfig,
    text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
) -> Result<SequenceLayout> {
    let mut config = base.clone();
    if let Some(inline) = &stream.config {
        config.deep_merge(inline);
    }
    let options = LayoutOptions::default()
        .with_config(&config)
        .with_text_measurer(text_measurer);
    layout_events(&stream.events, &options)
}
