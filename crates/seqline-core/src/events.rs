//! The decoded event stream a sequence diagram is laid out from.
//!
//! Events are produced by an external parser (or written by hand as JSON) and consumed in
//! order by the layout engine. Nothing here knows about geometry.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arrow head drawn at the callee end of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrowHead {
    /// Filled triangle; synchronous messages.
    #[default]
    Closed,
    /// Two strokes; asynchronous messages and answers.
    Open,
    /// Filled circle; broadcast messages.
    Rounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stroke {
    Solid,
    Dashed,
}

/// Side of the lifeline a self message loop is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

/// A message between two lifelines (`call` / `return`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<ArrowHead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<usize>,
}

/// A message a lifeline sends to itself (`selfCall` / `answerToSelf`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfMessageEvent {
    pub lifeline: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<ArrowHead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiagramEvent {
    #[serde(rename_all = "camelCase")]
    CreateLifeline {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Call(MessageEvent),
    Return(MessageEvent),
    SelfCall(SelfMessageEvent),
    AnswerToSelf(SelfMessageEvent),
    #[serde(rename_all = "camelCase")]
    Activate {
        lifeline: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread: Option<usize>,
    },
    Deactivate {
        lifeline: String,
    },
    Destroy {
        lifeline: String,
    },
    #[serde(rename_all = "camelCase")]
    OpenFragment {
        operator: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    FragmentSeparator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    CloseFragment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl DiagramEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DiagramEvent::CreateLifeline { .. } => "createLifeline",
            DiagramEvent::Call(_) => "call",
            DiagramEvent::Return(_) => "return",
            DiagramEvent::SelfCall(_) => "selfCall",
            DiagramEvent::AnswerToSelf(_) => "answerToSelf",
            DiagramEvent::Activate { .. } => "activate",
            DiagramEvent::Deactivate { .. } => "deactivate",
            DiagramEvent::Destroy { .. } => "destroy",
            DiagramEvent::OpenFragment { .. } => "openFragment",
            DiagramEvent::FragmentSeparator { .. } => "fragmentSeparator",
            DiagramEvent::CloseFragment { .. } => "closeFragment",
        }
    }

    /// Lifeline names this event refers to (excluding the one a `createLifeline` introduces).
    pub fn participants(&self) -> Vec<&str> {
        match self {
            DiagramEvent::Call(m) | DiagramEvent::Return(m) => vec![m.from.as_str(), m.to.as_str()],
            DiagramEvent::SelfCall(m) | DiagramEvent::AnswerToSelf(m) => vec![m.lifeline.as_str()],
            DiagramEvent::Activate { lifeline, .. }
            | DiagramEvent::Deactivate { lifeline }
            | DiagramEvent::Destroy { lifeline } => vec![lifeline.as_str()],
            DiagramEvent::CreateLifeline { .. }
            | DiagramEvent::OpenFragment { .. }
            | DiagramEvent::FragmentSeparator { .. }
            | DiagramEvent::CloseFragment { .. } => Vec::new(),
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(
            self,
            DiagramEvent::Call(_)
                | DiagramEvent::Return(_)
                | DiagramEvent::SelfCall(_)
                | DiagramEvent::AnswerToSelf(_)
        )
    }

    fn check_shape(&self, position: usize) -> Result<()> {
        let empty_name = match self {
            DiagramEvent::CreateLifeline { name, .. } => name.trim().is_empty(),
            DiagramEvent::OpenFragment { operator, .. } => operator.trim().is_empty(),
            other => other.participants().iter().any(|n| n.trim().is_empty()),
        };
        if empty_name {
            return Err(Error::InvalidEvent {
                position,
                message: format!("`{}` event has an empty name", self.kind_name()),
            });
        }
        Ok(())
    }
}

/// A decoded stream: the events plus an optional inline config object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStream {
    pub config: Option<Value>,
    pub events: Vec<DiagramEvent>,
}

/// Decodes an event stream from JSON.
///
/// Accepts either a bare array of events or `{ "config": {...}, "events": [...] }`. Each event
/// is decoded separately so an error can name the offending index.
pub fn parse_event_stream(text: &str) -> Result<EventStream> {
    let root: Value = serde_json::from_str(text).map_err(Error::EventJson)?;
    let (config, raw_events) = match root {
        Value::Array(items) => (None, items),
        Value::Object(mut map) => {
            let config = map.remove("config");
            if config.as_ref().is_some_and(|c| !c.is_object()) {
                return Err(Error::InvalidConfigJson {
                    message: "`config` must be a JSON object".to_string(),
                });
            }
            let events = match map.remove("events") {
                Some(Value::Array(items)) => items,
                Some(_) | None => {
                    return Err(Error::InvalidEvent {
                        position: 0,
                        message: "expected an `events` array".to_string(),
                    });
                }
            };
            (config, events)
        }
        _ => {
            return Err(Error::InvalidEvent {
                position: 0,
                message: "expected an array of events or an object with `events`".to_string(),
            });
        }
    };

    let mut events = Vec::with_capacity(raw_events.len());
    for (position, raw) in raw_events.into_iter().enumerate() {
        let event: DiagramEvent =
            serde_json::from_value(raw).map_err(|err| Error::InvalidEvent {
                position,
                message: err.to_string(),
            })?;
        event.check_shape(position)?;
        events.push(event);
    }
    tracing::debug!(count = events.len(), "decoded event stream");

    Ok(EventStream { config, events })
}
