use serde::{Deserialize, Serialize};

use crate::content::EnrichedFact;
use crate::place::Place;

/// Frames pushed from the server to a connected viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundMessage {
    #[serde(rename = "send location")]
    Location(Place),
    #[serde(rename = "send facts")]
    Facts(Vec<EnrichedFact>),
}

impl OutboundMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Location(_) => "send location",
            Self::Facts(_) => "send facts",
        }
    }
}

/// Control frames sent by the viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum InboundMessage {
    #[serde(rename = "done reading")]
    DoneReading,
}

impl InboundMessage {
    /// Decode a text frame. Accepts the JSON envelope or the bare event name.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed == "done reading" {
            return Some(Self::DoneReading);
        }
        serde_json::from_str(trimmed).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_wire_shape() {
        let msg = OutboundMessage::Location(Place::new("Reno, Nevada, USA"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "send location");
        assert_eq!(json["data"], "Reno, Nevada, USA");
    }

    #[test]
    fn facts_wire_shape() {
        let msg = OutboundMessage::Facts(vec![EnrichedFact {
            title: "Truckee River".into(),
            description: "Flows through downtown.".into(),
            images: vec!["https://upload.example/river.jpg".into()],
        }]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "send facts");
        assert_eq!(json["data"][0]["title"], "Truckee River");
        assert_eq!(json["data"][0]["images"][0], "https://upload.example/river.jpg");
        assert_eq!(msg.event_name(), "send facts");
    }

    #[test]
    fn parses_done_reading_envelope() {
        assert_eq!(
            InboundMessage::parse(r#"{"event":"done reading"}"#),
            Some(InboundMessage::DoneReading)
        );
    }

    #[test]
    fn parses_bare_done_reading() {
        assert_eq!(InboundMessage::parse(" done reading\n"), Some(InboundMessage::DoneReading));
    }

    #[test]
    fn rejects_unknown_events() {
        assert_eq!(InboundMessage::parse(r#"{"event":"start flying"}"#), None);
        assert_eq!(InboundMessage::parse("hello"), None);
    }
}
