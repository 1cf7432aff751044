//! Messages that reach the kiosk from outside: ingredient targets published
//! by the recipe tablet, and status codes from the robot.
//!
//! Both come in as text from whatever bus client is bridged in. A target is
//! a JSON object:
//!
//! ```text
//! {"ingredient": "Flour", "totalValue": 550}
//! ```
//!
//! A robot status is either `{"status": 3}` or just the bare number, which is
//! what the MQTT bridge forwards. Anything else is logged and dropped; a bad
//! message never takes the kiosk down.

use log::warn;
use serde::{Deserialize, Serialize};

/// "Weigh this much of this ingredient next."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMessage {
    /// Display name of the ingredient.
    pub ingredient: String,
    /// Target weight in grams.
    pub total_value: f64,
}

impl TargetMessage {
    /// Builds a target for `grams` of `ingredient`.
    pub fn new(ingredient: impl Into<String>, grams: f64) -> Self {
        Self {
            ingredient: ingredient.into(),
            total_value: grams,
        }
    }
}

/// Status code reported by the robot.
pub type RobotStatus = u16;

/// A decoded message from the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteMessage {
    /// New ingredient target for the scale.
    Target(TargetMessage),
    /// Robot status update.
    RobotStatus(RobotStatus),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Target(TargetMessage),
    Status { status: RobotStatus },
}

impl RemoteMessage {
    /// Decodes one message, or logs why it could not and returns `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(code) = text.parse::<RobotStatus>() {
            return Some(RemoteMessage::RobotStatus(code));
        }

        match serde_json::from_str::<Wire>(text) {
            Ok(Wire::Target(target)) => Some(RemoteMessage::Target(target)),
            Ok(Wire::Status { status }) => Some(RemoteMessage::RobotStatus(status)),
            Err(e) => {
                warn!("Error parsing message data {:?}: {}", text, e);
                None
            }
        }
    }
}
