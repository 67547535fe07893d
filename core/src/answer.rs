use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which answer payload a deployment of the Answer Service produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerKind {
    #[default]
    Generic,
    Reservation,
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKind::Generic => write!(f, "generic"),
            AnswerKind::Reservation => write!(f, "reservation"),
        }
    }
}

impl FromStr for AnswerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(AnswerKind::Generic),
            "reservation" => Ok(AnswerKind::Reservation),
            other => Err(format!(
                "unknown answer kind '{}', expected 'generic' or 'reservation'",
                other
            )),
        }
    }
}

/// A payload contract the query form can be parameterized over.
///
/// The form itself never looks inside an answer; it only stores it. Shapes
/// provide a post-deserialization check and a plain-text rendering.
pub trait AnswerShape:
    DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static
{
    const KIND: AnswerKind;

    /// Checks run after the body deserialized, before history is touched.
    /// Also guards answers built in code, which serde never sees.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Lines shown for this answer in the history list. The first line is the heading.
    fn render_lines(&self) -> Vec<String>;
}

/// `{ summary, confidence }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericAnswer {
    pub summary: String,
    pub confidence: f64,
}

impl AnswerShape for GenericAnswer {
    const KIND: AnswerKind = AnswerKind::Generic;

    fn validate(&self) -> Result<(), String> {
        if !self.confidence.is_finite() {
            return Err(format!("confidence is not a finite number: {}", self.confidence));
        }
        Ok(())
    }

    fn render_lines(&self) -> Vec<String> {
        vec![
            self.summary.clone(),
            format!("Confidence: {}", self.confidence),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationAction {
    Reserve,
    Cancel,
    Modify,
    Unknown,
}

impl fmt::Display for ReservationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReservationAction::Reserve => "reserve",
            ReservationAction::Cancel => "cancel",
            ReservationAction::Modify => "modify",
            ReservationAction::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Structured reservation intent extracted by the service. Any field but
/// `action` may be `null` or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationAnswer {
    #[serde(default)]
    pub hotel_name: Option<String>,
    #[serde(default)]
    pub hotel_address: Option<String>,
    #[serde(default)]
    pub reservation_date: Option<String>,
    #[serde(default)]
    pub reservation_time: Option<String>,
    #[serde(default)]
    pub reservation_for_persons: Option<u32>,
    pub action: ReservationAction,
}

impl AnswerShape for ReservationAnswer {
    const KIND: AnswerKind = AnswerKind::Reservation;

    fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Action: {}", self.action)];
        if let Some(name) = &self.hotel_name {
            lines.push(format!("Hotel: {}", name));
        }
        if let Some(address) = &self.hotel_address {
            lines.push(format!("Address: {}", address));
        }
        if let Some(date) = &self.reservation_date {
            lines.push(format!("Date: {}", date));
        }
        if let Some(time) = &self.reservation_time {
            lines.push(format!("Time: {}", time));
        }
        if let Some(persons) = self.reservation_for_persons {
            lines.push(format!("Persons: {}", persons));
        }
        lines
    }
}
