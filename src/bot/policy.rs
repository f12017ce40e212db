//! The fixed decision policy that picks one reply path per message.
//!
//! Branches are checked in order and the first match wins:
//! availability lookup, appointment booking, knowledge-base answer, fallback.

use crate::collaborators::{NluResult, QnaAnswer};

pub const AVAILABILITY_INTENT: &str = "GetAvailability";
pub const AVAILABILITY_THRESHOLD: f64 = 0.85;
pub const BOOKING_INTENT: &str = "ScheduleAppointment";
pub const BOOKING_THRESHOLD: f64 = 0.6;
pub const TIME_ENTITY: &str = "time";
pub const FALLBACK_TEXT: &str = "Could you say that differently? I had trouble understanding it.";

/// The reply path chosen for a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Availability,
    Booking { time: String },
    Knowledge { answer: String },
    Fallback,
}

impl Route {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Availability => "availability",
            Self::Booking { .. } => "booking",
            Self::Knowledge { .. } => "knowledge",
            Self::Fallback => "fallback",
        }
    }
}

/// Scheduler-backed routes. Thresholds are strict: a score equal to the
/// threshold does not fire.
pub fn intent_route(nlu: &NluResult) -> Option<Route> {
    let score = nlu.top_score();

    if nlu.top_intent == AVAILABILITY_INTENT && score > AVAILABILITY_THRESHOLD {
        return Some(Route::Availability);
    }

    if nlu.top_intent == BOOKING_INTENT && score > BOOKING_THRESHOLD {
        if let Some(time) = nlu.first_entity(TIME_ENTITY) {
            return Some(Route::Booking {
                time: time.text.clone(),
            });
        }
    }

    None
}

/// Knowledge-base answer when one exists, otherwise the fallback.
/// `None` means the QnA call produced no result at all.
pub fn answer_route(answers: Option<&[QnaAnswer]>) -> Route {
    match answers.and_then(|a| a.first()) {
        Some(top) => Route::Knowledge {
            answer: top.answer.clone(),
        },
        None => Route::Fallback,
    }
}
