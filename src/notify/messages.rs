//! Guardian-facing text for each journey status.

use crate::interfaces::Notification;
use crate::journey::{JourneyEvent, JourneyStatus};

/// Build the guardian notification for a recorded event.
pub fn notification_for(event: &JourneyEvent) -> Notification {
    let child = &event.parties.child_ref;
    let escort = &event.parties.escort_ref;

    let (title, mut body) = match event.status {
        JourneyStatus::Pending => (
            "Journey Started",
            format!("The pickup journey for {child} has been initiated with {escort}."),
        ),
        JourneyStatus::Departed => (
            "Pickup Person Departed",
            format!("{escort} has departed to pick up {child}."),
        ),
        JourneyStatus::Picked => (
            "Child Picked Up",
            format!("{child} has been picked up by {escort} and is in transit."),
        ),
        JourneyStatus::Arrived => (
            "Arrived at Destination",
            format!("{child} has arrived at the destination with {escort}."),
        ),
        JourneyStatus::Completed => (
            "Journey Completed",
            format!("The journey for {child} has been completed successfully."),
        ),
        JourneyStatus::Cancelled => (
            "Journey Cancelled",
            format!("The journey for {child} has been cancelled."),
        ),
    };

    if let Some(location) = &event.location {
        body.push_str(&format!(" Location: {location}."));
    }

    Notification {
        journey_key: event.journey_key.clone(),
        guardian_ref: event.parties.guardian_ref.clone(),
        status: event.status,
        recorded_at: event.recorded_at,
        title: title.to_string(),
        body,
    }
}
