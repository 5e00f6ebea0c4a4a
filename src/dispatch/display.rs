use serde::Serialize;

use crate::models::request::RequestStatus;

/// Presentation metadata derived from the canonical state machine. UI
/// layers look this up instead of keeping their own status maps.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

pub fn for_status(status: RequestStatus) -> StatusDisplay {
    match status {
        RequestStatus::Pending => StatusDisplay {
            label: "Looking for a driver",
            color: "amber",
            icon: "clock",
        },
        RequestStatus::Accepted => StatusDisplay {
            label: "Driver assigned",
            color: "blue",
            icon: "user-check",
        },
        RequestStatus::DriverEnroute => StatusDisplay {
            label: "Driver on the way",
            color: "indigo",
            icon: "navigation",
        },
        RequestStatus::Arrived => StatusDisplay {
            label: "Driver at pickup",
            color: "purple",
            icon: "map-pin",
        },
        RequestStatus::InProgress => StatusDisplay {
            label: "Trip in progress",
            color: "cyan",
            icon: "truck",
        },
        RequestStatus::Completed => StatusDisplay {
            label: "Trip completed",
            color: "green",
            icon: "check-circle",
        },
        RequestStatus::Cancelled => StatusDisplay {
            label: "Cancelled",
            color: "red",
            icon: "x-circle",
        },
    }
}
