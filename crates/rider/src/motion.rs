//! Where the rider reports itself.

use std::time::Duration;

use waypoint_common::Coordinates;
use waypoint_common::geo::destination;

/// Produces one position per reporting tick
#[derive(Debug, Clone)]
pub enum PositionSource {
    /// Always the same spot
    Fixed(Coordinates),
    /// Drives in a straight line at constant speed
    Simulated {
        position: Coordinates,
        heading_deg: f64,
        speed_kmh: f64,
        step: Duration,
    },
}

impl PositionSource {
    pub fn fixed(at: Coordinates) -> Self {
        Self::Fixed(at)
    }

    pub fn simulated(start: Coordinates, heading_deg: f64, speed_kmh: f64, step: Duration) -> Self {
        Self::Simulated {
            position: start,
            heading_deg,
            speed_kmh: speed_kmh.max(0.0),
            step,
        }
    }

    /// Current position, then advance by one step
    pub fn next_position(&mut self) -> Coordinates {
        match self {
            Self::Fixed(at) => *at,
            Self::Simulated {
                position,
                heading_deg,
                speed_kmh,
                step,
            } => {
                let current = *position;
                let km = *speed_kmh * step.as_secs_f64() / 3600.0;
                *position = destination(current, *heading_deg, km);
                current
            }
        }
    }
}
