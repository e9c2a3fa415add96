//! Pointer drag-and-drop rescheduling. The gesture is an explicit state
//! machine (idle -> dragging -> idle) so its lifetime and cancellation are
//! auditable; nothing here mutates the event set directly. A resolved drop
//! yields a patch the caller routes through the store.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, trace};

use crate::event::Event;
use crate::timeaxis::MINUTES_PER_DAY;

/// Drop times snap to this granularity.
pub const SNAP_MINUTES: i64 = 15;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        event_id: String,
        /// Pixel distance between the pointer-down point and the top edge
        /// of the dragged block.
        grab_offset_px: f64,
    },
}

/// Start/end replacement produced by a resolved drop; duration always
/// equals the original event's duration exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct DropPatch {
    pub event_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DragState {
    pub fn begin(&mut self, event_id: &str, grab_offset_px: f64) {
        trace!(event_id, grab_offset_px, "drag started");
        *self = DragState::Dragging {
            event_id: event_id.to_string(),
            grab_offset_px,
        };
    }

    pub fn cancel(&mut self) {
        if !matches!(self, DragState::Idle) {
            trace!("drag cancelled");
        }
        *self = DragState::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }

    /// Resolve the drop against the current snapshot. Returns `None` and
    /// silently abandons the gesture when the dragged event no longer
    /// exists, the container has no measurable height, or the drop landed
    /// outside it. Either way the machine returns to idle.
    pub fn resolve_drop(
        &mut self,
        events: &[Event],
        target_day: NaiveDate,
        drop_px: f64,
        container_height_px: f64,
    ) -> Option<DropPatch> {
        let DragState::Dragging {
            event_id,
            grab_offset_px,
        } = std::mem::take(self)
        else {
            return None;
        };

        if container_height_px <= 0.0 {
            debug!(event_id, "drop abandoned: container has no height");
            return None;
        }
        if drop_px < 0.0 || drop_px > container_height_px {
            debug!(event_id, drop_px, "drop abandoned: outside the grid");
            return None;
        }

        let Some(event) = events.iter().find(|event| event.id == event_id) else {
            debug!(event_id, "drop abandoned: event no longer in the set");
            return None;
        };

        let minutes_per_pixel = MINUTES_PER_DAY as f64 / container_height_px;
        let raw_minutes = drop_px * minutes_per_pixel - grab_offset_px * minutes_per_pixel;
        let snapped = snap_to_grid(raw_minutes);

        let start = target_day.and_time(NaiveTime::MIN) + Duration::minutes(snapped);
        let end = start + event.duration();

        debug!(
            event_id,
            raw_minutes,
            snapped,
            start = %start,
            "drop resolved"
        );

        Some(DropPatch {
            event_id,
            start,
            end,
        })
    }
}

/// Round to the nearest snap boundary, kept on the day's own axis.
fn snap_to_grid(raw_minutes: f64) -> i64 {
    let snapped = (raw_minutes / SNAP_MINUTES as f64).round() as i64 * SNAP_MINUTES;
    snapped.clamp(0, MINUTES_PER_DAY - SNAP_MINUTES)
}
