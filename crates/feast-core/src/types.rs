//! # Domain Types
//!
//! Core domain types shared by the cart and the rider work session.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    MenuItem     │   │    RiderWork    │   │   WorkStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (job)       │   │  QUEUED         │       │
//! │  │  name           │   │  order_id       │   │  ASSIGNED       │       │
//! │  │  price (Money)  │   │  status         │   │  IN_PROGRESS    │       │
//! │  │  category       │   │  estimated_fee  │   │  COMPLETED      │       │
//! │  └─────────────────┘   └─────────────────┘   │  CANCELLED      │       │
//! │                                               └─────────────────┘       │
//! │  ┌─────────────────┐                                                    │
//! │  │  Availability   │   ONLINE / OFFLINE toggle acked by the work source│
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Menu items are owned by the catalog; the cart only keeps clones taken at
//! add time, so later price edits never reach a line already in the cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Menu Item
// =============================================================================

/// A menu item as served by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Catalog identifier of the item.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price in minor units.
    pub price: Money,

    /// Menu section, e.g. "Noodles" or "Drinks".
    pub category: String,

    /// Image URL, if the restaurant uploaded one.
    #[serde(default)]
    pub image: Option<String>,
}

impl MenuItem {
    /// Creates a menu item without an image.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        category: impl Into<String>,
    ) -> Self {
        MenuItem {
            id: id.into(),
            name: name.into(),
            price,
            category: category.into(),
            image: None,
        }
    }

    /// Sets the image URL.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

// =============================================================================
// Rider Availability
// =============================================================================

/// The rider's online toggle as reported to the work source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    /// Maps the session's `is_working` flag to an availability.
    pub fn from_working(is_working: bool) -> Self {
        if is_working {
            Availability::Online
        } else {
            Availability::Offline
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Online => write!(f, "ONLINE"),
            Availability::Offline => write!(f, "OFFLINE"),
        }
    }
}

// =============================================================================
// Work Status
// =============================================================================

/// Lifecycle of a delivery job.
///
/// ```text
/// QUEUED ──pull──► ASSIGNED ──start──► IN_PROGRESS ──complete──► COMPLETED
///    │                 │                    │
///    └─────────────────┴────────────────────┴──────────────────► CANCELLED
/// ```
///
/// `QUEUED` only exists server-side; a rider client observes its own job
/// moving `ASSIGNED → IN_PROGRESS → COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    Queued,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkStatus {
    /// Returns true for `COMPLETED` and `CANCELLED`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkStatus::Completed | WorkStatus::Cancelled)
    }

    /// Returns true if `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: WorkStatus) -> bool {
        use WorkStatus::*;
        matches!(
            (*self, next),
            (Queued, Assigned)
                | (Assigned, InProgress)
                | (InProgress, Completed)
                | (Queued | Assigned | InProgress, Cancelled)
        )
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkStatus::Queued => "QUEUED",
            WorkStatus::Assigned => "ASSIGNED",
            WorkStatus::InProgress => "IN_PROGRESS",
            WorkStatus::Completed => "COMPLETED",
            WorkStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Rider Work
// =============================================================================

/// A single delivery job. A rider holds at most one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RiderWork {
    /// Job identifier used for start/complete acks.
    pub id: String,

    /// The customer order this job delivers.
    pub order_id: String,

    pub status: WorkStatus,

    pub restaurant_name: String,
    pub restaurant_address: String,
    pub customer_name: String,
    pub delivery_address: String,

    /// Estimated rider payout.
    pub estimated_fee: Money,

    #[serde(default)]
    pub distance_km: Option<f64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub assigned_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RiderWork {
    /// Creates a queued job with empty address details.
    pub fn queued(id: impl Into<String>, order_id: impl Into<String>, estimated_fee: Money) -> Self {
        RiderWork {
            id: id.into(),
            order_id: order_id.into(),
            status: WorkStatus::Queued,
            restaurant_name: String::new(),
            restaurant_address: String::new(),
            customer_name: String::new(),
            delivery_address: String::new(),
            estimated_fee,
            distance_km: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Sets the pickup side of the job.
    pub fn pickup(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.restaurant_name = name.into();
        self.restaurant_address = address.into();
        self
    }

    /// Sets the drop-off side of the job.
    pub fn dropoff(mut self, customer: impl Into<String>, address: impl Into<String>) -> Self {
        self.customer_name = customer.into();
        self.delivery_address = address.into();
        self
    }

    /// Returns how long the job has been in progress (or took, once finished).
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let started = self.started_at?;
        Some(self.finished_at.unwrap_or(now) - started)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_status_transitions() {
        assert!(WorkStatus::Queued.can_transition_to(WorkStatus::Assigned));
        assert!(WorkStatus::Assigned.can_transition_to(WorkStatus::InProgress));
        assert!(WorkStatus::InProgress.can_transition_to(WorkStatus::Completed));
        assert!(WorkStatus::Assigned.can_transition_to(WorkStatus::Cancelled));

        assert!(!WorkStatus::Assigned.can_transition_to(WorkStatus::Completed));
        assert!(!WorkStatus::Completed.can_transition_to(WorkStatus::Cancelled));
        assert!(!WorkStatus::Cancelled.can_transition_to(WorkStatus::Assigned));
    }

    #[test]
    fn test_work_status_terminal() {
        assert!(WorkStatus::Completed.is_terminal());
        assert!(WorkStatus::Cancelled.is_terminal());
        assert!(!WorkStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_work_status_wire_format() {
        let json = serde_json::to_string(&WorkStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(WorkStatus::InProgress.to_string(), "IN_PROGRESS");
    }

    #[test]
    fn test_availability_from_working() {
        assert_eq!(Availability::from_working(true), Availability::Online);
        assert_eq!(Availability::from_working(false), Availability::Offline);
    }

    #[test]
    fn test_rider_work_elapsed() {
        let mut work = RiderWork::queued("w1", "o1", Money::from_cents(350));
        let now = Utc::now();
        assert!(work.elapsed(now).is_none());

        work.started_at = Some(now - chrono::Duration::minutes(12));
        assert_eq!(work.elapsed(now), Some(chrono::Duration::minutes(12)));
    }

    #[test]
    fn test_menu_item_camel_case() {
        let item = MenuItem::new("m1", "Pad Thai", Money::from_cents(5000), "Noodles")
            .with_image("https://img/m1.png");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["price"], 5000);
        assert_eq!(value["image"], "https://img/m1.png");
    }
}
