//! Order fulfilment states.
//!
//! `DeliveryStatus` moves forward along
//! `processing -> confirmed -> packed -> shipped -> out_for_delivery -> delivered`;
//! `cancelled` can be reached from any state that is not terminal.
//! `OrderStatus` is the coarse commercial state staff set separately.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("unknown delivery status {0}")]
    UnknownDeliveryStatus(String),

    #[error("unknown order status {0}")]
    UnknownOrderStatus(String),

    #[error("order is already {0}")]
    Terminal(DeliveryStatus),

    #[error("cannot move delivery status from {from} to {to}")]
    NotAllowed {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Processing,
    Confirmed,
    Packed,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

const HAPPY_PATH: [DeliveryStatus; 6] = [
    DeliveryStatus::Processing,
    DeliveryStatus::Confirmed,
    DeliveryStatus::Packed,
    DeliveryStatus::Shipped,
    DeliveryStatus::OutForDelivery,
    DeliveryStatus::Delivered,
];

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Processing => "processing",
            DeliveryStatus::Confirmed => "confirmed",
            DeliveryStatus::Packed => "packed",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Position on the happy path; `None` for `Cancelled`.
    fn step(&self) -> Option<usize> {
        HAPPY_PATH.iter().position(|s| s == self)
    }

    /// Every state staff may move to from here.
    pub fn allowed_next(&self) -> Vec<DeliveryStatus> {
        if self.is_terminal() {
            return Vec::new();
        }
        let mut next: Vec<DeliveryStatus> = match self.step() {
            Some(step) => HAPPY_PATH.iter().skip(step + 1).copied().collect(),
            None => Vec::new(),
        };
        next.push(DeliveryStatus::Cancelled);
        next
    }

    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn transition_to(self, next: DeliveryStatus) -> Result<DeliveryStatus, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if !self.can_transition_to(next) {
            return Err(TransitionError::NotAllowed {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DeliveryStatus::Processing),
            "confirmed" => Ok(DeliveryStatus::Confirmed),
            "packed" => Ok(DeliveryStatus::Packed),
            "shipped" => Ok(DeliveryStatus::Shipped),
            "out_for_delivery" => Ok(DeliveryStatus::OutForDelivery),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            other => Err(TransitionError::UnknownDeliveryStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Coarse status implied by reaching a delivery state, if any.
    pub fn implied_by(delivery: DeliveryStatus) -> Option<OrderStatus> {
        match delivery {
            DeliveryStatus::Confirmed => Some(OrderStatus::Confirmed),
            DeliveryStatus::Delivered => Some(OrderStatus::Completed),
            DeliveryStatus::Cancelled => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(TransitionError::UnknownOrderStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn happy_path_moves_one_step_at_a_time() -> TestResult {
        let mut status = DeliveryStatus::Processing;
        for next in HAPPY_PATH.iter().skip(1) {
            status = status.transition_to(*next)?;
        }
        assert_eq!(status, DeliveryStatus::Delivered);
        Ok(())
    }

    #[test]
    fn forward_jumps_are_allowed() -> TestResult {
        assert_eq!(
            DeliveryStatus::Confirmed.transition_to(DeliveryStatus::Shipped)?,
            DeliveryStatus::Shipped
        );
        Ok(())
    }

    #[test]
    fn backwards_and_repeat_are_rejected() {
        assert_eq!(
            DeliveryStatus::Shipped.transition_to(DeliveryStatus::Packed),
            Err(TransitionError::NotAllowed {
                from: DeliveryStatus::Shipped,
                to: DeliveryStatus::Packed,
            })
        );
        assert!(
            DeliveryStatus::Packed
                .transition_to(DeliveryStatus::Packed)
                .is_err()
        );
    }

    #[test]
    fn cancel_from_any_non_terminal() {
        for status in &HAPPY_PATH[..5] {
            assert!(status.can_transition_to(DeliveryStatus::Cancelled), "{status}");
        }
    }

    #[test]
    fn terminal_states_are_final() {
        assert_eq!(
            DeliveryStatus::Delivered.transition_to(DeliveryStatus::Cancelled),
            Err(TransitionError::Terminal(DeliveryStatus::Delivered))
        );
        assert!(DeliveryStatus::Cancelled.allowed_next().is_empty());
    }

    #[test]
    fn string_round_trip_matches_storage_values() -> TestResult {
        assert_eq!(
            "out_for_delivery".parse::<DeliveryStatus>()?,
            DeliveryStatus::OutForDelivery
        );
        assert_eq!(DeliveryStatus::OutForDelivery.as_str(), "out_for_delivery");
        assert!("returned".parse::<DeliveryStatus>().is_err());
        Ok(())
    }

    #[test]
    fn coarse_status_follows_key_delivery_states() {
        assert_eq!(
            OrderStatus::implied_by(DeliveryStatus::Delivered),
            Some(OrderStatus::Completed)
        );
        assert_eq!(OrderStatus::implied_by(DeliveryStatus::Packed), None);
    }
}
