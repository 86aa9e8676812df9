use core::str::FromStr;

use serde::{Deserialize, Serialize};

use flowgic_core::DomainError;

/// Order lifecycle status.
///
/// The set is closed: codes are what clients send and receive, labels are
/// what they display, and `css_class` names the badge style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Assigned,
    Loading,
    InTransit,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Created,
        OrderStatus::Assigned,
        OrderStatus::Loading,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn code(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Loading => "loading",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Assigned => "Assigned",
            OrderStatus::Loading => "Loading",
            OrderStatus::InTransit => "In transit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn css_class(self) -> String {
        format!("status-{}", self.code())
    }

    /// Look up a status by its wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    /// Parse a status code as submitted by a client.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.is_empty() {
            return Err(DomainError::validation("Status is required"));
        }
        Self::from_code(code).ok_or_else(|| DomainError::validation("Invalid status"))
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_labels_and_classes_line_up() {
        assert_eq!(OrderStatus::InTransit.code(), "in_transit");
        assert_eq!(OrderStatus::InTransit.label(), "In transit");
        assert_eq!(OrderStatus::Completed.css_class(), "status-completed");

        for s in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(s.code()), Some(s));
            assert_eq!(serde_json::to_value(s).unwrap(), s.code());
        }
    }

    #[test]
    fn parse_reports_missing_and_unknown_codes() {
        assert_eq!(
            "".parse::<OrderStatus>(),
            Err(DomainError::validation("Status is required"))
        );
        assert_eq!(
            "   ".parse::<OrderStatus>(),
            Err(DomainError::validation("Status is required"))
        );
        assert_eq!(
            "teleported".parse::<OrderStatus>(),
            Err(DomainError::validation("Invalid status"))
        );
        assert_eq!(" delivered ".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
    }
}
