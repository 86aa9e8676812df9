//! Page regions the controller reconciles.

use flowgic_logistics::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub text: String,
    pub class: String,
}

impl StatusBadge {
    pub fn for_status(status: OrderStatus) -> Self {
        Self {
            text: status.label().to_string(),
            class: status.css_class(),
        }
    }
}

/// The status picker; `""` is the placeholder option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSelect {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfitDisplay {
    pub text: String,
}

/// Raw form inputs, sent as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinancialForm {
    pub fuel_expenses: String,
    pub driver_cost: String,
}

/// Everything the controller reads from and writes to one order page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    /// e.g. `/requests/<id>/`
    pub resource_path: String,
    pub csrf_token: String,
    pub badge: StatusBadge,
    pub select: StatusSelect,
    pub profit: ProfitDisplay,
    pub form: FinancialForm,
}

impl OrderPage {
    pub fn new(resource_path: impl Into<String>, csrf_token: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            resource_path: resource_path.into(),
            csrf_token: csrf_token.into(),
            badge: StatusBadge::for_status(status),
            select: StatusSelect::default(),
            profit: ProfitDisplay::default(),
            form: FinancialForm::default(),
        }
    }

    pub fn with_profit(mut self, text: impl Into<String>) -> Self {
        self.profit.text = text.into();
        self
    }

    /// `<resource path>` + `action`, with exactly one slash between.
    pub fn endpoint(&self, action: &str) -> String {
        format!("{}/{}", self.resource_path.trim_end_matches('/'), action)
    }
}
