use serde_json::Value;
use tracing::warn;

use flowgic_logistics::OrderStatus;

use crate::config::{ClientConfig, Messages};
use crate::message::MessageBanner;
use crate::page::{OrderPage, StatusBadge};
use crate::transport::Transport;
use crate::types::{RequestBody, UpdateRequest, UpdateResponse};

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing to send (placeholder selection).
    Skipped,
    /// Server confirmed; the page now shows the new data.
    Applied,
    /// Server said no, with this text shown to the user.
    Rejected(String),
    /// The request or its response was unusable.
    NetworkError,
}

/// Why a confirmed response could not be applied to the page.
enum ApplyError {
    /// Well-formed but unusable; shown as-is in red.
    Logical(String),
    /// Violates the response contract; treated as a transport failure.
    Malformed(String),
}

/// Drives the order page: one method per user gesture.
pub struct OrderUpdateController<T> {
    transport: T,
    page: OrderPage,
    banner: MessageBanner,
    messages: Messages,
}

impl<T: Transport> OrderUpdateController<T> {
    pub fn new(transport: T, page: OrderPage, config: &ClientConfig) -> Self {
        Self {
            transport,
            page,
            banner: MessageBanner::new(config.hide_delay()),
            messages: config.messages.clone(),
        }
    }

    pub fn page(&self) -> &OrderPage {
        &self.page
    }

    /// For user input only (form fields); server-derived regions are
    /// written by the controller.
    pub fn page_mut(&mut self) -> &mut OrderPage {
        &mut self.page
    }

    pub fn banner(&self) -> &MessageBanner {
        &self.banner
    }

    /// The user picked `value` in the status select.
    pub async fn select_status(&mut self, value: &str) -> UpdateOutcome {
        let value = value.trim();
        if value.is_empty() {
            return UpdateOutcome::Skipped;
        }
        self.page.select.value = value.to_string();

        let request = UpdateRequest {
            path: self.page.endpoint("status/"),
            body: RequestBody::Form(vec![("status".into(), value.to_string())]),
            csrf_header: Some(self.page.csrf_token.clone()),
        };
        let success_text = self.messages.status_updated.clone();
        let unknown_prefix = self.messages.unknown_status.clone();

        self.run_update(request, &success_text, move |page, response| {
            let code = response
                .str_field("status")
                .ok_or_else(|| ApplyError::Malformed("missing `status`".into()))?;
            let display = response
                .str_field("status_display")
                .ok_or_else(|| ApplyError::Malformed("missing `status_display`".into()))?;
            let status = OrderStatus::from_code(code)
                .ok_or_else(|| ApplyError::Logical(format!("{unknown_prefix}: {code}")))?;

            page.badge = StatusBadge {
                text: display.to_string(),
                class: status.css_class(),
            };
            page.select.value.clear();
            Ok(())
        })
        .await
    }

    /// The user submitted the cost form.
    pub async fn submit_financials(&mut self) -> UpdateOutcome {
        let form = &self.page.form;
        let request = UpdateRequest {
            path: self.page.endpoint("update-financials/"),
            body: RequestBody::Multipart(vec![
                ("fuel_expenses".into(), form.fuel_expenses.clone()),
                ("driver_cost".into(), form.driver_cost.clone()),
                ("csrfmiddlewaretoken".into(), self.page.csrf_token.clone()),
            ]),
            csrf_header: None,
        };
        let success_text = self.messages.financials_updated.clone();

        self.run_update(request, &success_text, |page, response| {
            page.profit.text = match response.field("profit") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(ApplyError::Malformed("missing `profit`".into())),
            };
            Ok(())
        })
        .await
    }

    /// Send, classify, and apply only confirmed data. `apply` works on a
    /// copy of the page so a failed apply leaves it untouched.
    async fn run_update<F>(&mut self, request: UpdateRequest, success_text: &str, apply: F) -> UpdateOutcome
    where
        F: FnOnce(&mut OrderPage, &UpdateResponse) -> Result<(), ApplyError>,
    {
        let path = request.path.clone();
        let response = match self
            .transport
            .post(request)
            .await
            .and_then(UpdateResponse::from_value)
        {
            Ok(response) => response,
            Err(err) => {
                warn!(path = %path, error = %err, "order update failed in transport");
                self.banner.show_error(&self.messages.network_error);
                return UpdateOutcome::NetworkError;
            }
        };

        if !response.success {
            let text = response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| self.messages.generic_error.clone());
            self.banner.show_error(&text);
            return UpdateOutcome::Rejected(text);
        }

        let mut next = self.page.clone();
        match apply(&mut next, &response) {
            Ok(()) => {
                self.page = next;
                self.banner.show_success(success_text);
                UpdateOutcome::Applied
            }
            Err(ApplyError::Logical(text)) => {
                self.banner.show_error(&text);
                UpdateOutcome::Rejected(text)
            }
            Err(ApplyError::Malformed(detail)) => {
                warn!(path = %path, error = %detail, "order update response violates the contract");
                self.banner.show_error(&self.messages.network_error);
                UpdateOutcome::NetworkError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Tone;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct MockTransport {
        replies: Mutex<VecDeque<Result<Value, TransportError>>>,
        seen: Mutex<Vec<UpdateRequest>>,
    }

    impl MockTransport {
        fn replying(replies: Vec<Result<Value, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<UpdateRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(&self, request: UpdateRequest) -> Result<Value, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("no reply scripted".into())))
        }
    }

    fn page() -> OrderPage {
        OrderPage::new("/requests/abc/", "csrf-1", OrderStatus::Assigned).with_profit("0.00")
    }

    fn controller(transport: &Arc<MockTransport>) -> OrderUpdateController<Arc<MockTransport>> {
        OrderUpdateController::new(transport.clone(), page(), &ClientConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_status_updates_badge_and_resets_select() {
        let transport = MockTransport::replying(vec![Ok(json!({
            "success": true, "status": "completed", "status_display": "Completed"
        }))]);
        let mut ctl = controller(&transport);

        assert_eq!(ctl.select_status("completed").await, UpdateOutcome::Applied);

        assert_eq!(ctl.page().badge.text, "Completed");
        assert_eq!(ctl.page().badge.class, "status-completed");
        assert_eq!(ctl.page().select.value, "");
        let shown = ctl.banner().snapshot();
        assert_eq!((shown.text.as_str(), shown.tone, shown.visible), ("Status updated", Tone::Success, true));

        assert_eq!(
            transport.requests(),
            vec![UpdateRequest {
                path: "/requests/abc/status/".into(),
                body: RequestBody::Form(vec![("status".into(), "completed".into())]),
                csrf_header: Some("csrf-1".into()),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_selection_sends_nothing() {
        let transport = MockTransport::replying(vec![]);
        let mut ctl = controller(&transport);

        assert_eq!(ctl.select_status("").await, UpdateOutcome::Skipped);
        assert_eq!(ctl.select_status("   ").await, UpdateOutcome::Skipped);
        assert!(transport.requests().is_empty());
        assert!(!ctl.banner().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_text_is_shown_verbatim_and_badge_kept() {
        let transport = MockTransport::replying(vec![Ok(json!({"success": false, "error": "X"}))]);
        let mut ctl = controller(&transport);

        assert_eq!(ctl.select_status("loading").await, UpdateOutcome::Rejected("X".into()));
        assert_eq!(ctl.page().badge, page().badge);
        let shown = ctl.banner().snapshot();
        assert_eq!((shown.text.as_str(), shown.tone), ("X", Tone::Error));

        // Errors do not auto-hide.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(ctl.banner().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_error_text_falls_back_to_generic() {
        let transport = MockTransport::replying(vec![Ok(json!({"success": false}))]);
        let mut ctl = controller(&transport);

        assert_eq!(
            ctl.select_status("loading").await,
            UpdateOutcome::Rejected("An error occurred".into())
        );
        assert_eq!(ctl.banner().snapshot().text, "An error occurred");
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_show_network_error_and_touch_nothing() {
        let transport = MockTransport::replying(vec![
            Err(TransportError::Network("connection refused".into())),
            Err(TransportError::NotJson {
                status: 502,
                detail: "expected value".into(),
            }),
            Ok(json!({"status": "completed"})),
            Ok(json!({"success": true})),
        ]);
        let mut ctl = controller(&transport);
        ctl.page_mut().form.fuel_expenses = "100".into();

        assert_eq!(ctl.select_status("completed").await, UpdateOutcome::NetworkError);
        assert_eq!(ctl.submit_financials().await, UpdateOutcome::NetworkError);
        assert_eq!(ctl.select_status("completed").await, UpdateOutcome::NetworkError);
        assert_eq!(ctl.submit_financials().await, UpdateOutcome::NetworkError);

        assert_eq!(ctl.page().badge, page().badge);
        assert_eq!(ctl.page().profit.text, "0.00");
        assert_eq!(ctl.page().form.fuel_expenses, "100");
        let shown = ctl.banner().snapshot();
        assert_eq!(
            (shown.text.as_str(), shown.tone),
            ("Network error, please try again", Tone::Error)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_in_success_reply_is_a_logical_failure() {
        let transport = MockTransport::replying(vec![Ok(json!({
            "success": true, "status": "teleported", "status_display": "Teleported"
        }))]);
        let mut ctl = controller(&transport);

        assert_eq!(
            ctl.select_status("teleported").await,
            UpdateOutcome::Rejected("Unknown status: teleported".into())
        );
        assert_eq!(ctl.page().badge, page().badge);
        assert_eq!(ctl.banner().snapshot().tone, Tone::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn financial_submission_shows_server_profit_verbatim() {
        let transport = MockTransport::replying(vec![
            Ok(json!({"success": true, "profit": "350"})),
            Ok(json!({"success": true, "profit": 349.5})),
        ]);
        let mut ctl = controller(&transport);
        ctl.page_mut().form.fuel_expenses = "100".into();
        ctl.page_mut().form.driver_cost = "50".into();

        assert_eq!(ctl.submit_financials().await, UpdateOutcome::Applied);
        assert_eq!(ctl.page().profit.text, "350");
        assert_eq!(ctl.banner().snapshot().text, "Financial data saved");

        assert_eq!(
            transport.requests()[0],
            UpdateRequest {
                path: "/requests/abc/update-financials/".into(),
                body: RequestBody::Multipart(vec![
                    ("fuel_expenses".into(), "100".into()),
                    ("driver_cost".into(), "50".into()),
                    ("csrfmiddlewaretoken".into(), "csrf-1".into()),
                ]),
                csrf_header: None,
            }
        );

        assert_eq!(ctl.submit_financials().await, UpdateOutcome::Applied);
        assert_eq!(ctl.page().profit.text, "349.5");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_financials_leave_the_form_as_entered() {
        let transport = MockTransport::replying(vec![Ok(json!({
            "success": false, "error": "fuel_expenses must not be negative"
        }))]);
        let mut ctl = controller(&transport);
        ctl.page_mut().form.fuel_expenses = "-5".into();
        ctl.page_mut().form.driver_cost = "50".into();

        assert_eq!(
            ctl.submit_financials().await,
            UpdateOutcome::Rejected("fuel_expenses must not be negative".into())
        );
        assert_eq!(ctl.page().form.fuel_expenses, "-5");
        assert_eq!(ctl.page().form.driver_cost, "50");
        assert_eq!(ctl.page().profit.text, "0.00");
    }

    #[tokio::test(start_paused = true)]
    async fn success_message_hides_after_configured_delay() {
        let transport = MockTransport::replying(vec![
            Ok(json!({"success": true, "status": "loading", "status_display": "Loading"})),
            Ok(json!({"success": true, "profit": "10.00"})),
        ]);
        let mut ctl = controller(&transport);

        ctl.select_status("loading").await;
        tokio::time::sleep(Duration::from_millis(2000)).await;

        // A second success restarts the window.
        ctl.submit_financials().await;
        tokio::time::sleep(Duration::from_millis(2000)).await;
        tokio::task::yield_now().await;
        assert!(ctl.banner().is_visible());
        assert_eq!(ctl.banner().snapshot().text, "Financial data saved");

        tokio::time::sleep(Duration::from_millis(1001)).await;
        tokio::task::yield_now().await;
        assert!(!ctl.banner().is_visible());

        ctl.banner().hide();
        assert!(!ctl.banner().is_visible());
    }
}
