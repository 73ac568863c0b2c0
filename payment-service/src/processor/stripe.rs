//! Stripe Checkout sessions via the REST API

use async_trait::async_trait;
use std::time::Duration;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::Order;

use super::{PaymentProcessor, cancel_url, success_url};

const STRIPE_API: &str = "https://api.stripe.com/v1";

pub struct StripePaymentProcessor {
    secret_key: String,
    gateway_addr: String,
    client: reqwest::Client,
}

impl StripePaymentProcessor {
    pub fn new(secret_key: impl Into<String>, gateway_addr: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::config(format!("failed to build stripe client: {e}")))?;
        Ok(Self {
            secret_key: secret_key.into(),
            gateway_addr: gateway_addr.into(),
            client,
        })
    }

    fn checkout_form(&self, order: &Order) -> Vec<(String, String)> {
        let mut form = Vec::with_capacity(order.items.len() * 2 + 5);
        for (i, item) in order.items.iter().enumerate() {
            form.push((format!("line_items[{i}][price]"), item.price_id.clone()));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }
        form.push(("mode".into(), "payment".into()));
        form.push(("success_url".into(), success_url(&self.gateway_addr, order)));
        form.push(("cancel_url".into(), cancel_url(&self.gateway_addr)));
        form.push(("metadata[orderID]".into(), order.id.clone()));
        form.push(("metadata[customerID]".into(), order.customer_id.clone()));
        form
    }
}

#[async_trait]
impl PaymentProcessor for StripePaymentProcessor {
    async fn create_payment_link(&self, order: &Order) -> AppResult<String> {
        tracing::info!(order_id = %order.id, lines = order.items.len(), "creating payment link");

        let response = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&self.checkout_form(order))
            .send()
            .await
            .map_err(|e| AppError::processor(format!("stripe request failed: {e}")))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::processor(format!("invalid stripe response: {e}")))?;

        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(AppError::with_message(
                ErrorCode::PaymentLinkFailed,
                format!("stripe checkout failed: {message}"),
            )
            .with_detail("order_id", order.id.clone()));
        }

        body["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::processor("stripe checkout returned no url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Item, OrderStatus};

    #[test]
    fn test_checkout_form_lines_and_metadata() {
        let processor = StripePaymentProcessor::new("sk_test", "http://gw").unwrap();
        let order = Order {
            id: "o-1".into(),
            customer_id: "c-1".into(),
            status: OrderStatus::Pending,
            items: vec![
                Item {
                    id: "i-1".into(),
                    name: "Keyboard".into(),
                    quantity: 2,
                    price_id: "price_a".into(),
                },
                Item {
                    id: "i-2".into(),
                    name: "Mouse".into(),
                    quantity: 1,
                    price_id: "price_b".into(),
                },
            ],
            payment_link: String::new(),
        };

        let form = processor.checkout_form(&order);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("line_items[0][price]"), Some("price_a"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[1][price]"), Some("price_b"));
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("metadata[orderID]"), Some("o-1"));
        assert_eq!(get("metadata[customerID]"), Some("c-1"));
        assert_eq!(
            get("success_url"),
            Some("http://gw/success.html?customerID=c-1&orderID=o-1")
        );
        assert_eq!(get("cancel_url"), Some("http://gw/cancel.html"));
    }
}
