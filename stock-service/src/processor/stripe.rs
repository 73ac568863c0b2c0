//! Stripe products and prices via the REST API

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use shared::error::{AppError, AppResult};

use super::{NewProduct, ProductRef, ProductUpdate, StockProcessor, to_minor_units};

const STRIPE_API: &str = "https://api.stripe.com/v1";
/// Tax code for goods exempt from tax calculation
const NO_TAX: &str = "txcd_00000000";

pub struct StripeStockProcessor {
    secret_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl StripeStockProcessor {
    pub fn new(secret_key: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::config(format!("failed to build stripe client: {e}")))?;
        Ok(Self {
            secret_key: secret_key.into(),
            base_url: STRIPE_API.to_string(),
            client,
        })
    }

    /// POST a form and return the `id` of the created or updated object
    async fn post_form(&self, path: &str, form: &[(String, String)]) -> AppResult<String> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
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
            return Err(AppError::processor(format!("stripe {path} failed: {message}")));
        }

        body["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::processor(format!("stripe {path} returned no id")))
    }

    async fn create_price(&self, product_id: &str, currency: &str, price: f64) -> AppResult<String> {
        let form = vec![
            ("product".to_string(), product_id.to_string()),
            ("currency".to_string(), currency.to_string()),
            ("unit_amount".to_string(), to_minor_units(price).to_string()),
        ];
        self.post_form("/prices", &form).await
    }
}

fn push_metadata(form: &mut Vec<(String, String)>, metadata: &HashMap<String, String>) {
    for (key, value) in metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
}

#[async_trait]
impl StockProcessor for StripeStockProcessor {
    async fn create_product(&self, product: &NewProduct) -> AppResult<ProductRef> {
        let mut form = vec![
            ("name".to_string(), product.name.clone()),
            ("description".to_string(), product.description.clone()),
            ("tax_code".to_string(), NO_TAX.to_string()),
            ("active".to_string(), "true".to_string()),
        ];
        push_metadata(&mut form, &product.metadata);

        let product_id = self.post_form("/products", &form).await?;
        let price_id = self
            .create_price(&product_id, &product.currency, product.price)
            .await?;

        tracing::info!(product_id = %product_id, price_id = %price_id, "stripe product created");
        Ok(ProductRef {
            product_id,
            price_id,
        })
    }

    async fn update_product(
        &self,
        product_id: &str,
        price_id: &str,
        update: &ProductUpdate,
    ) -> AppResult<Option<String>> {
        let mut form = vec![("active".to_string(), "true".to_string())];
        if let Some(name) = update.name.as_ref().filter(|s| !s.is_empty()) {
            form.push(("name".to_string(), name.clone()));
        }
        if let Some(description) = update.description.as_ref().filter(|s| !s.is_empty()) {
            form.push(("description".to_string(), description.clone()));
        }
        if let Some(metadata) = &update.metadata {
            push_metadata(&mut form, metadata);
        }
        self.post_form(&format!("/products/{product_id}"), &form)
            .await?;

        let Some(price) = update.price.filter(|p| *p > 0.0) else {
            return Ok(None);
        };
        let currency = update.currency.as_deref().unwrap_or_default();

        // Prices are immutable at Stripe: retire the old one, mint a new one
        self.post_form(
            &format!("/prices/{price_id}"),
            &[("active".to_string(), "false".to_string())],
        )
        .await?;
        let new_price_id = self.create_price(product_id, currency, price).await?;

        tracing::info!(product_id = %product_id, price_id = %new_price_id, "stripe price replaced");
        Ok(Some(new_price_id))
    }

    async fn deactivate_product(&self, product_id: &str) -> AppResult<()> {
        self.post_form(
            &format!("/products/{product_id}"),
            &[("active".to_string(), "false".to_string())],
        )
        .await?;
        Ok(())
    }
}
