// ===============================
// src/orders.rs
// ===============================
//
// Sales, purchases and WhatsApp-originated shopping carts.
//
// Cart status machine (client-side guard):
//   PENDING -> CONFIRMED -> COMPLETED
//   PENDING | CONFIRMED -> CANCELLED
//
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use crate::catalog::non_negative;
use crate::domain::lenient_ts;
use crate::error::{ApiError, Result};
use crate::http::ApiClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[validate(custom(function = "positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

fn positive(v: &Decimal) -> std::result::Result<(), ValidationError> {
    if *v <= Decimal::ZERO {
        return Err(ValidationError::new("quantity_must_be_positive"));
    }
    Ok(())
}

pub fn items_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::subtotal).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Yape,
    Other,
}

// ----- Sales -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub store_id: i64,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<i64>,
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, message = "a sale needs at least one item"), nested)]
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

impl SaleRequest {
    pub fn new(store_id: i64, user_id: i64, payment_method: PaymentMethod, items: Vec<LineItem>) -> Self {
        let total = items_total(&items);
        Self {
            store_id,
            user_id,
            session_id: None,
            cart_id: None,
            payment_method,
            items,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub store_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub session_id: Option<i64>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total: Decimal,
    #[serde(default, with = "lenient_ts")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SalesRepository {
    api: ApiClient,
}

impl SalesRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create(&self, req: &SaleRequest) -> Result<Sale> {
        req.validate()?;
        let sale: Sale = self.api.post("/api/sales", req).await?;
        info!(sale_id = sale.id, total = %sale.total, "sale registered");
        Ok(sale)
    }

    pub async fn list(&self) -> Result<Vec<Sale>> {
        Ok(self.api.get_optional("/api/sales").await?.unwrap_or_default())
    }

    pub async fn get(&self, id: i64) -> Result<Sale> {
        self.api.get(&format!("/api/sales/{id}")).await
    }
}

// ----- Purchases -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub store_id: i64,
    pub user_id: i64,
    pub provider_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    /// Paid from the drawer (counts as purchasesCash) or not.
    #[serde(default)]
    pub paid_in_cash: bool,
    #[validate(length(min = 1, message = "a purchase needs at least one item"), nested)]
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

impl PurchaseRequest {
    pub fn new(store_id: i64, user_id: i64, provider_id: i64, items: Vec<LineItem>) -> Self {
        let total = items_total(&items);
        Self {
            store_id,
            user_id,
            provider_id,
            session_id: None,
            paid_in_cash: false,
            items,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: i64,
    pub store_id: i64,
    pub provider_id: i64,
    #[serde(default)]
    pub paid_in_cash: bool,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total: Decimal,
    #[serde(default, with = "lenient_ts")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PurchasesRepository {
    api: ApiClient,
}

impl PurchasesRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create(&self, req: &PurchaseRequest) -> Result<Purchase> {
        req.validate()?;
        let p: Purchase = self.api.post("/api/purchases", req).await?;
        info!(purchase_id = p.id, total = %p.total, "purchase registered");
        Ok(p)
    }

    pub async fn list(&self) -> Result<Vec<Purchase>> {
        Ok(self.api.get_optional("/api/purchases").await?.unwrap_or_default())
    }

    pub async fn get(&self, id: i64) -> Result<Purchase> {
        self.api.get(&format!("/api/purchases/{id}")).await
    }
}

// ----- Shopping carts (WhatsApp) -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CartStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl CartStatus {
    pub fn can_transition_to(self, next: CartStatus) -> bool {
        use CartStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CartStatus::Completed | CartStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCart {
    pub id: i64,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// WhatsApp number the order came from.
    pub customer_phone: String,
    pub status: CartStatus,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, with = "lenient_ts")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ShoppingCart {
    /// Total sent by the backend, or recomputed from the items.
    pub fn effective_total(&self) -> Decimal {
        self.total.unwrap_or_else(|| items_total(&self.items))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate {
    status: CartStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CartStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
}

/// Result of turning a cart into a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub sale: Sale,
    pub cart: ShoppingCart,
}

#[derive(Clone)]
pub struct CartsRepository {
    api: ApiClient,
    sales: SalesRepository,
}

impl CartsRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { sales: SalesRepository::new(api.clone()), api }
    }

    pub async fn list(&self, query: &CartQuery) -> Result<Vec<ShoppingCart>> {
        Ok(self
            .api
            .get_query_optional("/api/shopping-carts", query)
            .await?
            .unwrap_or_default())
    }

    pub async fn get(&self, id: i64) -> Result<ShoppingCart> {
        self.api.get(&format!("/api/shopping-carts/{id}")).await
    }

    pub async fn update_status(&self, id: i64, next: CartStatus) -> Result<ShoppingCart> {
        let cart = self.get(id).await?;
        if !cart.status.can_transition_to(next) {
            return Err(ApiError::Validation(format!(
                "cart {id} cannot go from {:?} to {:?}",
                cart.status, next
            )));
        }
        let updated: ShoppingCart = self
            .api
            .put(&format!("/api/shopping-carts/{id}/status"), &StatusUpdate { status: next })
            .await?;
        info!(cart_id = id, status = ?updated.status, "cart status updated");
        Ok(updated)
    }

    /// Register the cart as a sale, then mark it COMPLETED.
    ///
    /// A PENDING cart is confirmed first. If the status update fails after
    /// the sale was created the sale stays; the error is returned as-is.
    pub async fn fulfill(
        &self,
        id: i64,
        user_id: i64,
        store_id: i64,
        session_id: Option<i64>,
        payment_method: PaymentMethod,
    ) -> Result<Fulfillment> {
        let mut cart = self.get(id).await?;
        if cart.status.is_terminal() {
            return Err(ApiError::Validation(format!(
                "cart {id} is already {:?}",
                cart.status
            )));
        }
        if cart.items.is_empty() {
            return Err(ApiError::Validation(format!("cart {id} has no items")));
        }
        if cart.status == CartStatus::Pending {
            cart = self.update_status(id, CartStatus::Confirmed).await?;
        }

        let mut req = SaleRequest::new(
            cart.store_id.unwrap_or(store_id),
            user_id,
            payment_method,
            cart.items.clone(),
        );
        req.session_id = session_id;
        req.cart_id = Some(id);
        let sale = self.sales.create(&req).await?;
        let cart = self.update_status(id, CartStatus::Completed).await?;
        Ok(Fulfillment { sale, cart })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: &str, price: &str) -> LineItem {
        LineItem {
            product_id: 1,
            product_name: None,
            quantity: qty.parse().unwrap(),
            unit_price: price.parse().unwrap(),
        }
    }

    #[test]
    fn sale_total_is_sum_of_lines() {
        let req = SaleRequest::new(1, 2, PaymentMethod::Cash, vec![item("2", "3.50"), item("1", "0.25")]);
        assert_eq!(req.total, "7.25".parse::<Decimal>().unwrap());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_or_bad_lines_are_rejected() {
        let req = SaleRequest::new(1, 2, PaymentMethod::Card, vec![]);
        assert!(req.validate().is_err());
        let req = SaleRequest::new(1, 2, PaymentMethod::Card, vec![item("0", "1")]);
        assert!(req.validate().is_err());
        let req = PurchaseRequest::new(1, 2, 3, vec![item("1", "-1")]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn cart_status_machine() {
        use CartStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn cart_total_falls_back_to_items() {
        let raw = r#"{"id":5,"customerPhone":"+51999888777","status":"PENDING",
            "items":[{"productId":1,"quantity":2,"unitPrice":1.5}]}"#;
        let cart: ShoppingCart = serde_json::from_str(raw).unwrap();
        assert_eq!(cart.effective_total(), Decimal::from(3));
    }
}
