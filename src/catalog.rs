// ===============================
// src/catalog.rs
// ===============================
//
// Plain transfer records for the back-office entities. The only client-side
// rules are field presence (validated before dispatch by `crud::Repository`).
//
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Shared money rule for prices and costs.
pub(crate) fn non_negative(v: &Decimal) -> Result<(), ValidationError> {
    if *v < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

// ----- Category -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
}

// ----- Product -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub provider_id: Option<i64>,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "cost_not_negative"))]
pub struct ProductRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

fn cost_not_negative(p: &ProductRequest) -> Result<(), ValidationError> {
    p.cost.as_ref().map_or(Ok(()), non_negative)
}

// ----- Provider -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// ----- Role -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

// ----- Schedule -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub worker_id: Option<i64>,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "ends_after_start"))]
pub struct ScheduleRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<i64>,
    #[validate(range(min = 1, max = 7, message = "dayOfWeek must be 1..7"))]
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn ends_after_start(s: &ScheduleRequest) -> Result<(), ValidationError> {
    if s.end_time <= s.start_time {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}

// ----- Store -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

// ----- Worker -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    #[validate(length(min = 1, message = "firstName is required"))]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default = "yes")]
    pub active: bool,
}

// ----- User -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[validate(length(min = 3, message = "username needs at least 3 characters"))]
    pub username: String,
    /// Only sent on create or password change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 6, message = "password needs at least 6 characters"))]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_requires_name() {
        let req = CategoryRequest { name: String::new(), description: None, image_key: None };
        assert!(req.validate().is_err());
        let req = CategoryRequest { name: "Drinks".into(), description: None, image_key: None };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn product_price_and_stock_checks() {
        let raw = r#"{"name":"Cola","price":-1.5,"stock":3}"#;
        let req: ProductRequest = serde_json::from_str(raw).unwrap();
        assert!(req.active);
        assert!(req.validate().is_err());

        let raw = r#"{"name":"Cola","price":0,"stock":-3}"#;
        let req: ProductRequest = serde_json::from_str(raw).unwrap();
        assert!(req.validate().is_err());

        let raw = r#"{"name":"Cola","price":2.5}"#;
        let req: ProductRequest = serde_json::from_str(raw).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn product_cost_cannot_be_negative() {
        let raw = r#"{"name":"Cola","price":2.5,"cost":-0.1}"#;
        let req: ProductRequest = serde_json::from_str(raw).unwrap();
        assert!(req.validate().is_err());

        let raw = r#"{"name":"Cola","price":2.5,"cost":0}"#;
        let req: ProductRequest = serde_json::from_str(raw).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn emails_are_checked_when_present() {
        let mut req = ProviderRequest {
            name: "Acme".into(),
            tax_id: None,
            phone: None,
            email: Some("not-an-email".into()),
            address: None,
        };
        assert!(req.validate().is_err());
        req.email = Some("sales@acme.test".into());
        assert!(req.validate().is_ok());
        req.email = None;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn schedule_window_must_be_forward() {
        let raw = r#"{"name":"Morning","dayOfWeek":1,"startTime":"08:00:00","endTime":"14:00:00"}"#;
        let mut req: ScheduleRequest = serde_json::from_str(raw).unwrap();
        assert!(req.validate().is_ok());
        std::mem::swap(&mut req.start_time, &mut req.end_time);
        assert!(req.validate().is_err());
        req.day_of_week = 8;
        assert!(req.validate().is_err());
    }

    #[test]
    fn user_password_is_optional_on_update() {
        let raw = r#"{"username":"cajero1","fullName":"Ana"}"#;
        let req: UserRequest = serde_json::from_str(raw).unwrap();
        assert!(req.validate().is_ok());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["fullName"], "Ana");
    }
}
