//! Price-list catalog constants and field validation.

use crate::pricing::validate_percent;

/// Known product categories.
pub mod categories {
    pub const TIRE: &str = "tire";
    pub const BATTERY: &str = "battery";
}

pub const VALID_CATEGORIES: &[&str] = &[categories::TIRE, categories::BATTERY];

/// Maximum length of free-text product fields.
pub const MAX_TEXT_LENGTH: usize = 200;

pub fn is_valid_category(category: &str) -> bool {
    VALID_CATEGORIES.contains(&category)
}

/// Validate the user-editable fields of a product.
pub fn validate_product_fields(
    category: &str,
    brand: &str,
    model: &str,
    base_cost: f64,
    adjustment_override: Option<f64>,
    stock: i32,
) -> Result<(), String> {
    if !is_valid_category(category) {
        return Err(format!(
            "Invalid category '{category}'. Must be one of: {}",
            VALID_CATEGORIES.join(", ")
        ));
    }
    for (field, value) in [("brand", brand), ("model", model)] {
        if value.trim().is_empty() {
            return Err(format!("{field} must not be empty"));
        }
        if value.len() > MAX_TEXT_LENGTH {
            return Err(format!("{field} must be at most {MAX_TEXT_LENGTH} characters"));
        }
    }
    if !base_cost.is_finite() || base_cost < 0.0 {
        return Err(format!("base_cost must be a non-negative number, got {base_cost}"));
    }
    if let Some(adjustment) = adjustment_override {
        validate_percent("adjustment_percent", adjustment)?;
    }
    if stock < 0 {
        return Err(format!("stock must not be negative, got {stock}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_exact() {
        assert!(is_valid_category("tire"));
        assert!(is_valid_category("battery"));
        assert!(!is_valid_category("Tire"));
        assert!(!is_valid_category("rim"));
    }

    #[test]
    fn accepts_a_valid_product() {
        assert!(validate_product_fields("tire", "Michelin", "Pilot 4", 1500.0, None, 4).is_ok());
    }

    #[test]
    fn rejects_blank_brand() {
        let err = validate_product_fields("battery", "  ", "LTH", 10.0, None, 0).unwrap_err();
        assert!(err.contains("brand"));
    }

    #[test]
    fn rejects_negative_cost_and_stock() {
        assert!(validate_product_fields("tire", "A", "B", -1.0, None, 0).is_err());
        assert!(validate_product_fields("tire", "A", "B", 1.0, None, -3).is_err());
    }

    #[test]
    fn rejects_out_of_range_override() {
        let err = validate_product_fields("tire", "A", "B", 1.0, Some(5000.0), 0).unwrap_err();
        assert!(err.contains("adjustment_percent"));
    }
}
