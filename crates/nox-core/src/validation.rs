//! # Validation Module
//!
//! Input validation for the billing engine.
//!
//! ## Validation Strategy
//! Three layers of defense, each catching different mistakes:
//! 1. Frontend (TypeScript): format checks, immediate feedback
//! 2. THIS MODULE: business rule validation before logic runs
//! 3. Database (SQLite): NOT NULL, UNIQUE, and FK constraints
//!
//! ## Usage
//! ```rust
//! use nox_core::validation::{validate_guest_count, validate_quantity};
//!
//! validate_guest_count(4).unwrap();
//! validate_quantity(2).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_GUEST_COUNT, MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS, MAX_SPLIT_COUNT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Session Validators
// =============================================================================

/// Validates the party size at check-in.
///
/// ## Rules
/// - At least 1 guest (a session with nobody at it is a data bug)
/// - At most MAX_GUEST_COUNT (fat-finger guard)
pub fn validate_guest_count(count: i64) -> ValidationResult<()> {
    if count < 1 {
        return Err(ValidationError::MustBePositive {
            field: "guest_count".to_string(),
        });
    }

    if count > MAX_GUEST_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "guest_count".to_string(),
            min: 1,
            max: MAX_GUEST_COUNT,
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates an item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in minor units.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (comp'd items)
pub fn validate_price_minor(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an item name snapshot.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates the number of items in one order submission.
pub fn validate_order_size(item_count: usize) -> ValidationResult<()> {
    if item_count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if item_count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Billing Validators
// =============================================================================

/// Validates a tax or service-charge rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates a split count.
///
/// ## Rules
/// - At least 2 (splitting one way is just an invoice)
/// - At most MAX_SPLIT_COUNT
pub fn validate_split_count(count: u32) -> ValidationResult<()> {
    if count < 2 || count as i64 > MAX_SPLIT_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "split_count".to_string(),
            min: 2,
            max: MAX_SPLIT_COUNT,
        });
    }

    Ok(())
}

/// Validates a discount or deposit amount in minor units.
pub fn validate_adjustment_minor(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::OutOfRange {
            field: "adjustment".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in minor units.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(minor: i64) -> ValidationResult<()> {
    if minor <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use nox_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_guest_count() {
        assert!(validate_guest_count(1).is_ok());
        assert!(validate_guest_count(12).is_ok());

        assert!(validate_guest_count(0).is_err());
        assert!(validate_guest_count(-3).is_err());
        assert!(validate_guest_count(MAX_GUEST_COUNT + 1).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_minor() {
        assert!(validate_price_minor(0).is_ok());
        assert!(validate_price_minor(85_000).is_ok());
        assert!(validate_price_minor(-100).is_err());
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Mojito").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name("   ").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_order_size() {
        assert!(validate_order_size(1).is_ok());
        assert!(validate_order_size(MAX_ORDER_ITEMS).is_ok());
        assert!(validate_order_size(0).is_err());
        assert!(validate_order_size(MAX_ORDER_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps(0).is_ok());
        assert!(validate_rate_bps(1000).is_ok());
        assert!(validate_rate_bps(10000).is_ok());
        assert!(validate_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_split_count() {
        assert!(validate_split_count(2).is_ok());
        assert!(validate_split_count(10).is_ok());
        assert!(validate_split_count(0).is_err());
        assert!(validate_split_count(1).is_err());
        assert!(validate_split_count(MAX_SPLIT_COUNT as u32 + 1).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(50_000).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
