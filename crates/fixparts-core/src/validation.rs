//! # Validation Module
//!
//! Field-level business rules for FixParts drafts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation layer                                           │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Managers (fixparts-service)                                  │
//! │  ├── THIS MODULE: field rules, run before any storage call             │
//! │  └── Existence, uniqueness and hierarchy checks against storage        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (authoritative under concurrency)              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fixparts_core::validation::{validate_part_number, validate_quantity};
//!
//! validate_part_number("BR-100").unwrap();
//! validate_quantity(5).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, Entity, ValidationError};
use crate::ledger::TransactionLine;
use crate::money::Money;
use crate::types::{CategoryDraft, ItemDraft, SupplierDraft};
use crate::vehicle::{MakeDraft, ModelDraft, SubmodelDraft};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Rejects zero and negative identifiers.
///
/// ## Example
/// ```rust
/// use fixparts_core::validation::validate_id;
/// use fixparts_core::Entity;
///
/// assert!(validate_id(Entity::Item, 5).is_ok());
/// assert!(validate_id(Entity::Submodel, 0).is_err());
/// ```
pub fn validate_id(entity: Entity, id: i64) -> CoreResult<()> {
    if id <= 0 {
        return Err(CoreError::invalid_id(entity, id));
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Requires non-blank text no longer than `max` characters.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a name field (category, make, model, supplier, ...).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_required(field, name, MAX_NAME_LEN)
}

/// A part number only has to be non-blank; spaces and length are free-form.
pub fn validate_part_number(part_number: &str) -> ValidationResult<()> {
    if part_number.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "part_number".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantity must be strictly positive.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Money must be strictly positive.
pub fn validate_positive_money(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Stock counts may be zero but never negative.
pub fn validate_stock(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Derives `quantity × unit_price`, failing instead of overflowing.
///
/// ## Example
/// ```rust
/// use fixparts_core::money::Money;
/// use fixparts_core::validation::compute_total;
///
/// assert_eq!(compute_total(3, Money::from_cents(4999)).unwrap().cents(), 14997);
/// assert!(compute_total(i64::MAX, Money::from_cents(2)).is_err());
/// ```
pub fn compute_total(quantity: i64, unit_price: Money) -> ValidationResult<Money> {
    unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "total".to_string(),
            reason: "quantity × unit price overflows".to_string(),
        })
}

// =============================================================================
// Draft Validators
// =============================================================================

pub fn validate_category_draft(draft: &CategoryDraft) -> ValidationResult<()> {
    validate_name("name", &draft.name)
}

/// Validates every field rule of an item draft.
///
/// ## Rules
/// - Part number and description required
/// - Buy and sell price > 0
/// - Current and minimum stock ≥ 0
pub fn validate_item_draft(draft: &ItemDraft) -> ValidationResult<()> {
    validate_part_number(&draft.part_number)?;
    validate_required("description", &draft.description, 2000)?;
    validate_positive_money("buy_price", draft.buy_price)?;
    validate_positive_money("sell_price", draft.sell_price)?;
    validate_stock("current_stock", draft.current_stock)?;
    validate_stock("minimum_stock", draft.minimum_stock)?;

    if let Some(weight) = draft.weight_kg {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ValidationError::Negative {
                field: "weight_kg".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_supplier_draft(draft: &SupplierDraft) -> ValidationResult<()> {
    validate_name("name", &draft.name)?;

    if let Some(email) = draft.email.as_deref().map(str::trim) {
        if !email.is_empty() && !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_make_draft(draft: &MakeDraft) -> ValidationResult<()> {
    validate_name("name", &draft.name)
}

pub fn validate_model_draft(draft: &ModelDraft) -> ValidationResult<()> {
    validate_name("name", &draft.name)
}

/// Validates the descriptive fields of a submodel.
///
/// ## Rules
/// - Name, engine type, fuel type, transmission type, body type required
/// - Engine displacement > 0
/// - `year_from` > 0, and `year_to` ≥ `year_from` when present
pub fn validate_submodel_draft(draft: &SubmodelDraft) -> ValidationResult<()> {
    validate_name("name", &draft.name)?;

    if draft.year_from <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "year_from".to_string(),
        });
    }
    if let Some(year_to) = draft.year_to {
        if year_to < draft.year_from {
            return Err(ValidationError::OutOfRange {
                field: "year_to".to_string(),
                reason: format!("{} is before year_from {}", year_to, draft.year_from),
            });
        }
    }

    validate_name("engine_type", &draft.engine_type)?;
    if !(draft.engine_displacement.is_finite() && draft.engine_displacement > 0.0) {
        return Err(ValidationError::MustBePositive {
            field: "engine_displacement".to_string(),
        });
    }
    validate_name("fuel_type", &draft.fuel_type)?;
    validate_name("transmission_type", &draft.transmission_type)?;
    validate_name("body_type", &draft.body_type)?;

    Ok(())
}

/// Validates a sale or purchase line against the current time.
///
/// ## Rules
/// - Item id (and supplier id, for purchases) > 0
/// - Quantity > 0
/// - Unit price > 0
/// - Date, when set, not after `now`
pub fn validate_transaction_line(line: &TransactionLine, now: DateTime<Utc>) -> CoreResult<()> {
    validate_id(Entity::Item, line.item_id)?;
    if let Some(supplier_id) = line.supplier_id {
        validate_id(Entity::Supplier, supplier_id)?;
    }
    validate_quantity(line.quantity)?;
    validate_positive_money("unit_price", line.unit_price)?;

    if let Some(date) = line.date {
        if date > now {
            return Err(ValidationError::InFuture {
                field: "date".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Duration;

    fn item_draft() -> ItemDraft {
        ItemDraft::new(
            "BR-100",
            "Front brake pad set",
            Money::from_cents(2500),
            Money::from_cents(4999),
        )
    }

    fn submodel_draft() -> SubmodelDraft {
        SubmodelDraft {
            model_id: 1,
            name: "LE".into(),
            year_from: 2014,
            year_to: Some(2019),
            engine_type: "I4".into(),
            engine_displacement: 1.8,
            fuel_type: "Petrol".into(),
            transmission_type: "CVT".into(),
            body_type: "Sedan".into(),
        }
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id(Entity::Item, 1).is_ok());
        let err = validate_id(Entity::Submodel, -3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidId);
        assert!(matches!(
            err,
            CoreError::InvalidId {
                entity: Entity::Submodel,
                id: -3
            }
        ));
    }

    #[test]
    fn test_validate_part_number() {
        assert!(validate_part_number("BR-100").is_ok());
        assert!(validate_part_number("").is_err());
        assert!(validate_part_number("   ").is_err());
        assert!(validate_part_number("BR 100").is_ok());
        assert!(validate_part_number(&"A".repeat(80)).is_ok());
    }

    #[test]
    fn test_validate_item_draft() {
        assert!(validate_item_draft(&item_draft()).is_ok());

        let mut draft = item_draft();
        draft.description = " ".into();
        assert_eq!(
            validate_item_draft(&draft),
            Err(ValidationError::Required {
                field: "description".into()
            })
        );

        let mut draft = item_draft();
        draft.sell_price = Money::zero();
        assert_eq!(
            validate_item_draft(&draft).unwrap_err().field(),
            "sell_price"
        );

        let mut draft = item_draft();
        draft.minimum_stock = -1;
        assert_eq!(
            validate_item_draft(&draft),
            Err(ValidationError::Negative {
                field: "minimum_stock".into()
            })
        );

        let mut draft = item_draft();
        draft.current_stock = 0;
        draft.minimum_stock = 0;
        assert!(validate_item_draft(&draft).is_ok());
    }

    #[test]
    fn test_validate_submodel_draft() {
        assert!(validate_submodel_draft(&submodel_draft()).is_ok());

        let mut draft = submodel_draft();
        draft.year_to = None;
        assert!(validate_submodel_draft(&draft).is_ok());

        let mut draft = submodel_draft();
        draft.year_to = Some(2019);
        draft.year_from = 2019;
        assert!(validate_submodel_draft(&draft).is_ok());

        let mut draft = submodel_draft();
        draft.year_to = Some(2010);
        assert_eq!(validate_submodel_draft(&draft).unwrap_err().field(), "year_to");

        let mut draft = submodel_draft();
        draft.engine_displacement = 0.0;
        assert_eq!(
            validate_submodel_draft(&draft).unwrap_err().field(),
            "engine_displacement"
        );

        let mut draft = submodel_draft();
        draft.body_type.clear();
        assert_eq!(validate_submodel_draft(&draft).unwrap_err().field(), "body_type");
    }

    #[test]
    fn test_validate_supplier_email() {
        let mut draft = SupplierDraft::new("Acme Parts");
        assert!(validate_supplier_draft(&draft).is_ok());
        draft.email = Some("sales@acme.test".into());
        assert!(validate_supplier_draft(&draft).is_ok());
        draft.email = Some("not-an-email".into());
        assert!(validate_supplier_draft(&draft).is_err());
    }

    #[test]
    fn test_validate_transaction_line() {
        let now = Utc::now();
        let line = TransactionLine {
            item_id: 5,
            supplier_id: Some(2),
            quantity: 3,
            unit_price: Money::from_cents(4999),
            date: None,
        };
        assert!(validate_transaction_line(&line, now).is_ok());

        let past = TransactionLine {
            date: Some(now - Duration::days(1)),
            ..line
        };
        assert!(validate_transaction_line(&past, now).is_ok());

        let future = TransactionLine {
            date: Some(now + Duration::days(1)),
            ..line
        };
        let err = validate_transaction_line(&future, now).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        let no_supplier = TransactionLine {
            supplier_id: Some(0),
            ..line
        };
        assert_eq!(
            validate_transaction_line(&no_supplier, now)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidId
        );

        let zero_qty = TransactionLine { quantity: 0, ..line };
        assert_eq!(
            validate_transaction_line(&zero_qty, now).unwrap_err().kind(),
            ErrorKind::ValidationFailed
        );

        let free = TransactionLine {
            unit_price: Money::zero(),
            ..line
        };
        assert!(validate_transaction_line(&free, now).is_err());
    }

    #[test]
    fn test_compute_total() {
        assert_eq!(
            compute_total(10, Money::from_cents(1250)).unwrap(),
            Money::from_cents(12500)
        );
        assert!(compute_total(i64::MAX / 2, Money::from_cents(3)).is_err());
    }
}
