//! # Vehicle Types
//!
//! The strict three-level vehicle hierarchy parts are matched against.
//!
//! ```text
//! VehicleMake (Toyota)
//!   └── VehicleModel (Corolla)
//!         └── VehicleSubmodel (LE 1.8L, 2014-2019, petrol, CVT, sedan)
//! ```
//!
//! A parent cannot be deleted while it still has children, and a child can
//! only point at a parent that exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Make
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VehicleMake {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeDraft {
    pub name: String,
    pub country: Option<String>,
}

impl MakeDraft {
    pub fn new(name: impl Into<String>) -> Self {
        MakeDraft {
            name: name.into(),
            country: None,
        }
    }
}

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VehicleModel {
    pub id: i64,
    pub make_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDraft {
    pub make_id: i64,
    pub name: String,
}

impl ModelDraft {
    pub fn new(make_id: i64, name: impl Into<String>) -> Self {
        ModelDraft {
            make_id,
            name: name.into(),
        }
    }
}

// =============================================================================
// Submodel
// =============================================================================

/// A concrete vehicle variant, the level parts are matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VehicleSubmodel {
    pub id: i64,
    pub model_id: i64,
    pub name: String,
    pub year_from: i32,

    /// `None` while the variant is still in production.
    pub year_to: Option<i32>,

    pub engine_type: String,

    /// Litres.
    pub engine_displacement: f64,

    pub fuel_type: String,
    pub transmission_type: String,
    pub body_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VehicleSubmodel {
    /// Whether the variant was produced in `year`.
    pub fn covers_year(&self, year: i32) -> bool {
        year >= self.year_from && self.year_to.map_or(true, |to| year <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmodelDraft {
    pub model_id: i64,
    pub name: String,
    pub year_from: i32,
    pub year_to: Option<i32>,
    pub engine_type: String,
    pub engine_displacement: f64,
    pub fuel_type: String,
    pub transmission_type: String,
    pub body_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_year() {
        let now = Utc::now();
        let mut submodel = VehicleSubmodel {
            id: 1,
            model_id: 1,
            name: "LE".into(),
            year_from: 2014,
            year_to: Some(2019),
            engine_type: "I4".into(),
            engine_displacement: 1.8,
            fuel_type: "Petrol".into(),
            transmission_type: "CVT".into(),
            body_type: "Sedan".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(submodel.covers_year(2014));
        assert!(submodel.covers_year(2019));
        assert!(!submodel.covers_year(2020));
        assert!(!submodel.covers_year(2013));

        submodel.year_to = None;
        assert!(submodel.covers_year(2031));
    }
}
