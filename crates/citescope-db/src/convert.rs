//! Conversions between core types and their column representations.

use citescope_core::CitationClass;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::DbError;

/// Round `value` to `dp` places for a `NUMERIC` column. Non-finite input maps to zero.
pub(crate) fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

pub(crate) fn position_to_column(position: Option<u32>) -> Option<i32> {
    position.and_then(|p| i32::try_from(p).ok())
}

/// Non-positive stored positions are treated as unranked.
pub(crate) fn position_from_column(position: Option<i32>) -> Option<u32> {
    position
        .and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p >= 1)
}

pub(crate) fn citation_class_to_columns(class: CitationClass) -> (&'static str, Option<Uuid>) {
    match class {
        CitationClass::Brand => ("brand", None),
        CitationClass::Competitor { competitor_id } => ("competitor", Some(competitor_id)),
        CitationClass::Other => ("other", None),
    }
}

/// A competitor citation whose competitor was since deleted reads back as `Other`.
pub(crate) fn citation_class_from_columns(
    classification: &str,
    competitor_id: Option<Uuid>,
) -> Result<CitationClass, DbError> {
    match (classification, competitor_id) {
        ("brand", _) => Ok(CitationClass::Brand),
        ("competitor", Some(competitor_id)) => Ok(CitationClass::Competitor { competitor_id }),
        ("competitor", None) | ("other", _) => Ok(CitationClass::Other),
        (other, _) => Err(DbError::InvalidColumn {
            column: "citations.classification",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_rounds_to_requested_places() {
        assert_eq!(to_decimal(62.46, 1).to_string(), "62.5");
        assert_eq!(to_decimal(0.714_285, 3).to_string(), "0.714");
        assert_eq!(to_decimal(f64::NAN, 1), Decimal::ZERO);
    }

    #[test]
    fn decimal_converts_back_to_float() {
        assert!((to_f64(Decimal::new(625, 1)) - 62.5).abs() < 1e-9);
    }

    #[test]
    fn positions_map_both_ways() {
        assert_eq!(position_to_column(Some(3)), Some(3));
        assert_eq!(position_to_column(None), None);
        assert_eq!(position_from_column(Some(2)), Some(2));
        assert_eq!(position_from_column(Some(0)), None);
        assert_eq!(position_from_column(Some(-1)), None);
    }

    #[test]
    fn citation_class_columns_round_trip() {
        let id = Uuid::from_u128(5);
        for class in [
            CitationClass::Brand,
            CitationClass::Competitor { competitor_id: id },
            CitationClass::Other,
        ] {
            let (label, competitor) = citation_class_to_columns(class);
            assert_eq!(citation_class_from_columns(label, competitor).unwrap(), class);
        }
    }

    #[test]
    fn orphaned_competitor_citation_reads_as_other() {
        assert_eq!(
            citation_class_from_columns("competitor", None).unwrap(),
            CitationClass::Other
        );
    }

    #[test]
    fn unknown_classification_is_rejected() {
        assert!(matches!(
            citation_class_from_columns("partner", None),
            Err(DbError::InvalidColumn { .. })
        ));
    }
}
