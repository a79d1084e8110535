use super::{Validate, fields};
use crate::error::ValidationError;
use model::records::card_set::{
    CardSet, SET_CODE_MAX, SET_ICON_URI_MAX, SET_ID_MAX, SET_NAME_MAX, SET_TYPE_MAX,
};
use serde_json::Value;

impl Validate for CardSet {
    fn validate(raw: &Value) -> Result<Self, ValidationError> {
        let obj = fields::as_object(raw)?;

        Ok(CardSet {
            id: fields::required_str(obj, "id", SET_ID_MAX)?,
            name: fields::required_str(obj, "name", SET_NAME_MAX)?,
            code: fields::required_str(obj, "code", SET_CODE_MAX)?.to_lowercase(),
            set_type: fields::required_str(obj, "set_type", SET_TYPE_MAX)?,
            released_at: fields::optional_date(obj, "released_at")?,
            card_count: fields::optional_u32(obj, "card_count")?,
            digital: fields::flag(obj, "digital")?,
            foil_only: fields::flag(obj, "foil_only")?,
            nonfoil_only: fields::flag(obj, "nonfoil_only")?,
            parent_set_code: fields::optional_str(obj, "parent_set_code", SET_CODE_MAX)?
                .map(|code| code.to_lowercase()),
            icon_svg_uri: fields::optional_str(obj, "icon_svg_uri", SET_ICON_URI_MAX)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn khans() -> Value {
        json!({
            "id": "6f5a1a8b-7b1e-4c36-9c0e-0f0e4c2c9ad1",
            "name": "Khans of Tarkir",
            "code": "KTK",
            "set_type": "expansion",
            "released_at": "2014-09-26",
            "card_count": 269,
            "digital": false,
            "foil_only": "no",
            "nonfoil_only": 0,
            "icon_svg_uri": "https://svgs.example.test/sets/ktk.svg",
            "object": "set"
        })
    }

    #[test]
    fn builds_set_and_normalizes_code() {
        let set = CardSet::validate(&khans()).unwrap();
        assert_eq!(set.code, "ktk");
        assert_eq!(set.released_at, NaiveDate::from_ymd_opt(2014, 9, 26));
        assert_eq!(set.card_count, Some(269));
        assert!(!set.foil_only);
        assert_eq!(set.parent_set_code, None);
    }

    #[test]
    fn missing_optionals_are_fine() {
        let raw = json!({ "id": "x", "name": "Promos", "code": "pmo", "set_type": "promo" });
        let set = CardSet::validate(&raw).unwrap();
        assert!(!set.digital);
        assert_eq!(set.released_at, None);
    }

    #[test]
    fn reports_first_violation_in_field_order() {
        let mut raw = khans();
        raw["name"] = Value::Null;
        raw["released_at"] = json!("yesterday");
        assert_eq!(
            CardSet::validate(&raw),
            Err(ValidationError::MissingField("name"))
        );
    }

    #[test]
    fn rejects_overlong_code() {
        let mut raw = khans();
        raw["code"] = json!("x".repeat(SET_CODE_MAX + 1));
        assert!(matches!(
            CardSet::validate(&raw),
            Err(ValidationError::TooLong { field: "code", .. })
        ));
    }

    #[test]
    fn rejects_bad_flag_and_date() {
        let mut raw = khans();
        raw["digital"] = json!("sometimes");
        assert!(matches!(
            CardSet::validate(&raw),
            Err(ValidationError::InvalidType { field: "digital", .. })
        ));

        let mut raw = khans();
        raw["released_at"] = json!("2014-13-01");
        assert!(matches!(
            CardSet::validate(&raw),
            Err(ValidationError::InvalidDate { field: "released_at", .. })
        ));
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(
            CardSet::validate(&json!("ktk")),
            Err(ValidationError::NotAnObject("string"))
        );
    }
}
