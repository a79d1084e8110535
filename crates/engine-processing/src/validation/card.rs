use super::{Validate, fields};
use crate::error::ValidationError;
use model::records::card::{
    CARD_COLLECTOR_NUMBER_MAX, CARD_ID_MAX, CARD_LANG_MAX, CARD_NAME_MAX, CARD_RARITY_MAX,
    CARD_SET_CODE_MAX, Card,
};
use serde_json::Value;

impl Validate for Card {
    fn validate(raw: &Value) -> Result<Self, ValidationError> {
        let obj = fields::as_object(raw)?;

        Ok(Card {
            id: fields::required_str(obj, "id", CARD_ID_MAX)?,
            name: fields::required_str(obj, "name", CARD_NAME_MAX)?,
            set_code: fields::required_str(obj, "set", CARD_SET_CODE_MAX)?.to_lowercase(),
            collector_number: fields::required_str(
                obj,
                "collector_number",
                CARD_COLLECTOR_NUMBER_MAX,
            )?,
            rarity: fields::required_str(obj, "rarity", CARD_RARITY_MAX)?,
            lang: fields::optional_str(obj, "lang", CARD_LANG_MAX)?,
            released_at: fields::optional_date(obj, "released_at")?,
            oracle_id: fields::optional_str(obj, "oracle_id", CARD_ID_MAX)?,
            foil: fields::flag(obj, "foil")?,
            nonfoil: fields::flag(obj, "nonfoil")?,
            digital: fields::flag(obj, "digital")?,
        })
    }
}
