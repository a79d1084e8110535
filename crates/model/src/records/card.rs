use crate::{core::kind::RecordKind, records::CatalogRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CARD_ID_MAX: usize = 64;
pub const CARD_NAME_MAX: usize = 255;
pub const CARD_SET_CODE_MAX: usize = 16;
pub const CARD_COLLECTOR_NUMBER_MAX: usize = 32;
pub const CARD_RARITY_MAX: usize = 32;
pub const CARD_LANG_MAX: usize = 8;

/// A single printing of a card within a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub set_code: String,
    pub collector_number: String,
    pub rarity: String,
    pub lang: Option<String>,
    pub released_at: Option<NaiveDate>,
    /// Groups reprints of the same card across sets.
    pub oracle_id: Option<String>,
    pub foil: bool,
    pub nonfoil: bool,
    pub digital: bool,
}

impl CatalogRecord for Card {
    const KIND: RecordKind = RecordKind::Cards;

    fn id(&self) -> &str {
        &self.id
    }
}
