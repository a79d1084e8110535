use crate::{core::kind::RecordKind, records::CatalogRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const SET_ID_MAX: usize = 64;
pub const SET_NAME_MAX: usize = 255;
pub const SET_CODE_MAX: usize = 16;
pub const SET_TYPE_MAX: usize = 50;
pub const SET_ICON_URI_MAX: usize = 512;

/// A card set (expansion, core set, promo group, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSet {
    pub id: String,
    pub name: String,
    pub code: String,
    pub set_type: String,
    pub released_at: Option<NaiveDate>,
    pub card_count: Option<u32>,
    pub digital: bool,
    pub foil_only: bool,
    pub nonfoil_only: bool,
    pub parent_set_code: Option<String>,
    pub icon_svg_uri: Option<String>,
}

impl CatalogRecord for CardSet {
    const KIND: RecordKind = RecordKind::Sets;

    fn id(&self) -> &str {
        &self.id
    }
}
