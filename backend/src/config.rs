//! Compiled-in conversion template.
//!
//! Everything the Domeme multi-destination upload format fixes lives here:
//! the 13 target columns, the alias dictionary used to find them in seller
//! exports, the product-name candidates used for splitting, and the three
//! header rows every output file starts with.
//!
//! The template is built once with [`Template::default`] and passed by
//! reference into the resolver, transformer and writer.

use serde::{Deserialize, Serialize};

/// Title cell of row 1.
pub const TITLE: &str = "도매매 복수배송지주소록";

/// Usage notice of row 2 (verbatim, multi-line).
pub const USAGE_NOTES: &str = concat!(
    " ※ 기재 시 유의사항 : \n",
    "1. 복수배송지보내기는 1회당 30개 이하로 제한됩니다\n",
    "2. 사용 시 1, 2, 3행은 삭제하면 안됩니다. 4행은 예시이므로 삭제 후 이용하세요\n",
    "3. 노란색은 필수, 연두색은 선택입력사항 입니다\n",
    "4. 도매매에서 상품을 구매하는 경우 쇼핑몰명을 반드시 입력해야 하며, ",
    "해외배송상품의 경우 개인통관부호가 반드시 입력되어야 합니다",
);

/// Target columns, in output order.
pub const SCHEMA: [&str; 13] = [
    "번호",
    "수령자명",
    "휴대전화",
    "추가연락처(선택)",
    "배송지주소",
    "배송상세주소",
    "우편번호",
    "배송요청사항(선택)",
    "쇼핑몰명(조건부필수)",
    "전달사항(선택)",
    "개인통관부호(조건부필수)",
    "상품옵션(선택)",
    "수량",
];

/// Sequential row number column, regenerated on every run.
pub const ID_FIELD: &str = "번호";

/// Column always filled with [`SHOP_NAME`].
pub const CONSTANT_FIELD: &str = "쇼핑몰명(조건부필수)";

/// Organization name written into [`CONSTANT_FIELD`].
pub const SHOP_NAME: &str = "이인컴퍼니";

/// Known alternate column names, per target column, in priority order.
pub const ALIASES: [(&str, &[&str]); 12] = [
    ("수령자명", &["수취인이름", "수취인", "고객명", "이름"]),
    ("휴대전화", &["수취인전화번호", "전화번호", "연락처", "핸드폰"]),
    ("추가연락처(선택)", &["추가연락처", "보조연락처", "연락처2"]),
    ("배송지주소", &["주소", "기본주소", "수취인주소"]),
    ("배송상세주소", &["상세주소", "주소상세"]),
    ("우편번호", &["우편번호", "zip", "zipcode"]),
    ("배송요청사항(선택)", &["배송메세지", "배송메시지", "요청사항"]),
    ("쇼핑몰명(조건부필수)", &["쇼핑몰명", "판매처", "플랫폼"]),
    ("전달사항(선택)", &["전달사항"]),
    ("개인통관부호(조건부필수)", &["개인통관부호", "통관번호", "PCCC"]),
    ("상품옵션(선택)", &["옵션명", "옵션", "상품옵션"]),
    ("수량", &["수량", "구매수", "수량합계"]),
];

/// Substrings identifying the product-name column used for splitting.
pub const GROUP_CANDIDATES: [&str; 4] = ["등록상품명", "상품명", "노출상품명", "제품명"];

/// Minimum similarity ratio accepted by the last-resort matcher.
pub const SIMILARITY_FLOOR: f64 = 0.4;

/// Suggested file name for the downloaded archive.
pub const ARCHIVE_NAME: &str = "도매매_복수배송지주소록.zip";

/// Alias list of one target column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldAliases {
    pub field: String,
    pub aliases: Vec<String>,
}

/// The full conversion template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Target columns, in output order
    pub schema: Vec<String>,
    /// Synthetic row number column
    pub id_field: String,
    /// Column with a fixed value
    pub constant_field: String,
    /// Value of `constant_field`
    pub constant_value: String,
    /// Alias dictionary, in declaration order
    pub aliases: Vec<FieldAliases>,
    /// Product-name column candidates
    pub group_candidates: Vec<String>,
    /// Row 1 title
    pub title: String,
    /// Row 2 notice
    pub usage_notes: String,
    pub similarity_floor: f64,
    pub archive_name: String,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            schema: SCHEMA.iter().map(|s| s.to_string()).collect(),
            id_field: ID_FIELD.to_string(),
            constant_field: CONSTANT_FIELD.to_string(),
            constant_value: SHOP_NAME.to_string(),
            aliases: ALIASES
                .iter()
                .map(|(field, aliases)| FieldAliases {
                    field: field.to_string(),
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
            group_candidates: GROUP_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            title: TITLE.to_string(),
            usage_notes: USAGE_NOTES.to_string(),
            similarity_floor: SIMILARITY_FLOOR,
            archive_name: ARCHIVE_NAME.to_string(),
        }
    }
}

impl Template {
    /// Aliases declared for `field`, empty when it has none.
    pub fn aliases_for(&self, field: &str) -> &[String] {
        self.aliases
            .iter()
            .find(|a| a.field == field)
            .map(|a| a.aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Schema fields that are looked up in the source (all but the
    /// row number and the constant column).
    pub fn mapped_fields(&self) -> impl Iterator<Item = &str> {
        self.schema
            .iter()
            .map(String::as_str)
            .filter(move |f| *f != self.id_field && *f != self.constant_field)
    }

    /// The three fixed rows written above the data, each `schema.len()` wide.
    pub fn header_rows(&self) -> [Vec<String>; 3] {
        let width = self.schema.len();
        let padded = |first: &str| {
            let mut row = vec![String::new(); width];
            if let Some(cell) = row.first_mut() {
                *cell = first.to_string();
            }
            row
        };
        [padded(&self.title), padded(&self.usage_notes), self.schema.clone()]
    }
}
