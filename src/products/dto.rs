use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo_types::ProductDraft;

/// Body of POST and PUT /products. Absent or null keys leave the current
/// value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<i64>,
}

impl ProductPatch {
    pub fn apply(self, draft: &mut ProductDraft) {
        if let Some(name) = self.name {
            draft.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            draft.description = Some(description);
        }
        if let Some(price) = self.price {
            draft.price = Some(price.round_dp(2));
        }
        if let Some(stock) = self.stock {
            draft.stock = Some(stock);
        }
        if let Some(category_id) = self.category_id {
            draft.category_id = Some(category_id);
        }
    }
}

/// Query string of GET /products.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn patch_accepts_numbers_and_strings_for_price() {
        let a: ProductPatch = serde_json::from_str(r#"{"price": 12.5, "categoryId": 3}"#).unwrap();
        assert_eq!(a.price, Some(Decimal::from_str("12.5").unwrap()));
        assert_eq!(a.category_id, Some(3));

        let b: ProductPatch = serde_json::from_str(r#"{"price": "7.25"}"#).unwrap();
        assert_eq!(b.price, Some(Decimal::from_str("7.25").unwrap()));
    }

    #[test]
    fn apply_rounds_price_and_keeps_absent_fields() {
        let mut draft = ProductDraft {
            name: "Dune".into(),
            stock: Some(4),
            ..Default::default()
        };
        ProductPatch {
            price: Some(Decimal::from_str("1.239").unwrap()),
            ..Default::default()
        }
        .apply(&mut draft);
        assert_eq!(draft.name, "Dune");
        assert_eq!(draft.stock, Some(4));
        assert_eq!(draft.price.unwrap().to_string(), "1.24");
    }
}
