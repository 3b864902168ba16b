//! Turns list parameters into a bounded product query.
//!
//! The same `ProductQuery` drives both the SQL builder used against
//! PostgreSQL and the in-memory filter: case-insensitive substring search
//! over name and description, exact category match, one sort column with
//! `id` as the tiebreaker, and offset pagination. Names sort case-folded in
//! both stores; beyond case, PostgreSQL follows the database collation while
//! the memory store compares code points.

use std::cmp::Ordering;

use sqlx::{Postgres, QueryBuilder};

use super::{dto::ListProductsParams, repo_types::Product};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

const SELECT_PRODUCTS: &str = "SELECT p.id, p.name, p.description, p.price, p.stock, \
     c.id AS category_id, c.name AS category_name, c.description AS category_description, \
     p.created_at, p.updated_at \
     FROM products p JOIN categories c ON c.id = p.category_id";

const COUNT_PRODUCTS: &str = "SELECT COUNT(*) FROM products p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    CreatedAt,
}

impl SortField {
    /// Unknown names yield `None`; the listing then falls back to id order.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "LOWER(p.name)",
            Self::Price => "p.price",
            Self::CreatedAt => "p.created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Normalized listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub category: Option<i64>,
    pub sort: Option<SortField>,
    pub order: SortOrder,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self::from(ListProductsParams::default())
    }
}

impl From<ListProductsParams> for ProductQuery {
    fn from(p: ListProductsParams) -> Self {
        let search = p
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let sort = match p.sort.as_deref() {
            None => Some(SortField::Name),
            Some(raw) => SortField::parse(raw),
        };
        Self {
            page: p.page.unwrap_or(1).max(1),
            limit: p.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            search,
            category: p.category,
            sort,
            order: p.order.as_deref().map(SortOrder::parse).unwrap_or_default(),
        }
    }
}

/// Escapes LIKE metacharacters so the search text matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl ProductQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` matching rows.
    pub fn pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total + self.limit - 1) / self.limit
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| format!("%{}%", escape_like(s)))
    }

    fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        let mut first = true;
        let mut clause = |qb: &mut QueryBuilder<'static, Postgres>| {
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some(pattern) = self.search_pattern() {
            clause(&mut *qb);
            qb.push("(p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = self.category {
            clause(&mut *qb);
            qb.push("p.category_id = ").push_bind(category);
        }
    }

    /// `SELECT COUNT(*)` over the filtered rows.
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(COUNT_PRODUCTS);
        self.push_filters(&mut qb);
        qb
    }

    /// One page of filtered, ordered rows joined with their category.
    pub fn select_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(SELECT_PRODUCTS);
        self.push_filters(&mut qb);

        qb.push(" ORDER BY ");
        if let Some(sort) = self.sort {
            qb.push(sort.column())
                .push(" ")
                .push(self.order.keyword())
                .push(", ");
        }
        qb.push("p.id ASC");

        qb.push(" LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset());
        qb
    }

    /// In-memory counterpart of the WHERE clause.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category {
            if product.category.id != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = product.name.to_lowercase().contains(&needle);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }

    /// In-memory counterpart of the ORDER BY clause.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.sort {
            Some(SortField::Name) => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Some(SortField::Price) => a.price.cmp(&b.price),
            Some(SortField::CreatedAt) => a.created_at.cmp(&b.created_at),
            None => Ordering::Equal,
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}
