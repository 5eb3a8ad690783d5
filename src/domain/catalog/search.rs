//! Product search with filters, sorting and pagination.

use anyhow::Context;
use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    domain::helpers::pagination::{Paginated, offset, total_pages},
    infra::{ClientError, Settings},
};

use super::model::{PRODUCT_COLUMNS, Product, ProductRow};

//------------------------- Web API ----------------------------

/// Raw query string. `all` or a missing value means "no filter".
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
}

pub async fn search_products_endpoint(
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Paginated<Product>>, ClientError> {
    let filter = SearchFilter::from(&query);
    let page = query.page.unwrap_or(1).max(1);
    let result = search_products(&pool, &filter, page, settings.application.pagination_size).await?;
    Ok(Json(result))
}

//----------------------- Implementation --------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Lowest,
    Highest,
    Rating,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price_range: Option<(Decimal, Decimal)>,
    pub min_rating: Option<Decimal>,
    pub sort: SortOrder,
}

fn meaningful(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
}

impl From<&SearchQuery> for SearchFilter {
    /// Unparseable price or rating values are ignored rather than rejected.
    fn from(query: &SearchQuery) -> Self {
        let price_range = meaningful(&query.price).and_then(|range| {
            let (min, max) = range.split_once('-')?;
            Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
        });
        let sort = match meaningful(&query.sort) {
            Some("lowest") => SortOrder::Lowest,
            Some("highest") => SortOrder::Highest,
            Some("rating") => SortOrder::Rating,
            _ => SortOrder::Newest,
        };
        SearchFilter {
            name: meaningful(&query.q).map(str::to_owned),
            category: meaningful(&query.category).map(str::to_owned),
            price_range,
            min_rating: meaningful(&query.rating).and_then(|r| r.parse().ok()),
            sort,
        }
    }
}

impl SortOrder {
    fn order_by(self) -> &'static str {
        match self {
            SortOrder::Newest => " ORDER BY created_at DESC, product_id DESC",
            SortOrder::Lowest => " ORDER BY price ASC, product_id DESC",
            SortOrder::Highest => " ORDER BY price DESC, product_id DESC",
            SortOrder::Rating => " ORDER BY rating DESC, product_id DESC",
        }
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a SearchFilter) {
    builder.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some((min, max)) = filter.price_range {
        builder
            .push(" AND price BETWEEN ")
            .push_bind(min)
            .push(" AND ")
            .push_bind(max);
    }
    if let Some(min_rating) = filter.min_rating {
        builder.push(" AND rating >= ").push_bind(min_rating);
    }
}

pub async fn search_products(
    pool: &PgPool,
    filter: &SearchFilter,
    page: i64,
    page_size: i64,
) -> Result<Paginated<Product>, anyhow::Error> {
    let mut count_query = QueryBuilder::new("SELECT count(*) FROM products");
    push_filters(&mut count_query, filter);
    let row_count: i64 = count_query
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .context("Problem counting products matching search.")?;

    let mut page_query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_filters(&mut page_query, filter);
    page_query
        .push(filter.sort.order_by())
        .push(" LIMIT ")
        .push_bind(page_size)
        .push(" OFFSET ")
        .push_bind(offset(page, page_size));
    let rows: Vec<ProductRow> = page_query
        .build_query_as()
        .fetch_all(pool)
        .await
        .context("Problem searching products.")?;

    Ok(Paginated {
        data: rows.into_iter().map(Into::into).collect(),
        total_pages: total_pages(row_count, page_size),
    })
}

//-------------------------- Tests -------------------------------
