// file: src/query/results.rs
// description: mapping of ranked engine hits back onto the originating store's query
// reference: parameterized clauses with `?` placeholders, `1=0` for an empty match

use crate::models::{FieldType, Hit};
use std::collections::HashMap;
use std::fmt;

/// Identifiers returned by one search, in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitSet {
    ids: Vec<String>,
    ranks: HashMap<String, usize>,
}

impl HitSet {
    /// Duplicate identifiers keep their first (best) rank.
    pub fn from_hits(hits: &[Hit]) -> Self {
        let mut ordered: Vec<&Hit> = hits.iter().collect();
        ordered.sort_by_key(|hit| hit.rank);

        let mut set = Self::default();
        for hit in ordered {
            if !set.ranks.contains_key(&hit.id) {
                set.ranks.insert(hit.id.clone(), set.ids.len());
                set.ids.push(hit.id.clone());
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    /// Reorder fetched rows to follow hit rank. Rows whose key was not a hit
    /// go last, keeping their relative order.
    pub fn sort_by_rank<T, F>(&self, items: &mut [T], key: F)
    where
        F: Fn(&T) -> String,
    {
        items.sort_by_key(|item| self.rank_of(&key(item)).unwrap_or(usize::MAX));
    }
}

/// Filterable, orderable query object of the originating store.
///
/// `key_type` is the declared type of the key column, `None` when the record
/// type does not declare it. Identifiers arrive as the engine's text ids.
pub trait StoreQuery: Sized {
    /// Restrict to no rows at all
    fn filter_none(self) -> Self;

    /// Restrict to rows whose `column` is one of `ids`
    fn filter_ids(self, column: &str, key_type: Option<&FieldType>, ids: &[String]) -> Self;

    /// Order rows by the position of their `column` value in `ranked`
    fn order_by_rank(self, column: &str, key_type: Option<&FieldType>, ranked: &[String]) -> Self;
}

pub struct ResultMapper;

impl ResultMapper {
    /// Narrow `query` to the hits. An empty hit list never leaves the query
    /// unrestricted.
    pub fn apply<Q: StoreQuery>(
        query: Q,
        primary_key: &str,
        key_type: Option<&FieldType>,
        hits: &[Hit],
        rank_order: bool,
    ) -> Q {
        let set = HitSet::from_hits(hits);
        if set.is_empty() {
            return query.filter_none();
        }

        let query = query.filter_ids(primary_key, key_type, set.ids());
        if rank_order {
            query.order_by_rank(primary_key, key_type, set.ids())
        } else {
            query
        }
    }
}

/// Bound value of a [`SqlSelect`] placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
}

impl SqlParam {
    /// Bind an engine id against a key column. Only keys declared as integers
    /// bind as integers; everything else keeps the id text unchanged.
    pub fn from_id(id: &str, key_type: Option<&FieldType>) -> Self {
        match key_type {
            Some(FieldType::Integer) => match id.parse::<i64>() {
                Ok(value) => SqlParam::Integer(value),
                Err(_) => SqlParam::Text(id.to_string()),
            },
            _ => SqlParam::Text(id.to_string()),
        }
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            SqlParam::Integer(value) => write!(f, "{}", value),
        }
    }
}

/// Parameterized `SELECT` over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelect {
    table: String,
    clauses: Vec<String>,
    params: Vec<SqlParam>,
    order_by: Option<(String, Vec<SqlParam>)>,
}

impl SqlSelect {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            clauses: Vec::new(),
            params: Vec::new(),
            order_by: None,
        }
    }

    /// Add a raw `WHERE` clause with its bound values
    pub fn filter(mut self, clause: impl Into<String>, params: Vec<SqlParam>) -> Self {
        self.clauses.push(clause.into());
        self.params.extend(params);
        self
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.table);
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        if let Some((order, _)) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        sql
    }

    /// Values for every placeholder of [`SqlSelect::to_sql`], in order
    pub fn params(&self) -> Vec<SqlParam> {
        let mut params = self.params.clone();
        if let Some((_, order_params)) = &self.order_by {
            params.extend(order_params.iter().cloned());
        }
        params
    }

    /// SQL with values inlined, for logs only. Each placeholder of the
    /// generated statement is substituted once, left to right.
    pub fn to_sql_inline(&self) -> String {
        let sql = self.to_sql();
        let params = self.params();
        let mut params = params.iter().peekable();
        let mut inline = String::with_capacity(sql.len());

        for ch in sql.chars() {
            match params.next_if(|_| ch == '?') {
                Some(param) => inline.push_str(&param.to_string()),
                None => inline.push(ch),
            }
        }
        inline
    }
}

impl StoreQuery for SqlSelect {
    fn filter_none(self) -> Self {
        self.filter("1=0", Vec::new())
    }

    fn filter_ids(self, column: &str, key_type: Option<&FieldType>, ids: &[String]) -> Self {
        if ids.is_empty() {
            return self.filter_none();
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let params = ids.iter().map(|id| SqlParam::from_id(id, key_type)).collect();
        self.filter(format!("{} IN ({})", column, placeholders), params)
    }

    fn order_by_rank(mut self, column: &str, key_type: Option<&FieldType>, ranked: &[String]) -> Self {
        if ranked.is_empty() {
            return self;
        }
        let arms: Vec<String> = (0..ranked.len())
            .map(|position| format!("WHEN ? THEN {}", position))
            .collect();
        let order = format!("CASE {} {} END", column, arms.join(" "));
        let params = ranked.iter().map(|id| SqlParam::from_id(id, key_type)).collect();
        self.order_by = Some((order, params));
        self
    }
}
