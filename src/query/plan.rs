use alloy_primitives::{Address, FixedBytes};
use chrono::{DateTime, Utc};

use crate::models::common::SortDirection;

/// A value bound into a query placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    I64(i64),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        Self::I64(v as i64)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Address> for SqlValue {
    fn from(v: Address) -> Self {
        Self::Bytes(v.as_slice().to_vec())
    }
}

impl From<FixedBytes<32>> for SqlValue {
    fn from(v: FixedBytes<32>) -> Self {
        Self::Bytes(v.as_slice().to_vec())
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// One predicate: `column op $n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: &'static str,
    pub op: Op,
    pub value: SqlValue,
}

impl Condition {
    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self { column, op: Op::Eq, value: value.into() }
    }

    pub fn gt(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self { column, op: Op::Gt, value: value.into() }
    }

    pub fn gte(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self { column, op: Op::Gte, value: value.into() }
    }

    pub fn lt(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self { column, op: Op::Lt, value: value.into() }
    }

    pub fn lte(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self { column, op: Op::Lte, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// A fully composed listing query: table path, projection, predicates, the
/// two-key stable sort, and paging. Rendered to `$n`-placeholder SQL; the
/// bind list is the conditions in declaration order.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Table with optional alias, e.g. `"transactions t"`.
    pub table: &'static str,
    pub select: &'static str,
    /// Projection join(s) back to the primary table, if any.
    pub join: Option<&'static str>,
    pub conditions: Vec<Condition>,
    pub order: Vec<OrderKey>,
    pub limit: u64,
    pub offset: u64,
}

impl QueryPlan {
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.select, self.table);
        if let Some(join) = self.join {
            sql.push(' ');
            sql.push_str(join);
        }
        for (i, cond) in self.conditions.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(cond.column);
            sql.push(' ');
            sql.push_str(cond.op.as_sql());
            sql.push_str(&format!(" ${}", i + 1));
        }
        for (i, key) in self.order.iter().enumerate() {
            sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            sql.push_str(key.column);
            sql.push(' ');
            sql.push_str(key.direction.as_sql());
        }
        sql.push_str(&format!(" LIMIT {} OFFSET {}", self.limit, self.offset));
        sql
    }

    /// The bare primary table name, alias stripped. Used as the counter-cache
    /// key prefix.
    pub fn table_name(&self) -> &'static str {
        self.table.split_whitespace().next().unwrap_or(self.table)
    }
}
