//! Approximate count estimation for pagination metadata.
//!
//! Two strategies, both advisory: the listing query always runs regardless of
//! what these report, and drift against the actual rows is accepted.
//!
//! - Range-diff, for block listings: the block number key space is dense, so
//!   the total is max − min + 1 over the matching range (two index-backed
//!   order-and-limit-1 round trips, issued by the store).
//! - Counter cache, for everything else: an externally maintained count keyed
//!   by (table name, canonical filter string). A miss reads as zero.

use chrono::SecondsFormat;

use crate::query::plan::{Condition, Op, SqlValue};

/// Total for the range-diff strategy given the (min, max) matching keys.
pub fn range_diff_total(bounds: Option<(u64, u64)>) -> u64 {
    match bounds {
        Some((min, max)) if max >= min => max - min + 1,
        _ => 0,
    }
}

/// Canonical filter string for counter-cache lookups.
///
/// This is a contract with the external counter maintainer: `key=value` pairs
/// sorted by key and joined with `&`, where the key is the alias-stripped
/// column name suffixed with the operator (`=` bare, otherwise `__gte` etc.),
/// byte values render as 0x-prefixed lowercase hex, and timestamps as RFC3339.
pub fn canonical_filter_string(conditions: &[Condition]) -> String {
    let mut pairs: Vec<String> = conditions
        .iter()
        .map(|cond| {
            let column = cond.column.rsplit('.').next().unwrap_or(cond.column);
            let key = match cond.op {
                Op::Eq => column.to_owned(),
                Op::Gt => format!("{column}__gt"),
                Op::Gte => format!("{column}__gte"),
                Op::Lt => format!("{column}__lt"),
                Op::Lte => format!("{column}__lte"),
            };
            format!("{key}={}", render_value(&cond.value))
        })
        .collect();
    pairs.sort();
    pairs.join("&")
}

fn render_value(value: &SqlValue) -> String {
    match value {
        SqlValue::I64(v) => v.to_string(),
        SqlValue::Text(v) => v.clone(),
        SqlValue::Bool(v) => v.to_string(),
        SqlValue::Bytes(v) => format!("0x{}", alloy_primitives::hex::encode(v)),
        SqlValue::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn range_diff_counts_dense_ranges() {
        assert_eq!(range_diff_total(Some((100, 199))), 100);
        assert_eq!(range_diff_total(Some((7, 7))), 1);
        assert_eq!(range_diff_total(None), 0);
    }

    #[test]
    fn canonical_string_is_sorted_and_alias_free() {
        let conditions = vec![
            Condition::eq("a.token_type", "erc20"),
            Condition::eq("a.address", address!("52908400098527886E0F7030069857D2E4169EE7")),
            Condition::gte("a.block_number", 5u64),
        ];
        assert_eq!(
            canonical_filter_string(&conditions),
            "address=0x52908400098527886e0f7030069857d2e4169ee7&block_number__gte=5&token_type=erc20"
        );
    }

    #[test]
    fn canonical_string_is_order_insensitive() {
        let a = vec![Condition::eq("x", 1u64), Condition::eq("y", 2u64)];
        let b = vec![Condition::eq("y", 2u64), Condition::eq("x", 1u64)];
        assert_eq!(canonical_filter_string(&a), canonical_filter_string(&b));
    }
}
