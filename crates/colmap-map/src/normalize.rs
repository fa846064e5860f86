//! Column-name normalization.

/// Decoration removed from both names wherever it occurs.
pub const NAME_PREFIXES: &[&str] = &["src_", "tgt_", "dim_", "fact_", "stg_"];

/// Suffixes removed only when both names end with the same one.
pub const NAME_SUFFIXES: &[&str] = &["_id", "_key", "_code", "_date", "_amt", "_amount"];

/// Lowercases both names, strips prefix tokens anywhere in the name, then
/// strips suffixes the two names share.
///
/// Suffixes are tried in list order and each shared one is removed, so
/// `loan_amount_id` / `total_amount_id` lose `_id` and then `_amount`.
pub fn normalize_pair(source: &str, target: &str) -> (String, String) {
    let mut left = source.to_lowercase();
    let mut right = target.to_lowercase();
    for prefix in NAME_PREFIXES {
        left = left.replace(prefix, "");
        right = right.replace(prefix, "");
    }
    for suffix in NAME_SUFFIXES {
        if left.ends_with(suffix) && right.ends_with(suffix) {
            left.truncate(left.len() - suffix.len());
            right.truncate(right.len() - suffix.len());
        }
    }
    (left, right)
}

/// True when both names split into the same number of `_` tokens and each
/// token is a prefix of its partner, as in `cust_name` / `customer_name`.
pub fn tokens_pair_by_prefix(left: &str, right: &str) -> bool {
    let left: Vec<&str> = left.split('_').collect();
    let right: Vec<&str> = right.split('_').collect();
    left.len() == right.len()
        && left.iter().zip(&right).all(|(a, b)| {
            !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefixes_anywhere() {
        assert_eq!(
            normalize_pair("SRC_Customer", "dim_customer"),
            ("customer".to_string(), "customer".to_string())
        );
        // Embedded tokens go too.
        assert_eq!(normalize_pair("a_stg_b", "x").0, "a_b");
    }

    #[test]
    fn strips_only_shared_suffixes() {
        assert_eq!(
            normalize_pair("cust_id", "customer_id"),
            ("cust".to_string(), "customer".to_string())
        );
        assert_eq!(
            normalize_pair("cust_id", "customer_key"),
            ("cust_id".to_string(), "customer_key".to_string())
        );
    }

    #[test]
    fn token_prefix_pairs() {
        assert!(tokens_pair_by_prefix("cust_name", "customer_name"));
        assert!(tokens_pair_by_prefix("cust_addr", "customer_address"));
        assert!(!tokens_pair_by_prefix("cust_name", "customer_status"));
        assert!(!tokens_pair_by_prefix("cust", "customer_name"));
        assert!(!tokens_pair_by_prefix("cust__name", "customer_x_name"));
    }
}
