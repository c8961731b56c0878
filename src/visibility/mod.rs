//! Per-request visibility evaluation for transactions and event logs.
//!
//! Admin callers see everything and skip rule evaluation entirely. An
//! authenticated caller sees a record if they participate in it (transaction
//! from/to, or their address sits in a topic slot) or if any permission rule
//! configured for the log's contract matches. Anonymous callers get neither
//! the participant shortcut nor caller-substitution patterns. A contract with
//! no applicable rules denies by default.
//!
//! Evaluation is a pure predicate over fetched rows; services apply it to a
//! fetched page and account for removed rows in the pagination metadata.

pub mod rules;

use alloy_primitives::Address;
use std::collections::{HashMap, HashSet};

use crate::models::common::CallerContext;
use crate::models::entities::logs::Log;
use crate::models::entities::transactions::Transaction;
use crate::models::errors::QueryError;
use crate::utils::address_topic;

pub use rules::{HttpRuleSource, PermissionRule, RuleSource, RuleSourceError, StaticRuleSource, TopicPattern};

/// Permission rules fetched for one request, grouped by contract address.
#[derive(Debug, Default)]
pub struct RuleSet {
    by_contract: HashMap<Address, Vec<PermissionRule>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fetch rules for every contract in `contracts`. Any fetch failure fails
    /// the whole request: visibility has no safe fallback.
    pub async fn load<S>(source: &S, contracts: HashSet<Address>) -> Result<Self, QueryError>
    where
        S: RuleSource + ?Sized,
    {
        let mut by_contract = HashMap::with_capacity(contracts.len());
        for contract in contracts {
            let rules = source
                .fetch_event_permission_rules(contract)
                .await
                .map_err(|e| QueryError::RuleSourceUnavailable(e.to_string()))?;
            by_contract.insert(contract, rules);
        }
        Ok(Self { by_contract })
    }

    pub fn for_contract(&self, contract: &Address) -> &[PermissionRule] {
        self.by_contract.get(contract).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Whether `caller` may see `log` given the rules configured for the log's
/// contract.
pub fn log_visible(log: &Log, rules: &[PermissionRule], caller: &CallerContext) -> bool {
    let caller_address = match caller {
        CallerContext::Admin => return true,
        CallerContext::Authenticated(address) => Some(*address),
        CallerContext::Anonymous => None,
    };

    // Participant shortcut: the caller's address, left-padded to 32 bytes,
    // sits in one of the topic slots.
    if let Some(address) = caller_address {
        if log.topics.contains(&address_topic(&address)) {
            return true;
        }
    }

    rules
        .iter()
        .filter(|rule| rule.contract_address == log.address)
        .any(|rule| rule_matches(rule, log, caller_address))
}

/// Whether `caller` may see `transaction`. `related_logs` are the logs the
/// ingestion pipeline wrote for this transaction; any visible log makes the
/// transaction visible.
pub fn transaction_visible(
    transaction: &Transaction,
    related_logs: &[Log],
    rule_set: &RuleSet,
    caller: &CallerContext,
) -> bool {
    match caller {
        CallerContext::Admin => return true,
        CallerContext::Authenticated(address) => {
            if transaction.from == *address || transaction.to == Some(*address) {
                return true;
            }
        }
        CallerContext::Anonymous => {}
    }

    related_logs
        .iter()
        .any(|log| log_visible(log, rule_set.for_contract(&log.address), caller))
}

fn rule_matches(rule: &PermissionRule, log: &Log, caller: Option<Address>) -> bool {
    if let Some(selector) = &rule.topic0 {
        if log.topics.first() != Some(selector) {
            return false;
        }
    }
    rule.topics
        .iter()
        .enumerate()
        .all(|(i, pattern)| topic_matches(pattern, log.topics.get(i + 1), caller))
}

fn topic_matches(
    pattern: &TopicPattern,
    topic: Option<&alloy_primitives::FixedBytes<32>>,
    caller: Option<Address>,
) -> bool {
    match pattern {
        TopicPattern::Any => true,
        TopicPattern::Exact(value) => topic == Some(value),
        // Anonymous callers can never satisfy a substitution pattern.
        TopicPattern::CallerAddress => match caller {
            Some(address) => topic == Some(&address_topic(&address)),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, FixedBytes, U256, address, b256};
    use chrono::{TimeZone, Utc};

    const TRANSFER_SELECTOR: FixedBytes<32> =
        b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

    fn contract() -> Address {
        address!("52908400098527886E0F7030069857D2E4169EE7")
    }

    fn caller() -> Address {
        address!("de0B295669a9FD93d5F28D9Ec85E40f4cb697BAe")
    }

    fn log_with_topics(topics: Vec<FixedBytes<32>>) -> Log {
        Log {
            transaction_hash: b256!(
                "1111111111111111111111111111111111111111111111111111111111111111"
            ),
            transaction_index: 0,
            log_index: 0,
            block_number: 1,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            address: contract(),
            topics,
            data: Bytes::new(),
        }
    }

    fn tx(from: Address, to: Option<Address>) -> Transaction {
        Transaction {
            hash: b256!("2222222222222222222222222222222222222222222222222222222222222222"),
            block_number: 1,
            block_hash: b256!(
                "3333333333333333333333333333333333333333333333333333333333333333"
            ),
            transaction_index: 0,
            from,
            to,
            nonce: 0,
            value: U256::ZERO,
            gas_limit: U256::ZERO,
            gas_price: U256::ZERO,
            input: Bytes::new(),
            received_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            receipt: None,
        }
    }

    fn exact_rule(topic1: FixedBytes<32>) -> PermissionRule {
        PermissionRule {
            contract_address: contract(),
            topic0: Some(TRANSFER_SELECTOR),
            topics: [TopicPattern::Exact(topic1), TopicPattern::Any, TopicPattern::Any],
        }
    }

    #[test]
    fn exact_rule_matches_only_equal_topic() {
        let expected = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
        let rule = exact_rule(expected);
        let other = b256!("00000000000000000000000000000000000000000000000000000000000000bb");
        let anon = CallerContext::Anonymous;

        let matching = log_with_topics(vec![TRANSFER_SELECTOR, expected, other, other]);
        assert!(log_visible(&matching, std::slice::from_ref(&rule), &anon));

        let mismatched = log_with_topics(vec![TRANSFER_SELECTOR, other]);
        assert!(!log_visible(&mismatched, std::slice::from_ref(&rule), &anon));

        let wrong_selector = log_with_topics(vec![other, expected]);
        assert!(!log_visible(&wrong_selector, &[rule], &anon));
    }

    #[test]
    fn wildcard_topic0_matches_any_selector() {
        let rule = PermissionRule {
            contract_address: contract(),
            topic0: None,
            topics: [TopicPattern::Any, TopicPattern::Any, TopicPattern::Any],
        };
        let log = log_with_topics(vec![b256!(
            "00000000000000000000000000000000000000000000000000000000000000cc"
        )]);
        assert!(log_visible(&log, &[rule], &CallerContext::Anonymous));
    }

    #[test]
    fn participant_shortcut_beats_missing_rules() {
        let log = log_with_topics(vec![TRANSFER_SELECTOR, address_topic(&caller())]);
        assert!(log_visible(&log, &[], &CallerContext::Authenticated(caller())));
        // Same log, no identity: nothing grants access.
        assert!(!log_visible(&log, &[], &CallerContext::Anonymous));
    }

    #[test]
    fn zero_rules_is_a_deny() {
        let log = log_with_topics(vec![TRANSFER_SELECTOR]);
        assert!(!log_visible(&log, &[], &CallerContext::Authenticated(caller())));
    }

    #[test]
    fn caller_substitution_requires_matching_identity() {
        let rule = PermissionRule {
            contract_address: contract(),
            topic0: Some(TRANSFER_SELECTOR),
            topics: [TopicPattern::CallerAddress, TopicPattern::Any, TopicPattern::Any],
        };
        let log = log_with_topics(vec![TRANSFER_SELECTOR, address_topic(&caller())]);

        assert!(log_visible(&log, std::slice::from_ref(&rule), &CallerContext::Authenticated(caller())));

        let stranger = address!("8617E340B3D01FA5F11F306F4090FD50E238070D");
        // The topic also fails the participant shortcut for the stranger.
        assert!(!log_visible(
            &log,
            std::slice::from_ref(&rule),
            &CallerContext::Authenticated(stranger)
        ));
        assert!(!log_visible(&log, &[rule], &CallerContext::Anonymous));
    }

    #[test]
    fn anonymous_matches_exact_only_rules() {
        let expected = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
        let rule = exact_rule(expected);
        let log = log_with_topics(vec![TRANSFER_SELECTOR, expected]);
        assert!(log_visible(&log, &[rule], &CallerContext::Anonymous));
    }

    #[test]
    fn admin_bypasses_rule_evaluation() {
        let log = log_with_topics(vec![]);
        assert!(log_visible(&log, &[], &CallerContext::Admin));
        let transaction = tx(caller(), None);
        assert!(transaction_visible(&transaction, &[], &RuleSet::empty(), &CallerContext::Admin));
    }

    #[test]
    fn transaction_party_is_always_visible_to_itself() {
        let me = caller();
        let transaction = tx(me, None);
        assert!(transaction_visible(
            &transaction,
            &[],
            &RuleSet::empty(),
            &CallerContext::Authenticated(me)
        ));

        let as_recipient = tx(address!("8617E340B3D01FA5F11F306F4090FD50E238070D"), Some(me));
        assert!(transaction_visible(
            &as_recipient,
            &[],
            &RuleSet::empty(),
            &CallerContext::Authenticated(me)
        ));

        // A third party with no rules and no visible logs sees nothing.
        assert!(!transaction_visible(
            &as_recipient,
            &[],
            &RuleSet::empty(),
            &CallerContext::Anonymous
        ));
    }

    #[tokio::test]
    async fn rule_set_load_groups_by_contract() {
        let rule = exact_rule(b256!(
            "00000000000000000000000000000000000000000000000000000000000000aa"
        ));
        let source = StaticRuleSource::new(vec![rule.clone()]);
        let rule_set =
            RuleSet::load(&source, HashSet::from([contract()])).await.unwrap();
        assert_eq!(rule_set.for_contract(&contract()), std::slice::from_ref(&rule));
        assert!(rule_set.for_contract(&caller()).is_empty());
    }
}
