use alloy_primitives::{Address, FixedBytes};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

use crate::utils::{checksum, parse_address, parse_topic};

#[derive(Error, Debug)]
pub enum RuleSourceError {
    #[error("rule source transport error: {0}")]
    Transport(String),
    #[error("invalid rule payload: {0}")]
    InvalidPayload(String),
}

/// One topic slot pattern of a permission rule. A closed set: absent slots
/// match anything, exact slots match byte-for-byte, and caller-substitution
/// slots match the requesting caller's own address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicPattern {
    Any,
    Exact(FixedBytes<32>),
    CallerAddress,
}

/// An externally configured predicate over a log's topic slots. `topic0` of
/// `None` is a wildcard selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRule {
    pub contract_address: Address,
    pub topic0: Option<FixedBytes<32>>,
    pub topics: [TopicPattern; 3],
}

/// Where permission rules come from. Injected explicitly; fetched per request
/// with no cross-request caching. A fetch failure must fail the request;
/// there is no safe default for visibility.
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn fetch_event_permission_rules(
        &self,
        contract_address: Address,
    ) -> Result<Vec<PermissionRule>, RuleSourceError>;
}

/// Fixed in-process rule table. Used for config-driven deployments and tests.
#[derive(Debug, Default)]
pub struct StaticRuleSource {
    rules: HashMap<Address, Vec<PermissionRule>>,
}

impl StaticRuleSource {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        let mut by_contract: HashMap<Address, Vec<PermissionRule>> = HashMap::new();
        for rule in rules {
            by_contract.entry(rule.contract_address).or_default().push(rule);
        }
        Self { rules: by_contract }
    }
}

#[async_trait]
impl RuleSource for StaticRuleSource {
    async fn fetch_event_permission_rules(
        &self,
        contract_address: Address,
    ) -> Result<Vec<PermissionRule>, RuleSourceError> {
        Ok(self.rules.get(&contract_address).cloned().unwrap_or_default())
    }
}

/// HTTP-backed rule source. Queries
/// `GET {endpoint}?contractAddress=0x...` and expects a JSON array of rules
/// shaped `{contractAddress, topic0, topic1..topic3}` where each topicN is
/// `{"equalTo": value}`, `{"userAddress": true}`, or null.
#[derive(Debug, Clone)]
pub struct HttpRuleSource {
    client: Client,
    endpoint: Url,
}

impl HttpRuleSource {
    pub fn new(endpoint: Url) -> Self {
        Self { client: Client::new(), endpoint }
    }
}

#[async_trait]
impl RuleSource for HttpRuleSource {
    async fn fetch_event_permission_rules(
        &self,
        contract_address: Address,
    ) -> Result<Vec<PermissionRule>, RuleSourceError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("contractAddress", checksum(&contract_address))])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RuleSourceError::Transport(e.to_string()))?;
        let wire: Vec<WireRule> = response
            .json()
            .await
            .map_err(|e| RuleSourceError::InvalidPayload(e.to_string()))?;
        wire.into_iter().map(PermissionRule::try_from).collect()
    }
}

//////////////////////////////////// Wire shape /////////////////////////////////////

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRule {
    pub contract_address: String,
    pub topic0: Option<String>,
    pub topic1: Option<WirePattern>,
    pub topic2: Option<WirePattern>,
    pub topic3: Option<WirePattern>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WirePattern {
    Exact {
        #[serde(rename = "equalTo")]
        equal_to: String,
    },
    Caller {
        #[serde(rename = "userAddress")]
        user_address: bool,
    },
}

impl TryFrom<WireRule> for PermissionRule {
    type Error = RuleSourceError;

    fn try_from(wire: WireRule) -> Result<Self, Self::Error> {
        let contract_address = parse_address(&wire.contract_address)
            .map_err(|e| RuleSourceError::InvalidPayload(e.to_string()))?;
        let topic0 = wire
            .topic0
            .as_deref()
            .map(parse_topic)
            .transpose()
            .map_err(|e| RuleSourceError::InvalidPayload(e.to_string()))?;
        let topics = [
            convert_pattern(wire.topic1)?,
            convert_pattern(wire.topic2)?,
            convert_pattern(wire.topic3)?,
        ];
        Ok(Self { contract_address, topic0, topics })
    }
}

fn convert_pattern(wire: Option<WirePattern>) -> Result<TopicPattern, RuleSourceError> {
    match wire {
        None => Ok(TopicPattern::Any),
        Some(WirePattern::Exact { equal_to }) => {
            let value =
                parse_topic(&equal_to).map_err(|e| RuleSourceError::InvalidPayload(e.to_string()))?;
            Ok(TopicPattern::Exact(value))
        }
        Some(WirePattern::Caller { user_address: true }) => Ok(TopicPattern::CallerAddress),
        Some(WirePattern::Caller { user_address: false }) => Err(
            RuleSourceError::InvalidPayload("userAddress pattern must be true".to_owned()),
        ),
    }
}
