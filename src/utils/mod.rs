use alloy_primitives::{Address, FixedBytes, hex};
use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::common::Config;
use crate::models::errors::QueryError;

/// Initialize tracing for embedding applications and tests. Defaults to INFO
/// when RUST_LOG is unset.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    let config_path = file_name.as_ref();
    info!("Config path: {}", config_path.to_string_lossy());

    // Read the file contents to a string
    let contents = fs::read_to_string(config_path).context("failed to read config file")?;

    // Parse the YAML into our Config struct
    let config: Config =
        serde_yaml::from_str(&contents).context("failed to parse config YAML")?;

    Ok(config)
}

/// Parse an address accepted case-insensitively, with or without a 0x prefix.
pub fn parse_address(s: &str) -> Result<Address, QueryError> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|_| QueryError::InvalidAddress(s.to_owned()))?;
    if bytes.len() != 20 {
        return Err(QueryError::InvalidAddress(s.to_owned()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Canonical checksummed rendering for address-typed output.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Parse a topic value accepted with or without a 0x prefix; values shorter
/// than 32 bytes are left-padded into the slot.
pub fn parse_topic(s: &str) -> Result<FixedBytes<32>, QueryError> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|_| QueryError::InvalidHex(s.to_owned()))?;
    if bytes.len() > 32 {
        return Err(QueryError::InvalidHex(s.to_owned()));
    }
    let mut slot = [0u8; 32];
    slot[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(FixedBytes::from(slot))
}

/// An address left-padded into a 32-byte topic slot.
pub fn address_topic(address: &Address) -> FixedBytes<32> {
    let mut slot = [0u8; 32];
    slot[12..].copy_from_slice(address.as_slice());
    FixedBytes::from(slot)
}

/// The address stored in a topic slot, if the high 12 bytes are zero.
pub fn topic_address(topic: &FixedBytes<32>) -> Option<Address> {
    if topic[..12].iter().all(|b| *b == 0) {
        Some(Address::from_slice(&topic[12..]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn parses_addresses_case_insensitively() {
        let expected = address!("52908400098527886E0F7030069857D2E4169EE7");
        for input in [
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "0x52908400098527886e0f7030069857d2e4169ee7",
            "52908400098527886e0f7030069857d2e4169ee7",
        ] {
            assert_eq!(parse_address(input).unwrap(), expected);
        }
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not hex").is_err());
    }

    #[test]
    fn checksums_on_output() {
        let address = parse_address("0x52908400098527886e0f7030069857d2e4169ee7").unwrap();
        assert_eq!(checksum(&address), "0x52908400098527886E0F7030069857D2E4169EE7");
    }

    #[test]
    fn topic_round_trips_through_padding() {
        let address = address!("de0B295669a9FD93d5F28D9Ec85E40f4cb697BAe");
        let topic = address_topic(&address);
        assert_eq!(
            topic,
            b256!("000000000000000000000000de0b295669a9fd93d5f28d9ec85e40f4cb697bae")
        );
        assert_eq!(topic_address(&topic), Some(address));

        let not_an_address =
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
        assert_eq!(topic_address(&not_an_address), None);
    }

    #[test]
    fn short_topics_left_pad() {
        assert_eq!(
            parse_topic("0x01").unwrap(),
            b256!("0000000000000000000000000000000000000000000000000000000000000001")
        );
    }
}
