//! Cloud ID parsing
//!
//! A Cloud ID is `<cluster_name>:<base64 payload>`, where the payload
//! decodes to `<host>[:<port>]$<es_uuid>[$<kibana_uuid>]`. Each uuid becomes
//! the leftmost DNS label of its service's hostname.

use crate::error::{Error, Result};
use crate::node::{NodeConfig, Scheme};
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::Serialize;
use std::str::FromStr;

/// Port used when the payload doesn't carry one
pub const DEFAULT_CLOUD_PORT: u16 = 443;

/// Standard alphabet; padding is optional
const CLOUD_ID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded Cloud ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudId {
    /// May be empty
    pub cluster_name: String,
    pub es_address: Option<(String, u16)>,
    pub kibana_address: Option<(String, u16)>,
}

impl CloudId {
    /// HTTPS node config for the Elasticsearch endpoint, with compression on
    pub fn es_node_config(&self) -> Result<NodeConfig> {
        let (host, port) = self.es_address.as_ref().ok_or_else(|| {
            Error::configuration("Cloud ID doesn't contain an Elasticsearch address")
        })?;
        NodeConfig::builder(Scheme::Https, host.clone(), *port)
            .http_compress(true)
            .build()
    }
}

impl FromStr for CloudId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_cloud_id(s)
    }
}

/// Parse a Cloud ID into its cluster name and service addresses
pub fn parse_cloud_id(cloud_id: &str) -> Result<CloudId> {
    let (cluster_name, payload) = cloud_id.split_once(':').ok_or(Error::CloudIdFormat)?;

    let decoded = CLOUD_ID_ENGINE
        .decode(payload.as_bytes())
        .map_err(|_| Error::CloudIdFormat)?;
    let decoded = String::from_utf8(decoded).map_err(|_| Error::CloudIdFormat)?;
    if !decoded.is_ascii() {
        return Err(Error::CloudIdFormat);
    }

    let mut parts = decoded.split('$');
    let parent = parts.next().unwrap_or_default();
    let es_uuid = parts.next().filter(|uuid| !uuid.is_empty());
    let kibana_uuid = parts.next().filter(|uuid| !uuid.is_empty());

    let (host, port) = match parent.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| Error::CloudIdFormat)?),
        None => (parent, DEFAULT_CLOUD_PORT),
    };
    if host.is_empty() {
        return Err(Error::CloudIdFormat);
    }

    let address = |uuid: &str| (format!("{}.{}", uuid, host), port);

    Ok(CloudId {
        cluster_name: cluster_name.to_string(),
        es_address: es_uuid.map(address),
        kibana_address: kibana_uuid.map(address),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;

    const HOST: &str = "us-east-1.aws.found.io";
    const ES_HOST: &str = "4fa8821e75634032bed1cf22110e2f97.us-east-1.aws.found.io";
    const KIBANA_HOST: &str = "4fa8821e75634032bed1cf22110e2f96.us-east-1.aws.found.io";

    #[test]
    fn test_parse_cloud_id() {
        let cloud_id = parse_cloud_id(
            "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbyQ0ZmE4ODIxZTc1NjM0MDMyYmVk\
             MWNmMjIxMTBlMmY5NyQ0ZmE4ODIxZTc1NjM0MDMyYmVkMWNmMjIxMTBlMmY5Ng==",
        )
        .unwrap();
        assert_eq!(cloud_id.cluster_name, "cluster");
        assert_eq!(cloud_id.es_address, Some((ES_HOST.to_string(), 443)));
        assert_eq!(cloud_id.kibana_address, Some((KIBANA_HOST.to_string(), 443)));
    }

    #[test]
    fn test_parse_cloud_id_ports() {
        let cases = [
            (
                ":dXMtZWFzdC0xLmF3cy5mb3VuZC5pbzo5MjQzJDRmYTg4MjFlNzU2MzQwMzJi\
                 ZWQxY2YyMjExMGUyZjk3JDRmYTg4MjFlNzU2MzQwMzJiZWQxY2YyMjExMGUyZjk2",
                9243,
            ),
            (
                ":dXMtZWFzdC0xLmF3cy5mb3VuZC5pbzo0NDMkNGZhODgyMWU3NTYzNDAzMmJlZD\
                 FjZjIyMTEwZTJmOTckNGZhODgyMWU3NTYzNDAzMmJlZDFjZjIyMTEwZTJmOTY=",
                443,
            ),
        ];
        for (input, port) in cases {
            let cloud_id = parse_cloud_id(input).unwrap();
            assert_eq!(cloud_id.cluster_name, "");
            assert_eq!(cloud_id.es_address, Some((ES_HOST.to_string(), port)));
            assert_eq!(cloud_id.kibana_address, Some((KIBANA_HOST.to_string(), port)));
        }
    }

    #[test]
    fn test_parse_cloud_id_no_kibana() {
        for input in [
            "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbyQ0ZmE4ODIxZTc1NjM0MDMyYmVkMWNmMjIxMTBlMmY5NyQ=",
            "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbyQ0ZmE4ODIxZTc1NjM0MDMyYmVkMWNmMjIxMTBlMmY5Nw==",
        ] {
            let cloud_id = parse_cloud_id(input).unwrap();
            assert_eq!(cloud_id.cluster_name, "cluster");
            assert_eq!(cloud_id.es_address, Some((ES_HOST.to_string(), 443)));
            assert_eq!(cloud_id.kibana_address, None);
        }
    }

    #[test]
    fn test_parse_cloud_id_no_es() {
        for input in [
            "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbzo0NDMkJA==",
            "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbzo0NDM=",
        ] {
            let cloud_id = parse_cloud_id(input).unwrap();
            assert_eq!(cloud_id.cluster_name, "cluster");
            assert_eq!(cloud_id.es_address, None);
            assert_eq!(cloud_id.kibana_address, None);
        }
    }

    #[test]
    fn test_parse_cloud_id_without_padding() {
        let payload = BASE64.encode(format!("{}$abc$defg", HOST));
        assert!(payload.ends_with("=="));
        let cloud_id = parse_cloud_id(&format!("c:{}", payload.trim_end_matches('='))).unwrap();
        assert_eq!(cloud_id.es_address, Some((format!("abc.{}", HOST), 443)));
        assert_eq!(cloud_id.kibana_address, Some((format!("defg.{}", HOST), 443)));
    }

    #[test]
    fn test_invalid_cloud_id() {
        let bad_port = format!("cluster:{}", BASE64.encode(format!("{}:http$abc", HOST)));
        let empty_host = format!("cluster:{}", BASE64.encode("$abc$def"));
        let non_ascii = format!("cluster:{}", BASE64.encode("hôst$abc"));

        for input in [
            "cluster:",
            "dXMtZWFzdC0xLmF3cy5mb3VuZC5pbyQ0ZmE4ODIxZTc1NjM0MDMyYmVkMWNmMjIxMTBlMmY5NyQ=",
            "cluster:ā",
            "cluster:not base64!",
            bad_port.as_str(),
            empty_host.as_str(),
            non_ascii.as_str(),
        ] {
            let err = parse_cloud_id(input).unwrap_err();
            assert_eq!(err.to_string(), "Cloud ID is not properly formatted", "{}", input);
        }
    }

    #[test]
    fn test_from_str_and_node_config() {
        let cloud_id: CloudId = format!("prod:{}", BASE64.encode(format!("{}:9243$es$kb", HOST)))
            .parse()
            .unwrap();
        let config = cloud_id.es_node_config().unwrap();
        assert_eq!(config.url(), format!("https://es.{}:9243", HOST));
        assert!(config.http_compress());

        let no_es: CloudId = format!("prod:{}", BASE64.encode(HOST)).parse().unwrap();
        assert!(no_es.es_node_config().unwrap_err().is_configuration());
    }

    #[test]
    fn test_serialize() {
        let cloud_id = CloudId {
            cluster_name: "cluster".to_string(),
            es_address: Some(("es.example.com".to_string(), 443)),
            kibana_address: None,
        };
        let json = serde_json::to_value(&cloud_id).unwrap();
        assert_eq!(json["es_address"], serde_json::json!(["es.example.com", 443]));
        assert!(json["kibana_address"].is_null());
    }
}
