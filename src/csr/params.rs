use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519;
use der::asn1::{Any, PrintableStringRef, SetOfVec};
use der::{Tag, Tagged};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::SignatureHash;
use crate::error::{CertOrderError, Result};

/// Parameters for building a certificate request.
///
/// # Fields
/// * `subject` - The subject; its common name is always the first host.
/// * `hosts` - The hosts the certificate is requested for.
/// * `rsa_hash` - Digest used when signing with an RSA key.
#[derive(Clone, Debug)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub hosts: HostList,
    pub rsa_hash: SignatureHash,
}

impl CertificationRequestInfo {
    /// Combines a subject template with a host list. The template's common name is
    /// replaced by the first host, verbatim.
    pub fn new(subject_template: DistinguishedName, hosts: HostList) -> Self {
        let subject = DistinguishedName {
            common_name: hosts.common_name().to_string(),
            ..subject_template
        };
        Self {
            subject,
            hosts,
            rsa_hash: SignatureHash::default(),
        }
    }

    /// Picks the digest used when the request is signed by an RSA key.
    pub fn with_rsa_hash(mut self, rsa_hash: SignatureHash) -> Self {
        self.rsa_hash = rsa_hash;
        self
    }
}

/// Distinguished name of a certificate request subject.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default, into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name.
    ///
    /// Attributes are emitted in the order C, ST, L, O, OU, CN. Unset or empty
    /// attributes are left out. The country is a PrintableString when its characters
    /// allow it, everything else a UTF8String.
    pub fn as_x509_name(&self) -> Result<Name> {
        let attributes = [
            (rfc4519::C, self.country.as_deref(), Tag::PrintableString),
            (rfc4519::ST, self.state.as_deref(), Tag::Utf8String),
            (rfc4519::L, self.locality.as_deref(), Tag::Utf8String),
            (rfc4519::O, self.organization.as_deref(), Tag::Utf8String),
            (rfc4519::OU, self.organization_unit.as_deref(), Tag::Utf8String),
            (rfc4519::CN, Some(self.common_name.as_str()), Tag::Utf8String),
        ];

        let mut rdns = Vec::new();
        for (oid, value, tag) in attributes {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let tag = match tag {
                Tag::PrintableString if PrintableStringRef::new(value).is_err() => Tag::Utf8String,
                tag => tag,
            };
            rdns.push(relative_name(oid, value, tag)?);
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// Only the attributes this type models are read; repeated attributes keep
    /// their last value.
    pub fn from_x509_name(x509dn: &Name) -> Result<Self> {
        let mut dn = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = attribute_string(attr)?;
                match attr.oid {
                    rfc4519::CN => dn.common_name = value,
                    rfc4519::C => dn.country = Some(value),
                    rfc4519::ST => dn.state = Some(value),
                    rfc4519::L => dn.locality = Some(value),
                    rfc4519::O => dn.organization = Some(value),
                    rfc4519::OU => dn.organization_unit = Some(value),
                    _ => {}
                }
            }
        }

        Ok(dn)
    }

    /// Organizational units of the subject, as sent with an order.
    pub fn organization_units(&self) -> Vec<String> {
        self.organization_unit
            .iter()
            .filter(|ou| !ou.is_empty())
            .cloned()
            .collect()
    }
}

fn relative_name(oid: ObjectIdentifier, value: &str, tag: Tag) -> Result<RelativeDistinguishedName> {
    let value = Any::new(tag, value.as_bytes())
        .map_err(|e| CertOrderError::CsrConstructionFailed(e.to_string()))?;
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])
        .map_err(|e| CertOrderError::CsrConstructionFailed(e.to_string()))?;
    Ok(RelativeDistinguishedName(set))
}

fn attribute_string(attr: &AttributeTypeAndValue) -> Result<String> {
    match attr.value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            String::from_utf8(attr.value.value().to_vec()).map_err(|e| {
                CertOrderError::CsrParseFailed(format!("attribute {} is not UTF-8: {e}", attr.oid))
            })
        }
        tag => Err(CertOrderError::CsrParseFailed(format!(
            "attribute {} has unsupported string type {tag}",
            attr.oid
        ))),
    }
}

/// A host a certificate is requested for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Host {
    Dns(String),
    Ip(IpAddr),
}

impl Host {
    /// Classifies a host token: textual IPv4 and IPv6 addresses become
    /// [`Host::Ip`], anything else is a DNS name.
    pub fn classify(token: &str) -> Self {
        match token.parse::<IpAddr>() {
            Ok(ip) => Host::Ip(ip),
            Err(_) => Host::Dns(token.to_string()),
        }
    }
}

/// The ordered, non-empty list of hosts a certificate is requested for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostList {
    tokens: Vec<String>,
    hosts: Vec<Host>,
}

impl HostList {
    /// Parses a comma-separated host list.
    ///
    /// Tokens are trimmed and empty tokens dropped. A list with no usable token is
    /// rejected, since the first token becomes the request's common name.
    pub fn parse(hosts: &str) -> Result<Self> {
        let tokens: Vec<String> = hosts
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            return Err(CertOrderError::InvalidInput(
                "host list must contain at least one host".to_string(),
            ));
        }

        let hosts = tokens.iter().map(|token| Host::classify(token)).collect();
        Ok(Self { tokens, hosts })
    }

    /// The first host, exactly as given.
    pub fn common_name(&self) -> &str {
        &self.tokens[0]
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn dns_names(&self) -> Vec<String> {
        self.hosts
            .iter()
            .filter_map(|host| match host {
                Host::Dns(name) => Some(name.clone()),
                Host::Ip(_) => None,
            })
            .collect()
    }

    pub fn ip_addresses(&self) -> Vec<IpAddr> {
        self.hosts
            .iter()
            .filter_map(|host| match host {
                Host::Ip(ip) => Some(*ip),
                Host::Dns(_) => None,
            })
            .collect()
    }
}
