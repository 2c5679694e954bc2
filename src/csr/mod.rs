pub mod extensions;
pub mod params;

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{Any, BitString, OctetString, SetOfVec};
use der::{Decode, Encode};
use extensions::{SubjectAltName, ToAndFromX509Extension};
use params::{CertificationRequestInfo, DistinguishedName};
use serde::{Deserialize, Serialize};
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::request::{CertReq, CertReqInfo, ExtensionReq, Version};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{CertOrderError, Result};
use crate::key::KeyPair;
use crate::pem_utils::{CERTIFICATE_REQUEST_LABEL, der_to_pem, pem_to_der};

/// Signature algorithms a certificate request can be signed with.
///
/// Parsing a request signed with anything else yields [`SignatureAlgorithm::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
    /// SHA-384 with RSA encryption.
    Sha384WithRSA,
    /// SHA-512 with RSA encryption.
    Sha512WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// SHA-512 with ECDSA.
    Sha512WithECDSA,
    /// Any other algorithm, by OID.
    Other(ObjectIdentifier),
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRSA => const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRSA => const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Sha512WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Other(oid) => *oid,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        match oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => SignatureAlgorithm::Sha256WithRSA,
            const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION => SignatureAlgorithm::Sha384WithRSA,
            const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION => SignatureAlgorithm::Sha512WithRSA,
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => SignatureAlgorithm::Sha256WithECDSA,
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => SignatureAlgorithm::Sha384WithECDSA,
            const_oid::db::rfc5912::ECDSA_WITH_SHA_512 => SignatureAlgorithm::Sha512WithECDSA,
            other => SignatureAlgorithm::Other(other),
        }
    }

    /// The hash the CA should sign the certificate with.
    ///
    /// SHA-384 and SHA-512 based algorithms map to their hash; everything else,
    /// including unknown algorithms, maps to SHA-256.
    pub fn signature_hash(&self) -> SignatureHash {
        match self {
            SignatureAlgorithm::Sha384WithRSA | SignatureAlgorithm::Sha384WithECDSA => {
                SignatureHash::Sha384
            }
            SignatureAlgorithm::Sha512WithRSA | SignatureAlgorithm::Sha512WithECDSA => {
                SignatureHash::Sha512
            }
            _ => SignatureHash::Sha256,
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// RSA identifiers carry explicit NULL parameters, ECDSA identifiers none.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value {
            SignatureAlgorithm::Sha256WithRSA
            | SignatureAlgorithm::Sha384WithRSA
            | SignatureAlgorithm::Sha512WithRSA => Some(Any::null()),
            _ => None,
        };
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// Hash names understood by the CA's order api.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureHash {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl SignatureHash {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureHash::Sha256 => "sha256",
            SignatureHash::Sha384 => "sha384",
            SignatureHash::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureHash {
    type Err = CertOrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(SignatureHash::Sha256),
            "sha384" => Ok(SignatureHash::Sha384),
            "sha512" => Ok(SignatureHash::Sha512),
            other => Err(CertOrderError::InvalidInput(format!(
                "unsupported signature hash {other:?}, valid values are sha256, sha384 and sha512"
            ))),
        }
    }
}

/// A signed PKCS#10 certificate request, together with the fields parsed back out
/// of its encoding.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    /// The inner representation of the request.
    pub inner: CertReq,
    der: Vec<u8>,
    subject: DistinguishedName,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    signature_algorithm: SignatureAlgorithm,
}

impl CertificateRequest {
    /// Builds and signs a request, then parses the encoding back.
    ///
    /// Encoding or signing failures abort with `CsrConstructionFailed` before any
    /// parsing happens. A request whose encoding does not parse is never returned.
    pub fn generate(info: &CertificationRequestInfo, key: &KeyPair) -> Result<Self> {
        let der = Self::encode(info, key)?;
        let request = Self::from_der(&der)?;
        tracing::debug!(
            common_name = %request.subject.common_name,
            dns_names = request.dns_names.len(),
            ip_addresses = request.ip_addresses.len(),
            signature_algorithm = ?request.signature_algorithm,
            "built certificate request"
        );
        Ok(request)
    }

    fn encode(info: &CertificationRequestInfo, key: &KeyPair) -> Result<Vec<u8>> {
        let construction = |e: der::Error| CertOrderError::CsrConstructionFailed(e.to_string());

        let san = SubjectAltName {
            dns_names: info.hosts.dns_names(),
            ip_addresses: info.hosts.ip_addresses(),
        };

        let mut attributes = Vec::new();
        if !san.is_empty() {
            let extension = Extension {
                extn_id: SubjectAltName::OID,
                critical: false,
                extn_value: OctetString::new(san.to_x509_extension_value()?).map_err(construction)?,
            };
            let value = Any::encode_from(&vec![extension]).map_err(construction)?;
            attributes.push(Attribute {
                oid: ExtensionReq::OID,
                values: SetOfVec::try_from(vec![value]).map_err(construction)?,
            });
        }

        let request_info = CertReqInfo {
            version: Version::V1,
            subject: info.subject.as_x509_name()?,
            public_key: key.as_spki()?,
            attributes: SetOfVec::try_from(attributes).map_err(construction)?,
        };

        let signature_algorithm = key.signature_algorithm(info.rsa_hash);
        let signature = key.sign_data(&request_info.to_der().map_err(construction)?, &signature_algorithm)?;

        let request = CertReq {
            info: request_info,
            algorithm: signature_algorithm.into(),
            signature: BitString::from_bytes(&signature).map_err(construction)?,
        };
        request.to_der().map_err(construction)
    }

    /// Parses a DER encoded request.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parse = |e: der::Error| CertOrderError::CsrParseFailed(e.to_string());

        let inner = CertReq::from_der(der).map_err(parse)?;
        let subject = DistinguishedName::from_x509_name(&inner.info.subject)?;

        let mut san = SubjectAltName::default();
        for attribute in inner.info.attributes.iter() {
            if attribute.oid != ExtensionReq::OID {
                continue;
            }
            for value in attribute.values.iter() {
                let extensions = Vec::<Extension>::from_der(&value.to_der().map_err(parse)?).map_err(parse)?;
                for extension in extensions {
                    if extension.extn_id == SubjectAltName::OID {
                        san = SubjectAltName::from_x509_extension_value(extension.extn_value.as_bytes())?;
                    }
                }
            }
        }

        let signature_algorithm = SignatureAlgorithm::from_oid(inner.algorithm.oid);

        Ok(Self {
            inner,
            der: der.to_vec(),
            subject,
            dns_names: san.dns_names,
            ip_addresses: san.ip_addresses,
            signature_algorithm,
        })
    }

    /// Parses a PEM encoded request.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let der = pem_to_der(pem_str, CERTIFICATE_REQUEST_LABEL)
            .map_err(|e| CertOrderError::CsrParseFailed(e.to_string()))?;
        Self::from_der(&der)
    }

    /// The DER encoding the request was parsed from.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// Encodes the request as a `CERTIFICATE REQUEST` PEM block.
    pub fn to_pem(&self) -> String {
        der_to_pem(&self.der, CERTIFICATE_REQUEST_LABEL)
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    pub fn signature_algorithm(&self) -> &SignatureAlgorithm {
        &self.signature_algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_hash_mapping_is_total() {
        let cases = [
            (SignatureAlgorithm::Sha256WithRSA, SignatureHash::Sha256),
            (SignatureAlgorithm::Sha384WithRSA, SignatureHash::Sha384),
            (SignatureAlgorithm::Sha512WithRSA, SignatureHash::Sha512),
            (SignatureAlgorithm::Sha256WithECDSA, SignatureHash::Sha256),
            (SignatureAlgorithm::Sha384WithECDSA, SignatureHash::Sha384),
            (SignatureAlgorithm::Sha512WithECDSA, SignatureHash::Sha512),
            (
                SignatureAlgorithm::Other(const_oid::db::rfc8410::ID_ED_25519),
                SignatureHash::Sha256,
            ),
        ];
        for (algorithm, hash) in cases {
            assert_eq!(algorithm.signature_hash(), hash, "{algorithm:?}");
        }
    }

    #[test]
    fn oids_round_trip() {
        for algorithm in [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithRSA,
            SignatureAlgorithm::Sha512WithRSA,
            SignatureAlgorithm::Sha256WithECDSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::Sha512WithECDSA,
        ] {
            assert_eq!(SignatureAlgorithm::from_oid(algorithm.oid()), algorithm);
        }
    }

    #[test]
    fn signature_hash_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SignatureHash::Sha384).unwrap(), "\"sha384\"");
        assert_eq!("sha512".parse::<SignatureHash>().unwrap(), SignatureHash::Sha512);
        assert!("SHA256".parse::<SignatureHash>().is_err());
    }

    #[test]
    fn garbage_does_not_parse() {
        let err = CertificateRequest::from_der(&[0x30, 0x03, 0x02, 0x01, 0x01]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CsrParseFailed);
    }
}
