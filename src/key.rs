use std::fmt;
use std::str::FromStr;

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::Encode;
use p256::NistP256;
use p256::ecdsa::signature::Signer as EcdsaSigner;
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::NistP384;
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::DecodePrivateKey;
use rand_core::CryptoRngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::signature::SignatureEncoding;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sec1::{EcParameters, EcPrivateKey};
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::csr::{SignatureAlgorithm, SignatureHash};
use crate::error::{CertOrderError, Result};
use crate::pem_utils::{EC_PRIVATE_KEY_LABEL, PKCS8_PRIVATE_KEY_LABEL, RSA_PRIVATE_KEY_LABEL};

/// Modulus size used when the caller does not pick one.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Key algorithms a [`KeyPair`] can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa { bits: usize },
    EcdsaP256,
    EcdsaP384,
}

impl KeyAlgorithm {
    /// Resolves a curve selector: an empty selector means RSA with `rsa_bits`,
    /// `"P256"` and `"P384"` select the matching curve.
    ///
    /// Any other selector is rejected rather than falling back to a default.
    pub fn from_selector(selector: &str, rsa_bits: usize) -> Result<Self> {
        match selector {
            "" => Ok(KeyAlgorithm::Rsa { bits: rsa_bits }),
            "P256" => Ok(KeyAlgorithm::EcdsaP256),
            "P384" => Ok(KeyAlgorithm::EcdsaP384),
            other => Err(CertOrderError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        KeyAlgorithm::Rsa {
            bits: DEFAULT_RSA_BITS,
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = CertOrderError;

    fn from_str(selector: &str) -> Result<Self> {
        Self::from_selector(selector, DEFAULT_RSA_BITS)
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa { bits } => write!(f, "RSA-{bits}"),
            KeyAlgorithm::EcdsaP256 => f.write_str("ECDSA-P256"),
            KeyAlgorithm::EcdsaP384 => f.write_str("ECDSA-P384"),
        }
    }
}

/// Supported key types for certificate requests.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a key pair using the operating system's random source.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        Self::generate_with_rng(algorithm, &mut rand_core::OsRng)
    }

    /// Generate a key pair from the given cryptographically secure random source.
    pub fn generate_with_rng<R: CryptoRngCore>(
        algorithm: KeyAlgorithm,
        rng: &mut R,
    ) -> Result<Self> {
        let key = match algorithm {
            KeyAlgorithm::Rsa { bits } => {
                let private = RsaPrivateKey::new(rng, bits)?;
                let public = RsaPublicKey::from(&private);
                KeyPair::Rsa {
                    private: Box::new(private),
                    public,
                }
            }
            KeyAlgorithm::EcdsaP256 => {
                let signing_key = P256SigningKey::random(rng);
                let verifying_key = signing_key.verifying_key().to_owned();
                KeyPair::EcdsaP256 {
                    signing_key,
                    verifying_key,
                }
            }
            KeyAlgorithm::EcdsaP384 => {
                let signing_key = P384SigningKey::random(rng);
                let verifying_key = signing_key.verifying_key().to_owned();
                KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                }
            }
        };
        tracing::debug!(algorithm = %key.algorithm(), "generated private key");
        Ok(key)
    }

    /// The algorithm this key pair belongs to.
    pub fn algorithm(&self) -> KeyAlgorithm {
        use rsa::traits::PublicKeyParts;

        match self {
            KeyPair::Rsa { public, .. } => KeyAlgorithm::Rsa {
                bits: public.n().bits(),
            },
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
        }
    }

    /// The public half as a SubjectPublicKeyInfo structure.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            KeyPair::Rsa { public, .. } => SubjectPublicKeyInfoOwned::from_key(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            KeyPair::EcdsaP384 { verifying_key, .. } => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
        };
        spki.map_err(|e| CertOrderError::CsrConstructionFailed(e.to_string()))
    }

    /// The signature algorithm used when this key signs a request.
    ///
    /// RSA keys honour `rsa_hash`. Elliptic curve keys always sign with the digest
    /// native to their curve: SHA-256 for P-256 and SHA-384 for P-384.
    pub fn signature_algorithm(&self, rsa_hash: SignatureHash) -> SignatureAlgorithm {
        match (self, rsa_hash) {
            (KeyPair::Rsa { .. }, SignatureHash::Sha256) => SignatureAlgorithm::Sha256WithRSA,
            (KeyPair::Rsa { .. }, SignatureHash::Sha384) => SignatureAlgorithm::Sha384WithRSA,
            (KeyPair::Rsa { .. }, SignatureHash::Sha512) => SignatureAlgorithm::Sha512WithRSA,
            (KeyPair::EcdsaP256 { .. }, _) => SignatureAlgorithm::Sha256WithECDSA,
            (KeyPair::EcdsaP384 { .. }, _) => SignatureAlgorithm::Sha384WithECDSA,
        }
    }

    /// Signs `data` with the given algorithm.
    ///
    /// RSA signatures use PKCS#1 v1.5, ECDSA signatures are DER encoded.
    pub fn sign_data(&self, data: &[u8], algorithm: &SignatureAlgorithm) -> Result<Vec<u8>> {
        let mismatch = || {
            CertOrderError::CsrConstructionFailed(format!(
                "{} key cannot sign with {algorithm:?}",
                self.algorithm()
            ))
        };

        match (self, algorithm) {
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::Sha256WithRSA) => {
                let signing_key = RsaSigningKey::<Sha256>::new(private.as_ref().clone());
                Ok(signing_key.try_sign(data).map_err(signing_failed)?.to_vec())
            }
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::Sha384WithRSA) => {
                let signing_key = RsaSigningKey::<Sha384>::new(private.as_ref().clone());
                Ok(signing_key.try_sign(data).map_err(signing_failed)?.to_vec())
            }
            (KeyPair::Rsa { private, .. }, SignatureAlgorithm::Sha512WithRSA) => {
                let signing_key = RsaSigningKey::<Sha512>::new(private.as_ref().clone());
                Ok(signing_key.try_sign(data).map_err(signing_failed)?.to_vec())
            }
            (KeyPair::EcdsaP256 { signing_key, .. }, SignatureAlgorithm::Sha256WithECDSA) => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_failed)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::EcdsaP384 { signing_key, .. }, SignatureAlgorithm::Sha384WithECDSA) => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_failed)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            _ => Err(mismatch()),
        }
    }

    /// Encodes the private key in its algorithm's canonical binary form:
    /// PKCS#1 for RSA and SEC1 for elliptic curve keys.
    ///
    /// SEC1 keys always name their curve and carry the uncompressed public point.
    pub fn private_key_der(&self) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => Ok(private.to_pkcs1_der()?.as_bytes().to_vec()),
            KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            } => sec1_der(
                &signing_key.to_bytes(),
                verifying_key.to_encoded_point(false).as_bytes(),
                NistP256::OID,
            ),
            KeyPair::EcdsaP384 {
                signing_key,
                verifying_key,
            } => sec1_der(
                &signing_key.to_bytes(),
                verifying_key.to_encoded_point(false).as_bytes(),
                NistP384::OID,
            ),
        }
    }

    /// The PEM label matching [`KeyPair::private_key_der`].
    pub fn pem_label(&self) -> &'static str {
        match self {
            KeyPair::Rsa { .. } => RSA_PRIVATE_KEY_LABEL,
            KeyPair::EcdsaP256 { .. } | KeyPair::EcdsaP384 { .. } => EC_PRIVATE_KEY_LABEL,
        }
    }

    /// Encodes the private key as a PEM block labeled `RSA PRIVATE KEY` or
    /// `EC PRIVATE KEY`.
    pub fn to_pem(&self) -> Result<String> {
        let der = self.private_key_der()?;
        Ok(crate::pem_utils::der_to_pem(&der, self.pem_label()))
    }

    /// Loads a private key from a PEM block.
    ///
    /// Accepts PKCS#1 `RSA PRIVATE KEY`, SEC1 `EC PRIVATE KEY` on P-256 or P-384, and
    /// PKCS#8 `PRIVATE KEY` holding any of those.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str)
            .map_err(|e| CertOrderError::InvalidInput(format!("invalid PEM: {e}")))?;
        let der = block.contents();

        match block.tag() {
            RSA_PRIVATE_KEY_LABEL => {
                let private = RsaPrivateKey::from_pkcs1_der(der)
                    .map_err(|e| CertOrderError::InvalidInput(e.to_string()))?;
                Ok(Self::from_rsa(private))
            }
            EC_PRIVATE_KEY_LABEL => {
                fn invalid(e: impl std::fmt::Display) -> CertOrderError {
                    CertOrderError::InvalidInput(e.to_string())
                }
                let ec_key = EcPrivateKey::try_from(der).map_err(invalid)?;
                match ec_key.parameters.and_then(EcParameters::named_curve) {
                    Some(NistP256::OID) => {
                        let secret = p256::SecretKey::try_from(ec_key).map_err(invalid)?;
                        Ok(Self::from_p256(P256SigningKey::from(secret)))
                    }
                    Some(NistP384::OID) => {
                        let secret = p384::SecretKey::try_from(ec_key).map_err(invalid)?;
                        Ok(Self::from_p384(P384SigningKey::from(secret)))
                    }
                    Some(curve) => Err(CertOrderError::UnknownKeyType(format!(
                        "EC private key on unsupported curve {curve}"
                    ))),
                    None => Err(CertOrderError::UnknownKeyType(
                        "EC private key without a named curve".to_string(),
                    )),
                }
            }
            PKCS8_PRIVATE_KEY_LABEL => {
                if let Ok(private) = RsaPrivateKey::from_pkcs8_der(der) {
                    return Ok(Self::from_rsa(private));
                }
                if let Ok(signing_key) = P256SigningKey::from_pkcs8_der(der) {
                    return Ok(Self::from_p256(signing_key));
                }
                if let Ok(signing_key) = P384SigningKey::from_pkcs8_der(der) {
                    return Ok(Self::from_p384(signing_key));
                }
                Err(CertOrderError::UnknownKeyType(
                    "PKCS#8 key with an unsupported algorithm".to_string(),
                ))
            }
            other => Err(CertOrderError::UnknownKeyType(format!("{other:?}"))),
        }
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    fn from_p256(signing_key: P256SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    fn from_p384(signing_key: P384SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }
}

fn sec1_der(private_key: &[u8], public_key: &[u8], curve: ObjectIdentifier) -> Result<Vec<u8>> {
    EcPrivateKey {
        private_key,
        parameters: Some(EcParameters::NamedCurve(curve)),
        public_key: Some(public_key),
    }
    .to_der()
    .map_err(|e| CertOrderError::KeyEncodingFailed(e.to_string()))
}

fn signing_failed(err: impl fmt::Display) -> CertOrderError {
    CertOrderError::CsrConstructionFailed(format!("failed to sign request: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn selector_maps_to_algorithm() {
        assert_eq!(
            KeyAlgorithm::from_selector("", 3072).unwrap(),
            KeyAlgorithm::Rsa { bits: 3072 }
        );
        assert_eq!(
            KeyAlgorithm::from_selector("P256", 2048).unwrap(),
            KeyAlgorithm::EcdsaP256
        );
        assert_eq!(
            KeyAlgorithm::from_selector("P384", 2048).unwrap(),
            KeyAlgorithm::EcdsaP384
        );
    }

    #[test]
    fn unknown_selector_does_not_fall_back() {
        for selector in ["P521", "p256", "rsa", " P256", "ed25519"] {
            let err = KeyAlgorithm::from_selector(selector, 2048).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm, "{selector}");
        }
    }

    #[test]
    fn ecdsa_keys_sign_with_their_curve_digest() {
        let p256 = KeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let p384 = KeyPair::generate(KeyAlgorithm::EcdsaP384).unwrap();
        assert_eq!(
            p256.signature_algorithm(SignatureHash::Sha512),
            SignatureAlgorithm::Sha256WithECDSA
        );
        assert_eq!(
            p384.signature_algorithm(SignatureHash::Sha256),
            SignatureAlgorithm::Sha384WithECDSA
        );
    }

    #[test]
    fn rsa_size_is_exact_modulus_length() {
        let key = KeyPair::generate(KeyAlgorithm::Rsa { bits: 1023 }).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Rsa { bits: 1023 });
    }

    #[test]
    fn ec_private_key_names_its_curve() {
        for (algorithm, curve) in [
            (KeyAlgorithm::EcdsaP256, NistP256::OID),
            (KeyAlgorithm::EcdsaP384, NistP384::OID),
        ] {
            let key = KeyPair::generate(algorithm).unwrap();
            let der = key.private_key_der().unwrap();
            let ec_key = EcPrivateKey::try_from(der.as_slice()).unwrap();
            assert_eq!(ec_key.parameters, Some(EcParameters::NamedCurve(curve)));
            assert!(ec_key.public_key.is_some());
        }
    }

    #[test]
    fn ec_private_key_without_curve_is_rejected() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let KeyPair::EcdsaP256 { signing_key, .. } = &key else {
            unreachable!()
        };
        let private_key = signing_key.to_bytes();
        let der = EcPrivateKey {
            private_key: &private_key,
            parameters: None,
            public_key: None,
        }
        .to_der()
        .unwrap();
        let pem = crate::pem_utils::der_to_pem(&der, EC_PRIVATE_KEY_LABEL);
        let err = KeyPair::from_pem(&pem).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownKeyType);
    }

    #[test]
    fn mismatched_algorithm_is_rejected() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let err = key
            .sign_data(b"data", &SignatureAlgorithm::Sha256WithRSA)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CsrConstructionFailed);
    }
}
