//! # CertOrder - Certificate Ordering Against the DigiCert REST API
//!
//! CertOrder generates a private key, builds a signed PKCS#10 certificate request for a list
//! of hosts, and submits it as a certificate order to the DigiCert `services/v2` api. Keys
//! and requests are built with rustcrypto libraries; the api is reached over a blocking
//! `reqwest` client limited to TLS 1.3 and 1.2 with a restricted cipher suite list.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any modulus size, 2048 bits by default, PKCS#1 v1.5 signatures
//! - **ECDSA**: P-256 (signed with SHA-256) and P-384 (signed with SHA-384)
//!
//! ## Quick Start
//!
//! ### Building a Certificate Request
//!
//! ```rust,no_run
//! use certorder::{
//!     csr::{CertificateRequest, params::{CertificationRequestInfo, DistinguishedName, HostList}},
//!     key::{KeyAlgorithm, KeyPair},
//! };
//!
//! # fn main() -> Result<(), certorder::error::CertOrderError> {
//! let key = KeyPair::generate(KeyAlgorithm::EcdsaP256)?;
//!
//! let template = DistinguishedName::builder()
//!     .organization("Example Corp")
//!     .country("US")
//!     .build();
//! let info = CertificationRequestInfo::new(template, HostList::parse("example.com,10.0.0.5")?);
//!
//! let csr = CertificateRequest::generate(&info, &key)?;
//! println!("{}", csr.to_pem());
//! println!("{}", key.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Ordering a Certificate
//!
//! ```rust,no_run
//! use certorder::{
//!     client::{CaClient, ClientConfig},
//!     csr::CertificateRequest,
//!     order::ValidityYears,
//! };
//!
//! # fn main() -> Result<(), certorder::error::CertOrderError> {
//! # let csr = CertificateRequest::from_pem("")?;
//! let client = CaClient::new(ClientConfig::builder().api_key("0123456789abcdef").build())?;
//!
//! let request_id = client.order_certificate(&csr, "ssl_plus", 147486, ValidityYears::ONE)?;
//! println!("order placed, request {request_id}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns a [`error::CertOrderError`]. Errors may be wrapped with
//! context; [`error::CertOrderError::kind`] reports the original kind regardless:
//!
//! ```rust
//! use certorder::{error::ErrorKind, key::KeyAlgorithm};
//!
//! let err = KeyAlgorithm::from_selector("P521", 2048).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, signing and private key PEM encoding
//! - [`csr`]: Certificate request construction and parsing
//! - [`client`]: Authenticated HTTP channel to the CA api
//! - [`order`]: Mapping requests onto orders and submitting them
//! - [`product`], [`organization`]: Account catalog lookups
//! - [`error`]: Error types and context wrapping

pub mod api;
pub mod client;
pub mod csr;
pub mod error;
pub mod key;
pub mod order;
pub mod organization;
pub mod pem_utils;
pub mod product;
pub mod tls;
