//! Certificate orders.
//!
//! An [`Order`] is derived from a parsed [`CertificateRequest`] and submitted to
//! `POST /order/certificate/{product}`.
//! See <https://www.digicert.com/services/v2/documentation/order/overview-submit>.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::CaClient;
use crate::csr::{CertificateRequest, SignatureHash};
use crate::error::{CertOrderError, Result, ResultExt};

/// Server platform id for "standard PEM" certificates.
pub const SERVER_PLATFORM_STANDARD_PEM: u32 = 45;

/// Number of years an ordered certificate is valid for, between 1 and 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ValidityYears(u8);

impl ValidityYears {
    pub const ONE: ValidityYears = ValidityYears(1);
    pub const TWO: ValidityYears = ValidityYears(2);
    pub const THREE: ValidityYears = ValidityYears(3);

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ValidityYears {
    fn default() -> Self {
        ValidityYears::ONE
    }
}

impl TryFrom<u8> for ValidityYears {
    type Error = CertOrderError;

    fn try_from(years: u8) -> Result<Self> {
        match years {
            1..=3 => Ok(ValidityYears(years)),
            other => Err(CertOrderError::InvalidInput(format!(
                "validity must be 1, 2 or 3 years, got {other}"
            ))),
        }
    }
}

impl From<ValidityYears> for u8 {
    fn from(years: ValidityYears) -> Self {
        years.0
    }
}

/// The order submitted to the CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub certificate: OrderCertificate,
    pub organization: OrganizationRef,
    pub validity_years: ValidityYears,
    /// Expiration date in `YYYY-MM-DD` form, overriding `validity_years`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_renewal_notifications: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_of_order_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// The certificate part of an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCertificate {
    pub common_name: String,
    pub dns_names: Vec<String>,
    /// The request, PEM encoded.
    pub csr: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organization_units: Vec<String>,
    pub server_platform: ServerPlatform,
    pub signature_hash: SignatureHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_option: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPlatform {
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub id: u64,
}

impl Order {
    /// Maps a parsed certificate request onto an order.
    ///
    /// The signature hash follows the request's signature algorithm and the server
    /// platform is always standard PEM. Optional fields start unset.
    pub fn from_request(
        csr: &CertificateRequest,
        organization_id: u64,
        validity_years: ValidityYears,
    ) -> Self {
        Order {
            certificate: OrderCertificate {
                common_name: csr.subject().common_name.clone(),
                dns_names: csr.dns_names().to_vec(),
                csr: csr.to_pem(),
                organization_units: csr.subject().organization_units(),
                server_platform: ServerPlatform {
                    id: SERVER_PLATFORM_STANDARD_PEM,
                },
                signature_hash: csr.signature_algorithm().signature_hash(),
                profile_option: None,
            },
            organization: OrganizationRef {
                id: organization_id,
            },
            validity_years,
            custom_expiration_date: None,
            comments: None,
            disable_renewal_notifications: false,
            renewal_of_order_id: None,
            payment_method: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// The CA's answer to a successful order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub id: u64,
    #[serde(default)]
    pub requests: Vec<OrderRequest>,
}

/// A request created by an order, awaiting approval or issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: u64,
    #[serde(default)]
    pub status: String,
}

impl OrderResult {
    /// Returns the id of the only request created by the order.
    pub fn request_id(&self) -> Result<u64> {
        match self.requests.as_slice() {
            [only] => Ok(only.id),
            requests => Err(CertOrderError::AmbiguousOrderResponse(requests.len())),
        }
    }
}

impl CaClient {
    /// Submits an order for the product identified by `product_name_id` and returns
    /// the id of the request it created.
    ///
    /// Only `201 Created` counts as success. Orders are not idempotent and are never
    /// retried.
    pub fn submit_order(&self, order: &Order, product_name_id: &str) -> Result<u64> {
        self.try_submit_order(order, product_name_id)
            .context("failed to submit order")
    }

    fn try_submit_order(&self, order: &Order, product_name_id: &str) -> Result<u64> {
        if product_name_id.is_empty() || product_name_id.contains('/') {
            return Err(CertOrderError::InvalidInput(format!(
                "invalid product name id {product_name_id:?}"
            )));
        }

        let response = self.post_json(&format!("/order/certificate/{product_name_id}"), order)?;
        if response.status() != StatusCode::CREATED {
            return Err(CertOrderError::OrderRejected(response.status().to_string()));
        }

        let result: OrderResult = self.read_json(response)?;
        let request_id = result.request_id()?;
        tracing::info!(
            order_id = result.id,
            request_id,
            product = product_name_id,
            "certificate order created"
        );
        Ok(request_id)
    }

    /// Maps `csr` onto an order and submits it.
    pub fn order_certificate(
        &self,
        csr: &CertificateRequest,
        product_name_id: &str,
        organization_id: u64,
        validity_years: ValidityYears,
    ) -> Result<u64> {
        let order = Order::from_request(csr, organization_id, validity_years);
        self.submit_order(&order, product_name_id)
    }
}
