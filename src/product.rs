//! Products the account can order.

use serde::{Deserialize, Serialize};

use crate::client::CaClient;
use crate::error::{Result, ResultExt};

/// A product that can be ordered. `name_id` is what [`CaClient::submit_order`]
/// expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub group_name: String,
    pub name_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub product_type: String,
}

#[derive(Debug, Deserialize)]
struct ProductList {
    #[serde(default)]
    products: Vec<Product>,
}

impl CaClient {
    /// Lists the products available to the account.
    ///
    /// Also a cheap way to check that the api key is accepted.
    pub fn list_products(&self) -> Result<Vec<Product>> {
        let response = self
            .get("/product")
            .context("failed to retrieve list of products")?;
        let list: ProductList = self.read_json(response).context("failed to read list of products")?;
        tracing::debug!(count = list.products.len(), "retrieved product list");
        Ok(list.products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_type_is_renamed() {
        let list: ProductList = serde_json::from_str(
            r#"{"products":[{"group_name":"ssl_certificate","name_id":"ssl_plus","name":"Standard SSL","type":"ssl_certificate"}]}"#,
        )
        .unwrap();
        assert_eq!(list.products[0].product_type, "ssl_certificate");
        assert_eq!(list.products[0].name_id, "ssl_plus");
    }
}
