//! Error bodies returned by the CA api.
//!
//! See <https://www.digicert.com/services/v2/documentation/errors>.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The list of errors returned by the CA api when a request is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrors {
    pub errors: Vec<ApiError>,
}

/// A single error, made of a machine readable code and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ApiErrors {
    /// A single error renders as `CODE MESSAGE`; several are enumerated as
    /// `0) CODE MESSAGE 1) CODE MESSAGE`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return write!(f, "{} {}", only.code, only.message);
        }
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}) {} {}", i, err.code, err.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_error_is_not_enumerated() {
        let errors: ApiErrors = serde_json::from_str(
            r#"{"errors":[{"code":"invalid_parameter","message":"bad csr"}]}"#,
        )
        .unwrap();
        assert_eq!(errors.to_string(), "invalid_parameter bad csr");
    }

    #[test]
    fn multiple_errors_are_enumerated() {
        let errors: ApiErrors = serde_json::from_str(
            r#"{"errors":[{"code":"codeA","message":"msgA"},{"code":"codeB","message":"msgB"}]}"#,
        )
        .unwrap();
        assert_eq!(errors.to_string(), "0) codeA msgA 1) codeB msgB");
    }

    #[test]
    fn empty_error_list_renders_nothing() {
        assert_eq!(ApiErrors::default().to_string(), "");
    }
}
