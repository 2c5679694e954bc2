/// PEM label of a PKCS#10 certificate request.
pub const CERTIFICATE_REQUEST_LABEL: &str = "CERTIFICATE REQUEST";
/// PEM label of a PKCS#1 RSA private key.
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
/// PEM label of a SEC1 elliptic curve private key.
pub const EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";
/// PEM label of a PKCS#8 private key.
pub const PKCS8_PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
///
/// Lines are wrapped at 64 columns and terminated with `\n`.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, checking its label.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>, pem::PemError> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(pem::PemError::MismatchedTags(
            expected_label.to_string(),
            pem.tag().to_string(),
        ));
    }
    Ok(pem.contents().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_uses_label_and_lf() {
        let pem = der_to_pem(&[0x30, 0x03, 0x02, 0x01, 0x01], CERTIFICATE_REQUEST_LABEL);
        assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE REQUEST-----\n"));
        assert!(!pem.contains('\r'));
    }

    #[test]
    fn pem_to_der_checks_label() {
        let pem = der_to_pem(b"abc", EC_PRIVATE_KEY_LABEL);
        assert_eq!(pem_to_der(&pem, EC_PRIVATE_KEY_LABEL).unwrap(), b"abc");
        assert!(pem_to_der(&pem, RSA_PRIVATE_KEY_LABEL).is_err());
    }
}
