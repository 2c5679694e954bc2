mod util;

use std::fs;
use std::process::Command;

use certorder::csr::CertificateRequest;
use certorder::csr::params::{CertificationRequestInfo, HostList};
use certorder::key::{KeyAlgorithm, KeyPair};
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::X509Req;

fn common_name(req: &X509Req) -> String {
    req.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_crate_validate_csr() {
    for algorithm in [
        KeyAlgorithm::Rsa { bits: 2048 },
        KeyAlgorithm::EcdsaP256,
        KeyAlgorithm::EcdsaP384,
    ] {
        let (key, csr) = util::generate_request("server.example.com,10.0.0.5", algorithm);

        let req = X509Req::from_pem(csr.to_pem().as_bytes()).expect("Failed to parse CSR PEM");
        let public_key = req.public_key().unwrap();
        assert!(req.verify(&public_key).unwrap(), "CSR signature does not verify for {algorithm}");
        assert_eq!(common_name(&req), "server.example.com");

        // The private key must be the counterpart of the request's public key
        let private_key = PKey::private_key_from_pem(key.to_pem().unwrap().as_bytes())
            .expect("Failed to parse private key PEM");
        assert!(public_key.public_eq(&private_key), "key mismatch for {algorithm}");
    }
}

#[test]
fn test_openssl_crate_reads_subject() {
    let (_, csr) = util::generate_request("example.com", KeyAlgorithm::EcdsaP256);
    let req = X509Req::from_der(csr.to_der()).expect("Failed to parse CSR DER");

    let entry = |nid| {
        req.subject_name()
            .entries_by_nid(nid)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap()
            .to_string()
    };
    assert_eq!(entry(Nid::COUNTRYNAME), "US");
    assert_eq!(entry(Nid::STATEORPROVINCENAME), "California");
    assert_eq!(entry(Nid::LOCALITYNAME), "Mountain View");
    assert_eq!(entry(Nid::ORGANIZATIONNAME), "Mozilla Corporation");
    assert_eq!(entry(Nid::ORGANIZATIONALUNITNAME), "Cloud Services");
    assert_eq!(entry(Nid::COMMONNAME), "example.com");
}

#[test]
fn test_openssl_crate_reads_non_printable_country() {
    let key = KeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
    let mut subject = util::subject_template();
    subject.country = Some("Ü_S".to_string());
    let info = CertificationRequestInfo::new(subject, HostList::parse("example.com").unwrap());
    let csr = CertificateRequest::generate(&info, &key).unwrap();

    let req = X509Req::from_der(csr.to_der()).expect("Failed to parse CSR DER");
    let country = req
        .subject_name()
        .entries_by_nid(Nid::COUNTRYNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string();
    assert_eq!(country, "Ü_S");
}

#[test]
fn test_openssl_crate_loads_ec_key() {
    for (algorithm, curve) in [
        (KeyAlgorithm::EcdsaP256, Nid::X9_62_PRIME256V1),
        (KeyAlgorithm::EcdsaP384, Nid::SECP384R1),
    ] {
        let key = KeyPair::generate(algorithm).unwrap();
        let ec = openssl::ec::EcKey::private_key_from_pem(key.to_pem().unwrap().as_bytes())
            .expect("Failed to parse EC private key");
        ec.check_key().unwrap();
        assert_eq!(ec.group().curve_name(), Some(curve));

        // Keys written by OpenSSL load back with the same curve
        let pem = String::from_utf8(ec.private_key_to_pem().unwrap()).unwrap();
        assert_eq!(KeyPair::from_pem(&pem).unwrap().algorithm(), algorithm);
    }
}

#[test]
fn test_openssl_cli_validate_csr() {
    let (_, csr) = util::generate_request("example.com,www.example.com", KeyAlgorithm::EcdsaP256);

    let csr_path = std::env::temp_dir().join(format!("certorder_test_{}.csr", std::process::id()));
    fs::write(&csr_path, csr.to_pem()).expect("Failed to write CSR");

    let output = Command::new("openssl")
        .arg("req")
        .arg("-in")
        .arg(&csr_path)
        .arg("-noout")
        .arg("-text")
        .arg("-verify")
        .output();
    fs::remove_file(&csr_path).expect("Failed to remove test CSR");

    let Ok(output) = output else {
        eprintln!("openssl binary not available, skipping");
        return;
    };
    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output_text = String::from_utf8_lossy(&output.stdout);
    assert!(
        output_text.contains("DNS:example.com, DNS:www.example.com"),
        "Subject alternative names are missing"
    );
    assert!(
        output_text.contains("Signature Algorithm: ecdsa-with-SHA256"),
        "Signature Algorithm field is incorrect"
    );
}

#[test]
fn test_openssl_built_csr_with_email_san_parses() {
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::stack::Stack;
    use openssl::x509::extension::SubjectAlternativeName;
    use openssl::x509::{X509NameBuilder, X509ReqBuilder};

    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let pkey = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "example.com").unwrap();
    let name = name.build();

    let mut builder = X509ReqBuilder::new().unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder.set_subject_name(&name).unwrap();
    let san = SubjectAlternativeName::new()
        .dns("example.com")
        .email("a@example.com")
        .build(&builder.x509v3_context(None))
        .unwrap();
    let mut extensions = Stack::new().unwrap();
    extensions.push(san).unwrap();
    builder.add_extensions(&extensions).unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let pem = builder.build().to_pem().unwrap();

    let csr = CertificateRequest::from_pem(std::str::from_utf8(&pem).unwrap())
        .expect("CSR with an email SAN should parse");
    assert_eq!(csr.subject().common_name, "example.com");
    assert_eq!(csr.dns_names(), ["example.com"]);
    assert!(csr.ip_addresses().is_empty());
}
