use certorder::csr::CertificateRequest;
use certorder::csr::params::{CertificationRequestInfo, DistinguishedName, HostList};
use certorder::key::{KeyAlgorithm, KeyPair};

pub fn subject_template() -> DistinguishedName {
    DistinguishedName::builder()
        .organization("Mozilla Corporation")
        .organization_unit("Cloud Services")
        .locality("Mountain View")
        .state("California")
        .country("US")
        .build()
}

pub fn request_info(hosts: &str) -> CertificationRequestInfo {
    CertificationRequestInfo::new(subject_template(), HostList::parse(hosts).unwrap())
}

pub fn generate_request(hosts: &str, algorithm: KeyAlgorithm) -> (KeyPair, CertificateRequest) {
    let key = KeyPair::generate(algorithm).unwrap();
    let csr = CertificateRequest::generate(&request_info(hosts), &key).unwrap();
    (key, csr)
}
