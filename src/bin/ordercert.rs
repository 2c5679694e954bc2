//! Order a certificate from DigiCert.
//!
//! Generates a private key and a certificate request for the given hosts, then orders a
//! certificate for it. The api key is read from `DIGICERT_API_TOKEN`.
//!
//! ```text
//! DIGICERT_API_TOKEN=... ordercert --host example.com,www.example.com --ecdsa-curve P256 -D
//! ```

use std::process::ExitCode;

use anyhow::ensure;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use certorder::client::{CaClient, ClientConfig, DEFAULT_BASE_URL};
use certorder::csr::CertificateRequest;
use certorder::csr::params::{CertificationRequestInfo, DistinguishedName, HostList};
use certorder::error::ResultExt;
use certorder::key::{DEFAULT_RSA_BITS, KeyAlgorithm, KeyPair};
use certorder::order::{Order, ValidityYears};

#[derive(Parser, Debug)]
#[command(name = "ordercert")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate a key and CSR, then order a certificate from DigiCert", long_about = None)]
struct Cli {
    /// Comma-separated hostnames and IPs to generate a certificate for
    #[arg(long, value_name = "HOSTS")]
    host: String,

    /// Organizational unit of the subject
    #[arg(long, default_value = "Cloud Services")]
    ou: String,

    /// Organization of the subject
    #[arg(long, default_value = "Mozilla Corporation")]
    org: String,

    /// Locality of the subject
    #[arg(long, default_value = "Mountain View")]
    loc: String,

    /// State or province of the subject
    #[arg(long, default_value = "California")]
    st: String,

    /// Country of the subject
    #[arg(short, long, default_value = "US")]
    country: String,

    /// Contact email. Accepted but not sent with the order.
    #[arg(long)]
    #[allow(dead_code)]
    email: Option<String>,

    /// Size of the RSA key to generate. Ignored if --ecdsa-curve is set
    #[arg(long, default_value_t = DEFAULT_RSA_BITS)]
    rsa_bits: usize,

    /// ECDSA curve to use for the key: P256 or P384. Empty selects RSA
    #[arg(long, default_value = "")]
    ecdsa_curve: String,

    /// Validity of the certificate in years, 1 to 3
    #[arg(long, default_value_t = 1)]
    validity_years: u8,

    /// Id of the organization the certificate is ordered for
    #[arg(long, default_value_t = 147486)]
    organization_id: u64,

    /// Name id of the product to order
    #[arg(long, default_value = "ssl")]
    product: String,

    /// Comments attached to the order
    #[arg(long)]
    comments: Option<String>,

    /// Base URL of the api
    #[arg(long, default_value = DEFAULT_BASE_URL, value_name = "URL")]
    base_url: String,

    /// Print the CSR and private key, and dump api requests and responses
    #[arg(short = 'D', long)]
    debug: bool,

    /// DigiCert api key
    #[arg(long, env = "DIGICERT_API_TOKEN", hide_env_values = true)]
    api_token: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(request_id) => {
            tracing::info!(request_id, "certificate ordered");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u64> {
    ensure!(!cli.api_token.trim().is_empty(), "DIGICERT_API_TOKEN is empty");

    let validity = ValidityYears::try_from(cli.validity_years)?;
    let algorithm = KeyAlgorithm::from_selector(&cli.ecdsa_curve, cli.rsa_bits)?;
    let hosts = HostList::parse(&cli.host)?;

    let config = ClientConfig::builder()
        .api_key(cli.api_token)
        .base_url(cli.base_url)
        .debug(cli.debug)
        .build();
    let client = CaClient::new(config)?;
    client
        .list_products()
        .context("failed to verify api credentials")?;

    let key = KeyPair::generate(algorithm)?;
    let template = DistinguishedName::builder()
        .organization(cli.org)
        .organization_unit(cli.ou)
        .country(cli.country)
        .state(cli.st)
        .locality(cli.loc)
        .build();
    let info = CertificationRequestInfo::new(template, hosts);
    let csr = CertificateRequest::generate(&info, &key)?;

    if cli.debug {
        println!("{}", csr.to_pem());
        println!("{}", key.to_pem()?);
    }

    let mut order = Order::from_request(&csr, cli.organization_id, validity);
    if let Some(comments) = cli.comments {
        order = order.with_comments(comments);
    }
    let request_id = client
        .submit_order(&order, &cli.product)
        .context("failed to place certificate order")?;

    Ok(request_id)
}
