//! Walk through a complete CAS2 proxy flow without a network.
//!
//! 1. validate a service ticket and request a PGT IOU
//! 2. redeem the IOU at the proxy callback
//! 3. request a proxy ticket for a back-end service with the PGT
//!
//! Run with `RUST_LOG=cas_client=debug cargo run --example validate_flow`.

use cas_client::{url, ProxyRequest, ScriptedTransport, Session, ValidationRequest};
use tracing_subscriber::EnvFilter;

const SERVICE_VALIDATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
    <cas:authenticationSuccess>
        <cas:user>alice</cas:user>
        <cas:proxyGrantingTicket>PGTIOU-84678-8a9d2sfa23casd</cas:proxyGrantingTicket>
    </cas:authenticationSuccess>
</cas:serviceResponse>"#;

const PROXY: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
    <cas:proxySuccess>
        <cas:proxyTicket>PT-957-ZuucXqTZ1YcJw81T3dxf</cas:proxyTicket>
    </cas:proxySuccess>
</cas:serviceResponse>"#;

fn main() -> Result<(), cas_client::CasError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    cas_client::initialize();

    // Body split mid-element, as a network would deliver it.
    let (head, tail) = SERVICE_VALIDATE.split_at(180);
    let transport = ScriptedTransport::new()
        .with_chunks([head, tail])
        .with_body("PGT-330-CSdUiBvD9mA0xsQw2a6")
        .with_body(PROXY);
    let mut session = Session::with_transport(transport)?;

    let request = ValidationRequest::new(
        "https://cas.example.org/cas/serviceValidate",
        url::escape("https://portal.example.org/"),
        "ST-1856339-aA5Yuvrxzpv8Tau1cYQ7",
    )
    .proxy_callback(
        url::escape("https://portal.example.org/pgtCallback"),
        Some("https://portal.example.org/pgtRetrieve"),
    );

    let code = session.service_validate(&request);
    println!("serviceValidate: {} ({})", code, code.as_raw());
    println!("principal:       {}", session.principal().unwrap_or("-"));
    println!("pgt:             {:?}", session.pgt());

    let pgt = match session.pgt() {
        Some(pgt) => pgt.expose_secret().clone(),
        None => return Ok(()),
    };
    let proxy = ProxyRequest::new(
        "https://cas.example.org/cas/proxy",
        url::escape("imap://mail.example.org"),
        pgt,
    );

    let code = session.proxy(&proxy);
    println!("proxy:           {} ({})", code, code.as_raw());
    if let Some(ticket) = session.proxy_ticket() {
        println!("proxy ticket:    {}", ticket.expose_secret());
    }

    println!("requests made:");
    for url in session.transport().requests() {
        println!("  {}", url);
    }

    cas_client::shutdown();
    Ok(())
}
