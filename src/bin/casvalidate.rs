//! casvalidate - validate a CAS service ticket from the command line.
//!
//! Prints the principal on success. Otherwise prints
//! `(code) description: message` to stderr. The exit status is the numeric
//! result code.

use std::path::PathBuf;
use std::process::ExitCode;

use cas_client::{Protocol, ResultCode, Session, TransportConfig, ValidationRequest};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Validate a CAS service ticket
#[derive(Parser, Debug)]
#[command(name = "casvalidate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// CAS protocol (cas1 or cas2)
    #[arg(short, long, default_value = "cas2")]
    protocol: Protocol,

    /// Only accept tickets issued from a fresh login
    #[arg(short, long)]
    renew: bool,

    /// Disable server certificate validation
    #[arg(short = 'k', long)]
    insecure: bool,

    /// CA certificate bundle file or directory of CA files
    #[arg(short = 'c', long)]
    ca_path: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Validation URL, e.g. https://cas.example.org/cas/serviceValidate
    validation_url: String,

    /// Escaped service URL the ticket was issued for
    escaped_service: String,

    /// Service ticket
    ticket: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = TransportConfig::default().with_verify_tls(!cli.insecure);
    if let Some(ca_path) = &cli.ca_path {
        if cli.insecure {
            tracing::warn!("CA path is ignored when certificate validation is disabled");
        } else {
            config = config.with_ca_path(ca_path);
        }
    }

    cas_client::initialize();
    let code = run(&cli, config);
    cas_client::shutdown();

    // Negative codes wrap, so Fail (-1) exits with 255.
    ExitCode::from(code.as_raw() as u8)
}

fn run(cli: &Cli, config: TransportConfig) -> ResultCode {
    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(err) => {
            let code = err.result_code();
            eprintln!("({}) {}: {}", code.as_raw(), code, err);
            return code;
        }
    };

    let request = ValidationRequest::new(&cli.validation_url, &cli.escaped_service, &cli.ticket)
        .renew(cli.renew);
    let code = session.validate(cli.protocol, &request);

    if code == ResultCode::ValidationSuccess {
        println!("{}", session.principal().unwrap_or_default());
    } else {
        eprintln!(
            "({}) {}: {}",
            code.as_raw(),
            code,
            session.message().unwrap_or_default()
        );
    }
    code
}
