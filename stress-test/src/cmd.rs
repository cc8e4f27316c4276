use core::num::NonZero;

use clap::{ArgAction, Parser, ValueEnum};

/// Simple CLI tool to test the performance of a web server.
///
/// Performs the given number of HTTP GET requests against the target URL,
/// keeping at most "concurrency" of them in flight, and prints a report with
/// the distribution of response status codes.
#[derive(Debug, Clone, Parser)]
#[command(name = "stress-test", version, about)]
pub struct Cmd {
    /// URL to test.
    #[clap(short, long, default_value = "")]
    pub url: String,
    /// Number of requests to perform.
    #[clap(short, long, default_value = "10")]
    pub requests: NonZero<usize>,
    /// Number of multiple requests to make at a time.
    #[clap(short, long, default_value = "1")]
    pub concurrency: NonZero<usize>,
    /// Per-request timeout.
    ///
    /// If none given (the default) requests may wait for the server forever.
    #[clap(long, value_name = "MILLISECONDS")]
    pub timeout: Option<u64>,
    /// Verify TLS peer certificates and host names.
    ///
    /// Verification is disabled by default to allow testing servers with
    /// self-signed certificates.
    #[clap(long)]
    pub verify_tls: bool,
    /// Report format.
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Be verbose in terms of logging.
    #[clap(short, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Output format of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Single JSON object.
    Json,
}
