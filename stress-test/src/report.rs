use core::fmt::{self, Display, Formatter};
use std::io::Write;

use serde::Serialize;

use crate::{cfg::Config, cmd::Format, stat::Report};

/// Writes the report in the given format.
pub fn render<W: Write>(wr: &mut W, cfg: &Config, report: &Report) -> Result<(), anyhow::Error> {
    match cfg.format {
        Format::Text => write!(wr, "{}", TextReport(report))?,
        Format::Json => {
            let v = JsonReport {
                requests: cfg.requests.get(),
                concurrency: cfg.concurrency.get(),
                recorded: report.recorded(),
                report,
            };
            serde_json::to_writer(&mut *wr, &v)?;
            writeln!(wr)?;
        }
    }

    Ok(())
}

/// Human-readable report.
struct TextReport<'a>(&'a Report);

impl Display for TextReport<'_> {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        let Self(report) = self;

        writeln!(fmt)?;
        writeln!(fmt, "Test Report")?;
        writeln!(fmt, "-------------------")?;
        writeln!(fmt, "Total execution time: {:?}", report.elapsed)?;
        writeln!(fmt, "Total number of requests made: {}", report.recorded())?;
        writeln!(fmt, "Number of requests with HTTP status 200: {}", report.num_200)?;
        writeln!(fmt, "Distribution of other HTTP status codes:")?;
        for (code, count) in report.statuses_sorted() {
            writeln!(fmt, "Status {code}: {count} requests")?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    requests: usize,
    concurrency: usize,
    recorded: u64,
    #[serde(flatten)]
    report: &'a Report,
}

#[cfg(test)]
mod test {
    use core::time::Duration;
    use std::collections::HashMap;

    use super::*;

    fn report() -> Report {
        Report {
            elapsed: Duration::from_millis(1500),
            num_200: 7,
            statuses: HashMap::from([(503, 1), (404, 2)]),
        }
    }

    #[test]
    fn test_text() {
        let cfg = Config::new("http://localhost", 10, 2).unwrap();
        let mut buf = Vec::new();
        render(&mut buf, &cfg, &report()).unwrap();

        let expected = "\nTest Report\n\
                        -------------------\n\
                        Total execution time: 1.5s\n\
                        Total number of requests made: 10\n\
                        Number of requests with HTTP status 200: 7\n\
                        Distribution of other HTTP status codes:\n\
                        Status 404: 2 requests\n\
                        Status 503: 1 requests\n";
        assert_eq!(expected, String::from_utf8(buf).unwrap());
    }

    #[test]
    fn test_text_without_other_statuses() {
        let cfg = Config::new("http://localhost", 1, 1).unwrap();
        let report = Report {
            elapsed: Duration::from_millis(1),
            num_200: 1,
            statuses: HashMap::new(),
        };
        let mut buf = Vec::new();
        render(&mut buf, &cfg, &report).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("Distribution of other HTTP status codes:\n"));
    }

    #[test]
    fn test_json() {
        let mut cfg = Config::new("http://localhost", 10, 2).unwrap();
        cfg.format = Format::Json;
        let mut buf = Vec::new();
        render(&mut buf, &cfg, &report()).unwrap();

        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(10, v["requests"]);
        assert_eq!(2, v["concurrency"]);
        assert_eq!(10, v["recorded"]);
        assert_eq!(7, v["num_200"]);
        assert_eq!(1500.0, v["elapsed_ms"]);
        assert_eq!(2, v["statuses"]["404"]);
        assert_eq!(1, v["statuses"]["503"]);
    }
}
