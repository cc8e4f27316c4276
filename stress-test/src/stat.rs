use core::time::Duration;
use std::{collections::HashMap, sync::Mutex};

use serde::Serialize;

/// Shared outcome counters.
///
/// Updated once per successfully completed request. All updates happen
/// under a single lock, so concurrent callers never lose an increment.
#[derive(Debug, Default)]
pub struct Stat {
    inner: Mutex<Counters>,
}

#[derive(Debug, Default, Clone)]
struct Counters {
    num_200: u64,
    statuses: HashMap<u16, u64>,
}

impl Stat {
    /// Records a fully received response with the given status code.
    ///
    /// Must not be called for requests that failed on transport or while
    /// reading the body.
    pub fn on_response(&self, code: u16) {
        let mut counters = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if code == 200 {
            counters.num_200 += 1;
        } else {
            *counters.statuses.entry(code).or_default() += 1;
        }
    }

    /// Freezes the counters into a [`Report`] with the given elapsed time.
    pub fn report(&self, elapsed: Duration) -> Report {
        let counters = match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        Report {
            elapsed,
            num_200: counters.num_200,
            statuses: counters.statuses,
        }
    }
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Wall-clock time of the whole run.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Number of responses with HTTP status 200.
    pub num_200: u64,
    /// Number of responses per other HTTP status code.
    pub statuses: HashMap<u16, u64>,
}

impl Report {
    /// Returns the number of recorded responses.
    ///
    /// Failed requests are not recorded, so this may be less than the number
    /// of requests made.
    #[inline]
    pub fn recorded(&self) -> u64 {
        self.num_200 + self.statuses.values().sum::<u64>()
    }

    /// Returns non-200 status codes with their counts, ordered by code.
    pub fn statuses_sorted(&self) -> Vec<(u16, u64)> {
        let mut statuses: Vec<_> = self.statuses.iter().map(|(&code, &count)| (code, count)).collect();
        statuses.sort_unstable();
        statuses
    }
}

fn serialize_millis<S>(v: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(v.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_empty() {
        let stat = Stat::default();
        let report = stat.report(Duration::ZERO);

        assert_eq!(0, report.num_200);
        assert!(report.statuses.is_empty());
        assert_eq!(0, report.recorded());
    }

    #[test]
    fn test_order_independent() {
        let permutations: &[[u16; 4]] = &[
            [200, 404, 200, 500],
            [500, 200, 404, 200],
            [404, 500, 200, 200],
            [200, 200, 500, 404],
        ];

        for codes in permutations {
            let stat = Stat::default();
            for &code in codes {
                stat.on_response(code);
            }

            let report = stat.report(Duration::ZERO);
            assert_eq!(2, report.num_200);
            assert_eq!(HashMap::from([(404, 1), (500, 1)]), report.statuses);
            assert_eq!(4, report.recorded());
        }
    }

    #[test]
    fn test_2xx_other_than_200_goes_to_histogram() {
        let stat = Stat::default();
        stat.on_response(201);
        stat.on_response(204);

        let report = stat.report(Duration::ZERO);
        assert_eq!(0, report.num_200);
        assert_eq!(vec![(201, 1), (204, 1)], report.statuses_sorted());
    }

    #[test]
    fn test_concurrent_updates() {
        let stat = Arc::new(Stat::default());

        let threads: Vec<_> = (0..8)
            .map(|idx| {
                let stat = stat.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stat.on_response(if idx % 2 == 0 { 200 } else { 503 });
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().expect("no self join");
        }

        let report = stat.report(Duration::from_secs(1));
        assert_eq!(4000, report.num_200);
        assert_eq!(HashMap::from([(503, 4000)]), report.statuses);
        assert_eq!(8000, report.recorded());
    }
}
