use std::collections::BTreeMap;
use vigil_core::{VigilError, VigilResult};

/// One timestamped row of chart values. `None` marks a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: i64,
    pub values: Vec<Option<f64>>,
}

/// A resampling period such as `5s`, `1min`, `2h` or `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    pub fn from_seconds(seconds: i64) -> VigilResult<Self> {
        if seconds <= 0 {
            return Err(VigilError::Validation(format!(
                "resampling frequency must be positive, got {seconds}s"
            )));
        }
        Ok(Self { seconds })
    }

    /// Parse `<count><unit>`; the count defaults to 1.
    ///
    /// Units: `s`/`sec`, `t`/`m`/`min`, `h`/`hr`, `d`/`day`, in any case,
    /// singular or plural.
    pub fn parse(input: &str) -> VigilResult<Self> {
        let invalid = || {
            VigilError::Validation(format!(
                "invalid resampling frequency '{input}', expected e.g. '5s', '1min', '1h'"
            ))
        };

        let trimmed = input.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (digits, unit) = trimmed.split_at(split);
        let unit = unit.trim_start();
        if !unit.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        let count = match digits {
            "" => 1,
            digits => digits.parse::<i64>().map_err(|_| invalid())?,
        };
        let unit_name = unit.to_lowercase();
        if unit_name == "ms" {
            return Err(invalid());
        }
        let per_unit = match unit_name.trim_end_matches('s') {
            "" | "sec" | "second" => 1,
            "t" | "m" | "min" | "minute" => 60,
            "h" | "hr" | "hour" => 3_600,
            "d" | "day" => 86_400,
            _ => return Err(invalid()),
        };

        Self::from_seconds(count.saturating_mul(per_unit))
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Average rows into buckets aligned to multiples of the period.
    ///
    /// Each column is the mean of its non-gap values in the bucket, or a gap
    /// if there were none. Output is sorted by time.
    pub fn resample(&self, rows: &[Row]) -> Vec<Row> {
        let width = rows.iter().map(|r| r.values.len()).max().unwrap_or(0);
        let mut buckets: BTreeMap<i64, Vec<(f64, u32)>> = BTreeMap::new();

        for row in rows {
            let start = row.time.div_euclid(self.seconds) * self.seconds;
            let acc = buckets.entry(start).or_insert_with(|| vec![(0.0, 0); width]);
            for (slot, value) in acc.iter_mut().zip(&row.values) {
                if let Some(v) = value {
                    slot.0 += v;
                    slot.1 += 1;
                }
            }
        }

        buckets
            .into_iter()
            .map(|(time, acc)| Row {
                time,
                values: acc
                    .into_iter()
                    .map(|(sum, n)| (n > 0).then(|| sum / f64::from(n)))
                    .collect(),
            })
            .collect()
    }
}
