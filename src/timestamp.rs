use std::cmp::Ordering;
use std::fmt;

use crate::error::{CodingDbError, Result};

pub const DEFAULT_TPS: u32 = 60;

// ------------- TimeStamp -------------
/// A point in time counted in ticks of a time base (`tps` = ticks per second).
///
/// Time stamps of different time bases have no ordering; `partial_cmp`
/// answers `None` for them and range checks treat that as an error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimeStamp {
    tps: u32,
    ticks: i64,
}

impl TimeStamp {
    pub fn new(tps: u32, ticks: i64) -> Result<Self> {
        if tps == 0 {
            return Err(CodingDbError::InvalidValue(
                "ticks per second must be positive".into(),
            ));
        }
        if ticks < 0 {
            return Err(CodingDbError::InvalidValue(format!(
                "negative tick count {ticks}"
            )));
        }
        Ok(Self { tps, ticks })
    }
    pub fn zero(tps: u32) -> Self {
        Self {
            tps: tps.max(1),
            ticks: 0,
        }
    }
    pub fn tps(&self) -> u32 {
        self.tps
    }
    pub fn ticks(&self) -> i64 {
        self.ticks
    }
    pub fn same_base(&self, other: &TimeStamp) -> bool {
        self.tps == other.tps
    }
    /// Parses the `hh:mm:ss:fff` display form in the given time base.
    pub fn from_hmsf(tps: u32, text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() != 4 {
            return Err(CodingDbError::InvalidValue(format!(
                "malformed time stamp {text:?}"
            )));
        }
        let mut fields = [0i64; 4];
        for (slot, part) in fields.iter_mut().zip(parts.iter()) {
            *slot = part.parse::<i64>().map_err(|_| {
                CodingDbError::InvalidValue(format!("malformed time stamp {text:?}"))
            })?;
        }
        let [h, m, s, f] = fields;
        let tps_i = i64::from(tps);
        if m >= 60 || s >= 60 || f >= tps_i || h < 0 || m < 0 || s < 0 || f < 0 {
            return Err(CodingDbError::InvalidValue(format!(
                "time stamp field out of range in {text:?}"
            )));
        }
        let ticks = h
            .checked_mul(60)
            .and_then(|t| t.checked_add(m))
            .and_then(|t| t.checked_mul(60))
            .and_then(|t| t.checked_add(s))
            .and_then(|t| t.checked_mul(tps_i))
            .and_then(|t| t.checked_add(f))
            .ok_or_else(|| {
                CodingDbError::InvalidValue(format!("time stamp {text:?} out of range"))
            })?;
        Self::new(tps, ticks)
    }
    /// `(tps,hh:mm:ss:fff)`
    pub fn to_db_string(&self) -> String {
        format!("({},{})", self.tps, self)
    }
}

impl PartialOrd for TimeStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.tps == other.tps {
            Some(self.ticks.cmp(&other.ticks))
        } else {
            None
        }
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tps = i64::from(self.tps);
        let seconds = self.ticks / tps;
        write!(
            f,
            "{:02}:{:02}:{:02}:{:03}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60,
            self.ticks % tps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let ts = TimeStamp::new(60, 60 * 3723 + 7).unwrap();
        assert_eq!(ts.to_string(), "01:02:03:007");
        assert_eq!(TimeStamp::from_hmsf(60, "01:02:03:007").unwrap(), ts);
        assert_eq!(ts.to_db_string(), "(60,01:02:03:007)");
    }

    #[test]
    fn different_bases_do_not_order() {
        let a = TimeStamp::new(60, 10).unwrap();
        let b = TimeStamp::new(30, 10).unwrap();
        assert_eq!(a.partial_cmp(&b), None);
        assert!(TimeStamp::new(60, -1).is_err());
        assert!(TimeStamp::from_hmsf(60, "00:00:00:060").is_err());
    }

    #[test]
    fn huge_clock_fields_are_rejected() {
        assert!(TimeStamp::from_hmsf(60, "999999999999999:00:00:000").is_err());
        assert!(TimeStamp::from_hmsf(60, "99999999999999999:00:00:000").is_err());
    }
}
