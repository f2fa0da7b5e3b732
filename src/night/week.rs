use std::fmt::Display;
use std::str::FromStr;

use crate::night::*;

/// A voting round: an ISO year and week number, written `YYYYWW`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct WeekId {
    pub iso_year: u32,
    pub iso_week: u32,
}

impl Display for WeekId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:02}", self.iso_year, self.iso_week)
    }
}

impl FromStr for WeekId {
    type Err = NightError;

    fn from_str(s: &str) -> Result<WeekId, NightError> {
        let s = s.trim();
        ensure!(
            s.len() == 6 && s.chars().all(|c| c.is_ascii_digit()),
            InvalidWeekSnafu { value: s }
        );
        let iso_year = s[0..4]
            .parse::<u32>()
            .ok()
            .context(InvalidWeekSnafu { value: s })?;
        let iso_week = s[4..]
            .parse::<u32>()
            .ok()
            .context(InvalidWeekSnafu { value: s })?;
        ensure!((1..=53).contains(&iso_week), InvalidWeekSnafu { value: s });
        Ok(WeekId { iso_year, iso_week })
    }
}
