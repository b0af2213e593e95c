//! Interval table for recurring rules.
//!
//! Every recurring rule carries an [`IntervalType`]. The table below is the
//! single source of truth consulted by both engines: the offline materializer
//! reads [`occurrence_horizon`] to know how many rows to flatten, the online
//! evaluator reads [`step`] to advance its date iterator and uses
//! [`classify`] to map a generic frequency/interval definition back to a
//! table row.
//!
//! [`occurrence_horizon`]: IntervalType::occurrence_horizon
//! [`step`]: IntervalType::step
//! [`classify`]: IntervalType::classify

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Calendar unit a rule steps by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// One step of a recurrence: a frequency and a multiplier.
///
/// `Weekly` with multiplier 2 advances fourteen days per occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecurrenceStep {
    pub frequency: Frequency,
    pub multiplier: u32,
}

/// Closed set of supported recurrence intervals.
///
/// Each variant maps to a step and a generation horizon. Horizons are chosen
/// per family (5 years for the day/week family, 10 to 25 for the month family,
/// 100 for yearly) so the total number of generated rows stays bounded for
/// every type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Daily,
    Weekly,
    BiWeekly,
    TerWeekly,
    FourWeekly,
    Monthly,
    BiMonthly,
    TerMonthly,
    SixMonthly,
    Yearly,
}

impl IntervalType {
    pub const ALL: [IntervalType; 10] = [
        Self::Daily,
        Self::Weekly,
        Self::BiWeekly,
        Self::TerWeekly,
        Self::FourWeekly,
        Self::Monthly,
        Self::BiMonthly,
        Self::TerMonthly,
        Self::SixMonthly,
        Self::Yearly,
    ];

    /// The step function for this interval.
    #[must_use]
    pub const fn step(self) -> RecurrenceStep {
        let (frequency, multiplier) = match self {
            Self::Daily => (Frequency::Daily, 1),
            Self::Weekly => (Frequency::Weekly, 1),
            Self::BiWeekly => (Frequency::Weekly, 2),
            Self::TerWeekly => (Frequency::Weekly, 3),
            Self::FourWeekly => (Frequency::Weekly, 4),
            Self::Monthly => (Frequency::Monthly, 1),
            Self::BiMonthly => (Frequency::Monthly, 2),
            Self::TerMonthly => (Frequency::Monthly, 3),
            Self::SixMonthly => (Frequency::Monthly, 6),
            Self::Yearly => (Frequency::Yearly, 1),
        };
        RecurrenceStep {
            frequency,
            multiplier,
        }
    }

    /// Total number of occurrences generated over the horizon.
    #[must_use]
    pub const fn occurrence_horizon(self) -> usize {
        match self {
            Self::Daily => 1825,      // 5 years
            Self::Weekly => 260,      // 5 years
            Self::BiWeekly => 130,    // 5 years
            Self::TerWeekly => 86,    // 5 years
            Self::FourWeekly => 65,   // 5 years
            Self::Monthly => 120,     // 10 years
            Self::BiMonthly => 120,   // 20 years
            Self::TerMonthly => 100,  // 25 years
            Self::SixMonthly => 50,   // 25 years
            Self::Yearly => 100,      // 100 years
        }
    }

    /// Date of the k-th occurrence for an anchor date (`k = 0` is the anchor).
    ///
    /// Month and year steps clamp to the end of shorter months, the standard
    /// chrono behavior (Jan 31 + 1 month = Feb 28/29).
    #[must_use]
    pub fn advance(self, anchor: NaiveDate, k: u32) -> NaiveDate {
        let RecurrenceStep {
            frequency,
            multiplier,
        } = self.step();
        let n = multiplier * k;
        match frequency {
            Frequency::Daily => anchor + Days::new(u64::from(n)),
            Frequency::Weekly => anchor + Days::new(u64::from(n) * 7),
            Frequency::Monthly => anchor + Months::new(n),
            Frequency::Yearly => anchor + Months::new(n * 12),
        }
    }

    /// Maps a generic frequency/interval definition back to a table row.
    ///
    /// Rules received from the remote store carry `(frequency, interval)`
    /// pairs; combinations outside the closed table are rejected rather than
    /// approximated.
    pub fn classify(frequency: Frequency, interval: u32) -> Result<Self, LedgerError> {
        match (frequency, interval) {
            (Frequency::Daily, 1) => Ok(Self::Daily),
            (Frequency::Weekly, 1) => Ok(Self::Weekly),
            (Frequency::Weekly, 2) => Ok(Self::BiWeekly),
            (Frequency::Weekly, 3) => Ok(Self::TerWeekly),
            (Frequency::Weekly, 4) => Ok(Self::FourWeekly),
            (Frequency::Monthly, 1) => Ok(Self::Monthly),
            (Frequency::Monthly, 2) => Ok(Self::BiMonthly),
            (Frequency::Monthly, 3) => Ok(Self::TerMonthly),
            (Frequency::Monthly, 6) => Ok(Self::SixMonthly),
            (Frequency::Yearly, 1) => Ok(Self::Yearly),
            (frequency, interval) => Err(LedgerError::UnknownRecurrence(format!(
                "{} every {interval}",
                frequency.as_str()
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi_weekly",
            Self::TerWeekly => "ter_weekly",
            Self::FourWeekly => "four_weekly",
            Self::Monthly => "monthly",
            Self::BiMonthly => "bi_monthly",
            Self::TerMonthly => "ter_monthly",
            Self::SixMonthly => "six_monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for IntervalType {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "bi_weekly" => Ok(Self::BiWeekly),
            "ter_weekly" => Ok(Self::TerWeekly),
            "four_weekly" => Ok(Self::FourWeekly),
            "monthly" => Ok(Self::Monthly),
            "bi_monthly" => Ok(Self::BiMonthly),
            "ter_monthly" => Ok(Self::TerMonthly),
            "six_monthly" => Ok(Self::SixMonthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(LedgerError::UnknownRecurrence(format!(
                "invalid interval type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn horizon_stays_bounded() {
        for interval in IntervalType::ALL {
            assert!(interval.occurrence_horizon() <= 1825);
        }
    }

    #[test]
    fn advance_steps_by_interval() {
        let anchor = date(2024, 1, 1);
        assert_eq!(IntervalType::Daily.advance(anchor, 3), date(2024, 1, 4));
        assert_eq!(IntervalType::BiWeekly.advance(anchor, 2), date(2024, 1, 29));
        assert_eq!(IntervalType::Monthly.advance(anchor, 2), date(2024, 3, 1));
        assert_eq!(IntervalType::SixMonthly.advance(anchor, 1), date(2024, 7, 1));
        assert_eq!(IntervalType::Yearly.advance(anchor, 10), date(2034, 1, 1));
    }

    #[test]
    fn month_steps_clamp_to_shorter_months() {
        let anchor = date(2024, 1, 31);
        assert_eq!(IntervalType::Monthly.advance(anchor, 1), date(2024, 2, 29));
        assert_eq!(IntervalType::Monthly.advance(anchor, 3), date(2024, 4, 30));
    }

    #[test]
    fn classify_round_trips_the_table() {
        for interval in IntervalType::ALL {
            let step = interval.step();
            assert_eq!(
                IntervalType::classify(step.frequency, step.multiplier).unwrap(),
                interval
            );
        }
    }

    #[test]
    fn classify_rejects_unknown_combinations() {
        assert!(matches!(
            IntervalType::classify(Frequency::Weekly, 5),
            Err(LedgerError::UnknownRecurrence(_))
        ));
        assert!(matches!(
            IntervalType::classify(Frequency::Daily, 2),
            Err(LedgerError::UnknownRecurrence(_))
        ));
    }

    #[test]
    fn storage_string_round_trips() {
        for interval in IntervalType::ALL {
            assert_eq!(IntervalType::try_from(interval.as_str()).unwrap(), interval);
        }
    }
}
