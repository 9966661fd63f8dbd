//! `System.DateTime` reconstructed from debuggee memory.
//!
//! The runtime packs a `DateTime` into one 64-bit word, `dateData`: the
//! low 62 bits count 100-nanosecond ticks since 0001-01-01 00:00:00,
//! the top 2 bits carry the [`DateTimeKind`]. The only constructor that
//! accepts this form is private, so the debugger rebuilds the calendar
//! fields from the tick count itself.

const TICKS_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;
const KIND_SHIFT: u32 = 62;

const TICKS_PER_SECOND: u64 = 10_000_000;
const TICKS_PER_MINUTE: u64 = 60 * TICKS_PER_SECOND;
const TICKS_PER_HOUR: u64 = 60 * TICKS_PER_MINUTE;
const TICKS_PER_DAY: u64 = 24 * TICKS_PER_HOUR;

/// Ticks at 9999-12-31 23:59:59.9999999, the largest representable
/// instant.
const MAX_TICKS: u64 = 3_155_378_975_999_999_999;

const DAYS_TO_MONTH_365: [u32; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const DAYS_TO_MONTH_366: [u32; 13] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// Whether the instant is local time, UTC, or unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    /// No time zone information
    Unspecified,
    /// Coordinated universal time
    Utc,
    /// The debuggee machine's local time
    Local,
}

/// A `System.DateTime`, kept in the runtime's packed `dateData` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    data: u64,
}

impl DateTime {
    /// Builds a `DateTime` from the packed 64-bit form. A tick count
    /// beyond year 9999 is not a date and reads as `None`.
    #[must_use]
    pub fn from_date_data(data: u64) -> Option<DateTime> {
        if data & TICKS_MASK > MAX_TICKS {
            return None;
        }
        Some(DateTime { data })
    }

    /// Ticks since 0001-01-01 00:00:00.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.data & TICKS_MASK
    }

    /// The packed kind bits.
    ///
    /// The runtime steals the value 3 for an internal "local, but
    /// ambiguous DST" marker; it still means local time.
    #[must_use]
    pub fn kind(&self) -> DateTimeKind {
        match self.data >> KIND_SHIFT {
            0 => DateTimeKind::Unspecified,
            1 => DateTimeKind::Utc,
            _ => DateTimeKind::Local,
        }
    }

    /// Calendar date `(year, month, day)` in the proleptic Gregorian
    /// calendar.
    #[must_use]
    pub fn date(&self) -> (u32, u32, u32) {
        let mut days = (self.ticks() / TICKS_PER_DAY) as u32;

        let y400 = days / 146_097;
        days %= 146_097;
        let mut y100 = days / 36_524;
        if y100 == 4 {
            y100 = 3; // day 146096 is the leap day closing a 400-year cycle
        }
        days -= y100 * 36_524;
        let y4 = days / 1461;
        days %= 1461;
        let mut y1 = days / 365;
        if y1 == 4 {
            y1 = 3;
        }
        days -= y1 * 365;

        let year = y400 * 400 + y100 * 100 + y4 * 4 + y1 + 1;
        let leap = y1 == 3 && (y4 != 24 || y100 == 3);
        let months = if leap {
            &DAYS_TO_MONTH_366
        } else {
            &DAYS_TO_MONTH_365
        };

        let mut month = 1;
        while months[month as usize] <= days {
            month += 1;
        }
        let day = days - months[(month - 1) as usize] + 1;

        (year, month, day)
    }

    /// Time of day `(hour, minute, second, fraction_ticks)` where the
    /// fraction is in 100ns units below one second.
    #[must_use]
    pub fn time(&self) -> (u32, u32, u32, u32) {
        let ticks = self.ticks() % TICKS_PER_DAY;
        let hour = (ticks / TICKS_PER_HOUR) as u32;
        let minute = ((ticks / TICKS_PER_MINUTE) % 60) as u32;
        let second = ((ticks / TICKS_PER_SECOND) % 60) as u32;
        let fraction = (ticks % TICKS_PER_SECOND) as u32;

        (hour, minute, second, fraction)
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (year, month, day) = self.date();
        let (hour, minute, second, fraction) = self.time();

        write!(f, "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")?;
        if fraction != 0 {
            write!(f, ".{fraction:07}")?;
        }
        match self.kind() {
            DateTimeKind::Utc => write!(f, "Z"),
            DateTimeKind::Unspecified | DateTimeKind::Local => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        let value = DateTime::from_date_data(0).unwrap();
        assert_eq!(value.date(), (1, 1, 1));
        assert_eq!(value.time(), (0, 0, 0, 0));
        assert_eq!(value.kind(), DateTimeKind::Unspecified);
        assert_eq!(value.to_string(), "0001-01-01 00:00:00");
    }

    #[test]
    fn test_known_instant() {
        // 2024-02-29 12:30:45 UTC, a leap day
        // days from 0001-01-01 to 2024-02-29 = 738944
        let ticks = 738_944 * TICKS_PER_DAY
            + 12 * TICKS_PER_HOUR
            + 30 * TICKS_PER_MINUTE
            + 45 * TICKS_PER_SECOND;
        let value = DateTime::from_date_data(ticks | (1 << 62)).unwrap();

        assert_eq!(value.date(), (2024, 2, 29));
        assert_eq!(value.time(), (12, 30, 45, 0));
        assert_eq!(value.kind(), DateTimeKind::Utc);
        assert_eq!(value.to_string(), "2024-02-29 12:30:45Z");
    }

    #[test]
    fn test_century_non_leap_year() {
        // 1900-03-01: 1900 is not a leap year
        // days from 0001-01-01 to 1900-03-01 = 693654
        let value = DateTime::from_date_data(693_654 * TICKS_PER_DAY).unwrap();
        assert_eq!(value.date(), (1900, 3, 1));
    }

    #[test]
    fn test_max_ticks() {
        let value = DateTime::from_date_data(MAX_TICKS).unwrap();
        assert_eq!(value.date(), (9999, 12, 31));
        assert_eq!(value.time(), (23, 59, 59, 9_999_999));
    }

    #[test]
    fn test_overflowing_ticks_rejected() {
        assert_eq!(DateTime::from_date_data(MAX_TICKS + 1), None);
        // kind bits alone don't push it out of range
        assert!(DateTime::from_date_data(MAX_TICKS | (2 << 62)).is_some());
    }

    #[test]
    fn test_local_kinds() {
        let local = DateTime::from_date_data(2 << 62).unwrap();
        let ambiguous = DateTime::from_date_data(3 << 62).unwrap();
        assert_eq!(local.kind(), DateTimeKind::Local);
        assert_eq!(ambiguous.kind(), DateTimeKind::Local);
    }

    #[test]
    fn test_fraction_display() {
        let value = DateTime::from_date_data(1).unwrap();
        assert_eq!(value.to_string(), "0001-01-01 00:00:00.0000001");
    }
}
