use chrono::{DateTime, Duration, Local, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time-window selector shown next to the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    /// Since local midnight of the current date.
    #[default]
    Today,
    /// The last 3600 seconds.
    LastHour,
}

impl TimeWindow {
    /// Start instant of the window relative to `now`.
    ///
    /// `Today` resolves midnight in the time zone `now` is expressed in. On the
    /// rare days where local midnight does not exist (DST gap), the start falls
    /// back to `now` minus the seconds elapsed since the wall-clock midnight.
    pub fn start_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        match self {
            TimeWindow::LastHour => now.with_timezone(&Utc) - Duration::seconds(3600),
            TimeWindow::Today => {
                let midnight = now.date_naive().and_hms_opt(0, 0, 0).and_then(|naive| {
                    now.timezone().from_local_datetime(&naive).earliest()
                });
                match midnight {
                    Some(start) => start.with_timezone(&Utc),
                    None => {
                        now.with_timezone(&Utc)
                            - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
                    }
                }
            }
        }
    }

    /// Start instant of the window relative to the current local time.
    pub fn start_now(&self) -> DateTime<Utc> {
        self.start_at(&Local::now())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Today => "today",
            TimeWindow::LastHour => "last_hour",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "today" => Ok(Self::Today),
            "last_hour" | "hour" | "lasthour" => Ok(Self::LastHour),
            _ => Err(format!("Unknown time window: {}", s)),
        }
    }
}
