//! # Closed Enumerations
//!
//! Process-wide constants that parameterize every insert and query: job types,
//! rolling periods, triggers, deployment regions and the home-summary windows.
//!
//! Each enumeration is closed. Parsing an unknown code fails with
//! [`UnknownVariant`], which the validation layer turns into a field issue
//! before anything reaches storage.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A code that is not part of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {enumeration}")]
pub struct UnknownVariant {
    pub enumeration: &'static str,
    pub value: String,
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $code)] $variant, )+
        }

        impl $name {
            /// Every member of the enumeration, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Human-readable name of the enumeration, used in validation messages
            pub const LABEL: &'static str = $label;

            /// Wire code of this member
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $code, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $code => Ok($name::$variant), )+
                    _ => Err(UnknownVariant {
                        enumeration: Self::LABEL,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

closed_enum! {
    /// Kind of check a monitor runs
    pub enum JobType ("job type") {
        Http => "http",
        Tcp => "tcp",
        /// Spelled as in the upstream contract
        Imcp => "imcp",
        Udp => "udp",
        Dns => "dns",
        Ssl => "ssl",
    }
}

impl JobType {
    /// Job types that have a persisted probe result table
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Http | Self::Tcp)
    }
}

closed_enum! {
    /// Rolling periods accepted by the per-monitor metrics query
    pub enum Period ("period") {
        OneHour => "1h",
        OneDay => "1d",
        ThreeDays => "3d",
        SevenDays => "7d",
        FourteenDays => "14d",
        FortyFiveDays => "45d",
    }
}

impl Period {
    pub fn duration(&self) -> Duration {
        match self {
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
            Self::ThreeDays => Duration::days(3),
            Self::SevenDays => Duration::days(7),
            Self::FourteenDays => Duration::days(14),
            Self::FortyFiveDays => Duration::days(45),
        }
    }

    /// Start of the window that ends at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::OneDay
    }
}

closed_enum! {
    /// Whether a probe ran on its schedule or was requested on demand
    pub enum Trigger ("trigger") {
        /// Scheduled run
        Cron => "cron",
        /// On-demand run
        Api => "api",
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::Cron
    }
}

closed_enum! {
    /// Rolling windows for the home summary count
    pub enum RollingWindow ("rolling window") {
        TenMinutes => "10m",
        OneHour => "1h",
        OneDay => "1d",
        OneWeek => "1w",
        /// One calendar month
        OneMonth => "1m",
    }
}

impl RollingWindow {
    /// Start of the window that ends at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::TenMinutes => now - Duration::minutes(10),
            Self::OneHour => now - Duration::hours(1),
            Self::OneDay => now - Duration::days(1),
            Self::OneWeek => now - Duration::weeks(1),
            Self::OneMonth => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
        }
    }
}

closed_enum! {
    /// Deployment regions a probe can run from
    pub enum Region ("region") {
        Ams => "ams",
        Arn => "arn",
        Atl => "atl",
        Bog => "bog",
        Bom => "bom",
        Bos => "bos",
        Cdg => "cdg",
        Den => "den",
        Dfw => "dfw",
        Ewr => "ewr",
        Eze => "eze",
        Fra => "fra",
        Gdl => "gdl",
        Gig => "gig",
        Gru => "gru",
        Hkg => "hkg",
        Iad => "iad",
        Jnb => "jnb",
        Lax => "lax",
        Lhr => "lhr",
        Mad => "mad",
        Mia => "mia",
        Nrt => "nrt",
        Ord => "ord",
        Otp => "otp",
        Phx => "phx",
        Qro => "qro",
        Scl => "scl",
        Sea => "sea",
        Sin => "sin",
        Sjc => "sjc",
        Syd => "syd",
        Waw => "waw",
        Yul => "yul",
        Yyz => "yyz",
    }
}

/// Table names of the time-series family
pub mod tables {
    pub const HTTP_RESPONSES: &str = "http_responses";
    pub const TCP_RESPONSES: &str = "tcp_responses";
    pub const AUDIT_LOGS: &str = "audit_logs";
}

/// Fixed query windows of the aggregation catalog
pub mod windows {
    use chrono::Duration;

    pub fn daily_list() -> Duration {
        Duration::hours(24)
    }

    pub fn weekly_status() -> Duration {
        Duration::days(7)
    }

    pub fn status_histogram() -> Duration {
        Duration::days(45)
    }

    pub const DEFAULT_AUDIT_INTERVAL_DAYS: u32 = 30;
    pub const MAX_AUDIT_INTERVAL_DAYS: u32 = 365;
}
