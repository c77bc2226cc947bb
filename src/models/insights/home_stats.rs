//! Home summary: total probe runs, HTTP and TCP combined, over a rolling window.

use crate::constants::RollingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeStatsParams {
    /// `None` counts every row ever stored
    pub window: Option<RollingWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HomeStats {
    pub count: i64,
}

impl HomeStatsParams {
    pub fn new(window: RollingWindow) -> Self {
        Self {
            window: Some(window),
        }
    }

    pub fn all_time() -> Self {
        Self { window: None }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window.map(|window| window.cutoff(now))
    }
}

impl HomeStats {
    /// Count HTTP and TCP rows at or after `cutoff`
    pub async fn fetch(
        conn: &mut PgConnection,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<HomeStats, sqlx::Error> {
        sqlx::query_as::<_, HomeStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM http_responses WHERE $1::timestamptz IS NULL OR time >= $1)
              + (SELECT COUNT(*) FROM tcp_responses WHERE $1::timestamptz IS NULL OR time >= $1)
                AS count
            "#,
        )
        .bind(cutoff)
        .fetch_one(conn)
        .await
    }

    /// Same count over in-memory row timestamps
    pub fn project<I>(times: I, cutoff: Option<DateTime<Utc>>) -> HomeStats
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let count = times
            .into_iter()
            .filter(|time| cutoff.map_or(true, |cutoff| *time >= cutoff))
            .count();
        HomeStats {
            count: count as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_project_respects_window() {
        let now = Utc::now();
        let times = vec![now - Duration::minutes(5), now - Duration::hours(2), now];

        let ten_minutes = HomeStatsParams::new(RollingWindow::TenMinutes);
        assert_eq!(HomeStats::project(times.clone(), ten_minutes.cutoff(now)).count, 2);

        let all_time = HomeStatsParams::all_time();
        assert_eq!(HomeStats::project(times, all_time.cutoff(now)).count, 3);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(HomeStats::project(Vec::new(), None), HomeStats { count: 0 });
    }
}
