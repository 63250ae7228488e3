//! Dashboard analytics: rolling-window counts, averages and a daily trend.
//!
//! The aggregation is one order-independent fold over normalized entries.
//! Calendar days are taken in the caller's time zone, so "today" and the
//! window starts are local-midnight boundaries rather than trailing 24h spans.

#![allow(missing_docs)]

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::labels::Locale;
use crate::core::config::AnalyticsConfig;
use crate::records::{LogEntry, normalize_all};

// ──────────────────── options ────────────────────

/// Inputs that shape one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsOptions {
    /// Minutes the manual flow is assumed to take; the time-saved baseline.
    pub manual_flow_minutes: f64,
    pub trend_days: u32,
    pub week_window_days: u32,
    pub month_window_days: u32,
    pub year_window_days: u32,
    pub locale: Locale,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}

impl AnalyticsOptions {
    #[must_use]
    pub fn from_config(cfg: &AnalyticsConfig) -> Self {
        Self {
            manual_flow_minutes: cfg.manual_flow_minutes,
            trend_days: cfg.trend_days,
            week_window_days: cfg.week_window_days,
            month_window_days: cfg.month_window_days,
            year_window_days: cfg.year_window_days,
            locale: cfg.locale,
        }
    }

    #[must_use]
    pub const fn with_trend_days(mut self, trend_days: u32) -> Self {
        self.trend_days = trend_days;
        self
    }

    #[must_use]
    pub const fn with_manual_flow_minutes(mut self, minutes: f64) -> Self {
        self.manual_flow_minutes = minutes;
        self
    }

    /// Effective window sizes: each window is at least as wide as the one
    /// before it, and the trend is at least one day.
    #[must_use]
    pub fn windows(&self) -> Windows {
        let trend_days = self.trend_days.max(1);
        let week_days = self.week_window_days.max(trend_days);
        let month_days = self.month_window_days.max(week_days);
        let year_days = self.year_window_days.max(month_days);
        Windows {
            trend_days,
            week_days,
            month_days,
            year_days,
        }
    }
}

/// Window sizes in days after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Windows {
    pub trend_days: u32,
    pub week_days: u32,
    pub month_days: u32,
    pub year_days: u32,
}

// ──────────────────── result types ────────────────────

/// Per-calendar-day accumulator. `execution_samples <= executions` always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub executions: u64,
    pub execution_minutes_sum: f64,
    pub execution_samples: u64,
    pub time_saved_minutes: f64,
}

impl DailyBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            executions: 0,
            execution_minutes_sum: 0.0,
            execution_samples: 0,
            time_saved_minutes: 0.0,
        }
    }

    #[must_use]
    pub fn avg_execution_minutes(&self) -> f64 {
        mean(self.execution_minutes_sum, self.execution_samples)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowCounts {
    pub day: u64,
    pub week: u64,
    pub month: u64,
    pub year: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub executions: WindowCounts,
    pub avg_execution_minutes: f64,
    pub time_saved_minutes: f64,
}

/// One day of the trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Short weekday name in the configured locale.
    pub label: String,
    pub executions: u64,
    pub avg_execution_minutes: f64,
    pub time_saved_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub entries: u64,
    pub execution_samples: u64,
    pub execution_minutes: f64,
    pub time_saved_minutes: f64,
}

/// Frequency of one kit-confirmation label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitCount {
    pub label: String,
    pub count: u64,
    /// `count / totals.entries`.
    pub ratio: f64,
}

/// Full dashboard analytics payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub metrics: Metrics,
    pub trend: Vec<TrendPoint>,
    pub totals: Totals,
    pub popular_kits: Vec<KitCount>,
    pub windows: Windows,
    pub generated_at: DateTime<Utc>,
}

// ──────────────────── accumulator ────────────────────

/// Incremental form of [`aggregate`]: push entries in any order, then finish.
#[derive(Debug, Clone)]
pub struct AnalyticsAccumulator<Tz: TimeZone> {
    tz: Tz,
    now: DateTime<Utc>,
    today: NaiveDate,
    windows: Windows,
    /// Day, week, month and year window starts.
    starts: [NaiveDate; 4],
    counts: [u64; 4],
    manual_flow_minutes: f64,
    locale: Locale,
    buckets: HashMap<NaiveDate, DailyBucket>,
    totals: Totals,
    kit_index: HashMap<String, usize>,
    kits: Vec<(String, u64)>,
}

impl<Tz: TimeZone> AnalyticsAccumulator<Tz> {
    /// Start an aggregation anchored at `now`, with days taken in `tz`.
    pub fn new(now: DateTime<Utc>, tz: &Tz, options: &AnalyticsOptions) -> Self {
        let today = now.with_timezone(tz).date_naive();
        let windows = options.windows();
        let starts = [
            today,
            window_start(today, windows.week_days),
            window_start(today, windows.month_days),
            window_start(today, windows.year_days),
        ];
        Self {
            tz: tz.clone(),
            now,
            today,
            windows,
            starts,
            counts: [0; 4],
            manual_flow_minutes: options.manual_flow_minutes,
            locale: options.locale,
            buckets: HashMap::new(),
            totals: Totals::default(),
            kit_index: HashMap::new(),
            kits: Vec::new(),
        }
    }

    /// Fold one entry into the running totals.
    pub fn push(&mut self, entry: &LogEntry) {
        let day = entry.timestamp.with_timezone(&self.tz).date_naive();
        let bucket = self
            .buckets
            .entry(day)
            .or_insert_with(|| DailyBucket::empty(day));

        bucket.executions += 1;
        self.totals.entries += 1;

        if let Some(minutes) = entry.execution_minutes.filter(|m| m.is_finite()) {
            bucket.execution_minutes_sum += minutes;
            bucket.execution_samples += 1;
            self.totals.execution_minutes += minutes;
            self.totals.execution_samples += 1;

            let surplus = self.manual_flow_minutes - minutes;
            if self.manual_flow_minutes.is_finite() && surplus > 0.0 {
                bucket.time_saved_minutes += surplus;
                self.totals.time_saved_minutes += surplus;
            }
        }

        for (count, start) in self.counts.iter_mut().zip(self.starts) {
            if start <= day {
                *count += 1;
            }
        }

        if let Some(label) = entry
            .kit_confirmation
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
        {
            if let Some(&idx) = self.kit_index.get(label) {
                self.kits[idx].1 += 1;
            } else {
                self.kit_index.insert(label.to_string(), self.kits.len());
                self.kits.push((label.to_string(), 1));
            }
        }
    }

    /// Daily buckets seen so far, oldest first.
    #[must_use]
    pub fn buckets(&self) -> Vec<&DailyBucket> {
        let mut buckets: Vec<&DailyBucket> = self.buckets.values().collect();
        buckets.sort_by_key(|bucket| bucket.date);
        buckets
    }

    /// Produce the result. The accumulator is consumed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> AnalyticsResult {
        let trend = (0..self.windows.trend_days)
            .rev()
            .map(|offset| {
                let date = window_start(self.today, offset + 1);
                let (executions, avg_execution_minutes, time_saved_minutes) =
                    self.buckets.get(&date).map_or((0, 0.0, 0.0), |bucket| {
                        (
                            bucket.executions,
                            bucket.avg_execution_minutes(),
                            bucket.time_saved_minutes,
                        )
                    });
                TrendPoint {
                    date,
                    label: self.locale.weekday_short(date.weekday()).to_string(),
                    executions,
                    avg_execution_minutes,
                    time_saved_minutes,
                }
            })
            .collect();

        let entries = self.totals.entries;
        let mut kits = self.kits;
        // Stable sort keeps first-seen order among equal counts.
        kits.sort_by(|a, b| b.1.cmp(&a.1));
        let popular_kits = kits
            .into_iter()
            .map(|(label, count)| KitCount {
                label,
                count,
                ratio: if entries == 0 {
                    0.0
                } else {
                    count as f64 / entries as f64
                },
            })
            .collect();

        let [day, week, month, year] = self.counts;
        AnalyticsResult {
            metrics: Metrics {
                executions: WindowCounts {
                    day,
                    week,
                    month,
                    year,
                },
                avg_execution_minutes: mean(
                    self.totals.execution_minutes,
                    self.totals.execution_samples,
                ),
                time_saved_minutes: self.totals.time_saved_minutes,
            },
            trend,
            totals: self.totals,
            popular_kits,
            windows: self.windows,
            generated_at: self.now,
        }
    }
}

// ──────────────────── entry points ────────────────────

/// Aggregate normalized entries. Never fails; empty input yields zeros.
pub fn aggregate<'a, Tz, I>(
    entries: I,
    now: DateTime<Utc>,
    tz: &Tz,
    options: &AnalyticsOptions,
) -> AnalyticsResult
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut acc = AnalyticsAccumulator::new(now, tz, options);
    for entry in entries {
        acc.push(entry);
    }
    acc.finish()
}

/// Normalize raw stored documents and aggregate them in one call.
pub fn aggregate_documents<'a, Tz, I>(
    docs: I,
    now: DateTime<Utc>,
    tz: &Tz,
    options: &AnalyticsOptions,
) -> AnalyticsResult
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a Value>,
{
    let entries = normalize_all(docs, tz);
    aggregate(&entries, now, tz, options)
}

/// First day of a `days`-long window ending on `today`.
fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, samples: u64) -> f64 {
    if samples == 0 {
        0.0
    } else {
        sum / samples as f64
    }
}
