//! Metric Analytics
//!
//! Keeps a daily history of the headline organizational metrics and runs two
//! analyses over it each evening: a least-squares trend forecast over the
//! recent window, and z-score anomaly detection over the whole history.

use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

use crate::components::world::DayClock;
use crate::metrics::OrgMetrics;
use org_events::{AnalyticsSnapshot, MetricAnomaly, MetricForecast};

/// Points kept per metric
const HISTORY_LIMIT: usize = 1000;
/// Most recent points the trend is fitted to
const TREND_WINDOW: usize = 20;
/// Most recent points whose spread sets the forecast confidence
const CONFIDENCE_WINDOW: usize = 5;
const MIN_TREND_POINTS: usize = 3;
const MIN_ANOMALY_POINTS: usize = 10;
/// Slopes smaller than this in magnitude count as flat
const STABLE_SLOPE: f64 = 0.01;
const MAX_ANOMALIES: usize = 10;
/// z-score beyond which an anomaly is rated high rather than medium
const HIGH_Z_SCORE: f64 = 3.0;

/// Days ahead forecast in each snapshot
pub const FORECAST_PERIODS: usize = 5;
/// Standard deviations from the mean that make a value anomalous
pub const ANOMALY_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackedMetric {
    TaskSuccessRate,
    Morale,
    CustomerSatisfaction,
    Budget,
}

impl TrackedMetric {
    pub const ALL: [TrackedMetric; 4] = [
        TrackedMetric::TaskSuccessRate,
        TrackedMetric::Morale,
        TrackedMetric::CustomerSatisfaction,
        TrackedMetric::Budget,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackedMetric::TaskSuccessRate => "task_success_rate",
            TrackedMetric::Morale => "morale",
            TrackedMetric::CustomerSatisfaction => "customer_satisfaction",
            TrackedMetric::Budget => "budget",
        }
    }

    pub fn read(self, metrics: &OrgMetrics) -> f64 {
        match self {
            TrackedMetric::TaskSuccessRate => metrics.performance.task_success_rate as f64,
            TrackedMetric::Morale => metrics.health.morale as f64,
            TrackedMetric::CustomerSatisfaction => metrics.performance.customer_satisfaction as f64,
            TrackedMetric::Budget => metrics.financials.budget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub trend: Trend,
    pub predictions: Vec<f64>,
    pub slope: Option<f64>,
    pub confidence: f32,
}

impl Forecast {
    fn insufficient() -> Self {
        Self {
            trend: Trend::InsufficientData,
            predictions: Vec::new(),
            slope: None,
            confidence: 0.0,
        }
    }

    pub fn next_value(&self) -> Option<f64> {
        self.predictions.first().copied()
    }

    pub fn record(&self, metric: TrackedMetric) -> MetricForecast {
        MetricForecast {
            metric: metric.as_str().to_string(),
            trend: self.trend.as_str().to_string(),
            predictions: self.predictions.clone(),
            slope: self.slope,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anomaly {
    pub day: u64,
    pub value: f64,
    pub z_score: f64,
}

impl Anomaly {
    pub fn record(&self, metric: TrackedMetric) -> MetricAnomaly {
        MetricAnomaly {
            metric: metric.as_str().to_string(),
            day: self.day,
            value: self.value,
            z_score: self.z_score,
            severity: if self.z_score > HIGH_Z_SCORE { "high" } else { "medium" }.to_string(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Daily values of every tracked metric
#[derive(Resource, Debug, Default)]
pub struct MetricHistory {
    series: BTreeMap<TrackedMetric, VecDeque<(u64, f64)>>,
}

impl MetricHistory {
    pub fn record(&mut self, metric: TrackedMetric, day: u64, value: f64) {
        let series = self.series.entry(metric).or_default();
        series.push_back((day, value));
        while series.len() > HISTORY_LIMIT {
            series.pop_front();
        }
    }

    pub fn len(&self, metric: TrackedMetric) -> usize {
        self.series.get(&metric).map_or(0, VecDeque::len)
    }

    fn values(&self, metric: TrackedMetric) -> Vec<f64> {
        self.series
            .get(&metric)
            .map(|s| s.iter().map(|(_, v)| *v).collect())
            .unwrap_or_default()
    }

    /// Fits a line to the recent window and extends it `periods_ahead` days.
    pub fn predict_trend(&self, metric: TrackedMetric, periods_ahead: usize) -> Forecast {
        let all = self.values(metric);
        if all.len() < MIN_TREND_POINTS {
            return Forecast::insufficient();
        }
        let values = &all[all.len().saturating_sub(TREND_WINDOW)..];

        let n = values.len() as f64;
        let sum_x: f64 = (0..values.len()).map(|x| x as f64).sum();
        let sum_x2: f64 = (0..values.len()).map(|x| (x * x) as f64).sum();
        let sum_y: f64 = values.iter().sum();
        let sum_xy: f64 = values.iter().enumerate().map(|(x, y)| x as f64 * y).sum();

        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;
        let predictions = (1..=periods_ahead)
            .map(|i| intercept + slope * (n + i as f64 - 1.0))
            .collect();

        let recent = &values[values.len().saturating_sub(CONFIDENCE_WINDOW)..];
        let spread = variance(recent) / (mean(recent) + 0.001);
        let confidence = if spread.is_finite() {
            (1.0 - spread).clamp(0.1, 0.9) as f32
        } else {
            0.1
        };

        let trend = if slope.abs() < STABLE_SLOPE {
            Trend::Stable
        } else if slope > 0.0 {
            Trend::Increasing
        } else {
            Trend::Decreasing
        };

        Forecast {
            trend,
            predictions,
            slope: Some(slope),
            confidence,
        }
    }

    /// Values more than `threshold_std` standard deviations from the mean,
    /// most recent last. Only the latest few are returned.
    pub fn detect_anomalies(&self, metric: TrackedMetric, threshold_std: f64) -> Vec<Anomaly> {
        let Some(series) = self.series.get(&metric) else {
            return Vec::new();
        };
        if series.len() < MIN_ANOMALY_POINTS {
            return Vec::new();
        }

        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        let m = mean(&values);
        let std = variance(&values).sqrt();

        let anomalies: Vec<Anomaly> = series
            .iter()
            .map(|&(day, value)| Anomaly {
                day,
                value,
                z_score: (value - m).abs() / (std + 0.001),
            })
            .filter(|a| a.z_score > threshold_std)
            .collect();
        let skip = anomalies.len().saturating_sub(MAX_ANOMALIES);
        anomalies.into_iter().skip(skip).collect()
    }
}

/// Today's analytics, read into the snapshot
#[derive(Resource, Debug, Default)]
pub struct AnalyticsReport(pub AnalyticsSnapshot);

/// System: record today's metrics, forecast each, and flag today's anomalies
pub fn update_analytics(
    clock: Res<DayClock>,
    metrics: Res<OrgMetrics>,
    mut history: ResMut<MetricHistory>,
    mut report: ResMut<AnalyticsReport>,
) {
    let mut snapshot = AnalyticsSnapshot::default();
    for metric in TrackedMetric::ALL {
        history.record(metric, clock.day, metric.read(&metrics));
        snapshot
            .forecasts
            .push(history.predict_trend(metric, FORECAST_PERIODS).record(metric));

        for anomaly in history
            .detect_anomalies(metric, ANOMALY_THRESHOLD)
            .into_iter()
            .filter(|a| a.day == clock.day)
        {
            warn!(day = clock.day, metric = metric.as_str(), value = anomaly.value, z = anomaly.z_score, "metric anomaly");
            snapshot.anomalies.push(anomaly.record(metric));
        }
    }
    report.0 = snapshot;
}
