//! Threshold-based alerting over queue/store health metrics.
//!
//! Advisory only: nothing in this module can fail a foreground tool call.
//! Handlers call [`AlertMonitor::observe`] on the way out and ignore the
//! result beyond logging.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ResponseTime,
    MemoryUsage,
    ErrorRate,
    Throughput,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseTime => "response_time",
            Self::MemoryUsage => "memory_usage",
            Self::ErrorRate => "error_rate",
            Self::Throughput => "throughput",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricThresholds {
    pub warning: f64,
    pub critical: f64,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: u64,
    pub metric: Metric,
    pub level: AlertLevel,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub context: String,
    pub raised_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

struct CooldownState {
    last_fired: HashMap<Metric, Instant>,
}

pub struct AlertMonitor {
    thresholds: HashMap<Metric, MetricThresholds>,
    ring: Mutex<VecDeque<Alert>>,
    ring_capacity: usize,
    cooldowns: Mutex<CooldownState>,
    next_id: Mutex<u64>,
}

fn default_thresholds() -> HashMap<Metric, MetricThresholds> {
    let mut map = HashMap::new();
    map.insert(
        Metric::ResponseTime,
        MetricThresholds {
            warning: 250.0,
            critical: 1000.0,
            cooldown: Duration::from_secs(60),
        },
    );
    map.insert(
        Metric::MemoryUsage,
        MetricThresholds {
            warning: 0.75,
            critical: 0.9,
            cooldown: Duration::from_secs(120),
        },
    );
    map.insert(
        Metric::ErrorRate,
        MetricThresholds {
            warning: 0.05,
            critical: 0.2,
            cooldown: Duration::from_secs(60),
        },
    );
    map.insert(
        Metric::Throughput,
        MetricThresholds {
            warning: 1.0,
            critical: 0.1,
            cooldown: Duration::from_secs(60),
        },
    );
    map
}

impl Default for AlertMonitor {
    fn default() -> Self {
        Self::new(default_thresholds(), 256)
    }
}

impl AlertMonitor {
    pub fn new(thresholds: HashMap<Metric, MetricThresholds>, ring_capacity: usize) -> Self {
        Self {
            thresholds,
            ring: Mutex::new(VecDeque::with_capacity(ring_capacity)),
            ring_capacity: ring_capacity.max(1),
            cooldowns: Mutex::new(CooldownState {
                last_fired: HashMap::new(),
            }),
            next_id: Mutex::new(1),
        }
    }

    /// Checks `value` against the configured thresholds for `metric`. A
    /// throughput metric is inverted: crossing *below* its threshold is
    /// the degraded direction. Returns the raised alert, if any; respects
    /// the per-metric cooldown, so a sustained breach fires once per window.
    pub fn observe(&self, metric: Metric, value: f64, context: &str) -> Option<Alert> {
        let thresholds = self.thresholds.get(&metric)?;

        let level = if Self::breaches(metric, value, thresholds.critical) {
            Some(AlertLevel::Critical)
        } else if Self::breaches(metric, value, thresholds.warning) {
            Some(AlertLevel::Warning)
        } else {
            None
        };
        let level = level?;

        {
            let mut cooldowns = self.cooldowns.lock().expect("alert cooldown mutex poisoned");
            let now = Instant::now();
            if let Some(last) = cooldowns.last_fired.get(&metric) {
                if now.duration_since(*last) < thresholds.cooldown {
                    return None;
                }
            }
            cooldowns.last_fired.insert(metric, now);
        }

        let threshold_value = match level {
            AlertLevel::Warning => thresholds.warning,
            AlertLevel::Critical => thresholds.critical,
        };

        let mut next_id = self.next_id.lock().expect("alert id mutex poisoned");
        let id = *next_id;
        *next_id += 1;
        drop(next_id);

        let alert = Alert {
            id,
            metric,
            level,
            value,
            threshold: threshold_value,
            message: format!(
                "{} {:?} threshold crossed: value={:.3} threshold={:.3}",
                metric.as_str(),
                level,
                value,
                threshold_value
            ),
            context: context.to_string(),
            raised_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        };

        let mut ring = self.ring.lock().expect("alert ring mutex poisoned");
        if ring.len() >= self.ring_capacity {
            ring.pop_front();
        }
        ring.push_back(alert.clone());
        Some(alert)
    }

    fn breaches(metric: Metric, value: f64, threshold: f64) -> bool {
        match metric {
            Metric::Throughput => value < threshold,
            _ => value > threshold,
        }
    }

    pub fn resolve(&self, alert_id: u64, resolved_by: &str) -> bool {
        let mut ring = self.ring.lock().expect("alert ring mutex poisoned");
        if let Some(alert) = ring.iter_mut().find(|a| a.id == alert_id) {
            alert.resolved_at = Some(Utc::now());
            alert.resolved_by = Some(resolved_by.to_string());
            true
        } else {
            false
        }
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.ring
            .lock()
            .expect("alert ring mutex poisoned")
            .iter()
            .filter(|a| a.resolved_at.is_none())
            .cloned()
            .collect()
    }

    pub fn all_alerts(&self) -> Vec<Alert> {
        self.ring.lock().expect("alert ring mutex poisoned").iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_time_above_warning_raises_warning_alert() {
        let monitor = AlertMonitor::default();
        let alert = monitor
            .observe(Metric::ResponseTime, 400.0, "recall")
            .expect("expected alert");
        assert_eq!(alert.level, AlertLevel::Warning);
    }

    #[test]
    fn response_time_above_critical_raises_critical_alert() {
        let monitor = AlertMonitor::default();
        let alert = monitor
            .observe(Metric::ResponseTime, 2000.0, "recall")
            .expect("expected alert");
        assert_eq!(alert.level, AlertLevel::Critical);
    }

    #[test]
    fn healthy_value_raises_no_alert() {
        let monitor = AlertMonitor::default();
        assert!(monitor.observe(Metric::ResponseTime, 10.0, "recall").is_none());
    }

    #[test]
    fn throughput_breach_is_inverted_below_threshold() {
        let monitor = AlertMonitor::default();
        let alert = monitor
            .observe(Metric::Throughput, 0.01, "queue")
            .expect("expected alert");
        assert_eq!(alert.level, AlertLevel::Critical);
    }

    #[test]
    fn cooldown_suppresses_repeated_alerts() {
        let monitor = AlertMonitor::default();
        let first = monitor.observe(Metric::ErrorRate, 0.5, "store");
        assert!(first.is_some());
        let second = monitor.observe(Metric::ErrorRate, 0.5, "store");
        assert!(second.is_none());
    }

    #[test]
    fn resolve_marks_alert_inactive() {
        let monitor = AlertMonitor::default();
        let alert = monitor.observe(Metric::ErrorRate, 0.5, "store").unwrap();
        assert_eq!(monitor.active_alerts().len(), 1);
        assert!(monitor.resolve(alert.id, "operator"));
        assert_eq!(monitor.active_alerts().len(), 0);
        assert_eq!(monitor.all_alerts().len(), 1);
    }

    #[test]
    fn ring_buffer_drops_oldest_past_capacity() {
        let monitor = AlertMonitor::new(default_thresholds(), 2);
        monitor.observe(Metric::ErrorRate, 0.5, "a");
        std::thread::sleep(Duration::from_millis(1));
        // force past cooldown by using a distinct metric each time
        monitor.observe(Metric::ResponseTime, 2000.0, "b");
        monitor.observe(Metric::MemoryUsage, 0.95, "c");
        assert!(monitor.all_alerts().len() <= 2);
    }
}
