use surge_metrics::{SeriesValue, Snapshot};

use crate::thresholds::{MetricSelector, ThresholdAgg, ThresholdSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    /// Nothing matched the selector, or the aggregation does not apply to the metric kind.
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdOutcome {
    pub selector: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub verdict: Verdict,
}

impl ThresholdOutcome {
    /// Indeterminate counts as a failure.
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Evaluates every declared expression against one snapshot.
///
/// The snapshot is never modified, so evaluating it again yields the same outcomes.
pub fn evaluate_thresholds(snapshot: &Snapshot, sets: &[ThresholdSet]) -> Vec<ThresholdOutcome> {
    let mut out = Vec::with_capacity(sets.iter().map(|s| s.expressions.len()).sum());

    for set in sets {
        let aggregated = aggregate(snapshot, &set.selector);

        for expr in &set.expressions {
            let observed = aggregated
                .as_ref()
                .and_then(|value| observed_value(snapshot, value, expr.agg));

            let verdict = match observed {
                Some(v) if expr.op.compare(v, expr.value) => Verdict::Pass,
                Some(_) => Verdict::Fail,
                None => Verdict::Indeterminate,
            };

            out.push(ThresholdOutcome {
                selector: set.source.clone(),
                expression: expr.source.clone(),
                observed,
                verdict,
            });
        }
    }

    out
}

pub fn all_passed(outcomes: &[ThresholdOutcome]) -> bool {
    outcomes.iter().all(ThresholdOutcome::passed)
}

fn aggregate(snapshot: &Snapshot, selector: &MetricSelector) -> Option<SeriesValue> {
    let mut query = snapshot.query(&selector.metric);
    for (k, v) in &selector.tags {
        query = query.where_eq(k, v);
    }
    query.aggregate()
}

fn observed_value(snapshot: &Snapshot, value: &SeriesValue, agg: ThresholdAgg) -> Option<f64> {
    match (agg, value) {
        (ThresholdAgg::Count, SeriesValue::Counter(v)) => Some(*v as f64),
        (ThresholdAgg::Count, SeriesValue::Rate { total, .. }) => Some(*total as f64),
        (ThresholdAgg::Count, SeriesValue::Trend(t)) => Some(t.count() as f64),

        (ThresholdAgg::Rate, SeriesValue::Counter(v)) => {
            let secs = snapshot.elapsed().as_secs_f64();
            (secs > 0.0).then(|| *v as f64 / secs)
        }
        (ThresholdAgg::Rate, SeriesValue::Rate { hits, total }) => {
            (*total > 0).then(|| *hits as f64 / *total as f64)
        }

        (ThresholdAgg::Avg, SeriesValue::Trend(t)) => t.avg(),
        (ThresholdAgg::Min, SeriesValue::Trend(t)) => t.min(),
        (ThresholdAgg::Max, SeriesValue::Trend(t)) => t.max(),
        (ThresholdAgg::Med, SeriesValue::Trend(t)) => t.percentile(50.0),
        (ThresholdAgg::P(p), SeriesValue::Trend(t)) => t.percentile(p),

        (ThresholdAgg::Value, SeriesValue::Gauge(v)) => Some(*v as f64),

        _ => None,
    }
}
