use std::fmt;

/// Threshold declaration as written in a scenario file, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdDecl {
    pub selector: String,
    pub expressions: Vec<String>,
}

/// A metric name plus the tags a series must carry to be selected.
///
/// Parsed from `name` or `name{key:value,key2=value2}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelector {
    pub metric: String,
    /// Sorted by key.
    pub tags: Vec<(String, String)>,
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.metric)?;
        if self.tags.is_empty() {
            return Ok(());
        }

        f.write_str("{")?;
        for (i, (k, v)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}:{v}")?;
        }
        f.write_str("}")
    }
}

pub fn parse_selector(raw: &str) -> Result<MetricSelector, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty metric name".to_string());
    }

    let Some(open) = s.find('{') else {
        if s.contains('}') {
            return Err("unbalanced `}`".to_string());
        }
        return Ok(MetricSelector {
            metric: s.to_string(),
            tags: Vec::new(),
        });
    };

    let metric = s[..open].trim();
    if metric.is_empty() {
        return Err("empty metric name".to_string());
    }

    let inner = s[open + 1..]
        .strip_suffix('}')
        .ok_or_else(|| "missing closing `}`".to_string())?;

    let mut tags: Vec<(String, String)> = Vec::new();
    for pair in inner.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (k, v) = pair
            .split_once(':')
            .or_else(|| pair.split_once('='))
            .ok_or_else(|| format!("tag `{pair}` must be `key:value`"))?;
        let (k, v) = (k.trim(), v.trim());
        if k.is_empty() {
            return Err(format!("tag `{pair}` has an empty key"));
        }
        if tags.iter().any(|(existing, _)| existing == k) {
            return Err(format!("tag `{k}` is repeated"));
        }
        tags.push((k.to_string(), v.to_string()));
    }
    tags.sort();

    Ok(MetricSelector {
        metric: metric.to_string(),
        tags,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ThresholdOp {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Lte,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Gte,
    #[strum(serialize = "==")]
    Eq,
}

impl ThresholdOp {
    pub fn compare(self, observed: f64, bound: f64) -> bool {
        match self {
            Self::Lt => observed < bound,
            Self::Lte => observed <= bound,
            Self::Gt => observed > bound,
            Self::Gte => observed >= bound,
            Self::Eq => observed == bound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdAgg {
    Avg,
    Min,
    Max,
    Med,
    Count,
    Rate,
    Value,
    /// Percentile in `(0, 100]`.
    P(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub agg: ThresholdAgg,
    pub op: ThresholdOp,
    pub value: f64,
    /// Expression text as declared.
    pub source: String,
}

/// Parsed selector with every expression declared for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    pub selector: MetricSelector,
    /// Selector text as declared.
    pub source: String,
    pub expressions: Vec<ThresholdExpr>,
}

pub fn parse_threshold_expr(raw: &str) -> Result<ThresholdExpr, String> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return Err("empty threshold".to_string());
    }

    // Two-character operators first so `<=` is not read as `<`.
    let ops = [
        ("<=", ThresholdOp::Lte),
        (">=", ThresholdOp::Gte),
        ("==", ThresholdOp::Eq),
        ("<", ThresholdOp::Lt),
        (">", ThresholdOp::Gt),
    ];
    let (op_pos, op_len, op) = ops
        .iter()
        .find_map(|(tok, op)| s.find(tok).map(|pos| (pos, tok.len(), *op)))
        .ok_or_else(|| "missing operator".to_string())?;

    let (left, right_with_op) = s.split_at(op_pos);
    let right = &right_with_op[op_len..];
    if left.is_empty() {
        return Err("missing aggregation".to_string());
    }
    if right.is_empty() {
        return Err("missing bound".to_string());
    }

    let agg = match left.to_ascii_lowercase().as_str() {
        "avg" => ThresholdAgg::Avg,
        "min" => ThresholdAgg::Min,
        "max" => ThresholdAgg::Max,
        "med" => ThresholdAgg::Med,
        "count" => ThresholdAgg::Count,
        "rate" => ThresholdAgg::Rate,
        "value" => ThresholdAgg::Value,
        other => {
            let Some(inner) = other.strip_prefix("p(").and_then(|v| v.strip_suffix(')')) else {
                return Err(format!("unknown aggregation `{left}`"));
            };
            let p: f64 = inner
                .parse()
                .map_err(|_| format!("invalid percentile `{inner}`"))?;
            if !(p > 0.0 && p <= 100.0) {
                return Err(format!("percentile `{inner}` out of range"));
            }
            ThresholdAgg::P(p)
        }
    };

    let value: f64 = right
        .parse()
        .map_err(|_| format!("invalid numeric bound `{right}`"))?;
    if !value.is_finite() {
        return Err(format!("invalid numeric bound `{right}`"));
    }

    Ok(ThresholdExpr {
        agg,
        op,
        value,
        source: raw.trim().to_string(),
    })
}
