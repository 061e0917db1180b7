//! Descriptive statistics shared by insights and model evaluation

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Label with an occurrence count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Label with an aggregated value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelValue {
    pub label: String,
    pub value: f64,
}

/// count / mean / std / min / quartiles / max
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1); zero for fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Linear-interpolated quantile of an ascending slice
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn describe(values: &[f64]) -> Option<Describe> {
    let s = sorted(values);
    Some(Describe {
        count: s.len(),
        mean: mean(&s)?,
        std: std_dev(&s),
        min: *s.first()?,
        q25: quantile(&s, 0.25)?,
        median: quantile(&s, 0.5)?,
        q75: quantile(&s, 0.75)?,
        max: *s.last()?,
    })
}

/// Most frequent labels first; ties break alphabetically
pub fn top_counts<'a, I>(values: I, limit: Option<usize>) -> Vec<LabelCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut out: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out.truncate(limit.unwrap_or(usize::MAX));
    out
}

/// Group mean per label, highest first
pub fn top_means<I>(pairs: I, limit: Option<usize>) -> Vec<LabelValue>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    for (label, value) in pairs {
        let entry = groups.entry(label).or_default();
        entry.0 += value;
        entry.1 += 1;
    }
    let mut out: Vec<LabelValue> = groups
        .into_iter()
        .map(|(label, (sum, n))| LabelValue {
            label,
            value: sum / n as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    out.truncate(limit.unwrap_or(usize::MAX));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let d = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(d.count, 4);
        assert_eq!(d.mean, 2.5);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert_eq!(d.q25, 1.75);
        assert_eq!(d.median, 2.5);
        assert_eq!(d.q75, 3.25);
        assert!((d.std - 1.2910).abs() < 1e-4);
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn test_top_counts_ties_are_alphabetical() {
        let counts = top_counts(["Kia", "BMW", "Kia", "Audi", "BMW", "Lada"], Some(3));
        let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["BMW", "Kia", "Audi"]);
    }

    #[test]
    fn test_top_means() {
        let means = top_means(
            vec![
                ("Kia".to_string(), 10.0),
                ("Kia".to_string(), 30.0),
                ("BMW".to_string(), 50.0),
            ],
            None,
        );
        assert_eq!(means[0].label, "BMW");
        assert_eq!(means[1].value, 20.0);
    }
}
