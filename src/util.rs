/// Arithmetic mean, `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let centre = mean(data)?;
    let variance = data.iter().map(|v| (v - centre).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Largest value of a float slice, ignoring NaNs.
pub fn max(data: &[f64]) -> Option<f64> {
    data.iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |best, v| match best {
            Some(b) if b >= v => Some(b),
            _ => Some(v),
        })
}
