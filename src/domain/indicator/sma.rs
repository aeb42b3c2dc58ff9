//! Simple Moving Average.
//!
//! O(n) sliding window: each row adds the newest price and drops the one
//! leaving the window.
//! SMA(n)[i] = (P[i-n+1] + ... + P[i]) / n
//! Warmup: first (n-1) rows are `None`. The window counts available rows,
//! so gaps in the calendar do not shift it.

pub fn simple_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0_f64;

    for (i, &value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
        }

        let valid = i + 1 >= period;
        out.push(valid.then(|| window_sum / period as f64));
    }

    out
}
