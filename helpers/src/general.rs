use std::error::Error;
use std::fmt;

/// InputValueError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g., a non-positive race distance or too few racers.
#[derive(Debug, Clone)]
pub struct InputValueError;

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value")
    }
}

impl Error for InputValueError {}

/// argmax returns the index of the maximum value in the array x. For several equal maxima the
/// first index is returned.
pub fn argmax<T: std::cmp::PartialOrd + std::marker::Copy>(x: &[T]) -> usize {
    let mut idx_max = 0;
    let mut val_max = x[0];

    for (i, &val) in x.iter().enumerate().skip(1) {
        if val > val_max {
            val_max = val;
            idx_max = i;
        }
    }

    idx_max
}

/// argmin returns the index of the minimum value in the array x. For several equal minima the
/// first index is returned.
pub fn argmin<T: std::cmp::PartialOrd + std::marker::Copy>(x: &[T]) -> usize {
    let mut idx_min = 0;
    let mut val_min = x[0];

    for (i, &val) in x.iter().enumerate().skip(1) {
        if val < val_min {
            val_min = val;
            idx_min = i;
        }
    }

    idx_min
}

/// max returns the maximum value in the array x.
pub fn max<T: std::cmp::PartialOrd + std::marker::Copy>(x: &[T]) -> T {
    let &max_val = x.iter().fold(
        &x[0],
        |val_max, val| {
            if val_max > val {
                val_max
            } else {
                val
            }
        },
    );
    max_val
}

/// min returns the minimum value in the array x.
pub fn min<T: std::cmp::PartialOrd + std::marker::Copy>(x: &[T]) -> T {
    let &min_val = x.iter().fold(
        &x[0],
        |val_min, val| {
            if val_min < val {
                val_min
            } else {
                val
            }
        },
    );
    min_val
}

/// mean returns the arithmetic mean of the values in x, 0.0 for an empty slice.
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their original relative order.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap()),
        SortOrder::Descending => indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap()),
    }
    indices
}

/// lerp blends linearly between a (x = 0.0) and b (x = 1.0).
pub fn lerp(a: f64, b: f64, x: f64) -> f64 {
    a * (1.0 - x) + b * x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_argmax_argmin_first_occurrence() {
        let x = [1.0, 3.0, 3.0, 0.5, 0.5];
        assert_eq!(argmax(&x), 1);
        assert_eq!(argmin(&x), 3);
    }

    #[test]
    fn test_min_max_mean() {
        let x = [2.0, -1.0, 5.0];
        assert_eq!(max(&x), 5.0);
        assert_eq!(min(&x), -1.0);
        assert_relative_eq!(mean(&x), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_argsort_is_stable() {
        let x = [2.0, 1.0, 2.0, 0.0];
        assert_eq!(argsort(&x, SortOrder::Ascending), vec![3, 1, 0, 2]);
        assert_eq!(argsort(&x, SortOrder::Descending), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_relative_eq!(lerp(0.2, 0.8, 0.0), 0.2);
        assert_relative_eq!(lerp(0.2, 0.8, 1.0), 0.8);
        assert_relative_eq!(lerp(0.2, 0.8, 0.5), 0.5);
    }
}
