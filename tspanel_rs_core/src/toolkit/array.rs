use itertools::izip;
use ndarray::{ArrayView1, Axis};
use num_traits::{Float, FromPrimitive};
use std::{fmt::Debug, iter::zip};

pub trait AFloat: Float + FromPrimitive + Debug + Send + Sync + 'static {}
impl AFloat for f32 {}
impl AFloat for f64 {}

#[inline]
fn valid<T: AFloat>(a: ArrayView1<T>) -> impl Iterator<Item = T> + '_ {
    a.into_iter().copied().filter(|x| !x.is_nan())
}

pub fn count<T: AFloat>(a: ArrayView1<T>) -> usize {
    valid(a).count()
}

pub fn mean<T: AFloat>(a: ArrayView1<T>) -> T {
    let mut sum = T::zero();
    let mut num = T::zero();
    for x in valid(a) {
        sum = sum + x;
        num = num + T::one();
    }
    if num.is_zero() {
        T::nan()
    } else {
        sum / num
    }
}

pub fn max<T: AFloat>(a: ArrayView1<T>) -> T {
    valid(a).fold(T::nan(), |acc, x| if acc.is_nan() { x } else { acc.max(x) })
}

pub fn min<T: AFloat>(a: ArrayView1<T>) -> T {
    valid(a).fold(T::nan(), |acc, x| if acc.is_nan() { x } else { acc.min(x) })
}

/// sample standard deviation (`ddof = 1`), `NaN` when fewer than two valid values exist
pub fn std<T: AFloat>(a: ArrayView1<T>) -> T {
    let n = count(a);
    if n < 2 {
        return T::nan();
    }
    let m = mean(a);
    let ss = valid(a).fold(T::zero(), |acc, x| acc + (x - m) * (x - m));
    let ddof = T::from_usize(n - 1).unwrap_or_else(T::nan);
    (ss / ddof).sqrt()
}

pub fn median<T: AFloat>(a: ArrayView1<T>) -> T {
    let mut values: Vec<T> = valid(a).collect();
    if values.is_empty() {
        return T::nan();
    }
    values.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        let two = T::one() + T::one();
        (values[mid - 1] + values[mid]) / two
    }
}

pub fn corr<T: AFloat>(a: ArrayView1<T>, b: ArrayView1<T>) -> T {
    let valid_indices: Vec<usize> = zip(a.iter(), b.iter())
        .enumerate()
        .filter_map(|(i, (&x, &y))| {
            if x.is_nan() || y.is_nan() {
                None
            } else {
                Some(i)
            }
        })
        .collect();
    if valid_indices.is_empty() {
        return T::nan();
    }
    let a = a.select(Axis(0), &valid_indices);
    let b = b.select(Axis(0), &valid_indices);
    let a_mean = mean(a.view());
    let b_mean = mean(b.view());
    let mut cov = T::zero();
    let mut var1 = T::zero();
    let mut var2 = T::zero();
    for (&x, &y) in izip!(a.iter(), b.iter()) {
        let dx = x - a_mean;
        let dy = y - b_mean;
        cov = cov + dx * dy;
        var1 = var1 + dx * dx;
        var2 = var2 + dy * dy;
    }
    cov / (var1.sqrt() * var2.sqrt())
}
