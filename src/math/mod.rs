// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


/// Round to a number of decimal places. Halfway cases round to the nearest
/// even digit.
///
/// # Examples
///
/// `assert_abs_diff_eq!(round_decimals(1.005, 2), 1.0);`
#[inline]
pub(crate) fn round_decimals(x: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (x * scale).round_ties_even() / scale
}

/// The value and index of the largest element. Ties go to the first index
/// attaining the maximum. Returns `None` if `values` is empty.
pub(crate) fn first_argmax(values: &[f64]) -> Option<(usize, f64)> {
    let mut iter = values.iter().copied().enumerate();
    let mut best = iter.next()?;
    for (i, v) in iter {
        if v > best.1 {
            best = (i, v);
        }
    }
    Some(best)
}
