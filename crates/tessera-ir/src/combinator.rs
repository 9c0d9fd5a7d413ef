//! Combinatorics over parameter indices and combinations.
//!
//! - **parameter subsets**: all `k`-sized subsets of a parameter list.
//! - **sub-combinations**: all `k`-sized restrictions of a combination.
//! - **cartesian product**: every full assignment of a parameter subset,
//!   wildcards everywhere else.

use crate::types::Combination;

/// All `size`-element subsets of `parameters`, in lexicographic order of
/// positions. `size == 0` yields a single empty subset.
pub fn parameter_combinations(parameters: &[usize], size: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    if size > parameters.len() {
        return result;
    }
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        result.push(indices.iter().map(|&i| parameters[i]).collect());

        // Advance the rightmost index that still has room.
        let mut i = size;
        loop {
            if i == 0 {
                return result;
            }
            i -= 1;
            if indices[i] != i + parameters.len() - size {
                break;
            }
            if i == 0 {
                return result;
            }
        }
        indices[i] += 1;
        for j in (i + 1)..size {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

/// Every assignment of values to `parameters` as a combination with
/// `parameter_sizes.len()` slots. Ordered with the last parameter varying
/// fastest.
pub fn cartesian_product(parameters: &[usize], parameter_sizes: &[usize]) -> Vec<Combination> {
    let mut rows = vec![Combination::empty(parameter_sizes.len())];
    for &parameter in parameters {
        let mut next = Vec::with_capacity(rows.len() * parameter_sizes[parameter]);
        for row in &rows {
            for value in 0..parameter_sizes[parameter] {
                let mut extended = row.clone();
                extended.set(parameter, value);
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}

/// Every restriction of `combination` to `size` of its set parameters.
pub fn sub_combinations(combination: &Combination, size: usize) -> Vec<Combination> {
    let set: Vec<usize> = combination.set_parameters().collect();
    parameter_combinations(&set, size)
        .into_iter()
        .map(|parameters| combination.restricted_to(&parameters))
        .collect()
}

/// All `strength`-sized interactions over every parameter of the model.
pub fn all_interactions(parameter_sizes: &[usize], strength: usize) -> Vec<Combination> {
    let parameters: Vec<usize> = (0..parameter_sizes.len()).collect();
    parameter_combinations(&parameters, strength)
        .iter()
        .flat_map(|subset| cartesian_product(subset, parameter_sizes))
        .collect()
}

/// Number of `size`-sized subsets of `n` elements.
pub fn binomial(n: usize, size: usize) -> usize {
    if size > n {
        return 0;
    }
    let size = size.min(n - size);
    let mut result = 1usize;
    for i in 0..size {
        result = result * (n - i) / (i + 1);
    }
    result
}
