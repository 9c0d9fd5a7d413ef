/// Order in which IPOG adds parameters to the growing suite.
pub trait ParameterOrder {
    /// Parameters combined exhaustively to seed the suite.
    fn initial_parameters(&self, parameter_sizes: &[usize], strength: usize) -> Vec<usize>;

    /// Parameters added one at a time afterwards, in order.
    fn remaining_parameters(&self, parameter_sizes: &[usize], strength: usize) -> Vec<usize>;

    /// Name of this order (for tracing).
    fn name(&self) -> &str;
}

/// Declaration order: the first `strength` parameters seed the suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputParameterOrder;

impl ParameterOrder for InputParameterOrder {
    fn initial_parameters(&self, parameter_sizes: &[usize], strength: usize) -> Vec<usize> {
        (0..strength.min(parameter_sizes.len())).collect()
    }

    fn remaining_parameters(&self, parameter_sizes: &[usize], strength: usize) -> Vec<usize> {
        (strength.min(parameter_sizes.len())..parameter_sizes.len()).collect()
    }

    fn name(&self) -> &str {
        "input"
    }
}

/// A caller-chosen order. Parameters missing from the list follow in
/// declaration order; unknown and repeated entries are ignored.
#[derive(Debug, Clone, Default)]
pub struct ExplicitParameterOrder {
    order: Vec<usize>,
}

impl ExplicitParameterOrder {
    pub fn new(order: Vec<usize>) -> Self {
        Self { order }
    }

    fn full_order(&self, parameter_count: usize) -> Vec<usize> {
        let mut seen = vec![false; parameter_count];
        let mut result = Vec::with_capacity(parameter_count);
        let listed = self.order.iter().copied();
        for p in listed.chain(0..parameter_count) {
            if p < parameter_count && !seen[p] {
                seen[p] = true;
                result.push(p);
            }
        }
        result
    }
}

impl ParameterOrder for ExplicitParameterOrder {
    fn initial_parameters(&self, parameter_sizes: &[usize], strength: usize) -> Vec<usize> {
        let order = self.full_order(parameter_sizes.len());
        order[..strength.min(order.len())].to_vec()
    }

    fn remaining_parameters(&self, parameter_sizes: &[usize], strength: usize) -> Vec<usize> {
        let order = self.full_order(parameter_sizes.len());
        order[strength.min(order.len())..].to_vec()
    }

    fn name(&self) -> &str {
        "explicit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_order_splits_at_strength() {
        let sizes = [2, 2, 2, 2];
        assert_eq!(InputParameterOrder.initial_parameters(&sizes, 2), vec![0, 1]);
        assert_eq!(InputParameterOrder.remaining_parameters(&sizes, 2), vec![2, 3]);
    }

    #[test]
    fn test_explicit_order_appends_missing_parameters() {
        let order = ExplicitParameterOrder::new(vec![3, 1, 3, 9]);
        let sizes = [2, 2, 2, 2];
        assert_eq!(order.initial_parameters(&sizes, 2), vec![3, 1]);
        assert_eq!(order.remaining_parameters(&sizes, 2), vec![0, 2]);
    }
}
