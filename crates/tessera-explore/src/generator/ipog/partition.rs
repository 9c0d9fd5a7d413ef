use tessera_ir::types::Combination;

use crate::solver::constraint::ConstraintChecker;

/// Incomplete rows of the suite, bucketed by their value of the parameter
/// being added. The last bucket holds rows where it is still unset.
#[derive(Debug, Clone)]
pub(crate) struct CombinationPartitioner {
    parameter: usize,
    buckets: Vec<Vec<usize>>,
}

impl CombinationPartitioner {
    /// Partitioner over `rows[i]` for every `i` in `candidates`.
    pub fn new(
        rows: &[Combination],
        candidates: impl IntoIterator<Item = usize>,
        parameter: usize,
        size: usize,
    ) -> Self {
        let mut partitioner = Self {
            parameter,
            buckets: vec![Vec::new(); size + 1],
        };
        for index in candidates {
            partitioner.add(index, &rows[index]);
        }
        partitioner
    }

    fn bucket_of(&self, row: &Combination) -> usize {
        match row.value(self.parameter) {
            Some(v) if v + 1 < self.buckets.len() => v,
            _ => self.buckets.len() - 1,
        }
    }

    pub fn add(&mut self, index: usize, row: &Combination) {
        let bucket = self.bucket_of(row);
        self.buckets[bucket].push(index);
    }

    pub fn remove(&mut self, index: usize) {
        for bucket in &mut self.buckets {
            bucket.retain(|&i| i != index);
        }
    }

    /// Merges `interaction` into the first compatible row whose merge stays
    /// valid. Rows already holding the interaction's value of the parameter
    /// are tried before rows where it is unset. Returns the row index.
    pub fn extend_suitable(
        &mut self,
        rows: &mut [Combination],
        interaction: &Combination,
        checker: &dyn ConstraintChecker,
    ) -> Option<usize> {
        let own = self.bucket_of(interaction);
        let wildcard = self.buckets.len() - 1;
        let mut order = vec![own];
        if own != wildcard {
            order.push(wildcard);
        }

        for bucket in order {
            let Some(position) = self.buckets[bucket].iter().position(|&index| {
                let row = &rows[index];
                if !row.is_consistent_with(interaction) {
                    return false;
                }
                let mut merged = row.clone();
                merged.merge(interaction);
                checker.is_valid(&merged)
            }) else {
                continue;
            };

            let index = self.buckets[bucket].remove(position);
            rows[index].merge(interaction);
            self.add(index, &rows[index]);
            return Some(index);
        }
        None
    }
}
