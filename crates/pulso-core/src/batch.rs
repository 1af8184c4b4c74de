use std::num::NonZeroUsize;

use crate::types::{Batch, Record};

/// Split records into contiguous batches of `size`, preserving order.
/// Only the last batch may be shorter; empty input yields no batches.
pub fn batch(records: &[Record], size: NonZeroUsize) -> Vec<Batch<'_>> {
    records
        .chunks(size.get())
        .enumerate()
        .map(|(index, records)| Batch { index, records })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record::new(format!("client-{i}"), format!("t{i}")))
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(batch(&[], size(8)).is_empty());
    }

    #[test]
    fn concatenation_reconstructs_input_for_all_shapes() {
        for len in 0..=25 {
            let input = records(len);
            for s in 1..=12 {
                let batches = batch(&input, size(s));
                assert_eq!(batches.len(), len.div_ceil(s), "len={len} size={s}");

                let rebuilt: Vec<Record> = batches
                    .iter()
                    .flat_map(|b| b.records.iter().cloned())
                    .collect();
                assert_eq!(rebuilt, input);

                for (i, b) in batches.iter().enumerate() {
                    assert_eq!(b.index, i);
                    if i + 1 < batches.len() {
                        assert_eq!(b.len(), s);
                    } else {
                        assert!(!b.is_empty() && b.len() <= s);
                    }
                }
            }
        }
    }

    #[test]
    fn three_records_batch_size_two() {
        let input = records(3);
        let batches = batch(&input, size(2));
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].ids(), vec!["client-1", "client-2"]);
        assert_eq!(batches[1].ids(), vec!["client-3"]);
    }
}
