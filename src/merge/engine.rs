use super::{MergeKey, SourceCursor};
use crate::Result;

/// K-way merge over sorted source cursors
///
/// Each step finds the minimum key among the live cursors, drains every item
/// with that key from every cursor into one group, and drops cursors that are
/// exhausted. Sources are few per chromosome, so the minimum is found with a
/// linear scan.
pub struct KWayMerger<T: MergeKey, I> {
    cursors: Vec<SourceCursor<T, I>>,
}
impl<T, I> KWayMerger<T, I>
where
    T: MergeKey,
    I: Iterator<Item = Result<T>>,
{
    #[must_use]
    pub fn new(cursors: Vec<SourceCursor<T, I>>) -> Self {
        let mut cursors = cursors;
        cursors.retain(|cursor| !cursor.is_exhausted());
        Self { cursors }
    }

    /// Number of cursors that still have items
    #[must_use]
    pub fn num_live(&self) -> usize {
        self.cursors.len()
    }

    /// Returns every item at the next smallest key, or `None` once all sources are exhausted
    pub fn next_group(&mut self) -> Result<Option<(T::Key, Vec<T>)>> {
        let Some(min_key) = self
            .cursors
            .iter()
            .filter_map(|cursor| cursor.peek_key())
            .min()
            .cloned()
        else {
            return Ok(None);
        };

        let mut group = Vec::with_capacity(self.cursors.len());
        let mut failure = None;
        'cursors: for cursor in &mut self.cursors {
            while cursor.peek_key() == Some(&min_key) {
                match cursor.advance() {
                    Ok(Some(item)) => group.push(item),
                    Ok(None) => break,
                    Err(e) => {
                        log::debug!("stopping merge after failure in source {}", cursor.name());
                        failure = Some(e);
                        break 'cursors;
                    }
                }
            }
        }
        if let Some(e) = failure {
            // an unsorted source poisons the whole merge
            self.cursors.clear();
            return Err(e);
        }
        self.cursors.retain(|cursor| !cursor.is_exhausted());

        Ok(Some((min_key, group)))
    }
}
impl<T, I> Iterator for KWayMerger<T, I>
where
    T: MergeKey,
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<(T::Key, Vec<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_group().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnnotatedGene, InterimSaItem, InterimSaPosition, SaDataRecord};

    type ItemIter = std::vec::IntoIter<Result<InterimSaItem>>;

    fn cursor(name: &str, entries: &[(u32, &str)]) -> Option<SourceCursor<InterimSaItem, ItemIter>> {
        let items = entries
            .iter()
            .map(|&(p, v)| Ok(InterimSaItem::new(p, name, v.as_bytes().to_vec())))
            .collect::<Vec<_>>();
        SourceCursor::new(name, "chr1", items.into_iter()).unwrap()
    }

    fn merger(sources: Vec<Option<SourceCursor<InterimSaItem, ItemIter>>>) -> KWayMerger<InterimSaItem, ItemIter> {
        KWayMerger::new(sources.into_iter().flatten().collect())
    }

    #[test]
    fn test_two_source_scenario() -> Result<()> {
        let merged = merger(vec![
            cursor("A", &[(10, "x"), (20, "y")]),
            cursor("B", &[(20, "z"), (30, "w")]),
        ])
        .map(|group| group.map(|(_, items)| InterimSaPosition::from_items(items).unwrap()))
        .collect::<Result<Vec<_>>>()?;

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].position(), 10);
        assert_eq!(
            merged[0].clone().into_sa_position().records,
            vec![SaDataRecord::new("A", "x")]
        );
        assert_eq!(merged[1].position(), 20);
        assert_eq!(
            merged[1].clone().into_sa_position().records,
            vec![SaDataRecord::new("A", "y"), SaDataRecord::new("B", "z")]
        );
        assert_eq!(merged[2].position(), 30);
        assert_eq!(
            merged[2].clone().into_sa_position().records,
            vec![SaDataRecord::new("B", "w")]
        );
        Ok(())
    }

    #[test]
    fn test_output_is_strictly_increasing_and_complete() -> Result<()> {
        let sources = vec![
            cursor("A", &[(1, "a"), (4, "a"), (4, "a2"), (9, "a")]),
            cursor("B", &[(2, "b"), (4, "b"), (7, "b")]),
            cursor("C", &[(9, "c"), (11, "c")]),
            cursor("D", &[]),
        ];
        let mut merger = merger(sources);
        assert_eq!(merger.num_live(), 3);

        let mut keys = Vec::new();
        let mut total = 0;
        while let Some((key, items)) = merger.next_group()? {
            assert!(items.iter().all(|item| item.position == key));
            total += items.len();
            keys.push(key);
        }
        assert_eq!(keys, vec![1, 2, 4, 7, 9, 11]);
        assert_eq!(total, 9);
        assert_eq!(merger.num_live(), 0);
        Ok(())
    }

    #[test]
    fn test_empty_merge() -> Result<()> {
        let mut merger = merger(vec![cursor("A", &[]), cursor("B", &[])]);
        assert!(merger.next_group()?.is_none());
        Ok(())
    }

    #[test]
    fn test_unsorted_source_fails_merge() {
        let results = merger(vec![
            cursor("A", &[(5, "a"), (3, "a")]),
            cursor("B", &[(4, "b"), (8, "b")]),
        ])
        .collect::<Vec<_>>();
        // 4 is emitted, then the decrease in A is detected and the merge stops
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_gene_merge_by_symbol() -> Result<()> {
        let omim = vec![
            Ok(AnnotatedGene::new("BRCA1", "OMIM", "a")),
            Ok(AnnotatedGene::new("TP53", "OMIM", "b")),
        ];
        let exac = vec![
            Ok(AnnotatedGene::new("BRCA1", "ExAC", "c")),
            Ok(AnnotatedGene::new("EGFR", "ExAC", "d")),
        ];
        let cursors = vec![
            SourceCursor::new("OMIM", "genome", omim.into_iter())?,
            SourceCursor::new("ExAC", "genome", exac.into_iter())?,
        ];
        let genes = KWayMerger::new(cursors.into_iter().flatten().collect())
            .map(|group| group.map(|(_, genes)| AnnotatedGene::merge(genes).unwrap()))
            .collect::<Result<Vec<_>>>()?;

        let symbols: Vec<_> = genes.iter().map(|g| g.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BRCA1", "EGFR", "TP53"]);
        assert_eq!(genes[0].annotations.len(), 2);
        Ok(())
    }
}
