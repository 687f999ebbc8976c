use std::fmt;

use crate::{error::MergeError, Result};

/// Types that can be ordered and grouped by the k-way merge
///
/// Items sharing a key are aggregated, never ordered against one another.
pub trait MergeKey {
    type Key: Ord + Clone + fmt::Debug;

    fn merge_key(&self) -> Self::Key;
}

/// A forward-only cursor over one sorted source
///
/// The cursor is always positioned on its next item (or exhausted) and
/// rejects any item whose key sorts before the one emitted before it.
pub struct SourceCursor<T: MergeKey, I> {
    /// Name of the source (used in ordering errors)
    name: String,
    /// Reference sequence the cursor iterates (used in ordering errors)
    reference: String,
    inner: I,
    current: Option<(T::Key, T)>,
}
impl<T, I> SourceCursor<T, I>
where
    T: MergeKey,
    I: Iterator<Item = Result<T>>,
{
    /// Creates a cursor positioned on the first item of `inner`
    ///
    /// Returns `Ok(None)` if the source has no items, so empty sources never
    /// take part in a merge.
    pub fn new(name: impl Into<String>, reference: impl Into<String>, mut inner: I) -> Result<Option<Self>> {
        let Some(first) = inner.next().transpose()? else {
            return Ok(None);
        };
        Ok(Some(Self {
            name: name.into(),
            reference: reference.into(),
            inner,
            current: Some((first.merge_key(), first)),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the item the cursor is positioned on
    #[must_use]
    pub fn peek_key(&self) -> Option<&T::Key> {
        self.current.as_ref().map(|(key, _)| key)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// Takes the current item and moves to the next one
    pub fn advance(&mut self) -> Result<Option<T>> {
        let Some((key, item)) = self.current.take() else {
            return Ok(None);
        };
        if let Some(next) = self.inner.next().transpose()? {
            let next_key = next.merge_key();
            if next_key < key {
                return Err(MergeError::UnsortedSource {
                    source_name: self.name.clone(),
                    reference: self.reference.clone(),
                    previous: format!("{key:?}"),
                    found: format!("{next_key:?}"),
                }
                .into());
            }
            self.current = Some((next_key, next));
        }
        Ok(Some(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InterimSaItem;

    fn items(positions: &[u32]) -> impl Iterator<Item = Result<InterimSaItem>> {
        positions
            .iter()
            .map(|&p| Ok(InterimSaItem::new(p, "src", Vec::new())))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_empty_source_has_no_cursor() -> Result<()> {
        assert!(SourceCursor::new("src", "chr1", items(&[]))?.is_none());
        Ok(())
    }

    #[test]
    fn test_cursor_walks_source() -> Result<()> {
        let mut cursor = SourceCursor::new("src", "chr1", items(&[3, 5, 5, 9]))?.unwrap();
        let mut seen = Vec::new();
        while let Some(key) = cursor.peek_key().copied() {
            let item = cursor.advance()?.unwrap();
            assert_eq!(item.position, key);
            seen.push(key);
        }
        assert_eq!(seen, vec![3, 5, 5, 9]);
        assert!(cursor.is_exhausted());
        assert!(cursor.advance()?.is_none());
        Ok(())
    }

    #[test]
    fn test_decreasing_key_is_rejected() -> Result<()> {
        let mut cursor = SourceCursor::new("dbsnp", "chr2", items(&[10, 4]))?.unwrap();
        let err = cursor.advance().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("dbsnp"));
        assert!(message.contains("chr2"));
        Ok(())
    }
}
