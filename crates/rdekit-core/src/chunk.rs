//! Splitting command lists into bounded chunks for the import worker pool.

/// Normalise a requested chunk size: zero or negative means one.
pub fn chunk_size(requested: i64) -> usize {
    if requested <= 0 {
        1
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

/// Lazy, restartable walk over `items` in chunks of `size`.
///
/// Yields `(chunk, has_more)`; `has_more` is false on the final chunk.
#[derive(Debug, Clone)]
pub struct Chunks<'a, T> {
    items: &'a [T],
    size: usize,
    pos: usize,
}

impl<'a, T> Chunks<'a, T> {
    pub fn new(items: &'a [T], size: usize) -> Self {
        Self {
            items,
            size: size.max(1),
            pos: 0,
        }
    }

    pub fn next_chunk(&mut self) -> Option<(&'a [T], bool)> {
        if self.pos >= self.items.len() {
            return None;
        }
        let end = (self.pos + self.size).min(self.items.len());
        let chunk = &self.items[self.pos..end];
        self.pos = end;
        Some((chunk, end < self.items.len()))
    }

    /// Start again from the first chunk.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn count_total(&self) -> usize {
        self.items.len().div_ceil(self.size)
    }
}

impl<'a, T> Iterator for Chunks<'a, T> {
    type Item = (&'a [T], bool);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(items: &[i32], size: usize) -> Vec<Vec<i32>> {
        Chunks::new(items, size).map(|(c, _)| c.to_vec()).collect()
    }

    #[test]
    fn three_items_size_two() {
        assert_eq!(collect(&[1, 2, 3], 2), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn non_positive_sizes_become_one() {
        assert_eq!(chunk_size(0), 1);
        assert_eq!(chunk_size(-5), 1);
        assert_eq!(chunk_size(7), 7);
        assert_eq!(collect(&[1, 2, 3], chunk_size(0)), vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn has_more_flag() {
        let items = [1, 2, 3, 4];
        let flags: Vec<bool> = Chunks::new(&items, 2).map(|(_, more)| more).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn chunk_count_and_order_preserved() {
        let items: Vec<i32> = (0..23).collect();
        for size in 1..=25 {
            let chunks = Chunks::new(&items, size);
            assert_eq!(chunks.count_total(), items.len().div_ceil(size));
            let flat: Vec<i32> = chunks.flat_map(|(c, _)| c.iter().copied()).collect();
            assert_eq!(flat, items);
        }
    }

    #[test]
    fn empty_and_restart() {
        let empty: [i32; 0] = [];
        assert!(Chunks::new(&empty, 3).next_chunk().is_none());

        let items = [1, 2, 3];
        let mut chunks = Chunks::new(&items, 2);
        while chunks.next_chunk().is_some() {}
        chunks.reset();
        assert_eq!(chunks.next_chunk(), Some((&items[..2], true)));
    }
}
