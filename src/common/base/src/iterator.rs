/// TryIterator is an iterator whose `next` step can fail, e.g. because the
/// underlying stream hit a malformed record.
pub trait TryIterator {
    type Item;
    type Error;

    fn try_next(&mut self) -> Result<Option<Self::Item>, Self::Error>;

    /// try_collect drains the iterator; the first error discards everything read so far.
    fn try_collect(mut self) -> Result<Vec<Self::Item>, Self::Error>
    where
        Self: Sized,
    {
        let mut items = Vec::new();
        while let Some(item) = self.try_next()? {
            items.push(item);
        }
        Ok(items)
    }
}

/// TryIterators concatenates a list of iterators, exhausting each one in
/// order before moving on to the next.
pub struct TryIterators<ITR>
where
    ITR: TryIterator,
{
    itrs: Vec<ITR>,
    i: usize,
}

impl<ITR> TryIterators<ITR>
where
    ITR: TryIterator,
{
    pub fn new(itrs: Vec<ITR>) -> Self {
        Self { itrs, i: 0 }
    }

    /// position returns the index of the iterator that produced the last item.
    pub fn position(&self) -> usize {
        self.i
    }
}

impl<ITR> TryIterator for TryIterators<ITR>
where
    ITR: TryIterator,
{
    type Item = ITR::Item;
    type Error = ITR::Error;

    fn try_next(&mut self) -> Result<Option<Self::Item>, Self::Error> {
        while self.i < self.itrs.len() {
            let itr = &mut self.itrs[self.i];
            if let Some(v) = itr.try_next()? {
                return Ok(Some(v));
            }

            self.i += 1;
        }

        Ok(None)
    }
}
