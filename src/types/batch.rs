/// One push delivery of a stream: zero or more items and the terminal flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub last: bool,
}

impl<T> Batch<T> {
    pub fn new(items: Vec<T>, last: bool) -> Self {
        Self { items, last }
    }

    #[cfg(test)]
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, true)
    }

    #[cfg(test)]
    pub fn partial(items: Vec<T>) -> Self {
        Self::new(items, false)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Splits a collection into batches of at most `batch_size` items, the final
/// one flagged as last. An empty collection still yields one terminal batch.
pub fn into_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Batch<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len() / batch_size + 1);
    let mut items = items.into_iter().peekable();

    loop {
        let chunk: Vec<T> = items.by_ref().take(batch_size).collect();
        let last = items.peek().is_none();
        batches.push(Batch::new(chunk, last));

        if last {
            return batches;
        }
    }
}
