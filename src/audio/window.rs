/// Fixed-capacity history with double buffering.
///
/// Holds up to `2 * window` items in order. When the buffer is full, the
/// oldest half is discarded by moving the newest `window` items to the
/// front, which keeps the contents contiguous for slice access at amortized
/// O(1) cost per push. The backing storage is allocated once.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    items: Vec<T>,
    window: usize,
}

impl<T: Copy> HistoryBuffer<T> {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            items: Vec::with_capacity(2 * window),
            window,
        }
    }

    /// Append an item, compacting first if the buffer is full.
    pub fn push(&mut self, item: T) {
        if self.is_full() {
            self.compact();
        }
        self.items.push(item);
    }

    /// Keep only the newest `window` items.
    pub fn compact(&mut self) {
        let len = self.items.len();
        if len <= self.window {
            return;
        }
        self.items.copy_within(len - self.window.., 0);
        self.items.truncate(self.window);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= 2 * self.window
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn capacity(&self) -> usize {
        2 * self.window
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    /// Item pushed `ago` pushes before the latest one (`ago == 1` is the latest).
    pub fn ago(&self, ago: usize) -> Option<T> {
        if ago == 0 || ago > self.items.len() {
            return None;
        }
        self.items.get(self.items.len() - ago).copied()
    }

    /// The newest `n` items, or fewer if not enough are buffered.
    pub fn latest(&self, n: usize) -> &[T] {
        let start = self.items.len().saturating_sub(n);
        &self.items[start..]
    }
}
