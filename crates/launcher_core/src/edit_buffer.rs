/// Staged copy of a persisted list.
///
/// Opened from a snapshot, mutated freely, then handed back whole with
/// [`EditBuffer::into_items`]. Has no listeners; the owning engine decides
/// when to expose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer<T> {
    items: Vec<T>,
}

impl<T> EditBuffer<T> {
    pub fn open(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Removes every item whose key matches `item`'s, or inserts `item` at
    /// the top when none does. Returns true when the item was added.
    pub fn toggle<K, F>(&mut self, item: T, key: F) -> bool
    where
        K: PartialEq,
        F: Fn(&T) -> K,
    {
        let wanted = key(&item);
        let before = self.items.len();
        self.items.retain(|existing| key(existing) != wanted);
        if self.items.len() != before {
            return false;
        }
        self.items.insert(0, item);
        true
    }

    /// Remove-then-insert. Out of bounds indices leave the list untouched.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        true
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Turns continuous drag motion into adjacent single-step moves.
///
/// Every full row height of accumulated motion produces one swap between
/// the dragged item and its neighbour. The tracker follows the item, so
/// later swaps start from wherever the previous one left it.
#[derive(Debug, Clone, PartialEq)]
pub struct DragReorder {
    index: usize,
    len: usize,
    row_height: f32,
    offset: f32,
}

impl DragReorder {
    pub fn start(index: usize, len: usize, row_height: f32) -> Self {
        Self {
            index,
            len,
            row_height,
            offset: 0.0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Motion not yet turned into a swap.
    pub fn pending_offset(&self) -> f32 {
        self.offset
    }

    /// Feeds `delta` pixels of motion (positive is downward) and returns the
    /// `(from, to)` moves to apply, in order.
    pub fn drag_by(&mut self, delta: f32) -> Vec<(usize, usize)> {
        let mut moves = Vec::new();
        if !(self.row_height > 0.0) || self.index >= self.len || !delta.is_finite() {
            return moves;
        }

        self.offset += delta;
        while self.offset >= self.row_height && self.index + 1 < self.len {
            moves.push((self.index, self.index + 1));
            self.index += 1;
            self.offset -= self.row_height;
        }
        while self.offset <= -self.row_height && self.index > 0 {
            moves.push((self.index, self.index - 1));
            self.index -= 1;
            self.offset += self.row_height;
        }

        // Motion past either end is dropped so reversing responds at once.
        if self.index + 1 == self.len && self.offset > 0.0 {
            self.offset = 0.0;
        }
        if self.index == 0 && self.offset < 0.0 {
            self.offset = 0.0;
        }
        moves
    }
}

#[cfg(test)]
#[path = "tests/edit_buffer_tests.rs"]
mod tests;
