//! Fixed-capacity storage for handler and message cells.

/// Index of an occupied slot in a [`Pool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CellId(usize);

/// Fixed-capacity arena with a free list.
///
/// Unlike a growable slab, `insert` fails once every slot is taken, so
/// worst-case occupancy has to be sized up front.
pub(crate) struct Pool<T> {
    items: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Pool<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let items = (0..capacity).map(|_| None).collect();
        // Reversed so the lowest index is handed out first.
        let free = (0..capacity).rev().collect();

        Self { items, free }
    }

    pub(crate) fn insert(&mut self, item: T) -> Option<CellId> {
        let index = self.free.pop()?;
        self.items[index] = Some(item);

        Some(CellId(index))
    }

    pub(crate) fn remove(&mut self, id: CellId) -> Option<T> {
        let item = self.items.get_mut(id.0)?.take()?;
        self.free.push(id.0);

        Some(item)
    }

    pub(crate) fn get(&self, id: CellId) -> Option<&T> {
        self.items.get(id.0)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: CellId) -> Option<&mut T> {
        self.items.get_mut(id.0)?.as_mut()
    }

    #[cfg(test)]
    pub(crate) fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len() - self.free.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.items.len()
    }
}
