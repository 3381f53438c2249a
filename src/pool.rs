//! Instruction Pools
//!
//! Bounded LIFO free-lists recycling draw and particle records so steady-state
//! frames allocate nothing. Releases past capacity are discarded.

/// Record types that can live in a [`Pool`]
pub trait Reusable: Default {
    /// Restore the record to its default state. Runs on acquisition and
    /// again on release, so pooled records never pin resources (texture
    /// references in particular) while idle.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shared capacity of the draw-instruction and particle pools
pub const POOL_CAPACITY: usize = 1000;

/// A bounded LIFO free-list
pub struct Pool<T: Reusable> {
    free: Vec<T>,
    capacity: usize,
}

impl<T: Reusable> Pool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// Pop a recycled record (reset to defaults) or construct a fresh one
    pub fn acquire(&mut self) -> T {
        match self.free.pop() {
            Some(mut item) => {
                item.reset();
                item
            }
            None => T::default(),
        }
    }

    /// Return a record for reuse. Past capacity the record is simply dropped.
    pub fn release(&mut self, mut item: T) {
        if self.free.len() < self.capacity {
            item.reset();
            self.free.push(item);
        }
    }

    /// Number of records currently waiting for reuse
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl<T: Reusable> Default for Pool<T> {
    fn default() -> Self {
        Self::with_capacity(POOL_CAPACITY)
    }
}
