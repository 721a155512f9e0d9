use crate::error::{Error, Result};
use std::fmt;

/// A bounded evaluation stack addressed the way the engine addresses its own.
///
/// Positions are 1-based from the bottom (`1` is the oldest value) or negative
/// offsets from the top (`-1` is the top). Every positional accessor normalizes
/// the address to an absolute slot first and treats `0` and anything beyond
/// either end as invalid, so addressing mistakes surface as `None` or a
/// [`crate::ErrorKind::Stack`] error instead of reading a neighbouring slot.
///
/// # Examples
///
/// ```
/// use luaw_core::stack::Stack;
///
/// let mut stack = Stack::new(100);
/// stack.push(10).unwrap();
/// stack.push(20).unwrap();
/// stack.push(30).unwrap();
/// assert_eq!(stack.get(1), Some(&10));
/// assert_eq!(stack.get(-1), Some(&30));
/// assert_eq!(stack.get(0), None);
/// assert_eq!(stack.pop(), Some(30));
/// assert_eq!(stack.len(), 2);
/// ```
pub struct Stack<T> {
    items: Vec<T>,
    max_size: usize,
}

impl<T> Stack<T> {
    /// Creates an empty stack holding at most `max_size` values.
    pub fn new(max_size: usize) -> Self {
        // Pre-allocate a reasonable amount to avoid early reallocations.
        let initial_capacity = max_size.min(64);

        Self {
            items: Vec::with_capacity(initial_capacity),
            max_size,
        }
    }

    /// Creates a stack that starts out holding `items`, bottom first.
    ///
    /// The initial contents may exceed `max_size`; only further pushes are
    /// refused.
    pub fn with_items(items: Vec<T>, max_size: usize) -> Self {
        Self { items, max_size }
    }

    /// Pushes a value onto the top.
    ///
    /// Fails with a stack error when the stack already holds `max_size` values.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.items.len() >= self.max_size {
            return Err(Error::stack(format!(
                "stack overflow: cannot push beyond {} values",
                self.max_size
            )));
        }
        self.items.push(value);
        Ok(())
    }

    /// Removes and returns the top value, or `None` if the stack is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Removes the top `n` values.
    ///
    /// If `n` is greater than the current depth, all values are removed.
    #[inline]
    pub fn pop_n(&mut self, n: usize) {
        let new_len = self.len().saturating_sub(n);
        self.items.truncate(new_len);
    }

    /// Removes the top `n` values and returns them bottom first.
    ///
    /// Returns `None` and leaves the stack untouched if fewer than `n` values
    /// are present.
    pub fn split_top(&mut self, n: usize) -> Option<Vec<T>> {
        let len = self.items.len();
        if n > len {
            None
        } else {
            Some(self.items.split_off(len - n))
        }
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// Converts an engine-style address into a 0-based slot, if it is valid.
    ///
    /// ```
    /// use luaw_core::stack::Stack;
    ///
    /// let mut stack = Stack::new(10);
    /// stack.push('a').unwrap();
    /// stack.push('b').unwrap();
    /// assert_eq!(stack.absolute(1), Some(0));
    /// assert_eq!(stack.absolute(-1), Some(1));
    /// assert_eq!(stack.absolute(-3), None);
    /// assert_eq!(stack.absolute(3), None);
    /// ```
    pub fn absolute(&self, index: i32) -> Option<usize> {
        let len = self.items.len();
        if index > 0 {
            let slot = (index - 1) as usize;
            (slot < len).then_some(slot)
        } else if index < 0 {
            let depth = index.unsigned_abs() as usize;
            (depth <= len).then(|| len - depth)
        } else {
            None
        }
    }

    /// Returns the value at an engine-style address.
    pub fn get(&self, index: i32) -> Option<&T> {
        self.absolute(index).map(|slot| &self.items[slot])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the maximum number of values the stack accepts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates from bottom to top.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> Stack<T> {
    /// Pushes a copy of the value at `index`.
    pub fn push_copy(&mut self, index: i32) -> Result<()> {
        let value = self
            .get(index)
            .cloned()
            .ok_or_else(|| invalid_index(index, self.len()))?;
        self.push(value)
    }
}

pub(crate) fn invalid_index(index: i32, len: usize) -> Error {
    Error::stack(format!(
        "invalid stack index {} (stack has {} values)",
        index, len
    ))
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("items", &self.items)
            .field("len", &self.items.len())
            .field("capacity", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_new_stack() {
        let stack: Stack<i32> = Stack::new(100);
        assert_eq!(stack.len(), 0);
        assert_eq!(stack.capacity(), 100);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new(100);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        stack.push(3).unwrap();

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_overflow() {
        let mut stack = Stack::new(2);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        let err = stack.push(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stack);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_addressing() {
        let mut stack = Stack::new(100);
        stack.push(10).unwrap();
        stack.push(20).unwrap();
        stack.push(30).unwrap();

        assert_eq!(stack.get(1), Some(&10));
        assert_eq!(stack.get(2), Some(&20));
        assert_eq!(stack.get(3), Some(&30));
        assert_eq!(stack.get(4), None);

        assert_eq!(stack.get(-1), Some(&30));
        assert_eq!(stack.get(-3), Some(&10));
        assert_eq!(stack.get(-4), None);

        assert_eq!(stack.get(0), None);
        assert_eq!(stack.get(i32::MIN), None);
    }

    #[test]
    fn test_push_copy() {
        let mut stack = Stack::new(100);
        stack.push(7).unwrap();
        stack.push(8).unwrap();

        stack.push_copy(1).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(), Some(&7));

        let err = stack.push_copy(9).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stack);
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_pop_n_clamps() {
        let mut stack = Stack::new(100);
        for i in 0..4 {
            stack.push(i).unwrap();
        }

        stack.pop_n(2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.peek(), Some(&1));

        stack.pop_n(10);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_split_top() {
        let mut stack = Stack::new(100);
        for i in 1..=4 {
            stack.push(i).unwrap();
        }

        assert_eq!(stack.split_top(5), None);
        assert_eq!(stack.len(), 4);

        assert_eq!(stack.split_top(3), Some(vec![2, 3, 4]));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.split_top(0), Some(vec![]));
    }

    #[test]
    fn test_with_items_and_iter() {
        let stack = Stack::with_items(vec![1, 2, 3], 2);
        let items: Vec<_> = stack.iter().copied().collect();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(stack.get(-1), Some(&3));
    }
}
