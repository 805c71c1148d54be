use stdkit_base::{ErrorKind, StdkitError, StdkitResult};

/// Array with a length fixed at run time.
///
/// Each slot is either present or absent. Indexes outside `0..size` fail with
/// [`ErrorKind::IndexOutOfRange`] instead of growing the array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedArray<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for FixedArray<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> FixedArray<T> {
    /// Creates an array of `size` absent slots.
    pub fn new(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || None);
        Self { slots }
    }

    /// Creates an array holding every value of `values`, in order.
    pub fn from_vec(values: Vec<T>) -> Self {
        Self {
            slots: values.into_iter().map(Some).collect(),
        }
    }

    /// Creates an array from `(index, value)` pairs.
    ///
    /// The size is the highest index plus one; indexes not mentioned stay absent.
    /// A later pair for the same index replaces an earlier one. An index too large to
    /// allocate slots up to fails with [`ErrorKind::InvalidInput`].
    pub fn from_indexed(pairs: impl IntoIterator<Item = (usize, T)>) -> StdkitResult<Self> {
        let mut slots: Vec<Option<T>> = Vec::new();
        for (index, value) in pairs {
            if index >= slots.len() {
                let size = index
                    .checked_add(1)
                    .ok_or_else(|| invalid_index(index))?;
                slots
                    .try_reserve_exact(size - slots.len())
                    .map_err(|_| invalid_index(index))?;
                slots.resize_with(size, || None);
            }
            slots[index] = Some(value);
        }
        Ok(Self { slots })
    }

    /// Returns the slots as a vector, absent slots included.
    pub fn to_vec(&self) -> Vec<Option<T>>
    where
        T: Clone,
    {
        self.slots.clone()
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Changes the size. Growing appends absent slots, shrinking drops the tail.
    pub fn set_size(&mut self, size: usize) {
        self.slots.resize_with(size, || None);
    }

    pub fn get(&self, index: usize) -> StdkitResult<Option<&T>> {
        self.check_index(index)?;
        Ok(self.slots[index].as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> StdkitResult<Option<&mut T>> {
        self.check_index(index)?;
        Ok(self.slots[index].as_mut())
    }

    /// Stores `value` at `index`, returning the previous value.
    pub fn set(&mut self, index: usize, value: T) -> StdkitResult<Option<T>> {
        self.check_index(index)?;
        Ok(self.slots[index].replace(value))
    }

    /// Marks the slot at `index` absent, returning the previous value.
    pub fn unset(&mut self, index: usize) -> StdkitResult<Option<T>> {
        self.check_index(index)?;
        Ok(self.slots[index].take())
    }

    /// True when `index` is in range and its slot holds a value.
    pub fn contains(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        self.slots.iter().map(Option::as_ref)
    }

    pub fn swap(&mut self, index_1: usize, index_2: usize) -> StdkitResult<()> {
        self.check_index(index_1)?;
        self.check_index(index_2)?;
        self.slots.swap(index_1, index_2);
        Ok(())
    }

    /// Swaps the entry at `index` with the next one. The last entry stays put.
    pub fn shift_up(&mut self, index: usize) -> StdkitResult<()> {
        self.check_index(index)?;
        if index + 1 == self.slots.len() {
            return Ok(());
        }
        self.swap(index, index + 1)
    }

    /// Swaps the entry at `index` with the previous one. The first entry stays put.
    pub fn shift_down(&mut self, index: usize) -> StdkitResult<()> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(());
        }
        self.swap(index, index - 1)
    }

    /// Moves the entry at `index` to `new_index` by successive adjacent swaps,
    /// shifting the entries in between by one position.
    pub fn shift_to(&mut self, index: usize, new_index: usize) -> StdkitResult<()> {
        self.check_index(index)?;
        self.check_index(new_index)?;
        let mut current = index;
        while current > new_index {
            self.shift_down(current)?;
            current -= 1;
        }
        while current < new_index {
            self.shift_up(current)?;
            current += 1;
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> StdkitResult<()> {
        if index >= self.slots.len() {
            return Err(Box::new(StdkitError::new(ErrorKind::IndexOutOfRange {
                index,
                size: self.slots.len(),
            })));
        }
        Ok(())
    }
}

impl<T> FromIterator<T> for FixedArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

fn invalid_index(index: usize) -> Box<StdkitError> {
    Box::new(StdkitError::invalid_input(format!(
        "Index {index} is too large for a fixed array."
    )))
}
