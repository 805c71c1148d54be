/* 📖 # Why key by Arc address instead of by value?

These maps attach data to a particular object, not to whatever compares equal to it.
Two `Arc`s with equal contents are two keys; clones of one `Arc` are the same key.
The map keeps a clone of every key it stores, so the allocation (and with it the
address used as identity) cannot be freed and reused while the entry exists.
*/

mod multi;
mod single;

use std::sync::Arc;

pub use multi::ObjectArrayStorage;
pub use single::ObjectStorage;

/// Address of the shared allocation behind an `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ObjectId(usize);

impl ObjectId {
    fn of<K: ?Sized>(object: &Arc<K>) -> Self {
        Self(Arc::as_ptr(object).cast::<()>() as usize)
    }
}
