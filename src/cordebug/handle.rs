//! Reference-counted handles over native debugging interfaces.
//!
//! Every COM-style interface the debugger holds is wrapped in a
//! [`NativeHandle`]. The handle owns one reference; cloning adds one,
//! dropping the last releases the interface. Two handles are the same
//! interface instance exactly when they point at the same object, so
//! equality and hashing go through the pointer, never through the
//! pointee.

use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::Arc,
};

/// Owning handle to a native interface object.
///
/// `T` is usually a `dyn Raw*` trait object. The handle can be held on
/// any thread; calling through it concurrently is the caller's problem,
/// the debugger serializes all native calls on the session thread.
pub struct NativeHandle<T: ?Sized>(Arc<T>);

impl<T: ?Sized> NativeHandle<T> {
    /// Wraps an interface object.
    pub fn new(raw: Arc<T>) -> Self {
        NativeHandle(raw)
    }

    /// Identity of the underlying object. Trait-object pointers carry a
    /// vtable half that can differ across codegen units for the same
    /// object, so only the data half is compared.
    fn identity(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl<T: ?Sized> Clone for NativeHandle<T> {
    fn clone(&self) -> Self {
        NativeHandle(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for NativeHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> PartialEq for NativeHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl<T: ?Sized> Eq for NativeHandle<T> {}

impl<T: ?Sized> Hash for NativeHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for NativeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:p})", self.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Marker: Send + Sync {}
    struct Unit;
    impl Marker for Unit {}

    #[test]
    fn test_clones_share_identity() {
        let a = NativeHandle::new(Arc::new(Unit) as Arc<dyn Marker>);
        let b = a.clone();
        let c = NativeHandle::new(Arc::new(Unit) as Arc<dyn Marker>);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_follows_identity() {
        use std::collections::HashSet;

        let a = NativeHandle::new(Arc::new(Unit) as Arc<dyn Marker>);
        let b = a.clone();

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
