/// Declares a vector that can only be indexed by a dedicated index type.
///
/// The index type must be a tuple struct wrapping a `usize`, and the vector must
/// be a struct with a single `inner: Vec<T>` field. Both are declared by the
/// caller so that they can carry their own derives and docs.
macro_rules! impl_typed_vec {
    ($vec_name:ident, $idx_name:ident, $dbg_prefix:expr) => {
        impl std::fmt::Debug for $idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $dbg_prefix, self.0)
            }
        }

        impl std::fmt::Display for $idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $dbg_prefix, self.0)
            }
        }

        impl $idx_name {
            /// The raw position of this index in its arena.
            pub fn index(self) -> usize {
                self.0
            }
        }

        #[allow(dead_code)]
        impl<T> $vec_name<T> {
            /// Creates a new vector with capacity for at least `cap` elements before reallocating.
            pub fn with_capacity(cap: usize) -> Self {
                Self {
                    inner: Vec::with_capacity(cap),
                }
            }

            /// Returns an iterator over all indices into this vector.
            pub fn indices(&self) -> impl Iterator<Item = $idx_name> {
                (0..self.inner.len()).map($idx_name)
            }

            /// The length of this vector, including any removed slots.
            pub fn len(&self) -> usize {
                self.inner.len()
            }

            /// Are we empty?
            pub fn is_empty(&self) -> bool {
                self.inner.is_empty()
            }

            /// Adds a new element, returning its index.
            pub fn push(&mut self, elt: T) -> $idx_name {
                self.inner.push(elt);
                $idx_name(self.len() - 1)
            }

            /// Returns the element at `idx`, if `idx` is in bounds.
            pub fn get(&self, idx: $idx_name) -> Option<&T> {
                self.inner.get(idx.0)
            }

            /// Returns an iterator over indices and elements.
            pub fn iter(&self) -> impl Iterator<Item = ($idx_name, &T)> + '_ {
                self.inner
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| ($idx_name(idx), t))
            }
        }

        // Arenas with removable elements store `Option<T>` and never reuse
        // slots, so indices handed out stay valid (or dangle to `None`).
        #[allow(dead_code)]
        impl<T> $vec_name<Option<T>> {
            /// Returns the live element at `idx`, or `None` if it was removed.
            pub fn live(&self, idx: $idx_name) -> Option<&T> {
                self.inner.get(idx.0).and_then(Option::as_ref)
            }

            /// Returns the live element at `idx` mutably, or `None` if it was removed.
            pub fn live_mut(&mut self, idx: $idx_name) -> Option<&mut T> {
                self.inner.get_mut(idx.0).and_then(Option::as_mut)
            }

            /// Removes the element at `idx`, leaving a tombstone in its slot.
            pub fn take(&mut self, idx: $idx_name) -> Option<T> {
                self.inner.get_mut(idx.0).and_then(Option::take)
            }

            /// Iterates over the live elements, skipping removed slots.
            pub fn iter_live(&self) -> impl Iterator<Item = ($idx_name, &T)> + '_ {
                self.inner
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, t)| t.as_ref().map(|t| ($idx_name(idx), t)))
            }

            /// The number of live elements.
            pub fn live_count(&self) -> usize {
                self.inner.iter().filter(|t| t.is_some()).count()
            }
        }

        impl<T> Default for $vec_name<T> {
            fn default() -> Self {
                Self { inner: Vec::new() }
            }
        }

        impl<T> std::ops::Index<$idx_name> for $vec_name<T> {
            type Output = T;

            fn index(&self, index: $idx_name) -> &Self::Output {
                &self.inner[index.0]
            }
        }

        impl<T> std::ops::IndexMut<$idx_name> for $vec_name<T> {
            fn index_mut(&mut self, index: $idx_name) -> &mut T {
                &mut self.inner[index.0]
            }
        }

        impl<T: std::fmt::Debug> std::fmt::Debug for $vec_name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                struct Entry<'a, T> {
                    idx: $idx_name,
                    inner: &'a T,
                }

                impl<T: std::fmt::Debug> std::fmt::Debug for Entry<'_, T> {
                    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "{idx:?}: {inner:?}", idx = self.idx, inner = self.inner,)
                    }
                }

                let mut list = f.debug_list();
                for idx in self.indices() {
                    list.entry(&Entry {
                        idx,
                        inner: &self[idx],
                    });
                }
                list.finish()
            }
        }
    };
}
