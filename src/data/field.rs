//! NodeField: per-node field data over a partition's owned and ghost nodes.
//!
//! A `NodeField<T>` stores one value per owned node followed by one value per ghost
//! slot, and is addressed through [`NodeRef`]. Values travel through ghost exchange as
//! flat `f64` components via the [`FieldValue`] trait.

use nalgebra::SMatrix;

use crate::pd_error::PdError;
use crate::topology::node::{LocalIndex, NodeRef};

/// A value that can be stored in a [`NodeField`] and replicated to ghosts.
pub trait FieldValue: Copy + PartialEq + std::fmt::Debug + Send + Sync {
    /// Number of `f64` components on the wire.
    const WIDTH: usize;

    fn zero() -> Self;
    /// Append this value's components to `out`.
    fn write_components(&self, out: &mut Vec<f64>);
    /// Rebuild a value from exactly `WIDTH` components.
    fn from_components(components: &[f64]) -> Self;
}

impl FieldValue for f64 {
    const WIDTH: usize = 1;

    fn zero() -> Self {
        0.0
    }
    fn write_components(&self, out: &mut Vec<f64>) {
        out.push(*self);
    }
    fn from_components(components: &[f64]) -> Self {
        components[0]
    }
}

impl<const R: usize, const C: usize> FieldValue for SMatrix<f64, R, C> {
    const WIDTH: usize = R * C;

    fn zero() -> Self {
        SMatrix::zeros()
    }
    fn write_components(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(self.as_slice());
    }
    fn from_components(components: &[f64]) -> Self {
        SMatrix::from_column_slice(components)
    }
}

/// Field storage for one level on one partition.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeField<T> {
    owned: usize,
    values: Vec<T>,
}

impl<T: FieldValue> NodeField<T> {
    /// Zero-filled field for `owned` owned nodes and `ghosts` ghost slots.
    pub fn zeros(owned: usize, ghosts: usize) -> Self {
        Self {
            owned,
            values: vec![T::zero(); owned + ghosts],
        }
    }

    /// Field whose owned part is copied from `owned_values`; ghosts are zeroed.
    pub fn from_owned(name: &'static str, owned_values: &[T], owned: usize, ghosts: usize) -> Result<Self, PdError> {
        if owned_values.len() != owned {
            return Err(PdError::FieldSizeMismatch {
                field: name,
                expected: owned,
                found: owned_values.len(),
            });
        }
        let mut field = Self::zeros(owned, ghosts);
        field.values[..owned].copy_from_slice(owned_values);
        Ok(field)
    }

    /// Overwrite the owned part from a caller buffer of exactly `owned_len()` values.
    pub fn copy_owned_from(&mut self, name: &'static str, src: &[T]) -> Result<(), PdError> {
        if src.len() != self.owned {
            return Err(PdError::FieldSizeMismatch {
                field: name,
                expected: self.owned,
                found: src.len(),
            });
        }
        self.values[..self.owned].copy_from_slice(src);
        Ok(())
    }

    #[inline]
    pub fn get(&self, node: NodeRef) -> &T {
        &self.values[self.offset(node)]
    }

    #[inline]
    pub fn get_mut(&mut self, node: NodeRef) -> &mut T {
        let offset = self.offset(node);
        &mut self.values[offset]
    }

    #[inline]
    pub fn owned(&self, local: LocalIndex) -> &T {
        &self.values[local.get()]
    }

    #[inline]
    pub fn owned_mut(&mut self, local: LocalIndex) -> &mut T {
        &mut self.values[local.get()]
    }

    #[inline]
    pub fn ghost(&self, slot: usize) -> &T {
        &self.values[self.owned + slot]
    }

    #[inline]
    pub fn ghost_mut(&mut self, slot: usize) -> &mut T {
        &mut self.values[self.owned + slot]
    }

    /// Owned values in local order.
    pub fn owned_values(&self) -> &[T] {
        &self.values[..self.owned]
    }

    pub fn owned_len(&self) -> usize {
        self.owned
    }

    pub fn ghost_len(&self) -> usize {
        self.values.len() - self.owned
    }

    /// Owned + ghost.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reset every entry to zero.
    pub fn fill_zero(&mut self) {
        self.values.fill(T::zero());
    }

    #[inline]
    fn offset(&self, node: NodeRef) -> usize {
        match node {
            NodeRef::Owned(local) => local.get(),
            NodeRef::Ghost(slot) => self.owned + slot,
        }
    }
}
