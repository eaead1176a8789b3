use std::ops::{Deref, DerefMut};

use crate::device::{Binding, Gl};

/// Proof that a context/surface pair is bound.
///
/// Only `PixelBuffer` creates these, and only while its binding is live, so
/// every command issued through one targets the right surface.
pub struct Current<'a> {
    gl: &'a mut dyn Gl,
    binding: Binding,
}

impl<'a> Current<'a> {
    pub(crate) fn new(gl: &'a mut dyn Gl, binding: Binding) -> Self {
        Self { gl, binding }
    }

    #[inline]
    pub fn binding(&self) -> Binding {
        self.binding
    }
}

impl<'a> Deref for Current<'a> {
    type Target = dyn Gl + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.gl
    }
}

impl DerefMut for Current<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.gl
    }
}
