//! Tensor API.
//!
//! Tensors carry image data into a pose model and SimCC vectors back out of it. A tensor is an
//! N-dimensional array of `f32`s, stored in row-major order.

use std::fmt;

use tinyvec::TinyVec;

/// An owned, dynamically shaped tensor of `f32` elements.
///
/// [`Tensor::index`] fixes a prefix of the tensor's dimensions and returns a [`TensorView`] of
/// the remaining ones. 1-dimensional views expose their data via [`TensorView::as_slice`].
#[derive(Clone, PartialEq)]
pub struct Tensor {
    shape: TinyVec<[usize; 4]>,
    data: Box<[f32]>,
}

/// A borrowed view of some rows of a [`Tensor`].
#[derive(Clone, Copy, PartialEq)]
pub struct TensorView<'a> {
    shape: &'a [usize],
    data: &'a [f32],
}

impl Tensor {
    /// Creates an `N`-dimensional tensor of the given shape by calling `f` for each element.
    ///
    /// `f` is invoked with successive indices in row-major order, starting with `[0, ..., 0, 0]`,
    /// then `[0, ..., 0, 1]` and so on.
    pub fn from_array_shape_fn<const N: usize, F: FnMut([usize; N]) -> f32>(
        shape: [usize; N],
        mut f: F,
    ) -> Self {
        let mut data = Vec::with_capacity(shape.iter().product());
        for_each_index(shape, |index| data.push(f(index)));
        Self {
            shape: TinyVec::from(&shape[..]),
            data: data.into_boxed_slice(),
        }
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> anyhow::Result<Self> {
        let data = tract.as_slice::<f32>()?;
        Ok(Self {
            shape: TinyVec::from(tract.shape()),
            data: data.into(),
        })
    }

    pub(super) fn to_tract(&self) -> anyhow::Result<tract_onnx::prelude::Tensor> {
        tract_onnx::prelude::Tensor::from_shape(&self.shape, &self.data)
    }

    /// Returns the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Indexes a prefix of the tensor's dimensions with `indices`.
    ///
    /// Indexing a tensor of shape `[1, 17, 384]` with `[0, 3]` returns a view of shape `[384]`.
    ///
    /// # Panics
    ///
    /// This method will panic if `indices` has more entries than `self` has dimensions, or if any
    /// index is out of bounds.
    #[track_caller]
    pub fn index<const N: usize>(&self, indices: [usize; N]) -> TensorView<'_> {
        let view = TensorView {
            shape: &self.shape,
            data: &self.data,
        };
        view.index(indices)
    }
}

impl<'a> TensorView<'a> {
    pub fn shape(&self) -> &'a [usize] {
        self.shape
    }

    #[track_caller]
    fn index<const N: usize>(self, indices: [usize; N]) -> TensorView<'a> {
        assert!(
            N <= self.shape.len(),
            "attempted to index tensor of shape {:?} with {:?}",
            self.shape,
            indices
        );

        let mut view = self;
        for index in indices {
            let (len, rest) = (view.shape[0], &view.shape[1..]);
            assert!(
                index < len,
                "attempted to index tensor of shape {:?} with {:?}",
                self.shape,
                indices
            );
            let stride = rest.iter().product::<usize>();
            view = TensorView {
                shape: rest,
                data: &view.data[index * stride..(index + 1) * stride],
            };
        }
        view
    }

    /// Returns the values of a 1-dimensional view.
    ///
    /// # Panics
    ///
    /// Panics if the view does not have exactly 1 dimension.
    #[track_caller]
    pub fn as_slice(&self) -> &'a [f32] {
        assert_eq!(
            self.shape.len(),
            1,
            "attempted to access tensor of shape {:?} as slice",
            self.shape
        );
        self.data
    }
}

/// Calls `f` with every index into a tensor of `shape`, in row-major order.
fn for_each_index<const N: usize>(shape: [usize; N], mut f: impl FnMut([usize; N])) {
    if shape.iter().any(|&len| len == 0) {
        return;
    }

    let mut index = [0; N];
    loop {
        f(index);

        let mut carry = true;
        for (i, &len) in index.iter_mut().zip(&shape).rev() {
            if *i + 1 == len {
                *i = 0;
            } else {
                *i += 1;
                carry = false;
                break;
            }
        }
        if carry {
            return;
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .finish()
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("shape", &self.shape)
            .finish()
    }
}
