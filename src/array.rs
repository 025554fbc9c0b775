//! Dynamically typed n-dimensional arrays.
//!
//! [`NumArray`] wraps an [`ndarray::ArrayD`] of one of the element types that
//! the `.npy` and MAT-file codecs understand, plus an object variant whose
//! elements are arbitrary [`Value`]s (the equivalent of an `object` dtype).

use crate::value::Value;
use ndarray::prelude::*;
use ndarray::{IxDyn, ShapeBuilder, ShapeError};
use std::fmt;

/// Element type of a [`NumArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Arbitrary [`Value`] elements.
    Object,
}

impl DType {
    /// The NumPy name of the element type.
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::Object => "object",
        }
    }

    /// Size of a single element in bytes, or `None` for [`DType::Object`].
    pub fn size(self) -> Option<usize> {
        match self {
            DType::Bool | DType::I8 | DType::U8 => Some(1),
            DType::I16 | DType::U16 => Some(2),
            DType::I32 | DType::U32 | DType::F32 => Some(4),
            DType::I64 | DType::U64 | DType::F64 => Some(8),
            DType::Object => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An array element type that can be stored in a [`NumArray`].
pub trait Element: Clone + Sized {
    /// The tag of the matching [`NumArray`] variant.
    const DTYPE: DType;

    /// Wraps an array of this element type.
    fn wrap(array: ArrayD<Self>) -> NumArray;

    /// Returns the inner array if `array` holds this element type.
    fn unwrap_ref(array: &NumArray) -> Option<&ArrayD<Self>>;

    /// Mutable version of [`Element::unwrap_ref`].
    fn unwrap_mut(array: &mut NumArray) -> Option<&mut ArrayD<Self>>;

    /// Converts a single element into a [`Value`].
    fn to_value(&self) -> Value;
}

/// An n-dimensional array with a runtime element type.
#[derive(Clone, Debug, PartialEq)]
pub enum NumArray {
    Bool(ArrayD<bool>),
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Object(ArrayD<Value>),
}

/// Evaluates `$body` with `$a` bound to the inner array, whatever its type.
macro_rules! with_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            NumArray::Bool($a) => $body,
            NumArray::I8($a) => $body,
            NumArray::I16($a) => $body,
            NumArray::I32($a) => $body,
            NumArray::I64($a) => $body,
            NumArray::U8($a) => $body,
            NumArray::U16($a) => $body,
            NumArray::U32($a) => $body,
            NumArray::U64($a) => $body,
            NumArray::F32($a) => $body,
            NumArray::F64($a) => $body,
            NumArray::Object($a) => $body,
        }
    };
}

/// Like `with_array!`, but rewraps the result in the same variant.
macro_rules! map_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            NumArray::Bool($a) => NumArray::Bool($body),
            NumArray::I8($a) => NumArray::I8($body),
            NumArray::I16($a) => NumArray::I16($body),
            NumArray::I32($a) => NumArray::I32($body),
            NumArray::I64($a) => NumArray::I64($body),
            NumArray::U8($a) => NumArray::U8($body),
            NumArray::U16($a) => NumArray::U16($body),
            NumArray::U32($a) => NumArray::U32($body),
            NumArray::U64($a) => NumArray::U64($body),
            NumArray::F32($a) => NumArray::F32($body),
            NumArray::F64($a) => NumArray::F64($body),
            NumArray::Object($a) => NumArray::Object($body),
        }
    };
}

impl NumArray {
    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        match self {
            NumArray::Bool(_) => DType::Bool,
            NumArray::I8(_) => DType::I8,
            NumArray::I16(_) => DType::I16,
            NumArray::I32(_) => DType::I32,
            NumArray::I64(_) => DType::I64,
            NumArray::U8(_) => DType::U8,
            NumArray::U16(_) => DType::U16,
            NumArray::U32(_) => DType::U32,
            NumArray::U64(_) => DType::U64,
            NumArray::F32(_) => DType::F32,
            NumArray::F64(_) => DType::F64,
            NumArray::Object(_) => DType::Object,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        with_array!(self, a => a.ndim())
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the inner array if it holds elements of type `T`.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::unwrap_ref(self)
    }

    /// Returns the inner array mutably if it holds elements of type `T`.
    pub fn as_array_mut<T: Element>(&mut self) -> Option<&mut ArrayD<T>> {
        T::unwrap_mut(self)
    }

    /// Removes every axis of length 1.
    ///
    /// An array of shape `(1, 5, 1)` becomes shape `(5,)`; an array with a
    /// single element becomes zero-dimensional.
    pub fn squeeze(self) -> NumArray {
        map_array!(self, a => squeeze_axes(a))
    }

    /// Returns the single element as a [`Value`] if the array contains
    /// exactly one element, whatever its shape.
    pub fn scalar(&self) -> Option<Value> {
        if self.len() != 1 {
            return None;
        }
        with_array!(self, a => a.iter().next().map(Element::to_value))
    }

    /// Converts the array into nested [`Value::List`]s, with scalars at the
    /// leaves. A zero-dimensional array converts to its only element.
    pub fn to_value(&self) -> Value {
        with_array!(self, a => nest(a.view()))
    }

    /// Returns `true` if this is an object array holding only strings, which
    /// NumPy stores as fixed-width text.
    pub fn is_text(&self) -> bool {
        match self {
            NumArray::Object(a) => a.iter().all(|v| matches!(v, Value::String(_))),
            _ => false,
        }
    }

    /// Builds an array from a (possibly nested) list of booleans and numbers,
    /// promoting the element type the way NumPy does: all booleans give
    /// [`DType::Bool`], booleans and integers give [`DType::I64`] and
    /// anything containing a float gives [`DType::F64`], as does an empty
    /// list. A list of strings gives a text array (see
    /// [`NumArray::is_text`]).
    ///
    /// Returns `None` if the nesting is ragged, if strings are mixed with
    /// other leaves or if any leaf is something else.
    pub fn from_list(items: &[Value]) -> Option<NumArray> {
        let shape = list_shape(items);
        let mut leaves = Vec::new();
        flatten(items, shape.len(), &mut leaves);
        if leaves.len() != shape.iter().product::<usize>() {
            return None;
        }
        let mut dtype = None;
        for leaf in &leaves {
            dtype = Some(match (leaf, dtype) {
                (Value::String(_), None | Some(DType::Object)) => DType::Object,
                (Value::String(_), _) | (_, Some(DType::Object)) => return None,
                (Value::Bool(_), current) => current.unwrap_or(DType::Bool),
                (Value::Int(_), None | Some(DType::Bool)) => DType::I64,
                (Value::Int(_), Some(current)) => current,
                (Value::Float(_), _) => DType::F64,
                _ => return None,
            });
        }
        let array = match dtype.unwrap_or(DType::F64) {
            DType::Bool => NumArray::Bool(
                from_shape_vec(&shape, false, leaves.iter().filter_map(|v| v.as_bool()).collect())
                    .ok()?,
            ),
            DType::I64 => NumArray::I64(
                from_shape_vec(&shape, false, leaves.iter().filter_map(|v| leaf_i64(v)).collect())
                    .ok()?,
            ),
            DType::Object => NumArray::Object(
                from_shape_vec(&shape, false, leaves.iter().map(|&v| v.clone()).collect()).ok()?,
            ),
            _ => NumArray::F64(
                from_shape_vec(&shape, false, leaves.iter().filter_map(|v| leaf_f64(v)).collect())
                    .ok()?,
            ),
        };
        Some(array)
    }

    /// Builds an object array from a list, nesting as deep as the list is
    /// rectangular. `[[1, 2], [3, 4]]` gives shape `(2, 2)`; the ragged
    /// `[[1, 2], [3]]` gives shape `(2,)` with list elements.
    pub fn object_from_list(items: Vec<Value>) -> NumArray {
        let shape = list_shape(&items);
        let mut leaves = Vec::with_capacity(shape.iter().product());
        flatten(&items, shape.len(), &mut leaves);
        let leaves = leaves.into_iter().cloned().collect();
        match from_shape_vec(&shape, false, leaves) {
            Ok(array) => NumArray::Object(array),
            // `list_shape` only reports rectangular prefixes, so the leaves
            // always fill the shape.
            Err(_) => NumArray::Object(Array::from(items).into_dyn()),
        }
    }
}

/// Creates an array from `data` in C order, or in Fortran order if `fortran`.
pub(crate) fn from_shape_vec<T>(
    shape: &[usize],
    fortran: bool,
    data: Vec<T>,
) -> Result<ArrayD<T>, ShapeError> {
    if fortran {
        ArrayD::from_shape_vec(IxDyn(shape).f(), data)
    } else {
        ArrayD::from_shape_vec(IxDyn(shape), data)
    }
}

fn squeeze_axes<T>(mut array: ArrayD<T>) -> ArrayD<T> {
    for axis in (0..array.ndim()).rev() {
        if array.len_of(Axis(axis)) == 1 {
            array = array.index_axis_move(Axis(axis), 0);
        }
    }
    array
}

fn nest<T: Element>(view: ArrayViewD<'_, T>) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().map_or(Value::Null, Element::to_value);
    }
    Value::List(view.outer_iter().map(nest).collect())
}

fn leaf_i64(value: &Value) -> Option<i64> {
    match *value {
        Value::Bool(b) => Some(b.into()),
        Value::Int(i) => Some(i),
        _ => None,
    }
}

fn leaf_f64(value: &Value) -> Option<f64> {
    match *value {
        Value::Bool(b) => Some(if b { 1. } else { 0. }),
        Value::Int(i) => Some(i as f64),
        Value::Float(x) => Some(x),
        _ => None,
    }
}

/// The longest shape prefix over which `items` is rectangular.
fn list_shape(items: &[Value]) -> Vec<usize> {
    let mut shape = vec![items.len()];
    let mut common: Option<Vec<usize>> = None;
    for item in items {
        let sub = match item {
            Value::List(inner) => list_shape(inner),
            _ => Vec::new(),
        };
        common = Some(match common {
            None => sub,
            Some(prev) => prev
                .iter()
                .zip(&sub)
                .take_while(|(a, b)| a == b)
                .map(|(&a, _)| a)
                .collect(),
        });
    }
    shape.extend(common.unwrap_or_default());
    shape
}

/// Collects the elements found `depth` levels of list nesting down.
fn flatten<'a>(items: &'a [Value], depth: usize, out: &mut Vec<&'a Value>) {
    for item in items {
        match item {
            Value::List(inner) if depth > 1 => flatten(inner, depth - 1, out),
            _ => out.push(item),
        }
    }
}

macro_rules! impl_element {
    ($elem:ty, $variant:ident, $to_value:expr) => {
        impl Element for $elem {
            const DTYPE: DType = DType::$variant;

            fn wrap(array: ArrayD<Self>) -> NumArray {
                NumArray::$variant(array)
            }

            fn unwrap_ref(array: &NumArray) -> Option<&ArrayD<Self>> {
                match array {
                    NumArray::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn unwrap_mut(array: &mut NumArray) -> Option<&mut ArrayD<Self>> {
                match array {
                    NumArray::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn to_value(&self) -> Value {
                ($to_value)(self)
            }
        }
    };
}

impl_element!(bool, Bool, |&x: &bool| Value::Bool(x));
impl_element!(i8, I8, |&x: &i8| Value::Int(x.into()));
impl_element!(i16, I16, |&x: &i16| Value::Int(x.into()));
impl_element!(i32, I32, |&x: &i32| Value::Int(x.into()));
impl_element!(i64, I64, |&x: &i64| Value::Int(x));
impl_element!(u8, U8, |&x: &u8| Value::Int(x.into()));
impl_element!(u16, U16, |&x: &u16| Value::Int(x.into()));
impl_element!(u32, U32, |&x: &u32| Value::Int(x.into()));
impl_element!(u64, U64, |&x: &u64| match i64::try_from(x) {
    Ok(x) => Value::Int(x),
    Err(_) => Value::Float(x as f64),
});
impl_element!(f32, F32, |&x: &f32| Value::Float(x.into()));
impl_element!(f64, F64, |&x: &f64| Value::Float(x));
impl_element!(Value, Object, |x: &Value| x.clone());

impl<A: Element, D: Dimension> From<Array<A, D>> for NumArray {
    fn from(array: Array<A, D>) -> NumArray {
        A::wrap(array.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn squeeze_removes_singleton_axes() {
        let a = NumArray::from(Array::from_shape_vec((1, 5, 1), vec![1., 2., 3., 4., 5.]).unwrap());
        let squeezed = a.squeeze();
        assert_eq!(squeezed.shape(), &[5]);
        assert_eq!(
            squeezed.to_value(),
            Value::from(vec![1., 2., 3., 4., 5.]),
        );
    }

    #[test]
    fn squeeze_single_element_is_zero_dimensional() {
        let a = NumArray::from(array![[3.5f64]]);
        let squeezed = a.squeeze();
        assert_eq!(squeezed.ndim(), 0);
        assert_eq!(squeezed.to_value(), Value::Float(3.5));
    }

    #[test]
    fn scalar_requires_exactly_one_element() {
        assert_eq!(NumArray::from(array![[7i32]]).scalar(), Some(Value::Int(7)));
        assert_eq!(NumArray::from(array![1i32, 2]).scalar(), None);
    }

    #[test]
    fn to_value_keeps_nesting() {
        let a = NumArray::from(array![[1u8, 2], [3, 4]]);
        assert_eq!(
            a.to_value(),
            Value::List(vec![
                Value::List(vec![Value::Int(1), Value::Int(2)]),
                Value::List(vec![Value::Int(3), Value::Int(4)]),
            ]),
        );
    }

    #[test]
    fn from_list_promotes() {
        let ints = NumArray::from_list(&[Value::Bool(true), Value::Int(3)]).unwrap();
        assert_eq!(ints, NumArray::from(array![1i64, 3]));

        let floats = NumArray::from_list(&[
            Value::from(vec![Value::Int(1), Value::Float(2.5)]),
            Value::from(vec![Value::Int(3), Value::Int(4)]),
        ])
        .unwrap();
        assert_eq!(floats, NumArray::from(array![[1., 2.5], [3., 4.]]));
    }

    #[test]
    fn from_list_rejects_ragged_and_mixed_text() {
        let ragged = [
            Value::from(vec![1i64, 2]),
            Value::from(vec![3i64]),
        ];
        assert!(NumArray::from_list(&ragged).is_none());
        assert!(NumArray::from_list(&[Value::from("a"), Value::Int(1)]).is_none());
        assert!(NumArray::from_list(&[Value::Float(1.), Value::from("a")]).is_none());
        assert!(NumArray::from_list(&[Value::Null]).is_none());
    }

    #[test]
    fn from_list_text() {
        let text = NumArray::from_list(&[
            Value::from(vec!["ab", "c"]),
            Value::from(vec!["", "def"]),
        ])
        .unwrap();
        assert_eq!(text.shape(), &[2, 2]);
        assert!(text.is_text());
        assert!(!NumArray::object_from_list(vec![Value::Int(1)]).is_text());
        assert!(!NumArray::from(array![1u8]).is_text());
    }

    #[test]
    fn empty_list_is_float() {
        let empty = NumArray::from_list(&[]).unwrap();
        assert_eq!(empty, NumArray::F64(ArrayD::zeros(IxDyn(&[0]))));
        let nested = NumArray::from_list(&[Value::List(Vec::new())]).unwrap();
        assert_eq!(nested.dtype(), DType::F64);
        assert_eq!(nested.shape(), &[1, 0]);
    }

    #[test]
    fn object_from_list_shape() {
        let square = NumArray::object_from_list(vec![
            Value::from(vec![1i64, 2]),
            Value::from(vec![3i64, 4]),
        ]);
        assert_eq!(square.shape(), &[2, 2]);

        let ragged = NumArray::object_from_list(vec![
            Value::from(vec![1i64, 2]),
            Value::from(vec![3i64]),
        ]);
        assert_eq!(ragged.shape(), &[2]);
        assert_eq!(
            ragged.as_array::<Value>().unwrap()[[1]],
            Value::from(vec![3i64]),
        );
    }
}
