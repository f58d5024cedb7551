//! Value Footprint Estimation
//!
//! Estimates how many bytes a value occupies by walking its shape through
//! the serde data model. The result is an estimate used for admission
//! control, not an exact allocator measurement:
//!
//! - scalars count their fixed width (`bool`/`u8` 1, `u16` 2, `u32`/`f32`/`char` 4,
//!   `u64`/`f64` 8, `u128` 16)
//! - strings and byte buffers count their length
//! - sequences, arrays and tuples count `len * size_of(first element)`, so a
//!   sequence of differently sized elements is only approximated
//! - maps sum the sizes of every key and value
//! - structs and enum variants sum their fields
//! - `None` and unit values count 0

use serde::ser::{self, Serialize};

use crate::error::{CacheError, Result};

/// Returns the estimated footprint of `value` in bytes.
///
/// # Errors
/// Returns `UnsupportedValue` if the value's `Serialize` implementation
/// reports an error, meaning its shape cannot be measured.
pub fn footprint_of<T: Serialize + ?Sized>(value: &T) -> Result<u64> {
    value
        .serialize(FootprintSerializer)
        .map_err(|e| CacheError::UnsupportedValue(e.0))
}

// == Sizer Error ==
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct SizerError(String);

impl ser::Error for SizerError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        SizerError(msg.to_string())
    }
}

type SizerResult = std::result::Result<u64, SizerError>;

// == Footprint Serializer ==
#[derive(Clone, Copy)]
struct FootprintSerializer;

impl ser::Serializer for FootprintSerializer {
    type Ok = u64;
    type Error = SizerError;

    type SerializeSeq = SequenceSizer;
    type SerializeTuple = SequenceSizer;
    type SerializeTupleStruct = FieldSizer;
    type SerializeTupleVariant = FieldSizer;
    type SerializeMap = MapSizer;
    type SerializeStruct = FieldSizer;
    type SerializeStructVariant = FieldSizer;

    fn serialize_bool(self, _v: bool) -> SizerResult {
        Ok(1)
    }

    fn serialize_i8(self, _v: i8) -> SizerResult {
        Ok(1)
    }

    fn serialize_i16(self, _v: i16) -> SizerResult {
        Ok(2)
    }

    fn serialize_i32(self, _v: i32) -> SizerResult {
        Ok(4)
    }

    fn serialize_i64(self, _v: i64) -> SizerResult {
        Ok(8)
    }

    fn serialize_i128(self, _v: i128) -> SizerResult {
        Ok(16)
    }

    fn serialize_u8(self, _v: u8) -> SizerResult {
        Ok(1)
    }

    fn serialize_u16(self, _v: u16) -> SizerResult {
        Ok(2)
    }

    fn serialize_u32(self, _v: u32) -> SizerResult {
        Ok(4)
    }

    fn serialize_u64(self, _v: u64) -> SizerResult {
        Ok(8)
    }

    fn serialize_u128(self, _v: u128) -> SizerResult {
        Ok(16)
    }

    fn serialize_f32(self, _v: f32) -> SizerResult {
        Ok(4)
    }

    fn serialize_f64(self, _v: f64) -> SizerResult {
        Ok(8)
    }

    fn serialize_char(self, _v: char) -> SizerResult {
        Ok(4)
    }

    fn serialize_str(self, v: &str) -> SizerResult {
        Ok(v.len() as u64)
    }

    fn serialize_bytes(self, v: &[u8]) -> SizerResult {
        Ok(v.len() as u64)
    }

    fn serialize_none(self) -> SizerResult {
        Ok(0)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> SizerResult {
        value.serialize(self)
    }

    fn serialize_unit(self) -> SizerResult {
        Ok(0)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> SizerResult {
        Ok(0)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> SizerResult {
        Ok(0)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> SizerResult {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> SizerResult {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<SequenceSizer, SizerError> {
        Ok(SequenceSizer::default())
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<SequenceSizer, SizerError> {
        Ok(SequenceSizer::default())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<FieldSizer, SizerError> {
        Ok(FieldSizer::default())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<FieldSizer, SizerError> {
        Ok(FieldSizer::default())
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<MapSizer, SizerError> {
        Ok(MapSizer::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<FieldSizer, SizerError> {
        Ok(FieldSizer::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<FieldSizer, SizerError> {
        Ok(FieldSizer::default())
    }
}

// == Sequence Sizer ==
/// Counts elements and measures only the first one.
#[derive(Default)]
struct SequenceSizer {
    count: u64,
    first: Option<u64>,
}

impl SequenceSizer {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> std::result::Result<(), SizerError> {
        if self.first.is_none() {
            self.first = Some(value.serialize(FootprintSerializer)?);
        }
        self.count += 1;
        Ok(())
    }

    fn total(&self) -> u64 {
        self.count.saturating_mul(self.first.unwrap_or(0))
    }
}

impl ser::SerializeSeq for SequenceSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.push(value)
    }

    fn end(self) -> SizerResult {
        Ok(self.total())
    }
}

impl ser::SerializeTuple for SequenceSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.push(value)
    }

    fn end(self) -> SizerResult {
        Ok(self.total())
    }
}

// == Field Sizer ==
/// Sums every field of a composite value.
#[derive(Default)]
struct FieldSizer {
    total: u64,
}

impl FieldSizer {
    fn add<T: Serialize + ?Sized>(&mut self, value: &T) -> std::result::Result<(), SizerError> {
        self.total = self
            .total
            .saturating_add(value.serialize(FootprintSerializer)?);
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FieldSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.add(value)
    }

    fn end(self) -> SizerResult {
        Ok(self.total)
    }
}

impl ser::SerializeTupleVariant for FieldSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.add(value)
    }

    fn end(self) -> SizerResult {
        Ok(self.total)
    }
}

impl ser::SerializeStruct for FieldSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.add(value)
    }

    fn end(self) -> SizerResult {
        Ok(self.total)
    }
}

impl ser::SerializeStructVariant for FieldSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.add(value)
    }

    fn end(self) -> SizerResult {
        Ok(self.total)
    }
}

// == Map Sizer ==
#[derive(Default)]
struct MapSizer {
    total: u64,
}

impl ser::SerializeMap for MapSizer {
    type Ok = u64;
    type Error = SizerError;

    fn serialize_key<T: Serialize + ?Sized>(
        &mut self,
        key: &T,
    ) -> std::result::Result<(), SizerError> {
        self.total = self.total.saturating_add(key.serialize(FootprintSerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> std::result::Result<(), SizerError> {
        self.total = self
            .total
            .saturating_add(value.serialize(FootprintSerializer)?);
        Ok(())
    }

    fn end(self) -> SizerResult {
        Ok(self.total)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
        label: String,
    }

    #[derive(Serialize)]
    struct Meters(f64);

    #[derive(Serialize)]
    enum Shape {
        Empty,
        Circle(f64),
        Rect { w: u16, h: u16 },
    }

    struct Unmeasurable;

    impl Serialize for Unmeasurable {
        fn serialize<S>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: ser::Serializer,
        {
            Err(ser::Error::custom("cannot be measured"))
        }
    }

    #[test]
    fn test_scalar_widths() {
        assert_eq!(footprint_of(&true).unwrap(), 1);
        assert_eq!(footprint_of(&1u8).unwrap(), 1);
        assert_eq!(footprint_of(&1i16).unwrap(), 2);
        assert_eq!(footprint_of(&1i32).unwrap(), 4);
        assert_eq!(footprint_of(&1i64).unwrap(), 8);
        assert_eq!(footprint_of(&1f32).unwrap(), 4);
        assert_eq!(footprint_of(&1f64).unwrap(), 8);
        assert_eq!(footprint_of(&1u128).unwrap(), 16);
        assert_eq!(footprint_of(&'x').unwrap(), 4);
    }

    #[test]
    fn test_strings() {
        assert_eq!(footprint_of("12345").unwrap(), 5);
        assert_eq!(footprint_of(&"0123456789".to_string()).unwrap(), 10);
        assert_eq!(footprint_of("").unwrap(), 0);
    }

    #[test]
    fn test_byte_sequences() {
        assert_eq!(footprint_of(&vec![0u8; 1024]).unwrap(), 1024);
        assert_eq!(footprint_of(&[0u16; 32]).unwrap(), 64);
        assert_eq!(footprint_of(&Vec::<u64>::new()).unwrap(), 0);
    }

    #[test]
    fn test_sequence_uses_first_element() {
        let words = vec!["a".to_string(), "longer".to_string(), "longest".to_string()];
        assert_eq!(footprint_of(&words).unwrap(), 3);
    }

    #[test]
    fn test_map_sums_keys_and_values() {
        let mut map = HashMap::new();
        map.insert("key".to_string(), vec![0u8; 1000]);
        assert_eq!(footprint_of(&map).unwrap(), 1003);

        let mut ordered = BTreeMap::new();
        ordered.insert(1u32, "ab");
        ordered.insert(2u32, "abcd");
        assert_eq!(footprint_of(&ordered).unwrap(), 4 + 2 + 4 + 4);
    }

    #[test]
    fn test_struct_sums_fields() {
        let point = Point {
            x: 1,
            y: 2,
            label: "origin".to_string(),
        };
        assert_eq!(footprint_of(&point).unwrap(), 4 + 4 + 6);
        assert_eq!(footprint_of(&Meters(1.0)).unwrap(), 8);
    }

    #[test]
    fn test_enum_variants() {
        assert_eq!(footprint_of(&Shape::Empty).unwrap(), 0);
        assert_eq!(footprint_of(&Shape::Circle(2.0)).unwrap(), 8);
        assert_eq!(footprint_of(&Shape::Rect { w: 1, h: 2 }).unwrap(), 4);
    }

    #[test]
    fn test_absent_values() {
        assert_eq!(footprint_of(&Option::<u64>::None).unwrap(), 0);
        assert_eq!(footprint_of(&Some(7u64)).unwrap(), 8);
        assert_eq!(footprint_of(&()).unwrap(), 0);
    }

    #[test]
    fn test_pointers_are_transparent() {
        assert_eq!(footprint_of(&Box::new(5u32)).unwrap(), 4);
        assert_eq!(footprint_of(&Arc::new("abc".to_string())).unwrap(), 3);
    }

    #[test]
    fn test_unsupported_value_is_an_error() {
        let result = footprint_of(&Unmeasurable);
        assert_eq!(
            result,
            Err(CacheError::UnsupportedValue("cannot be measured".to_string()))
        );

        let nested = vec![Unmeasurable];
        assert!(matches!(
            footprint_of(&nested),
            Err(CacheError::UnsupportedValue(_))
        ));
    }
}
