// ABOUTME: Serde Serializer implementation for BSON encoding.
// ABOUTME: Buffers each map key so the value's type tag can precede it on the wire.

use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::types::Binary;
use serde::ser::{self, Serialize};

/// A serde Serializer that writes BSON through an [`Encoder`].
///
/// BSON elements are laid out `[tag][cstring key][payload]`, and the tag is
/// only known once the value arrives. The serializer therefore holds the
/// most recent map key (or synthesized array index) in a pending slot and
/// lets each value writer emit the full element header.
pub struct Serializer<'a> {
    encoder: &'a mut Encoder,
    key: Option<String>,
}

impl<'a> Serializer<'a> {
    /// Create a new Serializer wrapping an Encoder.
    pub fn new(encoder: &'a mut Encoder) -> Self {
        Self { encoder, key: None }
    }

    fn take_key(&mut self) -> Result<String> {
        self.key
            .take()
            .ok_or_else(|| Error::UnencodableValue("bare value outside a document or array".into()))
    }

    /// Open a document or array unit: as an element of the enclosing unit
    /// when a key is pending, as the top-level unit otherwise.
    fn begin_unit(&mut self, array: bool) -> Result<()> {
        let key = self.key.take();
        if key.is_none() && self.encoder.depth() > 0 {
            return Err(Error::Custom("missing document key".into()));
        }
        if array {
            self.encoder.begin_array(key.as_deref())
        } else {
            self.encoder.begin_document(key.as_deref())
        }
    }
}

impl<'a, 'b> ser::Serializer for &'b mut Serializer<'a> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a, 'b>;
    type SerializeTuple = SeqSerializer<'a, 'b>;
    type SerializeTupleStruct = SeqSerializer<'a, 'b>;
    type SerializeTupleVariant = SeqSerializer<'a, 'b>;
    type SerializeMap = MapSerializer<'a, 'b>;
    type SerializeStruct = MapSerializer<'a, 'b>;
    type SerializeStructVariant = MapSerializer<'a, 'b>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_boolean(&key, v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_int32(&key, v)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_int64(&key, v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        match i32::try_from(v) {
            Ok(n) => self.serialize_i32(n),
            Err(_) => self.serialize_i64(i64::from(v)),
        }
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        match i64::try_from(v) {
            Ok(n) => self.serialize_i64(n),
            Err(_) => Err(Error::UnencodableValue(format!("u64 value {v}"))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_double(&key, v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_string(&key, v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_binary(&key, &Binary::generic(v.to_vec()))
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        let key = self.take_key()?;
        self.encoder.write_null(&key)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        // {variant: value}
        self.begin_unit(false)?;
        self.key = Some(variant.to_owned());
        value.serialize(&mut *self)?;
        self.encoder.end_document()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.begin_unit(true)?;
        Ok(SeqSerializer {
            ser: self,
            index: 0,
            close_outer: false,
        })
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(None)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(None)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        // {variant: [elements...]}
        self.begin_unit(false)?;
        self.key = Some(variant.to_owned());
        self.begin_unit(true)?;
        Ok(SeqSerializer {
            ser: self,
            index: 0,
            close_outer: true,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.begin_unit(false)?;
        Ok(MapSerializer {
            ser: self,
            close_outer: false,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(None)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        // {variant: {fields...}}
        self.begin_unit(false)?;
        self.key = Some(variant.to_owned());
        self.begin_unit(false)?;
        Ok(MapSerializer {
            ser: self,
            close_outer: true,
        })
    }
}

/// Writes sequence elements with synthesized decimal index keys.
pub struct SeqSerializer<'a, 'b> {
    ser: &'b mut Serializer<'a>,
    index: usize,
    /// Variant forms wrap the array in a single-key document; close both.
    close_outer: bool,
}

impl SeqSerializer<'_, '_> {
    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.ser.key = Some(self.index.to_string());
        self.index += 1;
        value.serialize(&mut *self.ser)
    }

    fn finish(self) -> Result<()> {
        self.ser.encoder.end_document()?;
        if self.close_outer {
            self.ser.encoder.end_document()?;
        }
        Ok(())
    }
}

impl ser::SerializeSeq for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Writes document entries; keys pass through [`MapKeySerializer`] into the
/// pending-key slot.
pub struct MapSerializer<'a, 'b> {
    ser: &'b mut Serializer<'a>,
    close_outer: bool,
}

impl MapSerializer<'_, '_> {
    fn finish(self) -> Result<()> {
        self.ser.encoder.end_document()?;
        if self.close_outer {
            self.ser.encoder.end_document()?;
        }
        Ok(())
    }
}

impl ser::SerializeMap for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        key.serialize(MapKeySerializer { ser: &mut *self.ser })
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.ser.key = Some(key.to_owned());
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.ser.key = Some(key.to_owned());
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// A helper serializer that stores map keys in the pending slot, ensuring
/// they are strings (integers and chars are stringified, everything else is
/// rejected).
struct MapKeySerializer<'a, 'b> {
    ser: &'b mut Serializer<'a>,
}

impl MapKeySerializer<'_, '_> {
    fn set(self, key: String) -> Result<()> {
        self.ser.key = Some(key);
        Ok(())
    }
}

impl ser::Serializer for MapKeySerializer<'_, '_> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = ser::Impossible<(), Error>;
    type SerializeTuple = ser::Impossible<(), Error>;
    type SerializeTupleStruct = ser::Impossible<(), Error>;
    type SerializeTupleVariant = ser::Impossible<(), Error>;
    type SerializeMap = ser::Impossible<(), Error>;
    type SerializeStruct = ser::Impossible<(), Error>;
    type SerializeStructVariant = ser::Impossible<(), Error>;

    fn serialize_str(self, v: &str) -> Result<()> {
        self.set(v.to_owned())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.set(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_i16(self, v: i16) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_i32(self, v: i32) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_i64(self, v: i64) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_u8(self, v: u8) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_u16(self, v: u16) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_u32(self, v: u32) -> Result<()> {
        self.set(v.to_string())
    }
    fn serialize_u64(self, v: u64) -> Result<()> {
        self.set(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.set(variant.to_owned())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Err(key_error())
    }
    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(key_error())
    }
    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(key_error())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Err(key_error())
    }
    fn serialize_none(self) -> Result<()> {
        Err(key_error())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<()> {
        Err(key_error())
    }
    fn serialize_unit(self) -> Result<()> {
        Err(key_error())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(key_error())
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(key_error())
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_error())
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_error())
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_error())
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_error())
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_error())
    }
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_error())
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_error())
    }
}

fn key_error() -> Error {
    Error::Custom("document keys must be strings".into())
}
