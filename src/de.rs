// ABOUTME: Serde Deserializer implementation for BSON decoding.
// ABOUTME: Drives the pull decoder; map keys and strings borrow from the input.

use crate::decoder::{Decoder, Element, UnitStart};
use crate::error::{Error, Result};
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::de::Deserializer as _;
use serde::Deserialize;

/// A serde Deserializer that reads BSON.
pub struct Deserializer<'de> {
    decoder: Decoder<'de>,
}

impl<'de> Deserializer<'de> {
    /// Create a new Deserializer from a byte slice.
    #[must_use]
    pub fn from_slice(data: &'de [u8]) -> Self {
        Self {
            decoder: Decoder::new(data),
        }
    }
}

/// Deserialize a value from a BSON byte slice.
///
/// The top-level unit is a document; it drives a map visitor unless a
/// sequence is requested, in which case its keys are taken as array
/// indices. Trailing bytes after the unit are an error.
///
/// # Errors
///
/// Returns an error if the data is malformed, truncated, uses an
/// unsupported element type, or does not match the expected type `T`.
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    let mut de = Deserializer::from_slice(data);
    let value = T::deserialize(&mut de)?;
    de.decoder.finish()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decoder.begin_unit()? {
            UnitStart::Absent => visitor.visit_map(DocAccess::absent(self)),
            UnitStart::Open => visitor.visit_map(DocAccess::new(self)),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decoder.begin_unit()? {
            UnitStart::Absent => visitor.visit_seq(ArrAccess::absent(self)),
            UnitStart::Open => visitor.visit_seq(ArrAccess::new(self)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf option unit unit_struct newtype_struct map struct enum
        identifier ignored_any
    }
}

/// MapAccess over one document unit.
struct DocAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    /// Payload of the element whose key was just handed out.
    pending: Option<Element<'de>>,
    /// An absent unit visits as an empty map with nothing to close.
    absent: bool,
}

impl<'a, 'de> DocAccess<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        Self {
            de,
            pending: None,
            absent: false,
        }
    }

    fn absent(de: &'a mut Deserializer<'de>) -> Self {
        Self {
            de,
            pending: None,
            absent: true,
        }
    }
}

impl<'de> MapAccess<'de> for DocAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.absent {
            return Ok(None);
        }
        match self.de.decoder.next_element()? {
            None => {
                self.de.decoder.end_unit()?;
                Ok(None)
            }
            Some((key, element)) => {
                self.pending = Some(element);
                seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
            }
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let element = self
            .pending
            .take()
            .ok_or_else(|| Error::Custom("value requested before key".into()))?;
        seed.deserialize(ElementDeserializer {
            de: self.de,
            element,
        })
    }
}

/// SeqAccess over one array unit.
///
/// Elements are taken in arrival order; a streaming layer cannot sort by
/// parsed index the way the Value-tree decoder does. Index keys are not
/// interpreted here.
struct ArrAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    absent: bool,
}

impl<'a, 'de> ArrAccess<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>) -> Self {
        Self { de, absent: false }
    }

    fn absent(de: &'a mut Deserializer<'de>) -> Self {
        Self { de, absent: true }
    }
}

impl<'de> SeqAccess<'de> for ArrAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.absent {
            return Ok(None);
        }
        match self.de.decoder.next_element()? {
            None => {
                self.de.decoder.end_unit()?;
                Ok(None)
            }
            Some((_key, element)) => seed
                .deserialize(ElementDeserializer {
                    de: self.de,
                    element,
                })
                .map(Some),
        }
    }
}

/// Deserializer for one already-read element payload.
struct ElementDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    element: Element<'de>,
}

impl<'de> de::Deserializer<'de> for ElementDeserializer<'_, 'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element {
            Element::Double(v) => visitor.visit_f64(v),
            Element::String(s) => visitor.visit_borrowed_str(s),
            Element::DocumentStart => match self.de.decoder.begin_unit()? {
                UnitStart::Absent => visitor.visit_map(DocAccess::absent(self.de)),
                UnitStart::Open => visitor.visit_map(DocAccess::new(self.de)),
            },
            Element::ArrayStart => match self.de.decoder.begin_unit()? {
                UnitStart::Absent => visitor.visit_seq(ArrAccess::absent(self.de)),
                UnitStart::Open => visitor.visit_seq(ArrAccess::new(self.de)),
            },
            Element::Binary { bytes, .. } => visitor.visit_borrowed_bytes(bytes),
            Element::ObjectId(oid) => visitor.visit_bytes(&oid.bytes()),
            Element::Boolean(b) => visitor.visit_bool(b),
            Element::Datetime(dt) => visitor.visit_i64(dt.timestamp_millis()),
            Element::Null => visitor.visit_unit(),
            Element::Regex { .. } => {
                Err(Error::Custom("regex has no serde representation".into()))
            }
            Element::Int32(n) => visitor.visit_i32(n),
            Element::Int64(n) => visitor.visit_i64(n),
            Element::MinKey => Err(Error::Custom("minkey has no serde representation".into())),
            Element::MaxKey => Err(Error::Custom("maxkey has no serde representation".into())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element {
            Element::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.element {
            // Unit variant: just the variant name
            Element::String(s) => visitor.visit_enum(s.into_deserializer()),
            // Other variants: {variant: value}
            Element::DocumentStart => match self.de.decoder.begin_unit()? {
                UnitStart::Absent => Err(Error::Custom("expected enum document".into())),
                UnitStart::Open => visitor.visit_enum(DocEnumAccess { de: self.de }),
            },
            _ => Err(Error::Custom("expected string or document for enum".into())),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

/// EnumAccess over a single-key `{variant: value}` document.
struct DocEnumAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> de::EnumAccess<'de> for DocEnumAccess<'a, 'de> {
    type Error = Error;
    type Variant = DocVariantAccess<'a, 'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        match self.de.decoder.next_element()? {
            None => Err(Error::Custom("expected enum variant".into())),
            Some((key, element)) => {
                let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(key))?;
                Ok((
                    variant,
                    DocVariantAccess {
                        de: self.de,
                        element,
                    },
                ))
            }
        }
    }
}

struct DocVariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    element: Element<'de>,
}

impl<'a, 'de> DocVariantAccess<'a, 'de> {
    /// Close the `{variant: value}` wrapper after the payload is consumed.
    fn close(de: &mut Deserializer<'de>) -> Result<()> {
        if de.decoder.next_element()?.is_some() {
            return Err(Error::Custom("enum document has more than one key".into()));
        }
        de.decoder.end_unit()
    }
}

impl<'de> de::VariantAccess<'de> for DocVariantAccess<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.element {
            Element::Null => Self::close(self.de),
            _ => Err(Error::Custom("expected unit variant".into())),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        let value = seed.deserialize(ElementDeserializer {
            de: self.de,
            element: self.element,
        })?;
        Self::close(self.de)?;
        Ok(value)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        let value = ElementDeserializer {
            de: self.de,
            element: self.element,
        }
        .deserialize_any(visitor)?;
        Self::close(self.de)?;
        Ok(value)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let value = ElementDeserializer {
            de: self.de,
            element: self.element,
        }
        .deserialize_any(visitor)?;
        Self::close(self.de)?;
        Ok(value)
    }
}
