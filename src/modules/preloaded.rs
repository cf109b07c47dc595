//! Conversion of preload results to JSON.
//!
//! The render data and the inline client copy are built from the same
//! conversion. When the value as a whole does not serialize (a map with
//! non-string keys somewhere inside, a `Serialize` impl that errors), the
//! top-level fields that do convert are still merged into the render data;
//! only the inline copy is dropped.

use serde::ser::{self, Impossible, Serialize, Serializer};
use serde_json::{Map, Value};

/// A preload result converted to JSON.
#[derive(Debug)]
pub enum Preloaded {
    /// The whole value converted.
    Complete(Value),
    /// Conversion failed; `fields` holds the top-level fields that did
    /// convert.
    Partial {
        fields: Map<String, Value>,
        error: serde_json::Error,
    },
}

impl Preloaded {
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Preloaded::Complete(value),
            Err(error) => Preloaded::Partial {
                fields: value.serialize(TopLevel).unwrap_or_default(),
                error,
            },
        }
    }

    /// The value to inline for the client, if the whole value converted.
    pub fn inline(&self) -> Option<&Value> {
        match self {
            Preloaded::Complete(value) => Some(value),
            Preloaded::Partial { .. } => None,
        }
    }

    /// Keys to merge into the render data. A non-object preload
    /// contributes none.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Preloaded::Complete(Value::Object(fields)) | Preloaded::Partial { fields, .. } => Some(fields),
            Preloaded::Complete(_) => None,
        }
    }
}

fn not_an_object() -> serde_json::Error {
    ser::Error::custom("preloaded value is not an object")
}

/// Serializes structs and maps field by field, keeping every field that
/// converts on its own. Anything else is rejected.
struct TopLevel;

macro_rules! reject {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Self::Ok, Self::Error> {
                Err(not_an_object())
            }
        )*
    };
}

impl Serializer for TopLevel {
    type Ok = Map<String, Value>;
    type Error = serde_json::Error;
    type SerializeSeq = Impossible<Self::Ok, Self::Error>;
    type SerializeTuple = Impossible<Self::Ok, Self::Error>;
    type SerializeTupleStruct = Impossible<Self::Ok, Self::Error>;
    type SerializeTupleVariant = Impossible<Self::Ok, Self::Error>;
    type SerializeMap = Fields;
    type SerializeStruct = Fields;
    type SerializeStructVariant = Impossible<Self::Ok, Self::Error>;

    reject! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(not_an_object())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(Fields::default())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(Fields::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(not_an_object())
    }
}

#[derive(Default)]
struct Fields {
    map: Map<String, Value>,
    key: Option<String>,
}

impl Fields {
    fn insert<T: ?Sized + Serialize>(&mut self, key: String, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.map.insert(key, value);
            }
            Err(e) => tracing::debug!(field = %key, error = %e, "Skipping unserializable preloaded field"),
        }
    }
}

impl ser::SerializeStruct for Fields {
    type Ok = Map<String, Value>;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error> {
        self.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.map)
    }
}

impl ser::SerializeMap for Fields {
    type Ok = Map<String, Value>;
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Self::Error> {
        // Same key forms serde_json accepts for objects.
        self.key = match serde_json::to_value(key) {
            Ok(Value::String(key)) => Some(key),
            Ok(Value::Number(n)) => Some(n.to_string()),
            Ok(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        if let Some(key) = self.key.take() {
            self.insert(key, value);
        }
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.map)
    }
}
