use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bitmap::ExtendedBitmap;
use crate::unit::Unit;

/// Serialized as a byte string holding the wire format of
/// [`ExtendedBitmap::serialize_into`].
impl<U: Unit> Serialize for ExtendedBitmap<U> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_bytes().map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de, U: Unit> Deserialize<'de> for ExtendedBitmap<U> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(BytesVisitor(PhantomData))
    }
}

struct BytesVisitor<U>(PhantomData<U>);

impl<'de, U: Unit> Visitor<'de> for BytesVisitor<U> {
    type Value = ExtendedBitmap<U>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a serialized extended bitmap")
    }

    fn visit_bytes<E: de::Error>(self, bytes: &[u8]) -> Result<Self::Value, E> {
        ExtendedBitmap::from_bytes(bytes).map_err(E::custom)
    }

    // Self-describing formats without a byte string type hand over a
    // sequence of integers instead.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        ExtendedBitmap::from_bytes(&bytes).map_err(de::Error::custom)
    }
}
