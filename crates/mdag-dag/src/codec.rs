//! Canonical wire encoding of DAG objects.
//!
//! An object is serialized as compact JSON with exactly two fields in fixed
//! order, byte-for-byte what Go's `encoding/json` emits for
//! `struct { Links []Link; Data []byte }`:
//!
//! ```text
//! {"Links":[{"Name":"a.txt","Hash":"<base64>","Size":10}],"Data":"YmxvYg=="}
//! {"Links":null,"Data":"YWJjZGVmZ2hpag=="}
//! ```
//!
//! - byte sequences are standard padded base64;
//! - an empty `Links` or `Data` is `null`;
//! - `<`, `>`, `&`, U+2028 and U+2029 inside strings are `\u`-escaped.
//!
//! Decoding is lenient about `null` versus `""`/`[]`; encoding is not.

use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mdag_types::ObjectId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::object::Link;

/// JSON formatter that escapes strings the way Go's `encoding/json` does.
///
/// Everything else is the compact default.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoJsonFormatter;

impl serde_json::ser::Formatter for GoJsonFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escape: &[u8] = match ch {
                '<' => b"\\u003c",
                '>' => b"\\u003e",
                '&' => b"\\u0026",
                '\u{2028}' => b"\\u2028",
                '\u{2029}' => b"\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escape)?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[derive(Serialize)]
struct WireObject<'a> {
    #[serde(rename = "Links", serialize_with = "links_or_null")]
    links: Vec<&'a Link>,
    #[serde(rename = "Data", serialize_with = "bytes_or_null")]
    data: &'a [u8],
}

/// An object as it appears on the wire, before its category is applied.
#[derive(Debug, Deserialize)]
pub(crate) struct RawObject {
    #[serde(rename = "Links", default, deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
    #[serde(rename = "Data", default, deserialize_with = "base64_or_null")]
    pub data: Vec<u8>,
}

/// Serialize `{Links, Data}` canonically.
pub(crate) fn encode_object(links: Vec<&Link>, data: &[u8]) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 3 * 4 + 32 + links.len() * 96);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, GoJsonFormatter);
    WireObject { links, data }.serialize(&mut ser)?;
    Ok(out)
}

pub(crate) fn decode_object(bytes: &[u8]) -> serde_json::Result<RawObject> {
    serde_json::from_slice(bytes)
}

fn links_or_null<S: Serializer>(links: &[&Link], s: S) -> Result<S::Ok, S::Error> {
    if links.is_empty() {
        s.serialize_none()
    } else {
        links.serialize(s)
    }
}

fn bytes_or_null<S: Serializer>(data: &[u8], s: S) -> Result<S::Ok, S::Error> {
    if data.is_empty() {
        s.serialize_none()
    } else {
        s.serialize_str(&STANDARD.encode(data))
    }
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

fn base64_or_null<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    match Option::<String>::deserialize(d)? {
        None => Ok(Vec::new()),
        Some(s) => STANDARD.decode(s.as_bytes()).map_err(D::Error::custom),
    }
}

/// `Link::name`: absent names are written as `""` and read back as `None`.
pub(crate) mod link_name {
    use super::*;

    pub fn serialize<S: Serializer>(name: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(name.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let name = Option::<String>::deserialize(d)?;
        Ok(name.filter(|n| !n.is_empty()))
    }
}

/// `Link::hash`: base64 of the raw digest.
pub(crate) mod link_hash {
    use super::*;

    pub fn serialize<S: Serializer>(id: &ObjectId, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(id.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ObjectId, D::Error> {
        let encoded = String::deserialize(d)?;
        let bytes = STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)?;
        ObjectId::from_slice(&bytes).map_err(D::Error::custom)
    }
}
