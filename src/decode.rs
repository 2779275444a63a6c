//! Turns the provider's XML body into a [`RateTable`].
//!
//! The body is first transcoded according to the charset named in its XML prolog, then the prolog
//! is dropped and the remaining document is handed to the structural parser as UTF-8.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1251;
use jiff::civil::Date;
use serde::{Deserialize, Deserializer, de};
use tracing::{debug, warn};

use crate::Error;
use crate::table::{RateEntry, RateTable};

/// Format of the `Date` attribute on `ValCurs`.
const TABLE_DATE_FORMAT: &str = "%d.%m.%Y";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub type Transcoder = fn(&[u8]) -> Cow<'_, [u8]>;

/// Declared charset name (lowercase) to the step that makes the body UTF-8.
const CHARSETS: &[(&str, Transcoder)] = &[
    ("utf-8", passthrough),
    ("utf8", passthrough),
    ("us-ascii", passthrough),
    ("ascii", passthrough),
    ("windows-1251", windows_1251),
    ("cp1251", windows_1251),
];

fn passthrough(bytes: &[u8]) -> Cow<'_, [u8]> {
    Cow::Borrowed(bytes)
}

fn windows_1251(bytes: &[u8]) -> Cow<'_, [u8]> {
    let (text, had_errors) = WINDOWS_1251.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("windows-1251 body contains unmapped bytes, replaced with U+FFFD");
    }
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Look up the transcoder for a declared charset; no declaration means UTF-8.
pub fn transcoder_for(charset: Option<&str>) -> Result<Transcoder, Error> {
    let Some(charset) = charset else {
        return Ok(passthrough);
    };
    CHARSETS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(charset))
        .map(|(_, transcode)| *transcode)
        .ok_or_else(|| Error::UnsupportedCharset(charset.to_string()))
}

/// The `<?xml ... ?>` declaration at the head of a document, if there is one.
struct Prolog<'a> {
    encoding: Option<&'a str>,
    /// Everything after the closing `?>`.
    rest: &'a [u8],
}

impl<'a> Prolog<'a> {
    fn split(bytes: &'a [u8]) -> Option<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
        let head = bytes[start..].strip_prefix(b"<?xml")?;
        // `<?xml-stylesheet ...?>` and friends are processing instructions, not the declaration.
        if !head.first().is_some_and(u8::is_ascii_whitespace) {
            return None;
        }
        let end = head.windows(2).position(|w| w == b"?>")?;
        Some(Self {
            encoding: pseudo_attribute(&head[..end], "encoding"),
            rest: &head[end + 2..],
        })
    }
}

/// Value of `name="..."` (or single-quoted) inside an XML declaration.
fn pseudo_attribute<'a>(decl: &'a [u8], name: &str) -> Option<&'a str> {
    let decl = std::str::from_utf8(decl).ok()?;
    let mut search = decl;
    while let Some(pos) = search.find(name) {
        let after = search[pos + name.len()..].trim_start();
        search = &search[pos + name.len()..];
        let Some(after) = after.strip_prefix('=') else {
            continue;
        };
        let after = after.trim_start();
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let value = &after[1..];
        return value.find(quote).map(|end| &value[..end]);
    }
    None
}

/// Charset named in the document's XML declaration, if any.
pub fn declared_charset(bytes: &[u8]) -> Option<&str> {
    Prolog::split(bytes).and_then(|prolog| prolog.encoding)
}

/// Decode a daily rate table from a raw response body.
pub fn decode_rate_table(bytes: &[u8]) -> Result<RateTable, Error> {
    let (charset, document) = match Prolog::split(bytes) {
        Some(prolog) => (prolog.encoding, prolog.rest),
        None => (None, bytes),
    };
    let transcode = transcoder_for(charset)?;
    debug!(charset = charset.unwrap_or("utf-8 (undeclared)"), "decoding rate table");

    let document = transcode(document);
    let curs: XmlValCurs = serde_xml_rs::from_reader(document.as_ref())?;

    let table = RateTable {
        date: curs.date,
        entries: curs.valutes.into_iter().map(RateEntry::from).collect(),
    };
    debug!(entries = table.entries.len(), date = ?table.date, "decoded rate table");
    Ok(table)
}

#[derive(Deserialize, Debug)]
struct XmlValCurs {
    #[serde(rename = "Date", default, deserialize_with = "table_date_deserializer")]
    date: Option<Date>,
    #[serde(rename = "Valute")]
    valutes: Vec<XmlValute>,
}

#[derive(Deserialize, Debug)]
struct XmlValute {
    #[serde(rename = "NumCode", default)]
    num_code: Option<String>,
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal", default)]
    nominal: Option<u32>,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: String,
}

impl From<XmlValute> for RateEntry {
    fn from(valute: XmlValute) -> Self {
        RateEntry {
            code: valute.char_code,
            name: valute.name,
            value: valute.value,
            nominal: valute.nominal,
            num_code: valute.num_code,
        }
    }
}

// The provider writes the table date as DD.MM.YYYY rather than ISO 8601.
fn table_date_deserializer<'de, D>(d: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    Date::strptime(TABLE_DATE_FORMAT, s.trim())
        .map(Some)
        .map_err(de::Error::custom)
}
