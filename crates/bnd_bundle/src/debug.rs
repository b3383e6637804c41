//! Debug string table embedded in development bundles
//!
//! The table is a null terminated XML fragment listing one `<Resource/>` element per entry:
//!
//! ```xml
//! <ResourceStringTable>
//!     <Resource Id="0d2a8b71" Name="gamedb://vehicles/list" TypeName="VehicleList"/>
//! </ResourceStringTable>
//! ```
//!
//! Only the attributes of those elements are of interest, so they are matched directly
//! instead of running the fragment through a full XML parser.

use indexmap::IndexMap;
use tracing::debug;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, repeat, separated_pair, terminated};
use winnow::token::{take_till, take_while};
use winnow::{PResult, Parser};

/// One `<Resource/>` element of the debug table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugResource {
    pub id: u64,
    pub name: String,
    pub type_name: String,
}

/// Parsed debug string table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugData {
    /// The table exactly as stored, without the terminator
    pub raw: Vec<u8>,

    /// Elements keyed by resource id, in document order
    pub resources: IndexMap<u64, DebugResource>,
}

impl DebugData {
    /// Parse the table from its raw bytes, stopping at the first null byte
    pub fn parse(data: &[u8]) -> Self {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        let raw = data[..end].to_vec();
        let text = String::from_utf8_lossy(&raw);

        let mut resources = IndexMap::new();
        for element in resource_elements(&text) {
            resources.entry(element.id).or_insert(element);
        }

        DebugData { raw, resources }
    }

    /// The table as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Name recorded for a resource
    pub fn name_of(&self, id: u64) -> Option<&str> {
        self.resources.get(&id).map(|r| r.name.as_str())
    }

    /// Type name recorded for a resource
    pub fn type_name_of(&self, id: u64) -> Option<&str> {
        self.resources.get(&id).map(|r| r.type_name.as_str())
    }
}

const ELEMENT_OPEN: &str = "<Resource";

fn attribute<'s>(input: &mut &'s str) -> PResult<(&'s str, &'s str)> {
    separated_pair(
        take_while(1.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ':'
        }),
        (multispace0, '=', multispace0),
        delimited('"', take_till(0.., '"'), '"'),
    )
    .parse_next(input)
}

fn resource_element<'s>(input: &mut &'s str) -> PResult<Vec<(&'s str, &'s str)>> {
    delimited(
        (ELEMENT_OPEN, multispace1),
        repeat(0.., terminated(attribute, multispace0)),
        alt(("/>", ">")),
    )
    .parse_next(input)
}

fn resource_elements(text: &str) -> Vec<DebugResource> {
    let mut result = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(ELEMENT_OPEN) {
        let mut input = &rest[start..];
        match resource_element.parse_next(&mut input) {
            Ok(attributes) => {
                if let Some(resource) = from_attributes(&attributes) {
                    result.push(resource);
                }
                rest = input;
            }
            Err(_) => rest = &rest[start + ELEMENT_OPEN.len()..],
        }
    }

    result
}

fn from_attributes(attributes: &[(&str, &str)]) -> Option<DebugResource> {
    let find = |key: &str| {
        attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| unescape(value))
    };

    let id_text = find("Id")?;
    let digits = id_text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let Ok(id) = u64::from_str_radix(digits, 16) else {
        debug!("skipping debug resource with unparseable id {id_text:?}");
        return None;
    };

    Some(DebugResource {
        id,
        name: find("Name").unwrap_or_default(),
        type_name: find("TypeName").unwrap_or_default(),
    })
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::debug::DebugData;

    #[test]
    fn parse_resource_table() {
        let input = b"<ResourceStringTable>\n\
            \t<Resource Id=\"0d2a8b71\" Name=\"gamedb://vehicles/list\" TypeName=\"VehicleList\"/>\n\
            \t<Resource Id=\"0x00000000DEADBEEF\" Name=\"a &amp; b\" TypeName=\"TriggerData\" />\n\
            </ResourceStringTable>\n\0garbage";

        let debug = DebugData::parse(input);

        assert_eq!(debug.resources.len(), 2);
        assert_eq!(debug.name_of(0x0d2a_8b71), Some("gamedb://vehicles/list"));
        assert_eq!(debug.type_name_of(0x0d2a_8b71), Some("VehicleList"));
        assert_eq!(debug.name_of(0xDEAD_BEEF), Some("a & b"));
        assert!(debug.text().ends_with("</ResourceStringTable>\n"));
        assert!(!debug.raw.contains(&0));
    }

    #[test]
    fn skip_broken_elements() {
        let input = b"<Resource Id=\"zz\" Name=\"bad\"/><Resource Name=\"no id\"/>\
            <Resource Id=\"12\" name=\"lower\" typename=\"x\"/>";

        let debug = DebugData::parse(input);

        assert_eq!(debug.resources.len(), 1);
        assert_eq!(debug.name_of(0x12), Some("lower"));
    }

    #[test]
    fn empty_table() {
        let debug = DebugData::parse(b"\0");
        assert!(debug.raw.is_empty());
        assert!(debug.resources.is_empty());
    }
}
