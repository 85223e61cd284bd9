// PDL - PHP Debug Log
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Helpers for reading DBGp XML responses

use roxmltree::{Document, Node};

use super::error::{DbgpError, DbgpResult};

/// Decode a response payload into text.
///
/// Engines declare `iso-8859-1` in the XML prolog but some emit UTF-8 anyway;
/// valid UTF-8 is taken as-is and anything else is read as Latin-1.
pub fn decode_payload(payload: Vec<u8>) -> String {
    match String::from_utf8(payload) {
        Ok(text) => text,
        Err(err) => latin1(err.as_bytes()),
    }
}

/// Interpret bytes as Latin-1 text
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Parse a response document
pub fn parse(text: &str) -> DbgpResult<Document<'_>> {
    Ok(Document::parse(text)?)
}

/// Every `property` element of a response, in document order.
///
/// Nested children come right after their parent, so for a `property_get`
/// reply the first item describes the requested variable and the rest its
/// immediate children.
pub fn properties<'a, 'input>(
    document: &'a Document<'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    document.descendants().filter(|node| node.has_tag_name("property"))
}

/// Fully qualified name of a property, falling back to its short name
pub fn property_name<'a>(property: &Node<'a, '_>) -> Option<&'a str> {
    property.attribute("fullname").or_else(|| property.attribute("name"))
}

/// First element with the given local name, whatever its namespace
pub fn first_element<'a, 'input>(
    document: &'a Document<'input>,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    document
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == local_name)
}

/// The `status` attribute of the root `response` element
pub fn response_status<'a>(document: &'a Document<'_>) -> DbgpResult<&'a str> {
    first_element(document, "response")
        .and_then(|response| response.attribute("status"))
        .ok_or_else(|| DbgpError::Malformed("response carries no status".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names_prefer_fullname() {
        let xml = r#"<response xmlns="urn:debugger_protocol_v1" command="context_get">
            <property name="$a" fullname="$a" type="int">1</property>
            <property name="b" type="int">2</property>
        </response>"#;
        let document = parse(xml).unwrap();
        let names: Vec<_> = properties(&document).filter_map(|p| property_name(&p)).collect();
        assert_eq!(names, vec!["$a", "b"]);
    }

    #[test]
    fn test_namespaced_message_is_found() {
        let xml = r#"<response xmlns="urn:debugger_protocol_v1"
            xmlns:xdebug="https://xdebug.org/dbgp/xdebug" status="break" reason="ok">
            <xdebug:message filename="file:///var/www/index.php" lineno="4"/>
        </response>"#;
        let document = parse(xml).unwrap();
        assert_eq!(response_status(&document).unwrap(), "break");
        let message = first_element(&document, "message").unwrap();
        assert_eq!(message.attribute("lineno"), Some("4"));
    }

    #[test]
    fn test_missing_status_is_malformed() {
        let document = parse("<response/>").unwrap();
        assert!(matches!(response_status(&document), Err(DbgpError::Malformed(_))));
    }

    #[test]
    fn test_decode_payload_falls_back_to_latin1() {
        assert_eq!(decode_payload(b"caf\xc3\xa9".to_vec()), "café");
        assert_eq!(decode_payload(b"caf\xe9".to_vec()), "café");
    }
}
