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

//! Variables as reported by `property_get`
//!
//! A `property_get` reply holds the requested property followed by its
//! immediate children. Only the first level is ever read; deeper levels are
//! fetched by name during graph reconstruction.

use std::fmt::{self, Display};

use base64::{engine::general_purpose::STANDARD, Engine};
use roxmltree::Node;
use tracing::debug;

use crate::dbgp::response::{latin1, parse, properties, property_name};

/// Display value of a property that could not be fetched or parsed
pub const ERROR_PLACEHOLDER: &str = "(could not get property)";

/// Display value of every array
pub const ARRAY_MARKER: &str = "array()";

/// Whether a name denotes a variable rather than a member or element access
pub fn is_top_level(name: &str) -> bool {
    !name.contains("->") && !name.contains('[')
}

/// Kind of a fetched property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// A string scalar
    String,
    /// Any other scalar: int, float, bool, null, resource, uninitialized
    Scalar,
    /// A PHP array
    Array,
    /// A PHP object
    Object,
    /// The property could not be fetched
    Error,
}

/// Issues identity placeholders `F1`, `F2`, ... for properties the engine
/// reports without an address.
#[derive(Debug, Default)]
pub struct PlaceholderAddresses {
    issued: u64,
}

impl PlaceholderAddresses {
    /// A fresh generator; the first placeholder is `F1`
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused placeholder
    pub fn issue(&mut self) -> String {
        self.issued += 1;
        format!("F{}", self.issued)
    }
}

/// One fetched property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    kind: VariableKind,
    display_value: String,
    address: String,
    children: Vec<String>,
}

impl Variable {
    /// Build a variable from its parts
    pub fn new(
        kind: VariableKind,
        display_value: impl Into<String>,
        address: impl Into<String>,
        children: Vec<String>,
    ) -> Self {
        Self { kind, display_value: display_value.into(), address: address.into(), children }
    }

    /// The variable standing in for a property that could not be read
    pub fn error(addresses: &mut PlaceholderAddresses) -> Self {
        Self::new(VariableKind::Error, ERROR_PLACEHOLDER, addresses.issue(), Vec::new())
    }

    /// Parse a `property_get` reply.
    ///
    /// Never fails: replies without properties, or with a first property that
    /// cannot be understood, produce an error-kind variable.
    pub fn from_response(response: &str, addresses: &mut PlaceholderAddresses) -> Self {
        let document = match parse(response) {
            Ok(document) => document,
            Err(err) => {
                debug!(%err, "Unparsable property reply");
                return Self::error(addresses);
            }
        };

        let mut descriptors = properties(&document);
        let Some(first) = descriptors.next() else {
            return Self::error(addresses);
        };

        let Some(display_value) = display_value(&first) else {
            debug!(name = ?property_name(&first), "Property descriptor could not be decoded");
            return Self::error(addresses);
        };
        let kind = match first.attribute("type") {
            Some("string") => VariableKind::String,
            Some("array") => VariableKind::Array,
            Some("object") => VariableKind::Object,
            _ => VariableKind::Scalar,
        };
        let address = match first.attribute("address") {
            Some(address) => address.to_string(),
            None => addresses.issue(),
        };
        let children =
            descriptors.filter_map(|child| property_name(&child)).map(str::to_string).collect();

        Self { kind, display_value, address, children }
    }

    /// Kind of the property
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Text shown for the property in a snapshot
    pub fn display_value(&self) -> &str {
        &self.display_value
    }

    /// Identity of the underlying storage cell
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Fully qualified names of the immediate children
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value)
    }
}

/// Display value of a descriptor, `None` when it is malformed
fn display_value(property: &Node<'_, '_>) -> Option<String> {
    let raw = property.text().unwrap_or_default();
    match property.attribute("type")? {
        "array" => Some(ARRAY_MARKER.to_string()),
        "object" => Some(format!("{}()", property.attribute("classname")?)),
        "string" => {
            let encoded: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let decoded = STANDARD.decode(encoded).ok()?;
            Some(latin1(&decoded))
        }
        _ => Some(raw.to_string()),
    }
}
