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

//! A scripted DBGp debug engine
//!
//! [`MockDebuggee`] connects to a listening client the way Xdebug does, sends
//! its `init` packet and then answers commands from a script of
//! [`MockStop`]s. Every `run` moves to the next stop; once the script is
//! exhausted the engine reports `stopping`, and the `run` after that ends the
//! connection with `stopped`.
//!
//! All commands received are returned so tests can assert on the exact
//! conversation.

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use eyre::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::{debug, info};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="iso-8859-1"?>"#;
const NAMESPACES: &str =
    r#"xmlns="urn:debugger_protocol_v1" xmlns:xdebug="https://xdebug.org/dbgp/xdebug""#;

/// A property as the mock engine reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockProperty {
    fullname: String,
    kind: String,
    address: Option<String>,
    classname: Option<String>,
    value: Option<String>,
    children: Vec<MockProperty>,
}

impl MockProperty {
    fn new(fullname: &str, kind: &str, value: Option<String>) -> Self {
        Self {
            fullname: fullname.to_string(),
            kind: kind.to_string(),
            address: None,
            classname: None,
            value,
            children: Vec::new(),
        }
    }

    /// A string; its value is sent base64-encoded
    pub fn string(fullname: &str, value: &str) -> Self {
        Self::new(fullname, "string", Some(value.to_string()))
    }

    /// An integer
    pub fn int(fullname: &str, value: i64) -> Self {
        Self::new(fullname, "int", Some(value.to_string()))
    }

    /// A variable that is in scope but not yet assigned
    pub fn uninitialized(fullname: &str) -> Self {
        Self::new(fullname, "uninitialized", None)
    }

    /// An array; add elements with [`MockProperty::child`]
    pub fn array(fullname: &str) -> Self {
        Self::new(fullname, "array", None)
    }

    /// An object of class `classname`
    pub fn object(fullname: &str, classname: &str) -> Self {
        Self { classname: Some(classname.to_string()), ..Self::new(fullname, "object", None) }
    }

    /// Report the property at `address`
    pub fn at(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Add an element or member
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Fully qualified name
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// The `name` attribute: the last access step of the full name
    fn short_name(&self) -> &str {
        if let Some((_, member)) = self.fullname.rsplit_once("->") {
            return member;
        }
        if self.fullname.ends_with(']') {
            if let Some((_, key)) = self.fullname.rsplit_once('[') {
                return key.trim_end_matches(']');
            }
        }
        &self.fullname
    }

    fn find(&self, fullname: &str) -> Option<&Self> {
        if self.fullname == fullname {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(fullname))
    }

    /// The `<property>` element, with the direct children nested one level
    /// deep when `with_children` is set.
    fn descriptor(&self, with_children: bool) -> String {
        let mut xml = format!(
            r#"<property name="{}" fullname="{}" type="{}""#,
            escape(self.short_name()),
            escape(&self.fullname),
            self.kind
        );
        if let Some(classname) = &self.classname {
            xml.push_str(&format!(r#" classname="{}""#, escape(classname)));
        }
        if let Some(address) = &self.address {
            xml.push_str(&format!(r#" address="{address}""#));
        }
        if !self.children.is_empty() {
            xml.push_str(&format!(r#" children="1" numchildren="{}""#, self.children.len()));
        }
        match (&self.value, self.kind.as_str()) {
            (Some(value), "string") => {
                xml.push_str(&format!(
                    r#" size="{}" encoding="base64"><![CDATA[{}]]>"#,
                    value.len(),
                    STANDARD.encode(value)
                ));
            }
            (Some(value), _) => xml.push_str(&format!("><![CDATA[{value}]]>")),
            (None, _) => xml.push('>'),
        }
        if with_children {
            for child in &self.children {
                xml.push_str(&child.descriptor(false));
            }
        }
        xml.push_str("</property>");
        xml
    }
}

/// One place the mock engine breaks at, with the variables in scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockStop {
    file: String,
    line: u32,
    properties: Vec<MockProperty>,
    raw_replies: HashMap<String, String>,
}

impl MockStop {
    /// Break at `line` of `file` (a file URI, as Xdebug reports it)
    pub fn new(file: &str, line: u32) -> Self {
        Self { file: file.to_string(), line, properties: Vec::new(), raw_replies: HashMap::new() }
    }

    /// Put a top-level variable in scope
    pub fn with(mut self, property: MockProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Answer `property_get` for `fullname` with `xml` verbatim
    pub fn with_raw_reply(mut self, fullname: &str, xml: &str) -> Self {
        self.raw_replies.insert(fullname.to_string(), xml.to_string());
        self
    }

    fn find(&self, fullname: &str) -> Option<&MockProperty> {
        self.properties.iter().find_map(|property| property.find(fullname))
    }

    fn break_reply(&self, transaction_id: u64) -> String {
        format!(
            r#"<response {NAMESPACES} command="run" transaction_id="{transaction_id}" status="break" reason="ok"><xdebug:message filename="{}" lineno="{}"></xdebug:message></response>"#,
            escape(&self.file),
            self.line
        )
    }

    fn context_reply(&self, transaction_id: u64) -> String {
        let descriptors: String =
            self.properties.iter().map(|property| property.descriptor(true)).collect();
        format!(
            r#"<response {NAMESPACES} command="context_get" transaction_id="{transaction_id}" context="0">{descriptors}</response>"#
        )
    }

    fn property_reply(&self, transaction_id: u64, fullname: &str) -> String {
        if let Some(raw) = self.raw_replies.get(fullname) {
            return raw.clone();
        }
        match self.find(fullname) {
            Some(property) => format!(
                r#"<response {NAMESPACES} command="property_get" transaction_id="{transaction_id}">{}</response>"#,
                property.descriptor(true)
            ),
            None => error_reply("property_get", transaction_id, 300, "can not get property"),
        }
    }
}

/// A command as the mock engine received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedCommand {
    /// Command name, e.g. `breakpoint_set`
    pub name: String,
    /// Everything between the name and the transaction id
    pub arguments: String,
    /// Value of `-i`
    pub transaction_id: Option<u64>,
}

impl ReceivedCommand {
    fn parse(raw: &str) -> Self {
        let (body, transaction_id) = match raw.rsplit_once(" -i ") {
            Some((body, id)) => (body, id.trim().parse().ok()),
            None => (raw, None),
        };
        let (name, arguments) = body.split_once(' ').unwrap_or((body, ""));
        Self { name: name.to_string(), arguments: arguments.to_string(), transaction_id }
    }

    /// Value following `flag`, with DBGp quoting removed
    pub fn argument(&self, flag: &str) -> Option<String> {
        let tokens = tokenize(&self.arguments);
        let position = tokens.iter().position(|token| token == flag)?;
        tokens.get(position + 1).cloned()
    }
}

/// Split command arguments on spaces, honouring double quotes and `\` escapes
fn tokenize(arguments: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = arguments.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => current.extend(chars.next()),
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ' ' if !in_quotes => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    tokens
}

/// A debug engine playing back a script of stops
#[derive(Debug, Clone)]
pub struct MockDebuggee {
    file_uri: String,
    stops: VecDeque<MockStop>,
    hang_up_on_run: bool,
}

impl MockDebuggee {
    /// An engine debugging the script at `file_uri`
    pub fn new(file_uri: &str) -> Self {
        Self { file_uri: file_uri.to_string(), stops: VecDeque::new(), hang_up_on_run: false }
    }

    /// Append a stop to the script
    pub fn stop(mut self, stop: MockStop) -> Self {
        self.stops.push_back(stop);
        self
    }

    /// Close the connection instead of answering the first `run`
    pub fn hang_up_on_run(mut self) -> Self {
        self.hang_up_on_run = true;
        self
    }

    /// Connect to a client listening on `address` and play the script
    pub async fn connect(self, address: SocketAddr) -> Result<Vec<ReceivedCommand>> {
        let stream = TcpStream::connect(address)
            .await
            .wrap_err_with(|| format!("Mock debuggee could not connect to {address}"))?;
        self.serve(stream).await
    }

    /// Play the script over an established stream
    pub async fn serve<S>(mut self, stream: S) -> Result<Vec<ReceivedCommand>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);
        send(&mut stream, &self.init_packet()).await?;

        let mut received: Vec<ReceivedCommand> = Vec::new();
        let mut current: Option<MockStop> = None;
        let mut stopping = false;

        loop {
            let mut raw = Vec::new();
            if stream.read_until(0, &mut raw).await? == 0 {
                debug!("Client closed the connection");
                break;
            }
            if raw.last() == Some(&0) {
                raw.pop();
            }
            let command = ReceivedCommand::parse(&String::from_utf8_lossy(&raw));
            debug!(?command, "Mock debuggee received command");
            let transaction_id = command.transaction_id.unwrap_or_default();

            let mut finished = false;
            let reply = match command.name.as_str() {
                "breakpoint_set" => {
                    let id = received.iter().filter(|c| c.name == "breakpoint_set").count() + 1;
                    Some(format!(
                        r#"<response {NAMESPACES} command="breakpoint_set" transaction_id="{transaction_id}" id="{id}" state="enabled"></response>"#
                    ))
                }
                "run" if self.hang_up_on_run => None,
                "run" => match self.stops.pop_front() {
                    Some(stop) => {
                        let reply = stop.break_reply(transaction_id);
                        current = Some(stop);
                        Some(reply)
                    }
                    None if !stopping => {
                        stopping = true;
                        current = None;
                        Some(status_reply(transaction_id, "stopping"))
                    }
                    None => {
                        finished = true;
                        Some(status_reply(transaction_id, "stopped"))
                    }
                },
                "context_get" => Some(match &current {
                    Some(stop) => stop.context_reply(transaction_id),
                    None => format!(
                        r#"<response {NAMESPACES} command="context_get" transaction_id="{transaction_id}" context="0"></response>"#
                    ),
                }),
                "property_get" => {
                    let name = command.argument("-n").unwrap_or_default();
                    Some(match &current {
                        Some(stop) => stop.property_reply(transaction_id, &name),
                        None => error_reply("property_get", transaction_id, 5, "not at a break"),
                    })
                }
                other => Some(error_reply(other, transaction_id, 4, "unimplemented command")),
            };
            received.push(command);

            match reply {
                Some(reply) => send(&mut stream, &reply).await?,
                None => {
                    info!("Mock debuggee hanging up");
                    break;
                }
            }
            if finished {
                break;
            }
        }

        Ok(received)
    }

    fn init_packet(&self) -> String {
        format!(
            r#"<init {NAMESPACES} fileuri="{}" language="PHP" xdebug:language_version="8.3.0" protocol_version="1.0" appid="4242" idekey="pdl"><engine version="3.3.1"><![CDATA[Xdebug]]></engine></init>"#,
            escape(&self.file_uri)
        )
    }
}

fn status_reply(transaction_id: u64, status: &str) -> String {
    format!(
        r#"<response {NAMESPACES} command="run" transaction_id="{transaction_id}" status="{status}" reason="ok"></response>"#
    )
}

fn error_reply(command: &str, transaction_id: u64, code: u32, message: &str) -> String {
    format!(
        r#"<response {NAMESPACES} command="{command}" transaction_id="{transaction_id}"><error code="{code}"><message><![CDATA[{message}]]></message></error></response>"#
    )
}

/// Frame one message: decimal length, NUL, XML document, NUL
async fn send<S: AsyncWrite + Unpin>(stream: &mut S, xml: &str) -> Result<()> {
    let payload = format!("{XML_DECLARATION}\n{xml}");
    let frame = format!("{}\0{payload}\0", payload.len());
    stream.write_all(frame.as_bytes()).await.wrap_err("Mock debuggee failed to send")?;
    stream.flush().await.wrap_err("Mock debuggee failed to send")?;
    Ok(())
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_splits_transaction_id() {
        let command = ReceivedCommand::parse("breakpoint_set -t line -f index.php -n 4 -i 2");
        assert_eq!(command.name, "breakpoint_set");
        assert_eq!(command.arguments, "-t line -f index.php -n 4");
        assert_eq!(command.transaction_id, Some(2));
        assert_eq!(command.argument("-n").as_deref(), Some("4"));
        assert_eq!(command.argument("-f").as_deref(), Some("index.php"));
    }

    #[test]
    fn test_argument_unquotes() {
        let command = ReceivedCommand::parse(r#"property_get -n "$arr[\"a b\"]" -i 7"#);
        assert_eq!(command.argument("-n").as_deref(), Some(r#"$arr["a b"]"#));
    }

    #[test]
    fn test_short_names() {
        assert_eq!(MockProperty::int("$x", 1).short_name(), "$x");
        assert_eq!(MockProperty::int("$o->count", 1).short_name(), "count");
        assert_eq!(MockProperty::int("$a[0]", 1).short_name(), "0");
        assert_eq!(MockProperty::int("$a['k']", 1).short_name(), "'k'");
    }

    #[test]
    fn test_descriptor_nests_one_level() {
        let property = MockProperty::array("$a")
            .at("0x1")
            .child(MockProperty::array("$a[0]").child(MockProperty::int("$a[0][0]", 1)));
        let xml = property.descriptor(true);
        assert!(xml.contains(r#"fullname="$a[0]""#));
        assert!(!xml.contains(r#"fullname="$a[0][0]""#));
        assert!(xml.contains(r#"address="0x1""#));
    }

    #[test]
    fn test_string_value_is_base64() {
        let xml = MockProperty::string("$s", "hi").descriptor(false);
        assert!(xml.contains("<![CDATA[aGk=]]>"));
        assert!(xml.contains(r#"encoding="base64""#));
    }
}
