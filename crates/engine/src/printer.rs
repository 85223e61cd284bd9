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

//! Snapshot rendering

use std::collections::HashSet;

use crate::{graph::Snapshot, variable::is_top_level};

/// Indentation added per nesting level
pub const INDENT: &str = "  ";

/// Render a snapshot as `name: value` lines, children indented below their
/// parent in the order the engine listed them.
///
/// Only top-level names start a tree. References end their branch, and
/// children that were ignored during reconstruction are left out. Each name
/// is printed at most once.
pub fn render(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.len());
    let mut printed = HashSet::new();

    for root in snapshot.names().filter(|name| is_top_level(name)) {
        let mut pending = vec![(root, 0usize)];
        while let Some((name, depth)) = pending.pop() {
            let Some(entry) = snapshot.get(name) else {
                continue;
            };
            if !printed.insert(name) {
                continue;
            }
            lines.push(format!("{}{name}: {}", INDENT.repeat(depth), entry.display_value()));
            pending.extend(entry.children().iter().rev().map(|child| (child.as_str(), depth + 1)));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{
            tests::{roots, FixtureSource},
            GraphReconstructor,
        },
        variable::VariableKind,
    };

    async fn render_fixture(source: &mut FixtureSource, names: &[&str]) -> Vec<String> {
        let snapshot =
            GraphReconstructor::new().reconstruct(source, roots(names), |_| false).await.unwrap();
        render(&snapshot)
    }

    #[tokio::test]
    async fn test_aliased_scalar() {
        let mut source = FixtureSource::default()
            .with("$a", VariableKind::String, "x", Some("0x1"), &[])
            .with("$b", VariableKind::String, "x", Some("0x1"), &[]);

        assert_eq!(render_fixture(&mut source, &["$a", "$b"]).await, ["$a: x", "$b: (Reference to $a)"]);
    }

    #[tokio::test]
    async fn test_array_children_are_indented() {
        let mut source = FixtureSource::default()
            .with("$arr", VariableKind::Array, "array()", Some("0x1"), &["$arr[0]"])
            .with("$arr[0]", VariableKind::String, "y", Some("0x2"), &[]);

        assert_eq!(render_fixture(&mut source, &["$arr"]).await, ["$arr: array()", "  $arr[0]: y"]);
    }

    #[tokio::test]
    async fn test_nested_tree_keeps_child_order() {
        let mut source = FixtureSource::default()
            .with("$o", VariableKind::Object, "Order()", Some("0x1"), &["$o->items", "$o->total"])
            .with("$o->items", VariableKind::Array, "array()", Some("0x2"), &["$o->items[0]", "$o->items[1]"])
            .with("$o->items[0]", VariableKind::String, "apple", Some("0x3"), &[])
            .with("$o->items[1]", VariableKind::String, "pear", Some("0x4"), &[])
            .with("$o->total", VariableKind::Scalar, "2", Some("0x5"), &[])
            .with("$n", VariableKind::Scalar, "3", Some("0x6"), &[]);

        assert_eq!(
            render_fixture(&mut source, &["$o", "$n"]).await,
            [
                "$o: Order()",
                "  $o->items: array()",
                "    $o->items[0]: apple",
                "    $o->items[1]: pear",
                "  $o->total: 2",
                "$n: 3",
            ]
        );
    }

    #[tokio::test]
    async fn test_self_reference_ends_branch() {
        let mut source = FixtureSource::default()
            .with("$node", VariableKind::Object, "Node()", Some("0x1"), &["$node->next"])
            .with("$node->next", VariableKind::Object, "Node()", Some("0x1"), &["$node->next->next"]);

        assert_eq!(
            render_fixture(&mut source, &["$node"]).await,
            ["$node: Node()", "  $node->next: (Reference to $node)"]
        );
    }

    #[tokio::test]
    async fn test_ignored_children_are_skipped() {
        let mut source = FixtureSource::default()
            .with("$u", VariableKind::Object, "User()", Some("0x1"), &["$u->password", "$u->name"])
            .with("$u->password", VariableKind::String, "secret", Some("0x2"), &[])
            .with("$u->name", VariableKind::String, "bob", Some("0x3"), &[]);

        let snapshot = GraphReconstructor::new()
            .reconstruct(&mut source, roots(&["$u"]), |name| name == "$u->password")
            .await
            .unwrap();

        assert_eq!(render(&snapshot), ["$u: User()", "  $u->name: bob"]);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(render(&Snapshot::default()).is_empty());
    }
}
