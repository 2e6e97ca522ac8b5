pub mod style;

use std::error::Error as StdError;

use crate::chain::walker::{Link, classify, fanout};
use crate::types::Metadata;
use style::{TraceStyle, Token};

/// Render `err` as a tree with the process-wide style.
pub fn trace(err: &(dyn StdError + 'static)) -> String {
    render(err, &style::global_style())
}

/// Render `err` as a tree.
///
/// The output starts with the banner row, has one row per message line and
/// per metadata entry, and carries no trailing newline:
///
/// ```text
///  ▼ [ERROR TRACE]
///  ├─ failed to register
///  ├─ failed to create user
///  │   ╰─ code: 503
///  ╰─ email in use
/// ```
pub fn render(err: &(dyn StdError + 'static), style: &TraceStyle) -> String {
    let mut tree = Tree {
        style,
        rows: Vec::new(),
    };
    tree.rows.push(style.paint(&style.banner, Token::Banner));
    tree.sequence(classify(err), "");
    tree.rows.join("\n")
}

struct Tree<'s> {
    style: &'s TraceStyle,
    rows: Vec<String>,
}

impl Tree<'_> {
    /// Links that follow each other at one level. The level ends with the
    /// first node without a cause, a foreign leaf, or a join's last member.
    fn sequence(&mut self, link: Link<'_>, gutter: &str) {
        match link {
            Link::Node(node) => {
                let last = node.cause().is_none();
                self.message(gutter, last, node.message());
                let nested = self.nested(gutter, last);
                self.metadata(&nested, node.metadata());
                if let Some(cause) = node.cause() {
                    self.sequence(cause.link(), gutter);
                }
            }
            Link::Join(causes) => {
                let members = fanout(causes);
                if let [only] = members.as_slice() {
                    self.sequence(*only, gutter);
                    return;
                }
                let count = members.len();
                for (i, member) in members.into_iter().enumerate() {
                    self.branch(member, gutter, i + 1 == count);
                }
            }
            Link::Foreign(err) => self.message(gutter, true, &err.to_string()),
        }
    }

    /// One member of a join. A node's cause chain continues one level below
    /// its row; its metadata sits one level further in while that chain
    /// runs alongside, so metadata and causes never share a column.
    fn branch(&mut self, link: Link<'_>, gutter: &str, last: bool) {
        match link {
            Link::Node(node) => {
                self.message(gutter, last, node.message());
                let nested = self.nested(gutter, last);
                match node.cause() {
                    Some(cause) => {
                        let meta_gutter = self.nested(&nested, false);
                        self.metadata(&meta_gutter, node.metadata());
                        self.sequence(cause.link(), &nested);
                    }
                    None => self.metadata(&nested, node.metadata()),
                }
            }
            Link::Join(_) | Link::Foreign(_) => self.message(gutter, last, &link.message()),
        }
    }

    /// Lines after the first always hang off the vertical glyph, even under
    /// a terminal connector.
    fn message(&mut self, gutter: &str, last: bool, text: &str) {
        let connector = self.connector(last);
        let continuation = self
            .style
            .paint(&self.style.glyphs.open_indent(), Token::Connector);
        for (i, line) in text.split('\n').enumerate() {
            let lead = if i == 0 { &connector } else { &continuation };
            let line = self.style.paint(line, Token::Message);
            self.rows.push(format!("{gutter}{lead}{line}"));
        }
    }

    fn metadata(&mut self, gutter: &str, meta: &Metadata) {
        let count = meta.len();
        for (i, (key, value)) in meta.iter().enumerate() {
            let last = i + 1 == count;
            let connector = self.connector(last);
            let key = self.style.paint(key, Token::Key);
            let value = value.to_string();

            if !value.contains('\n') {
                let value = self.style.paint(&value, Token::Value);
                self.rows.push(format!("{gutter}{connector}{key}: {value}"));
                continue;
            }

            self.rows.push(format!("{gutter}{connector}{key}:"));
            let hanging = format!("{}  ", self.nested(gutter, last));
            for line in value.split('\n') {
                let line = self.style.paint(line, Token::Value);
                self.rows.push(format!("{hanging}{line}"));
            }
        }
    }

    fn connector(&self, last: bool) -> String {
        self.style
            .paint(self.style.glyphs.connector(last), Token::Connector)
    }

    fn nested(&self, gutter: &str, last: bool) -> String {
        if last {
            format!("{gutter}{}", self.style.glyphs.closed_indent())
        } else {
            let open = self.style.glyphs.open_indent();
            format!("{gutter}{}", self.style.paint(&open, Token::Connector))
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::chain::{Cause, ErrorNode, PlainError, attach_meta, join, wrap};

    fn plain(err: &(dyn StdError + 'static)) -> String {
        render(err, &TraceStyle::plain())
    }

    fn register_chain() -> ErrorNode {
        let created =
            wrap(Some(PlainError::new("email in use")), "failed to create user").unwrap();
        let created = attach_meta(created, "code", "503");
        wrap(Some(created), "failed to register").unwrap()
    }

    #[test]
    fn renders_linear_chain_with_metadata() {
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ failed to register",
            " ├─ failed to create user",
            " │   ╰─ code: 503",
            " ╰─ email in use",
        ]
        .join("\n");
        assert_eq!(plain(&register_chain()), expected);
    }

    #[test]
    fn scenario_rows_appear_in_order_with_one_metadata_row() {
        let out = plain(&register_chain());
        let needles = ["failed to register", "failed to create user", "code", "503"];
        let positions: Vec<usize> = needles
            .iter()
            .map(|needle| out.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let rows: Vec<&str> = out.lines().collect();
        let meta_rows: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains("code: "))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(meta_rows.len(), 1);
        assert!(rows[meta_rows[0] - 1].contains("failed to create user"));
    }

    #[test]
    fn metadata_rows_are_sorted_by_key() {
        let node = ErrorNode::wrap(PlainError::new("root"), "outer")
            .with_meta("b", 1)
            .with_meta("a", 2);
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ outer",
            " │   ├─ a: 2",
            " │   ╰─ b: 1",
            " ╰─ root",
        ]
        .join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn node_without_metadata_has_no_sub_rows() {
        let node = ErrorNode::wrap(PlainError::new("root"), "outer");
        assert_eq!(plain(&node), " ▼ [ERROR TRACE]\n ├─ outer\n ╰─ root");
    }

    #[test]
    fn multi_line_messages_stay_inside_the_branch() {
        let node = ErrorNode::wrap(
            PlainError::new("disk full\nretry later"),
            "failed to register\nbecause of ducks!",
        );
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ failed to register",
            " │  because of ducks!",
            " ╰─ disk full",
            " │  retry later",
        ]
        .join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn multi_line_values_become_nested_blocks() {
        let node = ErrorNode::wrap(PlainError::new("root"), "outer")
            .with_meta("info", "really\nlong")
            .with_meta("zone", "eu");
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ outer",
            " │   ├─ info:",
            " │   │    really",
            " │   │    long",
            " │   ╰─ zone: eu",
            " ╰─ root",
        ]
        .join("\n");
        assert_eq!(plain(&node), expected);

        let node =
            ErrorNode::wrap(PlainError::new("root"), "outer").with_meta("info", "a\nb");
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ outer",
            " │   ╰─ info:",
            " │        a",
            " │        b",
            " ╰─ root",
        ]
        .join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn empty_message_still_takes_a_row() {
        let node = attach_meta(PlainError::new("root"), "k", "v");
        let expected = [" ▼ [ERROR TRACE]", " ├─ ", " │   ╰─ k: v", " ╰─ root"].join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn node_without_cause_closes_its_level() {
        let node = ErrorNode::new("standalone").with_meta("k", true);
        let expected = [" ▼ [ERROR TRACE]", " ╰─ standalone", "     ╰─ k: true"].join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn foreign_error_renders_as_single_leaf() {
        let io = std::io::Error::other("connection reset");
        assert_eq!(plain(&io), " ▼ [ERROR TRACE]\n ╰─ connection reset");
    }

    #[test]
    fn join_fans_out_into_sibling_branches() {
        let replica_a = ErrorNode::wrap(PlainError::new("dial timeout"), "replica a down")
            .with_meta("host", "a");
        let cause =
            join([replica_a.into(), PlainError::new("replica b refused").into()]).unwrap();
        let node = ErrorNode::caused_by(cause, "sync failed");
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ sync failed",
            " ├─ replica a down",
            " │   │   ╰─ host: a",
            " │   ╰─ dial timeout",
            " ╰─ replica b refused",
        ]
        .join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn join_member_metadata_and_causes_use_separate_columns() {
        let replica_a = ErrorNode::wrap(PlainError::new("dial timeout"), "replica a down")
            .with_meta("host", "a")
            .with_meta("zone", "eu");
        let standalone = ErrorNode::new("replica c gone").with_meta("host", "c");
        let cause = join([
            replica_a.into(),
            PlainError::new("replica b refused").into(),
            standalone.into(),
        ])
        .unwrap();
        let node = ErrorNode::caused_by(cause, "sync failed");
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ sync failed",
            " ├─ replica a down",
            " │   │   ├─ host: a",
            " │   │   ╰─ zone: eu",
            " │   ╰─ dial timeout",
            " ├─ replica b refused",
            " ╰─ replica c gone",
            "     ╰─ host: c",
        ]
        .join("\n");
        let out = plain(&node);
        assert_eq!(out, expected);

        let meta_column: Vec<&str> = out
            .lines()
            .filter(|row| row.starts_with(" │   │   "))
            .collect();
        assert_eq!(meta_column.len(), 2);
        let terminals = meta_column.iter().filter(|row| row.contains("╰─")).count();
        assert_eq!(terminals, 1);
    }

    #[test]
    fn last_join_member_nests_under_closed_indent() {
        let inner = ErrorNode::wrap(PlainError::new("root"), "second");
        let cause = join([PlainError::new("first").into(), inner.into()]).unwrap();
        let node = ErrorNode::caused_by(cause, "top");
        let expected = [
            " ▼ [ERROR TRACE]",
            " ├─ top",
            " ├─ first",
            " ╰─ second",
            "     ╰─ root",
        ]
        .join("\n");
        assert_eq!(plain(&node), expected);
    }

    #[test]
    fn single_member_join_renders_like_plain_cause() {
        let inner = || ErrorNode::wrap(PlainError::new("root"), "inner").with_meta("k", "v");
        let joined = ErrorNode::caused_by(join([inner().into()]).unwrap(), "outer");
        let direct = ErrorNode::caused_by(Cause::from(inner()), "outer");
        assert_eq!(plain(&joined), plain(&direct));
    }

    #[test]
    fn styling_wraps_tokens_not_rows() {
        let style = TraceStyle::default();
        let out = render(&register_chain(), &style);
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 5);

        let paint = |text: &str, token| style.paint(text, token);
        assert_eq!(rows[0], paint(" ▼ [ERROR TRACE]", Token::Banner));
        assert_eq!(
            rows[1],
            format!(
                "{}{}",
                paint(" ├─ ", Token::Connector),
                paint("failed to register", Token::Message)
            )
        );
        assert_eq!(
            rows[3],
            format!(
                "{}{}{}: {}",
                paint(" │  ", Token::Connector),
                paint(" ╰─ ", Token::Connector),
                paint("code", Token::Key),
                paint("503", Token::Value)
            )
        );

        let message = paint("failed to register", Token::Message);
        assert!(message.starts_with("\x1b[38;2;243;139;168m"));
        assert!(!message.contains('├'));
        assert_eq!(plain(&register_chain()).lines().count(), 5);
    }

    #[test]
    fn custom_glyphs_and_banner() {
        let style = TraceStyle {
            banner: "error trace:".into(),
            glyphs: style::Glyphs {
                middle: "|-- ".into(),
                terminal: "`-- ".into(),
                vertical: "|".into(),
            },
            palette: None,
        };
        let expected = [
            "error trace:",
            "|-- failed to register",
            "|-- failed to create user",
            "|   `-- code: 503",
            "`-- email in use",
        ]
        .join("\n");
        assert_eq!(render(&register_chain(), &style), expected);
    }

    #[test]
    fn alternate_display_prints_the_trace() {
        let node = register_chain();
        assert_eq!(format!("{node}"), "failed to register");
        let full = format!("{node:#}");
        assert!(full.contains("failed to create user"));
        assert!(full.contains("503"));
    }
}
