//! Expression trees for parsed sentence templates and expansion rules.
//!
//! A template such as `set [the] color of <name> to {color}` is handed to this
//! crate already parsed. This module holds the closed set of node shapes the
//! validator walks, the flat JSON wire form those trees are loaded from, and
//! the depth-first [`Flatten`] iterator that unwraps sequences into leaves.

use std::iter::FusedIterator;

use facet::Facet;

use crate::grammar::GrammarError;

/// A node of a parsed grammar template.
///
/// Sequences nest; every other variant is a leaf as far as validation is
/// concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Literal text to be matched as-is.
    Text(String),

    /// An ordered group of child expressions.
    Sequence(Sequence),

    /// A reference to a named value list, binding a slot.
    ListReference(ListReference),

    /// A reference to a named expansion rule.
    RuleReference(RuleReference),
}

/// A composite node holding child expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// How the children combine when matching.
    pub kind: SequenceKind,

    /// The child expressions, in source order.
    pub items: Vec<Expression>,
}

/// The matching semantics of a [`Sequence`].
///
/// The kind matters to a matcher, not to structural validation: every kind is
/// unwrapped the same way by [`Expression::flatten`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Children match one after another: `(a b c)`.
    Group,
    /// Exactly one child matches: `(a | b | c)`.
    Alternative,
    /// The children may be skipped entirely: `[a b]`.
    Optional,
    /// Children match in any order: `(a; b; c)`.
    Permutation,
}

/// A `{list}` or `{list:slot}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListReference {
    /// Name of the value list in the grammar registry.
    pub list_name: String,

    /// Name of the slot the matched value is bound to.
    pub slot_name: String,
}

/// A `<rule>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleReference {
    /// Name of the expansion rule in the grammar registry.
    pub rule_name: String,
}

/// One accepted phrasing of an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// The template as the author wrote it, kept for diagnostics.
    pub text: String,

    /// The parsed template.
    pub expression: Expression,
}

impl Expression {
    /// Literal text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Expression::Text(text.into())
    }

    /// A list reference whose slot is named after the list.
    #[must_use]
    pub fn list(list_name: impl Into<String>) -> Self {
        let list_name = list_name.into();
        Expression::ListReference(ListReference {
            slot_name: list_name.clone(),
            list_name,
        })
    }

    /// A list reference binding an explicitly named slot.
    #[must_use]
    pub fn list_as(list_name: impl Into<String>, slot_name: impl Into<String>) -> Self {
        Expression::ListReference(ListReference {
            list_name: list_name.into(),
            slot_name: slot_name.into(),
        })
    }

    /// A rule reference.
    #[must_use]
    pub fn rule(rule_name: impl Into<String>) -> Self {
        Expression::RuleReference(RuleReference {
            rule_name: rule_name.into(),
        })
    }

    /// A sequence of the given kind.
    #[must_use]
    pub fn sequence(kind: SequenceKind, items: Vec<Expression>) -> Self {
        Expression::Sequence(Sequence { kind, items })
    }

    /// A plain group.
    #[must_use]
    pub fn group(items: Vec<Expression>) -> Self {
        Self::sequence(SequenceKind::Group, items)
    }

    /// An alternative.
    #[must_use]
    pub fn alternative(items: Vec<Expression>) -> Self {
        Self::sequence(SequenceKind::Alternative, items)
    }

    /// Returns `true` for [`Expression::Sequence`].
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Expression::Sequence(_))
    }

    /// Iterates the non-sequence leaves of this expression, depth-first and
    /// left to right.
    ///
    /// A leaf yields only itself. The iterator borrows the tree and performs
    /// no reference resolution; call again to restart.
    #[must_use]
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            root: Some(self),
            stack: Vec::new(),
        }
    }
}

/// Depth-first iterator over the leaves of an [`Expression`].
///
/// Created by [`Expression::flatten`].
#[derive(Debug, Clone)]
pub struct Flatten<'a> {
    root: Option<&'a Expression>,
    stack: Vec<std::slice::Iter<'a, Expression>>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a Expression;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            match root {
                Expression::Sequence(seq) => self.stack.push(seq.items.iter()),
                leaf => return Some(leaf),
            }
        }

        while let Some(items) = self.stack.last_mut() {
            match items.next() {
                Some(Expression::Sequence(seq)) => self.stack.push(seq.items.iter()),
                Some(leaf) => return Some(leaf),
                None => {
                    self.stack.pop();
                }
            }
        }

        None
    }
}

impl FusedIterator for Flatten<'_> {}

/// Wire form of an [`Expression`].
///
/// Mirrors the JSON emitted by template parsers: a `type` discriminant plus
/// whichever payload fields that type uses. Convert with [`Expression::try_from`].
#[derive(Debug, Clone, Facet)]
pub struct RawExpression {
    /// The discriminant identifying the node kind.
    #[facet(rename = "type")]
    pub node_type: NodeType,

    /// Literal text for `TEXT` nodes.
    #[facet(default)]
    pub text: Option<String>,

    /// Children of sequence nodes.
    #[facet(default)]
    pub items: Vec<RawExpression>,

    /// List name for `LIST` nodes.
    #[facet(default)]
    pub list_name: Option<String>,

    /// Slot name for `LIST` nodes; defaults to the list name.
    #[facet(default)]
    pub slot_name: Option<String>,

    /// Rule name for `RULE` nodes.
    #[facet(default)]
    pub rule_name: Option<String>,
}

/// Node kinds recognised in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum NodeType {
    /// A plain group.
    #[facet(rename = "GROUP")]
    Group,
    /// An alternative.
    #[facet(rename = "ALTERNATIVE")]
    Alternative,
    /// An optional group.
    #[facet(rename = "OPTIONAL")]
    Optional,
    /// A permutation.
    #[facet(rename = "PERMUTATION")]
    Permutation,
    /// Literal text.
    #[facet(rename = "TEXT")]
    Text,
    /// A value list reference.
    #[facet(rename = "LIST")]
    List,
    /// An expansion rule reference.
    #[facet(rename = "RULE")]
    Rule,
}

impl NodeType {
    /// Returns the canonical wire name of this node type.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            NodeType::Group => "GROUP",
            NodeType::Alternative => "ALTERNATIVE",
            NodeType::Optional => "OPTIONAL",
            NodeType::Permutation => "PERMUTATION",
            NodeType::Text => "TEXT",
            NodeType::List => "LIST",
            NodeType::Rule => "RULE",
        }
    }
}

fn required(
    node_type: NodeType,
    field: &'static str,
    value: Option<String>,
) -> Result<String, GrammarError> {
    value.ok_or(GrammarError::MalformedExpression {
        node_type: node_type.type_name(),
        field,
    })
}

impl TryFrom<RawExpression> for Expression {
    type Error = GrammarError;

    fn try_from(raw: RawExpression) -> Result<Self, Self::Error> {
        let node_type = raw.node_type;
        let kind = match node_type {
            NodeType::Group => SequenceKind::Group,
            NodeType::Alternative => SequenceKind::Alternative,
            NodeType::Optional => SequenceKind::Optional,
            NodeType::Permutation => SequenceKind::Permutation,
            NodeType::Text => {
                return Ok(Expression::Text(required(node_type, "text", raw.text)?));
            }
            NodeType::List => {
                let list_name = required(node_type, "list_name", raw.list_name)?;
                let slot_name = raw.slot_name.unwrap_or_else(|| list_name.clone());
                return Ok(Expression::ListReference(ListReference {
                    list_name,
                    slot_name,
                }));
            }
            NodeType::Rule => {
                return Ok(Expression::RuleReference(RuleReference {
                    rule_name: required(node_type, "rule_name", raw.rule_name)?,
                }));
            }
        };

        let items = raw
            .items
            .into_iter()
            .map(Expression::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expression::Sequence(Sequence { kind, items }))
    }
}

/// Wire form of a [`Sentence`].
#[derive(Debug, Clone, Facet)]
pub struct RawSentence {
    /// The template text.
    pub text: String,

    /// The parsed template.
    pub expression: RawExpression,
}

impl TryFrom<RawSentence> for Sentence {
    type Error = GrammarError;

    fn try_from(raw: RawSentence) -> Result<Self, Self::Error> {
        Ok(Sentence {
            expression: Expression::try_from(raw.expression)?,
            text: raw.text,
        })
    }
}

/// Parse a single JSON expression tree.
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the input is not valid JSON or does
/// not fit the wire format, and [`GrammarError::MalformedExpression`] if a
/// node lacks the payload its type requires.
pub fn parse_expression(json: &str) -> Result<Expression, GrammarError> {
    let raw: RawExpression =
        facet_json::from_str(json).map_err(|e| GrammarError::JsonParse(e.to_string()))?;
    Expression::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> Expression {
        Expression::text(name)
    }

    #[test]
    fn test_flatten_leaf_yields_itself() {
        let expr = Expression::list("color");
        let leaves: Vec<_> = expr.flatten().collect();
        assert_eq!(leaves, vec![&expr]);
    }

    #[test]
    fn test_flatten_nested_is_depth_first() {
        let expr = Expression::group(vec![
            Expression::group(vec![leaf("a"), leaf("b")]),
            leaf("c"),
        ]);
        let leaves: Vec<_> = expr.flatten().cloned().collect();
        assert_eq!(leaves, vec![leaf("a"), leaf("b"), leaf("c")]);
    }

    #[test]
    fn test_flatten_unwraps_every_sequence_kind() {
        let expr = Expression::group(vec![
            Expression::sequence(SequenceKind::Optional, vec![leaf("the")]),
            Expression::alternative(vec![
                Expression::list("color"),
                Expression::sequence(SequenceKind::Permutation, vec![Expression::rule("name")]),
            ]),
        ]);
        let leaves: Vec<_> = expr.flatten().cloned().collect();
        assert_eq!(
            leaves,
            vec![leaf("the"), Expression::list("color"), Expression::rule("name")]
        );
    }

    #[test]
    fn test_flatten_skips_empty_sequences() {
        let expr = Expression::group(vec![
            Expression::group(vec![]),
            Expression::group(vec![Expression::group(vec![])]),
            leaf("x"),
        ]);
        assert_eq!(expr.flatten().count(), 1);
        assert!(Expression::group(vec![]).flatten().next().is_none());
    }

    #[test]
    fn test_flatten_is_restartable() {
        let expr = Expression::group(vec![leaf("a"), Expression::group(vec![leaf("b")])]);
        let first: Vec<_> = expr.flatten().collect();
        let second: Vec<_> = expr.flatten().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_flatten_deep_nesting_does_not_recurse() {
        let mut expr = leaf("bottom");
        for _ in 0..10_000 {
            expr = Expression::group(vec![expr]);
        }
        assert_eq!(expr.flatten().collect::<Vec<_>>(), vec![&leaf("bottom")]);
        // Dropping a deeply nested tree recurses; unwind it iteratively.
        while let Expression::Sequence(mut seq) = expr {
            expr = seq.items.pop().unwrap_or_else(|| leaf(""));
        }
    }

    #[test]
    fn test_parse_expression() {
        let json = r#"{
            "type": "GROUP",
            "items": [
                {"type": "TEXT", "text": "set "},
                {"type": "RULE", "rule_name": "name"},
                {"type": "TEXT", "text": " to "},
                {"type": "LIST", "list_name": "color"},
                {"type": "LIST", "list_name": "brightness", "slot_name": "brightness_pct"}
            ]
        }"#;

        let expr = parse_expression(json).unwrap();
        let leaves: Vec<_> = expr.flatten().cloned().collect();
        assert_eq!(
            leaves,
            vec![
                Expression::text("set "),
                Expression::rule("name"),
                Expression::text(" to "),
                Expression::list("color"),
                Expression::list_as("brightness", "brightness_pct"),
            ]
        );
    }

    #[test]
    fn test_parse_expression_missing_payload() {
        let err = parse_expression(r#"{"type": "RULE"}"#).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::MalformedExpression {
                node_type: "RULE",
                field: "rule_name"
            }
        ));
    }

    #[test]
    fn test_parse_expression_invalid_json() {
        let err = parse_expression(r#"{"type": "#).unwrap_err();
        assert!(matches!(err, GrammarError::JsonParse(_)));
    }
}
