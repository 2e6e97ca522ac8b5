use std::error::Error as StdError;

use crate::chain::{Cause, ErrorNode, Joined};
use crate::types::Scalar;

/// The shape of one position in a chain, as seen by renderers and codecs.
#[derive(Debug, Clone, Copy)]
pub enum Link<'a> {
    /// A node built by this crate; its cause can be followed.
    Node(&'a ErrorNode),
    /// More than one error in the same position.
    Join(&'a [Cause]),
    /// Anything else. Only its display text is used.
    Foreign(&'a (dyn StdError + 'static)),
}

/// Classify an arbitrary error value, stripping one layer.
pub fn classify<'a>(err: &'a (dyn StdError + 'static)) -> Link<'a> {
    if let Some(node) = err.downcast_ref::<ErrorNode>() {
        return Link::Node(node);
    }
    if let Some(joined) = err.downcast_ref::<Joined>() {
        return Link::Join(joined.causes());
    }
    if let Some(cause) = err.downcast_ref::<Cause>() {
        return cause.link();
    }
    Link::Foreign(err)
}

/// Member links of a join, with any joined member expanded in place.
pub fn fanout(causes: &[Cause]) -> Vec<Link<'_>> {
    let mut links = Vec::with_capacity(causes.len());
    for cause in causes {
        match cause.link() {
            Link::Join(inner) => links.extend(fanout(inner)),
            link => links.push(link),
        }
    }
    links
}

impl<'a> Link<'a> {
    /// The message this position shows in a trace or an encoded map.
    pub fn message(self) -> String {
        match self {
            Link::Node(node) => node.message().to_string(),
            Link::Join(causes) => causes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Link::Foreign(err) => err.to_string(),
        }
    }

    pub(crate) fn find_meta(self, key: &str) -> Option<&'a Scalar> {
        match self {
            Link::Node(node) => node
                .metadata()
                .get(key)
                .or_else(|| node.cause()?.link().find_meta(key)),
            Link::Join(causes) => fanout(causes)
                .into_iter()
                .find_map(|member| member.find_meta(key)),
            Link::Foreign(_) => None,
        }
    }
}
