pub mod walker;

use std::error::Error as StdError;
use std::fmt;

use crate::types::{Metadata, Scalar};
use walker::{Link, classify, fanout};

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// One link of an error chain: a human message, the error it wraps, and
/// key/value metadata describing the failure at this level.
///
/// `message` and `cause` are fixed once the node exists. Metadata can be
/// added through [`ErrorNode::insert_meta`] or the consuming
/// [`ErrorNode::with_meta`] builder.
#[derive(Debug)]
pub struct ErrorNode {
    message: String,
    cause: Option<Cause>,
    meta: Metadata,
}

impl ErrorNode {
    /// A node with no cause. Most chains start from a foreign error or a
    /// [`PlainError`] instead; this is the shape decoding produces for a
    /// map that carries metadata but no cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            meta: Metadata::new(),
        }
    }

    pub fn wrap<E>(cause: E, message: impl Into<String>) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::caused_by(Cause::from_error(cause), message)
    }

    pub fn caused_by(cause: Cause, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause),
            meta: Metadata::new(),
        }
    }

    pub(crate) fn from_parts(message: String, cause: Option<Cause>, meta: Metadata) -> Self {
        Self {
            message,
            cause,
            meta,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub fn into_cause(self) -> Option<Cause> {
        self.cause
    }

    /// Metadata stored on this node only.
    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    /// Look `key` up on this node, then outward through the rest of the chain.
    pub fn meta(&self, key: &str) -> Option<&Scalar> {
        Link::Node(self).find_meta(key)
    }

    /// Set `key` on this node, returning the value it replaced.
    pub fn insert_meta(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> Option<Scalar> {
        self.meta.insert(key.into(), value.into())
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert_meta(key, value);
        self
    }

    pub fn extend_meta<I, K, V>(&mut self, metas: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        self.meta
            .extend(metas.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl fmt::Display for ErrorNode {
    /// `{}` prints the message, `{:#}` prints the full trace with the
    /// process-wide style.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str(&crate::render::trace(self))
        } else {
            f.write_str(&self.message)
        }
    }
}

impl StdError for ErrorNode {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_error() as &(dyn StdError + 'static))
    }
}

/// What a node wraps.
#[derive(Debug)]
pub enum Cause {
    Node(Box<ErrorNode>),
    Join(Joined),
    Foreign(BoxError),
}

impl Cause {
    /// Classify `err` once, at construction: nodes and joins built by this
    /// crate keep their structure, anything else becomes an opaque leaf.
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(err))
    }

    pub fn from_boxed(err: BoxError) -> Self {
        let err = match err.downcast::<Cause>() {
            Ok(cause) => return *cause,
            Err(err) => err,
        };
        let err = match err.downcast::<ErrorNode>() {
            Ok(node) => return Self::Node(node),
            Err(err) => err,
        };
        match err.downcast::<Joined>() {
            Ok(joined) => Self::Join(*joined),
            Err(err) => Self::Foreign(err),
        }
    }

    pub fn link(&self) -> Link<'_> {
        match self {
            Self::Node(node) => Link::Node(node),
            Self::Join(joined) => Link::Join(joined.causes()),
            Self::Foreign(err) => Link::Foreign(err.as_ref()),
        }
    }

    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match self {
            Self::Node(node) => node.as_ref(),
            Self::Join(joined) => joined,
            Self::Foreign(err) => err.as_ref(),
        }
    }

    pub fn as_node(&self) -> Option<&ErrorNode> {
        match self {
            Self::Node(node) => Some(node.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_error(), f)
    }
}

impl StdError for Cause {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.as_error().source()
    }
}

impl From<ErrorNode> for Cause {
    fn from(node: ErrorNode) -> Self {
        Self::Node(Box::new(node))
    }
}

impl From<Joined> for Cause {
    fn from(joined: Joined) -> Self {
        Self::Join(joined)
    }
}

impl From<PlainError> for Cause {
    fn from(err: PlainError) -> Self {
        Self::Foreign(Box::new(err))
    }
}

/// Several errors standing in one cause position.
///
/// Always holds at least one member, and never a join as a member: nested
/// joins are spliced in place when the join is built.
#[derive(Debug)]
pub struct Joined {
    causes: Vec<Cause>,
}

impl Joined {
    /// Returns `None` when `causes` is empty.
    pub fn new(causes: impl IntoIterator<Item = Cause>) -> Option<Self> {
        let mut flat = Vec::new();
        for cause in causes {
            match cause {
                Cause::Join(inner) => flat.extend(inner.causes),
                other => flat.push(other),
            }
        }
        if flat.is_empty() {
            return None;
        }
        Some(Self { causes: flat })
    }

    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    pub fn into_causes(self) -> Vec<Cause> {
        self.causes
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }
}

impl fmt::Display for Joined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

impl StdError for Joined {}

/// A terminal error that is nothing but its message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PlainError {
    message: String,
}

impl PlainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Wrap `cause` with `message`. An absent cause stays absent.
pub fn wrap<E>(cause: Option<E>, message: impl Into<String>) -> Option<ErrorNode>
where
    E: StdError + Send + Sync + 'static,
{
    cause.map(|err| ErrorNode::wrap(err, message))
}

/// Combine several causes into one cause position. Returns `None` for an
/// empty input and the join itself otherwise, even for a single member.
pub fn join(causes: impl IntoIterator<Item = Cause>) -> Option<Cause> {
    Joined::new(causes).map(Cause::Join)
}

/// Attach `key = value` to `err`.
///
/// An [`ErrorNode`] is updated and handed back; any other error is wrapped
/// in a new node with an empty message that only carries the metadata.
pub fn attach_meta<E>(err: E, key: impl Into<String>, value: impl Into<Scalar>) -> ErrorNode
where
    E: StdError + Send + Sync + 'static,
{
    let pair: (String, Scalar) = (key.into(), value.into());
    attach_metas(err, [pair])
}

pub fn attach_metas<E, I, K, V>(err: E, metas: I) -> ErrorNode
where
    E: StdError + Send + Sync + 'static,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Scalar>,
{
    let mut node = match Cause::from_error(err) {
        Cause::Node(node) => *node,
        other => ErrorNode::caused_by(other, String::new()),
    };
    node.extend_meta(metas);
    node
}

/// Find `key` anywhere in the chain, outermost node first.
///
/// Join members are searched in order, each one fully before the next.
/// Foreign errors are never looked into.
pub fn read_meta<'a>(err: &'a (dyn StdError + 'static), key: &str) -> Option<&'a Scalar> {
    classify(err).find_meta(key)
}

/// Copy of the metadata held by the nearest node of the chain.
///
/// Empty when `err` is foreign or a join.
pub fn read_all_meta(err: &(dyn StdError + 'static)) -> Metadata {
    match classify(err) {
        Link::Node(node) => node.metadata().clone(),
        Link::Join(_) | Link::Foreign(_) => Metadata::new(),
    }
}

/// Every key visible in the chain, each with the value [`read_meta`] would
/// return for it.
pub fn merged_meta(err: &(dyn StdError + 'static)) -> Metadata {
    fn collect(link: Link<'_>, out: &mut Metadata) {
        match link {
            Link::Node(node) => {
                for (key, value) in node.metadata() {
                    out.entry(key.clone()).or_insert_with(|| value.clone());
                }
                if let Some(cause) = node.cause() {
                    collect(cause.link(), out);
                }
            }
            Link::Join(causes) => {
                for member in fanout(causes) {
                    collect(member, out);
                }
            }
            Link::Foreign(_) => {}
        }
    }

    let mut out = Metadata::new();
    collect(classify(err), &mut out);
    out
}

/// Chain-building helpers for `Result`. `Ok` values pass through untouched.
pub trait ResultExt<T> {
    fn wrap_err(self, message: impl Into<String>) -> Result<T, ErrorNode>;

    fn with_meta(self, key: impl Into<String>, value: impl Into<Scalar>)
    -> Result<T, ErrorNode>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn wrap_err(self, message: impl Into<String>) -> Result<T, ErrorNode> {
        self.map_err(|err| ErrorNode::wrap(err, message))
    }

    fn with_meta(
        self,
        key: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> Result<T, ErrorNode> {
        self.map_err(|err| attach_meta(err, key, value))
    }
}
