use std::fmt;

/// Location of an item in the questionnaire tree, e.g. `"group1/question1"`.
///
/// Segments are linkIds joined with `/`. Top-level items have a single
/// segment, so their path equals their linkId.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPath {
    path: String,
}

impl ItemPath {
    pub const SEPARATOR: char = '/';

    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The empty path above all top-level items.
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a linkId segment, returning a new path.
    pub fn child(&self, link_id: &str) -> Self {
        if self.path.is_empty() {
            Self::new(link_id)
        } else {
            Self::new(format!("{}{}{}", self.path, Self::SEPARATOR, link_id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split(Self::SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments; top-level items have depth 1.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// linkId of the item this path points at.
    pub fn link_id(&self) -> Option<&str> {
        self.segments().last()
    }

    pub fn parent(&self) -> Self {
        match self.path.rfind(Self::SEPARATOR) {
            Some(index) => Self::new(&self.path[..index]),
            None => Self::root(),
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl From<&str> for ItemPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
