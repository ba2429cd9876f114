use aws_sdk_dynamodb::types;

/// Attributes copied into a secondary index.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ProjectionMode {
    /// Every attribute.
    #[default]
    All,
    /// Only the table and index keys.
    KeysOnly,
}

impl From<ProjectionMode> for types::ProjectionType {
    fn from(mode: ProjectionMode) -> Self {
        match mode {
            ProjectionMode::All => Self::All,
            ProjectionMode::KeysOnly => Self::KeysOnly,
        }
    }
}

/// Provisioned read/write capacity.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Throughput {
    /// Read capacity units.
    pub read_capacity_units: i64,
    /// Write capacity units.
    pub write_capacity_units: i64,
}

impl Default for Throughput {
    fn default() -> Self {
        Self {
            read_capacity_units: 1,
            write_capacity_units: 1,
        }
    }
}

/// Global (own throughput) or local (shares the table hash key) index.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IndexKind {
    /// Fully replicated index.
    Global(Throughput),
    /// Index sharing the table's hash key.
    Local,
}

/// A secondary index declaration.
///
/// ```rust
/// use dynamodb_model::model::index::SecondaryIndex;
///
/// let index = SecondaryIndex::global("users-by-email", "email", None);
/// assert_eq!(index.hash_key(), "email");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SecondaryIndex {
    name: String,
    hash_key: String,
    range_key: Option<String>,
    projection: ProjectionMode,
    kind: IndexKind,
}

impl SecondaryIndex {
    fn new(name: &str, hash_key: &str, range_key: Option<&str>, kind: IndexKind) -> Self {
        Self {
            name: name.to_string(),
            hash_key: hash_key.to_string(),
            range_key: range_key.map(str::to_string),
            projection: ProjectionMode::default(),
            kind,
        }
    }

    /// Global secondary index with 1/1 provisioned throughput.
    pub fn global(name: &str, hash_key: &str, range_key: Option<&str>) -> Self {
        Self::new(name, hash_key, range_key, IndexKind::Global(Throughput::default()))
    }

    /// Local secondary index.
    pub fn local(name: &str, hash_key: &str, range_key: Option<&str>) -> Self {
        Self::new(name, hash_key, range_key, IndexKind::Local)
    }

    /// Override the projection mode.
    pub fn with_projection(mut self, projection: ProjectionMode) -> Self {
        self.projection = projection;
        self
    }

    /// Override the throughput; ignored for local indexes.
    pub fn with_throughput(mut self, throughput: Throughput) -> Self {
        if let IndexKind::Global(_) = self.kind {
            self.kind = IndexKind::Global(throughput);
        }
        self
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash key attribute.
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Range key attribute.
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Projection mode.
    pub fn projection(&self) -> ProjectionMode {
        self.projection
    }

    /// Global or local.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Key attribute names, hash first.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash_key.as_str()).chain(self.range_key.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_index_ignores_throughput() {
        let throughput = Throughput {
            read_capacity_units: 5,
            write_capacity_units: 5,
        };
        let local = SecondaryIndex::local("a", "b", Some("c")).with_throughput(throughput);
        assert_eq!(local.kind(), IndexKind::Local);
        let global = SecondaryIndex::global("a", "b", None).with_throughput(throughput);
        assert_eq!(global.kind(), IndexKind::Global(throughput));
    }

    #[test]
    fn test_key_names() {
        let index = SecondaryIndex::global("a", "b", Some("c"));
        assert_eq!(index.key_names().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(index.projection(), ProjectionMode::All);
    }
}
