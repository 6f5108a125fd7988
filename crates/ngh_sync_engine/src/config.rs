//! Configuration for the sync engine.

/// Name and email recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl Author {
    /// Creates an author identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Configuration for repository operations.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// File created to give an empty repository its first commit.
    pub placeholder_file: String,
    /// Message of the placeholder file commit.
    pub placeholder_message: String,
    /// Commit message of the empty-tree bootstrap commit.
    pub bootstrap_message: String,
    /// Branch recorded when linking a repository without branches.
    pub unborn_branch: String,
    /// Author of the commits we create. The provider picks one if unset.
    pub author: Option<Author>,
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            placeholder_file: "dummy".to_string(),
            placeholder_message: "dummy commit".to_string(),
            bootstrap_message: "Initial commit".to_string(),
            unborn_branch: "master".to_string(),
            author: None,
        }
    }

    /// Sets the commit author.
    #[must_use]
    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    /// Sets the branch recorded when linking a repository without branches.
    #[must_use]
    pub fn with_unborn_branch(mut self, branch: impl Into<String>) -> Self {
        self.unborn_branch = branch.into();
        self
    }

    /// Sets the placeholder file used by the empty-repository bootstrap.
    #[must_use]
    pub fn with_placeholder_file(mut self, path: impl Into<String>) -> Self {
        self.placeholder_file = path.into();
        self
    }

    /// Sets the bootstrap commit message.
    #[must_use]
    pub fn with_bootstrap_message(mut self, message: impl Into<String>) -> Self {
        self.bootstrap_message = message.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
