// src/identity.rs

use crate::model::Author;
use std::collections::HashMap;
use std::fmt;

/// A committer as seen by the statistics: display name plus the part of the
/// email address before the `@`.
///
/// Two identities *match* when either field is equal. The relation is
/// reflexive and symmetric but not transitive, so it is deliberately not
/// exposed through `PartialEq`/`Hash`; group identities with
/// [`IdentityClusters`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitterIdentity {
    pub name: String,
    pub email_user: String,
}

impl CommitterIdentity {
    pub fn new(name: impl Into<String>, email_user: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email_user: email_user.into(),
        }
    }

    pub fn from_author(author: &Author) -> Self {
        let email_user = author.email.split('@').next().unwrap_or("");
        Self::new(author.name.clone(), email_user)
    }

    pub fn matches(&self, other: &CommitterIdentity) -> bool {
        self.name == other.name || self.email_user == other.email_user
    }
}

impl fmt::Display for CommitterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.email_user)
    }
}

/// Index of a cluster root inside an [`IdentityClusters`].
pub type ClusterId = usize;

/// Union-find over committer identities. Identities connected through any
/// chain of matching names or email users end up in the same cluster.
#[derive(Debug, Default)]
pub struct IdentityClusters {
    identities: Vec<CommitterIdentity>,
    parent: Vec<usize>,
    size: Vec<usize>,
    index: HashMap<CommitterIdentity, usize>,
    by_name: HashMap<String, usize>,
    by_email_user: HashMap<String, usize>,
}

impl IdentityClusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_identities<I>(identities: I) -> Self
    where
        I: IntoIterator<Item = CommitterIdentity>,
    {
        let mut clusters = Self::new();
        for identity in identities {
            clusters.insert(identity);
        }
        clusters
    }

    /// Add an identity and merge it with every cluster it matches.
    pub fn insert(&mut self, identity: CommitterIdentity) {
        if self.index.contains_key(&identity) {
            return;
        }
        let idx = self.identities.len();
        self.parent.push(idx);
        self.size.push(1);

        if let Some(&other) = self.by_name.get(&identity.name) {
            self.union(idx, other);
        } else {
            self.by_name.insert(identity.name.clone(), idx);
        }
        if let Some(&other) = self.by_email_user.get(&identity.email_user) {
            self.union(idx, other);
        } else {
            self.by_email_user.insert(identity.email_user.clone(), idx);
        }

        self.index.insert(identity.clone(), idx);
        self.identities.push(identity);
    }

    /// Cluster of a previously inserted identity. Cluster ids are only stable
    /// once every identity has been inserted.
    pub fn cluster_of(&self, identity: &CommitterIdentity) -> Option<ClusterId> {
        self.index.get(identity).map(|&idx| self.find(idx))
    }

    /// First identity inserted into the given cluster.
    pub fn representative(&self, cluster: ClusterId) -> &CommitterIdentity {
        let first = (0..self.identities.len())
            .find(|&idx| self.find(idx) == cluster)
            .unwrap_or(cluster);
        &self.identities[first]
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        (0..self.parent.len()).filter(|&idx| self.parent[idx] == idx).count()
    }

    /// All clusters, each listing its members in insertion order.
    pub fn clusters(&self) -> Vec<Vec<&CommitterIdentity>> {
        let mut groups: HashMap<usize, Vec<&CommitterIdentity>> = HashMap::new();
        let mut order = Vec::new();
        for (idx, identity) in self.identities.iter().enumerate() {
            let root = self.find(idx);
            groups
                .entry(root)
                .or_insert_with(|| {
                    order.push(root);
                    Vec::new()
                })
                .push(identity);
        }
        order
            .into_iter()
            .filter_map(|root| groups.remove(&root))
            .collect()
    }

    fn find(&self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            idx = self.parent[idx];
        }
        idx
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}
