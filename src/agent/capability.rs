//! Capability flags and the capability → stage table.

use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};

/// What an agent declares it can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Search and item metadata.
    MetadataFetch,
    /// Chapter listings and page images.
    ChapterFetch,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 2] = [Capability::MetadataFetch, Capability::ChapterFetch];

    /// Returns the pipeline stages this capability enables.
    #[must_use]
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Self::MetadataFetch => &[Stage::Search, Stage::ItemDetail],
            Self::ChapterFetch => &[Stage::SubItemListing, Stage::LeafContent],
        }
    }

    /// Returns the stable name used in logs and CLI output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MetadataFetch => "metadata_fetch",
            Self::ChapterFetch => "chapter_fetch",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::MetadataFetch => 0b01,
            Self::ChapterFetch => 0b10,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four retrieval stages every agent exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Free-text search returning lookup records.
    Search,
    /// Full metadata for one item.
    ItemDetail,
    /// Chapters of one item.
    SubItemListing,
    /// Page images of one chapter.
    LeafContent,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Search,
        Stage::ItemDetail,
        Stage::SubItemListing,
        Stage::LeafContent,
    ];

    /// Returns the capability that enables this stage.
    #[must_use]
    pub fn capability(self) -> Capability {
        match self {
            Self::Search | Self::ItemDetail => Capability::MetadataFetch,
            Self::SubItemListing | Self::LeafContent => Capability::ChapterFetch,
        }
    }

    /// Returns the stable name used in logs and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::ItemDetail => "item_detail",
            Self::SubItemListing => "sub_item_listing",
            Self::LeafContent => "leaf_content",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of capabilities declared by one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns the set with `capability` added.
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Returns true if the set contains `capability`.
    #[must_use]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Returns true if some declared capability enables `stage`.
    #[must_use]
    pub fn supports(self, stage: Stage) -> bool {
        self.contains(stage.capability())
    }

    /// Returns true if no capability is declared.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the declared capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }

    /// Iterates the stages enabled by the declared capabilities.
    pub fn stages(self) -> impl Iterator<Item = Stage> {
        self.iter().flat_map(|capability| capability.stages().iter().copied())
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(capabilities: [Capability; N]) -> Self {
        capabilities.into_iter().collect()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Capability::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for capability in self.iter() {
            seq.serialize_element(&capability)?;
        }
        seq.end()
    }
}
