use serde::{Deserialize, Serialize};

use relist_types::FillerKind;

/// Configuration for filler interleaving.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerConfig {
    /// Rows between consecutive fillers. Lists no longer than this get a
    /// single trailing filler.
    pub stride: usize,
    /// Filler kinds stripped from a list before it is re-interleaved.
    ///
    /// Defaults to every kind. A kind left out here survives each cycle and
    /// is interleaved again on top, so those rows accumulate. Listing only
    /// `content` strips content rows and keeps install rows in place.
    pub stripped_kinds: Vec<FillerKind>,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            stride: 5,
            stripped_kinds: vec![FillerKind::Content, FillerKind::Install],
        }
    }
}

impl FillerConfig {
    pub fn with_stride(stride: usize) -> Self {
        Self {
            stride,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = FillerConfig::default();
        assert_eq!(c.stride, 5);
        assert_eq!(c.stripped_kinds, vec![FillerKind::Content, FillerKind::Install]);
    }

    #[test]
    fn with_stride_keeps_other_defaults() {
        let c = FillerConfig::with_stride(3);
        assert_eq!(c.stride, 3);
        assert_eq!(c.stripped_kinds.len(), 2);
    }
}
