use async_trait::async_trait;

use relist_types::Filler;

use crate::error::FillerResult;

/// Producer of filler rows, typically an ad network.
#[async_trait]
pub trait FillerSource: Send + Sync {
    async fn load(&self) -> FillerResult<Vec<Filler>>;
}

/// A source that hands out a fixed set of fillers.
pub struct StaticFillerSource {
    fillers: Vec<Filler>,
}

impl StaticFillerSource {
    pub fn new(fillers: Vec<Filler>) -> Self {
        Self { fillers }
    }
}

#[async_trait]
impl FillerSource for StaticFillerSource {
    async fn load(&self) -> FillerResult<Vec<Filler>> {
        Ok(self.fillers.clone())
    }
}
