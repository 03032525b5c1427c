/// Tuning knobs for the load pipeline.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Ceiling on batch-compensation rounds before the loop gives up and
    /// returns a short page.
    pub batch_round_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_round_limit: 100_000,
        }
    }
}
