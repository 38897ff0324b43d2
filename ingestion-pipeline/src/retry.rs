use std::time::Duration;

/// Exponential backoff for a failed embed-and-persist attempt, generalized
/// from the teacher's `IngestionPipeline::retry_delay`: `2^attempt *
/// base_delay`, with `attempt` zero-indexed.
pub fn retry_delay(attempt: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(attempt);
    base.saturating_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_each_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(0, base), Duration::from_millis(100));
        assert_eq!(retry_delay(1, base), Duration::from_millis(200));
        assert_eq!(retry_delay(2, base), Duration::from_millis(400));
    }
}
