//! Central configuration constants for runtime limits and defaults.

/// Default number of concurrent transfers.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Minimum allowed concurrent transfers.
pub const MIN_WORKERS: usize = 1;

/// Region used when none is given on the command line.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Program invoked to decrypt the credentials file.
pub const DEFAULT_GPG_PROGRAM: &str = "gpg";

/// Buffered progress events between the scheduler and the renderer.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// Parse a worker count; anything below `MIN_WORKERS` is rejected.
pub fn parse_workers(v: &str) -> Result<usize, String> {
    let n: usize = v
        .trim()
        .parse()
        .map_err(|_| format!("`{v}` is not a whole number"))?;
    if n < MIN_WORKERS {
        return Err(format!("worker count must be at least {MIN_WORKERS}, got {n}"));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range() {
        assert_eq!(parse_workers("1"), Ok(1));
        assert_eq!(parse_workers(" 8 "), Ok(8));
        assert_eq!(parse_workers("1000"), Ok(1000));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("-3").is_err());
        assert!(parse_workers("five").is_err());
    }
}
