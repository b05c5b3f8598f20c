use catalog::Context;
use std::time::Duration;
use tonic::metadata::MetadataMap;

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Builds the cancellation context for one inbound call. The deadline comes
/// from the caller's `grpc-timeout` header; without one the call never expires.
pub fn call_context(metadata: &MetadataMap) -> Context {
    let timeout = metadata
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_grpc_timeout);
    match timeout {
        Some(timeout) => {
            debug!("call deadline in {:?}", timeout);
            Context::with_timeout(timeout)
        }
        None => Context::background(),
    }
}

/// Parses a `grpc-timeout` value: at most eight ASCII digits followed by one
/// unit letter (H, M, S, m, u or n).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    match unit {
        "H" => Some(Duration::from_secs(amount * 60 * 60)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use catalog::ContextError;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("10u"), Some(Duration::from_micros(10)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("10"), None);
        assert_eq!(parse_grpc_timeout("10x"), None);
        assert_eq!(parse_grpc_timeout("-1S"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
    }

    #[test]
    fn missing_header_never_expires() {
        let ctx = call_context(&MetadataMap::new());
        assert!(ctx.deadline().is_none());
        assert_eq!(ctx.err(), Ok(()));
    }

    #[test]
    fn header_sets_deadline() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, "0n".parse().unwrap());
        let ctx = call_context(&metadata);
        assert!(ctx.deadline().is_some());
        assert_eq!(ctx.err(), Err(ContextError::DeadlineExceeded));

        metadata.insert(GRPC_TIMEOUT_HEADER, "1H".parse().unwrap());
        assert_eq!(call_context(&metadata).err(), Ok(()));
    }
}
