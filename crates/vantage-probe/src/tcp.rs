//! TCP connect probe.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;
use vantage_core::ProbeError;

use crate::failure;

/// Result of one connect attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TcpResult {
    /// Connection established within the budget
    pub ok: bool,
    /// Failure, if any
    pub error: Option<ProbeError>,
}

/// Open and immediately drop a connection to `host:port`.
///
/// Name resolution happens inside the budget, as with a plain socket connect.
pub async fn check_tcp(host: &str, port: u16, budget: Duration) -> TcpResult {
    match tokio::time::timeout(budget, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => TcpResult { ok: true, error: None },
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "tcp connect failed");
            TcpResult {
                ok: false,
                error: Some(failure::from_io(&e)),
            }
        }
        Err(_) => TcpResult {
            ok: false,
            error: Some(failure::timed_out(budget)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use vantage_core::ProbeErrorKind;

    #[tokio::test]
    async fn connects_to_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = check_tcp("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(result.ok);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn closed_port_records_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = check_tcp("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(!result.ok);
        let err = result.error.unwrap();
        assert_eq!(err.kind, ProbeErrorKind::Connection);
        assert!(err.to_string().starts_with("connection: "));
    }
}
