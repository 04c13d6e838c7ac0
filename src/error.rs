//! Streaming errors

use crate::transport::{Transport, TransportError};

/// Interval between diagnostics while halted, in milliseconds
const HALT_INTERVAL_MS: u32 = 100;

/// The transport operation that failed while starting a stream
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Operation {
    ConfigureEndpoint,
    CreatePool,
    StartTransfer,
}

/// Errors from the control plane and the streaming engine
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    /// A stream couldn't start. The device stays configured, but idle.
    Configuration {
        op: Operation,
        cause: TransportError,
    },
    /// A commit failed during a session. The engine restarts the stream.
    Transfer { cause: TransportError },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Configuration { op, cause } => {
                write!(f, "stream start failed in {:?}: {}", op, cause)
            }
            Error::Transfer { cause } => write!(f, "commit failed: {}", cause),
        }
    }
}

/// Park the firmware after an unrecoverable error
///
/// Logs `error`, then sleeps forever through the transport so that
/// other tasks keep running.
#[cfg_attr(
    not(any(feature = "defmt-03", feature = "__log")),
    allow(unused_variables)
)]
pub fn halt<T: Transport>(transport: &T, error: &Error) -> ! {
    error!("Halting: {:?}", error);
    loop {
        transport.delay_ms(HALT_INTERVAL_MS);
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Operation};
    use crate::transport::TransportError;
    use std::string::ToString;

    #[test]
    fn display() {
        let error = Error::Configuration {
            op: Operation::CreatePool,
            cause: TransportError::Platform(0x40),
        };
        assert_eq!(
            error.to_string(),
            "stream start failed in CreatePool: platform status 0x40"
        );
        let error = Error::Transfer {
            cause: TransportError::Cancelled,
        };
        assert_eq!(error.to_string(), "commit failed: transfer channel torn down");
    }
}
