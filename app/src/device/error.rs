use derive_more::{Display, Error, From};

use super::ConfigurationError;

///Why a request to the device did not produce a usable answer
#[derive(Debug, Display, Error)]
pub enum TransportError {
    #[display("Request to device timed out")]
    Timeout,

    #[display("Device unreachable: {_0}")]
    Unreachable(reqwest_middleware::Error),

    #[display("Device responded with HTTP status {_0}")]
    Status(#[error(not(source))] u16),

    #[display("Malformed response from device: {_0}")]
    Malformed(serde_json::Error),
}

impl From<reqwest_middleware::Error> for TransportError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match &error {
            reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => TransportError::Timeout,
            _ => TransportError::Unreachable(error),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        reqwest_middleware::Error::Reqwest(error).into()
    }
}

#[derive(Debug, Display, Error, From)]
#[display("Error fetching device reading: {cause}")]
pub struct FetchError {
    #[error(source)]
    pub cause: TransportError,
}

#[derive(Debug, Display, Error, From)]
pub enum CommandError {
    #[display("Invalid command: {_0}")]
    Invalid(ConfigurationError),

    #[display("Device command failed: {_0}")]
    Transport(TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_cause() {
        let error = FetchError::from(TransportError::Status(503));
        assert_eq!(
            error.to_string(),
            "Error fetching device reading: Device responded with HTTP status 503"
        );

        let error = CommandError::from(ConfigurationError::EmptyDeviceName);
        assert_eq!(error.to_string(), "Invalid command: Device name must not be empty");
    }

    #[test]
    fn test_fetch_error_exposes_source() {
        use std::error::Error as _;

        let error = FetchError::from(TransportError::Timeout);
        assert!(error.source().is_some());
    }
}
