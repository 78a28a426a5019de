use derive_more::Display;
use serde::Serialize;

///Reachability of the device as seen by the poll loop.
///
///`Connecting` while a poll is in flight, `Connected` after it succeeded, `Disconnected` after it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    #[display("connecting")]
    Connecting,
    #[display("connected")]
    Connected,
    #[display("disconnected")]
    Disconnected,
}
