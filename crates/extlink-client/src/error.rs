use extlink_live::LiveDataError;
use extlink_protocol::{Method, ProtocolError};
use extlink_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("malformed schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("live data error: {0}")]
    LiveData(#[from] LiveDataError),
    #[error("can't process message before registration")]
    NotRegistered,
    #[error("can't process message after failed registration")]
    RegistrationFailed,
    #[error("can't register extension twice")]
    AlreadyRegistered,
    #[error("method '{0}' is not accepted from an extension")]
    UnexpectedMethod(Method),
    #[error("invalid command response id {id} (last issued {last_issued})")]
    InvalidCommandId { id: u64, last_issued: u64 },
    #[error("target '{actual}' does not match extension '{expected}'")]
    TargetMismatch { expected: String, actual: String },
    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),
    #[error("undeclared event '{0}'")]
    UnknownEvent(String),
    #[error("undeclared live data '{0}'")]
    UnknownLiveData(String),
}
