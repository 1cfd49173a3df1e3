use {super::*, snafu::Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    #[snafu(display("connect timed out after {timeout:?}"))]
    Timeout { timeout: Duration },

    #[snafu(display("io error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("connection actor is not running"))]
    NotConnected,

    #[snafu(display("serialization error: {source}"))]
    Serialization { source: serde_json::Error },

    #[snafu(display("pool returned an error: {source}"))]
    Rpc { source: JsonRpcError },
}
