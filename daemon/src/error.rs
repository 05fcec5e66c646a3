/// Errors the accept loop and session runner can raise outside the request
/// path proper (`§4.1`, `§5`) — request-level failures stay inside
/// [`crate::request::Reply::Err`] and never reach here.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("failed to bind control listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error(transparent)]
    Reactor(#[from] reactor::ReactorError),

    #[error(transparent)]
    Session(#[from] ndmp_core::NdmpError),

    #[error("request source closed the connection")]
    SourceClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
