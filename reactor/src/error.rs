#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("fd {0} is already registered")]
    AlreadyRegistered(std::os::unix::io::RawFd),

    #[error("poll(2) failed: {0}")]
    Poll(#[source] std::io::Error),

    #[error("handler for fd {fd} failed: {source}")]
    Handler {
        fd: std::os::unix::io::RawFd,
        #[source]
        source: std::io::Error,
    },
}
