/// Message codes the session core dispatches on.
///
/// Only the codes the core owns are listed here (`§6` of the design). Auth,
/// config, and filesystem-walk message codes belong to external collaborators
/// and never reach the dispatcher table in `daemon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCode {
    DataGetState,
    DataStartBackup,
    DataStartRecover,
    DataStartRecoverFilehist,
    DataAbort,
    DataStop,
    DataListen,
    DataConnect,
    DataGetEnv,
}

/// Server-initiated messages; these never carry a reply the DMA is expected
/// to have requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyCode {
    DataHalted,
    MoverPaused,
    MoverHalted,
    LogMessage,
    LogFile,
}
