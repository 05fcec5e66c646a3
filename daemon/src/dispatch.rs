use wire::ProtocolVersion;

use crate::handlers::SessionRuntime;
use crate::request::{Reply, Request};

/// The `(ProtocolVersion, MessageCode)` table from `§4.2A`, realized as a
/// direct match rather than a runtime registry — the message set is fixed
/// at compile time, the same way the teacher's protocol-version resolution
/// works. Version only changes behavior for `StartRecoverFilehist`, which
/// exists at all solely because V4 added it; every other request is
/// version-independent once decoded into [`Request`].
pub fn dispatch(runtime: &SessionRuntime, protocol_version: ProtocolVersion, request: Request) -> Reply {
    if matches!(request, Request::StartRecoverFilehist) && protocol_version != ProtocolVersion::V4 {
        tracing::warn!(?protocol_version, "filehist recover requested outside V4");
    }
    runtime.dispatch(request)
}
