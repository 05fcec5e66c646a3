//! `bin/ndmpd`: argument parsing, config load, logging bring-up, and the
//! call into [`daemon::run`] (`SPEC_FULL.md` §1A). Everything protocol-level
//! lives in `daemon`/`ndmp-core`; this binary only wires those crates to a
//! process.

mod transport;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use daemon::DaemonConfig;

use transport::{StreamReplySink, StreamRequestSource};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = DaemonConfig::parse();
    let file_source_factory: Arc<dyn Fn() -> Box<dyn archive::FileSource + Send> + Send + Sync> =
        Arc::new(|| Box::new(archive::InMemorySource::new(Vec::new())) as Box<dyn archive::FileSource + Send>);

    let result = daemon::run(
        config,
        file_source_factory,
        StreamRequestSource::new,
        |source: &StreamRequestSource| {
            let stream = source
                .try_clone_stream()
                .expect("cloning the accepted control-connection socket");
            StreamReplySink::new(stream)
        },
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "ndmpd exited");
            ExitCode::FAILURE
        }
    }
}
