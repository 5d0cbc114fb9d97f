// SPDX-License-Identifier: MIT OR Apache-2.0
//! The orchestrator narrates its admin path through `tracing`; install a
//! capturing subscriber and assert on the emitted lines.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use vigil_orchestrator::mock::{MockStore, MockWorker};
use vigil_orchestrator::{Orchestrator, Store, Worker};
use vigil_router::EntryPost;

#[derive(Clone, Default)]
struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_logs(f: impl FnOnce()) -> String {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    writer.contents()
}

fn orchestrator(workers: Vec<Box<dyn Worker>>) -> Orchestrator {
    Orchestrator::new(workers, Arc::new(MockStore::new()) as Arc<dyn Store>)
}

#[test]
fn admin_path_emits_structured_logs() {
    let logs = capture_logs(|| {
        let orch = orchestrator(vec![Box::new(MockWorker::default())]);
        orch.start().unwrap();
        orch.post_entry(EntryPost::new(
            "route",
            "policy/route/0",
            "filter/route/0",
            10,
        ))
        .unwrap();
        orch.stop();
    });

    assert!(logs.contains("orchestrator started"), "missing start line in:\n{logs}");
    assert!(logs.contains("state persisted"), "missing persist line in:\n{logs}");
    assert!(logs.contains("orchestrator stopped"), "missing stop line in:\n{logs}");
}

#[test]
fn failed_fan_out_logs_a_warning() {
    let logs = capture_logs(|| {
        let orch = orchestrator(vec![Box::new(
            MockWorker::default().failing_op("router_add"),
        )]);
        let _ = orch.post_entry(EntryPost::new(
            "route",
            "policy/route/0",
            "filter/route/0",
            10,
        ));
    });

    assert!(logs.contains("WARN"), "expected a warning in:\n{logs}");
    assert!(
        logs.contains("admin fan-out failed"),
        "missing fan-out warning in:\n{logs}"
    );
}
