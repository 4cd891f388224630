//! Test helpers: logging setup and a small node type to build trees from.

use std::env;
use std::io;
use std::sync::{Arc, Mutex, Once};
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::arena::{NodeId, TreeArena};
use crate::domain::content::NodeContent;
use crate::errors::TreeResult;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");
    let env_filter = match env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new("debug"),
    };

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged at
/// `warn` level and above, without ANSI colors.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(move || SharedBuffer(Arc::clone(&sink)))
            .with_ansi(false)
            .with_target(false)
            .with_filter(EnvFilter::new("warn")),
    );
    let result = tracing::subscriber::with_default(subscriber, f);

    let logs = buffer
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    (result, logs)
}

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Block,
    Leaf,
    /// Single-child passthrough, skipped by `normalize`
    Wrapper,
    Special,
    /// Breaks the shallow copy contract: its copies come with a child
    BadCopy,
}

/// Named node used to build trees in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub kind: LabelKind,
    pub name: String,
}

impl Label {
    pub fn new(kind: LabelKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn block(name: impl Into<String>) -> Self {
        Self::new(LabelKind::Block, name)
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(LabelKind::Leaf, name)
    }

    pub fn wrapper(name: impl Into<String>) -> Self {
        Self::new(LabelKind::Wrapper, name)
    }

    pub fn special(name: impl Into<String>) -> Self {
        Self::new(LabelKind::Special, name)
    }

    pub fn bad_copy(name: impl Into<String>) -> Self {
        Self::new(LabelKind::BadCopy, name)
    }
}

impl NodeContent for Label {
    type Kind = LabelKind;

    fn kind(&self) -> LabelKind {
        self.kind
    }

    fn to_content_string(&self) -> String {
        self.name.clone()
    }

    fn copy_shallow(arena: &mut TreeArena<Self>, source: NodeId) -> TreeResult<NodeId> {
        let content = arena.content(source)?.clone();
        let broken = content.kind == LabelKind::BadCopy;
        let copy = arena.new_node(content);
        if broken {
            let stray = arena.new_node(Label::leaf("stray"));
            arena.add_child(copy, stray)?;
        }
        Ok(copy)
    }
}

/// Handles of the sample tree `a(b(c, d), e)`.
#[derive(Debug, Clone, Copy)]
pub struct SampleTree {
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub d: NodeId,
    pub e: NodeId,
}

impl SampleTree {
    /// Builds `a(b(c, d), e)` with `a` and `b` as blocks, the rest as leaves.
    pub fn build(arena: &mut TreeArena<Label>) -> TreeResult<Self> {
        let a = arena.new_node(Label::block("a"));
        let b = arena.new_node(Label::block("b"));
        let c = arena.new_node(Label::leaf("c"));
        let d = arena.new_node(Label::leaf("d"));
        let e = arena.new_node(Label::leaf("e"));
        arena.add_children(b, &[c, d])?;
        arena.add_children(a, &[b, e])?;
        Ok(Self { a, b, c, d, e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn test_capture_warnings_keeps_warnings_only() {
        let ((), logs) = capture_warnings(|| {
            info!("not captured");
            tracing::warn!("captured");
        });

        assert!(logs.contains("WARN"));
        assert!(logs.contains("captured"));
        assert!(!logs.contains("not captured"));
    }

    #[test]
    fn test_sample_tree_shape() {
        let mut arena = TreeArena::new();
        let t = SampleTree::build(&mut arena).unwrap();

        assert_eq!(arena.children(t.a).unwrap(), &[t.b, t.e]);
        assert_eq!(arena.children(t.b).unwrap(), &[t.c, t.d]);
        arena.verify_integrity().unwrap();
    }
}
