use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for canvas identifiers: fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Last timestamp handed out by [`NodeId::generate`].
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// `now_ms`, bumped so that consecutive calls never repeat.
fn monotonic_stamp(now_ms: u64) -> u64 {
    let mut prev = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now_ms.max(prev + 1);
        match LAST_STAMP.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an identifier, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of a graph node. Interned: 4 bytes, Copy, O(1) Eq/Hash.
    NodeId
);

interned_id!(
    /// Identifier of an edge between two nodes.
    EdgeId
);

interned_id!(
    /// Identifier of a fixed overlay element.
    OverlayId
);

impl NodeId {
    /// Generate a fresh id of the form `node-<timestamp>`.
    ///
    /// The timestamp is the caller's clock in milliseconds, forced strictly
    /// increasing so two nodes created in the same millisecond still differ.
    pub fn generate(now_ms: u64) -> Self {
        Self::intern(&format!("node-{}", monotonic_stamp(now_ms)))
    }
}

impl EdgeId {
    /// Deterministic id for a connection between two handles. A handle is
    /// appended to its node id after a `:`.
    pub fn for_connection(
        source: NodeId,
        source_handle: Option<&str>,
        target: NodeId,
        target_handle: Option<&str>,
    ) -> Self {
        let end = |node: NodeId, handle: Option<&str>| match handle {
            Some(h) => format!("{node}:{h}"),
            None => node.as_str().to_string(),
        };
        Self::intern(&format!(
            "edge-{}-{}",
            end(source, source_handle),
            end(target, target_handle)
        ))
    }
}
