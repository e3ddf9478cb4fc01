//! Shared fixtures for the integration suite.
//!
//! Engines are built per test with small Markdown dumps; the scripted and
//! counting parsers exist so rebuild behavior (coalescing, failure
//! retention) can be observed from the outside.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use scidoc_engine::{
    DocEngine, EngineConfig, MarkdownParser, ParseOutcome, ParserAdapter, ParserRegistry,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// The numpy corpus most tests ingest.
pub const NUMPY_DUMP: &str = "\
# NumPy reference

Library preamble prose, attached to no entity.

## function numpy.array
Aliases: np.array
Tags: array, create

Create an array from existing data.

The body explains copying semantics in detail.

```signature
numpy.array(object, dtype=None)
```

```python
>>> np.array([1, 2, 3])
```

## function numpy.zeros
Tags: array

Return a new array of zeros.

```signature
numpy.zeros(shape, dtype=float)
```

## class numpy.ndarray
Tags: array

An N-dimensional array object.

## function numpy.linalg.solve
Aliases: linalg.solve
Tags: linear, algebra

Solve a linear matrix equation.

## guide numpy.guide.broadcasting
Tags: shapes

How array shapes combine during arithmetic.
";

/// A second library sharing the `linalg.solve` alias with numpy.
pub const SCIPY_DUMP: &str = "\
## function scipy.linalg.solve
Aliases: linalg.solve
Tags: linear, algebra

Solve the linear system ax = b.

## function scipy.fft.fft
Tags: fourier, transform

Compute the one-dimensional discrete Fourier transform.
";

/// One malformed heading among valid records.
pub const MALFORMED_DUMP: &str = "\
## banana numpy.bogus

This section never becomes a record.

## function numpy.ones
Tags: array

Return a new array of ones.

## function numpy.empty
Tags: array

Return a new uninitialized array.
";

/// Redefines `numpy.array` with a different kind; any build over this
/// dump fails with a schema conflict.
pub const CONFLICT_DUMP: &str = "\
## function numpy.array

First definition.

## class numpy.array

Redefinition with a different kind.
";

/// First snapshot for generation-atomicity tests.
pub const V1_DUMP: &str = "\
## function numpy.alpha
Tags: gadget

Gadget paragraph one.

## function numpy.beta
Tags: gadget

Gadget paragraph two.
";

/// Second snapshot with a disjoint id set.
pub const V2_DUMP: &str = "\
## function numpy.gamma
Tags: gadget

Gadget paragraph three.

## function numpy.delta
Tags: gadget

Gadget paragraph four.
";

/// Engine with a Markdown parser registered per library.
pub fn engine_with_libraries(ttl_secs: u64, libraries: &[&str]) -> DocEngine {
    let mut parsers = ParserRegistry::new();
    for library in libraries {
        parsers.register(*library, Arc::new(MarkdownParser::with_document(*library)));
    }
    engine_with_registry(ttl_secs, parsers)
}

pub fn engine_with_registry(ttl_secs: u64, parsers: ParserRegistry) -> DocEngine {
    let config = EngineConfig {
        ttl_secs,
        ..EngineConfig::default()
    };
    DocEngine::new(config, parsers)
}

/// Wraps the Markdown parser, counting invocations and optionally slowing
/// them down so an in-flight rebuild stays observable.
pub struct CountingParser {
    calls: AtomicUsize,
    delay: Duration,
    inner: MarkdownParser,
}

impl CountingParser {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            inner: MarkdownParser::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ParserAdapter for CountingParser {
    fn parse(&self, raw: &str) -> ParseOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            // Runs on the blocking pool, so sleeping here is safe.
            std::thread::sleep(self.delay);
        }
        self.inner.parse(raw)
    }
}

/// Parses a scripted dump per invocation, ignoring the ingested source.
/// Simulates corpus content changing between rebuilds (including builds
/// that fail on a schema conflict).
pub struct ScriptedParser {
    scripts: Vec<&'static str>,
    delay: Duration,
    calls: AtomicUsize,
    inner: MarkdownParser,
}

impl Default for CountingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedParser {
    pub fn new(scripts: Vec<&'static str>) -> Self {
        Self::with_delay(scripts, Duration::ZERO)
    }

    pub fn with_delay(scripts: Vec<&'static str>, delay: Duration) -> Self {
        assert!(!scripts.is_empty(), "ScriptedParser needs at least one script");
        Self {
            scripts,
            delay,
            calls: AtomicUsize::new(0),
            inner: MarkdownParser::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ParserAdapter for ScriptedParser {
    fn parse(&self, _raw: &str) -> ParseOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let script = self.scripts[call.min(self.scripts.len() - 1)];
        self.inner.parse(script)
    }
}
