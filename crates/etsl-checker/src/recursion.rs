//! Recursion guard for cycle detection and depth limiting.
//!
//! `RecursionGuard` combines a visiting set (cycle detection) with depth and
//! iteration bounds. It is used by the checker (declarations referring to
//! themselves), by relations (inheritance walks) and by the constant
//! evaluator of the lowering crate (`const` initializer chains).
//!
//! ```ignore
//! let mut guard = RecursionGuard::with_profile(RecursionProfile::ConstResolution);
//! match guard.enter(key) {
//!     RecursionResult::Entered => {
//!         let value = evaluate();
//!         guard.leave(key);
//!         value
//!     }
//!     RecursionResult::Cycle => report_cycle(),
//!     RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => give_up(),
//! }
//! ```

use etsl_common::limits::{MAX_AST_DEPTH, MAX_CONST_RESOLUTION_DEPTH, MAX_INHERITANCE_DEPTH};
use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Structural assignability checks.
    ///
    /// depth = 100, iterations = 100,000
    SubtypeCheck,

    /// Declaration and expression checking.
    ///
    /// depth = `MAX_AST_DEPTH`
    ExpressionCheck,

    /// Walking `extends`/`implements` chains.
    ///
    /// depth = `MAX_INHERITANCE_DEPTH`
    Inheritance,

    /// Following `const` initializer chains during folding.
    ///
    /// depth = `MAX_CONST_RESOLUTION_DEPTH`
    ConstResolution,

    /// Custom limits for one-off or test scenarios.
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    #[must_use]
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::SubtypeCheck => 100,
            Self::ExpressionCheck => MAX_AST_DEPTH,
            Self::Inheritance => MAX_INHERITANCE_DEPTH,
            Self::ConstResolution => MAX_CONST_RESOLUTION_DEPTH,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    #[must_use]
    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::Custom { max_iterations, .. } => max_iterations,
            _ => 100_000,
        }
    }
}

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// This key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    #[must_use]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    #[must_use]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    #[must_use]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

/// Tracks recursion state for cycle detection, depth limiting and iteration
/// bounding. Every successful `enter(key)` must be paired with `leave(key)`.
#[derive(Clone, Debug)]
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    #[must_use]
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    #[must_use]
    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);
        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.visiting.contains(&key) {
            return RecursionResult::Cycle;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        self.visiting.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not in the visiting set"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` inside a guarded scope; `Err` carries the reason entry was denied.
    pub fn scope<T>(&mut self, key: K, f: impl FnOnce() -> T) -> Result<T, RecursionResult> {
        match self.enter(key) {
            RecursionResult::Entered => {
                let result = f();
                self.leave(key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Sticky: stays set until `reset`.
    #[inline]
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    pub fn reset(&mut self) {
        self.visiting.clear();
        self.depth = 0;
        self.iterations = 0;
        self.exceeded = false;
    }
}
