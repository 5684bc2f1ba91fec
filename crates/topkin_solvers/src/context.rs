//! Per-caller solver state and diagnostics.
//!
//! A [`SolverContext`] carries the [`SolverSettings`], the diagnostics sink,
//! the warning budgets, the massive-b fast-break table and call counters.
//! Every solver entry point that can emit diagnostics or keeps state
//! between iterations takes `&mut SolverContext`.
//!
//! # Example
//!
//! ```
//! use topkin_solvers::config::{SolverSettings, Verbosity};
//! use topkin_solvers::context::{MemorySink, SolverContext, WarningKind};
//!
//! let sink = MemorySink::new();
//! let mut ctx = SolverContext::new(SolverSettings::default().with_verbosity(Verbosity::Warnings))
//!     .unwrap()
//!     .with_sink(Box::new(sink.clone()));
//!
//! ctx.warn_limited(WarningKind::NuzPeakNoConvergence, "example", || "no convergence".into());
//! assert_eq!(sink.records().len(), 1);
//! ```

use crate::config::{ConfigError, SolverSettings, Verbosity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Notice emitted once when a rate-limited warning runs out of budget.
pub const SUPPRESSION_NOTICE: &str = "Further occurrences of this message will be suppressed";

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Something the caller should know about.
    Warning,
    /// Per-iteration trace.
    Iteration,
    /// Fine-grained trace.
    Detail,
}

/// Rate-limited warning categories. Each has its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Local neutrino Pz peak search did not converge.
    NuzPeakNoConvergence,
    /// W mass minimum Newton search hit its iteration cap.
    WMassIterationLimit,
    /// W mass Newton search found no true minimum; bisection follows.
    WMassNoMinimum,
    /// Massless-b leptonic quartic had more than two roots.
    LeptonicManySolutions,
    /// Massive-b iteration lost its solutions after the first step.
    MassiveBNoSolution,
    /// Massive-b iteration converged with more than two roots.
    MassiveBManySolutions,
    /// Massive-b iteration hit its iteration cap.
    MassiveBIterationLimit,
    /// Massive-b iteration stopped on a point that misses the mass
    /// constraints; the record was dropped.
    MassiveBOffShell,
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Name of the emitting operation.
    pub source: &'static str,
    /// Rate-limit category, for warnings that have one.
    pub kind: Option<WarningKind>,
    /// Rendered message.
    pub message: String,
}

/// Destination of diagnostic records.
pub trait DiagnosticsSink: Send {
    /// Consume one record.
    fn record(&mut self, diagnostic: &Diagnostic);
}

/// Forwards records to `tracing`: warnings at `warn`, iteration traces at
/// `debug` and detailed traces at `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Warning => {
                tracing::warn!(source = diagnostic.source, "{}", diagnostic.message)
            }
            DiagnosticLevel::Iteration => {
                tracing::debug!(source = diagnostic.source, "{}", diagnostic.message)
            }
            DiagnosticLevel::Detail => {
                tracing::trace!(source = diagnostic.source, "{}", diagnostic.message)
            }
        }
    }
}

/// Keeps every record in shared memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records captured so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Records whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<Diagnostic> {
        self.records()
            .into_iter()
            .filter(|d| d.message.contains(needle))
            .collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&mut self, diagnostic: &Diagnostic) {
        let mut guard = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(diagnostic.clone());
    }
}

/// Drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&mut self, _diagnostic: &Diagnostic) {}
}

/// Number of calls made through a context, per stateful solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    /// Calls of the iterative massive-b solver.
    pub massive_b: u64,
    /// Calls of the verbose massive-b solver.
    pub massive_b_verbose: u64,
    /// Calls of the brute-force massive-b solver.
    pub massive_b_brute: u64,
}

/// Mutable state shared by the solver entry points.
///
/// The context is `Send`; use one per thread.
pub struct SolverContext {
    settings: SolverSettings,
    sink: Box<dyn DiagnosticsSink>,
    warnings_emitted: HashMap<WarningKind, u32>,
    fast_break: Vec<bool>,
    counters: CallCounters,
}

impl std::fmt::Debug for SolverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverContext")
            .field("settings", &self.settings)
            .field("warnings_emitted", &self.warnings_emitted)
            .field("fast_break", &self.fast_break)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl Default for SolverContext {
    fn default() -> Self {
        Self::from_parts(SolverSettings::default(), Box::new(TracingSink))
    }
}

impl SolverContext {
    /// Validate `settings` and build a context logging through `tracing`.
    pub fn new(settings: SolverSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::from_parts(settings, Box::new(TracingSink)))
    }

    fn from_parts(settings: SolverSettings, sink: Box<dyn DiagnosticsSink>) -> Self {
        Self {
            settings,
            sink,
            warnings_emitted: HashMap::new(),
            fast_break: Vec::new(),
            counters: CallCounters::default(),
        }
    }

    /// Replace the diagnostics sink.
    pub fn with_sink(mut self, sink: Box<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.settings.verbosity
    }

    /// True when output at `level` is enabled.
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Silent && self.settings.verbosity >= level
    }

    /// Call counters.
    pub fn call_counts(&self) -> CallCounters {
        self.counters
    }

    /// Number of times `kind` has been emitted.
    pub fn warnings_emitted(&self, kind: WarningKind) -> u32 {
        self.warnings_emitted.get(&kind).copied().unwrap_or(0)
    }

    /// Starting points flagged during the last massive-b call.
    pub fn fast_break_table(&self) -> &[bool] {
        &self.fast_break
    }

    /// Unlimited warning, emitted at [`Verbosity::Basic`] and above.
    pub fn warn<F>(&mut self, source: &'static str, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled(Verbosity::Basic) {
            self.emit(DiagnosticLevel::Warning, source, None, message());
        }
    }

    /// Rate-limited warning, emitted at [`Verbosity::Warnings`] and above
    /// while the budget for `kind` lasts. The last permitted occurrence is
    /// followed by [`SUPPRESSION_NOTICE`].
    pub fn warn_limited<F>(&mut self, kind: WarningKind, source: &'static str, message: F)
    where
        F: FnOnce() -> String,
    {
        if !self.enabled(Verbosity::Warnings) {
            return;
        }
        let budget = self.settings.warning_budget;
        let emitted = self.warnings_emitted.entry(kind).or_insert(0);
        if *emitted >= budget {
            return;
        }
        *emitted += 1;
        let exhausted = *emitted == budget;

        self.emit(DiagnosticLevel::Warning, source, Some(kind), message());
        if exhausted {
            self.emit(
                DiagnosticLevel::Warning,
                source,
                Some(kind),
                SUPPRESSION_NOTICE.to_string(),
            );
        }
    }

    /// Iteration trace, emitted at [`Verbosity::Iterations`] and above.
    pub fn trace_iteration<F>(&mut self, source: &'static str, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled(Verbosity::Iterations) {
            self.emit(DiagnosticLevel::Iteration, source, None, message());
        }
    }

    /// Detailed trace, emitted at [`Verbosity::Detailed`].
    pub fn trace_detail<F>(&mut self, source: &'static str, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled(Verbosity::Detailed) {
            self.emit(DiagnosticLevel::Detail, source, None, message());
        }
    }

    /// Send a record to the sink without any verbosity check.
    pub(crate) fn emit(
        &mut self,
        level: DiagnosticLevel,
        source: &'static str,
        kind: Option<WarningKind>,
        message: String,
    ) {
        let diagnostic = Diagnostic {
            level,
            source,
            kind,
            message,
        };
        self.sink.record(&diagnostic);
    }

    pub(crate) fn reset_fast_break(&mut self, n: usize) {
        self.fast_break.clear();
        self.fast_break.resize(n, false);
    }

    pub(crate) fn is_fast_break(&self, index: usize) -> bool {
        self.fast_break.get(index).copied().unwrap_or(false)
    }

    pub(crate) fn set_fast_break(&mut self, index: usize) {
        if let Some(flag) = self.fast_break.get_mut(index) {
            *flag = true;
        }
    }

    pub(crate) fn counters_mut(&mut self) -> &mut CallCounters {
        &mut self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(verbosity: Verbosity, budget: u32) -> (SolverContext, MemorySink) {
        let sink = MemorySink::new();
        let mut settings = SolverSettings::default().with_verbosity(verbosity);
        settings.warning_budget = budget;
        let ctx = SolverContext::new(settings)
            .unwrap()
            .with_sink(Box::new(sink.clone()));
        (ctx, sink)
    }

    // ========================================
    // Verbosity Gating
    // ========================================

    #[test]
    fn test_silent_context_emits_nothing() {
        let (mut ctx, sink) = context(Verbosity::Silent, 10);
        ctx.warn("test", || "basic".into());
        ctx.warn_limited(WarningKind::WMassNoMinimum, "test", || "limited".into());
        ctx.trace_iteration("test", || "iter".into());
        ctx.trace_detail("test", || "detail".into());
        assert!(sink.records().is_empty());
        assert!(!ctx.enabled(Verbosity::Silent));
    }

    #[test]
    fn test_levels_are_cumulative() {
        let (mut ctx, sink) = context(Verbosity::Iterations, 10);
        ctx.warn("test", || "basic".into());
        ctx.warn_limited(WarningKind::WMassNoMinimum, "test", || "limited".into());
        ctx.trace_iteration("test", || "iter".into());
        ctx.trace_detail("test", || "detail".into());

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].level, DiagnosticLevel::Iteration);
        assert!(sink.matching("detail").is_empty());
    }

    #[test]
    fn test_message_not_built_when_disabled() {
        let (mut ctx, _sink) = context(Verbosity::Basic, 10);
        ctx.trace_detail("test", || panic!("message closure must not run"));
    }

    // ========================================
    // Rate Limiting
    // ========================================

    #[test]
    fn test_budget_and_suppression_notice() {
        let (mut ctx, sink) = context(Verbosity::Warnings, 3);
        for i in 0..10 {
            ctx.warn_limited(WarningKind::MassiveBIterationLimit, "test", || format!("w{}", i));
        }
        let records = sink.records();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].message, SUPPRESSION_NOTICE);
        assert_eq!(ctx.warnings_emitted(WarningKind::MassiveBIterationLimit), 3);

        // Other kinds keep their own budget
        ctx.warn_limited(WarningKind::MassiveBNoSolution, "test", || "other".into());
        assert_eq!(sink.records().len(), 5);
    }

    #[test]
    fn test_zero_budget_silences_kind() {
        let (mut ctx, sink) = context(Verbosity::Detailed, 0);
        ctx.warn_limited(WarningKind::WMassNoMinimum, "test", || "never".into());
        assert!(sink.records().is_empty());
    }

    // ========================================
    // State
    // ========================================

    #[test]
    fn test_fast_break_table() {
        let mut ctx = SolverContext::default();
        ctx.reset_fast_break(3);
        ctx.set_fast_break(1);
        ctx.set_fast_break(7);
        assert_eq!(ctx.fast_break_table(), &[false, true, false]);
        assert!(ctx.is_fast_break(1));
        assert!(!ctx.is_fast_break(7));

        ctx.reset_fast_break(2);
        assert_eq!(ctx.fast_break_table(), &[false, false]);
    }

    #[test]
    fn test_context_rejects_invalid_settings() {
        let settings = SolverSettings::default().with_max_iterations(0);
        assert!(SolverContext::new(settings).is_err());
    }

    #[test]
    fn test_context_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SolverContext>();
    }

    #[test]
    fn test_debug_omits_sink() {
        let ctx = SolverContext::default();
        let text = format!("{:?}", ctx);
        assert!(text.contains("SolverContext"));
        assert!(text.contains("settings"));
    }
}
