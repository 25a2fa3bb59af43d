//! Generic processing stages and a memoizing wrapper.
//!
//! A [`Processor`] is a request-to-result pipeline stage writing
//! diagnostics into a report. [`CachedProcessor`] wraps any stage and
//! memoizes successful results keyed by a caller-supplied equivalence over
//! inputs, replaying the stored diagnostics on every hit.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::CoreError;
use crate::report::{LogLevel, ProcessingMessage, ProcessingReport};

/// A request-to-result stage.
pub trait Processor<I, O> {
    /// Process one input, writing diagnostics into `report`.
    ///
    /// # Errors
    ///
    /// Whatever the stage surfaces; a `CachedProcessor` never memoizes
    /// these.
    fn process(&self, report: &mut ProcessingReport, input: &I) -> Result<O, CoreError>;
}

impl<I, O, F> Processor<I, O> for F
where
    F: Fn(&mut ProcessingReport, &I) -> Result<O, CoreError>,
{
    fn process(&self, report: &mut ProcessingReport, input: &I) -> Result<O, CoreError> {
        self(report, input)
    }
}

/// Caller-supplied equivalence over inputs: inputs mapping to equal keys
/// share one cache entry.
pub trait CacheKey<I> {
    type Key: Eq + Hash + Clone;

    fn key(&self, input: &I) -> Self::Key;
}

/// The default equivalence: structural equality of the input itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralKey;

impl<I: Eq + Hash + Clone> CacheKey<I> for StructuralKey {
    type Key = I;

    fn key(&self, input: &I) -> I {
        input.clone()
    }
}

struct CachedOutcome<O> {
    output: O,
    messages: Vec<ProcessingMessage>,
}

/// Memoizes a wrapped stage per equivalence-class key with single-flight
/// semantics: concurrent requests for one key invoke the stage once.
///
/// Only successful completions are memoized, including completions with
/// recorded errors; a stage that returns `Err` is retried on the next
/// call. Hits replay the stored diagnostics into the caller's report,
/// including repeats of the same key within one logical request.
pub struct CachedProcessor<P, E, I, O>
where
    E: CacheKey<I>,
{
    inner: P,
    equivalence: E,
    cache: Mutex<HashMap<E::Key, Arc<OnceCell<CachedOutcome<O>>>>>,
    _input: PhantomData<fn(&I)>,
}

impl<P, I, O> CachedProcessor<P, StructuralKey, I, O>
where
    P: Processor<I, O>,
    I: Eq + Hash + Clone,
{
    /// Wrap `inner` with the structural-equality cache.
    pub fn new(inner: P) -> Self {
        Self::with_equivalence(inner, StructuralKey)
    }
}

impl<P, E, I, O> CachedProcessor<P, E, I, O>
where
    P: Processor<I, O>,
    E: CacheKey<I>,
{
    /// Wrap `inner`, caching under the given equivalence.
    pub fn with_equivalence(inner: P, equivalence: E) -> Self {
        CachedProcessor {
            inner,
            equivalence,
            cache: Mutex::new(HashMap::new()),
            _input: PhantomData,
        }
    }
}

impl<P, E, I, O> Processor<I, O> for CachedProcessor<P, E, I, O>
where
    P: Processor<I, O>,
    E: CacheKey<I>,
    O: Clone,
{
    fn process(&self, report: &mut ProcessingReport, input: &I) -> Result<O, CoreError> {
        let key = self.equivalence.key(input);
        let slot = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(key).or_default())
        };
        let outcome = slot.get_or_try_init(|| {
            // Capture everything the stage records; the caller's exception
            // threshold still applies while the stage runs.
            let mut captured =
                ProcessingReport::with_thresholds(LogLevel::Debug, report.exception_threshold());
            let output = self.inner.process(&mut captured, input)?;
            Ok::<_, CoreError>(CachedOutcome {
                output,
                messages: captured.into_messages(),
            })
        })?;
        report.replay(&outcome.messages)?;
        Ok(outcome.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_stage(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(&mut ProcessingReport, &String) -> Result<usize, CoreError> {
        move |report: &mut ProcessingReport, input: &String| {
            calls.fetch_add(1, Ordering::SeqCst);
            report.warn(format!("processed {input}"))?;
            Ok(input.len())
        }
    }

    #[test]
    fn equivalent_inputs_invoke_the_stage_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedProcessor::new(counting_stage(Arc::clone(&calls)));

        let mut report = ProcessingReport::new();
        assert_eq!(cached.process(&mut report, &"abc".to_string()).unwrap(), 3);
        assert_eq!(cached.process(&mut report, &"abc".to_string()).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn diagnostics_replay_on_every_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedProcessor::new(counting_stage(calls));

        let mut report = ProcessingReport::new();
        cached.process(&mut report, &"abc".to_string()).unwrap();
        cached.process(&mut report, &"abc".to_string()).unwrap();

        let warnings: Vec<_> = report
            .messages()
            .iter()
            .filter(|m| m.level == LogLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].text, "processed abc");
    }

    #[test]
    fn distinct_keys_are_processed_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedProcessor::new(counting_stage(Arc::clone(&calls)));

        let mut report = ProcessingReport::new();
        cached.process(&mut report, &"a".to_string()).unwrap();
        cached.process(&mut report, &"bb".to_string()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failures_are_not_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = {
            let calls = Arc::clone(&calls);
            move |report: &mut ProcessingReport, _input: &String| -> Result<usize, CoreError> {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt == 0 {
                    report.log(LogLevel::Fatal, "first attempt fails")?;
                }
                Ok(7)
            }
        };
        let cached = CachedProcessor::new(inner);

        let mut report = ProcessingReport::new();
        assert!(cached.process(&mut report, &"x".to_string()).is_err());
        // The error was not cached; the second call retries and succeeds.
        assert_eq!(cached.process(&mut report, &"x".to_string()).unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn completed_with_recorded_errors_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = {
            let calls = Arc::clone(&calls);
            move |report: &mut ProcessingReport, _input: &String| -> Result<usize, CoreError> {
                calls.fetch_add(1, Ordering::SeqCst);
                report.error("recorded but not thrown")?;
                Ok(1)
            }
        };
        let cached = CachedProcessor::new(inner);

        let mut report = ProcessingReport::new();
        cached.process(&mut report, &"x".to_string()).unwrap();
        cached.process(&mut report, &"x".to_string()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!report.is_success());
        assert_eq!(report.messages().len(), 2);
    }

    #[test]
    fn custom_equivalence_collapses_inputs() {
        struct ByLength;
        impl CacheKey<String> for ByLength {
            type Key = usize;

            fn key(&self, input: &String) -> usize {
                input.len()
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let cached =
            CachedProcessor::with_equivalence(counting_stage(Arc::clone(&calls)), ByLength);

        let mut report = ProcessingReport::new();
        cached.process(&mut report, &"ab".to_string()).unwrap();
        cached.process(&mut report, &"cd".to_string()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_requests_share_one_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = Arc::new(CachedProcessor::new(counting_stage(Arc::clone(&calls))));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cached = Arc::clone(&cached);
            handles.push(std::thread::spawn(move || {
                let mut report = ProcessingReport::new();
                cached.process(&mut report, &"shared".to_string()).unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 6);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
