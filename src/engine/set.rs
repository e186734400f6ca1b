use super::{Backend, EngineDescriptor, GeometricEngine, LinearEngine, NeuralEngine};
use crate::config::EngineConfig;
use crate::models::{EngineKind, Frame};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

const DISABLED_REASON: &str = "disabled by configuration";

/// One ranked engine with its resolved availability
pub struct Engine {
    descriptor: EngineDescriptor,
    backend: Box<dyn Backend>,
}

impl Engine {
    /// Descriptor resolved at construction
    pub fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    /// Engine family
    pub fn kind(&self) -> EngineKind {
        self.descriptor.kind
    }

    /// Run one decode attempt; errors and panics become "not found"
    pub fn attempt(&self, frame: &Frame) -> Option<String> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.backend.decode(frame)));
        match outcome {
            Ok(Ok(Some(text))) if !text.is_empty() => Some(text),
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                log::warn!("{}", err);
                None
            }
            Err(payload) => {
                log::warn!(
                    "{} engine panicked during decode: {}",
                    self.descriptor.name,
                    panic_message(payload.as_ref())
                );
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Ordered decoding engines, availability probed once at construction
pub struct EngineSet {
    engines: Vec<Engine>,
}

impl EngineSet {
    /// Probe each backend and order them by their kind's default rank
    pub fn new(backends: Vec<Box<dyn Backend>>) -> Self {
        Self::with_ranks(
            backends
                .into_iter()
                .map(|b| (b.kind().default_rank(), b))
                .collect(),
        )
    }

    /// Probe each backend and order by the given ranks; equal ranks keep input order
    pub fn with_ranks(entries: Vec<(u8, Box<dyn Backend>)>) -> Self {
        let mut engines: Vec<Engine> = entries
            .into_iter()
            .map(|(rank, backend)| probe(rank, backend, None))
            .collect();
        engines.sort_by_key(|e| e.descriptor.rank);
        Self { engines }
    }

    /// Neural, geometric and linear engines as configured
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut engines: Vec<Engine> = EngineKind::ALL
            .into_iter()
            .map(|kind| {
                let backend: Box<dyn Backend> = match kind {
                    EngineKind::Neural => Box::new(NeuralEngine::from_config(&config.neural)),
                    EngineKind::Geometric => Box::new(GeometricEngine::new()),
                    EngineKind::Linear => Box::new(LinearEngine::new()),
                };
                let disabled = (!config.enabled.contains(&kind)).then_some(DISABLED_REASON);
                probe(kind.default_rank(), backend, disabled)
            })
            .collect();
        engines.sort_by_key(|e| e.descriptor.rank);
        Self { engines }
    }

    /// Default configuration
    pub fn standard() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    /// Every engine, available or not, in rank order
    pub fn capability_status(&self) -> Vec<EngineDescriptor> {
        self.engines.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Available engines in rank order
    pub fn available(&self) -> impl Iterator<Item = &Engine> + '_ {
        self.engines.iter().filter(|e| e.descriptor.available)
    }

    /// Number of available engines
    pub fn available_count(&self) -> usize {
        self.available().count()
    }

    /// True when `kind` passed its probe
    pub fn is_available(&self, kind: EngineKind) -> bool {
        self.available().any(|e| e.kind() == kind)
    }
}

fn probe(rank: u8, backend: Box<dyn Backend>, disabled: Option<&str>) -> Engine {
    let name = backend.name();
    let kind = backend.kind();

    let result = match disabled {
        Some(reason) => Err(reason.to_string()),
        None => match panic::catch_unwind(AssertUnwindSafe(|| backend.probe())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(payload) => Err(format!("probe panicked: {}", panic_message(payload.as_ref()))),
        },
    };

    match &result {
        Ok(()) => log::debug!("engine {} available at rank {}", name, rank),
        Err(reason) => log::warn!("engine {} unavailable: {}", name, reason),
    }

    Engine {
        descriptor: EngineDescriptor {
            name,
            kind,
            rank,
            available: result.is_ok(),
            reason: result.err(),
        },
        backend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        kind: EngineKind,
        probe_ok: bool,
        calls: Arc<AtomicUsize>,
        behaviour: fn(usize) -> Result<Option<String>, EngineError>,
    }

    impl Backend for Scripted {
        fn kind(&self) -> EngineKind {
            self.kind
        }

        fn probe(&self) -> Result<(), EngineError> {
            if self.probe_ok {
                Ok(())
            } else {
                Err(EngineError::Unavailable {
                    engine: self.kind,
                    reason: "no model".into(),
                })
            }
        }

        fn decode(&self, _frame: &Frame) -> Result<Option<String>, EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.behaviour)(n)
        }
    }

    fn scripted(
        kind: EngineKind,
        probe_ok: bool,
        behaviour: fn(usize) -> Result<Option<String>, EngineError>,
    ) -> (Box<dyn Backend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Scripted {
            kind,
            probe_ok,
            calls: calls.clone(),
            behaviour,
        };
        (Box::new(backend), calls)
    }

    #[test]
    fn test_orders_by_rank_and_hides_failed_probe() {
        let (linear, _) = scripted(EngineKind::Linear, true, |_| Ok(None));
        let (neural, _) = scripted(EngineKind::Neural, false, |_| Ok(None));
        let (geometric, _) = scripted(EngineKind::Geometric, true, |_| Ok(None));
        let set = EngineSet::new(vec![linear, neural, geometric]);

        let status = set.capability_status();
        let kinds: Vec<EngineKind> = status.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, EngineKind::ALL.to_vec());
        assert!(!status[0].available);
        assert!(status[0].reason.as_deref().unwrap().contains("no model"));

        let available: Vec<EngineKind> = set.available().map(|e| e.kind()).collect();
        assert_eq!(available, vec![EngineKind::Geometric, EngineKind::Linear]);
        assert!(!set.is_available(EngineKind::Neural));
    }

    #[test]
    fn test_errors_and_panics_become_not_found() {
        let (failing, failing_calls) = scripted(EngineKind::Geometric, true, |_| {
            Err(EngineError::DecodeFailed {
                engine: EngineKind::Geometric,
                reason: "backend hiccup".into(),
            })
        });
        let (panicking, _) = scripted(EngineKind::Linear, true, |_| panic!("corrupt state"));
        let set = EngineSet::new(vec![failing, panicking]);
        let frame = Frame::filled(4, 4, 0).unwrap();

        for engine in set.available() {
            assert_eq!(engine.attempt(&frame), None);
        }
        // A failed call never disables the engine
        assert_eq!(set.available_count(), 2);
        let geometric = set.available().next().unwrap();
        assert_eq!(geometric.attempt(&frame), None);
        assert_eq!(failing_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_text_is_not_a_hit() {
        let (empty, _) = scripted(EngineKind::Linear, true, |_| Ok(Some(String::new())));
        let set = EngineSet::new(vec![empty]);
        let frame = Frame::filled(4, 4, 0).unwrap();
        assert_eq!(set.available().next().unwrap().attempt(&frame), None);
    }

    #[test]
    fn test_disabled_by_configuration() {
        let config = EngineConfig {
            enabled: vec![EngineKind::Linear],
            ..EngineConfig::default()
        };
        let set = EngineSet::from_config(&config);
        let status = set.capability_status();
        assert_eq!(status.len(), 3);
        assert_eq!(status[1].reason.as_deref(), Some(DISABLED_REASON));
        let available: Vec<EngineKind> = set.available().map(|e| e.kind()).collect();
        assert_eq!(available, vec![EngineKind::Linear]);
    }

    #[test]
    fn test_standard_set_without_model() {
        let set = EngineSet::standard();
        assert!(set.is_available(EngineKind::Geometric));
        assert!(set.is_available(EngineKind::Linear));
        assert!(!set.is_available(EngineKind::Neural));
    }
}
