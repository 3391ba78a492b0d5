use std::collections::HashMap;
use std::sync::Arc;

use super::typed::{Handler, TypedArguments, TypedProcessor};
use super::Processor;

/// Errors while populating a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("processor name must not be empty")]
    EmptyName,

    #[error("processor '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Registry of processors (name -> processor).
///
/// Design:
/// - Built during initialization (mutable).
/// - Shared read-only behind an `Arc` once the queue is running, so lookups
///   need no lock.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Register a processor under `name` (surrounding whitespace ignored).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        processor: impl Processor + 'static,
    ) -> Result<(), RegistryError> {
        self.register_arc(name, Arc::new(processor))
    }

    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        processor: Arc<dyn Processor>,
    ) -> Result<(), RegistryError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.processors.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.processors.insert(name, processor);
        Ok(())
    }

    /// Register a typed handler under `A::PROCESSOR`.
    pub fn register_typed<A, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        A: TypedArguments,
        H: Handler<A> + 'static,
    {
        self.register(A::PROCESSOR, TypedProcessor::<A, H>::new(handler))
    }

    /// Look up a processor by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(name.trim()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name.trim())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, NewMessage, ProcessingFailure, Timestamp};
    use crate::processor::processor_fn;

    fn ok() -> impl Processor {
        processor_fn(|msg: Message| async move { Ok(msg) })
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = ProcessorRegistry::new();
        registry.register("log", ok()).unwrap();

        assert!(registry.resolve("log").is_some());
        assert!(registry.resolve(" log ").is_some());
        assert!(registry.resolve("mail").is_none());
        assert!(registry.contains("log"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = ProcessorRegistry::new();
        registry.register("log", ok()).unwrap();

        let result = registry.register("log ", ok());
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(name)) if name == "log"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut registry = ProcessorRegistry::new();
        assert!(matches!(registry.register("  ", ok()), Err(RegistryError::EmptyName)));
        assert!(registry.is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = ProcessorRegistry::new();
        registry.register("mail", ok()).unwrap();
        registry.register("log", ok()).unwrap();
        assert_eq!(registry.names(), vec!["log".to_string(), "mail".to_string()]);
    }

    #[tokio::test]
    async fn resolved_processor_is_invoked() {
        let mut registry = ProcessorRegistry::new();
        let failing = processor_fn(|_msg: Message| async {
            Err::<Message, _>(ProcessingFailure::new("nope"))
        });
        registry.register("fail", failing).unwrap();

        let msg = Message::admit(NewMessage::new("fail"), Timestamp::from_millis(0));
        let err = registry.resolve("fail").unwrap().process(msg).await.unwrap_err();
        assert_eq!(err.message(), "nope");
    }
}
