//! Typed processors.
//!
//! `TypedArguments` ties a processor name to the shape of `arguments`, and
//! `TypedProcessor<A, H>` erases a `Handler<A>` into a `Processor` so it can
//! live in the registry next to untyped ones.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::Processor;
use crate::domain::{Message, ProcessingFailure};

/// Arguments of a typed processor.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct SendMail { to: String }
///
/// impl TypedArguments for SendMail {
///     const PROCESSOR: &'static str = "send_mail";
/// }
/// ```
///
/// # Trait Bounds
/// - `DeserializeOwned`: decoded from the stored `arguments` value
/// - `Send + Sync + 'static`: the erased processor is shared across tasks
pub trait TypedArguments: DeserializeOwned + Send + Sync + 'static {
    /// Registry key.
    const PROCESSOR: &'static str;
}

/// Handles decoded arguments of type `A`.
///
/// The message is passed along for its metadata (attempt count, timestamps).
#[async_trait]
pub trait Handler<A: TypedArguments>: Send + Sync {
    async fn handle(&self, args: A, message: &Message) -> Result<(), ProcessingFailure>;
}

pub struct TypedProcessor<A: TypedArguments, H: Handler<A>> {
    handler: H,
    _marker: PhantomData<fn() -> A>,
}

impl<A: TypedArguments, H: Handler<A>> TypedProcessor<A, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<A: TypedArguments, H: Handler<A>> Processor for TypedProcessor<A, H> {
    async fn process(&self, message: Message) -> Result<Message, ProcessingFailure> {
        // Missing arguments decode like JSON null, so `Option<T>` and unit
        // structs still work.
        let raw = message.arguments.clone().unwrap_or(serde_json::Value::Null);
        let args: A = serde_json::from_value(raw)?;
        self.handler.handle(args, &message).await?;
        Ok(message)
    }
}
