//! Processors: the named handlers a message is dispatched to.
//!
//! # 二層構造
//! - **Dyn**: `Processor` trait - object-safe, registry に格納される
//! - **Typed**: `TypedArguments` + `Handler<A>` - `arguments` を型にデコードしてから渡す

mod log;
mod registry;
mod typed;

pub use self::log::LogProcessor;
pub use self::registry::{ProcessorRegistry, RegistryError};
pub use self::typed::{Handler, TypedArguments, TypedProcessor};

use std::future::Future;

use async_trait::async_trait;

use crate::domain::{Message, ProcessingFailure};

/// A processor consumes a message and returns a (possibly transformed) one.
///
/// The returned message is not written back; returning `Ok` acknowledges the
/// record and it is deleted.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, message: Message) -> Result<Message, ProcessingFailure>;
}

/// Processor backed by an async closure.
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap an async closure as a `Processor`.
///
/// ```ignore
/// registry.register("noop", processor_fn(|msg| async move { Ok(msg) }))?;
/// ```
pub fn processor_fn<F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Message, ProcessingFailure>> + Send,
{
    FnProcessor { f }
}

#[async_trait]
impl<F, Fut> Processor for FnProcessor<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Message, ProcessingFailure>> + Send,
{
    async fn process(&self, message: Message) -> Result<Message, ProcessingFailure> {
        (self.f)(message).await
    }
}
