use async_trait::async_trait;

use crate::error::Result;
use crate::schema::ReportImage;

/// A vision-capable language model: instruction plus image in, free text out.
///
/// The answer carries no schema guarantee; callers parse it defensively.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe(&self, instruction: &str, image: &ReportImage) -> Result<String>;
}

#[async_trait]
impl<T: VisionModel + ?Sized> VisionModel for std::sync::Arc<T> {
    async fn describe(&self, instruction: &str, image: &ReportImage) -> Result<String> {
        (**self).describe(instruction, image).await
    }
}
