/*!
 * Subtitle translation.
 *
 * This module contains the batch pipeline that turns an SRT payload into a
 * translated SRT payload while streaming progress to the caller.
 */

pub use self::pipeline::{TranslationJob, TranslationPipeline};

pub mod pipeline;
