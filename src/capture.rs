//! Glue between a capture pipeline and the sender.
//!
//! Whatever produces photos (a camera SDK callback, a directory watcher, the
//! CLI) calls [`CapturePipeline::on_capture_saved`] once per saved image.
//! The pipeline snapshots the endpoint at that moment and starts exactly one
//! transfer for it.

use crate::{
    config::EndpointEditor,
    sender::{PhotoSender, TransferHandle},
};

pub struct CapturePipeline {
    sender: PhotoSender,
    editor: EndpointEditor,
}

impl CapturePipeline {
    pub fn new(sender: PhotoSender, editor: EndpointEditor) -> Self {
        Self { sender, editor }
    }

    pub fn editor(&self) -> &EndpointEditor {
        &self.editor
    }

    /// Starts the transfer of a freshly saved photo.
    ///
    /// Returns as soon as the task is spawned. Callers on a UI thread should
    /// drop the handle; the transfer outcome is never reported back here.
    pub fn on_capture_saved(&self, reference: &str) -> TransferHandle {
        log::debug!("Photo capture succeeded: {reference}");
        self.sender.send(reference, self.editor.current())
    }
}
