//! External collaborators: image storage and outbound email.
//!
//! Both sit behind traits so the HTTP layer holds `Arc<dyn ...>` handles and
//! tests can swap in their own implementations.

mod email;
mod images;

pub use email::{EmailSender, LogEmailSender, OutgoingEmail};
#[cfg(test)]
pub use email::OutboxEmailSender;
pub use images::{ImageKind, ImageStore, LocalImageStore, MAX_IMAGE_BYTES};
