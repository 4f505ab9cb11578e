//! In-process [`MailTransport`] implementations for tests and demos.

// self
use crate::{
	_prelude::*,
	notify::{MailTransport, OutgoingMail, TransportFuture, TransportSendError},
};

/// Transport that records every message in memory instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct MemoryMailTransport(Arc<Mutex<Vec<OutgoingMail>>>);
impl MemoryMailTransport {
	/// Returns the messages captured so far.
	pub fn sent(&self) -> Vec<OutgoingMail> {
		self.0.lock().clone()
	}
}
impl MailTransport for MemoryMailTransport {
	fn send(&self, mail: OutgoingMail) -> TransportFuture<'_, ()> {
		let inbox = self.0.clone();

		Box::pin(async move {
			inbox.lock().push(mail);

			Ok(())
		})
	}
}

/// Transport that rejects every message; exercises failure reporting paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingMailTransport;
impl MailTransport for FailingMailTransport {
	fn send(&self, _: OutgoingMail) -> TransportFuture<'_, ()> {
		Box::pin(async {
			Err(TransportSendError::Transport { message: "transport configured to fail".into() })
		})
	}
}
