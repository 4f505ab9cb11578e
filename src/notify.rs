//! Booking-confirmation dispatch boundary.
//!
//! The core issues an action token, embeds it into a fully-formed confirmation link, and
//! hands the rendered message to a mail transport. Delivery failure is logged and reported
//! back as a value; it never rolls back the token issuance or any state change that already
//! happened.

pub mod memory;

pub use memory::MemoryMailTransport;

// self
use crate::{
	_prelude::*,
	action::{ActionToken, ActionTokenIssuer},
	error::ConfigError,
	identity::{ActionName, ResourceId},
};

/// Action name carried by booking-confirmation links.
pub const CONFIRM_BOOKING: &str = "confirm-booking";

/// Path segment of the confirmation endpoint on the public site.
const CONFIRMATION_PATH: &str = "confirm-booking";

/// Future type returned by mail transports.
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportSendError>> + 'a + Send>>;

/// Mail delivery contract implemented by SMTP adapters and test doubles.
pub trait MailTransport
where
	Self: Send + Sync,
{
	/// Hands a rendered message to the underlying delivery mechanism.
	fn send(&self, mail: OutgoingMail) -> TransportFuture<'_, ()>;
}

/// Error type produced by [`MailTransport`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TransportSendError {
	/// Delivery-layer failure (connection, authentication, recipient rejection).
	#[error("Mail transport failure: {message}.")]
	Transport {
		/// Human-readable error payload.
		message: String,
	},
}

/// Rendered message handed to a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
	/// Recipient address.
	pub to: String,
	/// Sender line, already formatted as `"Name" <address>`.
	pub from: String,
	/// Subject line.
	pub subject: String,
	/// HTML body.
	pub html_body: String,
}

/// Display data for the booking a confirmation email describes.
///
/// Every field except the id arrives preformatted; the core templates them without
/// interpreting them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingSummary {
	/// Booking identifier; becomes the subject of the issued action token.
	pub id: ResourceId,
	/// Title of the booked course.
	pub course_title: String,
	/// Formatted booking date.
	pub date: String,
	/// Formatted start time.
	pub start_time: String,
	/// Formatted end time.
	pub end_time: String,
	/// Number of people on the booking.
	pub people: u32,
	/// Current booking status label.
	pub status: String,
}

/// Sender identity and link base used when rendering confirmations.
#[derive(Clone, Debug)]
pub struct MailerConfig {
	/// Display name placed on the sender line.
	pub from_name: String,
	/// Sender address.
	pub from_address: String,
	/// Public base URL of the site the confirmation link points into.
	pub public_base_url: Url,
}

/// Whether a dispatch reached the transport successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
	/// The transport accepted the message.
	Sent,
	/// The transport reported a failure; the failure was logged and nothing was rolled
	/// back.
	Failed,
}
impl DispatchOutcome {
	/// Whether the transport accepted the message.
	pub fn is_sent(self) -> bool {
		matches!(self, Self::Sent)
	}
}

/// Renders and dispatches booking-confirmation messages.
pub struct ConfirmationMailer {
	transport: Arc<dyn MailTransport>,
	config: MailerConfig,
}
impl ConfirmationMailer {
	/// Creates a mailer over the provided transport and sender configuration.
	pub fn new(transport: Arc<dyn MailTransport>, config: MailerConfig) -> Self {
		Self { transport, config }
	}

	/// Sends a confirmation message carrying the provided link.
	///
	/// A transport failure is logged and reported as [`DispatchOutcome::Failed`]; it is
	/// never escalated into an error that could unwind the caller's committed state.
	pub async fn send_booking_confirmation(
		&self,
		booking: &BookingSummary,
		recipient: &str,
		confirmation_link: &Url,
	) -> DispatchOutcome {
		let mail = OutgoingMail {
			to: recipient.to_owned(),
			from: format!("\"{}\" <{}>", self.config.from_name, self.config.from_address),
			subject: "Please confirm your booking".into(),
			html_body: render_confirmation_body(booking, confirmation_link),
		};

		match self.transport.send(mail).await {
			Ok(()) => DispatchOutcome::Sent,
			Err(error) => {
				tracing::warn!(booking = %booking.id, %error, "failed to send confirmation email");

				DispatchOutcome::Failed
			},
		}
	}
}
impl Debug for ConfirmationMailer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfirmationMailer").field("config", &self.config).finish()
	}
}

/// Issues a confirmation token for the booking, builds the link, and dispatches the email.
///
/// Exactly one token is issued per call. The returned outcome reports delivery only; the
/// issued authorization stands regardless, so retrying a failed send issues a fresh,
/// equally valid token.
pub async fn send_confirmation_request(
	issuer: &ActionTokenIssuer,
	mailer: &ConfirmationMailer,
	booking: &BookingSummary,
	recipient: &str,
) -> Result<DispatchOutcome> {
	let action = ActionName::new(CONFIRM_BOOKING).map_err(ConfigError::from)?;
	let token = issuer.issue_with_default_ttl(&booking.id, &action)?;
	let link = confirmation_link(&mailer.config.public_base_url, &token)?;

	Ok(mailer.send_booking_confirmation(booking, recipient, &link).await)
}

/// Builds the public confirmation link embedding the token.
pub fn confirmation_link(base: &Url, token: &ActionToken) -> Result<Url, ConfigError> {
	let mut url = base.join(CONFIRMATION_PATH).map_err(|_| ConfigError::UnusableBaseUrl)?;

	url.query_pairs_mut().append_pair("token", token.expose());

	Ok(url)
}

/// Extracts the `token` query parameter from an inbound confirmation URL.
pub fn extract_confirmation_token(url: &Url) -> Option<ActionToken> {
	url.query_pairs()
		.find(|(key, _)| key == "token")
		.map(|(_, value)| ActionToken::new(value.into_owned()))
}

fn render_confirmation_body(booking: &BookingSummary, link: &Url) -> String {
	format!(
		"<!DOCTYPE html>\n\
		<html>\n\
		<body style=\"font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;\">\n\
		<h1>Booking Confirmation</h1>\n\
		<p>Hello,</p>\n\
		<p>Thank you for your booking! Please confirm it by clicking the button below:</p>\n\
		<p style=\"text-align: center;\"><a href=\"{link}\" style=\"display: inline-block; padding: 12px 24px; background-color: #0066cc; color: white; text-decoration: none; border-radius: 4px; font-weight: bold;\">Confirm Booking</a></p>\n\
		<p>Or copy and paste this link into your browser:</p>\n\
		<p style=\"word-break: break-all; color: #0066cc;\">{link}</p>\n\
		<h3>Booking Details:</h3>\n\
		<ul>\n\
		<li><strong>Course:</strong> {course}</li>\n\
		<li><strong>Date:</strong> {date}</li>\n\
		<li><strong>Time:</strong> {start} - {end}</li>\n\
		<li><strong>Number of People:</strong> {people}</li>\n\
		<li><strong>Status:</strong> {status}</li>\n\
		<li><strong>Booking ID:</strong> {id}</li>\n\
		</ul>\n\
		<p>This confirmation link will expire in 7 days.</p>\n\
		<p>If you did not make this booking, please ignore this email.</p>\n\
		<p>Best regards,<br>The Leafpass Team</p>\n\
		</body>\n\
		</html>",
		course = booking.course_title,
		date = booking.date,
		start = booking.start_time,
		end = booking.end_time,
		people = booking.people,
		status = booking.status,
		id = booking.id,
	)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::notify::memory::FailingMailTransport;

	fn booking() -> BookingSummary {
		BookingSummary {
			id: ResourceId::new("booking-77").expect("Resource fixture should be valid."),
			course_title: "Leaf Identification Workshop".into(),
			date: "3/14/2026".into(),
			start_time: "10:00".into(),
			end_time: "12:00".into(),
			people: 2,
			status: "PENDING".into(),
		}
	}

	fn mailer(transport: Arc<dyn MailTransport>) -> ConfirmationMailer {
		ConfirmationMailer::new(transport, MailerConfig {
			from_name: "Leafpass".into(),
			from_address: "no-reply@leafpass.example".into(),
			public_base_url: Url::parse("https://leafpass.example/")
				.expect("Base URL fixture should parse successfully."),
		})
	}

	#[test]
	fn confirmation_link_embeds_the_token() {
		let base = Url::parse("https://leafpass.example/")
			.expect("Base URL fixture should parse successfully.");
		let token = ActionToken::new("header.payload.signature");
		let link = confirmation_link(&base, &token)
			.expect("Confirmation link should build successfully.");

		assert_eq!(link.path(), "/confirm-booking");
		assert_eq!(
			extract_confirmation_token(&link).map(|t| t.expose().to_owned()),
			Some("header.payload.signature".to_owned())
		);
	}

	#[test]
	fn link_without_token_parameter_extracts_nothing() {
		let url = Url::parse("https://leafpass.example/confirm-booking?other=1")
			.expect("URL fixture should parse successfully.");

		assert!(extract_confirmation_token(&url).is_none());
	}

	#[tokio::test]
	async fn successful_dispatch_records_the_message() {
		let transport = MemoryMailTransport::default();
		let mailer = mailer(Arc::new(transport.clone()));
		let link = Url::parse("https://leafpass.example/confirm-booking?token=abc")
			.expect("Link fixture should parse successfully.");
		let outcome = mailer.send_booking_confirmation(&booking(), "ana@example.com", &link).await;

		assert!(outcome.is_sent());

		let sent = transport.sent();

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].to, "ana@example.com");
		assert_eq!(sent[0].subject, "Please confirm your booking");
		assert!(sent[0].html_body.contains(link.as_str()));
		assert!(sent[0].html_body.contains("booking-77"));
	}

	#[tokio::test]
	async fn transport_failure_is_reported_not_escalated() {
		let mailer = mailer(Arc::new(FailingMailTransport));
		let issuer = crate::action::ActionTokenIssuer::new("secret");
		let outcome = send_confirmation_request(&issuer, &mailer, &booking(), "ana@example.com")
			.await
			.expect("A transport failure must not surface as an error.");

		assert!(!outcome.is_sent());
	}
}
