// std
use std::sync::Arc;
// crates.io
use time::Duration;
use url::Url;
// self
use leafpass::{
	action::{ActionTokenError, ActionTokenIssuer},
	identity::{ActionName, ResourceId},
	notify::{
		BookingSummary, ConfirmationMailer, MailerConfig, MemoryMailTransport,
		extract_confirmation_token, send_confirmation_request,
	},
};

const SIGNING_SECRET: &str = "confirmation-it-secret";

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

fn mailer(transport: MemoryMailTransport) -> ConfirmationMailer {
	ConfirmationMailer::new(Arc::new(transport), MailerConfig {
		from_name: "Leafpass".into(),
		from_address: "no-reply@leafpass.example".into(),
		public_base_url: Url::parse("https://leafpass.example/")
			.expect("Base URL fixture should parse successfully."),
	})
}

fn linked_url(html_body: &str) -> Url {
	let start = html_body
		.find("href=\"")
		.expect("Rendered body must carry a confirmation link.")
		+ "href=\"".len();
	let end = start
		+ html_body[start..].find('"').expect("Confirmation link must be quote-terminated.");

	Url::parse(&html_body[start..end]).expect("Embedded confirmation link should parse.")
}

#[tokio::test]
async fn confirmation_flow_round_trips_from_email_to_resource() {
	let issuer = ActionTokenIssuer::new(SIGNING_SECRET);
	let transport = MemoryMailTransport::default();
	let mailer = mailer(transport.clone());
	let outcome = send_confirmation_request(&issuer, &mailer, &booking(), "ana@example.com")
		.await
		.expect("Dispatch should not surface an error.");

	assert!(outcome.is_sent());

	let sent = transport.sent();

	assert_eq!(sent.len(), 1, "Exactly one message must be dispatched per request.");

	// Follow the link the way the recipient would: parse it out of the message, then hand
	// the token to the confirmation handler's verification step.
	let link = linked_url(&sent[0].html_body);

	assert_eq!(link.path(), "/confirm-booking");

	let token =
		extract_confirmation_token(&link).expect("Confirmation link must carry a token.");
	let confirm = ActionName::new("confirm-booking").expect("Action fixture should be valid.");
	let resource = issuer
		.verify(&token, &confirm)
		.expect("Token embedded in the confirmation link should verify.");

	assert_eq!(resource.as_ref(), "booking-77");

	// The same token replayed against a different handler must be rejected.
	let cancel = ActionName::new("cancel-booking").expect("Action fixture should be valid.");
	let err =
		issuer.verify(&token, &cancel).expect_err("Mismatched action must be rejected.");

	assert!(matches!(err, ActionTokenError::ActionMismatch { .. }));
}

#[tokio::test]
async fn zero_ttl_token_expires_within_a_second() {
	let issuer = ActionTokenIssuer::new(SIGNING_SECRET);
	let resource = ResourceId::new("booking-77").expect("Resource fixture should be valid.");
	let confirm = ActionName::new("confirm-booking").expect("Action fixture should be valid.");
	let token = issuer
		.issue(&resource, &confirm, Duration::ZERO)
		.expect("Token issuance should succeed.");

	tokio::time::sleep(std::time::Duration::from_secs(1)).await;

	let err = issuer
		.verify(&token, &confirm)
		.expect_err("Zero-ttl token must expire within a second.");

	assert_eq!(err, ActionTokenError::Expired);
}

#[tokio::test]
async fn issuers_with_rotated_secrets_reject_old_links() {
	let issuer = ActionTokenIssuer::new(SIGNING_SECRET);
	let transport = MemoryMailTransport::default();
	let mailer = mailer(transport.clone());

	send_confirmation_request(&issuer, &mailer, &booking(), "ana@example.com")
		.await
		.expect("Dispatch should not surface an error.");

	let link = linked_url(&transport.sent()[0].html_body);
	let token =
		extract_confirmation_token(&link).expect("Confirmation link must carry a token.");
	let rotated = ActionTokenIssuer::new("rotated-secret");
	let confirm = ActionName::new("confirm-booking").expect("Action fixture should be valid.");
	let err = rotated
		.verify(&token, &confirm)
		.expect_err("Rotating the signing key must invalidate outstanding links.");

	assert_eq!(err, ActionTokenError::InvalidSignature);
}
