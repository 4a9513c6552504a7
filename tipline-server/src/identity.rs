//! Email identity manager
//!
//! Owns the lifecycle of a participant's email entries:
//!
//! ```text
//! unverified --verify(valid nonce, fresh)--> verified
//! unverified --verify(wrong nonce)---------> unverified
//! unverified --verify(expired)-------------> unverified (re-add restarts the window)
//! verified   --verify(same owner)----------> verified (redundant)
//! any        --remove(not primary)---------> deleted
//! ```
//!
//! Every operation takes the acting participant explicitly. Verification
//! mail is sent synchronously; other mail goes through the durable queue
//! drained by [`EmailIdentity::dequeue_emails`].

use chrono::Utc;

use tipline_core::message::render;
use tipline_core::verification::{check_attempt, is_expired};
use tipline_core::{
    Check, EmailAddress, EmailEntry, Error as IdentityError, MessageContext, MessageKind,
    Participant, VerificationOutcome, MAX_EMAIL_ADDRESSES,
};

use crate::config::SiteConfig;
use crate::email::{EmailSender, OutboundEmail};
use crate::error::ServiceError;
use crate::store::{ParticipantStore, StoreResult};

/// Messages claimed from the queue per round trip
pub const DEQUEUE_BATCH_SIZE: usize = 60;

/// What `add_email` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddEmailOutcome {
    /// The participant had already verified the address; nothing was sent
    AlreadyVerified,
    /// A verification message went to the address
    Sent,
    /// A verification message went to the address and a notice to the primary
    SentWithNotice,
}

/// Email identity operations bound to a store, a sender and a site
pub struct EmailIdentity<'a, U: ?Sized, E: ?Sized> {
    store: &'a U,
    sender: &'a E,
    site: &'a SiteConfig,
}

impl<'a, U, E> EmailIdentity<'a, U, E>
where
    U: ParticipantStore + ?Sized,
    E: EmailSender + ?Sized,
{
    pub fn new(store: &'a U, sender: &'a E, site: &'a SiteConfig) -> Self {
        Self {
            store,
            sender,
            site,
        }
    }

    /// Attach `address` to the participant and send a verification message.
    ///
    /// Re-adding an unverified address is a resend: the nonce is reused and
    /// the window restarts only if it has already run out.
    pub fn add_email(&self, participant: &Participant, address: &str) -> StoreResult<AddEmailOutcome> {
        let address = EmailAddress::parse(address)?;
        let participant = self.refresh(participant)?;

        match self.store.verified_owner(address.as_str())? {
            Some(owner) if owner == participant.id => {
                return Ok(AddEmailOutcome::AlreadyVerified);
            }
            Some(_) => {
                return Err(IdentityError::EmailAlreadyTaken(address.to_string()).into());
            }
            None => {}
        }

        let entry = match self.store.get_email(participant.id, address.as_str())? {
            Some(existing) => self.resume(existing)?,
            None => self.insert(&participant, &address)?,
        };

        let nonce = entry.nonce.as_deref().unwrap_or_default();
        let link = self
            .site
            .verification_link(&participant.username, address.as_str(), nonce);

        self.send_message(
            &participant,
            MessageKind::Verification,
            MessageContext {
                username: participant.username.clone(),
                email: Some(address.to_string()),
                new_email: None,
                link: Some(link),
            },
        )?;

        tracing::info!(
            participant = %participant.username,
            address = %address,
            "Verification email sent"
        );

        match participant.email_address.as_deref() {
            Some(primary) if primary != address.as_str() => {
                self.send_message(
                    &participant,
                    MessageKind::VerificationNotice,
                    MessageContext {
                        username: participant.username.clone(),
                        email: Some(primary.to_string()),
                        new_email: Some(address.to_string()),
                        link: None,
                    },
                )?;
                Ok(AddEmailOutcome::SentWithNotice)
            }
            _ => Ok(AddEmailOutcome::Sent),
        }
    }

    /// Check `nonce` for `address` and mark the address verified on success.
    ///
    /// The first verified address becomes the primary; later ones never
    /// replace it.
    pub fn verify_email(
        &self,
        participant: &Participant,
        address: &str,
        nonce: &str,
    ) -> StoreResult<VerificationOutcome> {
        let now = Utc::now();
        let entry = if address.is_empty() {
            None
        } else {
            self.store.get_email(participant.id, address)?
        };

        match check_attempt(entry.as_ref(), address, nonce, now) {
            Check::Settled(outcome) => {
                tracing::debug!(
                    participant = %participant.username,
                    address = %address,
                    outcome = outcome.as_str(),
                    "Verification attempt settled"
                );
                Ok(outcome)
            }
            Check::Accept => {
                self.store.mark_email_verified(participant.id, address, now)?;

                let became_primary = self
                    .store
                    .set_primary_email_if_unset(participant.id, address)?;

                tracing::info!(
                    participant = %participant.username,
                    address = %address,
                    became_primary,
                    "Email verified"
                );
                Ok(VerificationOutcome::Succeeded)
            }
        }
    }

    /// Make a verified address the participant's primary address
    pub fn set_primary(&self, participant: &Participant, address: &str) -> StoreResult<()> {
        let verified = self
            .store
            .get_email(participant.id, address)?
            .map(|e| e.verified)
            .unwrap_or(false);

        if !verified {
            return Err(IdentityError::EmailNotVerified(address.to_string()).into());
        }

        self.store.set_primary_email(participant.id, address)?;
        tracing::info!(participant = %participant.username, address = %address, "Primary email changed");
        Ok(())
    }

    /// Delete an entry, verified or not, unless it is the primary address
    pub fn remove_email(&self, participant: &Participant, address: &str) -> StoreResult<()> {
        let current = self.refresh(participant)?;
        if current.is_primary(address) {
            return Err(IdentityError::CannotRemovePrimaryEmail(address.to_string()).into());
        }

        self.store.remove_email(participant.id, address)?;
        tracing::info!(participant = %participant.username, address = %address, "Email removed");
        Ok(())
    }

    pub fn get_emails(&self, participant: &Participant) -> StoreResult<Vec<EmailEntry>> {
        self.store.list_emails(participant.id)
    }

    pub fn get_email(&self, participant: &Participant, address: &str) -> StoreResult<Option<EmailEntry>> {
        self.store.get_email(participant.id, address)
    }

    /// Put a message on the durable queue for the next sweep
    pub fn queue_message(
        &self,
        participant: &Participant,
        kind: MessageKind,
        context: MessageContext,
    ) -> StoreResult<()> {
        let id = self.store.queue_message(participant.id, kind, &context)?;
        tracing::debug!(participant = %participant.username, kind = %kind, id, "Message queued");
        Ok(())
    }

    /// Drain the queue, sending every message that has a recipient.
    ///
    /// Messages are claimed before they are sent, so a message is sent at
    /// most once even when sweeps overlap. Returns the number sent.
    pub fn dequeue_emails(&self) -> StoreResult<usize> {
        let mut sent = 0;

        loop {
            let batch = self.store.claim_queued_messages(DEQUEUE_BATCH_SIZE)?;
            if batch.is_empty() {
                break;
            }

            for message in batch {
                let Some(participant) = self.store.get_participant(message.participant)? else {
                    tracing::warn!(id = message.id, "Dropping queued message for missing participant");
                    continue;
                };

                match self.send_message(&participant, message.kind, message.context) {
                    Ok(true) => sent += 1,
                    Ok(false) => {
                        tracing::warn!(
                            id = message.id,
                            participant = %participant.username,
                            "Dropping queued message without a recipient"
                        );
                    }
                    Err(e) => {
                        tracing::error!(id = message.id, error = %e, "Failed to send queued message");
                    }
                }
            }
        }

        if sent > 0 {
            tracing::info!(sent, "Outbound queue drained");
        }
        Ok(sent)
    }

    /// Render and send one message. Returns `false` when there is no recipient.
    ///
    /// The recipient is `context.email`, or the participant's primary address.
    pub fn send_message(
        &self,
        participant: &Participant,
        kind: MessageKind,
        mut context: MessageContext,
    ) -> StoreResult<bool> {
        let Some(to) = context
            .email
            .clone()
            .or_else(|| participant.email_address.clone())
        else {
            return Ok(false);
        };

        if context.username.is_empty() {
            context.username = participant.username.clone();
        }
        context.email = Some(to.clone());

        let rendered = render(kind, &self.site.site_name, &context);
        self.sender
            .send(&OutboundEmail {
                to,
                subject: rendered.subject,
                text: rendered.text,
                html: rendered.html,
            })
            .map_err(ServiceError::Internal)?;

        Ok(true)
    }

    fn refresh(&self, participant: &Participant) -> StoreResult<Participant> {
        self.store
            .get_participant(participant.id)?
            .ok_or(ServiceError::ParticipantNotFound)
    }

    fn resume(&self, existing: EmailEntry) -> StoreResult<EmailEntry> {
        let now = Utc::now();
        if !is_expired(existing.verification_start, now) {
            return Ok(existing);
        }

        self.store
            .restart_verification(existing.participant, &existing.address, now)?;
        Ok(EmailEntry {
            verification_start: now,
            ..existing
        })
    }

    fn insert(&self, participant: &Participant, address: &EmailAddress) -> StoreResult<EmailEntry> {
        if self.store.count_emails(participant.id)? >= MAX_EMAIL_ADDRESSES {
            return Err(IdentityError::TooManyEmailAddresses {
                address: address.to_string(),
            }
            .into());
        }

        let entry = EmailEntry::unverified(participant.id, address, Utc::now());
        match self.store.insert_email(&entry) {
            Ok(()) => Ok(entry),
            // Lost a race with a concurrent add of the same address
            Err(ServiceError::EmailAlreadyExists) => self
                .store
                .get_email(participant.id, address.as_str())?
                .ok_or(ServiceError::EmailNotFound),
            Err(e) => Err(e),
        }
    }
}
