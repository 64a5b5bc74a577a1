//! Factory mapping a [`SendConfigPayload`] to the [`Sender`] that knows how
//! to dispatch it (§4.4). Callers share one `reqwest::Client` across
//! senders, matching the teacher's habit of reusing connection pools rather
//! than building a client per request.

use {
    crate::{email::EmailSender, push::PushSender, sms::SmsSender, webhook::WebhookSender, Sender},
    model::send_config::SendConfigPayload,
};

pub fn build_sender(config: &SendConfigPayload, client: reqwest::Client) -> Box<dyn Sender> {
    match config {
        SendConfigPayload::Email(c) => Box::new(EmailSender::new(c.clone(), client)),
        SendConfigPayload::Webhook(c) => Box::new(WebhookSender::new(c.clone(), client)),
        SendConfigPayload::Sms(c) => Box::new(SmsSender::new(c.clone(), client)),
        SendConfigPayload::Push(c) => Box::new(PushSender::new(c.clone())),
    }
}
