//! The scripted two-turn exchange with Chia.
//!
//! Each user message is shown, sent, decoded and shown back as pretty JSON.
//! The first failure stops the run and is reported once through
//! [`report_failure`].

use crate::{display::DisplaySink, error::LLMError, persona::Reply, session::Session};

/// Messages sent when no others are given.
pub const DEMO_MESSAGES: [&str; 2] = ["Hai Chia, kamu lagi apa?", "Kamu romantis banget deh"];

pub const USER_TITLE: &str = "You:";
pub const ASSISTANT_TITLE: &str = "AI (Chia):";
pub const ERROR_TITLE: &str = "Error";

/// Plays `messages` in order against `session`, stopping at the first error.
///
/// A message is sent only after the previous reply has been displayed.
pub async fn converse<S, M>(
    session: &mut Session,
    sink: &mut S,
    messages: &[M],
) -> Result<Vec<Reply>, LLMError>
where
    S: DisplaySink + ?Sized,
    M: AsRef<str>,
{
    let mut replies = Vec::with_capacity(messages.len());
    for message in messages {
        let message = message.as_ref();
        sink.display(USER_TITLE, message);

        let raw = session.send(message).await?;
        let reply = Reply::parse(&raw)?;
        log::debug!("reply decoded into {} parts", reply.len());

        sink.display(ASSISTANT_TITLE, &reply.to_pretty_json()?);
        replies.push(reply);
    }
    Ok(replies)
}

/// Terminal handler: logs the failure and shows a single error block.
pub fn report_failure<S: DisplaySink + ?Sized>(sink: &mut S, err: &LLMError) {
    log::error!("conversation aborted: {err}");
    sink.display(ERROR_TITLE, &err.to_string());
}

/// Runs [`converse`] and routes any failure to [`report_failure`].
///
/// Returns `true` when every message got a valid reply.
pub async fn run<S, M>(session: &mut Session, sink: &mut S, messages: &[M]) -> bool
where
    S: DisplaySink + ?Sized,
    M: AsRef<str>,
{
    match converse(session, sink, messages).await {
        Ok(_) => true,
        Err(e) => {
            report_failure(sink, &e);
            false
        }
    }
}
